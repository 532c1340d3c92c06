//! Error types, re-exported from `qe-error`

pub use qe_error::{QwiicError, Result};
