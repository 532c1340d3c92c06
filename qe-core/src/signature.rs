//! Signature table
//!
//! Every sub-sensor of a sensor can be switched off independently on the
//! logger, so a sensor shows up in the header line as any non-empty subset
//! of its sub-sensors, always in declaration order. This module enumerates
//! those subsets once at startup and inverts them into a lookup from the
//! comma-joined column list to the sensor that produces it.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::catalog::{Catalog, SensorDef};

/// Two sensors producing the same signature
///
/// The later sensor in catalog order wins the lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureCollision {
    pub signature: String,
    pub shadowed: &'static str,
    pub winner: &'static str,
}

/// Lookup from signature string to sensor name
#[derive(Debug, Clone, Default)]
pub struct SignatureTable {
    entries: HashMap<String, &'static str>,
    generated: Vec<(&'static str, usize)>,
    collisions: Vec<SignatureCollision>,
    longest: usize,
}

impl SignatureTable {
    /// Sensor producing exactly this signature
    pub fn lookup(&self, signature: &str) -> Option<&'static str> {
        self.entries.get(signature).copied()
    }

    /// Number of distinct signatures in the table
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of signatures generated for a sensor (one per non-empty subset)
    pub fn signatures_for(&self, sensor: &str) -> usize {
        self.generated
            .iter()
            .find(|(name, _)| *name == sensor)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// Cross-sensor collisions found while building
    pub fn collisions(&self) -> &[SignatureCollision] {
        &self.collisions
    }

    /// Column count of the longest signature; no header chunk can be longer
    pub fn longest_signature(&self) -> usize {
        self.longest
    }

    fn insert(&mut self, signature: String, sensor: &'static str) {
        if let Some(previous) = self.entries.insert(signature.clone(), sensor) {
            if previous != sensor {
                warn!(
                    signature = %signature,
                    shadowed = previous,
                    winner = sensor,
                    "Signature collision between sensors, later sensor wins"
                );
                self.collisions.push(SignatureCollision {
                    signature,
                    shadowed: previous,
                    winner: sensor,
                });
            }
        }
    }
}

/// Index combinations of `k` out of `n`, in lexicographic order
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if k == 0 || k > n {
        return out;
    }
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.clone());
        // rightmost position that can still advance
        let Some(pos) = (0..k).rev().find(|&i| idx[i] < n - k + i) else {
            return out;
        };
        idx[pos] += 1;
        for j in pos + 1..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

/// Every combination of sub-sensor signatures a sensor can produce
///
/// Ordered from the full set down to single sub-sensors, and within one
/// size in natural combination order. A sensor with sub-sensors a, b and c
/// yields `[a,b,c] [a,b] [a,c] [b,c] [a] [b] [c]`.
pub fn subsensor_signatures(sensor: &SensorDef) -> Vec<Vec<String>> {
    let own: Vec<String> = sensor.subsensors.iter().map(|s| s.signature()).collect();
    debug!(sensor = sensor.name, subsensors = ?own, "Sub-sensor signatures");

    let mut signatures = Vec::new();
    for size in (1..=own.len()).rev() {
        for combo in combinations(own.len(), size) {
            signatures.push(combo.into_iter().map(|i| own[i].clone()).collect());
        }
    }
    signatures
}

/// Build the signature lookup table for a catalog
pub fn build_signature_table(catalog: &Catalog) -> SignatureTable {
    debug!("Creating (sub)sensor signature lookup table...");
    let mut table = SignatureTable::default();

    for sensor in catalog.sensors() {
        let combos = subsensor_signatures(sensor);
        table.generated.push((sensor.name, combos.len()));

        let width: usize = sensor.subsensors.iter().map(|s| s.width()).sum();
        table.longest = table.longest.max(width);

        for combo in combos {
            table.insert(combo.join(","), sensor.name);
        }
    }

    debug!(
        signatures = table.len(),
        collisions = table.collisions.len(),
        "Signature lookup table ready"
    );
    table
}
