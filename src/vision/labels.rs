// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Instrument class label table and resolution

use std::collections::HashSet;

use thiserror::Error;

use super::detector::DetectedBox;

/// Class names in the order the detection model assigns class ids.
///
/// Position is the class id; the model and this table must stay in
/// lock-step. A detector emitting an id outside this table is a
/// model/table version mismatch, surfaced as [`LabelError::TableMismatch`].
pub const INSTRUMENT_CLASSES: [&str; 20] = [
    "AC-Ammeter",
    "Brass-Scale-Weights",
    "Burette-Stand",
    "DC-Ammeter",
    "DC-Power-Supply",
    "Deflection-Magnetometer",
    "Deflection-Magnetometer-Power-supply",
    "Helical-Extension-Spring",
    "Lens",
    "Meldes-Apparatus",
    "Meldes-Apparatus-weight",
    "Micrometer-Screw-Gauge",
    "Multimeter",
    "Pendulum-Clamp",
    "Retort-Stand",
    "Rubber-Mallet-Hammer",
    "Spherometer",
    "Stopwatch",
    "Vernier-Caliper",
    "Weight-carrier",
];

/// Errors that can occur during label resolution
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelError {
    /// A class id fell outside the label table
    #[error("class id {class_id} outside label table of {table_size} entries (model/table version mismatch)")]
    TableMismatch {
        /// The offending class id
        class_id: usize,
        /// Number of entries in the table
        table_size: usize,
    },
}

/// Resolve detected boxes into a duplicate-free list of instrument names
///
/// Labels keep first-seen order so repeated detections of the same class
/// collapse deterministically.
pub fn resolve_labels(boxes: &[DetectedBox]) -> Result<Vec<String>, LabelError> {
    let mut seen: HashSet<usize> = HashSet::new();
    let mut labels = Vec::new();

    for b in boxes {
        let name = INSTRUMENT_CLASSES
            .get(b.class_id)
            .ok_or(LabelError::TableMismatch {
                class_id: b.class_id,
                table_size: INSTRUMENT_CLASSES.len(),
            })?;

        if seen.insert(b.class_id) {
            labels.push((*name).to_string());
        }
    }

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(class_id: usize) -> DetectedBox {
        DetectedBox {
            class_id,
            confidence: 0.9,
            bbox: [0.1, 0.1, 0.5, 0.5],
        }
    }

    #[test]
    fn test_table_has_twenty_entries() {
        assert_eq!(INSTRUMENT_CLASSES.len(), 20);
        assert_eq!(INSTRUMENT_CLASSES[0], "AC-Ammeter");
        assert_eq!(INSTRUMENT_CLASSES[19], "Weight-carrier");
    }

    #[test]
    fn test_resolve_in_range_exact() {
        for (id, expected) in INSTRUMENT_CLASSES.iter().enumerate() {
            let labels = resolve_labels(&[boxed(id)]).unwrap();
            assert_eq!(labels, vec![expected.to_string()]);
        }
    }

    #[test]
    fn test_resolve_empty() {
        let labels = resolve_labels(&[]).unwrap();
        assert!(labels.is_empty());
    }

    #[test]
    fn test_resolve_deduplicates() {
        let labels = resolve_labels(&[boxed(3), boxed(3), boxed(3)]).unwrap();
        assert_eq!(labels, vec!["DC-Ammeter".to_string()]);
    }

    #[test]
    fn test_resolve_first_seen_order() {
        let labels = resolve_labels(&[boxed(17), boxed(2), boxed(17), boxed(8)]).unwrap();
        assert_eq!(
            labels,
            vec![
                "Stopwatch".to_string(),
                "Burette-Stand".to_string(),
                "Lens".to_string(),
            ]
        );
    }

    #[test]
    fn test_resolve_out_of_range_is_mismatch() {
        let err = resolve_labels(&[boxed(0), boxed(20)]).unwrap_err();
        assert_eq!(
            err,
            LabelError::TableMismatch {
                class_id: 20,
                table_size: 20
            }
        );
    }
}
