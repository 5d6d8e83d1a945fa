//! Golden test vectors for deterministic verification.
//!
//! Each vector builds a small DAG and pins its representation hash, depth
//! and the padded payload of its root, so any change to descriptors, padding
//! or hash layout shows up here first.

use std::sync::Arc;

use cellkit_core::{bits_to_padded, string_to_cell, Cell, CellBuilder};
use serde::{Deserialize, Serialize};

use crate::fixtures::{diamond, leaf, node};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Builds the DAG under test.
    pub build: fn() -> Arc<Cell>,
    /// Distinct cells reachable from the root.
    pub cells: usize,
    /// Expected level-0 depth of the root.
    pub depth: u16,
    /// Expected padded root payload (hex).
    pub root_data: &'static str,
    /// Expected representation hash (hex).
    pub expected_hash: &'static str,
}

/// What a vector actually produced, serializable for golden files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorReport {
    pub name: String,
    pub cells: usize,
    pub depth: u16,
    pub root_data: String,
    pub hash: String,
}

fn unaligned_with_ref() -> Arc<Cell> {
    CellBuilder::new()
        .store_uint(0b101, 3)
        .and_then(|b| b.store_ref(leaf(7)))
        .and_then(CellBuilder::build)
        .expect("three bits and one ref fit a cell")
}

fn hello() -> Arc<Cell> {
    string_to_cell("hello").expect("short string")
}

fn empty() -> Arc<Cell> {
    Cell::empty().expect("empty cell")
}

fn diamond_root() -> Arc<Cell> {
    diamond().root
}

fn single_leaf() -> Arc<Cell> {
    leaf(3)
}

fn parent_of_leaf() -> Arc<Cell> {
    node(1, &[leaf(3)])
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "empty cell",
            build: empty,
            cells: 1,
            depth: 0,
            root_data: "",
            expected_hash: "1ad48f49627079d806b802c74f40c39d55fe1d78b3faf0f8017aec62cec42122",
        },
        GoldenVector {
            name: "single byte leaf",
            build: single_leaf,
            cells: 1,
            depth: 0,
            root_data: "03",
            expected_hash: "f3218cb578bfde7b7dd670c2ca9bd50683ce915568556819f14bbbf85bc3a28f",
        },
        GoldenVector {
            name: "one byte over a leaf",
            build: parent_of_leaf,
            cells: 2,
            depth: 1,
            root_data: "01",
            expected_hash: "8b463147d98f0a6838ed515ee850d71764c0961ae6cae45d8a21638a16f018eb",
        },
        GoldenVector {
            name: "three padded bits over a leaf",
            build: unaligned_with_ref,
            cells: 2,
            depth: 1,
            root_data: "b0",
            expected_hash: "4be5ca628b64428da8e3aa414d74f42b4390467c3856599aafb95a670d3c6f25",
        },
        GoldenVector {
            name: "diamond with shared leaf",
            build: diamond_root,
            cells: 4,
            depth: 2,
            root_data: "00",
            expected_hash: "ce40b656638df46173cc9e20ad506d47680d032d6dac3e9d4e90759a39c53fe9",
        },
        GoldenVector {
            name: "hello string",
            build: hello,
            cells: 1,
            depth: 0,
            root_data: "68656c6c6f",
            expected_hash: "7bb5afbf632a0b42ea502c54aeeabe1a74898b968a0ea12e566807c3a0cf5bf1",
        },
    ]
}

/// Build a vector's DAG and report what it produced.
pub fn report_vector(vector: &GoldenVector) -> VectorReport {
    let root = (vector.build)();
    let cells = cellkit_core::topological_sort(&root)
        .map(|sorted| sorted.len())
        .unwrap_or(0);
    VectorReport {
        name: vector.name.to_string(),
        cells,
        depth: root.depth(0),
        root_data: hex::encode(bits_to_padded(root.bits())),
        hash: root.repr_hash().to_hex(),
    }
}

/// Verify all golden vectors.
///
/// Returns `(name, matches, report)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, VectorReport)> {
    all_vectors()
        .iter()
        .map(|v| {
            let report = report_vector(v);
            let matches = report.cells == v.cells
                && report.depth == v.depth
                && report.root_data == v.root_data
                && report.hash == v.expected_hash;
            (v.name.to_string(), matches, report)
        })
        .collect()
}

/// All vector reports as pretty JSON.
pub fn vectors_json() -> serde_json::Result<String> {
    let reports: Vec<VectorReport> = all_vectors().iter().map(report_vector).collect();
    serde_json::to_string_pretty(&reports)
}
