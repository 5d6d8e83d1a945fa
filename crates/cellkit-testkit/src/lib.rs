//! # Cellkit Testkit
//!
//! Testing utilities for cellkit.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Small DAGs with pinned hashes, depths and payloads
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Common DAG shapes and a seeded random DAG builder
//!
//! ## Golden Vectors
//!
//! ```rust
//! use cellkit_testkit::vectors::{all_vectors, report_vector};
//!
//! for vector in all_vectors() {
//!     let report = report_vector(&vector);
//!     println!("{}: {}", vector.name, report.hash);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use cellkit_testkit::generators::{dag_from_params, DagParams};
//!
//! proptest! {
//!     #[test]
//!     fn root_hash_is_deterministic(params: DagParams) {
//!         prop_assert_eq!(dag_from_params(&params).repr_hash(), dag_from_params(&params).repr_hash());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use cellkit_testkit::fixtures::{diamond, DagFixture};
//!
//! let d = diamond();
//! assert_eq!(d.root.refs().len(), 2);
//!
//! let random = DagFixture::with_seed(1).random_dag(20, 2);
//! assert!(random.depth(0) < 20);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{chain, diamond, leaf, node, pruned_proof, DagFixture, Diamond};
pub use generators::{dag_from_params, DagParams};
pub use vectors::{all_vectors, report_vector, verify_all_vectors, GoldenVector, VectorReport};
