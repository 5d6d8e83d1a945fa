//! Proptest generators for property-based testing.

use std::sync::Arc;

use proptest::prelude::*;

use cellkit_core::{BitString, Cell, LevelMask, MAX_CELL_BITS};

use crate::fixtures::DagFixture;

/// Generate a bit string of up to `max_bits` bits with random content.
pub fn bit_string(max_bits: usize) -> impl Strategy<Value = BitString> {
    (0..=max_bits).prop_flat_map(|len| {
        prop::collection::vec(any::<u8>(), len.div_ceil(8))
            .prop_filter_map("length fits buffer", move |bytes| {
                BitString::new(bytes.into(), len).ok()
            })
    })
}

/// Generate a bit string that fits a single cell.
pub fn cell_bits() -> impl Strategy<Value = BitString> {
    bit_string(MAX_CELL_BITS)
}

/// Generate any of the eight level masks.
pub fn level_mask() -> impl Strategy<Value = LevelMask> {
    (0u8..=7).prop_map(LevelMask::new)
}

/// Generate a level in 0..=3.
pub fn level() -> impl Strategy<Value = u8> {
    0u8..=3
}

/// Generate text of up to `max_chars` characters, multi-byte included.
pub fn text(max_chars: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(any::<char>(), 0..=max_chars).prop_map(|chars| chars.into_iter().collect())
}

/// Parameters for generating a random DAG.
#[derive(Debug, Clone)]
pub struct DagParams {
    pub seed: u64,
    pub cells: usize,
    pub max_refs: usize,
}

impl Arbitrary for DagParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<u64>(), // seed
            1usize..=200, // cells
            0usize..=4,   // max refs
        )
            .prop_map(|(seed, cells, max_refs)| DagParams {
                seed,
                cells,
                max_refs,
            })
            .boxed()
    }
}

/// Build the DAG described by `params`.
pub fn dag_from_params(params: &DagParams) -> Arc<Cell> {
    DagFixture::with_seed(params.seed).random_dag(params.cells, params.max_refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellkit_core::{topological_sort, CellBuilder};

    proptest! {
        #[test]
        fn test_dag_from_params_deterministic(params: DagParams) {
            let d1 = dag_from_params(&params);
            let d2 = dag_from_params(&params);
            prop_assert_eq!(d1.repr_hash(), d2.repr_hash());
        }

        #[test]
        fn test_random_dag_sorts(params: DagParams) {
            let root = dag_from_params(&params);
            let sorted = topological_sort(&root).unwrap();
            prop_assert_eq!(sorted.entries()[sorted.root_index()].cell.repr_hash(), root.repr_hash());
            for (i, entry) in sorted.entries().iter().enumerate() {
                prop_assert!(entry.refs.iter().all(|&c| c < i));
            }
        }

        #[test]
        fn test_cell_hash_differs_with_payload(a in bit_string(256), b in bit_string(256)) {
            prop_assume!(a != b);
            let c1 = CellBuilder::new().store_bits(&a).unwrap().build().unwrap();
            let c2 = CellBuilder::new().store_bits(&b).unwrap().build().unwrap();
            prop_assert_ne!(c1.repr_hash(), c2.repr_hash());
        }
    }
}
