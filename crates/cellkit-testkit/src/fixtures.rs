//! Test fixtures and helpers.
//!
//! Common DAG shapes for unit and integration tests. Builders here panic on
//! failure; inputs are always within cell limits.

use std::sync::Arc;

use cellkit_core::exotic::merkle_proof_payload;
use cellkit_core::{Cell, CellBuilder, MAX_REFS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// An ordinary cell holding one byte.
pub fn leaf(byte: u8) -> Arc<Cell> {
    CellBuilder::new()
        .store_uint(byte as u64, 8)
        .and_then(CellBuilder::build)
        .expect("one byte fits a cell")
}

/// An ordinary cell holding one byte and referencing `children` in order.
pub fn node(tag: u8, children: &[Arc<Cell>]) -> Arc<Cell> {
    let mut builder = CellBuilder::new()
        .store_uint(tag as u64, 8)
        .expect("one byte fits a cell");
    for child in children {
        builder = builder.store_ref(child.clone()).expect("at most four children");
    }
    builder.build().expect("ordinary cell")
}

/// R -> {A, B} -> C, with A and B sharing C.
#[derive(Debug, Clone)]
pub struct Diamond {
    pub root: Arc<Cell>,
    pub a: Arc<Cell>,
    pub b: Arc<Cell>,
    pub c: Arc<Cell>,
}

pub fn diamond() -> Diamond {
    let c = leaf(3);
    let a = node(1, &[c.clone()]);
    let b = node(2, &[c.clone()]);
    let root = node(0, &[a.clone(), b.clone()]);
    Diamond { root, a, b, c }
}

/// A linear chain of `len` cells; the returned head has depth `len - 1`.
pub fn chain(len: usize) -> Arc<Cell> {
    let mut cell = leaf(0);
    for i in 1..len {
        cell = node((i % 256) as u8, &[cell]);
    }
    cell
}

/// A Merkle proof over a tree whose left subtree is pruned at level 1.
pub fn pruned_proof() -> Arc<Cell> {
    let hidden = node(1, &[leaf(2), leaf(4)]);
    let tree = node(5, &[hidden.prune(1).expect("prune"), leaf(9)]);
    let payload = merkle_proof_payload(&tree).expect("proof payload");
    Cell::new(true, payload, vec![tree]).expect("merkle proof")
}

/// Seeded generator of random ordinary cells and DAGs.
pub struct DagFixture {
    rng: StdRng,
}

impl DagFixture {
    /// Create a fixture with a random seed.
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Create with a deterministic seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A leaf with a random payload of up to 64 bits.
    pub fn leaf(&mut self) -> Arc<Cell> {
        self.node(&[])
    }

    /// A cell with a random payload of up to 64 bits over `children`.
    pub fn node(&mut self, children: &[Arc<Cell>]) -> Arc<Cell> {
        let bits = self.rng.gen_range(0..=64usize);
        let value = if bits == 64 {
            self.rng.gen::<u64>()
        } else {
            self.rng.gen::<u64>() & ((1u64 << bits) - 1)
        };
        let mut builder = CellBuilder::new()
            .store_uint(value, bits)
            .expect("value fits its width");
        for child in children {
            builder = builder.store_ref(child.clone()).expect("at most four children");
        }
        builder.build().expect("ordinary cell")
    }

    /// A random DAG of `cells` built cells; each picks up to `max_refs`
    /// children among the cells built before it. Returns the last one.
    pub fn random_dag(&mut self, cells: usize, max_refs: usize) -> Arc<Cell> {
        let mut pool = vec![self.leaf()];
        for _ in 1..cells {
            let limit = max_refs.min(MAX_REFS).min(pool.len());
            let count = self.rng.gen_range(0..=limit);
            let children: Vec<Arc<Cell>> = (0..count)
                .map(|_| pool[self.rng.gen_range(0..pool.len())].clone())
                .collect();
            let cell = self.node(&children);
            pool.push(cell);
        }
        pool.pop().expect("pool starts with a leaf")
    }
}

impl Default for DagFixture {
    fn default() -> Self {
        Self::new()
    }
}
