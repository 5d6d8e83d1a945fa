//! Topological ordering of a cell DAG.
//!
//! The sort runs in two passes over per-call bookkeeping:
//!
//! 1. Breadth-first discovery from the root into an insertion-ordered arena
//!    (a vector of nodes plus a hash -> position map). Repeated cells
//!    coalesce on insertion.
//! 2. Depth-first post-order over the arena with an explicit work stack.
//!    Children are visited last to first; meeting a node that is still in
//!    progress means the graph has a cycle.
//!
//! The post-order places every cell after all the cells it references, so a
//! cell's index in the output is its post-order position and the root comes
//! last.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::cell::Cell;
use crate::error::CellError;
use crate::types::CellHash;

/// What the sorter needs from a node: a content hash and its references.
pub trait DagNode: Clone {
    fn node_hash(&self) -> CellHash;
    fn node_refs(&self) -> Vec<Self>;
}

impl DagNode for Arc<Cell> {
    fn node_hash(&self) -> CellHash {
        self.repr_hash()
    }

    fn node_refs(&self) -> Vec<Self> {
        self.refs().to_vec()
    }
}

/// A sorted cell and the output indices of its references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedEntry<N> {
    pub cell: N,
    pub refs: Vec<usize>,
}

/// The output of [`topological_sort`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedCells<N> {
    entries: Vec<SortedEntry<N>>,
}

impl<N> SortedCells<N> {
    pub fn entries(&self) -> &[SortedEntry<N>] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<SortedEntry<N>> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the root: always the last entry.
    pub fn root_index(&self) -> usize {
        self.entries.len().saturating_sub(1)
    }

    /// Reverse the order so the root is at index 0 and references point
    /// forward. Siblings then appear left to right.
    pub fn into_root_first(self) -> Vec<SortedEntry<N>> {
        let last = self.entries.len().saturating_sub(1);
        self.entries
            .into_iter()
            .rev()
            .map(|entry| SortedEntry {
                cell: entry.cell,
                refs: entry.refs.into_iter().map(|i| last - i).collect(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    Enter(usize),
    Leave(usize),
}

/// Order the DAG under `root` so every cell follows the cells it references.
///
/// Fails with [`CellError::NotADag`] if any cell reaches itself.
pub fn topological_sort<N: DagNode>(root: &N) -> Result<SortedCells<N>, CellError> {
    // discovery: arena position is first-visit order
    let mut position: HashMap<CellHash, usize> = HashMap::new();
    let mut nodes: Vec<N> = Vec::new();
    let mut child_hashes: Vec<Vec<CellHash>> = Vec::new();

    let mut pending = VecDeque::from([root.clone()]);
    while let Some(node) = pending.pop_front() {
        let hash = node.node_hash();
        if position.contains_key(&hash) {
            continue;
        }
        let refs = node.node_refs();
        position.insert(hash, nodes.len());
        child_hashes.push(refs.iter().map(N::node_hash).collect());
        nodes.push(node);
        pending.extend(refs);
    }

    // every child hash was discovered, so lookups always succeed
    let children: Vec<Vec<usize>> = child_hashes
        .iter()
        .map(|hashes| hashes.iter().map(|h| position[h]).collect())
        .collect();

    let mut marks = vec![Mark::Unvisited; nodes.len()];
    let mut order: Vec<usize> = Vec::with_capacity(nodes.len());
    let mut stack: Vec<Frame> = Vec::new();

    for start in 0..nodes.len() {
        if marks[start] == Mark::Done {
            continue;
        }
        stack.push(Frame::Enter(start));
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(i) => match marks[i] {
                    Mark::Done => {}
                    Mark::InProgress => return Err(CellError::NotADag),
                    Mark::Unvisited => {
                        marks[i] = Mark::InProgress;
                        stack.push(Frame::Leave(i));
                        // pushed first to last, so the last child is entered first
                        stack.extend(children[i].iter().map(|&c| Frame::Enter(c)));
                    }
                },
                Frame::Leave(i) => {
                    marks[i] = Mark::Done;
                    order.push(i);
                }
            }
        }
    }

    let mut index = vec![0usize; nodes.len()];
    for (out, &arena) in order.iter().enumerate() {
        index[arena] = out;
    }

    let entries = order
        .iter()
        .map(|&arena| SortedEntry {
            cell: nodes[arena].clone(),
            refs: children[arena].iter().map(|&c| index[c]).collect(),
        })
        .collect();

    Ok(SortedCells { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellBuilder;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    fn leaf(byte: u8) -> Arc<Cell> {
        CellBuilder::new().store_uint(byte as u64, 8).unwrap().build().unwrap()
    }

    fn node(tag: u8, children: &[Arc<Cell>]) -> Arc<Cell> {
        let mut b = CellBuilder::new().store_uint(tag as u64, 8).unwrap();
        for c in children {
            b = b.store_ref(c.clone()).unwrap();
        }
        b.build().unwrap()
    }

    fn position_of(sorted: &SortedCells<Arc<Cell>>, cell: &Arc<Cell>) -> usize {
        sorted
            .entries()
            .iter()
            .position(|e| e.cell.repr_hash() == cell.repr_hash())
            .unwrap()
    }

    /// A graph given as adjacency lists, able to express cycles.
    #[derive(Clone, Debug)]
    struct GraphNode {
        id: u32,
        edges: Rc<BTreeMap<u32, Vec<u32>>>,
    }

    impl DagNode for GraphNode {
        fn node_hash(&self) -> CellHash {
            CellHash::digest(&self.id.to_be_bytes())
        }

        fn node_refs(&self) -> Vec<Self> {
            self.edges[&self.id]
                .iter()
                .map(|&id| GraphNode {
                    id,
                    edges: self.edges.clone(),
                })
                .collect()
        }
    }

    fn graph(edges: &[(u32, Vec<u32>)]) -> GraphNode {
        let map: BTreeMap<u32, Vec<u32>> = edges.iter().cloned().collect();
        GraphNode {
            id: edges[0].0,
            edges: Rc::new(map),
        }
    }

    #[test]
    fn test_single_leaf() {
        let root = leaf(1);
        let sorted = topological_sort(&root).unwrap();
        assert_eq!(sorted.len(), 1);
        assert!(sorted.entries()[0].refs.is_empty());
        assert_eq!(sorted.root_index(), 0);
    }

    #[test]
    fn test_diamond() {
        let c = leaf(3);
        let a = node(1, &[c.clone()]);
        let b = node(2, &[c.clone()]);
        let r = node(0, &[a.clone(), b.clone()]);

        let sorted = topological_sort(&r).unwrap();
        assert_eq!(sorted.len(), 4);
        assert_eq!(position_of(&sorted, &c), 0);
        assert_eq!(position_of(&sorted, &r), 3);

        // reverse child visitation enters B before A
        assert_eq!(position_of(&sorted, &b), 1);
        assert_eq!(position_of(&sorted, &a), 2);

        let root = &sorted.entries()[3];
        assert_eq!(root.refs, vec![2, 1]);
        assert_eq!(sorted.entries()[1].refs, vec![0]);
        assert_eq!(sorted.entries()[2].refs, vec![0]);
    }

    #[test]
    fn test_refs_point_backwards() {
        let l1 = leaf(1);
        let l2 = leaf(2);
        let m = node(5, &[l1.clone(), l2.clone(), l1.clone()]);
        let r = node(6, &[m.clone(), l2.clone(), node(7, &[m, l1])]);

        let sorted = topological_sort(&r).unwrap();
        for (i, entry) in sorted.entries().iter().enumerate() {
            assert!(entry.refs.iter().all(|&c| c < i), "entry {i} refs {:?}", entry.refs);
        }
        assert_eq!(sorted.entries().last().unwrap().cell.repr_hash(), r.repr_hash());
    }

    #[test]
    fn test_shared_child_appears_once() {
        let shared = leaf(9);
        let r = node(0, &[node(1, &[shared.clone()]), node(2, &[shared.clone()]), shared.clone()]);
        let sorted = topological_sort(&r).unwrap();
        let hits = sorted
            .entries()
            .iter()
            .filter(|e| e.cell.repr_hash() == shared.repr_hash())
            .count();
        assert_eq!(hits, 1);
        assert_eq!(sorted.len(), 4);
    }

    #[test]
    fn test_root_first_flips_indices() {
        let c = leaf(3);
        let r = node(0, &[node(1, &[c.clone()]), node(2, &[c])]);
        let flipped = topological_sort(&r).unwrap().into_root_first();
        assert_eq!(flipped[0].cell.repr_hash(), r.repr_hash());
        // siblings left to right, shared leaf last
        assert_eq!(flipped[0].refs, vec![1, 2]);
        assert_eq!(flipped[1].refs, vec![3]);
        for (i, entry) in flipped.iter().enumerate() {
            assert!(entry.refs.iter().all(|&c| c > i));
        }
    }

    #[test]
    fn test_self_loop_is_not_a_dag() {
        let g = graph(&[(1, vec![1])]);
        assert_eq!(topological_sort(&g).unwrap_err(), CellError::NotADag);
    }

    #[test]
    fn test_long_cycle_is_not_a_dag() {
        let g = graph(&[(1, vec![2]), (2, vec![3]), (3, vec![4]), (4, vec![2])]);
        assert_eq!(topological_sort(&g).unwrap_err(), CellError::NotADag);
    }

    #[test]
    fn test_graph_dag_sorted() {
        let g = graph(&[(1, vec![2, 3]), (2, vec![4]), (3, vec![4]), (4, vec![])]);
        let sorted = topological_sort(&g).unwrap();
        let ids: Vec<u32> = sorted.entries().iter().map(|e| e.cell.id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let n = 100_000u32;
        let edges: Vec<(u32, Vec<u32>)> = (0..n)
            .map(|i| (i, if i + 1 < n { vec![i + 1] } else { vec![] }))
            .collect();
        let g = GraphNode {
            id: 0,
            edges: Rc::new(edges.into_iter().collect()),
        };
        let sorted = topological_sort(&g).unwrap();
        assert_eq!(sorted.len(), n as usize);
        assert_eq!(sorted.entries()[0].cell.id, n - 1);
        assert_eq!(sorted.entries().last().unwrap().cell.id, 0);
    }
}
