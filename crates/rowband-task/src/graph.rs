//! Footprint-derived task dependency graphs.

use indexmap::{IndexMap, IndexSet};
use rowband_core::RegionId;
use smallvec::SmallVec;

use crate::footprint::{BufferRef, Footprint, Span};
use crate::stage::Stage;

/// One schedulable unit of work: a stage applied to one region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskNode {
    /// Stage the task belongs to.
    pub stage: Stage,
    /// Region the task works on.
    pub region: RegionId,
    /// Buffers the task may touch.
    pub footprint: Footprint,
}

/// A DAG over [`TaskNode`]s in program order.
///
/// An edge `i -> j` (always `i < j`) exists iff task `i` precedes task `j`
/// in program order and their footprints conflict. Program order is
/// therefore always a valid topological order.
#[derive(Clone, Debug)]
#[must_use]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
    successors: Vec<SmallVec<[usize; 4]>>,
    predecessors: Vec<SmallVec<[usize; 4]>>,
    edge_count: usize,
}

impl TaskGraph {
    /// Build the graph for `nodes`, given in program order.
    pub fn build(nodes: Vec<TaskNode>) -> Self {
        let n = nodes.len();
        let mut successors: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); n];
        let mut predecessors: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); n];
        let mut edge_count = 0;

        // Spans seen so far, grouped by buffer so only same-buffer pairs
        // are compared.
        let mut seen: IndexMap<BufferRef, Vec<(usize, Span)>> = IndexMap::new();

        for (j, node) in nodes.iter().enumerate() {
            let mut preds: IndexSet<usize> = IndexSet::new();
            for span in node.footprint.spans() {
                if let Some(earlier) = seen.get(&span.buffer) {
                    for (i, other) in earlier {
                        if other.conflicts_with(span) {
                            preds.insert(*i);
                        }
                    }
                }
            }
            for span in node.footprint.spans() {
                seen.entry(span.buffer).or_default().push((j, *span));
            }
            preds.sort_unstable();
            for i in preds {
                successors[i].push(j);
                predecessors[j].push(i);
                edge_count += 1;
            }
        }

        Self {
            nodes,
            successors,
            predecessors,
            edge_count,
        }
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no tasks.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Tasks in program order.
    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    /// Task at index `i`.
    pub fn node(&self, i: usize) -> &TaskNode {
        &self.nodes[i]
    }

    /// Tasks that must wait for task `i`.
    pub fn successors(&self, i: usize) -> &[usize] {
        &self.successors[i]
    }

    /// Tasks task `i` waits for.
    pub fn predecessors(&self, i: usize) -> &[usize] {
        &self.predecessors[i]
    }

    /// Whether task `j` directly depends on task `i`.
    pub fn has_edge(&self, i: usize, j: usize) -> bool {
        self.successors.get(i).is_some_and(|s| s.contains(&j))
    }

    /// Whether task `j` depends on task `i`, directly or transitively.
    pub fn depends_on(&self, j: usize, i: usize) -> bool {
        if i >= j {
            return false;
        }
        let mut stack = vec![j];
        let mut visited = vec![false; self.len()];
        while let Some(k) = stack.pop() {
            for &p in &self.predecessors[k] {
                if p == i {
                    return true;
                }
                if p > i && !visited[p] {
                    visited[p] = true;
                    stack.push(p);
                }
            }
        }
        false
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Number of predecessors of every task.
    pub fn in_degrees(&self) -> Vec<usize> {
        self.predecessors.iter().map(|p| p.len()).collect()
    }

    /// Tasks grouped by longest dependency chain length from a root.
    ///
    /// Every task in a wave depends only on tasks in earlier waves, so the
    /// number of waves is the critical-path length.
    pub fn waves(&self) -> Vec<Vec<usize>> {
        let mut level = vec![0usize; self.len()];
        let mut waves: Vec<Vec<usize>> = Vec::new();
        for j in 0..self.len() {
            let l = self.predecessors[j]
                .iter()
                .map(|&i| level[i] + 1)
                .max()
                .unwrap_or(0);
            level[j] = l;
            if waves.len() <= l {
                waves.resize_with(l + 1, Vec::new);
            }
            waves[l].push(j);
        }
        waves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footprint::{Access, BufferKind};

    fn buf(region: u32) -> BufferRef {
        BufferRef::new(RegionId(region), BufferKind::Current)
    }

    fn task(region: u32, footprint: Footprint) -> TaskNode {
        TaskNode {
            stage: Stage::CurrentReductionY,
            region: RegionId(region),
            footprint,
        }
    }

    #[test]
    fn disjoint_tasks_are_independent() {
        let g = TaskGraph::build(vec![
            task(0, Footprint::new().with_whole(buf(0), Access::ReadWrite)),
            task(1, Footprint::new().with_whole(buf(1), Access::ReadWrite)),
        ]);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.waves(), vec![vec![0, 1]]);
    }

    #[test]
    fn conflicting_tasks_are_ordered() {
        let g = TaskGraph::build(vec![
            task(0, Footprint::new().with(buf(0), 0, 10, Access::Write)),
            task(1, Footprint::new().with(buf(0), 5, 10, Access::Read)),
        ]);
        assert!(g.has_edge(0, 1));
        assert_eq!(g.predecessors(1), &[0]);
        assert_eq!(g.in_degrees(), vec![0, 1]);
    }

    #[test]
    fn multiple_shared_buffers_give_one_edge() {
        let fp = Footprint::new()
            .with_whole(buf(0), Access::Write)
            .with_whole(buf(1), Access::Write);
        let g = TaskGraph::build(vec![task(0, fp.clone()), task(1, fp)]);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn chain_through_boundary_bands() {
        // Task 1 touches the band of region 0 that task 0 wrote; task 2
        // touches region 1 which task 1 also wrote.
        let g = TaskGraph::build(vec![
            task(0, Footprint::new().with(buf(0), 0, 4, Access::ReadWrite)),
            task(
                1,
                Footprint::new()
                    .with(buf(0), 2, 4, Access::ReadWrite)
                    .with(buf(1), 0, 4, Access::ReadWrite),
            ),
            task(2, Footprint::new().with(buf(1), 0, 1, Access::Read)),
        ]);
        assert!(g.depends_on(2, 0));
        assert!(!g.has_edge(0, 2));
        assert_eq!(g.waves().len(), 3);
    }

    #[test]
    fn empty_graph() {
        let g = TaskGraph::build(Vec::new());
        assert!(g.is_empty());
        assert!(g.waves().is_empty());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn span() -> impl Strategy<Value = (u32, usize, usize, u8)> {
            (0u32..3, 0usize..32, 1usize..12, 0u8..3)
        }

        fn footprint() -> impl Strategy<Value = Footprint> {
            prop::collection::vec(span(), 1..4).prop_map(|spans| {
                let mut fp = Footprint::new();
                for (region, offset, len, access) in spans {
                    let access = match access {
                        0 => Access::Read,
                        1 => Access::Write,
                        _ => Access::ReadWrite,
                    };
                    fp.push(buf(region), offset, len, access);
                }
                fp
            })
        }

        proptest! {
            #[test]
            fn every_conflict_is_ordered(fps in prop::collection::vec(footprint(), 1..12)) {
                let nodes: Vec<TaskNode> =
                    fps.iter().cloned().enumerate().map(|(i, fp)| task(i as u32, fp)).collect();
                let g = TaskGraph::build(nodes);
                for j in 0..fps.len() {
                    for i in 0..j {
                        if fps[i].conflicts_with(&fps[j]) {
                            prop_assert!(g.depends_on(j, i), "{i} -> {j} unordered");
                        }
                    }
                    for &s in g.successors(j) {
                        prop_assert!(s > j);
                    }
                }
            }
        }
    }
}
