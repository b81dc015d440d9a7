//! System graph with user-declared precedence edges
//!
//! One node per registered system, created at registration. Edges come only
//! from [`Registry::precede`](crate::Registry::precede) and persist across
//! ticks until the registry is reset. The graph is kept acyclic: an edge that
//! would close a cycle is rejected.

use std::any::TypeId;
use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::{EcsError, Result};
use crate::executor::{ExecutionPlan, PlannedNode};
use crate::system::SystemCell;

/// System ID, the node index in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(pub u32);

impl SystemId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

type Neighbors = SmallVec<[SystemId; 4]>;

/// System node in dependency graph
pub(crate) struct SystemNode {
    pub id: SystemId,
    pub name: &'static str,
    pub cell: Arc<dyn SystemCell>,
}

/// Dependency graph for systems
#[derive(Default)]
pub(crate) struct SystemGraph {
    nodes: Vec<SystemNode>,
    by_type: FxHashMap<TypeId, SystemId>,
    edges: FxHashMap<SystemId, Neighbors>,
    reverse_edges: FxHashMap<SystemId, Neighbors>,
}

impl SystemGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node with no edges
    pub fn add_node(&mut self, name: &'static str, type_id: TypeId, cell: Arc<dyn SystemCell>) -> SystemId {
        let id = SystemId(self.nodes.len() as u32);
        self.nodes.push(SystemNode { id, name, cell });
        self.by_type.insert(type_id, id);
        self.edges.insert(id, Neighbors::new());
        self.reverse_edges.insert(id, Neighbors::new());
        id
    }

    pub fn id_of(&self, type_id: TypeId) -> Option<SystemId> {
        self.by_type.get(&type_id).copied()
    }

    pub fn node(&self, id: SystemId) -> Option<&SystemNode> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> &[SystemNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(|targets| targets.len()).sum()
    }

    pub fn successors(&self, id: SystemId) -> &[SystemId] {
        self.edges.get(&id).map(|targets| targets.as_slice()).unwrap_or_default()
    }

    pub fn predecessors(&self, id: SystemId) -> &[SystemId] {
        self.reverse_edges
            .get(&id)
            .map(|sources| sources.as_slice())
            .unwrap_or_default()
    }

    /// Add `before -> after`. Returns false if the edge already existed.
    pub fn add_edge(&mut self, before: SystemId, after: SystemId) -> Result<bool> {
        if self.successors(before).contains(&after) {
            return Ok(false);
        }
        if before == after || self.has_path(after, before) {
            return Err(EcsError::SystemCycleDetected {
                before: self.name_of(before),
                after: self.name_of(after),
            });
        }

        self.edges.entry(before).or_default().push(after);
        self.reverse_edges.entry(after).or_default().push(before);
        Ok(true)
    }

    /// True if `to` is reachable from `from` along edges
    pub fn has_path(&self, from: SystemId, to: SystemId) -> bool {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if std::mem::replace(&mut visited[id.index()], true) {
                continue;
            }
            stack.extend(self.successors(id).iter().copied());
        }
        false
    }

    /// Topological sort (Kahn's algorithm), ties broken by registration order
    pub fn topological_sort(&self) -> Result<Vec<SystemId>> {
        let mut in_degree: FxHashMap<SystemId, usize> = FxHashMap::default();
        let mut queue = VecDeque::new();
        let mut result = Vec::with_capacity(self.nodes.len());

        for node in &self.nodes {
            in_degree.insert(node.id, self.predecessors(node.id).len());
        }

        for node in &self.nodes {
            if in_degree[&node.id] == 0 {
                queue.push_back(node.id);
            }
        }

        while let Some(id) = queue.pop_front() {
            result.push(id);

            for &neighbor in self.successors(id) {
                if let Some(degree) = in_degree.get_mut(&neighbor) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        // add_edge keeps the graph acyclic, so this only trips on corruption
        if result.len() != self.nodes.len() {
            return Err(EcsError::SystemCycleDetected {
                before: "<graph>",
                after: "<graph>",
            });
        }

        Ok(result)
    }

    /// All edges as `(before, after)` name pairs
    pub fn edge_names(&self) -> Vec<(&'static str, &'static str)> {
        let mut pairs = Vec::with_capacity(self.edge_count());
        for node in &self.nodes {
            for &after in self.successors(node.id) {
                pairs.push((node.name, self.name_of(after)));
            }
        }
        pairs
    }

    /// Frozen copy of the graph for one tick
    pub fn plan(&self) -> ExecutionPlan {
        let nodes = self
            .nodes
            .iter()
            .map(|node| PlannedNode {
                name: node.name,
                cell: Arc::clone(&node.cell),
                successors: self.successors(node.id).iter().map(|s| s.index()).collect(),
                in_degree: self.predecessors(node.id).len(),
            })
            .collect();
        ExecutionPlan::new(nodes)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.by_type.clear();
        self.edges.clear();
        self.reverse_edges.clear();
    }

    fn name_of(&self, id: SystemId) -> &'static str {
        self.node(id).map_or("<unknown>", |node| node.name)
    }
}
