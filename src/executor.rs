//! Tick execution
//!
//! A tick runs a frozen [`ExecutionPlan`] on a rayon pool. Every node starts as
//! Pending; it is spawned once the last of its predecessors is Done, so
//! independent systems run concurrently while declared edges are honored. The
//! calling thread blocks until every node has finished.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::{Scope, ThreadPool};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::access::Access;
use crate::error::EcsError;
use crate::query::Query;
use crate::registry::Registry;
use crate::system::{SystemAccess, SystemCell};

/// Per-tick state of a graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeState {
    Pending = 0,
    Running = 1,
    Done = 2,
}

impl NodeState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => NodeState::Pending,
            1 => NodeState::Running,
            _ => NodeState::Done,
        }
    }
}

/// Nested parallel work available to a running system.
///
/// Everything spawned through a `Subflow` joins before the call that spawned
/// it returns, so nested work always finishes before the system's node is Done.
pub struct Subflow {
    fan_outs: AtomicUsize,
}

impl Subflow {
    pub(crate) fn new() -> Self {
        Self {
            fan_outs: AtomicUsize::new(0),
        }
    }

    /// Run `op` with a rayon scope; returns once every task spawned on it is done
    pub fn scope<'scope, OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce(&Scope<'scope>) -> R + Send,
        R: Send,
    {
        self.fan_outs.fetch_add(1, Ordering::Relaxed);
        rayon::scope(op)
    }

    /// Run two closures, potentially in parallel
    pub fn join<A, B, RA, RB>(&self, a: A, b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        self.fan_outs.fetch_add(1, Ordering::Relaxed);
        rayon::join(a, b)
    }

    /// Split `items` into chunks of `chunk_size` and process them in parallel.
    ///
    /// `f` receives the offset of the chunk's first element and the chunk.
    pub fn for_each_chunk<T, F>(&self, items: &mut [T], chunk_size: usize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Send + Sync,
    {
        self.fan_outs.fetch_add(1, Ordering::Relaxed);
        let chunk_size = chunk_size.max(1);
        items
            .par_chunks_mut(chunk_size)
            .enumerate()
            .for_each(|(i, chunk)| f(i * chunk_size, chunk));
    }

    /// Number of fan-out calls made so far
    pub fn fan_outs(&self) -> usize {
        self.fan_outs.load(Ordering::Relaxed)
    }
}

/// Per-system timing data for a single tick
#[derive(Debug, Clone)]
pub struct SystemTiming {
    pub name: &'static str,
    pub duration: Duration,
    /// Component types the system touched
    pub access: SystemAccess,
    pub fan_outs: usize,
}

/// Two systems with no ordering between them whose accesses conflicted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConflict {
    pub first: &'static str,
    pub second: &'static str,
}

/// Execution profile for a tick
#[derive(Debug, Clone, Default)]
pub struct ExecutionProfile {
    pub total_frame_time: Duration,
    /// In completion order
    pub system_timings: Vec<SystemTiming>,
    pub conflicts: Vec<AccessConflict>,
}

impl ExecutionProfile {
    pub fn timing(&self, name: &str) -> Option<&SystemTiming> {
        self.system_timings.iter().find(|t| t.name == name)
    }

    /// System names in the order they finished
    pub fn completion_order(&self) -> Vec<&'static str> {
        self.system_timings.iter().map(|t| t.name).collect()
    }
}

/// Aggregated timings for one system across ticks
#[derive(Debug, Clone)]
pub struct SystemStats {
    pub min: Duration,
    pub max: Duration,
    pub avg: Duration,
    pub call_count: u64,
}

/// System profiler for collecting timing data
#[derive(Default)]
pub struct SystemProfiler {
    totals: FxHashMap<&'static str, (Duration, Duration, Duration, u64)>,
}

impl SystemProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_execution(&mut self, name: &'static str, duration: Duration) {
        let entry = self
            .totals
            .entry(name)
            .or_insert((Duration::MAX, Duration::ZERO, Duration::ZERO, 0));
        entry.0 = entry.0.min(duration);
        entry.1 = entry.1.max(duration);
        entry.2 += duration;
        entry.3 += 1;
    }

    pub fn record_profile(&mut self, profile: &ExecutionProfile) {
        for timing in &profile.system_timings {
            self.record_execution(timing.name, timing.duration);
        }
    }

    pub fn get_stats(&self, name: &str) -> Option<SystemStats> {
        let &(min, max, total, call_count) = self.totals.get(name)?;
        if call_count == 0 {
            return None;
        }

        Some(SystemStats {
            min,
            max,
            avg: total / call_count as u32,
            call_count,
        })
    }

    pub fn clear(&mut self) {
        self.totals.clear();
    }
}

/// Graph node frozen for one tick
pub(crate) struct PlannedNode {
    pub name: &'static str,
    pub cell: Arc<dyn SystemCell>,
    pub successors: SmallVec<[usize; 4]>,
    pub in_degree: usize,
}

/// Snapshot of the system graph, detached from the registry's lock
pub(crate) struct ExecutionPlan {
    nodes: Vec<PlannedNode>,
}

/// Result of one tick
pub(crate) struct TickOutcome {
    pub profile: ExecutionProfile,
    pub errors: Vec<EcsError>,
    pub states: Vec<NodeState>,
}

impl ExecutionPlan {
    pub fn new(nodes: Vec<PlannedNode>) -> Self {
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes without predecessors
    pub fn roots(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| self.nodes[i].in_degree == 0)
            .collect()
    }

    /// True if `to` is reachable from `from`
    pub fn reaches(&self, from: usize, to: usize) -> bool {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];
        while let Some(index) = stack.pop() {
            if index == to {
                return true;
            }
            if std::mem::replace(&mut visited[index], true) {
                continue;
            }
            stack.extend(self.nodes[index].successors.iter().copied());
        }
        false
    }

    /// Run every node once and block until the graph has drained
    pub fn execute(&self, registry: &Registry, pool: Option<&ThreadPool>) -> TickOutcome {
        let tick = TickState {
            plan: self,
            registry,
            pending: self.nodes.iter().map(|n| AtomicUsize::new(n.in_degree)).collect(),
            states: self.nodes.iter().map(|_| AtomicU8::new(NodeState::Pending as u8)).collect(),
            records: Mutex::new(Vec::with_capacity(self.nodes.len())),
        };

        let start = Instant::now();
        match pool {
            Some(pool) => pool.scope(|scope| tick.spawn_roots(scope)),
            None => rayon::scope(|scope| tick.spawn_roots(scope)),
        }
        let total_frame_time = start.elapsed();

        let states = tick
            .states
            .iter()
            .map(|s| NodeState::from_u8(s.load(Ordering::Acquire)))
            .collect();
        let records = tick.records.into_inner();
        let conflicts = self.find_conflicts(&records);

        let mut errors = Vec::new();
        let mut system_timings = Vec::with_capacity(records.len());
        for record in records {
            if let Some(err) = record.error {
                errors.push(err);
            }
            system_timings.push(record.timing);
        }

        TickOutcome {
            profile: ExecutionProfile {
                total_frame_time,
                system_timings,
                conflicts,
            },
            errors,
            states,
        }
    }

    fn find_conflicts(&self, records: &[NodeRecord]) -> Vec<AccessConflict> {
        let mut by_node: Vec<Option<&SystemAccess>> = vec![None; self.nodes.len()];
        for record in records {
            by_node[record.index] = Some(&record.timing.access);
        }

        let mut conflicts = Vec::new();
        for i in 0..self.nodes.len() {
            for j in (i + 1)..self.nodes.len() {
                let (Some(a), Some(b)) = (by_node[i], by_node[j]) else {
                    continue;
                };
                if a.conflicts_with(b) && !self.reaches(i, j) && !self.reaches(j, i) {
                    conflicts.push(AccessConflict {
                        first: self.nodes[i].name,
                        second: self.nodes[j].name,
                    });
                }
            }
        }
        conflicts
    }
}

struct NodeRecord {
    index: usize,
    timing: SystemTiming,
    error: Option<EcsError>,
}

struct TickState<'p, 'r> {
    plan: &'p ExecutionPlan,
    registry: &'r Registry,
    pending: Vec<AtomicUsize>,
    states: Vec<AtomicU8>,
    records: Mutex<Vec<NodeRecord>>,
}

impl<'p, 'r> TickState<'p, 'r> {
    fn spawn_roots<'s>(&'s self, scope: &Scope<'s>) {
        for root in self.plan.roots() {
            self.spawn(scope, root);
        }
    }

    fn spawn<'s>(&'s self, scope: &Scope<'s>, index: usize) {
        scope.spawn(move |scope| {
            self.execute_node(index);

            // Whoever drops a successor's count to zero schedules it
            for &next in &self.plan.nodes[index].successors {
                if self.pending[next].fetch_sub(1, Ordering::AcqRel) == 1 {
                    self.spawn(scope, next);
                }
            }
        });
    }

    fn execute_node(&self, index: usize) {
        let node = &self.plan.nodes[index];
        self.states[index].store(NodeState::Running as u8, Ordering::Release);

        #[cfg(feature = "profiling")]
        let _span = tracing::info_span!("system", name = node.name).entered();

        let access = Access::new(self.registry);
        let query = Query::new(self.registry);
        let subflow = Subflow::new();

        let start = Instant::now();
        let result = node.cell.run_locked(&access, &query, &subflow);
        let duration = start.elapsed();

        let error = result.err().map(|source| {
            tracing::debug!(system = node.name, error = %source, "system failed");
            EcsError::SystemFailed {
                system: node.name,
                source: Box::new(source),
            }
        });

        self.records.lock().push(NodeRecord {
            index,
            timing: SystemTiming {
                name: node.name,
                duration,
                access: access.into_observed(),
                fan_outs: subflow.fan_outs(),
            },
            error,
        });
        self.states[index].store(NodeState::Done as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiler_aggregates() {
        let mut profiler = SystemProfiler::new();
        profiler.record_execution("physics", Duration::from_millis(2));
        profiler.record_execution("physics", Duration::from_millis(4));

        let stats = profiler.get_stats("physics").unwrap();
        assert_eq!(stats.min, Duration::from_millis(2));
        assert_eq!(stats.max, Duration::from_millis(4));
        assert_eq!(stats.avg, Duration::from_millis(3));
        assert_eq!(stats.call_count, 2);

        assert!(profiler.get_stats("render").is_none());
        profiler.clear();
        assert!(profiler.get_stats("physics").is_none());
    }

    #[test]
    fn test_subflow_chunks_cover_all_items() {
        let subflow = Subflow::new();
        let mut items: Vec<usize> = vec![0; 1000];
        subflow.for_each_chunk(&mut items, 64, |offset, chunk| {
            for (i, item) in chunk.iter_mut().enumerate() {
                *item = offset + i;
            }
        });
        assert!(items.iter().enumerate().all(|(i, &v)| i == v));

        let (a, b) = subflow.join(|| 1, || 2);
        assert_eq!(a + b, 3);

        let total = AtomicUsize::new(0);
        subflow.scope(|s| {
            for _ in 0..8 {
                s.spawn(|_| {
                    total.fetch_add(1, Ordering::Relaxed);
                });
            }
        });
        assert_eq!(total.load(Ordering::Relaxed), 8);
        assert_eq!(subflow.fan_outs(), 3);
    }

    #[test]
    fn test_empty_plan_executes() {
        let registry = Registry::new();
        let outcome = ExecutionPlan::new(Vec::new()).execute(&registry, None);
        assert!(outcome.errors.is_empty());
        assert!(outcome.profile.system_timings.is_empty());
        assert!(outcome.states.is_empty());
    }
}
