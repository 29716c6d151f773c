//! Dependency graph of atomic tasks, their topological levels, and
//! cascade-failure propagation.

use crate::error::AoTError;
use std::collections::{HashMap, HashSet, VecDeque};

/// Lifecycle status of one task in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Added to the graph, not yet eligible to run (unsatisfied
    /// dependencies, or levels not yet computed).
    Pending,
    /// All dependencies have completed; eligible for dispatch.
    Ready,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Complete,
    /// Finished with an error.
    Failed,
    /// Never ran because a dependency failed (cascade).
    Skipped,
}

/// One atomic task in the graph.
#[derive(Debug, Clone)]
pub struct AoTNode {
    /// Unique task identifier.
    pub id: String,
    /// Ids of tasks that must complete before this one may run.
    pub dependencies: Vec<String>,
    /// Paths this task will write, for conflict checking and file
    /// claims. Advisory only — the graph does not enforce it.
    pub writes: Vec<String>,
    /// Paths this task will only read. Readers may coexist with other
    /// readers of the same path; they conflict only against a writer.
    pub reads: Vec<String>,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Topological level (0 = no dependencies), assigned by
    /// [`AoTGraph::compute_levels`]. `None` until computed.
    pub level: Option<usize>,
}

impl AoTNode {
    fn new(id: String, dependencies: Vec<String>, writes: Vec<String>, reads: Vec<String>) -> Self {
        Self {
            id,
            dependencies,
            writes,
            reads,
            status: TaskStatus::Pending,
            level: None,
        }
    }
}

/// Summary counts over a graph's task statuses, for observability.
#[derive(Debug, Clone, Default)]
pub struct AoTSummary {
    /// Total number of tasks.
    pub total: usize,
    /// Tasks not yet started.
    pub pending: usize,
    /// Tasks eligible to run.
    pub ready: usize,
    /// Tasks currently running.
    pub running: usize,
    /// Tasks completed successfully.
    pub complete: usize,
    /// Tasks that failed.
    pub failed: usize,
    /// Tasks skipped due to a failed dependency.
    pub skipped: usize,
    /// Number of topological levels, if computed.
    pub levels: Option<usize>,
}

/// A DAG of atomic tasks. Nodes are added with [`AoTGraph::add_task`],
/// topological levels computed with [`AoTGraph::compute_levels`], and
/// execution progress tracked with `mark_*`.
#[derive(Debug, Default)]
pub struct AoTGraph {
    nodes: HashMap<String, AoTNode>,
    /// Insertion order, for deterministic iteration independent of
    /// `HashMap`'s hashing.
    order: Vec<String>,
    /// dependency id -> ids of tasks that depend on it. Built lazily by
    /// `compute_levels` and used for cascade-skip on failure.
    dependents: HashMap<String, Vec<String>>,
    levels_computed: bool,
}

impl AoTGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task. `dependencies` may reference tasks not yet added —
    /// they are validated when [`AoTGraph::compute_levels`] runs.
    /// `writes` and `reads` are the task's target-file set and
    /// read-file set, respectively (a write claim blocks other write
    /// claims on the same path; read claims are compatible with other
    /// read claims but exclusive against writes).
    pub fn add_task(
        &mut self,
        id: impl Into<String>,
        dependencies: Vec<String>,
        writes: Vec<String>,
        reads: Vec<String>,
    ) {
        let id = id.into();
        self.levels_computed = false;
        if !self.nodes.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.nodes
            .insert(id.clone(), AoTNode::new(id, dependencies, writes, reads));
    }

    /// Number of tasks in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a task by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&AoTNode> {
        self.nodes.get(id)
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut AoTNode, AoTError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| AoTError::TaskNotFound(id.to_string()))
    }

    /// Assign a topological level to every task via Kahn's algorithm.
    ///
    /// A task's level is one more than the maximum level of its
    /// dependencies (0 if it has none). Tasks reachable at level 0 or
    /// above once dependencies resolve transition from `Pending` to
    /// `Ready`.
    ///
    /// # Errors
    /// [`AoTError::UnknownDependency`] if a dependency id was never
    /// added. [`AoTError::CycleDetected`] if the graph is not a DAG.
    #[tracing::instrument(skip(self), fields(tasks = self.nodes.len()))]
    pub fn compute_levels(&mut self) -> Result<(), AoTError> {
        for id in &self.order {
            let node = &self.nodes[id];
            for dep in &node.dependencies {
                if !self.nodes.contains_key(dep) {
                    return Err(AoTError::UnknownDependency {
                        task: id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        let mut in_degree: HashMap<String, usize> = HashMap::new();
        for id in &self.order {
            let node = &self.nodes[id];
            in_degree.insert(id.clone(), node.dependencies.len());
            for dep in &node.dependencies {
                dependents.entry(dep.clone()).or_default().push(id.clone());
            }
        }

        let mut levels: HashMap<String, usize> = HashMap::new();
        let mut queue: VecDeque<String> = self
            .order
            .iter()
            .filter(|id| in_degree[*id] == 0)
            .cloned()
            .collect();
        for id in &queue {
            levels.insert(id.clone(), 0);
        }

        let mut processed = 0usize;
        while let Some(id) = queue.pop_front() {
            processed += 1;
            let level = levels[&id];
            if let Some(deps) = dependents.get(&id) {
                for dependent in deps {
                    let entry = levels.entry(dependent.clone()).or_insert(0);
                    *entry = (*entry).max(level + 1);
                    let degree = in_degree.get_mut(dependent).unwrap();
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent.clone());
                    }
                }
            }
        }

        if processed != self.nodes.len() {
            return Err(AoTError::CycleDetected);
        }

        for id in &self.order {
            let level = levels[id];
            let node = self.nodes.get_mut(id).unwrap();
            node.level = Some(level);
            if node.dependencies.is_empty() {
                node.status = TaskStatus::Ready;
            }
        }
        self.dependents = dependents;
        self.levels_computed = true;
        Ok(())
    }

    /// Tasks grouped by level, ascending, each level sorted by insertion
    /// order. Requires [`AoTGraph::compute_levels`] to have run.
    ///
    /// # Errors
    /// [`AoTError::CycleDetected`] if levels have not been computed.
    pub fn get_execution_order(&self) -> Result<Vec<Vec<String>>, AoTError> {
        if !self.levels_computed {
            return Err(AoTError::CycleDetected);
        }
        let max_level = self
            .nodes
            .values()
            .filter_map(|n| n.level)
            .max()
            .unwrap_or(0);
        let mut batches = vec![Vec::new(); max_level + 1];
        for id in &self.order {
            let node = &self.nodes[id];
            if let Some(level) = node.level {
                batches[level].push(id.clone());
            }
        }
        Ok(batches)
    }

    /// Tasks currently eligible to run: status `Ready`, or `Pending` with
    /// every dependency `Complete`.
    #[must_use]
    pub fn get_ready_batch(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| {
                let node = &self.nodes[*id];
                matches!(node.status, TaskStatus::Ready)
                    || (matches!(node.status, TaskStatus::Pending)
                        && node
                            .dependencies
                            .iter()
                            .all(|d| matches!(self.nodes.get(d), Some(n) if n.status == TaskStatus::Complete)))
            })
            .cloned()
            .collect()
    }

    /// Mark a task as running.
    ///
    /// # Errors
    /// [`AoTError::TaskNotFound`] if `id` is not in the graph.
    pub fn mark_running(&mut self, id: &str) -> Result<(), AoTError> {
        self.node_mut(id)?.status = TaskStatus::Running;
        Ok(())
    }

    /// Mark a task complete and promote any dependents whose remaining
    /// dependencies are now all satisfied from `Pending` to `Ready`.
    ///
    /// # Errors
    /// [`AoTError::TaskNotFound`] if `id` is not in the graph.
    pub fn mark_complete(&mut self, id: &str) -> Result<(), AoTError> {
        self.node_mut(id)?.status = TaskStatus::Complete;
        if let Some(dependents) = self.dependents.get(id).cloned() {
            for dependent in dependents {
                let ready = self.nodes[&dependent]
                    .dependencies
                    .iter()
                    .all(|d| self.nodes.get(d).map(|n| n.status == TaskStatus::Complete).unwrap_or(false));
                if ready {
                    if let Some(node) = self.nodes.get_mut(&dependent) {
                        if node.status == TaskStatus::Pending {
                            node.status = TaskStatus::Ready;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Mark a task failed and cascade-skip every transitive dependent via
    /// a reverse-edge BFS — a task that can never run because its
    /// dependency failed is `Skipped`, not silently left `Pending`.
    ///
    /// # Errors
    /// [`AoTError::TaskNotFound`] if `id` is not in the graph.
    #[tracing::instrument(skip(self))]
    pub fn mark_failed(&mut self, id: &str) -> Result<Vec<String>, AoTError> {
        self.node_mut(id)?.status = TaskStatus::Failed;
        let mut skipped = Vec::new();
        let mut queue: VecDeque<String> = self.dependents.get(id).cloned().unwrap_or_default().into();
        let mut seen: HashSet<String> = HashSet::new();
        while let Some(dep_id) = queue.pop_front() {
            if !seen.insert(dep_id.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get_mut(&dep_id) {
                if matches!(node.status, TaskStatus::Complete | TaskStatus::Failed) {
                    continue;
                }
                node.status = TaskStatus::Skipped;
                skipped.push(dep_id.clone());
            }
            if let Some(next) = self.dependents.get(&dep_id) {
                for n in next {
                    queue.push_back(n.clone());
                }
            }
        }
        Ok(skipped)
    }

    /// The longest dependency chain by level, from a root task to the
    /// deepest task it (transitively) gates. Empty if levels have not
    /// been computed or the graph is empty.
    #[must_use]
    pub fn get_critical_path(&self) -> Vec<String> {
        if !self.levels_computed || self.nodes.is_empty() {
            return Vec::new();
        }
        let Some(deepest) = self
            .order
            .iter()
            .max_by_key(|id| self.nodes[*id].level.unwrap_or(0))
            .cloned()
        else {
            return Vec::new();
        };

        let mut path = vec![deepest.clone()];
        let mut current = deepest;
        loop {
            let node = &self.nodes[&current];
            let level = node.level.unwrap_or(0);
            if level == 0 || node.dependencies.is_empty() {
                break;
            }
            let Some(next) = node
                .dependencies
                .iter()
                .find(|d| self.nodes.get(*d).and_then(|n| n.level) == Some(level - 1))
                .cloned()
            else {
                break;
            };
            path.push(next.clone());
            current = next;
        }
        path.reverse();
        path
    }

    /// Counts of tasks in each status, plus the number of levels if
    /// computed.
    #[must_use]
    pub fn summary(&self) -> AoTSummary {
        let mut s = AoTSummary {
            total: self.nodes.len(),
            ..Default::default()
        };
        let mut max_level = None;
        for node in self.nodes.values() {
            match node.status {
                TaskStatus::Pending => s.pending += 1,
                TaskStatus::Ready => s.ready += 1,
                TaskStatus::Running => s.running += 1,
                TaskStatus::Complete => s.complete += 1,
                TaskStatus::Failed => s.failed += 1,
                TaskStatus::Skipped => s.skipped += 1,
            }
            if let Some(l) = node.level {
                max_level = Some(max_level.map_or(l, |m: usize| m.max(l)));
            }
        }
        s.levels = max_level.map(|m| m + 1);
        s
    }
}
