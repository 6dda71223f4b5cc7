//! Single-writer maintenance engine of the graph.
//!
//! Callers enqueue inserts and removes from any thread. A build loop, run by
//! one thread at a time, applies the requests in submission order and keeps
//! the graph degree-regular and close to an RNG.
//!
//! # Build loop
//!
//! ```text
//! add/remove ──▶ TaskQueue ──pop oldest──▶ extend / shrink ──▶ swap tries
//!                   ▲                            │ (graph write lock)
//!                   └──── wakeup (Condvar) ◀─────┴──▶ on_change + watch
//! ```

mod config;
mod extend;
mod improve;
mod queue;
pub mod reachability;
mod shrink;

pub use config::{DesignerConfig, ExtendSchema};

use crate::analysis;
use crate::graph::{Label, RegularGraph};
use crate::{GraphError, Result};
use deg_feature::FeatureVector;
use parking_lot::{Condvar, Mutex, RwLock};
use queue::{Task, TaskQueue};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// How long an idle build loop parks before re-checking the stop flag.
const IDLE_WAIT: Duration = Duration::from_millis(50);

/// Progress of a build loop, reported after every step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStatus {
    /// Loop iterations so far.
    pub step: u64,
    /// Applied inserts.
    pub added: u64,
    /// Applied removals.
    pub deleted: u64,
    /// Successful edge improvements.
    pub improved: u64,
    /// Attempted edge improvements.
    pub tries: u64,
    /// Label inserted in this step.
    pub last_add: Option<Label>,
    /// Label removed in this step.
    pub last_delete: Option<Label>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildMode {
    UntilStopped,
    UntilIdle,
}

/// Queues graph changes and applies them in a build loop.
pub struct GraphDesigner {
    graph: Arc<RwLock<RegularGraph>>,
    config: RwLock<DesignerConfig>,
    queue: Mutex<TaskQueue>,
    wakeup: Condvar,
    stop_requested: AtomicBool,
    /// Held for a whole build run, one loop at a time.
    build_rng: Mutex<StdRng>,
    status: watch::Sender<BuildStatus>,
}

impl GraphDesigner {
    /// Create a designer for a shared graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not fit the graph degree.
    pub fn new(graph: Arc<RwLock<RegularGraph>>, config: DesignerConfig) -> Result<Self> {
        config.validate(graph.read().edges_per_vertex())?;
        let (status, _) = watch::channel(BuildStatus::default());
        Ok(Self {
            build_rng: Mutex::new(StdRng::seed_from_u64(config.seed)),
            graph,
            config: RwLock::new(config),
            queue: Mutex::new(TaskQueue::default()),
            wakeup: Condvar::new(),
            stop_requested: AtomicBool::new(false),
            status,
        })
    }

    /// The graph maintained by this designer.
    pub fn graph(&self) -> &Arc<RwLock<RegularGraph>> {
        &self.graph
    }

    pub fn config(&self) -> DesignerConfig {
        self.config.read().clone()
    }

    /// Replace the configuration. A running build loop picks it up with its
    /// next step.
    pub fn set_config(&self, config: DesignerConfig) -> Result<()> {
        config.validate(self.graph.read().edges_per_vertex())?;
        *self.config.write() = config;
        Ok(())
    }

    /// Queue the insertion of a vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if the feature does not match the feature space, or
    /// if the label exists once all queued requests are applied.
    pub fn add(&self, label: Label, feature: FeatureVector) -> Result<()> {
        self.graph.read().space().validate(&feature)?;

        let mut queue = self.queue.lock();
        if self.exists(&queue, label) {
            return Err(GraphError::DuplicateLabel(label));
        }
        queue.push_add(label, feature);
        drop(queue);

        self.wakeup.notify_one();
        Ok(())
    }

    /// Queue the removal of a vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if the label does not exist once all queued requests
    /// are applied.
    pub fn remove(&self, label: Label) -> Result<()> {
        let mut queue = self.queue.lock();
        if !self.exists(&queue, label) {
            return Err(GraphError::UnknownLabel(label));
        }
        queue.push_remove(label);
        drop(queue);

        self.wakeup.notify_one();
        Ok(())
    }

    /// Queue the removal of every vertex whose label matches `predicate`.
    ///
    /// Returns the number of queued removals.
    pub fn remove_if<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(Label) -> bool,
    {
        let labels: Vec<Label> = self.graph.read().labels().collect();
        labels
            .into_iter()
            .filter(|&label| predicate(label))
            .filter(|&label| self.remove(label).is_ok())
            .count()
    }

    /// Number of requests not yet applied.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    fn exists(&self, queue: &TaskQueue, label: Label) -> bool {
        queue
            .pending_state(label)
            .unwrap_or_else(|| self.graph.read().contains_label(label))
    }

    /// Run the build loop until [`stop`](Self::stop) is called.
    ///
    /// `on_change` is called after every step. The same status is published
    /// to the receivers of [`subscribe`](Self::subscribe).
    ///
    /// # Errors
    ///
    /// Returns an error on an internal consistency failure, which ends the
    /// loop.
    pub fn build<F>(&self, on_change: F) -> Result<BuildStatus>
    where
        F: FnMut(&BuildStatus),
    {
        self.run(BuildMode::UntilStopped, on_change)
    }

    /// Apply all queued requests and return.
    pub fn build_until_idle<F>(&self, on_change: F) -> Result<BuildStatus>
    where
        F: FnMut(&BuildStatus),
    {
        self.run(BuildMode::UntilIdle, on_change)
    }

    /// Ask the build loop to stop after its current step.
    ///
    /// The request stays set until a build loop observes it.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        // take the queue lock so a loop about to park cannot miss the signal
        let _queue = self.queue.lock();
        self.wakeup.notify_all();
    }

    /// Receive the status of every build step.
    pub fn subscribe(&self) -> watch::Receiver<BuildStatus> {
        self.status.subscribe()
    }

    fn run<F>(&self, mode: BuildMode, mut on_change: F) -> Result<BuildStatus>
    where
        F: FnMut(&BuildStatus),
    {
        let mut rng = self.build_rng.lock();
        let mut status = BuildStatus::default();
        tracing::info!(?mode, pending = self.pending(), "build loop started");

        loop {
            if self.stop_requested.swap(false, Ordering::AcqRel) {
                break;
            }
            let config = self.config.read().clone();

            let task = {
                let mut queue = self.queue.lock();
                match queue.pop_oldest() {
                    Some(task) => Some(task),
                    None if mode == BuildMode::UntilIdle => break,
                    None if config.swap_tries == 0 || config.improve_k == 0 => {
                        if !self.stop_requested.load(Ordering::Acquire) {
                            self.wakeup.wait_for(&mut queue, IDLE_WAIT);
                        }
                        continue;
                    }
                    None => None,
                }
            };

            let mut graph = self.graph.write();
            let applied = task.map(|task| {
                let (label, manipulation) = (task.label(), task.manipulation());
                let result = match task {
                    Task::Add(add) => {
                        let result =
                            extend::extend_graph(&mut graph, &config, &mut *rng, label, add.feature);
                        if result.is_ok() {
                            status.added += 1;
                            status.last_add = Some(label);
                            tracing::debug!(label, vertices = graph.len(), "vertex added");
                        }
                        result
                    }
                    Task::Remove(_) => {
                        let result = shrink::shrink_graph(&mut graph, &config, label);
                        if result.is_ok() {
                            status.deleted += 1;
                            status.last_delete = Some(label);
                            tracing::debug!(label, vertices = graph.len(), "vertex removed");
                        }
                        result
                    }
                };
                if let Ok(stats) = &result {
                    status.tries += stats.tries;
                    status.improved += stats.improved;
                }
                (label, manipulation, result)
            });

            if let Some((label, manipulation, result)) = applied {
                drop(graph);
                self.queue.lock().complete(label, manipulation);
                if let Err(e) = result {
                    tracing::error!(label, error = %e, "build loop aborted");
                    return Err(e);
                }
                graph = self.graph.write();
            }

            if graph.len() > graph.edges_per_vertex() && config.improve_k > 0 {
                let mut attempt: i64 = 0;
                while attempt < i64::from(config.swap_tries) {
                    status.tries += 1;
                    if improve::improve_random_vertex(&mut graph, &config, &mut *rng) {
                        status.improved += 1;
                        attempt -= i64::from(config.additional_swap_tries);
                    }
                    attempt += 1;
                }
            }
            drop(graph);

            status.step += 1;
            on_change(&status);
            self.status.send_replace(status.clone());
            status.last_add = None;
            status.last_delete = None;
        }

        tracing::info!(
            steps = status.step,
            added = status.added,
            deleted = status.deleted,
            improved = status.improved,
            "build loop stopped"
        );
        Ok(status)
    }

    /// Average weight over all edges.
    pub fn calc_avg_edge_weight(&self) -> f64 {
        analysis::calc_avg_edge_weight(&self.graph.read())
    }

    /// Average rank of a vertex's neighbors in its exact nearest neighbor
    /// list, 1.0 being optimal. See [`analysis::calc_avg_neighbor_rank`].
    pub fn calc_avg_neighbor_rank(&self, top_lists: Option<&HashMap<Label, Vec<Label>>>) -> f64 {
        analysis::calc_avg_neighbor_rank(&self.graph.read(), top_lists)
    }

    /// Check size, degree, edge weights and symmetry of the graph.
    pub fn check_graph_validation(
        &self,
        expected_vertices: usize,
        expected_degree: usize,
    ) -> Result<()> {
        analysis::check_graph_validation(&self.graph.read(), expected_vertices, expected_degree)
    }

    /// Number of edges failing the RNG check.
    pub fn calc_non_rng_edges(&self) -> usize {
        analysis::calc_non_rng_edges(&self.graph.read())
    }

    pub fn check_graph_connectivity(&self) -> bool {
        analysis::check_graph_connectivity(&self.graph.read())
    }
}

impl std::fmt::Debug for GraphDesigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphDesigner")
            .field("config", &*self.config.read())
            .field("pending", &self.pending())
            .finish()
    }
}
