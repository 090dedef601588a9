//! Simulation supervisor
//!
//! [`Simulation`] owns the node-state arena and the live settings, drives the
//! force step once per scheduled frame, integrates velocities and writes the
//! resulting positions back onto the externally owned graph.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use netforce::{GraphNode, ManualScheduler, MemoryGraph, Simulation, SimulationSettings};
//!
//! let mut graph = MemoryGraph::new();
//! graph.add_node(GraphNode::new("a"));
//! graph.add_node(GraphNode::new("b"));
//! graph.add_edge("a", "b");
//!
//! let graph = Rc::new(RefCell::new(graph));
//! let frames = Rc::new(ManualScheduler::new());
//! let sim = Simulation::new(Rc::clone(&graph), SimulationSettings::default(), frames.clone());
//!
//! sim.start().unwrap();
//! frames.run_until_idle(1_000);
//!
//! assert!(!sim.is_running());
//! assert!(graph.borrow().node("a").unwrap().x.is_some());
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::{debug, info, trace, warn};

use crate::config::validate;
use crate::error::{SimulationError, SimulationResult};
use crate::forces::force_iterate;
use crate::graph::LayoutGraph;
use crate::scheduler::FrameScheduler;
use crate::settings::{SettingsUpdate, SimulationSettings};
use crate::state::{Link, NodeState, seed_position};

/// Handle to a running (or stopped) layout simulation.
///
/// Cloning the handle is cheap; all clones control the same simulation.
pub struct Simulation<G: LayoutGraph + 'static> {
    inner: Rc<RefCell<Supervisor<G>>>,
    scheduler: Rc<dyn FrameScheduler>,
}

impl<G: LayoutGraph + 'static> Clone for Simulation<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            scheduler: Rc::clone(&self.scheduler),
        }
    }
}

struct Supervisor<G: LayoutGraph> {
    graph: Rc<RefCell<G>>,
    settings: SimulationSettings,
    nodes: Vec<NodeState>,
    ids: Vec<G::NodeId>,
    lookup: HashMap<G::NodeId, usize>,
    running: bool,
    killed: bool,
    /// A frame callback is queued and has not run yet
    frame_requested: bool,
    ticks: u64,
    dangling_edges: usize,
}

impl<G: LayoutGraph + 'static> Simulation<G> {
    /// Create a stopped simulation over `graph`
    pub fn new(
        graph: Rc<RefCell<G>>,
        settings: SimulationSettings,
        scheduler: Rc<dyn FrameScheduler>,
    ) -> Self {
        let inner = Supervisor {
            graph,
            settings,
            nodes: Vec::new(),
            ids: Vec::new(),
            lookup: HashMap::new(),
            running: false,
            killed: false,
            frame_requested: false,
            ticks: 0,
            dangling_edges: 0,
        };

        Self {
            inner: Rc::new(RefCell::new(inner)),
            scheduler,
        }
    }

    /// Reheat (`alpha = 1`) and begin ticking once per frame.
    ///
    /// Calling `start` while already running only reheats.
    pub fn start(&self) -> SimulationResult<()> {
        let schedule = {
            let mut sup = self.inner.borrow_mut();
            if sup.killed {
                return Err(SimulationError::Killed);
            }

            sup.settings.alpha = 1.0;
            if !sup.running {
                debug!(nodes = sup.nodes.len(), "simulation started");
            }
            sup.running = true;
            !std::mem::replace(&mut sup.frame_requested, true)
        };

        if schedule {
            self.request_frame();
        }
        Ok(())
    }

    /// Stop ticking. Node state is kept, so `start` resumes from here.
    pub fn stop(&self) {
        self.inner.borrow_mut().stop();
    }

    /// Stop for good and discard all node state. Later `start` calls fail.
    pub fn kill(&self) {
        let mut sup = self.inner.borrow_mut();
        sup.stop();
        sup.killed = true;
        sup.nodes.clear();
        sup.ids.clear();
        sup.lookup.clear();
        debug!("simulation killed");
    }

    /// Merge `update` into the live settings and restart, which reheats the
    /// simulation.
    ///
    /// An update with an out-of-range value is rejected as a whole and
    /// leaves the simulation untouched.
    pub fn update_settings(&self, update: &SettingsUpdate) -> SimulationResult<()> {
        validate(update)?;
        {
            let mut sup = self.inner.borrow_mut();
            sup.settings.apply(update);
            debug!(?update, "settings updated");
        }
        self.start()
    }

    /// Run one tick synchronously, outside the frame loop.
    ///
    /// Returns `true` when this tick cooled the simulation below
    /// `alpha_min`, which also stops it.
    pub fn tick(&self) -> SimulationResult<bool> {
        let mut sup = self.inner.borrow_mut();
        if sup.killed {
            return Err(SimulationError::Killed);
        }
        Ok(sup.step())
    }

    /// Tick synchronously until cooled or `max_ticks` have run; returns the
    /// number of ticks run
    pub fn run_to_convergence(&self, max_ticks: usize) -> SimulationResult<usize> {
        for done in 1..=max_ticks {
            if self.tick()? {
                return Ok(done);
            }
        }
        Ok(max_ticks)
    }

    /// Whether ticks are being scheduled
    pub fn is_running(&self) -> bool {
        self.inner.borrow().running
    }

    /// Whether `kill` has been called
    pub fn is_killed(&self) -> bool {
        self.inner.borrow().killed
    }

    /// Current temperature
    pub fn alpha(&self) -> f64 {
        self.inner.borrow().settings.alpha
    }

    /// Copy of the live settings
    pub fn settings(&self) -> SimulationSettings {
        self.inner.borrow().settings.clone()
    }

    /// Ticks run since construction
    pub fn tick_count(&self) -> u64 {
        self.inner.borrow().ticks
    }

    /// Number of nodes with simulation state
    pub fn node_count(&self) -> usize {
        self.inner.borrow().nodes.len()
    }

    /// State of one node, once it has been seen by a tick
    pub fn node_state(&self, id: &G::NodeId) -> Option<NodeState> {
        let sup = self.inner.borrow();
        sup.lookup.get(id).map(|&i| sup.nodes[i])
    }

    /// Shared handle to the graph being laid out
    pub fn graph(&self) -> Rc<RefCell<G>> {
        Rc::clone(&self.inner.borrow().graph)
    }

    fn request_frame(&self) {
        let weak: Weak<RefCell<Supervisor<G>>> = Rc::downgrade(&self.inner);
        let scheduler = Rc::clone(&self.scheduler);

        self.scheduler.request_next_tick(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                Simulation { inner, scheduler }.on_frame();
            }
        }));
    }

    fn on_frame(&self) {
        {
            let mut sup = self.inner.borrow_mut();
            sup.frame_requested = false;
            if !sup.running {
                return;
            }

            sup.step();
            if !sup.running {
                return;
            }
            sup.frame_requested = true;
        }
        self.request_frame();
    }
}

impl<G: LayoutGraph> Supervisor<G> {
    fn stop(&mut self) {
        if self.running {
            self.running = false;
            debug!(ticks = self.ticks, alpha = self.settings.alpha, "simulation stopped");
        }
    }

    /// One tick: force step, integration, write-back, convergence check
    fn step(&mut self) -> bool {
        self.sync_nodes();
        let links = self.resolve_links();

        force_iterate(&mut self.nodes, &links, &mut self.settings);

        let decay = self.settings.velocity_decay;
        let mut graph = self.graph.borrow_mut();
        for (state, id) in self.nodes.iter_mut().zip(&self.ids) {
            if graph.is_pinned(id) {
                match graph.position(id) {
                    Some((x, y)) => {
                        state.x = x;
                        state.y = y;
                    }
                    // Pinned before it was ever placed: hold where it is now
                    None => graph.set_position(id, state.x, state.y),
                }
                state.vx = 0.0;
                state.vy = 0.0;
                continue;
            }

            state.vx *= decay;
            state.vy *= decay;
            state.x += state.vx;
            state.y += state.vy;
            graph.set_position(id, state.x, state.y);
        }
        drop(graph);

        self.ticks += 1;
        trace!(tick = self.ticks, alpha = self.settings.alpha, "tick");

        if self.settings.alpha < self.settings.alpha_min {
            info!(ticks = self.ticks, nodes = self.nodes.len(), "layout converged");
            self.stop();
            return true;
        }
        false
    }

    /// Bring the arena in line with the graph's current node list. Known
    /// nodes keep their state, new ones are seeded, vanished ones dropped.
    fn sync_nodes(&mut self) {
        let graph = self.graph.borrow();
        if graph.nodes().eq(self.ids.iter().cloned()) {
            return;
        }

        let mut nodes = Vec::with_capacity(self.nodes.len());
        let mut ids = Vec::with_capacity(self.ids.len());
        for id in graph.nodes() {
            let index = nodes.len();
            let state = match self.lookup.get(&id) {
                Some(&old) => NodeState {
                    index,
                    ..self.nodes[old]
                },
                None => {
                    let (x, y) = graph.position(&id).unwrap_or_else(|| seed_position(index));
                    NodeState::at(index, x, y)
                }
            };
            nodes.push(state);
            ids.push(id);
        }
        drop(graph);

        trace!(before = self.nodes.len(), after = nodes.len(), "node set changed");
        self.lookup = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        self.nodes = nodes;
        self.ids = ids;
    }

    /// Map graph edges onto arena positions
    fn resolve_links(&mut self) -> Vec<Link> {
        let graph = self.graph.borrow();
        let mut links = Vec::new();
        let mut dangling = 0;

        for (source, target) in graph.edges() {
            match (self.lookup.get(&source), self.lookup.get(&target)) {
                (Some(&s), Some(&t)) => links.push(Link {
                    source: s,
                    target: t,
                    source_degree: graph.degree(&source),
                    target_degree: graph.degree(&target),
                }),
                _ => dangling += 1,
            }
        }
        drop(graph);

        if dangling != self.dangling_edges {
            if dangling > 0 {
                warn!(count = dangling, "skipping edges whose endpoints are not in the graph");
            }
            self.dangling_edges = dangling;
        }
        links
    }
}
