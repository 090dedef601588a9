//! netforce - force-directed 2D layout for large interaction graphs.
//!
//! The engine moves graph nodes under a centering force, quadtree-accelerated
//! collision avoidance, degree-weighted springs and optional Barnes–Hut
//! repulsion, cooling over time until the layout settles. It runs one step per
//! frame through a pluggable [`FrameScheduler`] so it never blocks the host.

pub mod config;
pub mod error;
pub mod forces;
pub mod graph;
pub mod graph_types;
pub mod jitter;
pub mod quadtree;
pub mod scheduler;
pub mod settings;
pub mod simulation;
pub mod state;

pub use error::{ConfigError, ConfigResult, InvalidSetting, SimulationError, SimulationResult};
pub use forces::force_iterate;
pub use graph::LayoutGraph;
pub use graph_types::{GraphDocument, GraphEdge, GraphNode, MemoryGraph};
pub use scheduler::{FrameScheduler, IntervalScheduler, ManualScheduler, TickCallback};
pub use settings::{SettingsUpdate, SimulationSettings};
pub use simulation::Simulation;
pub use state::{Link, NodeState};
