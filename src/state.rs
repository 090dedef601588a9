//! Per-node simulation state and resolved links
//!
//! Both live in flat arenas owned by the supervisor; everything else refers
//! to them by position.

/// Position and velocity of one node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeState {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// Ordinal in iteration order; breaks ties between symmetric pairs
    pub index: usize,
}

impl NodeState {
    /// A node at rest at `(x, y)`
    pub fn at(index: usize, x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            index,
        }
    }

    /// Position after applying the current velocity
    pub fn projected(&self) -> (f64, f64) {
        (self.x + self.vx, self.y + self.vy)
    }
}

/// An edge resolved to arena positions, with endpoint degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub source: usize,
    pub target: usize,
    pub source_degree: usize,
    pub target_degree: usize,
}

/// Initial placement for the `index`-th node without a position: a
/// phyllotaxis spiral, so seeded nodes never coincide
pub fn seed_position(index: usize) -> (f64, f64) {
    const INITIAL_RADIUS: f64 = 10.0;
    let golden_angle = std::f64::consts::PI * (3.0 - 5f64.sqrt());

    let radius = INITIAL_RADIUS * (0.5 + index as f64).sqrt();
    let angle = index as f64 * golden_angle;
    (radius * angle.cos(), radius * angle.sin())
}
