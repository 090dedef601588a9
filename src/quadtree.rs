//! Transient 2D quadtree used by the collision and many-body forces
//!
//! The tree is an arena: quads live in a `Vec` and refer to their children by
//! index, and leaves refer to points by their index in the slice the tree was
//! built from. A tree is built once per force step and is read-only after
//! construction. Per-subtree scalars are not stored in the tree; instead
//! [`Quadtree::aggregate`] returns a side table indexed by [`QuadId`], so
//! different forces can aggregate different values over the same tree.
//!
//! Children are always pushed after their parent, which means iterating the
//! arena back to front visits every child before its parent. Aggregation
//! relies on that ordering instead of recursion.

/// Index of a quad in the arena
pub type QuadId = usize;

/// Depth after which coincident-ish points share a leaf instead of splitting
const MAX_DEPTH: usize = 48;

/// Axis-aligned square region covered by a quad
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Bounds {
    /// Side length of the region
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    fn mid(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Quadrant a point falls in: 0 = top-left, 1 = top-right,
    /// 2 = bottom-left, 3 = bottom-right (y grows downward)
    pub fn quadrant(&self, x: f64, y: f64) -> usize {
        let (mx, my) = self.mid();
        let right = x >= mx;
        let bottom = y >= my;
        ((bottom as usize) << 1) | right as usize
    }

    /// Bounds of one of the four child quadrants
    pub fn child(&self, quadrant: usize) -> Bounds {
        let (mx, my) = self.mid();
        let (x0, x1) = if quadrant & 1 == 0 {
            (self.x0, mx)
        } else {
            (mx, self.x1)
        };
        let (y0, y1) = if quadrant & 2 == 0 {
            (self.y0, my)
        } else {
            (my, self.y1)
        };
        Bounds { x0, y0, x1, y1 }
    }

    /// Whether the square lies entirely farther than `radius` from `(x, y)`
    /// along either axis
    pub fn outside_reach(&self, x: f64, y: f64, radius: f64) -> bool {
        self.x0 > x + radius || self.x1 < x - radius || self.y0 > y + radius || self.y1 < y - radius
    }
}

#[derive(Debug, Clone)]
enum QuadKind {
    /// One point, or several that could not be separated
    Leaf(Vec<usize>),
    /// Up to four non-empty children
    Internal([Option<QuadId>; 4]),
}

/// A single quad in the arena
#[derive(Debug, Clone)]
pub struct Quad {
    pub bounds: Bounds,
    kind: QuadKind,
}

impl Quad {
    fn leaf(bounds: Bounds) -> Self {
        Self {
            bounds,
            kind: QuadKind::Leaf(Vec::new()),
        }
    }

    /// Whether this quad holds points directly
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, QuadKind::Leaf(_))
    }

    /// Point indices held by this quad (empty for internal quads)
    pub fn points(&self) -> &[usize] {
        match &self.kind {
            QuadKind::Leaf(points) => points,
            QuadKind::Internal(_) => &[],
        }
    }

    /// Child quads in quadrant order, skipping empty quadrants
    pub fn children(&self) -> impl Iterator<Item = QuadId> + '_ {
        let slots: &[Option<QuadId>] = match &self.kind {
            QuadKind::Leaf(_) => &[],
            QuadKind::Internal(children) => children,
        };
        slots.iter().flatten().copied()
    }
}

/// Point quadtree rebuilt from scratch for every force step
#[derive(Debug, Clone, Default)]
pub struct Quadtree {
    quads: Vec<Quad>,
    positions: Vec<(f64, f64)>,
}

impl Quadtree {
    /// The root is always the first quad in the arena
    pub const ROOT: QuadId = 0;

    /// Build a tree over `positions`; the index of each position is the
    /// point index reported by leaves.
    ///
    /// Non-finite positions are left out of the tree.
    pub fn build(positions: &[(f64, f64)]) -> Self {
        let mut tree = Self {
            quads: Vec::new(),
            positions: positions.to_vec(),
        };

        let Some(bounds) = cover(positions) else {
            return tree;
        };
        tree.quads.push(Quad::leaf(bounds));

        for (i, &(x, y)) in positions.iter().enumerate() {
            if x.is_finite() && y.is_finite() {
                tree.insert(i, x, y);
            }
        }

        tree
    }

    fn insert(&mut self, point: usize, x: f64, y: f64) {
        let mut id = Self::ROOT;
        let mut depth = 0;

        loop {
            let bounds = self.quads[id].bounds;
            match &mut self.quads[id].kind {
                QuadKind::Internal(children) => {
                    let q = bounds.quadrant(x, y);
                    let slot = children[q];
                    id = match slot {
                        Some(child) => child,
                        None => {
                            let child = self.quads.len();
                            self.quads.push(Quad::leaf(bounds.child(q)));
                            if let QuadKind::Internal(children) = &mut self.quads[id].kind {
                                children[q] = Some(child);
                            }
                            child
                        }
                    };
                    depth += 1;
                }
                QuadKind::Leaf(points) => {
                    let coincident = points
                        .first()
                        .is_some_and(|&p| self.positions[p] == (x, y));
                    if points.is_empty() || coincident || depth >= MAX_DEPTH {
                        points.push(point);
                        return;
                    }

                    // Split: everything already here shares one position, so
                    // it moves into a single child as a group.
                    let existing = std::mem::take(points);
                    let (ex, ey) = self.positions[existing[0]];
                    let q = bounds.quadrant(ex, ey);
                    let child = self.quads.len();
                    let mut children = [None; 4];
                    children[q] = Some(child);
                    self.quads[id].kind = QuadKind::Internal(children);
                    self.quads.push(Quad {
                        bounds: bounds.child(q),
                        kind: QuadKind::Leaf(existing),
                    });
                }
            }
        }
    }

    /// Number of quads in the arena
    pub fn len(&self) -> usize {
        self.quads.len()
    }

    /// Whether the tree indexes no points
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Quad by id
    pub fn quad(&self, id: QuadId) -> &Quad {
        &self.quads[id]
    }

    /// Compute one value per quad, bottom-up.
    ///
    /// `leaf` receives the point indices of a leaf; `combine` receives the
    /// values of an internal quad's non-empty children. The result is indexed
    /// by [`QuadId`].
    pub fn aggregate<A, L, C>(&self, mut leaf: L, mut combine: C) -> Vec<A>
    where
        A: Clone + Default,
        L: FnMut(&[usize]) -> A,
        C: FnMut(&[A]) -> A,
    {
        let mut values = vec![A::default(); self.quads.len()];
        let mut scratch = Vec::with_capacity(4);

        for id in (0..self.quads.len()).rev() {
            values[id] = match &self.quads[id].kind {
                QuadKind::Leaf(points) => leaf(points),
                QuadKind::Internal(children) => {
                    scratch.clear();
                    scratch.extend(children.iter().flatten().map(|&c| values[c].clone()));
                    combine(&scratch)
                }
            };
        }

        values
    }

    /// Pre-order traversal. The callback returns `true` to skip the
    /// subtree below the quad it was given.
    pub fn visit<F>(&self, mut callback: F)
    where
        F: FnMut(QuadId, &Quad) -> bool,
    {
        if self.quads.is_empty() {
            return;
        }

        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            let quad = &self.quads[id];
            if callback(id, quad) {
                continue;
            }
            if let QuadKind::Internal(children) = &quad.kind {
                stack.extend(children.iter().rev().flatten());
            }
        }
    }
}

/// Smallest square covering every finite position
fn cover(positions: &[(f64, f64)]) -> Option<Bounds> {
    let mut min = (f64::INFINITY, f64::INFINITY);
    let mut max = (f64::NEG_INFINITY, f64::NEG_INFINITY);

    for &(x, y) in positions {
        if !(x.is_finite() && y.is_finite()) {
            continue;
        }
        min = (min.0.min(x), min.1.min(y));
        max = (max.0.max(x), max.1.max(y));
    }

    if min.0 > max.0 {
        return None;
    }

    // Widen slightly so the far edge is not lost to rounding
    let span = (max.0 - min.0).max(max.1 - min.1);
    let size = if span > 0.0 { span * (1.0 + 1e-9) } else { 1.0 };

    Some(Bounds {
        x0: min.0,
        y0: min.1,
        x1: min.0 + size,
        y1: min.1 + size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_points(tree: &Quadtree) -> Vec<usize> {
        let mut out = Vec::new();
        tree.visit(|_, quad| {
            out.extend_from_slice(quad.points());
            false
        });
        out.sort_unstable();
        out
    }

    #[test]
    fn empty_input_builds_empty_tree() {
        let tree = Quadtree::build(&[]);
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);

        let mut visited = 0;
        tree.visit(|_, _| {
            visited += 1;
            false
        });
        assert_eq!(visited, 0);
    }

    #[test]
    fn single_point_is_root_leaf() {
        let tree = Quadtree::build(&[(3.0, 4.0)]);
        assert_eq!(tree.len(), 1);
        let root = tree.quad(Quadtree::ROOT);
        assert!(root.is_leaf());
        assert_eq!(root.points(), &[0]);
    }

    #[test]
    fn every_point_lands_in_exactly_one_leaf() {
        let positions: Vec<(f64, f64)> = (0..200)
            .map(|i| {
                let t = i as f64;
                ((t * 7.3) % 101.0, (t * 13.7) % 89.0)
            })
            .collect();
        let tree = Quadtree::build(&positions);

        assert_eq!(leaf_points(&tree), (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn leaves_contain_their_points() {
        let positions = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0), (2.5, 7.5)];
        let tree = Quadtree::build(&positions);

        tree.visit(|_, quad| {
            for &p in quad.points() {
                let (x, y) = positions[p];
                let b = quad.bounds;
                assert!(x >= b.x0 && x <= b.x1 && y >= b.y0 && y <= b.y1);
            }
            false
        });
    }

    #[test]
    fn coincident_points_share_a_leaf() {
        let positions = [(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)];
        let tree = Quadtree::build(&positions);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.quad(Quadtree::ROOT).points(), &[0, 1, 2]);
    }

    #[test]
    fn coincident_group_moves_when_split() {
        let positions = [(0.0, 0.0), (0.0, 0.0), (8.0, 8.0)];
        let tree = Quadtree::build(&positions);

        assert!(!tree.quad(Quadtree::ROOT).is_leaf());
        let mut leaves = Vec::new();
        tree.visit(|_, quad| {
            if quad.is_leaf() {
                leaves.push(quad.points().to_vec());
            }
            false
        });
        assert_eq!(leaves, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn non_finite_points_are_skipped() {
        let positions = [(0.0, 0.0), (f64::NAN, 1.0), (5.0, f64::INFINITY), (4.0, 4.0)];
        let tree = Quadtree::build(&positions);
        assert_eq!(leaf_points(&tree), vec![0, 3]);
    }

    #[test]
    fn aggregate_max_and_sum() {
        let positions = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (9.0, 9.0)];
        let weights = [1.0, 4.0, 2.0, 3.0];
        let tree = Quadtree::build(&positions);

        let max = tree.aggregate(
            |points| points.iter().map(|&p| weights[p]).fold(0.0, f64::max),
            |children| children.iter().copied().fold(0.0, f64::max),
        );
        let sum = tree.aggregate(
            |points: &[usize]| points.iter().map(|&p| weights[p]).sum::<f64>(),
            |children: &[f64]| children.iter().sum(),
        );

        assert_eq!(max[Quadtree::ROOT], 4.0);
        assert_eq!(sum[Quadtree::ROOT], 10.0);
        assert_eq!(max.len(), tree.len());
    }

    #[test]
    fn children_follow_parents_in_arena() {
        let positions: Vec<(f64, f64)> = (0..64).map(|i| ((i % 8) as f64, (i / 8) as f64)).collect();
        let tree = Quadtree::build(&positions);

        for id in 0..tree.len() {
            for child in tree.quad(id).children() {
                assert!(child > id);
            }
        }
    }

    #[test]
    fn pruned_visit_skips_far_subtrees() {
        let mut positions: Vec<(f64, f64)> = (0..100).map(|i| (i as f64, 0.0)).collect();
        positions.push((1000.0, 1000.0));
        let tree = Quadtree::build(&positions);

        let mut found = Vec::new();
        let mut visited = 0;
        tree.visit(|_, quad| {
            visited += 1;
            if quad.bounds.outside_reach(50.0, 0.0, 1.5) {
                return true;
            }
            for &p in quad.points() {
                let (x, y) = positions[p];
                if (x - 50.0).hypot(y) <= 1.5 {
                    found.push(p);
                }
            }
            false
        });

        found.sort_unstable();
        assert_eq!(found, vec![49, 50, 51]);
        assert!(visited < tree.len());
    }

    #[test]
    fn quadrant_and_child_agree() {
        let b = Bounds {
            x0: 0.0,
            y0: 0.0,
            x1: 4.0,
            y1: 4.0,
        };
        for &(x, y) in &[(1.0, 1.0), (3.0, 1.0), (1.0, 3.0), (3.0, 3.0), (2.0, 2.0)] {
            let c = b.child(b.quadrant(x, y));
            assert!(x >= c.x0 && x <= c.x1 && y >= c.y0 && y <= c.y1);
        }
        assert_eq!(b.quadrant(2.0, 2.0), 3);
        assert_eq!(b.child(1).x0, 2.0);
        assert_eq!(b.width(), 4.0);
    }
}
