//! One physical timestep of the layout
//!
//! [`force_iterate`] cools the simulation and then applies, in order, the
//! centering, collision and link forces, plus many-body repulsion when
//! `charge_strength` is set. It only mutates what it is given: velocities
//! (and, for centering, positions) of the node arena, and `alpha` in the
//! settings. Integration of velocities into positions is left to the caller.

use crate::jitter::Lcg;
use crate::quadtree::{Quad, QuadId, Quadtree};
use crate::settings::SimulationSettings;
use crate::state::{Link, NodeState};

/// Barnes–Hut opening criterion for the many-body force
const THETA: f64 = 0.9;

/// Many-body distances are floored at this (squared) to bound the force
const MIN_DISTANCE_SQ: f64 = 1.0;

/// Advance the simulation by one step
pub fn force_iterate(nodes: &mut [NodeState], links: &[Link], settings: &mut SimulationSettings) {
    let mut jitter = Lcg::default();

    settings.alpha += (settings.alpha_target - settings.alpha) * settings.alpha_decay;

    if nodes.is_empty() {
        return;
    }

    apply_centering(nodes, settings.centering_force);
    apply_collision(nodes, settings, &mut jitter);
    apply_links(nodes, links, settings, &mut jitter);

    if let Some(strength) = settings.charge_strength {
        apply_many_body(nodes, strength, settings.alpha, &mut jitter);
    }
}

/// Arithmetic mean position of all nodes
pub fn centroid(nodes: &[NodeState]) -> (f64, f64) {
    if nodes.is_empty() {
        return (0.0, 0.0);
    }
    let (sx, sy) = nodes
        .iter()
        .fold((0.0, 0.0), |(sx, sy), n| (sx + n.x, sy + n.y));
    let count = nodes.len() as f64;
    (sx / count, sy / count)
}

/// Shift every node so the centroid moves toward the origin
fn apply_centering(nodes: &mut [NodeState], strength: f64) {
    if strength == 0.0 {
        return;
    }

    let (cx, cy) = centroid(nodes);
    let (dx, dy) = (cx * strength, cy * strength);
    for node in nodes.iter_mut() {
        node.x -= dx;
        node.y -= dy;
    }
}

/// Push apart pairs whose projected positions overlap
fn apply_collision(nodes: &mut [NodeState], settings: &SimulationSettings, jitter: &mut Lcg) {
    let strength = settings.collide_force;
    let radius = settings.collide_radius;
    if nodes.len() < 2 || radius <= 0.0 || strength == 0.0 {
        return;
    }

    let radii = vec![radius; nodes.len()];
    let projected: Vec<(f64, f64)> = nodes.iter().map(NodeState::projected).collect();
    let tree = Quadtree::build(&projected);
    let reach = tree.aggregate(
        |points| points.iter().map(|&p| radii[p]).fold(0.0, f64::max),
        |children| children.iter().copied().fold(0.0, f64::max),
    );

    for i in 0..nodes.len() {
        let ri = radii[i];
        let ri2 = ri * ri;
        let (xi, yi) = nodes[i].projected();

        tree.visit(|id: QuadId, quad: &Quad| {
            if !quad.is_leaf() {
                return quad.bounds.outside_reach(xi, yi, ri + reach[id]);
            }

            for &j in quad.points() {
                if nodes[j].index <= nodes[i].index {
                    continue;
                }

                let rj = radii[j];
                let r = ri + rj;
                let (pxj, pyj) = nodes[j].projected();
                let mut x = xi - pxj;
                let mut y = yi - pyj;
                let mut l = x * x + y * y;
                if l >= r * r {
                    continue;
                }

                if x == 0.0 {
                    x = jitter.jiggle();
                    l += x * x;
                }
                if y == 0.0 {
                    y = jitter.jiggle();
                    l += y * y;
                }
                let l = l.sqrt();
                if l == 0.0 {
                    continue;
                }

                let push = (r - l) / l * strength;
                x *= push;
                y *= push;

                let rj2 = rj * rj;
                let share = rj2 / (ri2 + rj2);
                nodes[i].vx += x * share;
                nodes[i].vy += y * share;
                nodes[j].vx -= x * (1.0 - share);
                nodes[j].vy -= y * (1.0 - share);
            }
            true
        });
    }
}

/// Pull every edge toward its rest length; the better-connected endpoint
/// moves less
fn apply_links(nodes: &mut [NodeState], links: &[Link], settings: &SimulationSettings, jitter: &mut Lcg) {
    for link in links {
        // Self-loops exert no net force
        if link.source == link.target {
            continue;
        }

        let source = nodes[link.source];
        let target = nodes[link.target];
        let (sx, sy) = source.projected();
        let (tx, ty) = target.projected();
        let x = jitter.or_jiggle(tx - sx);
        let y = jitter.or_jiggle(ty - sy);
        let l = (x * x + y * y).sqrt();
        if l == 0.0 {
            continue;
        }

        let source_degree = link.source_degree.max(1) as f64;
        let target_degree = link.target_degree.max(1) as f64;
        let correction =
            (l - settings.link_distance) / l * settings.alpha / source_degree.min(target_degree);
        let (x, y) = (x * correction, y * correction);

        let bias = source_degree / (source_degree + target_degree);
        nodes[link.target].vx -= x * bias;
        nodes[link.target].vy -= y * bias;
        nodes[link.source].vx += x * (1.0 - bias);
        nodes[link.source].vy += y * (1.0 - bias);
    }
}

/// Aggregated charge of a subtree: total strength at a weighted centre
#[derive(Debug, Clone, Copy, Default)]
struct Charge {
    strength: f64,
    x: f64,
    y: f64,
}

/// Barnes–Hut approximated repulsion (or attraction, for positive strength)
fn apply_many_body(nodes: &mut [NodeState], strength: f64, alpha: f64, jitter: &mut Lcg) {
    if strength == 0.0 || nodes.len() < 2 {
        return;
    }

    let positions: Vec<(f64, f64)> = nodes.iter().map(|n| (n.x, n.y)).collect();
    let tree = Quadtree::build(&positions);
    let charges = tree.aggregate(
        |points| {
            let (x, y) = positions[points[0]];
            Charge {
                strength: strength * points.len() as f64,
                x,
                y,
            }
        },
        |children| {
            let mut total = Charge::default();
            let mut weight = 0.0;
            for c in children {
                let w = c.strength.abs();
                total.strength += c.strength;
                total.x += w * c.x;
                total.y += w * c.y;
                weight += w;
            }
            if weight > 0.0 {
                total.x /= weight;
                total.y /= weight;
            }
            total
        },
    );

    let theta2 = THETA * THETA;
    for i in 0..nodes.len() {
        let (px, py) = positions[i];
        let (mut fx, mut fy) = (0.0, 0.0);

        tree.visit(|id, quad| {
            let charge = charges[id];
            if charge.strength == 0.0 {
                return true;
            }

            let mut x = charge.x - px;
            let mut y = charge.y - py;
            let mut l = x * x + y * y;
            let w = quad.bounds.width();

            // Far enough away to treat the whole subtree as one point
            if w * w / theta2 < l {
                if x == 0.0 {
                    x = jitter.jiggle();
                    l += x * x;
                }
                if y == 0.0 {
                    y = jitter.jiggle();
                    l += y * y;
                }
                if l < MIN_DISTANCE_SQ {
                    l = (MIN_DISTANCE_SQ * l).sqrt();
                }
                fx += x * charge.strength * alpha / l;
                fy += y * charge.strength * alpha / l;
                return true;
            }

            if !quad.is_leaf() {
                return false;
            }

            let points = quad.points();
            if points.len() > 1 || points[0] != i {
                if x == 0.0 {
                    x = jitter.jiggle();
                    l += x * x;
                }
                if y == 0.0 {
                    y = jitter.jiggle();
                    l += y * y;
                }
                if l < MIN_DISTANCE_SQ {
                    l = (MIN_DISTANCE_SQ * l).sqrt();
                }
            }
            for &j in points {
                if j != i && l > 0.0 {
                    let w = strength * alpha / l;
                    fx += x * w;
                    fy += y * w;
                }
            }
            true
        });

        nodes[i].vx += fx;
        nodes[i].vy += fy;
    }
}
