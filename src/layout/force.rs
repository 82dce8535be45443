//! Fixed-step force simulation for automatic placement of boxes.

use eframe::egui::{Pos2, Vec2, pos2, vec2};
use log::{debug, warn};

use super::forces::{ManyBodyParams, collide, many_body};
use super::quadtree::Cell;
use crate::error::{GraphError, Result};

pub const CANVAS_CENTER: Pos2 = pos2(800.0, 600.0);
pub const COLLISION_PADDING: f32 = 30.0;
pub const LARGE_GRAPH_THRESHOLD: usize = 50;

pub const FALLBACK_ORIGIN: Pos2 = pos2(50.0, 50.0);
pub const FALLBACK_CELL: Vec2 = vec2(300.0, 160.0);

const BARNES_HUT_THETA: f32 = 0.9;
const ALPHA_MIN: f32 = 0.001;
const VELOCITY_DECAY: f32 = 0.4;
const COLLIDE_STRENGTH: f32 = 0.7;

/// A box to place. Positions come back as the box's top-left corner.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutNode {
    pub id: String,
    pub size: Vec2,
}

impl LayoutNode {
    pub fn new(id: impl Into<String>, size: Vec2) -> Self {
        Self {
            id: id.into(),
            size,
        }
    }

    fn radius(&self, padding: f32) -> f32 {
        self.size.x.max(self.size.y) / 2.0 + padding
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceParams {
    pub link_distance: f32,
    pub link_strength: f32,
    pub repulsion: f32,
    pub max_range: f32,
    pub iterations: usize,
    pub collision_padding: f32,
    pub center: Pos2,
}

impl ForceParams {
    /// Larger graphs get longer links, weaker springs and a wider repulsion range.
    pub fn for_node_count(count: usize) -> Self {
        if count > LARGE_GRAPH_THRESHOLD {
            Self {
                link_distance: 280.0,
                link_strength: 0.3,
                repulsion: -900.0,
                max_range: 1400.0,
                iterations: 320,
                collision_padding: COLLISION_PADDING,
                center: CANVAS_CENTER,
            }
        } else {
            Self {
                link_distance: 180.0,
                link_strength: 0.7,
                repulsion: -500.0,
                max_range: 900.0,
                iterations: 220,
                collision_padding: COLLISION_PADDING,
                center: CANVAS_CENTER,
            }
        }
    }
}

/// Square grid around the canvas center, spaced by the link distance.
fn initial_positions(count: usize, params: &ForceParams) -> Vec<Vec2> {
    let columns = (count as f32).sqrt().ceil().max(1.0) as usize;
    let rows = count.div_ceil(columns);
    let origin = params.center.to_vec2()
        - vec2(
            (columns - 1) as f32 * params.link_distance / 2.0,
            rows.saturating_sub(1) as f32 * params.link_distance / 2.0,
        );
    (0..count)
        .map(|index| {
            origin
                + vec2(
                    (index % columns) as f32 * params.link_distance,
                    (index / columns) as f32 * params.link_distance,
                )
        })
        .collect()
}

/// Runs the simulation for `params.iterations` ticks and returns top-left
/// positions in node order. Edges are index pairs; out-of-range or self edges
/// are ignored.
pub fn force_layout(
    nodes: &[LayoutNode],
    edges: &[(usize, usize)],
    params: &ForceParams,
) -> Result<Vec<Pos2>> {
    let count = nodes.len();
    if count == 0 {
        return Ok(Vec::new());
    }

    let links = edges
        .iter()
        .copied()
        .filter(|&(from, to)| from < count && to < count && from != to)
        .collect::<Vec<_>>();
    let mut degree = vec![0usize; count];
    for &(from, to) in &links {
        degree[from] += 1;
        degree[to] += 1;
    }

    let radii = nodes
        .iter()
        .map(|node| node.radius(params.collision_padding))
        .collect::<Vec<_>>();

    let mut positions = initial_positions(count, params);
    let mut velocities = vec![Vec2::ZERO; count];
    let mut predicted = Vec::with_capacity(count);

    let iterations = params.iterations.max(1);
    let alpha_decay = 1.0 - ALPHA_MIN.powf(1.0 / iterations as f32);
    let mut alpha = 1.0_f32;

    for _ in 0..iterations {
        alpha += (0.0 - alpha) * alpha_decay;

        for &(source, target) in &links {
            let mut delta = (positions[target] + velocities[target])
                - (positions[source] + velocities[source]);
            if delta.length_sq() == 0.0 {
                delta = vec2(1e-3, 0.0);
            }
            let distance = delta.length();
            let scale = (distance - params.link_distance) / distance * alpha * params.link_strength;
            let pull = delta * scale;
            let bias = degree[source] as f32 / (degree[source] + degree[target]) as f32;
            velocities[target] -= pull * bias;
            velocities[source] += pull * (1.0 - bias);
        }

        let tree = Cell::build(&positions, &radii)
            .ok_or_else(|| GraphError::Layout("simulation diverged".to_owned()))?;
        let charge = ManyBodyParams {
            strength: params.repulsion,
            max_range: params.max_range,
            theta: BARNES_HUT_THETA,
            alpha,
        };
        for (index, velocity) in velocities.iter_mut().enumerate() {
            *velocity += many_body(&tree, index, &positions, charge);
        }

        predicted.clear();
        predicted.extend(
            positions
                .iter()
                .zip(&velocities)
                .map(|(position, velocity)| *position + *velocity),
        );
        if let Some(tree) = Cell::build(&predicted, &radii) {
            collide(&tree, &predicted, &radii, COLLIDE_STRENGTH, &mut velocities);
        }

        for (position, velocity) in positions.iter_mut().zip(velocities.iter_mut()) {
            *velocity *= 1.0 - VELOCITY_DECAY;
            *position += *velocity;
        }

        let mean = positions.iter().copied().fold(Vec2::ZERO, |sum, p| sum + p) / count as f32;
        let shift = params.center.to_vec2() - mean;
        for position in &mut positions {
            *position += shift;
        }
    }

    let placed = positions
        .iter()
        .zip(nodes)
        .map(|(center, node)| (*center - node.size / 2.0).to_pos2())
        .collect::<Vec<_>>();

    if placed.iter().any(|pos| !pos.x.is_finite() || !pos.y.is_finite()) {
        return Err(GraphError::Layout("non-finite position".to_owned()));
    }
    debug!("force layout placed {count} nodes in {iterations} ticks");
    Ok(placed)
}

/// Row-major grid used whenever the simulation cannot produce positions.
pub fn grid_layout(count: usize) -> Vec<Pos2> {
    let columns = (count as f32).sqrt().ceil().max(1.0) as usize;
    (0..count)
        .map(|index| {
            FALLBACK_ORIGIN
                + vec2(
                    (index % columns) as f32 * FALLBACK_CELL.x,
                    (index / columns) as f32 * FALLBACK_CELL.y,
                )
        })
        .collect()
}

/// Force layout, or the grid when it fails.
pub fn layout_or_grid(nodes: &[LayoutNode], edges: &[(usize, usize)], params: &ForceParams) -> Vec<Pos2> {
    match force_layout(nodes, edges, params) {
        Ok(positions) => positions,
        Err(error) => {
            warn!("falling back to grid placement: {error}");
            grid_layout(nodes.len())
        }
    }
}
