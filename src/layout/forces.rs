use eframe::egui::{Vec2, vec2};

use super::quadtree::{Cell, gap};

#[derive(Clone, Copy, Debug)]
pub(super) struct ManyBodyParams {
    /// Negative values repel.
    pub(super) strength: f32,
    pub(super) max_range: f32,
    pub(super) theta: f32,
    pub(super) alpha: f32,
}

/// Stable direction for coincident centers.
fn jiggle(from: usize, to: usize) -> Vec2 {
    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin()) * 1e-3
}

/// Charge pull from `weight` boxes sitting at `offset`; zero beyond the range.
fn charge(offset: Vec2, weight: f32, params: ManyBodyParams) -> Vec2 {
    let distance_sq = offset.length_sq();
    if distance_sq >= params.max_range * params.max_range {
        return Vec2::ZERO;
    }
    // Inside one unit the squared distance is softened to the plain distance.
    let softened = if distance_sq < 1.0 {
        distance_sq.sqrt().max(1e-6)
    } else {
        distance_sq
    };
    offset * (params.strength * params.alpha * weight / softened)
}

/// Velocity change of box `index` from every other box, with far cells
/// collapsed to their centroid.
pub(super) fn many_body(tree: &Cell, index: usize, centers: &[Vec2], params: ManyBodyParams) -> Vec2 {
    let here = centers[index];
    let mut total = Vec2::ZERO;

    tree.visit(&mut |cell| {
        if cell.weight <= 0.0 {
            return false;
        }
        if cell.is_leaf() {
            for &other in cell.members.iter().filter(|&&other| other != index) {
                let mut offset = centers[other] - here;
                if offset.length_sq() == 0.0 {
                    offset = jiggle(index, other);
                }
                total += charge(offset, 1.0, params);
            }
            return false;
        }

        let offset = cell.centroid - here;
        let far_enough = !cell.bounds.contains(here.to_pos2())
            && cell.bounds.width() < params.theta * offset.length().max(1e-4);
        if far_enough {
            total += charge(offset, cell.weight, params);
            return false;
        }
        true
    });

    total
}

/// Splits the overlap of two circles between them, the smaller circle moving more.
fn separate(
    from: usize,
    to: usize,
    centers: &[Vec2],
    radii: &[f32],
    strength: f32,
    velocities: &mut [Vec2],
) {
    let reach = radii[from] + radii[to];
    let mut offset = centers[from] - centers[to];
    if offset.length_sq() >= reach * reach {
        return;
    }
    if offset.length_sq() == 0.0 {
        offset = jiggle(from, to);
    }
    let distance = offset.length();
    let push = offset * ((reach - distance) / distance * strength);
    let from_area = radii[from] * radii[from];
    let to_area = radii[to] * radii[to];
    let total = (from_area + to_area).max(f32::EPSILON);
    velocities[from] += push * (to_area / total);
    velocities[to] -= push * (from_area / total);
}

/// Resolves circle overlaps at `centers`, visiting each pair once. Cells whose
/// bounds sit further from a center than its radius plus the cell's largest
/// radius are skipped whole.
pub(super) fn collide(
    tree: &Cell,
    centers: &[Vec2],
    radii: &[f32],
    strength: f32,
    velocities: &mut [Vec2],
) {
    for index in 0..centers.len() {
        let here = centers[index];
        tree.visit(&mut |cell| {
            let reach = radii[index] + cell.max_radius;
            if gap(cell.bounds, here).length_sq() > reach * reach {
                return false;
            }
            for &other in cell.members.iter().filter(|&&other| other > index) {
                separate(index, other, centers, radii, strength, velocities);
            }
            true
        });
    }
}
