use eframe::egui::{Pos2, Rect, Vec2, pos2, vec2};

const LEAF_CAPACITY: usize = 12;
const MAX_DEPTH: usize = 10;

/// Square cell of a Barnes-Hut tree over box centers.
///
/// Every cell carries the member count as its weight, the centroid of its
/// members and the largest member radius, so collision checks can skip whole
/// cells that no circle reaches into.
#[derive(Debug)]
pub(super) struct Cell {
    pub(super) bounds: Rect,
    pub(super) weight: f32,
    pub(super) centroid: Vec2,
    pub(super) max_radius: f32,
    pub(super) members: Vec<usize>,
    pub(super) children: Vec<Cell>,
}

impl Cell {
    /// `None` when any center is not finite.
    pub(super) fn build(centers: &[Vec2], radii: &[f32]) -> Option<Self> {
        let bounds = square_bounds(centers)?;
        Some(Self::split(bounds, (0..centers.len()).collect(), centers, radii, 0))
    }

    fn split(
        bounds: Rect,
        members: Vec<usize>,
        centers: &[Vec2],
        radii: &[f32],
        depth: usize,
    ) -> Self {
        let weight = members.len() as f32;
        let centroid = if members.is_empty() {
            bounds.center().to_vec2()
        } else {
            members
                .iter()
                .fold(Vec2::ZERO, |sum, &index| sum + centers[index])
                / weight
        };
        let max_radius = members
            .iter()
            .map(|&index| radii.get(index).copied().unwrap_or(0.0))
            .fold(0.0_f32, f32::max);

        let mut cell = Self {
            bounds,
            weight,
            centroid,
            max_radius,
            members,
            children: Vec::new(),
        };
        if depth >= MAX_DEPTH
            || cell.members.len() <= LEAF_CAPACITY
            || all_coincident(&cell.members, centers)
        {
            return cell;
        }

        let middle = bounds.center();
        let mut quadrants: [Vec<usize>; 4] = Default::default();
        for &index in &cell.members {
            let point = centers[index];
            let slot = usize::from(point.x >= middle.x) + 2 * usize::from(point.y >= middle.y);
            quadrants[slot].push(index);
        }

        cell.children = quadrants
            .into_iter()
            .enumerate()
            .filter(|(_, quadrant)| !quadrant.is_empty())
            .map(|(slot, quadrant)| {
                Self::split(quarter(bounds, slot), quadrant, centers, radii, depth + 1)
            })
            .collect();
        cell.members.clear();
        cell
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Pre-order walk; returning `false` from `visitor` skips that cell's children.
    pub(super) fn visit(&self, visitor: &mut impl FnMut(&Cell) -> bool) {
        if visitor(self) {
            for child in &self.children {
                child.visit(visitor);
            }
        }
    }
}

fn all_coincident(members: &[usize], centers: &[Vec2]) -> bool {
    let first = members.first().map(|&index| centers[index]);
    members
        .iter()
        .all(|&index| Some(centers[index]) == first)
}

fn square_bounds(centers: &[Vec2]) -> Option<Rect> {
    let mut bounds = Rect::NOTHING;
    for center in centers {
        if !center.x.is_finite() || !center.y.is_finite() {
            return None;
        }
        bounds.extend_with(center.to_pos2());
    }
    if centers.is_empty() {
        return Some(Rect::from_center_size(Pos2::ZERO, Vec2::splat(2.0)));
    }
    let side = bounds.width().max(bounds.height()).max(1.0) + 2.0;
    Some(Rect::from_center_size(bounds.center(), Vec2::splat(side)))
}

fn quarter(bounds: Rect, slot: usize) -> Rect {
    let half = bounds.size() / 2.0;
    let min = pos2(
        bounds.min.x + if slot % 2 == 1 { half.x } else { 0.0 },
        bounds.min.y + if slot >= 2 { half.y } else { 0.0 },
    );
    Rect::from_min_size(min, half)
}

/// Shortest distance from `point` to `bounds`, zero inside.
pub(super) fn gap(bounds: Rect, point: Vec2) -> Vec2 {
    let point = point.to_pos2();
    vec2(
        (bounds.min.x - point.x).max(point.x - bounds.max.x).max(0.0),
        (bounds.min.y - point.y).max(point.y - bounds.max.y).max(0.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_members(cell: &Cell) -> Vec<usize> {
        let mut found = Vec::new();
        cell.visit(&mut |cell| {
            found.extend_from_slice(&cell.members);
            true
        });
        found.sort_unstable();
        found
    }

    #[test]
    fn every_box_lands_in_exactly_one_leaf() {
        let centers = (0..100)
            .map(|i| vec2((i % 10) as f32 * 50.0, (i / 10) as f32 * 30.0))
            .collect::<Vec<_>>();
        let radii = vec![10.0; centers.len()];
        let tree = Cell::build(&centers, &radii).unwrap();

        assert!(!tree.is_leaf());
        assert_eq!(tree.weight, 100.0);
        assert_eq!(tree.max_radius, 10.0);
        assert_eq!(leaf_members(&tree), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn max_radius_is_tracked_per_cell() {
        let mut centers = vec![vec2(0.0, 0.0); 13];
        centers.push(vec2(900.0, 900.0));
        let mut radii = vec![5.0; 13];
        radii.push(80.0);
        let tree = Cell::build(&centers, &radii).unwrap();

        assert_eq!(tree.max_radius, 80.0);
        let small = tree
            .children
            .iter()
            .find(|child| child.members.contains(&0))
            .unwrap();
        assert_eq!(small.max_radius, 5.0);
    }

    #[test]
    fn non_finite_centers_build_nothing() {
        assert!(Cell::build(&[vec2(0.0, 0.0), vec2(f32::NAN, 1.0)], &[1.0, 1.0]).is_none());
    }

    #[test]
    fn coincident_boxes_stay_in_one_leaf() {
        let centers = vec![vec2(5.0, 5.0); 40];
        let tree = Cell::build(&centers, &vec![1.0; 40]).unwrap();
        assert!(tree.is_leaf());
        assert_eq!(tree.members.len(), 40);
    }

    #[test]
    fn gap_is_zero_inside() {
        let bounds = Rect::from_min_size(pos2(0.0, 0.0), vec2(10.0, 10.0));
        assert_eq!(gap(bounds, vec2(5.0, 5.0)), Vec2::ZERO);
        assert_eq!(gap(bounds, vec2(13.0, -4.0)), vec2(3.0, 4.0));
    }
}
