//! Overlap removal between sibling boxes.

use eframe::egui::{Rect, vec2};
use log::debug;

pub const COLLISION_MARGIN: f32 = 20.0;
pub const OVERLAP_THRESHOLD: f32 = 1.0;
pub const MAX_COLLISION_ITERATIONS: usize = 50;

#[derive(Clone, Debug, PartialEq)]
pub struct CollisionBox {
    pub id: String,
    /// Boxes only push siblings that share this value.
    pub parent: Option<String>,
    pub rect: Rect,
}

impl CollisionBox {
    pub fn new(id: impl Into<String>, parent: Option<String>, rect: Rect) -> Self {
        Self {
            id: id.into(),
            parent,
            rect,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionConfig {
    pub margin: f32,
    pub threshold: f32,
    pub max_iterations: usize,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            margin: COLLISION_MARGIN,
            threshold: OVERLAP_THRESHOLD,
            max_iterations: MAX_COLLISION_ITERATIONS,
        }
    }
}

fn overlap(a: Rect, b: Rect) -> (f32, f32) {
    (
        a.max.x.min(b.max.x) - a.min.x.max(b.min.x),
        a.max.y.min(b.max.y) - a.min.y.max(b.min.y),
    )
}

/// Nudges overlapping siblings apart along their axis of least overlap, each
/// moving half the overlap plus half the margin. Returns the number of passes
/// that moved something.
pub fn resolve_collisions(boxes: &mut [CollisionBox], config: CollisionConfig) -> usize {
    let mut passes = 0;

    for _ in 0..config.max_iterations {
        let mut moved = false;

        for i in 0..boxes.len() {
            for j in (i + 1)..boxes.len() {
                if boxes[i].parent != boxes[j].parent {
                    continue;
                }

                let (a, b) = (boxes[i].rect, boxes[j].rect);
                let (overlap_x, overlap_y) = overlap(a, b);
                if overlap_x <= config.threshold || overlap_y <= config.threshold {
                    continue;
                }

                let offset = if overlap_x < overlap_y {
                    let direction = if a.center().x < b.center().x { -1.0 } else { 1.0 };
                    vec2(direction * (overlap_x + config.margin) / 2.0, 0.0)
                } else {
                    let direction = if a.center().y < b.center().y { -1.0 } else { 1.0 };
                    vec2(0.0, direction * (overlap_y + config.margin) / 2.0)
                };

                boxes[i].rect = a.translate(offset);
                boxes[j].rect = b.translate(-offset);
                moved = true;
            }
        }

        if !moved {
            break;
        }
        passes += 1;
    }

    if passes > 0 {
        debug!("collision pass settled {} boxes in {passes} passes", boxes.len());
    }
    passes
}
