//! Deterministic placement of groups and files as the journey grows.

use eframe::egui::{Rect, vec2};

use crate::model::{GraphState, GroupNode, GroupType, Position};

pub const PLUGIN_ORIGIN: Position = Position::new(50.0, 50.0);
pub const PLUGIN_STACK_GAP: f32 = 80.0;
pub const PLUGIN_MIN_WIDTH: f32 = 320.0;

pub const COMPACT_WIDTH: f32 = 220.0;
pub const COMPACT_HEIGHT: f32 = 56.0;

pub const HEADER_HEIGHT: f32 = 44.0;
pub const FILE_ROW_HEIGHT: f32 = 32.0;
pub const FILE_ROW_SPACING: f32 = 8.0;
pub const FILE_INSET_X: f32 = 16.0;
pub const BOTTOM_PADDING: f32 = 16.0;

pub const DEPENDENCY_MAX_COLUMNS: usize = 4;
pub const DEPENDENCY_COLUMN_GAP: f32 = 24.0;
pub const DEPENDENCY_ROW_GAP: f32 = 24.0;
pub const DEPENDENCY_VERTICAL_GAP: f32 = 60.0;

pub const UNGROUPED_GAP: f32 = 60.0;

/// Height a group needs to show `file_count` rows.
pub fn required_height(file_count: usize) -> f32 {
    HEADER_HEIGHT + (file_count as f32 * (FILE_ROW_HEIGHT + FILE_ROW_SPACING)) + BOTTOM_PADDING
}

/// Width of a file row inside a group of the given width.
pub fn file_width(group_width: f32) -> f32 {
    (group_width - 2.0 * FILE_INSET_X).max(FILE_ROW_HEIGHT)
}

/// Box of a file row at `position` inside a group of the given width.
pub fn file_rect(position: Position, group_width: f32) -> Rect {
    Rect::from_min_size(position.into(), vec2(file_width(group_width), FILE_ROW_HEIGHT))
}

/// Local position of the `index`-th file inside its group.
pub fn file_slot(index: usize) -> Position {
    Position::new(
        FILE_INSET_X,
        HEADER_HEIGHT + index as f32 * (FILE_ROW_HEIGHT + FILE_ROW_SPACING),
    )
}

/// Grows a non-empty group to fit its files, never shrinking it; an empty group
/// collapses to the compact size.
pub fn fit_group_to_files(group: &mut GroupNode, file_count: usize) {
    if file_count == 0 {
        group.width = COMPACT_WIDTH;
        group.height = COMPACT_HEIGHT;
        return;
    }
    group.width = group.width.max(PLUGIN_MIN_WIDTH);
    group.height = group.height.max(required_height(file_count));
}

/// Where the next new plugin group goes: below the most recently created plugin
/// group, or at the origin for the first one.
pub fn next_plugin_group_position(state: &GraphState) -> Position {
    state
        .groups
        .iter()
        .rev()
        .find(|group| group.group_type == GroupType::Plugin)
        .map(|group| Position::new(PLUGIN_ORIGIN.x, group.bottom() + PLUGIN_STACK_GAP))
        .unwrap_or(PLUGIN_ORIGIN)
}

/// Number of grid columns for `count` dependency boxes.
pub fn dependency_columns(count: usize) -> usize {
    if count == 0 {
        return 1;
    }
    ((count as f32).sqrt().ceil() as usize).clamp(1, DEPENDENCY_MAX_COLUMNS)
}

/// Grid slots for `count` dependency boxes centered beneath `owner`. Rows fill
/// left to right; the last partial row is centered.
pub fn dependency_grid(owner: &GroupNode, count: usize) -> Vec<Position> {
    if count == 0 {
        return Vec::new();
    }

    let columns = dependency_columns(count);
    let grid_width =
        columns as f32 * COMPACT_WIDTH + (columns.saturating_sub(1)) as f32 * DEPENDENCY_COLUMN_GAP;
    let start_x = owner.position.x + owner.width / 2.0 - grid_width / 2.0;
    let start_y = owner.bottom() + DEPENDENCY_VERTICAL_GAP;
    let rows = count.div_ceil(columns);

    let mut slots = Vec::with_capacity(count);
    for row in 0..rows {
        let in_row = (count - row * columns).min(columns);
        let row_width =
            in_row as f32 * COMPACT_WIDTH + (in_row.saturating_sub(1)) as f32 * DEPENDENCY_COLUMN_GAP;
        let offset = if row + 1 == rows {
            (grid_width - row_width) / 2.0
        } else {
            0.0
        };
        for column in 0..in_row {
            slots.push(Position::new(
                start_x + offset + column as f32 * (COMPACT_WIDTH + DEPENDENCY_COLUMN_GAP),
                start_y + row as f32 * (COMPACT_HEIGHT + DEPENDENCY_ROW_GAP),
            ));
        }
    }
    slots
}

/// Absolute position for a file that belongs to no group: stacked below every
/// existing group in arrival order.
pub fn ungrouped_file_position(state: &GraphState) -> Position {
    let lowest = state
        .groups
        .iter()
        .map(GroupNode::bottom)
        .fold(None, |lowest: Option<f32>, bottom| {
            Some(lowest.map_or(bottom, |value| value.max(bottom)))
        });
    let top = lowest.map_or(PLUGIN_ORIGIN.y, |bottom| bottom + UNGROUPED_GAP);
    let ungrouped = state
        .nodes
        .iter()
        .filter(|node| node.group_id.is_none())
        .count();
    Position::new(
        PLUGIN_ORIGIN.x,
        top + ungrouped as f32 * (FILE_ROW_HEIGHT + FILE_ROW_SPACING),
    )
}
