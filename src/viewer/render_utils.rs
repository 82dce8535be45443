use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

use crate::model::GroupType;

/// Fill and outline of a group box.
pub(super) fn group_palette(group_type: GroupType) -> (Color32, Color32) {
    match group_type {
        GroupType::Plugin => (Color32::from_rgb(33, 48, 66), Color32::from_rgb(86, 140, 196)),
        GroupType::Dependency | GroupType::Path => {
            (Color32::from_rgb(38, 40, 46), Color32::from_rgb(96, 100, 110))
        }
    }
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (56.0 * zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.center() + pan;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));

    let mut x = origin.x.rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = origin.y.rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

/// Whether any part of the segment passes through `rect` grown by `padding`
/// (Liang-Barsky clip).
pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let area = rect.expand(padding);
    let delta = end - start;
    let (mut enter, mut exit) = (0.0_f32, 1.0_f32);

    for (step, room) in [
        (-delta.x, start.x - area.left()),
        (delta.x, area.right() - start.x),
        (-delta.y, start.y - area.top()),
        (delta.y, area.bottom() - start.y),
    ] {
        if step == 0.0 {
            if room < 0.0 {
                return false;
            }
            continue;
        }
        let t = room / step;
        if step < 0.0 {
            enter = enter.max(t);
        } else {
            exit = exit.min(t);
        }
        if enter > exit {
            return false;
        }
    }
    true
}

/// Canvas coordinates to screen space; the canvas origin sits at the viewport
/// center shifted by `pan`.
pub(super) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Pos2) -> Pos2 {
    rect.center() + pan + world.to_vec2() * zoom
}

pub(super) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Pos2 {
    ((screen - rect.center() - pan) / zoom).to_pos2()
}

pub(super) fn world_rect_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Rect) -> Rect {
    Rect::from_min_max(
        world_to_screen(rect, pan, zoom, world.min),
        world_to_screen(rect, pan, zoom, world.max),
    )
}

/// Point on the border of `rect` along the ray from its center toward `toward`.
pub(super) fn border_point(rect: Rect, toward: Pos2) -> Pos2 {
    let center = rect.center();
    let delta = toward - center;
    if delta.x.abs() <= f32::EPSILON && delta.y.abs() <= f32::EPSILON {
        return center;
    }
    let half = rect.size() / 2.0;
    let scale_x = if delta.x.abs() > f32::EPSILON { half.x / delta.x.abs() } else { f32::INFINITY };
    let scale_y = if delta.y.abs() > f32::EPSILON { half.y / delta.y.abs() } else { f32::INFINITY };
    center + delta * scale_x.min(scale_y).min(1.0)
}
