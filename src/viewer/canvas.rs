use std::collections::HashMap;

use eframe::egui::{
    self, Align2, Color32, CornerRadius, FontId, Pos2, Rect, Sense, Stroke, StrokeKind, Ui, Vec2,
    vec2,
};

use log::debug;

use crate::layout::groups::{PLUGIN_MIN_WIDTH, file_rect};
use crate::model::{EdgeType, Position};

use super::GraphViewer;
use super::render_utils::{
    border_point, dim_color, draw_background, edge_visible, group_palette, screen_to_world,
    world_rect_to_screen, world_to_screen,
};

const FIT_MARGIN: f32 = 0.9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DragTarget {
    Group,
    File,
}

/// An in-progress primary drag; committed to the tracker on release.
pub(super) struct DragState {
    target: DragTarget,
    id: String,
    start: Position,
    offset: Vec2,
}

/// World-space boxes of everything drawn this frame.
struct Scene {
    groups: Vec<(usize, Rect)>,
    files: Vec<(usize, Rect)>,
    rect_by_id: HashMap<String, Rect>,
}

impl Scene {
    fn bounds(&self) -> Option<Rect> {
        self.rect_by_id
            .values()
            .copied()
            .reduce(|acc, rect| acc.union(rect))
    }
}

impl GraphViewer {
    fn drag_offset_for(&self, id: &str) -> Vec2 {
        self.drag
            .as_ref()
            .filter(|drag| drag.id == id)
            .map_or(Vec2::ZERO, |drag| drag.offset)
    }

    fn build_scene(&self) -> Scene {
        let mut rect_by_id = HashMap::new();

        let groups = self
            .projection
            .groups
            .iter()
            .enumerate()
            .map(|(index, group)| {
                let rect = group.rect().translate(self.drag_offset_for(&group.id));
                rect_by_id.insert(group.id.clone(), rect);
                (index, rect)
            })
            .collect::<Vec<_>>();

        let files = self
            .projection
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let parent = node
                    .group_id
                    .as_deref()
                    .and_then(|id| rect_by_id.get(id).copied());
                let rect = match parent {
                    Some(parent) => {
                        file_rect(node.position, parent.width()).translate(parent.min.to_vec2())
                    }
                    None => file_rect(node.position, PLUGIN_MIN_WIDTH),
                };
                (index, rect.translate(self.drag_offset_for(&node.id)))
            })
            .collect::<Vec<_>>();
        for (index, rect) in &files {
            rect_by_id.insert(self.projection.nodes[*index].id.clone(), *rect);
        }

        Scene {
            groups,
            files,
            rect_by_id,
        }
    }

    fn fit_to(&mut self, viewport: Rect, scene: &Scene) {
        let Some(bounds) = scene.bounds() else {
            self.zoom = 1.0;
            self.pan = Vec2::ZERO;
            return;
        };
        let scale_x = viewport.width() / bounds.width().max(1.0);
        let scale_y = viewport.height() / bounds.height().max(1.0);
        self.zoom = (scale_x.min(scale_y) * FIT_MARGIN).clamp(0.05, 2.0);
        self.pan = -bounds.center().to_vec2() * self.zoom;
    }

    /// Topmost file or group under the world-space point.
    fn hit_test(&self, scene: &Scene, world: Pos2) -> Option<(DragTarget, String)> {
        scene
            .files
            .iter()
            .rev()
            .find(|(_, rect)| rect.contains(world))
            .map(|(index, _)| (DragTarget::File, self.projection.nodes[*index].id.clone()))
            .or_else(|| {
                scene
                    .groups
                    .iter()
                    .rev()
                    .find(|(_, rect)| rect.contains(world))
                    .map(|(index, _)| (DragTarget::Group, self.projection.groups[*index].id.clone()))
            })
    }

    fn handle_graph_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.05, 6.0);
        self.pan = pointer - rect.center() - (world_before.to_vec2() * self.zoom);
    }

    fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }

    fn handle_item_drag(&mut self, ui: &Ui, rect: Rect, response: &egui::Response, scene: &Scene) {
        if response.drag_started_by(egui::PointerButton::Primary) {
            let origin = ui
                .input(|input| input.pointer.press_origin())
                .map(|pointer| screen_to_world(rect, self.pan, self.zoom, pointer));
            self.drag = origin
                .and_then(|world| self.hit_test(scene, world))
                .and_then(|(target, id)| {
                    let start = match target {
                        DragTarget::Group => self.projection.group(&id)?.position,
                        DragTarget::File => self.projection.node(&id)?.position,
                    };
                    Some(DragState {
                        target,
                        id,
                        start,
                        offset: Vec2::ZERO,
                    })
                });
        }

        if response.dragged_by(egui::PointerButton::Primary)
            && let Some(drag) = self.drag.as_mut()
        {
            drag.offset += response.drag_delta() / self.zoom;
        }

        if response.drag_stopped()
            && let Some(drag) = self.drag.take()
        {
            let position = Position::new(drag.start.x + drag.offset.x, drag.start.y + drag.offset.y);
            let moved = match drag.target {
                DragTarget::Group => self.tracker.move_group(&drag.id, position),
                DragTarget::File => self.tracker.move_node(&drag.id, position),
            };
            if moved {
                ui.ctx().request_repaint();
            } else {
                debug!("{} cannot be moved in this view", drag.id);
            }
        }
    }

    pub(super) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        let scene = self.build_scene();
        if self.needs_fit {
            self.fit_to(rect, &scene);
            self.needs_fit = false;
        }

        draw_background(&painter, rect, self.pan, self.zoom);
        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);
        self.handle_item_drag(ui, rect, &response, &scene);

        if response.clicked_by(egui::PointerButton::Primary) {
            self.selected = ui
                .input(|input| input.pointer.interact_pos())
                .map(|pointer| screen_to_world(rect, self.pan, self.zoom, pointer))
                .and_then(|world| self.hit_test(&scene, world))
                .map(|(_, id)| id);
        }

        if self.projection.groups.is_empty() && self.projection.nodes.is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No files visited yet.",
                FontId::proportional(16.0),
                Color32::from_gray(160),
            );
            return;
        }

        let matches = self.cached_search_matches();
        let is_dimmed = |id: &str| matches.as_ref().is_some_and(|matches| !matches.contains(id));
        let pan = self.pan;
        let zoom = self.zoom;
        let show_text = zoom > 0.35;
        let corner = CornerRadius::same((6.0 * zoom).clamp(1.0, 12.0) as u8);

        for (index, world) in &scene.groups {
            let group = &self.projection.groups[*index];
            let screen = world_rect_to_screen(rect, pan, zoom, *world);
            if !rect.intersects(screen) {
                continue;
            }
            let (fill, outline) = group_palette(group.group_type);
            let factor = if is_dimmed(&group.id) { 0.45 } else { 1.0 };
            let width = if self.selected.as_deref() == Some(group.id.as_str()) { 2.5 } else { 1.2 };
            painter.rect(
                screen,
                corner,
                dim_color(fill, factor),
                Stroke::new(width, dim_color(outline, factor)),
                StrokeKind::Inside,
            );
            if show_text {
                painter.text(
                    screen.left_top() + vec2(10.0, 8.0) * zoom,
                    Align2::LEFT_TOP,
                    &group.label,
                    FontId::proportional((14.0 * zoom).clamp(8.0, 22.0)),
                    dim_color(Color32::from_gray(225), factor),
                );
            }
        }

        for edge in &self.projection.edges {
            let (Some(source), Some(target)) =
                (scene.rect_by_id.get(&edge.source), scene.rect_by_id.get(&edge.target))
            else {
                continue;
            };
            let start = border_point(*source, target.center());
            let end = border_point(*target, source.center());
            let start = world_to_screen(rect, pan, zoom, start);
            let end = world_to_screen(rect, pan, zoom, end);
            if !edge_visible(rect, start, end, 4.0) {
                continue;
            }
            let color = match edge.edge_type {
                EdgeType::Navigation => Color32::from_rgb(120, 190, 255),
                EdgeType::Dependency => Color32::from_rgba_unmultiplied(150, 150, 160, 140),
            };
            painter.line_segment([start, end], Stroke::new((1.6 * zoom).clamp(0.8, 3.0), color));
            painter.circle_filled(end, (3.0 * zoom).clamp(1.5, 5.0), color);
        }

        let highlight = Color32::from_rgb(250, 204, 80);
        for (index, world) in &scene.files {
            let node = &self.projection.nodes[*index];
            let screen = world_rect_to_screen(rect, pan, zoom, *world);
            if !rect.intersects(screen) {
                continue;
            }
            let factor = if is_dimmed(&node.id) { 0.45 } else { 1.0 };
            let active = self.tracker.active_node_id() == Some(node.id.as_str());
            let outline = if self.tracker.is_highlighted(&node.id) {
                Stroke::new(2.5, highlight)
            } else if active || self.selected.as_deref() == Some(node.id.as_str()) {
                Stroke::new(2.0, Color32::from_rgb(170, 220, 255))
            } else {
                Stroke::new(1.0, dim_color(Color32::from_rgb(90, 110, 130), factor))
            };
            painter.rect(
                screen,
                corner,
                dim_color(Color32::from_rgb(52, 62, 78), factor),
                outline,
                StrokeKind::Inside,
            );
            if show_text {
                painter.text(
                    screen.left_center() + vec2(8.0 * zoom, 0.0),
                    Align2::LEFT_CENTER,
                    &node.file_name,
                    FontId::monospace((12.0 * zoom).clamp(7.0, 18.0)),
                    dim_color(Color32::from_gray(235), factor),
                );
            }
        }

        if response.dragged() {
            ui.ctx().request_repaint();
        }
    }
}
