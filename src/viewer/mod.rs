//! Desktop view of the navigation graph.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eframe::egui::{self, Align, Context, Layout, RichText, Ui, Vec2};
use fuzzy_matcher::skim::SkimMatcherV2;
use tokio::runtime::Handle;

use crate::events::{Notice, Subscription};
use crate::model::{SymbolRef, ViewMode};
use crate::projection::Projection;
use crate::tracker::NavigationTracker;
use crate::util::fuzzy_match_score;

mod canvas;
mod render_utils;

const MAX_NOTICES: usize = 5;

pub struct GraphViewer {
    tracker: NavigationTracker,
    runtime: Handle,
    mode: ViewMode,
    projection: Projection,
    graph_changed: Arc<AtomicBool>,
    notices: Arc<Mutex<VecDeque<String>>>,
    _subscription: Subscription,
    search: String,
    search_matches: Option<(String, Arc<HashSet<String>>)>,
    selected: Option<String>,
    pan: Vec2,
    zoom: f32,
    needs_fit: bool,
    drag: Option<canvas::DragState>,
}

impl GraphViewer {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        mut tracker: NavigationTracker,
        runtime: Handle,
        mode: Option<ViewMode>,
    ) -> Self {
        if let Some(mode) = mode
            && mode != tracker.state().view_mode
        {
            tracker.on_view_mode_changed(mode);
        }

        let graph_changed = Arc::new(AtomicBool::new(true));
        let notices = Arc::new(Mutex::new(VecDeque::new()));
        let subscription = {
            let graph_changed = Arc::clone(&graph_changed);
            let notices = Arc::clone(&notices);
            tracker.subscribe(move |notice| match notice {
                Notice::GraphChanged => graph_changed.store(true, Ordering::Relaxed),
                Notice::Warning(message) => {
                    if let Ok(mut notices) = notices.lock() {
                        notices.push_back(message.clone());
                        while notices.len() > MAX_NOTICES {
                            notices.pop_front();
                        }
                    }
                }
                Notice::Highlighted(_) | Notice::RevealPanel => {}
            })
        };

        Self {
            mode: tracker.state().view_mode,
            tracker,
            runtime,
            projection: Projection::default(),
            graph_changed,
            notices,
            _subscription: subscription,
            search: String::new(),
            search_matches: None,
            selected: None,
            pan: Vec2::ZERO,
            zoom: 1.0,
            needs_fit: true,
            drag: None,
        }
    }

    fn refresh_projection(&mut self) {
        if !self.graph_changed.swap(false, Ordering::Relaxed) {
            return;
        }
        self.projection = self.tracker.projection(self.mode);
        self.search_matches = None;
        if let Some(selected) = &self.selected
            && self.projection.node(selected).is_none()
            && self.projection.group(selected).is_none()
        {
            self.selected = None;
        }
    }

    fn set_mode(&mut self, mode: ViewMode) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        self.tracker.on_view_mode_changed(mode);
        self.graph_changed.store(true, Ordering::Relaxed);
        self.needs_fit = true;
    }

    /// Ids of nodes and groups whose name matches the search box.
    fn cached_search_matches(&mut self) -> Option<Arc<HashSet<String>>> {
        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }
        if let Some((cached_query, matches)) = &self.search_matches
            && cached_query == query
        {
            return Some(Arc::clone(matches));
        }

        let matcher = SkimMatcherV2::default();
        let matches = self
            .projection
            .nodes
            .iter()
            .filter(|node| fuzzy_match_score(&matcher, &node.file_name, query).is_some())
            .map(|node| node.id.clone())
            .chain(
                self.projection
                    .groups
                    .iter()
                    .filter(|group| fuzzy_match_score(&matcher, &group.label, query).is_some())
                    .map(|group| group.id.clone()),
            )
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);
        self.search_matches = Some((query.to_owned(), Arc::clone(&matches)));
        Some(matches)
    }

    fn draw_top_bar(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.heading("navgraph");
            ui.separator();
            let mut mode = self.mode;
            for candidate in ViewMode::ALL {
                ui.selectable_value(&mut mode, candidate, candidate.label());
            }
            self.set_mode(mode);
            ui.separator();
            ui.label("Search:");
            ui.text_edit_singleline(&mut self.search);
            if ui.button("Fit").clicked() {
                self.needs_fit = true;
            }
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.label(format!(
                    "files: {}  groups: {}  edges: {}",
                    self.projection.nodes.len(),
                    self.projection.groups.len(),
                    self.projection.edges.len()
                ));
            });
        });
    }

    fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Details");
        ui.add_space(6.0);

        let Some(selected) = self.selected.clone() else {
            ui.label("Click a file or group on the canvas.");
            return;
        };

        if let Some(node) = self.projection.node(&selected).cloned() {
            ui.label(RichText::new(&node.file_name).strong());
            ui.small(node.file_path.display().to_string());
            if !node.relative_path.is_empty() {
                ui.label(format!("Directory: {}", node.relative_path));
            }
            if let Some(plugin) = &node.plugin_name {
                ui.label(format!("Plugin: {plugin}"));
            }

            let mut open = None;
            ui.separator();
            ui.label(RichText::new("Arrived through").strong());
            symbol_buttons(ui, &node.symbols, &mut open);
            ui.separator();
            ui.label(RichText::new("Left from").strong());
            symbol_buttons(ui, &node.source_symbols, &mut open);

            if let Some(symbol) = open {
                self.runtime
                    .block_on(self.tracker.open_symbol(&node.id, &symbol));
            }
            return;
        }

        if let Some(group) = self.projection.group(&selected) {
            ui.label(RichText::new(&group.label).strong());
            ui.label(group.group_type.label());
            if let Some(path) = &group.plugin_path {
                ui.small(path.as_str());
            }
            if let Some(required) = &group.required_plugins {
                ui.separator();
                ui.label(RichText::new(format!("Requires {} plugins", required.len())).strong());
                for runtime_id in required {
                    ui.label(runtime_id.as_str());
                }
            }
        }
    }

    fn draw_notices(&self, ui: &mut Ui) {
        let Ok(notices) = self.notices.lock() else {
            return;
        };
        if notices.is_empty() {
            return;
        }
        ui.separator();
        for message in notices.iter() {
            ui.colored_label(egui::Color32::from_rgb(236, 180, 90), message.as_str());
        }
    }
}

fn symbol_buttons(ui: &mut Ui, symbols: &[SymbolRef], open: &mut Option<SymbolRef>) {
    if symbols.is_empty() {
        ui.label("None recorded.");
        return;
    }
    for symbol in symbols {
        let text = format!("{} (line {})", symbol.name, symbol.line + 1);
        if ui.button(text).clicked() {
            *open = Some(symbol.clone());
        }
    }
}

impl eframe::App for GraphViewer {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        // Keep polling the complete-view layout worker until its result lands.
        if self.tracker.is_complete_layout_pending() {
            self.graph_changed.store(true, Ordering::Relaxed);
            ctx.request_repaint_after(Duration::from_millis(50));
        }
        self.refresh_projection();

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| self.draw_top_bar(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                self.draw_details(ui);
                self.draw_notices(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| self.draw_graph(ui));

        if self
            .tracker
            .active_node_id()
            .is_some_and(|id| self.tracker.is_highlighted(id))
        {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
