use std::path::{Path, PathBuf};

use eframe::egui::{Pos2, Rect, Vec2, pos2, vec2};
use serde::{Deserialize, Deserializer, Serialize};

pub const GROUP_ID_PREFIX: &str = "group-";
pub const DEPENDENCY_EDGE_PREFIX: &str = "dep-";

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<Position> for Pos2 {
    fn from(position: Position) -> Self {
        pos2(position.x, position.y)
    }
}

impl From<Pos2> for Position {
    fn from(pos: Pos2) -> Self {
        Self { x: pos.x, y: pos.y }
    }
}

/// An identifier annotation on a file node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolRef {
    pub name: String,
    pub line: u32,
    pub file_path: PathBuf,
}

impl SymbolRef {
    pub fn new(name: impl Into<String>, line: u32, file_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            line,
            file_path: file_path.into(),
        }
    }
}

/// Appends `symbol` unless an entry with the same (name, line) exists.
pub fn push_unique_symbol(symbols: &mut Vec<SymbolRef>, symbol: SymbolRef) -> bool {
    if symbols
        .iter()
        .any(|existing| existing.name == symbol.name && existing.line == symbol.line)
    {
        return false;
    }
    symbols.push(symbol);
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub id: String,
    pub file_path: PathBuf,
    pub file_name: String,
    #[serde(default)]
    pub relative_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Local to the parent group when `group_id` is set, absolute otherwise.
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub symbols: Vec<SymbolRef>,
    #[serde(default)]
    pub source_symbols: Vec<SymbolRef>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    #[default]
    Navigation,
    Dependency,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default)]
    pub edge_type: EdgeType,
}

impl NavigationEdge {
    pub fn navigation(source: &str, target: &str) -> Self {
        Self {
            id: format!("{source}-{target}"),
            source: source.to_owned(),
            target: target.to_owned(),
            source_handle: None,
            target_handle: None,
            edge_type: EdgeType::Navigation,
        }
    }

    /// Edge from a dependency group to the plugin group requiring it. Dependencies
    /// sit below their dependents, so it leaves the top and enters the bottom.
    pub fn dependency(dependency_group: &str, dependent_group: &str) -> Self {
        Self {
            id: dependency_edge_id(dependency_group, dependent_group),
            source: dependency_group.to_owned(),
            target: dependent_group.to_owned(),
            source_handle: Some("top".to_owned()),
            target_handle: Some("bottom".to_owned()),
            edge_type: EdgeType::Dependency,
        }
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }

    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

pub fn dependency_edge_id(dependency_group: &str, dependent_group: &str) -> String {
    format!("{DEPENDENCY_EDGE_PREFIX}{dependency_group}-{dependent_group}")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    Plugin,
    Dependency,
    Path,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub group_type: GroupType,
    pub position: Position,
    pub width: f32,
    pub height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_plugins: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_path: Option<String>,
}

impl GroupType {
    pub fn label(self) -> &'static str {
        match self {
            GroupType::Plugin => "Plugin",
            GroupType::Dependency => "Dependency",
            GroupType::Path => "Path",
        }
    }
}

impl GroupNode {
    pub fn runtime_id(&self) -> &str {
        self.id.strip_prefix(GROUP_ID_PREFIX).unwrap_or(&self.id)
    }

    pub fn is_plugin(&self) -> bool {
        self.group_type == GroupType::Plugin
    }

    pub fn requires(&self, runtime_id: &str) -> bool {
        self.group_type == GroupType::Plugin
            && self
                .required_plugins
                .as_ref()
                .is_some_and(|required| required.iter().any(|id| id == runtime_id))
    }

    pub fn rect(&self) -> Rect {
        Rect::from_min_size(self.position.into(), vec2(self.width, self.height))
    }

    pub fn size(&self) -> Vec2 {
        vec2(self.width, self.height)
    }

    pub fn bottom(&self) -> f32 {
        self.position.y + self.height
    }
}

pub fn group_id_for(runtime_id: &str) -> String {
    format!("{GROUP_ID_PREFIX}{runtime_id}")
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Journey,
    Plugin,
    Complete,
}

impl ViewMode {
    pub const ALL: [ViewMode; 3] = [ViewMode::Journey, ViewMode::Plugin, ViewMode::Complete];

    /// Unknown names map to `None` so callers can ignore them.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "journey" => Some(Self::Journey),
            "plugin" => Some(Self::Plugin),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Journey => "journey",
            Self::Plugin => "plugin",
            Self::Complete => "complete",
        }
    }
}

fn lenient_view_mode<'de, D>(deserializer: D) -> Result<ViewMode, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(ViewMode::parse).unwrap_or_default())
}

/// The whole persisted graph. Vectors keep insertion order, which the placement
/// rules depend on; ids are unique within each vector.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphState {
    #[serde(default)]
    pub nodes: Vec<FileNode>,
    #[serde(default)]
    pub edges: Vec<NavigationEdge>,
    #[serde(default)]
    pub groups: Vec<GroupNode>,
    #[serde(default, deserialize_with = "lenient_view_mode")]
    pub view_mode: ViewMode,
}

impl GraphState {
    pub fn node(&self, id: &str) -> Option<&FileNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn node_by_path(&self, path: &Path) -> Option<&FileNode> {
        self.nodes.iter().find(|node| node.file_path == path)
    }

    pub fn group(&self, id: &str) -> Option<&GroupNode> {
        self.groups.iter().find(|group| group.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&NavigationEdge> {
        self.edges.iter().find(|edge| edge.id == id)
    }

    pub fn files_in_group<'a>(&'a self, group_id: &'a str) -> impl Iterator<Item = &'a FileNode> {
        self.nodes
            .iter()
            .filter(move |node| node.group_id.as_deref() == Some(group_id))
    }

    pub fn file_count(&self, group_id: &str) -> usize {
        self.files_in_group(group_id).count()
    }

    pub fn is_required_by_other_plugin(&self, runtime_id: &str, except_group: &str) -> bool {
        self.groups
            .iter()
            .any(|group| group.id != except_group && group.requires(runtime_id))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.groups.is_empty()
    }
}
