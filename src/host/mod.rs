//! Capabilities the graph engine needs from the editor it runs inside.

mod fs;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use fs::FsHost;

/// Zero-based line/character position inside a document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TextPosition {
    pub line: u32,
    pub character: u32,
}

impl TextPosition {
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: TextPosition,
    pub end: TextPosition,
}

impl TextRange {
    pub const fn new(start: TextPosition, end: TextPosition) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, position: TextPosition) -> bool {
        self.start <= position && position <= self.end
    }

    pub fn is_caret(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    File,
    Module,
    Namespace,
    Package,
    Class,
    Method,
    Property,
    Field,
    Constructor,
    Enum,
    Interface,
    Function,
    Variable,
    Constant,
    Other,
}

impl SymbolKind {
    /// Kinds that count as a named declaration for edge annotations.
    pub fn is_declaration(self) -> bool {
        matches!(
            self,
            Self::Function
                | Self::Method
                | Self::Class
                | Self::Interface
                | Self::Variable
                | Self::Constant
                | Self::Enum
                | Self::Constructor
        )
    }
}

/// One entry of a document outline as reported by the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub range: TextRange,
    pub selection_range: TextRange,
    #[serde(default)]
    pub children: Vec<DocumentSymbol>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub path: PathBuf,
    pub range: TextRange,
}

#[async_trait]
pub trait Host: Send + Sync {
    /// Shows the document in the editor. Fails with `GraphError::NotFound` when the
    /// file no longer exists.
    async fn open_document(&self, path: &Path) -> Result<()>;

    async fn close_document(&self, path: &Path) -> Result<()>;

    /// Loads the text of a document without showing it.
    async fn read_document(&self, path: &Path) -> Result<String>;

    async fn file_exists(&self, path: &Path) -> bool {
        self.read_document(path).await.is_ok()
    }

    async fn document_symbols(&self, path: &Path) -> Result<Vec<DocumentSymbol>>;

    async fn definition_location(
        &self,
        path: &Path,
        position: TextPosition,
    ) -> Result<Option<Location>>;

    async fn find_files(
        &self,
        include: &str,
        exclude: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PathBuf>>;
}
