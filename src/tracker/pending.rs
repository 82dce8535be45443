use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;

use crate::model::SymbolRef;

const RESERVED_WORDS: &[&str] = &[
    "const", "let", "function", "return", "import", "export", "from", "class", "new", "if", "else",
];

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}

fn is_identifier_part(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

/// Identifier token under (or immediately before) the caret at `character`.
pub fn identifier_at(line_text: &str, character: u32) -> Option<String> {
    let chars = line_text.chars().collect::<Vec<_>>();
    let caret = (character as usize).min(chars.len());

    let anchor = if caret < chars.len() && is_identifier_part(chars[caret]) {
        caret
    } else if caret > 0 && is_identifier_part(chars[caret - 1]) {
        caret - 1
    } else {
        return None;
    };

    let mut start = anchor;
    while start > 0 && is_identifier_part(chars[start - 1]) {
        start -= 1;
    }
    let mut end = anchor + 1;
    while end < chars.len() && is_identifier_part(chars[end]) {
        end += 1;
    }

    // A leading digit run is not part of the token: `1foo` touches nothing.
    if !is_identifier_start(chars[start]) {
        return None;
    }
    let token = chars[start..end].iter().collect::<String>();
    if RESERVED_WORDS.contains(&token.as_str()) {
        return None;
    }
    Some(token)
}

/// The last identifier the user touched, waiting for a navigation to explain.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingSymbol {
    pub name: String,
    pub line: u32,
    pub file_path: PathBuf,
    pub touched_at: Instant,
    /// Declaration containing the touch, once the outline lookup returns.
    pub enclosing: Option<SymbolRef>,
}

impl PendingSymbol {
    pub fn destination(&self) -> SymbolRef {
        SymbolRef::new(self.name.clone(), self.line, self.file_path.clone())
    }
}

/// Single-entry slot. Each `record` bumps the generation so late lookups for an
/// older touch cannot overwrite a newer one.
#[derive(Debug, Default)]
pub struct PendingSlot {
    generation: u64,
    current: Option<PendingSymbol>,
}

impl PendingSlot {
    pub fn record(&mut self, name: String, line: u32, file_path: PathBuf, now: Instant) -> u64 {
        self.generation += 1;
        self.current = Some(PendingSymbol {
            name,
            line,
            file_path,
            touched_at: now,
            enclosing: None,
        });
        self.generation
    }

    pub fn resolve_enclosing(&mut self, generation: u64, enclosing: SymbolRef) -> bool {
        match self.current.as_mut() {
            Some(pending) if self.generation == generation => {
                pending.enclosing = Some(enclosing);
                true
            }
            _ => false,
        }
    }

    /// Consumes the pending symbol when it was touched within `window` in a file
    /// other than `target`. Expired entries are dropped; same-file entries stay.
    pub fn take_fresh(&mut self, target: &Path, window: Duration, now: Instant) -> Option<PendingSymbol> {
        let pending = self.current.as_ref()?;
        if now.saturating_duration_since(pending.touched_at) > window {
            self.current = None;
            return None;
        }
        if pending.file_path == target {
            return None;
        }
        self.current.take()
    }

    pub fn peek(&self) -> Option<&PendingSymbol> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
