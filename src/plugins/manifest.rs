use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{GraphError, Result};

/// What the graph needs to know about one plugin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginInfo {
    /// Short id used in `requiredPlugins` lists.
    pub runtime_id: String,
    /// Fully-qualified display id (`@scope/name`).
    pub package_id: String,
    pub directory: PathBuf,
    pub required_plugins: Vec<String>,
}

impl PluginInfo {
    /// Display label, preferring the package id.
    pub fn label(&self) -> &str {
        if self.package_id.is_empty() {
            &self.runtime_id
        } else {
            &self.package_id
        }
    }
}

/// Strips `//` and `/* */` comments and trailing commas so JSON-with-comments
/// text parses as plain JSON. String literals are copied untouched.
pub fn relax_json(text: &str) -> String {
    let mut without_comments = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(ch) = chars.next() {
        if in_string {
            without_comments.push(ch);
            match ch {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        without_comments.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                without_comments.push(ch);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        without_comments.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                for next in chars.by_ref() {
                    if previous == '*' && next == '/' {
                        break;
                    }
                    if next == '\n' {
                        without_comments.push('\n');
                    }
                    previous = next;
                }
            }
            _ => without_comments.push(ch),
        }
    }

    strip_trailing_commas(&without_comments)
}

fn strip_trailing_commas(text: &str) -> String {
    let chars = text.chars().collect::<Vec<_>>();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut index = 0;

    while index < chars.len() {
        let ch = chars[index];
        if in_string {
            out.push(ch);
            if ch == '\\' {
                if let Some(&escaped) = chars.get(index + 1) {
                    out.push(escaped);
                    index += 1;
                }
            } else if ch == '"' {
                in_string = false;
            }
            index += 1;
            continue;
        }

        if ch == '"' {
            in_string = true;
        } else if ch == ',' {
            let next_significant = chars[index + 1..]
                .iter()
                .find(|candidate| !candidate.is_whitespace());
            if matches!(next_significant, Some('}') | Some(']')) {
                index += 1;
                continue;
            }
        }
        out.push(ch);
        index += 1;
    }

    out
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Parses manifest text. `Ok(None)` means the manifest is valid but does not
/// describe a plugin (no `plugin.id`).
pub fn parse_manifest(text: &str, manifest_path: &Path) -> Result<Option<PluginInfo>> {
    let parsed: Value =
        serde_json::from_str(&relax_json(text)).map_err(|error| GraphError::Manifest {
            path: manifest_path.display().to_string(),
            reason: error.to_string(),
        })?;
    let object = parsed.as_object().ok_or_else(|| GraphError::Manifest {
        path: manifest_path.display().to_string(),
        reason: "manifest is not a JSON object".to_owned(),
    })?;

    let plugin = object.get("plugin").and_then(Value::as_object);
    let Some(runtime_id) = plugin
        .and_then(|plugin| plugin.get("id"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
    else {
        return Ok(None);
    };

    let package_id = object
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    let required_plugins = match plugin.and_then(|plugin| plugin.get("requiredPlugins")) {
        Some(required) => string_list(Some(required)),
        None => string_list(object.get("requiredPlugins")),
    };

    let directory = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    Ok(Some(PluginInfo {
        runtime_id: runtime_id.to_owned(),
        package_id,
        directory,
        required_plugins,
    }))
}
