//! Best-effort mapping from an imported identifier to the file defining it.
//! Purely textual: import statements are matched with regexes and specifiers are
//! turned into candidate paths.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use fuzzy_matcher::skim::SkimMatcherV2;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::host::Host;
use crate::plugins::PluginIndex;
use crate::util::fuzzy_match_score;

const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];
const SEARCH_LIMIT: usize = 50;

static IMPORT_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"import\s+(?:type\s+)?([^;'"]+?)\s+from\s+['"]([^'"]+)['"]"#)
        .expect("valid import regex")
});

static REQUIRE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:const|let|var)\s+([^=;]+?)\s*=\s*require\(\s*['"]([^'"]+)['"]\s*\)"#)
        .expect("valid require regex")
});

fn binds(clause: &str, identifier: &str) -> bool {
    clause
        .split(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'))
        .any(|token| token == identifier)
}

/// Module specifier of the import or require that brings `identifier` into scope.
pub fn import_specifier(source: &str, identifier: &str) -> Option<String> {
    [&*IMPORT_FROM, &*REQUIRE]
        .into_iter()
        .flat_map(|pattern| pattern.captures_iter(source))
        .find(|captures| binds(&captures[1], identifier))
        .map(|captures| captures[2].to_owned())
}

/// Lexically resolves `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Files a module path may refer to, in probing order.
pub fn module_candidates(base: &Path) -> Vec<PathBuf> {
    let has_source_extension = base
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext));
    if has_source_extension {
        return vec![base.to_path_buf()];
    }

    let mut candidates = SOURCE_EXTENSIONS
        .iter()
        .map(|ext| {
            let mut name = OsString::from(base.as_os_str());
            name.push(".");
            name.push(ext);
            PathBuf::from(name)
        })
        .collect::<Vec<_>>();
    candidates.extend(
        SOURCE_EXTENSIONS
            .iter()
            .map(|ext| base.join(format!("index.{ext}"))),
    );
    candidates
}

/// `@scope/name/sub/path` → (`@scope/name`, `sub/path`); `name/sub` → (`name`, `sub`).
pub fn split_package_specifier(specifier: &str) -> (String, Option<String>) {
    let segments = specifier.split('/').collect::<Vec<_>>();
    let package_len = if specifier.starts_with('@') { 2 } else { 1 };
    let package_len = package_len.min(segments.len());
    let package = segments[..package_len].join("/");
    let rest = segments[package_len..].join("/");
    (package, (!rest.is_empty()).then_some(rest))
}

/// Best candidate for `specifier`, trying shorter path suffixes of it until the
/// fuzzy matcher finds something. Ties keep the shorter path.
pub fn rank_candidates(specifier: &str, candidates: &[PathBuf]) -> Option<PathBuf> {
    let matcher = SkimMatcherV2::default();
    let segments = specifier
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .map(|segment| segment.trim_start_matches('@'))
        .collect::<Vec<_>>();

    for skip in 0..segments.len() {
        let query = segments[skip..].join("/");
        let best = candidates
            .iter()
            .filter_map(|path| {
                fuzzy_match_score(&matcher, &path.to_string_lossy(), &query).map(|score| (score, path))
            })
            .max_by(|(a_score, a_path), (b_score, b_path)| {
                a_score.cmp(b_score).then_with(|| {
                    b_path
                        .as_os_str()
                        .len()
                        .cmp(&a_path.as_os_str().len())
                })
            });
        if let Some((_, path)) = best {
            return Some(path.clone());
        }
    }
    None
}

async fn first_existing(host: &dyn Host, candidates: Vec<PathBuf>) -> Option<PathBuf> {
    for candidate in candidates {
        if host.file_exists(&candidate).await {
            return Some(candidate);
        }
    }
    None
}

/// Defining file of `identifier` as imported by `importing_file`, if the import
/// can be traced.
pub async fn resolve_import(
    host: &dyn Host,
    plugins: &PluginIndex,
    importing_file: &Path,
    identifier: &str,
    exclude: Option<&str>,
) -> Option<PathBuf> {
    let source = host.read_document(importing_file).await.ok()?;
    let specifier = import_specifier(&source, identifier)?;
    debug!("{identifier} is imported from {specifier}");

    if specifier.starts_with('.') {
        let base = normalize(&importing_file.parent()?.join(&specifier));
        if let Some(found) = first_existing(host, module_candidates(&base)).await {
            return Some(found);
        }
    } else {
        let (package, sub_path) = split_package_specifier(&specifier);
        if let Some(directory) = plugins.directory_of(&package) {
            let base = match &sub_path {
                Some(sub_path) => directory.join(sub_path),
                None => directory.clone(),
            };
            if let Some(found) = first_existing(host, module_candidates(&base)).await {
                return Some(found);
            }
        }
    }

    let stem = specifier
        .rsplit('/')
        .next()
        .map(|segment| segment.split('.').next().unwrap_or(segment))
        .filter(|stem| !stem.is_empty() && *stem != "..")?;
    let mut candidates = host
        .find_files(&format!("**/{stem}.*"), exclude, SEARCH_LIMIT)
        .await
        .unwrap_or_default();
    candidates.extend(
        host.find_files(&format!("**/{stem}/index.*"), exclude, SEARCH_LIMIT)
            .await
            .unwrap_or_default(),
    );
    rank_candidates(&specifier, &candidates)
}
