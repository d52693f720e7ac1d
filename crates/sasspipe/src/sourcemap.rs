use crate::file::SourceFile;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_version() -> u32 {
    3
}

/// A JSON source map as exchanged between pipeline stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub file: String,

    #[serde(default)]
    pub sources: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<String>>,

    #[serde(default)]
    pub names: Vec<String>,

    #[serde(default)]
    pub mappings: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
}

impl SourceMap {
    /// The identity map an upstream stage attaches to request map generation
    pub fn initial(file: impl Into<String>, content: Option<String>) -> Self {
        let file = file.into();
        Self {
            version: 3,
            sources: vec![file.clone()],
            sources_content: content.map(|c| vec![c]),
            file,
            names: Vec::new(),
            mappings: String::new(),
            source_root: None,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Drop sources rejected by `keep`, keeping `sourcesContent` aligned
    pub(crate) fn retain_sources(&mut self, mut keep: impl FnMut(&str) -> bool) {
        let kept: Vec<usize> =
            (0..self.sources.len()).filter(|&i| keep(&self.sources[i])).collect();

        if kept.len() == self.sources.len() {
            return;
        }

        if let Some(content) = self.sources_content.take() {
            self.sources_content =
                Some(kept.iter().map(|&i| content.get(i).cloned().unwrap_or_default()).collect());
        }
        let sources: Vec<String> = kept.into_iter().map(|i| self.sources[i].clone()).collect();
        self.sources = sources;
    }
}

/// Remove duplicate and empty source entries, keeping the first occurrence
/// of each and leaving `sourcesContent` aligned
fn dedupe_sources(map: &mut SourceMap) {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    map.retain_sources(|source| !source.is_empty() && seen.insert(source.to_string()));
}

/// Compose a freshly generated map on top of the map the file already
/// carries.
///
/// An upstream map without mappings is an identity placeholder and is
/// replaced outright. Otherwise the new map's mappings win, and sources are
/// merged in first-encountered order with upstream `sourcesContent` carried
/// over for sources that survive. Every source appears exactly once in the
/// final list.
pub fn apply_source_map(file: &mut SourceFile, next: SourceMap) {
    let mut merged = match file.source_map.take() {
        Some(prev) if !prev.mappings.is_empty() => compose(prev, next),
        _ => next,
    };
    dedupe_sources(&mut merged);
    file.source_map = Some(merged);
}

fn compose(prev: SourceMap, mut next: SourceMap) -> SourceMap {
    let mut contents: FxHashMap<String, String> = FxHashMap::default();
    for map in [&prev, &next] {
        if let Some(content) = &map.sources_content {
            for (source, text) in map.sources.iter().zip(content) {
                contents.insert(source.clone(), text.clone());
            }
        }
    }

    for source in &prev.sources {
        if !next.sources.contains(source) {
            next.sources.push(source.clone());
        }
    }

    if !contents.is_empty() {
        next.sources_content = Some(
            next.sources
                .iter()
                .map(|source| contents.get(source).cloned().unwrap_or_default())
                .collect(),
        );
    }

    next
}

/// Convert a `file:` URI back into a filesystem path
pub(crate) fn file_uri_to_path(uri: &str) -> Option<PathBuf> {
    uri.strip_prefix("file://").map(PathBuf::from)
}

/// `data:` URIs stand in for content the compiler received inline rather
/// than reading from disk
pub(crate) fn is_data_uri(source: &str) -> bool {
    source.starts_with("data:")
}
