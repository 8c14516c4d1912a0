//! Documents the engine queries, and the optional lookup indexes a host can
//! precompute for them.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::metadata::Frontmatter;

/// A note as handed over by the host. The engine never mutates it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Document {
    pub id: String,
    pub title: String,
    /// Vault-relative path, `/`-separated, e.g. `Work/Projects/Alpha.md`
    pub path: String,
    pub tags: Vec<String>,
    #[serde(alias = "content")]
    pub raw_content: String,
    pub outgoing_link_titles: Vec<String>,
    pub incoming_link_document_ids: Vec<String>,
}

impl Document {
    /// Folder part of the path, empty for notes at the vault root.
    pub fn folder(&self) -> &str {
        self.path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    }

    pub fn reference(&self) -> DocumentRef {
        DocumentRef {
            id: self.id.clone(),
            title: self.title.clone(),
            path: self.path.clone(),
        }
    }
}

/// Identifying fields of a document attached to each result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: String,
    pub title: String,
    pub path: String,
}

/// Tag text as stored in indexes: lowercase, no leading `#`.
pub fn tag_key(tag: &str) -> String {
    tag.trim_start_matches('#').to_lowercase()
}

/// Folder text as stored in indexes: lowercase, no surrounding `/`.
pub fn folder_key(folder: &str) -> String {
    folder.trim_matches('/').to_lowercase()
}

/// Every ancestor folder of a path, nearest last: `a/b/c.md` → `a`, `a/b`.
fn ancestor_folders(path: &str) -> Vec<String> {
    let key = folder_key(path);
    let mut folders = Vec::new();
    let mut end = 0;
    while let Some(offset) = key[end..].find('/') {
        end += offset;
        folders.push(key[..end].to_string());
        end += 1;
    }
    folders
}

/// True when `path` lies somewhere under `folder` (case-insensitive).
pub fn in_folder(path: &str, folder: &str) -> bool {
    let folder = folder_key(folder);
    if folder.is_empty() {
        return false;
    }
    let path = folder_key(path);
    path.len() > folder.len() && path.starts_with(&folder) && path[folder.len()..].starts_with('/')
}

/// Caller-supplied lookup structures. All are optional; the executor falls
/// back to scanning the documents when one is missing.
///
/// Index keys must be in the form produced by [`tag_key`] and [`folder_key`];
/// folder entries list every document anywhere beneath the folder.
#[derive(Debug, Clone, Default)]
pub struct QueryIndexes {
    pub tag_index: Option<HashMap<String, HashSet<String>>>,
    pub folder_index: Option<HashMap<String, HashSet<String>>>,
    pub frontmatter_cache: Option<HashMap<String, Frontmatter>>,
}

impl QueryIndexes {
    /// Builds the tag and folder indexes for `documents`.
    pub fn build(documents: &[Document]) -> Self {
        let mut tag_index: HashMap<String, HashSet<String>> = HashMap::new();
        let mut folder_index: HashMap<String, HashSet<String>> = HashMap::new();

        for doc in documents {
            for tag in &doc.tags {
                tag_index
                    .entry(tag_key(tag))
                    .or_default()
                    .insert(doc.id.clone());
            }
            for folder in ancestor_folders(&doc.path) {
                folder_index.entry(folder).or_default().insert(doc.id.clone());
            }
        }

        QueryIndexes {
            tag_index: Some(tag_index),
            folder_index: Some(folder_index),
            frontmatter_cache: None,
        }
    }

    pub fn with_frontmatter_cache(mut self, cache: HashMap<String, Frontmatter>) -> Self {
        self.frontmatter_cache = Some(cache);
        self
    }
}
