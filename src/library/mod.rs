//! Prompt library loading.
//!
//! A library is a directory tree of Markdown prompt documents. Loading walks
//! the tree once, records every file path (link targets may be images or
//! other non-Markdown files), and reads and parses the Markdown files with
//! bounded concurrency. A file that cannot be read is recorded as a read
//! failure; it never aborts the load.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::document::PromptDocument;
use crate::error::LibraryError;

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &["target", "node_modules"];

/// Options controlling how a library is loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Path prefixes, relative to the root, to skip.
    pub exclude: Vec<String>,
    /// Maximum number of files read at once.
    pub concurrency: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            concurrency: 4,
        }
    }
}

/// A Markdown file that could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadFailure {
    pub path: String,
    pub message: String,
}

/// All documents of a prompt library, sorted by path.
#[derive(Debug, Clone, Default)]
pub struct PromptLibrary {
    root: PathBuf,
    documents: Vec<PromptDocument>,
    files: BTreeSet<String>,
    read_failures: Vec<ReadFailure>,
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown"))
        .unwrap_or(false)
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

/// Converts `path` under `root` to a `/`-separated relative path.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn is_excluded(rel: &str, exclude: &[String]) -> bool {
    exclude.iter().any(|prefix| {
        let prefix = prefix.trim_matches('/');
        !prefix.is_empty()
            && (rel == prefix
                || rel
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/')))
    })
}

impl PromptLibrary {
    /// Loads every Markdown file under `root`.
    pub async fn load(root: impl AsRef<Path>, options: &LoadOptions) -> Result<Self, LibraryError> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(LibraryError::RootNotFound(root.display().to_string()));
        }
        if !root.is_dir() {
            return Err(LibraryError::NotADirectory(root.display().to_string()));
        }

        let mut files = BTreeSet::new();
        let mut markdown = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !is_skipped_dir(e))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(LibraryError::Walk(e)),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(rel) = relative_path(root, entry.path()) else {
                continue;
            };
            if is_excluded(&rel, &options.exclude) {
                debug!(path = %rel, "Excluded");
                continue;
            }
            if is_markdown(entry.path()) {
                markdown.push((rel.clone(), entry.path().to_path_buf()));
            }
            files.insert(rel);
        }

        info!(
            root = %root.display(),
            files = files.len(),
            markdown = markdown.len(),
            "Scanned library"
        );

        let concurrency = options.concurrency.max(1);
        let results: Vec<(String, std::io::Result<String>)> = stream::iter(markdown)
            .map(|(rel, abs)| async move {
                let content = tokio::fs::read_to_string(&abs).await;
                (rel, content)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut documents = Vec::with_capacity(results.len());
        let mut read_failures = Vec::new();
        for (rel, content) in results {
            match content {
                Ok(content) => documents.push(PromptDocument::parse(rel, content)),
                Err(e) => {
                    warn!(path = %rel, error = %e, "Failed to read file");
                    read_failures.push(ReadFailure {
                        path: rel,
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(Self::from_parts(root, documents, files, read_failures))
    }

    /// Builds a library from already-parsed documents.
    ///
    /// `files` lists every path that exists in the library, including
    /// non-Markdown files; document paths are added automatically.
    pub fn from_documents<I, S>(root: impl Into<PathBuf>, documents: Vec<PromptDocument>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let files = files.into_iter().map(Into::into).collect();
        Self::from_parts(root, documents, files, Vec::new())
    }

    fn from_parts(
        root: impl Into<PathBuf>,
        mut documents: Vec<PromptDocument>,
        mut files: BTreeSet<String>,
        mut read_failures: Vec<ReadFailure>,
    ) -> Self {
        documents.sort_by(|a, b| a.path.cmp(&b.path));
        read_failures.sort_by(|a, b| a.path.cmp(&b.path));
        files.extend(documents.iter().map(|d| d.path.clone()));
        Self {
            root: root.into(),
            documents,
            files,
            read_failures,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns true if a file (of any type) exists at the relative `path`.
    pub fn contains_file(&self, path: &str) -> bool {
        self.files.contains(path)
    }

    /// All file paths in the library.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    pub fn read_failures(&self) -> &[ReadFailure] {
        &self.read_failures
    }

    pub fn get(&self, path: &str) -> Option<&PromptDocument> {
        self.documents
            .binary_search_by(|d| d.path.as_str().cmp(path))
            .ok()
            .map(|idx| &self.documents[idx])
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PromptDocument> {
        self.documents.iter()
    }

    /// Documents whose containing directory is named `category`.
    pub fn by_category(&self, category: &str) -> Vec<&PromptDocument> {
        self.documents
            .iter()
            .filter(|d| d.category().is_some_and(|c| c.eq_ignore_ascii_case(category)))
            .collect()
    }

    /// Documents targeting `platform` (case-insensitive).
    pub fn by_platform(&self, platform: &str) -> Vec<&PromptDocument> {
        self.filter_list_field(platform, |d| d.fields().map(|f| &f.platforms))
    }

    /// Documents whose audience includes `audience` (case-insensitive).
    pub fn by_audience(&self, audience: &str) -> Vec<&PromptDocument> {
        self.filter_list_field(audience, |d| d.fields().map(|f| &f.audience))
    }

    /// Documents with the given `reviewStatus` (case-insensitive).
    pub fn by_review_status(&self, status: &str) -> Vec<&PromptDocument> {
        self.documents
            .iter()
            .filter(|d| {
                d.fields()
                    .and_then(|f| f.review_status.as_deref())
                    .is_some_and(|s| s.trim().eq_ignore_ascii_case(status))
            })
            .collect()
    }

    fn filter_list_field<'a>(
        &'a self,
        wanted: &str,
        field: impl Fn(&'a PromptDocument) -> Option<&'a Vec<String>>,
    ) -> Vec<&'a PromptDocument> {
        self.documents
            .iter()
            .filter(|d| {
                field(*d).is_some_and(|values| {
                    values.iter().any(|v| v.trim().eq_ignore_ascii_case(wanted))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn doc(path: &str, frontmatter: &str) -> PromptDocument {
        PromptDocument::parse(path, format!("---\n{}---\n# Title\n", frontmatter))
    }

    #[tokio::test]
    async fn test_load_walks_tree() {
        let dir = tempdir().expect("failed to create temp dir");
        let analysis = dir.path().join("prompts/analysis");
        fs::create_dir_all(&analysis).expect("failed to create dirs");
        fs::create_dir_all(dir.path().join(".git")).expect("failed to create .git");
        fs::write(analysis.join("gap-analysis-expert.md"), "# Gap\n").expect("write");
        fs::write(analysis.join("diagram.png"), [0u8, 1, 2]).expect("write");
        fs::write(dir.path().join("README.md"), "# Library\n").expect("write");
        fs::write(dir.path().join(".git/HEAD.md"), "# hidden\n").expect("write");

        let library = PromptLibrary::load(dir.path(), &LoadOptions::default())
            .await
            .expect("failed to load");

        let paths: Vec<&str> = library.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "prompts/analysis/gap-analysis-expert.md"]);
        assert!(library.contains_file("prompts/analysis/diagram.png"));
        assert!(!library.contains_file(".git/HEAD.md"));
        assert!(library.read_failures().is_empty());
    }

    #[tokio::test]
    async fn test_load_respects_exclude() {
        let dir = tempdir().expect("failed to create temp dir");
        fs::create_dir_all(dir.path().join("drafts")).expect("failed to create dirs");
        fs::write(dir.path().join("drafts/wip.md"), "# WIP\n").expect("write");
        fs::write(dir.path().join("drafts-final.md"), "# Final\n").expect("write");

        let options = LoadOptions {
            exclude: vec!["drafts".to_string()],
            concurrency: 2,
        };
        let library = PromptLibrary::load(dir.path(), &options)
            .await
            .expect("failed to load");
        assert_eq!(library.len(), 1);
        assert!(library.get("drafts-final.md").is_some());
    }

    #[tokio::test]
    async fn test_load_missing_root() {
        let dir = tempdir().expect("failed to create temp dir");
        let result = PromptLibrary::load(dir.path().join("nope"), &LoadOptions::default()).await;
        assert!(matches!(result, Err(LibraryError::RootNotFound(_))));
    }

    #[tokio::test]
    async fn test_load_records_non_utf8_file() {
        let dir = tempdir().expect("failed to create temp dir");
        fs::write(dir.path().join("binary.md"), [0xffu8, 0xfe, 0x00]).expect("write");
        let library = PromptLibrary::load(dir.path(), &LoadOptions::default())
            .await
            .expect("failed to load");
        assert!(library.is_empty());
        assert_eq!(library.read_failures().len(), 1);
        assert_eq!(library.read_failures()[0].path, "binary.md");
    }

    #[test]
    fn test_queries() {
        let library = PromptLibrary::from_documents(
            ".",
            vec![
                doc(
                    "prompts/m365/meeting-recap.md",
                    "title: Recap\nplatforms: [m365-copilot]\naudience: [manager]\nreviewStatus: approved\n",
                ),
                doc(
                    "prompts/analysis/gap.md",
                    "title: Gap\nplatforms: [claude, M365-Copilot]\nreviewStatus: draft\n",
                ),
            ],
            Vec::<String>::new(),
        );

        assert_eq!(library.len(), 2);
        assert_eq!(library.iter().next().map(|d| d.path.as_str()), Some("prompts/analysis/gap.md"));
        assert_eq!(library.by_category("m365").len(), 1);
        assert_eq!(library.by_platform("m365-copilot").len(), 2);
        assert_eq!(library.by_audience("manager").len(), 1);
        assert_eq!(library.by_review_status("Draft").len(), 1);
        assert!(library.contains_file("prompts/m365/meeting-recap.md"));
        assert!(library.get("prompts/analysis/gap.md").is_some());
        assert!(library.get("missing.md").is_none());
    }

    #[test]
    fn test_is_excluded() {
        let exclude = vec!["prompts/archive/".to_string()];
        assert!(is_excluded("prompts/archive/old.md", &exclude));
        assert!(is_excluded("prompts/archive", &exclude));
        assert!(!is_excluded("prompts/archived.md", &exclude));
    }
}
