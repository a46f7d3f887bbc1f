//! Where book pages come from.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::BookError;

/// Read access to the pages of a book source directory.
///
/// Paths are normalized by [`path::normalize`](crate::path::normalize):
/// forward slashes, relative to the source root, no `.` or `..` segments.
pub trait PageSource {
    /// Whether a page exists at `path`.
    fn exists(&self, path: &str) -> bool;

    /// Read the page at `path`.
    fn read_to_string(&self, path: &str) -> Result<String, BookError>;

    /// All markdown pages in the source, sorted.
    fn list_pages(&self) -> Result<Vec<String>, BookError>;
}

/// In-memory pages, for tests and generated books.
///
/// Directories are implicit.
///
/// # Example
///
/// ```
/// use bindless_book::{MemorySource, PageSource};
///
/// let source = MemorySource::new()
///     .with_page("SUMMARY.md", "- [Intro](intro.md)")
///     .with_page("intro.md", "# Intro");
/// assert!(source.exists("intro.md"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pages: BTreeMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a page, overwriting any page at the same path.
    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.pages.insert(path.into(), contents.into());
    }

    pub fn with_page(mut self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.pages.remove(path)
    }
}

impl PageSource for MemorySource {
    fn exists(&self, path: &str) -> bool {
        self.pages.contains_key(path)
    }

    fn read_to_string(&self, path: &str) -> Result<String, BookError> {
        self.pages
            .get(path)
            .cloned()
            .ok_or_else(|| BookError::NotFound(path.to_owned()))
    }

    fn list_pages(&self) -> Result<Vec<String>, BookError> {
        Ok(self.pages.keys().filter(|path| path.ends_with(".md")).cloned().collect())
    }
}

/// Pages on disk under a root directory.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    root: PathBuf,
}

impl FileSystemSource {
    /// The directory does not need to exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    fn collect_pages(&self, dir: &Path, prefix: &str, pages: &mut Vec<String>) -> Result<(), BookError> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                log::warn!("Skipping non UTF-8 file name in {}", dir.display());
                continue;
            };
            let relative = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                self.collect_pages(&entry.path(), &relative, pages)?;
            } else if relative.ends_with(".md") {
                pages.push(relative);
            }
        }
        Ok(())
    }
}

impl PageSource for FileSystemSource {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn read_to_string(&self, path: &str) -> Result<String, BookError> {
        Ok(std::fs::read_to_string(self.resolve(path))?)
    }

    fn list_pages(&self) -> Result<Vec<String>, BookError> {
        let mut pages = Vec::new();
        if self.root.is_dir() {
            self.collect_pages(&self.root, "", &mut pages)?;
        }
        pages.sort();
        Ok(pages)
    }
}
