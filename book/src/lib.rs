//! # Bindless Book
//!
//! Tooling for the bindless documentation book: a parser for its index,
//! `SUMMARY.md`, and a linter for the structural properties of that index.
//!
//! A book directory holds an optional `book.toml` and a source directory
//! (`src` by default) with `SUMMARY.md` and the pages it links.
//!
//! ```
//! use bindless_book::{lint, parse_summary, LintConfig, MemorySource};
//!
//! let summary = parse_summary("# Summary\n\n- [Overview](overview.md)\n").unwrap();
//! let pages = MemorySource::new().with_page("overview.md", "# Overview");
//! let report = lint(&summary, &pages, &LintConfig::default());
//! assert!(!report.is_failure(true));
//! ```

use std::path::{Path, PathBuf};

pub mod args;
pub mod config;
mod error;
pub mod lint;
pub mod path;
mod source;
pub mod summary;

pub use config::{BookConfig, BookSection, LintConfig};
pub use error::BookError;
pub use lint::{Diagnostic, LintReport, Rule, Severity, lint};
pub use source::{FileSystemSource, MemorySource, PageSource};
pub use summary::{Link, Part, SectionNumber, Summary, SummaryError, SummaryItem, parse_summary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn init() {
    log::info!("Bindless Book v{}", VERSION);
}

/// A book on disk with its configuration and parsed index.
#[derive(Debug, Clone)]
pub struct Book {
    root: PathBuf,
    pub config: BookConfig,
    pub summary: Summary,
}

impl Book {
    /// Load `book.toml` from `dir`, then read and parse `<src>/SUMMARY.md`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, BookError> {
        let root = dir.as_ref().to_path_buf();
        let config = BookConfig::load(&root)?;
        let source = FileSystemSource::new(root.join(&config.book.src));
        let text = source.read_to_string(lint::SUMMARY_PAGE)?;
        let summary = parse_summary(&text)?;
        log::debug!(
            "Opened book {} with {} links",
            root.display(),
            summary.links().count()
        );
        Ok(Self { root, config, summary })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join(&self.config.book.src)
    }

    pub fn title(&self) -> Option<&str> {
        self.config.book.title.as_deref().or(self.summary.title.as_deref())
    }

    /// Lint with the `[lint]` settings of `book.toml`.
    pub fn lint(&self) -> LintReport {
        self.lint_with(&self.config.lint)
    }

    pub fn lint_with(&self, config: &LintConfig) -> LintReport {
        lint(&self.summary, &FileSystemSource::new(self.src_dir()), config)
    }
}
