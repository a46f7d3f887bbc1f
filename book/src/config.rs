//! `book.toml` configuration.
//!
//! ```toml
//! [book]
//! title = "Bindless"
//! src = "src"
//!
//! [lint]
//! deny-warnings = true
//! check-orphans = true
//! allow = ["draft-chapter"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::BookError;

pub const CONFIG_FILE: &str = "book.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    pub book: BookSection,
    pub lint: LintConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookSection {
    pub title: Option<String>,
    /// Source directory, relative to the book root.
    pub src: String,
}

impl Default for BookSection {
    fn default() -> Self {
        Self {
            title: None,
            src: "src".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LintConfig {
    /// Fail on warnings, not only on errors.
    pub deny_warnings: bool,
    /// Report pages the summary never links.
    pub check_orphans: bool,
    /// Rule names to suppress.
    pub allow: Vec<String>,
}

impl BookConfig {
    /// Read `book.toml` from `book_dir`, or use defaults when there is none.
    pub fn load(book_dir: &Path) -> Result<Self, BookError> {
        let path = book_dir.join(CONFIG_FILE);
        if !path.is_file() {
            log::debug!("No {CONFIG_FILE} in {}, using defaults", book_dir.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, BookError> {
        toml::from_str(text).map_err(|err| BookError::Config(err.to_string()))
    }
}
