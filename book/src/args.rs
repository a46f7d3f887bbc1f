//! Command line arguments of the `bindless-book` binary.
//!
//! # Examples
//!
//! ```bash
//! # Lint the book in ./docs and fail on warnings too
//! bindless-book lint docs --deny-warnings
//!
//! # Machine readable findings, with orphan pages reported
//! bindless-book lint docs --check-orphans --format json
//!
//! # Print the numbered outline
//! bindless-book outline docs
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::LintConfig;

#[derive(Parser, Debug)]
#[command(
    name = "bindless-book",
    about = "Check and outline the bindless documentation book",
    version
)]
pub struct BookArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check the structure of SUMMARY.md against the book pages.
    Lint(LintArgs),
    /// Print the numbered chapter outline.
    Outline(OutlineArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One line per finding.
    #[default]
    Text,
    /// The whole report as JSON.
    Json,
}

#[derive(Args, Debug)]
pub struct LintArgs {
    /// Book directory, containing book.toml.
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Fail on warnings as well as errors.
    #[arg(long)]
    pub deny_warnings: bool,

    /// Report pages not linked from SUMMARY.md.
    #[arg(long)]
    pub check_orphans: bool,

    /// Suppress a rule, for example `draft-chapter`. Repeatable.
    #[arg(long = "allow", value_name = "RULE")]
    pub allow: Vec<String>,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl LintArgs {
    /// Apply the flags on top of the `[lint]` table of `book.toml`.
    pub fn apply(&self, config: &mut LintConfig) {
        config.deny_warnings |= self.deny_warnings;
        config.check_orphans |= self.check_orphans;
        for rule in &self.allow {
            if !config.allow.contains(rule) {
                config.allow.push(rule.clone());
            }
        }
    }
}

#[derive(Args, Debug)]
pub struct OutlineArgs {
    /// Book directory, containing book.toml.
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lint() {
        let args = BookArgs::try_parse_from([
            "bindless-book",
            "lint",
            "docs",
            "--deny-warnings",
            "--allow",
            "draft-chapter",
            "--allow",
            "empty-part",
            "--format",
            "json",
        ])
        .unwrap();
        let Command::Lint(lint) = args.command else {
            panic!("expected lint command");
        };
        assert_eq!(lint.dir, PathBuf::from("docs"));
        assert!(lint.deny_warnings);
        assert!(!lint.check_orphans);
        assert_eq!(lint.allow, vec!["draft-chapter", "empty-part"]);
        assert_eq!(lint.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_outline_default_dir() {
        let args = BookArgs::try_parse_from(["bindless-book", "outline"]).unwrap();
        let Command::Outline(outline) = args.command else {
            panic!("expected outline command");
        };
        assert_eq!(outline.dir, PathBuf::from("."));
    }

    #[test]
    fn test_flags_override_config() {
        let args = BookArgs::try_parse_from(["bindless-book", "lint", "--check-orphans", "--allow", "not-markdown"])
            .unwrap();
        let Command::Lint(lint) = args.command else {
            panic!("expected lint command");
        };
        let mut config = LintConfig {
            deny_warnings: true,
            check_orphans: false,
            allow: vec!["not-markdown".into()],
        };
        lint.apply(&mut config);
        assert!(config.deny_warnings);
        assert!(config.check_orphans);
        assert_eq!(config.allow, vec!["not-markdown"]);
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(BookArgs::try_parse_from(["bindless-book", "lint", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_command_definition() {
        use clap::CommandFactory;
        BookArgs::command().debug_assert();
    }
}
