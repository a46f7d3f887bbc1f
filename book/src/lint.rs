//! Structural checks over a parsed summary.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::config::LintConfig;
use crate::path;
use crate::source::PageSource;
use crate::summary::{Summary, SummaryItem};
use crate::BookError;

pub const SUMMARY_PAGE: &str = "SUMMARY.md";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    MissingPage,
    EscapesRoot,
    ExternalLink,
    DuplicateLink,
    EmptyTitle,
    HeadingLevel,
    DraftChapter,
    NotMarkdown,
    EmptyPart,
    OrphanPage,
}

impl Rule {
    pub const ALL: [Rule; 10] = [
        Rule::MissingPage,
        Rule::EscapesRoot,
        Rule::ExternalLink,
        Rule::DuplicateLink,
        Rule::EmptyTitle,
        Rule::HeadingLevel,
        Rule::DraftChapter,
        Rule::NotMarkdown,
        Rule::EmptyPart,
        Rule::OrphanPage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Rule::MissingPage => "missing-page",
            Rule::EscapesRoot => "escapes-root",
            Rule::ExternalLink => "external-link",
            Rule::DuplicateLink => "duplicate-link",
            Rule::EmptyTitle => "empty-title",
            Rule::HeadingLevel => "heading-level",
            Rule::DraftChapter => "draft-chapter",
            Rule::NotMarkdown => "not-markdown",
            Rule::EmptyPart => "empty-part",
            Rule::OrphanPage => "orphan-page",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Rule::MissingPage | Rule::EscapesRoot | Rule::ExternalLink | Rule::DuplicateLink | Rule::EmptyTitle => {
                Severity::Error
            }
            Rule::HeadingLevel | Rule::DraftChapter | Rule::NotMarkdown | Rule::EmptyPart | Rule::OrphanPage => {
                Severity::Warning
            }
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Rule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rule::ALL
            .into_iter()
            .find(|rule| rule.name() == s)
            .ok_or_else(|| format!("unknown lint rule: {s}"))
    }
}

/// One finding. `line` is the line in `SUMMARY.md`, absent for orphan pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub rule: Rule,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.rule, self.message)?;
        if let Some(line) = self.line {
            write!(f, " ({SUMMARY_PAGE}:{line})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LintReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl LintReport {
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }

    /// Errors always fail; warnings fail only when denied.
    pub fn is_failure(&self, deny_warnings: bool) -> bool {
        self.has_errors() || (deny_warnings && self.warning_count() > 0)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Findings of `rule`.
    pub fn of_rule(&self, rule: Rule) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.rule == rule)
    }
}

struct Collector {
    allowed: HashSet<Rule>,
    diagnostics: Vec<Diagnostic>,
}

impl Collector {
    fn new(config: &LintConfig) -> Self {
        let mut allowed = HashSet::new();
        for name in &config.allow {
            match name.parse::<Rule>() {
                Ok(rule) => {
                    allowed.insert(rule);
                }
                Err(err) => log::warn!("{err}"),
            }
        }
        Self {
            allowed,
            diagnostics: Vec::new(),
        }
    }

    fn report(&mut self, rule: Rule, line: Option<usize>, message: String) {
        if self.allowed.contains(&rule) {
            log::trace!("Suppressed {rule}: {message}");
            return;
        }
        self.diagnostics.push(Diagnostic {
            rule,
            severity: rule.severity(),
            line,
            message,
        });
    }

    fn finish(mut self) -> LintReport {
        self.diagnostics.sort_by(|a, b| (a.line, a.rule).cmp(&(b.line, b.rule)));
        LintReport {
            diagnostics: self.diagnostics,
        }
    }
}

/// Check `summary` against the pages in `source`.
pub fn lint(summary: &Summary, source: &dyn PageSource, config: &LintConfig) -> LintReport {
    let mut out = Collector::new(config);
    let mut first_link_line: HashMap<String, usize> = HashMap::new();

    for link in summary.links() {
        let line = Some(link.line);
        if link.name.trim().is_empty() {
            out.report(Rule::EmptyTitle, line, "link has an empty title".into());
        }

        let Some(target) = &link.location else {
            out.report(Rule::DraftChapter, line, format!("\"{}\" has no page yet", link.name));
            continue;
        };

        if path::is_external(target) {
            out.report(
                Rule::ExternalLink,
                line,
                format!("\"{target}\" points outside the book"),
            );
            continue;
        }

        let page = match path::normalize(target) {
            Ok(page) => page,
            Err(BookError::EscapesRoot(_)) => {
                out.report(
                    Rule::EscapesRoot,
                    line,
                    format!("\"{target}\" climbs above the book source"),
                );
                continue;
            }
            Err(err) => {
                out.report(Rule::MissingPage, line, err.to_string());
                continue;
            }
        };

        if !page.ends_with(".md") {
            out.report(Rule::NotMarkdown, line, format!("\"{page}\" is not a markdown page"));
        }

        if let Some(&first) = first_link_line.get(&page) {
            out.report(
                Rule::DuplicateLink,
                line,
                format!("\"{page}\" is already linked on line {first}"),
            );
        } else {
            if !source.exists(&page) {
                out.report(Rule::MissingPage, line, format!("\"{page}\" does not exist"));
            }
            first_link_line.insert(page, link.line);
        }
    }

    for part in &summary.parts {
        let line = Some(part.line);
        if let Some(title) = &part.title {
            if part.heading_level != 1 {
                out.report(
                    Rule::HeadingLevel,
                    line,
                    format!("part \"{title}\" is a level {} heading", part.heading_level),
                );
            }
            if !part.chapters.iter().any(|item| matches!(item, SummaryItem::Link(_))) {
                out.report(Rule::EmptyPart, line, format!("part \"{title}\" has no chapters"));
            }
        }
    }

    if config.check_orphans {
        match source.list_pages() {
            Ok(pages) => {
                for page in pages {
                    if page != SUMMARY_PAGE && !first_link_line.contains_key(&page) {
                        out.report(
                            Rule::OrphanPage,
                            None,
                            format!("\"{page}\" is not linked from {SUMMARY_PAGE}"),
                        );
                    }
                }
            }
            Err(err) => log::warn!("Cannot list pages for the orphan check: {err}"),
        }
    }

    let report = out.finish();
    log::debug!(
        "Lint finished: {} errors, {} warnings",
        report.error_count(),
        report.warning_count()
    );
    report
}
