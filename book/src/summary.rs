//! The documentation index (`SUMMARY.md`) model and parser.
//!
//! The index is an ordered outline of titled links:
//!
//! ```text
//! # Summary
//!
//! [Overview](overview.md)
//!
//! # Getting Started
//!
//! - [Installation](getting-started/installation.md)
//!     - [Features](getting-started/features.md)
//!
//! ---
//!
//! [Glossary](glossary.md)
//! ```
//!
//! Standalone links before the first list are prefix chapters, lists are
//! numbered chapters, standalone links after the last list are suffix
//! chapters. A heading after the title starts a new part.

use std::fmt;
use std::ops::Range;

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use serde::Serialize;

/// Parse failure, carrying the 1-based line of the offending content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SummaryError {
    #[error("line {line}: expected a link")]
    ExpectedLink { line: usize },

    #[error("line {line}: numbered chapters cannot follow suffix chapters")]
    NumberedAfterSuffix { line: usize },

    #[error("line {line}: unexpected {found}")]
    UnexpectedContent { line: usize, found: String },
}

impl SummaryError {
    pub fn line(&self) -> usize {
        match self {
            SummaryError::ExpectedLink { line }
            | SummaryError::NumberedAfterSuffix { line }
            | SummaryError::UnexpectedContent { line, .. } => *line,
        }
    }
}

/// Position of a numbered chapter, displayed as `1.2.3.`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SectionNumber(pub Vec<u32>);

impl SectionNumber {
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for SectionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.0 {
            write!(f, "{part}.")?;
        }
        Ok(())
    }
}

/// A titled link to a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub name: String,
    /// `None` for a draft chapter, written `[Title]()`.
    pub location: Option<String>,
    pub number: Option<SectionNumber>,
    pub nested_items: Vec<SummaryItem>,
    pub line: usize,
}

impl Link {
    pub fn is_draft(&self) -> bool {
        self.location.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SummaryItem {
    Link(Link),
    Separator { line: usize },
}

impl SummaryItem {
    pub fn as_link(&self) -> Option<&Link> {
        match self {
            SummaryItem::Link(link) => Some(link),
            SummaryItem::Separator { .. } => None,
        }
    }
}

/// A group of numbered chapters under an optional heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Part {
    pub title: Option<String>,
    pub heading_level: u8,
    pub line: usize,
    pub chapters: Vec<SummaryItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub title: Option<String>,
    pub prefix_chapters: Vec<SummaryItem>,
    pub parts: Vec<Part>,
    pub suffix_chapters: Vec<SummaryItem>,
}

impl Summary {
    /// Every link in document order, nested links right after their parent.
    pub fn links(&self) -> Links<'_> {
        let mut stack = Vec::with_capacity(self.parts.len() + 2);
        stack.push(self.suffix_chapters.iter());
        for part in self.parts.iter().rev() {
            stack.push(part.chapters.iter());
        }
        stack.push(self.prefix_chapters.iter());
        Links { stack }
    }

    /// Links that carry a section number.
    pub fn numbered_chapters(&self) -> impl Iterator<Item = &Link> {
        self.links().filter(|link| link.number.is_some())
    }

    /// Human readable outline: part titles, then chapters indented by depth.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        if let Some(title) = &self.title {
            out.push_str(title);
            out.push('\n');
        }
        write_items(&mut out, &self.prefix_chapters);
        for part in &self.parts {
            if let Some(title) = &part.title {
                out.push('\n');
                out.push_str(title);
                out.push('\n');
            }
            write_items(&mut out, &part.chapters);
        }
        if !self.suffix_chapters.is_empty() {
            out.push('\n');
        }
        write_items(&mut out, &self.suffix_chapters);
        out
    }
}

fn write_items(out: &mut String, items: &[SummaryItem]) {
    for link in items.iter().filter_map(SummaryItem::as_link) {
        match &link.number {
            Some(number) => {
                let indent = "  ".repeat(number.depth());
                out.push_str(&format!("{indent}{number} {}\n", link.name));
            }
            None => out.push_str(&format!("{}\n", link.name)),
        }
        write_items(out, &link.nested_items);
    }
}

/// Depth-first iterator over the links of a [`Summary`].
#[derive(Debug)]
pub struct Links<'a> {
    stack: Vec<std::slice::Iter<'a, SummaryItem>>,
}

impl<'a> Iterator for Links<'a> {
    type Item = &'a Link;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(SummaryItem::Link(link)) => {
                    self.stack.push(link.nested_items.iter());
                    return Some(link);
                }
                Some(SummaryItem::Separator { .. }) => continue,
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Parse the text of a `SUMMARY.md`.
pub fn parse_summary(text: &str) -> Result<Summary, SummaryError> {
    SummaryParser::new(text).parse()
}

struct SummaryParser<'a> {
    events: std::iter::Peekable<std::vec::IntoIter<(Event<'a>, Range<usize>)>>,
    line_starts: Vec<usize>,
    top_level_count: u32,
}

impl<'a> SummaryParser<'a> {
    fn new(text: &'a str) -> Self {
        let events: Vec<_> = Parser::new(text)
            .into_offset_iter()
            .filter(|(event, _)| {
                !matches!(
                    event,
                    Event::Html(_)
                        | Event::InlineHtml(_)
                        | Event::Start(Tag::HtmlBlock)
                        | Event::End(TagEnd::HtmlBlock)
                )
            })
            .collect();
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(pos, _)| pos + 1))
            .collect();
        Self {
            events: events.into_iter().peekable(),
            line_starts,
            top_level_count: 0,
        }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset)
    }

    fn next_event(&mut self) -> Option<(Event<'a>, usize)> {
        let (event, range) = self.events.next()?;
        Some((event, self.line_of(range.start)))
    }

    fn peek_line(&mut self) -> usize {
        let offset = self.events.peek().map(|(_, range)| range.start);
        offset.map_or_else(|| self.line_starts.len(), |offset| self.line_of(offset))
    }

    fn unexpected(event: &Event<'_>, line: usize) -> SummaryError {
        SummaryError::UnexpectedContent {
            line,
            found: describe(event),
        }
    }

    fn parse(mut self) -> Result<Summary, SummaryError> {
        let title = self.parse_title();
        let prefix_chapters = self.parse_prefix()?;
        let (parts, suffix_chapters) = self.parse_parts()?;
        Ok(Summary {
            title,
            prefix_chapters,
            parts,
            suffix_chapters,
        })
    }

    fn parse_title(&mut self) -> Option<String> {
        match self.events.peek() {
            Some((
                Event::Start(Tag::Heading {
                    level: HeadingLevel::H1,
                    ..
                }),
                _,
            )) => {
                self.events.next();
                Some(self.collect_text(|end| matches!(end, TagEnd::Heading(_))))
            }
            _ => None,
        }
    }

    fn parse_prefix(&mut self) -> Result<Vec<SummaryItem>, SummaryError> {
        let mut items = Vec::new();
        loop {
            match self.events.peek() {
                None
                | Some((Event::Start(Tag::List(_)), _))
                | Some((Event::Start(Tag::Heading { .. }), _)) => return Ok(items),
                Some(_) => {}
            }
            let Some((event, line)) = self.next_event() else {
                return Ok(items);
            };
            match event {
                Event::Start(Tag::Paragraph) => items.extend(self.parse_link_paragraph(line)?),
                Event::Rule => items.push(SummaryItem::Separator { line }),
                other => return Err(Self::unexpected(&other, line)),
            }
        }
    }

    fn parse_parts(&mut self) -> Result<(Vec<Part>, Vec<SummaryItem>), SummaryError> {
        let mut parts = Vec::new();
        let mut suffix = Vec::new();
        let mut current = Part {
            title: None,
            heading_level: 1,
            line: self.peek_line(),
            chapters: Vec::new(),
        };

        while let Some((event, line)) = self.next_event() {
            match event {
                Event::Start(Tag::List(_)) => {
                    if !suffix.is_empty() {
                        return Err(SummaryError::NumberedAfterSuffix { line });
                    }
                    let chapters = self.parse_list(&[])?;
                    current.chapters.extend(chapters);
                }
                Event::Start(Tag::Heading { level, .. }) => {
                    if !suffix.is_empty() {
                        return Err(SummaryError::NumberedAfterSuffix { line });
                    }
                    let title = self.collect_text(|end| matches!(end, TagEnd::Heading(_)));
                    let next = Part {
                        title: Some(title),
                        heading_level: heading_level(level),
                        line,
                        chapters: Vec::new(),
                    };
                    let finished = std::mem::replace(&mut current, next);
                    if finished.title.is_some() || !finished.chapters.is_empty() {
                        parts.push(finished);
                    }
                }
                Event::Start(Tag::Paragraph) => {
                    let links = self.parse_link_paragraph(line)?;
                    suffix.extend(links);
                }
                Event::Rule => {
                    if suffix.is_empty() {
                        current.chapters.push(SummaryItem::Separator { line });
                    } else {
                        suffix.push(SummaryItem::Separator { line });
                    }
                }
                other => return Err(Self::unexpected(&other, line)),
            }
        }

        if current.title.is_some() || !current.chapters.is_empty() {
            parts.push(current);
        }
        Ok((parts, suffix))
    }

    /// Links of a paragraph made only of links. The paragraph start is consumed.
    fn parse_link_paragraph(&mut self, line: usize) -> Result<Vec<SummaryItem>, SummaryError> {
        let mut links = Vec::new();
        while let Some((event, event_line)) = self.next_event() {
            match event {
                Event::Start(Tag::Link { dest_url, .. }) => {
                    let link = self.parse_link(dest_url.into_string(), None, event_line);
                    links.push(SummaryItem::Link(link));
                }
                Event::SoftBreak | Event::HardBreak => {}
                Event::Text(text) if text.trim().is_empty() => {}
                Event::End(TagEnd::Paragraph) => break,
                _ => return Err(SummaryError::ExpectedLink { line: event_line }),
            }
        }
        if links.is_empty() {
            return Err(SummaryError::ExpectedLink { line });
        }
        Ok(links)
    }

    /// Body of a link whose start was consumed.
    fn parse_link(&mut self, dest_url: String, number: Option<SectionNumber>, line: usize) -> Link {
        let name = self.collect_text(|end| matches!(end, TagEnd::Link));
        Link {
            name,
            location: (!dest_url.is_empty()).then_some(dest_url),
            number,
            nested_items: Vec::new(),
            line,
        }
    }

    /// Items of a list whose start was consumed. Top-level numbering is
    /// shared by every part.
    fn parse_list(&mut self, parent: &[u32]) -> Result<Vec<SummaryItem>, SummaryError> {
        let mut items = Vec::new();
        let mut nested_count = 0;
        loop {
            let Some((event, line)) = self.next_event() else {
                return Ok(items);
            };
            match event {
                Event::Start(Tag::Item) => {
                    let index = if parent.is_empty() {
                        self.top_level_count += 1;
                        self.top_level_count
                    } else {
                        nested_count += 1;
                        nested_count
                    };
                    let mut number = parent.to_vec();
                    number.push(index);
                    items.push(SummaryItem::Link(self.parse_item(number, line)?));
                }
                Event::End(TagEnd::List(_)) => return Ok(items),
                other => return Err(Self::unexpected(&other, line)),
            }
        }
    }

    fn parse_item(&mut self, number: Vec<u32>, line: usize) -> Result<Link, SummaryError> {
        let mut link: Option<Link> = None;
        while let Some((event, event_line)) = self.next_event() {
            match event {
                Event::Start(Tag::Paragraph) | Event::End(TagEnd::Paragraph) => {}
                Event::SoftBreak | Event::HardBreak => {}
                Event::Text(text) if text.trim().is_empty() => {}
                Event::Start(Tag::Link { dest_url, .. }) if link.is_none() => {
                    let number = SectionNumber(number.clone());
                    link = Some(self.parse_link(dest_url.into_string(), Some(number), event_line));
                }
                Event::Start(Tag::List(_)) => match link.as_mut() {
                    Some(parent) => {
                        let nested = self.parse_list(&number)?;
                        parent.nested_items.extend(nested);
                    }
                    None => return Err(SummaryError::ExpectedLink { line }),
                },
                Event::End(TagEnd::Item) => break,
                other if link.is_some() => return Err(Self::unexpected(&other, event_line)),
                _ => return Err(SummaryError::ExpectedLink { line }),
            }
        }
        link.ok_or(SummaryError::ExpectedLink { line })
    }

    /// Concatenated text up to the matching end tag, which is consumed.
    fn collect_text(&mut self, is_end: impl Fn(&TagEnd) -> bool) -> String {
        let mut text = String::new();
        while let Some((event, _)) = self.events.next() {
            match event {
                Event::End(end) if is_end(&end) => break,
                Event::Text(part) | Event::Code(part) => text.push_str(&part),
                Event::SoftBreak | Event::HardBreak => text.push(' '),
                _ => {}
            }
        }
        text.trim().to_owned()
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn describe(event: &Event<'_>) -> String {
    match event {
        Event::Start(tag) => format!("start of {tag:?}"),
        Event::End(tag) => format!("end of {tag:?}"),
        Event::Text(text) => format!("text {:?}", text.as_ref()),
        other => format!("{other:?}"),
    }
}
