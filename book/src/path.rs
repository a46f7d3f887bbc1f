//! Link target handling.

use crate::BookError;

/// Normalize a link target into a page path relative to the book source.
///
/// - Strips `#fragment` and `?query`
/// - Replaces backslashes with forward slashes
/// - Drops `.` and empty segments
/// - Resolves `..` against earlier segments
///
/// Fails with [`BookError::InvalidPath`] when nothing is left and with
/// [`BookError::EscapesRoot`] when `..` climbs past the root.
pub fn normalize(link: &str) -> Result<String, BookError> {
    let end = link.find(['#', '?']).unwrap_or(link.len());
    let replaced = link[..end].replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();

    for segment in replaced.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if segments.pop().is_none() {
                    return Err(BookError::EscapesRoot(link.to_owned()));
                }
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return Err(BookError::InvalidPath(format!("empty path: {link:?}")));
    }

    Ok(segments.join("/"))
}

/// Whether `link` points outside the book: absolute, or with a URL scheme.
pub fn is_external(link: &str) -> bool {
    if link.starts_with('/') || link.starts_with('\\') {
        return true;
    }
    match link.find(':') {
        Some(pos) => {
            let scheme = &link[..pos];
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_path() {
        assert_eq!(normalize("reference/access.md").unwrap(), "reference/access.md");
    }

    #[test]
    fn strips_fragment_and_query() {
        assert_eq!(normalize("guide.md#frames").unwrap(), "guide.md");
        assert_eq!(normalize("guide.md?plain=1").unwrap(), "guide.md");
    }

    #[test]
    fn dot_segments() {
        assert_eq!(normalize("./reference/./barriers.md").unwrap(), "reference/barriers.md");
    }

    #[test]
    fn backslashes() {
        assert_eq!(normalize("reference\\barriers.md").unwrap(), "reference/barriers.md");
    }

    #[test]
    fn parent_resolved() {
        assert_eq!(normalize("reference/../overview.md").unwrap(), "overview.md");
    }

    #[test]
    fn parent_past_root() {
        assert!(matches!(normalize("../outside.md"), Err(BookError::EscapesRoot(_))));
        assert!(matches!(normalize("a/../../outside.md"), Err(BookError::EscapesRoot(_))));
    }

    #[test]
    fn reject_empty() {
        assert!(matches!(normalize(""), Err(BookError::InvalidPath(_))));
        assert!(matches!(normalize("#anchor"), Err(BookError::InvalidPath(_))));
        assert!(matches!(normalize("a/.."), Err(BookError::InvalidPath(_))));
    }

    #[test]
    fn external_links() {
        assert!(is_external("https://docs.rs"));
        assert!(is_external("mailto:someone@example.com"));
        assert!(is_external("/absolute/page.md"));
        assert!(!is_external("relative/page.md"));
        assert!(!is_external("page.md#a:b"));
    }
}
