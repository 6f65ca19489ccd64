//! HTML index pages for directories without an `index.html`.

use std::fmt::Write;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters escaped in listing links. `/` stays literal so the requested
/// path keeps its structure.
const HREF: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// One immediate child of the listed directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Renders the index page for `request_path`.
///
/// Each link is the requested path, a `/` if it lacks one, then the entry
/// name; directories get a trailing `/`. Entries are emitted in the order
/// given.
///
/// # Examples
///
/// ```
/// use lserve::files::listing::{ListingEntry, render};
///
/// let html = render("/docs", &[ListingEntry { name: "img".into(), is_dir: true }]);
/// assert!(html.contains(r#"<a href="/docs/img/">img/</a>"#));
/// ```
pub fn render(request_path: &str, entries: &[ListingEntry]) -> String {
    let mut prefix = utf8_percent_encode(request_path, HREF).to_string();
    if !prefix.ends_with('/') {
        prefix.push('/');
    }

    let mut html = format!(
        "<html><body><h1>Index of {}</h1><ul>",
        escape_html(request_path)
    );
    for entry in entries {
        let slash = if entry.is_dir { "/" } else { "" };
        // Writing into a String cannot fail.
        let _ = write!(
            html,
            "<li><a href=\"{prefix}{}{slash}\">{}{slash}</a></li>",
            utf8_percent_encode(&entry.name, HREF),
            escape_html(&entry.name),
        );
    }
    html.push_str("</ul></body></html>");
    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, is_dir: bool) -> ListingEntry {
        ListingEntry {
            name: name.to_owned(),
            is_dir,
        }
    }

    #[test]
    fn root_listing() {
        let html = render("/", &[entry("a.txt", false), entry("sub", true)]);
        assert!(html.starts_with("<html><body><h1>Index of /</h1><ul>"));
        assert!(html.contains(r#"<li><a href="/a.txt">a.txt</a></li>"#));
        assert!(html.contains(r#"<li><a href="/sub/">sub/</a></li>"#));
        assert!(html.ends_with("</ul></body></html>"));
    }

    #[test]
    fn nested_path_without_trailing_slash() {
        let html = render("/docs", &[entry("x.md", false)]);
        assert!(html.contains(r#"href="/docs/x.md""#));
    }

    #[test]
    fn nested_path_with_trailing_slash() {
        let html = render("/docs/", &[entry("x.md", false)]);
        assert!(html.contains(r#"href="/docs/x.md""#));
        assert!(!html.contains("//x.md"));
    }

    #[test]
    fn empty_directory() {
        let html = render("/empty/", &[]);
        assert!(html.contains("<ul></ul>"));
    }

    #[test]
    fn awkward_names_are_escaped() {
        let html = render("/", &[entry("a b#<c>.txt", false)]);
        assert!(html.contains(r#"href="/a%20b%23%3Cc%3E.txt""#));
        assert!(html.contains(">a b#&lt;c&gt;.txt</a>"));
    }

    #[test]
    fn non_ascii_names_keep_their_text() {
        let html = render("/", &[entry("café.txt", false)]);
        assert!(html.contains(r#"href="/caf%C3%A9.txt""#));
        assert!(html.contains(">café.txt</a>"));
    }
}
