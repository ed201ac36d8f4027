//! Text rendering for posts and front-page entries.

use banter_types::models::FrontPageEntry;

/// Minimal HTML escaping for user-supplied text.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub struct PostFormatter;

impl PostFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Escape and render a post body to HTML: paragraphs on blank lines,
    /// bare http(s) URLs turned into links.
    pub fn apply_post_formatting(&self, text: &str) -> String {
        let escaped = escape_html(text.trim());
        let mut out = String::with_capacity(escaped.len() + 32);
        for paragraph in escaped.split("\n\n").filter(|p| !p.trim().is_empty()) {
            out.push_str("<p>");
            out.push_str(&linkify(paragraph.trim()));
            out.push_str("</p>");
        }
        out
    }
}

impl Default for PostFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn linkify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, token) in text.split(' ').enumerate() {
        if i > 0 {
            out.push(' ');
        }
        if token.starts_with("http://") || token.starts_with("https://") {
            out.push_str("<a href=\"");
            out.push_str(token);
            out.push_str("\" rel=\"nofollow\">");
            out.push_str(token);
            out.push_str("</a>");
        } else {
            out.push_str(token);
        }
    }
    out
}

/// Canonical discussion URL: `/<folder-key>/<discussion-id>/<title-slug>`.
pub fn front_page_url(folder_key: &str, discussion_id: i64, title: &str) -> String {
    format!("/{}/{}/{}", folder_key, discussion_id, slugify(title))
}

pub fn format_front_page_entries(entries: &mut [FrontPageEntry]) {
    for entry in entries.iter_mut() {
        entry.url = front_page_url(&entry.folder_key, entry.discussion_id, &entry.title);
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<script>alert('x')</script>"),
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"
        );
    }

    #[test]
    fn formats_paragraphs_and_links() {
        let formatter = PostFormatter::new();
        let markup =
            formatter.apply_post_formatting("hello there\n\nsee https://example.com for more");
        assert_eq!(
            markup,
            "<p>hello there</p><p>see <a href=\"https://example.com\" rel=\"nofollow\">https://example.com</a> for more</p>"
        );
    }

    #[test]
    fn html_in_posts_is_neutralised() {
        let formatter = PostFormatter::new();
        let markup = formatter.apply_post_formatting("<b>bold</b>");
        assert!(!markup.contains("<b>"));
        assert!(markup.contains("&lt;b&gt;"));
    }

    #[test]
    fn builds_front_page_urls() {
        assert_eq!(
            front_page_url("music", 42, "Best Gigs... Ever!"),
            "/music/42/best-gigs-ever"
        );
    }
}
