/// Minimal markdown-to-HTML renderer for card bodies.
///
/// The output is injected into the page as raw markup, so HTML escaping runs
/// first and every later step only introduces tags of its own. Steps run in a
/// fixed order; reordering them changes the output.
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// One named text transform of the render pipeline.
pub struct RenderStep {
    pub name: &'static str,
    pub apply: fn(&str) -> String,
}

/// The render pipeline, in execution order.
pub const PIPELINE: &[RenderStep] = &[
    RenderStep { name: "escape", apply: escape_html },
    RenderStep { name: "fenced_code", apply: fenced_code },
    RenderStep { name: "inline_code", apply: inline_code },
    RenderStep { name: "headings", apply: headings },
    RenderStep { name: "emphasis", apply: emphasis },
    RenderStep { name: "links", apply: links },
    RenderStep { name: "list_items", apply: list_items },
    RenderStep { name: "paragraphs", apply: paragraph_breaks },
];

/// Render markdown source to HTML. Never fails; empty input gives empty output.
pub fn render(source: &str) -> String {
    if source.is_empty() {
        return String::new();
    }
    let body = PIPELINE
        .iter()
        .fold(source.to_string(), |text, step| (step.apply)(&text));
    format!("<p>{}</p>", body)
}

// ---------------------------------------------------------------------------
// Compiled regex patterns (allocated once)
// ---------------------------------------------------------------------------

fn re_fenced_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(.*?)```").unwrap())
}

fn re_inline_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`\n]+)`").unwrap())
}

fn re_heading(level: usize) -> &'static Regex {
    static RE: OnceLock<[Regex; 3]> = OnceLock::new();
    let all = RE.get_or_init(|| {
        // Anchored to an exact hash count so `# ` never swallows `### `.
        [
            Regex::new(r"(?m)^[ \t]*# (.*)$").unwrap(),
            Regex::new(r"(?m)^[ \t]*## (.*)$").unwrap(),
            Regex::new(r"(?m)^[ \t]*### (.*)$").unwrap(),
        ]
    });
    &all[level - 1]
}

fn re_bold() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").unwrap())
}

fn re_italic() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*(.+?)\*").unwrap())
}

fn re_link() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]\n]+)\]\(([^)\s]+)\)").unwrap())
}

fn re_list_item() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^- (.*)$").unwrap())
}

fn re_blank_lines() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{2,}").unwrap())
}

// ---------------------------------------------------------------------------
// Individual steps
// ---------------------------------------------------------------------------

/// `&`, `<` and `>` to entities. `&` goes first so entities are not doubled.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn fenced_code(text: &str) -> String {
    re_fenced_code()
        .replace_all(text, "<pre><code>${1}</code></pre>")
        .into_owned()
}

fn inline_code(text: &str) -> String {
    re_inline_code()
        .replace_all(text, "<code>${1}</code>")
        .into_owned()
}

fn headings(text: &str) -> String {
    let mut out = text.to_string();
    for level in [3, 2, 1] {
        let replacement = format!("<h{0}>${{1}}</h{0}>", level);
        out = re_heading(level)
            .replace_all(&out, replacement.as_str())
            .into_owned();
    }
    out
}

/// Bold before italic, otherwise `*` would eat the `**` markers.
fn emphasis(text: &str) -> String {
    let bold = re_bold().replace_all(text, "<strong>${1}</strong>");
    re_italic()
        .replace_all(&bold, "<em>${1}</em>")
        .into_owned()
}

/// Links open in a new browsing context without a referrer. Quotes are
/// percent-encoded so the URL cannot leave the `href` attribute.
fn links(text: &str) -> String {
    re_link()
        .replace_all(text, |caps: &Captures| {
            format!(
                "<a href=\"{}\" target=\"_blank\" rel=\"noreferrer\">{}</a>",
                caps[2].replace('"', "%22"),
                &caps[1]
            )
        })
        .into_owned()
}

/// Each `- ` line becomes its own single-item list; consecutive items are
/// not merged.
fn list_items(text: &str) -> String {
    re_list_item()
        .replace_all(text, "<ul><li>${1}</li></ul>")
        .into_owned()
}

fn paragraph_breaks(text: &str) -> String {
    re_blank_lines().replace_all(text, "</p><p>").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(render(""), "");
    }

    #[test]
    fn test_plain_text_wrapped() {
        assert_eq!(render("hello"), "<p>hello</p>");
    }

    #[test]
    fn test_escape_runs_first() {
        assert_eq!(PIPELINE[0].name, "escape");
        let html = render("<script>alert(1)</script> & more");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&amp; more"));
    }

    #[test]
    fn test_bold_and_italic() {
        assert_eq!(render("**bold**"), "<p><strong>bold</strong></p>");
        assert_eq!(render("*it*"), "<p><em>it</em></p>");
        assert_eq!(
            render("**b** and *i*"),
            "<p><strong>b</strong> and <em>i</em></p>"
        );
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(render("# H1\n## H2"), "<p><h1>H1</h1>\n<h2>H2</h2></p>");
        assert_eq!(render("### Three"), "<p><h3>Three</h3></p>");
        assert_eq!(render("  ## Indented"), "<p><h2>Indented</h2></p>");
        // no space after hashes: not a heading
        assert_eq!(render("#tag"), "<p>#tag</p>");
    }

    #[test]
    fn test_fenced_code_keeps_escaped_content() {
        let html = render("```\nlet x = a < b;\n```");
        assert_eq!(html, "<p><pre><code>\nlet x = a &lt; b;\n</code></pre></p>");
    }

    #[test]
    fn test_inline_code() {
        assert_eq!(render("run `cargo`"), "<p>run <code>cargo</code></p>");
    }

    #[test]
    fn test_link() {
        assert_eq!(
            render("[docs](https://example.com)"),
            "<p><a href=\"https://example.com\" target=\"_blank\" rel=\"noreferrer\">docs</a></p>"
        );
    }

    #[test]
    fn test_link_quote_cannot_escape_attribute() {
        let html = render("[x](a\"onclick=\"y)");
        assert!(!html.contains("\"onclick"));
        assert!(html.contains("a%22onclick=%22y"));
    }

    #[test]
    fn test_list_items_not_merged() {
        assert_eq!(
            render("- one\n- two"),
            "<p><ul><li>one</li></ul>\n<ul><li>two</li></ul></p>"
        );
    }

    #[test]
    fn test_paragraph_breaks() {
        assert_eq!(render("a\n\n\nb"), "<p>a</p><p>b</p>");
        assert_eq!(render("a\nb"), "<p>a\nb</p>");
    }

    #[test]
    fn test_mixed_document() {
        let html = render("# Plan\n\n- **ship** it\n- see [notes](http://x.y)");
        assert!(html.starts_with("<p><h1>Plan</h1></p><p>"));
        assert!(html.contains("<ul><li><strong>ship</strong> it</li></ul>"));
        assert!(html.contains("rel=\"noreferrer\">notes</a></li></ul>"));
    }
}
