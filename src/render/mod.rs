// src/render/mod.rs
//! Markdown → HTML email renderer.
//!
//! The input is split into lines and run through a fixed sequence of passes. Order
//! matters: later passes must never see markup as markdown, and the paragraph pass has
//! to run after headings and lists are classified.
//!
//! | # | pass       | grammar                                                         |
//! |---|------------|-----------------------------------------------------------------|
//! | 1 | headings   | line starts with `#### `, `### `, `## `, `# ` (longest first)   |
//! | 2 | bold       | `\*\*(.+?)\*\*`, non-greedy, no nesting                         |
//! | 3 | code       | `` `([^`]+)` ``                                                 |
//! | 4 | lists      | `- [ ] `, `- [x] ` (task) then `- ` (plain); runs become `<ul>` |
//! | 5 | links      | `\[([^\]]*)\]\(([^)]*)\)` when enabled                          |
//! | 6 | paragraphs | blank-line segments not starting with a heading/list element    |
//! | 7 | references | source URLs as an ordered list of anchors                       |
//! | 8 | shell      | fixed stylesheet, header and footer                             |
//!
//! Rendering is pure. It is not idempotent: feeding the HTML back in wraps the
//! paragraphs a second time.

mod shell;

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenderedDocument {
    pub html: String,
    pub plain_text: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderOptions {
    /// Turn `[label](url)` into anchors; literal text otherwise.
    pub links: bool,
    /// HTML-escape the raw markdown before any pass runs.
    pub escape_html: bool,
    pub title: String,
    pub references_heading: String,
    pub footer: Vec<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            links: true,
            escape_html: false,
            title: "IT Trend Deep Dive".into(),
            references_heading: "References".into(),
            footer: vec![
                "This email was generated by the automated IT trend analysis pipeline.".into(),
                "A fresh digest of the latest tech trends arrives every morning.".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Text(String),
    Heading { level: u8, text: String },
    Item { task: Option<bool>, text: String },
    Blank,
}

impl Line {
    fn text_mut(&mut self) -> Option<&mut String> {
        match self {
            Line::Text(t) | Line::Heading { text: t, .. } | Line::Item { text: t, .. } => Some(t),
            Line::Blank => None,
        }
    }

    /// Headings and list items, or raw text already starting with one of those tags.
    fn is_element(&self) -> bool {
        const TAGS: [&str; 6] = ["<h1", "<h2", "<h3", "<h4", "<ul", "<li"];
        match self {
            Line::Heading { .. } | Line::Item { .. } => true,
            Line::Text(t) => TAGS.iter().any(|tag| t.starts_with(tag)),
            Line::Blank => false,
        }
    }
}

fn split_lines(markdown: &str) -> Vec<Line> {
    markdown
        .lines()
        .map(|l| {
            if l.trim().is_empty() {
                Line::Blank
            } else {
                Line::Text(l.to_string())
            }
        })
        .collect()
}

fn rewrite_inline(lines: &mut [Line], re: &Regex, replacement: &str) {
    for line in lines.iter_mut() {
        if let Some(t) = line.text_mut() {
            if re.is_match(t) {
                *t = re.replace_all(t, replacement).into_owned();
            }
        }
    }
}

// Pass 0 (optional)
fn pass_escape(lines: &mut [Line]) {
    for line in lines.iter_mut() {
        if let Some(t) = line.text_mut() {
            *t = html_escape::encode_text(t).into_owned();
        }
    }
}

// Pass 1
fn pass_headings(lines: &mut [Line]) {
    const PREFIXES: [(&str, u8); 4] = [("#### ", 4), ("### ", 3), ("## ", 2), ("# ", 1)];
    for line in lines.iter_mut() {
        let Line::Text(t) = &*line else { continue };
        let heading = PREFIXES.iter().find_map(|(p, level)| {
            t.strip_prefix(p).map(|rest| Line::Heading {
                level: *level,
                text: rest.trim_end().to_string(),
            })
        });
        if let Some(h) = heading {
            *line = h;
        }
    }
}

// Pass 2
fn pass_bold(lines: &mut [Line]) {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
    rewrite_inline(lines, re, "<strong>$1</strong>");
}

// Pass 3
fn pass_code(lines: &mut [Line]) {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"`([^`]+)`").unwrap());
    rewrite_inline(lines, re, "<code>$1</code>");
}

// Pass 4
fn pass_lists(lines: &mut [Line]) {
    for line in lines.iter_mut() {
        let Line::Text(t) = &*line else { continue };
        let classified = if let Some(rest) = t.strip_prefix("- [ ] ") {
            Some((Some(false), rest))
        } else if let Some(rest) = t
            .strip_prefix("- [x] ")
            .or_else(|| t.strip_prefix("- [X] "))
        {
            Some((Some(true), rest))
        } else {
            t.strip_prefix("- ").map(|rest| (None, rest))
        };
        let item = classified.map(|(task, rest)| Line::Item {
            task,
            text: rest.to_string(),
        });
        if let Some(item) = item {
            *line = item;
        }
    }
}

// Pass 5
fn pass_links(lines: &mut [Line]) {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"\[([^\]]*)\]\(([^)]*)\)").unwrap());
    rewrite_inline(lines, re, r#"<a href="$2" target="_blank">$1</a>"#);
}

fn emit_line(line: &Line) -> String {
    match line {
        Line::Text(t) => t.clone(),
        Line::Heading { level, text } => format!("<h{level}>{text}</h{level}>"),
        Line::Item { task: None, text } => format!("<li>{text}</li>"),
        Line::Item {
            task: Some(checked),
            text,
        } => format!(
            r#"<li class="task"><input type="checkbox" disabled{}> {text}</li>"#,
            if *checked { " checked" } else { "" }
        ),
        Line::Blank => String::new(),
    }
}

/// Emits one segment, wrapping runs of adjacent items in a single `<ul>`.
fn emit_segment(segment: &[Line]) -> String {
    let mut out: Vec<String> = Vec::with_capacity(segment.len() + 2);
    let mut in_list = false;
    for line in segment {
        let is_item = matches!(line, Line::Item { .. });
        if is_item && !in_list {
            out.push("<ul>".into());
        } else if !is_item && in_list {
            out.push("</ul>".into());
        }
        in_list = is_item;
        out.push(emit_line(line));
    }
    if in_list {
        out.push("</ul>".into());
    }
    out.join("\n")
}

// Pass 6
fn pass_paragraphs(lines: &[Line]) -> String {
    lines
        .split(|l| matches!(l, Line::Blank))
        .filter(|seg| !seg.is_empty())
        .map(|seg| {
            let html = emit_segment(seg);
            if seg[0].is_element() {
                html
            } else {
                format!("<p>{html}</p>")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// Pass 7
fn reference_section(heading: &str, urls: &[String]) -> String {
    if urls.is_empty() {
        return String::new();
    }
    let mut out = format!(
        "<div class=\"reference-section\">\n<h3>{}</h3>\n<ol>\n",
        html_escape::encode_text(heading)
    );
    for url in urls {
        out.push_str(&format!(
            "<li><a href=\"{}\" target=\"_blank\">{}</a></li>\n",
            html_escape::encode_double_quoted_attribute(url),
            html_escape::encode_text(url)
        ));
    }
    out.push_str("</ol>\n</div>");
    out
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Passes 1–6: the article body without references or shell.
    pub fn render_body(&self, markdown: &str) -> String {
        let mut lines = split_lines(markdown);
        if self.options.escape_html {
            pass_escape(&mut lines);
        }
        pass_headings(&mut lines);
        pass_bold(&mut lines);
        pass_code(&mut lines);
        pass_lists(&mut lines);
        if self.options.links {
            pass_links(&mut lines);
        }
        pass_paragraphs(&lines)
    }

    pub fn render(&self, markdown: &str, source_urls: &[String]) -> RenderedDocument {
        let body = self.render_body(markdown);
        let refs = reference_section(&self.options.references_heading, source_urls);
        RenderedDocument {
            html: shell::wrap(&self.options, &body, &refs),
            plain_text: markdown.to_string(),
            sources: source_urls.to_vec(),
        }
    }
}

/// Render with default options.
pub fn render(markdown: &str, source_urls: &[String]) -> RenderedDocument {
    Renderer::default().render(markdown, source_urls)
}
