//! Conversions between Markdown, HTML and Telegraph's node tree.
//!
//! Telegraph accepts page content as a JSON array of nodes, where a node is
//! either a text string or an element `{tag, attrs, children}`. Only a small
//! set of tags and the `href`/`src` attributes are accepted.
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const ALLOWED_TAGS: &[&str] = &[
    "a", "aside", "b", "blockquote", "br", "code", "em", "figcaption", "figure", "h3", "h4", "hr",
    "i", "iframe", "img", "li", "ol", "p", "pre", "s", "strong", "u", "ul", "video",
];
const VOID_TAGS: &[&str] = &["br", "hr", "img"];
const ALLOWED_ATTRS: &[&str] = &["href", "src"];

/// One Telegraph content node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Text(String),
    Element(NodeElement),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeElement {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl NodeElement {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }
}

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref SPACES_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref ATTR_RE: Regex =
        Regex::new(r#"([A-Za-z][\w-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
    static ref H3_RE: Regex = Regex::new(r"(?m)^#{1,2} (.+)$").unwrap();
    static ref H4_RE: Regex = Regex::new(r"(?m)^### (.+)$").unwrap();
    static ref BOLD_RE: Regex = Regex::new(r"\*\*(.+?)\*\*").unwrap();
    static ref ITALIC_RE: Regex = Regex::new(r"\*([^*\s][^*]*?)\*").unwrap();
    static ref LINK_RE: Regex = Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap();
    static ref FENCE_RE: Regex = Regex::new(r"(?s)```\w*\n(.*?)```").unwrap();
    static ref CODE_RE: Regex = Regex::new(r"`([^`]+)`").unwrap();
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Escape text content; quotes are left alone outside attributes
fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Keep the first `max` characters of `text`, appending `...` when anything was cut
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max).collect();
    format!("{}...", kept)
}

fn collapse_whitespace(text: &str) -> String {
    SPACES_RE.replace_all(text, " ").trim().to_string()
}

/// Plain text of an HTML fragment, for display and search
pub fn extract_plain_text(html: &str) -> String {
    let stripped = TAG_RE.replace_all(html, " ");
    collapse_whitespace(&unescape_html(&stripped))
}

/// Convert the Markdown subset used for definitions into Telegraph-safe HTML.
///
/// Content that already starts with a tag is treated as HTML and returned as is.
pub fn markdown_to_html(markdown: &str) -> String {
    if markdown.trim().is_empty() {
        return String::new();
    }
    if markdown.trim_start().starts_with('<') {
        return markdown.to_string();
    }

    let escaped = escape_text(markdown);
    let html = FENCE_RE.replace_all(&escaped, "<pre>$1</pre>");
    let html = CODE_RE.replace_all(&html, "<code>$1</code>");
    let html = H4_RE.replace_all(&html, "<h4>$1</h4>");
    let html = H3_RE.replace_all(&html, "<h3>$1</h3>");
    let html = BOLD_RE.replace_all(&html, "<b>$1</b>");
    let html = ITALIC_RE.replace_all(&html, "<i>$1</i>");
    let html = LINK_RE.replace_all(&html, "<a href=\"$2\">$1</a>");

    let mut lines = Vec::new();
    let mut in_list = false;
    for line in html.lines() {
        let trimmed = line.trim();
        if let Some(item) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
            if !in_list {
                lines.push("<ul>".to_string());
                in_list = true;
            }
            lines.push(format!("<li>{}</li>", item));
        } else {
            if in_list {
                lines.push("</ul>".to_string());
                in_list = false;
            }
            lines.push(line.to_string());
        }
    }
    if in_list {
        lines.push("</ul>".to_string());
    }

    lines
        .join("\n")
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| {
            if block.starts_with('<') {
                block.to_string()
            } else {
                let joined: Vec<&str> = block.lines().map(str::trim).collect();
                format!("<p>{}</p>", joined.join(" "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn normalize_tag(tag: &str) -> Option<&str> {
    match tag {
        "h1" | "h2" => Some("h3"),
        "h5" | "h6" => Some("h4"),
        other => ALLOWED_TAGS.iter().find(|allowed| **allowed == other).copied(),
    }
}

fn push_node(stack: &mut [NodeElement], root: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => root.push(node),
    }
}

fn push_text(stack: &mut [NodeElement], root: &mut Vec<Node>, raw: &str) {
    if raw.is_empty() || (raw.trim().is_empty() && raw.contains('\n')) {
        return;
    }
    push_node(stack, root, Node::Text(unescape_html(raw)));
}

fn close_element(stack: &mut Vec<NodeElement>, root: &mut Vec<Node>) {
    if let Some(element) = stack.pop() {
        push_node(stack, root, Node::Element(element));
    }
}

/// Parse an HTML fragment into Telegraph nodes.
///
/// Unsupported tags are dropped while their children are kept; unclosed
/// elements are closed at the end of input.
pub fn html_to_nodes(html: &str) -> Vec<Node> {
    let mut root = Vec::new();
    let mut stack: Vec<NodeElement> = Vec::new();
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        push_text(&mut stack, &mut root, &rest[..start]);
        let after = &rest[start..];

        if let Some(comment) = after.strip_prefix("<!--") {
            rest = match comment.find("-->") {
                Some(end) => &comment[end + 3..],
                None => "",
            };
            continue;
        }

        let Some(end) = after.find('>') else {
            push_text(&mut stack, &mut root, after);
            rest = "";
            break;
        };
        let inner = after[1..end].trim();
        rest = &after[end + 1..];

        if let Some(name) = inner.strip_prefix('/') {
            let name = name.trim().to_lowercase();
            if let Some(tag) = normalize_tag(&name) {
                if let Some(depth) = stack.iter().rposition(|e| e.tag == tag) {
                    while stack.len() > depth {
                        close_element(&mut stack, &mut root);
                    }
                }
            }
            continue;
        }

        let self_closing = inner.ends_with('/');
        let inner = inner.trim_end_matches('/');
        let name_end = inner
            .find(|c: char| c.is_whitespace())
            .unwrap_or(inner.len());
        let name = inner[..name_end].to_lowercase();
        let Some(tag) = normalize_tag(&name) else {
            continue;
        };

        let mut element = NodeElement::new(tag);
        for caps in ATTR_RE.captures_iter(&inner[name_end..]) {
            let key = caps[1].to_lowercase();
            if ALLOWED_ATTRS.contains(&key.as_str()) {
                let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
                element.attrs.insert(key, unescape_html(value));
            }
        }

        if self_closing || VOID_TAGS.contains(&tag) {
            push_node(&mut stack, &mut root, Node::Element(element));
        } else {
            stack.push(element);
        }
    }
    push_text(&mut stack, &mut root, rest);

    while !stack.is_empty() {
        close_element(&mut stack, &mut root);
    }
    root
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => {
                out.push(' ');
                collect_text(&element.children, out);
                out.push(' ');
            }
        }
    }
}

/// Flatten a node tree to whitespace-normalized text
pub fn nodes_to_text(nodes: &[Node]) -> String {
    let mut out = String::new();
    collect_text(nodes, &mut out);
    collapse_whitespace(&out)
}

/// Render nodes back to HTML
pub fn nodes_to_html(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(&escape_html(text)),
            Node::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for (key, value) in &element.attrs {
                    out.push_str(&format!(" {}=\"{}\"", key, escape_html(value)));
                }
                out.push('>');
                if !VOID_TAGS.contains(&element.tag.as_str()) {
                    out.push_str(&nodes_to_html(&element.children));
                    out.push_str(&format!("</{}>", element.tag));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_roundtrip() {
        let raw = r#"a < b & "c" > d"#;
        assert_eq!(escape_html(raw), "a &lt; b &amp; &quot;c&quot; &gt; d");
        assert_eq!(unescape_html(&escape_html(raw)), raw);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 10), "abcdefghij...");
        assert_eq!(truncate("ääää", 2), "ää...");
    }

    #[test]
    fn test_extract_plain_text() {
        let html = "<h3>API</h3>\n<p>Application &amp; <b>Programming</b>   Interface</p>";
        assert_eq!(extract_plain_text(html), "API Application & Programming Interface");
        assert_eq!(extract_plain_text(""), "");
    }

    #[test]
    fn test_markdown_to_html() {
        let md = "# Title\n\nSome **bold** and *soft* text\nwith a [link](https://e.x).\n\n- one\n- two";
        let html = markdown_to_html(md);
        assert_eq!(
            html,
            "<h3>Title</h3>\n<p>Some <b>bold</b> and <i>soft</i> text with a <a href=\"https://e.x\">link</a>.</p>\n<ul>\n<li>one</li>\n<li>two</li>\n</ul>"
        );
    }

    #[test]
    fn test_markdown_passes_html_through() {
        assert_eq!(markdown_to_html("<p>x</p>"), "<p>x</p>");
        assert_eq!(markdown_to_html("   "), "");
    }

    #[test]
    fn test_markdown_keeps_angle_brackets_as_text() {
        let md = "Use x < y when a > b holds & \"quotes\" stay";
        let html = markdown_to_html(md);
        assert_eq!(
            html,
            "<p>Use x &lt; y when a &gt; b holds &amp; \"quotes\" stay</p>"
        );
        assert_eq!(nodes_to_text(&html_to_nodes(&html)), md);
        assert_eq!(extract_plain_text(&html), md);

        let html = markdown_to_html("Compare `a < b`\n\n- x > 0");
        assert!(html.contains("<code>a &lt; b</code>"));
        assert!(html.contains("<li>x &gt; 0</li>"));
    }

    #[test]
    fn test_markdown_code() {
        let html = markdown_to_html("Use `cargo`\n\n```rust\nfn main() {}\n```");
        assert!(html.contains("<code>cargo</code>"));
        assert!(html.contains("<pre>fn main() {}\n</pre>"));
    }

    #[test]
    fn test_html_to_nodes() {
        let nodes = html_to_nodes(
            "<h3>API</h3>\n<p>See <a href=\"https://x\" class=\"c\">docs</a> &amp; more<br/></p>",
        );
        let value = serde_json::to_value(&nodes).unwrap();
        assert_eq!(
            value,
            json!([
                {"tag": "h3", "children": ["API"]},
                {"tag": "p", "children": [
                    "See ",
                    {"tag": "a", "attrs": {"href": "https://x"}, "children": ["docs"]},
                    " & more",
                    {"tag": "br"}
                ]}
            ])
        );
    }

    #[test]
    fn test_html_to_nodes_drops_unknown_tags_and_closes_open_ones() {
        let nodes = html_to_nodes("<div><h1>Title</h1><span>x</span><p>open");
        let value = serde_json::to_value(&nodes).unwrap();
        assert_eq!(
            value,
            json!([
                {"tag": "h3", "children": ["Title"]},
                "x",
                {"tag": "p", "children": ["open"]}
            ])
        );
    }

    #[test]
    fn test_nodes_text_and_html() {
        let nodes = html_to_nodes("<p>Hello <b>bold</b> world</p><img src=\"https://i/1.png\">");
        assert_eq!(nodes_to_text(&nodes), "Hello bold world");
        assert_eq!(
            nodes_to_html(&nodes),
            "<p>Hello <b>bold</b> world</p><img src=\"https://i/1.png\">"
        );
    }

    #[test]
    fn test_node_deserialization() {
        let nodes: Vec<Node> =
            serde_json::from_value(json!(["text", {"tag": "p", "children": ["x"]}])).unwrap();
        assert_eq!(nodes[0], Node::Text("text".into()));
        assert!(matches!(&nodes[1], Node::Element(e) if e.tag == "p"));
    }
}
