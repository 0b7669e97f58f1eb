//! Built-in transforms that manifest plugins chain together by name.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Node};

use super::Transform;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Elements whose text never renders.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTransform {
    /// Visible text of an HTML document, one text node per line.
    HtmlText,
    /// Every whitespace run becomes a single space; ends are trimmed.
    CollapseWhitespace,
    /// Trailing whitespace removed from each line, blank lines dropped.
    TrimLines,
}

impl BuiltinTransform {
    pub const ALL: [BuiltinTransform; 3] = [Self::HtmlText, Self::CollapseWhitespace, Self::TrimLines];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HtmlText => "html_text",
            Self::CollapseWhitespace => "collapse_whitespace",
            Self::TrimLines => "trim_lines",
        }
    }
}

impl FromStr for BuiltinTransform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for BuiltinTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Transform for BuiltinTransform {
    fn apply(&self, text: &str) -> String {
        match self {
            Self::HtmlText => html_text(text),
            Self::CollapseWhitespace => collapse_whitespace(text),
            Self::TrimLines => trim_lines(text),
        }
    }
}

/// Builtins applied in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformChain(pub Vec<BuiltinTransform>);

impl Transform for TransformChain {
    fn apply(&self, text: &str) -> String {
        self.0
            .iter()
            .fold(text.to_string(), |acc, step| step.apply(&acc))
    }
}

pub fn html_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut lines = Vec::new();

    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }

    lines.join("\n")
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

pub fn trim_lines(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_text_skips_hidden_elements() {
        let html = r#"<html><head><title>Ignored</title><style>p { color: red }</style></head>
            <body><h1>Terms</h1><script>var x = 1;</script>
            <p>Be  <b>nice</b>.</p></body></html>"#;

        assert_eq!(html_text(html), "Terms\nBe\nnice\n.");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  c "), "a b c");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn test_trim_lines() {
        assert_eq!(trim_lines("  a  \n\n   \nb\t\n"), "  a\nb");
    }

    #[test]
    fn test_chain_applies_in_order() {
        let chain = TransformChain(vec![
            BuiltinTransform::HtmlText,
            BuiltinTransform::CollapseWhitespace,
        ]);
        assert_eq!(chain.apply("<p>a</p>\n<p>b</p>"), "a b");
        assert_eq!(TransformChain::default().apply("same"), "same");
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(
            "trim_lines".parse::<BuiltinTransform>(),
            Ok(BuiltinTransform::TrimLines)
        );
        assert!("uppercase".parse::<BuiltinTransform>().is_err());
    }
}
