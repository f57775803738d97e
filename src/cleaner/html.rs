use std::sync::LazyLock;

use ego_tree::NodeId;
use ego_tree::iter::Edge;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::cleaner::errors::CleanerError;

pub const DEFAULT_AFFILIATE_SELECTORS: &[&str] = &["div.hatena-asin-detail"];

const TWITTER_HANDLE: &str = r"@[A-Za-z0-9_]{1,15}";

static HATENA_ASIN_DETAIL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.hatena-asin-detail").unwrap());

static ANY_HANDLE_MENTION: LazyLock<MentionRule> =
    LazyLock::new(|| MentionRule::compile(TWITTER_HANDLE).unwrap());

/// Elements whose content never reaches the text output.
const SKIPPED_CONTENT: &[&str] = &["script", "style", "noscript", "template"];

/// Elements separated from their neighbours by a blank line.
const PARAGRAPH_BLOCKS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "dl", "table", "blockquote",
    "pre", "figure", "section", "article", "aside", "header", "footer", "nav", "main", "hr",
    "address", "details",
];

/// Elements that end their line.
const LINE_BLOCKS: &[&str] = &["li", "tr", "dt", "dd", "figcaption", "summary", "caption"];

/// Table cells on one row are kept apart by a space.
const CELLS: &[&str] = &["td", "th"];

/// Reattaches a mention that markup isolated on its own line, e.g. a linked
/// `@handle` inside its own block, back onto the surrounding text.
#[derive(Debug, Clone)]
pub struct MentionRule {
    regex: Regex,
}

impl MentionRule {
    /// Matches any Twitter-style handle.
    pub fn any_handle() -> Self {
        ANY_HANDLE_MENTION.clone()
    }

    /// Matches one account only. A leading `@` is optional.
    pub fn for_handle(handle: &str) -> Result<Self, CleanerError> {
        let name = handle.trim().trim_start_matches('@');
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(CleanerError::InvalidHandle(handle.to_string()));
        }
        Self::compile(&format!("@{}", regex::escape(name)))
    }

    fn compile(mention: &str) -> Result<Self, CleanerError> {
        let pattern = format!(r"\s*\n[ \t]*({mention})[ \t]*\n\s*");
        let regex = Regex::new(&pattern).map_err(|source| CleanerError::InvalidPattern {
            name: "mention".to_string(),
            source,
        })?;
        Ok(Self { regex })
    }

    pub fn reattach(&self, text: &str) -> String {
        self.regex.replace_all(text, " $1 ").into_owned()
    }
}

/// Flattens post HTML into newline-delimited text for the normalizer.
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    removals: Vec<Selector>,
    mention: Option<MentionRule>,
}

impl HtmlExtractor {
    pub fn new<S: AsRef<str>>(selectors: &[S]) -> Result<Self, CleanerError> {
        let removals = selectors
            .iter()
            .map(|selector| {
                let selector = selector.as_ref();
                Selector::parse(selector).map_err(|e| CleanerError::InvalidSelector {
                    selector: selector.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            removals,
            mention: Some(MentionRule::any_handle()),
        })
    }

    pub fn with_mention(mut self, mention: Option<MentionRule>) -> Self {
        self.mention = mention;
        self
    }

    pub fn extract(&self, html: &str) -> String {
        let fragment = Html::parse_fragment(html);
        let mut out = String::with_capacity(html.len());
        let mut skipping: Option<NodeId> = None;

        for edge in fragment.tree.root().traverse() {
            match edge {
                Edge::Open(node) => {
                    if skipping.is_some() {
                        continue;
                    }
                    match node.value() {
                        Node::Text(text) => push_text(&mut out, text),
                        Node::Element(element) => {
                            let name = element.name();
                            if SKIPPED_CONTENT.contains(&name) || self.is_removed(node) {
                                skipping = Some(node.id());
                                continue;
                            }
                            out.push_str(opening(name));
                        }
                        // comments, doctypes and processing instructions
                        _ => {}
                    }
                }
                Edge::Close(node) => {
                    if let Some(id) = skipping {
                        if id == node.id() {
                            skipping = None;
                        }
                        continue;
                    }
                    if let Node::Element(element) = node.value() {
                        out.push_str(closing(element.name()));
                    }
                }
            }
        }

        match &self.mention {
            Some(mention) => mention.reattach(&out),
            None => out,
        }
    }

    fn is_removed(&self, node: ego_tree::NodeRef<'_, Node>) -> bool {
        ElementRef::wrap(node)
            .is_some_and(|element| self.removals.iter().any(|s| s.matches(&element)))
    }
}

impl Default for HtmlExtractor {
    fn default() -> Self {
        Self {
            removals: vec![HATENA_ASIN_DETAIL.clone()],
            mention: Some(MentionRule::any_handle()),
        }
    }
}

/// Source indentation at the start of a line is dropped. A whitespace-only
/// node between inline elements keeps its line structure: no newline is one
/// space, one newline a line break, more a paragraph break. Newlines inside
/// real text are kept too, since exported post bodies often use bare blank
/// lines as paragraph breaks.
fn push_text(out: &mut String, text: &str) {
    let text = if out.is_empty() || out.ends_with('\n') {
        text.trim_start()
    } else {
        text
    };
    if text.is_empty() {
        return;
    }
    if !text.trim().is_empty() {
        out.push_str(text);
        return;
    }
    match text.matches('\n').count() {
        0 => out.push(' '),
        1 => out.push('\n'),
        _ => out.push_str("\n\n"),
    }
}

fn opening(name: &str) -> &'static str {
    if name == "br" {
        "\n"
    } else if PARAGRAPH_BLOCKS.contains(&name) {
        "\n\n"
    } else {
        ""
    }
}

fn closing(name: &str) -> &'static str {
    if PARAGRAPH_BLOCKS.contains(&name) {
        "\n\n"
    } else if LINE_BLOCKS.contains(&name) {
        "\n"
    } else if CELLS.contains(&name) {
        " "
    } else {
        ""
    }
}
