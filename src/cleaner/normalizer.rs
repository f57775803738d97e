use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::cleaner::rules::RuleSet;

static INLINE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

/// Bound on strip passes when a rule has a replacement template, which may
/// never settle.
const MAX_STRIP_PASSES: usize = 8;

/// How each line of a paragraph is canonicalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineMode {
    /// Strip leading and trailing whitespace only.
    #[default]
    Trim,
    /// Also collapse interior runs of spaces and tabs. Used for text flattened
    /// out of HTML, where source indentation leaks into the text nodes.
    Collapse,
}

/// Normalizes plain text into blank-line separated paragraphs.
pub fn normalize(raw_text: &str, rules: &RuleSet) -> String {
    normalize_with(raw_text, rules, LineMode::Trim)
}

pub fn normalize_with(raw_text: &str, rules: &RuleSet, mode: LineMode) -> String {
    let text = unify_line_endings(raw_text);

    let mut kept: Vec<String> = Vec::new();
    let mut drop_next = false;

    for paragraph in split_paragraphs(&text) {
        if drop_next {
            drop_next = false;
            continue;
        }

        // Reject on the original text: a paragraph holding both an affiliate
        // link and a shortcode goes away entirely.
        if let Some(rule) = rules.rejecting_rule(&paragraph) {
            debug!(rule = rule.name(), "dropping paragraph");
            continue;
        }

        let stripped = strip_settled(&paragraph, rules);
        let lines: Vec<String> = stripped
            .split('\n')
            .map(|line| clean_line(line, mode))
            .filter(|line| !line.is_empty() && !rules.drops_line(line))
            .collect();

        let Some(first) = lines.first() else {
            continue;
        };

        if let Some(rule) = rules.section_rule(first) {
            debug!(rule = rule.name(), "dropping section");
            drop_next = lines.len() == 1;
            continue;
        }

        // Stripping can splice a rejectable span together.
        let cleaned = lines.join("\n");
        if let Some(rule) = rules.rejecting_rule(&cleaned) {
            debug!(rule = rule.name(), "dropping paragraph after strip");
            continue;
        }

        kept.push(cleaned);
    }

    kept.join("\n\n")
}

fn unify_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Groups consecutive non-blank lines. Any run of blank or whitespace-only
/// lines, however long, is a single boundary.
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.split('\n') {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }

    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }

    paragraphs
}

/// Strips until nothing changes, so a span hidden inside another span
/// cannot survive into the output. Deleting rules shrink the text on every
/// pass that changes it and always settle; only replacement rules are capped.
fn strip_settled(paragraph: &str, rules: &RuleSet) -> String {
    let bounded = !rules.strips_only_delete();
    let mut current = rules.strip_spans(paragraph);
    let mut passes = 1;
    while !bounded || passes < MAX_STRIP_PASSES {
        let next = rules.strip_spans(&current);
        if next == current {
            break;
        }
        current = next;
        passes += 1;
    }
    current
}

fn clean_line(line: &str, mode: LineMode) -> String {
    match mode {
        LineMode::Trim => line.trim().to_string(),
        LineMode::Collapse => INLINE_WHITESPACE.replace_all(line, " ").trim().to_string(),
    }
}
