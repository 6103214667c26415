//! Answer formatting: raw model text to HTML.
//!
//! The transform is pure and deterministic and runs in ordered passes:
//! 1. Normalize line endings to `\n`
//! 2. Promote section labels at the start of a line (`Overview: ...`) to
//!    level-2 headings
//! 3. Promote labels later in a line (`... Key Point: ...`) to level-3
//!    headings, never touching lines promoted in pass 2
//! 4. Normalize bullet glyphs to `- `
//! 5. Space paragraph blocks
//! 6. Render markdown to HTML with single newlines kept as line breaks
//!
//! A label is one or more capitalized words directly followed by a colon.
//! A colon followed by a digit (`3:2`, `10:30`) or a slash (`Https://`) is
//! never a label.

use pulldown_cmark::{Event, Options, Parser, html};

/// Glyphs rewritten to a markdown bullet.
const BULLET_GLYPHS: &[char] = &['•', '●', '○'];

/// A line of the intermediate markup.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    /// Heading produced by a promotion pass.
    Heading { level: usize, label: String },
    /// Markdown heading already present in the input; excluded from promotion.
    Verbatim(String),
    /// Text following a label promoted in pass 2; its own leading label is
    /// still open to pass 3.
    Remainder(String),
    /// Anything else.
    Text(String),
}

impl Line {
    fn render(&self) -> String {
        match self {
            Self::Heading { level, label } => format!("{} {label}", "#".repeat(*level)),
            Self::Verbatim(s) | Self::Remainder(s) | Self::Text(s) => s.clone(),
        }
    }
}

/// Format raw answer text as HTML.
#[must_use]
pub fn format_answer(raw: &str) -> String {
    render_html(&to_markup(raw))
}

/// Run passes 1-5, producing markdown.
#[must_use]
pub fn to_markup(raw: &str) -> String {
    let text = normalize_line_endings(raw);
    let lines = promote_section_labels(&text);
    let lines = promote_inline_labels(lines);
    let lines = normalize_bullets(lines);
    let markup = lines.iter().map(Line::render).collect::<Vec<_>>().join("\n");
    space_paragraphs(&markup)
}

fn normalize_line_endings(raw: &str) -> String {
    raw.replace("\r\n", "\n").replace('\r', "\n")
}

fn promote_section_labels(text: &str) -> Vec<Line> {
    let mut out = Vec::new();
    for line in text.split('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            out.push(Line::Verbatim(line.to_string()));
            continue;
        }
        match leading_label(trimmed) {
            Some((label, rest)) => {
                out.push(Line::Heading { level: 2, label });
                if !rest.is_empty() {
                    out.push(Line::Remainder(rest.to_string()));
                }
            }
            None => out.push(Line::Text(line.to_string())),
        }
    }
    out
}

fn promote_inline_labels(lines: Vec<Line>) -> Vec<Line> {
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        match line {
            Line::Text(text) if !is_list_item(&text) => split_inline(&text, false, &mut out),
            Line::Remainder(text) if !is_list_item(&text) => split_inline(&text, true, &mut out),
            Line::Remainder(text) => out.push(Line::Text(text)),
            other => out.push(other),
        }
    }
    out
}

/// Split `text` at its first inline label, recursing into the remainder.
///
/// At the top of a line a leading label belongs to pass 2 and is skipped; in
/// a remainder (of pass 2 or of this pass) it is promoted here so a second run
/// finds nothing new.
fn split_inline(text: &str, allow_leading: bool, out: &mut Vec<Line>) {
    if allow_leading {
        if let Some((label, rest)) = leading_label(text.trim()) {
            out.push(Line::Heading { level: 3, label });
            if !rest.is_empty() {
                split_inline(rest, true, out);
            }
            return;
        }
    }

    for (colon, _) in text.match_indices(':') {
        let Some(start) = trailing_label_start(&text[..colon]) else {
            continue;
        };
        let before = text[..start].trim_end();
        if before.trim().is_empty() || !label_may_end(&text[colon + 1..]) {
            continue;
        }

        out.push(Line::Text(before.to_string()));
        out.push(Line::Heading {
            level: 3,
            label: join_words(&text[start..colon]),
        });
        let rest = text[colon + 1..].trim();
        if !rest.is_empty() {
            split_inline(rest, true, out);
        }
        return;
    }

    out.push(Line::Text(text.to_string()));
}

fn normalize_bullets(lines: Vec<Line>) -> Vec<Line> {
    lines
        .into_iter()
        .map(|line| match line {
            Line::Text(text) => Line::Text(normalize_bullet(&text)),
            other => other,
        })
        .collect()
}

fn normalize_bullet(line: &str) -> String {
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];
    match body.strip_prefix(BULLET_GLYPHS) {
        Some(rest) => format!("{indent}- {}", rest.trim_start()),
        None => line.to_string(),
    }
}

/// Split on blank lines; give every plain paragraph block one trailing line
/// break, leave heading and list blocks as they are.
fn space_paragraphs(markup: &str) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in markup.split('\n') {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(finish_block(&current));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(finish_block(&current));
    }

    blocks.join("\n\n")
}

fn finish_block(lines: &[&str]) -> String {
    let block = lines.join("\n");
    let first = lines.first().map_or("", |l| l.trim_start());
    if first.starts_with('#') || is_list_item(first) {
        block
    } else {
        block + "\n"
    }
}

/// Render markdown to HTML, GitHub-flavored, with soft breaks kept.
#[must_use]
pub fn render_html(markup: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES;
    let parser = Parser::new_ext(markup, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut out = String::with_capacity(markup.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// `(label, rest)` when the whole text before the first colon is a label.
fn leading_label(line: &str) -> Option<(String, &str)> {
    let colon = line.find(':')?;
    let head = &line[..colon];
    let after = &line[colon + 1..];

    if head.is_empty() || head.ends_with(char::is_whitespace) || !label_may_end(after) {
        return None;
    }
    if !head.split_whitespace().all(is_capitalized_word) {
        return None;
    }
    Some((join_words(head), after.trim()))
}

/// Byte offset where the run of capitalized words ending `head` begins.
fn trailing_label_start(head: &str) -> Option<usize> {
    if head.is_empty() || head.ends_with(char::is_whitespace) {
        return None;
    }
    let spans = word_spans(head);
    let run = spans
        .iter()
        .rev()
        .take_while(|(_, word)| is_capitalized_word(word))
        .count();
    if run == 0 {
        return None;
    }
    // Words glued to markup (`<li>Price Range:`) are not labels.
    let first = spans.len() - run;
    if first > 0 && spans[first - 1].1.contains(['<', '>']) {
        return None;
    }
    Some(spans[first].0)
}

/// What follows a label's colon must not make it a ratio, time or URL.
fn label_may_end(after: &str) -> bool {
    let next = after.trim_start().chars().next();
    !matches!(next, Some(c) if c.is_ascii_digit()) && !after.starts_with('/')
}

fn is_capitalized_word(word: &str) -> bool {
    let mut chars = word.chars();
    matches!(chars.next(), Some(c) if c.is_uppercase())
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '\'' | '&'))
}

fn is_list_item(line: &str) -> bool {
    let body = line.trim_start();
    if body.starts_with(BULLET_GLYPHS)
        || body.starts_with("- ")
        || body.starts_with("* ")
        || body.starts_with("+ ")
    {
        return true;
    }
    let digits = body.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && (body[digits..].starts_with(". ") || body[digits..].starts_with(") "))
}

fn word_spans(s: &str) -> Vec<(usize, &str)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in s.char_indices() {
        if c.is_whitespace() {
            if let Some(st) = start.take() {
                spans.push((st, &s[st..i]));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(st) = start {
        spans.push((st, &s[st..]));
    }
    spans
}

fn join_words(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
