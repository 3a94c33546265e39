//! Helpers over raw source text: lines, gaps between items, comments

use crate::item::{Comment, CommentKind, TextRange};

pub fn newline_count(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count()
}

/// Whitespace-only lines strictly between the first and the last line of `text`
pub fn blank_line_count(text: &str) -> usize {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() < 3 {
        return 0;
    }
    lines[1..lines.len() - 1]
        .iter()
        .filter(|line| line.trim().is_empty())
        .count()
}

/// Offset of the start of the line containing `offset`
pub fn line_start(source: &str, offset: usize) -> usize {
    source
        .get(..offset)
        .and_then(|before| before.rfind('\n'))
        .map_or(0, |index| index + 1)
}

/// One-based line and column of `offset`, counting columns in characters
pub fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let start = line_start(source, offset);
    let line = source[..start].matches('\n').count() + 1;
    let column = source.get(start..offset).map_or(0, |text| text.chars().count()) + 1;
    (line, column)
}

/// Leading whitespace of the line containing `offset`
pub fn line_indent(source: &str, offset: usize) -> &str {
    let start = line_start(source, offset);
    let rest = source.get(start..).unwrap_or("");
    let width = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    &rest[..width]
}

/// Spaces and tabs after the last newline, empty when `gap` is single-line
pub fn trailing_indent(gap: &str) -> &str {
    match gap.rfind('\n') {
        Some(index) => {
            let tail = &gap[index + 1..];
            let width = tail.len() - tail.trim_start_matches([' ', '\t']).len();
            &tail[..width]
        }
        None => "",
    }
}

/// List delimiter a gap starts with, such as `,`
pub fn leading_delimiter(gap: &str) -> &str {
    let rest = gap.trim_start_matches([',', ';']);
    &gap[..gap.len() - rest.len()]
}

/// First offset at or after `offset` that is not whitespace
pub fn skip_whitespace(source: &str, offset: usize) -> usize {
    let rest = source.get(offset..).unwrap_or("");
    offset + (rest.len() - rest.trim_start().len())
}

/// Build a separator holding exactly `blank_lines` empty lines
pub fn separator(delimiter: &str, blank_lines: u32, indent: &str) -> String {
    let mut text = String::with_capacity(delimiter.len() + blank_lines as usize + 1 + indent.len());
    text.push_str(delimiter);
    for _ in 0..=blank_lines {
        text.push('\n');
    }
    text.push_str(indent);
    text
}

/// First character after `text` starts, skipping spaces and tabs; `None` at a line end
pub fn next_char_on_line(text: &str) -> Option<char> {
    text.chars()
        .find(|c| *c != ' ' && *c != '\t')
        .filter(|c| *c != '\n' && *c != '\r')
}

/// Comments in `text`, skipping string literals; ranges are shifted by `base`
pub fn scan_comments(text: &str, base: usize) -> Vec<Comment> {
    let bytes = text.as_bytes();
    let mut comments = Vec::new();
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            quote @ (b'\'' | b'"' | b'`') => {
                index += 1;
                while index < bytes.len() && bytes[index] != quote {
                    if bytes[index] == b'\\' {
                        index += 1;
                    }
                    index += 1;
                }
                index += 1;
            }
            b'/' if bytes.get(index + 1) == Some(&b'/') => {
                let end = text[index..].find('\n').map_or(text.len(), |n| index + n);
                let end = text[index..end].trim_end_matches('\r').len() + index;
                comments.push(Comment::new(
                    TextRange::new(base + index, base + end),
                    CommentKind::Line,
                    &text[index + 2..end],
                ));
                index = end;
            }
            b'/' if bytes.get(index + 1) == Some(&b'*') => {
                let end = text[index + 2..]
                    .find("*/")
                    .map_or(text.len(), |n| index + 2 + n + 2);
                let body_end = end.saturating_sub(2).max(index + 2);
                comments.push(Comment::new(
                    TextRange::new(base + index, base + end),
                    CommentKind::Block,
                    &text[index + 2..body_end],
                ));
                index = end;
            }
            _ => index += 1,
        }
    }
    comments
}

/// True when the last thing in `text` is a line comment
pub fn ends_with_line_comment(text: &str) -> bool {
    let trimmed = text.trim_end();
    scan_comments(trimmed, 0)
        .last()
        .is_some_and(|c| c.kind == CommentKind::Line && c.range.end == trimmed.len())
}

/// Remove `range` (relative to `text`) plus the whitespace that follows it
pub fn remove_with_trailing_whitespace(text: &str, range: TextRange) -> String {
    let end = skip_whitespace(text, range.end.min(text.len()));
    let mut result = String::with_capacity(text.len());
    result.push_str(&text[..range.start.min(text.len())]);
    result.push_str(&text[end..]);
    result
}
