//! Line-oriented parser for conventional commit messages.
//!
//! Grammar:
//!
//! ```text
//! header    = type [ "(" scope ")" ] [ "!" ] ": " description
//! message   = header [ blank-line body* footer-block ]
//! footer    = token ": " value | token " #" value
//! ```
//!
//! The footer block is the longest run of trailing paragraphs that each open
//! with a footer line. Lines inside the block that do not open a footer are
//! continuation lines of the previous footer's value.

use crate::error::{GrammarError, GrammarErrorKind};
use crate::grammar::{
    BREAKING_CHANGE, BREAKING_CHANGE_HYPHENATED, CommitMessage, Footer, FooterSeparator,
};

/// Parse raw commit message text into a [`CommitMessage`].
///
/// Type and scope are stored lowercase. Trailing blank lines are ignored and
/// runs of blank lines between paragraphs collapse to one.
pub fn parse(text: &str) -> Result<CommitMessage, GrammarError> {
    let mut lines: Vec<&str> = text.lines().collect();
    while lines.last().is_some_and(|l| is_blank(l)) {
        lines.pop();
    }

    let Some(first) = lines.first() else {
        return Err(GrammarError::new(
            GrammarErrorKind::EmptyMessage,
            1,
            1,
            "commit message is empty",
        ));
    };

    let header = parse_header(first)?;

    let mut message = CommitMessage {
        commit_type: header.commit_type,
        scope: header.scope,
        breaking: header.breaking_marker,
        breaking_marker: header.breaking_marker,
        description: header.description,
        body: Vec::new(),
        footers: Vec::new(),
    };

    if lines.len() == 1 {
        return Ok(message);
    }

    if !is_blank(lines[1]) {
        return Err(GrammarError::new(
            GrammarErrorKind::MissingBlankLineAfterHeader,
            2,
            1,
            "the header must be followed by a blank line",
        ));
    }

    let paragraphs = split_paragraphs(&lines, 2);
    let footer_start = footer_block_start(&paragraphs);

    message.body = paragraphs[..footer_start]
        .iter()
        .map(|p| {
            p.lines
                .iter()
                .map(|l| l.trim_end())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect();
    message.footers = parse_footer_block(&paragraphs[footer_start..])?;

    if message.has_breaking_footer() {
        message.breaking = true;
    }

    Ok(message)
}

struct Header {
    commit_type: String,
    scope: Option<String>,
    breaking_marker: bool,
    description: String,
}

fn is_type_char(c: char) -> bool {
    !(c.is_whitespace() || matches!(c, '(' | ')' | ':' | '!'))
}

fn parse_header(line: &str) -> Result<Header, GrammarError> {
    let chars: Vec<char> = line.chars().collect();
    // Columns are 1-based; `pos` is a 0-based char index.
    let at = |kind: GrammarErrorKind, pos: usize, message: String| {
        GrammarError::new(kind, 1, pos + 1, message)
    };

    let mut pos = 0;
    while pos < chars.len() && is_type_char(chars[pos]) {
        pos += 1;
    }

    if pos == 0 {
        let message = match chars.first() {
            Some(c) => format!("expected a commit type, found '{c}'"),
            None => "header line is empty".to_string(),
        };
        return Err(at(GrammarErrorKind::MalformedHeader, 0, message));
    }

    let commit_type = chars[..pos].iter().collect::<String>().to_lowercase();

    let mut scope = None;
    if chars.get(pos) == Some(&'(') {
        pos += 1;
        let start = pos;
        loop {
            match chars.get(pos) {
                None => {
                    return Err(at(
                        GrammarErrorKind::InvalidScope,
                        pos,
                        "scope is missing its closing ')'".to_string(),
                    ));
                }
                Some(')') => break,
                Some('(') => {
                    return Err(at(
                        GrammarErrorKind::InvalidScope,
                        pos,
                        "scope must not contain '('".to_string(),
                    ));
                }
                Some(c) if c.is_whitespace() => {
                    return Err(at(
                        GrammarErrorKind::InvalidScope,
                        pos,
                        "scope must not contain whitespace".to_string(),
                    ));
                }
                Some(_) => pos += 1,
            }
        }

        if pos == start {
            return Err(at(
                GrammarErrorKind::InvalidScope,
                pos,
                "scope must not be empty".to_string(),
            ));
        }

        scope = Some(chars[start..pos].iter().collect::<String>().to_lowercase());
        pos += 1;
    }

    let breaking_marker = chars.get(pos) == Some(&'!');
    if breaking_marker {
        pos += 1;
    }

    match chars.get(pos) {
        Some(':') => pos += 1,
        Some(c) => {
            return Err(at(
                GrammarErrorKind::MalformedHeader,
                pos,
                format!("expected ':' after the commit type, found '{c}'"),
            ));
        }
        None => {
            return Err(at(
                GrammarErrorKind::MalformedHeader,
                pos,
                "missing ':' separator after the commit type".to_string(),
            ));
        }
    }

    match chars.get(pos) {
        Some(' ') => pos += 1,
        Some(c) => {
            return Err(at(
                GrammarErrorKind::MalformedHeader,
                pos,
                format!("expected a single space after ':', found '{c}'"),
            ));
        }
        None => {
            return Err(at(
                GrammarErrorKind::EmptyDescription,
                pos,
                "description is missing".to_string(),
            ));
        }
    }

    if chars.get(pos).is_some_and(|c| c.is_whitespace()) {
        return Err(at(
            GrammarErrorKind::MalformedHeader,
            pos,
            "exactly one space must separate ':' from the description".to_string(),
        ));
    }

    let description = chars[pos..].iter().collect::<String>().trim_end().to_string();
    if description.is_empty() {
        return Err(at(
            GrammarErrorKind::EmptyDescription,
            pos,
            "description is missing".to_string(),
        ));
    }

    if let Some(offset) = description.chars().position(|c| c == '\r') {
        return Err(at(
            GrammarErrorKind::MalformedHeader,
            pos + offset,
            "description must be a single line".to_string(),
        ));
    }

    Ok(Header {
        commit_type,
        scope,
        breaking_marker,
        description,
    })
}

pub(crate) fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// A run of non-blank lines. `line` is the 1-based number of its first line.
pub(crate) struct Paragraph<'a> {
    pub line: usize,
    pub lines: Vec<&'a str>,
}

pub(crate) fn split_paragraphs<'a>(lines: &[&'a str], from: usize) -> Vec<Paragraph<'a>> {
    let mut paragraphs: Vec<Paragraph<'a>> = Vec::new();
    let mut current: Option<Paragraph<'a>> = None;

    for (idx, line) in lines.iter().enumerate().skip(from) {
        if is_blank(line) {
            if let Some(p) = current.take() {
                paragraphs.push(p);
            }
            continue;
        }
        match current.as_mut() {
            Some(p) => p.lines.push(*line),
            None => {
                current = Some(Paragraph {
                    line: idx + 1,
                    lines: vec![*line],
                })
            }
        }
    }

    if let Some(p) = current {
        paragraphs.push(p);
    }

    paragraphs
}

/// Index of the first paragraph of the trailing footer block.
pub(crate) fn footer_block_start(paragraphs: &[Paragraph<'_>]) -> usize {
    let mut start = paragraphs.len();
    while start > 0 && opens_footer(paragraphs[start - 1].lines[0]) {
        start -= 1;
    }
    start
}

/// How a single line reads in footer position.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FooterLine<'a> {
    Start {
        token: &'a str,
        separator: FooterSeparator,
        value: &'a str,
    },
    /// `Breaking change:` and friends: reserved token in the wrong case.
    MiscasedBreaking,
    Plain,
}

pub(crate) fn classify_footer_line(line: &str) -> FooterLine<'_> {
    if let Some(rest) = line.strip_prefix(BREAKING_CHANGE)
        && let Some((separator, value)) = split_separator(rest)
    {
        return FooterLine::Start {
            token: BREAKING_CHANGE,
            separator,
            value,
        };
    }

    if is_miscased_breaking(line) {
        return FooterLine::MiscasedBreaking;
    }

    let token_end = line
        .find(|c: char| c.is_whitespace() || c == ':' || c == '#')
        .unwrap_or(line.len());
    if token_end == 0 {
        return FooterLine::Plain;
    }

    let (token, rest) = line.split_at(token_end);
    match split_separator(rest) {
        Some((separator, value)) => FooterLine::Start {
            token,
            separator,
            value,
        },
        None => FooterLine::Plain,
    }
}

/// Whether `line` would be read as the first line of a footer.
pub(crate) fn opens_footer(line: &str) -> bool {
    !matches!(classify_footer_line(line), FooterLine::Plain)
}

fn split_separator(rest: &str) -> Option<(FooterSeparator, &str)> {
    let (separator, value) = if let Some(v) = rest.strip_prefix(": ") {
        (FooterSeparator::Colon, v)
    } else if let Some(v) = rest.strip_prefix(" #") {
        (FooterSeparator::Hash, v)
    } else {
        return None;
    };

    if value.trim().is_empty() {
        None
    } else {
        Some((separator, value))
    }
}

fn is_miscased_breaking(line: &str) -> bool {
    let Some(prefix) = line.get(..BREAKING_CHANGE.len()) else {
        return false;
    };
    if prefix == BREAKING_CHANGE || prefix == BREAKING_CHANGE_HYPHENATED {
        return false;
    }
    let reserved = prefix.eq_ignore_ascii_case(BREAKING_CHANGE)
        || prefix.eq_ignore_ascii_case(BREAKING_CHANGE_HYPHENATED);
    reserved && split_separator(&line[BREAKING_CHANGE.len()..]).is_some()
}

pub(crate) fn parse_footer_block(paragraphs: &[Paragraph<'_>]) -> Result<Vec<Footer>, GrammarError> {
    let mut footers: Vec<Footer> = Vec::new();

    for paragraph in paragraphs {
        for (offset, line) in paragraph.lines.iter().enumerate() {
            let line_no = paragraph.line + offset;
            match classify_footer_line(line) {
                FooterLine::Start {
                    token,
                    separator,
                    value,
                } => footers.push(Footer {
                    token: token.to_string(),
                    separator,
                    value: value.trim().to_string(),
                }),
                FooterLine::MiscasedBreaking => {
                    return Err(GrammarError::new(
                        GrammarErrorKind::InvalidFooterToken,
                        line_no,
                        1,
                        format!("the '{BREAKING_CHANGE}' footer token must be uppercase"),
                    ));
                }
                FooterLine::Plain => match footers.last_mut() {
                    Some(last) => {
                        last.value.push('\n');
                        last.value.push_str(line.trim_end());
                    }
                    None => {
                        return Err(GrammarError::new(
                            GrammarErrorKind::InvalidFooterToken,
                            line_no,
                            1,
                            "footer block must start with a 'token: value' line",
                        ));
                    }
                },
            }
        }
    }

    Ok(footers)
}
