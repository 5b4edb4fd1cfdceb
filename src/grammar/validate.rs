//! Structural validation of a [`CommitMessage`] built outside the parser.
//!
//! A message that passes [`validate`] renders to text that parses back into
//! an identical message. Positions in errors refer to the rendered text.

use crate::error::{GrammarError, GrammarErrorKind};
use crate::grammar::parser::{FooterLine, classify_footer_line, is_blank, opens_footer};
use crate::grammar::{BREAKING_CHANGE, BREAKING_CHANGE_HYPHENATED, CommitMessage, Footer};

/// Check every invariant of the grammar model.
pub fn validate(message: &CommitMessage) -> Result<(), GrammarError> {
    validate_header(message)?;

    // Body starts after the header and one blank line.
    let mut line = 3;
    for paragraph in &message.body {
        validate_paragraph(paragraph, line)?;
        line += paragraph.lines().count() + 1;
    }

    if let Some(last) = message.body.last() {
        let first_line = last.lines().next().unwrap_or_default();
        if opens_footer(first_line) {
            return Err(GrammarError::new(
                GrammarErrorKind::InvalidBody,
                line - last.lines().count() - 1,
                1,
                "the last body paragraph would be read as a footer",
            ));
        }
    }

    for footer in &message.footers {
        validate_footer(footer, line)?;
        line += footer.value.lines().count();
    }

    let signalled = message.breaking_marker || message.has_breaking_footer();
    if message.breaking != signalled {
        let detail = if message.breaking {
            "message is flagged breaking but has neither '!' nor a BREAKING CHANGE footer"
        } else {
            "message carries a breaking change signal but is not flagged breaking"
        };
        return Err(GrammarError::new(
            GrammarErrorKind::BreakingSignalMismatch,
            1,
            1,
            detail,
        ));
    }

    Ok(())
}

fn validate_header(message: &CommitMessage) -> Result<(), GrammarError> {
    let header_error = |kind, column, text: &str| GrammarError::new(kind, 1, column, text);

    if message.commit_type.is_empty() {
        return Err(header_error(
            GrammarErrorKind::MalformedHeader,
            1,
            "commit type must not be empty",
        ));
    }

    for (idx, c) in message.commit_type.chars().enumerate() {
        if c.is_whitespace() || matches!(c, '(' | ')' | ':' | '!') {
            return Err(header_error(
                GrammarErrorKind::MalformedHeader,
                idx + 1,
                "commit type contains a reserved character",
            ));
        }
    }

    if message.commit_type != message.commit_type.to_lowercase() {
        return Err(header_error(
            GrammarErrorKind::MalformedHeader,
            1,
            "commit type must be lowercase",
        ));
    }

    let mut column = message.commit_type.chars().count() + 1;

    if let Some(ref scope) = message.scope {
        // Skip the opening parenthesis.
        column += 1;
        if scope.is_empty() {
            return Err(header_error(
                GrammarErrorKind::InvalidScope,
                column,
                "scope must not be empty",
            ));
        }
        for (idx, c) in scope.chars().enumerate() {
            if c.is_whitespace() || c == '(' || c == ')' {
                return Err(header_error(
                    GrammarErrorKind::InvalidScope,
                    column + idx,
                    "scope must not contain whitespace or parentheses",
                ));
            }
        }
        if *scope != scope.to_lowercase() {
            return Err(header_error(
                GrammarErrorKind::InvalidScope,
                column,
                "scope must be lowercase",
            ));
        }
        column += scope.chars().count() + 1;
    }

    if message.breaking_marker {
        column += 1;
    }
    // ": "
    column += 2;

    let description = &message.description;
    if description.trim().is_empty() {
        return Err(header_error(
            GrammarErrorKind::EmptyDescription,
            column,
            "description must not be empty",
        ));
    }
    if description.contains('\n') || description.contains('\r') {
        return Err(header_error(
            GrammarErrorKind::MalformedHeader,
            column,
            "description must be a single line",
        ));
    }
    if description.trim() != description {
        return Err(header_error(
            GrammarErrorKind::MalformedHeader,
            column,
            "description must not start or end with whitespace",
        ));
    }

    Ok(())
}

fn validate_paragraph(paragraph: &str, first_line: usize) -> Result<(), GrammarError> {
    if paragraph.trim().is_empty() {
        return Err(GrammarError::new(
            GrammarErrorKind::InvalidBody,
            first_line,
            1,
            "body paragraphs must not be empty",
        ));
    }

    for (offset, line) in paragraph.split('\n').enumerate() {
        if is_blank(line) {
            return Err(GrammarError::new(
                GrammarErrorKind::InvalidBody,
                first_line + offset,
                1,
                "a body paragraph must not contain blank lines",
            ));
        }
        if line.trim_end() != line {
            return Err(GrammarError::new(
                GrammarErrorKind::InvalidBody,
                first_line + offset,
                line.trim_end().chars().count() + 1,
                "body lines must not end with whitespace",
            ));
        }
    }

    Ok(())
}

fn validate_footer(footer: &Footer, line: usize) -> Result<(), GrammarError> {
    let token = footer.token.as_str();
    let reserved = token == BREAKING_CHANGE || token == BREAKING_CHANGE_HYPHENATED;

    if !reserved {
        if token.eq_ignore_ascii_case(BREAKING_CHANGE)
            || token.eq_ignore_ascii_case(BREAKING_CHANGE_HYPHENATED)
        {
            return Err(GrammarError::new(
                GrammarErrorKind::InvalidFooterToken,
                line,
                1,
                format!("the '{BREAKING_CHANGE}' footer token must be uppercase"),
            ));
        }
        if token.is_empty() {
            return Err(GrammarError::new(
                GrammarErrorKind::InvalidFooterToken,
                line,
                1,
                "footer token must not be empty",
            ));
        }
        if let Some(idx) = token
            .chars()
            .position(|c| c.is_whitespace() || c == ':' || c == '#')
        {
            return Err(GrammarError::new(
                GrammarErrorKind::InvalidFooterToken,
                line,
                idx + 1,
                "footer tokens use '-' instead of whitespace",
            ));
        }
    }

    let value_error = |offset: usize, text: &str| {
        GrammarError::new(GrammarErrorKind::InvalidFooterValue, line + offset, 1, text)
    };

    if footer.value.trim().is_empty() {
        return Err(value_error(0, "footer value must not be empty"));
    }
    if footer.value.trim() != footer.value {
        return Err(value_error(
            0,
            "footer value must not start or end with whitespace",
        ));
    }

    for (offset, value_line) in footer.value.split('\n').enumerate() {
        if is_blank(value_line) {
            return Err(value_error(offset, "footer value must not contain blank lines"));
        }
        if value_line.trim_end() != value_line {
            return Err(value_error(offset, "footer lines must not end with whitespace"));
        }
        if offset > 0 && !matches!(classify_footer_line(value_line), FooterLine::Plain) {
            return Err(value_error(
                offset,
                "continuation line would be read as a new footer",
            ));
        }
    }

    Ok(())
}
