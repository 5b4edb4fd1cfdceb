//! Canonical text rendering of a [`CommitMessage`].

use crate::grammar::{CommitMessage, Footer, FooterSeparator};

/// Render a message in canonical form.
///
/// Produces:
/// ```text
/// type(scope)!: description
///
/// Body paragraph one.
///
/// Body paragraph two.
///
/// BREAKING CHANGE: what broke
/// Refs #42
/// ```
///
/// The blank line after the header only appears when a body or footers exist.
/// Rendering does not validate; run [`crate::grammar::validate`] first when the
/// message was built by hand.
pub fn render(message: &CommitMessage) -> String {
    let mut parts = vec![render_header(message)];

    if !message.body.is_empty() {
        parts.push(message.body.join("\n\n"));
    }

    if !message.footers.is_empty() {
        let footers: Vec<String> = message.footers.iter().map(render_footer).collect();
        parts.push(footers.join("\n"));
    }

    parts.join("\n\n")
}

pub(crate) fn render_header(message: &CommitMessage) -> String {
    let mut header = message.commit_type.clone();
    if let Some(ref scope) = message.scope {
        header.push('(');
        header.push_str(scope);
        header.push(')');
    }
    if message.breaking_marker {
        header.push('!');
    }
    header.push_str(": ");
    header.push_str(&message.description);
    header
}

pub(crate) fn render_footer(footer: &Footer) -> String {
    match footer.separator {
        FooterSeparator::Colon => format!("{}: {}", footer.token, footer.value),
        FooterSeparator::Hash => format!("{} #{}", footer.token, footer.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::BREAKING_CHANGE;

    #[test]
    fn test_render_header_only() {
        let msg = CommitMessage::new("feat", "add login endpoint").with_scope("auth");
        assert_eq!(render(&msg), "feat(auth): add login endpoint");
    }

    #[test]
    fn test_render_breaking_marker() {
        let msg = CommitMessage::new("feat", "drop node 6").mark_breaking();
        assert_eq!(render(&msg), "feat!: drop node 6");
    }

    #[test]
    fn test_render_body_and_footers() {
        let msg = CommitMessage::new("fix", "prevent racing of requests")
            .with_body_paragraph("Introduce a request id.")
            .with_body_paragraph("Remove timeouts which were used\nto mitigate the racing issue.")
            .with_footer(Footer::new("Reviewed-by", "Z"))
            .with_footer(Footer::with_hash("Refs", "123"));

        assert_eq!(
            render(&msg),
            "fix: prevent racing of requests\n\nIntroduce a request id.\n\nRemove timeouts which were used\nto mitigate the racing issue.\n\nReviewed-by: Z\nRefs #123"
        );
    }

    #[test]
    fn test_render_footers_without_body() {
        let msg = CommitMessage::new("feat", "allow config to extend")
            .with_footer(Footer::new(BREAKING_CHANGE, "extends key changes behavior"));
        assert_eq!(
            render(&msg),
            "feat: allow config to extend\n\nBREAKING CHANGE: extends key changes behavior"
        );
    }

    #[test]
    fn test_render_multiline_footer_value_verbatim() {
        let msg = CommitMessage::new("feat", "x")
            .with_footer(Footer::new(BREAKING_CHANGE, "first line\n  indented continuation"));
        assert!(render(&msg).ends_with("BREAKING CHANGE: first line\n  indented continuation"));
    }
}
