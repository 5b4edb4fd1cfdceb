//! Integration tests for the commit message grammar.

use scrivener::grammar::{BREAKING_CHANGE, BREAKING_CHANGE_HYPHENATED};
use scrivener::{CommitMessage, Footer, FooterSeparator, GrammarErrorKind, parse, render, validate};

#[test]
fn test_breaking_change_footer_message() {
    let msg = parse("feat: allow config to extend\n\nBREAKING CHANGE: extends key changes behavior")
        .unwrap();

    assert_eq!(msg.commit_type, "feat");
    assert_eq!(msg.scope, None);
    assert!(msg.breaking);
    assert!(!msg.breaking_marker);
    assert_eq!(msg.description, "allow config to extend");
    assert!(msg.body.is_empty());
    assert_eq!(
        msg.footers,
        vec![Footer::new(BREAKING_CHANGE, "extends key changes behavior")]
    );
}

#[test]
fn test_scoped_breaking_marker_message() {
    let msg = parse("feat(api)!: notify customer on shipment").unwrap();

    assert_eq!(msg.commit_type, "feat");
    assert_eq!(msg.scope.as_deref(), Some("api"));
    assert!(msg.breaking);
    assert_eq!(msg.description, "notify customer on shipment");
    assert!(msg.footers.is_empty());
}

#[test]
fn test_missing_separator_reports_position() {
    let err = parse("fixed bug").unwrap_err();

    assert_eq!(err.kind, GrammarErrorKind::MalformedHeader);
    assert_eq!(err.line, 1);
    assert_eq!(err.column, 6);
    assert!(err.to_string().contains("line 1, column 6"));
}

#[test]
fn test_full_message_with_body_and_footers() {
    let text = "fix: prevent racing of requests\n\n\
                Introduce a request id and a reference to latest request. Dismiss\n\
                incoming responses other than from latest request.\n\n\
                Remove timeouts which were used to mitigate the racing issue but are\n\
                obsolete now.\n\n\
                Reviewed-by: Z\n\
                Refs #123";
    let msg = parse(text).unwrap();

    assert_eq!(msg.body.len(), 2);
    assert!(msg.body[0].starts_with("Introduce a request id"));
    assert_eq!(
        msg.footers,
        vec![Footer::new("Reviewed-by", "Z"), Footer::with_hash("Refs", "123")]
    );
    assert_eq!(msg.footers[1].separator, FooterSeparator::Hash);
    assert!(!msg.breaking);
    assert_eq!(render(&msg), text);
}

#[test]
fn test_hyphenated_breaking_footer_sets_breaking() {
    let msg = parse("refactor!: drop support for Node 6\n\nBREAKING-CHANGE: use JavaScript features not available in Node 6.")
        .unwrap();
    assert!(msg.breaking);
    assert!(msg.breaking_marker);
    assert_eq!(msg.footers[0].token, BREAKING_CHANGE_HYPHENATED);
}

#[test]
fn test_render_parse_round_trip_for_built_messages() {
    let messages = vec![
        CommitMessage::new("docs", "correct spelling of CHANGELOG"),
        CommitMessage::new("feat", "add Polish language").with_scope("lang"),
        CommitMessage::new("feat", "send an email to the customer when a product is shipped")
            .mark_breaking(),
        CommitMessage::new("chore", "drop support for Node 6")
            .with_footer(Footer::new(BREAKING_CHANGE, "use JavaScript features\nnot available in Node 6.")),
        CommitMessage::new("fix", "prevent racing of requests")
            .with_body_paragraph("Introduce a request id.")
            .with_body_paragraph("Remove timeouts which were used\nto mitigate the racing issue.")
            .with_footer(Footer::new("Reviewed-by", "Z"))
            .with_footer(Footer::with_hash("Refs", "123")),
        CommitMessage::new("perf", "avoid double lookup")
            .with_scope("cache")
            .mark_breaking()
            .with_footer(Footer::new(BREAKING_CHANGE, "lookup() now returns a borrowed value")),
    ];

    for msg in messages {
        validate(&msg).unwrap();
        let text = render(&msg);
        assert_eq!(parse(&text).unwrap(), msg, "round trip failed for:\n{text}");
    }
}

#[test]
fn test_render_is_idempotent_on_accepted_text() {
    let inputs = [
        "FEAT(API)!: x\n\n\n\nbody line\n\n\nRefs #1\n",
        "fix: y\r\n\r\nbody\r\n",
        "chore(deps): bump\n\nAcked-by: A\n  continued\n\nSigned-off-by: B\n\n",
    ];

    for input in inputs {
        let once = render(&parse(input).unwrap());
        let twice = render(&parse(&once).unwrap());
        assert_eq!(once, twice, "not idempotent for {input:?}");
    }
}

#[test]
fn test_rejections_are_all_or_nothing() {
    let cases = [
        ("", GrammarErrorKind::EmptyMessage),
        ("feat(): empty scope", GrammarErrorKind::InvalidScope),
        ("feat: ", GrammarErrorKind::EmptyDescription),
        ("feat:  padded", GrammarErrorKind::MalformedHeader),
        ("feat: a\rb", GrammarErrorKind::MalformedHeader),
        ("feat: x\nbody right away", GrammarErrorKind::MissingBlankLineAfterHeader),
        ("feat: x\n\nBreaking change: lowercase token", GrammarErrorKind::InvalidFooterToken),
    ];

    for (input, kind) in cases {
        let err = parse(input).unwrap_err();
        assert_eq!(err.kind, kind, "unexpected error for {input:?}: {err}");
    }
}
