//! Composition: segment, classify, summarize and assemble commit messages.
//!
//! Every message handed back has been validated, rendered and parsed again;
//! a message that does not survive that round trip fails the whole run.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::change::{ChangeGroup, ChangeUnit, PathRules};
use crate::classify::{Classification, ClassificationHints, Classifier};
use crate::error::{ComposeError, GroupError, SummarizerError};
use crate::grammar::parser::{Paragraph, opens_footer, parse_footer_block};
use crate::grammar::{BREAKING_CHANGE, CommitMessage, Footer, parse, render, validate};
use crate::segment::{Segmentation, SegmentationDiagnostic, Segmenter, validate_partition};
use crate::summarize::{Summarizer, Summary, SummaryOutcome, SummaryPool, SummaryPoolConfig};

/// Whether unrelated changes become separate commits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// One commit per logical group.
    #[default]
    Auto,
    /// Everything in one commit.
    Single,
}

#[derive(Debug, Clone, Default)]
pub struct ComposerConfig {
    pub paths: PathRules,
    pub split: SplitMode,
    pub summary: SummaryPoolConfig,
}

/// Supplies per-group classification overrides.
pub trait HintSource: Send + Sync {
    fn hints(&self, group: &ChangeGroup) -> ClassificationHints;
}

/// No overrides: the classifier decides everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHints;

impl HintSource for NoHints {
    fn hints(&self, _group: &ChangeGroup) -> ClassificationHints {
        ClassificationHints::default()
    }
}

impl<F> HintSource for F
where
    F: Fn(&ChangeGroup) -> ClassificationHints + Send + Sync,
{
    fn hints(&self, group: &ChangeGroup) -> ClassificationHints {
        self(group)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedCommit {
    pub group: ChangeGroup,
    pub classification: Classification,
}

/// Groups and their classifications, before any summarizer call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositionPlan {
    pub commits: Vec<PlannedCommit>,
    pub diagnostics: Vec<SegmentationDiagnostic>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedCommit {
    pub group: ChangeGroup,
    pub classification: Classification,
    pub message: Result<CommitMessage, GroupError>,
}

impl ComposedCommit {
    /// Canonical message text, when the group produced a message.
    pub fn text(&self) -> Option<String> {
        self.message.as_ref().ok().map(render)
    }
}

/// Proposed commits in group order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub commits: Vec<ComposedCommit>,
    pub diagnostics: Vec<SegmentationDiagnostic>,
    /// Fatal summarizer error that cancelled outstanding calls.
    pub failure: Option<SummarizerError>,
}

impl Composition {
    /// Whether every group produced a message and the run was not cut short.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.commits.iter().all(|c| c.message.is_ok())
    }

    pub fn group_errors(&self) -> impl Iterator<Item = &GroupError> {
        self.commits.iter().filter_map(|c| c.message.as_ref().err())
    }
}

pub struct Composer {
    config: ComposerConfig,
    segmenter: Segmenter,
    classifier: Classifier,
    hints: Box<dyn HintSource>,
}

impl Composer {
    pub fn new(config: ComposerConfig) -> Self {
        Self {
            segmenter: Segmenter::new(config.paths.clone()),
            classifier: Classifier::new(config.paths.clone()),
            hints: Box::new(NoHints),
            config,
        }
    }

    pub fn with_hints(mut self, hints: impl HintSource + 'static) -> Self {
        self.hints = Box::new(hints);
        self
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Segment and classify without calling a summarizer.
    pub fn plan(&self, units: &[ChangeUnit]) -> CompositionPlan {
        let Segmentation {
            groups,
            diagnostics,
        } = match self.config.split {
            SplitMode::Auto => self.segmenter.segment(units),
            SplitMode::Single => self.segmenter.single(units),
        };

        let commits = groups
            .into_iter()
            .map(|group| {
                let hints = self.hints.hints(&group);
                let classification = self.classifier.classify(&group, &hints);
                PlannedCommit {
                    group,
                    classification,
                }
            })
            .collect();

        CompositionPlan {
            commits,
            diagnostics,
        }
    }

    /// Compose messages, calling the summarizer through the bounded pool.
    pub async fn compose(
        &self,
        units: &[ChangeUnit],
        summarizer: Arc<dyn Summarizer>,
    ) -> Result<Composition, ComposeError> {
        let plan = self.checked_plan(units)?;
        let groups: Vec<ChangeGroup> = plan.commits.iter().map(|c| c.group.clone()).collect();

        let batch = SummaryPool::new(self.config.summary.clone())
            .summarize_all(summarizer, &groups)
            .await;

        assemble(plan, batch.outcomes, batch.failure)
    }

    /// Compose messages with a synchronous summarizer, one group at a time.
    ///
    /// No timeout or retry applies. A fatal error stops further calls.
    pub fn compose_with<F>(
        &self,
        units: &[ChangeUnit],
        mut summarize: F,
    ) -> Result<Composition, ComposeError>
    where
        F: FnMut(&ChangeGroup) -> Result<Summary, SummarizerError>,
    {
        let plan = self.checked_plan(units)?;
        let mut outcomes = Vec::with_capacity(plan.commits.len());
        let mut failure = None;

        for planned in &plan.commits {
            if failure.is_some() {
                outcomes.push(SummaryOutcome::Unfinished);
                continue;
            }
            match summarize(&planned.group) {
                Ok(summary) => outcomes.push(SummaryOutcome::Ready(summary)),
                Err(e) => {
                    if e.is_fatal() {
                        failure = Some(e.clone());
                    }
                    outcomes.push(SummaryOutcome::Missing(e));
                }
            }
        }

        assemble(plan, outcomes, failure)
    }

    fn checked_plan(&self, units: &[ChangeUnit]) -> Result<CompositionPlan, ComposeError> {
        let plan = self.plan(units);
        let groups: Vec<ChangeGroup> = plan.commits.iter().map(|c| c.group.clone()).collect();
        if let Some(error) = validate_partition(&groups, units.len()) {
            return Err(ComposeError::InvalidPartition(error));
        }
        Ok(plan)
    }
}

fn assemble(
    plan: CompositionPlan,
    outcomes: Vec<SummaryOutcome>,
    failure: Option<SummarizerError>,
) -> Result<Composition, ComposeError> {
    let mut commits = Vec::with_capacity(plan.commits.len());

    for (index, (planned, outcome)) in plan.commits.into_iter().zip(outcomes).enumerate() {
        let group = index + 1;
        let message = match outcome {
            SummaryOutcome::Ready(summary) => {
                build_message(group, &planned.classification, &summary).and_then(|message| {
                    validate(&message)
                        .map(|()| message)
                        .map_err(|source| GroupError::InvalidSummary { group, source })
                })
            }
            SummaryOutcome::Missing(e) => Err(GroupError::MissingDescription {
                group,
                reason: e.to_string(),
            }),
            SummaryOutcome::Unfinished => Err(GroupError::MissingDescription {
                group,
                reason: "summary was cancelled".to_string(),
            }),
        };

        match &message {
            Ok(message) => {
                verify_round_trip(group, message)?;
                debug!("Composed group {}: {}", group, message.header());
            }
            Err(e) => warn!("{}", e),
        }

        commits.push(ComposedCommit {
            group: planned.group,
            classification: planned.classification,
            message,
        });
    }

    Ok(Composition {
        commits,
        diagnostics: plan.diagnostics,
        failure,
    })
}

/// Assemble a message from a classification and a summary.
///
/// The description is collapsed to one line, body paragraphs are normalized,
/// and trailing footer-shaped paragraphs become footers. The result still has
/// to pass [`validate`].
pub fn build_message(
    group: usize,
    classification: &Classification,
    summary: &Summary,
) -> Result<CommitMessage, GroupError> {
    let description = summary.description.split_whitespace().collect::<Vec<_>>().join(" ");
    if description.is_empty() {
        return Err(GroupError::MissingDescription {
            group,
            reason: "summarizer returned an empty description".to_string(),
        });
    }

    let mut message = CommitMessage::new(classification.commit_type.as_str(), description);
    if let Some(ref scope) = classification.scope {
        message = message.with_scope(scope);
    }
    if classification.breaking {
        message = message.mark_breaking();
    }

    let mut body = normalize_paragraphs(&summary.body);
    let footer_start = body
        .iter()
        .rposition(|p| !p.lines().next().is_some_and(opens_footer))
        .map_or(0, |i| i + 1);
    let trailing = body.split_off(footer_start);
    message.body = body;

    let paragraphs: Vec<Paragraph<'_>> = trailing
        .iter()
        .map(|p| Paragraph {
            line: 1,
            lines: p.lines().collect(),
        })
        .collect();
    let footers =
        parse_footer_block(&paragraphs).map_err(|source| GroupError::InvalidSummary { group, source })?;

    for footer in footers {
        if footer.is_breaking_change() && !classification.breaking {
            debug!("Dropping breaking change footer from summary of non-breaking group {}", group);
            continue;
        }
        message.footers.push(footer);
    }

    if classification.breaking
        && !message.has_breaking_footer()
        && let Some(ref note) = summary.breaking_note
    {
        let note = normalize_paragraphs(std::slice::from_ref(note)).join("\n");
        if !note.is_empty() {
            message.footers.push(Footer::new(BREAKING_CHANGE, note));
        }
    }

    if let Some(ref reference) = classification.defect_reference {
        let footer = refs_footer(reference);
        let present = message
            .footers
            .iter()
            .any(|f| f.token.eq_ignore_ascii_case("Refs") && f.value == footer.value);
        if !present {
            message.footers.push(footer);
        }
    }

    Ok(message)
}

fn refs_footer(reference: &str) -> Footer {
    match reference.strip_prefix('#') {
        Some(number) => Footer::with_hash("Refs", number),
        None => Footer::new("Refs", reference),
    }
}

/// Split on blank lines, trim line ends, and drop empty paragraphs.
fn normalize_paragraphs(paragraphs: &[String]) -> Vec<String> {
    let mut normalized = Vec::new();

    for text in paragraphs {
        let mut current: Vec<&str> = Vec::new();
        for line in text.lines() {
            let line = line.trim_end();
            if line.trim().is_empty() {
                if !current.is_empty() {
                    normalized.push(current.join("\n"));
                    current.clear();
                }
            } else {
                current.push(line);
            }
        }
        if !current.is_empty() {
            normalized.push(current.join("\n"));
        }
    }

    normalized
}

fn verify_round_trip(group: usize, message: &CommitMessage) -> Result<(), ComposeError> {
    let text = render(message);
    match parse(&text) {
        Ok(parsed) if parsed == *message => Ok(()),
        Ok(parsed) => Err(ComposeError::InvariantViolation {
            group,
            detail: format!("rendered text parses to {:?}", parsed),
        }),
        Err(e) => Err(ComposeError::InvariantViolation {
            group,
            detail: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{ChangeKind, DiffLine};
    use crate::grammar::CommitType;
    use crate::summarize::{MockSummarizer, PathSummarizer};

    fn classification(commit_type: CommitType) -> Classification {
        Classification {
            commit_type,
            scope: None,
            breaking: false,
            defect_reference: None,
        }
    }

    #[test]
    fn test_build_message_collapses_description() {
        let summary = Summary::new("  add\n csv   export ");
        let message = build_message(1, &classification(CommitType::Feat), &summary).unwrap();
        assert_eq!(message.header(), "feat: add csv export");
    }

    #[test]
    fn test_build_message_rejects_empty_description() {
        let err = build_message(3, &classification(CommitType::Fix), &Summary::new(" \n ")).unwrap_err();
        assert!(matches!(err, GroupError::MissingDescription { group: 3, .. }));
    }

    #[test]
    fn test_build_message_moves_trailing_footers() {
        let summary = Summary::new("handle empty input")
            .with_paragraph("Empty input used to panic.\n\n\nNow it returns an error.  ")
            .with_paragraph("Reviewed-by: Z\nAcked-by: Q");
        let message = build_message(1, &classification(CommitType::Fix), &summary).unwrap();
        assert_eq!(
            message.body,
            vec!["Empty input used to panic.", "Now it returns an error."]
        );
        assert_eq!(
            message.footers,
            vec![Footer::new("Reviewed-by", "Z"), Footer::new("Acked-by", "Q")]
        );
        assert!(validate(&message).is_ok());
    }

    #[test]
    fn test_build_message_breaking_note_and_refs() {
        let mut c = classification(CommitType::Feat);
        c.scope = Some("api".to_string());
        c.breaking = true;
        c.defect_reference = Some("#42".to_string());
        let summary = Summary::new("drop v1 routes").with_breaking_note("v1 routes are gone");

        let message = build_message(1, &c, &summary).unwrap();
        assert_eq!(
            render(&message),
            "feat(api)!: drop v1 routes\n\nBREAKING CHANGE: v1 routes are gone\nRefs #42"
        );
    }

    #[test]
    fn test_build_message_ignores_breaking_signals_of_non_breaking_group() {
        let summary = Summary::new("tidy imports")
            .with_paragraph("BREAKING CHANGE: not really")
            .with_breaking_note("nope");
        let message = build_message(1, &classification(CommitType::Chore), &summary).unwrap();
        assert!(!message.breaking);
        assert!(message.footers.is_empty());
        assert!(validate(&message).is_ok());
    }

    #[test]
    fn test_build_message_does_not_duplicate_refs() {
        let mut c = classification(CommitType::Fix);
        c.defect_reference = Some("ABC-7".to_string());
        let summary = Summary::new("stop leaking handles").with_paragraph("Refs: ABC-7");
        let message = build_message(1, &c, &summary).unwrap();
        assert_eq!(message.footers, vec![Footer::new("Refs", "ABC-7")]);
    }

    #[test]
    fn test_plan_single_mode() {
        let composer = Composer::new(ComposerConfig {
            split: SplitMode::Single,
            ..Default::default()
        });
        let units = vec![
            ChangeUnit::new("docs/a.md", ChangeKind::Modified),
            ChangeUnit::new("Cargo.toml", ChangeKind::Modified),
        ];
        let plan = composer.plan(&units);
        assert_eq!(plan.commits.len(), 1);
        assert_eq!(plan.commits[0].group.members, vec![0, 1]);
    }

    #[test]
    fn test_hint_source_overrides_breaking() {
        let composer = Composer::new(ComposerConfig::default())
            .with_hints(|_: &ChangeGroup| ClassificationHints::default().breaking(true));
        let plan = composer.plan(&[ChangeUnit::new("src/lib.rs", ChangeKind::Modified)]);
        assert!(plan.commits[0].classification.breaking);
    }

    #[test]
    fn test_compose_with_reports_missing_descriptions_per_group() {
        let composer = Composer::new(ComposerConfig::default());
        let units = vec![
            ChangeUnit::new("docs/install.md", ChangeKind::Modified),
            ChangeUnit::new("Cargo.toml", ChangeKind::Modified),
        ];
        let composition = composer
            .compose_with(&units, |group| {
                if group.paths() == vec!["Cargo.toml"] {
                    Err(SummarizerError::Timeout(30))
                } else {
                    Ok(Summary::new("document install steps"))
                }
            })
            .unwrap();

        assert_eq!(composition.commits.len(), 2);
        assert_eq!(
            composition.commits[0].text().as_deref(),
            Some("docs: document install steps")
        );
        assert!(matches!(
            composition.commits[1].message,
            Err(GroupError::MissingDescription { group: 2, .. })
        ));
        assert_eq!(composition.failure, None);
        assert!(!composition.is_complete());
        assert_eq!(composition.group_errors().count(), 1);
    }

    #[test]
    fn test_compose_with_stops_after_fatal_error() {
        let composer = Composer::new(ComposerConfig::default());
        let units = vec![
            ChangeUnit::new("Cargo.toml", ChangeKind::Modified),
            ChangeUnit::new("build.rs", ChangeKind::Modified),
        ];
        let mut calls = 0;
        let composition = composer
            .compose_with(&units, |_| {
                calls += 1;
                Err(SummarizerError::Unavailable("offline".to_string()))
            })
            .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(
            composition.failure,
            Some(SummarizerError::Unavailable("offline".to_string()))
        );
        assert_eq!(composition.group_errors().count(), 2);
    }

    #[test]
    fn test_compose_with_invalid_summary_is_a_group_error() {
        let composer = Composer::new(ComposerConfig::default());
        let units = vec![ChangeUnit::new("Cargo.toml", ChangeKind::Modified)];
        let composition = composer
            .compose_with(&units, |_| {
                Ok(Summary::new("bump deps").with_paragraph("Breaking change: lowercase"))
            })
            .unwrap();
        assert!(matches!(
            composition.commits[0].message,
            Err(GroupError::InvalidSummary { group: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_compose_with_path_summarizer() {
        let composer = Composer::new(ComposerConfig::default());
        let units = vec![
            ChangeUnit::new("src/auth/login.rs", ChangeKind::Modified).with_lines(vec![
                DiffLine::removed("    if token.len() > 0 {"),
                DiffLine::added("    // fixes #12"),
                DiffLine::added("    if !token.is_empty() {"),
            ]),
            ChangeUnit::new("docs/install.md", ChangeKind::Modified),
        ];

        let composition = composer
            .compose(&units, Arc::new(PathSummarizer::default()))
            .await
            .unwrap();

        assert!(composition.is_complete());
        let texts: Vec<String> = composition.commits.iter().filter_map(|c| c.text()).collect();
        assert_eq!(
            texts,
            vec![
                "fix(auth): update login.rs\n\nRefs #12".to_string(),
                "docs: update install.md".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_compose_with_mocked_summarizer() {
        let mut mock = MockSummarizer::new();
        mock.expect_summarize()
            .times(1)
            .returning(|_| Ok(Summary::new("describe the change").with_paragraph("More detail.")));

        let composer = Composer::new(ComposerConfig::default());
        let units = vec![ChangeUnit::new("src/export.rs", ChangeKind::Added)];
        let composition = composer.compose(&units, Arc::new(mock)).await.unwrap();

        assert_eq!(
            composition.commits[0].text().as_deref(),
            Some("feat(export): describe the change\n\nMore detail.")
        );
    }
}
