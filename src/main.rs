//! scrivener - CLI entry point.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use git2::Repository;
use serde_json::json;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use scrivener::compose::{ComposedCommit, Composition};
use scrivener::git::{collect_changes, collect_changes_for_paths};
use scrivener::{
    Composer, ComposerConfig, GrammarError, PathRules, PathSummarizer, SegmentationDiagnostic,
    SplitMode, StatusError, SummaryPoolConfig, parse, render,
};

/// Compose Conventional Commit messages from working tree changes.
#[derive(Parser, Debug)]
#[command(name = "scrivener")]
#[command(about = "Compose Conventional Commit messages from working tree changes")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a commit message against the Conventional Commits grammar
    Lint {
        /// File containing the message (reads stdin when omitted)
        file: Option<PathBuf>,

        /// Print the parsed message as JSON
        #[arg(long)]
        json: bool,

        /// Keep lines starting with '#' instead of treating them as git comments
        #[arg(long)]
        keep_comments: bool,
    },

    /// Propose commit messages for the pending changes (nothing is committed)
    Draft {
        /// Restrict to these paths
        paths: Vec<String>,

        /// Propose a single commit for all changes
        #[arg(long)]
        single: bool,

        /// Print the proposal as JSON
        #[arg(long)]
        json: bool,

        /// Additional directory treated as a scope root (repeatable)
        #[arg(long = "scope-root")]
        scope_roots: Vec<String>,

        /// Maximum summarizer calls in flight
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-call summarizer timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Command::Lint {
            file,
            json,
            keep_comments,
        } => lint(file, json, keep_comments),
        Command::Draft {
            paths,
            single,
            json,
            scope_roots,
            concurrency,
            timeout,
        } => {
            let mut rules = PathRules::default();
            rules.scope_roots.extend(scope_roots);

            let mut summary = SummaryPoolConfig::from_env();
            if let Some(concurrency) = concurrency {
                summary.concurrency = concurrency.max(1);
            }
            if let Some(secs) = timeout {
                summary.timeout = Duration::from_secs(secs);
            }

            let config = ComposerConfig {
                paths: rules,
                split: if single { SplitMode::Single } else { SplitMode::Auto },
                summary,
            };
            draft(config, &paths, json).await
        }
    }
}

fn lint(file: Option<PathBuf>, json: bool, keep_comments: bool) -> Result<()> {
    let raw = match file {
        Some(ref path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read message from stdin")?;
            buf
        }
    };

    let text = if keep_comments {
        raw
    } else {
        strip_git_comments(&raw)
    };

    match parse(&text) {
        Ok(message) => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&message).context("Failed to serialize message")?
                );
            } else {
                println!("{}", render(&message));
            }
            Ok(())
        }
        Err(e) => {
            print_grammar_error(&text, &e);
            std::process::exit(1);
        }
    }
}

/// Drop `#` comment lines and everything below a scissors line, as
/// `git commit` does with its default cleanup mode.
fn strip_git_comments(raw: &str) -> String {
    raw.lines()
        .take_while(|l| !l.starts_with("# ------------------------ >8"))
        .filter(|l| !l.starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
}

fn print_grammar_error(text: &str, error: &GrammarError) {
    eprintln!("\x1b[31merror\x1b[0m: {}", error);
    if let Some(line) = text.lines().nth(error.line.saturating_sub(1)) {
        eprintln!("  {} | {}", error.line, line);
        let gutter = error.line.to_string().len();
        eprintln!(
            "  {} | {}^",
            " ".repeat(gutter),
            " ".repeat(error.column.saturating_sub(1))
        );
    }
}

async fn draft(config: ComposerConfig, paths: &[String], json: bool) -> Result<()> {
    let repo = Repository::discover(".")
        .context("Not a git repository. Run scrivener from within a git repository.")?;

    let collected = if paths.is_empty() {
        collect_changes(&repo)
    } else {
        collect_changes_for_paths(&repo, paths)
    };
    let units = match collected {
        Ok(units) => units,
        Err(StatusError::NoChanges) => {
            println!("No changes to compose. Working tree is clean.");
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to read working tree changes"),
    };

    let summarizer = Arc::new(PathSummarizer::new(config.paths.clone()));
    let composer = Composer::new(config);
    let composition = composer
        .compose(&units, summarizer)
        .await
        .context("Failed to compose commit messages")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&composition_json(&composition))
                .context("Failed to serialize proposal")?
        );
    } else {
        print_composition(&composition);
    }

    if let Some(ref failure) = composition.failure {
        bail!("Summarizer failed, proposal is incomplete: {}", failure);
    }

    Ok(())
}

fn composition_json(composition: &Composition) -> serde_json::Value {
    let commits: Vec<serde_json::Value> = composition
        .commits
        .iter()
        .map(|commit| {
            json!({
                "files": commit.group.paths(),
                "classification": commit.classification,
                "message": commit.text(),
                "error": commit.message.as_ref().err().map(|e| e.to_string()),
            })
        })
        .collect();

    json!({
        "commits": commits,
        "diagnostics": composition.diagnostics,
        "failure": composition.failure.as_ref().map(|e| e.to_string()),
    })
}

fn print_composition(composition: &Composition) {
    let total = composition.commits.len();

    for diagnostic in &composition.diagnostics {
        match diagnostic {
            SegmentationDiagnostic::AmbiguityFallback { units } => eprintln!(
                "\x1b[33m⚠ No relation found between {} changed files, proposing one commit per file\x1b[0m",
                units
            ),
            SegmentationDiagnostic::Isolated { path, .. } => {
                eprintln!("note: {} is unrelated to the other changes", path)
            }
        }
    }

    for (index, commit) in composition.commits.iter().enumerate() {
        print_commit(index + 1, total, commit);
    }
}

fn print_commit(number: usize, total: usize, commit: &ComposedCommit) {
    println!("--- Commit {}/{} ({}) ---", number, total, commit.group.paths().join(", "));
    match commit.text() {
        Some(text) => println!("{}\n", text),
        None => {
            if let Err(ref e) = commit.message {
                println!("\x1b[31m✗ {}\x1b[0m\n", e);
            }
        }
    }
}
