//! Heuristic reading of diff lines: declared symbols, identifiers, issue
//! references and whitespace-only edits.
//!
//! Everything here is line based and language agnostic enough for Rust,
//! JavaScript/TypeScript, Python, Go and the Java family. Binary units are
//! never inspected.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::change::ChangeUnit;

/// Declarations that are part of a public contract.
static PUBLIC_DECLARATIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Rust
        r#"^\s*pub\s+(?:(?:async|const|unsafe|extern(?:\s+"[^"]*")?)\s+)*(?:fn|struct|enum|trait|type|mod|const|static|union)\s+(?P<name>[A-Za-z_][A-Za-z0-9_]*)"#,
        // JavaScript / TypeScript
        r"^\s*export\s+(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?(?:async\s+)?(?:function\*?|class|const|let|var|interface|type|enum)\s+(?P<name>[A-Za-z_$][A-Za-z0-9_$]*)",
        // Python, top level and not underscored
        r"^(?:async\s+)?(?:def|class)\s+(?P<name>[A-Za-z][A-Za-z0-9_]*)",
        // Go, exported
        r"^func\s+(?:\([^)]*\)\s*)?(?P<name>[A-Z][A-Za-z0-9_]*)",
        r"^type\s+(?P<name>[A-Z][A-Za-z0-9_]*)",
        // Java, C#, Kotlin
        r"^\s*public\s+(?:[A-Za-z_<>\[\],?]+\s+)*?(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s*[({<]",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("public declaration pattern is valid"))
    .collect()
});

/// Any declaration, public or not. Trait impls are not declarations.
static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:fn|struct|enum|trait|class|def|function|func|interface)\s+(?P<name>[A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("declaration pattern is valid")
});

/// Top-level type aliases only; indented `type X = ...` is an associated type.
static TYPE_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:pub(?:\([^)]*\))?\s+|export\s+)?type\s+(?P<name>[A-Za-z_][A-Za-z0-9_]*)")
        .expect("type alias pattern is valid")
});

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("identifier pattern is valid"));

static ISSUE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:#[0-9]+\b|\b[A-Z][A-Z0-9]+-[0-9]+\b)").expect("issue pattern is valid")
});

static DEFECT_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i:\b(?:fix(?:e[sd])?|close[sd]?|resolve[sd]?)\b)[:\s]+(?P<reference>#[0-9]+|[A-Z][A-Z0-9]+-[0-9]+)",
    )
    .expect("defect pattern is valid")
});

/// Declared names too generic to link two files together, compared
/// case-insensitively. Includes common standard trait and associated type names.
const GENERIC_NAMES: &[&str] = &[
    "self", "main", "test", "tests", "default", "from", "into", "init", "data", "value",
    "error", "result", "config", "options", "new", "drop", "clone", "build", "setup",
    "display", "debug", "copy", "hash", "partialeq", "partialord", "iterator",
    "intoiterator", "item", "output", "target", "deref", "derefmut", "asref", "asmut",
    "borrow", "tryfrom", "tryinto", "fromstr", "tostring", "send", "sync", "sized",
    "serialize", "deserialize", "future",
];

const MIN_SHARED_NAME_LEN: usize = 4;

/// A public declaration seen on a diff line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Symbol {
    pub name: String,
    /// The declaration line with whitespace collapsed.
    pub signature: String,
}

/// What one unit's changed lines say.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitContent {
    pub added_public: Vec<Symbol>,
    pub removed_public: Vec<Symbol>,
    /// Distinctive names declared on changed lines.
    pub declared: BTreeSet<String>,
    /// Identifiers appearing on changed lines.
    pub identifiers: BTreeSet<String>,
    /// Issue references in added comment or documentation lines.
    pub issue_refs: BTreeSet<String>,
    /// First `fixes #N` style reference in added comment or documentation lines.
    pub defect_ref: Option<String>,
    /// Changed lines differ only in whitespace.
    pub whitespace_only: bool,
}

impl UnitContent {
    /// Analyze a unit. `prose` treats every added line as documentation text
    /// instead of only comment lines.
    pub fn analyze(unit: &ChangeUnit, prose: bool) -> Self {
        if unit.is_binary() {
            return Self::default();
        }

        let added: Vec<&str> = unit.added_lines().collect();
        let removed: Vec<&str> = unit.removed_lines().collect();

        let declared = unit
            .changed_lines()
            .flat_map(|l| DECLARATION.captures_iter(l).chain(TYPE_ALIAS.captures(l)))
            .filter_map(|c| c.name("name").map(|m| m.as_str().to_string()))
            .filter(|n| is_distinctive(n))
            .collect();

        let identifiers = unit
            .changed_lines()
            .flat_map(|l| IDENTIFIER.find_iter(l))
            .map(|m| m.as_str().to_string())
            .collect();

        let annotated: Vec<&str> = added
            .iter()
            .copied()
            .filter(|l| prose || is_comment(l))
            .collect();

        let issue_refs = annotated
            .iter()
            .flat_map(|l| ISSUE_REFERENCE.find_iter(l))
            .map(|m| m.as_str().to_string())
            .collect();

        let defect_ref = annotated.iter().find_map(|l| {
            DEFECT_REFERENCE
                .captures(l)
                .and_then(|c| c.name("reference").map(|m| m.as_str().to_string()))
        });

        Self {
            added_public: public_declarations(&added),
            removed_public: public_declarations(&removed),
            declared,
            identifiers,
            issue_refs,
            defect_ref,
            whitespace_only: is_whitespace_only(&added, &removed),
        }
    }

    /// Public symbols removed, renamed, or re-declared with a different signature.
    pub fn broken_symbols(&self) -> Vec<&Symbol> {
        self.removed_public
            .iter()
            .filter(|old| !self.added_public.iter().any(|new| new.signature == old.signature))
            .collect()
    }

    /// Public symbols whose names did not exist before.
    pub fn new_symbols(&self) -> Vec<&Symbol> {
        self.added_public
            .iter()
            .filter(|new| !self.removed_public.iter().any(|old| old.name == new.name))
            .collect()
    }
}

fn public_declarations(lines: &[&str]) -> Vec<Symbol> {
    let mut symbols: Vec<Symbol> = lines
        .iter()
        .filter_map(|line| {
            PUBLIC_DECLARATIONS.iter().find_map(|re| {
                re.captures(line).and_then(|c| {
                    c.name("name").map(|m| Symbol {
                        name: m.as_str().to_string(),
                        signature: normalize_whitespace(line),
                    })
                })
            })
        })
        .collect();
    symbols.sort();
    symbols.dedup();
    symbols
}

fn is_distinctive(name: &str) -> bool {
    name.len() >= MIN_SHARED_NAME_LEN
        && !GENERIC_NAMES.iter().any(|g| g.eq_ignore_ascii_case(name))
}

/// Comment or doc-comment line in the common languages.
pub fn is_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    ["//", "#", "/*", "*", "--", "<!--", "\"\"\"", ";;"]
        .iter()
        .any(|p| trimmed.starts_with(p))
}

pub fn normalize_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether removed and added lines are the same text once all whitespace is
/// dropped. Requires at least one changed line.
fn is_whitespace_only(added: &[&str], removed: &[&str]) -> bool {
    if added.is_empty() && removed.is_empty() {
        return false;
    }

    let squash = |lines: &[&str]| {
        let mut squashed: Vec<String> = lines
            .iter()
            .map(|l| l.chars().filter(|c| !c.is_whitespace()).collect::<String>())
            .filter(|l| !l.is_empty())
            .collect();
        squashed.sort();
        squashed
    };

    squash(added) == squash(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{ChangeKind, DiffLine};

    fn unit(lines: Vec<DiffLine>) -> ChangeUnit {
        ChangeUnit::new("src/lib.rs", ChangeKind::Modified).with_lines(lines)
    }

    #[test]
    fn test_public_declarations_across_languages() {
        let lines = [
            "pub fn verify_token(token: &str) -> bool {",
            "pub async fn fetch() {}",
            "    pub struct Session {",
            "fn private_helper() {}",
            "export function renderPage(props) {",
            "export default class Router {",
            "def handle_request(req):",
            "def _internal():",
            "func Serve(addr string) error {",
            "func (s *Server) Close() error {",
            "func helper() {}",
            "public class AuthService {",
            "    public static void main(String[] args) {",
        ];
        let names: Vec<String> = public_declarations(&lines)
            .into_iter()
            .map(|s| s.name)
            .collect();
        for expected in [
            "verify_token",
            "fetch",
            "Session",
            "renderPage",
            "Router",
            "handle_request",
            "Serve",
            "Close",
            "AuthService",
            "main",
        ] {
            assert!(names.contains(&expected.to_string()), "missing {expected}: {names:?}");
        }
        assert!(!names.contains(&"private_helper".to_string()));
        assert!(!names.contains(&"_internal".to_string()));
        assert!(!names.contains(&"helper".to_string()));
    }

    #[test]
    fn test_signature_change_is_broken_symbol() {
        let content = UnitContent::analyze(
            &unit(vec![
                DiffLine::removed("pub fn connect(url: &str) -> Client {"),
                DiffLine::added("pub fn connect(url: &str, timeout: u64) -> Client {"),
            ]),
            false,
        );
        let broken = content.broken_symbols();
        assert_eq!(broken.len(), 1);
        assert_eq!(broken[0].name, "connect");
        assert!(content.new_symbols().is_empty());
    }

    #[test]
    fn test_reindented_declaration_is_not_broken() {
        let content = UnitContent::analyze(
            &unit(vec![
                DiffLine::removed("pub fn connect(url: &str)  -> Client {"),
                DiffLine::added("    pub fn connect(url: &str) -> Client {"),
            ]),
            false,
        );
        assert!(content.broken_symbols().is_empty());
        assert!(content.whitespace_only);
    }

    #[test]
    fn test_new_symbols() {
        let content = UnitContent::analyze(
            &unit(vec![DiffLine::added("pub fn export_csv(rows: &[Row]) {}")]),
            false,
        );
        assert_eq!(content.new_symbols().len(), 1);
        assert!(content.declared.contains("export_csv"));
    }

    #[test]
    fn test_generic_names_are_not_distinctive() {
        let content = UnitContent::analyze(
            &unit(vec![
                DiffLine::added("fn new() -> Self {"),
                DiffLine::added("fn run() {}"),
                DiffLine::added("fn tokenize() {}"),
            ]),
            false,
        );
        assert_eq!(content.declared.iter().collect::<Vec<_>>(), vec!["tokenize"]);
    }

    #[test]
    fn test_trait_impls_and_associated_types_are_not_declarations() {
        let content = UnitContent::analyze(
            &unit(vec![
                DiffLine::added("impl Default for Parser {"),
                DiffLine::added("    type Error = HttpError;"),
                DiffLine::added("impl fmt::Display for Token {"),
                DiffLine::added("pub type Headers = Vec<Header>;"),
                DiffLine::added("struct Error;"),
            ]),
            false,
        );
        assert_eq!(content.declared.iter().collect::<Vec<_>>(), vec!["Headers"]);
    }

    #[test]
    fn test_issue_and_defect_references_come_from_comments() {
        let content = UnitContent::analyze(
            &unit(vec![
                DiffLine::added("// Fixes #42: guard against empty input"),
                DiffLine::added("let color = \"#123\";"),
                DiffLine::added("/* see PROJ-7 */"),
            ]),
            false,
        );
        assert_eq!(content.defect_ref.as_deref(), Some("#42"));
        assert!(content.issue_refs.contains("#42"));
        assert!(content.issue_refs.contains("PROJ-7"));
        assert!(!content.issue_refs.contains("#123"));
    }

    #[test]
    fn test_prose_lines_count_as_annotations() {
        let doc = ChangeUnit::new("docs/auth.md", ChangeKind::Modified)
            .with_lines(vec![DiffLine::added("Resolves AUTH-12 by documenting the flow.")]);
        let content = UnitContent::analyze(&doc, true);
        assert_eq!(content.defect_ref.as_deref(), Some("AUTH-12"));
    }

    #[test]
    fn test_whitespace_only() {
        assert!(is_whitespace_only(&["fn a() {", ""], &["fn  a(){"]));
        assert!(!is_whitespace_only(&["fn a() { 1 }"], &["fn a() { 2 }"]));
        assert!(!is_whitespace_only(&[], &[]));
    }

    #[test]
    fn test_binary_unit_is_not_analyzed() {
        let content = UnitContent::analyze(&ChangeUnit::binary("a.png", ChangeKind::Added), false);
        assert_eq!(content, UnitContent::default());
    }

    #[test]
    fn test_is_comment() {
        assert!(is_comment("    // note"));
        assert!(is_comment("# python comment"));
        assert!(is_comment(" * doc line"));
        assert!(!is_comment("let x = 1;"));
    }
}
