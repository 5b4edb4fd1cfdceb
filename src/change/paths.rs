//! Path conventions: test files, documentation files, module and scope keys.

/// File names (without extension, case-insensitive) treated as documentation.
const DOC_FILE_STEMS: &[&str] = &[
    "readme",
    "changelog",
    "license",
    "contributing",
    "authors",
    "notice",
    "copying",
    "code_of_conduct",
];

/// Extensions (lowercase) of files that carry program code.
const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "jsx", "mjs", "cjs", "ts", "tsx", "go", "java", "kt", "kts", "scala",
    "c", "h", "cc", "cpp", "cxx", "hpp", "cs", "swift", "rb", "php", "m", "mm", "ex", "exs",
    "erl", "hs", "ml", "lua", "dart", "zig", "vue", "svelte", "clj", "sh", "bash",
];

/// Build manifests, lock files and build scripts, matched by file name.
const BUILD_FILES: &[&str] = &[
    "Cargo.toml",
    "Cargo.lock",
    "build.rs",
    "rust-toolchain",
    "rust-toolchain.toml",
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "go.mod",
    "go.sum",
    "pyproject.toml",
    "setup.py",
    "setup.cfg",
    "requirements.txt",
    "Pipfile",
    "Pipfile.lock",
    "poetry.lock",
    "Gemfile",
    "Gemfile.lock",
    "Makefile",
    "CMakeLists.txt",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "settings.gradle",
    "Dockerfile",
];

/// CI configuration files at the repository top level.
const CI_FILES: &[&str] = &[
    ".gitlab-ci.yml",
    ".travis.yml",
    ".drone.yml",
    "azure-pipelines.yml",
    "appveyor.yml",
    "bitbucket-pipelines.yml",
    "Jenkinsfile",
];

/// Path conventions used by segmentation and classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRules {
    /// Container directories skipped when deriving a module or scope
    /// (`src/auth/x.rs` → `auth`).
    pub scope_roots: Vec<String>,
    /// Directory names that mark test files.
    pub test_dirs: Vec<String>,
    /// Directory names that mark documentation files.
    pub doc_dirs: Vec<String>,
    /// Extensions (lowercase, no dot) of documentation files.
    pub doc_extensions: Vec<String>,
}

impl Default for PathRules {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            scope_roots: owned(&["src", "lib", "crates", "packages", "apps"]),
            test_dirs: owned(&["tests", "test", "__tests__", "spec", "specs"]),
            doc_dirs: owned(&["docs", "doc", "documentation"]),
            doc_extensions: owned(&["md", "markdown", "rst", "adoc", "asciidoc"]),
        }
    }
}

impl PathRules {
    /// Whether the path names a test file, by directory or by file name.
    pub fn is_test(&self, path: &str) -> bool {
        let (dirs, name) = split_path(path);
        if dirs.iter().any(|d| self.test_dirs.iter().any(|t| t == d)) {
            return true;
        }

        let stem = file_stem(name);
        stem.ends_with("_test")
            || stem.ends_with("_tests")
            || stem.ends_with("_spec")
            || stem.starts_with("test_")
            || (stem.len() > 4 && (stem.ends_with("Test") || stem.ends_with("Tests")))
            || name.contains(".test.")
            || name.contains(".spec.")
    }

    /// Whether the path names a documentation file.
    pub fn is_doc(&self, path: &str) -> bool {
        let (dirs, name) = split_path(path);
        if dirs.first().is_some_and(|d| self.doc_dirs.iter().any(|doc| doc == d)) {
            return true;
        }

        if let Some(ext) = extension(name) {
            let ext = ext.to_lowercase();
            if self.doc_extensions.iter().any(|e| *e == ext) {
                return true;
            }
        }

        let stem = file_stem(name).to_lowercase();
        DOC_FILE_STEMS.contains(&stem.as_str())
    }

    /// Whether the file extension marks program code.
    pub fn is_source(&self, path: &str) -> bool {
        let (_, name) = split_path(path);
        extension(name)
            .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    }

    /// Whether the path is a build manifest, lock file or build script.
    pub fn is_build(&self, path: &str) -> bool {
        let (_, name) = split_path(path);
        BUILD_FILES.contains(&name)
    }

    /// Whether the path is CI configuration.
    pub fn is_ci(&self, path: &str) -> bool {
        let (dirs, name) = split_path(path);
        match dirs.as_slice() {
            [".github", "workflows", ..] | [".circleci", ..] | [".buildkite", ..] => true,
            [] => CI_FILES.contains(&name),
            _ => false,
        }
    }

    /// First directory below a scope root, used as the module of a file.
    ///
    /// Files directly inside a root or at the repository top level have no
    /// module, and neither do files under a test directory (those are paired
    /// with their subject instead).
    pub fn module_key(&self, path: &str) -> Option<String> {
        let segments = self.below_root(path);
        if segments.len() < 2 {
            return None;
        }
        let first = segments[0];
        if self.test_dirs.iter().any(|t| t == first) {
            return None;
        }
        normalize_token(first)
    }

    /// Scope token for a single path: the first segment below a scope root,
    /// or the file stem when the file sits directly inside a root.
    pub fn scope_key(&self, path: &str) -> Option<String> {
        let all: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let segments = self.below_root(path);
        let stripped = segments.len() < all.len();

        match segments.as_slice() {
            [] => None,
            [file] if stripped => normalize_token(file_stem(file)),
            [_] => None,
            [dir, ..] => normalize_token(dir),
        }
    }

    /// The name a test file is about: `tests/auth_test.rs` → `auth`.
    pub fn test_subject(&self, path: &str) -> Option<String> {
        let (_, name) = split_path(path);
        let mut stem = file_stem(name);
        for suffix in ["_tests", "_test", "_spec", "Tests", "Test"] {
            if let Some(s) = stem.strip_suffix(suffix) {
                stem = s;
                break;
            }
        }
        if let Some(s) = stem.strip_prefix("test_") {
            stem = s;
        }
        let subject = stem.to_lowercase();
        if subject.is_empty() { None } else { Some(subject) }
    }

    /// Names a non-test file answers to: its stem and its directories below
    /// any scope root.
    pub fn subject_names(&self, path: &str) -> Vec<String> {
        let segments = self.below_root(path);
        let Some((name, dirs)) = segments.split_last() else {
            return Vec::new();
        };

        let mut names: Vec<String> = dirs.iter().map(|d| d.to_lowercase()).collect();
        let stem = file_stem(name).to_lowercase();
        if !stem.is_empty() && stem != "mod" && stem != "index" && stem != "lib" {
            names.push(stem);
        }
        names
    }

    fn below_root<'a>(&self, path: &'a str) -> Vec<&'a str> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.split_first() {
            Some((first, rest))
                if !rest.is_empty() && self.scope_roots.iter().any(|r| r == first) =>
            {
                rest.to_vec()
            }
            _ => segments,
        }
    }
}

fn split_path(path: &str) -> (Vec<&str>, &str) {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let name = segments.pop().unwrap_or_default();
    (segments, name)
}

/// File name up to its first dot, ignoring a leading dot.
fn file_stem(name: &str) -> &str {
    let name = name.strip_prefix('.').unwrap_or(name);
    name.split('.').next().unwrap_or(name)
}

fn extension(name: &str) -> Option<&str> {
    let name = name.strip_prefix('.').unwrap_or(name);
    name.rsplit_once('.').map(|(_, ext)| ext)
}

/// Lowercase a path segment into a scope-safe token.
fn normalize_token(segment: &str) -> Option<String> {
    let token = segment.strip_prefix('.').unwrap_or(segment).to_lowercase();
    let valid = !token.is_empty()
        && !token
            .chars()
            .any(|c| c.is_whitespace() || c == '(' || c == ')');
    valid.then_some(token)
}
