//! Ignore patterns applied while scanning a workspace
//!
//! Pattern forms:
//! - `node_modules` matches any path component with exactly that name
//! - `*.log` matches any path component by glob (`*`, `?`)
//! - `docs/generated` matches that relative path and everything below it

/// Directories and files skipped when no patterns are configured
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "dist",
    "build",
    ".next",
    "__pycache__",
    ".venv",
    "venv",
    ".DS_Store",
];

#[derive(Debug, Clone)]
enum Rule {
    Name(String),
    NameGlob(String),
    Path(Vec<String>),
}

/// A compiled set of ignore patterns
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    rules: Vec<Rule>,
}

impl IgnoreRules {
    /// Compile patterns; blank lines and `#` comments are skipped
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .filter_map(|p| {
                let p = p.as_ref().trim();
                if p.is_empty() || p.starts_with('#') {
                    return None;
                }
                let p = p.trim_start_matches("./").trim_matches('/');
                if p.is_empty() {
                    return None;
                }
                Some(if p.contains('/') {
                    Rule::Path(p.split('/').map(str::to_string).collect())
                } else if p.contains('*') || p.contains('?') {
                    Rule::NameGlob(p.to_string())
                } else {
                    Rule::Name(p.to_string())
                })
            })
            .collect();
        Self { rules }
    }

    pub fn defaults() -> Self {
        Self::new(DEFAULT_IGNORE_PATTERNS)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether a `/`-separated relative path is excluded
    pub fn is_ignored(&self, rel_path: &str) -> bool {
        let components: Vec<&str> = rel_path.split('/').filter(|c| !c.is_empty()).collect();
        self.rules.iter().any(|rule| match rule {
            Rule::Name(name) => components.iter().any(|c| *c == name.as_str()),
            Rule::NameGlob(pattern) => components.iter().any(|c| glob_match(pattern, c)),
            Rule::Path(parts) => {
                parts.len() <= components.len()
                    && parts
                        .iter()
                        .zip(components.iter())
                        .all(|(p, c)| glob_match(p, c))
            }
        })
    }
}

/// `*` matches any run of characters, `?` exactly one
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = backtrack {
            pi = sp + 1;
            ti = st + 1;
            backtrack = Some((sp, st + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}
