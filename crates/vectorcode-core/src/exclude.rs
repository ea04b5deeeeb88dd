//! Ignore-style exclusion filter.
//!
//! Patterns come one per line from `<root>/.vectorcode/vectorcode.exclude`.
//! A bare name (no `/`) matches that name at any depth, like an ignore
//! file entry; patterns also exclude everything beneath a matching
//! directory. Matching is always against project-relative paths.
//!
//! The filter is total: malformed patterns are treated as non-matching and
//! an absent spec file means nothing is excluded.

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

#[derive(Debug)]
pub struct ExclusionFilter {
    set: GlobSet,
}

impl ExclusionFilter {
    /// Build a filter from ignore-style patterns. Blank lines, comment
    /// lines, and patterns globset rejects are skipped.
    pub fn new(patterns: &[String]) -> Self {
        let mut builder = GlobSetBuilder::new();
        for raw in patterns {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            for candidate in expand_pattern(line) {
                if let Ok(glob) = Glob::new(&candidate) {
                    builder.add(glob);
                }
            }
        }
        let set = builder.build().unwrap_or_else(|_| GlobSet::empty());
        Self { set }
    }

    /// Build a filter from the raw contents of an exclude spec file.
    pub fn from_spec(content: &str) -> Self {
        let lines: Vec<String> = content.lines().map(str::to_string).collect();
        Self::new(&lines)
    }

    /// Filter with no patterns; nothing is excluded.
    pub fn empty() -> Self {
        Self::new(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Whether `relative` (a path relative to the project root) is excluded.
    pub fn is_excluded(&self, relative: &Path) -> bool {
        self.set.is_match(relative)
    }
}

impl Default for ExclusionFilter {
    fn default() -> Self {
        Self::empty()
    }
}

/// Expand one ignore-style pattern into the glob forms it implies: the
/// pattern itself, the pattern anchored at any depth (for bare names), and
/// both with trailing `/**` so directory patterns exclude their contents.
fn expand_pattern(pattern: &str) -> Vec<String> {
    let base = pattern.trim_end_matches('/');
    if base.is_empty() {
        return Vec::new();
    }
    let mut out = vec![base.to_string(), format!("{base}/**")];
    if !base.contains('/') {
        out.push(format!("**/{base}"));
        out.push(format!("**/{base}/**"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(patterns: &[&str]) -> ExclusionFilter {
        let owned: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
        ExclusionFilter::new(&owned)
    }

    #[test]
    fn empty_filter_excludes_nothing() {
        let f = ExclusionFilter::empty();
        assert!(!f.is_excluded(Path::new("src/main.rs")));
        assert!(f.is_empty());
    }

    #[test]
    fn bare_name_matches_at_any_depth() {
        let f = filter(&["excluded.py"]);
        assert!(f.is_excluded(Path::new("excluded.py")));
        assert!(f.is_excluded(Path::new("sub/dir/excluded.py")));
        assert!(!f.is_excluded(Path::new("included.py")));
    }

    #[test]
    fn directory_pattern_excludes_contents() {
        let f = filter(&["node_modules/"]);
        assert!(f.is_excluded(Path::new("node_modules/lodash/index.js")));
        assert!(f.is_excluded(Path::new("pkg/node_modules/a.js")));
        assert!(!f.is_excluded(Path::new("src/modules.rs")));
    }

    #[test]
    fn wildcard_patterns() {
        let f = filter(&["*.log", "build/**"]);
        assert!(f.is_excluded(Path::new("debug.log")));
        assert!(f.is_excluded(Path::new("logs/app.log")));
        assert!(f.is_excluded(Path::new("build/out/main.o")));
        assert!(!f.is_excluded(Path::new("src/log.rs")));
    }

    #[test]
    fn malformed_pattern_is_non_matching() {
        let f = filter(&["[", "excluded.py"]);
        assert!(!f.is_excluded(Path::new("[")));
        assert!(f.is_excluded(Path::new("excluded.py")));
    }

    #[test]
    fn comments_and_blank_lines_ignored() {
        let f = ExclusionFilter::from_spec("# generated\n\nexcluded.py\n");
        assert!(f.is_excluded(Path::new("excluded.py")));
        assert!(!f.is_excluded(Path::new("# generated")));
    }
}
