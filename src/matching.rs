//! Glob-style scalar name matching
//!
//! Patterns understand `*`, `?`, `[abc]`, `[a-z]` and `[!abc]`. Everything
//! else matches literally. A name matches the matcher if it matches any
//! pattern in full.

use regex::RegexSet;

use crate::error::{Result, WriterError};

/// Compiled set of glob patterns
#[derive(Clone, Debug)]
pub struct NameMatcher {
    patterns: Vec<String>,
    set: RegexSet,
}

impl NameMatcher {
    /// Compile a list of glob patterns
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let mut regexes = Vec::with_capacity(patterns.len());
        for pattern in &patterns {
            let regex = glob_to_regex(pattern);
            // Compile individually so the error names the offending pattern
            regex::Regex::new(&regex)
                .map_err(|source| WriterError::Pattern { pattern: pattern.clone(), source })?;
            regexes.push(regex);
        }
        let set = RegexSet::new(&regexes).map_err(|source| WriterError::Pattern {
            pattern: patterns.join(","),
            source,
        })?;
        Ok(Self { patterns, set })
    }

    /// Matcher accepting every name
    pub fn any() -> Self {
        Self {
            patterns: vec!["*".to_string()],
            set: RegexSet::new([r"(?s)^.*$"]).unwrap_or_else(|_| RegexSet::empty()),
        }
    }

    /// Whether `name` matches at least one pattern
    pub fn matches(&self, name: &str) -> bool {
        self.set.is_match(name)
    }

    /// Source patterns, as given
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for NameMatcher {
    fn default() -> Self {
        Self::any()
    }
}

/// Translate one glob into an anchored regex
fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::from("(?s)^");
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.push('[');
                    let mut j = i + 1;
                    if chars[j] == '!' {
                        out.push('^');
                        j += 1;
                    }
                    for &c in &chars[j..end] {
                        if matches!(c, '\\' | '[' | ']' | '^' | '&' | '~') {
                            out.push('\\');
                        }
                        out.push(c);
                    }
                    out.push(']');
                    i = end;
                }
                None => out.push_str(r"\["),
            },
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    out.push('$');
    out
}

/// Index of the `]` closing the class opened at `start`, if any
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    // A leading ']' is a literal member
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    while j < chars.len() {
        if chars[j] == ']' {
            return Some(j);
        }
        j += 1;
    }
    None
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// A literal pattern matches exactly itself
        #[test]
        fn literal_names_match_themselves(name in "[a-zA-Z0-9_/.+()-]{1,24}") {
            let m = NameMatcher::new([name.clone()]).unwrap();
            prop_assert!(m.matches(&name));
            let longer = format!("{name}x");
            prop_assert!(!m.matches(&longer));
        }

        /// `*` accepts arbitrary names
        #[test]
        fn star_accepts_all(name in ".{0,32}") {
            let m = NameMatcher::new(["*"]).unwrap();
            prop_assert!(m.matches(&name));
        }
    }
}
