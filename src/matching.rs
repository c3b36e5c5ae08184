//! Shell-style pattern matching for page paths.
//!
//! `build --filter` selects which pages get written. Page paths are dotted
//! object paths such as `pkg.AClass.a_method`, so unlike file globs a `*`
//! matches any run of characters, separators included.

use std::collections::HashMap;

use parking_lot::Mutex;
use regex::Regex;

use crate::error::{BuildError, Result};

lazy_static::lazy_static! {
    /// Cache for compiled patterns
    static ref PATTERN_CACHE: Mutex<HashMap<String, Regex>> = Mutex::new(HashMap::new());
}

/// The pattern that keeps every page.
pub const MATCH_ALL: &str = "*";

/// Translates a shell-style pattern to an anchored regex.
///
/// - `*` matches everything
/// - `?` matches any single character
/// - `[seq]` matches any character in seq
/// - `[!seq]` matches any character not in seq
///
/// Matching is case sensitive.
pub fn translate_pattern(pattern: &str) -> String {
    let mut regex_pattern = String::new();
    let mut i = 0;
    let chars: Vec<char> = pattern.chars().collect();
    let n = chars.len();

    while i < n {
        let c = chars[i];
        match c {
            '*' => {
                // runs of stars collapse into one
                while i < n && chars[i] == '*' {
                    i += 1;
                }
                regex_pattern.push_str(".*");
            }
            '?' => {
                regex_pattern.push('.');
                i += 1;
            }
            '[' => {
                let mut j = i + 1;
                if j < n && chars[j] == '!' {
                    j += 1;
                }
                if j < n && chars[j] == ']' {
                    j += 1;
                }
                while j < n && chars[j] != ']' {
                    j += 1;
                }
                if j >= n {
                    // no closing bracket, the `[` is literal
                    regex_pattern.push_str("\\[");
                    i += 1;
                } else {
                    let mut class_content = String::new();
                    let mut k = i + 1;

                    if k < n && chars[k] == '!' {
                        class_content.push('^');
                        k += 1;
                    } else if k < n && chars[k] == '^' {
                        class_content.push_str("\\^");
                        k += 1;
                    }

                    while k < j {
                        let ch = chars[k];
                        if ch == '\\' || ch == '[' || ch == '&' || ch == '~' {
                            class_content.push('\\');
                        }
                        class_content.push(ch);
                        k += 1;
                    }

                    regex_pattern.push('[');
                    regex_pattern.push_str(&class_content);
                    regex_pattern.push(']');
                    i = j + 1;
                }
            }
            _ => {
                regex_pattern.push_str(&regex::escape(&c.to_string()));
                i += 1;
            }
        }
    }

    format!("^{}$", regex_pattern)
}

/// Compiles a pattern into a regex, reusing earlier compilations.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    let mut cache = PATTERN_CACHE.lock();

    if let Some(regex) = cache.get(pattern) {
        return Ok(regex.clone());
    }

    let regex = Regex::new(&translate_pattern(pattern))
        .map_err(|e| BuildError::Config(format!("Invalid filter pattern `{}`: {}", pattern, e)))?;
    cache.insert(pattern.to_string(), regex.clone());

    Ok(regex)
}

/// Tests if a name matches a pattern.
pub fn pattern_match(name: &str, pattern: &str) -> Result<bool> {
    let regex = compile_pattern(pattern)?;
    Ok(regex.is_match(name))
}

/// Filters a list of names by a pattern.
pub fn pattern_filter(names: &[String], pattern: &str) -> Result<Vec<String>> {
    let regex = compile_pattern(pattern)?;
    Ok(names
        .iter()
        .filter(|name| regex.is_match(name))
        .cloned()
        .collect())
}

/// Decides which page paths a build writes
#[derive(Debug, Clone)]
pub struct PageFilter {
    pattern: String,
    regex: Option<Regex>,
}

impl PageFilter {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = if pattern == MATCH_ALL {
            None
        } else {
            Some(compile_pattern(pattern)?)
        };
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn all() -> Self {
        Self {
            pattern: MATCH_ALL.to_string(),
            regex: None,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether this filter keeps every page.
    pub fn is_match_all(&self) -> bool {
        self.regex.is_none()
    }

    pub fn matches(&self, path: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(path),
            None => true,
        }
    }
}

impl Default for PageFilter {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_pattern() {
        assert_eq!(translate_pattern("pkg.*"), "^pkg\\..*$");
        assert_eq!(translate_pattern("*"), "^.*$");
        assert_eq!(translate_pattern("**"), "^.*$");
        assert_eq!(translate_pattern("a?c"), "^a.c$");
        assert_eq!(translate_pattern("[abc]x"), "^[abc]x$");
        assert_eq!(translate_pattern("[!abc]x"), "^[^abc]x$");
        assert_eq!(translate_pattern("[x"), "^\\[x$");
    }

    #[test]
    fn test_pattern_match() {
        assert!(pattern_match("pkg.AClass.a_method", "pkg.AClass*").unwrap());
        assert!(pattern_match("reference/index", "*index").unwrap());
        assert!(!pattern_match("pkg.BClass", "pkg.AClass*").unwrap());
        assert!(!pattern_match("Pkg.AClass", "pkg.*").unwrap());

        assert!(pattern_match("a_func", "[ab]_func").unwrap());
        assert!(!pattern_match("c_func", "[ab]_func").unwrap());
        assert!(pattern_match("c_func", "[!ab]_func").unwrap());
    }

    #[test]
    fn test_pattern_filter() {
        let names = vec![
            "AClass".to_string(),
            "a_func".to_string(),
            "AClass.a_method".to_string(),
        ];
        let kept = pattern_filter(&names, "AClass*").unwrap();
        assert_eq!(kept, vec!["AClass", "AClass.a_method"]);
    }

    #[test]
    fn test_page_filter() {
        let all = PageFilter::new("*").unwrap();
        assert!(all.is_match_all());
        assert!(all.matches("anything"));

        let some = PageFilter::new("get_*").unwrap();
        assert!(!some.is_match_all());
        assert!(some.matches("get_object"));
        assert!(!some.matches("Builder"));
        assert_eq!(some.pattern(), "get_*");
    }
}
