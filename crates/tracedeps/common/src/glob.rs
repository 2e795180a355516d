// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Shell glob patterns with `fnmatch(3)` semantics (no flags)
//!
//! Patterns are translated once into anchored regular expressions:
//! `*` matches any run of characters (slashes and leading dots included),
//! `?` matches one character, `[...]` is a bracket expression (`!` or `^`
//! negates, ranges and `[:class:]` names allowed, a leading `]` is literal)
//! and `\x` matches `x` literally. An unterminated `[` is a literal bracket.
//!
//! A reversed range such as `[z-a]` contains no characters, so a bracket made
//! only of reversed ranges matches nothing (and its negation any character).
//! A `-` next to a `[:class:]` name is a literal dash.

use regex::Regex;

use crate::error::{IndexError, IndexResult};

/// A single compiled glob pattern
#[derive(Debug, Clone)]
pub struct GlobPattern {
    pattern: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compile a glob pattern
    pub fn new(pattern: &str) -> IndexResult<Self> {
        let translated = translate(pattern);
        let regex = Regex::new(&translated).map_err(|source| IndexError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The original glob text
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Whether the whole of `text` matches
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Ordered list of glob patterns
#[derive(Debug, Clone, Default)]
pub struct GlobSet {
    patterns: Vec<GlobPattern>,
}

impl GlobSet {
    /// Compile every pattern, failing on the first invalid one
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> IndexResult<Self> {
        let patterns = patterns.iter().map(|p| GlobPattern::new(p.as_ref())).collect::<IndexResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[GlobPattern] {
        &self.patterns
    }

    /// Index of the first pattern matching `text`
    pub fn first_match(&self, text: &str) -> Option<usize> {
        self.patterns.iter().position(|p| p.matches(text))
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }
}

fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2 + 8);
    out.push_str("(?s)^");

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' if i + 1 < chars.len() => {
                i += 1;
                push_literal(&mut out, chars[i]);
            }
            '[' => match translate_bracket(&chars, i) {
                Some((class, next)) => {
                    out.push_str(&class);
                    i = next;
                    continue;
                }
                None => push_literal(&mut out, '['),
            },
            c => push_literal(&mut out, c),
        }
        i += 1;
    }

    out.push('$');
    out
}

/// Translate the bracket expression starting at `start` (which holds `[`).
/// Returns the regex class and the index just past the closing `]`.
fn translate_bracket(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut i = start + 1;
    let negated = matches!(chars.get(i), Some('!' | '^'));
    if negated {
        i += 1;
    }

    let mut members = String::new();
    let mut first = true;
    while i < chars.len() {
        if chars[i] == ']' && !first {
            let class = match (members.is_empty(), negated) {
                (false, false) => format!("[{members}]"),
                (false, true) => format!("[^{members}]"),
                (true, false) => String::from("[^\\s\\S]"),
                (true, true) => String::from("."),
            };
            return Some((class, i + 1));
        }
        first = false;

        if chars[i] == '[' && chars.get(i + 1) == Some(&':') {
            if let Some(end) = find_class_name_end(chars, i + 2) {
                members.extend(&chars[i..end]);
                i = end;
                continue;
            }
        }

        let (low, next) = bracket_char(chars, i);
        let is_range = chars.get(next) == Some(&'-') && chars.get(next + 1).is_some_and(|&c| c != ']');
        if is_range {
            let (high, after) = bracket_char(chars, next + 1);
            // A reversed range contributes no characters
            if low <= high {
                push_class_literal(&mut members, low);
                members.push('-');
                push_class_literal(&mut members, high);
            }
            i = after;
        } else {
            push_class_literal(&mut members, low);
            i = next;
        }
    }

    None
}

/// One bracket member character at `i`, honouring a backslash escape
fn bracket_char(chars: &[char], i: usize) -> (char, usize) {
    if chars[i] == '\\' && i + 1 < chars.len() {
        (chars[i + 1], i + 2)
    } else {
        (chars[i], i + 1)
    }
}

/// Find the end (exclusive, past `:]`) of a `[:name:]` class whose name starts at `from`
fn find_class_name_end(chars: &[char], from: usize) -> Option<usize> {
    let mut i = from;
    while i + 1 < chars.len() {
        if chars[i] == ':' && chars[i + 1] == ']' {
            return if i > from { Some(i + 2) } else { None };
        }
        if !chars[i].is_ascii_alphabetic() {
            return None;
        }
        i += 1;
    }
    None
}

fn push_literal(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

fn push_class_literal(class: &mut String, c: char) {
    if matches!(c, '\\' | '[' | ']' | '^' | '-' | '&' | '~') {
        class.push('\\');
    }
    class.push(c);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glob(p: &str) -> GlobPattern {
        GlobPattern::new(p).unwrap()
    }

    #[test]
    fn test_star_crosses_slashes() {
        assert!(glob("*.o").matches("drivers/net/e1000.o"));
        assert!(glob("/usr/*").matches("/usr/include/stdio.h"));
        assert!(!glob("*.o").matches("main.c"));
    }

    #[test]
    fn test_star_matches_leading_dot() {
        assert!(glob("*").matches(".config"));
        assert!(glob("*/.tmp*").matches("out/.tmp_vmlinux.o"));
    }

    #[test]
    fn test_question_mark() {
        assert!(glob("a?c").matches("abc"));
        assert!(!glob("a?c").matches("ac"));
    }

    #[test]
    fn test_bracket_expressions() {
        assert!(glob("file[0-9].c").matches("file7.c"));
        assert!(!glob("file[0-9].c").matches("filex.c"));
        assert!(glob("file[!0-9].c").matches("filex.c"));
        assert!(glob("file[^0-9].c").matches("filex.c"));
        assert!(glob("[]]").matches("]"));
        assert!(glob("[[:digit:]]x").matches("4x"));
    }

    #[test]
    fn test_reversed_range_matches_nothing() {
        assert!(!glob("[z-a]").matches("m"));
        assert!(!glob("[z-a]").matches("z"));
        assert!(!glob("x[z-a]").matches("x"));
        assert!(glob("[!z-a]").matches("m"));
        assert!(glob("[z-ab]").matches("b"));
        assert!(!glob("[z-ab]").matches("c"));
    }

    #[test]
    fn test_dash_beside_class_name_is_literal() {
        let pattern = glob("[[:digit:]-z]");
        assert!(pattern.matches("5"));
        assert!(pattern.matches("-"));
        assert!(pattern.matches("z"));
        assert!(!pattern.matches("m"));
        assert!(glob("[a-]").matches("-"));
        assert!(glob("[-a]").matches("-"));
    }

    #[test]
    fn test_unterminated_bracket_is_literal() {
        assert!(glob("a[b").matches("a[b"));
        assert!(!glob("a[b").matches("ab"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        assert!(glob("gcc (x86)+.log").matches("gcc (x86)+.log"));
        assert!(!glob("a.c").matches("abc"));
        assert!(glob("a\\*").matches("a*"));
        assert!(!glob("a\\*").matches("ab"));
    }

    #[test]
    fn test_whole_string_anchoring() {
        assert!(!glob("gcc").matches("/usr/bin/gcc -c a.c"));
        assert!(glob("*gcc *").matches("/usr/bin/gcc -c a.c"));
    }

    #[test]
    fn test_glob_set_first_match() {
        let set = GlobSet::new(&["*.h", "*.c", "*a.c"]).unwrap();
        assert_eq!(set.first_match("src/a.c"), Some(1));
        assert_eq!(set.first_match("src/a.S"), None);
        assert_eq!(set.len(), 3);
    }
}
