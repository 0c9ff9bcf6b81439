//! Shell-style glob matching for policy path exceptions (§4.3), translated
//! to an anchored [`regex::Regex`] rather than pulling in a dedicated glob
//! crate — grounded on the rules engine's own `eval_matches` use of
//! `regex::Regex` for pattern matching elsewhere in the corpus.

use regex::Regex;

/// Characters that are special to `regex` and must be escaped when they
/// appear literally in a glob pattern.
const REGEX_METACHARS: &[char] = &[
    '.', '+', '(', ')', '|', '[', ']', '{', '}', '^', '$', '\\',
];

/// Translate a shell-style glob (`*` matches any run of characters within
/// a path segment, `?` matches exactly one character) into a fully-anchored
/// regular expression.
fn glob_to_regex(pattern: &str) -> Regex {
    let mut re = String::with_capacity(pattern.len() + 2);
    re.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str("[^/]*"),
            '?' => re.push('.'),
            _ => {
                if REGEX_METACHARS.contains(&ch) {
                    re.push('\\');
                }
                re.push(ch);
            }
        }
    }
    re.push('$');
    // The pattern is operator-authored config, not user input; an invalid
    // glob is a config error we surface at load time, not here. Falling
    // back to a pattern that matches nothing keeps `matches` total.
    Regex::new(&re).unwrap_or_else(|_| Regex::new("$^").expect("literal regex is valid"))
}

/// Returns true if `path` matches the shell-style glob `pattern`, anchored
/// to the full string.
#[must_use]
pub fn glob_match(pattern: &str, path: &str) -> bool {
    glob_to_regex(pattern).is_match(path)
}
