//! Text predicates over captured output.
//!
//! All functions here are pure. A case picks the stream(s) it cares about,
//! then composes these to decide pass or fail.

use regex::Regex;

/// True iff every pattern occurs somewhere in `text`.
pub fn contains_all<S: AsRef<str>>(text: &str, patterns: &[S]) -> bool {
    patterns.iter().all(|p| text.contains(p.as_ref()))
}

/// True iff at least one pattern occurs in `text`.
pub fn contains_any<S: AsRef<str>>(text: &str, patterns: &[S]) -> bool {
    patterns.iter().any(|p| text.contains(p.as_ref()))
}

/// True iff none of the patterns occurs in `text`, ignoring ASCII case.
pub fn contains_none_ci<S: AsRef<str>>(text: &str, patterns: &[S]) -> bool {
    let text = text.to_ascii_lowercase();
    patterns
        .iter()
        .all(|p| !text.contains(&p.as_ref().to_ascii_lowercase()))
}

/// Remove one leading prompt marker from `line`, if present.
pub fn strip_prompt<'a>(line: &'a str, prompt: &str) -> &'a str {
    if prompt.is_empty() {
        return line;
    }
    line.strip_prefix(prompt).unwrap_or(line)
}

/// True iff some line of `text`, with its prompt stripped and whitespace
/// trimmed, equals the trimmed `expected`.
pub fn has_exact_line(text: &str, expected: &str, prompt: &str) -> bool {
    let expected = expected.trim();
    text.lines()
        .any(|line| strip_prompt(line, prompt).trim() == expected)
}

/// True iff `predicate` holds for some prompt-stripped line of `text`.
pub fn any_line<F>(text: &str, prompt: &str, predicate: F) -> bool
where
    F: Fn(&str) -> bool,
{
    text.lines().any(|line| predicate(strip_prompt(line, prompt)))
}

/// Lines with actual content: output is split at newlines and at every
/// prompt marker (targets often print output right after a prompt), then
/// trimmed, and empty pieces are dropped.
pub fn content_lines<'a>(text: &'a str, prompt: &str) -> Vec<&'a str> {
    let marker = prompt.trim_end();
    text.lines()
        .flat_map(|line| {
            if marker.is_empty() {
                vec![line]
            } else {
                line.split(marker).collect()
            }
        })
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect()
}

pub fn count_content_lines(text: &str, prompt: &str) -> usize {
    content_lines(text, prompt).len()
}

/// Number of non-overlapping occurrences of `needle`.
pub fn count_occurrences(text: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    text.matches(needle).count()
}

pub fn matches_pattern(text: &str, pattern: &Regex) -> bool {
    pattern.is_match(text)
}

pub fn count_matches(text: &str, pattern: &Regex) -> usize {
    pattern.find_iter(text).count()
}

/// True iff every needle occurs after the end of the previous one.
pub fn appears_in_order<S: AsRef<str>>(text: &str, needles: &[S]) -> bool {
    let mut rest = text;
    for needle in needles {
        match rest.find(needle.as_ref()) {
            Some(at) => rest = &rest[at + needle.as_ref().len()..],
            None => return false,
        }
    }
    true
}
