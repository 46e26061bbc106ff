//! Path math over item full names.
//!
//! A full name is a `/`-delimited namespace path such as `A/B/job`. Everything
//! here is pure; blank input is treated as a root-level name with no parent.

use std::cmp::Ordering;

/// Number of `/` separators in `path`. A root item has depth 0.
#[must_use]
pub fn depth_of(path: &str) -> usize {
    if path.trim().is_empty() {
        return 0;
    }
    path.bytes().filter(|b| *b == b'/').count()
}

/// Everything before the last `/`, or `None` for root-level names.
///
/// A leading `/` does not produce an empty parent: `"/job"` has no parent.
#[must_use]
pub fn parent_of(path: &str) -> Option<&str> {
    match path.rfind('/') {
        Some(idx) if idx > 0 => Some(&path[..idx]),
        _ => None,
    }
}

/// Last path segment (`"A/B/job"` -> `"job"`).
#[must_use]
pub fn leaf_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, leaf)| leaf)
}

/// True when `candidate` is `prefix` itself or lives underneath it.
#[must_use]
pub fn is_same_or_descendant(candidate: &str, prefix: &str) -> bool {
    candidate == prefix
        || candidate
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Proper ancestors of `path`, root first (`"A/B/job"` -> `["A", "A/B"]`).
#[must_use]
pub fn ancestors(path: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut current = parent_of(path);
    while let Some(p) = current {
        if p.trim().is_empty() {
            break;
        }
        out.push(p);
        current = parent_of(p);
    }
    out.reverse();
    out
}

/// Hierarchical sort key: containers get a trailing `/` so `"A/"` sorts
/// immediately before `"A/b"` and after any sibling leaf named `"A"`.
#[must_use]
pub fn sort_key(path: &str, is_container: bool) -> String {
    if is_container && !path.ends_with('/') {
        format!("{path}/")
    } else {
        path.to_string()
    }
}

/// Case-insensitive string comparison (ASCII/Unicode lowercase folding).
#[must_use]
pub fn compare_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Tree order used by previews and pickers.
///
/// Compares sort keys case-insensitively, then the plain names as a tie-break.
#[must_use]
pub fn compare_hierarchical(a: (&str, bool), b: (&str, bool)) -> Ordering {
    compare_ignore_case(&sort_key(a.0, a.1), &sort_key(b.0, b.1))
        .then_with(|| compare_ignore_case(a.0, b.0))
}

/// Apply order: shallower paths first, then case-insensitive name.
#[must_use]
pub fn compare_depth_then_name(a: &str, b: &str) -> Ordering {
    depth_of(a)
        .cmp(&depth_of(b))
        .then_with(|| compare_ignore_case(a, b))
}
