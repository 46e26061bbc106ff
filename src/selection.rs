//! Selection expansion with prefix semantics.
//!
//! Selecting `A/B` selects `A/B` itself and every known entry under `A/B/`.
//! The same expansion runs on export (live item names) and on import (names
//! discovered in an archive), so selecting a folder, real or synthetic, always
//! carries its whole subtree.

use std::collections::{BTreeSet, HashSet};

use crate::namespace::compare_depth_then_name;

/// Normalize a raw selection: trim, drop blanks, de-duplicate keeping the
/// first occurrence.
#[must_use]
pub fn normalize<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_string()))
        .map(ToString::to_string)
        .collect()
}

/// Expand `raw` against `known_keys`.
///
/// The result is a subset of `known_keys`, free of duplicates, ordered by
/// depth and then case-insensitive name so parents come before children.
/// Tokens that match nothing are dropped.
#[must_use]
pub fn expand<S, I, K>(raw: &[S], known_keys: I) -> Vec<String>
where
    S: AsRef<str>,
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    let selected = normalize(raw);
    if selected.is_empty() {
        return Vec::new();
    }

    let keys: Vec<K> = known_keys.into_iter().collect();
    let mut expanded: BTreeSet<String> = BTreeSet::new();

    for s in &selected {
        let prefix = if s.ends_with('/') {
            s.clone()
        } else {
            format!("{s}/")
        };

        for k in &keys {
            let k = k.as_ref();
            if k == s.as_str() || k.starts_with(prefix.as_str()) {
                expanded.insert(k.to_string());
            }
        }
    }

    let mut out: Vec<String> = expanded.into_iter().collect();
    out.sort_by(|a, b| compare_depth_then_name(a, b));
    out
}
