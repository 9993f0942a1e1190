//! Canonical service names
//!
//! Every lookup in the container goes through [`ServiceName`], so `"Db-Adapter"`,
//! `"db_adapter"` and `"dbadapter"` all address the same entry. The rule is a stable
//! contract: lower-case the name and strip `-`, `_`, spaces, `\` and `/`.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Characters removed during canonicalisation.
pub const NAME_SEPARATORS: [char; 5] = ['-', '_', ' ', '\\', '/'];

/// Canonicalised service key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ServiceName(String);

impl ServiceName {
    /// Canonicalise a raw name.
    pub fn new(raw: &str) -> Self {
        Self(canonicalize(raw))
    }

    /// The canonical form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the canonical string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Canonical form of `raw` without allocating a [`ServiceName`].
pub fn canonicalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !NAME_SEPARATORS.contains(c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Closest candidate within an edit distance of two, used for "did you mean" hints.
pub fn closest_match<'a, I>(target: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .filter(|candidate| *candidate != target)
        .map(|candidate| (edit_distance(target, candidate), candidate))
        .filter(|(distance, _)| *distance <= 2)
        .min_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)))
        .map(|(_, candidate)| candidate)
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut current = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        previous = current;
    }
    previous[b.len()]
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ServiceName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ServiceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ServiceName {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ServiceName {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<ServiceName> for String {
    fn from(name: ServiceName) -> Self {
        name.0
    }
}
