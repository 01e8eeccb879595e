//! Brand identifiers.
//!
//! Every store key is namespaced by the canonical slug, so two spellings of
//! the same brand ("Acme Corp", "acme-corp") share one queue and one summary.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::error::{Error, Result};

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

/// Canonical brand slug: lowercase ASCII alphanumerics separated by `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BrandSlug(String);

impl BrandSlug {
    /// Normalizes a raw brand identifier.
    ///
    /// Fails when nothing slug-worthy is left (empty or punctuation only).
    pub fn parse(raw: &str) -> Result<Self> {
        let lowered = raw.trim().to_lowercase();
        let slug = NON_SLUG_CHARS.replace_all(&lowered, "-");
        let slug = slug.trim_matches('-');

        if slug.is_empty() {
            return Err(Error::invalid_brand(format!(
                "'{}' has no alphanumeric characters",
                raw
            )));
        }

        Ok(Self(slug.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a raw brand field refers to this brand.
    pub fn matches(&self, raw: &str) -> bool {
        BrandSlug::parse(raw).is_ok_and(|other| other == *self)
    }
}

impl fmt::Display for BrandSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BrandSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BrandSlug {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        BrandSlug::parse(&value)
    }
}

impl From<BrandSlug> for String {
    fn from(slug: BrandSlug) -> Self {
        slug.0
    }
}

/// Normalizes, sorts and deduplicates a list of raw brand ids, dropping
/// entries that do not form a slug.
pub fn normalize_brands<I, S>(raw: I) -> Vec<BrandSlug>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut slugs: Vec<BrandSlug> = raw
        .into_iter()
        .filter_map(|b| BrandSlug::parse(b.as_ref()).ok())
        .collect();
    slugs.sort();
    slugs.dedup();
    slugs
}
