//! Serviceable-region allowlist.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::error::DomainError;

/// Removes diacritics, keeping case (`"São Paulo"` → `"Sao Paulo"`).
pub fn fold_diacritics(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Case- and diacritic-insensitive key for a city name, with runs of
/// whitespace collapsed.
pub fn normalize_city(city: &str) -> String {
    fold_diacritics(city)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized region (state) code.
pub fn normalize_region(region: &str) -> String {
    fold_diacritics(region.trim()).to_uppercase()
}

/// A locality the storefront delivers to, as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locality {
    pub city: String,
    pub region: String,
}

impl std::fmt::Display for Locality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.city, self.region)
    }
}

/// The set of `(city, region)` pairs checkout accepts.
#[derive(Debug, Clone, Default)]
pub struct ServiceableRegions {
    localities: Vec<Locality>,
    keys: HashSet<(String, String)>,
}

impl ServiceableRegions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a locality to the allowlist.
    pub fn with(mut self, city: impl Into<String>, region: impl Into<String>) -> Self {
        self.insert(city, region);
        self
    }

    pub fn insert(&mut self, city: impl Into<String>, region: impl Into<String>) {
        let city = city.into().trim().to_string();
        let region = region.into().trim().to_string();
        if self
            .keys
            .insert((normalize_city(&city), normalize_region(&region)))
        {
            self.localities.push(Locality { city, region });
        }
    }

    /// Returns true if the allowlist contains `(city, region)`.
    pub fn is_serviceable(&self, city: &str, region: &str) -> bool {
        self.keys
            .contains(&(normalize_city(city), normalize_region(region)))
    }

    /// The configured localities, in insertion order.
    pub fn localities(&self) -> &[Locality] {
        &self.localities
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Customer-facing explanation for an address outside the allowlist.
    pub fn rejection_message(&self, city: &str, region: &str) -> String {
        let served = self
            .localities
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Sorry, we don't deliver to {}/{} yet. We currently deliver to: {served}.",
            city.trim(),
            region.trim()
        )
    }
}

impl FromStr for ServiceableRegions {
    type Err = DomainError;

    /// Parses `"City/UF;City/UF"`. Empty entries are skipped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut regions = ServiceableRegions::new();
        for entry in s.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (city, region) = entry
                .rsplit_once('/')
                .filter(|(c, r)| !c.trim().is_empty() && !r.trim().is_empty())
                .ok_or_else(|| DomainError::InvalidRegion(entry.to_string()))?;
            regions.insert(city, region);
        }
        Ok(regions)
    }
}

/// Free function form of [`ServiceableRegions::is_serviceable`].
pub fn is_serviceable_region(allowlist: &ServiceableRegions, city: &str, region: &str) -> bool {
    allowlist.is_serviceable(city, region)
}
