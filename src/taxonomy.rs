//! Filter-taxonomy configuration reader.
//!
//! Serves the `/filters` surface from typed configuration instead of an
//! ad-hoc string map. Two legacy sources both declare taxonomy keys (the
//! per-taxonomy enable map and the plain key list); they are merged and
//! deduplicated here with first-occurrence order, which resolves an old
//! ambiguity where one source silently won over the other.

use serde::Serialize;

use crate::config::FiltersConfig;

/// Catalog category taxonomy, always excluded from the filter blocks.
const CATEGORY_TAXONOMY: &str = "product_cat";

/// Attribute taxonomy prefix stripped to form the short client key.
const ATTRIBUTE_PREFIX: &str = "pa_";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FilterBlock {
    pub key: String,
    pub taxonomy: String,
    pub label: String,
    pub items: Vec<FilterTerm>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FilterTerm {
    pub key: String,
    pub label: String,
}

/// Union of both taxonomy key sources, deduplicated, order of first
/// occurrence preserved (enable-map keys first, then the key list).
pub fn tax_keys(filters: &FiltersConfig) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    let mut push = |key: &str| {
        if !key.is_empty() && !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    };

    for key in filters.tax.keys() {
        push(key);
    }
    for key in &filters.tax_keys {
        push(key);
    }
    keys
}

/// Whether a taxonomy is enabled for filtering.
///
/// Explicit "0" or "" turns it off; a taxonomy named only in `tax_keys`
/// (absent from the enable map) is on.
pub fn is_tax_enabled(filters: &FiltersConfig, taxonomy: &str) -> bool {
    match filters.tax.get(taxonomy) {
        Some(v) => !matches!(v.as_str(), "" | "0"),
        None => filters.tax_keys.iter().any(|k| k == taxonomy),
    }
}

/// Whether a term is visible, i.e. not named in the taxonomy's excluded
/// slug list. No exclusion entry means everything shows.
pub fn is_term_visible(filters: &FiltersConfig, taxonomy: &str, slug: &str) -> bool {
    let Some(excluded) = filters.excluded_terms.get(taxonomy) else {
        return true;
    };
    !excluded
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .any(|s| s == slug)
}

/// Builds the `/filters` blocks: enabled non-category taxonomies with
/// their visible terms, keyed by the shortened attribute key.
pub fn filter_blocks(filters: &FiltersConfig) -> Vec<FilterBlock> {
    tax_keys(filters)
        .into_iter()
        .filter(|tax| tax != CATEGORY_TAXONOMY)
        .filter(|tax| is_tax_enabled(filters, tax))
        .map(|tax| build_block(filters, &tax))
        .collect()
}

fn build_block(filters: &FiltersConfig, taxonomy: &str) -> FilterBlock {
    let short_key = taxonomy
        .strip_prefix(ATTRIBUTE_PREFIX)
        .unwrap_or(taxonomy)
        .to_string();

    let label = filters
        .labels
        .get(taxonomy)
        .cloned()
        .unwrap_or_else(|| short_key.clone());

    let items = filters
        .terms
        .get(taxonomy)
        .map(|terms| {
            terms
                .iter()
                .filter(|t| is_term_visible(filters, taxonomy, &t.key))
                .map(|t| FilterTerm {
                    key: t.key.clone(),
                    label: t.label.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    FilterBlock {
        key: short_key,
        taxonomy: taxonomy.to_string(),
        label,
        items,
    }
}
