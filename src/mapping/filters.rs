//! Per-table filter chains.
//!
//! A candidate match survives only if every predicate registered for its
//! table returns true.

use crate::config::{FiltersConfig, TableConfig};
use crate::element::Tags;
use crate::mapping::index::{ANY, TableKind};
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Predicate over (tags, triggering key, closed).
pub type ElementFilter = Arc<dyn Fn(&Tags, &str, bool) -> bool + Send + Sync>;

/// Relation `type` values accepted by polygon tables without explicit `relation_types`.
pub const POLYGON_RELATION_TYPES: [&str; 3] = ["multipolygon", "boundary", "land_area"];

#[derive(Clone, Default)]
pub struct FilterChains {
    by_table: HashMap<String, Vec<ElementFilter>>,
}

impl fmt::Debug for FilterChains {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .by_table
            .iter()
            .map(|(name, chain)| (name.as_str(), chain.len()))
            .collect();
        f.debug_struct("FilterChains")
            .field("by_table", &counts)
            .finish()
    }
}

impl FilterChains {
    pub fn builder() -> FilterChainsBuilder {
        FilterChainsBuilder::default()
    }

    /// True when every predicate for `table` accepts. Tables without a chain pass.
    pub fn accepts(&self, table: &str, tags: &Tags, key: &str, closed: bool) -> bool {
        match self.by_table.get(table) {
            Some(chain) => chain.iter().all(|filter| filter(tags, key, closed)),
            None => true,
        }
    }

    pub fn filter_count(&self) -> usize {
        self.by_table.values().map(Vec::len).sum()
    }
}

#[derive(Default)]
pub struct FilterChainsBuilder {
    by_table: HashMap<String, Vec<ElementFilter>>,
}

impl FilterChainsBuilder {
    pub fn push(&mut self, table: impl Into<String>, filter: ElementFilter) -> &mut Self {
        self.by_table.entry(table.into()).or_default().push(filter);
        self
    }

    pub fn build(self) -> FilterChains {
        FilterChains {
            by_table: self.by_table,
        }
    }
}

fn value_listed(values: &[String], actual: &str) -> bool {
    values.iter().any(|v| v == ANY || v == actual)
}

/// Keep features where `key` is present with one of `values`.
pub fn require(key: String, values: Vec<String>) -> ElementFilter {
    Arc::new(move |tags: &Tags, _: &str, _: bool| {
        tags.get(&key).is_some_and(|actual| value_listed(&values, actual))
    })
}

/// Drop features where `key` is present with one of `values`.
pub fn reject(key: String, values: Vec<String>) -> ElementFilter {
    Arc::new(move |tags: &Tags, _: &str, _: bool| {
        !tags.get(&key).is_some_and(|actual| value_listed(&values, actual))
    })
}

pub fn require_regexp(key: String, pattern: Regex) -> ElementFilter {
    Arc::new(move |tags: &Tags, _: &str, _: bool| {
        tags.get(&key).is_some_and(|actual| pattern.is_match(actual))
    })
}

pub fn reject_regexp(key: String, pattern: Regex) -> ElementFilter {
    Arc::new(move |tags: &Tags, _: &str, _: bool| {
        !tags.get(&key).is_some_and(|actual| pattern.is_match(actual))
    })
}

/// Keep relations whose `type` tag is one of `types`.
pub fn relation_types(types: Vec<String>) -> ElementFilter {
    Arc::new(move |tags: &Tags, _: &str, _: bool| {
        tags.get("type")
            .is_some_and(|actual| types.iter().any(|t| t == actual))
    })
}

/// Compile the `filters` section of one table, in require, reject,
/// require_regexp, reject_regexp order.
pub fn table_filters(table: &str, config: &FiltersConfig) -> Result<Vec<ElementFilter>> {
    let mut chain = Vec::new();

    for (key, values) in &config.require {
        chain.push(require(key.clone(), values.clone()));
    }
    for (key, values) in &config.reject {
        chain.push(reject(key.clone(), values.clone()));
    }
    for (key, pattern) in &config.require_regexp {
        let regex = Regex::new(pattern).with_context(|| {
            format!("Mapping: Invalid require_regexp for '{key}' in table '{table}'")
        })?;
        chain.push(require_regexp(key.clone(), regex));
    }
    for (key, pattern) in &config.reject_regexp {
        let regex = Regex::new(pattern).with_context(|| {
            format!("Mapping: Invalid reject_regexp for '{key}' in table '{table}'")
        })?;
        chain.push(reject_regexp(key.clone(), regex));
    }

    Ok(chain)
}

/// Plain filter chains for every configured table.
pub fn element_chains<'a, I>(tables: I) -> Result<FilterChains>
where
    I: IntoIterator<Item = (&'a String, &'a TableConfig)>,
{
    let mut builder = FilterChains::builder();
    for (name, table) in tables {
        let Some(filters) = &table.filters else {
            continue;
        };
        for filter in table_filters(name, filters)? {
            builder.push(name.clone(), filter);
        }
    }
    Ok(builder.build())
}

/// Relation-only chains for the matcher of `kind`.
///
/// Explicit `relation_types` always apply. Polygon tables without them only
/// accept area-like relation types, and only when building the polygon matcher.
pub fn relation_chains<'a, I>(kind: TableKind, tables: I) -> FilterChains
where
    I: IntoIterator<Item = (&'a String, &'a TableConfig)>,
{
    let mut builder = FilterChains::builder();
    for (name, table) in tables {
        if let Some(types) = &table.relation_types {
            builder.push(name.clone(), relation_types(types.clone()));
            continue;
        }
        if table.kind == TableKind::Polygon && kind == TableKind::Polygon {
            let types = POLYGON_RELATION_TYPES.iter().map(|t| t.to_string()).collect();
            builder.push(name.clone(), relation_types(types));
        }
    }
    builder.build()
}
