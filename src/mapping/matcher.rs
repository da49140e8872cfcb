//! Tag matching: which tables a feature belongs to, and through which tag.

use crate::element::{Element, Member, Node, Relation, Tags, Way};
use crate::mapping::classify::{AreaRules, WayPolarity};
use crate::mapping::filters::FilterChains;
use crate::mapping::index::{ANY, DestTable, TableEntry, TableKind, TagTableIndex};
use crate::mapping::row::{Row, RowBuilder};
use anyhow::{Result, bail};
use geo_types::Geometry;
use std::collections::{BTreeMap, HashMap};

/// A resolved table hit for one feature.
#[derive(Debug, Clone)]
pub struct Match<'a> {
    pub key: String,
    pub value: String,
    pub table: DestTable,
    builder: &'a RowBuilder,
}

impl<'a> Match<'a> {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        table: DestTable,
        builder: &'a RowBuilder,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            table,
            builder,
        }
    }

    pub fn row(&self, element: &Element, geometry: Option<&Geometry<f64>>) -> Row {
        self.builder.make_row(element, geometry, self)
    }

    pub fn member_row(
        &self,
        relation: &Relation,
        member: &Member,
        geometry: Option<&Geometry<f64>>,
    ) -> Row {
        self.builder.make_member_row(relation, member, geometry, self)
    }
}

pub trait NodeMatcher {
    fn match_node<'a>(&'a self, node: &Node) -> Vec<Match<'a>>;
}

pub trait WayMatcher {
    fn match_way<'a>(&'a self, way: &Way) -> Vec<Match<'a>>;
}

pub trait RelationMatcher {
    fn match_relation<'a>(&'a self, relation: &Relation) -> Vec<Match<'a>>;
}

/// Resolved inputs for one matcher.
#[derive(Debug, Default)]
pub struct MatcherParts {
    pub kind: Option<TableKind>,
    pub index: TagTableIndex,
    pub tables: HashMap<String, RowBuilder>,
    pub filters: FilterChains,
    pub relation_filters: FilterChains,
    pub area_rules: AreaRules,
    pub polarity: WayPolarity,
}

/// Matcher for one geometry class. Immutable once built.
#[derive(Debug)]
pub struct TagMatcher {
    index: TagTableIndex,
    tables: HashMap<String, RowBuilder>,
    filters: FilterChains,
    relation_filters: FilterChains,
    area_rules: AreaRules,
    polarity: WayPolarity,
}

struct Candidate<'t> {
    key: &'t str,
    value: &'t str,
    order: usize,
}

impl TagMatcher {
    /// Fails when a table reachable through the index has no row schema.
    pub fn new(parts: MatcherParts) -> Result<Self> {
        let label = parts
            .kind
            .map(|k| k.to_string())
            .unwrap_or_else(|| "custom".to_string());

        for table in parts.index.tables() {
            if !parts.tables.contains_key(&table.name) {
                bail!(
                    "Mapping: No columns resolved for table '{}' in {} matcher",
                    table.name,
                    label
                );
            }
        }

        tracing::debug!(
            "Matcher {}: {} tables, {} keys, {} filters, {} relation filters, {:?}",
            label,
            parts.index.tables().len(),
            parts.index.key_count(),
            parts.filters.filter_count(),
            parts.relation_filters.filter_count(),
            parts.polarity
        );

        Ok(Self {
            index: parts.index,
            tables: parts.tables,
            filters: parts.filters,
            relation_filters: parts.relation_filters,
            area_rules: parts.area_rules,
            polarity: parts.polarity,
        })
    }

    pub fn tables(&self) -> Vec<&DestTable> {
        self.index.tables()
    }

    /// Match a tag set. Way disambiguation runs for non-relations only;
    /// relation filters run for relations only.
    ///
    /// Tags are visited in key order. Among candidates for the same table the
    /// smaller order wins, and on equal order the later candidate wins.
    /// Results are ordered by table.
    pub fn match_tags<'a>(&'a self, tags: &Tags, closed: bool, relation: bool) -> Vec<Match<'a>> {
        let mut tables = BTreeMap::new();

        if let Some(entries) = self.index.unconditional() {
            add_candidates(&mut tables, ANY, ANY, entries);
        }

        for (key, value) in tags {
            let Some(values) = self.index.values(key) else {
                continue;
            };
            if let Some(entries) = values.get(ANY) {
                add_candidates(&mut tables, key, value, entries);
            }
            if let Some(entries) = values.get(value) {
                add_candidates(&mut tables, key, value, entries);
            }
        }

        if !relation && self.area_rules.excludes(self.polarity, closed, tags) {
            return Vec::new();
        }

        let mut matches = Vec::with_capacity(tables.len());
        for (table, candidate) in tables {
            if !self
                .filters
                .accepts(&table.name, tags, candidate.key, closed)
            {
                continue;
            }
            if relation
                && !self
                    .relation_filters
                    .accepts(&table.name, tags, candidate.key, closed)
            {
                continue;
            }
            let Some(builder) = self.tables.get(&table.name) else {
                continue;
            };
            matches.push(Match::new(
                candidate.key,
                candidate.value,
                table.clone(),
                builder,
            ));
        }
        matches
    }
}

fn add_candidates<'a, 't>(
    tables: &mut BTreeMap<&'a DestTable, Candidate<'t>>,
    key: &'t str,
    value: &'t str,
    entries: &'a [TableEntry],
) {
    for entry in entries {
        if let Some(other) = tables.get(&entry.table)
            && other.order < entry.order
        {
            continue;
        }
        tables.insert(
            &entry.table,
            Candidate {
                key,
                value,
                order: entry.order,
            },
        );
    }
}

impl NodeMatcher for TagMatcher {
    fn match_node<'a>(&'a self, node: &Node) -> Vec<Match<'a>> {
        self.match_tags(&node.element.tags, false, false)
    }
}

impl WayMatcher for TagMatcher {
    fn match_way<'a>(&'a self, way: &Way) -> Vec<Match<'a>> {
        self.match_tags(&way.element.tags, way.is_closed(), false)
    }
}

impl RelationMatcher for TagMatcher {
    fn match_relation<'a>(&'a self, relation: &Relation) -> Vec<Match<'a>> {
        self.match_tags(&relation.element.tags, true, true)
    }
}
