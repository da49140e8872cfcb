//! Assembles one matcher per geometry class from a mapping configuration.

use crate::config::MappingConfig;
use crate::mapping::classify::{AreaRules, WayPolarity};
use crate::mapping::filters::{FilterChains, element_chains, relation_chains};
use crate::mapping::index::{DestTable, TableKind, TagTableIndex};
use crate::mapping::matcher::{MatcherParts, TagMatcher};
use crate::mapping::row::RowBuilder;
use anyhow::Result;
use std::collections::HashMap;

/// All matchers for one mapping, built once and shared read-only.
#[derive(Debug)]
pub struct Matchers {
    pub point: TagMatcher,
    pub line_string: TagMatcher,
    pub polygon: TagMatcher,
    pub relation: TagMatcher,
    pub relation_member: TagMatcher,
}

impl Matchers {
    pub fn from_config(config: &MappingConfig) -> Result<Self> {
        let matchers = Self {
            point: point_matcher(config)?,
            line_string: line_string_matcher(config)?,
            polygon: polygon_matcher(config)?,
            relation: relation_matcher(config)?,
            relation_member: relation_member_matcher(config)?,
        };
        tracing::info!(
            "Mapping: {} tables (points: {}, linestrings: {}, polygons: {}, relations: {}, relation members: {})",
            config.tables.len(),
            matchers.point.tables().len(),
            matchers.line_string.tables().len(),
            matchers.polygon.tables().len(),
            matchers.relation.tables().len(),
            matchers.relation_member.tables().len()
        );
        Ok(matchers)
    }
}

/// Rule order is the position of each (key, value) pair in the table's mapping.
fn build_index(config: &MappingConfig, kind: TableKind) -> TagTableIndex {
    let mut builder = TagTableIndex::builder();
    for (name, table) in config.tables_of(kind) {
        let dest = DestTable::new(name.clone(), kind);
        let mut order = 0;
        for (key, values) in &table.mapping {
            for value in values {
                builder.insert(key.clone(), value.clone(), dest.clone(), order);
                order += 1;
            }
        }
    }
    builder.build()
}

fn build_tables(config: &MappingConfig, kind: TableKind) -> Result<HashMap<String, RowBuilder>> {
    let mut tables = HashMap::new();
    for (name, table) in config.tables_of(kind) {
        tables.insert(name.clone(), RowBuilder::from_config(name, &table.columns)?);
    }
    Ok(tables)
}

fn area_rules(config: &MappingConfig) -> AreaRules {
    AreaRules::new(
        config.areas.area_tags.iter().cloned(),
        config.areas.linear_tags.iter().cloned(),
    )
}

fn build_matcher(
    config: &MappingConfig,
    kind: TableKind,
    polarity: WayPolarity,
    with_relation_filters: bool,
) -> Result<TagMatcher> {
    let area_rules = match polarity {
        WayPolarity::Off => AreaRules::default(),
        WayPolarity::Lines | WayPolarity::Areas => area_rules(config),
    };
    let relation_filters = if with_relation_filters {
        relation_chains(kind, config.tables_of(kind))
    } else {
        FilterChains::default()
    };

    TagMatcher::new(MatcherParts {
        kind: Some(kind),
        index: build_index(config, kind),
        tables: build_tables(config, kind)?,
        filters: element_chains(config.tables_of(kind))?,
        relation_filters,
        area_rules,
        polarity,
    })
}

pub fn point_matcher(config: &MappingConfig) -> Result<TagMatcher> {
    build_matcher(config, TableKind::Point, WayPolarity::Off, false)
}

pub fn line_string_matcher(config: &MappingConfig) -> Result<TagMatcher> {
    build_matcher(config, TableKind::LineString, WayPolarity::Lines, false)
}

pub fn polygon_matcher(config: &MappingConfig) -> Result<TagMatcher> {
    build_matcher(config, TableKind::Polygon, WayPolarity::Areas, true)
}

pub fn relation_matcher(config: &MappingConfig) -> Result<TagMatcher> {
    build_matcher(config, TableKind::Relation, WayPolarity::Off, true)
}

pub fn relation_member_matcher(config: &MappingConfig) -> Result<TagMatcher> {
    build_matcher(config, TableKind::RelationMember, WayPolarity::Off, true)
}
