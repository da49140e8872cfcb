//! Tag key/value to destination table lookup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Wildcard used both as a key (matches every feature) and as a value
/// (matches every value of a key).
pub const ANY: &str = "__any__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Point,
    #[serde(rename = "linestring", alias = "line_string", alias = "line")]
    LineString,
    Polygon,
    Relation,
    RelationMember,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TableKind::Point => "point",
            TableKind::LineString => "linestring",
            TableKind::Polygon => "polygon",
            TableKind::Relation => "relation",
            TableKind::RelationMember => "relation_member",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DestTable {
    pub name: String,
    pub kind: TableKind,
}

impl DestTable {
    pub fn new(name: impl Into<String>, kind: TableKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Binding of one tag rule to a table. Smaller `order` means declared earlier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub table: DestTable,
    pub order: usize,
}

/// Immutable two-level lookup: key -> value -> tables.
#[derive(Debug, Clone, Default)]
pub struct TagTableIndex {
    keys: HashMap<String, HashMap<String, Vec<TableEntry>>>,
}

impl TagTableIndex {
    pub fn builder() -> IndexBuilder {
        IndexBuilder::default()
    }

    pub fn values(&self, key: &str) -> Option<&HashMap<String, Vec<TableEntry>>> {
        self.keys.get(key)
    }

    /// Tables bound to the wildcard key, applied to every feature.
    pub fn unconditional(&self) -> Option<&[TableEntry]> {
        self.keys
            .get(ANY)
            .and_then(|values| values.get(ANY))
            .map(Vec::as_slice)
    }

    /// All destination tables reachable through this index, sorted and deduplicated.
    pub fn tables(&self) -> Vec<&DestTable> {
        let mut tables: Vec<&DestTable> = self
            .keys
            .values()
            .flat_map(|values| values.values())
            .flatten()
            .map(|entry| &entry.table)
            .collect();
        tables.sort();
        tables.dedup();
        tables
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}

/// Collects rules before freezing them into a [`TagTableIndex`].
#[derive(Debug, Default)]
pub struct IndexBuilder {
    keys: HashMap<String, HashMap<String, Vec<TableEntry>>>,
}

impl IndexBuilder {
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        table: DestTable,
        order: usize,
    ) -> &mut Self {
        self.keys
            .entry(key.into())
            .or_default()
            .entry(value.into())
            .or_default()
            .push(TableEntry { table, order });
        self
    }

    pub fn build(self) -> TagTableIndex {
        TagTableIndex { keys: self.keys }
    }
}
