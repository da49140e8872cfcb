//! Row schemas and row construction.

use crate::config::ColumnConfig;
use crate::element::{Element, Member, Relation};
use crate::mapping::columns::{ColumnExtractor, ColumnValue};
use crate::mapping::matcher::Match;
use anyhow::Result;
use geo_types::Geometry;

/// One output row, positionally aligned with the table's columns. `None` is null.
pub type Row = Vec<Option<ColumnValue>>;

/// Fixed column layout of one destination table.
#[derive(Debug, Clone)]
pub struct RowBuilder {
    columns: Vec<ColumnExtractor>,
}

impl RowBuilder {
    pub fn new(columns: Vec<ColumnExtractor>) -> Self {
        Self { columns }
    }

    pub fn from_config(table: &str, columns: &[ColumnConfig]) -> Result<Self> {
        let columns = columns
            .iter()
            .map(|column| ColumnExtractor::from_config(table, column))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(columns))
    }

    pub fn columns(&self) -> &[ColumnExtractor] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn make_row(
        &self,
        element: &Element,
        geometry: Option<&Geometry<f64>>,
        matched: &Match<'_>,
    ) -> Row {
        self.columns
            .iter()
            .map(|column| column.value(element, geometry, matched))
            .collect()
    }

    pub fn make_member_row(
        &self,
        relation: &Relation,
        member: &Member,
        geometry: Option<&Geometry<f64>>,
        matched: &Match<'_>,
    ) -> Row {
        self.columns
            .iter()
            .map(|column| column.member_value(relation, member, geometry, matched))
            .collect()
    }
}
