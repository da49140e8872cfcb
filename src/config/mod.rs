use crate::mapping::TableKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// Declarative tag mapping: which tags go to which tables, and how rows look.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct MappingConfig {
    #[serde(default)]
    pub areas: AreasConfig,
    pub tables: IndexMap<String, TableConfig>,
}

impl MappingConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn from_yaml(source: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn tables_of(&self, kind: TableKind) -> impl Iterator<Item = (&String, &TableConfig)> {
        self.tables.iter().filter(move |(_, table)| table.kind == kind)
    }
}

/// Tag keys that decide between line and area for closed ways.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct AreasConfig {
    #[serde(default)]
    pub area_tags: Vec<String>,
    #[serde(default)]
    pub linear_tags: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TableConfig {
    #[serde(rename = "type")]
    pub kind: TableKind,
    /// key -> values; rule priority is declaration order within the table.
    #[serde(default)]
    pub mapping: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
    #[serde(default)]
    pub filters: Option<FiltersConfig>,
    #[serde(default)]
    pub relation_types: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct FiltersConfig {
    #[serde(default)]
    pub require: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub reject: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub require_regexp: IndexMap<String, String>,
    #[serde(default)]
    pub reject_regexp: IndexMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(rename = "type")]
    pub col_type: String,
    #[serde(default)]
    pub from_member: bool,
    /// Ordered values for `enumerate` columns.
    #[serde(default)]
    pub values: Option<Vec<String>>,
    /// CEL source for `expr` columns.
    #[serde(default)]
    pub expr: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RuntimeConfig {
    pub threads: Option<usize>,
    pub batch_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            threads: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}
