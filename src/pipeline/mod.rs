use anyhow::{Context, Result};
use geo_types::Geometry;
use std::sync::Arc;

use crate::element::Element;
use crate::input::{Feature, InputFeature, parse_feature};
use crate::mapping::{Match, Matchers, NodeMatcher, RelationMatcher, WayMatcher};
use crate::sinks::TableRow;

pub trait BatchProcessor: Send + Sync {
    fn process_batch(&self, batch: Vec<(u64, String)>) -> Result<Vec<TableRow>>;
}

/// Decodes feature lines and classifies them with a shared set of matchers.
pub struct MatchingProcessor {
    pub matchers: Arc<Matchers>,
}

impl BatchProcessor for MatchingProcessor {
    fn process_batch(&self, batch: Vec<(u64, String)>) -> Result<Vec<TableRow>> {
        let mut rows = Vec::new();
        for (line_no, line) in batch {
            if line.trim().is_empty() {
                continue;
            }
            let input =
                parse_feature(&line).with_context(|| format!("Input: Line {}", line_no))?;
            rows.extend(classify_feature(&self.matchers, &input));
        }
        Ok(rows)
    }
}

fn push_rows(
    rows: &mut Vec<TableRow>,
    matches: Vec<Match<'_>>,
    element: &Element,
    geometry: Option<&Geometry<f64>>,
) {
    for matched in matches {
        let row = matched.row(element, geometry);
        rows.push(TableRow {
            table: matched.table.name,
            key: matched.key,
            value: matched.value,
            id: element.id,
            member: None,
            row,
        });
    }
}

/// Match a feature against every matcher of its kind and build all rows.
///
/// Nodes go to point tables, ways to line and polygon tables, relations to
/// polygon, relation and relation member tables. Member tables get one row
/// per relation member.
pub fn classify_feature(matchers: &Matchers, input: &InputFeature) -> Vec<TableRow> {
    let geometry = input.geometry.as_ref();
    let mut rows = Vec::new();

    match &input.feature {
        Feature::Node(node) => {
            push_rows(
                &mut rows,
                matchers.point.match_node(node),
                &node.element,
                geometry,
            );
        }
        Feature::Way(way) => {
            push_rows(
                &mut rows,
                matchers.line_string.match_way(way),
                &way.element,
                geometry,
            );
            push_rows(
                &mut rows,
                matchers.polygon.match_way(way),
                &way.element,
                geometry,
            );
        }
        Feature::Relation(relation) => {
            push_rows(
                &mut rows,
                matchers.polygon.match_relation(relation),
                &relation.element,
                geometry,
            );
            push_rows(
                &mut rows,
                matchers.relation.match_relation(relation),
                &relation.element,
                geometry,
            );
            for matched in matchers.relation_member.match_relation(relation) {
                for member in &relation.members {
                    rows.push(TableRow {
                        table: matched.table.name.clone(),
                        key: matched.key.clone(),
                        value: matched.value.clone(),
                        id: relation.element.id,
                        member: Some(member.id),
                        row: matched.member_row(relation, member, geometry),
                    });
                }
            }
        }
    }

    rows
}
