//! JSON-lines feature records.
//!
//! One feature per line, e.g.
//! `{"type":"way","id":7,"tags":{"highway":"primary"},"refs":[1,2,3]}`.
//! Relation members carrying `tags` count as resolved sub-features.

use crate::element::{Element, Member, MemberType, Node, Relation, Tags, Way};
use anyhow::{Context, Result};
use geo_types::Geometry;
use serde::Deserialize;
use std::io::{BufRead, Lines};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum FeatureRecord {
    Node {
        id: i64,
        #[serde(default)]
        tags: Tags,
        #[serde(default)]
        geometry: Option<geojson::Geometry>,
    },
    Way {
        id: i64,
        #[serde(default)]
        tags: Tags,
        #[serde(default)]
        refs: Vec<i64>,
        #[serde(default)]
        geometry: Option<geojson::Geometry>,
    },
    Relation {
        id: i64,
        #[serde(default)]
        tags: Tags,
        #[serde(default)]
        members: Vec<MemberRecord>,
        #[serde(default)]
        geometry: Option<geojson::Geometry>,
    },
}

#[derive(Debug, Deserialize)]
struct MemberRecord {
    #[serde(rename = "type")]
    member_type: MemberType,
    id: i64,
    #[serde(default)]
    role: String,
    #[serde(default)]
    tags: Option<Tags>,
}

impl From<MemberRecord> for Member {
    fn from(record: MemberRecord) -> Self {
        Member {
            id: record.id,
            member_type: record.member_type,
            role: record.role,
            element: record.tags.map(|tags| Element::new(record.id, tags)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Node(Node),
    Way(Way),
    Relation(Relation),
}

impl Feature {
    pub fn element(&self) -> &Element {
        match self {
            Feature::Node(node) => &node.element,
            Feature::Way(way) => &way.element,
            Feature::Relation(relation) => &relation.element,
        }
    }
}

/// A decoded feature plus its precomputed geometry, if the line carried one.
#[derive(Debug, Clone)]
pub struct InputFeature {
    pub feature: Feature,
    pub geometry: Option<Geometry<f64>>,
}

fn convert_geometry(geometry: Option<geojson::Geometry>) -> Result<Option<Geometry<f64>>> {
    geometry
        .map(|g| Geometry::<f64>::try_from(g).context("Input: Unsupported geometry"))
        .transpose()
}

pub fn parse_feature(line: &str) -> Result<InputFeature> {
    let record: FeatureRecord =
        serde_json::from_str(line).context("Input: Failed to decode feature")?;

    let (feature, geometry) = match record {
        FeatureRecord::Node { id, tags, geometry } => (
            Feature::Node(Node {
                element: Element::new(id, tags),
            }),
            geometry,
        ),
        FeatureRecord::Way {
            id,
            tags,
            refs,
            geometry,
        } => (Feature::Way(Way::new(id, tags, refs)), geometry),
        FeatureRecord::Relation {
            id,
            tags,
            members,
            geometry,
        } => (
            Feature::Relation(Relation {
                element: Element::new(id, tags),
                members: members.into_iter().map(Member::from).collect(),
            }),
            geometry,
        ),
    };

    Ok(InputFeature {
        feature,
        geometry: convert_geometry(geometry)?,
    })
}

/// Groups input lines into numbered batches for parallel processing.
pub struct LineBatches<R> {
    lines: Lines<R>,
    batch_size: usize,
    line_no: u64,
}

impl<R: BufRead> LineBatches<R> {
    pub fn new(reader: R, batch_size: usize) -> Self {
        Self {
            lines: reader.lines(),
            batch_size: batch_size.max(1),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for LineBatches<R> {
    type Item = std::io::Result<Vec<(u64, String)>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.lines.next() {
                Some(Ok(line)) => {
                    self.line_no += 1;
                    batch.push((self.line_no, line));
                }
                Some(Err(err)) => return Some(Err(err)),
                None => break,
            }
        }
        if batch.is_empty() {
            None
        } else {
            Some(Ok(batch))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_keep_line_numbers() {
        let source = "a\nb\nc\n";
        let batches: Vec<_> = LineBatches::new(source.as_bytes(), 2)
            .collect::<std::io::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], vec![(1, "a".to_string()), (2, "b".to_string())]);
        assert_eq!(batches[1], vec![(3, "c".to_string())]);
    }

    #[test]
    fn decodes_closed_way_with_geometry() {
        let line = r#"{"type":"way","id":7,"tags":{"building":"yes"},"refs":[1,2,3,1],
            "geometry":{"type":"LineString","coordinates":[[0,0],[1,0],[1,1],[0,0]]}}"#;
        let input = parse_feature(line).unwrap();
        let Feature::Way(way) = &input.feature else {
            panic!("expected way");
        };
        assert!(way.is_closed());
        assert_eq!(way.element.tag("building"), Some("yes"));
        assert!(matches!(input.geometry, Some(Geometry::LineString(_))));
    }

    #[test]
    fn decodes_relation_members() {
        let line = r#"{"type":"relation","id":9,"tags":{"type":"route"},"members":[
            {"type":"node","id":1,"role":"stop","tags":{"name":"A"}},
            {"type":"way","id":2}
        ]}"#;
        let input = parse_feature(line).unwrap();
        let Feature::Relation(relation) = &input.feature else {
            panic!("expected relation");
        };
        assert_eq!(relation.members.len(), 2);
        assert_eq!(relation.members[0].role, "stop");
        assert_eq!(
            relation.members[0].element.as_ref().and_then(|e| e.tag("name")),
            Some("A")
        );
        assert_eq!(relation.members[1].member_type, MemberType::Way);
        assert!(relation.members[1].element.is_none());
        assert!(input.geometry.is_none());
    }

    #[test]
    fn node_without_tags() {
        let input = parse_feature(r#"{"type":"node","id":3}"#).unwrap();
        assert!(input.feature.element().tags.is_empty());
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(parse_feature(r#"{"type":"area","id":3}"#).is_err());
        assert!(parse_feature("not json").is_err());
    }
}
