//! Column extractors: how each output column computes its value.

use crate::config::ColumnConfig;
use crate::element::{Element, Member, Relation};
use crate::expr::{CelContext, cel_value_to_column, compile_cel, evaluate_cel};
use crate::mapping::matcher::Match;
use anyhow::{Result, bail};
use geo::Area;
use geo_types::Geometry;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub enum ColumnValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Json(serde_json::Value),
}

/// Computes a value from (tag value, feature, geometry, match).
pub type ValueFn = Arc<
    dyn Fn(Option<&str>, &Element, Option<&Geometry<f64>>, &Match<'_>) -> Option<ColumnValue>
        + Send
        + Sync,
>;

/// Computes a value from a relation and one of its members.
pub type MemberFn =
    Arc<dyn Fn(&Relation, &Member, &Match<'_>) -> Option<ColumnValue> + Send + Sync>;

/// The single strategy active for a column.
#[derive(Clone)]
pub enum Extract {
    /// Value from the feature's own tags. In member rows the relation's tags are used.
    Tag(ValueFn),
    /// Like `Tag`, but member rows read the resolved member instead of the relation.
    MemberTag(ValueFn),
    /// Derived from the relation/member pair; null in plain rows.
    Member(MemberFn),
    Null,
}

impl fmt::Debug for Extract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Extract::Tag(_) => "Tag",
            Extract::MemberTag(_) => "MemberTag",
            Extract::Member(_) => "Member",
            Extract::Null => "Null",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug)]
pub struct ColumnExtractor {
    pub name: String,
    pub key: Option<String>,
    extract: Extract,
}

impl ColumnExtractor {
    pub fn new(name: impl Into<String>, key: Option<String>, extract: Extract) -> Self {
        Self {
            name: name.into(),
            key,
            extract,
        }
    }

    pub fn extract(&self) -> &Extract {
        &self.extract
    }

    fn tag<'e>(&self, element: &'e Element) -> Option<&'e str> {
        self.key.as_deref().and_then(|key| element.tag(key))
    }

    pub fn value(
        &self,
        element: &Element,
        geometry: Option<&Geometry<f64>>,
        matched: &Match<'_>,
    ) -> Option<ColumnValue> {
        match &self.extract {
            Extract::Tag(func) | Extract::MemberTag(func) => {
                func(self.tag(element), element, geometry, matched)
            }
            Extract::Member(_) | Extract::Null => None,
        }
    }

    pub fn member_value(
        &self,
        relation: &Relation,
        member: &Member,
        geometry: Option<&Geometry<f64>>,
        matched: &Match<'_>,
    ) -> Option<ColumnValue> {
        match &self.extract {
            Extract::MemberTag(func) => {
                let element = member.element.as_ref()?;
                func(self.tag(element), element, geometry, matched)
            }
            Extract::Tag(func) => func(
                self.tag(&relation.element),
                &relation.element,
                geometry,
                matched,
            ),
            Extract::Member(func) => func(relation, member, matched),
            Extract::Null => None,
        }
    }

    /// Resolve a configured column into its extraction strategy.
    pub fn from_config(table: &str, config: &ColumnConfig) -> Result<Self> {
        let key = config.key.clone();
        let needs_key = matches!(
            config.col_type.as_str(),
            "string" | "bool" | "boolint" | "integer" | "enumerate"
        );
        if needs_key && key.is_none() {
            bail!(
                "Mapping: Column '{}' in table '{}' of type '{}' needs a key",
                config.name,
                table,
                config.col_type
            );
        }

        if let Some(func) = member_fn(&config.col_type) {
            if config.from_member {
                bail!(
                    "Mapping: Column '{}' in table '{}' is a member column and cannot use from_member",
                    config.name,
                    table
                );
            }
            return Ok(Self::new(&config.name, key, Extract::Member(func)));
        }

        let func = match config.col_type.as_str() {
            "enumerate" => {
                let Some(values) = config.values.clone() else {
                    bail!(
                        "Mapping: Enumerate column '{}' in table '{}' needs values",
                        config.name,
                        table
                    );
                };
                enumerate_fn(values)
            }
            "expr" => {
                let Some(source) = config.expr.as_deref() else {
                    bail!(
                        "Mapping: Expression column '{}' in table '{}' needs expr",
                        config.name,
                        table
                    );
                };
                let program = compile_cel(source).map_err(|e| {
                    anyhow::anyhow!(
                        "Mapping: Column '{}' in table '{}': {}",
                        config.name,
                        table,
                        e
                    )
                })?;
                let func: ValueFn = Arc::new(
                    move |_: Option<&str>,
                          element: &Element,
                          _: Option<&Geometry<f64>>,
                          matched: &Match<'_>| {
                        let ctx = CelContext {
                            tags: &element.tags,
                            match_key: &matched.key,
                            match_value: &matched.value,
                        };
                        match evaluate_cel(&program, &ctx) {
                            Ok(v) => cel_value_to_column(&v),
                            Err(e) => {
                                tracing::debug!(
                                    "CEL evaluation of {:?} failed: {}",
                                    program.source(),
                                    e
                                );
                                None
                            }
                        }
                    },
                );
                func
            }
            other => match value_fn(other) {
                Some(func) => func,
                None => bail!(
                    "Mapping: Unknown column type '{}' for column '{}' in table '{}'",
                    other,
                    config.name,
                    table
                ),
            },
        };

        let extract = if config.from_member {
            Extract::MemberTag(func)
        } else {
            Extract::Tag(func)
        };
        Ok(Self::new(&config.name, key, extract))
    }
}

/// Built-in tag-value column types.
pub fn value_fn(name: &str) -> Option<ValueFn> {
    let func: ValueFn = match name {
        "id" | "direct_id" => Arc::new(id_value),
        "string" => Arc::new(string_value),
        "bool" => Arc::new(bool_value),
        "boolint" => Arc::new(boolint_value),
        "integer" => Arc::new(integer_value),
        "mapping_key" => Arc::new(mapping_key_value),
        "mapping_value" => Arc::new(mapping_value_value),
        "hstore_tags" => Arc::new(tags_value),
        "geometry" => Arc::new(geometry_value),
        "area" => Arc::new(area_value),
        _ => return None,
    };
    Some(func)
}

/// Built-in relation member column types.
pub fn member_fn(name: &str) -> Option<MemberFn> {
    let func: MemberFn = match name {
        "member_id" => Arc::new(|_: &Relation, member: &Member, _: &Match<'_>| {
            Some(ColumnValue::Integer(member.id))
        }),
        "member_role" => Arc::new(|_: &Relation, member: &Member, _: &Match<'_>| {
            Some(ColumnValue::String(member.role.clone()))
        }),
        "member_type" => Arc::new(|_: &Relation, member: &Member, _: &Match<'_>| {
            Some(ColumnValue::Integer(member.member_type.code()))
        }),
        "member_index" => Arc::new(member_index_value),
        _ => return None,
    };
    Some(func)
}

fn id_value(
    _: Option<&str>,
    element: &Element,
    _: Option<&Geometry<f64>>,
    _: &Match<'_>,
) -> Option<ColumnValue> {
    Some(ColumnValue::Integer(element.id))
}

/// Empty tag values are treated as missing.
fn string_value(
    tag: Option<&str>,
    _: &Element,
    _: Option<&Geometry<f64>>,
    _: &Match<'_>,
) -> Option<ColumnValue> {
    tag.filter(|v| !v.is_empty()).map(|v| ColumnValue::String(v.to_string()))
}

pub fn parse_bool(tag: Option<&str>) -> bool {
    !matches!(tag.unwrap_or(""), "" | "0" | "false" | "no")
}

fn bool_value(
    tag: Option<&str>,
    _: &Element,
    _: Option<&Geometry<f64>>,
    _: &Match<'_>,
) -> Option<ColumnValue> {
    Some(ColumnValue::Bool(parse_bool(tag)))
}

fn boolint_value(
    tag: Option<&str>,
    _: &Element,
    _: Option<&Geometry<f64>>,
    _: &Match<'_>,
) -> Option<ColumnValue> {
    Some(ColumnValue::Integer(i64::from(parse_bool(tag))))
}

fn integer_value(
    tag: Option<&str>,
    _: &Element,
    _: Option<&Geometry<f64>>,
    _: &Match<'_>,
) -> Option<ColumnValue> {
    tag?.trim().parse::<i64>().ok().map(ColumnValue::Integer)
}

fn mapping_key_value(
    _: Option<&str>,
    _: &Element,
    _: Option<&Geometry<f64>>,
    matched: &Match<'_>,
) -> Option<ColumnValue> {
    Some(ColumnValue::String(matched.key.clone()))
}

fn mapping_value_value(
    _: Option<&str>,
    _: &Element,
    _: Option<&Geometry<f64>>,
    matched: &Match<'_>,
) -> Option<ColumnValue> {
    Some(ColumnValue::String(matched.value.clone()))
}

fn tags_value(
    _: Option<&str>,
    element: &Element,
    _: Option<&Geometry<f64>>,
    _: &Match<'_>,
) -> Option<ColumnValue> {
    serde_json::to_value(&element.tags).ok().map(ColumnValue::Json)
}

fn geometry_value(
    _: Option<&str>,
    _: &Element,
    geometry: Option<&Geometry<f64>>,
    _: &Match<'_>,
) -> Option<ColumnValue> {
    let geometry = geojson::Geometry::from(geometry?);
    serde_json::to_value(&geometry).ok().map(ColumnValue::Json)
}

fn area_value(
    _: Option<&str>,
    _: &Element,
    geometry: Option<&Geometry<f64>>,
    _: &Match<'_>,
) -> Option<ColumnValue> {
    Some(ColumnValue::Float(geometry?.unsigned_area()))
}

fn enumerate_fn(values: Vec<String>) -> ValueFn {
    Arc::new(
        move |tag: Option<&str>, _: &Element, _: Option<&Geometry<f64>>, _: &Match<'_>| {
            let tag = tag?;
            values
                .iter()
                .position(|v| v == tag)
                .map(|i| ColumnValue::Integer(i as i64 + 1))
        },
    )
}

/// Position of the member in the relation. A reference into `relation.members`
/// resolves exactly; any other member resolves to the first entry with the same
/// id, type and role.
fn member_index_value(relation: &Relation, member: &Member, _: &Match<'_>) -> Option<ColumnValue> {
    let members = &relation.members;
    members
        .iter()
        .position(|m| std::ptr::eq(m, member))
        .or_else(|| {
            members.iter().position(|m| {
                m.id == member.id && m.member_type == member.member_type && m.role == member.role
            })
        })
        .map(|i| ColumnValue::Integer(i as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{MemberType, Tags, tags_from};
    use crate::mapping::index::{DestTable, TableKind};
    use crate::mapping::row::RowBuilder;
    use geo_types::{LineString, Polygon};

    fn column(col_type: &str, key: Option<&str>) -> ColumnConfig {
        ColumnConfig {
            name: "col".into(),
            key: key.map(str::to_string),
            col_type: col_type.into(),
            from_member: false,
            values: None,
            expr: None,
        }
    }

    fn value_of(
        config: &ColumnConfig,
        element: &Element,
        geometry: Option<&Geometry<f64>>,
    ) -> Option<ColumnValue> {
        let extractor = ColumnExtractor::from_config("t", config).unwrap();
        let builder = RowBuilder::new(Vec::new());
        let matched = Match::new(
            "amenity",
            "cafe",
            DestTable::new("t", TableKind::Point),
            &builder,
        );
        extractor.value(element, geometry, &matched)
    }

    #[test]
    fn string_is_null_when_missing_or_empty() {
        let element = Element::new(1, tags_from([("name", "Foo"), ("ref", "")]));
        assert_eq!(
            value_of(&column("string", Some("name")), &element, None),
            Some(ColumnValue::String("Foo".into()))
        );
        let empty = column("string", Some("ref"));
        assert_eq!(value_of(&empty, &element, None), None);
        let missing = column("string", Some("brand"));
        assert_eq!(value_of(&missing, &element, None), None);
    }

    #[test]
    fn bool_parsing() {
        assert!(!parse_bool(None));
        assert!(!parse_bool(Some("no")));
        assert!(!parse_bool(Some("0")));
        assert!(!parse_bool(Some("false")));
        assert!(parse_bool(Some("yes")));
        assert!(parse_bool(Some("designated")));

        let element = Element::new(1, tags_from([("oneway", "yes")]));
        assert_eq!(
            value_of(&column("boolint", Some("oneway")), &element, None),
            Some(ColumnValue::Integer(1))
        );
    }

    #[test]
    fn integer_rejects_garbage() {
        let element = Element::new(1, tags_from([("lanes", "2"), ("layer", "x")]));
        assert_eq!(
            value_of(&column("integer", Some("lanes")), &element, None),
            Some(ColumnValue::Integer(2))
        );
        let garbage = column("integer", Some("layer"));
        assert_eq!(value_of(&garbage, &element, None), None);
    }

    #[test]
    fn mapping_key_and_value_come_from_match() {
        let element = Element::new(7, Tags::default());
        assert_eq!(
            value_of(&column("mapping_key", None), &element, None),
            Some(ColumnValue::String("amenity".into()))
        );
        assert_eq!(
            value_of(&column("mapping_value", None), &element, None),
            Some(ColumnValue::String("cafe".into()))
        );
        assert_eq!(
            value_of(&column("id", None), &element, None),
            Some(ColumnValue::Integer(7))
        );
    }

    #[test]
    fn geometry_and_area() {
        let square = Geometry::Polygon(Polygon::new(
            LineString::from(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)]),
            vec![],
        ));
        let element = Element::default();
        assert_eq!(
            value_of(&column("area", None), &element, Some(&square)),
            Some(ColumnValue::Float(4.0))
        );
        let Some(ColumnValue::Json(json)) =
            value_of(&column("geometry", None), &element, Some(&square))
        else {
            panic!("expected geojson");
        };
        assert_eq!(json["type"], "Polygon");
        assert_eq!(value_of(&column("geometry", None), &element, None), None);
    }

    #[test]
    fn enumerate_is_one_based() {
        let mut config = column("enumerate", Some("highway"));
        config.values = Some(vec!["motorway".into(), "primary".into()]);
        let element = Element::new(1, tags_from([("highway", "primary")]));
        assert_eq!(
            value_of(&config, &element, None),
            Some(ColumnValue::Integer(2))
        );
        let element = Element::new(1, tags_from([("highway", "track")]));
        assert_eq!(value_of(&config, &element, None), None);
    }

    #[test]
    fn member_columns_are_null_in_plain_rows() {
        let element = Element::default();
        assert_eq!(value_of(&column("member_role", None), &element, None), None);
    }

    #[test]
    fn member_index_finds_position() {
        let relation = Relation {
            element: Element::default(),
            members: (0..3)
                .map(|i| Member {
                    id: i,
                    member_type: MemberType::Way,
                    role: "outer".into(),
                    element: None,
                })
                .collect(),
        };
        let builder = RowBuilder::new(Vec::new());
        let matched = Match::new(
            "type",
            "route",
            DestTable::new("t", TableKind::RelationMember),
            &builder,
        );
        let extractor = ColumnExtractor::from_config("t", &column("member_index", None)).unwrap();
        assert_eq!(
            extractor.member_value(&relation, &relation.members[2], None, &matched),
            Some(ColumnValue::Integer(2))
        );
    }

    #[test]
    fn member_index_resolves_copied_members() {
        let mut members: Vec<Member> = (0..3)
            .map(|i| Member {
                id: i,
                member_type: MemberType::Way,
                role: "outer".into(),
                element: None,
            })
            .collect();
        members.push(Member {
            id: 1,
            member_type: MemberType::Way,
            role: "inner".into(),
            element: None,
        });
        let relation = Relation {
            element: Element::default(),
            members,
        };
        let builder = RowBuilder::new(Vec::new());
        let matched = Match::new(
            "type",
            "multipolygon",
            DestTable::new("t", TableKind::RelationMember),
            &builder,
        );
        let extractor = ColumnExtractor::from_config("t", &column("member_index", None)).unwrap();

        let copy = relation.members[2].clone();
        assert_eq!(
            extractor.member_value(&relation, &copy, None, &matched),
            Some(ColumnValue::Integer(2))
        );
        let inner = relation.members[3].clone();
        assert_eq!(
            extractor.member_value(&relation, &inner, None, &matched),
            Some(ColumnValue::Integer(3))
        );

        let stranger = Member {
            id: 9,
            member_type: MemberType::Node,
            role: "".into(),
            element: None,
        };
        assert_eq!(
            extractor.member_value(&relation, &stranger, None, &matched),
            None
        );
    }

    #[test]
    fn construction_errors() {
        let fails = |config: &ColumnConfig| ColumnExtractor::from_config("t", config).is_err();
        assert!(fails(&column("nonsense", None)));
        assert!(fails(&column("string", None)));
        assert!(fails(&column("enumerate", Some("highway"))));

        let mut member_from_member = column("member_role", None);
        member_from_member.from_member = true;
        assert!(fails(&member_from_member));

        let mut broken_expr = column("expr", None);
        broken_expr.expr = Some("tags.name ==".into());
        let err = ColumnExtractor::from_config("t", &broken_expr).err().unwrap();
        assert!(err.to_string().contains("col"));
    }

    #[test]
    fn expression_column() {
        let mut config = column("expr", None);
        config.expr = Some("match_key + ':' + tags.name".into());
        let element = Element::new(1, tags_from([("name", "Foo")]));
        assert_eq!(
            value_of(&config, &element, None),
            Some(ColumnValue::String("amenity:Foo".into()))
        );
    }
}
