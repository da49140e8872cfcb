//! Tagged map features as seen by the matchers.
//!
//! Tags are kept in a sorted map so that every pass over them visits keys in
//! the same order, independent of how the feature was decoded.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Tags = BTreeMap<String, String>;

/// Identity and tags shared by every feature kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub id: i64,
    pub tags: Tags,
}

impl Element {
    pub fn new(id: i64, tags: Tags) -> Self {
        Self { id, tags }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub element: Element,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Way {
    pub element: Element,
    pub refs: Vec<i64>,
}

impl Way {
    pub fn new(id: i64, tags: Tags, refs: Vec<i64>) -> Self {
        Self {
            element: Element::new(id, tags),
            refs,
        }
    }

    /// A way is closed when it has at least three distinct positions and
    /// its first and last node references coincide.
    pub fn is_closed(&self) -> bool {
        self.refs.len() >= 4 && self.refs.first() == self.refs.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberType {
    Node,
    Way,
    Relation,
}

impl MemberType {
    pub fn code(self) -> i64 {
        match self {
            MemberType::Node => 0,
            MemberType::Way => 1,
            MemberType::Relation => 2,
        }
    }
}

/// One relation member. `element` is only set when the referenced feature
/// was resolved by the reader.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: i64,
    pub member_type: MemberType,
    pub role: String,
    pub element: Option<Element>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relation {
    pub element: Element,
    pub members: Vec<Member>,
}

/// Build a tag map from string pairs.
pub fn tags_from<'a, I>(pairs: I) -> Tags
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
