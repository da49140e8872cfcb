//! Tag matching and row construction.
//!
//! A [`TagMatcher`] per geometry class decides which destination tables a
//! feature belongs to. Each resulting [`Match`] carries the table's
//! [`RowBuilder`] so the caller can materialize a row on demand.

mod classify;
mod columns;
mod factory;
mod filters;
mod index;
mod matcher;
mod row;

pub use classify::{AreaRules, WayPolarity};
pub use columns::{ColumnExtractor, ColumnValue, Extract, MemberFn, ValueFn, member_fn, value_fn};
pub use factory::{
    Matchers, line_string_matcher, point_matcher, polygon_matcher, relation_matcher,
    relation_member_matcher,
};
pub use filters::{
    ElementFilter, FilterChains, FilterChainsBuilder, POLYGON_RELATION_TYPES, reject,
    reject_regexp, relation_types, require, require_regexp,
};
pub use index::{ANY, DestTable, IndexBuilder, TableEntry, TableKind, TagTableIndex};
pub use matcher::{Match, MatcherParts, NodeMatcher, RelationMatcher, TagMatcher, WayMatcher};
pub use row::{Row, RowBuilder};
