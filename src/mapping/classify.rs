//! Line versus area decision for way-like features.

use crate::element::Tags;
use std::collections::HashSet;

/// Which way interpretation a matcher produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WayPolarity {
    /// Points and relations: no line/area disambiguation.
    #[default]
    Off,
    Lines,
    Areas,
}

/// Tag keys that force a closed way to be read as an area or as a line.
#[derive(Debug, Clone, Default)]
pub struct AreaRules {
    area_tags: HashSet<String>,
    linear_tags: HashSet<String>,
}

impl AreaRules {
    pub fn new<A, L>(area_tags: A, linear_tags: L) -> Self
    where
        A: IntoIterator<Item = String>,
        L: IntoIterator<Item = String>,
    {
        Self {
            area_tags: area_tags.into_iter().collect(),
            linear_tags: linear_tags.into_iter().collect(),
        }
    }

    fn has_any(keys: &HashSet<String>, tags: &Tags) -> bool {
        keys.iter().any(|key| tags.contains_key(key))
    }

    /// Returns true when a way with these tags must be dropped by a matcher
    /// of the given polarity.
    ///
    /// Open ways are lines only. Closed ways start as areas unless `area=no`,
    /// then each later rule overrides the previous one: linear tag, then
    /// `area=yes`, then area tag.
    pub fn excludes(&self, polarity: WayPolarity, closed: bool, tags: &Tags) -> bool {
        let match_areas = match polarity {
            WayPolarity::Off => return false,
            WayPolarity::Lines => false,
            WayPolarity::Areas => true,
        };

        if !closed {
            return match_areas;
        }

        let area = tags.get("area").map(String::as_str);
        let mut excluded = if match_areas {
            area == Some("no")
        } else {
            area != Some("no")
        };

        if Self::has_any(&self.linear_tags, tags) {
            excluded = match_areas;
        }
        // Kept as in the established mapping behaviour: this drops area=yes
        // ways from area matchers and keeps them in line matchers.
        if area == Some("yes") {
            excluded = match_areas;
        }
        if Self::has_any(&self.area_tags, tags) {
            excluded = !match_areas;
        }

        excluded
    }
}
