//! Category classification and display-name selection from upstream tags.
//!
//! Both functions are pure: identical tag maps always produce identical
//! output.

use std::fmt;

use crate::place::Tags;

/// Placeholder used when a place carries no usable name.
pub const UNNAMED: &str = "Neimenovano";

/// Name keys consulted in priority order.
const NAME_KEYS: [&str; 3] = ["name:sl", "name:en", "name"];

/// Closed set of place categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Category {
    /// Wayside or summit cross.
    Cross,
    /// Chapel building.
    Chapel,
    /// Church or cathedral building.
    Church,
    /// Monastery or abbey complex.
    Monastery,
    /// Any other place of worship.
    PlaceOfWorship,
}

impl Category {
    /// Machine-readable identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cross => "cross",
            Self::Chapel => "chapel",
            Self::Church => "church",
            Self::Monastery => "monastery",
            Self::PlaceOfWorship => "place_of_worship",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cross => "Cross",
            Self::Chapel => "Chapel",
            Self::Church => "Church",
            Self::Monastery => "Monastery",
            Self::PlaceOfWorship => "Place of worship",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered classification rules. The first rule with a matching tag wins.
const RULES: &[(Category, &[(&str, &str)])] = &[
    (
        Category::Cross,
        &[
            ("man_made", "cross"),
            ("historic", "wayside_cross"),
            ("summit:cross", "yes"),
        ],
    ),
    (
        Category::Chapel,
        &[("building", "chapel"), ("place_of_worship", "chapel")],
    ),
    (
        Category::Church,
        &[
            ("building", "church"),
            ("building", "cathedral"),
            ("place_of_worship", "church"),
        ],
    ),
    (
        Category::Monastery,
        &[
            ("building", "monastery"),
            ("amenity", "monastery"),
            ("historic", "monastery"),
        ],
    ),
];

/// Classify a tag map into a [`Category`].
///
/// Cross markers win over chapel and church buildings, which in turn win
/// over monastery tags. Anything else falls back to
/// [`Category::PlaceOfWorship`] rather than being dropped.
///
/// # Examples
///
/// ```
/// use lumigram_core::{Category, Tags, classify};
///
/// let tags = Tags::from([
///     ("man_made".to_owned(), "cross".to_owned()),
///     ("building".to_owned(), "church".to_owned()),
/// ]);
/// assert_eq!(classify(&tags), Category::Cross);
/// ```
#[must_use]
pub fn classify(tags: &Tags) -> Category {
    RULES
        .iter()
        .find(|(_, matchers)| {
            matchers
                .iter()
                .any(|(key, value)| tags.get(*key).is_some_and(|v| v == value))
        })
        .map_or(Category::PlaceOfWorship, |(category, _)| *category)
}

/// Pick a display name, preferring Slovenian, then English, then the
/// default name. Empty values are skipped.
#[must_use]
pub fn pick_name(tags: &Tags) -> &str {
    NAME_KEYS
        .iter()
        .find_map(|key| tags.get(*key).filter(|name| !name.trim().is_empty()))
        .map_or(UNNAMED, String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[rstest]
    #[case(&[("man_made", "cross"), ("building", "chapel")], Category::Cross)]
    #[case(&[("historic", "wayside_cross")], Category::Cross)]
    #[case(&[("building", "chapel"), ("historic", "monastery")], Category::Chapel)]
    #[case(&[("building", "cathedral")], Category::Church)]
    #[case(&[("building", "church"), ("amenity", "monastery")], Category::Church)]
    #[case(&[("amenity", "monastery")], Category::Monastery)]
    #[case(&[("amenity", "place_of_worship"), ("religion", "christian")], Category::PlaceOfWorship)]
    #[case(&[], Category::PlaceOfWorship)]
    fn applies_rules_in_priority_order(#[case] pairs: &[(&str, &str)], #[case] expected: Category) {
        assert_eq!(classify(&tags(pairs)), expected);
    }

    #[rstest]
    #[case(&[("name", "Cerkev"), ("name:en", "Church"), ("name:sl", "Cerkev sv. Petra")], "Cerkev sv. Petra")]
    #[case(&[("name", "Cerkev"), ("name:en", "Church")], "Church")]
    #[case(&[("name", "Cerkev")], "Cerkev")]
    #[case(&[("name:sl", ""), ("name", "Kapela")], "Kapela")]
    #[case(&[], UNNAMED)]
    fn picks_names_by_language(#[case] pairs: &[(&str, &str)], #[case] expected: &str) {
        assert_eq!(pick_name(&tags(pairs)), expected);
    }

    proptest! {
        #[test]
        fn cross_marker_always_wins(building in "(chapel|church|cathedral|monastery|yes)") {
            let mut map = tags(&[("man_made", "cross")]);
            map.insert("building".to_owned(), building);
            prop_assert_eq!(classify(&map), Category::Cross);
        }

        #[test]
        fn classification_is_deterministic(
            map in proptest::collection::btree_map("[a-z_:]{1,12}", "[a-z_]{1,12}", 0..8)
        ) {
            prop_assert_eq!(classify(&map), classify(&map.clone()));
        }
    }
}
