//! Category labels and the token format used to show and select them.
//!
//! A category may have one sub-level. The pair is shown as a single token, `Food` when flat or
//! `Food -> Groceries` when it has a subcategory, and the same token comes back from a selection.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Separates the category from the subcategory in a token.
pub const SEPARATOR: &str = " -> ";

/// Encodes a category and subcategory into a token.
///
/// The token is `category` unchanged when `subcategory` is absent, empty or equal to `category`,
/// and `"{category} -> {subcategory}"` otherwise.
pub fn encode(category: &str, subcategory: Option<&str>) -> String {
    match subcategory {
        Some(sub) if !sub.is_empty() && sub != category => format!("{category}{SEPARATOR}{sub}"),
        _ => category.to_string(),
    }
}

/// Decodes a token into `(category, subcategory)`.
///
/// Splits at the first separator. A token without a separator is a flat category, and both
/// outputs equal the token. This never fails: `""` decodes to `("", "")`.
pub fn decode(token: &str) -> (String, String) {
    match token.split_once(SEPARATOR) {
        Some((category, subcategory)) => (category.to_string(), subcategory.to_string()),
        None => (token.to_string(), token.to_string()),
    }
}

/// A category with an optional subcategory. A subcategory equal to the category, or empty, is
/// not a distinct level and is not stored.
#[derive(Default, Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct CategoryLabel {
    category: String,
    subcategory: Option<String>,
}

impl CategoryLabel {
    pub fn new<S1, S2>(category: S1, subcategory: Option<S2>) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        let category = category.into();
        let subcategory = subcategory
            .map(Into::into)
            .filter(|sub: &String| !sub.is_empty() && *sub != category);
        Self {
            category,
            subcategory,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// The subcategory, which for a flat label is the category itself.
    pub fn subcategory(&self) -> &str {
        self.subcategory.as_deref().unwrap_or(&self.category)
    }

    pub fn is_flat(&self) -> bool {
        self.subcategory.is_none()
    }

    /// The display token for this label.
    pub fn token(&self) -> String {
        encode(&self.category, self.subcategory.as_deref())
    }
}

impl Display for CategoryLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.token())
    }
}

impl FromStr for CategoryLabel {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (category, subcategory) = decode(s);
        Ok(Self::new(category, Some(subcategory)))
    }
}

/// The category fields of a transaction as they are stored, either of which may be null.
///
/// This is the unit of optimistic mutation: it is what gets applied to a transaction and what is
/// captured beforehand so that it can be restored exactly, nulls included.
#[derive(Default, Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Categorization {
    pub category: Option<String>,
    pub subcategory: Option<String>,
}

impl Categorization {
    pub fn new(category: impl Into<String>, subcategory: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            subcategory: Some(subcategory.into()),
        }
    }

    /// The fields a selected token resolves to. A flat token stores the category as its own
    /// subcategory.
    pub fn from_token(token: &str) -> Self {
        let (category, subcategory) = decode(token);
        Self::new(category, subcategory)
    }

    /// The display token, or `None` when no category has been assigned.
    pub fn token(&self) -> Option<String> {
        self.category
            .as_deref()
            .map(|category| encode(category, self.subcategory.as_deref()))
    }

    /// The normalized label, or `None` when no category has been assigned.
    pub fn label(&self) -> Option<CategoryLabel> {
        self.category
            .as_ref()
            .map(|category| CategoryLabel::new(category.as_str(), self.subcategory.as_deref()))
    }
}

impl From<&CategoryLabel> for Categorization {
    fn from(label: &CategoryLabel) -> Self {
        Self::new(label.category(), label.subcategory())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_flat() {
        assert_eq!(encode("Food", None), "Food");
        assert_eq!(encode("Food", Some("")), "Food");
        assert_eq!(encode("Food", Some("Food")), "Food");
    }

    #[test]
    fn test_encode_hierarchical() {
        assert_eq!(encode("Food", Some("Groceries")), "Food -> Groceries");
    }

    #[test]
    fn test_decode_hierarchical() {
        let (category, subcategory) = decode("Debt -> Credit Card");
        assert_eq!(category, "Debt");
        assert_eq!(subcategory, "Credit Card");
    }

    #[test]
    fn test_decode_splits_on_first_separator_only() {
        let (category, subcategory) = decode("A -> B -> C");
        assert_eq!(category, "A");
        assert_eq!(subcategory, "B -> C");
    }

    #[test]
    fn test_decode_malformed_and_empty() {
        assert_eq!(decode("Food"), ("Food".to_string(), "Food".to_string()));
        assert_eq!(decode("Food->Groceries").0, "Food->Groceries");
        assert_eq!(decode(""), (String::new(), String::new()));
    }

    #[test]
    fn test_decode_inverts_encode() {
        let pairs = [
            ("Food", Some("Groceries"), ("Food", "Groceries")),
            ("Home", Some("Home Improvement"), ("Home", "Home Improvement")),
            ("Food", Some("Food"), ("Food", "Food")),
            ("Food", Some(""), ("Food", "Food")),
            ("Food", None, ("Food", "Food")),
        ];
        for (category, subcategory, (want_category, want_subcategory)) in pairs {
            let (got_category, got_subcategory) = decode(&encode(category, subcategory));
            assert_eq!(got_category, want_category);
            assert_eq!(got_subcategory, want_subcategory);
        }
    }

    #[test]
    fn test_label_normalizes_flat_subcategory() {
        let label = CategoryLabel::new("Food", Some("Food"));
        assert!(label.is_flat());
        assert_eq!(label.subcategory(), "Food");
        assert_eq!(label.to_string(), "Food");

        let label: CategoryLabel = "Entertainment -> Meals".parse().unwrap();
        assert!(!label.is_flat());
        assert_eq!(label.category(), "Entertainment");
        assert_eq!(label.subcategory(), "Meals");
    }

    #[test]
    fn test_categorization_token() {
        assert_eq!(Categorization::default().token(), None);
        assert_eq!(
            Categorization::new("Food", "Food").token().as_deref(),
            Some("Food")
        );
        assert_eq!(
            Categorization::from_token("Food -> Groceries").token().as_deref(),
            Some("Food -> Groceries")
        );
        let only_category = Categorization {
            category: Some("Gas".into()),
            subcategory: None,
        };
        assert_eq!(only_category.token().as_deref(), Some("Gas"));
    }
}
