use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(deserialize_with = "super::de::id")]
    pub id: String,
    pub title: String,
}

/// Resolve a category reference (id or title) to its display title.
pub fn category_title<'a>(categories: &'a [Category], reference: &'a str) -> &'a str {
    categories
        .iter()
        .find(|c| c.id == reference || c.title.eq_ignore_ascii_case(reference))
        .map(|c| c.title.as_str())
        .unwrap_or(reference)
}
