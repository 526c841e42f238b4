//! The expense category reference type.

use serde::{Deserialize, Serialize};

/// A user-defined expense category.
///
/// Categories are fetched from the backend before any category-keyed
/// aggregation so that chart labels can resolve names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Categoria {
    pub categoria_id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The default IVA rate applied to records in this category, as a percentage.
    #[serde(default)]
    pub iva: f64,
}
