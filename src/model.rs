use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of an import request
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub url: String,
}

/// Body of a photo import request
///
/// `image_base64` is a bare base64 payload or a `data:` URL.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ImageImportRequest {
    #[serde(default)]
    pub image_base64: String,
}

/// Page content returned by the scraping provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapedPage {
    pub markdown: String,
    pub metadata: PageMetadata,
}

/// Subset of page metadata the import pipeline uses
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    /// Open-graph image; some providers send a list, the first entry is kept
    #[serde(default, deserialize_with = "first_string")]
    pub og_image: Option<String>,
    #[serde(default, deserialize_with = "first_string")]
    pub title: Option<String>,
    #[serde(default, rename = "sourceURL")]
    pub source_url: Option<String>,
}

/// Normalized recipe produced by a successful import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecipe {
    pub title: String,
    /// One ingredient per line
    pub ingredients: String,
    /// One step per line
    pub instructions: String,
    /// Minutes
    pub prep_time: Option<u32>,
    /// Minutes
    pub cook_time: Option<u32>,
    pub servings: Option<u32>,
    pub category: Option<String>,
    /// Page the recipe came from; empty, and omitted, for photo imports
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_url: String,
    pub image_url: Option<String>,
}

/// Create payload for the recipe store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRecipe {
    pub user_id: String,
    #[serde(flatten)]
    pub recipe: ExtractedRecipe,
    pub is_favorite: bool,
}

impl ExtractedRecipe {
    /// Shape this recipe as the store's create payload for `owner_id`.
    pub fn into_new_recipe(self, owner_id: impl Into<String>) -> NewRecipe {
        NewRecipe {
            user_id: owner_id.into(),
            recipe: self,
            is_favorite: false,
        }
    }
}

fn first_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let found = match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .find(|s| !s.trim().is_empty()),
        _ => None,
    };
    Ok(found
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}
