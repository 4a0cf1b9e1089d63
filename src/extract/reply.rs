use super::fields;
use crate::model::ExtractedRecipe;
use serde_json::{Map, Value};
use thiserror::Error;

const DEFAULT_NO_RECIPE_MESSAGE: &str = "Could not identify a recipe on this page";

/// Why a model reply could not be read as a recipe
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("reply is empty")]
    Empty,

    #[error("reply is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("reply is not a JSON object")]
    NotAnObject,

    #[error("reply has no recipe title")]
    MissingTitle,
}

/// What the model said about the page
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Recipe(RecipeDraft),
    /// The model reported that no recipe is present
    NoRecipe(String),
}

/// Recipe fields read from the model, before source details are attached
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeDraft {
    pub title: String,
    pub ingredients: String,
    pub instructions: String,
    pub prep_time: Option<u32>,
    pub cook_time: Option<u32>,
    pub servings: Option<u32>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

impl RecipeDraft {
    /// Attach the page URL and, when the model gave none, the scraped image.
    pub fn finish(self, source_url: String, scraped_image: Option<String>) -> ExtractedRecipe {
        ExtractedRecipe {
            title: self.title,
            ingredients: self.ingredients,
            instructions: self.instructions,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            servings: self.servings,
            category: self.category,
            source_url,
            image_url: self.image_url.or(scraped_image),
        }
    }
}

/// Remove one leading ```` ```json ```` / ```` ``` ```` fence and one trailing fence.
pub fn strip_code_fences(text: &str) -> &str {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

/// Parse the raw reply text into JSON after fence cleanup.
pub fn parse_reply(text: &str) -> Result<Value, ParseError> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() {
        return Err(ParseError::Empty);
    }
    serde_json::from_str(cleaned).map_err(|e| ParseError::InvalidJson(e.to_string()))
}

/// Validate parsed JSON against the extraction contract.
pub fn interpret_reply(value: Value) -> Result<ModelReply, ParseError> {
    let Value::Object(object) = value else {
        return Err(ParseError::NotAnObject);
    };

    if let Some(message) = object.get("error").and_then(no_recipe_message) {
        return Ok(ModelReply::NoRecipe(message));
    }

    read_draft(&object).map(ModelReply::Recipe)
}

fn no_recipe_message(error: &Value) -> Option<String> {
    match error {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        _ => Some(DEFAULT_NO_RECIPE_MESSAGE.to_string()),
    }
}

fn read_draft(object: &Map<String, Value>) -> Result<RecipeDraft, ParseError> {
    let title = fields::text(object.get("title")).ok_or(ParseError::MissingTitle)?;

    Ok(RecipeDraft {
        title,
        ingredients: fields::text(object.get("ingredients")).unwrap_or_default(),
        instructions: fields::text(object.get("instructions")).unwrap_or_default(),
        prep_time: fields::minutes(object.get("prep_time")),
        cook_time: fields::minutes(object.get("cook_time")),
        servings: fields::count(object.get("servings")),
        category: fields::text(object.get("category")),
        image_url: fields::text(object.get("image_url")),
    })
}
