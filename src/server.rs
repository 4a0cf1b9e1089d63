//! HTTP surface for the importer.
//!
//! `POST /scrape-recipe` accepts `{ "url": "..." }` and answers with
//! `{ "success": true, "data": { ... } }` or `{ "success": false, "error": "..." }`
//! using the status code of the error class. `POST /recipes/from-image`
//! accepts `{ "image_base64": "..." }` and answers with the same envelope.

use std::any::Any;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info};
use serde::Serialize;
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, CorsLayer};

use crate::config::ImporterConfig;
use crate::error::{ErrorKind, ImportError, Provider};
use crate::image::ImageInput;
use crate::model::{ExtractedRecipe, ImageImportRequest, ImportRequest};
use crate::pipelines::url::{normalize_url, RecipeImporter};

/// Photo uploads arrive base64 encoded inside JSON
const MAX_IMAGE_BODY_BYTES: usize = 12 * 1024 * 1024;

/// Response envelope shared by every import outcome
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
        }
    }

    pub fn failure(err: &ImportError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.user_message()),
            kind: Some(err.kind()),
        }
    }
}

#[derive(Clone)]
enum Importer {
    Ready(Arc<RecipeImporter>),
    /// Served as 500 on every request so the process still answers health checks
    Missing(Provider),
}

/// Shared state of the HTTP server
#[derive(Clone)]
pub struct AppState {
    importer: Importer,
}

impl AppState {
    pub fn new(importer: RecipeImporter) -> Self {
        Self {
            importer: Importer::Ready(Arc::new(importer)),
        }
    }

    /// Build state from configuration; a missing API key is kept and
    /// reported per request instead of failing startup.
    pub fn from_config(config: &ImporterConfig) -> Result<Self, ImportError> {
        match RecipeImporter::from_config(config) {
            Ok(importer) => Ok(Self::new(importer)),
            Err(ImportError::ProviderNotConfigured(provider)) => Ok(Self {
                importer: Importer::Missing(provider),
            }),
            Err(e) => Err(e),
        }
    }
}

/// Create the router with CORS and panic recovery layers
///
/// Every `OPTIONS` request is answered by the CORS layer with an empty body.
pub fn create_router(state: AppState) -> Router {
    let image_import = post(import_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BODY_BYTES));

    Router::new()
        .route("/health", get(health))
        .route("/scrape-recipe", post(import_recipe))
        .route("/api/recipes/import", post(import_recipe))
        .route("/recipes/from-image", image_import.clone())
        .route("/api/recipes/from-image", image_import)
        .layer(cors_layer())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn import_recipe(
    State(state): State<AppState>,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return error_response(&rejected(rejection)),
    };

    let result = match &state.importer {
        Importer::Ready(importer) => importer.import_from_url(&request.url).await,
        Importer::Missing(provider) => {
            normalize_url(&request.url).and(Err(ImportError::ProviderNotConfigured(*provider)))
        }
    };

    match result {
        Ok(recipe) => success_response(recipe),
        Err(err) => error_response(&err),
    }
}

async fn import_image(
    State(state): State<AppState>,
    payload: Result<Json<ImageImportRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return error_response(&rejected(rejection)),
    };

    let result = match ImageInput::parse(&request.image_base64) {
        Err(err) => Err(err),
        Ok(image) => match &state.importer {
            Importer::Ready(importer) => importer.import_image(&image).await,
            Importer::Missing(provider) => Err(ImportError::ProviderNotConfigured(*provider)),
        },
    };

    match result {
        Ok(recipe) => success_response(recipe),
        Err(err) => error_response(&err),
    }
}

fn rejected(rejection: JsonRejection) -> ImportError {
    info!("Rejected request body: {}", rejection.body_text());
    ImportError::InvalidInput("Request body must be a JSON object".to_string())
}

fn success_response(recipe: ExtractedRecipe) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(recipe))).into_response()
}

fn error_response(err: &ImportError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!("Import failed: {}", err);
    } else {
        info!("Import rejected ({}): {}", status.as_u16(), err);
    }

    let mut response =
        (status, Json(ApiResponse::<ExtractedRecipe>::failure(err))).into_response();
    if let ImportError::RateLimited {
        retry_after_secs: Some(secs),
    } = err
    {
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(*secs));
    }
    response
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Handler panicked: {}", detail);
    error_response(&ImportError::Unexpected(
        "Unexpected error while importing the recipe".to_string(),
    ))
}
