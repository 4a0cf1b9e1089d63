pub mod builder;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetchers;
pub mod image;
pub mod model;
pub mod pipelines;
pub mod providers;
pub mod server;

pub use builder::RecipeImporterBuilder;
pub use config::{load_config, ImporterConfig};
pub use error::{ErrorKind, ImportError, Provider, Stage};
pub use image::ImageInput;
pub use model::{
    ExtractedRecipe, ImageImportRequest, ImportRequest, NewRecipe, PageMetadata, ScrapedPage,
};
pub use pipelines::url::{normalize_url, RecipeImporter};

/// Import a recipe using configuration from `recipe-import.toml` and the environment.
///
/// # Example
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let recipe = recipe_import::import_from_url("example.com/recipe").await?;
/// println!("{}", recipe.title);
/// # Ok(())
/// # }
/// ```
pub async fn import_from_url(url: &str) -> Result<ExtractedRecipe, ImportError> {
    // Reject blank input before configuration is consulted
    normalize_url(url)?;

    let config = load_config()?;
    RecipeImporter::from_config(&config)?
        .import_from_url(url)
        .await
}

/// Import a recipe from a photo (base64 or `data:` URL) using loaded configuration.
pub async fn import_from_image(image: &str) -> Result<ExtractedRecipe, ImportError> {
    let image = ImageInput::parse(image)?;

    let config = load_config()?;
    RecipeImporter::from_config(&config)?
        .import_image(&image)
        .await
}
