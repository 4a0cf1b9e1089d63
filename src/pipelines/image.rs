use super::url::{read_reply, RecipeImporter};
use crate::error::ImportError;
use crate::image::ImageInput;
use crate::model::ExtractedRecipe;
use crate::providers::{IMAGE_EXTRACTION_PROMPT, IMAGE_USER_MESSAGE};
use log::info;

impl RecipeImporter {
    /// Import a recipe from a photo given as base64 or a `data:` URL.
    ///
    /// The scraping provider is not involved. The photo itself becomes the
    /// recipe image unless the model names one.
    pub async fn import_from_image(&self, image: &str) -> Result<ExtractedRecipe, ImportError> {
        let image = ImageInput::parse(image)?;
        self.import_image(&image).await
    }

    /// Import a recipe from an already decoded photo.
    pub async fn import_image(&self, image: &ImageInput) -> Result<ExtractedRecipe, ImportError> {
        info!(
            "Extracting recipe from {} image with {}",
            image.media_type,
            self.provider.provider_name()
        );
        let reply = self
            .complete_within(self.provider.complete_with_image(
                IMAGE_EXTRACTION_PROMPT,
                IMAGE_USER_MESSAGE,
                image,
            ))
            .await?;

        let draft = read_reply(&reply, "uploaded image")?;
        let recipe = draft.finish(String::new(), Some(image.data_url()));
        info!("Recipe extracted from image: {}", recipe.title);
        Ok(recipe)
    }
}
