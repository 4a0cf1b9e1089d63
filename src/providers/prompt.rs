/// The system prompt used for extracting a recipe from page markdown.
///
/// It fixes the output contract (title, ingredients, instructions,
/// prep_time, cook_time, servings, category), asks for bare JSON and
/// defines the `{"error": "..."}` reply for pages without a recipe.
///
/// The prompt is loaded from `prompt.txt` at compile time using the
/// `include_str!` macro, making it easy to edit without dealing with
/// Rust string syntax.
pub const RECIPE_EXTRACTION_PROMPT: &str = include_str!("prompt.txt");

/// System prompt for reading a recipe from a photo, with the same output contract.
pub const IMAGE_EXTRACTION_PROMPT: &str = include_str!("image_prompt.txt");

/// User message sent alongside a recipe photo
pub const IMAGE_USER_MESSAGE: &str =
    "Please extract the recipe information from this image. Return ONLY valid JSON.";

const USER_MESSAGE_LEAD: &str = "Extract the recipe from the following content:\n\n";

/// Return at most `max_chars` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Build the user message carrying the (truncated) page markdown.
pub fn build_user_message(markdown: &str, max_chars: usize) -> String {
    format!("{USER_MESSAGE_LEAD}{}", truncate_chars(markdown, max_chars))
}
