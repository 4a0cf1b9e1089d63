pub mod image;
pub mod url;
