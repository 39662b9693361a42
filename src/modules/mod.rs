pub mod documents;
pub mod media;
