//! Image entity - one image attached to a post

use serde::Serialize;

/// Image entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub post_id: i64,
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub size: u64,
}

/// Insert payload for an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub post_id: i64,
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub size: u64,
}

impl NewImage {
    /// Materialize the row once the store has assigned its surrogate key
    pub fn into_image(self, id: i64) -> Image {
        Image {
            id,
            post_id: self.post_id,
            url: self.url,
            width: self.width,
            height: self.height,
            size: self.size,
        }
    }
}
