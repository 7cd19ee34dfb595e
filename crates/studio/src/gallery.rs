use serde::{Deserialize, Serialize};

use crate::collab::AssetId;

/// Length of generated array keys.
pub const KEY_LEN: usize = 12;

/// Reference to another document (here: an image asset).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "_type")]
    pub kind: String,
    #[serde(rename = "_ref")]
    pub target: String,
}

/// One entry of a gallery array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryItem {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(rename = "_type")]
    pub kind: String,
    pub asset: Reference,
}

impl GalleryItem {
    pub fn image(key: impl Into<String>, asset: &AssetId) -> Self {
        Self {
            key: key.into(),
            kind: "image".to_string(),
            asset: Reference {
                kind: "reference".to_string(),
                target: asset.0.clone(),
            },
        }
    }
}

/// Random array key, unique for all practical purposes.
pub fn new_key() -> String {
    let mut key = uuid::Uuid::new_v4().simple().to_string();
    key.truncate(KEY_LEN);
    key
}
