use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Fields collected by the upload form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub title: String,
    pub tags: Vec<String>,
    pub image: ImageFile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListImagesQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Splits a comma-separated tag input. Order and duplicates are preserved.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
