//! Upload categories and file validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tabula_core::format::{capitalize, to_bytes};

use crate::{ApiError, ApiResult};

/// Size limit shared by every category.
pub const MAX_UPLOAD_MB: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    #[default]
    All,
    Image,
    Document,
}

/// A file handed in by the host: name, declared content type and size in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    pub name: String,
    pub content_type: String,
    pub size: u64,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), content_type: content_type.into(), size: bytes.len() as u64, bytes }
    }
}

impl FileCategory {
    /// Accepted content types; `*` accepts anything.
    pub fn content_types(&self) -> &'static [&'static str] {
        match self {
            FileCategory::All => &["*"],
            FileCategory::Image => &["image/png", "image/jpg", "image/jpeg", "image/svg+xml", "image/webp"],
            FileCategory::Document => &[
                "application/pdf",
                "application/msword",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "application/vnd.ms-excel",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                "application/vnd.ms-powerpoint",
                "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            ],
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            FileCategory::All => &[],
            FileCategory::Image => &[".png", ".jpg", ".jpeg", ".svg", ".webp"],
            FileCategory::Document => &[".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx"],
        }
    }

    pub fn max_bytes(&self) -> u64 { to_bytes(MAX_UPLOAD_MB) }

    pub fn accepts(&self, content_type: &str) -> bool {
        let types = self.content_types();
        types.contains(&"*") || types.contains(&content_type)
    }

    /// Noun used in messages: `file` for the catch-all category.
    fn noun(&self) -> &'static str {
        match self {
            FileCategory::All => "file",
            FileCategory::Image => "image",
            FileCategory::Document => "document",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileCategory::All => "all",
            FileCategory::Image => "image",
            FileCategory::Document => "document",
        })
    }
}

impl FromStr for FileCategory {
    type Err = ApiError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(FileCategory::All),
            "image" => Ok(FileCategory::Image),
            "document" => Ok(FileCategory::Document),
            other => Err(ApiError::Validation(format!("unknown file category: {other}"))),
        }
    }
}

/// Reject empty sets, content types outside the category and oversized files.
pub fn validate_files(category: FileCategory, files: &[MediaFile]) -> ApiResult<()> {
    let noun = category.noun();
    if files.is_empty() {
        return Err(ApiError::Validation(format!("At least one {noun} is required.")));
    }
    if !files.iter().all(|f| category.accepts(&f.content_type)) {
        return Err(ApiError::Validation(format!("Invalid {noun} type.")));
    }
    if !files.iter().all(|f| f.size <= category.max_bytes()) {
        return Err(ApiError::Validation(format!(
            "{} size should not exceed {MAX_UPLOAD_MB} MB.",
            capitalize(noun)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(ct: &str, size: u64) -> MediaFile {
        MediaFile { name: "f".into(), content_type: ct.into(), size, bytes: Vec::new() }
    }

    #[test]
    fn empty_set_is_rejected() {
        assert_eq!(
            validate_files(FileCategory::Image, &[]).unwrap_err(),
            ApiError::Validation("At least one image is required.".into())
        );
        assert_eq!(
            validate_files(FileCategory::All, &[]).unwrap_err(),
            ApiError::Validation("At least one file is required.".into())
        );
    }

    #[test]
    fn content_type_must_match_category() {
        assert!(validate_files(FileCategory::Image, &[file("image/png", 10)]).is_ok());
        assert_eq!(
            validate_files(FileCategory::Image, &[file("image/png", 10), file("application/pdf", 10)]).unwrap_err(),
            ApiError::Validation("Invalid image type.".into())
        );
        assert!(validate_files(FileCategory::All, &[file("application/zip", 10)]).is_ok());
        assert!(validate_files(FileCategory::Document, &[file("application/pdf", 10)]).is_ok());
    }

    #[test]
    fn size_limit_is_two_megabytes() {
        let limit = 2 * 1024 * 1024;
        assert!(validate_files(FileCategory::Image, &[file("image/webp", limit)]).is_ok());
        assert_eq!(
            validate_files(FileCategory::Image, &[file("image/webp", limit + 1)]).unwrap_err(),
            ApiError::Validation("Image size should not exceed 2 MB.".into())
        );
    }

    #[test]
    fn categories_parse() {
        assert_eq!("Image".parse::<FileCategory>().unwrap(), FileCategory::Image);
        assert!("video".parse::<FileCategory>().is_err());
        assert_eq!(FileCategory::Document.extensions().len(), 7);
    }
}
