use std::path::{Component, Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;
use crate::memory::types::SourceKind;

/// Upload descriptor as recorded by the file-upload layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Attachment {
    #[schemars(description = "MIME type reported at upload, e.g. 'image/png' or 'application/pdf'")]
    pub content_type: String,
    #[schemars(description = "File name under the uploads directory")]
    pub stored_as: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Original file name (informational)")]
    pub filename: Option<String>,
}

impl Attachment {
    pub fn new(content_type: impl Into<String>, stored_as: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            stored_as: stored_as.into(),
            filename: None,
        }
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    /// How this attachment is ingested, or `None` for unsupported types.
    pub fn source_kind(&self) -> Option<SourceKind> {
        if self.is_image() {
            Some(SourceKind::Image)
        } else if self.content_type == "application/pdf"
            || self.stored_as.to_ascii_lowercase().ends_with(".pdf")
        {
            Some(SourceKind::Pdf)
        } else {
            None
        }
    }
}

/// The directory uploads are stored in.
#[derive(Debug, Clone)]
pub struct UploadsDir {
    root: PathBuf,
}

impl UploadsDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `stored_as` under the root. Absolute paths and any `..` or
    /// root component are rejected.
    pub fn resolve(&self, stored_as: &str) -> Result<PathBuf, MemoryError> {
        let relative = Path::new(stored_as);
        let mut has_name = false;
        for component in relative.components() {
            match component {
                Component::Normal(_) => has_name = true,
                Component::CurDir => {}
                _ => return Err(MemoryError::UnsafePath(stored_as.to_string())),
            }
        }
        if !has_name {
            return Err(MemoryError::UnsafePath(stored_as.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_detection() {
        assert_eq!(
            Attachment::new("image/jpeg", "x.jpg").source_kind(),
            Some(SourceKind::Image)
        );
        assert_eq!(
            Attachment::new("application/pdf", "manual").source_kind(),
            Some(SourceKind::Pdf)
        );
        assert_eq!(
            Attachment::new("application/octet-stream", "Manual.PDF").source_kind(),
            Some(SourceKind::Pdf)
        );
        assert_eq!(Attachment::new("text/plain", "notes.txt").source_kind(), None);
    }

    #[test]
    fn resolve_stays_under_root() {
        let uploads = UploadsDir::new("/srv/uploads");
        assert_eq!(
            uploads.resolve("abc_car.png").unwrap(),
            PathBuf::from("/srv/uploads/abc_car.png")
        );
        assert_eq!(
            uploads.resolve("2025/03/a.pdf").unwrap(),
            PathBuf::from("/srv/uploads/2025/03/a.pdf")
        );
    }

    #[test]
    fn resolve_rejects_escapes() {
        let uploads = UploadsDir::new("/srv/uploads");
        for bad in ["../etc/passwd", "a/../../b", "/etc/passwd", "", "."] {
            assert!(
                matches!(uploads.resolve(bad), Err(MemoryError::UnsafePath(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn descriptor_ignores_unknown_fields() {
        let a: Attachment = serde_json::from_str(
            r#"{"filename":"car.png","stored_as":"1_car.png","content_type":"image/png","size":1234}"#,
        )
        .unwrap();
        assert!(a.is_image());
        assert_eq!(a.filename.as_deref(), Some("car.png"));
    }
}
