use std::path::Path;

use crate::error::{Error, Result};

/// An image attached to the next prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name sent with the upload.
    pub file_name: String,
    /// MIME type of the image.
    pub mime_type: String,
    /// Raw image bytes.
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Creates an attachment from bytes, inferring the MIME type from the file name.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let file_name = file_name.into();
        let mime_type = image_mime_type(&file_name).ok_or_else(|| {
            Error::validation(
                format!("{file_name} is not a supported image (png, jpg, gif, webp)"),
                Some("attachment".to_string()),
            )
        })?;
        Ok(Self {
            file_name,
            mime_type: mime_type.to_string(),
            bytes,
        })
    }

    /// Reads an image attachment from disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::validation(
                    format!("{} has no file name", path.display()),
                    Some("attachment".to_string()),
                )
            })?
            .to_string();
        let bytes = std::fs::read(path)
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        Self::new(file_name, bytes)
    }
}

fn image_mime_type(file_name: &str) -> Option<&'static str> {
    let extension = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_from_extension() {
        let attachment = Attachment::new("Photo.JPG", vec![1, 2, 3]).unwrap();
        assert_eq!(attachment.mime_type, "image/jpeg");
        assert_eq!(attachment.bytes, vec![1, 2, 3]);
    }

    #[test]
    fn non_image_is_rejected() {
        let err = Attachment::new("notes.txt", Vec::new()).unwrap_err();
        assert!(err.is_validation());
        assert!(Attachment::new("no_extension", Vec::new()).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Attachment::from_path("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
