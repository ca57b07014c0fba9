//! Media classification by MIME type with extension fallback

use std::path::Path;

/// The four processing paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaClass {
    Document,
    Image,
    Audio,
    Video,
}

impl std::fmt::Display for MediaClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Document => "document",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
        };
        write!(f, "{name}")
    }
}

impl MediaClass {
    /// Classify an object by MIME type first, extension as fallback
    ///
    /// Returns `None` for unknown or disallowed types; the dispatcher turns
    /// that into an unsupported-media failure.
    pub fn detect(mime_type: &str, object_key: &str) -> Option<Self> {
        if let Some(class) = Self::from_mime(mime_type) {
            return Some(class);
        }
        Self::from_extension(object_key)
    }

    fn from_mime(mime_type: &str) -> Option<Self> {
        let mime = mime_type.to_lowercase();
        match mime.as_str() {
            "application/pdf"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            | "text/html"
            | "text/plain"
            | "text/markdown"
            | "text/csv" => return Some(Self::Document),
            _ => {}
        }
        if mime.starts_with("image/") {
            Some(Self::Image)
        } else if mime.starts_with("audio/") {
            Some(Self::Audio)
        } else if mime.starts_with("video/") {
            Some(Self::Video)
        } else {
            None
        }
    }

    fn from_extension(object_key: &str) -> Option<Self> {
        let ext = Path::new(object_key)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())?;
        match ext.as_str() {
            "pdf" | "docx" | "html" | "htm" | "txt" | "md" | "csv" | "log" => Some(Self::Document),
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "bmp" => Some(Self::Image),
            "mp3" | "wav" | "m4a" | "flac" | "ogg" | "aac" => Some(Self::Audio),
            "mp4" | "mov" | "webm" | "mkv" | "avi" => Some(Self::Video),
            _ => None,
        }
    }

    /// MIME type to report for a raster image format, for the AI calls
    pub fn image_mime_for(object_key: &str) -> String {
        let ext = Path::new(object_key)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => "image/png".to_string(),
            "gif" => "image/gif".to_string(),
            "webp" => "image/webp".to_string(),
            "bmp" => "image/bmp".to_string(),
            _ => "image/jpeg".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_takes_priority() {
        assert_eq!(
            MediaClass::detect("video/mp4", "talk.weird"),
            Some(MediaClass::Video)
        );
        assert_eq!(
            MediaClass::detect("application/pdf", "report"),
            Some(MediaClass::Document)
        );
    }

    #[test]
    fn extension_is_the_fallback() {
        assert_eq!(
            MediaClass::detect("application/octet-stream", "clip.mp4"),
            Some(MediaClass::Video)
        );
        assert_eq!(
            MediaClass::detect("application/octet-stream", "voice.wav"),
            Some(MediaClass::Audio)
        );
        assert_eq!(
            MediaClass::detect("application/octet-stream", "photo.jpeg"),
            Some(MediaClass::Image)
        );
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert_eq!(MediaClass::detect("application/octet-stream", "blob.bin"), None);
        assert_eq!(MediaClass::detect("application/zip", "archive.zip"), None);
    }
}
