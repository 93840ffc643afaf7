use serde::{Deserialize, Serialize};
use sqlx::Type;
use utoipa::ToSchema;

/// Category of an uploaded file, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "file_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Audio,
    Image,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Audio => "audio",
            FileKind::Image => "image",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared extension the upload path accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedExtension {
    pub extension: &'static str,
    pub kind: FileKind,
    pub content_type: &'static str,
}

/// Supported extension map: (extension, kind, MIME type)
pub const SUPPORTED_EXTENSIONS: &[SupportedExtension] = &[
    SupportedExtension { extension: "jpg", kind: FileKind::Image, content_type: "image/jpeg" },
    SupportedExtension { extension: "jpeg", kind: FileKind::Image, content_type: "image/jpeg" },
    SupportedExtension { extension: "png", kind: FileKind::Image, content_type: "image/png" },
    SupportedExtension { extension: "gif", kind: FileKind::Image, content_type: "image/gif" },
    SupportedExtension { extension: "webp", kind: FileKind::Image, content_type: "image/webp" },
    SupportedExtension { extension: "mp3", kind: FileKind::Audio, content_type: "audio/mpeg" },
    SupportedExtension { extension: "wav", kind: FileKind::Audio, content_type: "audio/wav" },
    SupportedExtension { extension: "ogg", kind: FileKind::Audio, content_type: "audio/ogg" },
    SupportedExtension { extension: "m4a", kind: FileKind::Audio, content_type: "audio/mp4" },
    SupportedExtension { extension: "aac", kind: FileKind::Audio, content_type: "audio/aac" },
    SupportedExtension { extension: "flac", kind: FileKind::Audio, content_type: "audio/flac" },
];

/// Look up a normalized (lowercase, dotless) extension
pub fn lookup_extension(extension: &str) -> Option<&'static SupportedExtension> {
    SUPPORTED_EXTENSIONS
        .iter()
        .find(|supported| supported.extension == extension)
}

/// Comma-separated list for validation messages
pub fn supported_extensions_list() -> String {
    SUPPORTED_EXTENSIONS
        .iter()
        .map(|s| s.extension)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_extensions() {
        let png = lookup_extension("png").unwrap();
        assert_eq!(png.kind, FileKind::Image);
        assert_eq!(png.content_type, "image/png");

        let mp3 = lookup_extension("mp3").unwrap();
        assert_eq!(mp3.kind, FileKind::Audio);
        assert_eq!(mp3.content_type, "audio/mpeg");
    }

    #[test]
    fn test_lookup_rejects_unsupported() {
        assert!(lookup_extension("exe").is_none());
        assert!(lookup_extension("pdf").is_none());
        // Lookup expects an already normalized extension
        assert!(lookup_extension("PNG").is_none());
    }

    #[test]
    fn test_every_extension_is_unique() {
        for (i, a) in SUPPORTED_EXTENSIONS.iter().enumerate() {
            for b in &SUPPORTED_EXTENSIONS[i + 1..] {
                assert_ne!(a.extension, b.extension);
            }
        }
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&FileKind::Audio).unwrap(), "\"audio\"");
        assert_eq!(FileKind::Image.to_string(), "image");
    }
}
