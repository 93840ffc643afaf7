use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for declared file extensions, after normalization
    /// Must be 1-10 lowercase alphanumeric characters, no dot
    /// - Valid: "png", "mp3", "m4a", "jpeg"
    /// - Invalid: ".png", "tar.gz", "PNG", "", "p ng"
    pub static ref EXTENSION_REGEX: Regex = Regex::new(r"^[a-z0-9]{1,10}$").unwrap();
}

/// Normalize a declared extension: trim whitespace, drop one leading dot, lowercase
pub fn normalize_extension(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('.')
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}

/// Extension of a client-supplied file name, if it has one
pub fn extension_from_filename(filename: &str) -> Option<&str> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_regex_valid() {
        assert!(EXTENSION_REGEX.is_match("png"));
        assert!(EXTENSION_REGEX.is_match("mp3"));
        assert!(EXTENSION_REGEX.is_match("m4a"));
        assert!(EXTENSION_REGEX.is_match("jpeg"));
    }

    #[test]
    fn test_extension_regex_invalid() {
        assert!(!EXTENSION_REGEX.is_match(".png")); // leading dot
        assert!(!EXTENSION_REGEX.is_match("tar.gz")); // inner dot
        assert!(!EXTENSION_REGEX.is_match("PNG")); // uppercase
        assert!(!EXTENSION_REGEX.is_match("")); // empty
        assert!(!EXTENSION_REGEX.is_match("p ng")); // space
        assert!(!EXTENSION_REGEX.is_match("abcdefghijk")); // too long
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension(".PNG"), "png");
        assert_eq!(normalize_extension("  Mp3 "), "mp3");
        assert_eq!(normalize_extension("..wav"), ".wav");
    }

    #[test]
    fn test_extension_from_filename() {
        assert_eq!(extension_from_filename("cover.jpg"), Some("jpg"));
        assert_eq!(extension_from_filename("track.final.FLAC"), Some("FLAC"));
        assert_eq!(extension_from_filename(".hidden"), None);
        assert_eq!(extension_from_filename("noext"), None);
        assert_eq!(extension_from_filename("trailing."), None);
    }
}
