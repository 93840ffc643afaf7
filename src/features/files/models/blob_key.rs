use uuid::Uuid;

/// Derives blob keys from file ids
///
/// The key depends on nothing but the id, so a retried upload overwrites the
/// same object and a collector that only knows the id can still reach the blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobKeyScheme {
    prefix: String,
}

impl BlobKeyScheme {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    pub fn key_for(&self, file_id: Uuid) -> String {
        if self.prefix.is_empty() {
            file_id.to_string()
        } else {
            format!("{}/{}", self.prefix, file_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_prefixed_id() {
        let id = Uuid::parse_str("0190c7a2-8f3e-7cc0-9d5e-1b2c3d4e5f60").unwrap();
        let scheme = BlobKeyScheme::new("uploads/");
        assert_eq!(scheme.key_for(id), "uploads/0190c7a2-8f3e-7cc0-9d5e-1b2c3d4e5f60");
    }

    #[test]
    fn test_key_is_stable_across_calls() {
        let id = Uuid::new_v4();
        let scheme = BlobKeyScheme::new("uploads");
        assert_eq!(scheme.key_for(id), scheme.key_for(id));
    }

    #[test]
    fn test_empty_prefix() {
        let id = Uuid::new_v4();
        assert_eq!(BlobKeyScheme::new("").key_for(id), id.to_string());
    }
}
