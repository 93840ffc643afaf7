mod blob_key;
mod file;
mod file_kind;

pub use blob_key::BlobKeyScheme;
pub use file::{CreateFileRecord, FileRecord};
pub use file_kind::{
    lookup_extension, supported_extensions_list, FileKind, SupportedExtension,
    SUPPORTED_EXTENSIONS,
};
