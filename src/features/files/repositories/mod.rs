mod file_repository;

pub use file_repository::{
    DeleteIfUnused, DeleteUnconditionally, FileRepository, MarkUsed, PgFileRepository,
};
