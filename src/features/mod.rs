pub mod file_events;
pub mod files;
