pub mod download_handlers;
pub mod file_handlers;
pub mod gallery_handlers;
pub mod health_handlers;
