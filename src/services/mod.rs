pub mod archive;
pub mod buffer;
pub mod disk_store;
pub mod download_service;
pub mod gallery_service;
pub mod object_store;
pub mod r2_store;
