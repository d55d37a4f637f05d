pub mod document_store;
pub mod file_store;
pub mod identity;
pub mod memory_store;
pub mod request_repository;
pub mod user_repository;
