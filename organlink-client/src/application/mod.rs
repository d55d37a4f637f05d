pub mod auth_service;
pub mod donor_directory;
pub mod hospital_portal;
pub mod live_collection;
pub mod payload;
pub mod request_board;
pub mod validation;
