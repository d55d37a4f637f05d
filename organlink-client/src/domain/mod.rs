pub mod catalog;
pub mod clock;
pub mod donor;
pub mod error;
pub mod matching;
pub mod request;
pub mod user;
