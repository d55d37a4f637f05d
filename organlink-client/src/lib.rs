//! Client-side logic of OrganLink: donor and request records, live
//! collections mirrored from the document store, the filter and match engine,
//! and the account and request mutations.

pub mod application;
pub mod data;
pub mod domain;
pub mod infrastructure;

pub use application::auth_service::AuthService;
pub use application::donor_directory::{DonorDirectory, DonorService};
pub use application::hospital_portal::HospitalDashboard;
pub use application::request_board::{RequestBoard, RequestService};
pub use data::document_store::{DocumentStore, StoreError};
pub use data::file_store::JsonFileStore;
pub use data::identity::{Identity, IdentityError, IdentityProvider, LocalIdentityProvider};
pub use data::memory_store::InMemoryDocumentStore;
pub use data::request_repository::StoreRequestRepository;
pub use data::user_repository::StoreUserRepository;
pub use domain::donor::{Availability, DonorProfile};
pub use domain::error::{DomainError, ValidationErrors};
pub use domain::request::{OrganRequest, RequestStatus, Urgency};
pub use domain::user::UserAccount;
