//! Backend access for Firebase projects: the data model that a migration
//! moves around, the traits the migration components talk to, and the two
//! implementations of those traits (Firebase REST and in-memory).

pub mod config;
pub mod error;
pub mod firebase;
pub mod memory;
pub mod models;
pub mod store;

pub use config::{Endpoints, PasswordHashConfig, ProjectConfig};
pub use error::{BackendError, BackendResult};
pub use store::{DocumentStore, ObjectStore, Project, UserDirectory};
