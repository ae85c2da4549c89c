pub mod auth_user;
pub mod batch;
pub mod document;
pub mod storage_object;

pub use auth_user::{AuthUser, NewUser, PasswordHash, UserPage};
pub use batch::{BatchOperation, MAX_BATCH_OPERATIONS, WriteBatch};
pub use document::Document;
pub use storage_object::{ObjectMetadata, StorageObject};
