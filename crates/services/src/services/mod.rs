pub mod auth_copier;
pub mod batch;
pub mod cleanup;
pub mod collection_copier;
pub mod config;
pub mod inspector;
pub mod migration;
pub mod readiness;
pub mod storage_copier;
