pub mod identity_repository;
pub mod identity_store;
