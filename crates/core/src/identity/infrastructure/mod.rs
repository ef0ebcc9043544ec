pub mod json_identity_repository;
