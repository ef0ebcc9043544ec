pub mod atomic_write;
pub mod constants;
pub mod embedding;
pub mod frame;
pub mod setting_id;
