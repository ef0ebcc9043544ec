pub mod frame_loader;
pub mod manifest_reader;
pub mod manifest_writer;
