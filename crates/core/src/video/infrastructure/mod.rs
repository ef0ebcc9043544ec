pub mod image_file_loader;
pub mod json_manifest_reader;
pub mod json_manifest_writer;
