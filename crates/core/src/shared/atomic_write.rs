use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Writes `bytes` to `dest` via a sibling `.part` file and a rename, so a
/// crash mid-write never leaves a truncated `dest`. Creates missing parent
/// directories.
pub fn write_atomic(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = part_path(dest)?;
    let result = write_then_rename(&temp_path, dest, bytes);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_then_rename(temp_path: &Path, dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(temp_path)?;
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_all()?;
    drop(file);
    fs::rename(temp_path, dest)
}

fn part_path(dest: &Path) -> io::Result<PathBuf> {
    let name = dest.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a file path: {}", dest.display()),
        )
    })?;
    let mut part = name.to_os_string();
    part.push(".part");
    Ok(dest.with_file_name(part))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("a").join("b").join("out.json");
        write_atomic(&dest, b"{}").unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"{}");
    }

    #[test]
    fn test_replaces_existing_file() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out.json");
        fs::write(&dest, b"old contents").unwrap();
        write_atomic(&dest, b"new").unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"new");
    }

    #[test]
    fn test_leaves_no_part_file_behind() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out.json");
        write_atomic(&dest, b"data").unwrap();
        assert!(!tmp.path().join("out.json.part").exists());
    }

    #[test]
    fn test_rejects_path_without_file_name() {
        let err = write_atomic(Path::new("/"), b"data").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
