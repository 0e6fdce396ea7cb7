pub mod database;
pub mod image;
pub mod spreadsheet;

use std::io;
use std::path::{Path, PathBuf};

/// Timestamp used in generated file names, e.g. `20240131_154502`
pub fn file_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Absolute path for a new file in `dir`, creating the directory when needed
pub fn output_path(dir: &Path, file_name: &str) -> io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    Ok(std::fs::canonicalize(dir)?.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_timestamp_shape() {
        let ts = file_timestamp();
        assert_eq!(ts.len(), 15);
        assert_eq!(&ts[8..9], "_");
        assert!(ts.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_output_path_creates_dir() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("nested").join("output");
        let path = output_path(&dir, "a.xlsx").unwrap();
        assert!(dir.is_dir());
        assert!(path.is_absolute());
        assert!(path.ends_with("output/a.xlsx"));
    }
}
