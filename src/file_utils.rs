/*!
 * File system helpers for job submission.
 */

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Input file extensions accepted for submission
const INPUT_EXTENSIONS: [&str; 2] = ["txt", "json"];

/// File manager for input discovery and reading
pub struct FileManager;

impl FileManager {
    /// Read an input file to a string
    pub fn read_input<P: AsRef<Path>>(path: P) -> Result<String> {
        let path = path.as_ref();
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))
    }

    /// Whether a path looks like a submittable input file
    pub fn is_input_file(path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                INPUT_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false)
    }

    /// Find every input file under a directory, sorted for determinism
    pub fn discover_input_files<P: AsRef<Path>>(dir: P) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.into_path())
            .filter(|path| Self::is_input_file(path))
            .collect();
        files.sort();
        files
    }
}
