use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::readers::reader_from_filetype;

pub fn is_supported_file_type(path: &Path) -> bool {
    reader_from_filetype(path).is_some()
}

fn is_pattern(entry: &str) -> bool {
    entry.contains(['*', '?', '['])
}

/// Expands raster entries into file paths, keeping entry order.
///
/// Directories are walked recursively (sorted by name) for supported
/// files, glob patterns are matched, and anything else is taken as a
/// plain path.
pub fn expand_raster_paths(entries: &[String]) -> Result<Vec<PathBuf>, glob::PatternError> {
    let mut paths = Vec::new();
    for entry in entries {
        let path = Path::new(entry);
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_supported_file_type(e.path()))
                .map(|e| e.into_path())
                .collect();
            paths.append(&mut found);
        } else if is_pattern(entry) {
            for matched in glob::glob(entry)?.filter_map(Result::ok) {
                if is_supported_file_type(&matched) {
                    paths.push(matched);
                }
            }
        } else {
            paths.push(path.to_path_buf());
        }
    }
    Ok(paths)
}
