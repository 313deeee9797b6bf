use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Writes `text` beside `path` and renames it into place, so readers see
/// either the previous file or the complete new one.
pub(crate) fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let staging = staging_path(path);
    fs::write(&staging, text)?;
    // `rename` replaces an existing destination on every supported platform.
    fs::rename(&staging, path).inspect_err(|_| {
        let _ = fs::remove_file(&staging);
    })
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "level".into());
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_parent_and_replaces_existing_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join("level.csv");
        write_text_atomic(&path, "1,2\n").expect("first write");
        write_text_atomic(&path, "3,4\n").expect("second write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "3,4\n");

        let leftovers: Vec<_> = fs::read_dir(dir.path().join("nested"))
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn staging_file_sits_next_to_target() {
        let staging = staging_path(Path::new("maps/level.csv"));
        assert_eq!(staging.parent(), Some(Path::new("maps")));
        assert!(staging.to_string_lossy().ends_with(".tmp"));
    }
}
