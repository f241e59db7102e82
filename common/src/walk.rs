use std::path::{Path, PathBuf};
use tracing::warn;

/// Extensions recognized as candidate videos.
const VIDEO_EXTENSIONS: &[&str] = &["mp4"];

/// Recursively collect video files under `root`, sorted by path.
/// Unreadable directories are logged and skipped.
pub fn find_videos(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    walk_dir(root, &mut found);
    found.sort();
    found
}

fn walk_dir(dir: &Path, found: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = dir.display().to_string(), error = %e, "skipping unreadable directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_dir(&path, found);
        } else if is_video(&path) {
            found.push(path);
        }
    }
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct TempTree(PathBuf);

    impl TempTree {
        fn new(name: &str) -> Self {
            let root = std::env::temp_dir().join(format!("{name}-{}", std::process::id()));
            let _ = fs::remove_dir_all(&root);
            fs::create_dir_all(&root).unwrap();
            Self(root)
        }
    }

    impl Drop for TempTree {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn finds_videos_recursively() {
        let tree = TempTree::new("walk-recursive");
        let root = &tree.0;
        fs::create_dir_all(root.join("nested/deeper")).unwrap();
        fs::write(root.join("a.mp4"), b"").unwrap();
        fs::write(root.join("nested/b.MP4"), b"").unwrap();
        fs::write(root.join("nested/deeper/c.mp4"), b"").unwrap();
        fs::write(root.join("nested/notes.txt"), b"").unwrap();
        fs::write(root.join("noext"), b"").unwrap();

        let videos = find_videos(root);
        assert_eq!(videos.len(), 3);
        assert!(videos.iter().all(|p| is_video(p)));
    }

    #[test]
    fn missing_directory_yields_nothing() {
        let root = std::env::temp_dir().join("walk-does-not-exist");
        assert!(find_videos(&root).is_empty());
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(is_video(Path::new("movie.mp4")));
        assert!(is_video(Path::new("movie.MP4")));
        assert!(!is_video(Path::new("movie.mkv")));
        assert!(!is_video(Path::new("movie")));
    }
}
