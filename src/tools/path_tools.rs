//! 路徑工具
//!
//! 中繼資料輸出路徑、資料夾展開與中繼資料中使用的路徑表示法。

use crate::error::{Result, ThumbnailError};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// 取出不含副檔名的檔名
#[must_use]
pub fn extract_name(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "video".to_string(), |s| s.to_string_lossy().to_string())
}

/// 縮圖中繼資料的輸出路徑：`<output 或影片所在目錄>/<stem>.<ext>`
#[must_use]
pub fn metadata_path(video_path: &Path, output: Option<&Path>, extension: &str) -> PathBuf {
    let directory = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| video_path.parent().unwrap_or(Path::new(".")).to_path_buf());
    directory.join(format!("{}.{}", extract_name(video_path), extension))
}

pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|source| ThumbnailError::FormatWrite {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// 走訪資料夾，展開為檔案清單
#[must_use]
pub fn expand_directory(directory: &Path) -> Vec<PathBuf> {
    WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// 以正斜線表示路徑
///
/// WebVTT 與 JSON 中繼資料內的路徑一律使用 posix 斜線，
/// 播放器端才能跨平台解讀。
#[must_use]
pub fn to_posix(path: &Path) -> String {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
            Component::CurDir => {}
            Component::ParentDir => parts.push("..".to_string()),
            Component::RootDir | Component::Prefix(_) => parts.push(String::new()),
        }
    }
    parts.join("/")
}

/// 相對於目前工作目錄的路徑；無法換算時回傳原路徑
#[must_use]
pub fn relative_to_cwd(path: &Path) -> PathBuf {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(&cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_name() {
        assert_eq!(extract_name(Path::new("/videos/movie.final.mp4")), "movie.final");
        assert_eq!(extract_name(Path::new("clip.mkv")), "clip");
    }

    #[test]
    fn test_metadata_path_defaults_to_video_directory() {
        let path = metadata_path(Path::new("/videos/movie.mp4"), None, "vtt");
        assert_eq!(path, PathBuf::from("/videos/movie.vtt"));
    }

    #[test]
    fn test_metadata_path_with_output() {
        let path = metadata_path(
            Path::new("/videos/movie.mp4"),
            Some(Path::new("/out")),
            "json",
        );
        assert_eq!(path, PathBuf::from("/out/movie.json"));
    }

    #[test]
    fn test_to_posix_strips_current_dir() {
        assert_eq!(to_posix(Path::new("./thumbs/movie.png")), "thumbs/movie.png");
        assert_eq!(to_posix(Path::new("thumbs/movie.png")), "thumbs/movie.png");
    }

    #[test]
    fn test_expand_directory_lists_nested_files() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp.path().join("x.mp4"), b"x").unwrap();
        std::fs::write(nested.join("y.mp4"), b"y").unwrap();

        let mut files = expand_directory(temp.path());
        files.sort();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.is_file()));
    }
}
