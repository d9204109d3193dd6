//! Theme archive handling: ZIP extraction, wrapper-directory flattening
//! and project-kind detection.

use crate::error::BuildError;
use std::io;
use std::path::{Path, PathBuf};

/// Entries ignored when deciding whether a directory is a wrapper, and
/// preserved when cleaning an extraction directory between builds.
const JUNK_ENTRIES: &[&str] = &[
    "__MACOSX",
    ".DS_Store",
    "node_modules",
    ".next",
    "package-lock.json",
    "build",
    "dist",
];

/// Directory names that mark real theme content; a lone directory with
/// one of these names is never flattened away.
const CONTENT_DIRS: &[&str] = &["app", "pages", "public", "src", "out"];

/// Artifacts from a previous build that are kept across re-extractions
/// so rebuilds stay fast.
pub const PRESERVED_ENTRIES: &[&str] = &["node_modules", ".next", "package-lock.json"];

/// Check the ZIP local-file magic. Uploads are rejected before anything
/// touches disk when the payload is not actually a ZIP archive.
pub fn is_zip_archive(data: &[u8]) -> bool {
    // PK\x03\x04 (regular), PK\x05\x06 (empty archive)
    data.starts_with(b"PK\x03\x04") || data.starts_with(b"PK\x05\x06")
}

/// Extract a ZIP archive into `dest`.
///
/// Runs on the blocking pool. Every entry path is resolved through
/// `enclosed_name`; an entry that would escape the destination fails
/// the whole extraction.
pub async fn extract_archive(zip_path: &Path, dest: &Path) -> Result<(), BuildError> {
    let zip_path = zip_path.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<(), BuildError> {
        let file = std::fs::File::open(&zip_path)?;
        let mut archive = zip::ZipArchive::new(file)?;

        std::fs::create_dir_all(&dest)?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let relative = entry
                .enclosed_name()
                .ok_or_else(|| BuildError::UnsafeArchivePath(entry.name().to_string()))?;
            let out_path = dest.join(relative);

            if entry.is_dir() {
                std::fs::create_dir_all(&out_path)?;
            } else {
                if let Some(parent) = out_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let mut out_file = std::fs::File::create(&out_path)?;
                io::copy(&mut entry, &mut out_file)?;
            }
        }
        Ok(())
    })
    .await
    .map_err(|e| BuildError::Io(io::Error::other(e)))?
}

/// Remove everything in `dir` except the entries named in `keep`.
/// Used before re-extraction so `node_modules` survives and rebuilds
/// do not pay the full install cost again.
pub async fn clean_preserving(dir: &Path, keep: &[&str]) -> Result<(), BuildError> {
    if !dir.exists() {
        tokio::fs::create_dir_all(dir).await?;
        return Ok(());
    }

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if keep.iter().any(|k| name.to_string_lossy() == *k) {
            continue;
        }
        let path = entry.path();
        if entry.file_type().await?.is_dir() {
            tokio::fs::remove_dir_all(&path).await?;
        } else {
            tokio::fs::remove_file(&path).await?;
        }
    }
    Ok(())
}

/// Collect non-junk entry names of a directory.
async fn meaningful_entries(dir: &Path) -> Result<Vec<(String, PathBuf, bool)>, BuildError> {
    let mut out = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if JUNK_ENTRIES.contains(&name.as_str()) {
            continue;
        }
        let is_dir = entry.file_type().await?.is_dir();
        out.push((name, entry.path(), is_dir));
    }
    Ok(out)
}

/// Flatten nested wrapper directories.
///
/// Archives are routinely zipped with the theme inside a top-level
/// folder (`my-theme/package.json` instead of `package.json`). As long
/// as the extraction directory holds exactly one non-junk entry, that
/// entry is a directory, and its name is not a content directory, its
/// children are hoisted up a level. Capped at three iterations.
pub async fn flatten_tree(dir: &Path) -> Result<(), BuildError> {
    for _ in 0..3 {
        let entries = meaningful_entries(dir).await?;
        let [(name, nested, true)] = entries.as_slice() else {
            break;
        };
        if CONTENT_DIRS.contains(&name.as_str()) {
            break;
        }

        tracing::debug!(wrapper = %name, "flattening nested theme directory");

        let mut children = tokio::fs::read_dir(&nested).await?;
        while let Some(child) = children.next_entry().await? {
            let dest = dir.join(child.file_name());
            if dest.exists() {
                if dest.is_dir() {
                    tokio::fs::remove_dir_all(&dest).await?;
                } else {
                    tokio::fs::remove_file(&dest).await?;
                }
            }
            tokio::fs::rename(child.path(), dest).await?;
        }
        tokio::fs::remove_dir_all(&nested).await?;
    }
    Ok(())
}

/// A Node project needs an install + build pass; anything else is
/// served as-is after extraction.
pub fn is_node_project(dir: &Path) -> bool {
    dir.join("package.json").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn make_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            for (name, data) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn zip_magic_detection() {
        assert!(is_zip_archive(b"PK\x03\x04rest"));
        assert!(is_zip_archive(b"PK\x05\x06"));
        assert!(!is_zip_archive(b"<!DOCTYPE html>"));
        assert!(!is_zip_archive(b""));
        assert!(!is_zip_archive(b"PK"));
    }

    #[tokio::test]
    async fn extracts_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("theme.zip");
        let data = make_zip(&[
            ("package.json", b"{}"),
            ("app/page.tsx", b"export default function Page() {}"),
        ]);
        std::fs::write(&zip_path, data).unwrap();

        let dest = dir.path().join("extract");
        extract_archive(&zip_path, &dest).await.unwrap();

        assert!(dest.join("package.json").is_file());
        assert!(dest.join("app/page.tsx").is_file());
        assert!(is_node_project(&dest));
    }

    #[tokio::test]
    async fn rejects_traversal_entries() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("evil.zip");
        let data = make_zip(&[("../escape.txt", b"nope")]);
        std::fs::write(&zip_path, data).unwrap();

        let dest = dir.path().join("extract");
        let err = extract_archive(&zip_path, &dest).await.unwrap_err();
        assert!(matches!(err, BuildError::UnsafeArchivePath(_)));
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn flattens_single_wrapper() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("extract");
        std::fs::create_dir_all(root.join("my-theme-main/app")).unwrap();
        std::fs::write(root.join("my-theme-main/package.json"), "{}").unwrap();
        std::fs::create_dir_all(root.join("__MACOSX")).unwrap();

        flatten_tree(&root).await.unwrap();

        assert!(root.join("package.json").is_file());
        assert!(root.join("app").is_dir());
        assert!(!root.join("my-theme-main").exists());
    }

    #[tokio::test]
    async fn does_not_flatten_content_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("extract");
        std::fs::create_dir_all(root.join("public")).unwrap();
        std::fs::write(root.join("public/index.html"), "<html>").unwrap();

        flatten_tree(&root).await.unwrap();

        assert!(root.join("public/index.html").is_file());
    }

    #[tokio::test]
    async fn does_not_flatten_multiple_entries() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("extract");
        std::fs::create_dir_all(root.join("alpha")).unwrap();
        std::fs::create_dir_all(root.join("beta")).unwrap();

        flatten_tree(&root).await.unwrap();

        assert!(root.join("alpha").is_dir());
        assert!(root.join("beta").is_dir());
    }

    #[tokio::test]
    async fn clean_preserves_node_modules() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("extract");
        std::fs::create_dir_all(root.join("node_modules/react")).unwrap();
        std::fs::create_dir_all(root.join("app")).unwrap();
        std::fs::write(root.join("stale.txt"), "old").unwrap();

        clean_preserving(&root, PRESERVED_ENTRIES).await.unwrap();

        assert!(root.join("node_modules/react").is_dir());
        assert!(!root.join("app").exists());
        assert!(!root.join("stale.txt").exists());
    }
}
