//! Upload directory layout for theme assets.
//!
//! Everything a theme owns lives under `<base>/themes`:
//!
//! ```text
//! themes/<slug>.zip              uploaded build archive
//! themes/<slug>_thumb.<ext>      thumbnail image
//! themes/<slug>/                 extraction + build directory
//! themes/<slug>/build_log.txt    build log
//! themes/<slug>/out/             static build output (served as preview)
//! ```

use crate::logfile::BuildLog;
use std::io;
use std::path::{Path, PathBuf};

/// Strip path separators and control characters from a client-supplied
/// filename component.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0'..='\x1f' => '_',
            c => c,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ThemeStorage {
    base_path: PathBuf,
}

impl ThemeStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn from_env() -> Self {
        let base = std::env::var("KX_UPLOAD_DIR").unwrap_or_else(|_| "./data/uploads".to_string());
        Self::new(base)
    }

    pub fn base(&self) -> &Path {
        &self.base_path
    }

    pub fn themes_dir(&self) -> PathBuf {
        self.base_path.join("themes")
    }

    pub fn zip_path(&self, slug: &str) -> PathBuf {
        self.themes_dir().join(format!("{slug}.zip"))
    }

    pub fn extract_dir(&self, slug: &str) -> PathBuf {
        self.themes_dir().join(slug)
    }

    pub fn output_dir(&self, slug: &str) -> PathBuf {
        self.extract_dir(slug).join("out")
    }

    pub fn thumbnail_path(&self, slug: &str, ext: &str) -> PathBuf {
        self.themes_dir()
            .join(format!("{slug}_thumb.{}", sanitize_filename(ext)))
    }

    pub fn build_log(&self, slug: &str) -> BuildLog {
        BuildLog::new(self.extract_dir(slug).join("build_log.txt"))
    }

    /// Public URL path for the uploaded archive.
    pub fn zip_url(&self, slug: &str) -> String {
        format!("/uploads/themes/{slug}.zip")
    }

    /// Public URL path for a stored thumbnail.
    pub fn thumbnail_url(&self, slug: &str, ext: &str) -> String {
        format!("/uploads/themes/{slug}_thumb.{}", sanitize_filename(ext))
    }

    pub async fn ensure_dirs(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(self.themes_dir()).await
    }

    /// Remove every file a theme owns: archive, extraction directory
    /// and any stored thumbnails. Missing pieces are not an error.
    pub async fn remove_theme_files(&self, slug: &str) -> io::Result<()> {
        let zip = self.zip_path(slug);
        if zip.exists() {
            tokio::fs::remove_file(&zip).await?;
        }

        let dir = self.extract_dir(slug);
        if dir.exists() {
            tokio::fs::remove_dir_all(&dir).await?;
        }

        let prefix = format!("{slug}_thumb.");
        let mut entries = match tokio::fs::read_dir(self.themes_dir()).await {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                tokio::fs::remove_file(entry.path()).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let storage = ThemeStorage::new("/data/uploads");
        assert_eq!(
            storage.zip_path("urban-kicks"),
            PathBuf::from("/data/uploads/themes/urban-kicks.zip")
        );
        assert_eq!(
            storage.extract_dir("urban-kicks"),
            PathBuf::from("/data/uploads/themes/urban-kicks")
        );
        assert_eq!(
            storage.output_dir("urban-kicks"),
            PathBuf::from("/data/uploads/themes/urban-kicks/out")
        );
        assert_eq!(storage.zip_url("urban-kicks"), "/uploads/themes/urban-kicks.zip");
        assert_eq!(
            storage.thumbnail_url("urban-kicks", "png"),
            "/uploads/themes/urban-kicks_thumb.png"
        );
    }

    #[test]
    fn sanitizes_extension() {
        let storage = ThemeStorage::new("/data/uploads");
        let path = storage.thumbnail_path("shop", "png/../../etc");
        // A hostile extension stays a single path component under themes/
        assert_eq!(path.parent(), Some(storage.themes_dir().as_path()));
    }

    #[test]
    fn sanitize_filename_strips_separators() {
        assert_eq!(sanitize_filename("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_filename("plain.png"), "plain.png");
    }

    #[tokio::test]
    async fn remove_theme_files_cleans_everything() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ThemeStorage::new(dir.path());
        storage.ensure_dirs().await.unwrap();

        std::fs::write(storage.zip_path("shop"), b"zip").unwrap();
        std::fs::create_dir_all(storage.extract_dir("shop")).unwrap();
        std::fs::write(storage.extract_dir("shop").join("build_log.txt"), "log").unwrap();
        std::fs::write(storage.thumbnail_path("shop", "png"), b"img").unwrap();

        storage.remove_theme_files("shop").await.unwrap();

        assert!(!storage.zip_path("shop").exists());
        assert!(!storage.extract_dir("shop").exists());
        assert!(!storage.thumbnail_path("shop", "png").exists());
    }

    #[tokio::test]
    async fn remove_theme_files_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ThemeStorage::new(dir.path().join("nope"));
        storage.remove_theme_files("ghost").await.unwrap();
    }
}
