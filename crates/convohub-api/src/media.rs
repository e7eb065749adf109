use std::path::{Component, Path, PathBuf};

use anyhow::{Result, bail};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

/// URL prefix under which the media directory is served.
pub const MEDIA_URL: &str = "/media";

const PROFILE_IMAGES: &str = "profile_images";

/// Manages uploaded files on disk.
///
/// Profile images live at `{dir}/profile_images/{user_id}-{uuid}.{ext}` and
/// are addressed by the matching `/media/...` URL.
pub struct MediaStorage {
    dir: PathBuf,
}

impl MediaStorage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(dir.join(PROFILE_IMAGES)).await?;
        info!("Media storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a new profile image and return its public URL.
    pub async fn save_profile_image(&self, user_id: i64, ext: &str, data: &[u8]) -> Result<String> {
        let name = format!("{}-{}.{}", user_id, Uuid::new_v4(), ext);
        fs::write(self.dir.join(PROFILE_IMAGES).join(&name), data).await?;
        info!("Stored profile image {} ({} bytes)", name, data.len());
        Ok(format!("{MEDIA_URL}/{PROFILE_IMAGES}/{name}"))
    }

    /// Delete the file behind a URL returned by [`save_profile_image`].
    /// A file that is already gone is not an error.
    ///
    /// [`save_profile_image`]: Self::save_profile_image
    pub async fn remove(&self, url: &str) -> Result<()> {
        let path = self.resolve(url)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted media file {}", url);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Media file {} already gone", url);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn resolve(&self, url: &str) -> Result<PathBuf> {
        let Some(relative) = url.strip_prefix(MEDIA_URL).and_then(|r| r.strip_prefix('/')) else {
            bail!("{url} is not a media URL");
        };
        let relative = Path::new(relative);
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            bail!("{url} escapes the media directory");
        }
        Ok(self.dir.join(relative))
    }
}

/// Lower-cased extension of an accepted image file name.
pub fn image_extension(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("png"),
        "jpg" | "jpeg" => Some("jpg"),
        "gif" => Some("gif"),
        "webp" => Some("webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_image_extensions_are_accepted() {
        assert_eq!(image_extension("me.PNG"), Some("png"));
        assert_eq!(image_extension("holiday.photo.jpeg"), Some("jpg"));
        assert_eq!(image_extension("avatar.webp"), Some("webp"));
        assert_eq!(image_extension("notes.pdf"), None);
        assert_eq!(image_extension("png"), None);
    }

    #[tokio::test]
    async fn saved_image_can_be_removed_twice() {
        let tmp = tempfile::tempdir().unwrap();
        let media = MediaStorage::new(tmp.path().to_path_buf()).await.unwrap();

        let url = media.save_profile_image(7, "png", b"not really a png").await.unwrap();
        assert!(url.starts_with("/media/profile_images/7-"));
        assert!(url.ends_with(".png"));

        let path = media.resolve(&url).unwrap();
        assert_eq!(fs::read(&path).await.unwrap(), b"not really a png");

        media.remove(&url).await.unwrap();
        assert!(!path.exists());
        media.remove(&url).await.unwrap();
    }

    #[tokio::test]
    async fn urls_outside_the_media_dir_are_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let media = MediaStorage::new(tmp.path().to_path_buf()).await.unwrap();

        assert!(media.remove("/media/../convohub.db").await.is_err());
        assert!(media.remove("https://example.com/a.png").await.is_err());
        assert!(media.remove("/mediafoo/a.png").await.is_err());
    }
}
