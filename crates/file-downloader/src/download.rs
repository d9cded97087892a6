use std::path::{Path, PathBuf};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::info;

pub struct FileDownloadConfig {
    pub url: String,
    pub resources_dir: PathBuf,
}

pub struct FileDownload {
    url: String,
    resources_dir: PathBuf,
}

impl Default for FileDownloadConfig {
    fn default() -> Self {
        Self {
            url: "https://huggingface.co".to_string(),
            resources_dir: PathBuf::from("resources"),
        }
    }
}

impl FileDownload {
    pub fn new(config: FileDownloadConfig) -> Self {
        Self {
            url: config.url.trim_end_matches('/').to_string(),
            resources_dir: config.resources_dir,
        }
    }

    /// `uri` is either relative to the configured base url or a full http(s) url.
    pub fn download_url(&self, uri: &str) -> String {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            uri.to_string()
        } else {
            format!("{}/{}", self.url, uri.trim_start_matches('/'))
        }
    }

    pub async fn download_to_path_if_not_exists(
        &self,
        uri: &str,
        file_path: impl AsRef<Path>,
    ) -> anyhow::Result<PathBuf> {
        let file_path = file_path.as_ref().to_path_buf();
        info!("check file path: {:?}", file_path);
        if file_path.exists() {
            return Ok(file_path);
        }

        let temp_path = temp_download_path(&file_path);
        let download_url = self.download_url(uri);

        info!("downloading {} to {:?}", download_url, file_path);
        let mut response = reqwest::get(&download_url).await?.error_for_status()?;

        // create parent folder
        if let Some(parent_dir) = file_path.parent() {
            fs::create_dir_all(parent_dir).await?;
        }

        let mut file = File::create(&temp_path).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        fs::rename(&temp_path, &file_path).await?;

        info!("file {:?} downloaded", file_path);

        Ok(file_path)
    }

    pub async fn download_if_not_exists(&self, uri: &str) -> anyhow::Result<PathBuf> {
        let file_path = self.resources_dir.join(uri);
        self.download_to_path_if_not_exists(uri, file_path).await
    }
}

/// `<file_path>.temp`, keeping the original extension so sibling files never share one.
pub fn temp_download_path(file_path: &Path) -> PathBuf {
    let mut path = file_path.as_os_str().to_os_string();
    path.push(".temp");
    PathBuf::from(path)
}
