mod download;
pub use download::*;

#[cfg(test)]
mod test {
    use super::*;
    use axum::{routing::get, Router};

    async fn serve() -> String {
        let app = Router::new().route(
            "/models/tokenizer.json",
            get(|| async { r#"{"version": "1.0"}"# }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn temp_resources_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "file-downloader-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_download_url() {
        let download = FileDownload::new(FileDownloadConfig {
            url: "https://example.com/".to_string(),
            ..Default::default()
        });
        assert_eq!(download.download_url("/a/b.bin"), "https://example.com/a/b.bin");
        assert_eq!(
            download.download_url("https://other.com/c.bin"),
            "https://other.com/c.bin"
        );
    }

    #[test]
    fn test_temp_download_path_keeps_extension() {
        let dir = std::path::Path::new("resources/blip");
        assert_eq!(
            temp_download_path(&dir.join("tokenizer.json")),
            dir.join("tokenizer.json.temp")
        );
        assert_ne!(
            temp_download_path(&dir.join("tokenizer.json")),
            temp_download_path(&dir.join("tokenizer.model"))
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_download() {
        let base = serve().await;
        let resources_dir = temp_resources_dir("download");
        let download = FileDownload::new(FileDownloadConfig {
            url: base,
            resources_dir: resources_dir.clone(),
        });

        let res = download
            .download_if_not_exists("models/tokenizer.json")
            .await
            .unwrap();
        assert_eq!(res, resources_dir.join("models/tokenizer.json"));
        assert_eq!(
            std::fs::read_to_string(&res).unwrap(),
            r#"{"version": "1.0"}"#
        );
        assert!(!temp_download_path(&res).exists());

        // existing files are not downloaded again
        std::fs::write(&res, "local").unwrap();
        let res = download
            .download_if_not_exists("models/tokenizer.json")
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&res).unwrap(), "local");

        let _ = std::fs::remove_dir_all(&resources_dir);
    }

    #[test_log::test(tokio::test)]
    async fn test_download_missing_file() {
        let base = serve().await;
        let resources_dir = temp_resources_dir("missing");
        let download = FileDownload::new(FileDownloadConfig {
            url: base,
            resources_dir: resources_dir.clone(),
        });

        let res = download.download_if_not_exists("models/missing.bin").await;
        assert!(res.is_err());
        assert!(!resources_dir.join("models/missing.bin").exists());
    }
}
