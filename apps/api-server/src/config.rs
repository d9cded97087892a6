use anyhow::Context;
use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

const DEFAULT_LISTEN_ADDR: &str = "[::]:3001";
const DEFAULT_IMAGE_CAPTION_MODEL: &str = "blip-base";
const DEFAULT_MODEL_DOWNLOAD_URL: &str = "https://huggingface.co";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Server settings, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// model weights, `model_list.json` and `samples.json` live here
    pub resources_dir: PathBuf,
    pub listen_addr: SocketAddr,
    pub image_caption_model: String,
    /// drop the loaded model after being idle this long; `None` keeps it forever
    pub model_offload: Option<Duration>,
    pub model_download_url: String,
    pub fetch_timeout: Duration,
    pub max_image_bytes: usize,
    /// write logs to `<log_dir>/app.log` instead of stdout
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            resources_dir: PathBuf::from("resources"),
            listen_addr: DEFAULT_LISTEN_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 3001))),
            image_caption_model: DEFAULT_IMAGE_CAPTION_MODEL.to_string(),
            model_offload: None,
            model_download_url: DEFAULT_MODEL_DOWNLOAD_URL.to_string(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            log_dir: None,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name).filter(|v| !v.trim().is_empty()) {
        Some(value) => {
            let parsed = value
                .trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for '${}': {}", name, value))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let default = Self::default();

        let model_offload = parse_var::<u64>(&lookup, "MODEL_OFFLOAD_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self {
            resources_dir: parse_var(&lookup, "LOCAL_RESOURCES_DIR")?
                .unwrap_or(default.resources_dir),
            listen_addr: parse_var(&lookup, "LISTEN_ADDR")?.unwrap_or(default.listen_addr),
            image_caption_model: parse_var(&lookup, "IMAGE_CAPTION_MODEL")?
                .unwrap_or(default.image_caption_model),
            model_offload,
            model_download_url: parse_var(&lookup, "MODEL_DOWNLOAD_URL")?
                .unwrap_or(default.model_download_url),
            fetch_timeout: parse_var::<u64>(&lookup, "FETCH_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(default.fetch_timeout),
            max_image_bytes: parse_var(&lookup, "MAX_IMAGE_BYTES")?
                .unwrap_or(default.max_image_bytes),
            log_dir: parse_var(&lookup, "LOG_DIR")?,
        })
    }

    pub fn model_list_file(&self) -> PathBuf {
        self.resources_dir.join("model_list.json")
    }

    pub fn samples_file(&self) -> PathBuf {
        self.resources_dir.join("samples.json")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.resources_dir, PathBuf::from("resources"));
        assert_eq!(config.listen_addr.port(), 3001);
        assert_eq!(config.image_caption_model, "blip-base");
        assert_eq!(config.model_offload, None);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.max_image_bytes, 10 * 1024 * 1024);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("LOCAL_RESOURCES_DIR", "/data/resources"),
            ("LISTEN_ADDR", "127.0.0.1:8080"),
            ("IMAGE_CAPTION_MODEL", "blip-large-q4k"),
            ("MODEL_OFFLOAD_SECS", "120"),
            ("FETCH_TIMEOUT_SECS", "5"),
            ("MAX_IMAGE_BYTES", "1024"),
            ("LOG_DIR", "/var/log/caption"),
        ])
        .unwrap();

        assert_eq!(config.samples_file(), PathBuf::from("/data/resources/samples.json"));
        assert_eq!(config.listen_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.image_caption_model, "blip-large-q4k");
        assert_eq!(config.model_offload, Some(Duration::from_secs(120)));
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.max_image_bytes, 1024);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/caption")));
    }

    #[test]
    fn test_blank_and_zero_values() {
        let config = config_from(&[("MODEL_OFFLOAD_SECS", "0"), ("LOG_DIR", "  ")]).unwrap();
        assert_eq!(config.model_offload, None);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_invalid_values() {
        let err = config_from(&[("LISTEN_ADDR", "not-an-address")]).unwrap_err();
        assert!(err.to_string().contains("LISTEN_ADDR"));

        assert!(config_from(&[("MAX_IMAGE_BYTES", "ten")]).is_err());
    }
}
