use file_downloader::{FileDownload, FileDownloadConfig};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use strum_macros::{AsRefStr, EnumString};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifact {
    /// full url, or a path relative to the model download url
    pub url: String,
    pub file_name: String,
}

#[derive(AsRefStr, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, EnumString)]
pub enum ConcreteModelType {
    BLIP,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct AIModelInfo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// relative to the resources dir
    pub artifacts_dir: PathBuf,
    pub artifacts: Vec<ModelArtifact>,
    /// use this to find corresponding concrete struct
    pub model_type: ConcreteModelType,
    /// use these params to instantiate the model
    #[serde(default)]
    pub params: Value,
}

impl AIModelInfo {
    pub fn artifacts_dir_on_disk(&self, resources_dir: impl AsRef<Path>) -> PathBuf {
        resources_dir.as_ref().join(&self.artifacts_dir)
    }
}

pub fn builtin_model_list() -> Vec<AIModelInfo> {
    vec![
        AIModelInfo {
            id: "blip-base".to_string(),
            title: "BLIP base".to_string(),
            description: "Salesforce BLIP image captioning, base size, full precision".to_string(),
            artifacts_dir: PathBuf::from("blip-image-captioning-base"),
            artifacts: vec![
                ModelArtifact {
                    url: "Salesforce/blip-image-captioning-base/resolve/main/model.safetensors"
                        .to_string(),
                    file_name: "model.safetensors".to_string(),
                },
                ModelArtifact {
                    url: "Salesforce/blip-image-captioning-base/resolve/main/tokenizer.json"
                        .to_string(),
                    file_name: "tokenizer.json".to_string(),
                },
            ],
            model_type: ConcreteModelType::BLIP,
            params: json!({
                "model_path": "model.safetensors",
                "tokenizer_path": "tokenizer.json",
                "model_type": "Base",
            }),
        },
        AIModelInfo {
            id: "blip-large-q4k".to_string(),
            title: "BLIP large (q4k)".to_string(),
            description: "Salesforce BLIP image captioning, large size, 4-bit quantized"
                .to_string(),
            artifacts_dir: PathBuf::from("blip-image-captioning-large-q4k"),
            artifacts: vec![
                ModelArtifact {
                    url: "lmz/candle-blip/resolve/main/blip-image-captioning-large-q4k.gguf"
                        .to_string(),
                    file_name: "blip-image-captioning-large-q4k.gguf".to_string(),
                },
                ModelArtifact {
                    url: "Salesforce/blip-image-captioning-large/resolve/main/tokenizer.json"
                        .to_string(),
                    file_name: "tokenizer.json".to_string(),
                },
            ],
            model_type: ConcreteModelType::BLIP,
            params: json!({
                "model_path": "blip-image-captioning-large-q4k.gguf",
                "tokenizer_path": "tokenizer.json",
                "model_type": "Large",
            }),
        },
    ]
}

/// `model_list.json` in the resources dir when present, otherwise the builtin list.
pub fn load_model_list(model_list_file: impl AsRef<Path>) -> anyhow::Result<Vec<AIModelInfo>> {
    let model_list_file = model_list_file.as_ref();
    if !model_list_file.exists() {
        return Ok(builtin_model_list());
    }

    // read json from model_list_file
    let model_list = std::fs::read_to_string(model_list_file)
        .map_err(|e| anyhow::anyhow!("Failed to read model list: {}", e))?;

    let model_list: Vec<AIModelInfo> = serde_json::from_str(&model_list)
        .map_err(|e| anyhow::anyhow!("Invalid model list format: {}", e))?;

    Ok(model_list)
}

pub fn get_model_info_by_id(
    model_list_file: impl AsRef<Path>,
    model_id: &str,
) -> anyhow::Result<AIModelInfo> {
    let model_list = load_model_list(model_list_file)?;

    let model = model_list
        .into_iter()
        .find(|v| v.id == model_id)
        .ok_or(anyhow::anyhow!("model not found: {}", model_id))?;

    Ok(model)
}

/// Download every missing artifact of `model`, returning its artifacts dir.
pub async fn ensure_artifacts(
    model: &AIModelInfo,
    resources_dir: impl AsRef<Path>,
    download_url: &str,
) -> anyhow::Result<PathBuf> {
    let artifacts_dir = model.artifacts_dir_on_disk(&resources_dir);
    let download = FileDownload::new(FileDownloadConfig {
        url: download_url.to_string(),
        resources_dir: resources_dir.as_ref().to_path_buf(),
    });

    for artifact in model.artifacts.iter() {
        download
            .download_to_path_if_not_exists(&artifact.url, artifacts_dir.join(&artifact.file_name))
            .await?;
    }

    Ok(artifacts_dir)
}
