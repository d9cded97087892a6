pub mod models;

use self::models::{ensure_artifacts, get_model_info_by_id, AIModelInfo, ConcreteModelType};
use crate::config::ServerConfig;
use ai::{
    blip::{BLIPOptions, BLIP},
    AIModel, ImageCaptionInput, ImageCaptionModel,
};
use image::RgbImage;
use serde_json::Value;
use std::{fmt, sync::Arc};

#[derive(Clone)]
pub struct AIHandler {
    pub image_caption: ImageCaptionModel,
    model_info: Arc<AIModelInfo>,
}

impl fmt::Debug for AIHandler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AIHandler")
            .field("image_caption", &self.model_info.id)
            .finish()
    }
}

fn get_str_from_params(params: &Value, name: &str) -> anyhow::Result<String> {
    match params[name].as_str() {
        Some(s) => Ok(s.into()),
        _ => anyhow::bail!("invalid {}", name),
    }
}

impl AIHandler {
    pub fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        let model = get_model_info_by_id(config.model_list_file(), &config.image_caption_model)?;
        tracing::info!("image caption model: {} ({})", model.title, model.id);

        let image_caption = Self::get_image_caption(config, model.clone())?;

        Ok(Self::with_model(image_caption, model))
    }

    pub fn with_model(image_caption: ImageCaptionModel, model_info: AIModelInfo) -> Self {
        Self {
            image_caption,
            model_info: Arc::new(model_info),
        }
    }

    pub fn model_info(&self) -> &AIModelInfo {
        &self.model_info
    }

    /// Weights are downloaded and loaded on the first caption request, not here.
    fn get_image_caption(
        config: &ServerConfig,
        model: AIModelInfo,
    ) -> anyhow::Result<ImageCaptionModel> {
        let resources_dir = config.resources_dir.clone();
        let download_url = config.model_download_url.clone();

        AIModel::new(
            model.id.clone(),
            move || {
                let resources_dir = resources_dir.clone();
                let download_url = download_url.clone();
                let model = model.clone();
                async move {
                    match model.model_type {
                        ConcreteModelType::BLIP => {
                            let artifacts_dir =
                                ensure_artifacts(&model, &resources_dir, &download_url).await?;
                            let params = model.params;
                            let model_path =
                                artifacts_dir.join(get_str_from_params(&params, "model_path")?);
                            let tokenizer_path =
                                artifacts_dir.join(get_str_from_params(&params, "tokenizer_path")?);
                            let options: BLIPOptions = serde_json::from_value(params)?;
                            BLIP::new(model_path, tokenizer_path, options).await
                        }
                    }
                }
            },
            config.model_offload,
        )
    }

    pub async fn caption(&self, image: Arc<RgbImage>, prompt: Option<String>) -> anyhow::Result<String> {
        let input = ImageCaptionInput {
            image,
            prompt: None,
        }
        .with_prompt(prompt);

        self.image_caption.process_single(input).await
    }
}
