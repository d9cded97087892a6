use super::AIModel;
use image::RgbImage;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ImageCaptionInput {
    pub image: Arc<RgbImage>,
    /// text the caption should continue from, e.g. "a photography of"
    pub prompt: Option<String>,
}

impl ImageCaptionInput {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image: Arc::new(image),
            prompt: None,
        }
    }

    pub fn with_prompt(mut self, prompt: Option<String>) -> Self {
        self.prompt = prompt.filter(|v| !v.trim().is_empty());
        self
    }
}

pub type ImageCaptionOutput = String;
pub type ImageCaptionModel = AIModel<ImageCaptionInput, ImageCaptionOutput>;
