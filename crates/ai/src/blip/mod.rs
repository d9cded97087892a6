use crate::traits::{ImageCaptionInput, ImageCaptionOutput};
use crate::Model;
use anyhow::{anyhow, bail};
use candle_core::{DType, Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::blip::VisionConfig;
use candle_transformers::models::quantized_blip;
use candle_transformers::models::{blip, blip_text};
use image::RgbImage;
use serde::Deserialize;
use std::path::Path;
use strum_macros::{AsRefStr, EnumString};
use tokenizers::Tokenizer;
use tracing::debug;

const IMAGE_SIZE: u32 = 384;
const BOS_TOKEN_ID: u32 = 30522;
const SEP_TOKEN_ID: u32 = 102;
/// same as `max_length` in the generation config shipped with the BLIP checkpoints
const DEFAULT_MAX_LENGTH: usize = 20;

const IMAGE_MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
const IMAGE_STD: [f32; 3] = [0.26862954, 0.261_302_6, 0.275_777_1];

fn blip_base_config() -> blip::Config {
    let text_config = blip_text::Config {
        vocab_size: 30524,
        hidden_size: 768,
        encoder_hidden_size: 768,
        intermediate_size: 3072,
        projection_dim: 768,
        num_hidden_layers: 12,
        num_attention_heads: 12,
        max_position_embeddings: 512,
        hidden_act: candle_nn::Activation::Gelu,
        layer_norm_eps: 1e-12,
        is_decoder: true,
    };
    let vision_config = VisionConfig {
        hidden_size: 768,
        intermediate_size: 3072,
        projection_dim: 512,
        num_hidden_layers: 12,
        num_attention_heads: 12,
        image_size: IMAGE_SIZE as usize,
        patch_size: 16,
        hidden_act: candle_nn::Activation::Gelu,
        layer_norm_eps: 1e-5,
    };

    blip::Config {
        text_config,
        vision_config,
        projection_dim: 512,
        image_text_hidden_size: 256,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, AsRefStr, EnumString)]
pub enum BLIPModel {
    #[default]
    Base,
    Large,
}

impl BLIPModel {
    fn config(&self) -> blip::Config {
        match self {
            BLIPModel::Base => blip_base_config(),
            BLIPModel::Large => blip::Config::image_captioning_large(),
        }
    }
}

/// Generation options, deserialized from the `params` of a model descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct BLIPOptions {
    #[serde(default)]
    pub model_type: BLIPModel,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}

impl Default for BLIPOptions {
    fn default() -> Self {
        Self {
            model_type: BLIPModel::Base,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

enum BLIPWeights {
    Full(blip::BlipForConditionalGeneration),
    Quantized(quantized_blip::BlipForConditionalGeneration),
}

impl BLIPWeights {
    fn embed_image(&self, image: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            BLIPWeights::Full(m) => image.apply(m.vision_model()),
            BLIPWeights::Quantized(m) => image.apply(m.vision_model()),
        }
    }

    fn decode_step(&mut self, input_ids: &Tensor, image_embeds: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            BLIPWeights::Full(m) => m.text_decoder().forward(input_ids, image_embeds),
            BLIPWeights::Quantized(m) => m.text_decoder().forward(input_ids, image_embeds),
        }
    }

    fn reset_kv_cache(&mut self) {
        match self {
            BLIPWeights::Full(m) => m.text_decoder().reset_kv_cache(),
            BLIPWeights::Quantized(m) => m.text_decoder().reset_kv_cache(),
        }
    }
}

pub struct BLIP {
    tokenizer: Tokenizer,
    model: BLIPWeights,
    logits_processor: LogitsProcessor,
    device: Device,
    max_length: usize,
}

impl Model for BLIP {
    type Item = ImageCaptionInput;
    type Output = ImageCaptionOutput;

    fn batch_size_limit(&self) -> usize {
        1
    }

    async fn process(
        &mut self,
        items: Vec<Self::Item>,
    ) -> anyhow::Result<Vec<anyhow::Result<Self::Output>>> {
        if items.len() > self.batch_size_limit() {
            bail!("too many items");
        }

        let mut results = vec![];

        for item in items {
            let res = self.get_caption(&item.image, item.prompt.as_deref());
            results.push(res);
        }

        Ok(results)
    }
}

fn load_safetensors(
    model_path: &Path,
    device: &Device,
) -> anyhow::Result<candle_nn::VarBuilder<'static>> {
    let buffer = std::fs::read(model_path)
        .map_err(|e| anyhow!("failed to read weights {}: {}", model_path.display(), e))?;
    Ok(candle_nn::VarBuilder::from_buffered_safetensors(
        buffer,
        DType::F32,
        device,
    )?)
}

fn select_device() -> anyhow::Result<Device> {
    if cfg!(feature = "metal") {
        Ok(Device::new_metal(0)?)
    } else if cfg!(feature = "cuda") {
        Ok(Device::new_cuda(0)?)
    } else {
        Ok(Device::Cpu)
    }
}

impl BLIP {
    /// `model_path` ending in `.gguf` loads quantized weights, anything else is
    /// read as safetensors.
    pub async fn new(
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        options: BLIPOptions,
    ) -> anyhow::Result<Self> {
        let model_path = model_path.as_ref();
        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("failed to initialize tokenizer: {}", e))?;

        let logits_processor = LogitsProcessor::new(1337, None, None);

        let config = options.model_type.config();
        let device = select_device()?;
        debug!(
            "loading {} weights from {} on {:?}",
            options.model_type.as_ref(),
            model_path.display(),
            device
        );

        let model = if model_path.extension().is_some_and(|ext| ext == "gguf") {
            let vb = quantized_blip::VarBuilder::from_gguf(model_path, &device)?;
            BLIPWeights::Quantized(quantized_blip::BlipForConditionalGeneration::new(&config, vb)?)
        } else {
            let vb = load_safetensors(model_path, &device)?;
            BLIPWeights::Full(blip::BlipForConditionalGeneration::new(&config, vb)?)
        };

        Ok(Self {
            tokenizer,
            model,
            logits_processor,
            device,
            max_length: options.max_length.max(2),
        })
    }

    fn prompt_token_ids(&self, prompt: Option<&str>) -> anyhow::Result<Vec<u32>> {
        let mut token_ids = vec![BOS_TOKEN_ID];
        if let Some(prompt) = prompt {
            let encoding = self
                .tokenizer
                .encode(prompt, false)
                .map_err(|e| anyhow!("failed to tokenize prompt: {}", e))?;
            token_ids.extend_from_slice(encoding.get_ids());
        }
        Ok(token_ids)
    }

    fn get_caption(&mut self, image: &RgbImage, prompt: Option<&str>) -> anyhow::Result<String> {
        debug!(
            "generating caption for {}x{} image",
            image.width(),
            image.height()
        );
        let image = preprocess(image)?.to_device(&self.device)?;
        let image_embeds = self.model.embed_image(&image.unsqueeze(0)?)?;

        let mut token_ids = self.prompt_token_ids(prompt)?;

        // we need this to make multi time generation work
        self.model.reset_kv_cache();

        let mut index = 0;
        while token_ids.len() < self.max_length {
            let context_size = if index > 0 { 1 } else { token_ids.len() };
            let start_pos = token_ids.len().saturating_sub(context_size);
            let input_ids = Tensor::new(&token_ids[start_pos..], &self.device)?.unsqueeze(0)?;
            let logits = self.model.decode_step(&input_ids, &image_embeds)?;
            let logits = logits.squeeze(0)?;
            let logits = logits.get(logits.dim(0)? - 1)?;
            let token = self.logits_processor.sample(&logits)?;
            if token == SEP_TOKEN_ID {
                break;
            }
            token_ids.push(token);
            index += 1;
        }

        let caption = self
            .tokenizer
            .decode(&token_ids, true)
            .map_err(|e| anyhow!("failed to generate caption: {}", e))?;

        Ok(caption.trim().to_string())
    }
}

/// Resize to the BLIP input size and normalize, returning a `(3, 384, 384)` f32
/// tensor on the CPU.
pub fn preprocess(image: &RgbImage) -> candle_core::Result<Tensor> {
    let img = image::imageops::resize(
        image,
        IMAGE_SIZE,
        IMAGE_SIZE,
        image::imageops::FilterType::CatmullRom,
    );
    let size = IMAGE_SIZE as usize;
    let data = img.into_raw();
    let data = Tensor::from_vec(data, (size, size, 3), &Device::Cpu)?.permute((2, 0, 1))?;
    let mean = Tensor::new(&IMAGE_MEAN, &Device::Cpu)?.reshape((3, 1, 1))?;
    let std = Tensor::new(&IMAGE_STD, &Device::Cpu)?.reshape((3, 1, 1))?;
    (data.to_dtype(DType::F32)? / 255.)?
        .broadcast_sub(&mean)?
        .broadcast_div(&std)
}
