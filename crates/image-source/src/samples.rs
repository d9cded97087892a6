use crate::{validate_url, GalleryError};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleImage {
    pub id: String,
    pub title: String,
    pub url: String,
}

impl SampleImage {
    fn new(id: &str, title: &str, url: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            url: url.to_string(),
        }
    }
}

/// Remote demo images offered next to the upload form. Never empty, ids are
/// unique and every url passes [`validate_url`].
#[derive(Debug, Clone)]
pub struct SampleGallery {
    samples: Vec<SampleImage>,
}

impl SampleGallery {
    pub fn new(samples: Vec<SampleImage>) -> Result<Self, GalleryError> {
        if samples.is_empty() {
            return Err(GalleryError::Empty);
        }

        let mut ids = HashSet::new();
        for sample in samples.iter() {
            if !ids.insert(sample.id.as_str()) {
                return Err(GalleryError::DuplicateId(sample.id.clone()));
            }
            validate_url(&sample.url).map_err(|source| GalleryError::InvalidSample {
                id: sample.id.clone(),
                source,
            })?;
        }

        Ok(Self { samples })
    }

    pub fn builtin() -> Self {
        Self {
            samples: vec![
                SampleImage::new(
                    "beach-dog",
                    "Woman and dog on the beach",
                    "https://storage.googleapis.com/sfr-vision-language-research/BLIP/demo.jpg",
                ),
                SampleImage::new(
                    "couch-cats",
                    "Cats on a couch",
                    "http://images.cocodataset.org/val2017/000000039769.jpg",
                ),
                SampleImage::new(
                    "living-room",
                    "Living room",
                    "http://images.cocodataset.org/val2017/000000000139.jpg",
                ),
                SampleImage::new(
                    "parrots",
                    "Parrots",
                    "https://huggingface.co/datasets/Narsil/image_dummy/raw/main/parrots.png",
                ),
                SampleImage::new(
                    "chonky-cat",
                    "Cat",
                    "https://huggingface.co/datasets/huggingface/documentation-images/resolve/main/pipeline-cat-chonk.jpeg",
                ),
            ],
        }
    }

    /// Read a JSON array of samples.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GalleryError> {
        let content = std::fs::read_to_string(path)?;
        let samples: Vec<SampleImage> = serde_json::from_str(&content)?;
        Self::new(samples)
    }

    /// [`SampleGallery::load`] when the file exists, otherwise the builtin gallery.
    pub fn load_or_builtin(path: impl AsRef<Path>) -> Result<Self, GalleryError> {
        let path = path.as_ref();
        if path.exists() {
            tracing::info!("loading sample images from {}", path.display());
            Self::load(path)
        } else {
            Ok(Self::builtin())
        }
    }

    pub fn samples(&self) -> &[SampleImage] {
        &self.samples
    }

    pub fn get(&self, id: &str) -> Option<&SampleImage> {
        self.samples.iter().find(|v| v.id == id)
    }

    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&SampleImage> {
        self.samples.choose(rng)
    }
}
