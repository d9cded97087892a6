use thiserror::Error;

/// Shown to the user for every failure to produce an image, whatever the cause.
pub const GENERIC_IMAGE_ERROR: &str =
    "Could not load an image from this source. Please check the file or URL and try again.";

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("unsupported file type: {0}")]
    UnsupportedExtension(String),
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unknown sample image: {0}")]
    UnknownSample(String),
    #[error("no sample images available")]
    EmptyGallery,
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("image is larger than {limit} bytes")]
    TooLarge { limit: usize },
    #[error("unsupported image format: {0:?}")]
    UnsupportedFormat(image::ImageFormat),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

impl AcquireError {
    pub fn user_message(&self) -> &'static str {
        GENERIC_IMAGE_ERROR
    }
}

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("failed to read samples file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid samples file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sample gallery is empty")]
    Empty,
    #[error("duplicate sample id: {0}")]
    DuplicateId(String),
    #[error("sample {id} has an invalid url: {source}")]
    InvalidSample {
        id: String,
        #[source]
        source: AcquireError,
    },
}
