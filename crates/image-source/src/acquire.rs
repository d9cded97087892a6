use crate::{
    decode_image, is_supported_extension, validate_url, AcquireError, ImageFetcher, ImageOrigin,
    ImageSource, SampleGallery, SampleImage,
};
use image::RgbImage;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct AcquiredImage {
    pub image: RgbImage,
    pub origin: ImageOrigin,
}

/// Turns an [`ImageSource`] into an RGB image.
#[derive(Debug, Clone)]
pub struct ImageAcquirer {
    fetcher: ImageFetcher,
    gallery: Arc<SampleGallery>,
}

impl ImageAcquirer {
    pub fn new(fetcher: ImageFetcher, gallery: SampleGallery) -> Self {
        Self {
            fetcher,
            gallery: Arc::new(gallery),
        }
    }

    pub fn gallery(&self) -> &SampleGallery {
        &self.gallery
    }

    #[tracing::instrument(name = "ImageAcquirer::acquire", skip_all, fields(source = source.kind()))]
    pub async fn acquire(&self, source: ImageSource) -> Result<AcquiredImage, AcquireError> {
        let result = match source {
            ImageSource::Upload { file_name, bytes } => {
                if !is_supported_extension(&file_name) {
                    Err(AcquireError::UnsupportedExtension(file_name))
                } else if bytes.len() > self.fetcher.max_bytes() {
                    Err(AcquireError::TooLarge {
                        limit: self.fetcher.max_bytes(),
                    })
                } else {
                    decode_image(&bytes).map(|image| AcquiredImage {
                        image,
                        origin: ImageOrigin::Upload { file_name },
                    })
                }
            }
            ImageSource::Url(raw) => match validate_url(&raw) {
                Ok(url) => {
                    let origin = ImageOrigin::Url {
                        url: url.to_string(),
                    };
                    self.fetch_and_decode(&url, origin).await
                }
                Err(e) => Err(e),
            },
            ImageSource::Sample(id) => match self.gallery.get(&id) {
                Some(sample) => self.acquire_sample(sample.clone()).await,
                None => Err(AcquireError::UnknownSample(id)),
            },
            ImageSource::RandomSample => {
                let sample = self.gallery.random(&mut rand::thread_rng()).cloned();
                match sample {
                    Some(sample) => {
                        debug!("random sample picked: {}", sample.id);
                        self.acquire_sample(sample).await
                    }
                    None => Err(AcquireError::EmptyGallery),
                }
            }
        };

        match &result {
            Ok(acquired) => debug!(
                "acquired {}x{} image: {}",
                acquired.image.width(),
                acquired.image.height(),
                acquired.origin
            ),
            Err(e) => warn!("failed to acquire image: {}", e),
        }

        result
    }

    async fn acquire_sample(&self, sample: SampleImage) -> Result<AcquiredImage, AcquireError> {
        let url = validate_url(&sample.url)?;
        let origin = ImageOrigin::Sample {
            id: sample.id,
            title: sample.title,
            url: sample.url,
        };
        self.fetch_and_decode(&url, origin).await
    }

    async fn fetch_and_decode(
        &self,
        url: &url::Url,
        origin: ImageOrigin,
    ) -> Result<AcquiredImage, AcquireError> {
        let bytes = self.fetcher.fetch(url).await?;
        let image = decode_image(&bytes)?;
        Ok(AcquiredImage { image, origin })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{SampleImage, SourceCandidates};
    use axum::{routing::get, Router};
    use bytes::Bytes;
    use image::{DynamicImage, ImageFormat, Rgb};
    use std::io::Cursor;
    use std::time::Duration;

    const MAX_BYTES: usize = 64 * 1024;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([30, 60, 90]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    /// Serve a few fixed responses on a random local port, returning the base url.
    async fn serve() -> String {
        let png = png_bytes(5, 7);
        let app = Router::new()
            .route(
                "/cat.png",
                get(move || {
                    let png = png.clone();
                    async move { png }
                }),
            )
            .route("/broken.jpg", get(|| async { "these are not jpeg bytes" }))
            .route("/huge.png", get(|| async { vec![0u8; MAX_BYTES + 1] }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }

    fn acquirer(base: &str) -> ImageAcquirer {
        let gallery = SampleGallery::new(vec![SampleImage {
            id: "cat".to_string(),
            title: "Local cat".to_string(),
            url: format!("{}/cat.png", base),
        }])
        .unwrap();
        ImageAcquirer::new(ImageFetcher::new(Duration::from_secs(5), MAX_BYTES).unwrap(), gallery)
    }

    #[test_log::test(tokio::test)]
    async fn test_acquire_upload() {
        let acquirer = acquirer("http://127.0.0.1:9");

        let acquired = acquirer
            .acquire(ImageSource::Upload {
                file_name: "photo.PNG".to_string(),
                bytes: Bytes::from(png_bytes(3, 2)),
            })
            .await
            .unwrap();
        assert_eq!(acquired.image.dimensions(), (3, 2));
        assert_eq!(
            acquired.origin,
            ImageOrigin::Upload {
                file_name: "photo.PNG".to_string()
            }
        );

        let result = acquirer
            .acquire(ImageSource::Upload {
                file_name: "photo.gif".to_string(),
                bytes: Bytes::from(png_bytes(3, 2)),
            })
            .await;
        assert!(matches!(result, Err(AcquireError::UnsupportedExtension(_))));

        let result = acquirer
            .acquire(ImageSource::Upload {
                file_name: "photo.jpg".to_string(),
                bytes: Bytes::from_static(b"garbage"),
            })
            .await;
        assert!(matches!(result, Err(AcquireError::Decode(_))));
    }

    #[test_log::test(tokio::test)]
    async fn test_acquire_url() {
        let base = serve().await;
        let acquirer = acquirer(&base);

        let acquired = acquirer
            .acquire(ImageSource::Url(format!("{}/cat.png", base)))
            .await
            .unwrap();
        assert_eq!(acquired.image.dimensions(), (5, 7));
        assert_eq!(acquired.image.get_pixel(0, 0), &Rgb([30, 60, 90]));

        let broken = acquirer
            .acquire(ImageSource::Url(format!("{}/broken.jpg", base)))
            .await;
        assert!(matches!(broken, Err(AcquireError::Decode(_))));

        let missing = acquirer
            .acquire(ImageSource::Url(format!("{}/missing.png", base)))
            .await;
        assert!(matches!(missing, Err(AcquireError::Status { .. })));

        let huge = acquirer
            .acquire(ImageSource::Url(format!("{}/huge.png", base)))
            .await;
        assert!(matches!(huge, Err(AcquireError::TooLarge { .. })));
    }

    #[test_log::test(tokio::test)]
    async fn test_refuse_url_without_image_extension() {
        let acquirer = acquirer("http://127.0.0.1:9");

        // nothing listens on port 9; a refusal proves no fetch was attempted
        let result = acquirer
            .acquire(ImageSource::Url("http://127.0.0.1:9/index.html".to_string()))
            .await;
        assert!(matches!(result, Err(AcquireError::UnsupportedExtension(_))));

        let result = acquirer
            .acquire(ImageSource::Url("http://127.0.0.1:9/cat.png".to_string()))
            .await;
        assert!(matches!(result, Err(AcquireError::Fetch { .. })));
    }

    #[test_log::test(tokio::test)]
    async fn test_acquire_samples() {
        let base = serve().await;
        let acquirer = acquirer(&base);

        let acquired = acquirer
            .acquire(ImageSource::Sample("cat".to_string()))
            .await
            .unwrap();
        assert!(matches!(acquired.origin, ImageOrigin::Sample { ref id, .. } if id == "cat"));

        let acquired = acquirer.acquire(ImageSource::RandomSample).await.unwrap();
        assert_eq!(acquired.image.dimensions(), (5, 7));

        let unknown = acquirer.acquire(ImageSource::Sample("dog".to_string())).await;
        assert!(matches!(unknown, Err(AcquireError::UnknownSample(_))));
    }

    #[test_log::test(tokio::test)]
    async fn test_resolved_candidates_end_to_end() {
        let base = serve().await;
        let acquirer = acquirer(&base);

        let source = SourceCandidates {
            upload: None,
            url: Some(format!("{}/cat.png", base)),
            sample: Some("dog".to_string()),
            random: true,
        }
        .resolve()
        .unwrap();

        let acquired = acquirer.acquire(source).await.unwrap();
        assert!(matches!(acquired.origin, ImageOrigin::Url { .. }));
    }
}
