use bytes::Bytes;
use serde::Serialize;
use std::fmt;

/// Where the image of a single request comes from.
#[derive(Clone)]
pub enum ImageSource {
    Upload { file_name: String, bytes: Bytes },
    Url(String),
    Sample(String),
    RandomSample,
}

impl ImageSource {
    pub fn kind(&self) -> &'static str {
        match self {
            ImageSource::Upload { .. } => "upload",
            ImageSource::Url(_) => "url",
            ImageSource::Sample(_) => "sample",
            ImageSource::RandomSample => "random",
        }
    }
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Upload { file_name, bytes } => f
                .debug_struct("Upload")
                .field("file_name", file_name)
                .field("len", &bytes.len())
                .finish(),
            ImageSource::Url(url) => f.debug_tuple("Url").field(url).finish(),
            ImageSource::Sample(id) => f.debug_tuple("Sample").field(id).finish(),
            ImageSource::RandomSample => f.write_str("RandomSample"),
        }
    }
}

/// Every source a form may carry at once. Blank fields count as absent.
#[derive(Debug, Clone, Default)]
pub struct SourceCandidates {
    pub upload: Option<(String, Bytes)>,
    pub url: Option<String>,
    pub sample: Option<String>,
    pub random: bool,
}

impl SourceCandidates {
    /// Pick the single winning source: upload, then typed URL, then selected
    /// sample, then random sample.
    pub fn resolve(self) -> Option<ImageSource> {
        let mut present = vec![];

        if let Some((file_name, bytes)) = self.upload {
            if !file_name.trim().is_empty() && !bytes.is_empty() {
                present.push(ImageSource::Upload { file_name, bytes });
            }
        }
        if let Some(url) = non_blank(self.url) {
            present.push(ImageSource::Url(url));
        }
        if let Some(sample) = non_blank(self.sample) {
            present.push(ImageSource::Sample(sample));
        }
        if self.random {
            present.push(ImageSource::RandomSample);
        }

        let mut present = present.into_iter();
        let winner = present.next()?;
        for ignored in present {
            tracing::debug!(
                "image source {} wins, ignoring {}",
                winner.kind(),
                ignored.kind()
            );
        }

        Some(winner)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageOrigin {
    Upload { file_name: String },
    Url { url: String },
    Sample { id: String, title: String, url: String },
}

impl fmt::Display for ImageOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageOrigin::Upload { file_name } => write!(f, "Uploaded image ({})", file_name),
            ImageOrigin::Url { url } => write!(f, "Image from {}", url),
            ImageOrigin::Sample { title, .. } => write!(f, "Sample image: {}", title),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn upload() -> Option<(String, Bytes)> {
        Some(("cat.png".to_string(), Bytes::from_static(b"png")))
    }

    #[test]
    fn test_upload_wins_over_everything() {
        let candidates = SourceCandidates {
            upload: upload(),
            url: Some("https://example.com/dog.jpg".to_string()),
            sample: Some("parrots".to_string()),
            random: true,
        };
        assert!(matches!(
            candidates.resolve(),
            Some(ImageSource::Upload { file_name, .. }) if file_name == "cat.png"
        ));
    }

    #[test]
    fn test_url_wins_over_samples() {
        let candidates = SourceCandidates {
            upload: None,
            url: Some("  https://example.com/dog.jpg ".to_string()),
            sample: Some("parrots".to_string()),
            random: true,
        };
        assert!(matches!(
            candidates.resolve(),
            Some(ImageSource::Url(url)) if url == "https://example.com/dog.jpg"
        ));
    }

    #[test]
    fn test_sample_wins_over_random() {
        let candidates = SourceCandidates {
            sample: Some("parrots".to_string()),
            random: true,
            ..Default::default()
        };
        assert!(matches!(
            candidates.resolve(),
            Some(ImageSource::Sample(id)) if id == "parrots"
        ));

        let candidates = SourceCandidates {
            random: true,
            ..Default::default()
        };
        assert!(matches!(candidates.resolve(), Some(ImageSource::RandomSample)));
    }

    #[test]
    fn test_blank_fields_are_absent() {
        // what a browser submits when nothing was filled in
        let candidates = SourceCandidates {
            upload: Some((String::new(), Bytes::new())),
            url: Some("   ".to_string()),
            sample: Some(String::new()),
            random: false,
        };
        assert!(candidates.resolve().is_none());

        let candidates = SourceCandidates {
            upload: Some(("empty.png".to_string(), Bytes::new())),
            sample: Some("parrots".to_string()),
            ..Default::default()
        };
        assert!(matches!(candidates.resolve(), Some(ImageSource::Sample(_))));
    }

    #[test]
    fn test_origin_display() {
        let origin = ImageOrigin::Sample {
            id: "parrots".to_string(),
            title: "Parrots".to_string(),
            url: "https://example.com/parrots.png".to_string(),
        };
        assert_eq!(origin.to_string(), "Sample image: Parrots");
    }
}
