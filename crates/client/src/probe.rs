//! Natural-size probing for the lightbox.

use std::io::Cursor;
use std::sync::Arc;

use image::ImageReader;

use peekbox_core::Error;

use crate::encode::decode_data_uri;
use crate::fetch::{Fetcher, ResponseMode};

/// Loads a full-resolution image far enough to know its size.
#[async_trait::async_trait]
pub trait ImageProbe: Send + Sync {
    /// Natural `(width, height)` of the image at `src`.
    async fn dimensions(&self, src: &str) -> Result<(u32, u32), Error>;
}

/// Reads data URIs in place and fetches everything else.
pub struct HttpImageProbe {
    fetcher: Arc<dyn Fetcher>,
}

impl HttpImageProbe {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait::async_trait]
impl ImageProbe for HttpImageProbe {
    async fn dimensions(&self, src: &str) -> Result<(u32, u32), Error> {
        let bytes = if src.starts_with("data:") {
            decode_data_uri(src)?
        } else {
            self.fetcher.get(src, ResponseMode::Binary).await?.bytes.to_vec()
        };
        read_dimensions(&bytes)
    }
}

/// Image dimensions from encoded bytes, without decoding pixels.
pub fn read_dimensions(bytes: &[u8]) -> Result<(u32, u32), Error> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| Error::DecodeFailed(e.to_string()))?
        .into_dimensions()
        .map_err(|e| Error::DecodeFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockFetcher, png_bytes};
    use base64::{Engine, engine::general_purpose::STANDARD};

    #[test]
    fn test_read_dimensions() {
        assert_eq!(read_dimensions(&png_bytes(640, 480)).unwrap(), (640, 480));
        assert!(matches!(read_dimensions(b"nope"), Err(Error::DecodeFailed(_))));
    }

    #[tokio::test]
    async fn test_data_uri_is_read_locally() {
        let fetcher = Arc::new(MockFetcher::default());
        let probe = HttpImageProbe::new(fetcher.clone());
        let uri = format!("data:image/png;base64,{}", STANDARD.encode(png_bytes(30, 20)));

        assert_eq!(probe.dimensions(&uri).await.unwrap(), (30, 20));
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_url_is_fetched() {
        let url = "https://i.imgur.com/abc.png";
        let fetcher = Arc::new(MockFetcher::default().with(url, "image/png", png_bytes(8, 16)));
        let probe = HttpImageProbe::new(fetcher.clone());

        assert_eq!(probe.dimensions(url).await.unwrap(), (8, 16));
        assert!(probe.dimensions("https://i.imgur.com/missing.png").await.is_err());
    }
}
