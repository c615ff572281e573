//! In-memory fakes shared by the client tests.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;

use bytes::Bytes;
use image::{ImageBuffer, ImageFormat, Rgb};
use peekbox_core::Error;

use crate::fetch::{FetchedBody, Fetcher, ResponseMode};

/// PNG bytes of a solid image of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(width, height, Rgb([200, 40, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Serves canned bodies by URL and records every request.
#[derive(Default)]
pub struct MockFetcher {
    responses: HashMap<String, FetchedBody>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn with(mut self, url: &str, content_type: &str, bytes: impl Into<Bytes>) -> Self {
        self.responses.insert(
            url.to_string(),
            FetchedBody { content_type: Some(content_type.to_string()), bytes: bytes.into() },
        );
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Fetcher for MockFetcher {
    async fn get(&self, url: &str, _mode: ResponseMode) -> Result<FetchedBody, Error> {
        self.requests.lock().unwrap().push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| Error::HttpError(format!("status 404 for {url}")))
    }
}
