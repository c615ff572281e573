//! Data URI encoding of downloaded images.

use base64::{Engine, engine::general_purpose::STANDARD};
use image::ImageFormat;

use peekbox_core::Error;

use crate::fetch::FetchedBody;

/// Encode a fetched image as `data:<mime>;base64,<payload>`.
///
/// The declared `Content-Type` is used when it names an image; otherwise the
/// format is sniffed from the leading bytes.
pub fn to_data_uri(body: &FetchedBody) -> Result<String, Error> {
    if body.bytes.is_empty() {
        return Err(Error::DecodeFailed("empty body".to_string()));
    }

    let mime = declared_image_mime(body.content_type.as_deref())
        .or_else(|| sniff_mime(&body.bytes))
        .ok_or_else(|| {
            Error::DecodeFailed(format!(
                "unrecognised image data (content-type {:?})",
                body.content_type.as_deref().unwrap_or("none")
            ))
        })?;

    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(&body.bytes)))
}

/// Decode the bytes carried by a base64 data URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, Error> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| Error::DecodeFailed("not a data URI".to_string()))?;
    let (meta, data) = rest
        .split_once(',')
        .ok_or_else(|| Error::DecodeFailed("data URI has no payload".to_string()))?;
    if !meta.ends_with(";base64") {
        return Err(Error::DecodeFailed("data URI is not base64".to_string()));
    }
    STANDARD
        .decode(data.trim())
        .map_err(|e| Error::DecodeFailed(format!("invalid base64: {e}")))
}

fn declared_image_mime(content_type: Option<&str>) -> Option<String> {
    let mime = content_type?.split(';').next()?.trim().to_ascii_lowercase();
    mime.starts_with("image/").then_some(mime)
}

fn sniff_mime(bytes: &[u8]) -> Option<String> {
    let format = image::guess_format(bytes).ok()?;
    match format {
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP | ImageFormat::Bmp => {
            Some(format.to_mime_type().to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn body(content_type: Option<&str>, bytes: &'static [u8]) -> FetchedBody {
        FetchedBody { content_type: content_type.map(str::to_string), bytes: Bytes::from_static(bytes) }
    }

    #[test]
    fn test_declared_mime_wins() {
        let uri = to_data_uri(&body(Some("image/jpeg; charset=binary"), b"abc")).unwrap();
        assert_eq!(uri, "data:image/jpeg;base64,YWJj");
    }

    #[test]
    fn test_sniffed_when_header_is_generic() {
        let uri = to_data_uri(&body(Some("application/octet-stream"), PNG_MAGIC)).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_sniffed_gif_without_header() {
        let uri = to_data_uri(&body(None, b"GIF89a\x01\x00\x01\x00")).unwrap();
        assert!(uri.starts_with("data:image/gif;base64,"));
    }

    #[test]
    fn test_html_is_decode_failure() {
        let result = to_data_uri(&body(Some("text/html"), b"<html>not an image</html>"));
        assert!(matches!(result, Err(Error::DecodeFailed(_))));
    }

    #[test]
    fn test_empty_is_decode_failure() {
        let result = to_data_uri(&body(Some("image/png"), b""));
        assert!(matches!(result, Err(Error::DecodeFailed(_))));
    }

    #[test]
    fn test_decode_data_uri() {
        assert_eq!(decode_data_uri("data:image/jpeg;base64,YWJj").unwrap(), b"abc");
        assert!(decode_data_uri("https://i.ibb.co/a.png").is_err());
        assert!(decode_data_uri("data:text/plain,abc").is_err());
        assert!(decode_data_uri("data:image/png;base64,@@@").is_err());
    }
}
