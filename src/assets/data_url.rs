use base64::{engine::general_purpose, Engine as _};

use super::AssetLoadError;

/// Builds a `data:` URL, sniffing the mime type from the image header.
pub fn encode(bytes: &[u8]) -> String {
    let mime = image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");
    format!("data:{mime};base64,{}", general_purpose::STANDARD.encode(bytes))
}

/// Decodes a `data:` URL payload. Only base64 payloads are accepted.
pub fn decode(url: &str) -> Result<Vec<u8>, AssetLoadError> {
    let body = url
        .strip_prefix("data:")
        .ok_or_else(|| invalid("missing data: scheme"))?;
    let (header, payload) = body
        .split_once(',')
        .ok_or_else(|| invalid("missing payload separator"))?;
    if !header.ends_with(";base64") {
        return Err(invalid("payload is not base64"));
    }
    general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|err| invalid(&err.to_string()))
}

fn invalid(reason: &str) -> AssetLoadError {
    AssetLoadError::InvalidDataUrl {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::testing::png_bytes;

    #[test]
    fn encode_tags_png_mime_type() {
        let url = encode(&png_bytes(1, 1, [0, 0, 0, 255]));
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn decode_returns_original_bytes() {
        let bytes = png_bytes(2, 3, [10, 20, 30, 255]);
        assert_eq!(decode(&encode(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn decode_rejects_plain_text_payloads() {
        let err = decode("data:text/plain,hello").unwrap_err();
        assert!(matches!(err, AssetLoadError::InvalidDataUrl { .. }));
        assert!(decode("https://cdn.example/a.png").is_err());
    }
}
