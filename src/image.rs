use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::StudioError;

pub const OUTPUT_MIME_TYPE: &str = "image/png";

static DATA_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:(image/[A-Za-z0-9_]+);base64,([^\n\r\x{2028}\x{2029}]+)$")
        .expect("data URL pattern is valid")
});

/// An image carried as `data:<mime>;base64,<payload>`. The payload is kept
/// encoded; only the MIME type and payload are ever split out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    mime_type: String,
    data: String,
}

impl EncodedImage {
    pub fn parse(value: &str) -> Result<Self, StudioError> {
        let captures = DATA_URL_PATTERN
            .captures(value)
            .ok_or(StudioError::InputFormat)?;
        Ok(EncodedImage {
            mime_type: captures[1].to_string(),
            data: captures[2].to_string(),
        })
    }

    /// Wraps a payload returned by the backend. Output images are always
    /// labelled PNG regardless of what the backend reports.
    pub fn from_backend_payload(data: &str) -> Self {
        EncodedImage {
            mime_type: OUTPUT_MIME_TYPE.to_string(),
            data: data.to_string(),
        }
    }

    /// Builds an image from raw upload bytes, sniffing the MIME type.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StudioError> {
        let mime_type = detect_image_mime_type(bytes).ok_or(StudioError::InputFormat)?;
        let encoded = general_purpose::STANDARD.encode(bytes);
        EncodedImage::parse(&format!("data:{mime_type};base64,{encoded}"))
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn decode_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        general_purpose::STANDARD.decode(&self.data)
    }
}

impl fmt::Display for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.data)
    }
}

impl FromStr for EncodedImage {
    type Err = StudioError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        EncodedImage::parse(value)
    }
}

pub fn detect_image_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| normalize_image_mime_type(kind.mime_type()))
}

fn normalize_image_mime_type(mime_type: &str) -> String {
    let lowered = mime_type.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "image/jpg" => "image/jpeg".to_string(),
        _ => lowered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 16] = [
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52,
    ];

    #[test]
    fn reassembling_parsed_parts_reproduces_the_input() {
        for input in [
            "data:image/png;base64,iVBORw0KGgo=",
            "data:image/jpeg;base64,/9j/4AAQSkZJRg==",
            "data:image/webp;base64,UklGRg;base64,odd",
        ] {
            let image = EncodedImage::parse(input).unwrap();
            let rebuilt = format!("data:{};base64,{}", image.mime_type(), image.data());
            assert_eq!(rebuilt, input);
            assert_eq!(image.to_string(), input);
        }
    }

    #[test]
    fn splits_mime_type_and_payload() {
        let image = EncodedImage::parse("data:image/jpeg;base64,abc123").unwrap();
        assert_eq!(image.mime_type(), "image/jpeg");
        assert_eq!(image.data(), "abc123");
    }

    #[test]
    fn rejects_malformed_data_urls() {
        for input in [
            "",
            "image/png;base64,abc",
            "data:image/png,abc",
            "data:image/png;base64,",
            "data:text/plain;base64,abc",
            "data:image/svg+xml;base64,abc",
            " data:image/png;base64,abc",
            "data:image/p\u{f1}g;base64,abc",
            "data:image/png;base64,abc\r",
            "data:image/png;base64,abc\ndef",
            "data:image/png;base64,abc\u{2028}",
        ] {
            assert_eq!(
                EncodedImage::parse(input),
                Err(StudioError::InputFormat),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn backend_payload_is_labelled_png() {
        let image = EncodedImage::from_backend_payload("Zm9v");
        assert_eq!(image.to_string(), "data:image/png;base64,Zm9v");
    }

    #[test]
    fn from_bytes_sniffs_png_and_rejects_non_images() {
        let image = EncodedImage::from_bytes(&PNG_HEADER).unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.decode_bytes().unwrap(), PNG_HEADER.to_vec());

        assert_eq!(
            EncodedImage::from_bytes(b"just some text, not an image"),
            Err(StudioError::InputFormat)
        );
    }
}
