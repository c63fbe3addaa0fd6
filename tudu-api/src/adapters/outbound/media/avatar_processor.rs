use std::io::Cursor;

use image::{imageops::FilterType, DynamicImage};

use crate::domain::{
    models::SanitizedAvatar, ports::outbound::AvatarProcessor, AvatarProcessingError,
};

/// Avatar hardening backed by full re-encoding: every accepted upload leaves
/// as a freshly encoded WebP with bounded dimensions, so nothing embedded in
/// the source container survives.
pub struct WebpAvatarProcessor {
    bounding: u32,
    quality: f32,
}

impl Default for WebpAvatarProcessor {
    fn default() -> Self {
        Self {
            bounding: 512,
            quality: 80.0,
        }
    }
}

impl WebpAvatarProcessor {
    pub fn new(bounding: u32, quality: f32) -> Self {
        Self { bounding, quality }
    }

    /// EXIF orientation values 2-8 encode flips and rotations that viewers
    /// apply at display time. Re-encoding drops the tag, so the pixels have
    /// to be transformed up front or the avatar ends up sideways.
    fn apply_orientation(img: DynamicImage, input: &[u8]) -> DynamicImage {
        let orientation = exif::Reader::new()
            .read_from_container(&mut Cursor::new(input))
            .ok()
            .and_then(|data| {
                data.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
                    .and_then(|field| field.value.get_uint(0))
            })
            .unwrap_or(1);

        match orientation {
            2 => img.fliph(),
            3 => img.rotate180(),
            4 => img.flipv(),
            5 => img.rotate90().fliph(),
            6 => img.rotate90(),
            7 => img.rotate270().fliph(),
            8 => img.rotate270(),
            _ => img,
        }
    }
}

impl AvatarProcessor for WebpAvatarProcessor {
    fn validate(&self, input: &[u8]) -> Result<(), AvatarProcessingError> {
        // Decode for real instead of sniffing magic numbers: a polyglot file
        // with an image header and a corrupt body fails here.
        image::load_from_memory(input)
            .map(|_| ())
            .map_err(|err| AvatarProcessingError::Invalid(err.to_string()))
    }

    fn transcode(&self, input: &[u8]) -> Result<SanitizedAvatar, AvatarProcessingError> {
        let decoded = image::load_from_memory(input)
            .map_err(|err| AvatarProcessingError::Invalid(err.to_string()))?;

        let oriented = Self::apply_orientation(decoded, input);

        let (width, height) = (oriented.width(), oriented.height());
        if width == 0 || height == 0 {
            return Err(AvatarProcessingError::Transcode(
                "image has a zero dimension".to_string(),
            ));
        }

        // Cover the bounding box without enlarging: images that fit keep
        // their size, oversized ones are downscaled and cropped to fill.
        let resized = if width > self.bounding || height > self.bounding {
            oriented.resize_to_fill(
                self.bounding.min(width),
                self.bounding.min(height),
                FilterType::Lanczos3,
            )
        } else {
            oriented
        };

        let rgba = resized.to_rgba8();
        let (out_width, out_height) = rgba.dimensions();

        let encoder = webp::Encoder::from_rgba(&rgba, out_width, out_height);
        let bytes = encoder.encode(self.quality).to_vec();

        Ok(SanitizedAvatar::new(bytes, out_width, out_height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([120, 80, 40])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    /// Splice a COM (comment) segment right after SOI. Decoders skip it, so
    /// the file stays a structurally valid JPEG carrying a payload.
    fn with_jpeg_comment(jpeg: &[u8], comment: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(jpeg.len() + comment.len() + 4);
        out.extend_from_slice(&jpeg[..2]);
        out.extend_from_slice(&[0xFF, 0xFE]);
        let len = (comment.len() + 2) as u16;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(comment);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    /// Splice an APP1 segment carrying a minimal little-endian TIFF whose
    /// only IFD entry is the orientation tag.
    fn with_exif_orientation(jpeg: &[u8], orientation: u16) -> Vec<u8> {
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"II");
        tiff.extend_from_slice(&42u16.to_le_bytes());
        tiff.extend_from_slice(&8u32.to_le_bytes());
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&0x0112u16.to_le_bytes());
        tiff.extend_from_slice(&3u16.to_le_bytes());
        tiff.extend_from_slice(&1u32.to_le_bytes());
        tiff.extend_from_slice(&orientation.to_le_bytes());
        tiff.extend_from_slice(&[0, 0]);
        tiff.extend_from_slice(&0u32.to_le_bytes());

        let mut payload = b"Exif\0\0".to_vec();
        payload.extend_from_slice(&tiff);

        let mut out = Vec::with_capacity(jpeg.len() + payload.len() + 4);
        out.extend_from_slice(&jpeg[..2]);
        out.extend_from_slice(&[0xFF, 0xE1]);
        let len = (payload.len() + 2) as u16;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&payload);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let processor = WebpAvatarProcessor::default();

        assert!(processor.validate(b"#!/bin/sh\nrm -rf /\n").is_err());
        assert!(processor.validate(&[]).is_err());
    }

    #[test]
    fn image_magic_with_corrupt_body_is_rejected() {
        let processor = WebpAvatarProcessor::default();

        // PNG signature followed by junk: right magic number, not an image.
        let mut polyglot = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        polyglot.extend_from_slice(b"<?php system($_GET['cmd']); ?>");

        assert!(processor.validate(&polyglot).is_err());
    }

    #[test]
    fn real_images_pass_validation() {
        let processor = WebpAvatarProcessor::default();

        assert!(processor.validate(&encoded(4, 4, ImageFormat::Png)).is_ok());
        assert!(processor
            .validate(&encoded(4, 4, ImageFormat::Jpeg))
            .is_ok());
    }

    #[test]
    fn small_images_are_not_upscaled() {
        let processor = WebpAvatarProcessor::default();

        let avatar = processor
            .transcode(&encoded(64, 32, ImageFormat::Png))
            .unwrap();

        assert_eq!((avatar.width, avatar.height), (64, 32));
    }

    #[test]
    fn oversized_images_are_cropped_to_the_bounding_box() {
        let processor = WebpAvatarProcessor::default();

        let avatar = processor
            .transcode(&encoded(1024, 768, ImageFormat::Png))
            .unwrap();

        assert_eq!((avatar.width, avatar.height), (512, 512));
    }

    #[test]
    fn output_is_webp() {
        let processor = WebpAvatarProcessor::default();

        let avatar = processor
            .transcode(&encoded(16, 16, ImageFormat::Jpeg))
            .unwrap();

        assert_eq!(&avatar.bytes[..4], b"RIFF");
        assert_eq!(&avatar.bytes[8..12], b"WEBP");
    }

    #[test]
    fn embedded_payload_does_not_survive_transcoding() {
        let processor = WebpAvatarProcessor::default();
        let marker = b"gps-coordinates-marker-51a9";

        let tagged = with_jpeg_comment(&encoded(32, 32, ImageFormat::Jpeg), marker);
        assert!(contains(&tagged, marker));
        assert!(processor.validate(&tagged).is_ok());

        let avatar = processor.transcode(&tagged).unwrap();
        assert!(!contains(&avatar.bytes, marker));
    }

    #[test]
    fn exif_orientation_is_applied_before_stripping() {
        let processor = WebpAvatarProcessor::default();

        // Orientation 6 means "rotate 90° clockwise to display", so the
        // transcoded pixels must come out with swapped dimensions.
        let rotated = with_exif_orientation(&encoded(8, 4, ImageFormat::Jpeg), 6);
        let avatar = processor.transcode(&rotated).unwrap();

        assert_eq!((avatar.width, avatar.height), (4, 8));
    }

    #[test]
    fn orientation_one_leaves_dimensions_alone() {
        let processor = WebpAvatarProcessor::default();

        let upright = with_exif_orientation(&encoded(8, 4, ImageFormat::Jpeg), 1);
        let avatar = processor.transcode(&upright).unwrap();

        assert_eq!((avatar.width, avatar.height), (8, 4));
    }
}
