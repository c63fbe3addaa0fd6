use crate::domain::{models::SanitizedAvatar, AvatarProcessingError};

/// Image hardening operations. Both calls work from the raw bytes alone —
/// declared content types and filenames never influence the outcome.
pub trait AvatarProcessor: Send + Sync + 'static {
    /// Structural check that the buffer decodes as a genuine raster image.
    /// Malformed input is the expected case here, not an exceptional one.
    fn validate(&self, input: &[u8]) -> Result<(), AvatarProcessingError>;

    /// Re-encode a validated image into the canonical bounded format,
    /// correcting orientation first and discarding every non-pixel chunk.
    fn transcode(&self, input: &[u8]) -> Result<SanitizedAvatar, AvatarProcessingError>;
}
