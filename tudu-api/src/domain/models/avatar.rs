use std::collections::HashSet;

use super::AssetId;

/// A raw upload as it arrived from the client. The declared content type and
/// filename are untrusted hints — only the bytes count. Lives for the
/// duration of a single request.
#[derive(Debug)]
pub struct UploadCandidate {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub filename: Option<String>,
}

impl UploadCandidate {
    pub fn new(bytes: Vec<u8>, content_type: Option<String>, filename: Option<String>) -> Self {
        Self {
            bytes,
            content_type,
            filename,
        }
    }
}

/// The result of re-encoding an upload into the canonical avatar format:
/// a WebP buffer with bounded dimensions and no metadata carried over from
/// the source. Transient input to the blob store upload, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedAvatar {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl SanitizedAvatar {
    pub fn new(bytes: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            bytes,
            width,
            height,
        }
    }
}

/// A blob the remote store has accepted. `asset_id` is the handle for later
/// deletion; `url` is what gets served to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAsset {
    pub url: String,
    pub asset_id: AssetId,
}

impl RemoteAsset {
    pub fn new(url: impl Into<String>, asset_id: impl Into<AssetId>) -> Self {
        Self {
            url: url.into(),
            asset_id: asset_id.into(),
        }
    }
}

/// Asset ids shared across users (stock avatars). The update workflow must
/// never submit these for deletion, regardless of what the old/new
/// comparison says.
#[derive(Debug, Clone, Default)]
pub struct DefaultAvatars(HashSet<AssetId>);

impl DefaultAvatars {
    pub fn new(ids: impl IntoIterator<Item = impl Into<AssetId>>) -> Self {
        Self(ids.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.0.contains(id)
    }
}
