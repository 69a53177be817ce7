use crate::error::StreamError;
use std::fmt;

/// Object keys must be strictly shorter than this.
pub const MAX_PATH_LEN: usize = 1024;

/// Kind of media object a route serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Video,
    Thumbnail,
    Preview,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Video,
        ResourceKind::Thumbnail,
        ResourceKind::Preview,
    ];

    /// File extension accepted for this kind (compared case-insensitively)
    pub fn extension(self) -> &'static str {
        match self {
            ResourceKind::Video => "mp4",
            ResourceKind::Thumbnail => "png",
            ResourceKind::Preview => "gif",
        }
    }

    /// Only video playback needs a resource-scoped token
    pub fn requires_resource_token(self) -> bool {
        matches!(self, ResourceKind::Video)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Video => "video",
            ResourceKind::Thumbnail => "thumbnail",
            ResourceKind::Preview => "preview",
        }
    }

    /// Check `path` against the `.*\.<ext>$` pattern of this kind
    pub fn matches(self, path: &str) -> bool {
        path.rsplit_once('.')
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(self.extension()))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated object key for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    kind: ResourceKind,
    key: String,
}

impl ResourcePath {
    pub fn parse(kind: ResourceKind, raw: &str) -> Result<Self, StreamError> {
        if raw.is_empty() || raw.len() >= MAX_PATH_LEN || !kind.matches(raw) {
            return Err(StreamError::PathInvalid);
        }
        // Keys are relative to the store root; no traversal or absolute paths.
        if raw.starts_with('/')
            || raw.contains('\\')
            || raw
                .split('/')
                .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(StreamError::PathInvalid);
        }

        Ok(Self {
            kind,
            key: raw.to_string(),
        })
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// MIME type sent back in `Content-Type`
    pub fn content_type(&self) -> String {
        mime_guess::from_path(&self.key)
            .first_or_octet_stream()
            .to_string()
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
