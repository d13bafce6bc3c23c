/// A finite, fully-buffered video clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoBlob {
    pub bytes: Vec<u8>,
    pub mimetype: String,
}

impl VideoBlob {
    pub fn new(bytes: Vec<u8>, mimetype: impl Into<String>) -> Self {
        Self {
            bytes,
            mimetype: mimetype.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A single still image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub bytes: Vec<u8>,
    pub mimetype: String,
}

impl ImageBlob {
    pub fn new(bytes: Vec<u8>, mimetype: impl Into<String>) -> Self {
        Self {
            bytes,
            mimetype: mimetype.into(),
        }
    }
}
