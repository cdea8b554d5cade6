//! Incoming upload: a filename, its declared length and a byte stream.

use std::io::Cursor;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncRead;

use crate::error::{MergerError, Result};

/// One uploaded document awaiting admission.
#[derive(Debug)]
pub struct Upload<R> {
    filename: String,
    len: u64,
    content: R,
}

impl<R> Upload<R>
where
    R: AsyncRead + Unpin,
{
    /// Wrap a stream of `len` bytes uploaded as `filename`.
    pub fn new(filename: impl Into<String>, len: u64, content: R) -> Self {
        Self {
            filename: filename.into(),
            len,
            content,
        }
    }

    /// Filename as supplied by the uploader.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Declared content length.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the declared content length is zero.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn into_parts(self) -> (String, u64, R) {
        (self.filename, self.len, self.content)
    }
}

impl Upload<Cursor<Vec<u8>>> {
    /// Upload held entirely in memory.
    pub fn from_bytes(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        Self::new(filename, bytes.len() as u64, Cursor::new(bytes))
    }
}

impl Upload<File> {
    /// Upload read from a local file, named after its final path component.
    ///
    /// A name that is not valid UTF-8 is refused with
    /// [`MergerError::InvalidFormat`] rather than renamed.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .ok_or_else(|| MergerError::other(format!("Not a file: {}", path.display())))?;
        let filename = name
            .to_str()
            .map(str::to_owned)
            .ok_or_else(|| MergerError::InvalidFormat {
                filename: name.to_string_lossy().into_owned(),
            })?;

        let file = File::open(path)
            .await
            .map_err(|e| MergerError::storage(path, e))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| MergerError::storage(path, e))?
            .len();

        Ok(Self::new(filename, len, file))
    }
}
