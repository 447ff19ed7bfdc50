//! Upload sources for the multipart endpoints

use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::Body;
use reqwest::multipart::{Form, Part};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::error::{BotStatError, Result};

/// A file to upload: a filesystem path, or an already-open byte stream.
///
/// Paths are opened for reading when the request is sent; streams are
/// forwarded unchanged. Either way the bytes become the single multipart
/// field named `file`. The file content is opaque to the client (the
/// service accepts csv, one-id-per-line and similar formats).
pub enum UploadFile {
    /// Filesystem path, opened lazily.
    Path(PathBuf),
    /// Already-open readable byte stream.
    Stream(Box<dyn AsyncRead + Send + Sync + Unpin + 'static>),
}

impl UploadFile {
    /// Wrap any readable byte stream.
    pub fn from_reader(reader: impl AsyncRead + Send + Sync + Unpin + 'static) -> Self {
        Self::Stream(Box::new(reader))
    }

    /// Turn the source into the multipart `file` part.
    ///
    /// # Errors
    /// `UnsupportedInput` if a path does not point at a regular file,
    /// `Io` if opening it fails.
    pub(crate) async fn into_part(self) -> Result<Part> {
        match self {
            Self::Path(path) => {
                let meta = tokio::fs::metadata(&path).await?;
                if !meta.is_file() {
                    return Err(BotStatError::UnsupportedInput(format!(
                        "not a regular file: {}",
                        path.display()
                    )));
                }
                let file = tokio::fs::File::open(&path).await?;
                let mut part = Part::stream(Body::wrap_stream(ReaderStream::new(file)));
                if let Some(name) = path.file_name() {
                    part = part.file_name(name.to_string_lossy().into_owned());
                }
                Ok(part)
            }
            Self::Stream(reader) => Ok(Part::stream(Body::wrap_stream(ReaderStream::new(reader)))),
        }
    }

    /// Build the multipart form expected by the upload endpoints.
    pub(crate) async fn into_form(self) -> Result<Form> {
        Ok(Form::new().part("file", self.into_part().await?))
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Stream(_) => f.debug_tuple("Stream").field(&"..").finish(),
        }
    }
}

impl From<&str> for UploadFile {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<String> for UploadFile {
    fn from(path: String) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<&Path> for UploadFile {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for UploadFile {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<tokio::fs::File> for UploadFile {
    fn from(file: tokio::fs::File) -> Self {
        Self::Stream(Box::new(file))
    }
}
