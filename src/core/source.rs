use crate::utils::error::{DataError, Result};
use futures::TryStreamExt;
use reqwest::Client;
use std::fmt;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::pin::Pin;
use tokio::io::AsyncRead;
use tokio_util::io::{StreamReader, SyncIoBridge};
use url::Url;

/// Async byte stream positioned at the start of an HTTP response body.
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Where a parse task reads its bytes from.
pub enum Source {
    Url(Url),
    File(PathBuf),
    Bytes(Vec<u8>),
    Reader(Box<dyn Read + Send>),
}

impl Source {
    /// Interprets `location` as a URL when it has an http(s) scheme, otherwise as a path.
    pub fn from_location(location: &str) -> Result<Self> {
        if location.starts_with("http://") || location.starts_with("https://") {
            let url = Url::parse(location).map_err(|e| DataError::InvalidConfigValueError {
                field: "source".to_string(),
                value: location.to_string(),
                reason: format!("Invalid URL format: {}", e),
            })?;
            Ok(Source::Url(url))
        } else {
            Ok(Source::File(PathBuf::from(location)))
        }
    }

    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Source::Reader(Box::new(reader))
    }

    /// Opens the source as a blocking reader.
    ///
    /// Must be called from inside a tokio runtime; the returned reader must
    /// then be consumed on a blocking thread. URL sources without a `client`
    /// get a default one built on the spot.
    pub async fn open(self, client: Option<&Client>) -> Result<Box<dyn Read + Send>> {
        match self {
            Source::Url(url) => {
                let stream = match client {
                    Some(client) => source_to_stream(client, &url).await?,
                    None => source_to_stream(&Client::builder().build()?, &url).await?,
                };
                Ok(Box::new(SyncIoBridge::new(stream)))
            }
            Source::File(path) => {
                tracing::debug!(path = %path.display(), "Opening source file");
                let file = tokio::fs::File::open(&path).await?;
                Ok(Box::new(file.into_std().await))
            }
            Source::Bytes(bytes) => Ok(Box::new(Cursor::new(bytes))),
            Source::Reader(reader) => Ok(reader),
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => f.debug_tuple("Url").field(&url.as_str()).finish(),
            Source::File(path) => f.debug_tuple("File").field(path).finish(),
            Source::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Source::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<Url> for Source {
    fn from(url: Url) -> Self {
        Source::Url(url)
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::File(path)
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Source::Bytes(bytes)
    }
}

impl From<&str> for Source {
    fn from(text: &str) -> Self {
        Source::Bytes(text.as_bytes().to_vec())
    }
}

/// Issues a GET to `url` and returns the response body as a byte stream.
pub async fn source_to_stream(client: &Client, url: &Url) -> Result<ByteStream> {
    tracing::debug!("Making HTTP request to: {}", url);
    let response = client.get(url.clone()).send().await?;

    tracing::debug!("HTTP response status: {}", response.status());

    if !response.status().is_success() {
        return Err(DataError::HttpStatusError {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let body = response.bytes_stream().map_err(std::io::Error::other);
    Ok(Box::pin(StreamReader::new(body)))
}
