//! Opening the byte streams behind resource locations

use crate::engine::constants::DEFAULT_HTTP_TIMEOUT_SECS;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::time::Duration;
use url::Url;

/// Opens the resource behind a URL as an owned byte stream
pub trait ResourceLoader: Send + Sync {
    fn open(&self, location: &Url) -> io::Result<Box<dyn Read + Send>>;

    /// The whole resource decoded as UTF-8
    fn read_to_string(&self, location: &Url) -> io::Result<String> {
        let mut text = String::new();
        self.open(location)?.read_to_string(&mut text)?;
        Ok(text)
    }
}

/// `file:` URLs
#[derive(Debug, Clone, Default)]
pub struct FileResourceLoader;

impl ResourceLoader for FileResourceLoader {
    fn open(&self, location: &Url) -> io::Result<Box<dyn Read + Send>> {
        let path = location.to_file_path().map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("{} is not a local file path", location))
        })?;
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

/// `http:` and `https:` URLs, fetched with a blocking client
#[derive(Debug, Clone)]
pub struct HttpResourceLoader {
    timeout: Duration,
}

impl Default for HttpResourceLoader {
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }
}

impl HttpResourceLoader {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl ResourceLoader for HttpResourceLoader {
    fn open(&self, location: &Url) -> io::Result<Box<dyn Read + Send>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(io::Error::other)?;
        let response = client
            .get(location.clone())
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(io::Error::other)?;
        log::debug!("Fetched {} ({})", location, response.status());
        Ok(Box::new(response))
    }
}

/// Routes each location to the loader for its scheme
#[derive(Debug, Clone, Default)]
pub struct DispatchingLoader {
    file: FileResourceLoader,
    http: HttpResourceLoader,
}

impl DispatchingLoader {
    pub fn new(http: HttpResourceLoader) -> Self {
        Self { file: FileResourceLoader, http }
    }

    pub fn http(&self) -> &HttpResourceLoader {
        &self.http
    }
}

impl ResourceLoader for DispatchingLoader {
    fn open(&self, location: &Url) -> io::Result<Box<dyn Read + Send>> {
        match location.scheme() {
            "file" => self.file.open(location),
            "http" | "https" => self.http.open(location),
            other => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("unsupported URL scheme '{}' in {}", other, location),
            )),
        }
    }
}
