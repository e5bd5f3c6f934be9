//! Retrieval of externally referenced schemas

use aep_openapi_common::BoxError;
use reqwest::blocking::ClientBuilder;
use std::fs;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Source of remote schema documents
///
/// The resolver calls this for every `$ref` that is an absolute URL. The
/// returned bytes are parsed as JSON, with YAML as a fallback.
#[cfg_attr(test, mockall::automock)]
pub trait SchemaFetcher {
    /// Fetch the raw document at `location`, giving up after `timeout`
    fn fetch(&self, location: &Url, timeout: Option<Duration>) -> Result<Vec<u8>, BoxError>;
}

/// Default fetcher: `http`/`https` over a blocking client, `file` from disk
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFetcher;

impl SchemaFetcher for HttpFetcher {
    fn fetch(&self, location: &Url, timeout: Option<Duration>) -> Result<Vec<u8>, BoxError> {
        match location.scheme() {
            "file" => {
                let path = location
                    .to_file_path()
                    .map_err(|_| format!("invalid file URL {}", location))?;
                debug!("reading schema from {}", path.display());
                Ok(fs::read(path)?)
            }
            "http" | "https" => {
                let mut builder = ClientBuilder::new();
                if let Some(timeout) = timeout {
                    builder = builder.timeout(timeout);
                }
                let client = builder.build()?;
                debug!("fetching schema from {}", location);
                let response = client.get(location.clone()).send()?.error_for_status()?;
                Ok(response.bytes()?.to_vec())
            }
            other => Err(format!("unsupported URL scheme {:?}", other).into()),
        }
    }
}
