//! OpenAPI document loader

use crate::fetch::{HttpFetcher, SchemaFetcher};
use aep_openapi_common::openapi::OpenApiDocument;
use aep_openapi_common::{Api, ApiError, ConvertOptions, Result};
use std::fs;
use std::path::Path;
use std::time::Instant;

/// OpenAPI document parser
///
/// Reads OpenAPI 3.x or Swagger 2.0 documents, in JSON or YAML, and infers
/// the resource model they describe.
pub struct OpenApiParser {
    /// Loaded document
    document: OpenApiDocument,

    /// Prefix, server override and deadline
    options: ConvertOptions,

    /// Source of externally referenced schemas
    fetcher: Box<dyn SchemaFetcher>,
}

impl OpenApiParser {
    /// Load a document from a file. `.yaml`/`.yml` files are read as YAML,
    /// anything else as JSON.
    ///
    /// # Example
    /// ```rust,ignore
    /// let api = OpenApiParser::from_file("bookstore.yaml")?
    ///     .with_path_prefix("/v1")
    ///     .parse()?;
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ApiError::Parse(format!(
                "Failed to read OpenAPI file {}: {}",
                path.display(),
                e
            ))
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    /// Parse a document from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let document: OpenApiDocument = serde_json::from_str(json)
            .map_err(|e| ApiError::Parse(format!("Failed to parse OpenAPI JSON: {}", e)))?;
        Ok(Self::from_document(document))
    }

    /// Parse a document from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml)
            .map_err(|e| ApiError::Parse(format!("Failed to parse OpenAPI YAML: {}", e)))?;
        // Round-trip through JSON so numeric keys such as `200:` become strings
        let json = serde_json::to_value(value)
            .map_err(|e| ApiError::Parse(format!("Failed to parse OpenAPI YAML: {}", e)))?;
        let document: OpenApiDocument = serde_json::from_value(json)
            .map_err(|e| ApiError::Parse(format!("Failed to parse OpenAPI YAML: {}", e)))?;
        Ok(Self::from_document(document))
    }

    /// Wrap an already parsed document
    pub fn from_document(document: OpenApiDocument) -> Self {
        Self {
            document,
            options: ConvertOptions::default(),
            fetcher: Box::new(HttpFetcher),
        }
    }

    /// Only paths under this prefix are considered; it is stripped before
    /// classification and appended to the document's server URL
    pub fn with_path_prefix(mut self, prefix: &str) -> Self {
        self.options.path_prefix = prefix.to_string();
        self
    }

    /// Use this server URL instead of the document's first server
    pub fn with_server_url(mut self, server_url: &str) -> Self {
        self.options.server_url = server_url.to_string();
        self
    }

    /// Give up once `deadline` has passed
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.options.deadline = Some(deadline);
        self
    }

    /// Replace all options at once
    pub fn with_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }

    /// Fetch remote `$ref`s through `fetcher`
    pub fn with_fetcher(mut self, fetcher: Box<dyn SchemaFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Infer the resource model
    pub fn parse(&self) -> Result<Api> {
        super::converter::convert_openapi_to_api(
            &self.document,
            self.fetcher.as_ref(),
            &self.options,
        )
    }

    /// Get reference to the underlying document
    pub fn document(&self) -> &OpenApiDocument {
        &self.document
    }
}
