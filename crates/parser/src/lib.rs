//! OpenAPI parsing for aep-openapi
//!
//! This crate turns an OpenAPI or Swagger document into the resource model
//! defined in `aep-openapi-common`.
//!
//! ## Parsing Strategy
//!
//! Paths are classified by shape, operations on them are mapped to standard
//! methods, and the schema each operation returns names the resource:
//! - `POST` collection → Create, `GET` collection → List
//! - `GET` item → Get, `PATCH` → Update, `PUT` → Apply, `DELETE` → Delete
//! - `POST`/`GET` on `{item}:{name}` → custom method
//!
//! `$ref`s are followed locally and, for absolute URLs, through a
//! [`SchemaFetcher`].

pub mod fetch;
pub mod openapi;

pub use fetch::{HttpFetcher, SchemaFetcher};
pub use openapi::OpenApiParser;

use aep_openapi_common::{Api, ConvertOptions, Result};
use std::path::Path;

/// Parse the document at `path` with the given options
pub fn parse_openapi_file<P: AsRef<Path>>(path: P, options: ConvertOptions) -> Result<Api> {
    OpenApiParser::from_file(path)?.with_options(options).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_parse_openapi_file() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            "swagger: '2.0'\ninfo:\n  title: empty\n  version: '1'\nhost: x\npaths: {{}}\n"
        )
        .unwrap();

        let options = ConvertOptions {
            server_url: "https://empty.example.com".to_string(),
            ..ConvertOptions::default()
        };
        let api = parse_openapi_file(file.path(), options).unwrap();
        assert_eq!(api.name, "empty");
        assert_eq!(api.server_url, "https://empty.example.com");
    }
}
