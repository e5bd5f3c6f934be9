//! `$ref` dereferencing

use crate::fetch::SchemaFetcher;
use aep_openapi_common::openapi::{OasVersion, OpenApiDocument};
use aep_openapi_common::{ApiError, ConvertOptions, Result, Schema};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

/// Follows schema references within one document and to remote locations.
///
/// Resolution is shallow: the returned schema has no top-level `$ref`, but its
/// properties may still hold references. Remote documents are fetched at most
/// once per resolver.
pub struct SchemaResolver<'a> {
    document: &'a OpenApiDocument,
    version: OasVersion,
    fetcher: &'a dyn SchemaFetcher,
    options: &'a ConvertOptions,
    /// Parsed remote documents keyed by URL without fragment
    remote: RefCell<HashMap<String, Value>>,
    /// References currently being followed, outermost first
    in_progress: RefCell<Vec<String>>,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(
        document: &'a OpenApiDocument,
        version: OasVersion,
        fetcher: &'a dyn SchemaFetcher,
        options: &'a ConvertOptions,
    ) -> Self {
        Self {
            document,
            version,
            fetcher,
            options,
            remote: RefCell::new(HashMap::new()),
            in_progress: RefCell::new(Vec::new()),
        }
    }

    /// Dereference `schema` until it no longer carries a `$ref`
    pub fn resolve(&self, schema: &Schema) -> Result<Schema> {
        let Some(reference) = schema.reference.as_deref() else {
            return Ok(schema.clone());
        };

        if self.in_progress.borrow().iter().any(|r| r == reference) {
            let mut chain = self.in_progress.borrow().clone();
            chain.push(reference.to_string());
            return Err(ApiError::CyclicReference(chain));
        }

        self.in_progress.borrow_mut().push(reference.to_string());
        let resolved = self
            .lookup(reference)
            .and_then(|target| self.resolve(&target));
        self.in_progress.borrow_mut().pop();
        resolved
    }

    /// Dereference an optional schema
    pub fn resolve_opt(&self, schema: Option<&Schema>) -> Result<Option<Schema>> {
        schema.map(|s| self.resolve(s)).transpose()
    }

    fn lookup(&self, reference: &str) -> Result<Schema> {
        if reference.starts_with('#') {
            return self.lookup_local(reference);
        }
        match Url::parse(reference) {
            Ok(url) if matches!(url.scheme(), "http" | "https" | "file") => {
                self.lookup_remote(url, reference)
            }
            _ => Err(ApiError::UnsupportedReference(reference.to_string())),
        }
    }

    fn lookup_local(&self, reference: &str) -> Result<Schema> {
        let key = reference.rsplit('/').next().unwrap_or_default();
        self.document
            .schema_table(self.version)
            .get(key)
            .cloned()
            .ok_or_else(|| ApiError::SchemaNotFound(reference.to_string()))
    }

    fn lookup_remote(&self, mut url: Url, reference: &str) -> Result<Schema> {
        let fragment = url.fragment().map(str::to_string);
        url.set_fragment(None);
        let key = url.to_string();

        if !self.remote.borrow().contains_key(&key) {
            self.options.check_deadline(reference)?;
            debug!("fetching external schema {}", key);
            let bytes = self
                .fetcher
                .fetch(&url, self.options.remaining())
                .map_err(|source| ApiError::Fetch {
                    reference: reference.to_string(),
                    source,
                })?;
            let value = parse_document(&bytes).map_err(|message| ApiError::InvalidRemoteSchema {
                reference: reference.to_string(),
                message,
            })?;
            self.remote.borrow_mut().insert(key.clone(), value);
        }

        let remote = self.remote.borrow();
        let document = remote
            .get(&key)
            .ok_or_else(|| ApiError::SchemaNotFound(reference.to_string()))?;
        let target = match fragment.as_deref() {
            Some(pointer) if !pointer.is_empty() => document
                .pointer(pointer)
                .ok_or_else(|| ApiError::SchemaNotFound(reference.to_string()))?,
            _ => document,
        };
        serde_json::from_value(target.clone()).map_err(|e| ApiError::InvalidRemoteSchema {
            reference: reference.to_string(),
            message: e.to_string(),
        })
    }
}

fn parse_document(bytes: &[u8]) -> std::result::Result<Value, String> {
    serde_json::from_slice(bytes).or_else(|json_err| {
        serde_yaml::from_slice(bytes).map_err(|yaml_err| {
            format!("not JSON ({}) and not YAML ({})", json_err, yaml_err)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockSchemaFetcher;
    use aep_openapi_common::{ErrorKind, SchemaType};
    use mockall::predicate::always;
    use std::time::{Duration, Instant};

    fn document(json: &str) -> OpenApiDocument {
        serde_json::from_str(json).unwrap()
    }

    fn widget_document() -> OpenApiDocument {
        document(
            r##"{
                "openapi": "3.1.0",
                "paths": {},
                "components": {"schemas": {
                    "widget": {"type": "object", "properties": {"name": {"type": "string"}}},
                    "alias": {"$ref": "#/components/schemas/widget"},
                    "a": {"$ref": "#/components/schemas/b"},
                    "b": {"$ref": "#/components/schemas/a"},
                    "remote": {"$ref": "https://schemas.example.com/common.json"}
                }}
            }"##,
        )
    }

    #[test]
    fn test_resolve_without_reference_is_identity() {
        let doc = widget_document();
        let fetcher = MockSchemaFetcher::new();
        let options = ConvertOptions::default();
        let resolver = SchemaResolver::new(&doc, OasVersion::V3, &fetcher, &options);

        let schema = Schema::of_type(SchemaType::String);
        assert_eq!(resolver.resolve(&schema).unwrap(), schema);
    }

    #[test]
    fn test_resolve_local_chain_is_shallow() {
        let doc = widget_document();
        let fetcher = MockSchemaFetcher::new();
        let options = ConvertOptions::default();
        let resolver = SchemaResolver::new(&doc, OasVersion::V3, &fetcher, &options);

        let resolved = resolver
            .resolve(&Schema::reference_to("#/components/schemas/alias"))
            .unwrap();
        assert_eq!(resolved.schema_type, Some(SchemaType::Object));
        assert!(resolved.properties.contains_key("name"));
    }

    #[test]
    fn test_swagger_definitions() {
        let doc = document(
            r##"{"swagger": "2.0", "paths": {}, "definitions": {"widget": {"type": "object"}}}"##,
        );
        let fetcher = MockSchemaFetcher::new();
        let options = ConvertOptions::default();
        let resolver = SchemaResolver::new(&doc, OasVersion::V2, &fetcher, &options);

        let resolved = resolver
            .resolve(&Schema::reference_to("#/definitions/widget"))
            .unwrap();
        assert_eq!(resolved.schema_type, Some(SchemaType::Object));
    }

    #[test]
    fn test_missing_key_names_reference() {
        let doc = widget_document();
        let fetcher = MockSchemaFetcher::new();
        let options = ConvertOptions::default();
        let resolver = SchemaResolver::new(&doc, OasVersion::V3, &fetcher, &options);

        let err = resolver
            .resolve(&Schema::reference_to("#/components/schemas/gadget"))
            .unwrap_err();
        assert!(err.to_string().contains("#/components/schemas/gadget"));
        assert_eq!(err.kind(), ErrorKind::SchemaReference);
    }

    #[test]
    fn test_cyclic_reference() {
        let doc = widget_document();
        let fetcher = MockSchemaFetcher::new();
        let options = ConvertOptions::default();
        let resolver = SchemaResolver::new(&doc, OasVersion::V3, &fetcher, &options);

        match resolver.resolve(&Schema::reference_to("#/components/schemas/a")) {
            Err(ApiError::CyclicReference(chain)) => assert_eq!(
                chain,
                vec![
                    "#/components/schemas/a",
                    "#/components/schemas/b",
                    "#/components/schemas/a"
                ]
            ),
            other => panic!("expected cyclic reference, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_reference() {
        let doc = widget_document();
        let fetcher = MockSchemaFetcher::new();
        let options = ConvertOptions::default();
        let resolver = SchemaResolver::new(&doc, OasVersion::V3, &fetcher, &options);

        for reference in ["common.json#/Widget", "ftp://example.com/widget.json"] {
            assert!(matches!(
                resolver.resolve(&Schema::reference_to(reference)),
                Err(ApiError::UnsupportedReference(_))
            ));
        }
    }

    #[test]
    fn test_remote_fetched_once() {
        let doc = widget_document();
        let mut fetcher = MockSchemaFetcher::new();
        fetcher
            .expect_fetch()
            .with(always(), always())
            .times(1)
            .returning(|_, _| {
                Ok(br#"{"type": "object", "$defs": {"tag": {"type": "string"}}}"#.to_vec())
            });
        let options = ConvertOptions::default();
        let resolver = SchemaResolver::new(&doc, OasVersion::V3, &fetcher, &options);

        let first = resolver
            .resolve(&Schema::reference_to("#/components/schemas/remote"))
            .unwrap();
        assert_eq!(first.schema_type, Some(SchemaType::Object));

        let tag = resolver
            .resolve(&Schema::reference_to(
                "https://schemas.example.com/common.json#/$defs/tag",
            ))
            .unwrap();
        assert_eq!(tag.schema_type, Some(SchemaType::String));
    }

    #[test]
    fn test_remote_yaml_fallback() {
        let doc = widget_document();
        let mut fetcher = MockSchemaFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_, _| Ok(b"type: integer\nformat: int64\n".to_vec()));
        let options = ConvertOptions::default();
        let resolver = SchemaResolver::new(&doc, OasVersion::V3, &fetcher, &options);

        let resolved = resolver
            .resolve(&Schema::reference_to("https://schemas.example.com/id.yaml"))
            .unwrap();
        assert_eq!(resolved.schema_type, Some(SchemaType::Integer));
        assert_eq!(resolved.format.as_deref(), Some("int64"));
    }

    #[test]
    fn test_fetch_failure_is_wrapped() {
        let doc = widget_document();
        let mut fetcher = MockSchemaFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_, _| Err("connection refused".into()));
        let options = ConvertOptions::default();
        let resolver = SchemaResolver::new(&doc, OasVersion::V3, &fetcher, &options);

        let err = resolver
            .resolve(&Schema::reference_to("https://schemas.example.com/common.json"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Fetch { .. }));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_unparsable_remote_schema() {
        let doc = widget_document();
        let mut fetcher = MockSchemaFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_, _| Ok(b"{ not: [valid".to_vec()));
        let options = ConvertOptions::default();
        let resolver = SchemaResolver::new(&doc, OasVersion::V3, &fetcher, &options);

        let err = resolver
            .resolve(&Schema::reference_to("https://schemas.example.com/broken.json"))
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidRemoteSchema { .. }));
    }

    #[test]
    fn test_deadline_checked_before_fetch() {
        let doc = widget_document();
        let fetcher = MockSchemaFetcher::new();
        let options = ConvertOptions {
            deadline: Some(Instant::now() - Duration::from_millis(1)),
            ..ConvertOptions::default()
        };
        let resolver = SchemaResolver::new(&doc, OasVersion::V3, &fetcher, &options);

        let err = resolver
            .resolve(&Schema::reference_to("https://schemas.example.com/common.json"))
            .unwrap_err();
        assert!(matches!(err, ApiError::DeadlineExceeded(_)));
    }

    #[test]
    fn test_fetch_receives_remaining_budget() {
        let doc = widget_document();
        let mut fetcher = MockSchemaFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|_, timeout| timeout.is_some_and(|t| t <= Duration::from_secs(2)))
            .times(1)
            .returning(|_, _| Ok(br#"{"type": "string"}"#.to_vec()));
        let options = ConvertOptions {
            fetch_timeout: Some(Duration::from_secs(2)),
            ..ConvertOptions::default()
        };
        let resolver = SchemaResolver::new(&doc, OasVersion::V3, &fetcher, &options);

        assert!(resolver
            .resolve(&Schema::reference_to("https://schemas.example.com/name.json"))
            .is_ok());
    }
}
