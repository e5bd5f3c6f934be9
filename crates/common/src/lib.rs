//! Common types and utilities for aep-openapi
//!
//! This crate contains the resource model (the "IR"), the OpenAPI document
//! types shared by the parser and the generator, and the error type used
//! across the workspace.

pub mod api;
pub mod config;
pub mod constants;
mod finalize;
pub mod openapi;
mod request;
pub mod schema;

pub use api::{
    Api, ApplyMethod, Contact, CreateMethod, CustomMethod, DeleteMethod, GetMethod, HttpVerb,
    ListMethod, Methods, Resource, UpdateMethod,
};
pub use config::{ConversionConfig, ConvertOptions};
pub use finalize::{finalize, RESOURCE_NAME_PATTERN};
pub use schema::{AdditionalProperties, FieldAnnotation, ResourceAnnotation, Schema, SchemaType};

use thiserror::Error;

/// Boxed error returned by I/O collaborators such as schema fetchers
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while building, validating, or emitting an API model
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("no server URL found in openapi, and none was provided")]
    MissingServerUrl,

    #[error("unable to detect OAS version. Please add a openapi field or a swagger field")]
    UnknownDocumentVersion,

    #[error("resource {resource} has invalid pattern {pattern:?}")]
    InvalidPattern { resource: String, pattern: Vec<String> },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("unsupported schema reference {0:?}")]
    UnsupportedReference(String),

    #[error("schema {0:?} not found")]
    SchemaNotFound(String),

    #[error("error fetching external schema {reference:?}: {source}")]
    Fetch {
        reference: String,
        #[source]
        source: BoxError,
    },

    #[error("error unmarshaling external schema {reference:?}: {message}")]
    InvalidRemoteSchema { reference: String, message: String },

    #[error("cyclic schema reference: {}", .0.join(" -> "))]
    CyclicReference(Vec<String>),

    #[error("deadline exceeded while resolving {0:?}")]
    DeadlineExceeded(String),

    #[error("parent resource {parent} not found for resource {resource}")]
    ParentNotFound { resource: String, parent: String },

    #[error("cyclic parent chain: {}", .0.join(" -> "))]
    CyclicParent(Vec<String>),

    #[error("Resource {0:?} not found")]
    ResourceNotFound(String),

    #[error("path parameter {parameter:?} required by resource {resource} was not provided")]
    MissingPathParameter { resource: String, parameter: String },

    #[error("resource name {name} does not match the regex {pattern}")]
    InvalidResourceName { name: String, pattern: String },

    #[error("resource key {key} does not match its singular name {singular}")]
    ResourceKeyMismatch { key: String, singular: String },

    #[error("resource {0} has an empty plural name")]
    EmptyPlural(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Broad failure categories an [`ApiError`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source document is missing required structure
    DocumentStructure,
    /// A schema reference could not be resolved
    SchemaReference,
    /// Resources could not be linked to their parents
    ResourceLinkage,
    /// A resource name breaks the naming rules
    NamingConvention,
    /// Reading, writing or (de)serializing failed
    Io,
}

impl ApiError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::MissingServerUrl
            | ApiError::UnknownDocumentVersion
            | ApiError::InvalidPattern { .. }
            | ApiError::Parse(_) => ErrorKind::DocumentStructure,
            ApiError::UnsupportedReference(_)
            | ApiError::SchemaNotFound(_)
            | ApiError::Fetch { .. }
            | ApiError::InvalidRemoteSchema { .. }
            | ApiError::CyclicReference(_)
            | ApiError::DeadlineExceeded(_) => ErrorKind::SchemaReference,
            ApiError::ParentNotFound { .. }
            | ApiError::CyclicParent(_)
            | ApiError::ResourceNotFound(_)
            | ApiError::MissingPathParameter { .. } => ErrorKind::ResourceLinkage,
            ApiError::InvalidResourceName { .. }
            | ApiError::ResourceKeyMismatch { .. }
            | ApiError::EmptyPlural(_) => ErrorKind::NamingConvention,
            ApiError::Generation(_) | ApiError::Io(_) | ApiError::Json(_) | ApiError::Yaml(_) => {
                ErrorKind::Io
            }
        }
    }
}

/// Result type for API model operations
pub type Result<T> = std::result::Result<T, ApiError>;
