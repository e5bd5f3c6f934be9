//! OpenAPI 3.x and Swagger 2.0 parser
//!
//! Infers resources from paths that alternate collection names and
//! identifier parameters:
//!
//! - `/publishers/{publisher}/books`: collection (Create, List)
//! - `/publishers/{publisher}/books/{book}`: item (Get, Update, Apply, Delete)
//! - `/publishers/{publisher}/books/{book}:archive`: custom method
//!
//! Schemas annotated with `x-aep-resource` name their resource explicitly;
//! otherwise the name comes from the referenced component.
//!
//! ## Usage
//! ```rust,ignore
//! use aep_openapi_parser::openapi::OpenApiParser;
//!
//! let parser = OpenApiParser::from_file("bookstore.json")?.with_path_prefix("/v1");
//! let api = parser.parse()?;
//! ```

mod converter;
mod parser;
pub mod pattern;
pub mod resolver;

pub use parser::OpenApiParser;
pub use pattern::{classify, PatternInfo};
pub use resolver::SchemaResolver;
