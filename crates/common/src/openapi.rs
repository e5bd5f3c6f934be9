//! OpenAPI / Swagger document types
//!
//! A single model covers OpenAPI 3.x and Swagger 2.0; the handful of places
//! where the two disagree (schema tables, response bodies) are resolved
//! through [`OasVersion`].

use crate::constants::APPLICATION_JSON;
use crate::schema::{FieldAnnotation, Schema};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Detected document version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OasVersion {
    /// Swagger 2.0 (`swagger: "2.0"`, schemas under `definitions`)
    V2,
    /// OpenAPI 3.x (`openapi: "3.*"`, schemas under `components.schemas`)
    V3,
}

/// OpenAPI document root
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// Swagger version, present on 2.0 documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swagger: Option<String>,

    /// OpenAPI version (e.g., "3.0.0")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openapi: Option<String>,

    /// API metadata
    #[serde(default)]
    pub info: Info,

    /// Servers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,

    /// API paths (endpoints), in document order
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,

    /// Reusable components
    #[serde(default, skip_serializing_if = "Components::is_empty")]
    pub components: Components,

    /// Swagger 2.0 schema table
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub definitions: IndexMap<String, Schema>,

    /// Swagger 2.0 shared parameters
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, Parameter>,
}

/// API information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    #[serde(default)]
    pub title: String,

    /// API description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// API version
    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
}

/// Contact information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, alias = "Name", skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, alias = "Email", skip_serializing_if = "String::is_empty")]
    pub email: String,

    #[serde(default, alias = "URL", skip_serializing_if = "String::is_empty")]
    pub url: String,
}

/// Server information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    /// Server URL
    pub url: String,

    /// Server description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Path item (operations for a path)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,

    /// Parameters shared by every operation on the path
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
}

/// HTTP operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation ID (unique identifier)
    #[serde(
        rename = "operationId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,

    #[serde(
        rename = "requestBody",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub request_body: Option<RequestBody>,

    /// Responses keyed by status code
    #[serde(default)]
    pub responses: IndexMap<String, Response>,

    /// Long-running operation marker
    #[serde(
        rename = "x-aep-long-running-operation",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub long_running: Option<LongRunningOperation>,
}

/// Parameter definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Reference to a shared parameter; the other fields are then empty
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Location: query, header, path, cookie (or body on Swagger 2.0)
    #[serde(rename = "in", default, skip_serializing_if = "String::is_empty")]
    pub location: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,

    /// Swagger 2.0 inline parameter type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,

    /// Resource the parameter refers to
    #[serde(rename = "x-aep-field", default, skip_serializing_if = "Option::is_none")]
    pub field: Option<FieldAnnotation>,
}

/// Request body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Content types
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,

    #[serde(default)]
    pub required: bool,
}

/// Response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub description: String,

    /// Content types
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, MediaType>,

    /// Swagger 2.0 response schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

/// Media type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

/// Reusable components
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub schemas: IndexMap<String, Schema>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, Parameter>,
}

impl Components {
    fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.parameters.is_empty()
    }
}

/// `x-aep-long-running-operation` marker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LongRunningOperation {
    #[serde(default)]
    pub response: LongRunningOperationResponse,
}

/// Payload of a long-running operation once it completes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LongRunningOperationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

impl OpenApiDocument {
    /// Detect the document version from its top-level marker field
    pub fn oas_version(&self) -> Option<OasVersion> {
        if self.swagger.as_deref() == Some("2.0") {
            Some(OasVersion::V2)
        } else if self.openapi.as_deref().is_some_and(|v| !v.is_empty()) {
            Some(OasVersion::V3)
        } else {
            None
        }
    }

    /// Component schema table for the given version
    pub fn schema_table(&self, version: OasVersion) -> &IndexMap<String, Schema> {
        match version {
            OasVersion::V2 => &self.definitions,
            OasVersion::V3 => &self.components.schemas,
        }
    }

    /// Schema of a response body, honoring the version's layout
    pub fn response_schema<'a>(
        &self,
        version: OasVersion,
        response: &'a Response,
    ) -> Option<&'a Schema> {
        match version {
            OasVersion::V2 => response.schema.as_ref(),
            OasVersion::V3 => response
                .content
                .get(APPLICATION_JSON)
                .or_else(|| response.content.values().next())
                .and_then(|media| media.schema.as_ref()),
        }
    }

    /// Schema of an operation's request body
    ///
    /// Swagger 2.0 carries bodies as `in: body` parameters.
    pub fn request_schema<'a>(
        &'a self,
        version: OasVersion,
        operation: &'a Operation,
    ) -> Option<&'a Schema> {
        match version {
            OasVersion::V2 => operation
                .parameters
                .iter()
                .filter_map(|p| self.resolve_parameter(p))
                .find(|p| p.location == "body")
                .and_then(|p| p.schema.as_ref()),
            OasVersion::V3 => operation.request_body.as_ref().and_then(|body| {
                body.content
                    .get(APPLICATION_JSON)
                    .or_else(|| body.content.values().next())
                    .and_then(|media| media.schema.as_ref())
            }),
        }
    }

    /// Follow a parameter's `$ref` into `components.parameters` (or the
    /// Swagger 2.0 `parameters` table). `None` when it dangles.
    pub fn resolve_parameter<'a>(&'a self, parameter: &'a Parameter) -> Option<&'a Parameter> {
        let mut current = parameter;
        // bounded so that self-referencing entries terminate
        for _ in 0..=self.components.parameters.len() + self.parameters.len() {
            let Some(reference) = current.reference.as_deref() else {
                return Some(current);
            };
            current = if let Some(key) = reference.strip_prefix("#/components/parameters/") {
                self.components.parameters.get(key)?
            } else if let Some(key) = reference.strip_prefix("#/parameters/") {
                self.parameters.get(key)?
            } else {
                return None;
            };
        }
        None
    }

    /// Whether `operation` accepts a parameter named `name`, counting
    /// parameters declared on the enclosing path item and shared ones
    /// reached through `$ref`
    pub fn has_parameter(&self, path_item: &PathItem, operation: &Operation, name: &str) -> bool {
        path_item
            .parameters
            .iter()
            .chain(&operation.parameters)
            .filter_map(|p| self.resolve_parameter(p))
            .any(|p| p.name == name)
    }
}

impl PathItem {
    /// Set the operation for a lowercase HTTP method name, returning the one it replaced
    pub fn set_operation(&mut self, method: &str, operation: Operation) -> Option<Operation> {
        let slot = match method {
            "get" => &mut self.get,
            "post" => &mut self.post,
            "put" => &mut self.put,
            "patch" => &mut self.patch,
            "delete" => &mut self.delete,
            _ => return None,
        };
        slot.replace(operation)
    }
}

impl Operation {
    /// First success response (`200`, then `201`)
    pub fn success_response(&self) -> Option<&Response> {
        self.responses
            .get("200")
            .or_else(|| self.responses.get("201"))
    }

    /// Payload schema declared by the long-running marker
    pub fn long_running_schema(&self) -> Option<&Schema> {
        self.long_running
            .as_ref()
            .and_then(|lro| lro.response.schema.as_ref())
    }
}

impl Response {
    /// JSON response carrying `schema`
    pub fn json(description: &str, schema: Schema) -> Self {
        let mut content = IndexMap::new();
        content.insert(
            APPLICATION_JSON.to_string(),
            MediaType {
                schema: Some(schema),
            },
        );
        Self {
            description: description.to_string(),
            content,
            schema: None,
        }
    }
}

impl RequestBody {
    /// Required body of the given content type
    pub fn required(content_type: &str, schema: Schema) -> Self {
        let mut content = IndexMap::new();
        content.insert(
            content_type.to_string(),
            MediaType {
                schema: Some(schema),
            },
        );
        Self {
            description: None,
            content,
            required: true,
        }
    }
}

impl Parameter {
    /// Optional query parameter of the given schema
    pub fn query(name: &str, schema: Schema) -> Self {
        Self {
            name: name.to_string(),
            location: "query".to_string(),
            required: false,
            schema: Some(schema),
            ..Self::default()
        }
    }

    /// Required path parameter of type string
    pub fn path(name: &str) -> Self {
        Self {
            name: name.to_string(),
            location: "path".to_string(),
            required: true,
            schema: Some(Schema::of_type(crate::schema::SchemaType::String)),
            ..Self::default()
        }
    }
}
