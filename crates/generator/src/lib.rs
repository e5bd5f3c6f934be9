//! OpenAPI generation for resource-oriented APIs
//!
//! This crate turns an [`Api`] back into an OpenAPI 3.1 document: one path
//! per collection and item route, standard operations for each declared
//! method, custom methods as `{item}:{name}`, and the resource schemas under
//! `components.schemas` annotated with `x-aep-resource`.

mod paths;

pub use paths::{item_paths, PathWithParams};

use aep_openapi_common::constants::{
    APPLICATION_JSON, EMITTED_OPENAPI_VERSION, FIELD_FILTER_NAME, FIELD_FORCE_NAME,
    FIELD_ID_NAME, FIELD_MAX_PAGE_SIZE_NAME, FIELD_NEXT_PAGE_TOKEN_NAME, FIELD_PAGE_TOKEN_NAME,
    FIELD_RESULTS_NAME, FIELD_SKIP_NAME, FIELD_UNREACHABLE_NAME, JSON_MERGE_PATCH, OPERATION_REF,
};
use aep_openapi_common::openapi::{
    Components, Info, LongRunningOperation, LongRunningOperationResponse,
    OpenApiDocument, Operation, Parameter, PathItem, RequestBody, Response, Server,
};
use aep_openapi_common::{
    finalize, Api, ApiError, CustomMethod, HttpVerb, Resource, ResourceAnnotation, Result, Schema,
    SchemaType,
};
use heck::{ToPascalCase, ToSnakeCase};
use indexmap::IndexMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// OpenAPI generator
///
/// Transforms an [`Api`] into an OpenAPI 3.1 document:
/// - `paths` for every standard and custom method
/// - `components.schemas` for resources and free-standing schemas
/// - `info` and `servers`
pub struct OpenApiGenerator {
    api: Api,
}

impl OpenApiGenerator {
    /// Create a new generator from an API model
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    /// Build the OpenAPI document
    pub fn generate(&self) -> Result<OpenApiDocument> {
        let mut api = self.api.clone();
        finalize(&mut api)?;

        let mut paths: IndexMap<String, PathItem> = IndexMap::new();
        let mut schemas: IndexMap<String, Schema> = IndexMap::new();

        for resource in api.resources.values() {
            debug!("emitting resource {}", resource.singular);
            let routes = item_paths(&api, resource)?;
            let emitter = ResourceEmitter::new(resource);
            for route in &routes {
                emitter.add_operations(&mut paths, route);
            }

            let mut schema = resource.schema.clone();
            schema.strip_field_numbers();
            schema.resource = Some(ResourceAnnotation {
                singular: resource.singular.clone(),
                plural: resource.plural.clone(),
                patterns: routes.iter().map(PathWithParams::annotation_pattern).collect(),
                parents: resource.parents.clone(),
                resource_type: Some(format!("{}/{}", api.name, resource.singular)),
            });
            schemas.insert(resource.singular.clone(), schema);
        }

        for (name, schema) in &api.schemas {
            let mut schema = schema.clone();
            schema.strip_field_numbers();
            schemas.insert(name.clone(), schema);
        }

        Ok(OpenApiDocument {
            openapi: Some(EMITTED_OPENAPI_VERSION.to_string()),
            info: Info {
                title: api.name.clone(),
                description: Some(format!("An API for {}", api.name)),
                version: "version not set".to_string(),
                contact: api.contact.clone(),
            },
            servers: vec![Server {
                url: api.server_url.clone(),
                description: None,
            }],
            paths,
            components: Components {
                schemas,
                ..Components::default()
            },
            ..OpenApiDocument::default()
        })
    }

    /// Build the document and serialize it as pretty-printed JSON
    pub fn generate_json(&self) -> Result<String> {
        let document = self.generate()?;
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Build the document and write it to `output`, creating parent directories
    pub fn generate_to_file(&self, output: &Path) -> Result<()> {
        let json = self.generate_json()?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ApiError::Generation(format!("Failed to create output directory: {}", e))
            })?;
        }
        fs::write(output, json).map_err(|e| {
            ApiError::Generation(format!("Failed to write {}: {}", output.display(), e))
        })?;
        Ok(())
    }

    /// Get reference to the API model
    pub fn api(&self) -> &Api {
        &self.api
    }
}

/// Builds the operations of one resource
struct ResourceEmitter<'a> {
    resource: &'a Resource,
    /// e.g. `BookEdition`
    pascal: String,
    /// `#/components/schemas/{singular}`
    schema_ref: String,
}

impl<'a> ResourceEmitter<'a> {
    fn new(resource: &'a Resource) -> Self {
        Self {
            resource,
            pascal: resource.singular.to_snake_case().to_pascal_case(),
            schema_ref: format!("#/components/schemas/{}", resource.singular),
        }
    }

    fn resource_schema(&self) -> Schema {
        Schema::reference_to(self.schema_ref.clone())
    }

    fn resource_response(&self) -> Response {
        Response::json("Successful response", self.resource_schema())
    }

    fn operation(&self, verb: &str, parameters: Vec<Parameter>) -> Operation {
        Operation {
            operation_id: Some(format!("{}{}", verb, self.pascal)),
            description: Some(format!("{} method for {}", verb, self.resource.singular)),
            parameters,
            ..Operation::default()
        }
    }

    fn add_operations(&self, paths: &mut IndexMap<String, PathItem>, route: &PathWithParams) {
        let methods = &self.resource.methods;
        let collection = route.collection_path().to_string();
        let item = route.pattern.clone();

        if let Some(list) = methods.list {
            let mut params = route.collection_params().to_vec();
            params.push(Parameter::query(
                FIELD_MAX_PAGE_SIZE_NAME,
                Schema::of_type(SchemaType::Integer),
            ));
            params.push(Parameter::query(
                FIELD_PAGE_TOKEN_NAME,
                Schema::of_type(SchemaType::String),
            ));
            if list.supports_skip {
                params.push(Parameter::query(
                    FIELD_SKIP_NAME,
                    Schema::of_type(SchemaType::Integer),
                ));
            }
            if list.supports_filter {
                params.push(Parameter::query(
                    FIELD_FILTER_NAME,
                    Schema::of_type(SchemaType::String),
                ));
            }

            let mut response = Schema::of_type(SchemaType::Object);
            response.properties.insert(
                FIELD_RESULTS_NAME.to_string(),
                Schema::array_of(self.resource_schema()),
            );
            response.properties.insert(
                FIELD_NEXT_PAGE_TOKEN_NAME.to_string(),
                Schema::of_type(SchemaType::String),
            );
            if list.has_unreachable_resources {
                response.properties.insert(
                    FIELD_UNREACHABLE_NAME.to_string(),
                    Schema::array_of(Schema::of_type(SchemaType::String)),
                );
            }

            let mut op = self.operation("List", params);
            op.responses.insert(
                "200".to_string(),
                Response::json("Successful response", response),
            );
            add_operation(paths, &collection, "get", op);
        }

        if let Some(create) = methods.create {
            let mut params = route.collection_params().to_vec();
            if create.supports_user_settable_create {
                params.push(Parameter::query(
                    FIELD_ID_NAME,
                    Schema::of_type(SchemaType::String),
                ));
            }
            let mut op = self.operation("Create", params);
            op.request_body = Some(RequestBody::required(
                APPLICATION_JSON,
                self.resource_schema(),
            ));
            self.respond(&mut op, create.is_long_running, self.resource_schema());
            add_operation(paths, &collection, "post", op);
        }

        if methods.get.is_some() {
            let mut op = self.operation("Get", route.params.clone());
            op.responses
                .insert("200".to_string(), self.resource_response());
            add_operation(paths, &item, "get", op);
        }

        if let Some(update) = methods.update {
            let mut op = self.operation("Update", route.params.clone());
            op.request_body = Some(RequestBody::required(
                JSON_MERGE_PATCH,
                self.resource_schema(),
            ));
            self.respond(&mut op, update.is_long_running, self.resource_schema());
            add_operation(paths, &item, "patch", op);
        }

        if let Some(delete) = methods.delete {
            let mut params = route.params.clone();
            if !self.resource.children.is_empty() {
                params.push(Parameter::query(
                    FIELD_FORCE_NAME,
                    Schema::of_type(SchemaType::Boolean),
                ));
            }
            let mut op = self.operation("Delete", params);
            if delete.is_long_running {
                self.respond(&mut op, true, Schema::default());
            } else {
                op.responses.insert(
                    "204".to_string(),
                    Response::json("Successful response", Schema::default()),
                );
            }
            add_operation(paths, &item, "delete", op);
        }

        if let Some(apply) = methods.apply {
            let mut op = self.operation("Apply", route.params.clone());
            op.request_body = Some(RequestBody::required(
                APPLICATION_JSON,
                self.resource_schema(),
            ));
            self.respond(&mut op, apply.is_long_running, self.resource_schema());
            add_operation(paths, &item, "put", op);
        }

        for custom in &self.resource.custom_methods {
            let path = format!("{}:{}", item, custom.name);
            let op = self.custom_operation(custom, route.params.clone());
            add_operation(paths, &path, custom.method.as_openapi_method(), op);
        }
    }

    fn custom_operation(&self, custom: &CustomMethod, parameters: Vec<Parameter>) -> Operation {
        let mut request = custom
            .request
            .clone()
            .unwrap_or_else(|| Schema::of_type(SchemaType::Object));
        let mut response = custom
            .response
            .clone()
            .unwrap_or_else(|| Schema::of_type(SchemaType::Object));
        request.strip_field_numbers();
        response.strip_field_numbers();

        let mut op = Operation {
            operation_id: Some(format!(
                ":{}{}",
                custom.name.to_pascal_case(),
                self.pascal
            )),
            description: Some(format!(
                "Custom method {} for {}",
                custom.name, self.resource.singular
            )),
            parameters,
            ..Operation::default()
        };
        if custom.method == HttpVerb::Post {
            op.request_body = Some(RequestBody::required(APPLICATION_JSON, request));
        }
        self.respond(&mut op, custom.is_long_running, response);
        op
    }

    /// Set the `200` response. Long-running operations answer with an
    /// Operation and carry `payload` in the marker instead.
    fn respond(&self, op: &mut Operation, long_running: bool, payload: Schema) {
        if long_running {
            op.long_running = Some(LongRunningOperation {
                response: LongRunningOperationResponse {
                    schema: Some(payload),
                },
            });
            op.responses.insert(
                "200".to_string(),
                Response::json(
                    "Long-running operation response",
                    Schema::reference_to(OPERATION_REF),
                ),
            );
        } else {
            op.responses.insert(
                "200".to_string(),
                Response::json("Successful response", payload),
            );
        }
    }
}

fn add_operation(paths: &mut IndexMap<String, PathItem>, path: &str, method: &str, op: Operation) {
    let item = paths.entry(path.to_string()).or_default();
    if item.set_operation(method, op).is_some() {
        debug!("replaced {} operation on {}", method, path);
    }
}

/// Convenience wrapper around [`OpenApiGenerator`]
pub fn generate_openapi(api: Api) -> Result<OpenApiDocument> {
    OpenApiGenerator::new(api).generate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aep_openapi_common::{CreateMethod, GetMethod, Methods};

    fn widget_api() -> Api {
        let mut api = Api {
            name: "widgets".to_string(),
            server_url: "https://widgets.example.com".to_string(),
            ..Api::default()
        };
        let widget = Resource {
            singular: "widget".to_string(),
            plural: "widgets".to_string(),
            schema: Schema::of_type(SchemaType::Object),
            methods: Methods {
                get: Some(GetMethod {}),
                create: Some(CreateMethod::default()),
                ..Methods::default()
            },
            ..Resource::default()
        };
        api.resources.insert("widget".to_string(), widget);
        api
    }

    #[test]
    fn test_generate_info_and_servers() {
        let doc = OpenApiGenerator::new(widget_api()).generate().unwrap();
        assert_eq!(doc.openapi.as_deref(), Some("3.1.0"));
        assert_eq!(doc.info.title, "widgets");
        assert_eq!(doc.info.version, "version not set");
        assert_eq!(doc.info.description.as_deref(), Some("An API for widgets"));
        assert_eq!(doc.servers[0].url, "https://widgets.example.com");
    }

    #[test]
    fn test_operation_ids() {
        let doc = OpenApiGenerator::new(widget_api()).generate().unwrap();
        let collection = &doc.paths["/widgets"];
        assert_eq!(
            collection.post.as_ref().unwrap().operation_id.as_deref(),
            Some("CreateWidget")
        );
        let item = &doc.paths["/widgets/{widget_id}"];
        assert_eq!(
            item.get.as_ref().unwrap().operation_id.as_deref(),
            Some("GetWidget")
        );
    }

    #[test]
    fn test_generate_json_is_valid() {
        let json = OpenApiGenerator::new(widget_api()).generate_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["openapi"], "3.1.0");
        assert!(value.get("definitions").is_none());
        assert_eq!(
            value["components"]["schemas"]["widget"]["x-aep-resource"]["type"],
            "widgets/widget"
        );
    }
}
