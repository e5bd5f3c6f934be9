//! Converts an OpenAPI document into the resource model

use super::pattern::{classify, PatternInfo};
use super::resolver::SchemaResolver;
use crate::fetch::SchemaFetcher;
use aep_openapi_common::constants::{FIELD_ID_NAME, FIELD_RESULTS_NAME, FIELD_UNREACHABLE_NAME};
use aep_openapi_common::constants::{FIELD_FILTER_NAME, FIELD_SKIP_NAME};
use aep_openapi_common::openapi::{OasVersion, OpenApiDocument, Operation, PathItem, Response};
use aep_openapi_common::{
    finalize, Api, ApiError, ApplyMethod, ConvertOptions, CreateMethod, CustomMethod,
    DeleteMethod, GetMethod, HttpVerb, ListMethod, Methods, Resource, ResourceAnnotation, Result,
    Schema, UpdateMethod,
};
use heck::{ToKebabCase, ToSnakeCase};
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Convert an OpenAPI document into a finalized [`Api`]
pub fn convert_openapi_to_api(
    document: &OpenApiDocument,
    fetcher: &dyn SchemaFetcher,
    options: &ConvertOptions,
) -> Result<Api> {
    let version = document
        .oas_version()
        .ok_or(ApiError::UnknownDocumentVersion)?;
    debug!(prefix = %options.path_prefix, "parsing openapi document {}", document.info.title);

    let context = Context {
        document,
        version,
        resolver: SchemaResolver::new(document, version, fetcher, options),
    };
    let mut registry = ResourceRegistry::default();
    let mut custom_methods: IndexMap<String, Vec<CustomMethod>> = IndexMap::new();

    for (raw_path, path_item) in &document.paths {
        options.check_deadline(raw_path)?;

        let Some(path) = raw_path.strip_prefix(options.path_prefix.as_str()) else {
            debug!("path {} does not start with the prefix, skipping", raw_path);
            continue;
        };
        let Some(info) = classify(path) else {
            debug!("path {} is not a resource pattern", path);
            continue;
        };

        if let Some(name) = info.custom_method_name.as_deref() {
            if info.is_resource_pattern {
                let found = collect_custom_methods(&context, path_item, name)?;
                custom_methods
                    .entry(info.pattern())
                    .or_default()
                    .extend(found);
            } else {
                debug!("path {} is a collection-level method, skipping", path);
            }
            continue;
        }

        let discovered = if info.is_resource_pattern {
            item_methods(&context, path_item)
        } else {
            collection_methods(&context, path_item, path)?
        };
        let Some(candidate) = discovered.schema else {
            debug!("path {} has no schema to infer a resource from", path);
            continue;
        };

        let schema = context.resolver.resolve(&candidate)?;
        let component_key = component_key(&candidate);
        let naming = match (&schema.resource, component_key) {
            (Some(annotation), _) if !annotation.singular.is_empty() => {
                NamingSource::Annotation(annotation.clone())
            }
            (_, Some(key)) => NamingSource::Inferred {
                singular: key.to_kebab_case(),
            },
            _ => {
                warn!(
                    "path {} returns an inline schema without x-aep-resource, skipping",
                    path
                );
                continue;
            }
        };

        let mut pattern = info.segments.clone();
        if !info.is_resource_pattern {
            pattern.push(format!("{{{}}}", id_param(naming.singular(), &info)));
        }
        let origin = PatternOrigin {
            elems: pattern,
            guessed: !info.is_resource_pattern,
        };
        let singular = registry.get_or_populate(&context, naming, origin, schema, component_key)?;
        if let Some(resource) = registry.resources.get_mut(&singular) {
            resource.methods.fold(discovered.methods);
        }
    }

    let server_url = if options.server_url.is_empty() {
        document
            .servers
            .first()
            .map(|server| format!("{}{}", server.url, options.path_prefix))
            .ok_or(ApiError::MissingServerUrl)?
    } else {
        options.server_url.clone()
    };

    let schemas = document
        .schema_table(version)
        .iter()
        .filter(|(key, _)| {
            !registry.claimed_schemas.contains(*key) && !registry.resources.contains_key(*key)
        })
        .map(|(key, schema)| (key.clone(), schema.clone()))
        .collect();

    let mut api = Api {
        name: document.info.title.clone(),
        contact: document
            .info
            .contact
            .clone()
            .filter(|c| !(c.name.is_empty() && c.email.is_empty() && c.url.is_empty())),
        server_url,
        resources: registry.resources,
        schemas,
    };
    attach_custom_methods(&mut api, custom_methods);
    finalize(&mut api)?;
    Ok(api)
}

struct Context<'a> {
    document: &'a OpenApiDocument,
    version: OasVersion,
    resolver: SchemaResolver<'a>,
}

impl Context<'_> {
    fn has_parameter(&self, path_item: &PathItem, operation: &Operation, name: &str) -> bool {
        self.document.has_parameter(path_item, operation, name)
    }

    fn response_schema<'s>(&self, response: &'s Response) -> Option<&'s Schema> {
        self.document.response_schema(self.version, response)
    }

    /// Schema an operation yields once done: the long-running payload when
    /// marked, else the success response body
    fn result_schema<'s>(&self, operation: &'s Operation) -> Option<&'s Schema> {
        operation.long_running_schema().or_else(|| {
            operation
                .success_response()
                .and_then(|r| self.response_schema(r))
        })
    }
}

/// Where a resource's name comes from
#[derive(Debug, Clone)]
enum NamingSource {
    /// Declared with `x-aep-resource`
    Annotation(ResourceAnnotation),
    /// Derived from the schema's component key
    Inferred { singular: String },
}

impl NamingSource {
    fn singular(&self) -> &str {
        match self {
            NamingSource::Annotation(annotation) => &annotation.singular,
            NamingSource::Inferred { singular } => singular,
        }
    }
}

/// Pattern seen on the path a resource was discovered from
struct PatternOrigin {
    elems: Vec<String>,
    /// The id segment was invented rather than read from an item path
    guessed: bool,
}

#[derive(Default)]
struct Discovered {
    methods: Methods,
    /// Representative schema, not yet dereferenced
    schema: Option<Schema>,
}

/// Resources discovered so far, keyed by singular
#[derive(Default)]
struct ResourceRegistry {
    resources: IndexMap<String, Resource>,
    /// Component keys whose schema became a resource
    claimed_schemas: HashSet<String>,
    /// Resources whose pattern may still be replaced by a real item path
    guessed_patterns: HashSet<String>,
    /// Annotated resources whose parents are being populated
    in_progress: Vec<String>,
}

impl ResourceRegistry {
    /// Look up the resource named by `naming`, creating it (and, for
    /// annotated resources, its parents) on first sight.
    fn get_or_populate(
        &mut self,
        context: &Context<'_>,
        naming: NamingSource,
        origin: PatternOrigin,
        schema: Schema,
        component_key: Option<&str>,
    ) -> Result<String> {
        let singular = naming.singular().to_string();

        if let Some(existing) = self.resources.get_mut(&singular) {
            if !origin.guessed && self.guessed_patterns.remove(&singular) {
                debug!("resource {} pattern set from item path", singular);
                existing.pattern_elems = origin.elems;
            } else {
                debug!("resource {} already registered, keeping the first", singular);
            }
            return Ok(singular);
        }

        if self.in_progress.contains(&singular) {
            let mut chain = self.in_progress.clone();
            chain.push(singular);
            return Err(ApiError::CyclicParent(chain));
        }

        let mut parents = Vec::new();
        if let NamingSource::Annotation(annotation) = &naming {
            self.in_progress.push(singular.clone());
            for parent in &annotation.parents {
                self.populate_parent(context, parent)?;
                parents.push(parent.clone());
            }
            self.in_progress.pop();
        }

        let annotated_pattern = match &naming {
            NamingSource::Annotation(annotation) => annotation
                .patterns
                .first()
                .map(|p| split_pattern(p))
                .filter(|elems| !elems.is_empty()),
            NamingSource::Inferred { .. } => None,
        };
        let pattern_elems = match annotated_pattern {
            Some(elems) => elems,
            None => {
                if origin.guessed || origin.elems.is_empty() {
                    self.guessed_patterns.insert(singular.clone());
                }
                origin.elems
            }
        };

        if let Some(key) = component_key {
            self.claimed_schemas.insert(key.to_string());
        }
        let resource = new_resource(naming, parents, pattern_elems, schema);
        debug!("registered resource {}", resource.singular);
        self.resources.insert(singular.clone(), resource);
        Ok(singular)
    }

    fn populate_parent(&mut self, context: &Context<'_>, parent: &str) -> Result<()> {
        if self.resources.contains_key(parent) {
            return Ok(());
        }
        let Some((key, parent_schema)) = find_component(context, parent) else {
            debug!("parent {} has no component schema", parent);
            return Ok(());
        };
        let schema = context.resolver.resolve(parent_schema)?;
        let naming = match &schema.resource {
            Some(annotation) if annotation.singular == parent => {
                NamingSource::Annotation(annotation.clone())
            }
            _ => NamingSource::Inferred {
                singular: parent.to_string(),
            },
        };
        let origin = PatternOrigin {
            elems: Vec::new(),
            guessed: true,
        };
        self.get_or_populate(context, naming, origin, schema, Some(key))?;
        Ok(())
    }
}

/// Single construction point for resources
fn new_resource(
    naming: NamingSource,
    parents: Vec<String>,
    pattern_elems: Vec<String>,
    schema: Schema,
) -> Resource {
    let (singular, plural) = match naming {
        NamingSource::Annotation(annotation) => {
            let plural = if annotation.plural.is_empty() {
                pluralize(&annotation.singular)
            } else {
                annotation.plural
            };
            (annotation.singular, plural)
        }
        NamingSource::Inferred { singular } => {
            let plural = pluralize(&singular);
            (singular, plural)
        }
    };
    Resource {
        singular,
        plural,
        parents,
        children: Vec::new(),
        pattern_elems,
        schema,
        methods: Methods::default(),
        custom_methods: Vec::new(),
    }
}

/// Component schema for a parent name: by key, then by annotated singular,
/// then by kebab-cased key
fn find_component<'a>(context: &Context<'a>, name: &str) -> Option<(&'a str, &'a Schema)> {
    let table = context.document.schema_table(context.version);
    table
        .get_key_value(name)
        .or_else(|| {
            table.iter().find(|(_, schema)| {
                schema
                    .resource
                    .as_ref()
                    .is_some_and(|annotation| annotation.singular == name)
            })
        })
        .or_else(|| table.iter().find(|(key, _)| key.to_kebab_case() == name))
        .map(|(key, schema)| (key.as_str(), schema))
}

fn item_methods(context: &Context<'_>, path_item: &PathItem) -> Discovered {
    let mut discovered = Discovered::default();
    let mut candidates: Vec<Option<&Schema>> = Vec::new();

    if let Some(op) = &path_item.get {
        if op.success_response().is_some() {
            discovered.methods.get = Some(GetMethod {});
            candidates.push(context.result_schema(op));
        }
    }
    if let Some(op) = &path_item.patch {
        if op.success_response().is_some() {
            discovered.methods.update = Some(UpdateMethod {
                is_long_running: op.long_running.is_some(),
            });
            candidates.push(context.result_schema(op));
        }
    }
    if let Some(op) = &path_item.put {
        if op.success_response().is_some() {
            discovered.methods.apply = Some(ApplyMethod {
                is_long_running: op.long_running.is_some(),
            });
            candidates.push(context.result_schema(op));
        }
    }
    if let Some(op) = &path_item.delete {
        discovered.methods.delete = Some(DeleteMethod {
            is_long_running: op.long_running.is_some(),
        });
        candidates.push(context.result_schema(op));
    }

    discovered.schema = candidates.into_iter().flatten().next().cloned();
    discovered
}

fn collection_methods(
    context: &Context<'_>,
    path_item: &PathItem,
    path: &str,
) -> Result<Discovered> {
    let mut discovered = Discovered::default();
    let mut candidates: Vec<Option<Schema>> = Vec::new();

    if let Some(op) = &path_item.post {
        if op.success_response().is_some() {
            discovered.methods.create = Some(CreateMethod {
                supports_user_settable_create: context.has_parameter(
                    path_item,
                    op,
                    FIELD_ID_NAME,
                ),
                is_long_running: op.long_running.is_some(),
            });
            candidates.push(context.result_schema(op).cloned());
        }
    }

    if let Some(op) = &path_item.get {
        if let Some(response) = op.success_response() {
            match context.response_schema(response) {
                None => warn!(
                    "resource {} has a LIST method without a response schema",
                    path
                ),
                Some(response_schema) => {
                    let resolved = context.resolver.resolve(response_schema)?;
                    match list_items(&resolved) {
                        Some(items) => {
                            let has_unreachable_property = resolved
                                .properties
                                .get(FIELD_UNREACHABLE_NAME)
                                .is_some_and(Schema::is_array);
                            discovered.methods.list = Some(ListMethod {
                                supports_skip: context.has_parameter(
                                    path_item,
                                    op,
                                    FIELD_SKIP_NAME,
                                ),
                                supports_filter: context.has_parameter(
                                    path_item,
                                    op,
                                    FIELD_FILTER_NAME,
                                ),
                                has_unreachable_resources: has_unreachable_property
                                    || context.has_parameter(
                                        path_item,
                                        op,
                                        FIELD_UNREACHABLE_NAME,
                                    ),
                            });
                            candidates.push(items.cloned());
                        }
                        None => warn!(
                            "resource {} has a LIST method with a response schema, but no array property",
                            path
                        ),
                    }
                }
            }
        }
    }

    discovered.schema = candidates.into_iter().flatten().next();
    Ok(discovered)
}

/// Item schema of a list response: `results` when it is an array, else the
/// first array property other than `unreachable`
fn list_items(response: &Schema) -> Option<Option<&Schema>> {
    let property = response
        .properties
        .get(FIELD_RESULTS_NAME)
        .filter(|p| p.is_array())
        .or_else(|| {
            response
                .properties
                .iter()
                .find(|(name, p)| *name != FIELD_UNREACHABLE_NAME && p.is_array())
                .map(|(_, p)| p)
        })?;
    Some(property.items.as_deref())
}

fn collect_custom_methods(
    context: &Context<'_>,
    path_item: &PathItem,
    name: &str,
) -> Result<Vec<CustomMethod>> {
    let mut methods = Vec::new();
    let verbs = [
        (HttpVerb::Post, path_item.post.as_ref()),
        (HttpVerb::Get, path_item.get.as_ref()),
    ];
    for (verb, op) in verbs {
        let Some(op) = op else {
            continue;
        };
        if op.success_response().is_none() {
            continue;
        }
        let request = match verb {
            HttpVerb::Post => context
                .document
                .request_schema(context.version, op),
            HttpVerb::Get => None,
        };
        methods.push(CustomMethod {
            name: name.to_string(),
            method: verb,
            request: context.resolver.resolve_opt(request)?,
            response: context.resolver.resolve_opt(context.result_schema(op))?,
            is_long_running: op.long_running.is_some(),
        });
    }
    Ok(methods)
}

/// Attach each group of custom methods to the resource whose pattern string
/// equals the group key
fn attach_custom_methods(api: &mut Api, custom_methods: IndexMap<String, Vec<CustomMethod>>) {
    for (pattern, methods) in custom_methods {
        let owner = api
            .resources
            .values()
            .find(|r| api.pattern(r).is_ok_and(|p| p == pattern))
            .map(|r| r.singular.clone());
        match owner.and_then(|singular| api.resources.get_mut(&singular)) {
            Some(resource) => resource.custom_methods.extend(methods),
            None => warn!(
                "custom methods with pattern {} have no resource associated with them",
                pattern
            ),
        }
    }
}

/// Local component key of a referenced schema, or the file stem of a remote one
fn component_key(schema: &Schema) -> Option<&str> {
    let key = schema.reference_key()?;
    if schema.reference.as_deref().is_some_and(|r| r.starts_with('#')) {
        Some(key)
    } else {
        key.split('.').next().filter(|stem| !stem.is_empty())
    }
}

/// Identifier parameter appended to a collection path, without a leading
/// word that repeats the immediate parent
fn id_param(singular: &str, info: &PatternInfo) -> String {
    let singular = singular.to_snake_case();
    let Some(parent) = info.parent_segments() else {
        return singular;
    };
    let mut prefixes = Vec::new();
    if let Some(param) = parent.last() {
        let param = param.trim_matches(['{', '}']).to_snake_case();
        if let Some(stem) = param.strip_suffix("_id") {
            prefixes.push(stem.to_string());
        }
        prefixes.push(param);
    }
    if let Some(collection) = parent.len().checked_sub(2).and_then(|i| parent.get(i)) {
        let collection = collection.to_snake_case();
        prefixes.push(
            collection
                .strip_suffix('s')
                .unwrap_or(&collection)
                .to_string(),
        );
    }
    prefixes
        .iter()
        .find_map(|prefix| {
            singular
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .filter(|rest| !rest.is_empty())
        })
        .map(str::to_string)
        .unwrap_or(singular)
}

fn split_pattern(pattern: &str) -> Vec<String> {
    pattern
        .trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Best-effort English plural
fn pluralize(singular: &str) -> String {
    let consonant_y = singular.strip_suffix('y').filter(|stem| {
        stem.chars()
            .last()
            .is_some_and(|c| !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'))
    });
    if let Some(stem) = consonant_y {
        format!("{}ies", stem)
    } else if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| singular.ends_with(suffix))
    {
        format!("{}es", singular)
    } else {
        format!("{}s", singular)
    }
}
