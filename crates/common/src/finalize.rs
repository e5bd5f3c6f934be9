//! Validation and derived-state pass over a freshly built or loaded [`Api`]

use crate::api::Api;
use crate::constants::{FIELD_PATH_DESCRIPTION, FIELD_PATH_NAME, FIELD_PATH_NUMBER};
use crate::schema::{FieldAnnotation, Schema, SchemaType};
use crate::{ApiError, Result};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Naming rule for resource singulars: lowercase words joined by `-` or `_`
pub const RESOURCE_NAME_PATTERN: &str = "^[a-z][a-z0-9]*([-_][a-z0-9]+)*$";

static RESOURCE_NAME_REGEX: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(RESOURCE_NAME_PATTERN));

/// Validate names, patterns and parent links, rebuild child indexes and
/// inject the `path` field. Running it twice is a no-op.
pub fn finalize(api: &mut Api) -> Result<()> {
    for (key, resource) in &api.resources {
        check_name(key)?;
        check_name(&resource.singular)?;
        if *key != resource.singular {
            return Err(ApiError::ResourceKeyMismatch {
                key: key.clone(),
                singular: resource.singular.clone(),
            });
        }
        if resource.plural.is_empty() {
            return Err(ApiError::EmptyPlural(resource.singular.clone()));
        }
        if !resource.pattern_elems.is_empty() && !has_valid_parity(&resource.pattern_elems) {
            return Err(ApiError::InvalidPattern {
                resource: resource.singular.clone(),
                pattern: resource.pattern_elems.clone(),
            });
        }
    }

    let mut children: IndexMap<String, Vec<String>> = IndexMap::new();
    for resource in api.resources.values() {
        for parent in &resource.parents {
            if !api.resources.contains_key(parent) {
                return Err(ApiError::ParentNotFound {
                    resource: resource.singular.clone(),
                    parent: parent.clone(),
                });
            }
            let entry = children.entry(parent.clone()).or_default();
            if !entry.contains(&resource.singular) {
                entry.push(resource.singular.clone());
            }
        }
    }
    for (singular, resource) in api.resources.iter_mut() {
        resource.children = children.shift_remove(singular).unwrap_or_default();
    }

    check_acyclic(api)?;

    for resource in api.resources.values_mut() {
        inject_path_field(&mut resource.schema);
    }
    debug!(resources = api.resources.len(), "finalized API {}", api.name);
    Ok(())
}

fn check_name(name: &str) -> Result<()> {
    let regex = RESOURCE_NAME_REGEX
        .as_ref()
        .map_err(|e| ApiError::Parse(format!("invalid resource name pattern: {}", e)))?;
    if regex.is_match(name) {
        Ok(())
    } else {
        Err(ApiError::InvalidResourceName {
            name: name.to_string(),
            pattern: RESOURCE_NAME_PATTERN.to_string(),
        })
    }
}

/// Even indexes are literals, odd ones `{param}`, and the last is a param
fn has_valid_parity(elems: &[String]) -> bool {
    elems.len() % 2 == 0
        && elems.iter().enumerate().all(|(i, elem)| {
            let is_param = elem.len() > 2 && elem.starts_with('{') && elem.ends_with('}');
            if i % 2 == 0 {
                !elem.is_empty() && !elem.contains(['{', '}'])
            } else {
                is_param
            }
        })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

fn check_acyclic(api: &Api) -> Result<()> {
    let mut state: IndexMap<&str, Visit> = IndexMap::new();
    for singular in api.resources.keys() {
        let mut stack = Vec::new();
        visit(api, singular, &mut state, &mut stack)?;
    }
    Ok(())
}

fn visit<'a>(
    api: &'a Api,
    singular: &'a str,
    state: &mut IndexMap<&'a str, Visit>,
    stack: &mut Vec<&'a str>,
) -> Result<()> {
    match state.get(singular) {
        Some(Visit::Done) => return Ok(()),
        Some(Visit::InProgress) => {
            let start = stack.iter().position(|s| *s == singular).unwrap_or(0);
            let mut chain: Vec<String> = stack[start..].iter().map(|s| s.to_string()).collect();
            chain.push(singular.to_string());
            return Err(ApiError::CyclicParent(chain));
        }
        None => {}
    }

    state.insert(singular, Visit::InProgress);
    stack.push(singular);
    if let Some(resource) = api.resources.get(singular) {
        for parent in &resource.parents {
            visit(api, parent, state, stack)?;
        }
    }
    stack.pop();
    state.insert(singular, Visit::Done);
    Ok(())
}

fn inject_path_field(schema: &mut Schema) {
    if schema.properties.contains_key(FIELD_PATH_NAME) {
        return;
    }
    if schema.schema_type.is_none() && schema.reference.is_none() {
        schema.schema_type = Some(SchemaType::Object);
    }
    let path = Schema {
        schema_type: Some(SchemaType::String),
        description: Some(FIELD_PATH_DESCRIPTION.to_string()),
        read_only: true,
        field: Some(FieldAnnotation {
            field_number: Some(FIELD_PATH_NUMBER),
            ..FieldAnnotation::default()
        }),
        ..Schema::default()
    };
    schema.properties.insert(FIELD_PATH_NAME.to_string(), path);
}
