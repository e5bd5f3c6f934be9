//! Resource-oriented API model
//!
//! An [`Api`] owns a table of [`Resource`]s keyed by singular name. Parent
//! links are stored as singular names and resolved through the table when
//! needed; children are a derived index rebuilt by [`crate::finalize`].

use crate::schema::Schema;
use crate::{finalize, ApiError, Result};
use heck::ToKebabCase;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub use crate::openapi::Contact;

/// A resource-oriented API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Api {
    /// API name, used as the document title
    #[serde(default, alias = "Name")]
    pub name: String,

    #[serde(default, alias = "Contact", skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,

    /// Base URL every pattern is relative to
    #[serde(default)]
    pub server_url: String,

    /// Resources keyed by singular name
    #[serde(default, alias = "Resources")]
    pub resources: IndexMap<String, Resource>,

    /// Schemas not claimed by any resource
    #[serde(default, alias = "Schemas", skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: IndexMap<String, Schema>,
}

/// An addressable entity type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub singular: String,

    pub plural: String,

    /// Singular names of the parents; the first one drives pattern synthesis
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,

    /// Singular names of the children, rebuilt on finalize
    #[serde(skip)]
    pub children: Vec<String>,

    /// Explicit URL shape, e.g. `["publishers", "{publisher}", "books", "{book}"]`.
    /// Empty means the pattern is synthesized from the parent chain.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pattern_elems: Vec<String>,

    #[serde(default)]
    pub schema: Schema,

    #[serde(default)]
    pub methods: Methods,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_methods: Vec<CustomMethod>,
}

/// Standard methods supported by a resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Methods {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<GetMethod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<ListMethod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<CreateMethod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<UpdateMethod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<DeleteMethod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply: Option<ApplyMethod>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetMethod {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMethod {
    #[serde(default)]
    pub has_unreachable_resources: bool,
    #[serde(default)]
    pub supports_filter: bool,
    #[serde(default)]
    pub supports_skip: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMethod {
    /// Whether callers may choose the id with an `id` query parameter
    #[serde(default)]
    pub supports_user_settable_create: bool,
    #[serde(default)]
    pub is_long_running: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMethod {
    #[serde(default)]
    pub is_long_running: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteMethod {
    #[serde(default)]
    pub is_long_running: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyMethod {
    #[serde(default)]
    pub is_long_running: bool,
}

/// HTTP verb of a custom method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
}

impl HttpVerb {
    /// Lowercase method name as used for OpenAPI path item keys
    pub fn as_openapi_method(&self) -> &'static str {
        match self {
            HttpVerb::Get => "get",
            HttpVerb::Post => "post",
        }
    }
}

/// A non-standard method addressed as `{item}:{name}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomMethod {
    #[serde(alias = "Name")]
    pub name: String,

    #[serde(alias = "Method")]
    pub method: HttpVerb,

    #[serde(default, alias = "Request", skip_serializing_if = "Option::is_none")]
    pub request: Option<Schema>,

    #[serde(default, alias = "Response", skip_serializing_if = "Option::is_none")]
    pub response: Option<Schema>,

    #[serde(default)]
    pub is_long_running: bool,
}

impl Methods {
    /// Copy every method present in `other` over this set
    pub fn fold(&mut self, other: Methods) {
        if other.get.is_some() {
            self.get = other.get;
        }
        if other.list.is_some() {
            self.list = other.list;
        }
        if other.create.is_some() {
            self.create = other.create;
        }
        if other.update.is_some() {
            self.update = other.update;
        }
        if other.delete.is_some() {
            self.delete = other.delete;
        }
        if other.apply.is_some() {
            self.apply = other.apply;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Methods::default()
    }
}

impl Api {
    /// Load an API model from JSON and finalize it
    pub fn from_json(json: &str) -> Result<Self> {
        let mut api: Api = serde_json::from_str(json)
            .map_err(|e| ApiError::Parse(format!("error unmarshalling API: {}", e)))?;
        finalize(&mut api)?;
        Ok(api)
    }

    /// Load an API model from YAML and finalize it
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut api: Api = serde_yaml::from_str(yaml)
            .map_err(|e| ApiError::Parse(format!("error unmarshalling API: {}", e)))?;
        finalize(&mut api)?;
        Ok(api)
    }

    /// Load an API model from a `.json`, `.yaml` or `.yml` file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ApiError::Parse(format!("Failed to read API file {}: {}", path.display(), e))
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    /// Pretty-printed JSON form of the model
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn resource(&self, singular: &str) -> Result<&Resource> {
        self.resources
            .get(singular)
            .ok_or_else(|| ApiError::ResourceNotFound(singular.to_string()))
    }

    /// Resolved parents of `resource`, in declaration order
    pub fn parent_resources(&self, resource: &Resource) -> Result<Vec<&Resource>> {
        resource
            .parents
            .iter()
            .map(|parent| {
                self.resources
                    .get(parent)
                    .ok_or_else(|| ApiError::ParentNotFound {
                        resource: resource.singular.clone(),
                        parent: parent.clone(),
                    })
            })
            .collect()
    }

    /// Children of `resource`, as indexed by the last finalize
    pub fn child_resources(&self, resource: &Resource) -> Vec<&Resource> {
        resource
            .children
            .iter()
            .filter_map(|child| self.resources.get(child))
            .collect()
    }

    /// Collection name of a resource, without a redundant parent prefix.
    ///
    /// e.g. `book-editions` becomes `editions` under the parent `book`.
    pub fn collection_name(&self, resource: &Resource) -> String {
        let plural = resource.plural.as_str();
        let deduplicated = resource
            .parents
            .first()
            .and_then(|parent| {
                plural
                    .strip_prefix(parent.as_str())
                    .and_then(|rest| rest.strip_prefix('-').or_else(|| rest.strip_prefix('_')))
            })
            .filter(|rest| !rest.is_empty())
            .unwrap_or(plural);
        deduplicated.to_kebab_case()
    }

    /// Pattern segments of a resource: the explicit ones if present, else
    /// `{collection}/{singular_id}` appended to the first parent's pattern.
    pub fn pattern_elems(&self, resource: &Resource) -> Result<Vec<String>> {
        let mut visiting = HashSet::new();
        self.pattern_elems_inner(resource, &mut visiting)
    }

    fn pattern_elems_inner<'a>(
        &'a self,
        resource: &'a Resource,
        visiting: &mut HashSet<&'a str>,
    ) -> Result<Vec<String>> {
        if !resource.pattern_elems.is_empty() {
            return Ok(resource.pattern_elems.clone());
        }
        if !visiting.insert(resource.singular.as_str()) {
            let mut chain: Vec<String> = visiting.iter().map(|s| s.to_string()).collect();
            chain.sort();
            chain.push(resource.singular.clone());
            return Err(ApiError::CyclicParent(chain));
        }

        let mut elems = match resource.parents.first() {
            Some(parent) => {
                let parent_resource =
                    self.resources
                        .get(parent)
                        .ok_or_else(|| ApiError::ParentNotFound {
                            resource: resource.singular.clone(),
                            parent: parent.clone(),
                        })?;
                self.pattern_elems_inner(parent_resource, visiting)?
            }
            None => Vec::new(),
        };
        elems.push(self.collection_name(resource));
        elems.push(format!("{{{}}}", resource.id_param_name()));
        Ok(elems)
    }

    /// Pattern string, e.g. `publishers/{publisher_id}/books/{book_id}`
    pub fn pattern(&self, resource: &Resource) -> Result<String> {
        Ok(self.pattern_elems(resource)?.join("/"))
    }
}

impl Resource {
    /// Name of the synthesized identifier parameter, e.g. `book_edition_id`
    pub fn id_param_name(&self) -> String {
        format!("{}_id", self.singular.replace('-', "_"))
    }

    /// Whether the Create method accepts a caller-chosen id
    pub fn supports_user_settable_create(&self) -> bool {
        self.methods
            .create
            .is_some_and(|c| c.supports_user_settable_create)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(singular: &str, plural: &str, parents: &[&str]) -> Resource {
        Resource {
            singular: singular.to_string(),
            plural: plural.to_string(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            ..Resource::default()
        }
    }

    fn bookstore() -> Api {
        let mut api = Api {
            name: "bookstore".to_string(),
            server_url: "https://api.example.com".to_string(),
            ..Api::default()
        };
        for r in [
            resource("publisher", "publishers", &[]),
            resource("book", "books", &["publisher"]),
            resource("book-edition", "book-editions", &["book"]),
        ] {
            api.resources.insert(r.singular.clone(), r);
        }
        api
    }

    #[test]
    fn test_load_capitalized_keys() {
        let api = Api::from_json(
            r#"{
                "Name": "bookstore",
                "server_url": "https://api.example.com",
                "Contact": {"Name": "Books", "Email": "books@example.com", "URL": "https://example.com"},
                "Resources": {
                    "book": {
                        "singular": "book",
                        "plural": "books",
                        "custom_methods": [
                            {"Name": "archive", "Method": "POST", "Response": {"type": "object"}}
                        ]
                    }
                },
                "Schemas": {"account": {"type": "object"}}
            }"#,
        )
        .unwrap();

        assert_eq!(api.name, "bookstore");
        assert_eq!(api.contact.as_ref().unwrap().email, "books@example.com");
        assert_eq!(api.contact.as_ref().unwrap().url, "https://example.com");
        assert!(api.schemas.contains_key("account"));
        let book = api.resource("book").unwrap();
        assert_eq!(book.custom_methods[0].name, "archive");
        assert_eq!(book.custom_methods[0].method, HttpVerb::Post);
        assert!(book.custom_methods[0].response.is_some());

        let json = api.to_json().unwrap();
        assert!(json.contains("\"resources\""));
        assert!(!json.contains("\"Resources\""));
    }

    #[test]
    fn test_child_resources_follow_finalize() {
        let mut api = bookstore();
        let publisher = api.resource("publisher").unwrap();
        assert!(api.child_resources(publisher).is_empty());

        finalize(&mut api).unwrap();
        let publisher = api.resource("publisher").unwrap();
        let children: Vec<&str> = api
            .child_resources(publisher)
            .iter()
            .map(|r| r.singular.as_str())
            .collect();
        assert_eq!(children, vec!["book"]);
        let edition = api.resource("book-edition").unwrap();
        assert!(api.child_resources(edition).is_empty());
    }

    #[test]
    fn test_collection_name_dedup() {
        let api = bookstore();
        let edition = api.resource("book-edition").unwrap();
        assert_eq!(api.collection_name(edition), "editions");

        let book = api.resource("book").unwrap();
        assert_eq!(api.collection_name(book), "books");
    }

    #[test]
    fn test_collection_name_snake_case_plural() {
        let mut api = bookstore();
        api.resources.insert(
            "book_edition".to_string(),
            resource("book_edition", "book_editions", &["book"]),
        );
        let edition = api.resource("book_edition").unwrap();
        assert_eq!(api.collection_name(edition), "editions");
    }

    #[test]
    fn test_collection_name_never_empty() {
        let mut api = bookstore();
        api.resources
            .insert("book-".to_string(), resource("book-", "book-", &["book"]));
        let odd = api.resource("book-").unwrap();
        assert_eq!(api.collection_name(odd), "book");
    }

    #[test]
    fn test_pattern_synthesis_uses_parent_chain() {
        let api = bookstore();
        let edition = api.resource("book-edition").unwrap();
        assert_eq!(
            api.pattern(edition).unwrap(),
            "publishers/{publisher_id}/books/{book_id}/editions/{book_edition_id}"
        );
    }

    #[test]
    fn test_explicit_pattern_wins() {
        let mut api = bookstore();
        let book = api.resources.get_mut("book").unwrap();
        book.pattern_elems = vec![
            "publishers".to_string(),
            "{publisher}".to_string(),
            "books".to_string(),
            "{book}".to_string(),
        ];
        let edition = api.resource("book-edition").unwrap();
        assert_eq!(
            api.pattern(edition).unwrap(),
            "publishers/{publisher}/books/{book}/editions/{book_edition_id}"
        );
    }

    #[test]
    fn test_pattern_reports_missing_parent() {
        let mut api = bookstore();
        api.resources
            .insert("orphan".to_string(), resource("orphan", "orphans", &["ghost"]));
        let orphan = api.resource("orphan").unwrap();
        let err = api.pattern(orphan).unwrap_err();
        assert!(matches!(err, ApiError::ParentNotFound { .. }));
    }

    #[test]
    fn test_pattern_reports_parent_cycle() {
        let mut api = Api::default();
        api.resources
            .insert("a".to_string(), resource("a", "as", &["b"]));
        api.resources
            .insert("b".to_string(), resource("b", "bs", &["a"]));
        let a = api.resource("a").unwrap();
        assert!(matches!(api.pattern(a), Err(ApiError::CyclicParent(_))));
    }

    #[test]
    fn test_methods_fold() {
        let mut methods = Methods {
            get: Some(GetMethod {}),
            ..Methods::default()
        };
        methods.fold(Methods {
            delete: Some(DeleteMethod {
                is_long_running: true,
            }),
            ..Methods::default()
        });
        assert!(methods.get.is_some());
        assert!(methods.delete.unwrap().is_long_running);
    }

    #[test]
    fn test_resource_not_found() {
        let api = bookstore();
        let err = api.resource("magazine").unwrap_err();
        assert_eq!(err.to_string(), "Resource \"magazine\" not found");
    }
}
