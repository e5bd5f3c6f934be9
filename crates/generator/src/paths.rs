//! URL paths emitted for a resource

use aep_openapi_common::openapi::Parameter;
use aep_openapi_common::{Api, FieldAnnotation, Resource, Result};

/// An item path together with the path parameters it declares.
///
/// The last parameter is always the resource's own identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct PathWithParams {
    /// Path with a leading slash, e.g. `/publishers/{publisher_id}/books/{book_id}`
    pub pattern: String,
    pub params: Vec<Parameter>,
}

impl PathWithParams {
    /// Path of the enclosing collection, e.g. `/publishers/{publisher_id}/books`
    pub fn collection_path(&self) -> &str {
        self.pattern
            .rsplit_once('/')
            .map(|(collection, _)| collection)
            .unwrap_or(&self.pattern)
    }

    /// Parameters of the collection path
    pub fn collection_params(&self) -> &[Parameter] {
        &self.params[..self.params.len().saturating_sub(1)]
    }

    /// Pattern as stored in `x-aep-resource.patterns`
    pub fn annotation_pattern(&self) -> String {
        self.pattern.trim_start_matches('/').to_string()
    }
}

/// Every item path of `resource`.
///
/// Explicit pattern segments produce exactly one path. Otherwise one path is
/// synthesized per route through the parent graph, each parent contributing
/// `/{collection}/{parent_id}` with a parameter referencing that parent.
pub fn item_paths(api: &Api, resource: &Resource) -> Result<Vec<PathWithParams>> {
    if !resource.pattern_elems.is_empty() {
        let params = resource
            .pattern_elems
            .iter()
            .filter_map(|elem| elem.strip_prefix('{').and_then(|e| e.strip_suffix('}')))
            .map(Parameter::path)
            .collect();
        return Ok(vec![PathWithParams {
            pattern: format!("/{}", resource.pattern_elems.join("/")),
            params,
        }]);
    }

    let own = format!(
        "/{}/{{{}}}",
        api.collection_name(resource),
        resource.id_param_name()
    );
    let own_param = Parameter::path(&resource.id_param_name());

    let parents = api.parent_resources(resource)?;
    if parents.is_empty() {
        return Ok(vec![PathWithParams {
            pattern: own,
            params: vec![own_param],
        }]);
    }

    let mut paths = Vec::new();
    for parent in parents {
        for mut prefix in item_paths(api, parent)? {
            if let Some(parent_param) = prefix.params.last_mut() {
                parent_param.field = Some(FieldAnnotation::resource_reference(vec![
                    parent.singular.clone(),
                ]));
            }
            prefix.pattern.push_str(&own);
            prefix.params.push(own_param.clone());
            paths.push(prefix);
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bookstore() -> Api {
        Api::from_json(
            r#"{
                "name": "bookstore",
                "server_url": "https://bookstore.example.com",
                "resources": {
                    "publisher": {"singular": "publisher", "plural": "publishers"},
                    "author": {"singular": "author", "plural": "authors"},
                    "book": {"singular": "book", "plural": "books", "parents": ["publisher", "author"]},
                    "book-edition": {"singular": "book-edition", "plural": "book-editions", "parents": ["book"]}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_top_level_path() {
        let api = bookstore();
        let paths = item_paths(&api, api.resource("publisher").unwrap()).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].pattern, "/publishers/{publisher_id}");
        assert_eq!(paths[0].collection_path(), "/publishers");
        assert!(paths[0].collection_params().is_empty());
        assert_eq!(paths[0].annotation_pattern(), "publishers/{publisher_id}");
    }

    #[test]
    fn test_one_path_per_parent_route() {
        let api = bookstore();
        let paths = item_paths(&api, api.resource("book-edition").unwrap()).unwrap();
        let patterns: Vec<&str> = paths.iter().map(|p| p.pattern.as_str()).collect();
        assert_eq!(
            patterns,
            vec![
                "/publishers/{publisher_id}/books/{book_id}/editions/{book_edition_id}",
                "/authors/{author_id}/books/{book_id}/editions/{book_edition_id}",
            ]
        );

        let params = &paths[0].params;
        assert_eq!(params.len(), 3);
        assert_eq!(
            params[0].field.as_ref().unwrap().resource_reference,
            vec!["publisher".to_string()]
        );
        assert_eq!(
            params[1].field.as_ref().unwrap().resource_reference,
            vec!["book".to_string()]
        );
        assert_eq!(params[2].name, "book_edition_id");
        assert!(params[2].field.is_none());
    }

    #[test]
    fn test_explicit_pattern_is_reused() {
        let mut api = bookstore();
        if let Some(publisher) = api.resources.get_mut("publisher") {
            publisher.pattern_elems = vec!["pubs".to_string(), "{pub}".to_string()];
        }
        let paths = item_paths(&api, api.resource("book").unwrap()).unwrap();
        assert_eq!(paths[0].pattern, "/pubs/{pub}/books/{book_id}");
        assert_eq!(paths[0].params[0].name, "pub");
    }
}
