//! JSON Schema subset used by both OpenAPI documents and the resource model
//!
//! Only the vocabulary the resource model reasons about is typed. Every other
//! keyword is carried in [`Schema::extensions`] so it survives a round trip.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Older documents carry the field ordinal as its own keyword
const LEGACY_FIELD_NUMBER_KEY: &str = "x-aep-field-number";

/// Schema kind (`type` keyword)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Integer,
    Boolean,
    Number,
}

impl SchemaType {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "object" => Some(SchemaType::Object),
            "array" => Some(SchemaType::Array),
            "string" => Some(SchemaType::String),
            "integer" => Some(SchemaType::Integer),
            "boolean" => Some(SchemaType::Boolean),
            "number" => Some(SchemaType::Number),
            _ => None,
        }
    }
}

/// Schema definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Type: string, number, integer, boolean, array, object
    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_schema_type"
    )]
    pub schema_type: Option<SchemaType>,

    /// Format (e.g., int32, int64, date-time)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Properties (for object type)
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,

    /// Items schema (for array type)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    /// Reference to another schema location
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Required properties
    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    pub required: IndexSet<String>,

    #[serde(rename = "readOnly", default, skip_serializing_if = "is_false")]
    pub read_only: bool,

    /// Additional properties, either a flag or a value schema
    #[serde(
        rename = "additionalProperties",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<AdditionalProperties>,

    /// Resource annotation declared by the document author
    #[serde(
        rename = "x-aep-resource",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub resource: Option<ResourceAnnotation>,

    /// Field annotation (field number, behaviors, resource references)
    #[serde(rename = "x-aep-field", default, skip_serializing_if = "Option::is_none")]
    pub field: Option<FieldAnnotation>,

    /// Any other keyword (enum, allOf, x-*, ...)
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// `additionalProperties` can be a bool or a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Flag(bool),
    Schema(Box<Schema>),
}

/// `x-aep-resource` annotation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAnnotation {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub singular: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub plural: String,

    /// URL patterns; only the first one is honored
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,

    /// Singular names of the parent resources
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,

    /// Fully qualified type, `{api}/{singular}`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

/// `x-aep-field` annotation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAnnotation {
    /// Ordinal consumed by the proto backend only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_number: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub behavior: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_reference: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_reference_child_type: Vec<String>,
}

impl FieldAnnotation {
    /// Annotation that only references the given resources
    pub fn resource_reference(resources: Vec<String>) -> Self {
        Self {
            resource_reference: resources,
            ..Self::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.field_number.is_none()
            && self.behavior.is_empty()
            && self.resource_reference.is_empty()
            && self.resource_reference_child_type.is_empty()
    }
}

impl Schema {
    /// Schema of the given kind with nothing else set
    pub fn of_type(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Self::default()
        }
    }

    /// Schema that only points at `reference`
    pub fn reference_to(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            ..Self::default()
        }
    }

    /// Array schema whose items are `items`
    pub fn array_of(items: Schema) -> Self {
        Self {
            schema_type: Some(SchemaType::Array),
            items: Some(Box::new(items)),
            ..Self::default()
        }
    }

    /// Last segment of the reference, e.g. `Pod` for `#/components/schemas/Pod`
    pub fn reference_key(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .and_then(|r| r.rsplit('/').next())
            .filter(|key| !key.is_empty())
    }

    pub fn is_array(&self) -> bool {
        self.schema_type == Some(SchemaType::Array)
    }

    /// Recursively remove field numbers, including the standalone
    /// `x-aep-field-number` keyword.
    ///
    /// The field annotation itself is dropped only when the number was all it
    /// carried.
    pub fn strip_field_numbers(&mut self) {
        if let Some(field) = self.field.as_mut() {
            field.field_number = None;
            if field.is_empty() {
                self.field = None;
            }
        }
        self.extensions.shift_remove(LEGACY_FIELD_NUMBER_KEY);
        for property in self.properties.values_mut() {
            property.strip_field_numbers();
        }
        if let Some(items) = self.items.as_mut() {
            items.strip_field_numbers();
        }
        if let Some(AdditionalProperties::Schema(value)) = self.additional_properties.as_mut() {
            value.strip_field_numbers();
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Accepts `"string"` as well as OpenAPI 3.1 lists like `["string", "null"]`.
/// Unknown kinds leave the type unset instead of failing the whole document.
fn deserialize_schema_type<'de, D>(deserializer: D) -> Result<Option<SchemaType>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(name)) => SchemaType::from_name(&name),
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(Value::as_str)
            .find_map(SchemaType::from_name),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_key() {
        let schema = Schema::reference_to("#/components/schemas/BookEdition");
        assert_eq!(schema.reference_key(), Some("BookEdition"));

        let schema = Schema::reference_to("#/definitions/Widget");
        assert_eq!(schema.reference_key(), Some("Widget"));

        assert_eq!(Schema::default().reference_key(), None);
    }

    #[test]
    fn test_deserialize_type_variants() {
        let schema: Schema = serde_json::from_str(r#"{"type": ["null", "integer"]}"#).unwrap();
        assert_eq!(schema.schema_type, Some(SchemaType::Integer));

        let schema: Schema = serde_json::from_str(r#"{"type": "null"}"#).unwrap();
        assert_eq!(schema.schema_type, None);
    }

    #[test]
    fn test_unknown_keywords_are_preserved() {
        let json = r#"{"type": "string", "enum": ["a", "b"], "x-custom": true}"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.extensions.len(), 2);

        let back = serde_json::to_value(&schema).unwrap();
        assert_eq!(back["enum"], serde_json::json!(["a", "b"]));
        assert_eq!(back["x-custom"], serde_json::json!(true));
    }

    #[test]
    fn test_additional_properties_forms() {
        let schema: Schema =
            serde_json::from_str(r#"{"type": "object", "additionalProperties": true}"#).unwrap();
        assert_eq!(
            schema.additional_properties,
            Some(AdditionalProperties::Flag(true))
        );

        let schema: Schema = serde_json::from_str(
            r#"{"type": "object", "additionalProperties": {"type": "integer"}}"#,
        )
        .unwrap();
        match schema.additional_properties {
            Some(AdditionalProperties::Schema(value)) => {
                assert_eq!(value.schema_type, Some(SchemaType::Integer))
            }
            other => panic!("unexpected additionalProperties: {:?}", other),
        }
    }

    #[test]
    fn test_strip_field_numbers_keeps_other_annotation_content() {
        let json = r#"{
            "type": "object",
            "x-aep-field": {"field_number": 1},
            "properties": {
                "name": {"type": "string", "x-aep-field": {"field_number": 2}},
                "title": {"type": "string", "x-aep-field-number": 6, "x-order": 1},
                "publisher": {
                    "type": "string",
                    "x-aep-field": {"field_number": 3, "resource_reference": ["publisher"]}
                },
                "tags": {
                    "type": "array",
                    "items": {"type": "string", "x-aep-field": {"field_number": 4, "behavior": ["FIELD_BEHAVIOR_REQUIRED"]}}
                },
                "labels": {
                    "type": "object",
                    "additionalProperties": {"type": "string", "x-aep-field": {"field_number": 5}}
                }
            }
        }"#;
        let mut schema: Schema = serde_json::from_str(json).unwrap();
        schema.strip_field_numbers();

        assert!(schema.field.is_none());
        assert!(schema.properties["name"].field.is_none());

        let publisher = schema.properties["publisher"].field.as_ref().unwrap();
        assert_eq!(publisher.field_number, None);
        assert_eq!(publisher.resource_reference, vec!["publisher".to_string()]);

        let items = schema.properties["tags"].items.as_ref().unwrap();
        let field = items.field.as_ref().unwrap();
        assert_eq!(field.field_number, None);
        assert_eq!(field.behavior, vec!["FIELD_BEHAVIOR_REQUIRED".to_string()]);

        match &schema.properties["labels"].additional_properties {
            Some(AdditionalProperties::Schema(value)) => assert!(value.field.is_none()),
            other => panic!("unexpected additionalProperties: {:?}", other),
        }

        let title = &schema.properties["title"];
        assert!(!title.extensions.contains_key("x-aep-field-number"));
        assert!(title.extensions.contains_key("x-order"));

        let text = serde_json::to_string(&schema).unwrap();
        assert!(!text.contains("field_number"));
        assert!(!text.contains("field-number"));
    }
}
