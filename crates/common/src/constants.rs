//! Well-known field names, content types and references

/// Server-assigned path field injected into every resource schema
pub const FIELD_PATH_NAME: &str = "path";
/// Field number reserved for the injected path field
pub const FIELD_PATH_NUMBER: u32 = 10018;
pub const FIELD_PATH_DESCRIPTION: &str =
    "The server-assigned path of the resource, which is unique within the service.";

pub const FIELD_ID_NAME: &str = "id";
pub const FIELD_RESULTS_NAME: &str = "results";
pub const FIELD_NEXT_PAGE_TOKEN_NAME: &str = "next_page_token";
pub const FIELD_MAX_PAGE_SIZE_NAME: &str = "max_page_size";
pub const FIELD_PAGE_TOKEN_NAME: &str = "page_token";
pub const FIELD_SKIP_NAME: &str = "skip";
pub const FIELD_FILTER_NAME: &str = "filter";
pub const FIELD_UNREACHABLE_NAME: &str = "unreachable";
pub const FIELD_FORCE_NAME: &str = "force";

pub const APPLICATION_JSON: &str = "application/json";
pub const JSON_MERGE_PATCH: &str = "application/merge-patch+json";

/// Schema referenced by the success response of long-running methods
pub const OPERATION_REF: &str = "https://aep.dev/json-schema/type/operation.json";

/// OpenAPI version written by the generator
pub const EMITTED_OPENAPI_VERSION: &str = "3.1.0";
