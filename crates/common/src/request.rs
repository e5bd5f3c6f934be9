//! Request URL construction for generic REST clients

use crate::api::{Api, Resource};
use crate::constants::FIELD_ID_NAME;
use crate::{ApiError, Result};
use std::collections::HashMap;
use url::form_urlencoded;

impl Api {
    /// URL of the collection holding `resource`, e.g.
    /// `https://api.example.com/publishers/acme/books`.
    ///
    /// `params` maps path parameter names (without braces) to values. A value
    /// holding a full resource path only contributes its last segment.
    pub fn collection_url(
        &self,
        resource: &Resource,
        server_url: &str,
        params: &HashMap<String, String>,
    ) -> Result<String> {
        let elems = self.pattern_elems(resource)?;
        let collection = &elems[..elems.len().saturating_sub(1)];

        let mut url = server_url.trim_end_matches('/').to_string();
        for elem in collection {
            url.push('/');
            match elem.strip_prefix('{').and_then(|e| e.strip_suffix('}')) {
                Some(name) => {
                    let value = params
                        .get(name)
                        .ok_or_else(|| ApiError::MissingPathParameter {
                            resource: resource.singular.clone(),
                            parameter: name.to_string(),
                        })?;
                    url.push_str(value.rsplit('/').next().unwrap_or(value));
                }
                None => url.push_str(elem),
            }
        }
        Ok(url)
    }

    /// URL a Create request is sent to. `?id=` is appended only when the
    /// resource accepts caller-chosen ids and one is given.
    pub fn create_url(
        &self,
        resource: &Resource,
        server_url: &str,
        params: &HashMap<String, String>,
        id: Option<&str>,
    ) -> Result<String> {
        let mut url = self.collection_url(resource, server_url, params)?;
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            if resource.supports_user_settable_create() {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair(FIELD_ID_NAME, id)
                    .finish();
                url.push('?');
                url.push_str(&query);
            }
        }
        Ok(url)
    }
}
