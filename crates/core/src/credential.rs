use std::collections::HashMap;

use breakwater_crypto::{ExposeSecret, SecretString};
use serde::Deserialize;

/// A provider-specific bundle of named credential fields (e.g. `token`,
/// `access_key`, `secret_key`, `api_key`, `bearer_token`). Immutable once
/// constructed; the broker hands out a fresh clone per call so a caller
/// can't mutate cache contents.
///
/// `Debug` is redacted: field names are shown, values are not. Not
/// `Serialize`: `secrecy::SecretString` opts out of it on purpose, and
/// nothing should put raw field values on the wire by accident. Callers
/// that need to hand a bundle's fields to a client build their own
/// response type instead (see `gateway::api::credentials::CredentialsResponse`).
#[derive(Clone, Deserialize)]
pub struct CredentialBundle {
    fields: HashMap<String, SecretString>,
}

impl CredentialBundle {
    #[must_use]
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k, SecretString::from(v)))
                .collect(),
        }
    }

    /// Build a single-field bundle, as produced by the `CRED_<TENANT>_<SELECTOR>`
    /// environment-variable resolver (§4.2).
    #[must_use]
    pub fn single(field: &str, value: String) -> Self {
        let mut fields = HashMap::with_capacity(1);
        fields.insert(field.to_string(), value);
        Self::new(fields)
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(ExposeSecret::expose_secret)
    }

    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("fields", &self.field_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_exposes_values() {
        let bundle = CredentialBundle::single("token", "super-secret".to_string());
        let rendered = format!("{bundle:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("token"));
    }

    #[test]
    fn get_returns_the_stored_value() {
        let bundle = CredentialBundle::single("token", "abc123".to_string());
        assert_eq!(bundle.get("token"), Some("abc123"));
        assert_eq!(bundle.get("missing"), None);
    }
}
