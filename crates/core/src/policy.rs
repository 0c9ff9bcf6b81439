use serde::{Deserialize, Serialize};

/// Tenant-level policy mode (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// Every write requires approval, no exceptions.
    Strict,
    /// Writes require approval unless they match an exception.
    Cautious,
}

/// One exception under `cautious` mode. Absent fields act as wildcards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyException {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    /// Shell-style glob patterns (`*` within a segment, `?` for one char),
    /// anchored to the full path.
    #[serde(default)]
    pub paths: Vec<String>,
}

impl PolicyException {
    #[must_use]
    pub fn matches(&self, provider: &str, method: &str, path: &str) -> bool {
        let provider_ok = self
            .provider
            .as_deref()
            .is_none_or(|p| p.eq_ignore_ascii_case(provider));
        let method_ok = self.methods.is_empty()
            || self
                .methods
                .iter()
                .any(|m| m.eq_ignore_ascii_case(method));
        let path_ok = self.paths.is_empty()
            || self
                .paths
                .iter()
                .any(|pattern| crate::glob::glob_match(pattern, path));
        provider_ok && method_ok && path_ok
    }
}

/// A tenant's policy record: mode plus the exceptions that apply under
/// `cautious` mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub mode: PolicyMode,
    #[serde(default)]
    pub exceptions: Vec<PolicyException>,
}

impl PolicyRecord {
    #[must_use]
    pub fn strict() -> Self {
        Self {
            mode: PolicyMode::Strict,
            exceptions: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_wildcards_match_anything() {
        let exc = PolicyException::default();
        assert!(exc.matches("github", "POST", "/repos/o/r/issues"));
    }

    #[test]
    fn exception_narrows_on_provider_and_method() {
        let exc = PolicyException {
            provider: Some("github".to_string()),
            methods: vec!["POST".to_string()],
            paths: Vec::new(),
        };
        assert!(exc.matches("github", "POST", "/anything"));
        assert!(!exc.matches("gitlab", "POST", "/anything"));
        assert!(!exc.matches("github", "DELETE", "/anything"));
    }

    #[test]
    fn exception_narrows_on_glob_path() {
        let exc = PolicyException {
            provider: None,
            methods: Vec::new(),
            paths: vec!["/repos/*/comments".to_string()],
        };
        assert!(exc.matches("github", "POST", "/repos/42/comments"));
        assert!(!exc.matches("github", "POST", "/repos/42/issues"));
    }
}
