//! Child-process environment construction for the wrapper contract (§4.7
//! step 4).
//!
//! Grounded on `breakwater-proxy`'s `injected_headers` dispatch shape (a
//! pure function from provider name to the values a credential bundle
//! should produce) — here producing environment variables instead of
//! headers, since the wrapper execs a child process rather than issuing
//! an HTTP request.

use std::collections::HashMap;
use std::io::Write;

use breakwater_core::CredentialBundle;

/// Substrings that mark a parent environment variable as sensitive and
/// therefore excluded from the child environment (§4.7 step 4a, §8
/// testable property). Matched case-insensitively against the variable
/// name, not its value.
const SENSITIVE_NAME_SUBSTRINGS: &[&str] = &["KEY", "SECRET", "TOKEN", "PASSWORD"];

/// True if `name`, upper-cased, contains any of [`SENSITIVE_NAME_SUBSTRINGS`].
#[must_use]
pub fn is_sensitive_name(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    SENSITIVE_NAME_SUBSTRINGS
        .iter()
        .any(|pattern| upper.contains(pattern))
}

/// Filter a parent environment down to the variables safe to forward to
/// a child (§4.7 step 4a). The caller supplies the parent environment as
/// an iterator so tests don't need to touch the real process environment.
pub fn scrub_parent_env<I>(parent: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (String, String)>,
{
    parent
        .into_iter()
        .filter(|(name, _)| !is_sensitive_name(name))
        .collect()
}

/// Write `contents` to a fresh temp file and return its path as a string.
/// Used for providers whose credential field is file content (a
/// kubeconfig, a GCP service-account JSON key) rather than a token a CLI
/// reads straight out of an env var's value.
fn materialize_file(prefix: &str, contents: &str) -> Option<String> {
    let mut path = std::env::temp_dir();
    let unique = std::process::id();
    path.push(format!("breakwater-{prefix}-{unique}"));
    let mut file = std::fs::File::create(&path).ok()?;
    file.write_all(contents.as_bytes()).ok()?;
    Some(path.to_string_lossy().into_owned())
}

/// Environment variables to add for one provider's resolved credential
/// bundle (§4.7 step 4b, grounded on §4.2's bundle field names and
/// §4.5's per-provider injection table). Returns an empty vec for a
/// bundle that carries none of the fields a given provider's rule looks
/// for, same contract as the forward proxy's header injection.
///
/// Provider CLI env var names here are the conventional ones each tool's
/// own documentation specifies (`AWS_ACCESS_KEY_ID`, `KUBECONFIG`, ...);
/// the spec fixes the bundle's field names but not these, so this
/// mapping is this crate's own Open Question resolution (see
/// `DESIGN.md`).
#[must_use]
pub fn injected_env_vars(provider: &str, bundle: &CredentialBundle) -> Vec<(String, String)> {
    let mut out = Vec::new();
    match provider {
        "aws" => {
            if let Some(v) = bundle.get("access_key") {
                out.push(("AWS_ACCESS_KEY_ID".to_string(), v.to_string()));
            }
            if let Some(v) = bundle.get("secret_key") {
                out.push(("AWS_SECRET_ACCESS_KEY".to_string(), v.to_string()));
            }
            if let Some(v) = bundle.get("session_token") {
                out.push(("AWS_SESSION_TOKEN".to_string(), v.to_string()));
            }
            if let Some(v) = bundle.get("region") {
                out.push(("AWS_DEFAULT_REGION".to_string(), v.to_string()));
            }
        }
        "gcloud" | "gcp" => {
            if let Some(v) = bundle.get("credentials_json") {
                if let Some(path) = materialize_file("gcp-creds", v) {
                    out.push(("GOOGLE_APPLICATION_CREDENTIALS".to_string(), path));
                }
            }
            if let Some(v) = bundle.get("project_id") {
                out.push(("CLOUDSDK_CORE_PROJECT".to_string(), v.to_string()));
            }
        }
        "kubectl" => {
            if let Some(v) = bundle.get("kubeconfig") {
                if let Some(path) = materialize_file("kubeconfig", v) {
                    out.push(("KUBECONFIG".to_string(), path));
                }
            }
        }
        "gh" => {
            if let Some(v) = bundle.get("token").or_else(|| bundle.get("bearer_token")) {
                out.push(("GH_TOKEN".to_string(), v.to_string()));
            }
        }
        "datadog" => {
            if let Some(v) = bundle.get("api_key") {
                out.push(("DD_API_KEY".to_string(), v.to_string()));
            }
            if let Some(v) = bundle.get("app_key") {
                out.push(("DD_APP_KEY".to_string(), v.to_string()));
            }
        }
        "linear" => {
            if let Some(v) = bundle.get("api_key").or_else(|| bundle.get("token")) {
                out.push(("LINEAR_API_KEY".to_string(), v.to_string()));
            }
        }
        _ => {}
    }
    out
}

/// Build the full child environment: scrubbed parent env, overlaid with
/// the provider's injected credential variables (§4.7 step 4).
#[must_use]
pub fn build_child_env<I>(
    parent: I,
    provider: &str,
    credentials: Option<&CredentialBundle>,
) -> HashMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut env: HashMap<String, String> = scrub_parent_env(parent).into_iter().collect();
    if let Some(bundle) = credentials {
        for (name, value) in injected_env_vars(provider, bundle) {
            env.insert(name, value);
        }
    }
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrubs_sensitive_parent_variables() {
        let parent = vec![
            ("AWS_SECRET_ACCESS_KEY".to_string(), "leak".to_string()),
            ("GITHUB_TOKEN".to_string(), "leak".to_string()),
            ("DB_PASSWORD".to_string(), "leak".to_string()),
            ("API_KEY".to_string(), "leak".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
            ("HOME".to_string(), "/home/agent".to_string()),
        ];
        let scrubbed: HashMap<_, _> = scrub_parent_env(parent).into_iter().collect();
        assert!(!scrubbed.contains_key("AWS_SECRET_ACCESS_KEY"));
        assert!(!scrubbed.contains_key("GITHUB_TOKEN"));
        assert!(!scrubbed.contains_key("DB_PASSWORD"));
        assert!(!scrubbed.contains_key("API_KEY"));
        assert_eq!(scrubbed.get("PATH"), Some(&"/usr/bin".to_string()));
        assert_eq!(scrubbed.get("HOME"), Some(&"/home/agent".to_string()));
    }

    #[test]
    fn is_sensitive_name_matches_case_insensitively() {
        assert!(is_sensitive_name("aws_secret_access_key"));
        assert!(is_sensitive_name("MyToken"));
        assert!(!is_sensitive_name("PATH"));
        assert!(!is_sensitive_name("LANG"));
    }

    #[test]
    fn github_injection_maps_token_field() {
        let bundle = CredentialBundle::single("token", "ghs_abc".to_string());
        let vars = injected_env_vars("gh", &bundle);
        assert_eq!(vars, vec![("GH_TOKEN".to_string(), "ghs_abc".to_string())]);
    }

    #[test]
    fn aws_injection_maps_all_present_fields() {
        let mut fields = std::collections::HashMap::new();
        fields.insert("access_key".to_string(), "AKIA".to_string());
        fields.insert("secret_key".to_string(), "shh".to_string());
        fields.insert("region".to_string(), "us-east-1".to_string());
        let bundle = CredentialBundle::new(fields);
        let vars = injected_env_vars("aws", &bundle);
        let as_map: HashMap<_, _> = vars.into_iter().collect();
        assert_eq!(as_map.get("AWS_ACCESS_KEY_ID"), Some(&"AKIA".to_string()));
        assert_eq!(as_map.get("AWS_SECRET_ACCESS_KEY"), Some(&"shh".to_string()));
        assert_eq!(as_map.get("AWS_DEFAULT_REGION"), Some(&"us-east-1".to_string()));
        assert!(!as_map.contains_key("AWS_SESSION_TOKEN"));
    }

    #[test]
    fn unrecognized_provider_injects_nothing() {
        let bundle = CredentialBundle::single("token", "x".to_string());
        assert!(injected_env_vars("mystery", &bundle).is_empty());
    }

    #[test]
    fn build_child_env_overlays_injection_onto_scrubbed_parent() {
        let parent = vec![
            ("GH_TOKEN".to_string(), "stale".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ];
        let bundle = CredentialBundle::single("token", "fresh".to_string());
        let env = build_child_env(parent, "gh", Some(&bundle));
        assert_eq!(env.get("GH_TOKEN"), Some(&"fresh".to_string()));
        assert_eq!(env.get("PATH"), Some(&"/usr/bin".to_string()));
    }
}
