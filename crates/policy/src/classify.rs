use breakwater_core::ActionType;

/// Classify a CLI invocation's argument vector as READ or WRITE, per the
/// provider-specific table (§4.3). Case-insensitive; operates on the
/// first positional token unless noted (curl inspects the whole command
/// line for method flags). Default is WRITE — conservative — whenever no
/// rule fires, since an unrecognized provider or subcommand could mutate
/// state.
#[must_use]
pub fn classify_cli(provider: &str, command_line: &str) -> ActionType {
    let provider = provider.to_ascii_lowercase();
    let first_token = command_line
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();

    match provider.as_str() {
        "aws" => {
            if starts_with_any(&first_token, &["list", "describe", "get"]) {
                ActionType::Read
            } else {
                ActionType::Write
            }
        }
        "gcloud" | "gcp" => {
            if matches_any(&first_token, &["list", "describe"]) {
                ActionType::Read
            } else if matches_any(
                &first_token,
                &["create", "delete", "update", "deploy", "set", "enable", "disable"],
            ) {
                ActionType::Write
            } else {
                ActionType::Read
            }
        }
        "terraform" => {
            if matches_any(
                &first_token,
                &["apply", "destroy", "taint", "untaint", "import"],
            ) {
                ActionType::Write
            } else {
                ActionType::Read
            }
        }
        "kubectl" => {
            if matches_any(
                &first_token,
                &[
                    "apply", "delete", "scale", "patch", "set", "rollout", "expose",
                    "autoscale", "cordon", "drain", "taint",
                ],
            ) {
                ActionType::Write
            } else {
                ActionType::Read
            }
        }
        "gh" => {
            if starts_with_any(
                &first_token,
                &["create", "delete", "update", "edit", "merge", "close", "open", "fork"],
            ) {
                ActionType::Write
            } else {
                ActionType::Read
            }
        }
        "curl" => {
            let upper = command_line.to_ascii_uppercase();
            let has_mutating_method = ["-X POST", "-X PUT", "-X PATCH", "-X DELETE"]
                .iter()
                .any(|flag| upper.contains(flag));
            if has_mutating_method || command_line.contains("-d ") {
                ActionType::Write
            } else {
                ActionType::Read
            }
        }
        "datadog" => {
            if matches_any(&first_token, &["create", "delete", "update", "edit", "set"]) {
                ActionType::Write
            } else {
                ActionType::Read
            }
        }
        "linear" => {
            if matches_any(
                &first_token,
                &["create", "delete", "update", "edit", "set", "assign", "move"],
            ) {
                ActionType::Write
            } else {
                ActionType::Read
            }
        }
        _ => ActionType::Write,
    }
}

fn matches_any(token: &str, candidates: &[&str]) -> bool {
    candidates.iter().any(|c| *c == token)
}

fn starts_with_any(token: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| token.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kubectl_scenarios_from_spec() {
        assert_eq!(classify_cli("kubectl", "get pods"), ActionType::Read);
        assert_eq!(classify_cli("kubectl", "apply -f x.yaml"), ActionType::Write);
    }

    #[test]
    fn terraform_scenarios_from_spec() {
        assert_eq!(classify_cli("terraform", "plan"), ActionType::Read);
        assert_eq!(classify_cli("terraform", "apply"), ActionType::Write);
    }

    #[test]
    fn aws_scenarios_from_spec() {
        assert_eq!(classify_cli("aws", "list-buckets"), ActionType::Read);
        assert_eq!(
            classify_cli("aws", "put-object --bucket b --key k"),
            ActionType::Write
        );
    }

    #[test]
    fn unrecognized_provider_defaults_to_write() {
        assert_eq!(classify_cli("mystery-tool", "anything"), ActionType::Write);
    }

    #[test]
    fn curl_classifies_by_method_flag_or_data() {
        assert_eq!(classify_cli("curl", "https://api.example.com/x"), ActionType::Read);
        assert_eq!(
            classify_cli("curl", "-X POST https://api.example.com/x"),
            ActionType::Write
        );
        assert_eq!(
            classify_cli("curl", "-d '{}' https://api.example.com/x"),
            ActionType::Write
        );
    }

    #[test]
    fn gh_recognizes_prefixed_first_token() {
        assert_eq!(classify_cli("gh", "create --title x"), ActionType::Write);
        assert_eq!(classify_cli("gh", "list"), ActionType::Read);
    }
}
