use serde::{Deserialize, Serialize};

/// The axiom of the system: every outbound action is either a read or a
/// write. Reads are never gated; writes may require approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Read,
    Write,
}

impl ActionType {
    #[must_use]
    pub fn is_write(self) -> bool {
        matches!(self, Self::Write)
    }

    /// HTTP-surface classification is purely method-based.
    #[must_use]
    pub fn from_http_method(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" | "HEAD" | "OPTIONS" => Self::Read,
            _ => Self::Write,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_methods_classify_by_method_only() {
        for m in ["GET", "HEAD", "OPTIONS", "get", "Head"] {
            assert_eq!(ActionType::from_http_method(m), ActionType::Read);
        }
        for m in ["POST", "PUT", "PATCH", "DELETE"] {
            assert_eq!(ActionType::from_http_method(m), ActionType::Write);
        }
    }

    #[test]
    fn serializes_as_lowercase() {
        assert_eq!(serde_json::to_string(&ActionType::Read).unwrap(), "\"read\"");
        assert_eq!(serde_json::to_string(&ActionType::Write).unwrap(), "\"write\"");
    }
}
