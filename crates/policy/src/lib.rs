//! Policy Engine (component C): classifies actions and decides whether a
//! write requires human approval.
//!
//! Grounded on `acteon-rules/rules`'s condition-evaluation shape (evaluate
//! a record against a tenant's configured rules) but collapsed to the
//! spec's two fixed modes — strict / cautious-with-exceptions — rather
//! than a general rule DSL, per the spec's own non-goal.

mod classify;
mod table;

pub use classify::classify_cli;
pub use table::PolicyTable;

use breakwater_core::{ActionType, PolicyMode, TenantId};

/// Decide whether the given action requires human approval (§4.3).
///
/// Reads never require approval. Writes always require approval in
/// `strict` mode. In `cautious` mode, a write requires approval unless it
/// matches a configured exception.
#[must_use]
pub fn requires_approval(
    table: &PolicyTable,
    tenant_id: &TenantId,
    classification: ActionType,
    provider: &str,
    method: &str,
    path: &str,
) -> bool {
    if classification == ActionType::Read {
        return false;
    }

    let policy = table.for_tenant(tenant_id);
    match policy.mode {
        PolicyMode::Strict => true,
        PolicyMode::Cautious => !policy
            .exceptions
            .iter()
            .any(|exception| exception.matches(provider, method, path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breakwater_core::{PolicyException, PolicyRecord};
    use std::collections::HashMap;

    #[test]
    fn reads_never_require_approval_regardless_of_mode() {
        let table = PolicyTable::new(HashMap::new(), PolicyRecord::strict());
        let tenant = TenantId::from("default");
        assert!(!requires_approval(
            &table,
            &tenant,
            ActionType::Read,
            "github",
            "GET",
            "/user"
        ));
    }

    #[test]
    fn strict_mode_gates_every_write() {
        let table = PolicyTable::new(HashMap::new(), PolicyRecord::strict());
        let tenant = TenantId::from("default");
        assert!(requires_approval(
            &table,
            &tenant,
            ActionType::Write,
            "github",
            "POST",
            "/repos/o/r/issues"
        ));
    }

    #[test]
    fn cautious_mode_allows_matching_exceptions_through() {
        let mut records = HashMap::new();
        records.insert(
            TenantId::from("acme"),
            PolicyRecord {
                mode: PolicyMode::Cautious,
                exceptions: vec![PolicyException {
                    provider: Some("github".to_string()),
                    methods: vec!["POST".to_string()],
                    paths: vec!["/repos/*/comments".to_string()],
                }],
            },
        );
        let table = PolicyTable::new(records, PolicyRecord::strict());
        let tenant = TenantId::from("acme");

        assert!(!requires_approval(
            &table,
            &tenant,
            ActionType::Write,
            "github",
            "POST",
            "/repos/42/comments"
        ));
        assert!(requires_approval(
            &table,
            &tenant,
            ActionType::Write,
            "github",
            "POST",
            "/repos/42/issues"
        ));
    }

    #[test]
    fn unknown_tenant_falls_back_to_default_policy() {
        let table = PolicyTable::new(HashMap::new(), PolicyRecord::strict());
        assert!(requires_approval(
            &table,
            &TenantId::from("ghost"),
            ActionType::Write,
            "github",
            "POST",
            "/x"
        ));
    }
}
