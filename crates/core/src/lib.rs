//! Shared data model for the Breakwater trust gateway.
//!
//! Each admission component (session, broker, policy, approval, proxy,
//! gateway, wrapper) depends on this crate rather than redefining these
//! types, so the HTTP surface and the wrapper's argv surface agree on one
//! vocabulary.

pub mod approval;
pub mod classification;
pub mod credential;
pub mod enrollment;
pub mod glob;
pub mod ids;
pub mod policy;
pub mod request;
pub mod session;

pub use approval::{ApprovalRecord, ApprovalStatus, DEFAULT_APPROVAL_TTL_SECONDS};
pub use classification::ActionType;
pub use credential::CredentialBundle;
pub use enrollment::EnrollmentRecord;
pub use ids::{ApprovalId, Provider, RequestId, TenantId};
pub use policy::{PolicyException, PolicyMode, PolicyRecord};
pub use request::GatewayRequestRecord;
pub use session::{DEFAULT_SESSION_TTL_SECONDS, Session};
