//! Approvals and dynamic-team recruitment for supervisor workflows (§4.J).

pub mod approvals;
pub mod dynamic_team;

pub use approvals::{
    request_approval, requires_approval, ApprovalDecision, DANGEROUS_TOOLS, DEFAULT_APPROVAL_TIMEOUT,
    DEFAULT_COMPLEXITY_THRESHOLD,
};
pub use dynamic_team::{DynamicTeam, TeamMember};
