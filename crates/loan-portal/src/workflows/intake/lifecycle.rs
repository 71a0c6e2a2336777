//! Application status transition table.
//!
//! | actor          | from            | to                                                   |
//! |----------------|-----------------|------------------------------------------------------|
//! | owner          | `draft`         | `submitted`                                          |
//! | broker / admin | any but `draft` | `pending`, `under_review`, `approved`, `rejected`, `completed` |
//! | owner          | `draft`         | deleted                                              |

use serde::Serialize;

use super::domain::ApplicationStatus;
use super::error::WorkflowError;

/// An accepted move between two application statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusTransition {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
}

/// Owner-initiated transition. Ownership is checked by the role policy beforehand.
pub fn owner_transition(
    current: ApplicationStatus,
    requested: ApplicationStatus,
) -> Result<StatusTransition, WorkflowError> {
    if requested != ApplicationStatus::Submitted || current != ApplicationStatus::Draft {
        return Err(WorkflowError::InvalidTransition {
            from: current.label(),
            to: requested.label(),
        });
    }

    Ok(StatusTransition {
        from: current,
        to: requested,
    })
}

/// Reviewer target validation, independent of the stored status.
pub fn validate_reviewer_target(requested: ApplicationStatus) -> Result<(), WorkflowError> {
    if requested.is_reviewer_target() {
        Ok(())
    } else {
        Err(WorkflowError::Validation(format!(
            "status '{}' cannot be set by a reviewer; expected one of {}",
            requested.label(),
            reviewer_target_list()
        )))
    }
}

/// Reviewer-initiated transition. Any reviewer target is reachable from any non-draft state,
/// including re-opening terminal applications.
pub fn reviewer_transition(
    current: ApplicationStatus,
    requested: ApplicationStatus,
) -> Result<StatusTransition, WorkflowError> {
    validate_reviewer_target(requested)?;
    if current == ApplicationStatus::Draft {
        return Err(WorkflowError::InvalidTransition {
            from: current.label(),
            to: requested.label(),
        });
    }

    Ok(StatusTransition {
        from: current,
        to: requested,
    })
}

pub fn ensure_deletable(current: ApplicationStatus) -> Result<(), WorkflowError> {
    if current == ApplicationStatus::Draft {
        Ok(())
    } else {
        Err(WorkflowError::InvalidTransition {
            from: current.label(),
            to: "deleted",
        })
    }
}

/// Parse a status string from an inbound request.
pub fn parse_status(raw: &str) -> Result<ApplicationStatus, WorkflowError> {
    ApplicationStatus::parse(raw).ok_or_else(|| {
        WorkflowError::Validation(format!(
            "unknown application status '{}'; expected one of {}",
            raw.trim(),
            ApplicationStatus::ALL.map(ApplicationStatus::label).join(", ")
        ))
    })
}

fn reviewer_target_list() -> String {
    ApplicationStatus::REVIEWER_TARGETS
        .map(ApplicationStatus::label)
        .join(", ")
}
