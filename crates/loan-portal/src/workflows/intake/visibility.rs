//! Visibility filter for listings and by-id reads.
//!
//! Borrowers see what they own, drafts included. Reviewers see everything except other
//! people's drafts. Documents and comments inherit the visibility of their application.

use super::domain::{Actor, ActorId, Application, ApplicationStatus};
use super::error::WorkflowError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    Owner(ActorId),
    Reviewer(ActorId),
}

impl ListScope {
    pub fn for_actor(actor: &Actor) -> Self {
        if actor.role.is_reviewer() {
            ListScope::Reviewer(actor.id.clone())
        } else {
            ListScope::Owner(actor.id.clone())
        }
    }

    pub fn admits(&self, application: &Application) -> bool {
        match self {
            ListScope::Owner(owner) => &application.owner_id == owner,
            ListScope::Reviewer(reviewer) => {
                application.status != ApplicationStatus::Draft || &application.owner_id == reviewer
            }
        }
    }
}

pub fn can_read(actor: &Actor, application: &Application) -> bool {
    ListScope::for_actor(actor).admits(application)
}

/// By-id read check. Invisible records are reported as missing so their existence does not
/// leak.
pub fn ensure_readable(actor: &Actor, application: &Application) -> Result<(), WorkflowError> {
    if can_read(actor, application) {
        Ok(())
    } else {
        Err(WorkflowError::not_found("application", &application.id))
    }
}
