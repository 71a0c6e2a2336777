//! Bulk transition coordinator.
//!
//! All validation happens before storage is touched. The repository then resolves and
//! updates the whole id set in one unit of work and derives one `bulk_status_change` entry
//! per changed row from the rows it actually changed.

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::info;

use super::audit;
use super::domain::{Actor, ApplicationId, ApplicationStatus};
use super::error::WorkflowError;
use super::lifecycle;
use super::policy::{self, WorkflowAction};
use super::repository::{BulkStatusUpdate, RepositoryError, StatusChange, WorkflowRepository};
use super::service::{normalize_notes, LoanApplicationService};
use super::visibility::ListScope;

/// Normalize the requested ids into a set. Blank ids are malformed input.
pub fn collect_ids<I, S>(raw: I) -> Result<BTreeSet<ApplicationId>, WorkflowError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut ids = BTreeSet::new();
    let mut invalid = Vec::new();
    for value in raw {
        let value = value.as_ref().trim();
        if value.is_empty() {
            invalid.push(value.to_string());
        } else {
            ids.insert(ApplicationId(value.to_string()));
        }
    }

    match (ids.is_empty(), invalid.is_empty()) {
        (true, _) => Err(WorkflowError::Validation(
            "bulk request must reference at least one application".to_string(),
        )),
        (false, true) => Ok(ids),
        (false, false) => Err(WorkflowError::PartialInput { invalid }),
    }
}

impl<R> LoanApplicationService<R>
where
    R: WorkflowRepository + 'static,
{
    /// Set every referenced application to `new_status`, or none of them.
    ///
    /// Returns the number of applications changed. Any id that does not resolve to an
    /// application visible to the reviewer fails the whole call with `NotFound`.
    pub fn bulk_set_status<I, S>(
        &self,
        actor: &Actor,
        application_ids: I,
        new_status: ApplicationStatus,
        notes: Option<String>,
    ) -> Result<usize, WorkflowError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let precheck = policy::require(actor.role, WorkflowAction::SetApplicationStatus, false)
            .and_then(|_| lifecycle::validate_reviewer_target(new_status))
            .and_then(|_| collect_ids(application_ids))
            .and_then(|ids| {
                if ids.len() > self.config.bulk_limit {
                    Err(WorkflowError::Validation(format!(
                        "bulk request references {} applications; the limit is {}",
                        ids.len(),
                        self.config.bulk_limit
                    )))
                } else {
                    Ok(ids)
                }
            });
        let ids = self.reject_logged("bulk_set_status", &"bulk", actor, precheck)?;

        let update = BulkStatusUpdate {
            ids,
            status: new_status,
            scope: ListScope::for_actor(actor),
            updated_at: Utc::now(),
        };
        let notes = normalize_notes(notes);
        let record = |change: &StatusChange| {
            audit::bulk_status_change(
                &change.application_id,
                &actor.id,
                change.transition,
                notes.clone(),
                update.updated_at,
            )
        };

        let changes = match self.repository.bulk_update_status(&update, &record) {
            Ok(changes) => changes,
            Err(RepositoryError::Missing(missing)) => {
                let err = WorkflowError::NotFound {
                    entity: "application",
                    ids: missing.into_iter().map(|id| id.0).collect(),
                };
                return self.reject_logged("bulk_set_status", &"bulk", actor, Err(err));
            }
            Err(other) => return Err(other.into()),
        };

        info!(
            actor_id = %actor.id,
            to = %new_status,
            affected = changes.len(),
            "bulk status change applied"
        );
        Ok(changes.len())
    }
}
