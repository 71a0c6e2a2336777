use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::audit::{self, AuditLogEntry};
use super::domain::{
    next_application_id, next_comment_id, Actor, Application, ApplicationFields,
    ApplicationFieldsPatch, ApplicationId, ApplicationStatus, Comment,
};
use super::error::WorkflowError;
use super::lifecycle;
use super::policy::{self, WorkflowAction};
use super::repository::WorkflowRepository;
use super::visibility::{self, ListScope};
use crate::config::WorkflowConfig;

pub(crate) const MAX_COMMENT_CHARS: usize = 5_000;

/// Service composing the role policy, lifecycle rules, visibility filter and audit recorder
/// over a storage collaborator.
pub struct LoanApplicationService<R> {
    pub(super) repository: Arc<R>,
    pub(super) config: WorkflowConfig,
}

impl<R> LoanApplicationService<R>
where
    R: WorkflowRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: WorkflowConfig) -> Self {
        Self { repository, config }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Open a new application in `draft` owned by the caller.
    pub fn create_application(
        &self,
        actor: &Actor,
        fields: ApplicationFields,
    ) -> Result<Application, WorkflowError> {
        policy::require(actor.role, WorkflowAction::CreateApplication, true)?;

        let now = Utc::now();
        let application = Application {
            id: next_application_id(),
            owner_id: actor.id.clone(),
            status: ApplicationStatus::Draft,
            fields,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert_application(application)?;
        info!(application_id = %stored.id, owner_id = %stored.owner_id, "application created");
        Ok(stored)
    }

    pub fn get_application(
        &self,
        actor: &Actor,
        id: &ApplicationId,
    ) -> Result<Application, WorkflowError> {
        let application = self.load_visible(actor, id)?;
        debug!(application_id = %id, actor_id = %actor.id, "application read");
        Ok(application)
    }

    /// Own applications for borrowers, every non-draft application for reviewers.
    pub fn list_applications(&self, actor: &Actor) -> Result<Vec<Application>, WorkflowError> {
        let scope = ListScope::for_actor(actor);
        if matches!(scope, ListScope::Reviewer(_)) {
            policy::require(actor.role, WorkflowAction::ListAllApplications, false)?;
        }
        let applications = self.repository.list_applications(&scope)?;
        debug!(actor_id = %actor.id, count = applications.len(), "applications listed");
        Ok(applications)
    }

    pub fn submit(&self, actor: &Actor, id: &ApplicationId) -> Result<Application, WorkflowError> {
        let mut application = self.load(id)?;
        let result = policy::require(
            actor.role,
            WorkflowAction::SubmitApplication,
            actor.owns(&application),
        )
        .and_then(|_| {
            lifecycle::owner_transition(application.status, ApplicationStatus::Submitted)
        });
        let transition = self.reject_logged("submit", id, actor, result)?;

        let now = Utc::now();
        application.status = transition.to;
        application.updated_at = now;
        let entry = audit::application_submitted(id, &actor.id, transition, now);
        self.repository
            .commit_application(application.clone(), Some(entry))?;

        info!(
            application_id = %id,
            actor_id = %actor.id,
            from = %transition.from,
            to = %transition.to,
            "application submitted"
        );
        Ok(application)
    }

    /// Reviewer status change. Checks run in order: role, requested status, existence, then
    /// the stored status.
    pub fn set_status(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        new_status: ApplicationStatus,
        notes: Option<String>,
    ) -> Result<Application, WorkflowError> {
        let precheck = policy::require(actor.role, WorkflowAction::SetApplicationStatus, false)
            .and_then(|_| lifecycle::validate_reviewer_target(new_status));
        self.reject_logged("set_status", id, actor, precheck)?;

        let mut application = self.load(id)?;
        let result = lifecycle::reviewer_transition(application.status, new_status);
        let transition = self.reject_logged("set_status", id, actor, result)?;

        let now = Utc::now();
        let notes = normalize_notes(notes);
        application.status = transition.to;
        application.updated_at = now;
        let entry = audit::status_change(id, &actor.id, transition, notes, now);
        self.repository
            .commit_application(application.clone(), Some(entry))?;

        info!(
            application_id = %id,
            actor_id = %actor.id,
            from = %transition.from,
            to = %transition.to,
            "application status changed"
        );
        Ok(application)
    }

    /// Owner field edit. A `status` entry in the patch goes through the submit rule.
    pub fn update_fields(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        mut patch: ApplicationFieldsPatch,
    ) -> Result<Application, WorkflowError> {
        let mut application = self.load(id)?;
        let owner_check = policy::require(
            actor.role,
            WorkflowAction::UpdateApplicationFields,
            actor.owns(&application),
        );
        self.reject_logged("update_fields", id, actor, owner_check)?;

        let transition = match patch.status.take() {
            Some(raw) => {
                let result = lifecycle::parse_status(&raw).and_then(|requested| {
                    lifecycle::owner_transition(application.status, requested)
                });
                Some(self.reject_logged("update_fields", id, actor, result)?)
            }
            None => None,
        };

        let now = Utc::now();
        application.fields.merge(patch);
        application.updated_at = now;
        let entry = transition.map(|transition| {
            application.status = transition.to;
            audit::application_submitted(id, &actor.id, transition, now)
        });
        self.repository
            .commit_application(application.clone(), entry)?;

        info!(
            application_id = %id,
            actor_id = %actor.id,
            submitted = transition.is_some(),
            "application fields updated"
        );
        Ok(application)
    }

    /// Remove a draft together with its documents and comments.
    pub fn delete(&self, actor: &Actor, id: &ApplicationId) -> Result<(), WorkflowError> {
        let application = self.load(id)?;
        let result = policy::require(
            actor.role,
            WorkflowAction::DeleteApplication,
            actor.owns(&application),
        )
        .and_then(|_| lifecycle::ensure_deletable(application.status));
        self.reject_logged("delete", id, actor, result)?;

        let entry = audit::application_deleted(id, &actor.id, application.status, Utc::now());
        self.repository.delete_draft(id, entry)?;

        info!(application_id = %id, actor_id = %actor.id, "draft application deleted");
        Ok(())
    }

    pub fn add_comment(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
        body: &str,
    ) -> Result<Comment, WorkflowError> {
        let application = self.load_visible(actor, application_id)?;
        policy::require(
            actor.role,
            WorkflowAction::CreateComment,
            actor.owns(&application),
        )?;

        let body = body.trim();
        if body.is_empty() {
            return Err(WorkflowError::Validation(
                "comment body must not be empty".to_string(),
            ));
        }
        if body.chars().count() > MAX_COMMENT_CHARS {
            return Err(WorkflowError::Validation(format!(
                "comment body exceeds {MAX_COMMENT_CHARS} characters"
            )));
        }

        let comment = self.repository.insert_comment(Comment {
            id: next_comment_id(),
            application_id: application_id.clone(),
            author_id: actor.id.clone(),
            body: body.to_string(),
            created_at: Utc::now(),
        })?;
        info!(application_id = %application_id, comment_id = %comment.id, "comment added");
        Ok(comment)
    }

    pub fn list_comments(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
    ) -> Result<Vec<Comment>, WorkflowError> {
        let application = self.load_visible(actor, application_id)?;
        policy::require(
            actor.role,
            WorkflowAction::ReadComments,
            actor.owns(&application),
        )?;
        Ok(self.repository.list_comments(application_id)?)
    }

    /// Reviewer-only chronological trail. Entries outlive deleted drafts, so the application
    /// itself need not exist.
    pub fn audit_trail(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
    ) -> Result<Vec<AuditLogEntry>, WorkflowError> {
        policy::require(actor.role, WorkflowAction::ReadAuditTrail, false)?;
        Ok(self.repository.audit_entries(Some(application_id))?)
    }

    pub(super) fn load(&self, id: &ApplicationId) -> Result<Application, WorkflowError> {
        self.repository
            .fetch_application(id)?
            .ok_or_else(|| WorkflowError::not_found("application", id))
    }

    pub(super) fn load_visible(
        &self,
        actor: &Actor,
        id: &ApplicationId,
    ) -> Result<Application, WorkflowError> {
        let application = self.load(id)?;
        visibility::ensure_readable(actor, &application)?;
        Ok(application)
    }

    /// Pass the result through, logging a rejection before it reaches the caller.
    pub(super) fn reject_logged<T>(
        &self,
        operation: &'static str,
        id: &dyn std::fmt::Display,
        actor: &Actor,
        result: Result<T, WorkflowError>,
    ) -> Result<T, WorkflowError> {
        result.map_err(|err| {
            warn!(
                operation,
                entity_id = %id,
                actor_id = %actor.id,
                role = actor.role.label(),
                kind = err.kind(),
                "workflow mutation rejected: {err}"
            );
            err
        })
    }
}

pub(super) fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|notes| notes.trim().to_string())
        .filter(|notes| !notes.is_empty())
}
