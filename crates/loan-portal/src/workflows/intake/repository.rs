use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::audit::AuditLogEntry;
use super::domain::{Application, ApplicationId, ApplicationStatus, Comment, Document, DocumentId};
use super::lifecycle::StatusTransition;
use super::visibility::ListScope;

/// Set-based status update issued by the bulk coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkStatusUpdate {
    pub ids: BTreeSet<ApplicationId>,
    pub status: ApplicationStatus,
    /// Only rows admitted by this scope count as existing.
    pub scope: ListScope,
    pub updated_at: DateTime<Utc>,
}

/// One row changed by a bulk update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub application_id: ApplicationId,
    pub transition: StatusTransition,
}

/// Storage abstraction for the intake workflow.
///
/// Every mutating method receives the audit entries describing the mutation and must apply
/// both as one atomic unit: either the row change and its entries are visible, or neither is.
pub trait WorkflowRepository: Send + Sync {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError>;
    fn fetch_application(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn list_applications(&self, scope: &ListScope) -> Result<Vec<Application>, RepositoryError>;
    /// Last write wins; fails with `NotFound` if the row is gone.
    fn commit_application(
        &self,
        application: Application,
        audit: Option<AuditLogEntry>,
    ) -> Result<(), RepositoryError>;
    /// Removes a draft with its documents and comments. Fails with `Conflict` if the stored
    /// row is no longer a draft.
    fn delete_draft(&self, id: &ApplicationId, audit: AuditLogEntry) -> Result<(), RepositoryError>;
    /// Checks membership of every id and updates all of them, or none. `audit` derives the
    /// entry for each changed row inside the same unit of work.
    fn bulk_update_status(
        &self,
        update: &BulkStatusUpdate,
        audit: &dyn Fn(&StatusChange) -> AuditLogEntry,
    ) -> Result<Vec<StatusChange>, RepositoryError>;

    fn insert_document(&self, document: Document) -> Result<Document, RepositoryError>;
    fn fetch_document(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError>;
    fn list_documents(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Document>, RepositoryError>;
    fn commit_document(
        &self,
        document: Document,
        audit: AuditLogEntry,
    ) -> Result<(), RepositoryError>;

    fn insert_comment(&self, comment: Comment) -> Result<Comment, RepositoryError>;
    fn list_comments(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Comment>, RepositoryError>;

    /// Chronological audit entries, optionally restricted to one application.
    fn audit_entries(
        &self,
        application_id: Option<&ApplicationId>,
    ) -> Result<Vec<AuditLogEntry>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists or changed concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("records not found: {}", join_ids(.0))]
    Missing(Vec<ApplicationId>),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

fn join_ids(ids: &[ApplicationId]) -> String {
    ids.iter()
        .map(ApplicationId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
