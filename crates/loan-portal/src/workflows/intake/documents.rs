//! Document review lifecycle.
//!
//! Documents enter as `pending_scan` when the upload is registered and are only moved by
//! reviewers afterwards. Nothing ever returns a document to `pending_scan`.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use super::audit;
use super::domain::{
    next_document_id, Actor, ApplicationId, Document, DocumentId, DocumentMetadata,
    DocumentStatus, DocumentUpload,
};
use super::error::WorkflowError;
use super::policy::{self, WorkflowAction};
use super::repository::WorkflowRepository;
use super::service::{normalize_notes, LoanApplicationService};
use super::visibility;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocumentTransition {
    pub from: DocumentStatus,
    pub to: DocumentStatus,
}

pub fn validate_review_target(requested: DocumentStatus) -> Result<(), WorkflowError> {
    if requested == DocumentStatus::PendingScan {
        return Err(WorkflowError::Validation(format!(
            "document status cannot be set to '{}'; expected approved, rejected or needs_resubmission",
            requested.label()
        )));
    }
    Ok(())
}

/// Reviewer transition rule: any non-initial target, from any current state.
pub fn review_transition(
    current: DocumentStatus,
    requested: DocumentStatus,
) -> Result<DocumentTransition, WorkflowError> {
    validate_review_target(requested)?;
    Ok(DocumentTransition {
        from: current,
        to: requested,
    })
}

pub fn parse_document_status(raw: &str) -> Result<DocumentStatus, WorkflowError> {
    DocumentStatus::parse(raw).ok_or_else(|| {
        WorkflowError::Validation(format!("unknown document status '{}'", raw.trim()))
    })
}

/// Validate upload metadata, guessing the content type from the file name when absent.
pub fn validate_upload(upload: DocumentUpload) -> Result<DocumentMetadata, WorkflowError> {
    let name = upload.name.trim().to_string();
    if name.is_empty() {
        return Err(WorkflowError::Validation(
            "document name must not be empty".to_string(),
        ));
    }
    if upload.size_bytes == 0 {
        return Err(WorkflowError::Validation(format!(
            "document '{name}' is empty"
        )));
    }
    let storage_key = upload.storage_key.trim().to_string();
    if storage_key.is_empty() {
        return Err(WorkflowError::Validation(
            "document storage key must not be empty".to_string(),
        ));
    }

    let content_type = match upload.content_type.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => raw
            .parse::<mime::Mime>()
            .map_err(|err| {
                WorkflowError::Validation(format!("invalid content type '{raw}': {err}"))
            })?
            .essence_str()
            .to_string(),
        _ => mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    };

    Ok(DocumentMetadata {
        name,
        size_bytes: upload.size_bytes,
        content_type,
        storage_key,
    })
}

impl<R> LoanApplicationService<R>
where
    R: WorkflowRepository + 'static,
{
    /// Register an accepted upload against an application the caller can see.
    pub fn register_document(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
        upload: DocumentUpload,
    ) -> Result<Document, WorkflowError> {
        let application = self.load_visible(actor, application_id)?;
        policy::require(
            actor.role,
            WorkflowAction::UploadDocument,
            actor.owns(&application),
        )?;
        let metadata = validate_upload(upload)?;

        let now = Utc::now();
        let document = self.repository.insert_document(Document {
            id: next_document_id(),
            application_id: application_id.clone(),
            uploader_id: actor.id.clone(),
            status: DocumentStatus::PendingScan,
            metadata,
            review_notes: None,
            created_at: now,
            updated_at: now,
        })?;

        info!(
            application_id = %application_id,
            document_id = %document.id,
            content_type = %document.metadata.content_type,
            "document registered"
        );
        Ok(document)
    }

    /// By-id read; re-checks the owning application's visibility.
    pub fn get_document(
        &self,
        actor: &Actor,
        document_id: &DocumentId,
    ) -> Result<Document, WorkflowError> {
        let document = self.load_visible_document(actor, document_id)?;
        debug!(document_id = %document_id, actor_id = %actor.id, "document read");
        Ok(document)
    }

    pub fn list_documents(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
    ) -> Result<Vec<Document>, WorkflowError> {
        self.load_visible(actor, application_id)?;
        Ok(self.repository.list_documents(application_id)?)
    }

    /// Reviewer document decision. The owning application's status is left untouched.
    pub fn set_document_status(
        &self,
        actor: &Actor,
        document_id: &DocumentId,
        new_status: DocumentStatus,
        notes: Option<String>,
    ) -> Result<Document, WorkflowError> {
        let precheck = policy::require(actor.role, WorkflowAction::SetDocumentStatus, false)
            .and_then(|_| validate_review_target(new_status));
        self.reject_logged("set_document_status", document_id, actor, precheck)?;

        let mut document = self.load_visible_document(actor, document_id)?;
        let transition = review_transition(document.status, new_status)?;

        let now = Utc::now();
        let notes = normalize_notes(notes);
        document.status = transition.to;
        document.review_notes = notes.clone();
        document.updated_at = now;
        let entry = audit::document_status_change(
            document_id,
            &document.application_id,
            &actor.id,
            transition,
            notes,
            now,
        );
        self.repository.commit_document(document.clone(), entry)?;

        info!(
            document_id = %document_id,
            application_id = %document.application_id,
            actor_id = %actor.id,
            from = %transition.from,
            to = %transition.to,
            "document status changed"
        );
        Ok(document)
    }

    /// Documents inherit their application's visibility; hidden ones read as missing.
    fn load_visible_document(
        &self,
        actor: &Actor,
        id: &DocumentId,
    ) -> Result<Document, WorkflowError> {
        let document = self
            .repository
            .fetch_document(id)?
            .ok_or_else(|| WorkflowError::not_found("document", id))?;
        let application = self
            .load(&document.application_id)
            .map_err(|err| match err {
                WorkflowError::NotFound { .. } => WorkflowError::not_found("document", id),
                other => other,
            })?;
        if !visibility::can_read(actor, &application) {
            return Err(WorkflowError::not_found("document", id));
        }
        Ok(document)
    }
}
