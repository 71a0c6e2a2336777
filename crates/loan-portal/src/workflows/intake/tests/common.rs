use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::config::WorkflowConfig;
use crate::workflows::intake::audit::AuditLogEntry;
use crate::workflows::intake::domain::{
    Actor, ActorId, Application, ApplicationFields, ApplicationId, ApplicationStatus, Comment,
    Document, DocumentId, DocumentUpload,
};
use crate::workflows::intake::repository::{
    BulkStatusUpdate, RepositoryError, StatusChange, WorkflowRepository,
};
use crate::workflows::intake::visibility::ListScope;
use crate::workflows::intake::{
    InMemoryWorkflowRepository, LoanApplicationService, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER,
};

pub(super) type MemoryService = LoanApplicationService<InMemoryWorkflowRepository>;

pub(super) fn borrower() -> Actor {
    Actor::borrower("borrower-dana")
}

pub(super) fn other_borrower() -> Actor {
    Actor::borrower("borrower-lee")
}

pub(super) fn broker() -> Actor {
    Actor::broker("broker-sam")
}

pub(super) fn admin() -> Actor {
    Actor::admin("admin-ria")
}

fn section(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

pub(super) fn sample_fields() -> ApplicationFields {
    ApplicationFields {
        personal: section(&[
            ("first_name", json!("Dana")),
            ("last_name", json!("Okafor")),
        ]),
        employment: section(&[("employer", json!("Riverbend Clinic"))]),
        property: section(&[("address", json!("14 Alder Way"))]),
        financial: section(&[("loan_amount", json!(350_000))]),
    }
}

pub(super) fn upload(name: &str) -> DocumentUpload {
    DocumentUpload {
        name: name.to_string(),
        size_bytes: 82_114,
        content_type: None,
        storage_key: format!("blobs/intake/{name}"),
    }
}

pub(super) fn build_service() -> (MemoryService, Arc<InMemoryWorkflowRepository>) {
    build_service_with_limit(WorkflowConfig::default().bulk_limit)
}

pub(super) fn build_service_with_limit(
    bulk_limit: usize,
) -> (MemoryService, Arc<InMemoryWorkflowRepository>) {
    let repository = Arc::new(InMemoryWorkflowRepository::default());
    let service = LoanApplicationService::new(repository.clone(), WorkflowConfig { bulk_limit });
    (service, repository)
}

pub(super) fn draft_for(service: &MemoryService, owner: &Actor) -> Application {
    service
        .create_application(owner, sample_fields())
        .expect("draft created")
}

pub(super) fn submitted_for(service: &MemoryService, owner: &Actor) -> Application {
    let draft = draft_for(service, owner);
    service.submit(owner, &draft.id).expect("draft submits")
}

pub(super) fn status_of(
    repository: &InMemoryWorkflowRepository,
    id: &ApplicationId,
) -> ApplicationStatus {
    repository
        .fetch_application(id)
        .expect("repository readable")
        .expect("application stored")
        .status
}

pub(super) fn audit_log(repository: &InMemoryWorkflowRepository) -> Vec<AuditLogEntry> {
    repository.audit_entries(None).expect("audit readable")
}

pub(super) fn json_request(
    method: Method,
    uri: &str,
    actor: Option<&Actor>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder
            .header(ACTOR_ID_HEADER, actor.id.as_str())
            .header(ACTOR_ROLE_HEADER, actor.role.label());
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&value).expect("json body"))
        }
        None => Body::empty(),
    };
    builder.body(body).expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

pub(super) struct UnavailableRepository;

impl WorkflowRepository for UnavailableRepository {
    fn insert_application(
        &self,
        _application: Application,
    ) -> Result<Application, RepositoryError> {
        offline()
    }

    fn fetch_application(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        offline()
    }

    fn list_applications(&self, _scope: &ListScope) -> Result<Vec<Application>, RepositoryError> {
        offline()
    }

    fn commit_application(
        &self,
        _application: Application,
        _audit: Option<AuditLogEntry>,
    ) -> Result<(), RepositoryError> {
        offline()
    }

    fn delete_draft(
        &self,
        _id: &ApplicationId,
        _audit: AuditLogEntry,
    ) -> Result<(), RepositoryError> {
        offline()
    }

    fn bulk_update_status(
        &self,
        _update: &BulkStatusUpdate,
        _audit: &dyn Fn(&StatusChange) -> AuditLogEntry,
    ) -> Result<Vec<StatusChange>, RepositoryError> {
        offline()
    }

    fn insert_document(&self, _document: Document) -> Result<Document, RepositoryError> {
        offline()
    }

    fn fetch_document(&self, _id: &DocumentId) -> Result<Option<Document>, RepositoryError> {
        offline()
    }

    fn list_documents(&self, _id: &ApplicationId) -> Result<Vec<Document>, RepositoryError> {
        offline()
    }

    fn commit_document(
        &self,
        _document: Document,
        _audit: AuditLogEntry,
    ) -> Result<(), RepositoryError> {
        offline()
    }

    fn insert_comment(&self, _comment: Comment) -> Result<Comment, RepositoryError> {
        offline()
    }

    fn list_comments(&self, _id: &ApplicationId) -> Result<Vec<Comment>, RepositoryError> {
        offline()
    }

    fn audit_entries(
        &self,
        _application_id: Option<&ApplicationId>,
    ) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        offline()
    }
}

/// Serves a draft on read but reports it as changed underneath on delete, as if another
/// request submitted it in between.
pub(super) struct RacingDeleteRepository {
    pub(super) owner: ActorId,
}

impl RacingDeleteRepository {
    pub(super) const DRAFT_ID: &'static str = "app-racing";
}

impl WorkflowRepository for RacingDeleteRepository {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError> {
        Ok(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        if id.as_str() != Self::DRAFT_ID {
            return Ok(None);
        }
        let now = Utc::now();
        Ok(Some(Application {
            id: id.clone(),
            owner_id: self.owner.clone(),
            status: ApplicationStatus::Draft,
            fields: ApplicationFields::default(),
            created_at: now,
            updated_at: now,
        }))
    }

    fn list_applications(&self, _scope: &ListScope) -> Result<Vec<Application>, RepositoryError> {
        Ok(Vec::new())
    }

    fn commit_application(
        &self,
        _application: Application,
        _audit: Option<AuditLogEntry>,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn delete_draft(
        &self,
        _id: &ApplicationId,
        _audit: AuditLogEntry,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn bulk_update_status(
        &self,
        update: &BulkStatusUpdate,
        _audit: &dyn Fn(&StatusChange) -> AuditLogEntry,
    ) -> Result<Vec<StatusChange>, RepositoryError> {
        Err(RepositoryError::Missing(update.ids.iter().cloned().collect()))
    }

    fn insert_document(&self, document: Document) -> Result<Document, RepositoryError> {
        Ok(document)
    }

    fn fetch_document(&self, _id: &DocumentId) -> Result<Option<Document>, RepositoryError> {
        Ok(None)
    }

    fn list_documents(&self, _id: &ApplicationId) -> Result<Vec<Document>, RepositoryError> {
        Ok(Vec::new())
    }

    fn commit_document(
        &self,
        _document: Document,
        _audit: AuditLogEntry,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn insert_comment(&self, comment: Comment) -> Result<Comment, RepositoryError> {
        Ok(comment)
    }

    fn list_comments(&self, _id: &ApplicationId) -> Result<Vec<Comment>, RepositoryError> {
        Ok(Vec::new())
    }

    fn audit_entries(
        &self,
        _application_id: Option<&ApplicationId>,
    ) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        Ok(Vec::new())
    }
}
