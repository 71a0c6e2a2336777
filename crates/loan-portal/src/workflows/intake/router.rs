use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::audit::AuditLogEntry;
use super::documents::parse_document_status;
use super::domain::{
    Actor, ActorId, ActorRole, Application, ApplicationFields, ApplicationFieldsPatch,
    ApplicationId, Comment, Document, DocumentId, DocumentUpload,
};
use super::error::WorkflowError;
use super::lifecycle::parse_status;
use super::policy::{self, WorkflowAction};
use super::repository::WorkflowRepository;
use super::service::LoanApplicationService;

/// Header carrying the caller id issued by the identity provider.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
/// Header carrying the caller role claim.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

type SharedService<R> = State<Arc<LoanApplicationService<R>>>;

/// Status strings are only parsed once the caller's role may set them, so a borrower sees
/// `Forbidden` whatever the body holds.
fn requested_status<T>(
    actor: &Actor,
    action: WorkflowAction,
    parse: impl FnOnce() -> Result<T, WorkflowError>,
) -> Result<T, WorkflowError> {
    policy::require(actor.role, action, false)?;
    parse()
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusChangeRequest {
    pub(crate) status: String,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkStatusRequest {
    pub(crate) application_ids: Vec<String>,
    pub(crate) status: String,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentRequest {
    pub(crate) body: String,
}

/// Router builder exposing the intake workflow over HTTP.
pub fn intake_router<R>(service: Arc<LoanApplicationService<R>>) -> Router
where
    R: WorkflowRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications",
            get(list_handler::<R>).post(create_handler::<R>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(get_handler::<R>)
                .patch(update_handler::<R>)
                .delete(delete_handler::<R>),
        )
        .route(
            "/api/v1/applications/:application_id/submit",
            post(submit_handler::<R>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            put(status_handler::<R>),
        )
        .route(
            "/api/v1/applications/:application_id/documents",
            get(list_documents_handler::<R>).post(register_document_handler::<R>),
        )
        .route(
            "/api/v1/applications/:application_id/comments",
            get(list_comments_handler::<R>).post(add_comment_handler::<R>),
        )
        .route(
            "/api/v1/applications/:application_id/audit",
            get(audit_handler::<R>),
        )
        .route("/api/v1/bulk/status", post(bulk_status_handler::<R>))
        .route("/api/v1/documents/:document_id", get(get_document_handler::<R>))
        .route(
            "/api/v1/documents/:document_id/status",
            put(document_status_handler::<R>),
        )
        .with_state(service)
}

/// Resolve the caller from identity headers. A missing id is unauthenticated; a missing or
/// unknown role resolves to the least-privileged role.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, WorkflowError> {
    let id = headers
        .get(ACTOR_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(WorkflowError::Unauthenticated)?;
    let role = ActorRole::from_claim(
        headers
            .get(ACTOR_ROLE_HEADER)
            .and_then(|value| value.to_str().ok()),
    );

    Ok(Actor {
        id: ActorId(id.to_string()),
        role,
    })
}

pub(crate) async fn create_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Json(fields): Json<ApplicationFields>,
) -> Result<(StatusCode, Json<Application>), WorkflowError>
where
    R: WorkflowRepository + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let application = service.create_application(&actor, fields)?;
    Ok((StatusCode::CREATED, Json(application)))
}

pub(crate) async fn list_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
) -> Result<Json<Vec<Application>>, WorkflowError>
where
    R: WorkflowRepository + 'static,
{
    let actor = actor_from_headers(&headers)?;
    Ok(Json(service.list_applications(&actor)?))
}

pub(crate) async fn get_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Result<Json<Application>, WorkflowError>
where
    R: WorkflowRepository + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let id = ApplicationId(application_id);
    Ok(Json(service.get_application(&actor, &id)?))
}

pub(crate) async fn update_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    Json(patch): Json<ApplicationFieldsPatch>,
) -> Result<Json<Application>, WorkflowError>
where
    R: WorkflowRepository + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let id = ApplicationId(application_id);
    Ok(Json(service.update_fields(&actor, &id, patch)?))
}

pub(crate) async fn delete_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Result<StatusCode, WorkflowError>
where
    R: WorkflowRepository + 'static,
{
    let actor = actor_from_headers(&headers)?;
    service.delete(&actor, &ApplicationId(application_id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn submit_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Result<Json<Application>, WorkflowError>
where
    R: WorkflowRepository + 'static,
{
    let actor = actor_from_headers(&headers)?;
    Ok(Json(
        service.submit(&actor, &ApplicationId(application_id))?,
    ))
}

pub(crate) async fn status_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    Json(request): Json<StatusChangeRequest>,
) -> Result<Json<Application>, WorkflowError>
where
    R: WorkflowRepository + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let status = requested_status(&actor, WorkflowAction::SetApplicationStatus, || {
        parse_status(&request.status)
    })?;
    let id = ApplicationId(application_id);
    Ok(Json(service.set_status(&actor, &id, status, request.notes)?))
}

pub(crate) async fn bulk_status_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Json(request): Json<BulkStatusRequest>,
) -> Result<Response, WorkflowError>
where
    R: WorkflowRepository + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let status = requested_status(&actor, WorkflowAction::SetApplicationStatus, || {
        parse_status(&request.status)
    })?;
    let affected =
        service.bulk_set_status(&actor, &request.application_ids, status, request.notes)?;
    Ok((StatusCode::OK, Json(json!({ "affected": affected }))).into_response())
}

pub(crate) async fn register_document_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    Json(upload): Json<DocumentUpload>,
) -> Result<(StatusCode, Json<Document>), WorkflowError>
where
    R: WorkflowRepository + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let id = ApplicationId(application_id);
    let document = service.register_document(&actor, &id, upload)?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub(crate) async fn list_documents_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Result<Json<Vec<Document>>, WorkflowError>
where
    R: WorkflowRepository + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let id = ApplicationId(application_id);
    Ok(Json(service.list_documents(&actor, &id)?))
}

pub(crate) async fn get_document_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(document_id): Path<String>,
) -> Result<Json<Document>, WorkflowError>
where
    R: WorkflowRepository + 'static,
{
    let actor = actor_from_headers(&headers)?;
    Ok(Json(
        service.get_document(&actor, &DocumentId(document_id))?,
    ))
}

pub(crate) async fn document_status_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(document_id): Path<String>,
    Json(request): Json<StatusChangeRequest>,
) -> Result<Json<Document>, WorkflowError>
where
    R: WorkflowRepository + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let status = requested_status(&actor, WorkflowAction::SetDocumentStatus, || {
        parse_document_status(&request.status)
    })?;
    let id = DocumentId(document_id);
    Ok(Json(
        service.set_document_status(&actor, &id, status, request.notes)?,
    ))
}

pub(crate) async fn add_comment_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), WorkflowError>
where
    R: WorkflowRepository + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let id = ApplicationId(application_id);
    let comment = service.add_comment(&actor, &id, &request.body)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub(crate) async fn list_comments_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Result<Json<Vec<Comment>>, WorkflowError>
where
    R: WorkflowRepository + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let id = ApplicationId(application_id);
    Ok(Json(service.list_comments(&actor, &id)?))
}

pub(crate) async fn audit_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Result<Json<Vec<AuditLogEntry>>, WorkflowError>
where
    R: WorkflowRepository + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let id = ApplicationId(application_id);
    Ok(Json(service.audit_trail(&actor, &id)?))
}
