//! Mortgage application intake.
//!
//! Borrowers open and submit applications; brokers and admins move them through review,
//! decide on supporting documents and apply bulk status changes. Every accepted transition
//! leaves an audit entry written in the same repository call as the change itself.

pub mod audit;
pub mod bulk;
pub mod documents;
pub mod domain;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod policy;
pub mod repository;
pub mod router;
pub mod service;
pub mod visibility;

#[cfg(test)]
mod tests;

pub use audit::{AuditAction, AuditLogEntry, AuditMetadata};
pub use documents::DocumentTransition;
pub use domain::{
    Actor, ActorId, ActorRole, Application, ApplicationFields, ApplicationFieldsPatch,
    ApplicationId, ApplicationStatus, AuditEntryId, Comment, CommentId, Document, DocumentId,
    DocumentMetadata, DocumentStatus, DocumentUpload,
};
pub use error::WorkflowError;
pub use lifecycle::StatusTransition;
pub use memory::InMemoryWorkflowRepository;
pub use policy::WorkflowAction;
pub use repository::{BulkStatusUpdate, RepositoryError, StatusChange, WorkflowRepository};
pub use router::{actor_from_headers, intake_router, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
pub use service::LoanApplicationService;
pub use visibility::ListScope;
