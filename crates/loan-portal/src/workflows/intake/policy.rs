//! Role policy: the single allow/deny table consulted by every workflow operation.
//!
//! Status preconditions (for example "only from draft") belong to the lifecycle rules;
//! this table only answers whether the caller's role and ownership permit the action.

use super::domain::ActorRole;
use super::error::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowAction {
    CreateApplication,
    ListAllApplications,
    ReadApplication,
    UpdateApplicationFields,
    SubmitApplication,
    SetApplicationStatus,
    DeleteApplication,
    UploadDocument,
    SetDocumentStatus,
    CreateComment,
    ReadComments,
    ReadAuditTrail,
}

impl WorkflowAction {
    pub const fn label(self) -> &'static str {
        match self {
            WorkflowAction::CreateApplication => "create application",
            WorkflowAction::ListAllApplications => "list all applications",
            WorkflowAction::ReadApplication => "read application",
            WorkflowAction::UpdateApplicationFields => "update application fields",
            WorkflowAction::SubmitApplication => "submit application",
            WorkflowAction::SetApplicationStatus => "set application status",
            WorkflowAction::DeleteApplication => "delete application",
            WorkflowAction::UploadDocument => "upload document",
            WorkflowAction::SetDocumentStatus => "set document status",
            WorkflowAction::CreateComment => "create comment",
            WorkflowAction::ReadComments => "read comments",
            WorkflowAction::ReadAuditTrail => "read audit trail",
        }
    }
}

/// Total over every role; `PendingBroker` is never a reviewer and so falls through to the
/// borrower answers.
pub fn can(role: ActorRole, action: WorkflowAction, is_owner: bool) -> bool {
    let reviewer = role.is_reviewer();
    match action {
        WorkflowAction::CreateApplication => !reviewer,
        WorkflowAction::ListAllApplications
        | WorkflowAction::SetApplicationStatus
        | WorkflowAction::SetDocumentStatus
        | WorkflowAction::ReadAuditTrail => reviewer,
        WorkflowAction::ReadApplication
        | WorkflowAction::UploadDocument
        | WorkflowAction::CreateComment
        | WorkflowAction::ReadComments => is_owner || reviewer,
        WorkflowAction::UpdateApplicationFields
        | WorkflowAction::SubmitApplication
        | WorkflowAction::DeleteApplication => is_owner,
    }
}

pub fn require(
    role: ActorRole,
    action: WorkflowAction,
    is_owner: bool,
) -> Result<(), WorkflowError> {
    if can(role, action, is_owner) {
        Ok(())
    } else {
        Err(WorkflowError::Forbidden(format!(
            "role {} may not {}",
            role.label(),
            action.label()
        )))
    }
}
