use super::common::*;
use crate::workflows::intake::audit::AuditAction;
use crate::workflows::intake::domain::{ApplicationStatus, DocumentId, DocumentStatus};
use crate::workflows::intake::WorkflowError;

#[test]
fn broker_requests_resubmission_without_touching_application() {
    let (service, repository) = build_service();
    let owner = borrower();
    let application = submitted_for(&service, &owner);
    let document = service
        .register_document(&owner, &application.id, upload("w2-2025.pdf"))
        .expect("upload registered");
    assert_eq!(document.status, DocumentStatus::PendingScan);
    assert_eq!(document.metadata.content_type, "application/pdf");
    assert_eq!(document.uploader_id, owner.id);
    let before = audit_log(&repository).len();

    let reviewed = service
        .set_document_status(
            &broker(),
            &document.id,
            DocumentStatus::NeedsResubmission,
            Some("page 2 is cut off".to_string()),
        )
        .expect("broker reviews document");
    assert_eq!(reviewed.status, DocumentStatus::NeedsResubmission);
    assert_eq!(reviewed.review_notes.as_deref(), Some("page 2 is cut off"));

    let entries = audit_log(&repository);
    assert_eq!(entries.len(), before + 1);
    let entry = entries.last().expect("entry recorded");
    assert_eq!(entry.action, AuditAction::DocumentStatusChange);
    assert_eq!(entry.metadata.document_id.as_ref(), Some(&document.id));
    assert_eq!(entry.metadata.application_id, application.id);
    assert_eq!(entry.metadata.old_status.as_deref(), Some("pending_scan"));
    assert_eq!(
        entry.metadata.new_status.as_deref(),
        Some("needs_resubmission")
    );
    assert_eq!(
        status_of(&repository, &application.id),
        ApplicationStatus::Submitted
    );
}

#[test]
fn document_review_is_reviewer_only_and_never_rescans() {
    let (service, repository) = build_service();
    let owner = borrower();
    let application = submitted_for(&service, &owner);
    let document = service
        .register_document(&owner, &application.id, upload("id-card.png"))
        .expect("upload registered");
    let before = audit_log(&repository).len();

    assert!(matches!(
        service.set_document_status(&owner, &document.id, DocumentStatus::Approved, None),
        Err(WorkflowError::Forbidden(_))
    ));
    assert!(matches!(
        service.set_document_status(&admin(), &document.id, DocumentStatus::PendingScan, None),
        Err(WorkflowError::Validation(_))
    ));
    assert!(matches!(
        service.set_document_status(
            &admin(),
            &DocumentId::from("doc-missing"),
            DocumentStatus::Approved,
            None
        ),
        Err(WorkflowError::NotFound { entity: "document", .. })
    ));
    assert_eq!(audit_log(&repository).len(), before);

    service
        .set_document_status(&admin(), &document.id, DocumentStatus::Rejected, None)
        .expect("first decision");
    service
        .set_document_status(&admin(), &document.id, DocumentStatus::Approved, None)
        .expect("decision revised");
    assert_eq!(audit_log(&repository).len(), before + 2);
}

#[test]
fn documents_inherit_application_visibility() {
    let (service, _) = build_service();
    let owner = borrower();
    let draft = draft_for(&service, &owner);
    let document = service
        .register_document(&owner, &draft.id, upload("bank-statement.pdf"))
        .expect("upload registered");

    assert!(service.get_document(&owner, &document.id).is_ok());
    for outsider in [broker(), other_borrower()] {
        assert!(matches!(
            service.get_document(&outsider, &document.id),
            Err(WorkflowError::NotFound { entity: "document", .. })
        ));
        assert!(matches!(
            service.list_documents(&outsider, &draft.id),
            Err(WorkflowError::NotFound { .. })
        ));
        assert!(matches!(
            service.register_document(&outsider, &draft.id, upload("extra.pdf")),
            Err(WorkflowError::NotFound { .. })
        ));
    }

    service.submit(&owner, &draft.id).expect("submit");
    assert!(service.get_document(&broker(), &document.id).is_ok());
    assert_eq!(
        service
            .list_documents(&broker(), &draft.id)
            .expect("reviewer lists documents")
            .len(),
        1
    );
}

#[test]
fn reviewers_cannot_decide_documents_on_foreign_drafts() {
    let (service, repository) = build_service();
    let owner = borrower();
    let draft = draft_for(&service, &owner);
    let document = service
        .register_document(&owner, &draft.id, upload("paystub.pdf"))
        .expect("upload registered");

    for reviewer in [broker(), admin()] {
        assert!(matches!(
            service.set_document_status(&reviewer, &document.id, DocumentStatus::Approved, None),
            Err(WorkflowError::NotFound { entity: "document", .. })
        ));
    }
    assert!(audit_log(&repository).is_empty());
    assert_eq!(
        service
            .get_document(&owner, &document.id)
            .expect("owner reads document")
            .status,
        DocumentStatus::PendingScan
    );

    service.submit(&owner, &draft.id).expect("submit");
    service
        .set_document_status(&broker(), &document.id, DocumentStatus::Approved, None)
        .expect("visible once submitted");
}

#[test]
fn malformed_uploads_are_rejected() {
    let (service, repository) = build_service();
    let owner = borrower();
    let draft = draft_for(&service, &owner);

    let mut empty = upload("blank.pdf");
    empty.size_bytes = 0;
    assert!(matches!(
        service.register_document(&owner, &draft.id, empty),
        Err(WorkflowError::Validation(_))
    ));

    let mut keyless = upload("w2.pdf");
    keyless.storage_key = "  ".to_string();
    assert!(matches!(
        service.register_document(&owner, &draft.id, keyless),
        Err(WorkflowError::Validation(_))
    ));

    assert!(service
        .list_documents(&owner, &draft.id)
        .expect("owner lists")
        .is_empty());
    assert!(audit_log(&repository).is_empty());
}
