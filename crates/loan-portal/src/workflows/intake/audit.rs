//! Audit recorder: builds one immutable entry per accepted transition.
//!
//! Entries are never persisted on their own; they are handed to the repository together with
//! the mutation they describe so both land in the same unit of work.

use std::io;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    next_audit_entry_id, ActorId, ApplicationId, ApplicationStatus, AuditEntryId, DocumentId,
};
use super::documents::DocumentTransition;
use super::lifecycle::StatusTransition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ApplicationSubmitted,
    StatusChange,
    BulkStatusChange,
    DocumentStatusChange,
    ApplicationDeleted,
}

impl AuditAction {
    pub const fn label(self) -> &'static str {
        match self {
            AuditAction::ApplicationSubmitted => "application_submitted",
            AuditAction::StatusChange => "status_change",
            AuditAction::BulkStatusChange => "bulk_status_change",
            AuditAction::DocumentStatusChange => "document_status_change",
            AuditAction::ApplicationDeleted => "application_deleted",
        }
    }
}

/// Old/new values plus the identities involved in a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditMetadata {
    pub application_id: ApplicationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,
    pub old_status: Option<String>,
    pub new_status: Option<String>,
    pub actor_id: ActorId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub bulk_update: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditEntryId,
    pub action: AuditAction,
    pub metadata: AuditMetadata,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    fn new(action: AuditAction, metadata: AuditMetadata, created_at: DateTime<Utc>) -> Self {
        Self {
            id: next_audit_entry_id(),
            action,
            metadata,
            created_at,
        }
    }

    pub fn concerns(&self, application_id: &ApplicationId) -> bool {
        &self.metadata.application_id == application_id
    }
}

pub fn application_submitted(
    application_id: &ApplicationId,
    actor_id: &ActorId,
    transition: StatusTransition,
    at: DateTime<Utc>,
) -> AuditLogEntry {
    AuditLogEntry::new(
        AuditAction::ApplicationSubmitted,
        application_metadata(application_id, actor_id, transition, None, false),
        at,
    )
}

pub fn status_change(
    application_id: &ApplicationId,
    actor_id: &ActorId,
    transition: StatusTransition,
    notes: Option<String>,
    at: DateTime<Utc>,
) -> AuditLogEntry {
    AuditLogEntry::new(
        AuditAction::StatusChange,
        application_metadata(application_id, actor_id, transition, notes, false),
        at,
    )
}

pub fn bulk_status_change(
    application_id: &ApplicationId,
    actor_id: &ActorId,
    transition: StatusTransition,
    notes: Option<String>,
    at: DateTime<Utc>,
) -> AuditLogEntry {
    AuditLogEntry::new(
        AuditAction::BulkStatusChange,
        application_metadata(application_id, actor_id, transition, notes, true),
        at,
    )
}

pub fn document_status_change(
    document_id: &DocumentId,
    application_id: &ApplicationId,
    actor_id: &ActorId,
    transition: DocumentTransition,
    notes: Option<String>,
    at: DateTime<Utc>,
) -> AuditLogEntry {
    AuditLogEntry::new(
        AuditAction::DocumentStatusChange,
        AuditMetadata {
            application_id: application_id.clone(),
            document_id: Some(document_id.clone()),
            old_status: Some(transition.from.label().to_string()),
            new_status: Some(transition.to.label().to_string()),
            actor_id: actor_id.clone(),
            notes,
            bulk_update: false,
        },
        at,
    )
}

pub fn application_deleted(
    application_id: &ApplicationId,
    actor_id: &ActorId,
    status: ApplicationStatus,
    at: DateTime<Utc>,
) -> AuditLogEntry {
    AuditLogEntry::new(
        AuditAction::ApplicationDeleted,
        AuditMetadata {
            application_id: application_id.clone(),
            document_id: None,
            old_status: Some(status.label().to_string()),
            new_status: None,
            actor_id: actor_id.clone(),
            notes: None,
            bulk_update: false,
        },
        at,
    )
}

fn application_metadata(
    application_id: &ApplicationId,
    actor_id: &ActorId,
    transition: StatusTransition,
    notes: Option<String>,
    bulk_update: bool,
) -> AuditMetadata {
    AuditMetadata {
        application_id: application_id.clone(),
        document_id: None,
        old_status: Some(transition.from.label().to_string()),
        new_status: Some(transition.to.label().to_string()),
        actor_id: actor_id.clone(),
        notes,
        bulk_update,
    }
}

#[derive(Debug, Serialize)]
struct AuditCsvRow<'a> {
    id: &'a str,
    action: &'static str,
    application_id: &'a str,
    document_id: &'a str,
    old_status: &'a str,
    new_status: &'a str,
    actor_id: &'a str,
    notes: &'a str,
    bulk_update: bool,
    created_at: String,
}

/// Write entries as CSV with a header row, in the order given.
pub fn write_csv<'a, W, I>(writer: W, entries: I) -> Result<(), csv::Error>
where
    W: io::Write,
    I: IntoIterator<Item = &'a AuditLogEntry>,
{
    let mut writer = csv::Writer::from_writer(writer);
    for entry in entries {
        let metadata = &entry.metadata;
        writer.serialize(AuditCsvRow {
            id: entry.id.as_str(),
            action: entry.action.label(),
            application_id: metadata.application_id.as_str(),
            document_id: metadata.document_id.as_ref().map_or("", DocumentId::as_str),
            old_status: metadata.old_status.as_deref().unwrap_or_default(),
            new_status: metadata.new_status.as_deref().unwrap_or_default(),
            actor_id: metadata.actor_id.as_str(),
            notes: metadata.notes.as_deref().unwrap_or_default(),
            bulk_update: metadata.bulk_update,
            created_at: entry.created_at.to_rfc3339(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transition() -> StatusTransition {
        StatusTransition {
            from: ApplicationStatus::Submitted,
            to: ApplicationStatus::Approved,
        }
    }

    #[test]
    fn status_change_serializes_old_and_new_values() {
        let entry = status_change(
            &ApplicationId::from("app-1"),
            &ActorId::from("broker-1"),
            transition(),
            Some("verified income".to_string()),
            Utc::now(),
        );

        let value = serde_json::to_value(&entry).expect("entry serializes");
        assert_eq!(value["action"], json!("status_change"));
        assert_eq!(value["metadata"]["oldStatus"], json!("submitted"));
        assert_eq!(value["metadata"]["newStatus"], json!("approved"));
        assert_eq!(value["metadata"]["actorId"], json!("broker-1"));
        assert_eq!(value["metadata"]["notes"], json!("verified income"));
        assert_eq!(value["metadata"]["bulkUpdate"], json!(false));
    }

    #[test]
    fn entries_get_distinct_ids() {
        let at = Utc::now();
        let first = bulk_status_change(
            &ApplicationId::from("app-1"),
            &ActorId::from("admin-1"),
            transition(),
            None,
            at,
        );
        let second = bulk_status_change(
            &ApplicationId::from("app-2"),
            &ActorId::from("admin-1"),
            transition(),
            None,
            at,
        );
        assert_ne!(first.id, second.id);
        assert!(first.metadata.bulk_update);
        assert!(first.concerns(&ApplicationId::from("app-1")));
        assert!(!first.concerns(&ApplicationId::from("app-2")));
    }

    #[test]
    fn csv_export_writes_header_and_rows() {
        let entry = application_deleted(
            &ApplicationId::from("app-7"),
            &ActorId::from("borrower-7"),
            ApplicationStatus::Draft,
            Utc::now(),
        );

        let mut buffer = Vec::new();
        write_csv(&mut buffer, [&entry]).expect("csv writes");
        let text = String::from_utf8(buffer).expect("utf8");
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,action,application_id,document_id,old_status,new_status,actor_id,notes,bulk_update,created_at")
        );
        let row = lines.next().expect("data row");
        assert!(row.contains("application_deleted,app-7,,draft,,borrower-7,,false"));
    }
}
