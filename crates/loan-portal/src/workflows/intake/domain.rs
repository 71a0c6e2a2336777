use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier wrapper for loan applications.
    ApplicationId
);
string_id!(
    /// Identifier wrapper for uploaded supporting documents.
    DocumentId
);
string_id!(CommentId);
string_id!(AuditEntryId);
string_id!(
    /// Identity issued by the session provider; opaque to the workflow.
    ActorId
);

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static DOCUMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static COMMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static AUDIT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_sequence(sequence: &AtomicU64, prefix: &str) -> String {
    let id = sequence.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id:06}")
}

pub(crate) fn next_application_id() -> ApplicationId {
    ApplicationId(next_sequence(&APPLICATION_SEQUENCE, "app"))
}

pub(crate) fn next_document_id() -> DocumentId {
    DocumentId(next_sequence(&DOCUMENT_SEQUENCE, "doc"))
}

pub(crate) fn next_comment_id() -> CommentId {
    CommentId(next_sequence(&COMMENT_SEQUENCE, "cmt"))
}

pub(crate) fn next_audit_entry_id() -> AuditEntryId {
    AuditEntryId(next_sequence(&AUDIT_SEQUENCE, "aud"))
}

/// Account role attached to a session.
///
/// `PendingBroker` marks a broker signup awaiting approval. It is not a workflow role and
/// grants nothing beyond what a borrower may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Borrower,
    Broker,
    Admin,
    PendingBroker,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            ActorRole::Borrower => "borrower",
            ActorRole::Broker => "broker",
            ActorRole::Admin => "admin",
            ActorRole::PendingBroker => "pending_broker",
        }
    }

    /// Resolve a role claim from the identity provider. Missing or unknown claims fall back
    /// to the least-privileged role.
    pub fn from_claim(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("broker") => ActorRole::Broker,
            Some("admin") => ActorRole::Admin,
            Some("pending_broker") => ActorRole::PendingBroker,
            _ => ActorRole::Borrower,
        }
    }

    pub const fn is_reviewer(self) -> bool {
        matches!(self, ActorRole::Broker | ActorRole::Admin)
    }
}

/// Caller identity for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id: ActorId(id.into()),
            role,
        }
    }

    pub fn borrower(id: impl Into<String>) -> Self {
        Self::new(id, ActorRole::Borrower)
    }

    pub fn broker(id: impl Into<String>) -> Self {
        Self::new(id, ActorRole::Broker)
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self::new(id, ActorRole::Admin)
    }

    pub fn owns(&self, application: &Application) -> bool {
        self.id == application.owner_id
    }
}

/// Lifecycle status of a loan application, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    Pending,
    UnderReview,
    Approved,
    Rejected,
    Completed,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 7] = [
        ApplicationStatus::Draft,
        ApplicationStatus::Submitted,
        ApplicationStatus::Pending,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
        ApplicationStatus::Completed,
    ];

    /// Targets a reviewer may set, from any non-draft state.
    pub const REVIEWER_TARGETS: [ApplicationStatus; 5] = [
        ApplicationStatus::Pending,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
        ApplicationStatus::Completed,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Completed => "completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|status| status.label() == raw)
    }

    pub fn is_reviewer_target(self) -> bool {
        Self::REVIEWER_TARGETS.contains(&self)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Review status of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    PendingScan,
    Approved,
    Rejected,
    NeedsResubmission,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 4] = [
        DocumentStatus::PendingScan,
        DocumentStatus::Approved,
        DocumentStatus::Rejected,
        DocumentStatus::NeedsResubmission,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            DocumentStatus::PendingScan => "pending_scan",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Rejected => "rejected",
            DocumentStatus::NeedsResubmission => "needs_resubmission",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|status| status.label() == raw)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Borrower-supplied sections carried through the workflow without interpretation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationFields {
    pub personal: Map<String, Value>,
    pub employment: Map<String, Value>,
    pub property: Map<String, Value>,
    pub financial: Map<String, Value>,
}

impl ApplicationFields {
    /// Shallow merge: keys present in `patch` overwrite, everything else is kept.
    pub fn merge(&mut self, patch: ApplicationFieldsPatch) {
        fn merge_section(target: &mut Map<String, Value>, section: Option<Map<String, Value>>) {
            if let Some(section) = section {
                target.extend(section);
            }
        }

        merge_section(&mut self.personal, patch.personal);
        merge_section(&mut self.employment, patch.employment);
        merge_section(&mut self.property, patch.property);
        merge_section(&mut self.financial, patch.financial);
    }
}

/// Owner edit payload. A `status` entry is a transition request, not a field write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationFieldsPatch {
    pub personal: Option<Map<String, Value>>,
    pub employment: Option<Map<String, Value>>,
    pub property: Option<Map<String, Value>>,
    pub financial: Option<Map<String, Value>>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub owner_id: ActorId,
    pub status: ApplicationStatus,
    pub fields: ApplicationFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// File metadata; the blob itself lives in external storage under `storage_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub name: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub storage_key: String,
}

/// Upload registration payload accepted from the file intake step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUpload {
    pub name: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub content_type: Option<String>,
    pub storage_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub application_id: ApplicationId,
    pub uploader_id: ActorId,
    pub status: DocumentStatus,
    pub metadata: DocumentMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub application_id: ApplicationId,
    pub author_id: ActorId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
