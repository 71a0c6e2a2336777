use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::audit::AuditLogEntry;
use super::domain::{Application, ApplicationId, ApplicationStatus, Comment, Document, DocumentId};
use super::lifecycle::StatusTransition;
use super::repository::{BulkStatusUpdate, RepositoryError, StatusChange, WorkflowRepository};
use super::visibility::ListScope;

#[derive(Debug, Default)]
struct Tables {
    applications: BTreeMap<ApplicationId, Application>,
    documents: BTreeMap<DocumentId, Document>,
    comments: Vec<Comment>,
    audit: Vec<AuditLogEntry>,
}

/// Process-local repository. One mutex guards every table, so each trait call is a single
/// unit of work.
#[derive(Debug, Default, Clone)]
pub struct InMemoryWorkflowRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryWorkflowRepository {
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl WorkflowRepository for InMemoryWorkflowRepository {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        tables
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables.applications.get(id).cloned())
    }

    fn list_applications(&self, scope: &ListScope) -> Result<Vec<Application>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .applications
            .values()
            .filter(|application| scope.admits(application))
            .cloned()
            .collect())
    }

    fn commit_application(
        &self,
        application: Application,
        audit: Option<AuditLogEntry>,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let slot = tables
            .applications
            .get_mut(&application.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = application;
        tables.audit.extend(audit);
        Ok(())
    }

    fn delete_draft(
        &self,
        id: &ApplicationId,
        audit: AuditLogEntry,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        match tables.applications.get(id) {
            None => return Err(RepositoryError::NotFound),
            Some(stored) if stored.status != ApplicationStatus::Draft => {
                return Err(RepositoryError::Conflict)
            }
            Some(_) => {}
        }

        tables.applications.remove(id);
        tables
            .documents
            .retain(|_, document| &document.application_id != id);
        tables.comments.retain(|comment| &comment.application_id != id);
        tables.audit.push(audit);
        Ok(())
    }

    fn bulk_update_status(
        &self,
        update: &BulkStatusUpdate,
        audit: &dyn Fn(&StatusChange) -> AuditLogEntry,
    ) -> Result<Vec<StatusChange>, RepositoryError> {
        let mut tables = self.lock()?;

        let missing: Vec<ApplicationId> = update
            .ids
            .iter()
            .filter(|id| {
                !tables
                    .applications
                    .get(*id)
                    .is_some_and(|application| update.scope.admits(application))
            })
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(RepositoryError::Missing(missing));
        }

        let mut changes = Vec::with_capacity(update.ids.len());
        for id in &update.ids {
            if let Some(application) = tables.applications.get_mut(id) {
                changes.push(StatusChange {
                    application_id: id.clone(),
                    transition: StatusTransition {
                        from: application.status,
                        to: update.status,
                    },
                });
                application.status = update.status;
                application.updated_at = update.updated_at;
            }
        }

        let entries: Vec<AuditLogEntry> = changes.iter().map(audit).collect();
        tables.audit.extend(entries);
        Ok(changes)
    }

    fn insert_document(&self, document: Document) -> Result<Document, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.documents.contains_key(&document.id) {
            return Err(RepositoryError::Conflict);
        }
        if !tables.applications.contains_key(&document.application_id) {
            return Err(RepositoryError::NotFound);
        }
        tables.documents.insert(document.id.clone(), document.clone());
        Ok(document)
    }

    fn fetch_document(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables.documents.get(id).cloned())
    }

    fn list_documents(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Document>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .documents
            .values()
            .filter(|document| &document.application_id == application_id)
            .cloned()
            .collect())
    }

    fn commit_document(
        &self,
        document: Document,
        audit: AuditLogEntry,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let slot = tables
            .documents
            .get_mut(&document.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = document;
        tables.audit.push(audit);
        Ok(())
    }

    fn insert_comment(&self, comment: Comment) -> Result<Comment, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.applications.contains_key(&comment.application_id) {
            return Err(RepositoryError::NotFound);
        }
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    fn list_comments(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Comment>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .comments
            .iter()
            .filter(|comment| &comment.application_id == application_id)
            .cloned()
            .collect())
    }

    fn audit_entries(
        &self,
        application_id: Option<&ApplicationId>,
    ) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .audit
            .iter()
            .filter(|entry| application_id.map_or(true, |id| entry.concerns(id)))
            .cloned()
            .collect())
    }
}
