use crate::infra::{intake_service, IntakeService};
use clap::Args;
use loan_portal::config::AppConfig;
use loan_portal::error::AppError;
use loan_portal::workflows::intake::audit::{self, AuditLogEntry};
use loan_portal::workflows::intake::{
    Actor, Application, ApplicationFields, ApplicationStatus, DocumentStatus, DocumentUpload,
    WorkflowError, WorkflowRepository,
};
use serde_json::json;
use std::fs::File;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of submitted applications moved by the bulk review step.
    #[arg(long, default_value_t = 3)]
    pub(crate) bulk_size: usize,
    /// Write the resulting audit trail to this CSV file.
    #[arg(long)]
    pub(crate) audit_csv: Option<PathBuf>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = intake_service(&config.workflow);

    let borrower = Actor::borrower("borrower-dana");
    let broker = Actor::broker("broker-sam");
    let admin = Actor::admin("admin-ria");

    println!("Loan intake workflow demo");

    let draft = service.create_application(&borrower, demo_fields("Dana", 350_000))?;
    println!("- {} opened {} -> {}", borrower.id, draft.id, draft.status);
    let submitted = service.submit(&borrower, &draft.id)?;
    println!("- {} submitted {} -> {}", borrower.id, submitted.id, submitted.status);

    match service.set_status(&borrower, &submitted.id, ApplicationStatus::Approved, None) {
        Ok(_) => println!("  unexpected: borrower approved their own application"),
        Err(err) => println!("  borrower self-approval rejected ({}): {err}", err.kind()),
    }

    let approved = service.set_status(
        &broker,
        &submitted.id,
        ApplicationStatus::Approved,
        Some("verified income".to_string()),
    )?;
    println!("- {} approved {} -> {}", broker.id, approved.id, approved.status);

    let batch = submitted_batch(&service, args.bulk_size)?;
    let ids: Vec<&str> = batch.iter().map(|application| application.id.as_str()).collect();
    if ids.is_empty() {
        println!("- bulk review skipped (batch size 0)");
    } else {
        let affected =
            service.bulk_set_status(&admin, &ids, ApplicationStatus::UnderReview, None)?;
        println!("- {} moved {affected} applications to under_review", admin.id);

        let mut with_ghost = ids.clone();
        with_ghost.push("app-ghost");
        match service.bulk_set_status(&admin, &with_ghost, ApplicationStatus::Rejected, None) {
            Ok(affected) => println!("  unexpected: {affected} applications rejected"),
            Err(err) => println!("  bulk rejection refused ({}): {err}", err.kind()),
        }
        let untouched = batch
            .iter()
            .map(|application| service.get_application(&admin, &application.id))
            .collect::<Result<Vec<_>, WorkflowError>>()?
            .iter()
            .all(|application| application.status == ApplicationStatus::UnderReview);
        println!("  batch still under_review: {untouched}");
    }

    let document = service.register_document(
        &borrower,
        &approved.id,
        DocumentUpload {
            name: "w2-2025.pdf".to_string(),
            size_bytes: 48_213,
            content_type: None,
            storage_key: format!("blobs/intake/{}/w2-2025.pdf", approved.id),
        },
    )?;
    println!(
        "- {} uploaded {} ({}) -> {}",
        borrower.id, document.id, document.metadata.content_type, document.status
    );
    let reviewed = service.set_document_status(
        &broker,
        &document.id,
        DocumentStatus::NeedsResubmission,
        Some("page 2 is cut off".to_string()),
    )?;
    println!("- {} reviewed {} -> {}", broker.id, reviewed.id, reviewed.status);

    let entries = service
        .repository()
        .audit_entries(None)
        .map_err(WorkflowError::from)?;
    println!("\nAudit trail ({} entries)", entries.len());
    for entry in &entries {
        print_entry(entry);
    }

    if let Some(path) = args.audit_csv {
        let file = File::create(&path)?;
        audit::write_csv(file, &entries)?;
        println!("\nAudit trail written to {}", path.display());
    }

    Ok(())
}

fn demo_fields(first_name: &str, loan_amount: u64) -> ApplicationFields {
    let mut fields = ApplicationFields::default();
    fields
        .personal
        .insert("first_name".to_string(), json!(first_name));
    fields
        .financial
        .insert("loan_amount".to_string(), json!(loan_amount));
    fields
}

fn submitted_batch(service: &IntakeService, size: usize) -> Result<Vec<Application>, AppError> {
    const NAMES: [&str; 4] = ["Lee", "Priya", "Marco", "Ines"];

    (0..size)
        .map(|index| -> Result<Application, AppError> {
            let name = NAMES[index % NAMES.len()];
            let owner = Actor::borrower(format!("borrower-{}", name.to_ascii_lowercase()));
            let draft = service.create_application(&owner, demo_fields(name, 280_000))?;
            Ok(service.submit(&owner, &draft.id)?)
        })
        .collect()
}

fn print_entry(entry: &AuditLogEntry) {
    let metadata = &entry.metadata;
    println!(
        "  {} {:<22} {} {} -> {} by {}{}",
        entry.id,
        entry.action.label(),
        metadata.application_id,
        metadata.old_status.as_deref().unwrap_or("-"),
        metadata.new_status.as_deref().unwrap_or("-"),
        metadata.actor_id,
        if metadata.bulk_update { " (bulk)" } else { "" }
    );
}
