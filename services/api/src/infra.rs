use loan_portal::config::WorkflowConfig;
use loan_portal::workflows::intake::{InMemoryWorkflowRepository, LoanApplicationService};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type IntakeService = LoanApplicationService<InMemoryWorkflowRepository>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wire the intake service to the process-local repository.
pub(crate) fn intake_service(config: &WorkflowConfig) -> Arc<IntakeService> {
    let repository = Arc::new(InMemoryWorkflowRepository::default());
    Arc::new(LoanApplicationService::new(repository, *config))
}
