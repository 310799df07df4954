pub mod applicant;
pub mod catalog;
pub mod error;
pub mod flow;
pub mod review;
pub mod runner;
pub mod step;
pub mod storage;
pub mod storage_postgres;
pub mod transport;

// Re-export commonly used types
pub use applicant::{
    Applicant, ApplicantPatch, ApplicantStore, ApplicationStatus, Identity,
    InMemoryApplicantStore,
};
pub use catalog::{Choices, Language, Prompt};
pub use error::{FlowError, Result};
pub use flow::ApplicationFlow;
pub use review::{DecisionReceipt, DecisionTag, ReviewDecision, ReviewerDesk};
pub use runner::{ExecutionResult, FlowRunner};
pub use step::{ExecutionStatus, Inbound, Markup, Outbound, Step, ValidationError};
pub use storage::{InMemorySessionStorage, Scratch, Session, SessionStorage};
pub use storage_postgres::PostgresApplicantStore;
pub use transport::{RecordingTransport, Transport};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_simple_turn_execution() {
        let transport = RecordingTransport::new();
        let flow = ApplicationFlow::new(
            Arc::new(InMemoryApplicantStore::new()),
            Arc::new(transport.clone()),
            Identity(1),
        );
        let runner = FlowRunner::new(Arc::new(flow), Arc::new(InMemorySessionStorage::new()));

        let result = runner
            .handle(&Inbound::new(Identity(2), "/start"))
            .await
            .unwrap();

        assert_eq!(result.step, Step::SelectLanguage);
        assert!(matches!(result.status, ExecutionStatus::WaitingForInput));
        assert_eq!(transport.sent_to(Identity(2)).len(), 1);
    }
}
