//! Role-gated HTTP dashboard over the helpdesk agents.

pub mod router;
mod session;
mod uploads;

#[cfg(test)]
mod tests;

pub use router::dashboard_router;
pub use session::{CurrentSession, SESSION_HEADER};
pub use uploads::{UploadError, UploadedFile, RESULT_SHEET_EXTENSIONS, VERIFICATION_EXTENSIONS};

use std::sync::Arc;

use crate::analytics::HelpdeskMetrics;
use crate::auth::AuthService;
use crate::knowledge::KnowledgeTool;
use crate::tools::{
    AgentExecutor, FaqRetrieverTool, ShortlistingTool, StudentLoanTool, ToolRegistry,
    FAQ_RETRIEVER, LOAN_FAQ_RETRIEVER,
};
use crate::workflows::admissions::{DocumentValidator, ShortlistingAgent};
use crate::workflows::loans::LoanDecider;

/// Components the dashboard is assembled from.
pub struct HelpdeskComponents {
    pub auth: AuthService,
    pub validator: DocumentValidator,
    pub shortlister: ShortlistingAgent,
    pub decider: Arc<LoanDecider>,
    pub admissions_faq: KnowledgeTool,
    pub loan_faq: KnowledgeTool,
    /// Request body ceiling for the document upload routes.
    pub upload_limit_bytes: usize,
}

/// Shared handler state. Cloned per request; everything inside is shared.
#[derive(Clone)]
pub struct DashboardState {
    pub auth: AuthService,
    pub validator: Arc<DocumentValidator>,
    pub decider: Arc<LoanDecider>,
    pub metrics: Arc<HelpdeskMetrics>,
    pub upload_limit_bytes: usize,
    /// FAQ Retriever and Shortlisting Agent.
    pub admissions: AgentExecutor,
    /// Loan FAQ Retriever and Student Loan Agent.
    pub loans: AgentExecutor,
    /// Admissions counsellor bot; FAQ only.
    pub counsellor: AgentExecutor,
}

impl DashboardState {
    pub fn new(components: HelpdeskComponents) -> Self {
        let HelpdeskComponents {
            auth,
            validator,
            shortlister,
            decider,
            admissions_faq,
            loan_faq,
            upload_limit_bytes,
        } = components;
        let metrics = Arc::new(HelpdeskMetrics::default());

        let admissions_faq = Arc::new(FaqRetrieverTool::admissions(admissions_faq));
        let admissions = AgentExecutor::new(
            ToolRegistry::new()
                .with_tool(admissions_faq.clone())
                .with_tool(Arc::new(
                    ShortlistingTool::new(Arc::new(shortlister)).with_metrics(metrics.clone()),
                ))
                .with_default(FAQ_RETRIEVER),
        );
        let loans = AgentExecutor::new(
            ToolRegistry::new()
                .with_tool(Arc::new(FaqRetrieverTool::loans(loan_faq)))
                .with_tool(Arc::new(
                    StudentLoanTool::new(decider.clone()).with_metrics(metrics.clone()),
                ))
                .with_default(LOAN_FAQ_RETRIEVER),
        );
        let counsellor = AgentExecutor::new(ToolRegistry::new().with_tool(admissions_faq));

        Self {
            auth,
            validator: Arc::new(validator),
            decider,
            metrics,
            upload_limit_bytes,
            admissions,
            loans,
            counsellor,
        }
    }
}
