use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{
    HelpdeskTool, ToolError, FAQ_RETRIEVER, LOAN_FAQ_RETRIEVER, SHORTLISTING_AGENT,
    STUDENT_LOAN_AGENT,
};
use crate::analytics::HelpdeskMetrics;
use crate::knowledge::KnowledgeTool;
use crate::workflows::admissions::{ShortlistDecision, ShortlistingAgent};
use crate::workflows::loans::{LoanDecider, LoanDecision};

/// Retrieval-augmented FAQ answering for one domain.
#[derive(Clone)]
pub struct FaqRetrieverTool {
    name: &'static str,
    description: &'static str,
    knowledge: KnowledgeTool,
}

impl FaqRetrieverTool {
    pub fn admissions(knowledge: KnowledgeTool) -> Self {
        Self {
            name: FAQ_RETRIEVER,
            description: "Use this to answer FAQs related to student admission.",
            knowledge,
        }
    }

    pub fn loans(knowledge: KnowledgeTool) -> Self {
        Self {
            name: LOAN_FAQ_RETRIEVER,
            description: "Use this to answer FAQs related to student loan approval.",
            knowledge,
        }
    }
}

#[async_trait]
impl HelpdeskTool for FaqRetrieverTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    async fn call(&self, input: &str) -> Result<String, ToolError> {
        let answer = self.knowledge.ask(input).await?;
        debug!(tool = self.name, sources = answer.sources.len(), "faq answered");
        Ok(answer.answer)
    }
}

pub struct ShortlistingTool {
    agent: Arc<ShortlistingAgent>,
    metrics: Option<Arc<HelpdeskMetrics>>,
}

impl ShortlistingTool {
    pub fn new(agent: Arc<ShortlistingAgent>) -> Self {
        Self {
            agent,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<HelpdeskMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

#[async_trait]
impl HelpdeskTool for ShortlistingTool {
    fn name(&self) -> &str {
        SHORTLISTING_AGENT
    }

    fn description(&self) -> &str {
        "Use this to decide if a student should be shortlisted based on verified document and grade info."
    }

    async fn call(&self, input: &str) -> Result<String, ToolError> {
        let decision = self.agent.shortlist(input);
        if let Some(metrics) = &self.metrics {
            match &decision {
                ShortlistDecision::Shortlisted => metrics.record_shortlist(true),
                ShortlistDecision::Rejected(_) => metrics.record_shortlist(false),
                ShortlistDecision::Error { .. } => {}
            }
        }
        Ok(decision.to_string())
    }
}

/// Eligibility simulation. Never touches the budget.
pub struct StudentLoanTool {
    decider: Arc<LoanDecider>,
    metrics: Option<Arc<HelpdeskMetrics>>,
}

impl StudentLoanTool {
    pub fn new(decider: Arc<LoanDecider>) -> Self {
        Self {
            decider,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<HelpdeskMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

#[async_trait]
impl HelpdeskTool for StudentLoanTool {
    fn name(&self) -> &str {
        STUDENT_LOAN_AGENT
    }

    fn description(&self) -> &str {
        "Use this to decide if a student is eligible for a loan based on shortlisting, income, and university budget."
    }

    async fn call(&self, input: &str) -> Result<String, ToolError> {
        let decision = self.decider.approve_loan_json(input);
        if let Some(metrics) = &self.metrics {
            match &decision {
                LoanDecision::Approved { .. } => metrics.record_loan_decision(true),
                LoanDecision::Rejected(_) => metrics.record_loan_decision(false),
                LoanDecision::Error { .. } => {}
            }
        }
        Ok(decision.to_string())
    }
}
