use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::{ToolError, ToolRegistry, SHORTLISTING_AGENT, STUDENT_LOAN_AGENT};

pub const SHORTLIST_DIRECTIVE: &str = "Shortlist this student:";
pub const LOAN_DIRECTIVE: &str = "Evaluate loan eligibility:";

/// Tool choice for a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub tool: String,
    pub input: String,
}

/// Picks which registered tool handles a prompt, and with what input.
#[async_trait]
pub trait ToolSelector: Send + Sync {
    async fn select(
        &self,
        prompt: &str,
        registry: &ToolRegistry,
    ) -> Result<ToolInvocation, ToolError>;
}

/// Prefix routing: a known directive sends its trailing payload to the mapped
/// tool; anything else goes verbatim to the registry default.
#[derive(Debug, Clone)]
pub struct DirectiveSelector {
    routes: Vec<(String, String)>,
}

impl DirectiveSelector {
    pub fn empty() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn route(mut self, prefix: impl Into<String>, tool: impl Into<String>) -> Self {
        self.routes.push((prefix.into(), tool.into()));
        self
    }
}

impl Default for DirectiveSelector {
    fn default() -> Self {
        Self::empty()
            .route(SHORTLIST_DIRECTIVE, SHORTLISTING_AGENT)
            .route(LOAN_DIRECTIVE, STUDENT_LOAN_AGENT)
    }
}

#[async_trait]
impl ToolSelector for DirectiveSelector {
    async fn select(
        &self,
        prompt: &str,
        registry: &ToolRegistry,
    ) -> Result<ToolInvocation, ToolError> {
        let trimmed = prompt.trim();
        for (prefix, tool) in &self.routes {
            if let Some(payload) = trimmed.strip_prefix(prefix.as_str()) {
                return Ok(ToolInvocation {
                    tool: tool.clone(),
                    input: payload.trim().to_string(),
                });
            }
        }

        let fallback = registry.default_tool().ok_or(ToolError::EmptyRegistry)?;
        Ok(ToolInvocation {
            tool: fallback.name().to_string(),
            input: trimmed.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentStep {
    pub tool: String,
    pub tool_input: String,
    pub observation: String,
}

/// Final answer plus the intermediate tool calls that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentRun {
    pub steps: Vec<AgentStep>,
    pub output: String,
}

#[derive(Clone)]
pub struct AgentExecutor {
    registry: ToolRegistry,
    selector: Arc<dyn ToolSelector>,
}

impl AgentExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self::with_selector(registry, Arc::new(DirectiveSelector::default()))
    }

    pub fn with_selector(registry: ToolRegistry, selector: Arc<dyn ToolSelector>) -> Self {
        Self { registry, selector }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn run(&self, prompt: &str) -> Result<AgentRun, ToolError> {
        let invocation = self.selector.select(prompt, &self.registry).await?;
        let tool = self
            .registry
            .get(&invocation.tool)
            .ok_or_else(|| ToolError::UnknownTool(invocation.tool.clone()))?;

        debug!(tool = %invocation.tool, "invoking tool");
        let observation = tool.call(&invocation.input).await?;
        info!(tool = %invocation.tool, "agent run finished");

        Ok(AgentRun {
            output: observation.clone(),
            steps: vec![AgentStep {
                tool: invocation.tool,
                tool_input: invocation.input,
                observation,
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{HelpdeskTool, ShortlistingTool, StudentLoanTool};
    use crate::workflows::admissions::ShortlistingAgent;
    use crate::workflows::loans::LoanDecider;

    struct StaticFaq;

    #[async_trait]
    impl HelpdeskTool for StaticFaq {
        fn name(&self) -> &str {
            "FAQ Retriever"
        }

        fn description(&self) -> &str {
            "fixed answers"
        }

        async fn call(&self, input: &str) -> Result<String, ToolError> {
            Ok(format!("faq says: {input}"))
        }
    }

    fn executor() -> AgentExecutor {
        let registry = ToolRegistry::new()
            .with_tool(Arc::new(StaticFaq))
            .with_tool(Arc::new(ShortlistingTool::new(Arc::new(
                ShortlistingAgent::default(),
            ))))
            .with_tool(Arc::new(StudentLoanTool::new(Arc::new(LoanDecider::default()))));
        AgentExecutor::new(registry)
    }

    #[tokio::test]
    async fn shortlist_directive_routes_payload_to_shortlisting_agent() {
        let run = executor()
            .run(r#"Shortlist this student: {"verification_result": {"status": "verified", "message": "Document is valid."}, "extracted_text": {"result": "A", "overall_grade": "A"}}"#)
            .await
            .expect("run succeeds");

        assert_eq!(run.output, "Shortlisted");
        assert_eq!(run.steps.len(), 1);
        assert_eq!(run.steps[0].tool, "Shortlisting Agent");
        assert!(run.steps[0].tool_input.starts_with('{'));
    }

    #[tokio::test]
    async fn loan_directive_routes_to_loan_agent() {
        let run = executor()
            .run(r#"Evaluate loan eligibility: {"shortlisted": "not shortlisted", "annual_income": 1, "requested_loan": 1}"#)
            .await
            .expect("run succeeds");
        assert_eq!(run.steps[0].tool, "Student Loan Agent");
        assert_eq!(run.output, "Loan Rejected: Student not shortlisted.");
    }

    #[tokio::test]
    async fn free_text_goes_to_default_tool() {
        let run = executor()
            .run("  When do admissions open?  ")
            .await
            .expect("run succeeds");
        assert_eq!(run.steps[0].tool, "FAQ Retriever");
        assert_eq!(run.output, "faq says: When do admissions open?");
    }

    #[tokio::test]
    async fn directive_for_missing_tool_is_an_error() {
        let executor = AgentExecutor::new(ToolRegistry::new().with_tool(Arc::new(StaticFaq)));
        let err = executor
            .run("Evaluate loan eligibility: {}")
            .await
            .expect_err("loan agent not registered");
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "Student Loan Agent"));
    }

    #[tokio::test]
    async fn empty_registry_cannot_answer() {
        let executor = AgentExecutor::new(ToolRegistry::new());
        assert!(matches!(
            executor.run("hello").await,
            Err(ToolError::EmptyRegistry)
        ));
    }
}
