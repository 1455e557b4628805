//! Named tools over the helpdesk agents plus the executor that routes prompts to them.

mod catalog;
mod executor;

pub use catalog::{FaqRetrieverTool, ShortlistingTool, StudentLoanTool};
pub use executor::{
    AgentExecutor, AgentRun, AgentStep, DirectiveSelector, ToolInvocation, ToolSelector,
    LOAN_DIRECTIVE, SHORTLIST_DIRECTIVE,
};

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::FailureKind;
use crate::knowledge::KnowledgeError;

pub const FAQ_RETRIEVER: &str = "FAQ Retriever";
pub const SHORTLISTING_AGENT: &str = "Shortlisting Agent";
pub const LOAN_FAQ_RETRIEVER: &str = "Loan FAQ Retriever";
pub const STUDENT_LOAN_AGENT: &str = "Student Loan Agent";

/// A callable unit the executor can pick by name.
#[async_trait]
pub trait HelpdeskTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn call(&self, input: &str) -> Result<String, ToolError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("no tool named `{0}` is registered")]
    UnknownTool(String),
    #[error("no tools registered")]
    EmptyRegistry,
    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),
}

impl ToolError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ToolError::UnknownTool(_) | ToolError::EmptyRegistry => FailureKind::MalformedInput,
            ToolError::Knowledge(KnowledgeError::Io { .. }) => FailureKind::FileNotFound,
            ToolError::Knowledge(KnowledgeError::Json { .. }) => FailureKind::MalformedInput,
            ToolError::Knowledge(_) => FailureKind::ExternalService,
        }
    }
}

/// Registration-ordered set of tools. The first registered tool is the default
/// unless one is set explicitly.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn HelpdeskTool>>,
    default_tool: Option<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn HelpdeskTool>) {
        self.tools.retain(|existing| existing.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn with_tool(mut self, tool: Arc<dyn HelpdeskTool>) -> Self {
        self.register(tool);
        self
    }

    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.default_tool = Some(name.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn HelpdeskTool>> {
        self.tools.iter().find(|tool| tool.name() == name).cloned()
    }

    pub fn default_tool(&self) -> Option<Arc<dyn HelpdeskTool>> {
        match &self.default_tool {
            Some(name) => self.get(name),
            None => self.tools.first().cloned(),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    /// `name: description` lines, the listing an LLM-driven selector would be shown.
    pub fn describe(&self) -> String {
        self.tools
            .iter()
            .map(|tool| format!("{}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(&'static str);

    #[async_trait]
    impl HelpdeskTool for Echo {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "echoes its input"
        }

        async fn call(&self, input: &str) -> Result<String, ToolError> {
            Ok(format!("{}: {input}", self.0))
        }
    }

    #[test]
    fn first_tool_is_default_unless_overridden() {
        let registry = ToolRegistry::new()
            .with_tool(Arc::new(Echo("one")))
            .with_tool(Arc::new(Echo("two")));
        assert_eq!(registry.default_tool().map(|t| t.name().to_string()), Some("one".into()));

        let registry = registry.with_default("two");
        assert_eq!(registry.default_tool().map(|t| t.name().to_string()), Some("two".into()));
    }

    #[test]
    fn re_registering_replaces_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo("one")));
        registry.register(Arc::new(Echo("one")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.describe(), "one: echoes its input");
    }
}
