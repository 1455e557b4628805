use helpdesk::auth::{AuthService, InMemorySessionStore, InMemoryUserRepository};
use helpdesk::config::{AppConfig, KnowledgeConfig};
use helpdesk::dashboard::HelpdeskComponents;
use helpdesk::error::AppError;
use helpdesk::knowledge::{embedding, generator, load_faq_entries, KnowledgeError, KnowledgeTool};
use helpdesk::ocr::TesseractExtractor;
use helpdesk::workflows::admissions::{DocumentValidator, ShortlistingAgent};
use helpdesk::workflows::loans::LoanDecider;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// FAQ tool over one corpus file, embedded and answered by the configured providers.
pub(crate) async fn knowledge_tool(
    config: &KnowledgeConfig,
    corpus: &Path,
) -> Result<KnowledgeTool, AppError> {
    let entries = load_faq_entries(corpus).await?;
    let embedder = embedding::build(config).map_err(KnowledgeError::from)?;
    let generator = generator::build(config).map_err(KnowledgeError::from)?;
    Ok(KnowledgeTool::embedded(entries, embedder, generator).await?)
}

pub(crate) fn shortlisting_agent(config: &AppConfig) -> ShortlistingAgent {
    ShortlistingAgent::new(config.admissions.accepted_grades.iter().cloned())
}

pub(crate) fn loan_decider(config: &AppConfig) -> LoanDecider {
    LoanDecider::from_config(&config.loans, config.session.reservation_ttl())
}

pub(crate) fn document_validator(config: &AppConfig) -> DocumentValidator {
    DocumentValidator::new(Arc::new(TesseractExtractor::new(
        config.admissions.tesseract_cmd.clone(),
    )))
}

/// Wire the in-memory stores, OCR engine, loan ledger and both FAQ corpora.
pub(crate) async fn build_components(
    config: &AppConfig,
) -> Result<HelpdeskComponents, AppError> {
    let auth = AuthService::new(
        Arc::new(InMemoryUserRepository::seeded()),
        Arc::new(InMemorySessionStore::default()),
        config.session.timeout(),
    );

    Ok(HelpdeskComponents {
        auth,
        validator: document_validator(config),
        shortlister: shortlisting_agent(config),
        decider: Arc::new(loan_decider(config)),
        admissions_faq: knowledge_tool(&config.knowledge, &config.knowledge.admissions_faq)
            .await?,
        loan_faq: knowledge_tool(&config.knowledge, &config.knowledge.loan_faq).await?,
        upload_limit_bytes: config.admissions.max_upload_bytes(),
    })
}
