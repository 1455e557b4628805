//! University admissions helpdesk: result-sheet shortlisting, student loan
//! eligibility, FAQ retrieval and a role-gated HTTP dashboard.

pub mod analytics;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod knowledge;
pub mod ocr;
pub mod telemetry;
pub mod tools;
pub mod workflows;
