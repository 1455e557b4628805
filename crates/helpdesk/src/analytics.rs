use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters behind the admin analytics page.
#[derive(Debug, Default)]
pub struct HelpdeskMetrics {
    applications: AtomicU64,
    documents_verified: AtomicU64,
    documents_rejected: AtomicU64,
    students_shortlisted: AtomicU64,
    students_rejected: AtomicU64,
    loans_approved: AtomicU64,
    loans_rejected: AtomicU64,
    loans_committed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalyticsSnapshot {
    pub applications: u64,
    pub documents_verified: u64,
    pub documents_rejected: u64,
    pub students_shortlisted: u64,
    pub students_rejected: u64,
    pub loans_approved: u64,
    pub loans_rejected: u64,
    pub loans_committed: u64,
}

impl HelpdeskMetrics {
    pub fn record_application(&self) {
        self.applications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_document(&self, verified: bool) {
        let counter = if verified {
            &self.documents_verified
        } else {
            &self.documents_rejected
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_shortlist(&self, shortlisted: bool) {
        let counter = if shortlisted {
            &self.students_shortlisted
        } else {
            &self.students_rejected
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_loan_decision(&self, approved: bool) {
        let counter = if approved {
            &self.loans_approved
        } else {
            &self.loans_rejected
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_loan_commit(&self) {
        self.loans_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            applications: self.applications.load(Ordering::Relaxed),
            documents_verified: self.documents_verified.load(Ordering::Relaxed),
            documents_rejected: self.documents_rejected.load(Ordering::Relaxed),
            students_shortlisted: self.students_shortlisted.load(Ordering::Relaxed),
            students_rejected: self.students_rejected.load(Ordering::Relaxed),
            loans_approved: self.loans_approved.load(Ordering::Relaxed),
            loans_rejected: self.loans_rejected.load(Ordering::Relaxed),
            loans_committed: self.loans_committed.load(Ordering::Relaxed),
        }
    }
}
