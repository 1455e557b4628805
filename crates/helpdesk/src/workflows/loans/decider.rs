use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

use super::domain::{
    FinalizedLoan, LoanApplication, LoanCommitment, LoanDecision, LoanError, LoanRejection,
    Reservation, ReservationToken,
};
use crate::config::LoanConfig;
use crate::error::FailureKind;

#[derive(Debug, Default)]
struct Ledger {
    budget: f64,
    holds: HashMap<ReservationToken, Reservation>,
}

impl Ledger {
    fn held(&self, now: DateTime<Utc>) -> f64 {
        self.holds
            .values()
            .filter(|hold| hold.expires_at > now)
            .map(|hold| hold.amount)
            .sum()
    }

    fn prune_expired(&mut self, now: DateTime<Utc>) {
        self.holds.retain(|_, hold| hold.expires_at > now);
    }
}

/// Loan agent holding the university budget and the income ceiling.
///
/// `approve_loan` only simulates the deduction. Budget moves through
/// `reserve` + `commit`, or through the unchecked `finalize_approval`, which
/// can drive the budget negative if called without a prior approval.
#[derive(Debug)]
pub struct LoanDecider {
    income_threshold: f64,
    reservation_ttl: Duration,
    ledger: Mutex<Ledger>,
}

impl LoanDecider {
    pub fn new(budget: f64, income_threshold: f64) -> Self {
        Self::with_reservation_ttl(budget, income_threshold, Duration::minutes(15))
    }

    pub fn with_reservation_ttl(budget: f64, income_threshold: f64, ttl: Duration) -> Self {
        Self {
            income_threshold,
            reservation_ttl: ttl,
            ledger: Mutex::new(Ledger {
                budget,
                holds: HashMap::new(),
            }),
        }
    }

    pub fn from_config(config: &LoanConfig, ttl: Duration) -> Self {
        Self::with_reservation_ttl(config.budget, config.income_threshold, ttl)
    }

    /// Each ledger update is a single assignment or map operation, so a
    /// poisoned guard still holds a consistent ledger.
    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn budget(&self) -> f64 {
        self.ledger().budget
    }

    pub fn income_threshold(&self) -> f64 {
        self.income_threshold
    }

    fn check(&self, application: &LoanApplication, available: f64) -> Result<(), LoanRejection> {
        if !application.is_shortlisted() {
            return Err(LoanRejection::NotShortlisted);
        }
        if application.annual_income > self.income_threshold {
            return Err(LoanRejection::IncomeAboveThreshold {
                income: application.annual_income,
                threshold: self.income_threshold,
            });
        }
        if application.requested_loan > available {
            return Err(LoanRejection::ExceedsBudget {
                requested: application.requested_loan,
                available,
            });
        }
        Ok(())
    }

    /// Non-mutating eligibility check against the current budget.
    pub fn approve_loan(&self, application: &LoanApplication) -> LoanDecision {
        if let Err(err) = application.validate_amounts() {
            return LoanDecision::Error {
                kind: FailureKind::MalformedInput,
                message: err.to_string(),
            };
        }
        let budget = self.budget();
        match self.check(application, budget) {
            Ok(()) => LoanDecision::Approved {
                amount: application.requested_loan,
                remaining_budget: budget - application.requested_loan,
            },
            Err(reason) => LoanDecision::Rejected(reason),
        }
    }

    /// Tool entry point: parse failures become `LoanDecision::Error`.
    pub fn approve_loan_json(&self, input: &str) -> LoanDecision {
        match LoanApplication::from_json(input) {
            Ok(application) => self.approve_loan(&application),
            Err(err) => LoanDecision::Error {
                kind: FailureKind::MalformedInput,
                message: err.to_string(),
            },
        }
    }

    /// Deduct `requested_loan` without re-validation.
    pub fn finalize_approval(&self, requested_loan: f64) -> FinalizedLoan {
        let mut ledger = self.ledger();
        ledger.budget -= requested_loan;
        if ledger.budget < 0.0 {
            warn!(budget = ledger.budget, "loan budget overdrawn by unchecked finalize");
        }
        FinalizedLoan {
            remaining_budget: ledger.budget,
        }
    }

    pub fn finalize_approval_json(&self, input: &str) -> Result<FinalizedLoan, LoanError> {
        let application = LoanApplication::from_json(input)
            .map_err(|err| LoanError::InvalidInput(err.to_string()))?;
        Ok(self.finalize_approval(application.requested_loan))
    }

    /// Re-run the approval against budget minus live holds and hold the amount.
    pub fn reserve(
        &self,
        application: &LoanApplication,
        now: DateTime<Utc>,
    ) -> Result<Reservation, LoanError> {
        application.validate_amounts()?;
        if application.requested_loan <= 0.0 {
            return Err(LoanError::InvalidInput(
                "requested_loan must be greater than zero".to_string(),
            ));
        }

        let mut ledger = self.ledger();
        ledger.prune_expired(now);
        let available = ledger.budget - ledger.held(now);
        self.check(application, available)
            .map_err(LoanError::Rejected)?;

        let reservation = Reservation {
            token: ReservationToken::generate(),
            amount: application.requested_loan,
            expires_at: now + self.reservation_ttl,
        };
        ledger
            .holds
            .insert(reservation.token, reservation.clone());

        info!(
            token = %reservation.token,
            amount = reservation.amount,
            "loan reservation created"
        );
        Ok(reservation)
    }

    /// Consume a reservation exactly once and deduct its amount.
    pub fn commit(
        &self,
        token: ReservationToken,
        now: DateTime<Utc>,
    ) -> Result<LoanCommitment, LoanError> {
        let mut ledger = self.ledger();
        let hold = ledger
            .holds
            .remove(&token)
            .ok_or(LoanError::UnknownReservation(token))?;

        if hold.expires_at <= now {
            return Err(LoanError::ReservationExpired(token));
        }

        ledger.budget -= hold.amount;
        info!(%token, amount = hold.amount, budget = ledger.budget, "loan reservation committed");

        Ok(LoanCommitment {
            token,
            amount: hold.amount,
            remaining_budget: ledger.budget,
        })
    }

    /// Budget not yet spoken for by live reservations.
    pub fn available(&self, now: DateTime<Utc>) -> f64 {
        let ledger = self.ledger();
        ledger.budget - ledger.held(now)
    }
}

impl Default for LoanDecider {
    fn default() -> Self {
        let config = LoanConfig::default();
        Self::new(config.budget, config.income_threshold)
    }
}
