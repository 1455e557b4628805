//! Student loan eligibility against a shared university budget.

mod decider;
pub mod domain;

pub use decider::LoanDecider;
pub use domain::{
    format_amount, FinalizedLoan, LoanApplication, LoanCommitment, LoanDecision, LoanError,
    LoanRejection, Reservation, ReservationToken,
};
