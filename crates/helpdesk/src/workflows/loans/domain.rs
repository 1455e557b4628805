use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::FailureKind;

/// Loan request as received by the loan agent tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    #[serde(default)]
    pub shortlisted: String,
    #[serde(default, deserialize_with = "flexible_amount")]
    pub annual_income: f64,
    #[serde(default, deserialize_with = "flexible_amount")]
    pub requested_loan: f64,
}

impl LoanApplication {
    pub fn new(shortlisted: bool, annual_income: f64, requested_loan: f64) -> Self {
        let status = if shortlisted {
            "shortlisted"
        } else {
            "not shortlisted"
        };
        Self {
            shortlisted: status.to_string(),
            annual_income,
            requested_loan,
        }
    }

    pub fn is_shortlisted(&self) -> bool {
        self.shortlisted.trim().to_lowercase() == "shortlisted"
    }

    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// Income and requested amount must both be finite and non-negative.
    pub fn validate_amounts(&self) -> Result<(), LoanError> {
        for (field, value) in [
            ("annual_income", self.annual_income),
            ("requested_loan", self.requested_loan),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(LoanError::InvalidInput(format!(
                    "{field} must be a non-negative amount, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Accepts `250000`, `250000.5` or `"250000"`.
fn flexible_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Number(value) => Ok(value),
        Amount::Text(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("could not convert '{raw}' to a number"))),
    }
}

/// Render currency amounts the way the desk reads them: whole amounts without decimals.
pub fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Why a loan request was turned down.
#[derive(Debug, Clone, PartialEq)]
pub enum LoanRejection {
    NotShortlisted,
    IncomeAboveThreshold { income: f64, threshold: f64 },
    ExceedsBudget { requested: f64, available: f64 },
}

impl fmt::Display for LoanRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanRejection::NotShortlisted => write!(f, "Student not shortlisted."),
            LoanRejection::IncomeAboveThreshold { income, threshold } => write!(
                f,
                "Annual income {} exceeds threshold {}.",
                format_amount(*income),
                format_amount(*threshold)
            ),
            LoanRejection::ExceedsBudget {
                requested,
                available,
            } => write!(
                f,
                "Requested loan ({}) exceeds remaining budget ({}).",
                format_amount(*requested),
                format_amount(*available)
            ),
        }
    }
}

/// Outcome of an eligibility check. Approval carries the simulated remaining budget.
#[derive(Debug, Clone, PartialEq)]
pub enum LoanDecision {
    Approved { amount: f64, remaining_budget: f64 },
    Rejected(LoanRejection),
    Error { kind: FailureKind, message: String },
}

impl LoanDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, LoanDecision::Approved { .. })
    }
}

impl fmt::Display for LoanDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanDecision::Approved {
                amount,
                remaining_budget,
            } => write!(
                f,
                "Loan Approved for {}. Remaining Budget: {}",
                format_amount(*amount),
                format_amount(*remaining_budget)
            ),
            LoanDecision::Rejected(reason) => write!(f, "Loan Rejected: {reason}"),
            LoanDecision::Error { message, .. } => {
                write!(f, "Error processing loan application: {message}")
            }
        }
    }
}

/// Result of the unchecked commit path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FinalizedLoan {
    pub remaining_budget: f64,
}

impl fmt::Display for FinalizedLoan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[FINAL] Loan Approved. Remaining Budget: {}",
            format_amount(self.remaining_budget)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationToken(pub Uuid);

impl ReservationToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ReservationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Budget held for an approved request until it is committed or expires.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reservation {
    pub token: ReservationToken,
    pub amount: f64,
    pub expires_at: DateTime<Utc>,
}

/// Budget deduction made by consuming a reservation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanCommitment {
    pub token: ReservationToken,
    pub amount: f64,
    pub remaining_budget: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum LoanError {
    #[error("invalid loan application: {0}")]
    InvalidInput(String),
    #[error("loan rejected: {0}")]
    Rejected(LoanRejection),
    #[error("reservation {0} is unknown or already committed")]
    UnknownReservation(ReservationToken),
    #[error("reservation {0} has expired")]
    ReservationExpired(ReservationToken),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn amounts_accept_numbers_and_numeric_strings() {
        let application: LoanApplication = serde_json::from_value(json!({
            "shortlisted": " Shortlisted ",
            "annual_income": "250000",
            "requested_loan": 100000,
        }))
        .expect("parses");
        assert!(application.is_shortlisted());
        assert_eq!(application.annual_income, 250_000.0);
        assert_eq!(application.requested_loan, 100_000.0);
    }

    #[test]
    fn missing_fields_default_to_zero_and_empty() {
        let application = LoanApplication::from_json("{}").expect("parses");
        assert!(!application.is_shortlisted());
        assert_eq!(application.annual_income, 0.0);
    }

    #[test]
    fn non_numeric_amount_is_rejected() {
        assert!(LoanApplication::from_json(r#"{"annual_income": "lots"}"#).is_err());
    }

    #[test]
    fn negative_or_non_finite_amounts_fail_validation() {
        assert!(LoanApplication::new(true, 0.0, 0.0).validate_amounts().is_ok());

        let negative = LoanApplication::new(true, 1_000.0, -250_000.0);
        match negative.validate_amounts() {
            Err(LoanError::InvalidInput(message)) => assert!(message.contains("requested_loan")),
            other => panic!("expected invalid input, got {other:?}"),
        }

        let infinite = LoanApplication::from_json(r#"{"annual_income": "inf"}"#).expect("parses");
        assert!(matches!(
            infinite.validate_amounts(),
            Err(LoanError::InvalidInput(_))
        ));
    }

    #[test]
    fn formats_whole_and_fractional_amounts() {
        assert_eq!(format_amount(400_000.0), "400000");
        assert_eq!(format_amount(1234.5), "1234.50");
        assert_eq!(format_amount(-50.0), "-50");
    }
}
