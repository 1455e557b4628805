pub mod admissions;
pub mod loans;
