use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlanError>;

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error(
        "Disposable budget must be positive, got {budget} \
         (net income {net_income} at {allocation_percentage}%)"
    )]
    InvalidBudget {
        budget: f64,
        net_income: f64,
        allocation_percentage: f64,
    },

    #[error("Debt with creditor '{creditor_name}' has invalid outstanding amount {amount}")]
    InvalidDebt { creditor_name: String, amount: f64 },

    #[error("Offer {offer} is invalid for an outstanding balance of {balance}")]
    InvalidOffer { offer: f64, balance: f64 },

    #[error("Invalid loan terms: {0}")]
    InvalidLoanTerms(String),

    #[error("Rate solver did not converge after {iterations} iterations")]
    RateDidNotConverge { iterations: u32 },
}
