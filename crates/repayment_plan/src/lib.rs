//! # Repayment Plan
//!
//! Calculation core for the debt negotiation workflow: the phased repayment
//! plan offered to a client's creditors, the regulatory provision a bank
//! holds against an overdue credit, and the effective rate of a contract.
//!
//! Every function here is pure. Reading inputs, enforcing the firm's
//! allocation policy and rendering results belong to the callers.
//!
//! ```rust
//! use models::Debt;
//! use repayment_plan::{compute_repayment_plan, summarize};
//!
//! let debts = vec![Debt::new("Banco A", 6000.0), Debt::new("Banco B", 1500.0)];
//! let phases = compute_repayment_plan(&debts, 10_000.0, 10.0)?;
//! assert_eq!(summarize(&phases).total_months, 8);
//! # Ok::<(), repayment_plan::PlanError>(())
//! ```

pub mod allocator;
pub mod error;
pub mod provision;
pub mod rates;

pub use allocator::{
    compute_repayment_plan, disposable_budget, summarize, CENT, MAX_PLAN_MONTHS,
};
pub use error::{PlanError, Result};
pub use provision::{analyze_settlement, provision_amount, RiskLevel, SettlementAnalysis};
pub use rates::{
    effective_monthly_rate, effective_rate, level_installment, EffectiveRate, LoanTerms,
};
