use models::LoanInput;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlanError, Result};

const NEWTON_MAX_ITERATIONS: u32 = 100;
const NEWTON_EPSILON: f64 = 1e-10;
const NEWTON_INITIAL_GUESS: f64 = 0.01;

/// Level-installment (Price table) contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: f64,
    pub installment: f64,
    pub term_months: u32,
}

impl From<&LoanInput> for LoanTerms {
    fn from(input: &LoanInput) -> Self {
        Self {
            principal: input.principal,
            installment: input.installment,
            term_months: input.term_months,
        }
    }
}

/// Effective cost of a contract, as fractions (0.02 = 2%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectiveRate {
    pub monthly: f64,
    pub annual: f64,
}

pub fn monthly_to_annual(monthly: f64) -> f64 {
    (1.0 + monthly).powi(12) - 1.0
}

pub fn annual_to_monthly(annual: f64) -> f64 {
    (1.0 + annual).powf(1.0 / 12.0) - 1.0
}

/// Installment that repays `principal` in `term_months` at `monthly_rate`.
pub fn level_installment(principal: f64, monthly_rate: f64, term_months: u32) -> Result<f64> {
    if !principal.is_finite() || principal <= 0.0 {
        return Err(PlanError::InvalidLoanTerms(format!(
            "principal must be positive, got {}",
            principal
        )));
    }
    if term_months == 0 {
        return Err(PlanError::InvalidLoanTerms(
            "term must be at least one month".to_string(),
        ));
    }
    if !monthly_rate.is_finite() || monthly_rate < 0.0 {
        return Err(PlanError::InvalidLoanTerms(format!(
            "monthly rate must be non-negative, got {}",
            monthly_rate
        )));
    }

    let n = f64::from(term_months);
    if monthly_rate == 0.0 {
        return Ok(principal / n);
    }
    Ok(principal * monthly_rate / (1.0 - (1.0 + monthly_rate).powf(-n)))
}

/// Solves the monthly rate implied by a contract's installment (Newton-Raphson).
pub fn effective_monthly_rate(terms: &LoanTerms) -> Result<f64> {
    let LoanTerms {
        principal,
        installment,
        term_months,
    } = *terms;

    if !principal.is_finite() || principal <= 0.0 {
        return Err(PlanError::InvalidLoanTerms(format!(
            "principal must be positive, got {}",
            principal
        )));
    }
    if !installment.is_finite() || installment <= 0.0 {
        return Err(PlanError::InvalidLoanTerms(format!(
            "installment must be positive, got {}",
            installment
        )));
    }
    if term_months == 0 {
        return Err(PlanError::InvalidLoanTerms(
            "term must be at least one month".to_string(),
        ));
    }

    let n = f64::from(term_months);
    let total_paid = installment * n;
    if (total_paid - principal).abs() <= principal * NEWTON_EPSILON {
        return Ok(0.0);
    }
    if total_paid < principal {
        return Err(PlanError::InvalidLoanTerms(format!(
            "installments total {} which is less than the principal {}",
            total_paid, principal
        )));
    }

    // f(i) = PV of the installments at rate i minus the principal
    let mut rate = NEWTON_INITIAL_GUESS;
    for iteration in 1..=NEWTON_MAX_ITERATIONS {
        let discount = (1.0 + rate).powf(-n);
        let f = installment * (1.0 - discount) / rate - principal;
        let df = installment * (n * discount / (1.0 + rate) * rate - (1.0 - discount))
            / (rate * rate);
        if df == 0.0 || !df.is_finite() {
            break;
        }

        let mut next = rate - f / df;
        if next <= 0.0 {
            next = rate / 2.0;
        }
        if (next - rate).abs() < NEWTON_EPSILON {
            debug!(iteration, rate = next, "Effective rate converged");
            return Ok(next);
        }
        rate = next;
    }

    Err(PlanError::RateDidNotConverge {
        iterations: NEWTON_MAX_ITERATIONS,
    })
}

pub fn effective_rate(terms: &LoanTerms) -> Result<EffectiveRate> {
    let monthly = effective_monthly_rate(terms)?;
    Ok(EffectiveRate {
        monthly,
        annual: monthly_to_annual(monthly),
    })
}
