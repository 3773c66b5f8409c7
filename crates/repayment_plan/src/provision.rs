//! Loan-loss provisions under Brazilian Central Bank Resolution 2682/99.
//!
//! A bank must reserve a share of each overdue credit according to its risk
//! level, and the level follows from how many days the credit is in arrears.
//! The larger the reserve already booked, the cheaper it is for the bank to
//! accept a discounted settlement: whatever it receives above the net
//! exposure is recognised as a gain when the provision is reversed.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlanError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    AA,
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl RiskLevel {
    /// Minimum risk level for a credit `days` in arrears.
    ///
    /// `AA` is never derived from arrears; banks assign it explicitly.
    pub fn from_days_overdue(days: u32) -> Self {
        match days {
            0..=14 => RiskLevel::A,
            15..=30 => RiskLevel::B,
            31..=60 => RiskLevel::C,
            61..=90 => RiskLevel::D,
            91..=120 => RiskLevel::E,
            121..=150 => RiskLevel::F,
            151..=180 => RiskLevel::G,
            _ => RiskLevel::H,
        }
    }

    /// Share of the balance that must be provisioned, in `[0, 1]`.
    pub fn provision_rate(self) -> f64 {
        match self {
            RiskLevel::AA => 0.0,
            RiskLevel::A => 0.005,
            RiskLevel::B => 0.01,
            RiskLevel::C => 0.03,
            RiskLevel::D => 0.10,
            RiskLevel::E => 0.30,
            RiskLevel::F => 0.50,
            RiskLevel::G => 0.70,
            RiskLevel::H => 1.0,
        }
    }
}

pub fn provision_amount(balance: f64, days_overdue: u32) -> f64 {
    balance * RiskLevel::from_days_overdue(days_overdue).provision_rate()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementAnalysis {
    pub creditor_name: String,
    pub outstanding_balance: f64,
    pub days_overdue: u32,
    pub risk_level: RiskLevel,
    pub provision_rate: f64,
    pub provision_amount: f64,
    /// Balance net of the provision already booked by the bank.
    pub net_exposure: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposed_offer: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_pct: Option<f64>,
    /// Offer minus net exposure; positive when accepting improves the bank's result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_gain: Option<f64>,
}

impl SettlementAnalysis {
    pub fn is_attractive_to_bank(&self) -> bool {
        self.book_gain.is_some_and(|gain| gain >= 0.0)
    }

    pub fn rounded(mut self) -> Self {
        self.outstanding_balance = models::round2(self.outstanding_balance);
        self.provision_amount = models::round2(self.provision_amount);
        self.net_exposure = models::round2(self.net_exposure);
        self.proposed_offer = self.proposed_offer.map(models::round2);
        self.discount_pct = self.discount_pct.map(models::round2);
        self.book_gain = self.book_gain.map(models::round2);
        self
    }
}

/// Estimates how the bank's books react to settling `balance` for `offer`.
pub fn analyze_settlement(
    creditor_name: &str,
    balance: f64,
    days_overdue: u32,
    offer: Option<f64>,
) -> Result<SettlementAnalysis> {
    if !balance.is_finite() || balance <= 0.0 {
        return Err(PlanError::InvalidDebt {
            creditor_name: creditor_name.to_string(),
            amount: balance,
        });
    }
    if let Some(offer) = offer {
        if !offer.is_finite() || offer < 0.0 || offer > balance {
            return Err(PlanError::InvalidOffer { offer, balance });
        }
    }

    let risk_level = RiskLevel::from_days_overdue(days_overdue);
    let provision_rate = risk_level.provision_rate();
    let provision_amount = balance * provision_rate;
    let net_exposure = balance - provision_amount;

    let discount_pct = offer.map(|o| (1.0 - o / balance) * 100.0);
    let book_gain = offer.map(|o| o - net_exposure);

    debug!(
        creditor = creditor_name,
        ?risk_level,
        provision_amount,
        "Settlement analysed"
    );

    Ok(SettlementAnalysis {
        creditor_name: creditor_name.to_string(),
        outstanding_balance: balance,
        days_overdue,
        risk_level,
        provision_rate,
        provision_amount,
        net_exposure,
        proposed_offer: offer,
        discount_pct,
        book_gain,
    })
}
