use serde::{Deserialize, Serialize};

// Tolerance when comparing a requested percentage against the policy list
const PERCENTAGE_TOLERANCE: f64 = 1e-9;

// Settings models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationPolicy {
	pub allowed_percentages: Vec<f64>,
	pub default_percentage: f64,
}

impl Default for AllocationPolicy {
	fn default() -> Self {
		Self {
			allowed_percentages: vec![30.0, 35.0],
			default_percentage: 30.0,
		}
	}
}

impl AllocationPolicy {
	/// True when `percentage` is one of the allowed income shares.
	pub fn permits(&self, percentage: f64) -> bool {
		self.allowed_percentages
			.iter()
			.any(|p| (p - percentage).abs() < PERCENTAGE_TOLERANCE)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
	pub settings_version: u32,
	#[serde(default = "default_currency")]
	pub currency: String,
	#[serde(default)]
	pub allocation: AllocationPolicy,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			settings_version: 1,
			currency: default_currency(),
			allocation: AllocationPolicy::default(),
		}
	}
}

fn default_currency() -> String {
	"BRL".to_string()
}

// Raw input entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
	#[serde(alias = "creditorName", alias = "creditor")]
	pub creditor_name: String,
	#[serde(alias = "outstandingAmount", alias = "amount")]
	pub outstanding_amount: f64,
}

impl Debt {
	pub fn new(creditor_name: impl Into<String>, outstanding_amount: f64) -> Self {
		Self {
			creditor_name: creditor_name.into(),
			outstanding_amount,
		}
	}
}

/// Contract as exported by the firm for a settlement review.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractInput {
	#[serde(alias = "creditorName", alias = "creditor")]
	pub creditor_name: String,
	#[serde(alias = "outstandingBalance")]
	pub outstanding_balance: f64,
	#[serde(default, alias = "daysOverdue")]
	pub days_overdue: u32,
	#[serde(default, alias = "proposedOffer")]
	pub proposed_offer: Option<f64>,
	#[serde(default)]
	pub loan: Option<LoanInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoanInput {
	pub principal: f64,
	pub installment: f64,
	#[serde(alias = "termMonths")]
	pub term_months: u32,
}

// Output models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseType {
	Normal,
	Adjustment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
	pub creditor_name: String,
	pub original_balance_at_phase_start: f64,
	pub base_installment: f64,
	pub surplus_received: f64,
	pub total_installment: f64,
	pub remaining_balance_after_phase: f64,
	pub is_settled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
	pub phase_number: u32,
	pub month_count: u32,
	pub phase_type: PhaseType,
	pub allocations: Vec<Allocation>,
	pub creditors_settled_in_phase: Vec<String>,
}

impl Phase {
	/// Sum of the monthly installments paid during this phase.
	pub fn monthly_total(&self) -> f64 {
		self.allocations.iter().map(|a| a.total_installment).sum()
	}

	/// Total paid over the whole phase (monthly total times month count).
	pub fn phase_total(&self) -> f64 {
		self.monthly_total() * f64::from(self.month_count)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsettledCreditor {
	pub creditor_name: String,
	pub remaining_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
	pub total_months: u32,
	pub total_paid: f64,
	pub phase_count: usize,
	pub fully_settled: bool,
	pub unsettled_creditors: Vec<UnsettledCreditor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputMetadata {
	pub generated_at: String,
	pub settings_version: u32,
	pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepaymentPlanOutput {
	pub metadata: OutputMetadata,
	pub net_income: f64,
	pub allocation_percentage: f64,
	pub disposable_budget: f64,
	pub summary: PlanSummary,
	pub phases: Vec<Phase>,
}

pub fn round2(v: f64) -> f64 {
	(v * 100.0).round() / 100.0
}

// Display rounding; the allocator itself keeps full precision
impl Allocation {
	pub fn rounded(mut self) -> Self {
		self.original_balance_at_phase_start = round2(self.original_balance_at_phase_start);
		self.base_installment = round2(self.base_installment);
		self.surplus_received = round2(self.surplus_received);
		self.total_installment = round2(self.total_installment);
		self.remaining_balance_after_phase = round2(self.remaining_balance_after_phase);
		self
	}
}
impl Phase {
	pub fn rounded(mut self) -> Self {
		self.allocations = self.allocations.into_iter().map(Allocation::rounded).collect();
		self
	}
}
impl PlanSummary {
	pub fn rounded(mut self) -> Self {
		self.total_paid = round2(self.total_paid);
		for c in self.unsettled_creditors.iter_mut() {
			c.remaining_balance = round2(c.remaining_balance);
		}
		self
	}
}

impl RepaymentPlanOutput {
	pub fn rounded(mut self) -> Self {
		self.disposable_budget = round2(self.disposable_budget);
		self.summary = self.summary.rounded();
		self.phases = self.phases.into_iter().map(Phase::rounded).collect();
		self
	}
}
