use models::{Allocation, Debt, Phase, PhaseType, PlanSummary, UnsettledCreditor};
use tracing::{debug, info, warn};

use crate::error::{PlanError, Result};

/// Longest plan the firms negotiate, in months.
pub const MAX_PLAN_MONTHS: u32 = 60;

/// Balances at or below one cent count as paid off.
pub const CENT: f64 = 0.01;

// Keeps exact quotients such as 7000 / 1000 from flooring to 6
const RATIO_SLACK: f64 = 1e-9;

/// Balance still owed to one creditor while the plan is simulated.
#[derive(Debug, Clone)]
struct ActiveDebt {
    creditor_name: String,
    balance: f64,
}

/// Proportional installment of one active debt at the current balances.
#[derive(Debug, Clone)]
struct Share {
    creditor_name: String,
    balance: f64,
    base_installment: f64,
}

impl Share {
    fn months_to_settle(&self) -> f64 {
        self.balance / self.base_installment
    }

    /// The next installment already covers what is left.
    fn covers_balance(&self) -> bool {
        self.months_to_settle() <= 1.0 + RATIO_SLACK
    }
}

/// Outcome of one simulated phase: the phase itself and the debts still open.
struct Step {
    phase: Phase,
    remaining: Vec<ActiveDebt>,
}

/// Monthly amount available for creditors.
pub fn disposable_budget(net_income: f64, allocation_percentage: f64) -> f64 {
    net_income * allocation_percentage / 100.0
}

/// Builds the phased repayment schedule for `debts`.
///
/// Every month the whole disposable budget is split across the open debts in
/// proportion to their current balances. A normal phase keeps that split for
/// as many whole months as no debt gets overpaid; an adjustment phase then
/// pays the covered debts off exactly and shares the leftover equally among
/// the creditors that remain. The plan stops after [`MAX_PLAN_MONTHS`] even
/// if some balance is still open.
///
/// The caller's slice is never modified. Duplicate creditor names are kept
/// as separate debts.
pub fn compute_repayment_plan(
    debts: &[Debt],
    net_income: f64,
    allocation_percentage: f64,
) -> Result<Vec<Phase>> {
    validate_debts(debts)?;
    if debts.is_empty() {
        return Ok(Vec::new());
    }

    let budget = disposable_budget(net_income, allocation_percentage);
    if !budget.is_finite() || budget <= 0.0 {
        return Err(PlanError::InvalidBudget {
            budget,
            net_income,
            allocation_percentage,
        });
    }

    let mut active: Vec<ActiveDebt> = debts
        .iter()
        .map(|d| ActiveDebt {
            creditor_name: d.creditor_name.clone(),
            balance: d.outstanding_amount,
        })
        .collect();
    let mut phases: Vec<Phase> = Vec::new();
    let mut months_allocated: u32 = 0;

    while !active.is_empty() && months_allocated < MAX_PLAN_MONTHS {
        let mut progressed = false;

        let next_number = phases.len() as u32 + 1;
        if let Some(step) = normal_phase(&active, budget, months_allocated, next_number) {
            months_allocated += step.phase.month_count;
            active = step.remaining;
            phases.push(step.phase);
            progressed = true;
        }

        if !active.is_empty() && months_allocated < MAX_PLAN_MONTHS {
            let next_number = phases.len() as u32 + 1;
            if let Some(step) = adjustment_phase(&active, budget, next_number) {
                months_allocated += step.phase.month_count;
                active = step.remaining;
                phases.push(step.phase);
                progressed = true;
            }
        }

        // Unreachable for validated input: a skipped normal phase always
        // leaves a covered debt for the adjustment phase.
        if !progressed {
            warn!(
                open_debts = active.len(),
                months_allocated, "Repayment simulation stalled"
            );
            break;
        }
    }

    if !active.is_empty() {
        warn!(
            open_debts = active.len(),
            "Plan horizon of {} months exhausted before all debts were settled", MAX_PLAN_MONTHS
        );
    }
    info!(
        phases = phases.len(),
        months = months_allocated,
        budget,
        "Repayment plan computed"
    );

    Ok(phases)
}

/// Derives the totals shown next to a plan.
pub fn summarize(phases: &[Phase]) -> PlanSummary {
    let total_months = phases.iter().map(|p| p.month_count).sum();
    let total_paid = phases.iter().map(Phase::phase_total).sum();

    // Every open debt appears in every phase, so the last phase holds them all
    let unsettled_creditors: Vec<UnsettledCreditor> = phases
        .last()
        .map(|last| {
            last.allocations
                .iter()
                .filter(|a| !a.is_settled)
                .map(|a| UnsettledCreditor {
                    creditor_name: a.creditor_name.clone(),
                    remaining_balance: a.remaining_balance_after_phase,
                })
                .collect()
        })
        .unwrap_or_default();

    PlanSummary {
        total_months,
        total_paid,
        phase_count: phases.len(),
        fully_settled: unsettled_creditors.is_empty(),
        unsettled_creditors,
    }
}

fn validate_debts(debts: &[Debt]) -> Result<()> {
    for debt in debts {
        if !debt.outstanding_amount.is_finite() || debt.outstanding_amount <= 0.0 {
            return Err(PlanError::InvalidDebt {
                creditor_name: debt.creditor_name.clone(),
                amount: debt.outstanding_amount,
            });
        }
    }
    Ok(())
}

/// Splits `budget` across the open debts by current balance.
fn proportional_shares(active: &[ActiveDebt], budget: f64) -> Vec<Share> {
    let total_outstanding: f64 = active.iter().map(|d| d.balance).sum();
    active
        .iter()
        .map(|d| Share {
            creditor_name: d.creditor_name.clone(),
            balance: d.balance,
            base_installment: budget * (d.balance / total_outstanding),
        })
        .collect()
}

fn normal_phase(
    active: &[ActiveDebt],
    budget: f64,
    months_allocated: u32,
    phase_number: u32,
) -> Option<Step> {
    let shares = proportional_shares(active, budget);
    if shares.iter().any(Share::covers_balance) {
        return None;
    }

    let min_months = shares
        .iter()
        .map(Share::months_to_settle)
        .fold(f64::INFINITY, f64::min);
    let whole_months = (min_months + RATIO_SLACK).floor();
    if whole_months < 1.0 {
        return None;
    }

    let horizon_left = MAX_PLAN_MONTHS - months_allocated;
    let month_count = if whole_months >= f64::from(horizon_left) {
        horizon_left
    } else {
        whole_months as u32
    };

    let mut allocations = Vec::with_capacity(shares.len());
    let mut settled = Vec::new();
    let mut remaining = Vec::new();
    for share in shares {
        let left = share.balance - share.base_installment * f64::from(month_count);
        let is_settled = left <= CENT;
        let left = if is_settled { 0.0 } else { left };

        if is_settled {
            settled.push(share.creditor_name.clone());
        } else {
            remaining.push(ActiveDebt {
                creditor_name: share.creditor_name.clone(),
                balance: left,
            });
        }
        allocations.push(Allocation {
            creditor_name: share.creditor_name,
            original_balance_at_phase_start: share.balance,
            base_installment: share.base_installment,
            surplus_received: 0.0,
            total_installment: share.base_installment,
            remaining_balance_after_phase: left,
            is_settled,
        });
    }

    debug!(
        phase_number,
        month_count,
        settled = settled.len(),
        "Emitting normal phase"
    );
    Some(Step {
        phase: Phase {
            phase_number,
            month_count,
            phase_type: PhaseType::Normal,
            allocations,
            creditors_settled_in_phase: settled,
        },
        remaining,
    })
}

fn adjustment_phase(active: &[ActiveDebt], budget: f64, phase_number: u32) -> Option<Step> {
    settle_covered(proportional_shares(active, budget), phase_number)
}

/// One-month phase paying off every covered debt exactly; the amount those
/// creditors did not need is shared equally (not proportionally) by the rest.
fn settle_covered(shares: Vec<Share>, phase_number: u32) -> Option<Step> {
    let settling_count = shares.iter().filter(|s| s.covers_balance()).count();
    if settling_count == 0 {
        return None;
    }

    let surplus: f64 = shares
        .iter()
        .filter(|s| s.covers_balance())
        .map(|s| s.base_installment - s.balance)
        .sum();
    let continuing_count = shares.len() - settling_count;
    let surplus_per_debt = if continuing_count == 0 {
        0.0
    } else {
        surplus / continuing_count as f64
    };

    let mut allocations = Vec::with_capacity(shares.len());
    let mut settled = Vec::new();
    let mut remaining = Vec::new();
    for share in shares {
        if share.covers_balance() {
            settled.push(share.creditor_name.clone());
            allocations.push(Allocation {
                creditor_name: share.creditor_name,
                original_balance_at_phase_start: share.balance,
                base_installment: share.base_installment,
                surplus_received: 0.0,
                total_installment: share.balance,
                remaining_balance_after_phase: 0.0,
                is_settled: true,
            });
            continue;
        }

        let total_installment = share.base_installment + surplus_per_debt;
        let left = (share.balance - total_installment).max(0.0);
        let is_settled = left <= CENT;
        let left = if is_settled { 0.0 } else { left };
        if is_settled {
            settled.push(share.creditor_name.clone());
        } else {
            remaining.push(ActiveDebt {
                creditor_name: share.creditor_name.clone(),
                balance: left,
            });
        }
        allocations.push(Allocation {
            creditor_name: share.creditor_name,
            original_balance_at_phase_start: share.balance,
            base_installment: share.base_installment,
            surplus_received: surplus_per_debt,
            total_installment,
            remaining_balance_after_phase: left,
            is_settled,
        });
    }

    debug!(
        phase_number,
        settled = settled.len(),
        continuing = remaining.len(),
        surplus,
        "Emitting adjustment phase"
    );
    Some(Step {
        phase: Phase {
            phase_number,
            month_count: 1,
            phase_type: PhaseType::Adjustment,
            allocations,
            creditors_settled_in_phase: settled,
        },
        remaining,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const EPS: f64 = 1e-6;

    fn debts(entries: &[(&str, f64)]) -> Vec<Debt> {
        entries
            .iter()
            .map(|(name, amount)| Debt::new(*name, *amount))
            .collect()
    }

    fn allocation<'a>(phase: &'a Phase, creditor: &str) -> &'a Allocation {
        phase
            .allocations
            .iter()
            .find(|a| a.creditor_name == creditor)
            .unwrap()
    }

    fn share(name: &str, balance: f64, base_installment: f64) -> Share {
        Share {
            creditor_name: name.to_string(),
            balance,
            base_installment,
        }
    }

    fn assert_invariants(phases: &[Phase], budget: f64) {
        let total_months: u32 = phases.iter().map(|p| p.month_count).sum();
        assert!(total_months <= MAX_PLAN_MONTHS);
        assert!(phases.len() <= MAX_PLAN_MONTHS as usize);

        let mut settled: HashSet<String> = HashSet::new();
        for (i, phase) in phases.iter().enumerate() {
            assert_eq!(phase.phase_number, i as u32 + 1);
            assert!(phase.month_count >= 1);
            for a in &phase.allocations {
                assert!(a.remaining_balance_after_phase >= 0.0);
                assert!(
                    !settled.contains(&a.creditor_name),
                    "{} reappeared after settling",
                    a.creditor_name
                );
            }
            let someone_continues = phase.allocations.iter().any(|a| !a.is_settled);
            if phase.phase_type == PhaseType::Normal || someone_continues {
                assert!((phase.monthly_total() - budget).abs() < EPS);
            }
            settled.extend(phase.creditors_settled_in_phase.iter().cloned());
        }
    }

    #[test]
    fn test_single_creditor_settles_in_adjustment_phase() {
        let plan = compute_repayment_plan(&debts(&[("A", 1000.0)]), 10_000.0, 30.0).unwrap();

        assert_eq!(plan.len(), 1);
        let phase = &plan[0];
        assert_eq!(phase.phase_type, PhaseType::Adjustment);
        assert_eq!(phase.month_count, 1);
        assert_eq!(phase.creditors_settled_in_phase, vec!["A".to_string()]);

        let a = allocation(phase, "A");
        assert!((a.base_installment - 3000.0).abs() < EPS);
        assert!((a.total_installment - 1000.0).abs() < EPS);
        assert_eq!(a.surplus_received, 0.0);
        assert_eq!(a.remaining_balance_after_phase, 0.0);
        assert!(a.is_settled);
    }

    #[test]
    fn test_equal_creditors_settle_together_in_one_normal_phase() {
        // budget = 10 000 * 10% = 1 000 / month, 500 each
        let plan =
            compute_repayment_plan(&debts(&[("A", 3000.0), ("B", 3000.0)]), 10_000.0, 10.0)
                .unwrap();

        assert_eq!(plan.len(), 1);
        let phase = &plan[0];
        assert_eq!(phase.phase_type, PhaseType::Normal);
        assert_eq!(phase.month_count, 6);
        assert_eq!(phase.creditors_settled_in_phase.len(), 2);
        for name in ["A", "B"] {
            let a = allocation(phase, name);
            assert!((a.base_installment - 500.0).abs() < EPS);
            assert_eq!(a.remaining_balance_after_phase, 0.0);
            assert!(a.is_settled);
        }
        assert_invariants(&plan, 1000.0);
    }

    #[test]
    fn test_unequal_creditors_split_by_balance() {
        let plan =
            compute_repayment_plan(&debts(&[("A", 6000.0), ("B", 1000.0)]), 10_000.0, 10.0)
                .unwrap();

        // 7 000 owed at 1 000 a month: both balances reach zero after month 7
        assert_eq!(plan.len(), 1);
        let phase = &plan[0];
        assert_eq!(phase.phase_type, PhaseType::Normal);
        assert_eq!(phase.month_count, 7);

        let a = allocation(phase, "A");
        let b = allocation(phase, "B");
        assert_eq!(models::round2(a.base_installment), 857.14);
        assert_eq!(models::round2(b.base_installment), 142.86);
        assert_eq!(models::round2(a.remaining_balance_after_phase), 0.0);
        assert_eq!(models::round2(b.remaining_balance_after_phase), 0.0);
        assert!(a.is_settled && b.is_settled);
        assert_invariants(&plan, 1000.0);
    }

    #[test]
    fn test_remainder_month_becomes_adjustment_phase() {
        // 7 500 at 1 000 a month: 7 full months, then 500 left
        let plan =
            compute_repayment_plan(&debts(&[("A", 6000.0), ("B", 1500.0)]), 10_000.0, 10.0)
                .unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].phase_type, PhaseType::Normal);
        assert_eq!(plan[0].month_count, 7);
        assert!(plan[0].creditors_settled_in_phase.is_empty());
        assert_eq!(
            models::round2(allocation(&plan[0], "A").remaining_balance_after_phase),
            400.0
        );
        assert_eq!(
            models::round2(allocation(&plan[0], "B").remaining_balance_after_phase),
            100.0
        );

        let last = &plan[1];
        assert_eq!(last.phase_type, PhaseType::Adjustment);
        assert_eq!(last.month_count, 1);
        assert_eq!(models::round2(allocation(last, "A").total_installment), 400.0);
        assert_eq!(models::round2(allocation(last, "B").total_installment), 100.0);
        assert_eq!(last.creditors_settled_in_phase.len(), 2);

        let summary = summarize(&plan);
        assert_eq!(summary.total_months, 8);
        assert!((summary.total_paid - 7500.0).abs() < EPS);
        assert!(summary.fully_settled);
        assert_invariants(&plan, 1000.0);
    }

    #[test]
    fn test_balance_equal_to_budget_settles_in_one_adjustment_phase() {
        let plan = compute_repayment_plan(&debts(&[("A", 3000.0)]), 10_000.0, 30.0).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].phase_type, PhaseType::Adjustment);
        let a = allocation(&plan[0], "A");
        assert_eq!(a.surplus_received, 0.0);
        assert!((a.total_installment - 3000.0).abs() < EPS);
        assert!(a.is_settled);
    }

    #[test]
    fn test_zero_income_is_rejected() {
        let err = compute_repayment_plan(&debts(&[("A", 1000.0)]), 0.0, 30.0).unwrap_err();
        assert!(matches!(err, PlanError::InvalidBudget { .. }));
    }

    #[test]
    fn test_non_positive_debt_is_rejected() {
        let err = compute_repayment_plan(&debts(&[("A", 1000.0), ("B", 0.0)]), 5000.0, 30.0)
            .unwrap_err();
        assert_eq!(
            err,
            PlanError::InvalidDebt {
                creditor_name: "B".to_string(),
                amount: 0.0
            }
        );

        let err = compute_repayment_plan(&debts(&[("C", -10.0)]), 0.0, 30.0).unwrap_err();
        assert!(matches!(err, PlanError::InvalidDebt { .. }));
    }

    #[test]
    fn test_empty_debts_yield_empty_plan() {
        let plan = compute_repayment_plan(&[], 0.0, 30.0).unwrap();
        assert!(plan.is_empty());

        let summary = summarize(&plan);
        assert_eq!(summary.total_months, 0);
        assert!(summary.fully_settled);
    }

    #[test]
    fn test_plan_stops_at_horizon() {
        // 100 000 at 1 000 a month would need 100 months
        let plan = compute_repayment_plan(&debts(&[("A", 100_000.0)]), 10_000.0, 10.0).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].month_count, MAX_PLAN_MONTHS);
        let a = allocation(&plan[0], "A");
        assert!(!a.is_settled);
        assert!((a.remaining_balance_after_phase - 40_000.0).abs() < EPS);

        let summary = summarize(&plan);
        assert!(!summary.fully_settled);
        assert_eq!(summary.total_months, 60);
        assert_eq!(summary.unsettled_creditors.len(), 1);
        assert!((summary.unsettled_creditors[0].remaining_balance - 40_000.0).abs() < EPS);
    }

    #[test]
    fn test_horizon_reached_exactly_leaves_no_room_for_adjustment() {
        // 60 full months plus 500 left over
        let plan = compute_repayment_plan(&debts(&[("A", 60_500.0)]), 10_000.0, 10.0).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].month_count, 60);
        assert!(!summarize(&plan).fully_settled);
    }

    #[test]
    fn test_invariants_hold_for_many_creditors() {
        let input = debts(&[
            ("Banco do Brasil", 12_345.67),
            ("Itau", 3_210.99),
            ("Bradesco", 789.10),
            ("Santander", 25_000.00),
            ("Caixa", 4_444.44),
        ]);
        let plan = compute_repayment_plan(&input, 4_800.0, 35.0).unwrap();

        assert!(!plan.is_empty());
        assert_invariants(&plan, disposable_budget(4_800.0, 35.0));

        let owed: f64 = input.iter().map(|d| d.outstanding_amount).sum();
        let summary = summarize(&plan);
        assert!(summary.fully_settled);
        assert!((summary.total_paid - owed).abs() < 0.05);
    }

    #[test]
    fn test_input_is_untouched_and_output_is_repeatable() {
        let input = debts(&[("A", 6000.0), ("B", 1500.0), ("C", 333.33)]);
        let snapshot = input.clone();

        let first = compute_repayment_plan(&input, 3_000.0, 30.0).unwrap();
        let second = compute_repayment_plan(&input, 3_000.0, 30.0).unwrap();

        assert_eq!(input, snapshot);
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_creditor_names_stay_distinct() {
        let plan =
            compute_repayment_plan(&debts(&[("X", 1000.0), ("X", 2000.0)]), 2_000.0, 50.0)
                .unwrap();

        let first = &plan[0];
        assert_eq!(first.allocations.len(), 2);
        assert!(first.allocations.iter().all(|a| a.creditor_name == "X"));
        let smaller = first.allocations[0].base_installment;
        let larger = first.allocations[1].base_installment;
        assert!((smaller * 2.0 - larger).abs() < EPS);
    }

    #[test]
    fn test_surplus_is_split_equally_between_continuing_creditors() {
        let shares = vec![
            share("small", 100.0, 400.0),
            share("mid", 5_000.0, 300.0),
            share("large", 20_000.0, 300.0),
        ];

        let step = settle_covered(shares, 4).unwrap();
        let phase = &step.phase;
        assert_eq!(phase.phase_number, 4);
        assert_eq!(phase.phase_type, PhaseType::Adjustment);
        assert_eq!(phase.creditors_settled_in_phase, vec!["small".to_string()]);

        let small = allocation(phase, "small");
        assert!((small.total_installment - 100.0).abs() < EPS);

        // 300 left by "small", 150 each regardless of balance
        for name in ["mid", "large"] {
            let a = allocation(phase, name);
            assert!((a.surplus_received - 150.0).abs() < EPS);
            assert!((a.total_installment - 450.0).abs() < EPS);
        }
        assert!((phase.monthly_total() - 1000.0).abs() < EPS);
        assert_eq!(step.remaining.len(), 2);
        assert!((step.remaining[0].balance - 4_550.0).abs() < EPS);
    }

    #[test]
    fn test_no_adjustment_phase_when_nobody_is_covered() {
        let shares = vec![share("A", 5_000.0, 500.0), share("B", 5_000.0, 500.0)];
        assert!(settle_covered(shares, 1).is_none());
    }

    #[test]
    fn test_continuing_creditor_overpaid_by_surplus_is_clamped_and_settled() {
        let shares = vec![share("A", 10.0, 500.0), share("B", 600.0, 500.0)];

        let step = settle_covered(shares, 1).unwrap();
        let b = allocation(&step.phase, "B");
        assert!((b.total_installment - 990.0).abs() < EPS);
        assert_eq!(b.remaining_balance_after_phase, 0.0);
        assert!(b.is_settled);
        assert!(step.remaining.is_empty());
        assert_eq!(step.phase.creditors_settled_in_phase.len(), 2);
    }
}
