use anyhow::{Context, Result};
use clap::Parser;
use cli::{output_metadata, read_json, resolve_percentage, write_json};
use models::{Debt, RepaymentPlanOutput};
use repayment_plan::{compute_repayment_plan, disposable_budget, summarize};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "debt-repayment-plan",
    about = "Split a client's disposable income across creditors as a phased repayment plan."
)]
struct Args {
    /// JSON array of debts, e.g. [{"creditor_name": "Banco A", "outstanding_amount": 1500.0}]
    #[arg(short, long)]
    input: PathBuf,

    /// Client's monthly net income
    #[arg(short, long)]
    net_income: f64,

    /// Share of net income paid to creditors; defaults to the settings' default_percentage
    #[arg(short, long)]
    percentage: Option<f64>,

    /// Path to settings.json (falls back to ./settings.json, then built-in defaults)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Output file; prints to stdout when omitted
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Accept percentages outside the firm's allocation policy
    #[arg(long)]
    allow_any_percentage: bool,
}

fn main() -> Result<()> {
    logger::init("info");
    let args = Args::parse();

    let settings = settings_loader::resolve_settings(args.settings.as_ref())?;
    let percentage = resolve_percentage(&settings, args.percentage, args.allow_any_percentage)?;

    let debts: Vec<Debt> = read_json(&args.input)?;
    tracing::info!(
        debts = debts.len(),
        net_income = args.net_income,
        percentage,
        "Computing repayment plan"
    );

    let phases = compute_repayment_plan(&debts, args.net_income, percentage)
        .with_context(|| format!("computing plan for {}", args.input.display()))?;
    let summary = summarize(&phases);
    if !summary.fully_settled {
        tracing::warn!(
            unsettled = summary.unsettled_creditors.len(),
            "Debts remain open after {} months",
            summary.total_months
        );
    }

    let output = RepaymentPlanOutput {
        metadata: output_metadata(&settings),
        net_income: args.net_income,
        allocation_percentage: percentage,
        disposable_budget: disposable_budget(args.net_income, percentage),
        summary,
        phases,
    }
    .rounded();

    write_json(&output, args.out.as_deref())?;
    if let Some(out) = &args.out {
        println!(
            "Wrote {} phase(s) over {} month(s) to {}",
            output.summary.phase_count,
            output.summary.total_months,
            out.display()
        );
    }
    Ok(())
}
