use anyhow::{Context, Result};
use clap::Parser;
use cli::{output_metadata, read_json, write_json};
use models::{ContractInput, OutputMetadata};
use repayment_plan::{
    EffectiveRate, LoanTerms, SettlementAnalysis, analyze_settlement, effective_rate,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "settlement-analysis",
    about = "Estimate each bank's regulatory provision and its incentive to accept a settlement."
)]
struct Args {
    /// JSON array of contracts with creditor_name, outstanding_balance, days_overdue,
    /// optional proposed_offer and optional loan {principal, installment, term_months}
    #[arg(short, long)]
    input: PathBuf,

    /// Path to settings.json (falls back to ./settings.json, then built-in defaults)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Output file; prints to stdout when omitted
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ContractReport {
    #[serde(flatten)]
    settlement: SettlementAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    effective_rate: Option<EffectiveRate>,
}

#[derive(Debug, Serialize)]
struct SettlementOutput {
    metadata: OutputMetadata,
    total_outstanding: f64,
    total_provisioned: f64,
    contracts: Vec<ContractReport>,
}

fn analyze_contract(contract: &ContractInput) -> Result<ContractReport> {
    let settlement = analyze_settlement(
        &contract.creditor_name,
        contract.outstanding_balance,
        contract.days_overdue,
        contract.proposed_offer,
    )
    .with_context(|| format!("analysing contract with {}", contract.creditor_name))?;

    let rate = match &contract.loan {
        Some(loan) => Some(
            effective_rate(&LoanTerms::from(loan))
                .with_context(|| format!("solving rate for {}", contract.creditor_name))?,
        ),
        None => None,
    };

    Ok(ContractReport {
        settlement: settlement.rounded(),
        effective_rate: rate,
    })
}

fn main() -> Result<()> {
    logger::init("info");
    let args = Args::parse();

    let settings = settings_loader::resolve_settings(args.settings.as_ref())?;
    let contracts: Vec<ContractInput> = read_json(&args.input)?;
    tracing::info!(contracts = contracts.len(), "Analysing settlements");

    let reports = contracts
        .iter()
        .map(analyze_contract)
        .collect::<Result<Vec<_>>>()?;

    let total_outstanding = reports
        .iter()
        .map(|r| r.settlement.outstanding_balance)
        .sum::<f64>();
    let total_provisioned = reports
        .iter()
        .map(|r| r.settlement.provision_amount)
        .sum::<f64>();
    let attractive = reports
        .iter()
        .filter(|r| r.settlement.is_attractive_to_bank())
        .count();

    let output = SettlementOutput {
        metadata: output_metadata(&settings),
        total_outstanding: models::round2(total_outstanding),
        total_provisioned: models::round2(total_provisioned),
        contracts: reports,
    };
    write_json(&output, args.out.as_deref())?;
    if let Some(out) = &args.out {
        println!(
            "Analysed {} contract(s), {} offer(s) favourable to the bank. Wrote {}",
            output.contracts.len(),
            attractive,
            out.display()
        );
    }
    Ok(())
}
