use std::fmt;

use crate::core::{ScenarioParameters, SimulationResult};

pub struct Report<'a> {
    params: &'a ScenarioParameters,
    result: &'a SimulationResult,
}

impl<'a> Report<'a> {
    pub fn new(params: &'a ScenarioParameters, result: &'a SimulationResult) -> Self {
        Self { params, result }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self.params;
        let summary = &self.result.summary;
        let best = self.result.optimal_row();
        let costs_to_date = params.annual_costs * f64::from(best.year);

        writeln!(f, "Mortgage Profitability Simulation - Report")?;
        writeln!(f)?;
        writeln!(f, "Scenario:")?;
        writeln!(f, "- Home Price: {}", euros(summary.home_price))?;
        writeln!(
            f,
            "- Down Payment: {} ({})",
            euros(summary.down_payment),
            percent(params.down_payment_fraction, 0)
        )?;
        writeln!(f, "- Loan Amount: {}", euros(summary.loan_principal))?;
        writeln!(
            f,
            "- Loan Term: {} years at {} interest",
            summary.loan_term_years,
            percent(summary.interest_rate_annual, 2)
        )?;
        writeln!(f, "- Monthly Payment: {}", euros(summary.monthly_payment))?;
        writeln!(f)?;
        writeln!(f, "Initial One-Time Costs:")?;
        for (label, fraction, amount) in [
            ("Estate Agent Fee", params.estate_agent_fee_fraction, summary.estate_agent_fee),
            ("Notary Fee", params.notary_fee_fraction, summary.notary_fee),
            ("Purchase Tax", params.purchase_tax_fraction, summary.purchase_tax),
        ] {
            writeln!(
                f,
                "- {:<24} -{}",
                format!("{label} ({}):", percent(fraction, 2)),
                euros(amount)
            )?;
        }
        writeln!(f, "---------------------------------")?;
        writeln!(
            f,
            "- {:<24} -{}",
            "Total One-Time Costs:",
            euros(summary.total_one_time_costs)
        )?;
        writeln!(f)?;
        writeln!(f, "Optimal Year to Sell: Year {}", best.year)?;
        writeln!(f, "--------------------------------------------------")?;
        writeln!(
            f,
            "Maximum Net Advantage (vs. Renting): {}",
            euros(best.net_profit)
        )?;
        writeln!(f)?;
        writeln!(f, "Details for Year {}:", best.year)?;
        writeln!(
            f,
            "Home Value Appreciation   : +{} (New Value: {})",
            euros(best.home_value_appreciation),
            euros(best.current_home_value)
        )?;
        writeln!(f, "Avoided Rent Cost         : +{}", euros(best.total_rent_saved))?;
        writeln!(f, "Interest Paid (Cumulative): -{}", euros(best.interest_paid))?;
        writeln!(f, "Annual Costs (Cumulative) : -{}", euros(costs_to_date))
    }
}

pub fn render_report(params: &ScenarioParameters, result: &SimulationResult) -> String {
    Report::new(params, result).to_string()
}

pub fn euros(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}€{}", group_thousands(amount.abs()))
}

fn group_thousands(amount: f64) -> String {
    let fixed = format!("{amount:.2}");
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, digit) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{grouped}.{cents}")
}

fn percent(fraction: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, fraction * 100.0)
}
