use log::debug;

use super::error::{SimulationError, SimulationOutcome};
use super::loan::{
    annual_rent, cumulative_interest, escalation_factor, loan_terms, monthly_rent,
    scheduled_payment,
};
use super::types::{
    AnnualSimulationRow, CashFlowSeries, LoanTerms, MonthlySeries, PurchaseSummary,
    ScenarioParameters, SimulationResult,
};

pub fn run_simulation(params: &ScenarioParameters) -> SimulationOutcome<SimulationResult> {
    if params.simulation_years == 0 {
        return Err(SimulationError::invalid("simulation_years", "must be > 0"));
    }
    if params.simulation_years.checked_mul(12).is_none() {
        return Err(SimulationError::invalid("simulation_years", "is too large"));
    }
    let terms = loan_terms(params)?;

    let annual_rows = simulate_years(params, &terms);
    let best_index = best_row_index(&annual_rows);
    debug!(
        "optimal year {} of {} (net profit {:.2})",
        annual_rows[best_index].year, params.simulation_years, annual_rows[best_index].net_profit
    );

    Ok(SimulationResult {
        monthly: amortization_schedule(params, &terms),
        cash_flow: cash_flow_projection(params, &terms),
        summary: purchase_summary(params, &terms),
        annual_rows,
        best_index,
    })
}

pub fn simulate_years(params: &ScenarioParameters, terms: &LoanTerms) -> Vec<AnnualSimulationRow> {
    let mut rows = Vec::with_capacity(params.simulation_years as usize);
    let mut cumulative_rent_saved = 0.0;

    for year in 1..=params.simulation_years {
        cumulative_rent_saved += annual_rent(params, year);

        let current_home_value =
            params.home_price * escalation_factor(params.home_appreciation_rate_annual, year);
        let home_value_appreciation = current_home_value - params.home_price;
        let interest_paid = cumulative_interest(terms, year.saturating_mul(12));
        let costs_paid = params.annual_costs * f64::from(year);

        let net_profit = home_value_appreciation + cumulative_rent_saved
            - interest_paid
            - costs_paid
            - terms.total_one_time_costs;

        rows.push(AnnualSimulationRow {
            year,
            net_profit,
            current_home_value,
            interest_paid,
            home_value_appreciation,
            total_rent_saved: cumulative_rent_saved,
        });
    }

    rows
}

// Earliest row wins a tie.
pub fn best_row_index(rows: &[AnnualSimulationRow]) -> usize {
    let mut best = 0;
    for (idx, row) in rows.iter().enumerate().skip(1) {
        if row.net_profit > rows[best].net_profit {
            best = idx;
        }
    }
    best
}

pub fn amortization_schedule(params: &ScenarioParameters, terms: &LoanTerms) -> MonthlySeries {
    let month_count = params.simulation_months();
    let mut series = MonthlySeries::with_capacity(month_count as usize);
    let mut balance = terms.principal;

    for month in 1..=month_count {
        let (interest, principal, payment) = if terms.is_active(month) {
            let interest = balance * terms.monthly_rate;
            let principal = terms.monthly_payment - interest;
            balance -= principal;
            // Rounding can leave a tiny negative remainder on the last payment.
            if balance < 0.0 {
                balance = 0.0;
            }
            (interest, principal, terms.monthly_payment)
        } else {
            balance = 0.0;
            (0.0, 0.0, 0.0)
        };

        series.months.push(month);
        series.remaining_balance.push(balance);
        series.interest_paid.push(interest);
        series.principal_paid.push(principal);
        series.total_payment.push(payment);
        series.rent_monthly.push(monthly_rent(params, month));
    }

    series
}

pub fn cash_flow_projection(params: &ScenarioParameters, terms: &LoanTerms) -> CashFlowSeries {
    let month_count = params.simulation_months();
    let monthly_costs = params.annual_costs / 12.0;

    let mut bank_balance = Vec::with_capacity(month_count as usize + 1);
    let mut balance = -terms.initial_outlay();
    bank_balance.push(balance);

    for month in 1..=month_count {
        balance += monthly_rent(params, month) - scheduled_payment(terms, month) - monthly_costs;
        bank_balance.push(balance);
    }

    CashFlowSeries {
        months: (0..=month_count).collect(),
        bank_balance,
    }
}

fn purchase_summary(params: &ScenarioParameters, terms: &LoanTerms) -> PurchaseSummary {
    PurchaseSummary {
        home_price: params.home_price,
        down_payment: terms.down_payment,
        loan_principal: terms.principal,
        monthly_payment: terms.monthly_payment,
        total_one_time_costs: terms.total_one_time_costs,
        estate_agent_fee: terms.estate_agent_fee,
        notary_fee: terms.notary_fee,
        purchase_tax: terms.purchase_tax,
        total_interest: terms.total_interest,
        loan_term_years: params.loan_term_years,
        interest_rate_annual: params.interest_rate_annual,
    }
}
