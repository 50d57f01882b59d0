use super::error::{SimulationError, SimulationOutcome};
use super::types::{LoanTerms, ScenarioParameters};

pub fn loan_terms(params: &ScenarioParameters) -> SimulationOutcome<LoanTerms> {
    if params.loan_term_years == 0 {
        return Err(SimulationError::invalid("loan_term_years", "must be > 0"));
    }

    let down_payment = params.home_price * params.down_payment_fraction;
    let principal = params.home_price - down_payment;
    let monthly_rate = params.interest_rate_annual / 12.0;
    let total_payments = params
        .loan_term_years
        .checked_mul(12)
        .ok_or_else(|| SimulationError::invalid("loan_term_years", "is too large"))?;
    let monthly_payment = amortizing_payment(principal, monthly_rate, total_payments);

    let estate_agent_fee = params.home_price * params.estate_agent_fee_fraction;
    let notary_fee = params.home_price * params.notary_fee_fraction;
    let purchase_tax = params.home_price * params.purchase_tax_fraction;
    let total_one_time_costs = estate_agent_fee + notary_fee + purchase_tax;

    Ok(LoanTerms {
        down_payment,
        principal,
        monthly_rate,
        total_payments,
        monthly_payment,
        estate_agent_fee,
        notary_fee,
        purchase_tax,
        total_one_time_costs,
        total_interest: monthly_payment * f64::from(total_payments) - principal,
    })
}

// Non-positive rates repay in equal instalments.
pub fn amortizing_payment(principal: f64, monthly_rate: f64, total_payments: u32) -> f64 {
    let n = f64::from(total_payments);
    if monthly_rate > 0.0 {
        let growth = (1.0 + monthly_rate).powf(n);
        principal * (monthly_rate * growth) / (growth - 1.0)
    } else {
        principal / n
    }
}

pub fn remaining_balance(terms: &LoanTerms, payments_made: u32) -> f64 {
    if payments_made >= terms.total_payments {
        return 0.0;
    }
    let n = f64::from(terms.total_payments);
    let m = f64::from(payments_made);
    if terms.monthly_rate > 0.0 {
        let growth_n = (1.0 + terms.monthly_rate).powf(n);
        let growth_m = (1.0 + terms.monthly_rate).powf(m);
        terms.principal * (growth_n - growth_m) / (growth_n - 1.0)
    } else {
        terms.principal * (1.0 - m / n)
    }
}

pub fn cumulative_interest(terms: &LoanTerms, payments_made: u32) -> f64 {
    if payments_made >= terms.total_payments {
        return terms.total_interest;
    }
    let principal_paid = terms.principal - remaining_balance(terms, payments_made);
    terms.monthly_payment * f64::from(payments_made) - principal_paid
}

pub fn scheduled_payment(terms: &LoanTerms, month: u32) -> f64 {
    if terms.is_active(month) {
        terms.monthly_payment
    } else {
        0.0
    }
}

pub fn escalation_factor(rate: f64, periods: u32) -> f64 {
    (1.0 + rate).powi(periods as i32)
}

pub fn annual_rent(params: &ScenarioParameters, year: u32) -> f64 {
    params.annual_rent_savings()
        * escalation_factor(params.rent_increase_rate_annual, year.saturating_sub(1))
}

pub fn monthly_rent(params: &ScenarioParameters, month: u32) -> f64 {
    let year_index = month.saturating_sub(1) / 12;
    annual_rent(params, year_index + 1) / 12.0
}
