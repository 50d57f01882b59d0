use serde::Serialize;

// Rates and percentages are fractions (0.1 == 10%).
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioParameters {
    pub home_price: f64,
    pub down_payment_fraction: f64,
    pub loan_term_years: u32,
    pub interest_rate_annual: f64,
    pub home_appreciation_rate_annual: f64,
    pub monthly_rent_savings: f64,
    pub annual_costs: f64,
    pub rent_increase_rate_annual: f64,
    pub estate_agent_fee_fraction: f64,
    pub notary_fee_fraction: f64,
    pub purchase_tax_fraction: f64,
    pub simulation_years: u32,
}

impl ScenarioParameters {
    pub fn annual_rent_savings(&self) -> f64 {
        self.monthly_rent_savings * 12.0
    }

    pub fn simulation_months(&self) -> u32 {
        self.simulation_years.saturating_mul(12)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanTerms {
    pub down_payment: f64,
    pub principal: f64,
    pub monthly_rate: f64,
    pub total_payments: u32,
    pub monthly_payment: f64,
    pub estate_agent_fee: f64,
    pub notary_fee: f64,
    pub purchase_tax: f64,
    pub total_one_time_costs: f64,
    pub total_interest: f64,
}

impl LoanTerms {
    pub fn initial_outlay(&self) -> f64 {
        self.down_payment + self.total_one_time_costs
    }

    pub fn is_active(&self, month: u32) -> bool {
        month <= self.total_payments
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnnualSimulationRow {
    pub year: u32,
    pub net_profit: f64,
    pub current_home_value: f64,
    pub interest_paid: f64,
    pub home_value_appreciation: f64,
    pub total_rent_saved: f64,
}

// Entry i describes month i + 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlySeries {
    pub months: Vec<u32>,
    pub remaining_balance: Vec<f64>,
    pub interest_paid: Vec<f64>,
    pub principal_paid: Vec<f64>,
    pub total_payment: Vec<f64>,
    pub rent_monthly: Vec<f64>,
}

impl MonthlySeries {
    pub(crate) fn with_capacity(months: usize) -> Self {
        Self {
            months: Vec::with_capacity(months),
            remaining_balance: Vec::with_capacity(months),
            interest_paid: Vec::with_capacity(months),
            principal_paid: Vec::with_capacity(months),
            total_payment: Vec::with_capacity(months),
            rent_monthly: Vec::with_capacity(months),
        }
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}

// Entry i is month i; entry 0 is the position right after purchase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CashFlowSeries {
    pub months: Vec<u32>,
    pub bank_balance: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PurchaseSummary {
    pub home_price: f64,
    pub down_payment: f64,
    pub loan_principal: f64,
    pub monthly_payment: f64,
    pub total_one_time_costs: f64,
    pub estate_agent_fee: f64,
    pub notary_fee: f64,
    pub purchase_tax: f64,
    pub total_interest: f64,
    pub loan_term_years: u32,
    pub interest_rate_annual: f64,
}

#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub annual_rows: Vec<AnnualSimulationRow>,
    pub best_index: usize,
    pub monthly: MonthlySeries,
    pub cash_flow: CashFlowSeries,
    pub summary: PurchaseSummary,
}

impl SimulationResult {
    pub fn optimal_row(&self) -> &AnnualSimulationRow {
        &self.annual_rows[self.best_index]
    }

    pub fn optimal_year(&self) -> u32 {
        self.optimal_row().year
    }

    pub fn max_profit(&self) -> f64 {
        self.optimal_row().net_profit
    }
}
