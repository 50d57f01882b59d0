mod engine;
mod error;
mod loan;
mod types;

pub use engine::{
    amortization_schedule, best_row_index, cash_flow_projection, run_simulation, simulate_years,
};
pub use error::{SimulationError, SimulationOutcome};
pub use loan::{amortizing_payment, loan_terms, remaining_balance};
pub use types::{
    AnnualSimulationRow, CashFlowSeries, LoanTerms, MonthlySeries, PurchaseSummary,
    ScenarioParameters, SimulationResult,
};
