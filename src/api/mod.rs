use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Parser;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::ffi::OsString;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    AnnualSimulationRow, PurchaseSummary, ScenarioParameters, SimulationError,
    SimulationOutcome, SimulationResult, run_simulation,
};
use crate::report::render_report;

const DEFAULT_HOME_PRICE: f64 = 195_000.0;
const DEFAULT_DOWN_PAYMENT_PERCENTAGE: f64 = 10.0;
const DEFAULT_LOAN_TERM_YEARS: u32 = 10;
const DEFAULT_INTEREST_RATE: f64 = 3.25;
const DEFAULT_APPRECIATION_RATE: f64 = 2.0;
const DEFAULT_MONTHLY_RENT_SAVINGS: f64 = 1_000.0;
const DEFAULT_ANNUAL_COSTS: f64 = 1_500.0;
const DEFAULT_RENT_INCREASE_RATE: f64 = 2.0;
const DEFAULT_AGENT_FEE_PERCENTAGE: f64 = 3.57;
const DEFAULT_NOTARY_FEE_PERCENTAGE: f64 = 2.0;
const DEFAULT_PURCHASE_TAX_PERCENTAGE: f64 = 6.0;
const DEFAULT_SIMULATION_YEARS: u32 = 15;

const MAX_YEARS: u32 = 200;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum NumericField {
    Number(f64),
    Text(String),
}

impl NumericField {
    fn to_f64(&self, field: &str) -> SimulationOutcome<f64> {
        let value = match self {
            NumericField::Number(v) => *v,
            NumericField::Text(raw) => raw.trim().parse::<f64>().map_err(|_| {
                SimulationError::invalid(field, format!("must be a number, got {raw:?}"))
            })?,
        };
        if !value.is_finite() {
            return Err(SimulationError::invalid(field, "must be a finite number"));
        }
        Ok(value)
    }

    fn to_whole_years(&self, field: &str) -> SimulationOutcome<u32> {
        let value = self.to_f64(field)?;
        if value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
            return Err(SimulationError::invalid(
                field,
                "must be a whole number of years",
            ));
        }
        Ok(value as u32)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SimulatePayload {
    home_price: Option<NumericField>,
    down_payment_percentage: Option<NumericField>,
    loan_term_years: Option<NumericField>,
    interest_rate_annual: Option<NumericField>,
    home_appreciation_rate_annual: Option<NumericField>,
    rental_savings_annual: Option<NumericField>,
    annual_costs: Option<NumericField>,
    rental_increase_rate_annual: Option<NumericField>,
    estate_agent_fee_percentage: Option<NumericField>,
    notary_fee_percentage: Option<NumericField>,
    purchase_tax_percentage: Option<NumericField>,
    simulation_years: Option<NumericField>,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rentbuy",
    about = "Buy-vs-rent mortgage simulator: optimal year to sell, amortization and cash flow",
    after_help = "Run `rentbuy serve [port]` to start the HTTP API instead."
)]
struct Cli {
    #[arg(long, default_value_t = DEFAULT_HOME_PRICE)]
    home_price: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_DOWN_PAYMENT_PERCENTAGE,
        help = "Down payment in percent of the home price"
    )]
    down_payment_percentage: f64,
    #[arg(long, default_value_t = DEFAULT_LOAN_TERM_YEARS)]
    loan_term_years: u32,
    #[arg(
        long,
        default_value_t = DEFAULT_INTEREST_RATE,
        allow_negative_numbers = true,
        help = "Annual mortgage interest rate in percent, e.g. 3.25"
    )]
    interest_rate_annual: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_APPRECIATION_RATE,
        allow_negative_numbers = true,
        help = "Expected annual home value appreciation in percent"
    )]
    home_appreciation_rate_annual: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_MONTHLY_RENT_SAVINGS,
        help = "Rent avoided per month in the first year"
    )]
    rental_savings_annual: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_ANNUAL_COSTS,
        help = "Recurring yearly ownership costs (property tax, insurance, upkeep)"
    )]
    annual_costs: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_RENT_INCREASE_RATE,
        allow_negative_numbers = true,
        help = "Expected annual rent increase in percent"
    )]
    rental_increase_rate_annual: f64,
    #[arg(long, default_value_t = DEFAULT_AGENT_FEE_PERCENTAGE)]
    estate_agent_fee_percentage: f64,
    #[arg(long, default_value_t = DEFAULT_NOTARY_FEE_PERCENTAGE)]
    notary_fee_percentage: f64,
    #[arg(long, default_value_t = DEFAULT_PURCHASE_TAX_PERCENTAGE)]
    purchase_tax_percentage: f64,
    #[arg(long, default_value_t = DEFAULT_SIMULATION_YEARS, help = "Years to simulate")]
    simulation_years: u32,
    #[arg(long, help = "Print the full JSON result instead of the text report")]
    json: bool,
}

#[derive(Debug, Serialize)]
struct MonthlyData {
    months: Vec<u32>,
    remaining_balance: Vec<f64>,
    interest_paid: Vec<f64>,
    principal_paid: Vec<f64>,
    total_payment: Vec<f64>,
    rent_monthly: Vec<f64>,
    bank_balance: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct SimulateResponse {
    simulation_results: Vec<AnnualSimulationRow>,
    optimal_year: u32,
    max_profit: f64,
    monthly_data: MonthlyData,
    summary: PurchaseSummary,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_parameters(cli: &Cli) -> SimulationOutcome<ScenarioParameters> {
    for (name, value) in [
        ("home_price", cli.home_price),
        ("down_payment_percentage", cli.down_payment_percentage),
        ("interest_rate_annual", cli.interest_rate_annual),
        ("home_appreciation_rate_annual", cli.home_appreciation_rate_annual),
        ("rental_savings_annual", cli.rental_savings_annual),
        ("annual_costs", cli.annual_costs),
        ("rental_increase_rate_annual", cli.rental_increase_rate_annual),
        ("estate_agent_fee_percentage", cli.estate_agent_fee_percentage),
        ("notary_fee_percentage", cli.notary_fee_percentage),
        ("purchase_tax_percentage", cli.purchase_tax_percentage),
    ] {
        if !value.is_finite() {
            return Err(SimulationError::invalid(name, "must be a finite number"));
        }
    }

    for (name, years) in [
        ("loan_term_years", cli.loan_term_years),
        ("simulation_years", cli.simulation_years),
    ] {
        if years == 0 {
            return Err(SimulationError::invalid(name, "must be > 0"));
        }
        if years > MAX_YEARS {
            return Err(SimulationError::invalid(
                name,
                format!("must be <= {MAX_YEARS}"),
            ));
        }
    }

    Ok(ScenarioParameters {
        home_price: cli.home_price,
        down_payment_fraction: cli.down_payment_percentage / 100.0,
        loan_term_years: cli.loan_term_years,
        interest_rate_annual: cli.interest_rate_annual / 100.0,
        home_appreciation_rate_annual: cli.home_appreciation_rate_annual / 100.0,
        monthly_rent_savings: cli.rental_savings_annual,
        annual_costs: cli.annual_costs,
        rent_increase_rate_annual: cli.rental_increase_rate_annual / 100.0,
        estate_agent_fee_fraction: cli.estate_agent_fee_percentage / 100.0,
        notary_fee_fraction: cli.notary_fee_percentage / 100.0,
        purchase_tax_fraction: cli.purchase_tax_percentage / 100.0,
        simulation_years: cli.simulation_years,
    })
}

pub fn run_cli<I, T>(args: I) -> Result<String, Box<dyn Error>>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::try_parse_from(args)?;
    let params = build_parameters(&cli)?;
    let result = run_simulation(&params)?;

    if cli.json {
        let json = serde_json::to_string_pretty(&build_simulate_response(&result))?;
        Ok(format!("{json}\n"))
    } else {
        Ok(render_report(&params, &result))
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/simulate", post(simulate_post_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!("rentbuy HTTP API listening on http://{addr}");
    info!("Local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let outcome = scenario_from_payload(payload).and_then(|params| {
        debug!(
            "simulating {} years against a {}-year loan",
            params.simulation_years, params.loan_term_years
        );
        run_simulation(&params)
    });

    match outcome {
        Ok(result) => json_response(StatusCode::OK, build_simulate_response(&result)),
        Err(err) => {
            warn!("rejected simulation request: {err}");
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn scenario_from_json(json: &str) -> SimulationOutcome<ScenarioParameters> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| SimulationError::invalid("payload", format!("is not valid JSON: {e}")))?;
    scenario_from_payload(payload)
}

fn required<'a>(
    value: &'a Option<NumericField>,
    field: &str,
) -> SimulationOutcome<&'a NumericField> {
    value
        .as_ref()
        .ok_or_else(|| SimulationError::invalid(field, "is required"))
}

fn scenario_from_payload(payload: SimulatePayload) -> SimulationOutcome<ScenarioParameters> {
    let number = |value: &Option<NumericField>, field: &str| required(value, field)?.to_f64(field);
    let years =
        |value: &Option<NumericField>, field: &str| required(value, field)?.to_whole_years(field);

    let cli = Cli {
        home_price: number(&payload.home_price, "home_price")?,
        down_payment_percentage: number(
            &payload.down_payment_percentage,
            "down_payment_percentage",
        )?,
        loan_term_years: years(&payload.loan_term_years, "loan_term_years")?,
        interest_rate_annual: number(&payload.interest_rate_annual, "interest_rate_annual")?,
        home_appreciation_rate_annual: number(
            &payload.home_appreciation_rate_annual,
            "home_appreciation_rate_annual",
        )?,
        rental_savings_annual: number(&payload.rental_savings_annual, "rental_savings_annual")?,
        annual_costs: number(&payload.annual_costs, "annual_costs")?,
        rental_increase_rate_annual: number(
            &payload.rental_increase_rate_annual,
            "rental_increase_rate_annual",
        )?,
        estate_agent_fee_percentage: number(
            &payload.estate_agent_fee_percentage,
            "estate_agent_fee_percentage",
        )?,
        notary_fee_percentage: number(&payload.notary_fee_percentage, "notary_fee_percentage")?,
        purchase_tax_percentage: number(
            &payload.purchase_tax_percentage,
            "purchase_tax_percentage",
        )?,
        simulation_years: years(&payload.simulation_years, "simulation_years")?,
        json: false,
    };

    build_parameters(&cli)
}

fn build_simulate_response(result: &SimulationResult) -> SimulateResponse {
    let monthly = &result.monthly;
    SimulateResponse {
        simulation_results: result.annual_rows.clone(),
        optimal_year: result.optimal_year(),
        max_profit: result.max_profit(),
        monthly_data: MonthlyData {
            months: monthly.months.clone(),
            remaining_balance: monthly.remaining_balance.clone(),
            interest_paid: monthly.interest_paid.clone(),
            principal_paid: monthly.principal_paid.clone(),
            total_payment: monthly.total_payment.clone(),
            rent_monthly: monthly.rent_monthly.clone(),
            bank_balance: result.cash_flow.bank_balance.clone(),
        },
        summary: result.summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        Cli::parse_from(["rentbuy"])
    }

    fn full_payload() -> serde_json::Value {
        serde_json::json!({
            "home_price": 250000,
            "down_payment_percentage": 20,
            "loan_term_years": 25,
            "interest_rate_annual": 4.5,
            "home_appreciation_rate_annual": 1.5,
            "rental_savings_annual": 1200,
            "annual_costs": 2000,
            "rental_increase_rate_annual": 3,
            "estate_agent_fee_percentage": 3,
            "notary_fee_percentage": 1.5,
            "purchase_tax_percentage": 5,
            "simulation_years": 30
        })
    }

    fn payload_with(field: &str, value: serde_json::Value) -> String {
        let mut payload = full_payload();
        payload[field] = value;
        payload.to_string()
    }

    #[test]
    fn build_parameters_converts_percentages_to_fractions() {
        let params = build_parameters(&sample_cli()).expect("valid parameters");

        assert_approx(params.home_price, 195_000.0);
        assert_approx(params.down_payment_fraction, 0.10);
        assert_eq!(params.loan_term_years, 10);
        assert_approx(params.interest_rate_annual, 0.0325);
        assert_approx(params.home_appreciation_rate_annual, 0.02);
        assert_approx(params.monthly_rent_savings, 1_000.0);
        assert_approx(params.annual_rent_savings(), 12_000.0);
        assert_approx(params.annual_costs, 1_500.0);
        assert_approx(params.rent_increase_rate_annual, 0.02);
        assert_approx(params.estate_agent_fee_fraction, 0.0357);
        assert_approx(params.notary_fee_fraction, 0.02);
        assert_approx(params.purchase_tax_fraction, 0.06);
        assert_eq!(params.simulation_years, 15);
    }

    #[test]
    fn build_parameters_rejects_zero_years() {
        let mut cli = sample_cli();
        cli.loan_term_years = 0;
        let err = build_parameters(&cli).expect_err("must reject zero term");
        assert_eq!(err.field(), "loan_term_years");

        let mut cli = sample_cli();
        cli.simulation_years = 0;
        let err = build_parameters(&cli).expect_err("must reject zero horizon");
        assert_eq!(err.field(), "simulation_years");
    }

    #[test]
    fn build_parameters_rejects_oversized_horizon() {
        let mut cli = sample_cli();
        cli.simulation_years = MAX_YEARS + 1;
        let err = build_parameters(&cli).expect_err("must reject huge horizon");
        assert_eq!(err.field(), "simulation_years");
    }

    #[test]
    fn build_parameters_accepts_negative_rates() {
        let mut cli = sample_cli();
        cli.home_appreciation_rate_annual = -3.0;
        cli.interest_rate_annual = -1.0;

        let params = build_parameters(&cli).expect("negative rates are accepted");
        assert_approx(params.home_appreciation_rate_annual, -0.03);
        assert_approx(params.interest_rate_annual, -0.01);
    }

    #[test]
    fn scenario_from_json_parses_request_keys() {
        let params = scenario_from_json(&full_payload().to_string()).expect("json should parse");

        assert_approx(params.home_price, 250_000.0);
        assert_approx(params.down_payment_fraction, 0.20);
        assert_eq!(params.loan_term_years, 25);
        assert_approx(params.interest_rate_annual, 0.045);
        assert_approx(params.home_appreciation_rate_annual, 0.015);
        assert_approx(params.monthly_rent_savings, 1_200.0);
        assert_approx(params.annual_costs, 2_000.0);
        assert_approx(params.rent_increase_rate_annual, 0.03);
        assert_approx(params.estate_agent_fee_fraction, 0.03);
        assert_approx(params.notary_fee_fraction, 0.015);
        assert_approx(params.purchase_tax_fraction, 0.05);
        assert_eq!(params.simulation_years, 30);
    }

    #[test]
    fn scenario_from_json_coerces_numeric_strings() {
        let mut payload = full_payload();
        payload["home_price"] = "300000".into();
        payload["loan_term_years"] = "20".into();
        payload["interest_rate_annual"] = " 2.5 ".into();
        let params =
            scenario_from_json(&payload.to_string()).expect("numeric strings are accepted");

        assert_approx(params.home_price, 300_000.0);
        assert_eq!(params.loan_term_years, 20);
        assert_approx(params.interest_rate_annual, 0.025);
    }

    #[test]
    fn scenario_from_json_rejects_missing_fields() {
        let mut payload = full_payload();
        payload
            .as_object_mut()
            .expect("payload is an object")
            .remove("home_price");
        let err = scenario_from_json(&payload.to_string()).expect_err("missing field must fail");
        assert_eq!(err.field(), "home_price");
        assert!(err.to_string().contains("is required"));

        let err = scenario_from_json(&payload_with("simulation_years", serde_json::Value::Null))
            .expect_err("null field must fail");
        assert_eq!(err.field(), "simulation_years");

        let err = scenario_from_json("{}").expect_err("empty payload must fail");
        assert_eq!(err.field(), "home_price");
    }

    #[test]
    fn scenario_from_json_rejects_non_numeric_text() {
        let err = scenario_from_json(&payload_with("annual_costs", "lots".into()))
            .expect_err("must reject non-numeric text");
        assert_eq!(err.field(), "annual_costs");
        assert!(err.to_string().contains("must be a number"));
    }

    #[test]
    fn scenario_from_json_rejects_invalid_year_counts() {
        let invalid_terms: [serde_json::Value; 3] = [(-5).into(), 2.5.into(), 0.into()];
        for value in invalid_terms {
            let json = payload_with("loan_term_years", value);
            let err = scenario_from_json(&json).expect_err("must reject invalid term");
            assert_eq!(err.field(), "loan_term_years", "payload {json}");
        }

        let err = scenario_from_json(&payload_with("simulation_years", "0".into()))
            .expect_err("must reject zero horizon");
        assert_eq!(err.field(), "simulation_years");
    }

    #[test]
    fn query_string_payload_is_coerced_like_json() {
        let uri: axum::http::Uri = "http://localhost/api/simulate?home_price=250000\
            &down_payment_percentage=20&loan_term_years=25&interest_rate_annual=4.5\
            &home_appreciation_rate_annual=-1.5&rental_savings_annual=1200&annual_costs=2000\
            &rental_increase_rate_annual=3&estate_agent_fee_percentage=3\
            &notary_fee_percentage=1.5&purchase_tax_percentage=5&simulation_years=30"
            .parse()
            .expect("valid uri");
        let Query(payload) = Query::<SimulatePayload>::try_from_uri(&uri).expect("query parses");
        let params = scenario_from_payload(payload).expect("query values are coerced");

        assert_approx(params.home_price, 250_000.0);
        assert_eq!(params.loan_term_years, 25);
        assert_approx(params.interest_rate_annual, 0.045);
        assert_approx(params.home_appreciation_rate_annual, -0.015);
        assert_eq!(params.simulation_years, 30);

        let uri: axum::http::Uri = "http://localhost/api/simulate?home_price=250000"
            .parse()
            .expect("valid uri");
        let Query(payload) = Query::<SimulatePayload>::try_from_uri(&uri).expect("query parses");
        let err = scenario_from_payload(payload).expect_err("partial query must fail");
        assert_eq!(err.field(), "down_payment_percentage");
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let params = build_parameters(&sample_cli()).expect("valid parameters");
        let result = run_simulation(&params).expect("valid scenario");
        let response = build_simulate_response(&result);

        assert_eq!(response.simulation_results.len(), 15);
        assert_eq!(response.optimal_year, 15);
        assert_eq!(response.monthly_data.months.len(), 180);
        assert_eq!(response.monthly_data.rent_monthly.len(), 180);
        assert_eq!(response.monthly_data.bank_balance.len(), 181);

        let json = serde_json::to_string(&response).expect("response should serialize");
        for key in [
            "\"simulation_results\"",
            "\"optimal_year\"",
            "\"max_profit\"",
            "\"monthly_data\"",
            "\"remaining_balance\"",
            "\"bank_balance\"",
            "\"summary\"",
            "\"monthly_payment\"",
            "\"total_one_time_costs\"",
            "\"current_home_value\"",
            "\"total_rent_saved\"",
        ] {
            assert!(json.contains(key), "missing {key}");
        }
    }

    #[test]
    fn run_cli_prints_report_or_json() {
        let report = run_cli(["rentbuy"]).expect("default scenario runs");
        assert!(report.contains("Optimal Year to Sell: Year 15"));

        let json = run_cli(["rentbuy", "--json", "--simulation-years", "5"])
            .expect("json output runs");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["simulation_results"].as_array().map(Vec::len), Some(5));
        assert_eq!(value["summary"]["loan_term_years"], 10);
    }

    #[test]
    fn run_cli_rejects_zero_horizon() {
        let err = run_cli(["rentbuy", "--simulation-years", "0"])
            .expect_err("zero horizon must fail");
        assert!(err.to_string().contains("simulation_years"));
    }

    #[test]
    fn run_cli_accepts_negative_interest_rate() {
        let report = run_cli(["rentbuy", "--interest-rate-annual", "-1"])
            .expect("negative rate is a valid flag value");
        assert!(report.contains("at -1.00% interest"));
    }

    #[test]
    fn run_cli_returns_unknown_flags_as_errors() {
        let err = run_cli(["rentbuy", "--bogus-flag"]).expect_err("unknown flag must fail");
        let clap_err = err
            .downcast_ref::<clap::Error>()
            .expect("parse failures surface as clap errors");
        assert_eq!(clap_err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
