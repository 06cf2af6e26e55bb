pub mod price;

use axum::{
    Router,
    extract::{Json, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    AssetInvestment, FieldError, LoanKind, LoanScenario, PayoffTrigger, PerformanceSettings,
    PhaseProfile, ProjectionError, ProjectionInput, ProjectionResult, PropertyDetails,
    PropertyIncome, TriggerKind, project,
};
use price::{PriceCache, PriceOrigin, PriceQuote, PriceSource, current_unit_price};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiLoanKind {
    #[serde(
        alias = "cashOutRefinance",
        alias = "cash_out_refinance",
        alias = "refinance"
    )]
    CashOutRefinance,
    #[serde(alias = "creditLine", alias = "credit_line", alias = "heloc")]
    CreditLine,
}

impl From<ApiLoanKind> for LoanKind {
    fn from(value: ApiLoanKind) -> Self {
        match value {
            ApiLoanKind::CashOutRefinance => LoanKind::CashOutRefinance,
            ApiLoanKind::CreditLine => LoanKind::CreditLine,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiTriggerKind {
    #[serde(
        alias = "percentageOfDebt",
        alias = "percentage-of-debt",
        alias = "percentage_of_debt"
    )]
    Percentage,
    #[serde(
        alias = "retainedUnitFloor",
        alias = "retained-unit-floor",
        alias = "retained_unit_floor",
        alias = "unitFloor",
        alias = "unit_floor"
    )]
    UnitFloor,
}

impl From<ApiTriggerKind> for TriggerKind {
    fn from(value: ApiTriggerKind) -> Self {
        match value {
            ApiTriggerKind::Percentage => TriggerKind::PercentageOfDebt,
            ApiTriggerKind::UnitFloor => TriggerKind::RetainedUnitFloor,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiPhaseProfile {
    Smoothed,
    #[serde(alias = "steep")]
    Theoretical,
}

impl From<ApiPhaseProfile> for PhaseProfile {
    fn from(value: ApiPhaseProfile) -> Self {
        match value {
            ApiPhaseProfile::Smoothed => PhaseProfile::Smoothed,
            ApiPhaseProfile::Theoretical => PhaseProfile::Theoretical,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    property_value: Option<f64>,
    appreciation_rate: Option<f64>,

    loan_kind: Option<ApiLoanKind>,
    new_loan_amount: Option<f64>,
    new_rate: Option<f64>,
    new_term_years: Option<u32>,
    existing_balance: Option<f64>,
    line_balance: Option<f64>,
    line_rate: Option<f64>,
    line_term_years: Option<u32>,

    monthly_income: Option<f64>,
    monthly_taxes: Option<f64>,
    monthly_insurance: Option<f64>,
    #[serde(alias = "monthlyHOA")]
    monthly_hoa: Option<f64>,

    investment_amount: Option<f64>,
    unit_price: Option<f64>,
    initial_rate: Option<f64>,
    final_rate: Option<f64>,
    cyclical_shaping: Option<bool>,
    max_drawdown: Option<f64>,
    start_date: Option<NaiveDate>,
    phase_profile: Option<ApiPhaseProfile>,

    trigger_kind: Option<ApiTriggerKind>,
    trigger_threshold: Option<f64>,
    benchmark_rate: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
struct ScenarioForm {
    property_value: f64,
    appreciation_rate: f64,
    loan_kind: LoanKind,
    new_loan_amount: f64,
    new_rate: f64,
    new_term_years: u32,
    existing_balance: f64,
    line_balance: f64,
    line_rate: f64,
    line_term_years: u32,
    monthly_income: f64,
    monthly_taxes: f64,
    monthly_insurance: f64,
    monthly_hoa: f64,
    investment_amount: Option<f64>,
    unit_price: Option<f64>,
    initial_rate: f64,
    final_rate: Option<f64>,
    cyclical_shaping: bool,
    max_drawdown: f64,
    /// Defaults to the request date.
    start_date: Option<NaiveDate>,
    phase_profile: PhaseProfile,
    trigger_kind: TriggerKind,
    trigger_threshold: f64,
    benchmark_rate: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub unit_price: f64,
    pub price_origin: PriceOrigin,
    #[serde(flatten)]
    pub projection: ProjectionResult,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<FieldError>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

impl ApiError {
    fn field_errors(&self) -> Vec<FieldError> {
        match self {
            ApiError::InvalidJson(_) => Vec::new(),
            ApiError::Projection(err) => err.field_errors().to_vec(),
        }
    }
}

#[derive(Clone)]
struct AppState {
    price_source: Arc<dyn PriceSource + Send + Sync>,
    price_cache: Arc<Mutex<PriceCache>>,
}

pub fn router<S>(price_source: S) -> Router
where
    S: PriceSource + Send + Sync + 'static,
{
    let state = AppState {
        price_source: Arc::new(price_source),
        price_cache: Arc::new(Mutex::new(PriceCache::default())),
    };

    Router::new()
        .route("/api/health", get(health_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route("/api/price", get(price_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server<S>(port: u16, price_source: S) -> std::io::Result<()>
where
    S: PriceSource + Send + Sync + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(price_source);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "equity payoff API listening");
    info!("local access: http://127.0.0.1:{port}/api/health");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found", Vec::new())
}

async fn price_handler(State(state): State<AppState>) -> Response {
    let quote = {
        let mut cache = state
            .price_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        current_unit_price(state.price_source.as_ref(), &mut cache, Instant::now())
    };
    json_response(StatusCode::OK, quote)
}

async fn project_get_handler(
    State(state): State<AppState>,
    Query(payload): Query<ProjectPayload>,
) -> Response {
    project_handler_impl(&state, payload)
}

async fn project_post_handler(
    State(state): State<AppState>,
    Json(payload): Json<ProjectPayload>,
) -> Response {
    project_handler_impl(&state, payload)
}

fn project_handler_impl(state: &AppState, payload: ProjectPayload) -> Response {
    let form = form_from_payload(payload);
    let quote = match form.unit_price {
        Some(price) => PriceQuote::supplied(price),
        None => {
            let mut cache = state
                .price_cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            current_unit_price(state.price_source.as_ref(), &mut cache, Instant::now())
        }
    };

    match project_form(&form, quote, Utc::now().date_naive()) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => {
            warn!(error = %err, "rejected projection request");
            error_response(StatusCode::BAD_REQUEST, &err.to_string(), err.field_errors())
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str, fields: Vec<FieldError>) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
            fields,
        },
    )
}

pub fn project_from_json<S: PriceSource + ?Sized>(
    json: &str,
    price_source: &S,
    price_cache: &mut PriceCache,
    today: NaiveDate,
) -> Result<ProjectResponse, ApiError> {
    let payload = serde_json::from_str::<ProjectPayload>(json)?;
    let form = form_from_payload(payload);
    let quote = match form.unit_price {
        Some(price) => PriceQuote::supplied(price),
        None => current_unit_price(price_source, price_cache, Instant::now()),
    };
    project_form(&form, quote, today)
}

fn project_form(
    form: &ScenarioForm,
    quote: PriceQuote,
    today: NaiveDate,
) -> Result<ProjectResponse, ApiError> {
    let input = build_input(form, quote.price, today);
    let projection = project(&input)?;
    Ok(ProjectResponse {
        unit_price: quote.price,
        price_origin: quote.origin,
        projection,
    })
}

fn form_from_payload(payload: ProjectPayload) -> ScenarioForm {
    let mut form = default_form();

    if let Some(v) = payload.property_value {
        form.property_value = v;
    }
    if let Some(v) = payload.appreciation_rate {
        form.appreciation_rate = v;
    }

    if let Some(v) = payload.loan_kind {
        form.loan_kind = v.into();
    }
    if let Some(v) = payload.new_loan_amount {
        form.new_loan_amount = v;
    }
    if let Some(v) = payload.new_rate {
        form.new_rate = v;
    }
    if let Some(v) = payload.new_term_years {
        form.new_term_years = v;
    }
    if let Some(v) = payload.existing_balance {
        form.existing_balance = v;
    }
    if let Some(v) = payload.line_balance {
        form.line_balance = v;
    }
    if let Some(v) = payload.line_rate {
        form.line_rate = v;
    }
    if let Some(v) = payload.line_term_years {
        form.line_term_years = v;
    }

    if let Some(v) = payload.monthly_income {
        form.monthly_income = v;
    }
    if let Some(v) = payload.monthly_taxes {
        form.monthly_taxes = v;
    }
    if let Some(v) = payload.monthly_insurance {
        form.monthly_insurance = v;
    }
    if let Some(v) = payload.monthly_hoa {
        form.monthly_hoa = v;
    }

    if let Some(v) = payload.investment_amount {
        form.investment_amount = Some(v);
    }
    if let Some(v) = payload.unit_price {
        form.unit_price = Some(v);
    }
    if let Some(v) = payload.initial_rate {
        form.initial_rate = v;
    }
    if let Some(v) = payload.final_rate {
        form.final_rate = Some(v);
    }
    if let Some(v) = payload.cyclical_shaping {
        form.cyclical_shaping = v;
    }
    if let Some(v) = payload.max_drawdown {
        form.max_drawdown = v;
    }
    if let Some(v) = payload.start_date {
        form.start_date = Some(v);
    }
    if let Some(v) = payload.phase_profile {
        form.phase_profile = v.into();
    }

    if let Some(v) = payload.trigger_kind {
        form.trigger_kind = v.into();
    }
    if let Some(v) = payload.trigger_threshold {
        form.trigger_threshold = v;
    }
    if let Some(v) = payload.benchmark_rate {
        form.benchmark_rate = v;
    }

    form
}

fn default_form() -> ScenarioForm {
    ScenarioForm {
        property_value: 400_000.0,
        appreciation_rate: 4.0,
        loan_kind: LoanKind::CashOutRefinance,
        new_loan_amount: 300_000.0,
        new_rate: 6.5,
        new_term_years: 30,
        existing_balance: 200_000.0,
        line_balance: 100_000.0,
        line_rate: 8.5,
        line_term_years: 20,
        monthly_income: 0.0,
        monthly_taxes: 400.0,
        monthly_insurance: 150.0,
        monthly_hoa: 0.0,
        investment_amount: None,
        unit_price: None,
        initial_rate: 40.0,
        final_rate: Some(10.0),
        cyclical_shaping: true,
        max_drawdown: 70.0,
        start_date: None,
        phase_profile: PhaseProfile::Smoothed,
        trigger_kind: TriggerKind::PercentageOfDebt,
        trigger_threshold: 200.0,
        benchmark_rate: 7.0,
    }
}

/// Range checks are left to validation so every problem is reported together.
fn build_input(form: &ScenarioForm, unit_price: f64, today: NaiveDate) -> ProjectionInput {
    let loan = match form.loan_kind {
        LoanKind::CashOutRefinance => LoanScenario::CashOutRefinance {
            new_loan_amount: form.new_loan_amount,
            new_rate: form.new_rate / 100.0,
            new_term_years: form.new_term_years,
            existing_balance: form.existing_balance,
        },
        LoanKind::CreditLine => LoanScenario::CreditLine {
            balance: form.line_balance,
            rate: form.line_rate / 100.0,
            term_years: form.line_term_years,
        },
    };

    ProjectionInput {
        property: PropertyDetails {
            current_value: form.property_value,
            appreciation_rate: form.appreciation_rate / 100.0,
        },
        loan,
        property_income: PropertyIncome {
            monthly_income: form.monthly_income,
            monthly_taxes: form.monthly_taxes,
            monthly_insurance: form.monthly_insurance,
            monthly_hoa: form.monthly_hoa,
        },
        asset_investment: AssetInvestment {
            investment_amount: form
                .investment_amount
                .unwrap_or_else(|| loan.cash_extracted()),
            current_unit_price: unit_price,
            performance_settings: PerformanceSettings {
                initial_annual_rate: form.initial_rate / 100.0,
                final_annual_rate: form.final_rate.map(|rate| rate / 100.0),
                use_cyclical_shaping: form.cyclical_shaping,
                max_drawdown_percent: form.max_drawdown,
                start_date: form.start_date.unwrap_or(today),
                phase_profile: form.phase_profile,
            },
        },
        payoff_trigger: PayoffTrigger {
            kind: form.trigger_kind,
            threshold: form.trigger_threshold,
        },
        benchmark_annual_rate: Some(form.benchmark_rate / 100.0),
    }
}
