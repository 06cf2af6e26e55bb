use tracing::debug;

use super::amortization::{build_schedule, monthly_payment, principal_paid_within, total_interest};
use super::cycle::build_timeline;
use super::error::ProjectionError;
use super::summary::{
    DEFAULT_BENCHMARK_RATE, SummaryInputs, chart_series, performance_summary, projection_horizon,
    trigger_outcome,
};
use super::trigger::PayoffTriggerEvaluator;
use super::types::{
    AssetPosition, LoanSummary, LoanTerms, MonthlyProjectionEntry, PerformanceTimelineEntry,
    ProjectionInput, ProjectionResult, ScheduleEntry,
};
use super::validation::validate;
use super::valuation::{cover_shortfall, housing_cost, next_spot_price, property_value_at};

pub fn project(input: &ProjectionInput) -> Result<ProjectionResult, ProjectionError> {
    let errors = validate(input);
    if !errors.is_empty() {
        return Err(ProjectionError::InvalidInput(errors));
    }
    Ok(run_projection(input))
}

#[derive(Debug)]
struct WalkState {
    position: AssetPosition,
    spot_price: f64,
    evaluator: PayoffTriggerEvaluator,
    retirement_logged: bool,
}

fn run_projection(input: &ProjectionInput) -> ProjectionResult {
    let asset = &input.asset_investment;
    let settings = &asset.performance_settings;
    let terms = input.loan.terms(settings.start_date);
    let horizon_months = projection_horizon(&terms);

    let debt_schedule = build_schedule(&terms, horizon_months);
    let timeline = build_timeline(settings, horizon_months);

    let initial_position = AssetPosition::open(asset.investment_amount, asset.current_unit_price);
    let mut state = WalkState {
        position: initial_position,
        spot_price: asset.current_unit_price,
        evaluator: PayoffTriggerEvaluator::new(input.payoff_trigger),
        retirement_logged: false,
    };

    let monthly_schedule = debt_schedule
        .iter()
        .zip(timeline.iter())
        .map(|(debt_row, performance)| project_month(input, &mut state, debt_row, performance))
        .collect::<Vec<_>>();

    let snapshot = state.evaluator.snapshot().copied();
    let outcome = trigger_outcome(snapshot.as_ref(), &terms, state.position.units_held);
    let summary = performance_summary(
        &monthly_schedule,
        snapshot.as_ref(),
        SummaryInputs {
            initial_property_value: input.property.current_value,
            initial_investment: asset.investment_amount,
            interest_saved: outcome.estimated_interest_saved,
            benchmark_annual_rate: input
                .benchmark_annual_rate
                .unwrap_or(DEFAULT_BENCHMARK_RATE),
        },
    );

    ProjectionResult {
        loan_kind: input.loan.kind(),
        cash_extracted: input.loan.cash_extracted(),
        monthly_payment: monthly_payment(terms.principal, terms.annual_rate, terms.term_months),
        loan_summary: loan_summary(&terms, &debt_schedule),
        horizon_months,
        initial_position,
        initial_asset_value: initial_position.initial_investment,
        chart_series: chart_series(&monthly_schedule),
        monthly_schedule,
        trigger_outcome: outcome,
        performance_summary: summary,
    }
}

fn loan_summary(terms: &LoanTerms, schedule: &[ScheduleEntry]) -> LoanSummary {
    let first_year_payments: f64 = schedule
        .iter()
        .take_while(|row| row.month <= 12)
        .map(|row| row.payment)
        .sum();
    let first_year_principal = principal_paid_within(schedule, 12);
    LoanSummary {
        total_interest: total_interest(terms),
        first_year_principal,
        first_year_interest: (first_year_payments - first_year_principal).max(0.0),
    }
}

fn project_month(
    input: &ProjectionInput,
    state: &mut WalkState,
    debt_row: &ScheduleEntry,
    performance: &PerformanceTimelineEntry,
) -> MonthlyProjectionEntry {
    let month = debt_row.month;
    state.spot_price = next_spot_price(state.spot_price, performance.monthly_growth_factor);
    let spot_price = state.spot_price;

    let trigger_sale = state.evaluator.evaluate(
        month,
        debt_row.date,
        &mut state.position,
        spot_price,
        debt_row.debt_balance,
        debt_row.payment,
    );
    let paid_off = state.evaluator.has_fired();

    let (debt_balance, payment, principal_portion, interest_portion) = if paid_off {
        (0.0, 0.0, 0.0, 0.0)
    } else {
        (
            debt_row.debt_balance,
            debt_row.payment,
            debt_row.principal_portion,
            debt_row.interest_portion,
        )
    };
    let loan_active = !paid_off && payment > 0.0;
    if !loan_active && !paid_off && !state.retirement_logged {
        debug!(month, "loan retired by scheduled amortization");
        state.retirement_logged = true;
    }

    let income = &input.property_income;
    let (units_sold_for_shortfall, sale_proceeds, uncovered_shortfall) = if loan_active {
        let sale = cover_shortfall(&mut state.position, payment, income, spot_price);
        (sale.units_sold, sale.proceeds, sale.uncovered)
    } else {
        (0.0, 0.0, 0.0)
    };
    let units_sold = units_sold_for_shortfall
        + trigger_sale.map(|snapshot| snapshot.units_sold).unwrap_or(0.0);

    let monthly_housing_cost = housing_cost(payment, income);
    let property_value = property_value_at(
        input.property.current_value,
        input.property.appreciation_rate,
        month,
    );
    let property_appreciation = property_value - input.property.current_value;
    let base_equity = input.property.current_value - debt_balance;
    let asset_value = state.position.value_at(spot_price);

    MonthlyProjectionEntry {
        month,
        date: debt_row.date,
        loan_active,
        debt_balance,
        payment,
        principal_portion,
        interest_portion,
        base_equity,
        property_value,
        property_appreciation,
        housing_cost: monthly_housing_cost,
        cash_flow_delta: income.monthly_income - monthly_housing_cost,
        phase: performance.phase,
        spot_price,
        units_held: state.position.units_held,
        units_sold,
        sale_proceeds,
        uncovered_shortfall,
        asset_value,
        total_value: base_equity + property_appreciation + asset_value,
        trigger_met: paid_off,
    }
}
