use super::trigger::TriggerSnapshot;
use super::types::{
    BaselineComparison, ChartPoint, LoanTerms, MonthlyProjectionEntry, PerformanceSummary,
    ReturnBreakdown, TriggerOutcome,
};

pub const MIN_HORIZON_MONTHS: u32 = 240;
pub const CHART_MONTHS: usize = 240;
pub const DEFAULT_BENCHMARK_RATE: f64 = 0.07;

/// Share of each skipped payment counted as interest saved.
const INTEREST_SHARE_OF_PAYMENT: f64 = 0.7;

pub fn projection_horizon(terms: &LoanTerms) -> u32 {
    terms.term_months.max(MIN_HORIZON_MONTHS)
}

pub fn chart_series(schedule: &[MonthlyProjectionEntry]) -> Vec<ChartPoint> {
    schedule
        .iter()
        .take(CHART_MONTHS)
        .map(|row| ChartPoint {
            month: row.month,
            date: row.date,
            debt: row.debt_balance,
            base_equity: row.base_equity,
            appreciation: row.property_appreciation,
            asset_value: row.asset_value,
            total_value: row.total_value,
        })
        .collect()
}

/// Rough estimate: 70% of each payment no longer made, over the payments
/// remaining from the trigger month to the end of the term.
pub fn estimated_interest_saved(payment: f64, term_months: u32, trigger_month: u32) -> f64 {
    let remaining = (term_months + 1).saturating_sub(trigger_month.max(1));
    INTEREST_SHARE_OF_PAYMENT * payment * remaining as f64
}

pub fn trigger_outcome(
    snapshot: Option<&TriggerSnapshot>,
    terms: &LoanTerms,
    final_units: f64,
) -> TriggerOutcome {
    match snapshot {
        Some(snapshot) => TriggerOutcome {
            fired: true,
            trigger_month: Some(snapshot.month),
            trigger_date: Some(snapshot.date),
            asset_value_at_trigger: Some(snapshot.asset_value),
            debt_at_trigger: Some(snapshot.debt),
            price_at_trigger: Some(snapshot.spot_price),
            ratio_percent_at_trigger: Some(snapshot.ratio_percent),
            units_sold_at_trigger: Some(snapshot.units_sold),
            units_retained: snapshot.units_retained,
            estimated_interest_saved: estimated_interest_saved(
                snapshot.scheduled_payment,
                terms.term_months,
                snapshot.month,
            ),
        },
        None => TriggerOutcome {
            fired: false,
            trigger_month: None,
            trigger_date: None,
            asset_value_at_trigger: None,
            debt_at_trigger: None,
            price_at_trigger: None,
            ratio_percent_at_trigger: None,
            units_sold_at_trigger: None,
            units_retained: final_units,
            estimated_interest_saved: 0.0,
        },
    }
}

pub fn annualized_return(total_return: f64, years: f64) -> f64 {
    if years <= 0.0 {
        return 0.0;
    }
    let growth = 1.0 + total_return;
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(1.0 / years) - 1.0
}

#[derive(Debug, Clone, Copy)]
pub struct SummaryInputs {
    pub initial_property_value: f64,
    pub initial_investment: f64,
    pub interest_saved: f64,
    pub benchmark_annual_rate: f64,
}

pub fn performance_summary(
    schedule: &[MonthlyProjectionEntry],
    snapshot: Option<&TriggerSnapshot>,
    inputs: SummaryInputs,
) -> PerformanceSummary {
    let initial_basis = inputs.initial_property_value + inputs.initial_investment;

    let determination = match snapshot {
        Some(snapshot) => schedule
            .iter()
            .find(|row| row.month == snapshot.month)
            .or(schedule.last()),
        None => schedule.last(),
    };

    let (determination_month, final_property_value, final_asset_value, final_debt) =
        match (determination, snapshot) {
            (Some(row), Some(snapshot)) => (
                row.month,
                row.property_value,
                snapshot.asset_value,
                snapshot.debt,
            ),
            (Some(row), None) => (
                row.month,
                row.property_value,
                row.asset_value,
                row.debt_balance,
            ),
            (None, _) => (0, inputs.initial_property_value, inputs.initial_investment, 0.0),
        };

    let elapsed_years = determination_month as f64 / 12.0;
    let final_total_value = final_property_value + final_asset_value;
    let total_return = if initial_basis > 0.0 {
        (final_total_value - initial_basis) / initial_basis
    } else {
        0.0
    };

    let baseline_final =
        initial_basis * (1.0 + inputs.benchmark_annual_rate).powf(elapsed_years);

    PerformanceSummary {
        determination_month,
        elapsed_years,
        initial_basis,
        final_property_value,
        final_asset_value,
        final_total_value,
        final_net_worth: final_total_value - final_debt,
        total_return,
        annualized_return: annualized_return(total_return, elapsed_years),
        breakdown: ReturnBreakdown {
            property_appreciation_gain: final_property_value - inputs.initial_property_value,
            net_asset_contribution: final_asset_value - inputs.initial_investment,
            interest_savings: inputs.interest_saved,
        },
        baseline: BaselineComparison {
            annual_rate: inputs.benchmark_annual_rate,
            final_value: baseline_final,
            outperformance: final_total_value - baseline_final,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CyclePhase;
    use chrono::NaiveDate;

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2031, 1, 1).expect("valid date")
    }

    fn row(month: u32, property_value: f64, asset_value: f64, debt: f64) -> MonthlyProjectionEntry {
        MonthlyProjectionEntry {
            month,
            date: date(),
            loan_active: debt > 0.0,
            debt_balance: debt,
            payment: 0.0,
            principal_portion: 0.0,
            interest_portion: 0.0,
            base_equity: 200_000.0 - debt,
            property_value,
            property_appreciation: property_value - 200_000.0,
            housing_cost: 0.0,
            cash_flow_delta: 0.0,
            phase: CyclePhase::Expansion,
            spot_price: 50_000.0,
            units_held: asset_value / 50_000.0,
            units_sold: 0.0,
            sale_proceeds: 0.0,
            uncovered_shortfall: 0.0,
            asset_value,
            total_value: 200_000.0 - debt + property_value - 200_000.0 + asset_value,
            trigger_met: false,
        }
    }

    fn inputs() -> SummaryInputs {
        SummaryInputs {
            initial_property_value: 200_000.0,
            initial_investment: 40_000.0,
            interest_saved: 0.0,
            benchmark_annual_rate: DEFAULT_BENCHMARK_RATE,
        }
    }

    #[test]
    fn interest_saved_uses_seventy_percent_of_remaining_payments() {
        // 120 payments remain from month 241 of a 360-month term
        assert_approx_tol(estimated_interest_saved(1_000.0, 360, 241), 84_000.0, 1e-9);
        assert_eq!(estimated_interest_saved(1_000.0, 360, 400), 0.0);
    }

    #[test]
    fn annualized_return_is_geometric() {
        assert_approx_tol(annualized_return(1.0, 10.0), 2.0_f64.powf(0.1) - 1.0, 1e-12);
        assert_eq!(annualized_return(0.5, 0.0), 0.0);
        assert_eq!(annualized_return(-1.5, 3.0), -1.0);
    }

    #[test]
    fn summary_without_trigger_uses_last_row() {
        let schedule = vec![
            row(1, 200_000.0, 40_000.0, 190_000.0),
            row(240, 300_000.0, 500_000.0, 50_000.0),
        ];
        let summary = performance_summary(&schedule, None, inputs());
        assert_eq!(summary.determination_month, 240);
        assert_approx_tol(summary.elapsed_years, 20.0, 1e-12);
        assert_approx_tol(summary.final_total_value, 800_000.0, 1e-9);
        assert_approx_tol(summary.final_net_worth, 750_000.0, 1e-9);
        assert_approx_tol(summary.total_return, 560_000.0 / 240_000.0, 1e-12);
        assert_approx_tol(summary.breakdown.property_appreciation_gain, 100_000.0, 1e-9);
        assert_approx_tol(summary.breakdown.net_asset_contribution, 460_000.0, 1e-9);
        assert_approx_tol(
            summary.baseline.final_value,
            240_000.0 * 1.07_f64.powf(20.0),
            1e-6,
        );
    }

    #[test]
    fn summary_with_trigger_reports_pre_sale_values() {
        let schedule = vec![
            row(1, 200_000.0, 40_000.0, 190_000.0),
            // post-sale row: the position already paid the 89,568 debt
            row(84, 250_000.0, 100_344.0, 0.0),
            row(240, 300_000.0, 900_000.0, 0.0),
        ];
        let snapshot = TriggerSnapshot {
            month: 84,
            date: date(),
            asset_value: 189_912.0,
            debt: 89_568.0,
            spot_price: 46_578.0,
            ratio_percent: 212.03,
            units_sold: 1.923,
            units_retained: 2.1543,
            scheduled_payment: 1_139.15,
        };

        let summary = performance_summary(&schedule, Some(&snapshot), inputs());
        assert_eq!(summary.determination_month, 84);
        assert_approx_tol(summary.final_asset_value, 189_912.0, 1e-9);
        assert_approx_tol(summary.final_total_value, 439_912.0, 1e-9);
        assert_approx_tol(summary.final_net_worth, 350_344.0, 1e-9);
        assert_approx_tol(summary.elapsed_years, 7.0, 1e-12);
    }

    #[test]
    fn trigger_outcome_without_snapshot_reports_final_units() {
        let terms = LoanTerms {
            principal: 100_000.0,
            annual_rate: 0.05,
            term_months: 360,
            start_date: date(),
        };
        let outcome = trigger_outcome(None, &terms, 1.25);
        assert!(!outcome.fired);
        assert_eq!(outcome.trigger_month, None);
        assert_approx_tol(outcome.units_retained, 1.25, 1e-12);
        assert_eq!(outcome.estimated_interest_saved, 0.0);
    }

    #[test]
    fn horizon_is_at_least_twenty_years() {
        let mut terms = LoanTerms {
            principal: 100_000.0,
            annual_rate: 0.05,
            term_months: 120,
            start_date: date(),
        };
        assert_eq!(projection_horizon(&terms), 240);
        terms.term_months = 360;
        assert_eq!(projection_horizon(&terms), 360);
    }
}
