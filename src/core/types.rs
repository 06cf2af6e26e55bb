use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDetails {
    pub current_value: f64,
    /// Annual rate as a decimal (0.04 = 4%).
    pub appreciation_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum LoanScenario {
    CashOutRefinance {
        new_loan_amount: f64,
        new_rate: f64,
        new_term_years: u32,
        #[serde(default)]
        existing_balance: f64,
    },
    CreditLine {
        balance: f64,
        rate: f64,
        term_years: u32,
    },
}

impl LoanScenario {
    pub fn terms(&self, start_date: NaiveDate) -> LoanTerms {
        match *self {
            LoanScenario::CashOutRefinance {
                new_loan_amount,
                new_rate,
                new_term_years,
                ..
            } => LoanTerms {
                principal: new_loan_amount,
                annual_rate: new_rate,
                term_months: new_term_years.saturating_mul(12),
                start_date,
            },
            LoanScenario::CreditLine {
                balance,
                rate,
                term_years,
            } => LoanTerms {
                principal: balance,
                annual_rate: rate,
                term_months: term_years.saturating_mul(12),
                start_date,
            },
        }
    }

    pub fn cash_extracted(&self) -> f64 {
        match *self {
            LoanScenario::CashOutRefinance {
                new_loan_amount,
                existing_balance,
                ..
            } => (new_loan_amount - existing_balance).max(0.0),
            LoanScenario::CreditLine { balance, .. } => balance.max(0.0),
        }
    }

    pub fn kind(&self) -> LoanKind {
        match self {
            LoanScenario::CashOutRefinance { .. } => LoanKind::CashOutRefinance,
            LoanScenario::CreditLine { .. } => LoanKind::CreditLine,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoanKind {
    CashOutRefinance,
    CreditLine,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanTerms {
    pub principal: f64,
    pub annual_rate: f64,
    pub term_months: u32,
    pub start_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyIncome {
    pub monthly_income: f64,
    pub monthly_taxes: f64,
    pub monthly_insurance: f64,
    #[serde(alias = "monthlyHOA")]
    pub monthly_hoa: f64,
}

impl PropertyIncome {
    pub fn carrying_costs(&self) -> f64 {
        self.monthly_taxes + self.monthly_insurance + self.monthly_hoa
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PhaseProfile {
    #[default]
    Smoothed,
    Theoretical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSettings {
    pub initial_annual_rate: f64,
    #[serde(default)]
    pub final_annual_rate: Option<f64>,
    pub use_cyclical_shaping: bool,
    pub max_drawdown_percent: f64,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub phase_profile: PhaseProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInvestment {
    pub investment_amount: f64,
    pub current_unit_price: f64,
    pub performance_settings: PerformanceSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerKind {
    /// Fires once asset value reaches `threshold` percent of the debt.
    PercentageOfDebt,
    /// Fires once the value left after retiring the debt reaches `threshold`.
    RetainedUnitFloor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoffTrigger {
    pub kind: TriggerKind,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionInput {
    pub property: PropertyDetails,
    pub loan: LoanScenario,
    pub property_income: PropertyIncome,
    pub asset_investment: AssetInvestment,
    pub payoff_trigger: PayoffTrigger,
    #[serde(default)]
    pub benchmark_annual_rate: Option<f64>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CyclePhase {
    Expansion,
    Correction,
    Accumulation,
    Recovery,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceTimelineEntry {
    pub month: u32,
    pub cycle_position_month: u32,
    pub phase: CyclePhase,
    pub monthly_growth_factor: f64,
    pub cycle_index: u32,
    pub cycle_annual_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub month: u32,
    pub date: NaiveDate,
    pub debt_balance: f64,
    pub payment: f64,
    pub principal_portion: f64,
    pub interest_portion: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPosition {
    pub units_held: f64,
    pub initial_unit_price: f64,
    pub initial_investment: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyProjectionEntry {
    pub month: u32,
    pub date: NaiveDate,
    pub loan_active: bool,
    pub debt_balance: f64,
    pub payment: f64,
    pub principal_portion: f64,
    pub interest_portion: f64,
    pub base_equity: f64,
    pub property_value: f64,
    pub property_appreciation: f64,
    pub housing_cost: f64,
    pub cash_flow_delta: f64,
    pub phase: CyclePhase,
    pub spot_price: f64,
    pub units_held: f64,
    pub units_sold: f64,
    pub sale_proceeds: f64,
    pub uncovered_shortfall: f64,
    pub asset_value: f64,
    pub total_value: f64,
    pub trigger_met: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub month: u32,
    pub date: NaiveDate,
    pub debt: f64,
    pub base_equity: f64,
    pub appreciation: f64,
    pub asset_value: f64,
    pub total_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerOutcome {
    pub fired: bool,
    pub trigger_month: Option<u32>,
    pub trigger_date: Option<NaiveDate>,
    pub asset_value_at_trigger: Option<f64>,
    pub debt_at_trigger: Option<f64>,
    pub price_at_trigger: Option<f64>,
    pub ratio_percent_at_trigger: Option<f64>,
    pub units_sold_at_trigger: Option<f64>,
    pub units_retained: f64,
    pub estimated_interest_saved: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnBreakdown {
    pub property_appreciation_gain: f64,
    pub net_asset_contribution: f64,
    pub interest_savings: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineComparison {
    pub annual_rate: f64,
    pub final_value: f64,
    pub outperformance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub determination_month: u32,
    pub elapsed_years: f64,
    pub initial_basis: f64,
    pub final_property_value: f64,
    pub final_asset_value: f64,
    pub final_total_value: f64,
    pub final_net_worth: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub breakdown: ReturnBreakdown,
    pub baseline: BaselineComparison,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanSummary {
    pub total_interest: f64,
    pub first_year_principal: f64,
    pub first_year_interest: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub loan_kind: LoanKind,
    pub cash_extracted: f64,
    pub monthly_payment: f64,
    pub loan_summary: LoanSummary,
    pub horizon_months: u32,
    pub initial_position: AssetPosition,
    pub initial_asset_value: f64,
    pub monthly_schedule: Vec<MonthlyProjectionEntry>,
    pub chart_series: Vec<ChartPoint>,
    pub trigger_outcome: TriggerOutcome,
    pub performance_summary: PerformanceSummary,
}
