mod amortization;
mod cycle;
mod engine;
mod error;
mod summary;
mod trigger;
mod types;
mod validation;
mod valuation;

pub use amortization::{build_schedule, monthly_payment, principal_paid_within, total_interest};
pub use cycle::{CYCLE_MONTHS, PhaseFactors, build_timeline, cycle_offset, most_recent_anchor};
pub use engine::project;
pub use error::{FieldError, ProjectionError};
pub use summary::{CHART_MONTHS, DEFAULT_BENCHMARK_RATE, MIN_HORIZON_MONTHS};
pub use trigger::{PayoffTriggerEvaluator, TriggerSnapshot, TriggerState};
pub use types::{
    AssetInvestment, AssetPosition, BaselineComparison, ChartPoint, CyclePhase, LoanKind,
    LoanScenario, LoanSummary, LoanTerms, MonthlyProjectionEntry, PayoffTrigger,
    PerformanceSettings, PerformanceSummary, PerformanceTimelineEntry, PhaseProfile,
    ProjectionInput, ProjectionResult, PropertyDetails, PropertyIncome, ReturnBreakdown,
    ScheduleEntry, TriggerKind, TriggerOutcome,
};
pub use validation::validate;
pub use valuation::units_to_cover;
