use chrono::{Datelike, Months, NaiveDate};

use super::types::{CyclePhase, PerformanceSettings, PerformanceTimelineEntry, PhaseProfile};

pub const CYCLE_MONTHS: u32 = 48;

const EXPANSION_MONTHS: u32 = 18;
const CORRECTION_MONTHS: u32 = 12;
const ACCUMULATION_MONTHS: u32 = 6;
const RECOVERY_MONTHS: u32 = 6;

const EXPANSION_GAIN_SHARE: f64 = 0.65;
const RECOVERY_GAIN_SHARE: f64 = 0.35;

/// Interpolated cycle rates never fall below this annual rate.
pub const MIN_CYCLE_RATE: f64 = 0.01;

const ANCHOR_EVENTS: [(i32, u32, u32); 4] = [
    (2012, 11, 28),
    (2016, 7, 9),
    (2020, 5, 11),
    (2024, 4, 20),
];

impl CyclePhase {
    pub fn at_position(position: u32) -> Self {
        let position = position % CYCLE_MONTHS;
        if position < EXPANSION_MONTHS {
            CyclePhase::Expansion
        } else if position < EXPANSION_MONTHS + CORRECTION_MONTHS {
            CyclePhase::Correction
        } else if position < EXPANSION_MONTHS + CORRECTION_MONTHS + ACCUMULATION_MONTHS {
            CyclePhase::Accumulation
        } else {
            CyclePhase::Recovery
        }
    }

    fn smoothing_multiplier(self) -> f64 {
        match self {
            CyclePhase::Expansion => 1.02,
            CyclePhase::Correction => 0.95,
            CyclePhase::Accumulation => 1.0,
            CyclePhase::Recovery => 1.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseFactors {
    pub expansion: f64,
    pub correction: f64,
    pub accumulation: f64,
    pub recovery: f64,
}

impl PhaseFactors {
    /// Steep factors: the Correction phase compounds to the full drawdown and
    /// Expansion/Recovery split the remaining gain 65/35, so a whole cycle
    /// compounds to exactly `(1 + annual_rate)^4`.
    pub fn theoretical(annual_rate: f64, max_drawdown_percent: f64) -> Self {
        let retained = (1.0 - max_drawdown_percent / 100.0).clamp(1e-6, 1.0);
        let cycle_growth = (1.0 + annual_rate).powi(4);
        let net_gain = cycle_growth / retained;

        Self {
            expansion: net_gain.powf(EXPANSION_GAIN_SHARE / EXPANSION_MONTHS as f64),
            correction: retained.powf(1.0 / CORRECTION_MONTHS as f64),
            accumulation: 1.0,
            recovery: net_gain.powf(RECOVERY_GAIN_SHARE / RECOVERY_MONTHS as f64),
        }
    }

    pub fn smoothed(annual_rate: f64) -> Self {
        let baseline = baseline_monthly_factor(annual_rate);
        Self {
            expansion: baseline * CyclePhase::Expansion.smoothing_multiplier(),
            correction: baseline * CyclePhase::Correction.smoothing_multiplier(),
            accumulation: baseline * CyclePhase::Accumulation.smoothing_multiplier(),
            recovery: baseline * CyclePhase::Recovery.smoothing_multiplier(),
        }
    }

    pub fn flat(annual_rate: f64) -> Self {
        let baseline = baseline_monthly_factor(annual_rate);
        Self {
            expansion: baseline,
            correction: baseline,
            accumulation: baseline,
            recovery: baseline,
        }
    }

    pub fn factor(&self, phase: CyclePhase) -> f64 {
        match phase {
            CyclePhase::Expansion => self.expansion,
            CyclePhase::Correction => self.correction,
            CyclePhase::Accumulation => self.accumulation,
            CyclePhase::Recovery => self.recovery,
        }
    }
}

fn baseline_monthly_factor(annual_rate: f64) -> f64 {
    (1.0 + annual_rate).powf(1.0 / 12.0)
}

fn known_anchors() -> Vec<NaiveDate> {
    ANCHOR_EVENTS
        .iter()
        .filter_map(|&(year, month, day)| NaiveDate::from_ymd_opt(year, month, day))
        .collect()
}

pub fn most_recent_anchor(date: NaiveDate) -> NaiveDate {
    let anchors = known_anchors();
    let cycle = Months::new(CYCLE_MONTHS);

    match anchors.iter().rev().find(|anchor| **anchor <= date) {
        Some(&latest) => {
            let mut anchor = latest;
            if Some(&latest) == anchors.last() {
                while let Some(next) = anchor.checked_add_months(cycle) {
                    if next > date {
                        break;
                    }
                    anchor = next;
                }
            }
            anchor
        }
        None => {
            let mut anchor = anchors.first().copied().unwrap_or(date);
            while anchor > date {
                match anchor.checked_sub_months(cycle) {
                    Some(previous) => anchor = previous,
                    None => return date,
                }
            }
            anchor
        }
    }
}

/// Whole months elapsed from `from` to `to` (`from <= to`).
fn whole_months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    let months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    let months = if to.day() < from.day() {
        months - 1
    } else {
        months
    };
    months.max(0) as u32
}

pub fn cycle_offset(date: NaiveDate) -> u32 {
    whole_months_between(most_recent_anchor(date), date) % CYCLE_MONTHS
}

pub fn cycle_rate(
    initial_rate: f64,
    final_rate: Option<f64>,
    cycle_index: u32,
    total_cycles: u32,
) -> f64 {
    let rate = match final_rate {
        Some(final_rate) if total_cycles > 1 => {
            let progress = (cycle_index.saturating_sub(1)) as f64 / (total_cycles - 1) as f64;
            initial_rate + (final_rate - initial_rate) * progress.clamp(0.0, 1.0)
        }
        _ => initial_rate,
    };
    rate.max(MIN_CYCLE_RATE)
}

fn phase_factors_for(settings: &PerformanceSettings, annual_rate: f64) -> PhaseFactors {
    if !settings.use_cyclical_shaping {
        return PhaseFactors::flat(annual_rate);
    }
    match settings.phase_profile {
        PhaseProfile::Smoothed => PhaseFactors::smoothed(annual_rate),
        PhaseProfile::Theoretical => {
            PhaseFactors::theoretical(annual_rate, settings.max_drawdown_percent)
        }
    }
}

pub fn build_timeline(
    settings: &PerformanceSettings,
    horizon_months: u32,
) -> Vec<PerformanceTimelineEntry> {
    if horizon_months == 0 {
        return Vec::new();
    }

    let offset = cycle_offset(settings.start_date);
    let total_cycles = (offset + horizon_months - 1) / CYCLE_MONTHS + 1;
    let factors_by_cycle = (1..=total_cycles)
        .map(|cycle_index| {
            let rate = cycle_rate(
                settings.initial_annual_rate,
                settings.final_annual_rate,
                cycle_index,
                total_cycles,
            );
            (rate, phase_factors_for(settings, rate))
        })
        .collect::<Vec<_>>();

    (1..=horizon_months)
        .map(|month| {
            let absolute = offset + month - 1;
            let cycle_position_month = absolute % CYCLE_MONTHS;
            let cycle_index = absolute / CYCLE_MONTHS + 1;
            let phase = CyclePhase::at_position(cycle_position_month);
            let (cycle_annual_rate, factors) = factors_by_cycle[(cycle_index - 1) as usize];
            PerformanceTimelineEntry {
                month,
                cycle_position_month,
                phase,
                monthly_growth_factor: factors.factor(phase),
                cycle_index,
                cycle_annual_rate,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn cycle_growth(factors: &PhaseFactors) -> f64 {
        [
            (CyclePhase::Expansion, EXPANSION_MONTHS),
            (CyclePhase::Correction, CORRECTION_MONTHS),
            (CyclePhase::Accumulation, ACCUMULATION_MONTHS),
            (CyclePhase::Recovery, RECOVERY_MONTHS),
        ]
        .into_iter()
        .map(|(phase, months)| factors.factor(phase).powi(months as i32))
        .product()
    }

    fn settings() -> PerformanceSettings {
        PerformanceSettings {
            initial_annual_rate: 0.30,
            final_annual_rate: None,
            use_cyclical_shaping: true,
            max_drawdown_percent: 70.0,
            start_date: date(2024, 4, 20),
            phase_profile: PhaseProfile::Smoothed,
        }
    }

    #[test]
    fn seventy_percent_drawdown_compounds_over_correction_phase() {
        let factors = PhaseFactors::theoretical(0.30, 70.0);
        // 0.3^(1/12) = 0.9045, i.e. about -9.5% a month
        assert_approx_tol(factors.correction - 1.0, -0.0955, 0.001);
        let cumulative = factors.correction.powi(12) - 1.0;
        assert_approx_tol(cumulative, -0.70, 1e-9);
        assert_eq!(factors.accumulation, 1.0);
    }

    #[test]
    fn theoretical_cycle_compounds_to_target_rate() {
        let factors = PhaseFactors::theoretical(0.25, 60.0);
        assert_approx_tol(cycle_growth(&factors), 1.25_f64.powi(4), 1e-9);
        assert!(factors.expansion > 1.0);
        assert!(factors.recovery > factors.expansion);
    }

    #[test]
    fn expansion_and_recovery_split_net_gain_sixty_five_thirty_five() {
        let factors = PhaseFactors::theoretical(0.20, 50.0);
        let net_gain = 1.2_f64.powi(4) / 0.5;
        let expansion_gain = factors.expansion.powi(18).ln();
        let recovery_gain = factors.recovery.powi(6).ln();
        assert_approx_tol(expansion_gain / net_gain.ln(), 0.65, 1e-9);
        assert_approx_tol(recovery_gain / net_gain.ln(), 0.35, 1e-9);
    }

    #[test]
    fn smoothed_factors_stay_close_to_baseline() {
        let factors = PhaseFactors::smoothed(0.12);
        let baseline = 1.12_f64.powf(1.0 / 12.0);
        assert_approx_tol(factors.expansion / baseline, 1.02, 1e-12);
        assert_approx_tol(factors.correction / baseline, 0.95, 1e-12);
        assert_approx_tol(factors.accumulation / baseline, 1.0, 1e-12);
        assert_approx_tol(factors.recovery / baseline, 1.05, 1e-12);
        assert!(factors.correction < factors.accumulation);
        assert!(factors.accumulation < factors.expansion);
    }

    #[test]
    fn flat_profile_compounds_to_annual_rate_over_twelve_months() {
        let factors = PhaseFactors::flat(0.10);
        assert_approx_tol(factors.expansion.powi(12), 1.10, 1e-12);
        assert_eq!(factors.expansion, factors.correction);
    }

    #[test]
    fn phase_boundaries_follow_eighteen_twelve_six_six() {
        assert_eq!(CyclePhase::at_position(0), CyclePhase::Expansion);
        assert_eq!(CyclePhase::at_position(17), CyclePhase::Expansion);
        assert_eq!(CyclePhase::at_position(18), CyclePhase::Correction);
        assert_eq!(CyclePhase::at_position(29), CyclePhase::Correction);
        assert_eq!(CyclePhase::at_position(30), CyclePhase::Accumulation);
        assert_eq!(CyclePhase::at_position(35), CyclePhase::Accumulation);
        assert_eq!(CyclePhase::at_position(36), CyclePhase::Recovery);
        assert_eq!(CyclePhase::at_position(47), CyclePhase::Recovery);
        assert_eq!(CyclePhase::at_position(48), CyclePhase::Expansion);
    }

    #[test]
    fn anchor_lookup_uses_known_and_extrapolated_events() {
        assert_eq!(most_recent_anchor(date(2024, 4, 20)), date(2024, 4, 20));
        assert_eq!(most_recent_anchor(date(2024, 4, 19)), date(2020, 5, 11));
        assert_eq!(most_recent_anchor(date(2018, 1, 1)), date(2016, 7, 9));
        assert_eq!(most_recent_anchor(date(2029, 1, 1)), date(2028, 4, 20));
        assert_eq!(most_recent_anchor(date(2010, 1, 1)), date(2008, 11, 28));
    }

    #[test]
    fn offset_counts_whole_months_since_anchor() {
        assert_eq!(cycle_offset(date(2024, 4, 20)), 0);
        assert_eq!(cycle_offset(date(2024, 10, 19)), 5);
        assert_eq!(cycle_offset(date(2024, 10, 20)), 6);
        assert_eq!(cycle_offset(date(2025, 1, 1)), 8);
    }

    #[test]
    fn timeline_starts_mid_cycle_from_start_offset() {
        let mut settings = settings();
        settings.start_date = date(2025, 1, 1);
        let timeline = build_timeline(&settings, 240);
        assert_eq!(timeline.len(), 240);
        assert_eq!(timeline[0].cycle_position_month, 8);
        assert_eq!(timeline[0].cycle_index, 1);
        assert_eq!(timeline[0].phase, CyclePhase::Expansion);
        // month 11 sits at position 18, the first Correction month
        assert_eq!(timeline[10].cycle_position_month, 18);
        assert_eq!(timeline[10].phase, CyclePhase::Correction);
        // month 41 wraps into cycle 2
        assert_eq!(timeline[40].cycle_position_month, 0);
        assert_eq!(timeline[40].cycle_index, 2);
    }

    #[test]
    fn cycle_rates_decay_linearly_to_final_rate() {
        assert_approx_tol(cycle_rate(0.40, Some(0.10), 1, 4), 0.40, 1e-12);
        assert_approx_tol(cycle_rate(0.40, Some(0.10), 2, 4), 0.30, 1e-12);
        assert_approx_tol(cycle_rate(0.40, Some(0.10), 4, 4), 0.10, 1e-12);
        assert_approx_tol(cycle_rate(0.40, None, 4, 4), 0.40, 1e-12);
        assert_approx_tol(cycle_rate(0.40, Some(0.10), 1, 1), 0.40, 1e-12);
    }

    #[test]
    fn cycle_rate_is_floored_at_minimum() {
        assert_approx_tol(cycle_rate(0.20, Some(-0.50), 3, 3), MIN_CYCLE_RATE, 1e-12);
        assert_approx_tol(cycle_rate(-0.30, None, 1, 1), MIN_CYCLE_RATE, 1e-12);
    }

    #[test]
    fn timeline_reports_interpolated_rate_for_last_cycle() {
        let mut settings = settings();
        settings.final_annual_rate = Some(0.10);
        let timeline = build_timeline(&settings, 240);
        let last = timeline[timeline.len() - 1];
        assert_eq!(last.cycle_index, 5);
        assert_approx_tol(last.cycle_annual_rate, 0.10, 1e-12);
        assert_approx_tol(timeline[0].cycle_annual_rate, 0.30, 1e-12);
    }

    #[test]
    fn disabling_shaping_gives_flat_growth() {
        let mut settings = settings();
        settings.use_cyclical_shaping = false;
        let timeline = build_timeline(&settings, 60);
        let expected = 1.30_f64.powf(1.0 / 12.0);
        for entry in &timeline {
            assert_approx_tol(entry.monthly_growth_factor, expected, 1e-12);
        }
    }

    #[test]
    fn theoretical_profile_drives_correction_months() {
        let mut settings = settings();
        settings.phase_profile = PhaseProfile::Theoretical;
        let timeline = build_timeline(&settings, 48);
        let correction = timeline
            .iter()
            .filter(|entry| entry.phase == CyclePhase::Correction)
            .map(|entry| entry.monthly_growth_factor)
            .product::<f64>();
        assert_approx_tol(correction, 0.30, 1e-9);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_timeline_is_finite_and_positive(
            rate_bp in -2_000i32..15_000,
            final_bp in -2_000i32..15_000,
            drawdown in 0u32..95,
            days_after_anchor in 0i64..6_000,
            horizon in 1u32..400,
            theoretical in proptest::bool::ANY
        ) {
            let settings = PerformanceSettings {
                initial_annual_rate: rate_bp as f64 / 10_000.0,
                final_annual_rate: Some(final_bp as f64 / 10_000.0),
                use_cyclical_shaping: true,
                max_drawdown_percent: drawdown as f64,
                start_date: date(2012, 11, 28) + chrono::Duration::days(days_after_anchor),
                phase_profile: if theoretical {
                    PhaseProfile::Theoretical
                } else {
                    PhaseProfile::Smoothed
                },
            };
            let timeline = build_timeline(&settings, horizon);
            prop_assert!(timeline.len() == horizon as usize);
            for entry in &timeline {
                prop_assert!(entry.monthly_growth_factor.is_finite());
                prop_assert!(entry.monthly_growth_factor > 0.0);
                prop_assert!(entry.cycle_position_month < CYCLE_MONTHS);
                prop_assert!(entry.cycle_annual_rate >= MIN_CYCLE_RATE);
            }
        }
    }
}
