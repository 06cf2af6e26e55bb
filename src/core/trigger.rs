use chrono::NaiveDate;
use tracing::debug;

use super::types::{AssetPosition, PayoffTrigger, TriggerKind};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TriggerState {
    Active,
    TriggeredPayoff,
    PaidOff,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerSnapshot {
    pub month: u32,
    pub date: NaiveDate,
    pub asset_value: f64,
    pub debt: f64,
    pub spot_price: f64,
    pub ratio_percent: f64,
    pub units_sold: f64,
    pub units_retained: f64,
    pub scheduled_payment: f64,
}

pub fn coverage_ratio_percent(asset_value: f64, debt: f64) -> f64 {
    if debt <= 0.0 {
        return 0.0;
    }
    asset_value / debt * 100.0
}

pub fn condition_holds(
    trigger: &PayoffTrigger,
    asset_value: f64,
    debt: f64,
    spot_price: f64,
) -> bool {
    if debt <= 0.0 || spot_price <= 0.0 || asset_value < debt {
        return false;
    }
    match trigger.kind {
        TriggerKind::PercentageOfDebt => {
            coverage_ratio_percent(asset_value, debt) >= trigger.threshold
        }
        TriggerKind::RetainedUnitFloor => asset_value - debt >= trigger.threshold,
    }
}

#[derive(Debug)]
pub struct PayoffTriggerEvaluator {
    trigger: PayoffTrigger,
    state: TriggerState,
    snapshot: Option<TriggerSnapshot>,
}

impl PayoffTriggerEvaluator {
    pub fn new(trigger: PayoffTrigger) -> Self {
        Self {
            trigger,
            state: TriggerState::Active,
            snapshot: None,
        }
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn snapshot(&self) -> Option<&TriggerSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn has_fired(&self) -> bool {
        self.state != TriggerState::Active
    }

    /// Evaluates one month. When the condition holds, sells enough units to
    /// retire `debt` and returns the snapshot. A fired evaluator never re-arms.
    pub fn evaluate(
        &mut self,
        month: u32,
        date: NaiveDate,
        position: &mut AssetPosition,
        spot_price: f64,
        debt: f64,
        scheduled_payment: f64,
    ) -> Option<TriggerSnapshot> {
        match self.state {
            TriggerState::PaidOff => return None,
            TriggerState::TriggeredPayoff => {
                self.state = TriggerState::PaidOff;
                return None;
            }
            TriggerState::Active => {}
        }

        let asset_value = position.value_at(spot_price);
        if !condition_holds(&self.trigger, asset_value, debt, spot_price) {
            return None;
        }

        let units_sold = position.sell(debt / spot_price);
        let snapshot = TriggerSnapshot {
            month,
            date,
            asset_value,
            debt,
            spot_price,
            ratio_percent: coverage_ratio_percent(asset_value, debt),
            units_sold,
            units_retained: position.units_held,
            scheduled_payment,
        };
        debug!(
            month,
            asset_value,
            debt,
            ratio_percent = snapshot.ratio_percent,
            units_retained = snapshot.units_retained,
            "payoff trigger fired"
        );
        self.state = TriggerState::TriggeredPayoff;
        self.snapshot = Some(snapshot);
        Some(snapshot)
    }
}
