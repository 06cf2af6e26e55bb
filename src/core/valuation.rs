use super::types::{AssetPosition, PropertyIncome};

/// Largest fall in spot price allowed within a single month.
pub const MAX_MONTHLY_PRICE_DROP: f64 = 0.20;

impl AssetPosition {
    pub fn open(initial_investment: f64, initial_unit_price: f64) -> Self {
        let units_held = if initial_unit_price > 0.0 {
            initial_investment / initial_unit_price
        } else {
            0.0
        };
        Self {
            units_held,
            initial_unit_price,
            initial_investment,
        }
    }

    pub fn value_at(&self, spot_price: f64) -> f64 {
        self.units_held * spot_price
    }

    pub fn sell(&mut self, units: f64) -> f64 {
        if units.is_nan() || units <= 0.0 {
            return 0.0;
        }
        let sold = units.min(self.units_held);
        self.units_held -= sold;
        if self.units_held < 0.0 {
            self.units_held = 0.0;
        }
        sold
    }
}

pub fn next_spot_price(previous_price: f64, growth_factor: f64) -> f64 {
    let floor = previous_price * (1.0 - MAX_MONTHLY_PRICE_DROP);
    (previous_price * growth_factor).max(floor)
}

pub fn units_to_cover(shortfall: f64, spot_price: f64, units_held: f64) -> f64 {
    if shortfall <= 0.0 || spot_price <= 0.0 || units_held <= 0.0 {
        return 0.0;
    }
    (shortfall / spot_price).min(units_held)
}

pub fn housing_cost(payment: f64, income: &PropertyIncome) -> f64 {
    payment + income.carrying_costs()
}

pub fn monthly_shortfall(payment: f64, income: &PropertyIncome) -> f64 {
    (housing_cost(payment, income) - income.monthly_income).max(0.0)
}

pub fn property_value_at(initial_value: f64, annual_rate: f64, month: u32) -> f64 {
    let elapsed = month.saturating_sub(1) as f64;
    initial_value * (1.0 + annual_rate).powf(elapsed / 12.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShortfallSale {
    pub units_sold: f64,
    pub proceeds: f64,
    pub uncovered: f64,
}

pub fn cover_shortfall(
    position: &mut AssetPosition,
    payment: f64,
    income: &PropertyIncome,
    spot_price: f64,
) -> ShortfallSale {
    let shortfall = monthly_shortfall(payment, income);
    let requested = units_to_cover(shortfall, spot_price, position.units_held);
    let units_sold = position.sell(requested);
    let proceeds = units_sold * spot_price;
    ShortfallSale {
        units_sold,
        proceeds,
        uncovered: (shortfall - proceeds).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn income(monthly_income: f64) -> PropertyIncome {
        PropertyIncome {
            monthly_income,
            monthly_taxes: 300.0,
            monthly_insurance: 100.0,
            monthly_hoa: 50.0,
        }
    }

    #[test]
    fn month_zero_position_round_trips_exactly() {
        let position = AssetPosition::open(40_000.0, 25_000.0);
        assert_eq!(position.units_held, 40_000.0 / 25_000.0);
        assert_eq!(position.value_at(25_000.0), 40_000.0);
    }

    #[test]
    fn unit_sale_is_inverse_to_spot_price() {
        assert_approx(units_to_cover(1_000.0, 25_000.0, 10.0), 0.04);
        assert_approx(units_to_cover(1_000.0, 100_000.0, 10.0), 0.01);
    }

    #[test]
    fn unit_sale_is_capped_at_holdings() {
        assert_approx(units_to_cover(1_000_000.0, 10_000.0, 2.5), 2.5);
    }

    #[test]
    fn degenerate_sales_are_no_ops() {
        assert_eq!(units_to_cover(0.0, 25_000.0, 1.0), 0.0);
        assert_eq!(units_to_cover(-5.0, 25_000.0, 1.0), 0.0);
        assert_eq!(units_to_cover(1_000.0, 0.0, 1.0), 0.0);
        assert_eq!(units_to_cover(1_000.0, -1.0, 1.0), 0.0);

        let mut position = AssetPosition::open(1_000.0, 100.0);
        assert_eq!(position.sell(f64::NAN), 0.0);
        assert_eq!(position.sell(-1.0), 0.0);
        assert_approx(position.units_held, 10.0);
    }

    #[test]
    fn price_drop_is_clamped_to_twenty_percent() {
        assert_approx(next_spot_price(100.0, 0.5), 80.0);
        assert_approx(next_spot_price(100.0, 0.9), 90.0);
        assert_approx(next_spot_price(100.0, 1.1), 110.0);
    }

    #[test]
    fn shortfall_covers_payment_and_carrying_costs_above_income() {
        // 1,500 payment + 450 carrying - 1,200 income = 750
        assert_approx(monthly_shortfall(1_500.0, &income(1_200.0)), 750.0);
        assert_approx(monthly_shortfall(1_500.0, &income(5_000.0)), 0.0);
        assert_approx(housing_cost(1_500.0, &income(0.0)), 1_950.0);
    }

    #[test]
    fn cover_shortfall_reports_uncovered_amount_when_units_run_out() {
        let mut position = AssetPosition::open(500.0, 100.0);
        let sale = cover_shortfall(&mut position, 1_500.0, &income(1_200.0), 100.0);
        assert_approx(sale.proceeds + sale.uncovered, 750.0);
        assert_approx(sale.units_sold, 5.0);
        assert_approx(sale.proceeds, 500.0);
        assert_approx(sale.uncovered, 250.0);
        assert_eq!(position.units_held, 0.0);
    }

    #[test]
    fn property_value_compounds_monthly_from_month_one() {
        assert_approx(property_value_at(200_000.0, 0.04, 1), 200_000.0);
        assert!((property_value_at(200_000.0, 0.04, 13) - 208_000.0).abs() < 1e-6);
        assert!(property_value_at(200_000.0, 0.04, 3) > property_value_at(200_000.0, 0.04, 2));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_sales_never_make_holdings_negative(
            investment in 1u32..1_000_000,
            price in 1u32..200_000,
            shortfalls in proptest::collection::vec(0u32..50_000, 1..60)
        ) {
            let mut position = AssetPosition::open(investment as f64, price as f64);
            let mut previous = position.units_held;
            for shortfall in shortfalls {
                let units = units_to_cover(shortfall as f64, price as f64, position.units_held);
                position.sell(units);
                prop_assert!(position.units_held >= 0.0);
                prop_assert!(position.units_held <= previous);
                previous = position.units_held;
            }
        }
    }
}
