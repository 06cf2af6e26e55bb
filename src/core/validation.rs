use super::error::FieldError;
use super::types::{LoanScenario, ProjectionInput, TriggerKind};

/// Percentage triggers above this are treated as typos.
pub const MAX_PERCENTAGE_THRESHOLD: f64 = 1_000.0;

fn require_positive(errors: &mut Vec<FieldError>, field: &str, value: f64) {
    if !value.is_finite() || value <= 0.0 {
        errors.push(FieldError::new(field, "must be > 0"));
    }
}

fn require_non_negative(errors: &mut Vec<FieldError>, field: &str, value: f64) {
    if !value.is_finite() || value < 0.0 {
        errors.push(FieldError::new(field, "must be >= 0"));
    }
}

fn require_growth_rate(errors: &mut Vec<FieldError>, field: &str, value: f64) {
    if !value.is_finite() || value <= -1.0 {
        errors.push(FieldError::new(field, "must be a finite rate above -100%"));
    }
}

fn require_loan_rate(errors: &mut Vec<FieldError>, field: &str, value: f64) {
    if !value.is_finite() || !(0.0..1.0).contains(&value) {
        errors.push(FieldError::new(field, "must be between 0 and 1"));
    }
}

fn require_term(errors: &mut Vec<FieldError>, field: &str, years: u32) {
    if years == 0 || years > 50 {
        errors.push(FieldError::new(field, "must be between 1 and 50 years"));
    }
}

pub fn validate(input: &ProjectionInput) -> Vec<FieldError> {
    let mut errors = Vec::new();

    require_positive(&mut errors, "property.currentValue", input.property.current_value);
    require_growth_rate(
        &mut errors,
        "property.appreciationRate",
        input.property.appreciation_rate,
    );

    match input.loan {
        LoanScenario::CashOutRefinance {
            new_loan_amount,
            new_rate,
            new_term_years,
            existing_balance,
        } => {
            require_positive(&mut errors, "loan.newLoanAmount", new_loan_amount);
            require_loan_rate(&mut errors, "loan.newRate", new_rate);
            require_term(&mut errors, "loan.newTermYears", new_term_years);
            require_non_negative(&mut errors, "loan.existingBalance", existing_balance);
        }
        LoanScenario::CreditLine {
            balance,
            rate,
            term_years,
        } => {
            require_positive(&mut errors, "loan.balance", balance);
            require_loan_rate(&mut errors, "loan.rate", rate);
            require_term(&mut errors, "loan.termYears", term_years);
        }
    }

    let income = &input.property_income;
    require_non_negative(&mut errors, "propertyIncome.monthlyIncome", income.monthly_income);
    require_non_negative(&mut errors, "propertyIncome.monthlyTaxes", income.monthly_taxes);
    require_non_negative(
        &mut errors,
        "propertyIncome.monthlyInsurance",
        income.monthly_insurance,
    );
    require_non_negative(&mut errors, "propertyIncome.monthlyHoa", income.monthly_hoa);

    let asset = &input.asset_investment;
    require_positive(
        &mut errors,
        "assetInvestment.investmentAmount",
        asset.investment_amount,
    );
    require_positive(
        &mut errors,
        "assetInvestment.currentUnitPrice",
        asset.current_unit_price,
    );

    let settings = &asset.performance_settings;
    require_growth_rate(
        &mut errors,
        "assetInvestment.performanceSettings.initialAnnualRate",
        settings.initial_annual_rate,
    );
    if let Some(final_rate) = settings.final_annual_rate {
        require_growth_rate(
            &mut errors,
            "assetInvestment.performanceSettings.finalAnnualRate",
            final_rate,
        );
    }
    if !settings.max_drawdown_percent.is_finite()
        || !(0.0..100.0).contains(&settings.max_drawdown_percent)
    {
        errors.push(FieldError::new(
            "assetInvestment.performanceSettings.maxDrawdownPercent",
            "must be between 0 and 100 (exclusive)",
        ));
    }

    let trigger = &input.payoff_trigger;
    require_positive(&mut errors, "payoffTrigger.threshold", trigger.threshold);
    if trigger.kind == TriggerKind::PercentageOfDebt && trigger.threshold > MAX_PERCENTAGE_THRESHOLD
    {
        errors.push(FieldError::new(
            "payoffTrigger.threshold",
            "percentage threshold must be <= 1000",
        ));
    }

    if let Some(rate) = input.benchmark_annual_rate {
        require_growth_rate(&mut errors, "benchmarkAnnualRate", rate);
    }

    errors
}
