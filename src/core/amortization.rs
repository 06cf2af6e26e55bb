use chrono::{Months, NaiveDate};

use super::types::{LoanTerms, ScheduleEntry};

/// Balances closer to zero than this are reported as exactly zero.
const BALANCE_EPSILON: f64 = 0.005;

pub fn monthly_payment(principal: f64, annual_rate: f64, term_months: u32) -> f64 {
    if term_months == 0 || principal <= 0.0 {
        return 0.0;
    }

    let n = term_months as f64;
    let r = annual_rate / 12.0;
    if r.abs() < 1e-12 {
        return principal / n;
    }

    let growth = (1.0 + r).powi(term_months as i32);
    principal * r * growth / (growth - 1.0)
}

fn remaining_balance(payment: f64, annual_rate: f64, term_months: u32, month: u32) -> f64 {
    if month == 0 || month > term_months {
        return 0.0;
    }

    let remaining = term_months - (month - 1);
    let r = annual_rate / 12.0;
    let balance = if r.abs() < 1e-12 {
        payment * remaining as f64
    } else {
        payment * (1.0 - (1.0 + r).powi(-(remaining as i32))) / r
    };

    if balance.abs() < BALANCE_EPSILON {
        0.0
    } else {
        balance
    }
}

pub fn month_date(start_date: NaiveDate, month: u32) -> NaiveDate {
    start_date
        .checked_add_months(Months::new(month))
        .unwrap_or(NaiveDate::MAX)
}

pub fn build_schedule(terms: &LoanTerms, total_months: u32) -> Vec<ScheduleEntry> {
    let payment = monthly_payment(terms.principal, terms.annual_rate, terms.term_months);
    let r = terms.annual_rate / 12.0;

    (1..=total_months)
        .map(|month| {
            let date = month_date(terms.start_date, month);
            if month > terms.term_months || payment <= 0.0 {
                return ScheduleEntry {
                    month,
                    date,
                    debt_balance: 0.0,
                    payment: 0.0,
                    principal_portion: 0.0,
                    interest_portion: 0.0,
                };
            }

            let balance = remaining_balance(payment, terms.annual_rate, terms.term_months, month);
            let interest_portion = balance * r;
            let principal_portion = (payment - interest_portion).clamp(0.0, balance);
            ScheduleEntry {
                month,
                date,
                debt_balance: balance,
                payment,
                principal_portion,
                interest_portion,
            }
        })
        .collect()
}

pub fn total_interest(terms: &LoanTerms) -> f64 {
    let payment = monthly_payment(terms.principal, terms.annual_rate, terms.term_months);
    (payment * terms.term_months as f64 - terms.principal).max(0.0)
}

pub fn principal_paid_within(schedule: &[ScheduleEntry], months: u32) -> f64 {
    schedule
        .iter()
        .take_while(|row| row.month <= months)
        .map(|row| row.principal_portion)
        .sum()
}
