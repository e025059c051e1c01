//! Equated monthly installment (EMI) calculations.
//!
//! All arithmetic stays in `Decimal`; displayed amounts are rounded to
//! two decimal places with half-away-from-zero rounding. Internal
//! running balances keep full precision so rounding error never
//! accumulates across schedule rows.

use chrono::{Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::ledger::error::LedgerError;

/// Days per year used for daily penalty accrual.
const DAYS_PER_YEAR: Decimal = dec!(365);
/// Months per year times 100, for converting an annual percentage rate
/// to a monthly fraction.
const MONTHLY_RATE_DIVISOR: Decimal = dec!(1200);

/// Monthly payment quote for a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmiQuote {
    /// The fixed monthly installment.
    pub monthly_payment: Decimal,
    /// Total amount paid over the full term.
    pub total_payable: Decimal,
    /// Interest portion of the total.
    pub total_interest: Decimal,
}

/// One row of a repayment schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRow {
    /// 1-based installment number.
    pub installment: u32,
    /// When this installment falls due.
    pub due_date: NaiveDate,
    /// The installment amount.
    pub payment: Decimal,
    /// Portion of the payment that reduces the principal.
    pub principal_component: Decimal,
    /// Portion of the payment that covers interest.
    pub interest_component: Decimal,
    /// Remaining principal after this installment.
    pub balance: Decimal,
}

/// Rounds a money amount to two decimal places, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Computes the EMI quote for a principal at an annual percentage rate
/// over a term in months.
///
/// Uses `emi = P * r * (1 + r)^n / ((1 + r)^n - 1)` with the monthly
/// rate `r = annual_rate / 12 / 100`. A zero rate degrades to straight
/// division of the principal over the term.
///
/// # Errors
///
/// `InvalidAmount` for a non-positive principal or negative rate,
/// `InvalidTerm` for a zero-month term.
pub fn quote(
    principal: Decimal,
    annual_rate_percent: Decimal,
    months: u32,
) -> Result<EmiQuote, LedgerError> {
    if principal <= Decimal::ZERO || annual_rate_percent < Decimal::ZERO {
        return Err(LedgerError::InvalidAmount);
    }
    if months == 0 {
        return Err(LedgerError::InvalidTerm);
    }

    let monthly_rate = annual_rate_percent / MONTHLY_RATE_DIVISOR;
    let monthly_payment = if monthly_rate.is_zero() {
        principal / Decimal::from(months)
    } else {
        let growth = compound(Decimal::ONE + monthly_rate, months);
        principal * monthly_rate * growth / (growth - Decimal::ONE)
    };

    let monthly_payment = round_money(monthly_payment);
    let total_payable = round_money(monthly_payment * Decimal::from(months));
    Ok(EmiQuote {
        monthly_payment,
        total_payable,
        total_interest: total_payable - round_money(principal),
    })
}

/// Builds the full amortization schedule starting one month after
/// `start_date`.
///
/// The final installment absorbs rounding drift so the closing balance
/// is exactly zero.
///
/// # Errors
///
/// Same conditions as [`quote`].
pub fn repayment_schedule(
    principal: Decimal,
    annual_rate_percent: Decimal,
    months: u32,
    start_date: NaiveDate,
) -> Result<Vec<ScheduleRow>, LedgerError> {
    let emi = quote(principal, annual_rate_percent, months)?;
    let monthly_rate = annual_rate_percent / MONTHLY_RATE_DIVISOR;

    let mut rows = Vec::with_capacity(months as usize);
    let mut balance = principal;
    for installment in 1..=months {
        let interest = round_money(balance * monthly_rate);
        let due_date = start_date
            .checked_add_months(Months::new(installment))
            .ok_or(LedgerError::InvalidTerm)?;

        let (payment, principal_component) = if installment == months {
            // Final installment clears whatever remains.
            (round_money(balance + interest), round_money(balance))
        } else {
            (emi.monthly_payment, round_money(emi.monthly_payment - interest))
        };

        balance = round_money(balance - principal_component);
        rows.push(ScheduleRow {
            installment,
            due_date,
            payment,
            principal_component,
            interest_component: interest,
            balance,
        });
    }

    Ok(rows)
}

/// Daily-accrued late penalty on an overdue outstanding amount.
///
/// `penalty = outstanding * (annual_rate / 100) / 365 * days`.
#[must_use]
pub fn late_penalty(
    outstanding: Decimal,
    annual_penalty_rate_percent: Decimal,
    days_overdue: u32,
) -> Decimal {
    if outstanding <= Decimal::ZERO || days_overdue == 0 {
        return Decimal::ZERO;
    }
    let daily_rate = annual_penalty_rate_percent / dec!(100) / DAYS_PER_YEAR;
    round_money(outstanding * daily_rate * Decimal::from(days_overdue))
}

/// Whole days a due date is overdue as of `today`; zero when not yet due.
#[must_use]
pub fn days_overdue(due_date: NaiveDate, today: NaiveDate) -> u32 {
    let days = (today - due_date).num_days();
    u32::try_from(days).unwrap_or(0)
}

/// `(1 + r)^n` by repeated multiplication.
fn compound(base: Decimal, exponent: u32) -> Decimal {
    let mut result = Decimal::ONE;
    for _ in 0..exponent {
        result *= base;
    }
    result
}
