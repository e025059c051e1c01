//! Repayment schedule and penalty calculations.

pub mod emi;

pub use emi::{
    EmiQuote, ScheduleRow, days_overdue, late_penalty, quote, repayment_schedule, round_money,
};
