//! Compliance percentages for employees and the HR overview.

pub mod aggregator;
pub mod handlers;
