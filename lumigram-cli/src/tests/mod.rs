//! Shared test harness modules for the Lumigram CLI.
#![expect(
    clippy::panic,
    reason = "Tests assert panic branches to surface unexpected CLI outcomes"
)]

use super::*;

mod check_in_steps;
mod helpers;
mod status_unit;
