//! Banded tax and social security calculations.
//!
//! Rule tables become [`core::Band`]s, grouped into [`core::BandsGroup`]s and
//! composed into a [`core::TaxModel`] that is evaluated for a single amount or
//! swept over a range of incomes with [`core::sample`].

pub mod core;
pub mod import;
