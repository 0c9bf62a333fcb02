//! Metric Deriver
//!
//! Pure functions turning a validated sample into the secondary metrics
//! published alongside the raw channels:
//!
//! ```text
//! temperature_f = T·9/5 + 32
//! dew_point_c   = T - (100 - RH) / 5
//! heat_index_f  = Rothfusz(F, RH)
//! heat_index_c  = (heat_index_f - 32)·5/9
//! ```
//!
//! The formulas are fixed. Implausible heat index values for inputs outside
//! the regression's calibrated range (cold air, very dry air) are published
//! as computed, never clamped.

use crate::{
    constants::physics::{
        DEW_POINT_RH_PER_DEGREE, HI_C1, HI_C2, HI_C3, HI_C4, HI_C5, HI_C6, HI_C7, HI_C8, HI_C9,
        HUMIDITY_MAX_PCT,
    },
    sensor::ValidatedSample,
};

/// Metrics derived from one sample, unrounded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedMetrics {
    pub temperature_f: f64,
    pub dew_point_c: f64,
    pub heat_index_f: f64,
    pub heat_index_c: f64,
}

impl DerivedMetrics {
    /// Copy with every metric rounded to 2 decimals, as published
    pub fn rounded(&self) -> Self {
        Self {
            temperature_f: round2(self.temperature_f),
            dew_point_c: round2(self.dew_point_c),
            heat_index_f: round2(self.heat_index_f),
            heat_index_c: round2(self.heat_index_c),
        }
    }
}

/// Derive all secondary metrics from a validated sample
pub fn derive(sample: &ValidatedSample) -> DerivedMetrics {
    let celsius = sample.temperature_c();
    let humidity = sample.humidity_pct();
    let temperature_f = fahrenheit(celsius);
    let heat_index_f = heat_index_f(temperature_f, humidity);

    DerivedMetrics {
        temperature_f,
        dew_point_c: dew_point_c(celsius, humidity),
        heat_index_f,
        heat_index_c: to_celsius(heat_index_f),
    }
}

/// Celsius to Fahrenheit
pub fn fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Fahrenheit to Celsius
pub fn to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Simplified dew point approximation
pub fn dew_point_c(celsius: f64, humidity_pct: f64) -> f64 {
    celsius - ((HUMIDITY_MAX_PCT - humidity_pct) / DEW_POINT_RH_PER_DEGREE)
}

/// Rothfusz heat index regression, °F in and out
pub fn heat_index_f(fahrenheit: f64, humidity_pct: f64) -> f64 {
    let f = fahrenheit;
    let h = humidity_pct;
    HI_C1
        + HI_C2 * f
        + HI_C3 * h
        + HI_C4 * f * h
        + HI_C5 * f * f
        + HI_C6 * h * h
        + HI_C7 * f * f * h
        + HI_C8 * f * h * h
        + HI_C9 * f * f * h * h
}

/// Round half away from zero to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
