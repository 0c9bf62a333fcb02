//! Physical Constants for climalog
//!
//! Unit conversions and the fixed coefficients of the derived metrics.

// ===== VALID RANGES =====

/// Lowest physically meaningful relative humidity (%).
pub const HUMIDITY_MIN_PCT: f64 = 0.0;

/// Highest physically meaningful relative humidity (%).
///
/// Supersaturation readings above 100% are treated as sensor error codes.
pub const HUMIDITY_MAX_PCT: f64 = 100.0;

// ===== UNIT CONVERSIONS =====

/// Standard gravity (m/s²), used to report acceleration in g.
///
/// Source: CGPM 1901, ISO 80000-3
pub const STANDARD_GRAVITY_M_PER_S2: f64 = 9.806_65;

/// Kilopascal to hectopascal (hPa == mbar).
pub const HPA_PER_KPA: f64 = 10.0;

/// Linux IIO reports temperature in milli-degrees Celsius.
pub const IIO_MILLI_SCALE: f64 = 1000.0;

// ===== DEW POINT APPROXIMATION =====

/// Humidity points per degree in the simplified dew point rule
/// `dew_point = T - (100 - RH) / 5`.
///
/// Source: Lawrence (2005), valid for RH > 50%
pub const DEW_POINT_RH_PER_DEGREE: f64 = 5.0;

// ===== HEAT INDEX (ROTHFUSZ REGRESSION) =====
//
// HI = c1 + c2·F + c3·H + c4·F·H + c5·F² + c6·H² + c7·F²·H + c8·F·H² + c9·F²·H²
//
// Source: NWS Technical Attachment SR 90-23 (Rothfusz, 1990)

/// Rothfusz constant term.
pub const HI_C1: f64 = -42.379;
/// Rothfusz coefficient for F.
pub const HI_C2: f64 = 2.049_015_23;
/// Rothfusz coefficient for H.
pub const HI_C3: f64 = 10.143_331_27;
/// Rothfusz coefficient for F·H.
pub const HI_C4: f64 = -0.224_755_41;
/// Rothfusz coefficient for F².
pub const HI_C5: f64 = -6.837_83e-3;
/// Rothfusz coefficient for H².
pub const HI_C6: f64 = -5.481_717e-2;
/// Rothfusz coefficient for F²·H.
pub const HI_C7: f64 = 1.228_74e-3;
/// Rothfusz coefficient for F·H².
pub const HI_C8: f64 = 8.528_2e-4;
/// Rothfusz coefficient for F²·H².
pub const HI_C9: f64 = -1.99e-6;
