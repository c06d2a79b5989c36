use crate::utils::constants::DO_FULL_SATURATION;

/// Convert Celsius to Fahrenheit
///
/// # Examples
/// ```
/// use wq_processor::utils::celsius_to_fahrenheit;
///
/// assert_eq!(celsius_to_fahrenheit(25.0), 77.0);
/// ```
pub fn celsius_to_fahrenheit(temp_c: f64) -> f64 {
    temp_c * 9.0 / 5.0 + 32.0
}

/// Convert Fahrenheit to Celsius (inverse of [`celsius_to_fahrenheit`])
pub fn fahrenheit_to_celsius(temp_f: f64) -> f64 {
    (temp_f - 32.0) * 5.0 / 9.0
}

/// Dissolved oxygen as percent of the simplified full-saturation value
pub fn do_percent_saturation(do_mg_l: f64) -> f64 {
    do_mg_l / DO_FULL_SATURATION * 100.0
}

/// Temperature-dependent saturation concentration (simplified linear model)
pub fn do_saturation_at(temp_c: f64) -> f64 {
    14.62 - 0.3898 * temp_c
}

/// Difference between saturated and measured dissolved oxygen
pub fn saturation_deficit(do_measured: f64, temp_c: f64) -> f64 {
    do_saturation_at(temp_c) - do_measured
}
