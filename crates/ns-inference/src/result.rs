//! Result of a hypothesis test.

use crate::toymc::SamplingDistribution;
use serde::Serialize;
use std::fmt;

/// Standard normal CDF via `erfc` for accuracy in the tails.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * statrs::function::erf::erfc(-x / std::f64::consts::SQRT_2)
}

/// Standard normal quantile.
pub fn normal_quantile(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    -std::f64::consts::SQRT_2 * statrs::function::erf::erfc_inv(2.0 * p)
}

fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

/// Outcome of a null-versus-alternate hypothesis test.
///
/// Both p-values are upper tails: the fraction of the null (alternate)
/// distribution at or above the observed statistic.
#[derive(Debug, Clone, Serialize)]
pub struct HypoTestResult {
    name: String,
    null_p_value: f64,
    null_p_value_error: f64,
    alternate_p_value: f64,
    alternate_p_value_error: f64,
    test_statistic_data: f64,
    background_is_alt: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_significance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    null_distribution: Option<SamplingDistribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alt_distribution: Option<SamplingDistribution>,
}

impl HypoTestResult {
    /// Result from closed-form p-values.
    pub fn from_p_values(
        name: impl Into<String>,
        test_statistic_data: f64,
        null_p_value: f64,
        alternate_p_value: f64,
        background_is_alt: bool,
    ) -> Self {
        Self {
            name: name.into(),
            null_p_value,
            null_p_value_error: 0.0,
            alternate_p_value,
            alternate_p_value_error: 0.0,
            test_statistic_data,
            background_is_alt,
            expected_significance: None,
            null_distribution: None,
            alt_distribution: None,
        }
    }

    /// Result from sampled distributions; p-values are tail fractions.
    pub fn from_distributions(
        name: impl Into<String>,
        test_statistic_data: f64,
        null_distribution: SamplingDistribution,
        alt_distribution: SamplingDistribution,
        background_is_alt: bool,
    ) -> Self {
        let (null_p_value, null_p_value_error) = null_distribution.upper_tail(test_statistic_data);
        let (alternate_p_value, alternate_p_value_error) =
            alt_distribution.upper_tail(test_statistic_data);
        Self {
            name: name.into(),
            null_p_value,
            null_p_value_error,
            alternate_p_value,
            alternate_p_value_error,
            test_statistic_data,
            background_is_alt,
            expected_significance: None,
            null_distribution: Some(null_distribution),
            alt_distribution: Some(alt_distribution),
        }
    }

    /// Attach the median expected significance.
    pub fn with_expected_significance(mut self, z: f64) -> Self {
        self.expected_significance = Some(z);
        self
    }

    /// Result name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// p-value of the null hypothesis.
    pub fn null_p_value(&self) -> f64 {
        self.null_p_value
    }

    /// Binomial error of the null p-value (zero for closed-form results).
    pub fn null_p_value_error(&self) -> f64 {
        self.null_p_value_error
    }

    /// p-value of the alternate hypothesis.
    pub fn alternate_p_value(&self) -> f64 {
        self.alternate_p_value
    }

    /// Binomial error of the alternate p-value.
    pub fn alternate_p_value_error(&self) -> f64 {
        self.alternate_p_value_error
    }

    /// Test statistic evaluated on the observed data.
    pub fn test_statistic_data(&self) -> f64 {
        self.test_statistic_data
    }

    /// Whether the alternate hypothesis is the background-only one.
    pub fn background_is_alt(&self) -> bool {
        self.background_is_alt
    }

    /// Significance `Z = Φ⁻¹(1 - p_null)`.
    pub fn significance(&self) -> f64 {
        normal_quantile(1.0 - self.null_p_value)
    }

    /// Error on the significance propagated from the null p-value error.
    pub fn significance_error(&self) -> f64 {
        let z = self.significance();
        if !z.is_finite() || self.null_p_value_error == 0.0 {
            return 0.0;
        }
        self.null_p_value_error / normal_pdf(z)
    }

    /// Median expected significance, when the calculator provides one.
    pub fn expected_significance(&self) -> Option<f64> {
        self.expected_significance
    }

    /// Confidence level of the background-only hypothesis.
    pub fn cl_b(&self) -> f64 {
        if self.background_is_alt { self.alternate_p_value } else { self.null_p_value }
    }

    /// Error on [`cl_b`](Self::cl_b).
    pub fn cl_b_error(&self) -> f64 {
        if self.background_is_alt { self.alternate_p_value_error } else { self.null_p_value_error }
    }

    /// Confidence level of the signal-plus-background hypothesis.
    pub fn cl_splusb(&self) -> f64 {
        if self.background_is_alt { self.null_p_value } else { self.alternate_p_value }
    }

    /// Error on [`cl_splusb`](Self::cl_splusb).
    pub fn cl_splusb_error(&self) -> f64 {
        if self.background_is_alt { self.null_p_value_error } else { self.alternate_p_value_error }
    }

    /// `CL_s = CL_s+b / CL_b`.
    pub fn cl_s(&self) -> f64 {
        let clb = self.cl_b();
        if clb == 0.0 { f64::INFINITY } else { self.cl_splusb() / clb }
    }

    /// Error on [`cl_s`](Self::cl_s), uncorrelated propagation.
    pub fn cl_s_error(&self) -> f64 {
        let (clb, clsb) = (self.cl_b(), self.cl_splusb());
        if clb == 0.0 || clsb == 0.0 {
            return 0.0;
        }
        self.cl_s() * ((self.cl_b_error() / clb).powi(2) + (self.cl_splusb_error() / clsb).powi(2)).sqrt()
    }

    /// Sampled distribution under the null hypothesis.
    pub fn null_distribution(&self) -> Option<&SamplingDistribution> {
        self.null_distribution.as_ref()
    }

    /// Sampled distribution under the alternate hypothesis.
    pub fn alt_distribution(&self) -> Option<&SamplingDistribution> {
        self.alt_distribution.as_ref()
    }

    fn has_errors(&self) -> bool {
        self.null_distribution.is_some()
    }
}

impl fmt::Display for HypoTestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let with_err = |v: f64, e: f64| {
            if self.has_errors() { format!("{} +/- {}", fmt_g(v), fmt_g(e)) } else { fmt_g(v) }
        };

        writeln!(f)?;
        writeln!(f, "Results {}: ", self.name)?;
        writeln!(
            f,
            " - Null p-value = {}",
            with_err(self.null_p_value, self.null_p_value_error)
        )?;
        writeln!(
            f,
            " - Significance = {} sigma",
            with_err(self.significance(), self.significance_error())
        )?;
        if let Some(alt) = &self.alt_distribution {
            writeln!(f, " - Number of Alt toys: {}", alt.len())?;
        }
        if let Some(null) = &self.null_distribution {
            writeln!(f, " - Number of Null toys: {}", null.len())?;
        }
        writeln!(f, " - Test statistic evaluated on data: {}", fmt_g(self.test_statistic_data))?;
        writeln!(f, " - CL_b: {}", with_err(self.cl_b(), self.cl_b_error()))?;
        writeln!(f, " - CL_s+b: {}", with_err(self.cl_splusb(), self.cl_splusb_error()))?;
        writeln!(f, " - CL_s: {}", with_err(self.cl_s(), self.cl_s_error()))?;
        if let Some(z) = self.expected_significance {
            writeln!(f, " - Expected significance = {} sigma", fmt_g(z))?;
        }
        Ok(())
    }
}

/// Six significant digits, scientific notation outside `[1e-4, 1e6)`.
fn fmt_g(v: f64) -> String {
    if !v.is_finite() {
        return format!("{}", v);
    }
    if v == 0.0 {
        return "0".to_string();
    }
    let exp = v.abs().log10().floor() as i32;
    if !(-5..6).contains(&exp) {
        return format!("{:.5e}", v);
    }
    let decimals = (5 - exp).max(0) as usize;
    let s = format!("{:.*}", decimals, v);
    if s.contains('.') { s.trim_end_matches('0').trim_end_matches('.').to_string() } else { s }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normal_quantile_inverts_cdf() {
        for x in [-3.0, -1.0, 0.0, 0.5, 2.5] {
            assert_relative_eq!(normal_quantile(normal_cdf(x)), x, epsilon = 1e-9);
        }
        assert_relative_eq!(normal_quantile(1.0 - 2.866_515_7e-7), 5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_discovery_cl_mapping() {
        let r = HypoTestResult::from_p_values("r", 2.0, 0.01, 0.6, false);
        assert_eq!(r.cl_b(), 0.01);
        assert_eq!(r.cl_splusb(), 0.6);
        assert_relative_eq!(r.cl_s(), 60.0, epsilon = 1e-12);
        assert_relative_eq!(r.significance(), 2.326_347_87, epsilon = 1e-6);
    }

    #[test]
    fn test_limit_cl_mapping() {
        let r = HypoTestResult::from_p_values("r", 2.0, 0.04, 0.3, true);
        assert_eq!(r.cl_b(), 0.3);
        assert_eq!(r.cl_splusb(), 0.04);
        assert_relative_eq!(r.cl_s(), 0.04 / 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_toy_p_values_are_upper_tails() {
        let null = SamplingDistribution::new("null", vec![0.0, 0.0, 0.5, 1.0, 2.0], 0);
        let alt = SamplingDistribution::new("alt", vec![0.5, 1.0, 3.0, 4.0], 0);
        let r = HypoTestResult::from_distributions("toys", 1.0, null, alt, false);

        assert_relative_eq!(r.null_p_value(), 0.4, epsilon = 1e-12);
        assert_relative_eq!(r.alternate_p_value(), 0.75, epsilon = 1e-12);
        assert_relative_eq!(r.null_p_value_error(), (0.4f64 * 0.6 / 5.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(r.cl_b(), 0.4, epsilon = 1e-12);
        assert_relative_eq!(r.cl_splusb(), 0.75, epsilon = 1e-12);
        assert_relative_eq!(r.cl_s(), 1.875, epsilon = 1e-12);
    }

    #[test]
    fn test_display_with_no_null_toy_in_tail() {
        let null = SamplingDistribution::new("null", vec![0.0, 0.0, 0.2, 0.7], 0);
        let alt = SamplingDistribution::new("alt", vec![1.0, 2.0, 3.0, 4.0], 0);
        let r = HypoTestResult::from_distributions("fc", 1.5, null, alt, false);

        assert_eq!(r.null_p_value(), 0.0);
        assert_eq!(r.null_p_value_error(), 0.0);
        assert_eq!(r.significance(), f64::INFINITY);
        assert_eq!(r.significance_error(), 0.0);
        let text = r.to_string();
        assert!(text.contains(" - Null p-value = 0 +/- 0\n"), "{text}");
        assert!(text.contains(" - Significance = inf +/- 0 sigma\n"), "{text}");
        assert!(text.contains(" - CL_b: 0 +/- 0\n"), "{text}");
        assert!(text.contains(" - CL_s: inf +/- 0\n"), "{text}");
    }

    #[test]
    fn test_display_lists_toys_and_cls() {
        let null = SamplingDistribution::new("null", vec![0.0, 1.0, 2.0, 3.0], 0);
        let alt = SamplingDistribution::new("alt", vec![1.0, 2.0], 0);
        let text = HypoTestResult::from_distributions("fc", 1.5, null, alt, false).to_string();

        assert!(text.contains("Results fc: "));
        assert!(text.contains(" - Null p-value = 0.5 +/- 0.25"));
        assert!(text.contains(" - Number of Alt toys: 2"));
        assert!(text.contains(" - Number of Null toys: 4"));
        assert!(text.contains(" - Test statistic evaluated on data: 1.5"));
        assert!(text.contains(" - CL_s: 1"));
    }

    #[test]
    fn test_display_asymptotic_has_no_errors() {
        let text = HypoTestResult::from_p_values("as", 4.5, 0.001, 0.5, false)
            .with_expected_significance(3.0)
            .to_string();
        assert!(text.contains(" - Null p-value = 0.001\n"));
        assert!(!text.contains("toys"));
        assert!(text.contains(" - Expected significance = 3 sigma"));
    }

    #[test]
    fn test_fmt_g() {
        assert_eq!(fmt_g(0.5), "0.5");
        assert_eq!(fmt_g(1234.5678), "1234.57");
        assert_eq!(fmt_g(2.0e-7), "2.00000e-7");
        assert_eq!(fmt_g(f64::INFINITY), "inf");
    }
}
