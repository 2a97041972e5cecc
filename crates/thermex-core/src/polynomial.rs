use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Degree used for certificate, standard and per-sample fits.
pub const FIT_DEGREE: usize = 4;

const SINGULAR_VALUE_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("x has {x} values but y has {y}")]
    LengthMismatch { x: usize, y: usize },

    #[error("{points} distinct points cannot determine a degree-{degree} polynomial")]
    Underdetermined { points: usize, degree: usize },

    #[error("non-finite value at row {index}")]
    NonFinite { index: usize },

    #[error("least-squares solve failed: {0}")]
    Solver(&'static str),
}

impl FitError {
    pub fn is_underdetermined(&self) -> bool {
        matches!(self, FitError::Underdetermined { .. })
    }
}

/// Polynomial in a scaled variable.
///
/// `coef[k]` multiplies `t^k`, where `t` is `x` mapped linearly from `domain`
/// onto `[-1, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polynomial {
    coef: Vec<f64>,
    domain: [f64; 2],
}

impl Polynomial {
    pub fn new(coef: Vec<f64>, domain: [f64; 2]) -> Self {
        Self { coef, domain }
    }

    /// Polynomial with plain power-basis coefficients in `x`.
    pub fn from_power_coefficients(coef: Vec<f64>) -> Self {
        Self::new(coef, [-1.0, 1.0])
    }

    pub fn coef(&self) -> &[f64] {
        &self.coef
    }

    pub fn domain(&self) -> [f64; 2] {
        self.domain
    }

    pub fn degree(&self) -> usize {
        self.coef.len().saturating_sub(1)
    }

    /// Least-squares fit of the given degree, solved by SVD of the scaled
    /// Vandermonde matrix.
    pub fn fit(x: &[f64], y: &[f64], degree: usize) -> Result<Self, FitError> {
        if x.len() != y.len() {
            return Err(FitError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if let Some(index) = x
            .iter()
            .zip(y)
            .position(|(a, b)| !a.is_finite() || !b.is_finite())
        {
            return Err(FitError::NonFinite { index });
        }

        let points = distinct_count(x);
        if points < degree + 1 {
            return Err(FitError::Underdetermined { points, degree });
        }

        let (min, max) = x
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        let domain = if max > min {
            [min, max]
        } else {
            [min - 1.0, min + 1.0]
        };

        let (off, scl) = map_parameters(domain);
        let columns = degree + 1;
        let vandermonde =
            DMatrix::from_fn(x.len(), columns, |row, col| (off + scl * x[row]).powi(col as i32));
        let rhs = DVector::from_column_slice(y);

        let coef = vandermonde
            .svd(true, true)
            .solve(&rhs, SINGULAR_VALUE_EPS)
            .map_err(FitError::Solver)?;

        Ok(Self::new(coef.iter().copied().collect(), domain))
    }

    pub fn eval(&self, x: f64) -> f64 {
        let (off, scl) = map_parameters(self.domain);
        let t = off + scl * x;
        self.coef.iter().rev().fold(0.0, |acc, c| acc * t + c)
    }

    pub fn eval_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|x| self.eval(*x)).collect()
    }

    /// Analytic derivative with respect to `x` (not the scaled variable).
    pub fn deriv(&self) -> Self {
        let (_, scl) = map_parameters(self.domain);
        let coef = if self.coef.len() <= 1 {
            vec![0.0]
        } else {
            self.coef
                .iter()
                .enumerate()
                .skip(1)
                .map(|(k, c)| k as f64 * c * scl)
                .collect()
        };
        Self::new(coef, self.domain)
    }

    /// Coefficients expanded into the power basis of `x`, lowest order first.
    pub fn power_coefficients(&self) -> Vec<f64> {
        let (off, scl) = map_parameters(self.domain);
        let mut result = vec![0.0];
        for c in self.coef.iter().rev() {
            // result = result * (off + scl x) + c
            let mut next = vec![0.0; result.len() + 1];
            for (k, r) in result.iter().enumerate() {
                next[k] += r * off;
                next[k + 1] += r * scl;
            }
            next[0] += c;
            result = next;
        }
        result.truncate(self.coef.len().max(1));
        result
    }
}

/// Offset and scale of the linear map from `domain` onto `[-1, 1]`.
fn map_parameters(domain: [f64; 2]) -> (f64, f64) {
    let [a, b] = domain;
    let scl = 2.0 / (b - a);
    let off = -(a + b) / (b - a);
    (off, scl)
}

fn distinct_count(values: &[f64]) -> usize {
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic(t: f64) -> f64 {
        2.0 + 3.0 * t - 0.1 * t * t
    }

    #[test]
    fn recovers_known_quadratic_with_degree_four() {
        let x: Vec<f64> = (0..12).map(|i| 20.0 + 15.0 * i as f64).collect();
        let y: Vec<f64> = x.iter().map(|t| quadratic(*t)).collect();

        let poly = Polynomial::fit(&x, &y, FIT_DEGREE).expect("fit succeeded");
        let power = poly.power_coefficients();

        assert_eq!(power.len(), 5);
        assert!((power[0] - 2.0).abs() < 1e-6, "{power:?}");
        assert!((power[1] - 3.0).abs() < 1e-7, "{power:?}");
        assert!((power[2] + 0.1).abs() < 1e-9, "{power:?}");
        assert!(power[3].abs() < 1e-10, "{power:?}");
        assert!(power[4].abs() < 1e-12, "{power:?}");

        for t in &x {
            assert!((poly.eval(*t) - quadratic(*t)).abs() < 1e-8);
        }
    }

    #[test]
    fn derivative_matches_analytic_slope() {
        let x: Vec<f64> = (0..9).map(|i| -40.0 + 30.0 * i as f64).collect();
        let y: Vec<f64> = x.iter().map(|t| quadratic(*t)).collect();

        let alpha = Polynomial::fit(&x, &y, FIT_DEGREE).unwrap().deriv();
        for t in &x {
            assert!((alpha.eval(*t) - (3.0 - 0.2 * t)).abs() < 1e-8);
        }
    }

    #[test]
    fn power_basis_round_trip() {
        let poly = Polynomial::from_power_coefficients(vec![1.0, -2.0, 0.5]);
        assert_eq!(poly.eval(2.0), 1.0 - 4.0 + 2.0);
        assert_eq!(poly.power_coefficients(), vec![1.0, -2.0, 0.5]);
        assert_eq!(poly.deriv().coef(), &[-2.0, 1.0]);
    }

    #[test]
    fn constant_derivative_is_zero() {
        let poly = Polynomial::from_power_coefficients(vec![7.0]);
        assert_eq!(poly.deriv().eval(123.0), 0.0);
    }

    #[test]
    fn too_few_distinct_points_is_rejected() {
        let x = [10.0, 20.0, 20.0, 30.0, 30.0, 40.0];
        let y = [0.0; 6];
        let err = Polynomial::fit(&x, &y, FIT_DEGREE).unwrap_err();
        assert_eq!(
            err,
            FitError::Underdetermined {
                points: 4,
                degree: FIT_DEGREE
            }
        );
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let x = [1.0, 2.0, f64::NAN, 4.0, 5.0];
        let y = [0.0; 5];
        assert_eq!(
            Polynomial::fit(&x, &y, FIT_DEGREE).unwrap_err(),
            FitError::NonFinite { index: 2 }
        );
    }

    #[test]
    fn serializes_with_domain() {
        let poly = Polynomial::new(vec![1.0, 2.0], [25.0, 500.0]);
        let json = serde_json::to_string(&poly).unwrap();
        assert_eq!(json, r#"{"coef":[1.0,2.0],"domain":[25.0,500.0]}"#);
        let back: Polynomial = serde_json::from_str(&json).unwrap();
        assert_eq!(back, poly);
    }
}
