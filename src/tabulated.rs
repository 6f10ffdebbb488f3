// Tabulated functions and the natural cubic splines built from them.
//
// Samples are uniformly spaced over [min, max]. The spline has zero second
// derivative at both ends. Inside the closed interval the spline and its
// derivatives are used as is; strictly outside it every order is exactly 0,
// so the first derivative may jump at the boundary.

use crate::error::{BondForceError, BondForceResult};

/// A named function defined by uniformly spaced samples, as registered on a force.
#[derive(Debug, Clone, PartialEq)]
pub struct TabulatedFunction {
    pub name: String,
    pub values: Vec<f64>,
    pub min: f64,
    pub max: f64,
}

impl TabulatedFunction {
    pub fn new(name: impl Into<String>, values: Vec<f64>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            values,
            min,
            max,
        }
    }

    /// Checks the shape requirements shared by registration and spline construction.
    pub fn validate(&self) -> BondForceResult<()> {
        if self.values.len() < 2 {
            return Err(BondForceError::Range(format!(
                "tabulated function '{}' needs at least 2 values, got {}",
                self.name,
                self.values.len()
            )));
        }
        if !self.min.is_finite() || !self.max.is_finite() || self.min >= self.max {
            return Err(BondForceError::Range(format!(
                "tabulated function '{}' has invalid domain [{}, {}]",
                self.name, self.min, self.max
            )));
        }
        if let Some(bad) = self.values.iter().position(|v| !v.is_finite()) {
            return Err(BondForceError::Range(format!(
                "tabulated function '{}' has non-finite value at index {}",
                self.name, bad
            )));
        }
        Ok(())
    }
}

/// Highest derivative order that is not identically zero.
pub const MAX_SPLINE_ORDER: u8 = 3;

/// Natural cubic spline over uniformly spaced knots.
///
/// Each interval `i` stores `[c0, c1, c2, c3]` so that for `s = x - x_i`
/// the value is `c0 + c1*s + c2*s^2 + c3*s^3`.
#[derive(Debug, Clone, PartialEq)]
pub struct NaturalSpline {
    min: f64,
    max: f64,
    spacing: f64,
    coefficients: Vec<[f64; 4]>,
}

impl NaturalSpline {
    pub fn new(function: &TabulatedFunction) -> BondForceResult<Self> {
        function.validate()?;

        let y = &function.values;
        let n = y.len();
        let h = (function.max - function.min) / (n - 1) as f64;
        let second = second_derivatives(y, h);

        let coefficients = (0..n - 1)
            .map(|i| {
                let c0 = y[i];
                let c1 = (y[i + 1] - y[i]) / h - h * (2.0 * second[i] + second[i + 1]) / 6.0;
                let c2 = second[i] / 2.0;
                let c3 = (second[i + 1] - second[i]) / (6.0 * h);
                [c0, c1, c2, c3]
            })
            .collect();

        Ok(Self {
            min: function.min,
            max: function.max,
            spacing: h,
            coefficients,
        })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Evaluates the spline (`order == 0`) or one of its derivatives.
    ///
    /// Returns exactly 0 outside `[min, max]` and for orders above 3.
    #[inline]
    pub fn evaluate(&self, x: f64, order: u8) -> f64 {
        if !(x >= self.min && x <= self.max) || order > MAX_SPLINE_ORDER {
            return 0.0;
        }
        let last = self.coefficients.len() - 1;
        let index = (((x - self.min) / self.spacing) as usize).min(last);
        let s = x - (self.min + index as f64 * self.spacing);
        let [c0, c1, c2, c3] = self.coefficients[index];

        match order {
            0 => c0 + s * (c1 + s * (c2 + s * c3)),
            1 => c1 + s * (2.0 * c2 + 3.0 * c3 * s),
            2 => 2.0 * c2 + 6.0 * c3 * s,
            _ => 6.0 * c3,
        }
    }
}

/// Solves the tridiagonal system for the knot second derivatives of a natural spline
/// with uniform spacing `h` (Thomas algorithm).
fn second_derivatives(y: &[f64], h: f64) -> Vec<f64> {
    let n = y.len();
    let mut second = vec![0.0; n];
    if n < 3 {
        return second;
    }

    // Interior equations: m[i-1] + 4 m[i] + m[i+1] = 6 (y[i+1] - 2 y[i] + y[i-1]) / h^2
    let interior = n - 2;
    let mut diag = vec![4.0; interior];
    let mut rhs: Vec<f64> = (1..n - 1)
        .map(|i| 6.0 * (y[i + 1] - 2.0 * y[i] + y[i - 1]) / (h * h))
        .collect();

    for k in 1..interior {
        let w = 1.0 / diag[k - 1];
        diag[k] -= w;
        rhs[k] -= w * rhs[k - 1];
    }

    second[interior] = rhs[interior - 1] / diag[interior - 1];
    for k in (0..interior - 1).rev() {
        second[k + 1] = (rhs[k] - second[k + 2]) / diag[k];
    }
    second
}
