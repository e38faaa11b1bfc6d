//! Interpolation service behind sampled numeric functions
//!
//! Numeric function nodes only see the [`Interpolator`] contract: fit once from
//! samples, then query at arbitrary points. The default [`SplineInterpolator`]
//! uses piecewise linear or natural cubic splines in 1D, and bilinear or
//! tensor-product natural cubic splines on a 2D grid.
//!
//! Queries outside the sampled range, or NaN queries, yield NaN. There is no
//! extrapolation.

use crate::{LatticeError, LatticeResult};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterpolationKind {
    Linear,
    #[default]
    Cubic,
}

impl InterpolationKind {
    /// `Linear` or `Cubic`, case-insensitive. Anything else, or nothing, is cubic.
    pub fn from_metadata(value: Option<&str>) -> Self {
        match value {
            Some(kind) if kind.trim().eq_ignore_ascii_case("linear") => InterpolationKind::Linear,
            _ => InterpolationKind::Cubic,
        }
    }
}

/// A fitted one-variable function
pub trait Curve: Debug {
    fn value(&self, x: f64) -> f64;
}

/// A fitted two-variable function
pub trait Surface: Debug {
    fn value(&self, x1: f64, x2: f64) -> f64;
}

pub trait Interpolator: Debug {
    fn fit_curve(&self, x: &[f64], y: &[f64], kind: InterpolationKind)
        -> LatticeResult<Box<dyn Curve>>;

    /// `z[i][j]` is the sample at `(x1[i], x2[j])`
    fn fit_surface(
        &self,
        x1: &[f64],
        x2: &[f64],
        z: &[Vec<f64>],
        kind: InterpolationKind,
    ) -> LatticeResult<Box<dyn Surface>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SplineInterpolator;

impl Interpolator for SplineInterpolator {
    fn fit_curve(
        &self,
        x: &[f64],
        y: &[f64],
        kind: InterpolationKind,
    ) -> LatticeResult<Box<dyn Curve>> {
        check_abscissae(x, "x")?;
        if x.len() != y.len() {
            return Err(LatticeError::Interpolation(format!(
                "{} abscissae but {} ordinates",
                x.len(),
                y.len()
            )));
        }
        Ok(Box::new(Spline::fit(x, y, kind)))
    }

    fn fit_surface(
        &self,
        x1: &[f64],
        x2: &[f64],
        z: &[Vec<f64>],
        kind: InterpolationKind,
    ) -> LatticeResult<Box<dyn Surface>> {
        check_abscissae(x1, "x1")?;
        check_abscissae(x2, "x2")?;
        if z.len() != x1.len() || z.iter().any(|row| row.len() != x2.len()) {
            return Err(LatticeError::Interpolation(format!(
                "grid values do not form a {}x{} table",
                x1.len(),
                x2.len()
            )));
        }
        let rows = z.iter().map(|row| Spline::fit(x2, row, kind)).collect();
        Ok(Box::new(GridSurface {
            x1: x1.to_vec(),
            rows,
            kind,
        }))
    }
}

fn check_abscissae(x: &[f64], name: &str) -> LatticeResult<()> {
    if x.len() < 2 {
        return Err(LatticeError::Interpolation(format!(
            "{} needs at least 2 samples, got {}",
            name,
            x.len()
        )));
    }
    if !x.windows(2).all(|pair| pair[0] < pair[1]) {
        return Err(LatticeError::Interpolation(format!(
            "{} samples must be strictly increasing",
            name
        )));
    }
    Ok(())
}

/// Piecewise cubic in second-derivative form; all-zero second derivatives
/// make it piecewise linear.
#[derive(Debug, Clone)]
struct Spline {
    x: Vec<f64>,
    y: Vec<f64>,
    second: Vec<f64>,
}

impl Spline {
    fn fit(x: &[f64], y: &[f64], kind: InterpolationKind) -> Self {
        let second = match kind {
            InterpolationKind::Cubic if x.len() >= 3 => natural_second_derivatives(x, y),
            _ => vec![0.0; x.len()],
        };
        Self {
            x: x.to_vec(),
            y: y.to_vec(),
            second,
        }
    }

    fn interval(&self, t: f64) -> Option<usize> {
        let last = self.x.len() - 1;
        if t.is_nan() || t < self.x[0] || t > self.x[last] {
            return None;
        }
        let upper = self.x.partition_point(|&xi| xi <= t);
        Some(upper.clamp(1, last) - 1)
    }
}

impl Curve for Spline {
    fn value(&self, t: f64) -> f64 {
        let Some(i) = self.interval(t) else {
            return f64::NAN;
        };
        let h = self.x[i + 1] - self.x[i];
        let a = (self.x[i + 1] - t) / h;
        let b = (t - self.x[i]) / h;
        a * self.y[i]
            + b * self.y[i + 1]
            + ((a * a * a - a) * self.second[i] + (b * b * b - b) * self.second[i + 1]) * h * h
                / 6.0
    }
}

/// Second derivatives of the natural cubic spline through `(x, y)`
/// (zero at both ends), by the tridiagonal Thomas algorithm.
fn natural_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut second = vec![0.0; n];
    let mut diag = vec![0.0; n];
    let mut rhs = vec![0.0; n];

    for i in 1..n - 1 {
        let h0 = x[i] - x[i - 1];
        let h1 = x[i + 1] - x[i];
        diag[i] = 2.0 * (h0 + h1);
        rhs[i] = 6.0 * ((y[i + 1] - y[i]) / h1 - (y[i] - y[i - 1]) / h0);
    }

    // forward sweep; sub- and super-diagonals are the interval widths
    for i in 2..n - 1 {
        let h = x[i] - x[i - 1];
        let factor = h / diag[i - 1];
        diag[i] -= factor * h;
        rhs[i] -= factor * rhs[i - 1];
    }

    for i in (1..n - 1).rev() {
        let h = x[i + 1] - x[i];
        let upper = if i + 1 < n - 1 { h * second[i + 1] } else { 0.0 };
        second[i] = (rhs[i] - upper) / diag[i];
    }
    second
}

#[derive(Debug)]
struct GridSurface {
    x1: Vec<f64>,
    rows: Vec<Spline>,
    kind: InterpolationKind,
}

impl Surface for GridSurface {
    fn value(&self, x1: f64, x2: f64) -> f64 {
        let along_x2: Vec<f64> = self.rows.iter().map(|row| row.value(x2)).collect();
        if along_x2.iter().all(|v| v.is_nan()) {
            return f64::NAN;
        }
        Spline::fit(&self.x1, &along_x2, self.kind).value(x1)
    }
}
