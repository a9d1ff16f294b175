//! Natural cubic spline through a set of control points.
//!
//! The spline stores the second derivative `m_i` at every knot. With the natural
//! boundary condition (`m_0 = m_{n-1} = 0`) the interior values solve a
//! tridiagonal system, handled with the Thomas algorithm in O(n).
//!
//! On a segment `[x_i, x_{i+1}]` with `h = x_{i+1} - x_i`, `a = (x_{i+1} - x) / h`
//! and `b = (x - x_i) / h`:
//!
//! ```text
//! S(x) = a*y_i + b*y_{i+1} + ((a^3 - a)*m_i + (b^3 - b)*m_{i+1}) * h^2 / 6
//! ```
//!
//! At a knot `a` or `b` is exactly 0 or 1, so `S(x_i) = y_i` without rounding error.
//! Outside the knots the spline continues as a straight line with the end slope,
//! which is what zero end curvature implies.

/// Guard for near-zero pivots in the tridiagonal solve.
const PIVOT_EPS: f64 = 1e-16;

#[derive(Debug, Clone)]
pub struct NaturalCubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    m: Vec<f64>,
}

impl NaturalCubicSpline {
    /// Fit a spline through `(x[i], y[i])`.
    ///
    /// Returns `None` unless there are at least 2 points, lengths match, every
    /// value is finite, and `x` is strictly increasing.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Option<Self> {
        if x.len() < 2 || x.len() != y.len() {
            return None;
        }
        if !x.iter().chain(y.iter()).all(|v| v.is_finite()) {
            return None;
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }

        let m = natural_second_derivatives(&x, &y);
        Some(Self { x, y, m })
    }

    pub fn knots(&self) -> usize {
        self.x.len()
    }

    /// Evaluate the spline (or its linear continuation) at `t`.
    pub fn evaluate(&self, t: f64) -> f64 {
        let n = self.x.len();
        if t <= self.x[0] {
            let slope = self.end_slope_left();
            return self.y[0] + slope * (t - self.x[0]);
        }
        if t >= self.x[n - 1] {
            let slope = self.end_slope_right();
            return self.y[n - 1] + slope * (t - self.x[n - 1]);
        }

        // First knot strictly greater than t; t lies in [x[hi-1], x[hi]).
        let hi = self.x.partition_point(|&k| k <= t);
        let lo = hi - 1;
        self.segment(lo, t)
    }

    fn segment(&self, lo: usize, t: f64) -> f64 {
        let hi = lo + 1;
        let h = self.x[hi] - self.x[lo];
        let a = (self.x[hi] - t) / h;
        let b = (t - self.x[lo]) / h;
        a * self.y[lo] + b * self.y[hi] + ((a * a * a - a) * self.m[lo] + (b * b * b - b) * self.m[hi]) * h * h / 6.0
    }

    fn end_slope_left(&self) -> f64 {
        let h = self.x[1] - self.x[0];
        (self.y[1] - self.y[0]) / h - h * (2.0 * self.m[0] + self.m[1]) / 6.0
    }

    fn end_slope_right(&self) -> f64 {
        let n = self.x.len();
        let h = self.x[n - 1] - self.x[n - 2];
        (self.y[n - 1] - self.y[n - 2]) / h + h * (self.m[n - 2] + 2.0 * self.m[n - 1]) / 6.0
    }
}

fn natural_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    if n <= 2 {
        return vec![0.0; n];
    }

    let mut lower = vec![0.0; n];
    let mut diag = vec![0.0; n];
    let mut upper = vec![0.0; n];
    let mut rhs = vec![0.0; n];

    diag[0] = 1.0;
    diag[n - 1] = 1.0;

    for i in 1..(n - 1) {
        let h_prev = x[i] - x[i - 1];
        let h_next = x[i + 1] - x[i];
        lower[i] = h_prev;
        diag[i] = 2.0 * (h_prev + h_next);
        upper[i] = h_next;
        rhs[i] = 6.0 * ((y[i + 1] - y[i]) / h_next - (y[i] - y[i - 1]) / h_prev);
    }

    // Forward sweep.
    for i in 1..n {
        let w = if diag[i - 1].abs() > PIVOT_EPS {
            lower[i] / diag[i - 1]
        } else {
            0.0
        };
        diag[i] -= w * upper[i - 1];
        rhs[i] -= w * rhs[i - 1];
    }

    // Back substitution.
    let mut m = vec![0.0; n];
    m[n - 1] = if diag[n - 1].abs() > PIVOT_EPS {
        rhs[n - 1] / diag[n - 1]
    } else {
        0.0
    };
    for i in (0..(n - 1)).rev() {
        m[i] = if diag[i].abs() > PIVOT_EPS {
            (rhs[i] - upper[i] * m[i + 1]) / diag[i]
        } else {
            0.0
        };
    }

    m
}
