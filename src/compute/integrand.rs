//! Integrand selection

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar function integrated by every participant
///
/// All variants are pure `f64 -> f64` functions so the quadrature result only
/// depends on its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Integrand {
    #[default]
    Cos,
    Sin,
    Exp,
    /// x²
    Square,
    /// 1/x
    Inverse,
}

impl Integrand {
    #[inline]
    pub fn eval(self, x: f64) -> f64 {
        match self {
            Integrand::Cos => x.cos(),
            Integrand::Sin => x.sin(),
            Integrand::Exp => x.exp(),
            Integrand::Square => x * x,
            Integrand::Inverse => 1.0 / x,
        }
    }

    /// Borrow the integrand as a plain closure
    pub fn as_fn(self) -> impl Fn(f64) -> f64 {
        move |x| self.eval(x)
    }
}

impl fmt::Display for Integrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Integrand::Cos => "cos(x)",
            Integrand::Sin => "sin(x)",
            Integrand::Exp => "exp(x)",
            Integrand::Square => "x^2",
            Integrand::Inverse => "1/x",
        };
        f.write_str(name)
    }
}
