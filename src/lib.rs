//! Turn textual algebraic equations into numeric Jacobian matrices.
//!
//! The pipeline runs in stages. [`parse::tokenize`] breaks an expression into
//! tokens and [`parse::to_postfix`] rearranges them into reverse Polish
//! notation with the shunting-yard algorithm. [`ops::evaluate`] collapses a
//! postfix expression to a number under a [`Binding`] of variable values, and
//! [`ops::partial_derivative`] builds on that with forward finite
//! differences. An [`Equation`] pairs the normalized zero form `lhs-(rhs)`
//! with its postfix expression, and a [`SystemOfEquations`] of N equations
//! over N unknowns yields a [`Jacobian`], which can be inverted or used to
//! solve a linear system via Gauss-Jordan reduction on a [`Matrix`].
//!
//! ```rust
//! use zeroform::SystemOfEquations;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let system = SystemOfEquations::from_equations(&[
//!     "i - j = 9",
//!     "i + j = 4",
//! ])?;
//!
//! let jacobian = system.jacobian()?;
//! let correction = jacobian.solve(&[9.0, 4.0])?;
//! # assert!((correction[0] - 6.5).abs() < 1e-3);
//! # Ok(())
//! # }
//! ```

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

mod equations;
pub mod matrix;
pub mod ops;
pub mod parse;
mod solve;

pub use equations::{normalize, Equation, SystemOfEquations};
pub use matrix::{Matrix, SingularMatrix};
pub use ops::{Binding, EvalError, DEFAULT_STEP};
pub use parse::{ParseError, RpnExpr, Token};
pub use solve::{Jacobian, SystemError};
