//! Equations and systems of equations.

use crate::{
    ops::{self, Binding, EvalError},
    parse::{self, ParseError, RpnExpr},
    solve::{Jacobian, SystemError},
};
use smol_str::SmolStr;
use std::{
    fmt::{self, Display, Formatter},
    iter::{Extend, FromIterator},
    str::FromStr,
};

/// Rewrite `lhs = rhs` into the zero-form expression `lhs-(rhs)`.
///
/// A correct solution makes the zero form evaluate to exactly `0`, which
/// turns root finding into the natural consumer of the evaluator. Both sides
/// are trimmed and no other whitespace is introduced, so `"x = 3+1"` becomes
/// `"x-(3+1)"`.
pub fn normalize(equation: &str) -> Result<String, ParseError> {
    let equals_signs = equation.matches('=').count();

    if equals_signs != 1 {
        return Err(ParseError::MalformedEquation { equals_signs });
    }

    let mut sides = equation.splitn(2, '=');
    let left = sides.next().unwrap_or_default();
    let right = sides.next().unwrap_or_default();

    Ok(format!("{}-({})", left.trim(), right.trim()))
}

/// A single equation in zero form: the normalized expression text paired
/// with its parsed postfix form.
///
/// Read-only once built. Evaluation is destructive, so anything evaluating
/// the equation works on a copy of the postfix sequence, never the original.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    text: String,
    rpn: RpnExpr,
}

impl Equation {
    /// Normalize and parse one equation from its raw text.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let text = normalize(raw)?;
        let rpn = parse::to_postfix(parse::tokenize(&text))?;

        Ok(Equation { text, rpn })
    }

    /// The normalized zero-form expression.
    pub fn text(&self) -> &str { &self.text }

    pub fn rpn(&self) -> &RpnExpr { &self.rpn }

    /// How far `binding` is from solving this equation. Zero means solved.
    pub fn residual(&self, binding: &Binding) -> Result<f64, EvalError> {
        ops::evaluate(self.rpn.clone(), binding)
    }

    /// The equation's free variables, in first-occurrence order, each bound
    /// to the extraction placeholder.
    pub fn variables(&self) -> Binding { ops::extract_variables(&self.rpn) }
}

impl FromStr for Equation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Equation::parse(s) }
}

impl Display for Equation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A builder for a square system of equations.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SystemOfEquations {
    equations: Vec<Equation>,
}

impl SystemOfEquations {
    pub fn new() -> Self { SystemOfEquations::default() }

    pub fn with(mut self, equation: Equation) -> Self {
        self.push(equation);
        self
    }

    pub fn push(&mut self, equation: Equation) {
        self.equations.push(equation);
    }

    pub fn from_equations<E, S>(equations: E) -> Result<Self, ParseError>
    where
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut system = SystemOfEquations::new();

        for equation in equations {
            system.push(equation.as_ref().parse()?);
        }

        Ok(system)
    }

    pub fn len(&self) -> usize { self.equations.len() }

    pub fn is_empty(&self) -> bool { self.equations.is_empty() }

    pub fn equations(&self) -> &[Equation] { &self.equations }

    /// The distinct variables across the whole system, in the order the
    /// first equation introduces them (then first-seen for any stragglers).
    pub fn unknowns(&self) -> Vec<SmolStr> {
        let mut unknowns = Binding::new();

        for equation in &self.equations {
            let variables = equation.variables();
            for name in variables.names() {
                unknowns.define(name.clone(), 1.0);
            }
        }

        unknowns.names().cloned().collect()
    }

    pub fn num_unknowns(&self) -> usize { self.unknowns().len() }

    /// Evaluate every equation's residual under one candidate solution.
    pub fn residuals(
        &self,
        binding: &Binding,
    ) -> Result<Vec<f64>, EvalError> {
        self.equations
            .iter()
            .map(|equation| equation.residual(binding))
            .collect()
    }

    /// Assemble the system's Jacobian with every unknown held at the
    /// extraction placeholder value.
    pub fn jacobian(&self) -> Result<Jacobian, SystemError> {
        Jacobian::assemble(&self.equations)
    }

    /// Assemble the Jacobian at a caller-supplied operating point.
    pub fn jacobian_at(
        &self,
        binding: &Binding,
    ) -> Result<Jacobian, SystemError> {
        Jacobian::assemble_at(&self.equations, binding)
    }
}

impl Extend<Equation> for SystemOfEquations {
    fn extend<T: IntoIterator<Item = Equation>>(&mut self, iter: T) {
        self.equations.extend(iter);
    }
}

impl FromIterator<Equation> for SystemOfEquations {
    fn from_iter<T: IntoIterator<Item = Equation>>(iter: T) -> Self {
        SystemOfEquations {
            equations: Vec::from_iter(iter),
        }
    }
}

impl<'a> IntoIterator for &'a SystemOfEquations {
    type IntoIter = <&'a [Equation] as IntoIterator>::IntoIter;
    type Item = &'a Equation;

    fn into_iter(self) -> Self::IntoIter { self.equations.iter() }
}

impl IntoIterator for SystemOfEquations {
    type IntoIter = <Vec<Equation> as IntoIterator>::IntoIter;
    type Item = Equation;

    fn into_iter(self) -> Self::IntoIter { self.equations.into_iter() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn normalization_produces_the_zero_form() {
        let got = normalize("x = 3+1").unwrap();

        assert_eq!(got, "x-(3+1)");
    }

    #[test]
    fn the_zero_form_vanishes_at_the_solution() {
        let equation = Equation::parse("x = 3+1").unwrap();
        let binding = Binding::new().with_value("x", 4.0);

        let got = equation.residual(&binding).unwrap();

        assert_abs_diff_eq!(got, 0.0);
    }

    #[test]
    fn equations_need_exactly_one_equals_sign() {
        let inputs = vec![("x + 3", 0), ("x == 3", 2), ("a = b = c", 2)];

        for (src, equals_signs) in inputs {
            let got = Equation::parse(src);

            assert_eq!(
                got,
                Err(ParseError::MalformedEquation { equals_signs }),
                "{:?}",
                src
            );
        }
    }

    #[test]
    fn unbalanced_equations_are_rejected_outright() {
        let got = Equation::parse("(x + 3 = 1");

        assert_eq!(got, Err(ParseError::UnbalancedParenthesis));
    }

    #[test]
    fn unknowns_follow_the_first_equation() {
        let system = SystemOfEquations::from_equations(&[
            "i - j = 9",
            "j + i = 4",
        ])
        .unwrap();

        let names: Vec<_> = system
            .unknowns()
            .iter()
            .map(|name| name.to_string())
            .collect();
        assert_eq!(names, vec!["i", "j"]);
        assert_eq!(system.num_unknowns(), 2);
    }

    #[test]
    fn residuals_measure_how_wrong_a_guess_is() {
        let system = SystemOfEquations::from_equations(&[
            "i - j = 9",
            "i + j = 4",
        ])
        .unwrap();
        let binding =
            Binding::new().with_value("i", 6.5).with_value("j", -2.5);

        let got = system.residuals(&binding).unwrap();

        assert_abs_diff_eq!(got[0], 0.0);
        assert_abs_diff_eq!(got[1], 0.0);
    }
}
