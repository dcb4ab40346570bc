//! Operations over parsed expressions: evaluation, variable discovery and
//! numeric differentiation.

use crate::parse::{RpnExpr, Token};
use smol_str::SmolStr;
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    iter::FromIterator,
};

/// The finite-difference step used by [`partial_derivative`].
///
/// Forward differences are first-order accurate, so the error in an estimate
/// is proportional to the step itself. The default is small enough that the
/// truncation error stays below anything the modest systems this crate
/// targets care about, while staying large enough to avoid catastrophic
/// cancellation in the subtraction. Callers with noisier expressions can
/// choose their own step through [`partial_derivative_with_step`].
pub const DEFAULT_STEP: f64 = 1e-6;

/// An insertion-ordered mapping from variable name to value.
///
/// Names are unique within one binding, and a value is never mutated in
/// place: "rebinding" a variable means taking a fresh snapshot via
/// [`Binding::with_value`], so every evaluation works on an immutable view
/// of its inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Binding {
    entries: Vec<(SmolStr, f64)>,
}

impl Binding {
    pub fn new() -> Self { Binding::default() }

    /// Add a variable, keeping the existing entry if the name is already
    /// bound.
    pub fn define(&mut self, name: impl Into<SmolStr>, value: f64) {
        let name = name.into();

        if !self.contains(name.as_str()) {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, value)| *value)
    }

    pub fn contains(&self, name: &str) -> bool { self.get(name).is_some() }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// The bound names, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &SmolStr> + '_ {
        self.entries.iter().map(|(name, _)| name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, f64)> + '_ {
        self.entries.iter().map(|(name, value)| (name, *value))
    }

    /// A copy of this binding with `name` bound to `value`, appending the
    /// name if it wasn't bound before.
    pub fn with_value(&self, name: &str, value: f64) -> Binding {
        let mut entries = self.entries.clone();

        match entries.iter_mut().find(|(n, _)| n.as_str() == name) {
            Some(entry) => entry.1 = value,
            None => entries.push((name.into(), value)),
        }

        Binding { entries }
    }
}

impl FromIterator<(SmolStr, f64)> for Binding {
    fn from_iter<T: IntoIterator<Item = (SmolStr, f64)>>(iter: T) -> Self {
        let mut binding = Binding::new();

        for (name, value) in iter {
            binding.define(name, value);
        }

        binding
    }
}

/// Things that can go wrong while evaluating a postfix expression.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A structurally invalid token (a parenthesis or comma) survived into
    /// the postfix form.
    MalformedPostfix,
    /// An operator or function found too few operands on the stack.
    MissingOperand,
    /// Evaluation finished with more than one value on the stack.
    LeftoverOperands { count: usize },
    /// An identifier with no entry in the binding.
    UnknownSymbol { name: SmolStr },
}

impl Display for EvalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::MalformedPostfix => {
                write!(f, "A parenthesis or comma survived into postfix form")
            },
            EvalError::MissingOperand => {
                write!(f, "An operator ran out of operands")
            },
            EvalError::LeftoverOperands { count } => write!(
                f,
                "Evaluation finished with {} values on the stack",
                count
            ),
            EvalError::UnknownSymbol { name } => {
                write!(f, "No value bound for \"{}\"", name)
            },
        }
    }
}

impl Error for EvalError {}

/// Evaluate a postfix expression to a single value under `binding`.
///
/// The sequence is consumed. Callers that need to evaluate the same logical
/// expression more than once must clone it first, which is exactly what the
/// differentiator does.
///
/// Division by zero and out-of-domain arguments to the transcendental
/// functions follow IEEE float semantics and come back as non-finite values
/// rather than errors; anything reading a derivative out of the result has
/// to treat a non-finite value as a failed entry.
pub fn evaluate(rpn: RpnExpr, binding: &Binding) -> Result<f64, EvalError> {
    let mut operands: Vec<f64> = Vec::new();

    for token in rpn.0 {
        match token {
            Token::Number(value) => operands.push(value),
            Token::Identifier(name) => match binding.get(name.as_str()) {
                Some(value) => operands.push(value),
                None => return Err(EvalError::UnknownSymbol { name }),
            },
            Token::Function(function) => {
                let argument =
                    operands.pop().ok_or(EvalError::MissingOperand)?;
                operands.push(function.eval(argument));
            },
            Token::Operator(operator) => {
                // the operand pushed first is the left-hand side
                let right = operands.pop().ok_or(EvalError::MissingOperand)?;
                let left = operands.pop().ok_or(EvalError::MissingOperand)?;
                operands.push(operator.apply(left, right));
            },
            Token::LeftParen | Token::RightParen | Token::Comma => {
                return Err(EvalError::MalformedPostfix);
            },
        }
    }

    let result = operands.pop().ok_or(EvalError::MissingOperand)?;

    if !operands.is_empty() {
        return Err(EvalError::LeftoverOperands {
            count: operands.len() + 1,
        });
    }

    Ok(result)
}

/// Collect the free variables of a postfix expression, in first-occurrence
/// order, each bound to the placeholder value `1.0`.
///
/// The placeholder only exists so the binding can be used for membership
/// checks straight away; callers are expected to overwrite it before doing
/// arithmetic that matters.
pub fn extract_variables(rpn: &RpnExpr) -> Binding {
    let mut binding = Binding::new();

    for token in rpn.tokens() {
        if let Token::Identifier(name) = token {
            binding.define(name.clone(), 1.0);
        }
    }

    binding
}

/// Estimate the partial derivative of `rpn` with respect to `variable` at
/// `binding`, using a forward difference with [`DEFAULT_STEP`].
pub fn partial_derivative(
    rpn: &RpnExpr,
    binding: &Binding,
    variable: &str,
) -> Result<f64, EvalError> {
    partial_derivative_with_step(rpn, binding, variable, DEFAULT_STEP)
}

/// As [`partial_derivative`], with an explicit step size.
///
/// The estimate is `(f(x + h) - f(x)) / h`, which is first-order accurate:
/// the error shrinks linearly with `h`. Evaluation destroys its input, so
/// both points are computed on independent copies of the expression.
pub fn partial_derivative_with_step(
    rpn: &RpnExpr,
    binding: &Binding,
    variable: &str,
    step: f64,
) -> Result<f64, EvalError> {
    let current = binding.get(variable).unwrap_or(1.0);
    let perturbed = binding.with_value(variable, current + step);

    let ahead = evaluate(rpn.clone(), &perturbed)?;
    let here = evaluate(rpn.clone(), binding)?;

    Ok((ahead - here) / step)
}
