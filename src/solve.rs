//! Numeric Jacobian assembly and the linear solve that consumes it.

use crate::{
    equations::Equation,
    matrix::{self, Matrix, SingularMatrix},
    ops::{self, Binding, EvalError},
};
use smol_str::SmolStr;
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// The matrix of first partial derivatives of a system of equations with
/// respect to its unknowns, columns ordered by the first equation's
/// variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Jacobian {
    matrix: Matrix,
    unknowns: Vec<SmolStr>,
}

impl Jacobian {
    /// Assemble the Jacobian with every unknown held at the extraction
    /// placeholder value.
    pub fn assemble(equations: &[Equation]) -> Result<Self, SystemError> {
        Jacobian::assemble_at(equations, &Binding::new())
    }

    /// Assemble the Jacobian at `binding`, falling back to the placeholder
    /// for any unknown the binding leaves out.
    ///
    /// The system must be square: every equation has to mention exactly as
    /// many distinct variables as there are equations, and later equations
    /// may only use names the first equation introduced. Filling the matrix
    /// costs one finite difference per equation per unknown, so N^2
    /// evaluations for an N-equation system.
    pub fn assemble_at(
        equations: &[Equation],
        binding: &Binding,
    ) -> Result<Self, SystemError> {
        let canonical = match equations.first() {
            Some(first) => first.variables(),
            None => {
                return Err(SystemError::UnderOrOverDetermined {
                    equations: 0,
                    unknowns: 0,
                })
            },
        };

        if canonical.len() != equations.len() {
            return Err(SystemError::UnderOrOverDetermined {
                equations: equations.len(),
                unknowns: canonical.len(),
            });
        }

        for equation in &equations[1..] {
            let variables = equation.variables();

            if variables.len() != equations.len() {
                return Err(SystemError::UnderOrOverDetermined {
                    equations: equations.len(),
                    unknowns: variables.len(),
                });
            }

            for name in variables.names() {
                if !canonical.contains(name.as_str()) {
                    return Err(SystemError::VariableMismatch {
                        name: name.clone(),
                    });
                }
            }
        }

        let unknowns: Vec<SmolStr> = canonical.names().cloned().collect();
        let values: Binding = unknowns
            .iter()
            .map(|name| {
                (name.clone(), binding.get(name.as_str()).unwrap_or(1.0))
            })
            .collect();

        let matrix =
            Matrix::try_init(equations.len(), unknowns.len(), |row, column| {
                ops::partial_derivative(
                    equations[row].rpn(),
                    &values,
                    unknowns[column].as_str(),
                )
            })?;

        let jacobian = Jacobian { matrix, unknowns };
        jacobian.check_finite()?;

        Ok(jacobian)
    }

    /// Convert the NaN sentinel left behind by division by zero or a domain
    /// error into a structured failure before anything downstream reads the
    /// matrix.
    fn check_finite(&self) -> Result<(), SystemError> {
        for row in 0..self.matrix.num_rows() {
            for column in 0..self.matrix.num_columns() {
                if !self.matrix[(row, column)].is_finite() {
                    return Err(SystemError::DomainError {
                        equation: row,
                        variable: self.unknowns[column].clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// The unknowns, in the canonical (first equation's) order. Column `j`
    /// of the matrix differentiates with respect to `unknowns()[j]`.
    pub fn unknowns(&self) -> &[SmolStr] { &self.unknowns }

    pub fn matrix(&self) -> &Matrix { &self.matrix }

    pub fn into_matrix(self) -> Matrix { self.matrix }

    /// Invert the Jacobian via Gauss-Jordan reduction.
    pub fn inverted(&self) -> Result<Matrix, SystemError> {
        self.matrix.inverted().map_err(SystemError::from)
    }

    /// Solve `J * x = rhs` for `x`, one value per unknown.
    ///
    /// # Panics
    ///
    /// Panics unless `rhs` holds one value per equation.
    pub fn solve(&self, rhs: &[f64]) -> Result<Vec<f64>, SystemError> {
        assert_eq!(
            rhs.len(),
            self.matrix.num_rows(),
            "One right-hand value per equation"
        );

        let column = Matrix::init(rhs.len(), 1, |row, _| rhs[row]);
        let solved = matrix::solve(&self.matrix, &column)?;

        Ok((0..solved.num_rows()).map(|row| solved[(row, 0)]).collect())
    }
}

/// Why a system of equations couldn't be turned into a usable Jacobian.
#[derive(Debug, Clone, PartialEq)]
pub enum SystemError {
    Eval(EvalError),
    /// The number of distinct variables doesn't match the number of
    /// equations.
    UnderOrOverDetermined { equations: usize, unknowns: usize },
    /// An equation used a variable the first equation never introduced.
    VariableMismatch { name: SmolStr },
    /// A derivative came back non-finite: division by zero or an argument
    /// outside a transcendental function's domain.
    DomainError { equation: usize, variable: SmolStr },
    /// Row reduction hit a zero pivot.
    Singular(SingularMatrix),
}

impl From<EvalError> for SystemError {
    fn from(e: EvalError) -> Self { SystemError::Eval(e) }
}

impl From<SingularMatrix> for SystemError {
    fn from(e: SingularMatrix) -> Self { SystemError::Singular(e) }
}

impl Display for SystemError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SystemError::Eval(_) => write!(f, "Evaluation failed"),
            SystemError::UnderOrOverDetermined { equations, unknowns } => {
                write!(
                    f,
                    "The system is improperly constrained: {} equations \
                     over {} unknowns",
                    equations, unknowns
                )
            },
            SystemError::VariableMismatch { name } => write!(
                f,
                "The variable \"{}\" doesn't appear in the first equation",
                name
            ),
            SystemError::DomainError { equation, variable } => write!(
                f,
                "Differentiating equation {} with respect to \"{}\" left \
                 the real domain",
                equation, variable
            ),
            SystemError::Singular(_) => write!(f, "The system is singular"),
        }
    }
}

impl Error for SystemError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SystemError::Eval(inner) => Some(inner),
            SystemError::Singular(inner) => Some(inner),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equations::SystemOfEquations;
    use approx::assert_relative_eq;

    fn assert_matrix_eq(got: &Matrix, should_be: &[&[f64]]) {
        assert_eq!(got.num_rows(), should_be.len());

        for (row, should_be) in got.rows().zip(should_be) {
            assert_eq!(row.len(), should_be.len());

            for (value, should_be) in row.iter().zip(*should_be) {
                // finite differences, so only O(h) agreement
                assert_relative_eq!(*value, *should_be, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn jacobian_of_a_linear_system() {
        let system = SystemOfEquations::from_equations(&[
            "i - j = 9",
            "i + j = 4",
        ])
        .unwrap();

        let got = system.jacobian().unwrap();

        let names: Vec<_> =
            got.unknowns().iter().map(|name| name.to_string()).collect();
        assert_eq!(names, vec!["i", "j"]);
        assert_matrix_eq(
            got.matrix(),
            &[[1.0, -1.0].as_ref(), [1.0, 1.0].as_ref()],
        );
    }

    #[test]
    fn jacobian_of_a_nonlinear_system_at_a_point() {
        let system = SystemOfEquations::from_equations(&[
            "x*x + y = 4",
            "x - y*y = 1",
        ])
        .unwrap();
        let binding =
            Binding::new().with_value("x", 3.0).with_value("y", 2.0);

        let got = system.jacobian_at(&binding).unwrap();

        assert_matrix_eq(
            got.matrix(),
            &[[6.0, 1.0].as_ref(), [1.0, -4.0].as_ref()],
        );
    }

    #[test]
    fn square_system_invariant_is_enforced() {
        // two equations over three distinct unknowns
        let system = SystemOfEquations::from_equations(&[
            "x + y - z = 0",
            "x - y + z = 1",
        ])
        .unwrap();

        let got = system.jacobian();

        assert_eq!(
            got,
            Err(SystemError::UnderOrOverDetermined {
                equations: 2,
                unknowns: 3,
            })
        );
    }

    #[test]
    fn empty_systems_are_rejected() {
        let got = Jacobian::assemble(&[]);

        assert_eq!(
            got,
            Err(SystemError::UnderOrOverDetermined {
                equations: 0,
                unknowns: 0,
            })
        );
    }

    #[test]
    fn stray_variables_are_rejected() {
        let system = SystemOfEquations::from_equations(&[
            "x + y = 2",
            "x + z = 1",
        ])
        .unwrap();

        let got = system.jacobian();

        assert_eq!(
            got,
            Err(SystemError::VariableMismatch { name: "z".into() })
        );
    }

    #[test]
    fn domain_errors_become_structured_failures() {
        let system = SystemOfEquations::from_equations(&[
            "sqrt(x) + y = 0",
            "x - y = 1",
        ])
        .unwrap();
        let binding = Binding::new().with_value("x", -4.0);

        let got = system.jacobian_at(&binding);

        assert_eq!(
            got,
            Err(SystemError::DomainError {
                equation: 0,
                variable: "x".into(),
            })
        );
    }

    #[test]
    fn solve_a_linear_system_through_its_jacobian() {
        // J = [[1, -1], [1, 1]], so J*x = [0, 2] has x = (1, 1)
        let system = SystemOfEquations::from_equations(&[
            "x - y = 0",
            "x + y = 2",
        ])
        .unwrap();
        let jacobian = system.jacobian().unwrap();

        let got = jacobian.solve(&[0.0, 2.0]).unwrap();

        assert_relative_eq!(got[0], 1.0, epsilon = 1e-4);
        assert_relative_eq!(got[1], 1.0, epsilon = 1e-4);
    }

    #[test]
    fn inverting_the_jacobian_round_trips() {
        let system = SystemOfEquations::from_equations(&[
            "x - y = 0",
            "x + y = 2",
        ])
        .unwrap();
        let jacobian = system.jacobian().unwrap();

        let got = jacobian.inverted().unwrap();

        // [[1, -1], [1, 1]]^-1 = [[0.5, 0.5], [-0.5, 0.5]]
        assert_matrix_eq(
            &got,
            &[[0.5, 0.5].as_ref(), [-0.5, 0.5].as_ref()],
        );
    }
}
