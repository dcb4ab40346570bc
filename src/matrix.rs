//! A small dense matrix type and the Gauss-Jordan elimination used to
//! invert one.

use std::{
    error::Error,
    fmt::{self, Debug, Display, Formatter},
    ops::{Index, IndexMut},
};

/// A rows x columns grid of floats laid out sequentially in memory.
#[derive(Clone, PartialEq)]
pub struct Matrix {
    cells: Box<[f64]>,
    rows: usize,
    columns: usize,
}

impl Matrix {
    /// Create a new [`Matrix`] by invoking some `fn(row, column) -> f64`
    /// function for each cell.
    pub fn init<F>(rows: usize, columns: usize, mut get_cell: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        use std::convert::Infallible;

        Matrix::try_init::<_, Infallible>(rows, columns, |row, column| {
            Ok(get_cell(row, column))
        })
        .expect(
            "This can never fail, all error checking should be optimised away",
        )
    }

    /// A version of [`Matrix::init()`] which lets you initialize a matrix
    /// using a function which may fail.
    pub fn try_init<F, E>(
        rows: usize,
        columns: usize,
        mut get_cell: F,
    ) -> Result<Self, E>
    where
        F: FnMut(usize, usize) -> Result<f64, E>,
    {
        let mut cells = Vec::with_capacity(rows * columns);

        for row in 0..rows {
            for column in 0..columns {
                cells.push(get_cell(row, column)?);
            }
        }

        Ok(Matrix {
            cells: cells.into_boxed_slice(),
            rows,
            columns,
        })
    }

    /// The all-zeroes matrix.
    pub fn zeros(rows: usize, columns: usize) -> Self {
        Matrix::init(rows, columns, |_, _| 0.0)
    }

    /// The n x n identity matrix.
    pub fn identity(n: usize) -> Self {
        Matrix::init(n, n, |row, column| if row == column { 1.0 } else { 0.0 })
    }

    pub fn num_rows(&self) -> usize { self.rows }

    pub fn num_columns(&self) -> usize { self.columns }

    fn index_of(&self, row: usize, column: usize) -> usize {
        row * self.columns + column
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&f64> {
        if row < self.rows && column < self.columns {
            self.cells.get(self.index_of(row, column))
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, row: usize, column: usize) -> Option<&mut f64> {
        if row < self.rows && column < self.columns {
            let index = self.index_of(row, column);
            self.cells.get_mut(index)
        } else {
            None
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.cells.chunks_exact(self.columns)
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [f64]> + '_ {
        self.cells.chunks_exact_mut(self.columns)
    }

    /// The inverse, computed by reducing the augmented pair
    /// `(self | identity)`. The receiver is untouched.
    pub fn inverted(&self) -> Result<Matrix, SingularMatrix> {
        solve(self, &Matrix::identity(self.rows))
    }
}

impl Debug for Matrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rows()).finish()
    }
}

impl Display for Matrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "[")?;

        for row in self.rows() {
            write!(f, " [")?;
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", cell)?;
            }
            writeln!(f, "]")?;
        }

        write!(f, "]")
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (row, column): (usize, usize)) -> &Self::Output {
        assert!(row < self.rows, "Row index out of bounds");
        assert!(column < self.columns, "Column index out of bounds");

        self.get(row, column)
            .expect("We've already done bounds checks")
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, column): (usize, usize)) -> &mut f64 {
        assert!(row < self.rows, "Row index out of bounds");
        assert!(column < self.columns, "Column index out of bounds");

        self.get_mut(row, column)
            .expect("We've already done bounds checks")
    }
}

/// A read/write lens over two matrices sharing a row count, with the left
/// block aliasing `a` and the right block aliasing `b`.
///
/// The view borrows both matrices mutably for its whole lifetime, so it can
/// never outlive the storage it points into, and dropping it releases
/// nothing but the borrows themselves. Both matrices are independently
/// usable again afterwards.
#[derive(Debug)]
pub struct Augmented<'m> {
    left: &'m mut Matrix,
    right: &'m mut Matrix,
}

impl<'m> Augmented<'m> {
    /// Build the view.
    ///
    /// # Panics
    ///
    /// Panics if the two matrices have different row counts.
    pub fn new(left: &'m mut Matrix, right: &'m mut Matrix) -> Self {
        assert_eq!(
            left.rows, right.rows,
            "Augmented matrices must share a row count"
        );

        Augmented { left, right }
    }

    pub fn num_rows(&self) -> usize { self.left.rows }

    pub fn num_columns(&self) -> usize {
        self.left.columns + self.right.columns
    }

    pub fn cell(&self, row: usize, column: usize) -> f64 {
        if column < self.left.columns {
            self.left[(row, column)]
        } else {
            self.right[(row, column - self.left.columns)]
        }
    }

    pub fn cell_mut(&mut self, row: usize, column: usize) -> &mut f64 {
        if column < self.left.columns {
            &mut self.left[(row, column)]
        } else {
            &mut self.right[(row, column - self.left.columns)]
        }
    }

    /// Add `source` scaled by `coefficient` onto `target`, across both
    /// blocks.
    fn add_scaled_row(
        &mut self,
        target: usize,
        source: usize,
        coefficient: f64,
    ) {
        for column in 0..self.num_columns() {
            let delta = self.cell(source, column) * coefficient;
            *self.cell_mut(target, column) += delta;
        }
    }

    /// Zero everything below the diagonal, working from the top row down.
    fn forward_elimination(&mut self) {
        for pivot in 0..self.num_rows().saturating_sub(1) {
            let pivot_value = self.cell(pivot, pivot);

            for row in pivot + 1..self.num_rows() {
                let head = self.cell(row, pivot);
                self.add_scaled_row(row, pivot, -head / pivot_value);
            }
        }
    }

    /// Zero everything above the diagonal, working from the bottom row up.
    fn backward_elimination(&mut self) {
        for pivot in (1..self.num_rows()).rev() {
            let pivot_value = self.cell(pivot, pivot);

            for row in (0..pivot).rev() {
                let tail = self.cell(row, pivot);
                self.add_scaled_row(row, pivot, -tail / pivot_value);
            }
        }
    }

    /// Divide each row by its diagonal element so the left block becomes
    /// the identity.
    fn scale_diagonal(&mut self) {
        for row in 0..self.num_rows() {
            let scalar = self.cell(row, row);

            for column in 0..self.num_columns() {
                *self.cell_mut(row, column) /= scalar;
            }
        }
    }

    /// Gauss-Jordan reduction: forward elimination, backward elimination,
    /// then diagonal scaling.
    ///
    /// There is no pivoting or row swapping. A zero pivot divides through as
    /// NaN and keeps propagating; callers are expected to check the result
    /// for non-finite values.
    pub fn reduce(&mut self) {
        self.forward_elimination();
        self.backward_elimination();
        self.scale_diagonal();
    }
}

/// Row reduction hit a zero pivot and the result drowned in NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct SingularMatrix;

impl Display for SingularMatrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "The matrix is singular (zero pivot during reduction)")
    }
}

impl Error for SingularMatrix {}

/// Solve `a * x = rhs` for `x` by reducing the augmented pair `(a | rhs)`.
///
/// Both inputs are copied and the reduction happens on the copies. With no
/// pivoting, a singular (or unluckily ordered) system surfaces as non-finite
/// values in the reduced block and comes back as [`SingularMatrix`].
///
/// # Panics
///
/// Panics if `a` isn't square or `rhs` has a different number of rows.
pub fn solve(a: &Matrix, rhs: &Matrix) -> Result<Matrix, SingularMatrix> {
    assert_eq!(
        a.num_rows(),
        a.num_columns(),
        "Only square systems can be solved"
    );

    let mut left = a.clone();
    let mut right = rhs.clone();

    Augmented::new(&mut left, &mut right).reduce();

    if right.cells.iter().any(|cell| !cell.is_finite()) {
        return Err(SingularMatrix);
    }

    Ok(right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_matrix_eq(got: &Matrix, should_be: &[&[f64]]) {
        assert_eq!(got.num_rows(), should_be.len());

        for (row, should_be) in got.rows().zip(should_be) {
            assert_eq!(row.len(), should_be.len());

            for (value, should_be) in row.iter().zip(*should_be) {
                assert_relative_eq!(*value, *should_be, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn matrix_representation() {
        let matrix = Matrix::init(2, 3, |row, column| (row + column) as f64);
        let should_be = "[[0.0, 1.0, 2.0], [1.0, 2.0, 3.0]]";

        let got = format!("{:?}", matrix);

        assert_eq!(got, should_be);
    }

    #[test]
    fn identity_has_ones_down_the_diagonal() {
        let got = Matrix::identity(3);

        assert_matrix_eq(
            &got,
            &[
                [1.0, 0.0, 0.0].as_ref(),
                [0.0, 1.0, 0.0].as_ref(),
                [0.0, 0.0, 1.0].as_ref(),
            ],
        );
    }

    #[test]
    fn inverting_the_identity_is_a_no_op() {
        for n in 1..=5 {
            let identity = Matrix::identity(n);

            let got = identity.inverted().unwrap();

            assert_eq!(got, identity);
        }
    }

    #[test]
    fn invert_a_known_matrix() {
        let matrix = Matrix::init(2, 2, |row, column| {
            [[4.0, 7.0], [2.0, 6.0]][row][column]
        });

        let got = matrix.inverted().unwrap();

        assert_matrix_eq(
            &got,
            &[[0.6, -0.7].as_ref(), [-0.2, 0.4].as_ref()],
        );
    }

    #[test]
    fn inversion_leaves_the_original_alone() {
        let matrix = Matrix::init(2, 2, |row, column| {
            [[4.0, 7.0], [2.0, 6.0]][row][column]
        });
        let before = matrix.clone();

        let _ = matrix.inverted().unwrap();

        assert_eq!(matrix, before);
    }

    #[test]
    fn singular_matrices_are_reported() {
        let matrix = Matrix::init(2, 2, |_, _| 1.0);

        let got = matrix.inverted();

        assert_eq!(got, Err(SingularMatrix));
    }

    #[test]
    fn solve_a_diagonal_system() {
        let a = Matrix::init(2, 2, |row, column| {
            [[2.0, 0.0], [0.0, 4.0]][row][column]
        });
        let rhs = Matrix::init(2, 1, |row, _| [2.0, 8.0][row]);

        let got = solve(&a, &rhs).unwrap();

        assert_matrix_eq(&got, &[[1.0].as_ref(), [2.0].as_ref()]);
    }

    #[test]
    #[should_panic(expected = "share a row count")]
    fn augmenting_mismatched_row_counts_panics() {
        let mut a = Matrix::identity(2);
        let mut b = Matrix::zeros(3, 1);

        let _ = Augmented::new(&mut a, &mut b);
    }

    #[test]
    fn the_view_aliases_both_blocks() {
        let mut a = Matrix::zeros(2, 2);
        let mut b = Matrix::identity(2);

        {
            let mut view = Augmented::new(&mut a, &mut b);

            assert_eq!(view.num_columns(), 4);
            assert_eq!(view.cell(0, 2), 1.0);

            *view.cell_mut(0, 0) = 5.0;
            *view.cell_mut(1, 3) = 7.0;
        }

        // dropping the view must leave both matrices intact and usable
        assert_eq!(a[(0, 0)], 5.0);
        assert_eq!(b[(1, 1)], 7.0);
        assert_eq!(b[(0, 0)], 1.0);
    }
}
