use std::fmt;
use std::ops::Index;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::rng::RandomSource;

static MATRIX_OPS: AtomicUsize = AtomicUsize::new(0);

pub fn reset_matrix_ops() {
    MATRIX_OPS.store(0, Ordering::SeqCst);
}

pub fn matrix_ops_count() -> usize {
    MATRIX_OPS.load(Ordering::SeqCst)
}

pub(crate) fn inc_ops() {
    MATRIX_OPS.fetch_add(1, Ordering::SeqCst);
}

/// Dense row-major matrix of `f64`.
///
/// The shape is fixed at construction and both dimensions are at least one.
/// Element `(r, c)` lives at flat index `r * cols + c`.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Zero-filled matrix. Fails with `InvalidDimension` if either dimension
    /// is zero.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidDimension { rows, cols });
        }
        Ok(Matrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        })
    }

    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidDimension { rows, cols });
        }
        if data.len() != rows * cols {
            return Err(Error::SizeMismatch {
                expected: rows * cols,
                actual: data.len(),
            });
        }
        Ok(Matrix { rows, cols, data })
    }

    pub fn filled(value: f64, rows: usize, cols: usize) -> Result<Self> {
        let mut m = Matrix::new(rows, cols)?;
        m.data.fill(value);
        Ok(m)
    }

    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        Matrix::new(rows, cols)
    }

    pub fn ones(rows: usize, cols: usize) -> Result<Self> {
        Matrix::filled(1.0, rows, cols)
    }

    /// Matrix with entries drawn uniformly from `[min, max)`.
    pub fn uniform(
        min: f64,
        max: f64,
        rows: usize,
        cols: usize,
        rng: &mut dyn RandomSource,
    ) -> Result<Self> {
        if !(min < max) {
            return Err(Error::InvalidRange(format!(
                "min {min} must be less than max {max}"
            )));
        }
        let mut m = Matrix::new(rows, cols)?;
        for v in m.data.iter_mut() {
            *v = rng.uniform_range(min, max);
        }
        Ok(m)
    }

    /// Matrix with normally distributed entries.
    pub fn normal(
        mean: f64,
        std_dev: f64,
        rows: usize,
        cols: usize,
        rng: &mut dyn RandomSource,
    ) -> Result<Self> {
        if !(std_dev > 0.0) {
            return Err(Error::InvalidRange(format!(
                "standard deviation {std_dev} must be positive"
            )));
        }
        let mut m = Matrix::new(rows, cols)?;
        for v in m.data.iter_mut() {
            *v = rng.normal(mean, std_dev);
        }
        Ok(m)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; a matrix holds at least one element.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    fn flat_index(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.rows {
            return Err(Error::IndexOutOfRange(format!(
                "row {row} outside 0..{}",
                self.rows
            )));
        }
        if col >= self.cols {
            return Err(Error::IndexOutOfRange(format!(
                "column {col} outside 0..{}",
                self.cols
            )));
        }
        Ok(row * self.cols + col)
    }

    pub fn get(&self, index: usize) -> Result<f64> {
        self.data.get(index).copied().ok_or_else(|| {
            Error::IndexOutOfRange(format!("index {index} outside 0..{}", self.data.len()))
        })
    }

    pub fn get_at(&self, row: usize, col: usize) -> Result<f64> {
        let idx = self.flat_index(row, col)?;
        Ok(self.data[idx])
    }

    pub fn set(&mut self, index: usize, value: f64) -> Result<()> {
        let len = self.data.len();
        let slot = self.data.get_mut(index).ok_or_else(|| {
            Error::IndexOutOfRange(format!("index {index} outside 0..{len}"))
        })?;
        *slot = value;
        Ok(())
    }

    pub fn set_at(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let idx = self.flat_index(row, col)?;
        self.data[idx] = value;
        Ok(())
    }

    /// Copy `count` consecutive rows starting at `start`.
    pub fn slice_rows(&self, start: usize, count: usize) -> Result<Matrix> {
        if count < 1 {
            return Err(Error::InvalidRange(format!(
                "row count {count} must be at least 1"
            )));
        }
        if start >= self.rows {
            return Err(Error::InvalidRange(format!(
                "start row {start} outside 0..{}",
                self.rows
            )));
        }
        if !self.can_slice_rows(start, count) {
            return Err(Error::InvalidRange(format!(
                "{count} rows from {start} exceed {} rows",
                self.rows
            )));
        }
        let begin = start * self.cols;
        let end = begin + count * self.cols;
        Matrix::from_vec(count, self.cols, self.data[begin..end].to_vec())
    }

    /// Non-failing check with the same bounds as [`Matrix::slice_rows`].
    pub fn can_slice_rows(&self, start: usize, count: usize) -> bool {
        count >= 1
            && start
                .checked_add(count)
                .map_or(false, |end| end <= self.rows)
    }

    pub fn matmul(&self, other: &Matrix) -> Result<Matrix> {
        inc_ops();
        if self.cols != other.rows {
            return Err(Error::ShapeMismatch(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        let mut out = vec![0.0; self.rows * other.cols];
        for i in 0..self.rows {
            let a_row = &self.data[i * self.cols..(i + 1) * self.cols];
            let out_row = &mut out[i * other.cols..(i + 1) * other.cols];
            for (k, &a_val) in a_row.iter().enumerate() {
                let b_row = &other.data[k * other.cols..(k + 1) * other.cols];
                for (o, &b_val) in out_row.iter_mut().zip(b_row) {
                    *o += a_val * b_val;
                }
            }
        }
        Matrix::from_vec(self.rows, other.cols, out)
    }

    pub fn transpose(&self) -> Matrix {
        inc_ops();
        let mut v = vec![0.0; self.rows * self.cols];
        for i in 0..self.rows {
            for j in 0..self.cols {
                v[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        Matrix {
            rows: self.cols,
            cols: self.rows,
            data: v,
        }
    }

    /// 1x1 matrix holding the mean of every element.
    pub fn average(&self) -> Matrix {
        let mean = self.data.iter().sum::<f64>() / self.data.len() as f64;
        Matrix {
            rows: 1,
            cols: 1,
            data: vec![mean],
        }
    }

    /// Flat index of the largest element (first one on ties).
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, &v) in self.data.iter().enumerate() {
            if v > self.data[best] {
                best = i;
            }
        }
        best
    }

    pub fn map<F>(&self, f: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        inc_ops();
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    /// Combine two matrices element by element.
    ///
    /// Only the total element counts have to agree: operands are paired by
    /// flat index and the result takes the shape of `first`, so a 3x2 and a
    /// 2x3 operand combine positionally.
    pub fn zip_map<F>(first: &Matrix, second: &Matrix, f: F) -> Result<Matrix>
    where
        F: Fn(f64, f64) -> f64,
    {
        inc_ops();
        if first.len() != second.len() {
            return Err(Error::ShapeMismatch(format!(
                "{}x{} and {}x{} differ in element count",
                first.rows, first.cols, second.rows, second.cols
            )));
        }
        let data = first
            .data
            .iter()
            .zip(&second.data)
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(Matrix {
            rows: first.rows,
            cols: first.cols,
            data,
        })
    }

    /// Three-operand form of [`Matrix::zip_map`] with the same count-only
    /// compatibility rule.
    pub fn zip3_map<F>(first: &Matrix, second: &Matrix, third: &Matrix, f: F) -> Result<Matrix>
    where
        F: Fn(f64, f64, f64) -> f64,
    {
        inc_ops();
        if first.len() != second.len() || second.len() != third.len() {
            return Err(Error::ShapeMismatch(format!(
                "{}x{}, {}x{} and {}x{} differ in element count",
                first.rows, first.cols, second.rows, second.cols, third.rows, third.cols
            )));
        }
        let data = first
            .data
            .iter()
            .zip(&second.data)
            .zip(&third.data)
            .map(|((&a, &b), &c)| f(a, b, c))
            .collect();
        Ok(Matrix {
            rows: first.rows,
            cols: first.cols,
            data,
        })
    }

    /// Shuffle rows in place with a backward Fisher-Yates scan.
    pub fn shuffle_rows(&mut self, rng: &mut dyn RandomSource) {
        for i in (1..self.rows).rev() {
            let j = rng.uniform_int(0, i + 1);
            if j != i {
                self.swap_rows(i, j);
            }
        }
    }

    fn swap_rows(&mut self, r1: usize, r2: usize) {
        for c in 0..self.cols {
            self.data.swap(r1 * self.cols + c, r2 * self.cols + c);
        }
    }
}

impl Index<usize> for Matrix {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.data[index]
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        assert!(row < self.rows && col < self.cols, "({row}, {col}) out of bounds");
        &self.data[row * self.cols + col]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const MAX_SHOWN: usize = 5;
        write!(f, "{} by {} : ", self.rows, self.cols)?;
        for (i, v) in self.data.iter().take(MAX_SHOWN).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}
