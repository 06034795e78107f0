//! Matrix engine over GF(2^8)
//!
//! Builds the systematic generator matrices used by the encoder and inverts
//! square matrices by Gauss-Jordan elimination.
//!
//! Both generator constructions are MDS: any `d` rows of the `(d+p) × d`
//! matrix are linearly independent, so any `d` surviving shards suffice.

use super::error::{Result, RsError};
use super::galois::{gf_exp, gf_inv, mul_table_row};

/// Generator matrix construction method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Construction {
    /// Vandermonde matrix reduced to systematic form
    #[default]
    Vandermonde,
    /// Cauchy matrix below an identity block
    Cauchy,
}

/// Dense row-major matrix of field elements
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<u8>,
}

impl Matrix {
    /// Create a new zero matrix
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0; rows * cols],
        }
    }

    pub fn identity(size: usize) -> Self {
        let mut matrix = Self::new(size, size);
        for i in 0..size {
            matrix.set(i, i, 1);
        }
        matrix
    }

    /// Build from row slices; all rows must share one length
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(RsError::MatrixShape {
                    rows: index,
                    cols: row.len(),
                    reason: "row length differs from the first row",
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// `rows × cols` Vandermonde matrix: entry `(i, j)` is `i^j`
    pub fn vandermonde(rows: usize, cols: usize) -> Self {
        let mut matrix = Self::new(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                matrix.set(i, j, gf_exp(i as u8, j));
            }
        }
        matrix
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        self.data[row * self.cols + col] = value;
    }

    #[inline]
    pub fn row(&self, row: usize) -> &[u8] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    #[inline]
    fn row_mut(&mut self, row: usize) -> &mut [u8] {
        &mut self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Flat row-major view
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn is_identity(&self) -> bool {
        self.rows == self.cols
            && (0..self.rows).all(|i| (0..self.cols).all(|j| self.get(i, j) == (i == j) as u8))
    }

    /// Matrix product `self × rhs`
    pub fn mul(&self, rhs: &Matrix) -> Result<Matrix> {
        if self.cols != rhs.rows {
            return Err(RsError::MatrixShape {
                rows: rhs.rows,
                cols: rhs.cols,
                reason: "right operand rows must equal left operand columns",
            });
        }
        let mut out = Matrix::new(self.rows, rhs.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let factor = self.get(i, k);
                if factor == 0 {
                    continue;
                }
                let mul_row = mul_table_row(factor);
                let rhs_row = rhs.row(k);
                for (dst, &src) in out.row_mut(i).iter_mut().zip(rhs_row) {
                    *dst ^= mul_row[src as usize];
                }
            }
        }
        Ok(out)
    }

    /// New matrix made of the selected rows, in the given order
    pub fn sub_matrix_rows(&self, rows: &[usize]) -> Result<Matrix> {
        let mut data = Vec::with_capacity(rows.len() * self.cols);
        for &row in rows {
            if row >= self.rows {
                return Err(RsError::InvalidIndex {
                    index: row,
                    reason: "row outside matrix",
                });
            }
            data.extend_from_slice(self.row(row));
        }
        Ok(Matrix {
            rows: rows.len(),
            cols: self.cols,
            data,
        })
    }

    /// Invert a square matrix by Gauss-Jordan elimination on `[M | I]`
    pub fn invert(&self) -> Result<Matrix> {
        if self.rows != self.cols {
            return Err(RsError::MatrixShape {
                rows: self.rows,
                cols: self.cols,
                reason: "inversion needs a square matrix",
            });
        }
        let n = self.rows;
        let width = 2 * n;

        let mut work = vec![0u8; n * width];
        for i in 0..n {
            work[i * width..i * width + n].copy_from_slice(self.row(i));
            work[i * width + n + i] = 1;
        }

        for pivot in 0..n {
            if work[pivot * width + pivot] == 0 {
                let swap = (pivot + 1..n)
                    .find(|&r| work[r * width + pivot] != 0)
                    .ok_or(RsError::SingularMatrix)?;
                for col in 0..width {
                    work.swap(pivot * width + col, swap * width + col);
                }
            }

            let pivot_val = work[pivot * width + pivot];
            if pivot_val != 1 {
                let scale = gf_inv(pivot_val).ok_or(RsError::SingularMatrix)?;
                let scale_row = mul_table_row(scale);
                for v in &mut work[pivot * width..(pivot + 1) * width] {
                    *v = scale_row[*v as usize];
                }
            }

            for row in 0..n {
                if row == pivot {
                    continue;
                }
                let factor = work[row * width + pivot];
                if factor == 0 {
                    continue;
                }
                let factor_row = mul_table_row(factor);
                for col in 0..width {
                    let p = work[pivot * width + col];
                    work[row * width + col] ^= factor_row[p as usize];
                }
            }
        }

        let mut inverse = Matrix::new(n, n);
        for i in 0..n {
            inverse
                .row_mut(i)
                .copy_from_slice(&work[i * width + n..(i + 1) * width]);
        }
        Ok(inverse)
    }
}

/// Systematic `(d+p) × d` generator from a Vandermonde matrix
///
/// The raw Vandermonde matrix is right-multiplied by the inverse of its top
/// `d × d` block, which turns that block into the identity while keeping
/// every `d`-row subset invertible.
pub fn gen_enc_matrix_vandermonde(data_shards: usize, parity_shards: usize) -> Result<Matrix> {
    let total = data_shards + parity_shards;
    let vand = Matrix::vandermonde(total, data_shards);
    let top: Vec<usize> = (0..data_shards).collect();
    let top_inverse = vand.sub_matrix_rows(&top)?.invert()?;
    vand.mul(&top_inverse)
}

/// Systematic `(d+p) × d` generator with a Cauchy parity block
///
/// Parity row `i` (`d <= i < d+p`), column `j` holds `1 / (i ^ j)`. Row and
/// column index sets are disjoint, so no entry divides by zero.
pub fn gen_enc_matrix_cauchy(data_shards: usize, parity_shards: usize) -> Matrix {
    let total = data_shards + parity_shards;
    let mut matrix = Matrix::new(total, data_shards);
    for i in 0..data_shards {
        matrix.set(i, i, 1);
    }
    for i in data_shards..total {
        for j in 0..data_shards {
            // j < data_shards <= i, so i ^ j is never zero
            debug_assert_ne!(i, j);
            let entry = gf_inv((i ^ j) as u8).unwrap_or_default();
            matrix.set(i, j, entry);
        }
    }
    matrix
}

/// Build the generator for the requested construction
pub fn gen_enc_matrix(
    data_shards: usize,
    parity_shards: usize,
    construction: Construction,
) -> Result<Matrix> {
    match construction {
        Construction::Vandermonde => gen_enc_matrix_vandermonde(data_shards, parity_shards),
        Construction::Cauchy => Ok(gen_enc_matrix_cauchy(data_shards, parity_shards)),
    }
}
