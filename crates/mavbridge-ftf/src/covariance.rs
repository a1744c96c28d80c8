use nalgebra::{Matrix3, Matrix6, SMatrix, Vector6};
use serde::{Deserialize, Serialize};

/// Position of `(row, col)` in an upper-triangular row-major packing.
const fn packed_index(n: usize, row: usize, col: usize) -> usize {
    let (i, j) = if row <= col { (row, col) } else { (col, row) };
    i * (2 * n - i + 1) / 2 + (j - i)
}

fn pack<const N: usize>(matrix: &SMatrix<f64, N, N>, packed: &mut [f64]) {
    for i in 0..N {
        for j in i..N {
            packed[packed_index(N, i, j)] = 0.5 * (matrix[(i, j)] + matrix[(j, i)]);
        }
    }
}

fn unpack<const N: usize>(packed: &[f64]) -> SMatrix<f64, N, N> {
    SMatrix::from_fn(|i, j| packed[packed_index(N, i, j)])
}

fn pack_row_major<const N: usize>(values: &[f64], packed: &mut [f64]) {
    pack::<N>(&SMatrix::from_row_slice(values), packed);
}

fn to_row_major<const N: usize>(packed: &[f64], values: &mut [f64]) {
    for i in 0..N {
        for j in 0..N {
            values[i * N + j] = packed[packed_index(N, i, j)];
        }
    }
}

/// 3×3 symmetric covariance in packed form.
///
/// Entries are `[xx, xy, xz, yy, yz, zz]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Covariance3([f64; 6]);

impl Covariance3 {
    pub const fn new(packed: [f64; 6]) -> Self {
        Self(packed)
    }

    pub const fn from_diagonal(xx: f64, yy: f64, zz: f64) -> Self {
        Self([xx, 0.0, 0.0, yy, 0.0, zz])
    }

    /// Pack a full matrix. Off-diagonal pairs are averaged.
    pub fn from_matrix(matrix: &Matrix3<f64>) -> Self {
        let mut packed = [0.0; 6];
        pack(matrix, &mut packed);
        Self(packed)
    }

    pub fn to_matrix(&self) -> Matrix3<f64> {
        unpack(&self.0)
    }

    pub fn from_row_major(values: &[f64; 9]) -> Self {
        let mut packed = [0.0; 6];
        pack_row_major::<3>(values, &mut packed);
        Self(packed)
    }

    pub fn to_row_major(&self) -> [f64; 9] {
        let mut values = [0.0; 9];
        to_row_major::<3>(&self.0, &mut values);
        values
    }

    pub fn packed(&self) -> &[f64; 6] {
        &self.0
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.0[packed_index(3, row, col)]
    }

    pub fn trace(&self) -> f64 {
        self.0[0] + self.0[3] + self.0[5]
    }

    /// Similarity transform `R·C·Rᵗ`.
    pub fn rotated(&self, rotation: &Matrix3<f64>) -> Self {
        Self::from_matrix(&(rotation * self.to_matrix() * rotation.transpose()))
    }
}

/// 6×6 symmetric covariance in packed form (21 entries, upper triangle
/// row by row).
///
/// The usual layout is `[x, y, z, rot_x, rot_y, rot_z]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Covariance6([f64; 21]);

impl Default for Covariance6 {
    fn default() -> Self {
        Self([0.0; 21])
    }
}

impl Covariance6 {
    pub const fn new(packed: [f64; 21]) -> Self {
        Self(packed)
    }

    pub fn from_diagonal(diagonal: [f64; 6]) -> Self {
        Self::from_matrix(&Matrix6::from_diagonal(&Vector6::from(diagonal)))
    }

    /// Pack a full matrix. Off-diagonal pairs are averaged.
    pub fn from_matrix(matrix: &Matrix6<f64>) -> Self {
        let mut packed = [0.0; 21];
        pack(matrix, &mut packed);
        Self(packed)
    }

    pub fn to_matrix(&self) -> Matrix6<f64> {
        unpack(&self.0)
    }

    pub fn from_row_major(values: &[f64; 36]) -> Self {
        let mut packed = [0.0; 21];
        pack_row_major::<6>(values, &mut packed);
        Self(packed)
    }

    pub fn to_row_major(&self) -> [f64; 36] {
        let mut values = [0.0; 36];
        to_row_major::<6>(&self.0, &mut values);
        values
    }

    pub fn packed(&self) -> &[f64; 21] {
        &self.0
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.0[packed_index(6, row, col)]
    }

    pub fn trace(&self) -> f64 {
        (0..6).map(|i| self.get(i, i)).sum()
    }

    /// Similarity transform with `diag(R, R)`.
    ///
    /// Both 3×3 halves are rotated by the same `rotation` and no coupling
    /// between them is introduced. That is right when both halves are
    /// expressed in the frame being changed (position and rotation vector
    /// of the same body).
    pub fn rotated(&self, rotation: &Matrix3<f64>) -> Self {
        let mut block = Matrix6::<f64>::zeros();
        block.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
        block.fixed_view_mut::<3, 3>(3, 3).copy_from(rotation);
        Self::from_matrix(&(block * self.to_matrix() * block.transpose()))
    }
}
