//! Matrix and vector arithmetic over the BLS12-381 scalar field.
//!
//! The dual-matrix construction needs a random invertible matrix, its
//! determinant and its inverse; everything here is Gaussian elimination over
//! `Fr` (O(n^3), and n is 4 in this crate).

use ark_bls12_381::Fr;
use ark_ff::{Field, One, UniformRand, Zero};
use rand::Rng;

use crate::error::{EplqError, Result};

/// Field inversion with the zero case surfaced as an error instead of a
/// panic.
pub fn inv(x: Fr) -> Result<Fr> {
    x.inverse()
        .ok_or(EplqError::Arithmetic("inversion of zero field element"))
}

/// Embed a signed integer into `Fr` (negative values map to `q - |x|`).
pub fn i64_to_field(x: i64) -> Fr {
    if x >= 0 {
        Fr::from(x as u64)
    } else {
        -Fr::from(x.unsigned_abs())
    }
}

/// Embed a signed 128-bit integer into `Fr`.
pub fn i128_to_field(x: i128) -> Fr {
    if x >= 0 {
        Fr::from(x as u128)
    } else {
        -Fr::from(x.unsigned_abs())
    }
}

pub fn field_inner_product(x: &[Fr], y: &[Fr]) -> Fr {
    debug_assert_eq!(x.len(), y.len());
    x.iter().zip(y.iter()).map(|(a, b)| *a * *b).sum()
}

/// Sample a uniformly random invertible matrix from GL_n(Fr).
///
/// Rejection sampling: a random matrix over a 255-bit field is singular with
/// negligible probability, so the loop all but never repeats.
pub fn random_invertible_matrix<R: Rng>(n: usize, rng: &mut R) -> Vec<Vec<Fr>> {
    loop {
        let matrix: Vec<Vec<Fr>> = (0..n)
            .map(|_| (0..n).map(|_| Fr::rand(rng)).collect())
            .collect();
        if !determinant(&matrix).is_zero() {
            return matrix;
        }
    }
}

/// Determinant by Gaussian elimination with partial pivoting.
pub fn determinant(matrix: &[Vec<Fr>]) -> Fr {
    let n = matrix.len();
    if n == 1 {
        return matrix[0][0];
    }
    if n == 2 {
        return matrix[0][0] * matrix[1][1] - matrix[0][1] * matrix[1][0];
    }

    let mut m = matrix.to_vec();
    let mut det = Fr::one();

    for i in 0..n {
        // Find a non-zero pivot below the diagonal.
        let mut pivot = i;
        for k in i..n {
            if !m[k][i].is_zero() {
                pivot = k;
                break;
            }
        }
        if pivot != i {
            m.swap(i, pivot);
            det = -det;
        }
        if m[i][i].is_zero() {
            return Fr::zero();
        }
        det *= m[i][i];

        let pivot_row = m[i].clone();
        let inv_pivot = pivot_row[i].inverse().expect("pivot checked non-zero");
        for row in m.iter_mut().skip(i + 1) {
            let factor = row[i] * inv_pivot;
            if !factor.is_zero() {
                for j in i..n {
                    row[j] -= factor * pivot_row[j];
                }
            }
        }
    }

    det
}

/// Matrix inverse by Gauss-Jordan elimination. Fails with an arithmetic
/// error on a singular input.
pub fn inverse(matrix: &[Vec<Fr>]) -> Result<Vec<Vec<Fr>>> {
    let n = matrix.len();
    let mut aug = vec![vec![Fr::zero(); 2 * n]; n];

    for i in 0..n {
        aug[i][..n].copy_from_slice(&matrix[i]);
        aug[i][n + i] = Fr::one();
    }

    for i in 0..n {
        let mut pivot = i;
        for j in i..n {
            if !aug[j][i].is_zero() {
                pivot = j;
                break;
            }
        }
        if pivot != i {
            aug.swap(i, pivot);
        }
        if aug[i][i].is_zero() {
            return Err(EplqError::Arithmetic("singular matrix"));
        }

        let pivot_inv = inv(aug[i][i])?;
        for j in 0..(2 * n) {
            aug[i][j] *= pivot_inv;
        }
        let pivot_row = aug[i].clone();

        for (j, row) in aug.iter_mut().enumerate() {
            if j == i || row[i].is_zero() {
                continue;
            }
            let factor = row[i];
            for k in 0..(2 * n) {
                row[k] -= factor * pivot_row[k];
            }
        }
    }

    Ok(aug.into_iter().map(|row| row[n..].to_vec()).collect())
}

pub fn transpose(matrix: &[Vec<Fr>]) -> Vec<Vec<Fr>> {
    let n = matrix.len();
    let mut t = vec![vec![Fr::zero(); n]; n];
    for i in 0..n {
        for j in 0..n {
            t[j][i] = matrix[i][j];
        }
    }
    t
}

pub fn scalar_mult(matrix: &[Vec<Fr>], scalar: Fr) -> Vec<Vec<Fr>> {
    matrix
        .iter()
        .map(|row| row.iter().map(|&v| v * scalar).collect())
        .collect()
}

/// Row vector times matrix: `result[j] = sum_i x[i] * m[i][j]`.
pub fn row_times_matrix(x: &[Fr], matrix: &[Vec<Fr>]) -> Vec<Fr> {
    let n = matrix.len();
    debug_assert_eq!(x.len(), n);
    let mut result = vec![Fr::zero(); n];
    for j in 0..n {
        for i in 0..n {
            result[j] += x[i] * matrix[i][j];
        }
    }
    result
}

/// Embed the scalar field's modulus-aware representation back into a small
/// signed integer, if it fits. Used by tests to sanity-check encodings.
#[cfg(test)]
pub fn field_to_i128(x: Fr) -> Option<i128> {
    use ark_ff::PrimeField;
    let big = x.into_bigint();
    let limbs = big.0;
    if limbs[2] == 0 && limbs[3] == 0 {
        return Some(((limbs[1] as u128) << 64 | limbs[0] as u128) as i128);
    }
    let neg = (-x).into_bigint().0;
    if neg[2] == 0 && neg[3] == 0 {
        return Some(-(((neg[1] as u128) << 64 | neg[0] as u128) as i128));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn inverse_times_matrix_is_identity() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 4;
        let m = random_invertible_matrix(n, &mut rng);
        let m_inv = inverse(&m).unwrap();

        for i in 0..n {
            for j in 0..n {
                let mut acc = Fr::zero();
                for k in 0..n {
                    acc += m[i][k] * m_inv[k][j];
                }
                let expected = if i == j { Fr::one() } else { Fr::zero() };
                assert_eq!(acc, expected);
            }
        }
    }

    #[test]
    fn dual_matrix_orthogonality() {
        // B * (det(B) * (B^-1)^T)^T = det(B) * I, the relation the scheme
        // relies on for aggregated inner products.
        let mut rng = StdRng::seed_from_u64(11);
        let n = 4;
        let b = random_invertible_matrix(n, &mut rng);
        let det_b = determinant(&b);
        let b_star = scalar_mult(&transpose(&inverse(&b).unwrap()), det_b);

        let x: Vec<Fr> = (0..n).map(|i| Fr::from(i as u64 + 2)).collect();
        let y: Vec<Fr> = (0..n).map(|i| Fr::from(3 * i as u64 + 1)).collect();

        let xb = row_times_matrix(&x, &b);
        let yb_star = row_times_matrix(&y, &b_star);
        assert_eq!(
            field_inner_product(&xb, &yb_star),
            det_b * field_inner_product(&x, &y)
        );
    }

    #[test]
    fn singular_matrix_is_rejected() {
        let m = vec![
            vec![Fr::from(1u64), Fr::from(2u64)],
            vec![Fr::from(2u64), Fr::from(4u64)],
        ];
        assert!(matches!(
            inverse(&m),
            Err(crate::error::EplqError::Arithmetic(_))
        ));
        assert!(determinant(&m).is_zero());
    }

    #[test]
    fn signed_embedding() {
        assert_eq!(i64_to_field(-3) + Fr::from(3u64), Fr::zero());
        assert_eq!(i128_to_field(5), Fr::from(5u64));
        assert_eq!(field_to_i128(i128_to_field(-42)), Some(-42));
    }

    #[test]
    fn zero_inversion_fails() {
        assert!(inv(Fr::zero()).is_err());
        assert_eq!(inv(Fr::from(2u64)).unwrap() * Fr::from(2u64), Fr::one());
    }
}
