//! Randomized truncated SVD
//!
//! Seeded subspace iteration: project onto a random basis, refine with
//! `n_iter` power iterations, then solve the small problem exactly with an
//! eigen-decomposition of `B·Bᵀ`. The dense kernels come from nalgebra.

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const OVERSAMPLES: usize = 10;
const SINGULAR_TOLERANCE: f64 = 1e-7;

/// `A ≈ u · diag(singular_values) · vt`
#[derive(Debug, Clone)]
pub struct TruncatedSvd {
    pub u: Array2<f64>,
    pub singular_values: Array1<f64>,
    pub vt: Array2<f64>,
}

pub fn randomized_svd(a: &Array2<f64>, rank: usize, n_iter: usize, seed: u64) -> TruncatedSvd {
    let (m, n) = a.dim();
    let rank = rank.min(m).min(n);
    if rank == 0 {
        return TruncatedSvd {
            u: Array2::zeros((m, 0)),
            singular_values: Array1::zeros(0),
            vt: Array2::zeros((0, n)),
        };
    }

    let sketch = (rank + OVERSAMPLES).min(m).min(n);
    let mut rng = StdRng::seed_from_u64(seed);
    let omega = Array2::from_shape_fn((n, sketch), |_| rng.gen_range(-1.0..1.0));

    let mut q = orthonormalize(a.dot(&omega));
    for _ in 0..n_iter {
        let z = orthonormalize(a.t().dot(&q));
        q = orthonormalize(a.dot(&z));
    }

    let b = q.t().dot(a);
    let (eigenvalues, w) = symmetric_eigen(b.dot(&b.t()));

    let largest = eigenvalues
        .iter()
        .copied()
        .fold(0.0f64, f64::max)
        .sqrt();
    let cutoff = SINGULAR_TOLERANCE * largest.max(1.0);

    let mut u = Array2::<f64>::zeros((m, rank));
    let mut singular_values = Array1::<f64>::zeros(rank);
    let mut vt = Array2::<f64>::zeros((rank, n));
    for i in 0..rank {
        let sigma = eigenvalues[i].max(0.0).sqrt();
        if sigma <= cutoff {
            continue;
        }
        let wi = w.column(i);
        u.column_mut(i).assign(&q.dot(&wi));
        vt.row_mut(i).assign(&(b.t().dot(&wi) / sigma));
        singular_values[i] = sigma;
    }

    TruncatedSvd {
        u,
        singular_values,
        vt,
    }
}

fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    let (rows, cols) = a.dim();
    DMatrix::from_fn(rows, cols, |i, j| a[[i, j]])
}

fn to_array(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn(m.shape(), |(i, j)| m[(i, j)])
}

/// Orthonormal basis for the column space of `y` (thin Householder QR).
fn orthonormalize(y: Array2<f64>) -> Array2<f64> {
    to_array(&to_dmatrix(&y).qr().q())
}

/// Eigen-decomposition of a symmetric matrix, eigenvalues descending with
/// their eigenvectors as columns.
fn symmetric_eigen(a: Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let eigen = SymmetricEigen::new(to_dmatrix(&a));
    let n = eigen.eigenvalues.len();

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        eigen.eigenvalues[j]
            .total_cmp(&eigen.eigenvalues[i])
            .then_with(|| i.cmp(&j))
    });

    let eigenvalues = Array1::from_iter(order.iter().map(|&i| eigen.eigenvalues[i]));
    let vectors = Array2::from_shape_fn((n, n), |(row, col)| {
        eigen.eigenvectors[(row, order[col])]
    });

    (eigenvalues, vectors)
}
