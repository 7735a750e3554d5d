use ndarray::{Array1, ArrayView1, ArrayView2};

pub struct MatrixHelper;

impl MatrixHelper {
    pub fn determinant3(m: ArrayView2<f64>) -> f64 {
        m[[0, 0]] * (m[[1, 1]] * m[[2, 2]] - m[[1, 2]] * m[[2, 1]])
            - m[[0, 1]] * (m[[1, 0]] * m[[2, 2]] - m[[1, 2]] * m[[2, 0]])
            + m[[0, 2]] * (m[[1, 0]] * m[[2, 1]] - m[[1, 1]] * m[[2, 0]])
    }

    /// Solves a 3x3 system by Cramer's rule. `None` when the matrix is
    /// (numerically) singular.
    pub fn solve3(a: ArrayView2<f64>, b: ArrayView1<f64>) -> Option<Array1<f64>> {
        let det = Self::determinant3(a);
        let scale = a.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if scale == 0.0 || det.abs() <= 1e-12 * scale.powi(3) {
            return None;
        }
        let mut solution = Array1::zeros(3);
        for col in 0..3 {
            let mut replaced = a.to_owned();
            replaced.column_mut(col).assign(&b);
            solution[col] = Self::determinant3(replaced.view()) / det;
        }
        Some(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    #[test]
    fn determinant_of_identity_is_one() {
        let eye: Array2<f64> = Array2::eye(3);
        assert_eq!(MatrixHelper::determinant3(eye.view()), 1.0);
    }

    #[test]
    fn solve3_recovers_known_solution() {
        let a = array![[2.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 4.0]];
        let x = array![1.0, -2.0, 0.5];
        let b = a.dot(&x);
        let solved = MatrixHelper::solve3(a.view(), b.view()).unwrap();
        for (got, want) in solved.iter().zip(x.iter()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-12);
        }
    }

    #[test]
    fn solve3_rejects_singular_matrix() {
        let a = array![[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 1.0, 1.0]];
        let b = array![1.0, 2.0, 3.0];
        assert!(MatrixHelper::solve3(a.view(), b.view()).is_none());
    }
}
