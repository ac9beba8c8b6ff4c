//! Vector math for embeddings

/// Dot product of two embedding vectors
///
/// For L2-normalized vectors this is the cosine similarity, in [-1.0, 1.0].
///
/// # Panics
/// Panics if vectors have different dimensions
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(
        a.len(),
        b.len(),
        "Vectors must have same dimension: {} vs {}",
        a.len(),
        b.len()
    );

    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// L2 normalize a vector in place
///
/// Zero vectors are left unchanged.
pub fn l2_normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm == 0.0 {
        return;
    }

    for x in vec.iter_mut() {
        *x /= norm;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dot_identical_unit_vectors() {
        let mut a = vec![1.0, 2.0, 3.0];
        l2_normalize(&mut a);
        assert_relative_eq!(dot_product(&a, &a), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_dot_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert_relative_eq!(dot_product(&a, &b), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_dot_opposite_unit_vectors() {
        let mut a = vec![1.0, 2.0, 3.0];
        let mut b = vec![-1.0, -2.0, -3.0];
        l2_normalize(&mut a);
        l2_normalize(&mut b);
        assert_relative_eq!(dot_product(&a, &b), -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert_relative_eq!(v[0], 0.6, epsilon = 1e-6);
        assert_relative_eq!(v[1], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector() {
        let mut v = vec![0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "Vectors must have same dimension")]
    fn test_dot_different_dimensions() {
        dot_product(&[1.0, 2.0], &[1.0, 2.0, 3.0]);
    }
}
