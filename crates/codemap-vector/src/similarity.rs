/// Cosine similarity of two vectors; 0 when lengths differ or either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn orthogonal_parallel_and_opposite() {
        assert_relative_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]), 0.0);
        assert_relative_eq!(cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]), 1.0, epsilon = 1e-6);
        assert_relative_eq!(cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]), -1.0, epsilon = 1e-6);
        assert_relative_eq!(
            cosine_similarity(&[1.0, 0.0], &[1.0, 1.0]),
            std::f32::consts::FRAC_1_SQRT_2,
            epsilon = 1e-6
        );
    }

    #[test]
    fn degenerate_inputs_score_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn similarity_is_symmetric() {
        let pairs: [(&[f32], &[f32]); 3] = [
            (&[0.3, -1.2, 4.0], &[2.5, 0.1, -0.7]),
            (&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]),
            (&[0.0, 0.0, 1.0], &[5.0, 0.0, 0.0]),
        ];
        for (a, b) in pairs {
            assert_relative_eq!(cosine_similarity(a, b), cosine_similarity(b, a));
        }
    }
}
