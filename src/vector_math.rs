use ndarray::ArrayView1;

use crate::core::errors::ApiError;

/// Cosine similarity in [-1, 1]. Zero-norm inputs score 0 rather than NaN.
pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, ApiError> {
    if query.is_empty() || candidate.is_empty() {
        return Err(ApiError::internal("Vectors must not be empty"));
    }
    if query.len() != candidate.len() {
        return Err(ApiError::Internal(format!(
            "Vector length mismatch: {} != {}",
            query.len(),
            candidate.len()
        )));
    }

    let query_view = ArrayView1::from(query);
    let candidate_view = ArrayView1::from(candidate);

    let query_norm = l2_norm(&query_view);
    let candidate_norm = l2_norm(&candidate_view);
    if query_norm < f32::MIN_POSITIVE || candidate_norm < f32::MIN_POSITIVE {
        return Ok(0.0);
    }

    // Divide by each norm separately so tiny magnitudes do not underflow.
    let dot = query_view.dot(&candidate_view);
    Ok((dot / query_norm / candidate_norm).clamp(-1.0, 1.0))
}

fn l2_norm(view: &ArrayView1<'_, f32>) -> f32 {
    view.dot(view).sqrt()
}
