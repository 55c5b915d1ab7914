//! Similarity metrics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DoclensError;

/// How query vectors are compared with stored vectors.
///
/// Scores are always "higher is more similar".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    /// Cosine similarity. Vectors are normalized once at insert time so
    /// search reduces to a dot product.
    #[default]
    Cosine,
    /// Euclidean distance mapped to `1 / (1 + distance)`.
    L2,
}

impl SimilarityMetric {
    /// Bring a vector into the form stored in the index.
    pub fn prepare(&self, vector: &mut [f32]) {
        if let SimilarityMetric::Cosine = self {
            l2_normalize(vector);
        }
    }

    /// Score a prepared query against a prepared stored vector.
    pub fn score(&self, query: &[f32], stored: &[f32]) -> f32 {
        match self {
            SimilarityMetric::Cosine => dot(query, stored),
            SimilarityMetric::L2 => 1.0 / (1.0 + l2_distance(query, stored)),
        }
    }

    pub(crate) fn tag(&self) -> u32 {
        match self {
            SimilarityMetric::Cosine => 0,
            SimilarityMetric::L2 => 1,
        }
    }

    pub(crate) fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(SimilarityMetric::Cosine),
            1 => Some(SimilarityMetric::L2),
            _ => None,
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimilarityMetric::Cosine => f.write_str("cosine"),
            SimilarityMetric::L2 => f.write_str("l2"),
        }
    }
}

impl FromStr for SimilarityMetric {
    type Err = DoclensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(SimilarityMetric::Cosine),
            "l2" | "euclidean" => Ok(SimilarityMetric::L2),
            other => Err(DoclensError::config(format!(
                "unknown similarity metric '{other}' (expected cosine or l2)"
            ))),
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Scale a vector to unit length. Zero vectors are left unchanged.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Calculate cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product = dot(a, b);
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let v1 = vec![1.0, 0.0, 0.0];
        let v2 = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&v1, &v2) - 1.0).abs() < 0.001);

        let v3 = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&v1, &v3) - 0.0).abs() < 0.001);

        let v4 = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&v1, &v4) - (-1.0)).abs() < 0.001);
    }

    #[test]
    fn test_prepared_cosine_matches_direct() {
        let metric = SimilarityMetric::Cosine;
        let mut a = vec![3.0, 4.0];
        let mut b = vec![1.0, 2.0];
        let expected = cosine_similarity(&a, &b);

        metric.prepare(&mut a);
        metric.prepare(&mut b);
        assert!((metric.score(&a, &b) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_l2_score() {
        let metric = SimilarityMetric::L2;
        assert_eq!(metric.score(&[1.0, 1.0], &[1.0, 1.0]), 1.0);
        // distance 5 -> 1/6
        assert!((metric.score(&[0.0, 0.0], &[3.0, 4.0]) - 1.0 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_normalize() {
        let mut v = vec![0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }

    #[test]
    fn test_parse_and_tags() {
        assert_eq!("L2".parse::<SimilarityMetric>().unwrap(), SimilarityMetric::L2);
        assert!("manhattan".parse::<SimilarityMetric>().is_err());
        for metric in [SimilarityMetric::Cosine, SimilarityMetric::L2] {
            assert_eq!(SimilarityMetric::from_tag(metric.tag()), Some(metric));
        }
        assert_eq!(SimilarityMetric::from_tag(9), None);
    }
}
