use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

/// Max-score weights of one diagnostic question, keyed by competency code.
///
/// Codes without an entry weigh zero, so the number of tracked competencies
/// is whatever the catalog holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompetencyWeights {
    by_code: HashMap<String, i32>,
}

impl CompetencyWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, code: &str, weight: i32) -> Self {
        self.insert(code, weight);
        self
    }

    pub fn insert(&mut self, code: &str, weight: i32) {
        self.by_code.insert(code.to_string(), weight);
    }

    pub fn weight_for(&self, code: &str) -> i32 {
        self.by_code.get(code).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

impl FromIterator<(String, i32)> for CompetencyWeights {
    fn from_iter<T: IntoIterator<Item = (String, i32)>>(iter: T) -> Self {
        Self {
            by_code: iter.into_iter().collect(),
        }
    }
}

/// Read-only weight tables linking source entities to competencies.
///
/// A missing mapping is `None` (or an empty weight map), never an error.
#[async_trait]
pub trait WeightResolver: Send + Sync {
    async fn question_weights(&self, question_id: Uuid) -> Result<CompetencyWeights>;

    async fn course_weight(&self, offering_id: Uuid, competency_id: Uuid) -> Result<Option<i32>>;

    async fn extracurricular_weight(
        &self,
        offering_id: Uuid,
        competency_id: Uuid,
    ) -> Result<Option<i32>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_code_weighs_zero() {
        let weights = CompetencyWeights::new().with("C1", 3).with("C4", 1);
        assert_eq!(weights.weight_for("C1"), 3);
        assert_eq!(weights.weight_for("C4"), 1);
        assert_eq!(weights.weight_for("C2"), 0);
        assert_eq!(weights.weight_for("C7"), 0);
    }

    #[test]
    fn collects_from_rows() {
        let rows = vec![("C1".to_string(), 2), ("C2".to_string(), 5)];
        let weights: CompetencyWeights = rows.into_iter().collect();
        assert_eq!(weights.weight_for("C2"), 5);
        assert!(!weights.is_empty());
    }
}
