//! Designer configuration.

use crate::{GraphError, Result};
use serde::{Deserialize, Serialize};

/// Rule for choosing which edge of an accepted candidate is rewired to a
/// newly inserted vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtendSchema {
    /// Replace the candidate's highest-weight edge.
    #[default]
    ReplaceWorst,
    /// Replace the edge minimizing
    /// `(d(new, candidate) + d(new, neighbor)) - w(candidate, neighbor)`.
    MinimizeDistortion,
}

/// Hyperparameters of the [`GraphDesigner`](crate::GraphDesigner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignerConfig {
    /// Candidate pool size when inserting a vertex.
    /// Default: 2 * edges_per_vertex
    pub extend_k: usize,

    /// Radius slack of the insertion search.
    /// Default: 0.2
    pub extend_eps: f32,

    /// Edge replacement rule on insertion.
    /// Default: ReplaceWorst
    pub extend_schema: ExtendSchema,

    /// Search size of the edge improvement, 0 disables improvement.
    /// Default: edges_per_vertex
    pub improve_k: usize,

    /// Radius slack of the edge improvement searches.
    /// Default: 0.001
    pub improve_eps: f32,

    /// Maximum number of swap steps of a single edge improvement.
    /// Default: 5
    pub max_path_length: usize,

    /// Random edge improvement attempts after every build step.
    /// Default: 0
    pub swap_tries: u32,

    /// Attempts granted back for every successful random improvement.
    /// Default: 0
    pub additional_swap_tries: u32,

    /// Improve the edges created while repairing a removal.
    /// Default: true
    pub improve_after_remove: bool,

    /// Seed of the designer's random number generator.
    /// Default: 7
    pub seed: u64,
}

impl DesignerConfig {
    /// Defaults derived from the graph degree.
    pub fn for_degree(edges_per_vertex: usize) -> Self {
        Self {
            extend_k: edges_per_vertex * 2,
            extend_eps: 0.2,
            extend_schema: ExtendSchema::ReplaceWorst,
            improve_k: edges_per_vertex,
            improve_eps: 0.001,
            max_path_length: 5,
            swap_tries: 0,
            additional_swap_tries: 0,
            improve_after_remove: true,
            seed: 7,
        }
    }

    pub fn with_extend_schema(mut self, schema: ExtendSchema) -> Self {
        self.extend_schema = schema;
        self
    }

    pub fn with_swap_tries(mut self, swap_tries: u32, additional_swap_tries: u32) -> Self {
        self.swap_tries = swap_tries;
        self.additional_swap_tries = additional_swap_tries;
        self
    }

    /// Disable the edge improvement entirely.
    pub fn without_improvement(mut self) -> Self {
        self.improve_k = 0;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check the configuration against a graph degree.
    pub fn validate(&self, edges_per_vertex: usize) -> Result<()> {
        if edges_per_vertex == 0 || edges_per_vertex % 2 != 0 {
            return Err(GraphError::InvalidConfig(format!(
                "edges per vertex must be even and positive, got {}",
                edges_per_vertex
            )));
        }
        if self.extend_k < edges_per_vertex {
            return Err(GraphError::InvalidConfig(format!(
                "extend_k ({}) must be at least edges per vertex ({})",
                self.extend_k, edges_per_vertex
            )));
        }
        for (name, eps) in [
            ("extend_eps", self.extend_eps),
            ("improve_eps", self.improve_eps),
        ] {
            if !eps.is_finite() || eps < 0.0 {
                return Err(GraphError::InvalidConfig(format!(
                    "{} must be finite and non-negative, got {}",
                    name, eps
                )));
            }
        }
        if self.improve_k > 0 && self.max_path_length == 0 {
            return Err(GraphError::InvalidConfig(
                "max_path_length must be positive when improvement is enabled".into(),
            ));
        }
        Ok(())
    }
}

impl Default for DesignerConfig {
    fn default() -> Self {
        Self::for_degree(30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DesignerConfig::for_degree(4);
        assert_eq!(config.extend_k, 8);
        assert_eq!(config.improve_k, 4);
        assert_eq!(config.max_path_length, 5);
        assert_eq!(config.seed, 7);
        assert_eq!(config.extend_schema, ExtendSchema::ReplaceWorst);
        assert!(config.validate(4).is_ok());
    }

    #[test]
    fn test_validate() {
        let config = DesignerConfig::for_degree(4);
        assert!(matches!(config.validate(5), Err(GraphError::InvalidConfig(_))));
        assert!(matches!(config.validate(16), Err(GraphError::InvalidConfig(_))));

        let mut bad = config.clone();
        bad.improve_eps = f32::NAN;
        assert!(bad.validate(4).is_err());

        let mut bad = config;
        bad.max_path_length = 0;
        assert!(bad.validate(4).is_err());
        assert!(bad.without_improvement().validate(4).is_ok());
    }

    #[test]
    fn test_serde_partial() {
        let config: DesignerConfig =
            serde_json::from_str(r#"{"extend_k": 12, "extend_schema": "MinimizeDistortion"}"#)
                .unwrap();
        assert_eq!(config.extend_k, 12);
        assert_eq!(config.extend_schema, ExtendSchema::MinimizeDistortion);
        assert_eq!(config.improve_eps, 0.001);

        let json = serde_json::to_string(&config).unwrap();
        let back: DesignerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
