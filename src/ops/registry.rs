//! Name-based operation registry.
//!
//! Maps stable operation names to factory closures so callers (the CLI, a
//! batch driver) can build block operations from parsed parameters without
//! knowing the concrete types. Insertion order is preserved for listings.

use crate::core::error::ConfigError;
use crate::core::types::{Connectivity, Scalar};
use crate::ops::{BlockOp, DoubleThresholdOp, EdgeTrackOp, GradientOp, GrowOp, ThresholdOp};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Parameter bag consumed by registry factories.
///
/// Each operation reads the fields it cares about and validates them at
/// build time; unused fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpParams {
    /// Color that seeds growth ("grow").
    pub source_color: f64,
    /// Color consumed by growth ("grow").
    pub target_color: f64,
    /// Lower threshold ("threshold", "doublethreshold", "gradientclassify").
    pub lower: f64,
    /// Upper threshold ("doublethreshold", "gradientclassify").
    pub upper: f64,
    /// Gaussian scale ("gradientclassify").
    pub sigma: f64,
    /// Neighborhood for growth.
    pub connectivity: Connectivity,
}

impl Default for OpParams {
    fn default() -> Self {
        Self {
            source_color: 2.0,
            target_color: 1.0,
            lower: 0.0,
            upper: 0.0,
            sigma: 1.0,
            connectivity: Connectivity::Nearest,
        }
    }
}

type BuilderFn<T> = Box<dyn Fn(&OpParams) -> Result<Box<dyn BlockOp<T>>, ConfigError> + Send + Sync>;

struct RegistryEntry<T: Scalar> {
    description: String,
    builder: BuilderFn<T>,
}

/// Registry of block operations buildable by name.
pub struct OpRegistry<T: Scalar> {
    entries: IndexMap<String, RegistryEntry<T>>,
}

impl<T: Scalar> OpRegistry<T> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// A registry pre-populated with the built-in operations.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register(
            "grow",
            "grow source-colored regions into target-colored pixels",
            |p| Ok(Box::new(GrowOp::new(p.source_color, p.target_color, p.connectivity)?)),
        );
        reg.register(
            "threshold",
            "set pixels above the lower threshold to 1, others to 0",
            |p| Ok(Box::new(ThresholdOp::new(p.lower))),
        );
        reg.register(
            "doublethreshold",
            "classify pixels into 0/1/2 by two thresholds",
            |p| Ok(Box::new(DoubleThresholdOp::new(p.lower, p.upper)?)),
        );
        reg.register(
            "gradientclassify",
            "Gaussian-derivative gradient magnitude classified by two thresholds",
            |p| Ok(Box::new(GradientOp::new(p.sigma, p.lower, p.upper)?)),
        );
        reg.register(
            "edgetrack",
            "promote weak edge pixels connected to strong ones",
            |_| Ok(Box::new(EdgeTrackOp)),
        );
        reg
    }

    /// Register a named operation factory.
    pub fn register<F>(&mut self, name: &str, description: &str, builder: F)
    where
        F: Fn(&OpParams) -> Result<Box<dyn BlockOp<T>>, ConfigError> + Send + Sync + 'static,
    {
        self.entries.insert(
            name.to_string(),
            RegistryEntry {
                description: description.to_string(),
                builder: Box::new(builder),
            },
        );
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Human-readable description of one operation.
    pub fn description(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|e| e.description.as_str())
    }

    /// Build a named operation from parameters.
    pub fn build(&self, name: &str, params: &OpParams) -> Result<Box<dyn BlockOp<T>>, ConfigError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ConfigError::UnknownOperation {
                name: name.to_string(),
            })?;
        (entry.builder)(params)
    }
}

impl<T: Scalar> Default for OpRegistry<T> {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_present_in_order() {
        let reg: OpRegistry<u8> = OpRegistry::with_builtins();
        assert_eq!(
            reg.names(),
            vec!["grow", "threshold", "doublethreshold", "gradientclassify", "edgetrack"]
        );
        assert!(reg.description("grow").unwrap().contains("grow"));
    }

    #[test]
    fn test_build_validates_params() {
        let reg: OpRegistry<u8> = OpRegistry::with_builtins();
        let mut params = OpParams::default();
        let op = reg.build("grow", &params).unwrap();
        assert_eq!(op.name(), "grow");

        params.source_color = 1.0;
        params.target_color = 1.0;
        assert!(matches!(
            reg.build("grow", &params),
            Err(ConfigError::IdenticalColors { .. })
        ));
    }

    #[test]
    fn test_unknown_name() {
        let reg: OpRegistry<u16> = OpRegistry::with_builtins();
        assert!(matches!(
            reg.build("missing", &OpParams::default()),
            Err(ConfigError::UnknownOperation { .. })
        ));
    }
}
