/// Configuration for the graph attacher
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttacherConfig {
    /// Fail with `CycleDetected` when a node's `(type, identity)` already
    /// appears among its own ancestors.
    ///
    /// Off by default: such nodes are followed like any other.
    #[serde(default)]
    pub detect_cycles: bool,

    /// Maximum number of nodes on any root-to-leaf path, root included
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl AttacherConfig {
    pub fn with_cycle_detection(mut self) -> Self {
        self.detect_cycles = true;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth == Some(0) {
            return Err("max_depth must be greater than 0".to_string());
        }

        Ok(())
    }
}
