//! Engine configuration - frame ordering, step length and allowed prototypes
//!
//! Configuration is plain serde data, usually loaded from RON:
//!
//! ```ron
//! (
//!     frame_order: ActionsFirst,
//!     fixed_step_ms: 33,
//!     prototypes: ["ActionList", "ActionIncrement"],
//! )
//! ```
//!
//! Missing fields take their defaults.

use crate::error::Result;
use reflex_core::{Error as CoreError, Factory};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Order of the two phases of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FrameOrder {
    /// Deliver due events, then run the action tree
    ///
    /// Arguments delivered in a frame are visible to that frame's actions.
    #[default]
    EventsFirst,
    /// Run the action tree, then deliver due events
    ActionsFirst,
}

/// Configuration for an [`Engine`](crate::Engine)
///
/// # Example
///
/// ```
/// use reflex_runtime::{EngineConfig, FrameOrder};
///
/// let config = EngineConfig::from_ron_str("(fixed_step_ms: 33)").unwrap();
/// assert_eq!(config.frame_order(), FrameOrder::EventsFirst);
/// assert_eq!(config.fixed_step().as_millis(), 33);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    frame_order: FrameOrder,
    /// Game time added by each frame, in milliseconds
    fixed_step_ms: u64,
    /// Factory classes the engine may instantiate; empty allows every built-in
    prototypes: Vec<String>,
}

impl EngineConfig {
    /// Parse a configuration from RON text
    pub fn from_ron_str(content: &str) -> Result<Self> {
        let config: EngineConfig = ron::from_str(content)?;
        info!(
            frame_order = ?config.frame_order,
            fixed_step_ms = config.fixed_step_ms,
            prototypes = config.prototypes.len(),
            "engine configuration loaded"
        );
        Ok(config)
    }

    /// Load a configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_ron_str(&content)
    }

    /// Set the order of a frame's two phases
    pub fn with_frame_order(mut self, frame_order: FrameOrder) -> Self {
        self.frame_order = frame_order;
        self
    }

    /// Set the game time each frame adds, in milliseconds
    pub fn with_fixed_step_ms(mut self, fixed_step_ms: u64) -> Self {
        self.fixed_step_ms = fixed_step_ms;
        self
    }

    /// Limit spawning to the named built-in classes
    pub fn with_prototypes<I, S>(mut self, prototypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prototypes = prototypes.into_iter().map(Into::into).collect();
        self
    }

    /// Get the order of a frame's two phases
    pub fn frame_order(&self) -> FrameOrder {
        self.frame_order
    }

    /// Get the game time each frame adds
    pub fn fixed_step(&self) -> Duration {
        Duration::from_millis(self.fixed_step_ms)
    }

    /// Get the allowed classes; empty allows every built-in
    pub fn prototypes(&self) -> &[String] {
        &self.prototypes
    }

    /// Build the factory this configuration allows
    ///
    /// Fails if the allowlist names a class that is not built in.
    pub fn factory(&self) -> Result<Factory> {
        let mut factory = Factory::with_builtins();
        if self.prototypes.is_empty() {
            return Ok(factory);
        }
        if let Some(unknown) = self.prototypes.iter().find(|name| !factory.contains(name)) {
            return Err(CoreError::UnknownPrototype(unknown.clone()).into());
        }
        factory.retain(&self.prototypes);
        Ok(factory)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_order: FrameOrder::EventsFirst,
            fixed_step_ms: 16,
            prototypes: Vec::new(),
        }
    }
}
