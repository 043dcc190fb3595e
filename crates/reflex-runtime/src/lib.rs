//! Reflex Runtime - Frame driver for the reflex core
//!
//! This crate wires the core pieces into a running world:
//! - [`EngineConfig`]: RON-loadable settings (frame order, step, allowed prototypes)
//! - [`Engine`]: owns the world tree, event bus, event queue and clock, and
//!   drives them one frame at a time
//!
//! ## Frame contract
//!
//! ```text
//! Engine::frame
//!  ├── clock += fixed step
//!  ├── deliver due events   (EventsFirst, the default)
//!  └── root ActionList pass (then events, with ActionsFirst)
//! ```
//!
//! Failures in either phase are collected in [`FrameReport::faults`] rather
//! than aborting the frame.

mod config;
mod engine;
mod error;

pub use config::{EngineConfig, FrameOrder};
pub use engine::{Engine, FrameReport, ACTIONS};
pub use error::{Error, Result};
