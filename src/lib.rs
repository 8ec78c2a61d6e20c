//! # Drape
//!
//! Thread coordination core of an interactive map renderer.
//!
//! Drape takes high-frequency input on the caller thread (gestures,
//! location fixes, style and traffic updates) and fans it out, as ordered
//! messages, to two worker threads: one that uploads resources and one
//! that composes frames. The caller never blocks on steady-state
//! rendering; the few queries that need an answer wait on a one-shot
//! [`Blocker`] with a bounded timeout.
//!
//! ## Core Concepts
//!
//! - **Prioritized queues**: each worker drains High, then Normal, then Low
//! - **Closed message set**: every cross-thread command is a [`Message`] variant
//! - **User event queue**: gestures bypass the bus and are merged per frame
//! - **Fixed teardown order**: render thread first, then resource upload
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use drape::{Engine, EngineParams, MemorySettings, PointD};
//!
//! let params = EngineParams::new(1080, 1920, Arc::new(MemorySettings::new()));
//! let engine = Engine::new(params)?;
//!
//! engine.scale(2.0, PointD::new(540.0, 960.0), true);
//! let position = engine.get_my_position()?;
//! assert!(position.is_none());
//!
//! engine.shutdown();
//! # Ok::<(), drape::EngineError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod commutator;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod geometry;
pub mod gui;
pub mod message;
pub mod place_page;
pub mod renderer;
pub mod settings;

// Re-exports for convenience
pub use commutator::{MessageQueue, ThreadsCommutator};
pub use engine::{DrapeId, Engine, EngineConfig, EngineParams, Viewport};
pub use error::{EngineError, Result};
pub use geometry::{AnyRectD, PointD, RectD, TriangleD};
pub use message::{blocking_pair, Blocker, Message, MessageKind, Priority, Responder, ThreadId, UserEvent};
pub use place_page::{MapObject, MapObjectType, PlacePageInfo};
pub use renderer::{BackendStats, FrontendStats, Renderer, RendererThread};
pub use settings::{MemorySettings, SettingValue, SettingsStore};
