//! Mutation-to-event observer for pipelines.
//!
//! Attaches to a [`pipewatch_core::Pipeline`] and turns every subsequent
//! node creation and mutation into a [`ChangeEvent`], delivered in exact
//! mutation order on an [`EventStream`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use pipewatch_core::Pipeline;
//! use pipewatch_observe::{ChangeObserver, ObserverConfig};
//!
//! let mut pipeline = Pipeline::new();
//! let (observer, events) = ChangeObserver::attach(&mut pipeline, &ObserverConfig::default())?;
//!
//! let input = pipeline.create("first-input", &[])?;
//! let node = pipeline.create("node", &[input.id()])?;
//! node.set_opcode("renamed");
//!
//! observer.finish().await;
//! let log = events.collect().await;
//! ```
//!
//! Events reference nodes by [`Handle`], a permanent integer allocated the
//! first time the observer sees a node, either at its creation or when it is
//! first referenced from a list.

mod config;
mod error;
mod event;
mod observer;
mod record;
mod registry;
mod stream;
mod translate;

pub use config::{AttachStrategy, ObserverConfig, ATTACH_ENV};
pub use error::ObserveError;
pub use event::ChangeEvent;
pub use observer::{ChangeObserver, ObserverPhase};
pub use record::{parse_script, record, to_json_lines};
pub use registry::{Handle, IdentityRegistry};
pub use stream::EventStream;
