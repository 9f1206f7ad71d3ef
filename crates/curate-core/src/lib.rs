//! curate-core library.
//!
//! A phase/tag workflow engine for curating image collections. Each image
//! carries a YAML-fronted sidecar holding its tags, category and transcription;
//! phases select images by tag predicates and track what is left to do.

pub mod category;
pub mod config;
pub mod discover;
pub mod error;
pub mod item;
pub mod lock;
pub mod organizer;
pub mod phase;
pub mod recent;
pub mod session;
pub mod sidecar;
pub mod tag;

/// # Conventions
///
/// - **Errors**: engine operations return [`error::Result`]; configuration
///   loading uses `anyhow::Result`.
/// - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).
pub use organizer::{ActionInput, Notification, Organizer, StepOutcome};

pub use error::{ErrorCode, OrganizeError};
pub use item::ItemId;
pub use phase::PhaseId;
pub use tag::SignedTag;
