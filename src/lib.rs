//! Veteran Pool Engine
//!
//! Bounded per-faction storage for actors that leave an active simulation
//! area: capture them instead of discarding, hand them back when the host
//! asks for a new actor, and age, mutate and eventually retire them in a
//! yearly maintenance cycle.

pub mod actor;
pub mod catalog;
pub mod error;
pub mod hooks;
pub mod persistence;
pub mod pool;
pub mod queue;
pub mod seen;
pub mod settings;
pub mod systems;

pub use actor::{ActorId, FactionDirectory, FactionId, Record, TechLevel};
pub use catalog::Catalog;
pub use error::PoolError;
pub use hooks::{HostBridge, NoopBridge};
pub use pool::{CaptureOutcome, TickReport, VeteranPool};
pub use queue::IntakeQueue;
pub use seen::SeenTracker;
pub use settings::PoolSettings;
pub use systems::{GenerationRequest, run_yearly_cycle};
