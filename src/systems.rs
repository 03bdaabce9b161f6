//! Pool systems - run against the veteran pool from the tick loop

pub mod aging;
pub mod dispatch;
pub mod mutation;

pub use aging::run_yearly_cycle;
pub use dispatch::{try_get_veteran, GenerationRequest};
