//! Sampling Pipeline
//!
//! ```text
//! every interval:
//!   perturb current telemetry -> publish -> Dispatcher::predict
//!     -> discard if stopped, else append to history + publish verdict
//! ```
//!
//! [`AppState`] is the single shared piece of mutable state; the HTTP layer
//! reads and edits the same instance.

mod state;
pub mod sampling_loop;

pub use sampling_loop::{perturb, SamplingLoop};
pub use state::*;
