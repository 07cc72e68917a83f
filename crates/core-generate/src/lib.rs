//! Generation loop for Artois.
//!
//! Exposed Components:
//! - `GenerationController`: owns the single generation task, the remaining
//!   counter and the per-request settings.
//! - `ContextBuffer`: the shared editable text, read before every request.
//! - `RemainingCounter`: generations left; zero means stop.
//! - `batch`: batch-size control mapping.
//! - `GenerationParams`: free-form parameters forwarded with each request.

pub mod batch;
pub mod controller;
mod params;
mod shared;

pub use batch::{MAX_STEP, MIN_STEP, batch_size_to_slider, slider_to_batch_size};
pub use controller::{GenerateStart, GenerationController, GenerationSettings, GenerationStatus};
pub use params::GenerationParams;
pub use shared::{ContextBuffer, RemainingCounter};
