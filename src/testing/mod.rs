//! Headless testing helpers: Pilot, snapshot rendering.
//!
//! Use the [`Pilot`] to drive a [`Host`](crate::host::Host) step by step.
//! Use [`render_to_string`] and [`render_composed`] to capture a subtree as
//! markup for snapshot-style assertions.

pub mod pilot;
pub mod snapshot;

pub use pilot::Pilot;
pub use snapshot::{render_composed, render_to_string};
