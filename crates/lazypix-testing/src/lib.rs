//! Testing utilities for lazypix.
//!
//! Provides deterministic fakes for the platform seam and a small test rule
//! for mounting controllers and driving intersection/load/error events by
//! hand.

mod fake;
mod rule;

pub use fake::{FakeImage, FakeObserver, FakePlatform};
pub use rule::{CallCount, ImageTestRule, MountedImage};
