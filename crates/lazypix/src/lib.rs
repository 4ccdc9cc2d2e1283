//! Visibility-aware image loading.
//!
//! Defers fetching an image until its surface is about to become visible in
//! a scrollable viewport, then preloads the target URL off-screen and swaps
//! it in, optionally falling back to an alternate source on failure. The
//! crate decides *when* to start a fetch and *what* to show as the result
//! resolves; it is not an asset pipeline and knows nothing about image
//! decoding or formats.
//!
//! # Example
//!
//! ```rust,ignore
//! let registry = ObserverRegistry::new(platform.clone());
//! let controller = ImageController::mount(
//!     registry,
//!     surface,
//!     ImageProps {
//!         src: Some("https://example.com/hero.jpg".into()),
//!         fallback: Some("https://example.com/hero-small.jpg".into()),
//!         width: 800u32.into(),
//!         height: 200u32.into(),
//!         ..ImageProps::default()
//!     },
//! );
//! ```

pub mod controller;
pub mod props;

pub use controller::{ImageController, LoadPhase};
pub use props::{EventCallback, ImageEvent, ImageEventKind, ImageProps, DEFAULT_ROOT_MARGIN};

pub use lazypix_core::placeholder::Dimension;
pub use lazypix_core::registry::{ObserverRegistry, Thresholds};
