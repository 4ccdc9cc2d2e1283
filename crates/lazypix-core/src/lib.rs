//! Core building blocks for visibility-deferred image loading.
//!
//! This crate holds everything below the per-instance controller: the
//! platform seam ([`platform`]), the shared observer cache ([`registry`]),
//! and the sizing-placeholder helpers ([`placeholder`]). It is UI-framework
//! agnostic; an embedding shell implements [`platform::ImagePlatform`] and
//! the controller crate drives the rest.

pub mod placeholder;
pub mod platform;
pub mod registry;

pub use placeholder::{overlay_background, placeholder_source, Dimension};
pub use platform::{
    ImagePlatform, ImageSurface, IntersectionRecord, ObserverCallback, ObserverOptions,
    Subscription, SurfaceId, VisibilityObserver,
};
pub use registry::{
    canonical_thresholds, normalize_thresholds, ObserverEntry, ObserverKey, ObserverRegistry,
    Thresholds,
};
