//! Platform collaborator boundary.
//!
//! The embedding UI shell supplies the visibility-observer primitive and the
//! image surfaces (the rendered element plus off-screen preloader probes).
//! The core only talks to them through the traits here, so tests can swap in
//! deterministic fakes and the loader stays agnostic of the concrete host
//! (web DOM, desktop shell, test harness).

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

/// Identity of an image surface within its platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

/// A single intersection report delivered by the visibility primitive.
#[derive(Clone, Copy, Debug)]
pub struct IntersectionRecord {
    /// The surface whose visibility changed.
    pub target: SurfaceId,
    /// Fraction of the surface inside the viewport, in `0.0..=1.0`.
    pub ratio: f64,
}

/// Options handed to the platform when creating a visibility observer.
#[derive(Clone, Debug, PartialEq)]
pub struct ObserverOptions {
    /// Margin string applied around the scroll root, e.g. `"0px 0px 0px 0px"`.
    pub root_margin: String,
    /// Normalized intersection thresholds, in registration order.
    pub thresholds: SmallVec<[f64; 4]>,
}

/// Callback invoked by the platform with a batch of intersection reports.
pub type ObserverCallback = Rc<dyn Fn(&[IntersectionRecord])>;

/// An owned listener registration.
///
/// Dropping the value detaches the listener; this is what makes teardown
/// symmetric — whoever holds the subscription owns the wiring, and replacing
/// it always removes the old listener before the new one can fire.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Creates a subscription whose teardown runs `cancel` exactly once.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Detaches the listener immediately.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// A visibility observer bound to one (margin, thresholds) configuration.
///
/// Observing an already-observed target and unobserving an unknown target are
/// both no-ops at this level; dedup and single-shot semantics live above, in
/// the registry's entries.
pub trait VisibilityObserver {
    fn observe(&self, target: SurfaceId);
    fn unobserve(&self, target: SurfaceId);
}

/// The rendered image element, or an off-screen preloader probe.
///
/// `load`/`error` events must be delivered asynchronously with respect to
/// [`set_source`](ImageSurface::set_source): a platform that completed a
/// fetch synchronously (e.g. from cache) still reports it on a later turn of
/// the event loop. The loader relies on this to keep its own state borrows
/// short.
pub trait ImageSurface {
    /// Stable identity used for observer registration.
    fn id(&self) -> SurfaceId;

    /// Currently assigned source URL, if any.
    fn source(&self) -> Option<String>;

    /// Assigns the source URL, starting a fetch on real platforms.
    fn set_source(&self, url: &str);

    /// Current `background-image` style value, if any.
    fn background_image(&self) -> Option<String>;

    /// Replaces the `background-image` style value; `None` clears it.
    fn set_background_image(&self, value: Option<&str>);

    /// Pass-through for the alternative text of the rendered element.
    fn set_alt(&self, alt: &str);

    /// Pass-through for inline style text on the rendered element.
    fn set_style(&self, style: &str);

    /// Attaches a load listener; detached when the subscription drops.
    fn subscribe_load(&self, listener: Rc<dyn Fn()>) -> Subscription;

    /// Attaches an error listener; detached when the subscription drops.
    fn subscribe_error(&self, listener: Rc<dyn Fn()>) -> Subscription;
}

/// Factory seam implemented by the embedding platform.
pub trait ImagePlatform {
    /// Creates a visibility observer for the given configuration.
    ///
    /// Called once per distinct configuration by the registry; the observer
    /// is shared across every image instance using that configuration.
    fn create_observer(
        &self,
        options: ObserverOptions,
        callback: ObserverCallback,
    ) -> Rc<dyn VisibilityObserver>;

    /// Creates an off-screen probe surface for preloading.
    fn create_probe(&self) -> Rc<dyn ImageSurface>;
}
