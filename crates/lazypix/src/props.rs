//! Image instance configuration.

use std::fmt;
use std::rc::Rc;

use lazypix_core::placeholder::Dimension;
use lazypix_core::platform::SurfaceId;
use lazypix_core::registry::Thresholds;

/// Default visibility margin: no expansion of the scroll root.
pub const DEFAULT_ROOT_MARGIN: &str = "0px 0px 0px 0px";

/// Which lifecycle moment an [`ImageEvent`] reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageEventKind {
    /// The surface crossed its visibility threshold.
    Intersection,
    /// The originally-requested source finished loading.
    Load,
    /// The fallback source finished loading.
    Fallback,
}

/// Payload delivered to image callbacks.
#[derive(Clone, Copy, Debug)]
pub struct ImageEvent {
    pub kind: ImageEventKind,
    pub target: SurfaceId,
}

/// Cloneable callback slot; defaults to a no-op.
#[derive(Clone)]
pub struct EventCallback(Rc<dyn Fn(&ImageEvent)>);

impl EventCallback {
    pub fn new(callback: impl Fn(&ImageEvent) + 'static) -> Self {
        Self(Rc::new(callback))
    }

    pub fn noop() -> Self {
        Self(Rc::new(|_| {}))
    }

    pub fn emit(&self, event: &ImageEvent) {
        (self.0)(event);
    }
}

impl Default for EventCallback {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for EventCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventCallback")
    }
}

/// Configuration snapshot for one image instance.
///
/// The embedding framework hands a fresh snapshot to
/// [`ImageController::update`](crate::ImageController::update) whenever any
/// option changes; the controller diffs snapshots and applies explicit
/// transitions, it never re-evaluates reactively.
#[derive(Clone, Debug)]
pub struct ImageProps {
    /// Target URL to preload and then commit.
    pub src: Option<String>,
    /// URL committed if preloading `src` fails.
    pub fallback: Option<String>,
    /// URL overlaid as a background while the target is pending.
    pub placeholder: Option<String>,
    /// Intrinsic width encoded into the synthetic sizing placeholder.
    pub width: Dimension,
    /// Intrinsic height encoded into the synthetic sizing placeholder.
    pub height: Dimension,
    /// Visibility margin string.
    pub root_margin: String,
    /// Intersection thresholds.
    pub thresholds: Thresholds,
    /// Alternative text passed through to the rendered surface.
    pub alt: String,
    /// Inline style text passed through to the rendered surface.
    pub style: Option<String>,
    /// Fired once per visibility crossing.
    pub on_intersection: EventCallback,
    /// Fired when the originally-requested source finishes loading.
    pub on_load: EventCallback,
    /// Fired when the fallback source finishes loading.
    pub on_fallback: EventCallback,
}

impl Default for ImageProps {
    fn default() -> Self {
        Self {
            src: None,
            fallback: None,
            placeholder: None,
            width: Dimension::default(),
            height: Dimension::default(),
            root_margin: DEFAULT_ROOT_MARGIN.to_owned(),
            thresholds: Thresholds::default(),
            alt: String::new(),
            style: None,
            on_intersection: EventCallback::noop(),
            on_load: EventCallback::noop(),
            on_fallback: EventCallback::noop(),
        }
    }
}
