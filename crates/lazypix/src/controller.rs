//! Per-instance load orchestration.
//!
//! [`ImageController`] owns everything one mounted image needs: the visible
//! surface, an off-screen preloader probe, a registration with the shared
//! observer cache, and the listener subscriptions tying them together. The
//! embedding framework calls [`mount`](ImageController::mount),
//! [`update`](ImageController::update) and
//! [`unmount`](ImageController::unmount); all other transitions are driven by
//! platform events.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use lazypix_core::placeholder::{overlay_background, placeholder_source};
use lazypix_core::platform::{ImageSurface, Subscription};
use lazypix_core::registry::{ObserverEntry, ObserverKey, ObserverRegistry};

use crate::props::{ImageEvent, ImageEventKind, ImageProps};

/// Where an instance currently sits in the load pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadPhase {
    /// Mounted, synthetic sizing placeholder shown, not yet observed.
    Idle,
    /// Registered with an observer entry, waiting for visibility.
    Observing,
    /// Threshold crossed once; the registration is gone (single-shot).
    Intersected,
    /// The probe is fetching the target URL.
    Preloading,
    /// Real source assigned to the visible surface, waiting for its load.
    Committed,
    /// Probe failed; the fallback URL is assigned to the visible surface.
    Fallback,
    /// Terminal success (target or fallback finished loading).
    Loaded,
}

struct Inner {
    registry: Rc<ObserverRegistry>,
    surface: Rc<dyn ImageSurface>,
    probe: Rc<dyn ImageSurface>,
    props: ImageProps,
    phase: LoadPhase,
    /// Entry currently observing the surface, if any.
    entry: Option<Rc<ObserverEntry>>,
    /// Background snapshot captured at the most recent intersection.
    /// `Some(None)` means "captured, and it was empty".
    preserved_background: Option<Option<String>>,
    probe_load: Option<Subscription>,
    probe_error: Option<Subscription>,
    surface_load: Option<Subscription>,
}

impl Inner {
    fn attach_probe_listeners(&mut self, weak: &Weak<RefCell<Inner>>) {
        // Fully detach before reattaching so rapid source changes cannot
        // accumulate duplicate listeners.
        self.detach_probe_listeners();
        let on_load = weak.clone();
        self.probe_load = Some(self.probe.subscribe_load(Rc::new(move || {
            ImageController::handle_probe_load(&on_load);
        })));
        let on_error = weak.clone();
        self.probe_error = Some(self.probe.subscribe_error(Rc::new(move || {
            ImageController::handle_probe_error(&on_error);
        })));
    }

    fn detach_probe_listeners(&mut self) {
        self.probe_load = None;
        self.probe_error = None;
    }

    fn observe(&mut self, weak: &Weak<RefCell<Inner>>) {
        let entry = self
            .registry
            .get(&self.props.root_margin, &self.props.thresholds);
        let on_intersection = weak.clone();
        entry.observe(self.surface.id(), move |ratio| {
            ImageController::handle_intersection(&on_intersection, ratio);
        });
        self.entry = Some(entry);
    }

    fn unobserve(&mut self) {
        let target = self.surface.id();
        if let Some(entry) = self.entry.take() {
            entry.unobserve(target);
        }
    }

    fn has_intersected(&self) -> bool {
        !matches!(self.phase, LoadPhase::Idle | LoadPhase::Observing)
    }
}

/// State machine for one mounted image instance.
pub struct ImageController {
    inner: Rc<RefCell<Inner>>,
}

impl ImageController {
    /// Mounts an instance on `surface`.
    ///
    /// Assigns the synthetic sizing placeholder, applies the `alt`/`style`
    /// pass-through, registers with the observer cache for the configured
    /// (margin, thresholds) pair, and attaches the probe listeners. No fetch
    /// starts until the surface crosses its visibility threshold.
    pub fn mount(
        registry: Rc<ObserverRegistry>,
        surface: Rc<dyn ImageSurface>,
        props: ImageProps,
    ) -> Self {
        let probe = registry.platform().create_probe();
        let inner = Rc::new(RefCell::new(Inner {
            registry,
            surface,
            probe,
            props,
            phase: LoadPhase::Idle,
            entry: None,
            preserved_background: None,
            probe_load: None,
            probe_error: None,
            surface_load: None,
        }));
        let weak = Rc::downgrade(&inner);
        {
            let mut state = inner.borrow_mut();
            let sizing = placeholder_source(&state.props.width, &state.props.height);
            state.surface.set_source(&sizing);
            let alt = state.props.alt.clone();
            state.surface.set_alt(&alt);
            if let Some(style) = state.props.style.clone() {
                state.surface.set_style(&style);
            }
            state.attach_probe_listeners(&weak);
            state.observe(&weak);
            state.phase = LoadPhase::Observing;
        }
        Self { inner }
    }

    /// Current phase, for embedding frameworks and tests.
    pub fn phase(&self) -> LoadPhase {
        self.inner.borrow().phase
    }

    /// Applies a new configuration snapshot, diffing against the previous.
    ///
    /// A changed `src` swaps the probe wiring; once the instance has
    /// intersected this restarts the preload cycle immediately, before that
    /// the eventual intersection simply picks up the new source. A changed
    /// (margin, thresholds) pair atomically moves the registration to the
    /// entry for the new configuration without touching load state.
    pub fn update(&self, new_props: ImageProps) {
        let weak = Rc::downgrade(&self.inner);
        let mut state = self.inner.borrow_mut();

        let src_changed = new_props.src != state.props.src;
        let alt_changed = new_props.alt != state.props.alt;
        let style_changed = new_props.style != state.props.style;
        let old_key = ObserverKey::new(&state.props.root_margin, &state.props.thresholds);
        let new_key = ObserverKey::new(&new_props.root_margin, &new_props.thresholds);
        state.props = new_props;

        if alt_changed {
            let alt = state.props.alt.clone();
            state.surface.set_alt(&alt);
        }
        if style_changed {
            if let Some(style) = state.props.style.clone() {
                state.surface.set_style(&style);
            }
        }

        if src_changed {
            state.detach_probe_listeners();
            if state.has_intersected() {
                if let Some(src) = state.props.src.clone() {
                    log::trace!("restarting preload for new source {:?}", src);
                    state.probe.set_source(&src);
                    state.phase = LoadPhase::Preloading;
                }
            }
            state.attach_probe_listeners(&weak);
        }

        if old_key != new_key {
            // Atomically moves the registration; if the old one already
            // fired, this is a fresh single-shot registration on the new
            // entry.
            state.unobserve();
            state.observe(&weak);
        }
    }

    /// Tears the instance down.
    ///
    /// Unobserves and drops every subscription synchronously; an in-flight
    /// fetch is not aborted at the network layer, but its completion finds no
    /// listeners and is therefore a no-op.
    pub fn unmount(&self) {
        let mut state = self.inner.borrow_mut();
        state.unobserve();
        state.detach_probe_listeners();
        state.surface_load = None;
    }

    fn handle_intersection(weak: &Weak<RefCell<Inner>>, ratio: f64) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let callback;
        let event;
        {
            let mut state = inner.borrow_mut();
            log::trace!(
                "surface {:?} intersected at ratio {ratio}",
                state.surface.id()
            );
            state.entry = None;
            state.phase = LoadPhase::Intersected;

            // Capture the background exactly once per crossing; the matching
            // restore happens when the committed image finishes loading.
            let snapshot = state.surface.background_image();
            if let Some(placeholder) = state.props.placeholder.clone() {
                let overlay = overlay_background(&placeholder, snapshot.as_deref());
                state.surface.set_background_image(Some(&overlay));
            }
            state.preserved_background = Some(snapshot);

            if let Some(src) = state.props.src.clone() {
                state.probe.set_source(&src);
                state.phase = LoadPhase::Preloading;
            }

            callback = state.props.on_intersection.clone();
            event = ImageEvent {
                kind: ImageEventKind::Intersection,
                target: state.surface.id(),
            };
        }
        callback.emit(&event);
    }

    fn handle_probe_load(weak: &Weak<RefCell<Inner>>) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let mut state = inner.borrow_mut();
        let Some(resolved) = state.probe.source() else {
            return;
        };
        // The target may have been retired while the probe was in flight; an
        // abandoned fetch must not reach the visible surface.
        if state.props.src.is_none() {
            log::trace!("probe resolved {:?} after source was retired", resolved);
            return;
        }
        let on_load = weak.clone();
        state.surface_load = Some(state.surface.subscribe_load(Rc::new(move || {
            ImageController::handle_surface_load(&on_load);
        })));
        state.surface.set_source(&resolved);
        state.phase = LoadPhase::Committed;
    }

    fn handle_probe_error(weak: &Weak<RefCell<Inner>>) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let mut state = inner.borrow_mut();
        let Some(fallback) = state.props.fallback.clone() else {
            // No fallback configured: the failure is absorbed, the surface
            // keeps whatever it is showing.
            log::debug!("probe failed and no fallback is configured");
            return;
        };
        let on_load = weak.clone();
        state.surface_load = Some(state.surface.subscribe_load(Rc::new(move || {
            ImageController::handle_surface_load(&on_load);
        })));
        state.surface.set_source(&fallback);
        state.phase = LoadPhase::Fallback;
    }

    fn handle_surface_load(weak: &Weak<RefCell<Inner>>) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let mut fired = Vec::new();
        {
            let mut state = inner.borrow_mut();
            // One-shot: the listener detaches itself.
            state.surface_load = None;

            if let Some(snapshot) = state.preserved_background.take() {
                state.surface.set_background_image(snapshot.as_deref());
            }

            let committed = state.surface.source();
            let target = state.surface.id();
            if committed.is_some() {
                // Independent equality checks select the callback; a commit
                // that matches neither the current target nor the fallback is
                // stale and dropped.
                if committed == state.props.src {
                    state.phase = LoadPhase::Loaded;
                    fired.push((
                        state.props.on_load.clone(),
                        ImageEvent {
                            kind: ImageEventKind::Load,
                            target,
                        },
                    ));
                }
                if committed == state.props.fallback {
                    state.phase = LoadPhase::Loaded;
                    fired.push((
                        state.props.on_fallback.clone(),
                        ImageEvent {
                            kind: ImageEventKind::Fallback,
                            target,
                        },
                    ));
                }
                if fired.is_empty() {
                    log::trace!("stale commit {:?} dropped", committed);
                }
            }
        }
        for (callback, event) in fired {
            callback.emit(&event);
        }
    }
}
