//! Deterministic fakes for the platform seam.
//!
//! [`FakePlatform`] records every observer and probe it creates so tests can
//! reach them; [`FakeObserver`] lets a test deliver intersection reports by
//! hand; [`FakeImage`] is a scriptable surface whose load/error events fire
//! only when the test says so.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use lazypix_core::platform::{
    ImagePlatform, ImageSurface, IntersectionRecord, ObserverCallback, ObserverOptions,
    Subscription, SurfaceId, VisibilityObserver,
};

#[derive(Default)]
struct ListenerSet {
    next_token: Cell<u64>,
    entries: RefCell<Vec<(u64, Rc<dyn Fn()>)>>,
}

impl ListenerSet {
    fn add(&self, listener: Rc<dyn Fn()>) -> u64 {
        let token = self.next_token.get();
        self.next_token.set(token + 1);
        self.entries.borrow_mut().push((token, listener));
        token
    }

    fn remove(&self, token: u64) {
        self.entries.borrow_mut().retain(|(t, _)| *t != token);
    }

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    fn emit(&self) {
        // Snapshot first: a listener may detach itself (or others) while
        // running, which must not hold the borrow open.
        let snapshot: Vec<Rc<dyn Fn()>> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in snapshot {
            listener();
        }
    }
}

/// Scriptable [`ImageSurface`] backed by plain fields.
pub struct FakeImage {
    id: SurfaceId,
    source: RefCell<Option<String>>,
    background: RefCell<Option<String>>,
    alt: RefCell<String>,
    style: RefCell<Option<String>>,
    load_listeners: Rc<ListenerSet>,
    error_listeners: Rc<ListenerSet>,
}

impl FakeImage {
    pub fn new(id: SurfaceId) -> Rc<Self> {
        Rc::new(Self {
            id,
            source: RefCell::new(None),
            background: RefCell::new(None),
            alt: RefCell::new(String::new()),
            style: RefCell::new(None),
            load_listeners: Rc::new(ListenerSet::default()),
            error_listeners: Rc::new(ListenerSet::default()),
        })
    }

    /// Delivers a load event to every attached listener.
    pub fn emit_load(&self) {
        self.load_listeners.emit();
    }

    /// Delivers an error event to every attached listener.
    pub fn emit_error(&self) {
        self.error_listeners.emit();
    }

    pub fn alt(&self) -> String {
        self.alt.borrow().clone()
    }

    pub fn style(&self) -> Option<String> {
        self.style.borrow().clone()
    }

    /// Number of currently attached load listeners, for teardown assertions.
    pub fn load_listener_count(&self) -> usize {
        self.load_listeners.len()
    }

    /// Number of currently attached error listeners.
    pub fn error_listener_count(&self) -> usize {
        self.error_listeners.len()
    }
}

impl ImageSurface for FakeImage {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn source(&self) -> Option<String> {
        self.source.borrow().clone()
    }

    fn set_source(&self, url: &str) {
        *self.source.borrow_mut() = Some(url.to_owned());
    }

    fn background_image(&self) -> Option<String> {
        self.background.borrow().clone()
    }

    fn set_background_image(&self, value: Option<&str>) {
        *self.background.borrow_mut() = value.map(str::to_owned);
    }

    fn set_alt(&self, alt: &str) {
        *self.alt.borrow_mut() = alt.to_owned();
    }

    fn set_style(&self, style: &str) {
        *self.style.borrow_mut() = Some(style.to_owned());
    }

    fn subscribe_load(&self, listener: Rc<dyn Fn()>) -> Subscription {
        let token = self.load_listeners.add(listener);
        let set = Rc::clone(&self.load_listeners);
        Subscription::new(move || set.remove(token))
    }

    fn subscribe_error(&self, listener: Rc<dyn Fn()>) -> Subscription {
        let token = self.error_listeners.add(listener);
        let set = Rc::clone(&self.error_listeners);
        Subscription::new(move || set.remove(token))
    }
}

/// Recorded observer that fires only when the test tells it to.
pub struct FakeObserver {
    options: ObserverOptions,
    callback: ObserverCallback,
    observed: RefCell<Vec<SurfaceId>>,
}

impl FakeObserver {
    pub fn options(&self) -> &ObserverOptions {
        &self.options
    }

    pub fn is_observing(&self, target: SurfaceId) -> bool {
        self.observed.borrow().contains(&target)
    }

    pub fn observed_count(&self) -> usize {
        self.observed.borrow().len()
    }

    /// Delivers a single intersection report, as the platform would.
    ///
    /// Deliberately does not check the observed set: a late report for an
    /// already-unobserved target is exactly the stale-event case the loader
    /// has to swallow.
    pub fn fire(&self, target: SurfaceId, ratio: f64) {
        (self.callback)(&[IntersectionRecord { target, ratio }]);
    }
}

impl VisibilityObserver for FakeObserver {
    fn observe(&self, target: SurfaceId) {
        let mut observed = self.observed.borrow_mut();
        if !observed.contains(&target) {
            observed.push(target);
        }
    }

    fn unobserve(&self, target: SurfaceId) {
        self.observed.borrow_mut().retain(|t| *t != target);
    }
}

/// [`ImagePlatform`] that records everything it hands out.
#[derive(Default)]
pub struct FakePlatform {
    next_id: Cell<u64>,
    observers: RefCell<Vec<Rc<FakeObserver>>>,
    probes: RefCell<Vec<Rc<FakeImage>>>,
}

impl FakePlatform {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Creates a visible-surface fake with a fresh identity.
    pub fn new_surface(&self) -> Rc<FakeImage> {
        FakeImage::new(self.fresh_id())
    }

    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    /// The `index`th observer created through this platform.
    pub fn observer(&self, index: usize) -> Rc<FakeObserver> {
        Rc::clone(&self.observers.borrow()[index])
    }

    /// The observer currently observing `target`, if any.
    pub fn observer_of(&self, target: SurfaceId) -> Option<Rc<FakeObserver>> {
        self.observers
            .borrow()
            .iter()
            .find(|observer| observer.is_observing(target))
            .cloned()
    }

    pub fn probe_count(&self) -> usize {
        self.probes.borrow().len()
    }

    /// The most recently created probe.
    pub fn last_probe(&self) -> Option<Rc<FakeImage>> {
        self.probes.borrow().last().cloned()
    }

    fn fresh_id(&self) -> SurfaceId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        SurfaceId(id)
    }
}

impl ImagePlatform for FakePlatform {
    fn create_observer(
        &self,
        options: ObserverOptions,
        callback: ObserverCallback,
    ) -> Rc<dyn VisibilityObserver> {
        let observer = Rc::new(FakeObserver {
            options,
            callback,
            observed: RefCell::new(Vec::new()),
        });
        self.observers.borrow_mut().push(Rc::clone(&observer));
        observer
    }

    fn create_probe(&self) -> Rc<dyn ImageSurface> {
        let probe = FakeImage::new(self.fresh_id());
        self.probes.borrow_mut().push(Rc::clone(&probe));
        probe
    }
}
