//! Shared visibility-observer cache.
//!
//! One underlying observer per distinct (margin, thresholds) configuration,
//! shared across every image instance that uses it. Entries are created
//! lazily and never evicted: the number of distinct configurations in an
//! application is small and bounded, so reclamation is a deliberate non-goal.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};

use crate::platform::{
    ImagePlatform, IntersectionRecord, ObserverCallback, ObserverOptions, SurfaceId,
    VisibilityObserver,
};

/// Threshold configuration as accepted from callers, before normalization.
#[derive(Clone, Debug, PartialEq)]
pub enum Thresholds {
    /// A single crossing ratio.
    Number(f64),
    /// One or more ratios as whitespace-separated text.
    Text(String),
    /// An ordered list of ratios.
    List(Vec<f64>),
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds::Number(0.01)
    }
}

impl From<f64> for Thresholds {
    fn from(value: f64) -> Self {
        Thresholds::Number(value)
    }
}

impl From<&str> for Thresholds {
    fn from(value: &str) -> Self {
        Thresholds::Text(value.to_owned())
    }
}

impl From<Vec<f64>> for Thresholds {
    fn from(value: Vec<f64>) -> Self {
        Thresholds::List(value)
    }
}

fn coerce_ratio(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Normalizes a threshold configuration to an ordered numeric list.
///
/// Text splits on whitespace; entries that fail to parse coerce to 0, and
/// blank text yields a single 0.
pub fn normalize_thresholds(input: &Thresholds) -> SmallVec<[f64; 4]> {
    match input {
        Thresholds::Number(value) => smallvec![coerce_ratio(*value)],
        Thresholds::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return smallvec![0.0];
            }
            trimmed
                .split_whitespace()
                .map(|item| coerce_ratio(item.parse::<f64>().unwrap_or(0.0)))
                .collect()
        }
        Thresholds::List(values) => values.iter().map(|v| coerce_ratio(*v)).collect(),
    }
}

/// Canonical space-joined form of a threshold configuration.
pub fn canonical_thresholds(input: &Thresholds) -> String {
    let normalized = normalize_thresholds(input);
    let mut out = String::new();
    for (i, value) in normalized.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&value.to_string());
    }
    out
}

/// Cache key for one observer configuration.
///
/// The margin is compared as a raw string; thresholds are compared in their
/// canonical space-joined numeric form, so `0.5`, `"0.5"` and `[0.5]` all
/// map to the same key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObserverKey {
    pub root_margin: String,
    pub thresholds: String,
}

impl ObserverKey {
    pub fn new(root_margin: &str, thresholds: &Thresholds) -> Self {
        Self {
            root_margin: root_margin.to_owned(),
            thresholds: canonical_thresholds(thresholds),
        }
    }
}

type IntersectionHandler = Box<dyn FnOnce(f64)>;

/// One shared observer plus the per-element handlers it dispatches to.
///
/// Registrations are single-shot: the entry removes the handler and
/// unobserves the element synchronously before the handler runs, so a given
/// registration can never fire twice.
pub struct ObserverEntry {
    observer: Rc<dyn VisibilityObserver>,
    handlers: RefCell<FxHashMap<SurfaceId, IntersectionHandler>>,
}

impl ObserverEntry {
    fn new(platform: &Rc<dyn ImagePlatform>, options: ObserverOptions) -> Rc<Self> {
        Rc::new_cyclic(|weak: &Weak<ObserverEntry>| {
            let weak = weak.clone();
            let callback: ObserverCallback = Rc::new(move |records: &[IntersectionRecord]| {
                let Some(entry) = weak.upgrade() else {
                    return;
                };
                for record in records {
                    if record.ratio > 0.0 {
                        entry.dispatch(record.target, record.ratio);
                    }
                }
            });
            ObserverEntry {
                observer: platform.create_observer(options, callback),
                handlers: RefCell::new(FxHashMap::default()),
            }
        })
    }

    /// Registers a one-shot intersection handler for `target`.
    ///
    /// A previous registration for the same target is replaced.
    pub fn observe(&self, target: SurfaceId, handler: impl FnOnce(f64) + 'static) {
        self.handlers.borrow_mut().insert(target, Box::new(handler));
        self.observer.observe(target);
    }

    /// Removes the registration for `target`, if any.
    ///
    /// Unknown targets are a guarded no-op.
    pub fn unobserve(&self, target: SurfaceId) {
        if self.handlers.borrow_mut().remove(&target).is_none() {
            log::trace!("unobserve of unregistered surface {:?}", target);
        }
        self.observer.unobserve(target);
    }

    /// Whether `target` currently has a live registration.
    pub fn is_observing(&self, target: SurfaceId) -> bool {
        self.handlers.borrow().contains_key(&target)
    }

    fn dispatch(&self, target: SurfaceId, ratio: f64) {
        // Detach before running the handler: a second report for the same
        // registration must find nothing to fire.
        let handler = self.handlers.borrow_mut().remove(&target);
        let Some(handler) = handler else {
            return;
        };
        self.observer.unobserve(target);
        handler(ratio);
    }
}

/// Injectable cache mapping observer configurations to shared entries.
///
/// `get` is idempotent: equal keys return the identical entry, created on
/// first request. The registry is explicitly owned and passed to controllers
/// rather than living in a process global, which keeps tests isolated while
/// preserving the one-entry-per-configuration sharing contract.
pub struct ObserverRegistry {
    platform: Rc<dyn ImagePlatform>,
    entries: RefCell<FxHashMap<ObserverKey, Rc<ObserverEntry>>>,
}

impl ObserverRegistry {
    pub fn new(platform: Rc<dyn ImagePlatform>) -> Rc<Self> {
        Rc::new(Self {
            platform,
            entries: RefCell::new(FxHashMap::default()),
        })
    }

    /// The platform this registry creates observers (and probes) through.
    pub fn platform(&self) -> &Rc<dyn ImagePlatform> {
        &self.platform
    }

    /// Returns the shared entry for a configuration, creating it on first use.
    pub fn get(&self, root_margin: &str, thresholds: &Thresholds) -> Rc<ObserverEntry> {
        let key = ObserverKey::new(root_margin, thresholds);
        if let Some(entry) = self.entries.borrow().get(&key) {
            return Rc::clone(entry);
        }
        log::debug!(
            "creating visibility observer for margin {:?}, thresholds {:?}",
            key.root_margin,
            key.thresholds
        );
        let options = ObserverOptions {
            root_margin: key.root_margin.clone(),
            thresholds: normalize_thresholds(thresholds),
        };
        let entry = ObserverEntry::new(&self.platform, options);
        self.entries
            .borrow_mut()
            .insert(key, Rc::clone(&entry));
        entry
    }

    /// Number of distinct configurations seen so far.
    pub fn entry_count(&self) -> usize {
        self.entries.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_normalization_canonical_forms() {
        let list = Thresholds::List(vec![0.5]);
        for input in [Thresholds::Number(0.5), Thresholds::Text("0.5".into())] {
            assert_eq!(canonical_thresholds(&input), canonical_thresholds(&list));
        }

        let pair = Thresholds::Text("0.5 0".into());
        assert_eq!(
            canonical_thresholds(&pair),
            canonical_thresholds(&Thresholds::List(vec![0.5, 0.0]))
        );
    }

    #[test]
    fn test_non_numeric_threshold_text_coerces_to_zero() {
        assert_eq!(canonical_thresholds(&Thresholds::Text("abc 0.25".into())), "0 0.25");
        assert_eq!(canonical_thresholds(&Thresholds::Text("   ".into())), "0");
        assert_eq!(canonical_thresholds(&Thresholds::Number(f64::NAN)), "0");
    }
}
