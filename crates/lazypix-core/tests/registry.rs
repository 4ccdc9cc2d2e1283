//! Registry and entry behavior through the fake platform.

use std::cell::Cell;
use std::rc::Rc;

use lazypix_core::platform::{ImagePlatform, SurfaceId};
use lazypix_core::registry::{ObserverRegistry, Thresholds};
use lazypix_testing::FakePlatform;

fn registry() -> (Rc<FakePlatform>, Rc<ObserverRegistry>) {
    let platform = FakePlatform::new();
    let registry = ObserverRegistry::new(Rc::clone(&platform) as Rc<dyn ImagePlatform>);
    (platform, registry)
}

#[test]
fn test_equal_configs_share_one_entry() {
    let (platform, registry) = registry();

    let a = registry.get("0px", &Thresholds::Number(0.5));
    let b = registry.get("0px", &Thresholds::Text("0.5".into()));
    let c = registry.get("0px", &Thresholds::List(vec![0.5]));

    assert!(Rc::ptr_eq(&a, &b));
    assert!(Rc::ptr_eq(&a, &c));
    assert_eq!(registry.entry_count(), 1);
    assert_eq!(platform.observer_count(), 1);
}

#[test]
fn test_differing_configs_get_distinct_entries() {
    let (platform, registry) = registry();

    let a = registry.get("0px", &Thresholds::Number(0.5));
    let b = registry.get("10px", &Thresholds::Number(0.5));
    let c = registry.get("0px", &Thresholds::Text("0.5 0".into()));

    assert!(!Rc::ptr_eq(&a, &b));
    assert!(!Rc::ptr_eq(&a, &c));
    assert_eq!(registry.entry_count(), 3);
    assert_eq!(platform.observer_count(), 3);
}

#[test]
fn test_registration_fires_once_then_detaches() {
    let (platform, registry) = registry();
    let entry = registry.get("0px", &Thresholds::Number(0.5));
    let observer = platform.observer(0);
    let target = SurfaceId(7);

    let fired = Rc::new(Cell::new(0usize));
    let fired_in = fired.clone();
    entry.observe(target, move |_ratio| {
        fired_in.set(fired_in.get() + 1);
    });
    assert!(observer.is_observing(target));

    observer.fire(target, 0.6);
    assert_eq!(fired.get(), 1);
    assert!(!entry.is_observing(target));
    assert!(!observer.is_observing(target));

    // A second report for the same registration finds nothing to fire.
    observer.fire(target, 0.9);
    assert_eq!(fired.get(), 1);
}

#[test]
fn test_zero_ratio_report_does_not_fire() {
    let (platform, registry) = registry();
    let entry = registry.get("0px", &Thresholds::Number(0.01));
    let observer = platform.observer(0);
    let target = SurfaceId(3);

    let fired = Rc::new(Cell::new(0usize));
    let fired_in = fired.clone();
    entry.observe(target, move |_| fired_in.set(fired_in.get() + 1));

    observer.fire(target, 0.0);
    assert_eq!(fired.get(), 0);
    assert!(entry.is_observing(target));
}

#[test]
fn test_unobserve_unknown_target_is_noop() {
    let (_platform, registry) = registry();
    let entry = registry.get("0px", &Thresholds::default());
    entry.unobserve(SurfaceId(99));
    assert!(!entry.is_observing(SurfaceId(99)));
}
