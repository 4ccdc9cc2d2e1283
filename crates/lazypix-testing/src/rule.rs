//! Test rule driving a controller through a fake platform.

use std::cell::Cell;
use std::rc::Rc;

use lazypix::{EventCallback, ImageController, ImageProps, ObserverRegistry};
use lazypix_core::platform::{ImagePlatform, ImageSurface};

use crate::fake::{FakeImage, FakePlatform};

/// Counting callback for asserting how often an image event fired.
#[derive(Clone, Default)]
pub struct CallCount {
    count: Rc<Cell<usize>>,
}

impl CallCount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.count.get()
    }

    /// An [`EventCallback`] that increments this counter.
    pub fn callback(&self) -> EventCallback {
        let count = Rc::clone(&self.count);
        EventCallback::new(move |_event| count.set(count.get() + 1))
    }
}

/// One mounted instance plus handles to its fake surfaces.
pub struct MountedImage {
    pub controller: ImageController,
    pub surface: Rc<FakeImage>,
    pub probe: Rc<FakeImage>,
}

/// Bundles a fake platform and a registry: mount content, drive
/// intersection/load/error events by hand, assert on the result.
pub struct ImageTestRule {
    platform: Rc<FakePlatform>,
    registry: Rc<ObserverRegistry>,
}

impl ImageTestRule {
    pub fn new() -> Self {
        let platform = FakePlatform::new();
        let registry = ObserverRegistry::new(Rc::clone(&platform) as Rc<dyn ImagePlatform>);
        Self { platform, registry }
    }

    pub fn platform(&self) -> &Rc<FakePlatform> {
        &self.platform
    }

    pub fn registry(&self) -> Rc<ObserverRegistry> {
        Rc::clone(&self.registry)
    }

    /// Mounts a controller on a fresh fake surface.
    pub fn mount(&self, props: ImageProps) -> MountedImage {
        let surface = self.platform.new_surface();
        let controller = ImageController::mount(
            self.registry(),
            Rc::clone(&surface) as Rc<dyn ImageSurface>,
            props,
        );
        let probe = self
            .platform
            .last_probe()
            .expect("mounting creates a probe");
        MountedImage {
            controller,
            surface,
            probe,
        }
    }

    /// Fires an intersection at `ratio` for the mounted surface.
    ///
    /// Panics if no observer is currently observing it.
    pub fn intersect(&self, image: &MountedImage, ratio: f64) {
        let target = image.surface.id();
        let observer = self
            .platform
            .observer_of(target)
            .unwrap_or_else(|| panic!("no observer is observing surface {target:?}"));
        observer.fire(target, ratio);
    }
}

impl Default for ImageTestRule {
    fn default() -> Self {
        Self::new()
    }
}
