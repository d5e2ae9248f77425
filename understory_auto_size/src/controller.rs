// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The measurement controller.
//!
//! An [`AutoSizer`] moves through three phases:
//!
//! ```text
//!   Unarmed --activate()--> Armed --deactivate()/drop--> Disposed
//!      |                      ^  |
//!      |                      +--+ notification: re-measure, publish on change
//!      +------deactivate()/drop------------------------> Disposed
//! ```
//!
//! Activation is single-shot. If the observed element cannot be resolved on the
//! first attempt the controller stays unarmed for good.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::backend::{ObservationBackend, ResizeCallback, Strategy};
use crate::host::{Host, TargetError};
use crate::log::{debug, trace};
use crate::options::AutoSizeOptions;
use crate::size::{Axes, MeasurementState, Size};

/// Lifecycle phase of an [`AutoSizer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No target resolved and no backend active.
    Unarmed,
    /// Observing a resolved target.
    Armed,
    /// Torn down; terminal.
    Disposed,
}

/// Per-instance counters, useful for diagnostics and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeasureStats {
    /// Measurements taken, including the initial one.
    pub measurements: u64,
    /// Measurements that changed an enabled axis and were published.
    pub published: u64,
    /// Measurements identical to the state on every enabled axis.
    pub suppressed: u64,
    /// Notifications that arrived with no target to measure.
    pub stale: u64,
}

/// Style hints for the container element itself.
///
/// The container must not force its own size, or the parent could never shrink.
/// Enabled axes are therefore pinned to zero and overflow is left visible; the
/// content rendered inside uses the measured size instead.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OuterStyle {
    /// Always `true`: content overflows the zero-sized container.
    pub overflow_visible: bool,
    /// `Some(0.0)` when width is tracked.
    pub width: Option<f64>,
    /// `Some(0.0)` when height is tracked.
    pub height: Option<f64>,
}

struct Shared<H: Host> {
    host: H,
    axes: Axes,
    state: Cell<MeasurementState>,
    target: RefCell<Option<H::Element>>,
    stats: Cell<MeasureStats>,
    on_resize: Box<dyn Fn(Size)>,
}

impl<H: Host> Shared<H> {
    fn bump(&self, update: impl FnOnce(&mut MeasureStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }

    /// Re-measures the target and publishes when an enabled axis changed.
    fn handle_resize(&self) {
        let Some(target) = self.target.borrow().clone() else {
            self.bump(|s| s.stale += 1);
            trace!("resize notification without a target");
            return;
        };

        let candidate = self.host.box_metrics(&target).measure();
        self.bump(|s| s.measurements += 1);

        if !self.state.get().differs_on(&candidate, self.axes) {
            self.bump(|s| s.suppressed += 1);
            trace!("measurement unchanged, not publishing");
            return;
        }

        self.state.set(candidate);
        self.bump(|s| s.published += 1);
        debug!(
            width = candidate.width,
            height = candidate.height,
            scaled_width = candidate.scaled_width,
            scaled_height = candidate.scaled_height,
            "publishing size"
        );
        (self.on_resize)(candidate.to_full_size());
    }
}

/// Tracks the content-box size of a container's parent element.
///
/// The container is the `root` element handed to [`AutoSizer::new`]; its parent
/// is the element that gets measured. Construction does not touch the element.
/// Call [`activate`](Self::activate) once the root is mounted, and
/// [`deactivate`](Self::deactivate) (or drop the controller) when it is removed.
///
/// `on_resize` receives every accepted change with all four fields populated.
/// Renderers should use [`size`](Self::size) or [`render`](Self::render), which
/// only expose enabled axes.
pub struct AutoSizer<H: Host + 'static> {
    shared: Rc<Shared<H>>,
    root: H::Element,
    nonce: Option<String>,
    phase: Phase,
    attempted: bool,
    target_error: Option<TargetError>,
    backend: Option<ObservationBackend<H::Observer, H::Detector>>,
    callback: Option<ResizeCallback>,
}

impl<H: Host + 'static> fmt::Debug for AutoSizer<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoSizer")
            .field("phase", &self.phase)
            .field("strategy", &self.strategy())
            .field("axes", &self.shared.axes)
            .field("state", &self.shared.state.get())
            .field("stats", &self.shared.stats.get())
            .finish_non_exhaustive()
    }
}

impl<H: Host + 'static> AutoSizer<H> {
    /// Creates an unarmed controller for `root`.
    pub fn new(
        host: H,
        root: H::Element,
        options: AutoSizeOptions,
        on_resize: impl Fn(Size) + 'static,
    ) -> Self {
        let shared = Shared {
            host,
            axes: options.axes(),
            state: Cell::new(options.initial_state()),
            target: RefCell::new(None),
            stats: Cell::new(MeasureStats::default()),
            on_resize: Box::new(on_resize),
        };
        Self {
            shared: Rc::new(shared),
            root,
            nonce: options.nonce,
            phase: Phase::Unarmed,
            attempted: false,
            target_error: None,
            backend: None,
            callback: None,
        }
    }

    /// Creates an unarmed controller that only exposes its size to a renderer.
    pub fn without_callback(host: H, root: H::Element, options: AutoSizeOptions) -> Self {
        Self::new(host, root, options, |_| {})
    }

    /// Resolves the element that would be observed for `root`.
    ///
    /// This is the parent of `root`, provided it is an element in a document with a
    /// window.
    pub fn resolve_target(&self) -> Result<H::Element, TargetError> {
        self.shared.host.parent_element(&self.root)
    }

    /// Arms the controller: resolve the target, start a backend, measure once.
    ///
    /// Only the first call does anything. When the target cannot be resolved the
    /// controller stays [`Phase::Unarmed`] permanently and the reason is kept in
    /// [`target_error`](Self::target_error). Nothing is ever reported as an error,
    /// because an unresolvable target is expected during non-interactive rendering.
    ///
    /// The initial measurement is published (if it differs from the defaults)
    /// before this returns, so it always precedes any backend notification.
    pub fn activate(&mut self) -> Phase {
        if self.attempted || self.phase != Phase::Unarmed {
            return self.phase;
        }
        self.attempted = true;

        let target = match self.resolve_target() {
            Ok(target) => target,
            Err(err) => {
                debug!(error = %err, "target unresolved, staying unarmed");
                self.target_error = Some(err);
                return self.phase;
            }
        };

        let callback = self.notification_callback();
        let mut backend =
            ObservationBackend::for_host(&self.shared.host, self.nonce.as_deref(), &callback);
        debug!(strategy = ?backend.strategy(), "arming");

        *self.shared.target.borrow_mut() = Some(target.clone());
        backend.watch(&target, &callback);
        self.backend = Some(backend);
        self.callback = Some(callback);
        self.phase = Phase::Armed;

        self.shared.handle_resize();
        self.phase
    }

    /// Tears the controller down.
    ///
    /// From [`Phase::Armed`] this unwatches the target and releases the backend.
    /// From [`Phase::Unarmed`] there is nothing to release. Either way the
    /// controller ends up [`Phase::Disposed`]; calling this again is a no-op.
    pub fn deactivate(&mut self) {
        if self.phase == Phase::Disposed {
            return;
        }
        let target = self.shared.target.borrow_mut().take();
        if let (Some(mut backend), Some(callback), Some(target)) =
            (self.backend.take(), self.callback.take(), target)
        {
            backend.unwatch(&target, &callback);
            debug!(strategy = ?backend.strategy(), "disarmed");
        }
        self.phase = Phase::Disposed;
    }

    fn notification_callback(&self) -> ResizeCallback {
        let shared: Weak<Shared<H>> = Rc::downgrade(&self.shared);
        Rc::new(move || {
            if let Some(shared) = shared.upgrade() {
                shared.handle_resize();
            }
        })
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The strategy in use while armed.
    #[must_use]
    pub fn strategy(&self) -> Option<Strategy> {
        self.backend.as_ref().map(ObservationBackend::strategy)
    }

    /// Why activation left the controller unarmed, if it did.
    #[must_use]
    pub fn target_error(&self) -> Option<TargetError> {
        self.target_error
    }

    /// The observed element while armed.
    #[must_use]
    pub fn target(&self) -> Option<H::Element> {
        self.shared.target.borrow().clone()
    }

    /// The container element this controller was created for.
    #[must_use]
    pub fn root(&self) -> &H::Element {
        &self.root
    }

    /// The host environment.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.shared.host
    }

    /// Tracked axes.
    #[must_use]
    pub fn axes(&self) -> Axes {
        self.shared.axes
    }

    /// The raw state, including fields of disabled axes.
    #[must_use]
    pub fn state(&self) -> MeasurementState {
        self.shared.state.get()
    }

    /// The current size restricted to enabled axes.
    #[must_use]
    pub fn size(&self) -> Size {
        self.shared.state.get().to_size(self.shared.axes)
    }

    /// Counters for this instance.
    #[must_use]
    pub fn stats(&self) -> MeasureStats {
        self.shared.stats.get()
    }

    /// Returns `true` once every enabled axis has a nonzero measured extent.
    ///
    /// Rendering content at a zero size before the first measurement would only
    /// waste a pass, so renderers should bail out while this is `false`.
    #[must_use]
    pub fn should_render(&self) -> bool {
        self.shared.state.get().is_renderable(self.shared.axes)
    }

    /// Calls `render` with the current [`size`](Self::size) if content should render.
    pub fn render<R>(&self, render: impl FnOnce(Size) -> R) -> Option<R> {
        self.should_render().then(|| render(self.size()))
    }

    /// Style hints for the container element.
    #[must_use]
    pub fn outer_style(&self) -> OuterStyle {
        let axes = self.shared.axes;
        OuterStyle {
            overflow_visible: true,
            width: axes.contains(Axes::WIDTH).then_some(0.0),
            height: axes.contains(Axes::HEIGHT).then_some(0.0),
        }
    }
}

impl<H: Host + 'static> Drop for AutoSizer<H> {
    fn drop(&mut self) {
        self.deactivate();
    }
}
