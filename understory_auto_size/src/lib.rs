// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_auto_size --heading-base-level=0

//! Understory Auto Size: track the size a container is given by its parent.
//!
//! Some content (virtual lists, canvases, charts) needs an explicit pixel size but
//! sits in a container whose size comes from the surrounding layout, not from the
//! content. This crate measures the content box of the container's *parent*, keeps
//! it up to date as the parent resizes, and tells the consumer when to re-render.
//!
//! The pieces:
//!
//! - [`Host`]: the environment. It resolves the parent element, answers box and
//!   style queries, and builds observation backends. On `wasm32` the `web` module
//!   implements it over `web_sys`.
//! - [`ObservationBackend`]: watches one element. It uses the host's
//!   [`NativeObserver`] when [`Host::has_native_observer`] says one exists, and a
//!   [`ResizeDetector`] fallback otherwise. [`ListenerRegistry`] provides the
//!   idempotent bookkeeping fallback detectors need.
//! - [`BoxMetrics`]: one snapshot of an element's geometry, turned into a
//!   [`MeasurementState`] by subtracting padding from the layout-flow box (giving
//!   `width`/`height`) and from the transform-aware bounding rect (giving
//!   `scaled_width`/`scaled_height`).
//! - [`AutoSizer`]: the controller. It arms once on [`AutoSizer::activate`],
//!   measures synchronously right away, re-measures on every notification,
//!   publishes only when an enabled axis actually changed, and tears the backend
//!   down on [`AutoSizer::deactivate`] or drop.
//!
//! Axes can be disabled through [`AutoSizeOptions`]; a disabled axis disappears
//! from every published [`Size`] and never triggers a re-render.
//!
//! This crate does not lay anything out, and each [`AutoSizer`] observes exactly
//! one container on its own.
//!
//! ## Minimal example
//!
//! A host with a single panel (element `1`) holding the container (element `2`):
//!
//! ```rust
//! use std::cell::{Cell, RefCell};
//! use std::rc::Rc;
//!
//! use kurbo::Rect;
//! use understory_auto_size::{
//!     AutoSizeOptions, AutoSizer, ComputedPadding, Host, NativeObserver, Phase,
//!     ResizeCallback, ResizeDetector, Strategy, TargetError,
//! };
//!
//! #[derive(Clone, Default)]
//! struct Page {
//!     panel_height: Rc<Cell<f64>>,
//!     observing: Rc<RefCell<Option<ResizeCallback>>>,
//! }
//!
//! struct Observer(Rc<RefCell<Option<ResizeCallback>>>, ResizeCallback);
//!
//! impl NativeObserver<u32> for Observer {
//!     fn observe(&mut self, _target: &u32) {
//!         *self.0.borrow_mut() = Some(self.1.clone());
//!     }
//!     fn disconnect(&mut self) {
//!         self.0.borrow_mut().take();
//!     }
//! }
//!
//! struct NoDetector;
//!
//! impl ResizeDetector<u32> for NoDetector {
//!     fn add_resize_listener(&mut self, _target: &u32, _listener: &ResizeCallback) {}
//!     fn remove_resize_listener(&mut self, _target: &u32, _listener: &ResizeCallback) {}
//! }
//!
//! impl Host for Page {
//!     type Element = u32;
//!     type Observer = Observer;
//!     type Detector = NoDetector;
//!
//!     fn parent_element(&self, root: &u32) -> Result<u32, TargetError> {
//!         if *root == 2 { Ok(1) } else { Err(TargetError::Detached) }
//!     }
//!     fn has_native_observer(&self) -> bool {
//!         true
//!     }
//!     fn create_observer(&self, on_change: ResizeCallback) -> Observer {
//!         Observer(self.observing.clone(), on_change)
//!     }
//!     fn create_detector(&self, _nonce: Option<&str>) -> NoDetector {
//!         NoDetector
//!     }
//!     fn computed_padding(&self, _element: &u32) -> Option<ComputedPadding> {
//!         None
//!     }
//!     fn bounding_client_rect(&self, _element: &u32) -> Rect {
//!         Rect::new(0.0, 0.0, 300.0, self.panel_height.get())
//!     }
//!     fn offset_size(&self, _element: &u32) -> kurbo::Size {
//!         kurbo::Size::new(300.0, self.panel_height.get())
//!     }
//! }
//!
//! let page = Page::default();
//! page.panel_height.set(200.0);
//!
//! let mut sizer = AutoSizer::without_callback(page.clone(), 2, AutoSizeOptions::new());
//! // Nothing is rendered before the first measurement.
//! assert_eq!(sizer.render(|size| size.height), None);
//!
//! assert_eq!(sizer.activate(), Phase::Armed);
//! assert_eq!(sizer.strategy(), Some(Strategy::Native));
//! assert_eq!(sizer.render(|size| size.height), Some(Some(200.0)));
//!
//! // The panel grows and the observer fires.
//! page.panel_height.set(250.0);
//! let notify = page.observing.borrow().clone().unwrap();
//! notify();
//! assert_eq!(sizer.size().height, Some(250.0));
//!
//! // Dropping the controller disconnects the observer.
//! drop(sizer);
//! assert!(page.observing.borrow().is_none());
//! ```
//!
//! ## Features
//!
//! - `std` (default) / `libm`: forwarded to Kurbo.
//! - `tracing`: emit `tracing` events when arming, publishing and tearing down.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod backend;
mod controller;
mod host;
mod log;
mod measure;
mod options;
mod size;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use backend::{
    ListenerRegistry, NativeObserver, ObservationBackend, Registration, Removal, ResizeCallback,
    ResizeDetector, Strategy,
};
pub use controller::{AutoSizer, MeasureStats, OuterStyle, Phase};
pub use host::{Host, TargetError};
pub use measure::{BoxMetrics, ComputedPadding, css_pixels_or_zero, parse_css_integer};
pub use options::AutoSizeOptions;
pub use size::{Axes, MeasurementState, Size};
