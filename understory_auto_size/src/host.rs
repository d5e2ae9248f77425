// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`Host`] trait: everything the controller needs from its environment.

use core::fmt;

use kurbo::{Insets, Rect, Size};

use crate::backend::{NativeObserver, ResizeCallback, ResizeDetector};
use crate::measure::{BoxMetrics, ComputedPadding};

/// Why the observed element could not be resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetError {
    /// The root element has no parent node (not yet attached, or already removed).
    Detached,
    /// The parent node is not an element that carries layout.
    NotAnElement,
    /// The parent's document has no window, as during non-interactive rendering.
    NoWindow,
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detached => f.write_str("root element is not attached to a parent"),
            Self::NotAnElement => f.write_str("parent node is not a layout element"),
            Self::NoWindow => f.write_str("parent element's document has no window"),
        }
    }
}

impl core::error::Error for TargetError {}

/// A DOM-like environment hosting the observed element.
///
/// Implementations answer layout queries for elements, probe for a native resize
/// observer, and build either observation strategy on request. The `web`
/// module provides one over `web_sys` on `wasm32`; tests and
/// other platforms supply their own.
///
/// All reads are synchronous and must not mutate the element.
pub trait Host {
    /// Element handle. Equality must mean "the same element".
    type Element: Clone + PartialEq;
    /// Native strategy.
    type Observer: NativeObserver<Self::Element>;
    /// Fallback strategy.
    type Detector: ResizeDetector<Self::Element>;

    /// Resolves the element whose box is measured: the parent of `root`.
    ///
    /// Must fail with [`TargetError::NoWindow`] when the parent lives in a document
    /// without a window.
    fn parent_element(&self, root: &Self::Element) -> Result<Self::Element, TargetError>;

    /// Returns `true` when the environment exposes a native resize observer.
    fn has_native_observer(&self) -> bool;

    /// Creates a native observer that invokes `on_change` on every resize.
    fn create_observer(&self, on_change: ResizeCallback) -> Self::Observer;

    /// Creates the fallback detector. `nonce` is passed through untouched.
    fn create_detector(&self, nonce: Option<&str>) -> Self::Detector;

    /// Computed padding, or `None` when no computed style is available.
    fn computed_padding(&self, element: &Self::Element) -> Option<ComputedPadding>;

    /// Bounding client rect, including visual transforms.
    fn bounding_client_rect(&self, element: &Self::Element) -> Rect;

    /// Offset width and height, ignoring visual transforms.
    fn offset_size(&self, element: &Self::Element) -> Size;

    /// Collects the three reads into a [`BoxMetrics`].
    fn box_metrics(&self, element: &Self::Element) -> BoxMetrics {
        BoxMetrics {
            bounding: self.bounding_client_rect(element),
            offset: self.offset_size(element),
            padding: self
                .computed_padding(element)
                .map(|padding| padding.to_insets())
                .unwrap_or(Insets::ZERO),
        }
    }
}
