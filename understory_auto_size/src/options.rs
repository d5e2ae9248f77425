// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;

use crate::size::{Axes, MeasurementState};

/// Configuration for an [`AutoSizer`](crate::AutoSizer).
///
/// ```
/// use understory_auto_size::{AutoSizeOptions, Axes};
///
/// let options = AutoSizeOptions::new()
///     .with_disable_width(true)
///     .with_default_height(120.0)
///     .with_nonce("r4nd0m");
///
/// assert_eq!(options.axes(), Axes::HEIGHT);
/// assert_eq!(options.initial_state().height, 120.0);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AutoSizeOptions {
    /// Stop tracking and publishing the horizontal extent.
    pub disable_width: bool,
    /// Stop tracking and publishing the vertical extent.
    pub disable_height: bool,
    /// Width assumed before the first measurement.
    pub default_width: Option<f64>,
    /// Height assumed before the first measurement.
    pub default_height: Option<f64>,
    /// Opaque token (typically a CSP nonce) handed to the fallback detector.
    pub nonce: Option<String>,
}

impl AutoSizeOptions {
    /// Both axes enabled, no defaults, no nonce.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets [`disable_width`](Self::disable_width).
    #[must_use]
    pub fn with_disable_width(mut self, disable: bool) -> Self {
        self.disable_width = disable;
        self
    }

    /// Sets [`disable_height`](Self::disable_height).
    #[must_use]
    pub fn with_disable_height(mut self, disable: bool) -> Self {
        self.disable_height = disable;
        self
    }

    /// Sets [`default_width`](Self::default_width).
    #[must_use]
    pub fn with_default_width(mut self, width: f64) -> Self {
        self.default_width = Some(width);
        self
    }

    /// Sets [`default_height`](Self::default_height).
    #[must_use]
    pub fn with_default_height(mut self, height: f64) -> Self {
        self.default_height = Some(height);
        self
    }

    /// Sets [`nonce`](Self::nonce).
    #[must_use]
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// The enabled axes.
    #[must_use]
    pub fn axes(&self) -> Axes {
        Axes::from_disabled(self.disable_width, self.disable_height)
    }

    /// The measurement state before anything has been measured.
    #[must_use]
    pub fn initial_state(&self) -> MeasurementState {
        MeasurementState::seeded(self.default_width, self.default_height)
    }
}
