// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Box measurement: turning raw element geometry into a [`MeasurementState`].
//!
//! The observed element is described by three reads:
//!
//! - its computed padding, as CSS strings ([`ComputedPadding`]),
//! - its bounding client rect, which includes visual transforms,
//! - its offset (layout-flow) size, which does not.
//!
//! [`BoxMetrics::measure`] subtracts the padding from both boxes.

use alloc::string::String;

use kurbo::{Insets, Rect, Size};

use crate::size::MeasurementState;

/// Parses the leading integer of a CSS length such as `"12px"`.
///
/// This mirrors `parseInt(value, 10)`: leading whitespace and an optional sign are
/// accepted, digits are consumed up to the first non-digit, and anything after
/// (units, a fractional part) is ignored. `"12.7px"` is therefore `12`.
///
/// Returns `None` when no digit follows the optional sign.
#[must_use]
pub fn parse_css_integer(value: &str) -> Option<f64> {
    let trimmed = value.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let magnitude = rest[..digits]
        .bytes()
        .fold(0.0_f64, |acc, b| acc * 10.0 + f64::from(b - b'0'));
    Some(if negative { -magnitude } else { magnitude })
}

/// Like [`parse_css_integer`], with malformed values read as `0`.
#[must_use]
pub fn css_pixels_or_zero(value: &str) -> f64 {
    parse_css_integer(value).unwrap_or(0.0)
}

/// Computed padding of an element, as the raw strings a style query returns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComputedPadding {
    /// `padding-top`.
    pub top: String,
    /// `padding-right`.
    pub right: String,
    /// `padding-bottom`.
    pub bottom: String,
    /// `padding-left`.
    pub left: String,
}

impl ComputedPadding {
    /// Converts to [`Insets`], reading each side with [`css_pixels_or_zero`].
    #[must_use]
    pub fn to_insets(&self) -> Insets {
        Insets::new(
            css_pixels_or_zero(&self.left),
            css_pixels_or_zero(&self.top),
            css_pixels_or_zero(&self.right),
            css_pixels_or_zero(&self.bottom),
        )
    }
}

/// A snapshot of everything needed to measure one element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxMetrics {
    /// Bounding client rect (transform-aware).
    pub bounding: Rect,
    /// Offset width/height (layout-flow, untransformed).
    pub offset: Size,
    /// Padding on all four sides.
    pub padding: Insets,
}

impl BoxMetrics {
    /// Computes the candidate measurement for this box.
    #[must_use]
    pub fn measure(&self) -> MeasurementState {
        let horizontal = self.padding.x_value();
        let vertical = self.padding.y_value();
        MeasurementState {
            width: self.offset.width - horizontal,
            height: self.offset.height - vertical,
            scaled_width: self.bounding.width() - horizontal,
            scaled_height: self.bounding.height() - vertical,
        }
    }
}
