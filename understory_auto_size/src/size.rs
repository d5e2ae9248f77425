// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The published size vocabulary: [`Size`], [`Axes`] and [`MeasurementState`].

bitflags::bitflags! {
    /// Axes whose extent is tracked and published.
    ///
    /// Disabling an axis removes both its plain and its scaled field from every
    /// published [`Size`] and excludes it from change detection.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Axes: u8 {
        /// Horizontal extent (`width` and `scaled_width`).
        const WIDTH  = 0b0000_0001;
        /// Vertical extent (`height` and `scaled_height`).
        const HEIGHT = 0b0000_0010;
    }
}

impl Default for Axes {
    fn default() -> Self {
        Self::all()
    }
}

impl Axes {
    /// Builds the enabled set from the two `disable_*` switches.
    #[must_use]
    pub fn from_disabled(disable_width: bool, disable_height: bool) -> Self {
        let mut axes = Self::all();
        axes.set(Self::WIDTH, !disable_width);
        axes.set(Self::HEIGHT, !disable_height);
        axes
    }
}

/// A measured size, as handed to consumers and renderers.
///
/// Every field is optional: a field is absent when its axis is disabled.
///
/// - `width` / `height` come from the layout-flow (offset) box and ignore visual
///   transforms.
/// - `scaled_width` / `scaled_height` come from the bounding client rect, so they
///   include transforms such as `scale(1.5)`.
///
/// Padding of the observed element is subtracted from all four.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    /// Layout-flow content width.
    pub width: Option<f64>,
    /// Layout-flow content height.
    pub height: Option<f64>,
    /// Transform-aware content width.
    pub scaled_width: Option<f64>,
    /// Transform-aware content height.
    pub scaled_height: Option<f64>,
}

/// The controller's last-known measurement.
///
/// Unlike [`Size`] all four values are always tracked, even for disabled axes.
/// Readers go through [`MeasurementState::to_size`] so that disabled axes never leak.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeasurementState {
    /// Layout-flow content width.
    pub width: f64,
    /// Layout-flow content height.
    pub height: f64,
    /// Transform-aware content width.
    pub scaled_width: f64,
    /// Transform-aware content height.
    pub scaled_height: f64,
}

impl MeasurementState {
    /// Seeds a state from optional defaults; a default fills both fields of its axis.
    #[must_use]
    pub fn seeded(default_width: Option<f64>, default_height: Option<f64>) -> Self {
        let width = default_width.unwrap_or(0.0);
        let height = default_height.unwrap_or(0.0);
        Self {
            width,
            height,
            scaled_width: width,
            scaled_height: height,
        }
    }

    /// Returns `true` when `other` differs from `self` on any field of an enabled axis.
    ///
    /// Fields of disabled axes are ignored entirely.
    #[must_use]
    pub fn differs_on(&self, other: &Self, axes: Axes) -> bool {
        let width_changed = axes.contains(Axes::WIDTH)
            && (self.width != other.width || self.scaled_width != other.scaled_width);
        let height_changed = axes.contains(Axes::HEIGHT)
            && (self.height != other.height || self.scaled_height != other.scaled_height);
        width_changed || height_changed
    }

    /// Projects the state onto the enabled axes.
    #[must_use]
    pub fn to_size(&self, axes: Axes) -> Size {
        let mut size = Size::default();
        if axes.contains(Axes::WIDTH) {
            size.width = Some(self.width);
            size.scaled_width = Some(self.scaled_width);
        }
        if axes.contains(Axes::HEIGHT) {
            size.height = Some(self.height);
            size.scaled_height = Some(self.scaled_height);
        }
        size
    }

    /// Every field populated, regardless of which axes are enabled.
    #[must_use]
    pub fn to_full_size(&self) -> Size {
        self.to_size(Axes::all())
    }

    /// Returns `true` once every enabled axis has a nonzero plain extent.
    #[must_use]
    pub fn is_renderable(&self, axes: Axes) -> bool {
        (!axes.contains(Axes::WIDTH) || self.width != 0.0)
            && (!axes.contains(Axes::HEIGHT) || self.height != 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axes_from_disabled_switches() {
        assert_eq!(Axes::from_disabled(false, false), Axes::all());
        assert_eq!(Axes::from_disabled(true, false), Axes::HEIGHT);
        assert_eq!(Axes::from_disabled(false, true), Axes::WIDTH);
        assert!(Axes::from_disabled(true, true).is_empty());
    }

    #[test]
    fn seeded_state_fills_scaled_fields() {
        let state = MeasurementState::seeded(Some(40.0), None);
        assert_eq!(state.width, 40.0);
        assert_eq!(state.scaled_width, 40.0);
        assert_eq!(state.height, 0.0);
        assert_eq!(state.scaled_height, 0.0);
    }

    #[test]
    fn to_size_omits_disabled_axes() {
        let state = MeasurementState {
            width: 1.0,
            height: 2.0,
            scaled_width: 3.0,
            scaled_height: 4.0,
        };
        let size = state.to_size(Axes::HEIGHT);
        assert_eq!(size.width, None);
        assert_eq!(size.scaled_width, None);
        assert_eq!(size.height, Some(2.0));
        assert_eq!(size.scaled_height, Some(4.0));

        assert_eq!(state.to_size(Axes::empty()), Size::default());
    }

    #[test]
    fn differs_on_ignores_disabled_axes() {
        let a = MeasurementState::seeded(Some(10.0), Some(10.0));
        let mut b = a;
        b.scaled_width = 12.0;

        assert!(a.differs_on(&b, Axes::all()));
        assert!(a.differs_on(&b, Axes::WIDTH));
        assert!(!a.differs_on(&b, Axes::HEIGHT));
        assert!(!a.differs_on(&a, Axes::all()));
    }

    #[test]
    fn renderable_requires_every_enabled_plain_extent() {
        let state = MeasurementState::seeded(Some(10.0), None);
        assert!(!state.is_renderable(Axes::all()));
        assert!(state.is_renderable(Axes::WIDTH));
        assert!(!state.is_renderable(Axes::HEIGHT));
        assert!(MeasurementState::default().is_renderable(Axes::empty()));
    }
}
