// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observation backends: watching one element for size changes.
//!
//! Two strategies share the `watch`/`unwatch` contract of [`ObservationBackend`]:
//!
//! - [`NativeObserver`]: a host-provided resize observer. One observer is created per
//!   controller, bound to its callback. Teardown disconnects it entirely.
//! - [`ResizeDetector`]: a fallback for hosts without a native observer, such as a
//!   scroll-probe detector. Listeners are added and removed per target+callback
//!   pair, idempotently. [`ListenerRegistry`] implements that bookkeeping.
//!
//! [`Strategy::select`] picks one from the host's capability probe. The choice is
//! made once per activation and never revisited.
//!
//! Callbacks carry no payload: the controller re-measures on its own rather than
//! trusting any geometry the backend might have.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use smallvec::SmallVec;

use crate::host::Host;

/// Callback invoked by a backend when the watched element may have resized.
///
/// Identity is pointer identity of the `Rc` allocation.
pub type ResizeCallback = Rc<dyn Fn()>;

/// A native resize observer bound to a single callback.
pub trait NativeObserver<E> {
    /// Starts observing `target`.
    fn observe(&mut self, target: &E);

    /// Stops observing every target and releases the observer.
    fn disconnect(&mut self);
}

/// A fallback resize detector keyed by target and callback.
///
/// Both methods must be idempotent: adding a pair twice registers it once and
/// removing an absent pair does nothing.
pub trait ResizeDetector<E> {
    /// Registers `listener` for resizes of `target`.
    fn add_resize_listener(&mut self, target: &E, listener: &ResizeCallback);

    /// Unregisters `listener` for `target`.
    fn remove_resize_listener(&mut self, target: &E, listener: &ResizeCallback);
}

/// Which observation mechanism is in use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// The host's native resize observer.
    Native,
    /// The fallback detector.
    Fallback,
}

impl Strategy {
    /// Native whenever the host offers it, fallback otherwise.
    #[must_use]
    pub const fn select(native_available: bool) -> Self {
        if native_available {
            Self::Native
        } else {
            Self::Fallback
        }
    }
}

/// The active observation mechanism for one controller.
pub enum ObservationBackend<N, D> {
    /// Native resize observer.
    Native(N),
    /// Fallback detector.
    Fallback(D),
}

impl<N, D> fmt::Debug for ObservationBackend<N, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObservationBackend")
            .field(&self.strategy())
            .finish_non_exhaustive()
    }
}

impl<N, D> ObservationBackend<N, D> {
    /// The strategy behind this backend.
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        match self {
            Self::Native(_) => Strategy::Native,
            Self::Fallback(_) => Strategy::Fallback,
        }
    }

    /// Probes `host` and constructs the matching backend.
    ///
    /// A native observer is bound to `on_change` here; a fallback detector only
    /// learns about the callback in [`watch`](Self::watch).
    pub fn for_host<H>(host: &H, nonce: Option<&str>, on_change: &ResizeCallback) -> Self
    where
        H: Host<Observer = N, Detector = D>,
    {
        match Strategy::select(host.has_native_observer()) {
            Strategy::Native => Self::Native(host.create_observer(on_change.clone())),
            Strategy::Fallback => Self::Fallback(host.create_detector(nonce)),
        }
    }

    /// Begins watching `target`.
    pub fn watch<E>(&mut self, target: &E, on_change: &ResizeCallback)
    where
        N: NativeObserver<E>,
        D: ResizeDetector<E>,
    {
        match self {
            Self::Native(observer) => observer.observe(target),
            Self::Fallback(detector) => detector.add_resize_listener(target, on_change),
        }
    }

    /// Stops watching `target`.
    ///
    /// The native observer is owned by exactly one controller, so it is simply
    /// disconnected.
    pub fn unwatch<E>(&mut self, target: &E, on_change: &ResizeCallback)
    where
        N: NativeObserver<E>,
        D: ResizeDetector<E>,
    {
        match self {
            Self::Native(observer) => observer.disconnect(),
            Self::Fallback(detector) => detector.remove_resize_listener(target, on_change),
        }
    }
}

/// Outcome of [`ListenerRegistry::add`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    /// The target had no listeners before; probes should be installed.
    FirstForTarget,
    /// Added alongside existing listeners.
    Added,
    /// The pair was already registered; nothing changed.
    AlreadyPresent,
}

/// Outcome of [`ListenerRegistry::remove`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Removal {
    /// The target has no listeners left; probes should be removed.
    LastForTarget,
    /// Removed, other listeners remain.
    Removed,
    /// The pair was not registered; nothing changed.
    NotPresent,
}

/// Idempotent subscription table from targets to resize callbacks.
///
/// Targets are compared with `PartialEq`, callbacks by `Rc` identity. Lookup is
/// linear; a detector typically serves a handful of targets.
pub struct ListenerRegistry<E> {
    entries: Vec<(E, SmallVec<[ResizeCallback; 1]>)>,
}

impl<E> fmt::Debug for ListenerRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("targets", &self.entries.len())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<E> Default for ListenerRegistry<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E: PartialEq + Clone> ListenerRegistry<E> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, target: &E) -> Option<usize> {
        self.entries.iter().position(|(t, _)| t == target)
    }

    /// Registers `listener` for `target`.
    pub fn add(&mut self, target: &E, listener: &ResizeCallback) -> Registration {
        match self.position(target) {
            Some(idx) => {
                let listeners = &mut self.entries[idx].1;
                if listeners.iter().any(|l| Rc::ptr_eq(l, listener)) {
                    Registration::AlreadyPresent
                } else {
                    listeners.push(listener.clone());
                    Registration::Added
                }
            }
            None => {
                let mut listeners = SmallVec::new();
                listeners.push(listener.clone());
                self.entries.push((target.clone(), listeners));
                Registration::FirstForTarget
            }
        }
    }

    /// Unregisters `listener` for `target`.
    pub fn remove(&mut self, target: &E, listener: &ResizeCallback) -> Removal {
        let Some(idx) = self.position(target) else {
            return Removal::NotPresent;
        };
        let listeners = &mut self.entries[idx].1;
        let Some(at) = listeners.iter().position(|l| Rc::ptr_eq(l, listener)) else {
            return Removal::NotPresent;
        };
        listeners.remove(at);
        if listeners.is_empty() {
            self.entries.swap_remove(idx);
            Removal::LastForTarget
        } else {
            Removal::Removed
        }
    }

    /// Returns `true` if `target` has at least one listener.
    #[must_use]
    pub fn is_watched(&self, target: &E) -> bool {
        self.position(target).is_some()
    }

    /// Clones the listeners of `target`.
    ///
    /// Detectors dispatch from the snapshot so that a listener may add or remove
    /// registrations while being notified.
    #[must_use]
    pub fn snapshot(&self, target: &E) -> SmallVec<[ResizeCallback; 1]> {
        self.position(target)
            .map(|idx| self.entries[idx].1.clone())
            .unwrap_or_default()
    }

    /// Invokes every listener of `target`.
    pub fn notify(&self, target: &E) {
        for listener in self.snapshot(target) {
            listener();
        }
    }
}

impl<E> ListenerRegistry<E> {
    /// Number of watched targets.
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.entries.len()
    }

    /// Total number of registered target+callback pairs.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.entries.iter().map(|(_, l)| l.len()).sum()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, ResizeCallback) {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let callback: ResizeCallback = Rc::new(move || h.set(h.get() + 1));
        (hits, callback)
    }

    #[test]
    fn select_prefers_native() {
        assert_eq!(Strategy::select(true), Strategy::Native);
        assert_eq!(Strategy::select(false), Strategy::Fallback);
    }

    #[test]
    fn add_is_idempotent_per_pair() {
        let (_, a) = counter();
        let (_, b) = counter();
        let mut registry = ListenerRegistry::new();

        assert_eq!(registry.add(&1_u32, &a), Registration::FirstForTarget);
        assert_eq!(registry.add(&1, &a), Registration::AlreadyPresent);
        assert_eq!(registry.add(&1, &b), Registration::Added);
        assert_eq!(registry.add(&2, &a), Registration::FirstForTarget);

        assert_eq!(registry.target_count(), 2);
        assert_eq!(registry.listener_count(), 3);
    }

    #[test]
    fn remove_is_idempotent_and_reports_last() {
        let (_, a) = counter();
        let (_, b) = counter();
        let mut registry = ListenerRegistry::new();
        registry.add(&7_u32, &a);
        registry.add(&7, &b);

        assert_eq!(registry.remove(&7, &a), Removal::Removed);
        assert_eq!(registry.remove(&7, &a), Removal::NotPresent);
        assert!(registry.is_watched(&7));
        assert_eq!(registry.remove(&7, &b), Removal::LastForTarget);
        assert!(!registry.is_watched(&7));
        assert!(registry.is_empty());
        assert_eq!(registry.remove(&8, &b), Removal::NotPresent);
    }

    #[test]
    fn notify_reaches_only_the_target_listeners() {
        let (hits_a, a) = counter();
        let (hits_b, b) = counter();
        let mut registry = ListenerRegistry::new();
        registry.add(&1_u32, &a);
        registry.add(&2, &b);

        registry.notify(&1);
        registry.notify(&1);
        registry.notify(&3);

        assert_eq!(hits_a.get(), 2);
        assert_eq!(hits_b.get(), 0);
    }

    #[test]
    fn clones_of_a_callback_share_identity() {
        let (hits, a) = counter();
        let alias = a.clone();
        let mut registry = ListenerRegistry::new();
        registry.add(&1_u32, &a);

        assert_eq!(registry.add(&1, &alias), Registration::AlreadyPresent);
        registry.notify(&1);
        assert_eq!(hits.get(), 1);
        assert_eq!(registry.remove(&1, &alias), Removal::LastForTarget);
    }
}
