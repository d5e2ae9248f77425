// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A small in-memory DOM used as a [`Host`] by the integration tests.

#![allow(
    missing_docs,
    dead_code,
    reason = "Integration-test helper module; not every test file uses every helper."
)]

use std::cell::RefCell;
use std::rc::Rc;

use kurbo::{Rect, Size};
use understory_auto_size::{
    ComputedPadding, Host, ListenerRegistry, NativeObserver, ResizeCallback, ResizeDetector,
    TargetError,
};

pub type NodeId = usize;

#[derive(Clone, Debug)]
struct Node {
    parent: Option<NodeId>,
    is_element: bool,
    has_window: bool,
    offset: Size,
    scale: (f64, f64),
    padding: Option<ComputedPadding>,
}

impl Node {
    fn bounding(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            self.offset.width * self.scale.0,
            self.offset.height * self.scale.1,
        )
    }
}

#[derive(Default)]
struct ObserverRecord {
    callback: Option<ResizeCallback>,
    observed: Vec<NodeId>,
    observe_calls: usize,
    disconnect_calls: usize,
}

#[derive(Default)]
struct DomState {
    nodes: Vec<Node>,
    native: bool,
    observers: Vec<ObserverRecord>,
    registry: ListenerRegistry<NodeId>,
    detectors_created: usize,
    nonces: Vec<Option<String>>,
    add_calls: usize,
    remove_calls: usize,
    issued: Vec<ResizeCallback>,
}

/// Shared handle to the fake document; clones see the same nodes.
#[derive(Clone, Default)]
pub struct FakeDom(Rc<RefCell<DomState>>);

pub fn padding(top: &str, right: &str, bottom: &str, left: &str) -> ComputedPadding {
    ComputedPadding {
        top: top.to_owned(),
        right: right.to_owned(),
        bottom: bottom.to_owned(),
        left: left.to_owned(),
    }
}

impl FakeDom {
    /// A document whose host exposes (or lacks) a native resize observer.
    pub fn new(native: bool) -> Self {
        let dom = Self::default();
        dom.0.borrow_mut().native = native;
        dom
    }

    fn push(&self, node: Node) -> NodeId {
        let mut state = self.0.borrow_mut();
        state.nodes.push(node);
        state.nodes.len() - 1
    }

    /// A top-level element, in a window-backed document or not.
    pub fn add_root(&self, has_window: bool) -> NodeId {
        self.push(Node {
            parent: None,
            is_element: true,
            has_window,
            offset: Size::ZERO,
            scale: (1.0, 1.0),
            padding: Some(padding("0px", "0px", "0px", "0px")),
        })
    }

    /// An element under `parent` (or detached), inheriting its document.
    pub fn add_element(&self, parent: Option<NodeId>) -> NodeId {
        let has_window = parent.is_none_or(|p| self.0.borrow().nodes[p].has_window);
        self.push(Node {
            parent,
            is_element: true,
            has_window,
            offset: Size::ZERO,
            scale: (1.0, 1.0),
            padding: Some(padding("0px", "0px", "0px", "0px")),
        })
    }

    /// A non-element node (think document fragment) under `parent`.
    pub fn add_non_element(&self, parent: Option<NodeId>) -> NodeId {
        let id = self.add_element(parent);
        self.0.borrow_mut().nodes[id].is_element = false;
        id
    }

    /// Sets the layout box of `id` without notifying anyone.
    pub fn set_size(&self, id: NodeId, width: f64, height: f64) {
        self.0.borrow_mut().nodes[id].offset = Size::new(width, height);
    }

    /// Applies a visual scale, which only affects the bounding rect.
    pub fn set_scale(&self, id: NodeId, sx: f64, sy: f64) {
        self.0.borrow_mut().nodes[id].scale = (sx, sy);
    }

    pub fn set_padding(&self, id: NodeId, padding: Option<ComputedPadding>) {
        self.0.borrow_mut().nodes[id].padding = padding;
    }

    pub fn detach(&self, id: NodeId) {
        self.0.borrow_mut().nodes[id].parent = None;
    }

    /// Fires every observation mechanism watching `id`, whether or not it changed.
    pub fn notify(&self, id: NodeId) {
        let callbacks: Vec<ResizeCallback> = {
            let state = self.0.borrow();
            let mut callbacks: Vec<ResizeCallback> = state
                .observers
                .iter()
                .filter(|o| o.observed.contains(&id))
                .filter_map(|o| o.callback.clone())
                .collect();
            callbacks.extend(state.registry.snapshot(&id));
            callbacks
        };
        for callback in callbacks {
            callback();
        }
    }

    /// Resizes `id` and notifies its observers.
    pub fn resize(&self, id: NodeId, width: f64, height: f64) {
        self.set_size(id, width, height);
        self.notify(id);
    }

    pub fn observers_created(&self) -> usize {
        self.0.borrow().observers.len()
    }

    /// Observers that still hold a callback and watch at least one node.
    pub fn live_observers(&self) -> usize {
        self.0
            .borrow()
            .observers
            .iter()
            .filter(|o| o.callback.is_some() && !o.observed.is_empty())
            .count()
    }

    pub fn observe_calls(&self) -> usize {
        self.0.borrow().observers.iter().map(|o| o.observe_calls).sum()
    }

    pub fn disconnect_calls(&self) -> usize {
        self.0
            .borrow()
            .observers
            .iter()
            .map(|o| o.disconnect_calls)
            .sum()
    }

    pub fn detectors_created(&self) -> usize {
        self.0.borrow().detectors_created
    }

    pub fn nonces(&self) -> Vec<Option<String>> {
        self.0.borrow().nonces.clone()
    }

    /// Every callback ever handed to an observer or detector, as a host queue
    /// holding a pending notification would keep it.
    pub fn issued_callbacks(&self) -> Vec<ResizeCallback> {
        self.0.borrow().issued.clone()
    }

    pub fn fallback_listeners(&self) -> usize {
        self.0.borrow().registry.listener_count()
    }

    pub fn fallback_calls(&self) -> (usize, usize) {
        let state = self.0.borrow();
        (state.add_calls, state.remove_calls)
    }
}

pub struct FakeObserver {
    dom: FakeDom,
    index: usize,
}

impl NativeObserver<NodeId> for FakeObserver {
    fn observe(&mut self, target: &NodeId) {
        let mut state = self.dom.0.borrow_mut();
        let record = &mut state.observers[self.index];
        record.observe_calls += 1;
        if !record.observed.contains(target) {
            record.observed.push(*target);
        }
    }

    fn disconnect(&mut self) {
        let mut state = self.dom.0.borrow_mut();
        let record = &mut state.observers[self.index];
        record.disconnect_calls += 1;
        record.observed.clear();
        record.callback = None;
    }
}

pub struct FakeDetector {
    dom: FakeDom,
}

impl ResizeDetector<NodeId> for FakeDetector {
    fn add_resize_listener(&mut self, target: &NodeId, listener: &ResizeCallback) {
        let mut state = self.dom.0.borrow_mut();
        state.add_calls += 1;
        state.issued.push(listener.clone());
        state.registry.add(target, listener);
    }

    fn remove_resize_listener(&mut self, target: &NodeId, listener: &ResizeCallback) {
        let mut state = self.dom.0.borrow_mut();
        state.remove_calls += 1;
        state.registry.remove(target, listener);
    }
}

impl Host for FakeDom {
    type Element = NodeId;
    type Observer = FakeObserver;
    type Detector = FakeDetector;

    fn parent_element(&self, root: &NodeId) -> Result<NodeId, TargetError> {
        let state = self.0.borrow();
        let parent = state.nodes[*root].parent.ok_or(TargetError::Detached)?;
        let node = &state.nodes[parent];
        if !node.has_window {
            return Err(TargetError::NoWindow);
        }
        if !node.is_element {
            return Err(TargetError::NotAnElement);
        }
        Ok(parent)
    }

    fn has_native_observer(&self) -> bool {
        self.0.borrow().native
    }

    fn create_observer(&self, on_change: ResizeCallback) -> FakeObserver {
        let mut state = self.0.borrow_mut();
        state.issued.push(on_change.clone());
        state.observers.push(ObserverRecord {
            callback: Some(on_change),
            ..ObserverRecord::default()
        });
        FakeObserver {
            dom: self.clone(),
            index: state.observers.len() - 1,
        }
    }

    fn create_detector(&self, nonce: Option<&str>) -> FakeDetector {
        let mut state = self.0.borrow_mut();
        state.detectors_created += 1;
        state.nonces.push(nonce.map(str::to_owned));
        FakeDetector { dom: self.clone() }
    }

    fn computed_padding(&self, element: &NodeId) -> Option<ComputedPadding> {
        self.0.borrow().nodes[*element].padding.clone()
    }

    fn bounding_client_rect(&self, element: &NodeId) -> Rect {
        self.0.borrow().nodes[*element].bounding()
    }

    fn offset_size(&self, element: &NodeId) -> Size {
        self.0.borrow().nodes[*element].offset
    }
}

/// A window-backed page with a sized panel holding the sizer's container.
///
/// Returns `(dom, panel, container)`.
pub fn page(native: bool, width: f64, height: f64) -> (FakeDom, NodeId, NodeId) {
    let dom = FakeDom::new(native);
    let body = dom.add_root(true);
    let panel = dom.add_element(Some(body));
    let container = dom.add_element(Some(panel));
    dom.set_size(panel, width, height);
    (dom, panel, container)
}

/// Records every size passed to `on_resize`.
#[derive(Clone, Default)]
pub struct Recorder(Rc<RefCell<Vec<understory_auto_size::Size>>>);

impl Recorder {
    pub fn callback(&self) -> impl Fn(understory_auto_size::Size) + 'static {
        let sizes = self.0.clone();
        move |size| sizes.borrow_mut().push(size)
    }

    pub fn count(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn sizes(&self) -> Vec<understory_auto_size::Size> {
        self.0.borrow().clone()
    }

    pub fn last(&self) -> Option<understory_auto_size::Size> {
        self.0.borrow().last().copied()
    }
}
