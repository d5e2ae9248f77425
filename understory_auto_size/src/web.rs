// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`Host`] implementation over `web_sys`.
//!
//! - [`WebHost`] resolves the parent `HTMLElement`, reads computed padding, the
//!   bounding client rect and the offset size.
//! - [`WebObserver`] wraps `ResizeObserver`, used whenever the global exists.
//! - [`ScrollProbeDetector`] is the fallback: it inserts hidden, scrollable probe
//!   elements into the target and listens for their `scroll` events, which
//!   browsers fire when the probes are squeezed or stretched by a resize. The
//!   probe subtree is shared by every detector watching the same element.
//!
//! ```no_run
//! use understory_auto_size::{AutoSizeOptions, AutoSizer, web::WebHost};
//!
//! fn mount(container: web_sys::HtmlElement) -> AutoSizer<WebHost> {
//!     let mut sizer = AutoSizer::new(WebHost::new(), container, AutoSizeOptions::new(), |size| {
//!         let _ = size;
//!     });
//!     sizer.activate();
//!     sizer
//! }
//! ```

use alloc::format;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use kurbo::{Rect, Size};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{CssStyleDeclaration, Document, Event, HtmlElement, ResizeObserver};

use crate::backend::{
    ListenerRegistry, NativeObserver, Registration, Removal, ResizeCallback, ResizeDetector,
};
use crate::host::{Host, TargetError};
use crate::log::debug;
use crate::measure::ComputedPadding;

const PROBE_CLASS: &str = "understory-resize-triggers";
const EXPAND_CLASS: &str = "understory-expand-trigger";
const CONTRACT_CLASS: &str = "understory-contract-trigger";
const PROBE_STYLE_ID: &str = "understory-resize-styles";
const PROBE_USERS_ATTR: &str = "data-understory-probe-users";

const PROBE_CSS: &str = "\
.understory-resize-triggers{visibility:hidden;opacity:0;pointer-events:none}\
.understory-resize-triggers,.understory-resize-triggers>div,.understory-contract-trigger:before\
{content:\" \";display:block;position:absolute;top:0;left:0;height:100%;width:100%;overflow:hidden;z-index:-1}\
.understory-resize-triggers>div{background:#eee;overflow:auto}\
.understory-contract-trigger:before{width:200%;height:200%}";

fn computed_style(element: &HtmlElement) -> Option<CssStyleDeclaration> {
    let window = element.owner_document()?.default_view()?;
    window.get_computed_style(element).ok().flatten()
}

/// The browser environment.
#[derive(Clone, Debug, Default)]
pub struct WebHost {
    _private: (),
}

impl WebHost {
    /// Creates a host for the current global scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Host for WebHost {
    type Element = HtmlElement;
    type Observer = WebObserver;
    type Detector = ScrollProbeDetector;

    fn parent_element(&self, root: &HtmlElement) -> Result<HtmlElement, TargetError> {
        let parent = root
            .parent_node()
            .ok_or(TargetError::Detached)?
            .dyn_into::<HtmlElement>()
            .map_err(|_| TargetError::NotAnElement)?;
        parent
            .owner_document()
            .and_then(|document| document.default_view())
            .ok_or(TargetError::NoWindow)?;
        Ok(parent)
    }

    fn has_native_observer(&self) -> bool {
        js_sys::Reflect::has(&js_sys::global(), &JsValue::from_str("ResizeObserver"))
            .unwrap_or(false)
    }

    fn create_observer(&self, on_change: ResizeCallback) -> WebObserver {
        WebObserver::new(on_change)
    }

    fn create_detector(&self, nonce: Option<&str>) -> ScrollProbeDetector {
        ScrollProbeDetector::new(nonce)
    }

    fn computed_padding(&self, element: &HtmlElement) -> Option<ComputedPadding> {
        let style = computed_style(element)?;
        let side = |name: &str| style.get_property_value(name).unwrap_or_default();
        Some(ComputedPadding {
            top: side("padding-top"),
            right: side("padding-right"),
            bottom: side("padding-bottom"),
            left: side("padding-left"),
        })
    }

    fn bounding_client_rect(&self, element: &HtmlElement) -> Rect {
        let rect = element.get_bounding_client_rect();
        Rect::from_origin_size((rect.x(), rect.y()), (rect.width(), rect.height()))
    }

    fn offset_size(&self, element: &HtmlElement) -> Size {
        Size::new(
            f64::from(element.offset_width()),
            f64::from(element.offset_height()),
        )
    }
}

/// A `ResizeObserver` bound to one callback.
pub struct WebObserver {
    observer: Option<ResizeObserver>,
    closure: Option<Closure<dyn FnMut()>>,
}

impl fmt::Debug for WebObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebObserver")
            .field("connected", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

impl WebObserver {
    fn new(on_change: ResizeCallback) -> Self {
        let closure = Closure::<dyn FnMut()>::new(move || on_change());
        let observer = match ResizeObserver::new(closure.as_ref().unchecked_ref()) {
            Ok(observer) => Some(observer),
            Err(_err) => {
                debug!(error = ?_err, "ResizeObserver construction failed");
                None
            }
        };
        Self {
            observer,
            closure: Some(closure),
        }
    }
}

impl NativeObserver<HtmlElement> for WebObserver {
    fn observe(&mut self, target: &HtmlElement) {
        if let Some(observer) = &self.observer {
            observer.observe(target);
        }
    }

    fn disconnect(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        self.closure = None;
    }
}

/// The probe subtree inside one target.
///
/// It lives in the DOM, so every detector watching the same element finds and
/// shares it. A counter attribute on the subtree root tracks how many detectors
/// use it, and the last one out removes it.
struct ProbeNodes {
    triggers: HtmlElement,
    expand: HtmlElement,
    expand_child: HtmlElement,
    contract: HtmlElement,
}

impl ProbeNodes {
    fn find(target: &HtmlElement) -> Option<Self> {
        let triggers = target
            .query_selector(&format!(":scope > .{PROBE_CLASS}"))
            .ok()
            .flatten()?;
        let expand = triggers.first_element_child()?;
        let expand_child = expand.first_element_child()?;
        let contract = expand.next_element_sibling()?;
        Some(Self {
            triggers: triggers.dyn_into().ok()?,
            expand: expand.dyn_into().ok()?,
            expand_child: expand_child.dyn_into().ok()?,
            contract: contract.dyn_into().ok()?,
        })
    }

    fn create(document: &Document, target: &HtmlElement) -> Result<Self, JsValue> {
        if let Some(style) = computed_style(target)
            && style.get_property_value("position").unwrap_or_default() == "static"
        {
            target.style().set_property("position", "relative")?;
        }

        let div = |class: &str| -> Result<HtmlElement, JsValue> {
            let element = document.create_element("div")?.dyn_into::<HtmlElement>()?;
            element.set_class_name(class);
            Ok(element)
        };
        let nodes = Self {
            triggers: div(PROBE_CLASS)?,
            expand: div(EXPAND_CLASS)?,
            expand_child: div("")?,
            contract: div(CONTRACT_CLASS)?,
        };
        nodes.expand.append_child(&nodes.expand_child)?;
        nodes.triggers.append_child(&nodes.expand)?;
        nodes.triggers.append_child(&nodes.contract)?;
        target.append_child(&nodes.triggers)?;
        Ok(nodes)
    }

    fn users(&self) -> u32 {
        self.triggers
            .get_attribute(PROBE_USERS_ATTR)
            .and_then(|users| users.parse().ok())
            .unwrap_or(0)
    }

    fn set_users(&self, users: u32) -> Result<(), JsValue> {
        self.triggers.set_attribute(PROBE_USERS_ATTR, &format!("{users}"))
    }

    /// Pins both probes to their maximum scroll offset so any resize scrolls one.
    fn reset(&self) {
        self.contract.set_scroll_left(self.contract.scroll_width());
        self.contract.set_scroll_top(self.contract.scroll_height());
        let child_style = self.expand_child.style();
        let width = format!("{}px", self.expand.offset_width() + 1);
        let height = format!("{}px", self.expand.offset_height() + 1);
        let _ = child_style.set_property("width", &width);
        let _ = child_style.set_property("height", &height);
        self.expand.set_scroll_left(self.expand.scroll_width());
        self.expand.set_scroll_top(self.expand.scroll_height());
    }
}

/// One detector's hold on a target's probe subtree.
struct Probe {
    target: HtmlElement,
    nodes: ProbeNodes,
    last_size: (i32, i32),
    on_scroll: Closure<dyn FnMut(Event)>,
}

impl Probe {
    fn current_size(&self) -> (i32, i32) {
        (self.target.offset_width(), self.target.offset_height())
    }

    fn remove(self) {
        let _ = self.nodes.triggers.remove_event_listener_with_callback_and_bool(
            "scroll",
            self.on_scroll.as_ref().unchecked_ref(),
            true,
        );
        let users = self.nodes.users().saturating_sub(1);
        if users == 0 {
            self.nodes.triggers.remove();
        } else {
            let _ = self.nodes.set_users(users);
        }
    }
}

#[derive(Default)]
struct DetectorState {
    nonce: Option<String>,
    registry: ListenerRegistry<HtmlElement>,
    probes: Vec<Probe>,
}

impl DetectorState {
    fn probe(&self, target: &HtmlElement) -> Option<&Probe> {
        self.probes.iter().find(|p| &p.target == target)
    }

    fn probe_mut(&mut self, target: &HtmlElement) -> Option<&mut Probe> {
        self.probes.iter_mut().find(|p| &p.target == target)
    }
}

/// Scroll-probe fallback for environments without `ResizeObserver`.
///
/// The first listener on a target attaches to the target's probe subtree,
/// creating it (and, once per document, a `<style>` element carrying the optional
/// nonce) when no other detector has yet. The last removal detaches again.
pub struct ScrollProbeDetector {
    state: Rc<RefCell<DetectorState>>,
}

impl fmt::Debug for ScrollProbeDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ScrollProbeDetector")
            .field("registry", &state.registry)
            .field("probes", &state.probes.len())
            .finish()
    }
}

impl ScrollProbeDetector {
    /// Creates a detector. `nonce` is set on the injected `<style>` element.
    #[must_use]
    pub fn new(nonce: Option<&str>) -> Self {
        let state = DetectorState {
            nonce: nonce.map(String::from),
            ..DetectorState::default()
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    fn inject_styles(&self, document: &Document) -> Result<(), JsValue> {
        if document.get_element_by_id(PROBE_STYLE_ID).is_some() {
            return Ok(());
        }
        let style = document.create_element("style")?;
        style.set_id(PROBE_STYLE_ID);
        if let Some(nonce) = &self.state.borrow().nonce {
            style.set_attribute("nonce", nonce)?;
        }
        style.set_text_content(Some(PROBE_CSS));
        let head = document
            .head()
            .ok_or_else(|| JsValue::from_str("document has no head"))?;
        head.append_child(&style)?;
        Ok(())
    }

    fn install(&self, target: &HtmlElement) -> Result<Probe, JsValue> {
        let nodes = match ProbeNodes::find(target) {
            Some(nodes) => nodes,
            None => {
                let document = target
                    .owner_document()
                    .ok_or_else(|| JsValue::from_str("target has no document"))?;
                self.inject_styles(&document)?;
                ProbeNodes::create(&document, target)?
            }
        };
        nodes.set_users(nodes.users() + 1)?;

        let weak: Weak<RefCell<DetectorState>> = Rc::downgrade(&self.state);
        let scrolled = target.clone();
        let on_scroll = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            if let Some(state) = weak.upgrade() {
                Self::on_scroll(&state, &scrolled);
            }
        });
        nodes.triggers.add_event_listener_with_callback_and_bool(
            "scroll",
            on_scroll.as_ref().unchecked_ref(),
            true,
        )?;

        let mut probe = Probe {
            target: target.clone(),
            nodes,
            last_size: (0, 0),
            on_scroll,
        };
        probe.last_size = probe.current_size();
        probe.nodes.reset();
        Ok(probe)
    }

    fn on_scroll(state: &RefCell<DetectorState>, target: &HtmlElement) {
        let listeners = {
            let mut state = state.borrow_mut();
            let Some(probe) = state.probe_mut(target) else {
                return;
            };
            probe.nodes.reset();
            let size = probe.current_size();
            if size == probe.last_size {
                return;
            }
            probe.last_size = size;
            state.registry.snapshot(target)
        };
        for listener in listeners {
            listener();
        }
    }
}

impl ResizeDetector<HtmlElement> for ScrollProbeDetector {
    fn add_resize_listener(&mut self, target: &HtmlElement, listener: &ResizeCallback) {
        let registration = self.state.borrow_mut().registry.add(target, listener);
        if registration != Registration::FirstForTarget
            || self.state.borrow().probe(target).is_some()
        {
            return;
        }
        match self.install(target) {
            Ok(probe) => self.state.borrow_mut().probes.push(probe),
            Err(_err) => {
                debug!(error = ?_err, "could not install scroll probes");
            }
        }
    }

    fn remove_resize_listener(&mut self, target: &HtmlElement, listener: &ResizeCallback) {
        let mut state = self.state.borrow_mut();
        if state.registry.remove(target, listener) != Removal::LastForTarget {
            return;
        }
        if let Some(idx) = state.probes.iter().position(|p| &p.target == target) {
            let probe = state.probes.swap_remove(idx);
            drop(state);
            probe.remove();
        }
    }
}

impl Drop for ScrollProbeDetector {
    fn drop(&mut self) {
        let probes = core::mem::take(&mut self.state.borrow_mut().probes);
        for probe in probes {
            probe.remove();
        }
    }
}

#[cfg(test)]
#[allow(
    unsafe_code,
    reason = "`wasm_bindgen_test` registers each test through an exported symbol."
)]
mod tests {
    use alloc::format;
    use alloc::rc::Rc;
    use core::cell::Cell;

    use wasm_bindgen::JsCast;
    use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
    use web_sys::{Document, HtmlElement};

    use super::{PROBE_USERS_ATTR, ProbeNodes, ScrollProbeDetector, WebHost};
    use crate::backend::{ResizeCallback, ResizeDetector};
    use crate::host::{Host, TargetError};

    wasm_bindgen_test_configure!(run_in_browser);

    fn document() -> Document {
        web_sys::window().unwrap().document().unwrap()
    }

    fn sized_box(width: u32, height: u32) -> HtmlElement {
        let document = document();
        let element: HtmlElement = document.create_element("div").unwrap().dyn_into().unwrap();
        let style = element.style();
        style.set_property("width", &format!("{width}px")).unwrap();
        style.set_property("height", &format!("{height}px")).unwrap();
        document.body().unwrap().append_child(&element).unwrap();
        element
    }

    fn counter() -> (Rc<Cell<u32>>, ResizeCallback) {
        let count = Rc::new(Cell::new(0));
        let seen = count.clone();
        let callback: ResizeCallback = Rc::new(move || seen.set(seen.get() + 1));
        (count, callback)
    }

    #[wasm_bindgen_test]
    fn first_listener_installs_probe_and_last_removes_it() {
        if let Some(stale) = document().get_element_by_id("understory-resize-styles") {
            stale.remove();
        }
        let target = sized_box(100, 50);
        let mut detector = ScrollProbeDetector::new(Some("abc123"));
        let (_, first) = counter();
        let (_, second) = counter();

        detector.add_resize_listener(&target, &first);
        detector.add_resize_listener(&target, &second);
        detector.add_resize_listener(&target, &first);
        assert_eq!(target.child_element_count(), 1, "one probe subtree per target");
        let style = document().get_element_by_id("understory-resize-styles").unwrap();
        assert_eq!(style.get_attribute("nonce").as_deref(), Some("abc123"));

        detector.remove_resize_listener(&target, &first);
        assert_eq!(target.child_element_count(), 1, "second listener keeps the probe");

        detector.remove_resize_listener(&target, &second);
        assert_eq!(target.child_element_count(), 0, "last listener removes the probe");
        target.remove();
    }

    #[wasm_bindgen_test]
    fn detectors_on_one_element_share_its_probe() {
        let target = sized_box(80, 40);
        let mut a = ScrollProbeDetector::new(None);
        let mut b = ScrollProbeDetector::new(None);
        let (_, listener_a) = counter();
        let (_, listener_b) = counter();

        a.add_resize_listener(&target, &listener_a);
        b.add_resize_listener(&target, &listener_b);
        assert_eq!(target.child_element_count(), 1, "probe subtree is shared");
        let nodes = ProbeNodes::find(&target).unwrap();
        assert_eq!(
            nodes.triggers.get_attribute(PROBE_USERS_ATTR).as_deref(),
            Some("2"),
            "both detectors are counted"
        );

        a.remove_resize_listener(&target, &listener_a);
        assert_eq!(target.child_element_count(), 1, "b still uses the probe");

        drop(b);
        assert_eq!(target.child_element_count(), 0, "dropping the last user removes it");
        target.remove();
    }

    #[wasm_bindgen_test]
    fn scroll_notifies_only_when_the_size_changed() {
        let target = sized_box(100, 50);
        let mut detector = ScrollProbeDetector::new(None);
        let (count, listener) = counter();
        detector.add_resize_listener(&target, &listener);

        ScrollProbeDetector::on_scroll(&detector.state, &target);
        assert_eq!(count.get(), 0, "unchanged size is not reported");

        target.style().set_property("width", "120px").unwrap();
        ScrollProbeDetector::on_scroll(&detector.state, &target);
        ScrollProbeDetector::on_scroll(&detector.state, &target);
        assert_eq!(count.get(), 1, "a resize is reported once");

        detector.remove_resize_listener(&target, &listener);
        target.remove();
    }

    #[wasm_bindgen_test]
    fn parent_resolution_reports_the_failing_step() {
        let host = WebHost::new();
        let document = document();

        let orphan: HtmlElement = document.create_element("div").unwrap().dyn_into().unwrap();
        assert_eq!(host.parent_element(&orphan), Err(TargetError::Detached));

        let html: HtmlElement = document.document_element().unwrap().dyn_into().unwrap();
        assert_eq!(host.parent_element(&html), Err(TargetError::NotAnElement));

        let panel = sized_box(10, 10);
        let container: HtmlElement = document.create_element("div").unwrap().dyn_into().unwrap();
        panel.append_child(&container).unwrap();
        assert_eq!(host.parent_element(&container), Ok(panel.clone()));
        panel.remove();
    }
}
