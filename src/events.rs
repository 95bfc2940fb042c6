//! Typed subscription events and the callback contract subscribers
//! implement to receive them.

use roxmltree::Node;

use crate::catalog::{ControllerState, OperationMode, RAPIDExecutionState};
use crate::error::{Error, Result};

/// A signal changed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IOSignalStateEvent {
    /// The signal's name, as extracted from its resource URI.
    pub signal: String,
    /// The signal's new value, verbatim (RWS encodes both digital and
    /// analog values as decimal strings).
    pub value: String,
}

/// The RAPID execution state (running/stopped) changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RAPIDExecutionStateEvent {
    pub state: RAPIDExecutionState,
}

/// The controller state changed. Only delivered over an RWS 2.0 connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerStateEvent {
    pub state: ControllerState,
}

/// The operation mode changed. Only delivered over an RWS 2.0 connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationModeEvent {
    pub mode: OperationMode,
}

/// The union of events a subscription group can deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    IOSignalState(IOSignalStateEvent),
    RAPIDExecutionState(RAPIDExecutionStateEvent),
    ControllerState(ControllerStateEvent),
    OperationMode(OperationModeEvent),
}

/// A set of callbacks for subscription events.
///
/// Implement this directly on your own state, or use [`SubscriptionCallbacks`]
/// to wrap a single closure. Every method has a no-op default, matching the
/// expectation that most subscribers only care about one or two event kinds.
pub trait OnSubscriptionEvent: Send + Sync {
    #[allow(unused_variables)]
    fn on_io_signal_state(&mut self, event: &IOSignalStateEvent) {}
    #[allow(unused_variables)]
    fn on_rapid_execution_state(&mut self, event: &RAPIDExecutionStateEvent) {}
    #[allow(unused_variables)]
    fn on_controller_state(&mut self, event: &ControllerStateEvent) {}
    #[allow(unused_variables)]
    fn on_operation_mode(&mut self, event: &OperationModeEvent) {}
}

type EventCallbackFun = dyn FnMut(SubscriptionEvent) + Send + Sync;

/// A convenient wrapper around a single closure that implements
/// [`OnSubscriptionEvent`] by dispatching every event kind through it.
pub struct SubscriptionCallbacks {
    callback: Box<EventCallbackFun>,
}

impl SubscriptionCallbacks {
    pub fn new(callback: impl FnMut(SubscriptionEvent) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl OnSubscriptionEvent for SubscriptionCallbacks {
    fn on_io_signal_state(&mut self, event: &IOSignalStateEvent) {
        (self.callback)(SubscriptionEvent::IOSignalState(event.clone()));
    }

    fn on_rapid_execution_state(&mut self, event: &RAPIDExecutionStateEvent) {
        (self.callback)(SubscriptionEvent::RAPIDExecutionState(*event));
    }

    fn on_controller_state(&mut self, event: &ControllerStateEvent) {
        (self.callback)(SubscriptionEvent::ControllerState(*event));
    }

    fn on_operation_mode(&mut self, event: &OperationModeEvent) {
        (self.callback)(SubscriptionEvent::OperationMode(*event));
    }
}

fn find_child_text<'input>(li: Node<'_, 'input>, class: &str) -> Option<&'input str> {
    li.descendants()
        .find(|n| n.is_element() && n.attribute("class") == Some(class))
        .and_then(|n| n.text())
}

/// Dispatch every `<li>` event item found in one WebSocket frame's XHTML
/// payload to `callbacks`.
///
/// RWS 1.0 packs every changed resource into the same frame as one `<li>`
/// per resource; RWS 2.0 sends one `<li>` per frame. Both shapes are handled
/// by iterating every `<li>` under `html/body/div/ul` -- for v2 that is
/// simply a list of one.
pub fn dispatch_frame(xml: &str, callbacks: &mut dyn OnSubscriptionEvent) -> Result<()> {
    let doc = roxmltree::Document::parse(xml)?;
    let ul = doc
        .descendants()
        .find(|n| n.has_tag_name("ul"))
        .ok_or_else(|| {
            Error::protocol_simple(
                "cannot parse RWS event message: can't find XML element at path html/body/div/ul",
            )
        })?;

    for li in ul.children().filter(|n| n.has_tag_name("li")) {
        dispatch_event(li, callbacks)?;
    }
    Ok(())
}

fn dispatch_event(li: Node<'_, '_>, callbacks: &mut dyn OnSubscriptionEvent) -> Result<()> {
    let class = li
        .attribute("class")
        .ok_or_else(|| Error::protocol_simple("cannot parse RWS event message: `li` has no class attribute"))?;

    match class {
        "ios-signalstate-ev" => {
            let a = li
                .children()
                .find(|n| n.has_tag_name("a"))
                .ok_or_else(|| Error::protocol_simple("cannot parse RWS event message: `li` element has no `a` element"))?;
            let uri = a.attribute("href").unwrap_or_default();
            let prefix = "/rw/iosystem/signals/";
            if !uri.starts_with(prefix) {
                return Err(Error::protocol_simple(format!(
                    "cannot parse RWS event message: invalid resource URI {uri:?}"
                )));
            }
            let rest = &uri[prefix.len()..];
            let signal = rest.split(';').next().unwrap_or(rest).to_string();
            let value = find_child_text(li, "lvalue")
                .ok_or_else(|| Error::protocol_simple("cannot parse RWS event message: missing `lvalue`"))?
                .to_string();
            callbacks.on_io_signal_state(&IOSignalStateEvent { signal, value });
        }
        "rap-ctrlexecstate-ev" => {
            let state_string = find_child_text(li, "ctrlexecstate")
                .ok_or_else(|| Error::protocol_simple("cannot parse RWS event message: missing `ctrlexecstate`"))?;
            let state = RAPIDExecutionState::parse(state_string)?;
            callbacks.on_rapid_execution_state(&RAPIDExecutionStateEvent { state });
        }
        "ctrlstate-ev" => {
            let state_string = find_child_text(li, "ctrlstate")
                .ok_or_else(|| Error::protocol_simple("cannot parse RWS event message: missing `ctrlstate`"))?;
            let state = ControllerState::parse(state_string)?;
            callbacks.on_controller_state(&ControllerStateEvent { state });
        }
        "opmode-ev" => {
            let mode_string = find_child_text(li, "opmode")
                .ok_or_else(|| Error::protocol_simple("cannot parse RWS event message: missing `opmode`"))?;
            let mode = OperationMode::parse(mode_string)?;
            callbacks.on_operation_mode(&OperationModeEvent { mode });
        }
        other => {
            return Err(Error::protocol_simple(format!(
                "cannot parse RWS event message: unrecognized class {other:?}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        signals: Vec<IOSignalStateEvent>,
        exec_states: Vec<RAPIDExecutionState>,
    }

    impl OnSubscriptionEvent for Recorder {
        fn on_io_signal_state(&mut self, event: &IOSignalStateEvent) {
            self.signals.push(event.clone());
        }

        fn on_rapid_execution_state(&mut self, event: &RAPIDExecutionStateEvent) {
            self.exec_states.push(event.state);
        }
    }

    #[test]
    fn dispatches_io_signal_event() {
        let xml = r#"<html><body><div><ul>
            <li class="ios-signalstate-ev">
                <a href="/rw/iosystem/signals/DO_1;state"/>
                <span class="lvalue">1</span>
            </li>
        </ul></div></body></html>"#;
        let mut r = Recorder::default();
        dispatch_frame(xml, &mut r).unwrap();
        assert_eq!(r.signals.len(), 1);
        assert_eq!(r.signals[0].signal, "DO_1");
        assert_eq!(r.signals[0].value, "1");
    }

    #[test]
    fn dispatches_rapid_execution_state_event() {
        let xml = r#"<html><body><div><ul>
            <li class="rap-ctrlexecstate-ev">
                <span class="ctrlexecstate">running</span>
            </li>
        </ul></div></body></html>"#;
        let mut r = Recorder::default();
        dispatch_frame(xml, &mut r).unwrap();
        assert_eq!(r.exec_states, vec![RAPIDExecutionState::Running]);
    }

    #[test]
    fn multiple_li_elements_in_one_frame_all_dispatch() {
        let xml = r#"<html><body><div><ul>
            <li class="ios-signalstate-ev"><a href="/rw/iosystem/signals/A;state"/><span class="lvalue">0</span></li>
            <li class="ios-signalstate-ev"><a href="/rw/iosystem/signals/B;state"/><span class="lvalue">1</span></li>
        </ul></div></body></html>"#;
        let mut r = Recorder::default();
        dispatch_frame(xml, &mut r).unwrap();
        assert_eq!(r.signals.len(), 2);
    }

    #[test]
    fn unrecognized_class_is_protocol_error() {
        let xml = r#"<html><body><div><ul>
            <li class="something-else-ev"></li>
        </ul></div></body></html>"#;
        let mut r = Recorder::default();
        assert!(dispatch_frame(xml, &mut r).is_err());
    }

    #[test]
    fn missing_ul_is_protocol_error() {
        let xml = "<html><body></body></html>";
        let mut r = Recorder::default();
        assert!(dispatch_frame(xml, &mut r).is_err());
    }
}
