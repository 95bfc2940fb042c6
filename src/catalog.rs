//! Resource catalog: URI builders for controller resources, and bidirectional
//! string/enum mappings for the domain value sets RWS exposes over the wire.
//!
//! Every mapping function here is a pure function; none perform I/O. Unknown
//! input is always reported as [`Error::InvalidArgument`], never panics.

use crate::error::{Error, Result};

/// Protocol version spoken to the controller. The wire format of subscription
/// bodies, the WebSocket subprotocol token, and a handful of URI builders
/// differ between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    /// RWS 1.0.
    V1,
    /// RWS 2.0.
    V2,
}

impl ProtocolVersion {
    /// The WebSocket subprotocol token used when upgrading `/poll/{id}`.
    pub fn subscription_subprotocol(self) -> &'static str {
        match self {
            ProtocolVersion::V1 => "robapi2_subscription",
            ProtocolVersion::V2 => "rws_subscription",
        }
    }

    /// The `Content-Type` used for the subscription `POST` body.
    pub fn subscription_content_type(self) -> &'static str {
        match self {
            ProtocolVersion::V1 => "application/x-www-form-urlencoded",
            ProtocolVersion::V2 => "application/x-www-form-urlencoded;v=2.0",
        }
    }
}

/// Priority of a subscribed resource, controlling how eagerly the controller
/// flushes its change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionPriority {
    /// Wire value `0`.
    Low,
    /// Wire value `1`.
    Medium,
    /// Wire value `2`.
    High,
}

impl SubscriptionPriority {
    /// The integer RWS expects in the `{i}-p=` field of a subscription body.
    pub fn wire_value(self) -> u8 {
        match self {
            SubscriptionPriority::Low => 0,
            SubscriptionPriority::Medium => 1,
            SubscriptionPriority::High => 2,
        }
    }
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Parse the wire string RWS uses for this value.
            pub fn parse(s: &str) -> Result<Self> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(Error::invalid_argument(format!(
                        concat!("unrecognized ", stringify!($name), " string: {:?}"),
                        other
                    ))),
                }
            }

            /// Render the wire string RWS expects for this value.
            pub fn to_wire_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.to_wire_str())
            }
        }
    };
}

wire_enum! {
    /// Overall state of the controller, as reported by `/rw/panel/ctrlstate`.
    ControllerState {
        Init => "init",
        MotorOn => "motoron",
        MotorOff => "motoroff",
        GuardStop => "guardstop",
        EmergencyStop => "emergencystop",
        EmergencyStopReset => "emergencystopreset",
        SysFail => "sysfail",
    }
}

wire_enum! {
    /// Operation mode of the controller, as reported by `/rw/panel/opmode`.
    OperationMode {
        Init => "INIT",
        AutoChange => "AUTO_CH",
        ManualFullChange => "MANF_CH",
        ManualReduced => "MANR",
        ManualFull => "MANF",
        Auto => "AUTO",
        Undefined => "UNDEF",
    }
}

wire_enum! {
    /// Whether a RAPID program is executing.
    RAPIDExecutionState {
        Stopped => "stopped",
        Running => "running",
    }
}

wire_enum! {
    /// The run mode governing how a RAPID program proceeds across stops.
    RAPIDRunMode {
        Forever => "forever",
        AsIs => "asis",
        Once => "once",
        OnceDone => "oncedone",
    }
}

wire_enum! {
    /// Execution state of an individual RAPID task.
    RAPIDTaskExecutionState {
        Unknown => "UNKNOWN",
        Ready => "READY",
        Stopped => "STOPPED",
        Started => "STARTED",
        Uninitialized => "UNINITIALIZED",
    }
}

wire_enum! {
    /// Configuration domain, as used by the `/rw/cfg` configuration services.
    CFGDomain {
        EIO => "EIO",
        MMC => "MMC",
        MOC => "MOC",
        PROC => "PROC",
        SIO => "SIO",
        SYS => "SYS",
    }
}

wire_enum! {
    /// Reference coordinate system for a `robtarget` query.
    Coordinate {
        Base => "BASE",
        World => "WORLD",
        Tool => "TOOL",
        Wobj => "WOBJ",
        Active => "ACTIVE",
    }
}

/// A resource that can be named in a subscription body.
pub trait SubscriptionResource {
    /// The URI this resource contributes to a subscription's `POST` body,
    /// including its trailing `;<identifier>` fragment.
    fn subscription_uri(&self) -> String;
}

/// One entry in a subscribed resource list: any [`SubscriptionResource`]
/// paired with the priority it should be watched at.
pub enum SubscribedResource {
    IOSignal(IOSignalResource, SubscriptionPriority),
    RAPIDSymbol(RAPIDResource, SubscriptionPriority),
    RAPIDExecutionState(SubscriptionPriority),
    ControllerState(SubscriptionPriority),
    OperationMode(SubscriptionPriority),
}

impl SubscribedResource {
    pub fn uri(&self) -> String {
        match self {
            SubscribedResource::IOSignal(r, _) => r.subscription_uri(),
            SubscribedResource::RAPIDSymbol(r, _) => r.subscription_uri(),
            SubscribedResource::RAPIDExecutionState(_) => {
                RAPIDExecutionStateResource.subscription_uri().to_string()
            }
            SubscribedResource::ControllerState(_) => {
                ControllerStateResource.subscription_uri().to_string()
            }
            SubscribedResource::OperationMode(_) => {
                OperationModeResource.subscription_uri().to_string()
            }
        }
    }

    pub fn priority(&self) -> SubscriptionPriority {
        match self {
            SubscribedResource::IOSignal(_, p)
            | SubscribedResource::RAPIDSymbol(_, p)
            | SubscribedResource::RAPIDExecutionState(p)
            | SubscribedResource::ControllerState(p)
            | SubscribedResource::OperationMode(p) => *p,
        }
    }
}

/// An I/O signal, identified by its fully qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IOSignalResource {
    /// Signal name, e.g. `"DO_1"`.
    pub name: String,
}

impl IOSignalResource {
    /// Create a new I/O signal resource descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// `/rw/iosystem/signals/{name}`.
    pub fn uri(&self) -> String {
        format!("/rw/iosystem/signals/{}", self.name)
    }

    /// The URI this resource contributes to a subscription body:
    /// `/rw/iosystem/signals/{name};state`.
    pub fn subscription_uri(&self) -> String {
        format!("/rw/iosystem/signals/{};state", self.name)
    }
}

impl SubscriptionResource for IOSignalResource {
    fn subscription_uri(&self) -> String {
        self.subscription_uri()
    }
}

/// A RAPID symbol (a variable or persistent), identified by task/module/name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RAPIDResource {
    /// The task the symbol belongs to.
    pub task: String,
    /// The module the symbol belongs to.
    pub module: String,
    /// The symbol's name.
    pub name: String,
}

impl RAPIDResource {
    /// Create a new RAPID symbol resource descriptor.
    pub fn new(task: impl Into<String>, module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            module: module.into(),
            name: name.into(),
        }
    }

    /// `/rw/rapid/symbol/data/RAPID/{task}/{module}/{name}`.
    pub fn uri(&self) -> String {
        format!(
            "/rw/rapid/symbol/data/RAPID/{}/{}/{}",
            self.task, self.module, self.name
        )
    }

    /// The URI this resource contributes to a subscription body.
    pub fn subscription_uri(&self) -> String {
        format!("{};value", self.uri())
    }
}

impl SubscriptionResource for RAPIDResource {
    fn subscription_uri(&self) -> String {
        self.subscription_uri()
    }
}

/// Singleton resource: the RAPID execution state (`/rw/rapid/execution`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RAPIDExecutionStateResource;

impl RAPIDExecutionStateResource {
    /// `/rw/rapid/execution`.
    pub fn uri(&self) -> &'static str {
        "/rw/rapid/execution"
    }

    /// The URI this resource contributes to a subscription body.
    pub fn subscription_uri(&self) -> &'static str {
        "/rw/rapid/execution;ctrlexecstate"
    }
}

/// Singleton resource: the controller state (`/rw/panel/ctrlstate`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerStateResource;

impl ControllerStateResource {
    /// `/rw/panel/ctrlstate`.
    pub fn uri(&self) -> &'static str {
        "/rw/panel/ctrlstate"
    }

    /// The URI this resource contributes to a subscription body (v2 only).
    pub fn subscription_uri(&self) -> &'static str {
        "/rw/panel/ctrlstate;ctrlstate"
    }
}

/// Singleton resource: the operation mode (`/rw/panel/opmode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationModeResource;

impl OperationModeResource {
    /// `/rw/panel/opmode`.
    pub fn uri(&self) -> &'static str {
        "/rw/panel/opmode"
    }

    /// The URI this resource contributes to a subscription body (v2 only).
    pub fn subscription_uri(&self) -> &'static str {
        "/rw/panel/opmode;opmode"
    }
}

/// A file on the controller's file system, identified by directory and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileResource {
    /// Directory, relative to the fileservice root.
    pub directory: String,
    /// File name.
    pub filename: String,
}

impl FileResource {
    /// Create a new file resource descriptor.
    pub fn new(directory: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            filename: filename.into(),
        }
    }

    /// `/fileservice/{directory}/{filename}`.
    pub fn uri(&self) -> String {
        format!("/fileservice/{}/{}", self.directory, self.filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_state_round_trips() {
        let all = [
            ControllerState::Init,
            ControllerState::MotorOn,
            ControllerState::MotorOff,
            ControllerState::GuardStop,
            ControllerState::EmergencyStop,
            ControllerState::EmergencyStopReset,
            ControllerState::SysFail,
        ];
        for v in all {
            assert_eq!(ControllerState::parse(v.to_wire_str()).unwrap(), v);
        }
    }

    #[test]
    fn controller_state_known_spellings() {
        assert_eq!(
            ControllerState::parse("emergencystopreset").unwrap(),
            ControllerState::EmergencyStopReset
        );
        assert!(ControllerState::parse("EMERGENCYSTOP").is_err());
    }

    #[test]
    fn operation_mode_round_trips() {
        let all = [
            OperationMode::Init,
            OperationMode::AutoChange,
            OperationMode::ManualFullChange,
            OperationMode::ManualReduced,
            OperationMode::ManualFull,
            OperationMode::Auto,
            OperationMode::Undefined,
        ];
        for v in all {
            assert_eq!(OperationMode::parse(v.to_wire_str()).unwrap(), v);
        }
    }

    #[test]
    fn rapid_execution_state_round_trips() {
        for v in [RAPIDExecutionState::Stopped, RAPIDExecutionState::Running] {
            assert_eq!(RAPIDExecutionState::parse(v.to_wire_str()).unwrap(), v);
        }
    }

    #[test]
    fn cfg_domain_round_trips() {
        for v in [
            CFGDomain::EIO,
            CFGDomain::MMC,
            CFGDomain::MOC,
            CFGDomain::PROC,
            CFGDomain::SIO,
            CFGDomain::SYS,
        ] {
            assert_eq!(CFGDomain::parse(v.to_wire_str()).unwrap(), v);
        }
    }

    #[test]
    fn io_signal_uri() {
        let r = IOSignalResource::new("DO_1");
        assert_eq!(r.uri(), "/rw/iosystem/signals/DO_1");
        assert_eq!(r.subscription_uri(), "/rw/iosystem/signals/DO_1;state");
    }

    #[test]
    fn rapid_symbol_uri() {
        let r = RAPIDResource::new("T_ROB1", "MainModule", "counter");
        assert_eq!(
            r.uri(),
            "/rw/rapid/symbol/data/RAPID/T_ROB1/MainModule/counter"
        );
        assert_eq!(
            r.subscription_uri(),
            "/rw/rapid/symbol/data/RAPID/T_ROB1/MainModule/counter;value"
        );
    }
}
