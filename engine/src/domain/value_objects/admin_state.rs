//! AdminState value object
//! Administrative lifecycle of the device manager itself

use std::fmt;

/// Administrative state of the device manager. `Shutdown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminState {
    /// Not yet registered with the domain manager
    #[default]
    Unregistered,

    /// Registered with the domain manager; forwarding device and service
    /// registrations
    Registered,

    /// Shutdown has been requested; children are being drained
    ShuttingDown,

    /// All children reaped and unbound
    Shutdown,
}

impl AdminState {
    /// True once shutdown has started (or finished); registration forwarding
    /// stops in these states.
    pub fn is_shutting_down(&self) -> bool {
        matches!(self, AdminState::ShuttingDown | AdminState::Shutdown)
    }
}

impl fmt::Display for AdminState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminState::Unregistered => write!(f, "unregistered"),
            AdminState::Registered => write!(f, "registered"),
            AdminState::ShuttingDown => write!(f, "shutting-down"),
            AdminState::Shutdown => write!(f, "shutdown"),
        }
    }
}
