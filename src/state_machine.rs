use std::fmt;

/// Lifecycle of live voice mode.
///
/// `Idle -> Connecting -> Active -> Closing -> Idle`; a failed `Connecting`
/// goes straight back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
    Idle,
    Connecting,
    Active,
    Closing,
}

impl fmt::Display for LiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LiveState::Idle => "idle",
            LiveState::Connecting => "connecting",
            LiveState::Active => "active",
            LiveState::Closing => "closing",
        };
        f.write_str(name)
    }
}
