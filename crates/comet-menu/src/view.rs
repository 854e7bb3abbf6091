use std::time::Duration;

use comet_session::LifecycleState;

/// Which menu affordances are available, derived from the lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuView {
    pub start_enabled: bool,
    pub disconnect_enabled: bool,
    pub connecting_overlay: bool,
    /// Player name, room and character fields accept input.
    pub form_editable: bool,
    pub status: String,
    /// Message of the pending popup.
    pub popup: Option<String>,
}

impl MenuView {
    pub fn for_state(state: LifecycleState, room: &str, region: &str, ping: Duration) -> Self {
        let status = match state {
            LifecycleState::Idle => "Not connected".to_string(),
            LifecycleState::Starting => "Connecting...".to_string(),
            LifecycleState::ShuttingDown => "Disconnecting...".to_string(),
            LifecycleState::Running if room.is_empty() => "Local game".to_string(),
            LifecycleState::Running => format!(
                "Room: {room} | Region: {region} | Ping: {} ms",
                ping.as_millis()
            ),
        };
        Self {
            start_enabled: state == LifecycleState::Idle,
            disconnect_enabled: matches!(
                state,
                LifecycleState::Starting | LifecycleState::Running
            ),
            connecting_overlay: state == LifecycleState::Starting,
            form_editable: state == LifecycleState::Idle,
            status,
            popup: None,
        }
    }

    /// Attach the pending popup. Nothing can be started until it is
    /// dismissed.
    pub fn with_popup(mut self, popup: Option<String>) -> Self {
        if popup.is_some() {
            self.start_enabled = false;
        }
        self.popup = popup;
        self
    }
}
