//! Start menu orchestration.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use comet_session::{
    ErrorCallback, Popup, SessionController, SessionError, StartParameter,
};
use tracing::{debug, info, warn};

use crate::dispatch::{DispatchTable, MenuCommand, UiEvent};
use crate::preferences::Preferences;
use crate::view::MenuView;

/// Unsaved per-start form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuForm {
    pub room: String,
    pub character: String,
}

/// Drives the session controller from menu events.
pub struct StartMenu {
    controller: Arc<SessionController>,
    popup: Arc<Popup>,
    preferences: Mutex<Preferences>,
    form: Mutex<MenuForm>,
    dispatch: DispatchTable,
}

impl StartMenu {
    pub fn new(
        controller: Arc<SessionController>,
        popup: Arc<Popup>,
        preferences: Preferences,
    ) -> Self {
        Self {
            controller,
            popup,
            preferences: Mutex::new(preferences),
            form: Mutex::new(MenuForm::default()),
            dispatch: DispatchTable::start_menu(),
        }
    }

    /// Replace the stock event wiring.
    pub fn with_dispatch(mut self, dispatch: DispatchTable) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    pub fn popup(&self) -> &Arc<Popup> {
        &self.popup
    }

    pub fn form(&self) -> MenuForm {
        self.form_mut().clone()
    }

    pub fn player_name(&self) -> String {
        self.preferences().player_name()
    }

    pub fn muted(&self) -> bool {
        self.preferences().muted()
    }

    /// Resolve `event` through the dispatch table and run the command.
    /// Unbound events are ignored.
    pub async fn handle(&self, event: UiEvent) -> Result<(), SessionError> {
        match self.dispatch.resolve(&event) {
            Some(command) => self.execute(command).await,
            None => {
                debug!(?event, "no command bound to ui event");
                Ok(())
            }
        }
    }

    /// Run a single command.
    ///
    /// A failed start is also reported through the popup, after which the
    /// session is shut down; the error is returned as well.
    pub async fn execute(&self, command: MenuCommand) -> Result<(), SessionError> {
        match command {
            MenuCommand::StartLocal => self.start(false).await,
            MenuCommand::StartOnline => self.start(true).await,
            MenuCommand::Disconnect => {
                self.controller.disconnect().await;
                Ok(())
            }
            MenuCommand::SetPlayerName(name) => {
                let result = self.preferences().set_player_name(&name);
                log_store_error("player name", result);
                Ok(())
            }
            MenuCommand::SetRegion(region) => {
                let result = self.preferences().set_region(&region);
                log_store_error("region", result);
                Ok(())
            }
            MenuCommand::SetMuted(muted) => {
                let result = self.preferences().set_muted(muted);
                log_store_error("mute", result);
                Ok(())
            }
            MenuCommand::SetRoom(room) => {
                self.form_mut().room = room.trim().to_string();
                Ok(())
            }
            MenuCommand::SetCharacter(character) => {
                self.form_mut().character = character.trim().to_string();
                Ok(())
            }
            MenuCommand::DismissPopup => {
                self.popup.dismiss();
                Ok(())
            }
        }
    }

    /// Current affordances and status line.
    pub fn view(&self) -> MenuView {
        MenuView::for_state(
            self.controller.state(),
            &self.controller.room_name(),
            &self.controller.region(),
            self.controller.ping(),
        )
        .with_popup(self.popup.current())
    }

    async fn start(&self, online: bool) -> Result<(), SessionError> {
        let param = self.start_parameter(online);
        info!(online, player = %param.player_name, "starting session from menu");
        let result = self.controller.connect(param).await;
        if let Err(e) = &result {
            warn!(error = %e, "session start failed");
            report_and_shut_down(&self.popup, Arc::downgrade(&self.controller), e.to_string());
        }
        result
    }

    fn start_parameter(&self, online: bool) -> StartParameter {
        let (name, region) = {
            let mut preferences = self.preferences();
            (preferences.player_name(), preferences.region())
        };
        let form = self.form();

        let mut param = if online {
            StartParameter::online(name)
        } else {
            StartParameter::local(name)
        };
        if !form.room.is_empty() {
            param = param.with_room(form.room);
        }
        if let Some(region) = region {
            param = param.with_region(region);
        }
        if !form.character.is_empty() {
            param = param.with_character(form.character);
        }
        param.with_error_callback(self.error_callback())
    }

    fn error_callback(&self) -> ErrorCallback {
        let popup = Arc::clone(&self.popup);
        let controller = Arc::downgrade(&self.controller);
        Arc::new(move |e: SessionError| {
            report_and_shut_down(&popup, controller.clone(), e.to_string());
        })
    }

    fn preferences(&self) -> MutexGuard<'_, Preferences> {
        self.preferences
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn form_mut(&self) -> MutexGuard<'_, MenuForm> {
        self.form.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Show `message`, then force a full shutdown once it is dismissed.
///
/// The shutdown is bound to the session that was current when the message
/// was raised; if another start has happened by the time the popup is
/// dismissed, that newer session is left alone.
fn report_and_shut_down(popup: &Arc<Popup>, controller: Weak<SessionController>, message: String) {
    let popup = Arc::clone(popup);
    let Some(session) = controller.upgrade().map(|c| c.session_id()) else {
        return;
    };
    tokio::spawn(async move {
        popup.show(message).await;
        let Some(controller) = controller.upgrade() else {
            return;
        };
        if controller.session_id() == session {
            controller.disconnect().await;
        } else {
            debug!(
                session,
                current = controller.session_id(),
                "popup dismissed after a newer start, skipping shutdown"
            );
        }
    });
}

fn log_store_error(what: &str, result: Result<(), comet_config::ConfigError>) {
    if let Err(e) = result {
        warn!(error = %e, "failed to save {what} preference");
    }
}
