//! Explicit mapping from UI events to menu commands.
//!
//! Widgets never call into the session controller themselves. They emit
//! [`UiEvent`]s, and a [`DispatchTable`] decides which [`MenuCommand`] (if
//! any) each event stands for.

use std::collections::HashMap;

/// Interactive elements of the start menu.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Widget {
    StartLocalButton,
    StartOnlineButton,
    DisconnectButton,
    PlayerNameField,
    RoomField,
    RegionField,
    CharacterField,
    MuteToggle,
    PopupOkButton,
}

/// Raw event emitted by a widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Clicked(Widget),
    TextChanged(Widget, String),
    Toggled(Widget, bool),
}

/// Operation the menu performs in response to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuCommand {
    StartLocal,
    StartOnline,
    Disconnect,
    SetPlayerName(String),
    SetRoom(String),
    SetRegion(String),
    SetCharacter(String),
    SetMuted(bool),
    DismissPopup,
}

#[derive(Debug, Clone)]
enum Binding {
    Click(MenuCommand),
    Text(fn(String) -> MenuCommand),
    Toggle(fn(bool) -> MenuCommand),
}

/// Widget → command routes. Events whose kind does not match the bound
/// route resolve to nothing.
#[derive(Debug, Clone, Default)]
pub struct DispatchTable {
    routes: HashMap<Widget, Binding>,
}

impl DispatchTable {
    /// Table with no routes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The stock start-menu wiring.
    pub fn start_menu() -> Self {
        let mut table = Self::empty();
        table
            .bind_click(Widget::StartLocalButton, MenuCommand::StartLocal)
            .bind_click(Widget::StartOnlineButton, MenuCommand::StartOnline)
            .bind_click(Widget::DisconnectButton, MenuCommand::Disconnect)
            .bind_click(Widget::PopupOkButton, MenuCommand::DismissPopup)
            .bind_text(Widget::PlayerNameField, MenuCommand::SetPlayerName)
            .bind_text(Widget::RoomField, MenuCommand::SetRoom)
            .bind_text(Widget::RegionField, MenuCommand::SetRegion)
            .bind_text(Widget::CharacterField, MenuCommand::SetCharacter)
            .bind_toggle(Widget::MuteToggle, MenuCommand::SetMuted);
        table
    }

    pub fn bind_click(&mut self, widget: Widget, command: MenuCommand) -> &mut Self {
        self.routes.insert(widget, Binding::Click(command));
        self
    }

    pub fn bind_text(&mut self, widget: Widget, command: fn(String) -> MenuCommand) -> &mut Self {
        self.routes.insert(widget, Binding::Text(command));
        self
    }

    pub fn bind_toggle(&mut self, widget: Widget, command: fn(bool) -> MenuCommand) -> &mut Self {
        self.routes.insert(widget, Binding::Toggle(command));
        self
    }

    pub fn unbind(&mut self, widget: Widget) -> &mut Self {
        self.routes.remove(&widget);
        self
    }

    /// Command for `event`, if its widget is bound for that kind of event.
    pub fn resolve(&self, event: &UiEvent) -> Option<MenuCommand> {
        match event {
            UiEvent::Clicked(widget) => match self.routes.get(widget)? {
                Binding::Click(command) => Some(command.clone()),
                _ => None,
            },
            UiEvent::TextChanged(widget, text) => match self.routes.get(widget)? {
                Binding::Text(command) => Some(command(text.clone())),
                _ => None,
            },
            UiEvent::Toggled(widget, on) => match self.routes.get(widget)? {
                Binding::Toggle(command) => Some(command(*on)),
                _ => None,
            },
        }
    }
}
