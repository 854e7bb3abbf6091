//! Start menu: persisted preferences, UI event dispatch, and the glue
//! between menu widgets and the session controller.

mod dispatch;
mod menu;
mod preferences;
mod view;

pub use dispatch::{DispatchTable, MenuCommand, UiEvent, Widget};
pub use menu::{MenuForm, StartMenu};
pub use preferences::{KEY_MUTED, KEY_PLAYER_NAME, KEY_REGION, Preferences, default_player_name};
pub use view::MenuView;
