//! User actions on top of the patch engine.
//!
//! Controllers own the explorer state of one view and carry out the actions
//! bound to it, reaching git, the editor, the clipboard and the screen
//! through [`Common`].

mod menu;
mod patch_building;
mod staging;

pub use menu::{MenuAction, MenuContext, MenuItem, execute_menu_action, menu_items};
pub use patch_building::PatchBuildingController;
pub use staging::StagingController;

use crate::collab::{Clipboard, Editor, Ui};
use crate::config::Config;
use crate::git::GitCli;
use crate::selection::PatchExplorer;
use parking_lot::{Mutex, MutexGuard};

/// Everything an action may need to touch.
pub struct Common<'a> {
    pub git: &'a GitCli,
    pub editor: &'a dyn Editor,
    pub clipboard: &'a dyn Clipboard,
    pub ui: &'a dyn Ui,
    pub config: &'a Config,
}

/// Explorer state of one view.
///
/// `None` while the view has nothing to show. Handlers hold the lock across
/// their whole read, transform and apply so a redraw never sees a half
/// updated selection.
#[derive(Debug, Default)]
pub struct ExplorerContext {
    state: Mutex<Option<PatchExplorer>>,
}

impl ExplorerContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, Option<PatchExplorer>> {
        self.state.lock()
    }

    pub fn set_state(&self, state: Option<PatchExplorer>) {
        *self.state.lock() = state;
    }

    pub fn has_state(&self) -> bool {
        self.state.lock().is_some()
    }
}

/// Shows a busy status for as long as it lives.
pub struct BusyGuard<'a> {
    ui: &'a dyn Ui,
}

impl<'a> BusyGuard<'a> {
    pub fn new(ui: &'a dyn Ui, status: &str) -> Self {
        ui.set_busy(Some(status));
        Self { ui }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.ui.set_busy(None);
    }
}
