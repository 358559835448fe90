//! WorkspaceManager: Search/Dashboard switching, overlays, and focus.

use crate::action::{ComponentId, Workspace};
use crate::focus::FocusRing;

pub struct WorkspaceManager {
    pub workspace: Workspace,

    // ── Overlays & chrome ─────────────────────────────────────────────────────
    pub show_log_panel: bool,
    pub show_help: bool,
    pub show_keys_bar: bool,
    pub show_top_items: bool,
    pub show_details: bool,

    pub focus: FocusRing,
}

impl WorkspaceManager {
    pub fn new() -> Self {
        let mut wm = Self {
            workspace: Workspace::Search,
            show_log_panel: false,
            show_help: false,
            show_keys_bar: true,
            show_top_items: false,
            show_details: false,
            focus: FocusRing::default(),
        };
        wm.rebuild_focus_ring();
        wm
    }

    fn rebuild_focus_ring(&mut self) {
        let mut items = match self.workspace {
            Workspace::Search => vec![ComponentId::SearchBar, ComponentId::Results],
            Workspace::Dashboard => vec![ComponentId::Dashboard],
        };
        if self.show_log_panel {
            items.push(ComponentId::LogPanel);
        }
        self.focus.set_items(items);
    }

    /// Returns true if the workspace actually changed.
    pub fn set_workspace(&mut self, ws: Workspace) -> bool {
        if self.workspace == ws {
            return false;
        }
        self.workspace = ws;
        self.rebuild_focus_ring();
        true
    }

    pub fn other_workspace(&self) -> Workspace {
        match self.workspace {
            Workspace::Search => Workspace::Dashboard,
            Workspace::Dashboard => Workspace::Search,
        }
    }

    pub fn toggle_log_panel(&mut self) {
        self.show_log_panel = !self.show_log_panel;
        self.rebuild_focus_ring();
    }

    pub fn dashboard_visible(&self) -> bool {
        self.workspace == Workspace::Dashboard
    }

    /// The overlay that captures keys, if any.
    pub fn active_overlay(&self) -> Option<ComponentId> {
        if self.show_help {
            Some(ComponentId::HelpOverlay)
        } else if self.show_details {
            Some(ComponentId::Details)
        } else if self.show_top_items {
            Some(ComponentId::TopItems)
        } else {
            None
        }
    }

    pub fn focused(&self) -> Option<ComponentId> {
        self.focus.current()
    }
}

impl Default for WorkspaceManager {
    fn default() -> Self {
        Self::new()
    }
}
