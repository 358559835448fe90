//! Action enum: all user-initiated intents.

/// Unique identifier for a focusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    NowPlaying,
    SearchBar,
    Results,
    Dashboard,
    Details,
    TopItems,
    LogPanel,
    HelpOverlay,
}

/// Which workspace (tab) is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workspace {
    Search,
    Dashboard,
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Search ───────────────────────────────────────────────────────────────
    OpenInput,
    CloseInput,
    SubmitSearch(String),
    CycleFilter,
    /// Index into the current hit list.
    ToggleLike(usize),
    OpenDetails(usize),
    CloseDetails,

    // ── Playback ─────────────────────────────────────────────────────────────
    /// Spotify track id.
    PlayTrack(String),
    TogglePause,
    Next,
    Prev,
    Volume(u8),

    // ── Dashboard ────────────────────────────────────────────────────────────
    RefreshMetrics,
    ToggleChart,

    // ── Navigation ───────────────────────────────────────────────────────────
    FocusNext,
    FocusPrev,
    FocusPane(ComponentId),
    SwitchWorkspace(Workspace),

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleTopItems,
    ToggleLogs,
    ToggleHelp,
    ToggleKeys,
    CopyToClipboard(String),

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
}
