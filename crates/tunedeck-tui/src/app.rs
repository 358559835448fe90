//! App: the event loop that owns all state and wires components to the server.
//!
//! Everything network-bound runs in spawned tasks that report back through one
//! `AppMessage` channel; only this loop mutates `AppState`.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use ratatui::crossterm::{
    event::{
        self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
        Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::Block,
    Frame, Terminal,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use tunedeck_proto::bus::{MetricsBus, MetricsSignal};
use tunedeck_proto::client::{ApiClient, ApiError, ApiResult};
use tunedeck_proto::config::{ChartVariant, Config};
use tunedeck_proto::likes::{LikeStore, PrecisionSample};
use tunedeck_proto::metrics::{MetricsStore, Outcome, Trigger};
use tunedeck_proto::playback;
use tunedeck_proto::protocol::{
    Entity, EntityKind, InteractionKind, MetricsSnapshot, PlaybackState, SearchFilter, SearchHit,
    SearchResponse, SpotifyAlbum, SpotifyArtist, SpotifyTrack, StatCounts, TopArtist, TopTrack,
};
use tunedeck_proto::sequence::{RequestSeq, Ticket};
use tunedeck_proto::session::{SavedSearch, SessionStore, KEY_LAST_SEARCH};
use tunedeck_proto::tracking::{describe, Tracker};

use crate::{
    action::{Action, ComponentId, Workspace},
    app_state::{failure_text, AppState, DetailsView, Enrichment, SearchStatus, Section},
    component::Component,
    components::{
        dashboard::Dashboard, details::Details, help_overlay::HelpOverlay, log_panel::LogPanel,
        now_playing::NowPlaying, result_list::ResultList, search_bar::SearchBar,
        top_items::TopItems,
    },
    intent::IntentState,
    theme::C_BG,
    widgets::{
        status_bar::{draw_keys_bar, InputMode},
        toast::ToastManager,
    },
    workspace::WorkspaceManager,
};

const SEARCH_FAILED: &str = "An error occurred while searching. Please try again.";
const VOLUME_STEP: u8 = 5;

/// Results of the secondary lookups for an open detail view.
enum DetailsPart {
    ArtistCatalog(ApiResult<SpotifyArtist>),
    ArtistSongs(ApiResult<Vec<SpotifyTrack>>),
    AlbumCatalog(ApiResult<SpotifyAlbum>),
    SongMatches {
        result: ApiResult<Vec<SpotifyTrack>>,
        fallback: &'static str,
    },
}

/// Internal messages delivered to the event loop.
enum AppMessage {
    Event(Event),
    SearchFinished {
        ticket: Ticket,
        query: String,
        filter: SearchFilter,
        result: ApiResult<SearchResponse>,
    },
    PlaybackPolled(Ticket, ApiResult<Option<PlaybackState>>),
    MetricsFetched {
        ticket: Ticket,
        metrics: ApiResult<MetricsSnapshot>,
        genres: ApiResult<StatCounts>,
        artists: ApiResult<StatCounts>,
    },
    DetailsLoaded(u64, DetailsPart),
    TopTracks(ApiResult<Vec<TopTrack>>),
    TopArtists(ApiResult<Vec<TopArtist>>),
    MetricsSignal(MetricsSignal),
    /// Poll `/currently-playing` now instead of waiting for the next tick.
    RepollNowPlaying,
    CommandFailed(&'static str, ApiError),
    Unauthorized,
}

pub struct App {
    state: AppState,
    wm: WorkspaceManager,
    toast: ToastManager,

    client: ApiClient,
    tracker: Tracker,
    session: SessionStore,

    // ── Components ───────────────────────────────────────────────────────────
    now_playing_bar: NowPlaying,
    search_bar: SearchBar,
    result_list: ResultList,
    dashboard: Dashboard,
    details: Details,
    top_items: TopItems,
    log_panel: LogPanel,
    help_overlay: HelpOverlay,

    // ── Playback ─────────────────────────────────────────────────────────────
    listening: playback::NowPlaying,
    /// Intended "is playing" flag.
    intent_pause: IntentState<bool>,
    intent_volume: IntentState<u8>,

    // ── Request ordering ─────────────────────────────────────────────────────
    search_seq: RequestSeq,
    playback_seq: RequestSeq,
    details_counter: u64,

    /// Screen areas of the panes drawn last frame, for mouse hit-testing.
    pane_areas: HashMap<ComponentId, Rect>,
    tui_log_path: PathBuf,

    now_playing_period: Duration,
    dashboard_period: Duration,
    replay_delay: Duration,
    exit_flush_timeout: Duration,

    tx: mpsc::Sender<AppMessage>,
    rx: Option<mpsc::Receiver<AppMessage>>,
    should_quit: bool,
}

impl App {
    pub fn new(config: &Config, client: ApiClient, session: SessionStore, tui_log_path: PathBuf) -> Self {
        let (tx, rx) = mpsc::channel::<AppMessage>(1024);
        let tracker = Tracker::new(client.clone(), MetricsBus::new());

        let mut metrics = MetricsStore::new(config.polling.metrics_freshness());
        metrics.restore(&session);

        let mut state = AppState::new(metrics, config.dashboard.chart);
        state.likes = LikeStore::load(&session);
        if let Some(saved) = session.get::<SavedSearch>(KEY_LAST_SEARCH) {
            info!(
                "restored last search \"{}\" ({} hits)",
                saved.query,
                saved.hits.len()
            );
            state.search.query = saved.query;
            state.search.filter = saved.filter;
            state.search.session_id = saved.session_id;
            state.search.hits = saved.hits;
            state.search.has_results = true;
        }

        Self {
            state,
            wm: WorkspaceManager::new(),
            toast: ToastManager::new(),
            client,
            tracker,
            session,
            now_playing_bar: NowPlaying,
            search_bar: SearchBar::new(),
            result_list: ResultList::new(),
            dashboard: Dashboard,
            details: Details::new(),
            top_items: TopItems,
            log_panel: LogPanel::new(),
            help_overlay: HelpOverlay,
            listening: playback::NowPlaying::new(),
            intent_pause: IntentState::new(false),
            intent_volume: IntentState::new(50),
            search_seq: RequestSeq::new(),
            playback_seq: RequestSeq::new(),
            details_counter: 0,
            pane_areas: HashMap::new(),
            tui_log_path,
            now_playing_period: config.polling.now_playing_period(),
            dashboard_period: config.polling.dashboard_period(),
            replay_delay: config.polling.replay_delay(),
            exit_flush_timeout: config.polling.exit_flush_timeout(),
            tx,
            rx: Some(rx),
            should_quit: false,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        let Some(mut rx) = self.rx.take() else {
            anyhow::bail!("event loop already started");
        };

        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        // ── Background task: keyboard/mouse events ────────────────────────────
        let event_tx = self.tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: metrics bus → AppMessage ─────────────────────────
        let bus_tx = self.tx.clone();
        let mut signals = self.tracker.bus().subscribe();
        tokio::spawn(async move {
            loop {
                match signals.recv().await {
                    Ok(signal) => {
                        if bus_tx.send(AppMessage::MetricsSignal(signal)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("metrics bus receiver lagged by {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        self.send_precision();

        // ── Periodic timers ───────────────────────────────────────────────────
        let mut now_playing_poll = tokio::time::interval(self.now_playing_period);
        now_playing_poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut dashboard_poll = tokio::time::interval(self.dashboard_period);
        dashboard_poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Toast expiry, spinner animation and intent timeouts.
        let mut toast_tick = tokio::time::interval(Duration::from_millis(100));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Deferred metrics refreshes.
        let mut ui_tick = tokio::time::interval(Duration::from_millis(250));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // tui.log tail refresh: every 2s, only when log panel is open
        let mut log_refresh = tokio::time::interval(Duration::from_secs(2));
        log_refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    const MAX_DRAIN: usize = 256;
                    let mut redraw = self.handle_message(msg);
                    let mut drained = 0usize;
                    while drained < MAX_DRAIN {
                        let Ok(next) = rx.try_recv() else {
                            break;
                        };
                        drained += 1;
                        redraw |= self.handle_message(next);
                    }
                    needs_redraw = redraw;
                }

                _ = now_playing_poll.tick() => {
                    self.poll_now_playing();
                }

                _ = dashboard_poll.tick() => {
                    if self.wm.dashboard_visible() {
                        self.request_metrics(Trigger::Interval);
                    }
                }

                _ = toast_tick.tick() => {
                    let now = Instant::now();
                    self.toast.tick();
                    if self.intent_pause.tick(now) {
                        self.toast.warning("play/pause not confirmed by the server");
                    }
                    if self.intent_volume.tick(now) {
                        self.toast.warning("volume change not confirmed by the server");
                    }
                    self.state.pause_hint = self.intent_pause.render_state(now);
                    self.state.volume_hint = self.intent_volume.render_state(now);
                    needs_redraw = true;
                }

                _ = ui_tick.tick() => {
                    if let Some(ticket) = self.state.metrics.release_deferred(Instant::now()) {
                        debug!("releasing deferred metrics refresh");
                        self.spawn_metrics_fetch(ticket);
                    }
                }

                _ = log_refresh.tick() => {
                    if self.wm.show_log_panel {
                        self.reload_tui_log();
                        needs_redraw = true;
                    }
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture,
            DisableFocusChange
        )?;
        terminal.show_cursor()?;

        if let Some(report) = self.listening.flush(Instant::now()) {
            info!("flushing {:.1}s of {} on exit", report.duration_secs, report.track_id);
            self.tracker
                .flush_on_exit(&report, self.exit_flush_timeout)
                .await;
        }
        info!("tunedeck exiting");
        Ok(())
    }

    // ── Message handling ──────────────────────────────────────────────────────

    /// Returns true if the screen needs a redraw.
    fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(Event::Key(key)) => self.handle_key(key),
            AppMessage::Event(Event::Mouse(mouse)) => self.handle_mouse(mouse),
            AppMessage::Event(Event::FocusGained) => {
                if self.wm.dashboard_visible() {
                    self.request_metrics(Trigger::Visible);
                }
                self.poll_now_playing();
            }
            AppMessage::Event(Event::Resize(_, _)) => {}
            AppMessage::Event(_) => return false,

            AppMessage::SearchFinished {
                ticket,
                query,
                filter,
                result,
            } => self.on_search_finished(ticket, query, filter, result),

            AppMessage::PlaybackPolled(ticket, result) => {
                if !self.playback_seq.accept(ticket) {
                    return false;
                }
                self.on_playback_polled(result);
            }

            AppMessage::MetricsFetched {
                ticket,
                metrics,
                genres,
                artists,
            } => {
                let now = Instant::now();
                match self.state.metrics.complete(ticket, metrics, now) {
                    Outcome::Superseded => return false,
                    Outcome::Applied => {
                        if let Err(e) = self.state.metrics.persist(&mut self.session) {
                            warn!("failed to persist metrics snapshot: {}", e);
                        }
                    }
                    Outcome::FellBack => debug!("metrics fetch failed, showing cached snapshot"),
                    Outcome::Unavailable => debug!("metrics fetch failed, nothing cached"),
                }
                self.state.genre_stats = Section::from_result(genres, "Failed to load genre stats");
                self.state.artist_stats =
                    Section::from_result(artists, "Failed to load artist stats");
            }

            AppMessage::DetailsLoaded(request_id, part) => self.on_details_part(request_id, part),

            AppMessage::TopTracks(result) => {
                if result.as_ref().is_err_and(ApiError::is_unauthorized) {
                    self.on_unauthorized();
                }
                self.state.top_tracks = Section::from_list(result, "Failed to load top tracks");
            }
            AppMessage::TopArtists(result) => {
                if result.as_ref().is_err_and(ApiError::is_unauthorized) {
                    self.on_unauthorized();
                }
                self.state.top_artists = Section::from_list(result, "Failed to load top artists");
            }

            AppMessage::MetricsSignal(signal) => {
                debug!("metrics signal: {:?}", signal);
                if self.wm.dashboard_visible() {
                    self.request_metrics(Trigger::Signal);
                }
                return false;
            }

            AppMessage::RepollNowPlaying => {
                self.poll_now_playing();
                return false;
            }

            AppMessage::CommandFailed(label, e) => {
                if e.is_unauthorized() {
                    self.on_unauthorized();
                } else {
                    warn!("{} failed: {}", label, e);
                    self.toast
                        .error(format!("{} failed: {}", label, failure_text(&e, "server unreachable")));
                }
            }

            AppMessage::Unauthorized => self.on_unauthorized(),
        }
        true
    }

    fn on_search_finished(
        &mut self,
        ticket: Ticket,
        query: String,
        filter: SearchFilter,
        result: ApiResult<SearchResponse>,
    ) {
        // Only the most recently issued search may land.
        if !self.search_seq.is_latest(ticket) || !self.search_seq.accept(ticket) {
            return;
        }
        self.toast.dismiss_spinner();
        let search = &mut self.state.search;
        search.has_results = true;
        match result {
            Ok(SearchResponse {
                error: Some(message),
                ..
            }) => {
                warn!("search \"{}\" rejected: {}", query, message);
                search.hits.clear();
                search.status = SearchStatus::Failed(message);
            }
            Ok(response) => {
                info!(
                    "search \"{}\" [{}] → {} hits",
                    query,
                    filter.as_query(),
                    response.hits.len()
                );
                search.hits = response.hits;
                if response.session_id.is_some() {
                    search.session_id = response.session_id;
                }
                search.status = SearchStatus::Idle;
                let saved = SavedSearch {
                    query,
                    filter,
                    session_id: search.session_id.clone(),
                    hits: search.hits.clone(),
                };
                if let Err(e) = self.session.set(KEY_LAST_SEARCH, &saved) {
                    warn!("failed to save last search: {}", e);
                }
                self.send_precision();
            }
            Err(e) => {
                warn!("search \"{}\" failed: {}", query, e);
                search.hits.clear();
                search.status = SearchStatus::Failed(SEARCH_FAILED.to_string());
                if e.is_unauthorized() {
                    self.on_unauthorized();
                }
            }
        }
    }

    fn on_playback_polled(&mut self, result: ApiResult<Option<PlaybackState>>) {
        let playback = match result {
            Ok(playback) => playback,
            Err(e) if e.is_unauthorized() => {
                self.on_unauthorized();
                return;
            }
            Err(e) => {
                debug!("now-playing poll failed: {}", e);
                return;
            }
        };
        if self.state.signed_out.take().is_some() {
            info!("signed in again");
        }

        if let Some(report) = self.listening.observe(playback.as_ref(), Instant::now()) {
            let tracker = self.tracker.clone();
            let tx = self.tx.clone();
            tokio::spawn(async move {
                let result = tracker.play(&report).await;
                log_failure(&tx, "play report", result).await;
            });
        }

        if let Some(p) = &playback {
            self.intent_pause.on_confirmed(p.is_playing);
            if let Some(volume) = p.volume {
                self.intent_volume.on_confirmed(volume);
            }
        }
        self.state.volume = *self.intent_volume.intended();
        let playing = *self.intent_pause.intended();
        self.state.playback = playback.map(|mut p| {
            p.is_playing = playing;
            p
        });
    }

    fn on_details_part(&mut self, request_id: u64, part: DetailsPart) {
        let Some(view) = self
            .state
            .details
            .as_mut()
            .filter(|v| v.request_id == request_id)
        else {
            debug!("dropping details response for closed view #{}", request_id);
            return;
        };
        match (&mut view.enrichment, part) {
            (Enrichment::Artist { catalog, .. }, DetailsPart::ArtistCatalog(result)) => {
                *catalog = Section::from_result(result, "Failed to load Spotify artist");
            }
            (Enrichment::Artist { songs, .. }, DetailsPart::ArtistSongs(result)) => {
                *songs = Section::from_list(result, "Failed to load songs");
            }
            (Enrichment::Album { catalog }, DetailsPart::AlbumCatalog(result)) => {
                *catalog = Section::from_result(result, "Failed to load Spotify album");
            }
            (Enrichment::Song { matches }, DetailsPart::SongMatches { result, fallback }) => {
                *matches = Section::from_list(result, fallback);
            }
            _ => warn!("details response does not match the open view"),
        }
    }

    fn on_unauthorized(&mut self) {
        if self.state.signed_out.is_none() {
            let login = self.client.login_url();
            warn!("server reports not signed in; sign in at {}", login);
            self.toast.warning(format!("sign in at {}", login));
            self.state.signed_out = Some(login);
        }
    }

    // ── Keyboard handling ─────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.dispatch(Action::Quit);
            return;
        }

        // Overlays capture keys; only transport keys fall through.
        if let Some(overlay) = self.wm.active_overlay() {
            let actions = self.component_key(overlay, key);
            if actions.is_empty() {
                if let Some(action) = self.transport_action(key) {
                    self.dispatch(action);
                }
            }
            for action in actions {
                self.dispatch(action);
            }
            return;
        }

        if self.state.input_mode == InputMode::Search {
            match key.code {
                KeyCode::Tab => {
                    self.dispatch(Action::CloseInput);
                    self.dispatch(Action::FocusNext);
                }
                KeyCode::BackTab => {
                    self.dispatch(Action::CloseInput);
                    self.dispatch(Action::FocusPrev);
                }
                _ => {
                    for action in self.search_bar.handle_key(key, &self.state) {
                        self.dispatch(action);
                    }
                }
            }
            return;
        }

        let global = match (key.code, key.modifiers) {
            (KeyCode::Char('q'), KeyModifiers::NONE) => vec![Action::Quit],
            (KeyCode::Char('?'), _) => vec![Action::ToggleHelp],
            (KeyCode::Char('L'), _) => vec![Action::ToggleLogs],
            (KeyCode::Char('K'), _) => vec![Action::ToggleKeys],
            (KeyCode::Char('T'), _) => vec![Action::ToggleTopItems],
            (KeyCode::Char('F'), _) => vec![Action::CycleFilter],
            (KeyCode::Char('/'), _) => vec![
                Action::SwitchWorkspace(Workspace::Search),
                Action::FocusPane(ComponentId::SearchBar),
                Action::OpenInput,
            ],
            (KeyCode::Char('d'), KeyModifiers::NONE) => {
                vec![Action::SwitchWorkspace(self.wm.other_workspace())]
            }
            (KeyCode::Char('1'), _) => vec![Action::SwitchWorkspace(Workspace::Search)],
            (KeyCode::Char('2'), _) => vec![Action::SwitchWorkspace(Workspace::Dashboard)],
            (KeyCode::Tab, _) => vec![Action::FocusNext],
            (KeyCode::BackTab, _) => vec![Action::FocusPrev],
            _ => self.transport_action(key).into_iter().collect(),
        };
        if !global.is_empty() {
            for action in global {
                self.dispatch(action);
            }
            return;
        }

        if let Some(focused) = self.wm.focused() {
            for action in self.component_key(focused, key) {
                self.dispatch(action);
            }
        }
    }

    fn transport_action(&self, key: KeyEvent) -> Option<Action> {
        let volume = *self.intent_volume.intended();
        match key.code {
            KeyCode::Char(' ') => Some(Action::TogglePause),
            KeyCode::Char('n') => Some(Action::Next),
            KeyCode::Char('p') => Some(Action::Prev),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                Some(Action::Volume(volume.saturating_add(VOLUME_STEP).min(100)))
            }
            KeyCode::Char('-') => Some(Action::Volume(volume.saturating_sub(VOLUME_STEP))),
            _ => None,
        }
    }

    fn component_key(&mut self, id: ComponentId, key: KeyEvent) -> Vec<Action> {
        let state = &self.state;
        match id {
            ComponentId::NowPlaying => self.now_playing_bar.handle_key(key, state),
            ComponentId::SearchBar => self.search_bar.handle_key(key, state),
            ComponentId::Results => self.result_list.handle_key(key, state),
            ComponentId::Dashboard => self.dashboard.handle_key(key, state),
            ComponentId::Details => self.details.handle_key(key, state),
            ComponentId::TopItems => self.top_items.handle_key(key, state),
            ComponentId::LogPanel => self.log_panel.handle_key(key, state),
            ComponentId::HelpOverlay => self.help_overlay.handle_key(key, state),
        }
    }

    // ── Mouse handling ────────────────────────────────────────────────────────

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if !matches!(
            mouse.kind,
            MouseEventKind::Down(_) | MouseEventKind::ScrollUp | MouseEventKind::ScrollDown
        ) {
            return;
        }

        fn hit(r: Rect, col: u16, row: u16) -> bool {
            r.width > 0
                && r.height > 0
                && col >= r.x
                && col < r.x + r.width
                && row >= r.y
                && row < r.y + r.height
        }

        if let Some(overlay) = self.wm.active_overlay() {
            let area = self.pane_areas.get(&overlay).copied().unwrap_or_default();
            let actions = self.component_mouse(overlay, mouse, area);
            for action in actions {
                self.dispatch(action);
            }
            return;
        }

        let target = self
            .pane_areas
            .iter()
            .find(|(_, r)| hit(**r, mouse.column, mouse.row))
            .map(|(id, r)| (*id, *r));
        let Some((id, area)) = target else {
            return;
        };

        let mut actions = Vec::new();
        if matches!(mouse.kind, MouseEventKind::Down(_)) && self.wm.focused() != Some(id) {
            actions.push(Action::FocusPane(id));
        }
        actions.extend(self.component_mouse(id, mouse, area));
        for action in actions {
            self.dispatch(action);
        }
    }

    fn component_mouse(&mut self, id: ComponentId, mouse: MouseEvent, area: Rect) -> Vec<Action> {
        let state = &self.state;
        match id {
            ComponentId::NowPlaying => self.now_playing_bar.handle_mouse(mouse, area, state),
            ComponentId::SearchBar => self.search_bar.handle_mouse(mouse, area, state),
            ComponentId::Results => self.result_list.handle_mouse(mouse, area, state),
            ComponentId::Dashboard => self.dashboard.handle_mouse(mouse, area, state),
            ComponentId::Details => self.details.handle_mouse(mouse, area, state),
            ComponentId::TopItems => self.top_items.handle_mouse(mouse, area, state),
            ComponentId::LogPanel => self.log_panel.handle_mouse(mouse, area, state),
            ComponentId::HelpOverlay => self.help_overlay.handle_mouse(mouse, area, state),
        }
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Offer `action` to every component, apply it, then apply whatever the
    /// components returned in response (one level deep).
    fn dispatch(&mut self, action: Action) {
        for secondary in self.dispatch_once(action) {
            let _ = self.dispatch_once(secondary);
        }
    }

    fn dispatch_once(&mut self, action: Action) -> Vec<Action> {
        let mut follow_up = {
            let s = &self.state;
            let mut all = Vec::new();
            all.extend(self.search_bar.on_action(&action, s));
            all.extend(self.result_list.on_action(&action, s));
            all.extend(self.dashboard.on_action(&action, s));
            all.extend(self.details.on_action(&action, s));
            all.extend(self.top_items.on_action(&action, s));
            all.extend(self.log_panel.on_action(&action, s));
            all
        };
        follow_up.extend(self.apply_action(action));
        follow_up
    }

    fn apply_action(&mut self, action: Action) -> Vec<Action> {
        debug!("apply_action: {:?}", action);
        match action {
            // ── Search ───────────────────────────────────────────────────────
            Action::OpenInput => {
                self.state.input_mode = InputMode::Search;
                self.wm.focus.set(ComponentId::SearchBar);
            }
            Action::CloseInput => self.state.input_mode = InputMode::Normal,
            Action::SubmitSearch(query) => {
                self.state.search.query = query.trim().to_string();
                self.run_search();
            }
            Action::CycleFilter => {
                self.state.search.filter = self.state.search.filter.next();
                self.toast
                    .info(format!("filter: {}", self.state.search.filter.as_query()));
                if !self.state.search.query.is_empty() {
                    self.run_search();
                }
            }
            Action::ToggleLike(index) => self.toggle_like(index),
            Action::OpenDetails(index) => self.open_details(index),
            Action::CloseDetails => {
                self.wm.show_details = false;
                self.state.details = None;
            }

            // ── Playback ─────────────────────────────────────────────────────
            Action::PlayTrack(track_id) => self.play_track(track_id),
            Action::TogglePause => {
                let playing = self.state.playback.as_ref().is_some_and(|p| p.is_playing);
                self.intent_pause.set_intent(!playing, Instant::now());
                if let Some(p) = self.state.playback.as_mut() {
                    p.is_playing = !playing;
                }
                let client = self.client.clone();
                self.spawn_command("play/pause", async move { client.toggle_playback().await });
            }
            Action::Next => {
                let client = self.client.clone();
                self.spawn_command("next track", async move { client.next_track().await });
            }
            Action::Prev => {
                let client = self.client.clone();
                self.spawn_command("previous track", async move {
                    client.previous_track().await
                });
            }
            Action::Volume(volume) => {
                let volume = volume.min(100);
                self.intent_volume.set_intent(volume, Instant::now());
                self.state.volume = volume;
                let client = self.client.clone();
                self.spawn_command("volume", async move { client.set_volume(volume).await });
            }

            // ── Dashboard ────────────────────────────────────────────────────
            Action::RefreshMetrics => {
                self.toast.info("refreshing metrics");
                self.request_metrics(Trigger::Manual);
            }
            Action::ToggleChart => {
                self.state.chart = match self.state.chart {
                    ChartVariant::Precision => ChartVariant::Likes,
                    ChartVariant::Likes => ChartVariant::Precision,
                };
            }

            // ── Navigation ───────────────────────────────────────────────────
            Action::FocusNext => {
                self.wm.focus.next();
                return self.close_input_unless_focused();
            }
            Action::FocusPrev => {
                self.wm.focus.prev();
                return self.close_input_unless_focused();
            }
            Action::FocusPane(id) => {
                self.wm.focus.set(id);
                return self.close_input_unless_focused();
            }
            Action::SwitchWorkspace(ws) => {
                if self.wm.set_workspace(ws) {
                    self.state.workspace = ws;
                    if self.wm.dashboard_visible() {
                        self.request_metrics(Trigger::Visible);
                    }
                    return self.close_input_unless_focused();
                }
            }

            // ── UI toggles ───────────────────────────────────────────────────
            Action::ToggleTopItems => {
                self.wm.show_top_items = !self.wm.show_top_items;
                if self.wm.show_top_items {
                    self.load_top_items();
                }
            }
            Action::ToggleLogs => {
                self.wm.toggle_log_panel();
                if self.wm.show_log_panel {
                    self.reload_tui_log();
                }
            }
            Action::ToggleHelp => self.wm.show_help = !self.wm.show_help,
            Action::ToggleKeys => self.wm.show_keys_bar = !self.wm.show_keys_bar,
            Action::CopyToClipboard(text) => {
                match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.clone())) {
                    Ok(()) => {
                        let display = if text.chars().count() > 40 {
                            format!("{}…", text.chars().take(40).collect::<String>())
                        } else {
                            text.clone()
                        };
                        self.toast.success(format!("copied: {}", display));
                    }
                    Err(e) => {
                        warn!("clipboard error: {}", e);
                        self.toast.error(format!("clipboard error: {}", e));
                    }
                }
            }

            // ── System ───────────────────────────────────────────────────────
            Action::Quit => self.should_quit = true,
        }
        Vec::new()
    }

    fn close_input_unless_focused(&mut self) -> Vec<Action> {
        if self.state.input_mode == InputMode::Search
            && self.wm.focused() != Some(ComponentId::SearchBar)
        {
            self.state.input_mode = InputMode::Normal;
            return vec![Action::CloseInput];
        }
        Vec::new()
    }

    // ── Search & likes ────────────────────────────────────────────────────────

    fn run_search(&mut self) {
        let query = self.state.search.query.clone();
        let filter = self.state.search.filter;
        if query.is_empty() {
            self.search_seq.issue();
            self.toast.dismiss_spinner();
            self.state.search.hits.clear();
            self.state.search.status = SearchStatus::Idle;
            self.state.search.has_results = false;
            if let Err(e) = self.session.remove(KEY_LAST_SEARCH) {
                warn!("failed to forget last search: {}", e);
            }
            return;
        }

        let ticket = self.search_seq.issue();
        self.state.search.status = SearchStatus::Searching;
        self.toast.spinner(format!("searching \"{}\"", query));
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = client.search(&query, filter).await;
            let _ = tx
                .send(AppMessage::SearchFinished {
                    ticket,
                    query,
                    filter,
                    result,
                })
                .await;
        });
    }

    fn toggle_like(&mut self, index: usize) {
        let Some(hit) = self.state.hit(index).cloned() else {
            return;
        };
        if hit.kind() != EntityKind::Song {
            return;
        }
        let key = hit.like_key();
        let liked = self.state.likes.toggle(&key);
        if let Err(e) = self.state.likes.save(&mut self.session) {
            warn!("failed to save likes: {}", e);
        }
        self.toast
            .info(format!("{}: {}", if liked { "liked" } else { "unliked" }, hit.title));

        let sample = PrecisionSample::compute(&self.state.search.hits, &self.state.likes);
        let interaction = if liked {
            InteractionKind::Like
        } else {
            InteractionKind::Unlike
        };
        let session_id = self.state.search.session_id.clone();
        let tracker = self.tracker.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let sid = session_id.as_deref();
            let result = tracker.click(sid, &key, hit.kind(), interaction).await;
            log_failure(&tx, "like tracking", result).await;
            let result = tracker.precision(sid, sample).await;
            log_failure(&tx, "precision update", result).await;
        });
    }

    /// Every displayed result list, fresh or restored, reports its precision.
    fn send_precision(&self) {
        let search = &self.state.search;
        if search.hits.is_empty() || search.session_id.is_none() {
            return;
        }
        let sample = PrecisionSample::compute(&search.hits, &self.state.likes);
        let session_id = search.session_id.clone();
        let tracker = self.tracker.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = tracker.precision(session_id.as_deref(), sample).await;
            log_failure(&tx, "precision update", result).await;
        });
    }

    // ── Details ───────────────────────────────────────────────────────────────

    fn open_details(&mut self, index: usize) {
        let Some(hit) = self.state.hit(index).cloned() else {
            return;
        };
        self.details_counter += 1;
        let request_id = self.details_counter;
        let enrichment = match hit.kind() {
            EntityKind::Artist => Enrichment::Artist {
                catalog: Section::Loading,
                songs: Section::Loading,
            },
            EntityKind::Album => Enrichment::Album {
                catalog: Section::Loading,
            },
            EntityKind::Song => Enrichment::Song {
                matches: Section::Loading,
            },
        };
        debug!("opening details #{} for \"{}\"", request_id, hit.title);
        self.state.details = Some(DetailsView {
            request_id,
            hit: hit.clone(),
            enrichment,
        });
        self.wm.show_details = true;

        let session_id = self.state.search.session_id.clone();
        let tracker = self.tracker.clone();
        let tx = self.tx.clone();
        let tracked = hit.clone();
        tokio::spawn(async move {
            let sid = session_id.as_deref();
            let kind = tracked.kind();
            let result = tracker
                .click(sid, &tracked.like_key(), kind, InteractionKind::Click)
                .await;
            log_failure(&tx, "click tracking", result).await;
            let result = tracker
                .click(sid, &describe(&tracked), kind, InteractionKind::from(kind))
                .await;
            log_failure(&tx, "details tracking", result).await;
        });

        self.spawn_detail_fetches(request_id, &hit);
    }

    fn spawn_detail_fetches(&self, request_id: u64, hit: &SearchHit) {
        match &hit.entity {
            Entity::Artist(_) => {
                let name = hit.title.clone();
                self.spawn_detail(request_id, {
                    let client = self.client.clone();
                    let name = name.clone();
                    async move { DetailsPart::ArtistCatalog(client.spotify_artist(&name).await) }
                });
                let client = self.client.clone();
                self.spawn_detail(request_id, async move {
                    DetailsPart::ArtistSongs(client.artist_songs(&name).await)
                });
            }
            Entity::Album(album) => {
                let by = album.artist_name.as_deref().or(album.name.as_deref()).unwrap_or("");
                let query = format!("{} {}", hit.title, by).trim().to_string();
                let client = self.client.clone();
                self.spawn_detail(request_id, async move {
                    DetailsPart::AlbumCatalog(client.spotify_album(&query).await)
                });
            }
            Entity::Song(song) => {
                let client = self.client.clone();
                match song.spotify_track_id() {
                    Some(id) => {
                        let id = id.to_string();
                        self.spawn_detail(request_id, async move {
                            DetailsPart::SongMatches {
                                result: client.spotify_track(&id).await.map(|t| vec![t]),
                                fallback: "Failed to load Spotify track",
                            }
                        });
                    }
                    None => {
                        let by = song.artist.as_deref().or(song.name.as_deref()).unwrap_or("");
                        let query = format!("{} {}", hit.title, by).trim().to_string();
                        self.spawn_detail(request_id, async move {
                            DetailsPart::SongMatches {
                                result: client.spotify_tracks(&query).await,
                                fallback: "Failed to search Spotify tracks",
                            }
                        });
                    }
                }
            }
        }
    }

    fn spawn_detail(&self, request_id: u64, fetch: impl Future<Output = DetailsPart> + Send + 'static) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let part = fetch.await;
            let _ = tx.send(AppMessage::DetailsLoaded(request_id, part)).await;
        });
    }

    // ── Playback ──────────────────────────────────────────────────────────────

    fn poll_now_playing(&self) {
        let ticket = self.playback_seq.issue();
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = client.currently_playing().await;
            let _ = tx.send(AppMessage::PlaybackPolled(ticket, result)).await;
        });
    }

    fn play_track(&mut self, track_id: String) {
        self.toast.info("starting playback");
        let client = self.client.clone();
        let tx = self.tx.clone();
        let delay = self.replay_delay;
        tokio::spawn(async move {
            match client.play_track(&track_id).await {
                Ok(()) => {
                    info!("requested playback of {}", track_id);
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(AppMessage::RepollNowPlaying).await;
                }
                Err(e) => {
                    let _ = tx.send(AppMessage::CommandFailed("play", e)).await;
                }
            }
        });
    }

    /// Run a transport command; success re-polls, failure reports back.
    fn spawn_command(
        &self,
        label: &'static str,
        command: impl Future<Output = ApiResult<()>> + Send + 'static,
    ) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let msg = match command.await {
                Ok(()) => AppMessage::RepollNowPlaying,
                Err(e) => AppMessage::CommandFailed(label, e),
            };
            let _ = tx.send(msg).await;
        });
    }

    // ── Dashboard ─────────────────────────────────────────────────────────────

    fn request_metrics(&mut self, trigger: Trigger) {
        if let Some(ticket) = self.state.metrics.request(trigger, Instant::now()) {
            debug!("metrics refresh #{} ({:?})", ticket.value(), trigger);
            self.spawn_metrics_fetch(ticket);
        }
    }

    fn spawn_metrics_fetch(&self, ticket: Ticket) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let (metrics, genres, artists) = tokio::join!(
                client.latest_metrics(),
                client.genre_stats(),
                client.artist_stats()
            );
            let _ = tx
                .send(AppMessage::MetricsFetched {
                    ticket,
                    metrics,
                    genres,
                    artists,
                })
                .await;
        });
    }

    fn load_top_items(&mut self) {
        self.state.top_tracks = Section::Loading;
        self.state.top_artists = Section::Loading;

        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = client.top_tracks().await;
            let _ = tx.send(AppMessage::TopTracks(result)).await;
        });
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = client.top_artists().await;
            let _ = tx.send(AppMessage::TopArtists(result)).await;
        });
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        let mut constraints = vec![Constraint::Length(2), Constraint::Min(0)];
        if self.wm.show_log_panel {
            constraints.push(Constraint::Length(10));
        }
        if self.wm.show_keys_bar {
            constraints.push(Constraint::Length(1));
        }
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        self.pane_areas.clear();
        let overlay = self.wm.active_overlay();
        let focused = if overlay.is_some() { None } else { self.wm.focused() };
        let state = &self.state;

        self.now_playing_bar.draw(frame, chunks[0], false, state);
        self.pane_areas.insert(self.now_playing_bar.id(), chunks[0]);

        match self.wm.workspace {
            Workspace::Search => {
                let body = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Length(3), Constraint::Min(0)])
                    .split(chunks[1]);
                self.search_bar.draw(
                    frame,
                    body[0],
                    focused == Some(ComponentId::SearchBar),
                    state,
                );
                self.result_list.draw(
                    frame,
                    body[1],
                    focused == Some(ComponentId::Results),
                    state,
                );
                self.pane_areas.insert(self.search_bar.id(), body[0]);
                self.pane_areas.insert(self.result_list.id(), body[1]);
            }
            Workspace::Dashboard => {
                self.dashboard.draw(
                    frame,
                    chunks[1],
                    focused == Some(ComponentId::Dashboard),
                    state,
                );
                self.pane_areas.insert(self.dashboard.id(), chunks[1]);
            }
        }

        let mut next = 2;
        if self.wm.show_log_panel {
            self.log_panel.draw(
                frame,
                chunks[next],
                focused == Some(ComponentId::LogPanel),
                state,
            );
            self.pane_areas.insert(self.log_panel.id(), chunks[next]);
            next += 1;
        }
        if self.wm.show_keys_bar {
            draw_keys_bar(frame, chunks[next], state.input_mode, self.wm.workspace);
        }

        // Overlays, lowest priority first.
        if self.wm.show_top_items {
            self.top_items.draw(frame, area, true, state);
            self.pane_areas.insert(self.top_items.id(), area);
        }
        if self.wm.show_details {
            self.details.draw(frame, area, true, state);
            self.pane_areas.insert(self.details.id(), area);
        }
        if self.wm.show_help {
            self.help_overlay.draw(frame, area, true, state);
            self.pane_areas.insert(self.help_overlay.id(), area);
        }

        self.toast.draw(frame, area);
    }

    fn reload_tui_log(&mut self) {
        let path = &self.tui_log_path;
        if let Ok(content) = std::fs::read_to_string(path) {
            let lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();
            let start = lines.len().saturating_sub(500);
            self.state.tui_log_lines = lines[start..].to_vec();
        }
    }
}

/// Log a failed background call; a 401 is reported back to the loop.
async fn log_failure(tx: &mpsc::Sender<AppMessage>, what: &str, result: ApiResult<()>) {
    match result {
        Ok(()) => {}
        // Already logged by the tracker.
        Err(ApiError::MissingSession) => {}
        Err(e) if e.is_unauthorized() => {
            let _ = tx.send(AppMessage::Unauthorized).await;
        }
        Err(e) => warn!("{} failed: {}", what, e),
    }
}
