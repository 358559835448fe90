//! AppState: shared read-only data passed to all components during render/event.
//!
//! Components read this, but never mutate it.
//! The App event-loop is the only thing that writes to AppState.

use tunedeck_proto::client::{ApiError, ApiResult};
use tunedeck_proto::config::ChartVariant;
use tunedeck_proto::likes::LikeStore;
use tunedeck_proto::metrics::MetricsStore;
use tunedeck_proto::protocol::{
    PlaybackState, SearchFilter, SearchHit, SpotifyAlbum, SpotifyArtist, SpotifyTrack, StatCounts,
    TopArtist, TopTrack,
};

use crate::action::Workspace;
use crate::intent::RenderHint;
use crate::widgets::status_bar::InputMode;

/// One independently loaded piece of a view.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Section<T> {
    #[default]
    Loading,
    Ready(T),
    /// Loaded, but the server had nothing to show.
    Empty,
    Failed(String),
}

impl<T> Section<T> {
    /// Server-provided messages are shown as-is; anything else gets `fallback`.
    pub fn from_result(result: ApiResult<T>, fallback: &str) -> Self {
        match result {
            Ok(value) => Section::Ready(value),
            Err(e) => Section::Failed(failure_text(&e, fallback)),
        }
    }
}

impl<T> Section<Vec<T>> {
    pub fn from_list(result: ApiResult<Vec<T>>, fallback: &str) -> Self {
        match Section::from_result(result, fallback) {
            Section::Ready(items) if items.is_empty() => Section::Empty,
            other => other,
        }
    }
}

pub fn failure_text(error: &ApiError, fallback: &str) -> String {
    match error {
        ApiError::Server(message) => message.clone(),
        ApiError::Unauthorized => "Sign in required".to_string(),
        _ => fallback.to_string(),
    }
}

// ── Search ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub enum SearchStatus {
    #[default]
    Idle,
    Searching,
    /// Either the server's `error` field or the generic transport message.
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct SearchView {
    pub query: String,
    pub filter: SearchFilter,
    pub session_id: Option<String>,
    pub hits: Vec<SearchHit>,
    pub status: SearchStatus,
    /// False until the first search completes or a saved one is restored.
    pub has_results: bool,
}

// ── Details ───────────────────────────────────────────────────────────────────

/// Secondary lookups for the open detail view, one variant per entity kind.
#[derive(Debug, Clone)]
pub enum Enrichment {
    Artist {
        catalog: Section<SpotifyArtist>,
        songs: Section<Vec<SpotifyTrack>>,
    },
    Album {
        catalog: Section<SpotifyAlbum>,
    },
    Song {
        matches: Section<Vec<SpotifyTrack>>,
    },
}

#[derive(Debug, Clone)]
pub struct DetailsView {
    /// Responses carrying a different id belong to a view that was closed.
    pub request_id: u64,
    pub hit: SearchHit,
    pub enrichment: Enrichment,
}

impl DetailsView {
    /// Tracks that can be played from this view.
    pub fn tracks(&self) -> &[SpotifyTrack] {
        match &self.enrichment {
            Enrichment::Artist {
                songs: Section::Ready(tracks),
                ..
            }
            | Enrichment::Song {
                matches: Section::Ready(tracks),
            } => tracks,
            _ => &[],
        }
    }

    /// External link shown for the catalog match, if loaded.
    pub fn catalog_url(&self) -> Option<&str> {
        match &self.enrichment {
            Enrichment::Artist {
                catalog: Section::Ready(artist),
                ..
            } => Some(artist.external_url.as_str()),
            Enrichment::Album {
                catalog: Section::Ready(album),
            } => Some(album.external_url.as_str()),
            _ => None,
        }
        .filter(|url| !url.is_empty())
    }
}

/// The full shared state of the application.
pub struct AppState {
    // ── UI mode ─────────────────────────────────────────────────────────────
    pub workspace: Workspace,
    pub input_mode: InputMode,

    // ── Search ──────────────────────────────────────────────────────────────
    pub search: SearchView,
    pub likes: LikeStore,
    pub details: Option<DetailsView>,

    // ── Playback ────────────────────────────────────────────────────────────
    /// Latest poll; `None` hides the transport bar.
    pub playback: Option<PlaybackState>,
    pub pause_hint: RenderHint,
    pub volume_hint: RenderHint,
    /// Volume the user asked for most recently.
    pub volume: u8,

    // ── Dashboard ───────────────────────────────────────────────────────────
    pub metrics: MetricsStore,
    pub chart: ChartVariant,
    pub genre_stats: Section<StatCounts>,
    pub artist_stats: Section<StatCounts>,
    pub top_tracks: Section<Vec<TopTrack>>,
    pub top_artists: Section<Vec<TopArtist>>,

    // ── Session ─────────────────────────────────────────────────────────────
    /// Set to the sign-in URL after a 401; cleared by the next good poll.
    pub signed_out: Option<String>,
    /// Cached lines from tui.log (refreshed periodically by App).
    pub tui_log_lines: Vec<String>,
}

impl AppState {
    pub fn new(metrics: MetricsStore, chart: ChartVariant) -> Self {
        Self {
            workspace: Workspace::Search,
            input_mode: InputMode::Normal,
            search: SearchView::default(),
            likes: LikeStore::new(),
            details: None,
            playback: None,
            pause_hint: RenderHint::Normal,
            volume_hint: RenderHint::Normal,
            volume: 50,
            metrics,
            chart,
            genre_stats: Section::Loading,
            artist_stats: Section::Loading,
            top_tracks: Section::Loading,
            top_artists: Section::Loading,
            signed_out: None,
            tui_log_lines: Vec::new(),
        }
    }

    pub fn hit(&self, index: usize) -> Option<&SearchHit> {
        self.search.hits.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_wins() {
        let section: Section<SpotifyArtist> = Section::from_result(
            Err(ApiError::Server("Artist not found".into())),
            "Failed to load Spotify artist",
        );
        assert_eq!(section, Section::Failed("Artist not found".into()));
    }

    #[test]
    fn test_transport_errors_use_fallback() {
        let section: Section<SpotifyAlbum> =
            Section::from_result(Err(ApiError::Status(502)), "Failed to load Spotify album");
        assert_eq!(section, Section::Failed("Failed to load Spotify album".into()));
    }

    #[test]
    fn test_empty_list_is_empty_section() {
        let section: Section<Vec<SpotifyTrack>> = Section::from_list(Ok(vec![]), "Failed to load songs");
        assert_eq!(section, Section::Empty);
        let section = Section::from_list(Ok(vec![1, 2]), "unused");
        assert_eq!(section, Section::Ready(vec![1, 2]));
    }
}
