//! HTTP client for the music server.
//!
//! One method per endpoint. Transport failures, non-success statuses and
//! `{"error": "..."}` bodies all come back as [`ApiError`].

use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::protocol::{
    AlbumEnvelope, ArtistEnvelope, MetricsSnapshot, PlayAck, PlayDuration, PlayTrackRequest,
    PlaybackState, PrecisionUpdate, RawSearchResponse, SearchFilter, SearchResponse,
    SpotifyAlbum, SpotifyArtist, SpotifyTrack, StatCounts, TopArtist, TopArtistsEnvelope,
    TopTrack, TopTracksEnvelope, TrackClick, TrackEnvelope, TracksEnvelope, VolumeRequest,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not signed in")]
    Unauthorized,
    #[error("server returned status {0}")]
    Status(u16),
    #[error("{0}")]
    Server(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no search session yet")]
    MissingSession,
    #[error("invalid track id")]
    InvalidTrackId,
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Body that is either the expected payload or `{"error": "..."}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Failed { error: String },
    Ok(T),
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    login_path: String,
}

impl ApiClient {
    pub fn new(server: &ServerConfig) -> anyhow::Result<Self> {
        Self::with_timeout(&server.base_url, &server.login_path, server.request_timeout())
    }

    pub fn with_timeout(base_url: &str, login_path: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            anyhow::bail!("server URL {} cannot be used as a base", base_url);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()?;
        Ok(Self {
            http,
            base,
            login_path: login_path.to_string(),
        })
    }

    /// Where the user signs in after a 401.
    pub fn login_url(&self) -> String {
        let mut url = self.base.clone();
        url.set_path(&self.login_path);
        url.to_string()
    }

    // ── Search & tracking ────────────────────────────────────────────────────

    pub async fn search(&self, query: &str, filter: SearchFilter) -> ApiResult<SearchResponse> {
        let mut url = self.url(&["search"]);
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("filter", filter.as_query());
        let resp = self.send(self.http.get(url)).await?;
        let raw: RawSearchResponse = resp.json().await?;
        Ok(raw.into())
    }

    pub async fn track_click(&self, click: &TrackClick) -> ApiResult<()> {
        self.post_json::<_, serde_json::Value>(&["track-click"], click).await?;
        Ok(())
    }

    pub async fn track_play(&self, track_id: &str, duration_secs: f64) -> ApiResult<()> {
        let body = PlayDuration {
            duration: duration_secs,
        };
        let ack: PlayAck = self.post_json(&["track-play", track_id], &body).await?;
        if let Some(error) = ack.error {
            return Err(ApiError::Server(error));
        }
        if !ack.success {
            warn!("track-play for {} not acknowledged", track_id);
        }
        Ok(())
    }

    pub async fn update_precision(&self, update: &PrecisionUpdate) -> ApiResult<()> {
        self.post_json::<_, serde_json::Value>(&["update-precision"], update).await?;
        Ok(())
    }

    // ── Dashboard ────────────────────────────────────────────────────────────

    pub async fn latest_metrics(&self) -> ApiResult<MetricsSnapshot> {
        self.get_json(&["latest-metrics"]).await
    }

    pub async fn genre_stats(&self) -> ApiResult<StatCounts> {
        let map: BTreeMap<String, u64> = self.get_json(&["genre-stats"]).await?;
        Ok(map.into())
    }

    pub async fn artist_stats(&self) -> ApiResult<StatCounts> {
        let map: BTreeMap<String, u64> = self.get_json(&["artist-stats"]).await?;
        Ok(map.into())
    }

    pub async fn top_tracks(&self) -> ApiResult<Vec<TopTrack>> {
        let env: TopTracksEnvelope = self.get_json(&["top-tracks"]).await?;
        Ok(env.tracks)
    }

    pub async fn top_artists(&self) -> ApiResult<Vec<TopArtist>> {
        let env: TopArtistsEnvelope = self.get_json(&["top-artists"]).await?;
        Ok(env.artists)
    }

    // ── Playback ─────────────────────────────────────────────────────────────

    /// `Ok(None)` when nothing is playing.
    pub async fn currently_playing(&self) -> ApiResult<Option<PlaybackState>> {
        let resp = self.send(self.http.get(self.url(&["currently-playing"]))).await?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let state: PlaybackState = decode(resp).await?;
        Ok(state.active_track().is_some().then_some(state))
    }

    pub async fn toggle_playback(&self) -> ApiResult<()> {
        self.post_empty(&["toggle-playback"]).await
    }

    pub async fn next_track(&self) -> ApiResult<()> {
        self.post_empty(&["next-track"]).await
    }

    pub async fn previous_track(&self) -> ApiResult<()> {
        self.post_empty(&["previous-track"]).await
    }

    pub async fn set_volume(&self, volume: u8) -> ApiResult<()> {
        let body = VolumeRequest {
            volume: volume.min(100),
        };
        self.post_json::<_, serde_json::Value>(&["set-volume"], &body).await?;
        Ok(())
    }

    pub async fn play_track(&self, track_id: &str) -> ApiResult<()> {
        if track_id.trim().is_empty() {
            return Err(ApiError::InvalidTrackId);
        }
        let body = PlayTrackRequest {
            track_id: track_id.to_string(),
        };
        self.post_json::<_, serde_json::Value>(&["play-track"], &body).await?;
        Ok(())
    }

    // ── Catalog enrichment ───────────────────────────────────────────────────

    pub async fn spotify_artist(&self, name: &str) -> ApiResult<SpotifyArtist> {
        let env: ArtistEnvelope = self.get_json(&["search-spotify-artist", name]).await?;
        Ok(env.artist)
    }

    pub async fn spotify_album(&self, query: &str) -> ApiResult<SpotifyAlbum> {
        let env: AlbumEnvelope = self.get_json(&["search-spotify-album", query]).await?;
        Ok(env.album)
    }

    pub async fn spotify_tracks(&self, query: &str) -> ApiResult<Vec<SpotifyTrack>> {
        let env: TracksEnvelope = self.get_json(&["search-spotify-tracks", query]).await?;
        Ok(env.tracks)
    }

    pub async fn spotify_track(&self, id: &str) -> ApiResult<SpotifyTrack> {
        let env: TrackEnvelope = self.get_json(&["get-spotify-track", id]).await?;
        Ok(env.track)
    }

    pub async fn artist_songs(&self, name: &str) -> ApiResult<Vec<SpotifyTrack>> {
        let env: TracksEnvelope = self.get_json(&["artist-songs", name]).await?;
        Ok(env.tracks)
    }

    // ── Plumbing ─────────────────────────────────────────────────────────────

    /// Base URL with `segments` appended, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, req: RequestBuilder) -> ApiResult<Response> {
        let resp = req.send().await?;
        let status = resp.status();
        debug!("{} {}", status.as_u16(), resp.url().path());
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            // Error statuses usually still carry `{"error": ...}`.
            return match resp.json::<Envelope<serde_json::Value>>().await {
                Ok(Envelope::Failed { error }) => Err(ApiError::Server(error)),
                _ => Err(ApiError::Status(status.as_u16())),
            };
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<T> {
        let resp = self.send(self.http.get(self.url(segments))).await?;
        decode(resp).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> ApiResult<T> {
        let req = self.http.request(Method::POST, self.url(segments)).json(body);
        let resp = self.send(req).await?;
        decode(resp).await
    }

    async fn post_empty(&self, segments: &[&str]) -> ApiResult<()> {
        let resp = self.send(self.http.post(self.url(segments))).await?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(());
        }
        let body = resp.bytes().await?;
        if let Ok(Envelope::Failed { error }) = serde_json::from_slice::<Envelope<serde_json::Value>>(&body) {
            return Err(ApiError::Server(error));
        }
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> ApiResult<T> {
    match resp.json::<Envelope<T>>().await? {
        Envelope::Failed { error } => Err(ApiError::Server(error)),
        Envelope::Ok(value) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::with_timeout(base, "/login", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_path_segments_are_encoded() {
        let c = client("http://localhost:5000");
        let url = c.url(&["search-spotify-album", "OK Computer Radiohead"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/search-spotify-album/OK%20Computer%20Radiohead"
        );
        let url = c.url(&["artist-songs", "AC/DC"]);
        assert_eq!(url.as_str(), "http://localhost:5000/artist-songs/AC%2FDC");
    }

    #[test]
    fn test_base_path_is_kept() {
        let c = client("http://host/music/");
        assert_eq!(c.url(&["top-tracks"]).as_str(), "http://host/music/top-tracks");
    }

    #[test]
    fn test_login_url() {
        assert_eq!(client("http://host:5000").login_url(), "http://host:5000/login");
    }

    #[test]
    fn test_error_envelope_wins_over_payload() {
        let env: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"error": "No active device"}"#).unwrap();
        assert!(matches!(env, Envelope::Failed { error } if error == "No active device"));
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(ApiClient::with_timeout("mailto:x@y", "/login", Duration::from_secs(1)).is_err());
    }
}
