//! In-process stand-in for the music server.

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Debug, Default)]
pub struct MockState {
    pub clicks: Vec<Value>,
    pub plays: Vec<(String, Value)>,
    pub precision: Vec<Value>,
    pub volumes: Vec<Value>,
    pub play_requests: Vec<Value>,
    pub playback: Option<Value>,
    pub unauthorized: bool,
    pub metrics_fail: bool,
}

pub type Shared = Arc<Mutex<MockState>>;

pub struct MockServer {
    pub base_url: String,
    pub state: Shared,
}

impl MockServer {
    pub async fn start() -> Self {
        let state: Shared = Arc::default();
        let app = Router::new()
            .route("/search", get(search))
            .route("/track-click", post(track_click))
            .route("/track-play/:id", post(track_play))
            .route("/update-precision", post(update_precision))
            .route("/latest-metrics", get(latest_metrics))
            .route("/genre-stats", get(genre_stats))
            .route("/artist-stats", get(artist_stats))
            .route("/currently-playing", get(currently_playing))
            .route("/toggle-playback", post(toggle_playback))
            .route("/next-track", post(ok))
            .route("/previous-track", post(ok))
            .route("/set-volume", post(set_volume))
            .route("/play-track", post(play_track))
            .route("/search-spotify-album/:q", get(spotify_album))
            .route("/search-spotify-artist/:name", get(spotify_artist_missing))
            .route("/top-tracks", get(top_tracks))
            .route("/top-artists", get(top_artists))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Response {
    let q = params.get("q").cloned().unwrap_or_default();
    if q == "boom" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "search backend down" })),
        )
            .into_response();
    }
    let filter = params.get("filter").cloned().unwrap_or_default();
    Json(json!({
        "session_id": format!("sess-{}", filter),
        "hits": [
            { "title": "Airbag", "type": "song", "source": { "artist": "Radiohead", "albumTitle": "OK Computer" } },
            { "title": "Kid A", "type": "album", "source": { "artist_name": "Radiohead", "genre": "Electronic" } },
            { "title": "Broken", "type": "mixtape", "source": {} },
            { "title": q, "type": "artist", "source": { "name": q } }
        ]
    }))
    .into_response()
}

async fn track_click(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    state.lock().unwrap().clicks.push(body);
    Json(json!({ "status": "success" }))
}

async fn track_play(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.lock().unwrap().plays.push((id, body));
    Json(json!({ "success": true }))
}

async fn update_precision(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    state.lock().unwrap().precision.push(body);
    Json(json!({ "status": "success" }))
}

async fn latest_metrics(State(state): State<Shared>) -> Response {
    if state.lock().unwrap().metrics_fail {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    Json(json!({
        "metrics_over_time": {
            "search_numbers": [1, 2],
            "precision@5": [0.2, 0.4],
            "precision@10": [0.1, 0.2]
        },
        "total_searches": 2,
        "total_interactions": 7,
        "most_played_song": { "song": "Airbag", "artist": "Radiohead", "duration": 4.5 },
        "most_liked_album": { "album": "Kid A", "artist": "Radiohead", "likes": 3 },
        "most_liked_artist": { "artist": "Radiohead", "likes": 5 }
    }))
    .into_response()
}

async fn genre_stats() -> Json<Value> {
    Json(json!({ "rock": 3, "jazz": 5, "ambient": 3 }))
}

async fn artist_stats() -> Json<Value> {
    Json(json!({}))
}

async fn currently_playing(State(state): State<Shared>) -> Response {
    let state = state.lock().unwrap();
    if state.unauthorized {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Not authenticated" })))
            .into_response();
    }
    match &state.playback {
        Some(body) => Json(body.clone()).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn toggle_playback() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "No active device" }))).into_response()
}

async fn ok() -> Json<Value> {
    Json(json!({ "status": "success" }))
}

async fn set_volume(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    state.lock().unwrap().volumes.push(body);
    Json(json!({ "status": "success" }))
}

async fn play_track(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    state.lock().unwrap().play_requests.push(body);
    Json(json!({ "status": "success" }))
}

async fn spotify_album(Path(q): Path<String>) -> Json<Value> {
    Json(json!({
        "album": {
            "name": q,
            "artist": "Radiohead",
            "total_tracks": 10,
            "release_date": "2000-10-02",
            "external_url": "https://open.spotify.com/album/x"
        }
    }))
}

async fn spotify_artist_missing() -> Json<Value> {
    Json(json!({ "error": "Artist not found" }))
}

async fn top_tracks() -> Json<Value> {
    Json(json!({ "tracks": [{ "title": "Airbag", "artist": "Radiohead" }] }))
}

async fn top_artists() -> Json<Value> {
    Json(json!({ "artists": [{ "name": "Radiohead", "genres": ["rock", "art rock"] }] }))
}
