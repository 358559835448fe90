mod common;

use common::MockServer;
use std::time::Duration;
use tunedeck_proto::client::{ApiClient, ApiError};
use tunedeck_proto::protocol::{EntityKind, SearchFilter};

fn client(server: &MockServer) -> ApiClient {
    ApiClient::with_timeout(&server.base_url, "/login", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn search_skips_undecodable_hits() {
    let server = MockServer::start().await;
    let resp = client(&server)
        .search("Radiohead", SearchFilter::Song)
        .await
        .unwrap();

    assert_eq!(resp.session_id.as_deref(), Some("sess-song"));
    let kinds: Vec<EntityKind> = resp.hits.iter().map(|h| h.kind()).collect();
    assert_eq!(kinds, [EntityKind::Song, EntityKind::Album, EntityKind::Artist]);
    assert_eq!(resp.hits[2].title, "Radiohead");
}

#[tokio::test]
async fn server_error_body_is_surfaced() {
    let server = MockServer::start().await;
    let err = client(&server)
        .search("boom", SearchFilter::All)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Server(msg) if msg == "search backend down"));
}

#[tokio::test]
async fn currently_playing_handles_204_and_401() {
    let server = MockServer::start().await;
    let api = client(&server);

    assert!(api.currently_playing().await.unwrap().is_none());

    server.with(|s| {
        s.playback = Some(serde_json::json!({
            "track_id": "t1",
            "track_name": "Airbag",
            "artist_name": "Radiohead",
            "is_playing": true,
            "progress_ms": 1000,
            "duration_ms": 4000
        }))
    });
    let state = api.currently_playing().await.unwrap().unwrap();
    assert_eq!(state.active_track(), Some("t1"));
    assert!(state.is_playing);

    server.with(|s| s.unauthorized = true);
    let err = api.currently_playing().await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn metrics_and_stats_decode() {
    let server = MockServer::start().await;
    let api = client(&server);

    let snap = api.latest_metrics().await.unwrap();
    assert_eq!(snap.metrics_over_time.search_numbers, vec![1, 2]);
    assert_eq!(snap.metrics_over_time.precision_at_5, vec![0.2, 0.4]);
    assert_eq!(snap.most_liked_artist.unwrap().likes, 5);

    let genres = api.genre_stats().await.unwrap();
    assert_eq!(
        genres.entries,
        vec![
            ("jazz".to_string(), 5),
            ("ambient".to_string(), 3),
            ("rock".to_string(), 3)
        ]
    );
    assert!(api.artist_stats().await.unwrap().entries.is_empty());

    server.with(|s| s.metrics_fail = true);
    assert!(matches!(
        api.latest_metrics().await.unwrap_err(),
        ApiError::Status(503)
    ));
}

#[tokio::test]
async fn transport_controls_send_expected_bodies() {
    let server = MockServer::start().await;
    let api = client(&server);

    api.set_volume(120).await.unwrap();
    api.play_track("6LgJvl0Xdtc73RJ1mmpotq").await.unwrap();
    api.next_track().await.unwrap();
    assert!(matches!(api.play_track(" ").await, Err(ApiError::InvalidTrackId)));

    let err = api.toggle_playback().await.unwrap_err();
    assert!(matches!(err, ApiError::Server(msg) if msg == "No active device"));

    server.with(|s| {
        assert_eq!(s.volumes, vec![serde_json::json!({ "volume": 100 })]);
        assert_eq!(
            s.play_requests,
            vec![serde_json::json!({ "track_id": "6LgJvl0Xdtc73RJ1mmpotq" })]
        );
    });
}

#[tokio::test]
async fn catalog_lookups() {
    let server = MockServer::start().await;
    let api = client(&server);

    let album = api.spotify_album("Kid A Radiohead").await.unwrap();
    assert_eq!(album.name, "Kid A Radiohead");
    assert_eq!(album.total_tracks, 10);

    let err = api.spotify_artist("Nobody").await.unwrap_err();
    assert!(matches!(err, ApiError::Server(msg) if msg == "Artist not found"));

    assert_eq!(api.top_tracks().await.unwrap()[0].title, "Airbag");
    assert_eq!(api.top_artists().await.unwrap()[0].genres.len(), 2);
}
