mod common;

use common::MockServer;
use serde_json::json;
use std::time::{Duration, Instant};
use tunedeck_proto::bus::{MetricsBus, MetricsSignal};
use tunedeck_proto::client::{ApiClient, ApiError};
use tunedeck_proto::likes::{LikeStore, PrecisionSample};
use tunedeck_proto::metrics::{MetricsStore, Outcome, Trigger};
use tunedeck_proto::playback::NowPlaying;
use tunedeck_proto::protocol::{EntityKind, InteractionKind, SearchFilter};
use tunedeck_proto::session::{SavedSearch, SessionStore, KEY_LAST_SEARCH};
use tunedeck_proto::tracking::Tracker;

fn tracker(server: &MockServer) -> (Tracker, MetricsBus) {
    let api = ApiClient::with_timeout(&server.base_url, "/login", Duration::from_secs(5)).unwrap();
    let bus = MetricsBus::new();
    (Tracker::new(api, bus.clone()), bus)
}

#[tokio::test]
async fn like_flow_reports_click_and_precision() {
    let server = MockServer::start().await;
    let (tracker, bus) = tracker(&server);
    let mut signals = bus.subscribe();

    let api = ApiClient::with_timeout(&server.base_url, "/login", Duration::from_secs(5)).unwrap();
    let resp = api.search("Radiohead", SearchFilter::All).await.unwrap();
    let session = resp.session_id.clone();

    let mut likes = LikeStore::new();
    let key = resp.hits[0].like_key();
    assert!(likes.toggle(&key));

    tracker
        .click(session.as_deref(), &key, EntityKind::Song, InteractionKind::Like)
        .await
        .unwrap();
    tracker
        .precision(session.as_deref(), PrecisionSample::compute(&resp.hits, &likes))
        .await
        .unwrap();

    assert_eq!(signals.recv().await.unwrap(), MetricsSignal::InteractionTracked);
    assert_eq!(signals.recv().await.unwrap(), MetricsSignal::PrecisionUpdated);

    server.with(|s| {
        assert_eq!(
            s.clicks,
            vec![json!({
                "item_text": "Airbag by Radiohead",
                "item_type": "song",
                "interaction_type": "like",
                "session_id": "sess-all"
            })]
        );
        assert_eq!(
            s.precision,
            vec![json!({ "precision5": 0.2, "precision10": 0.1, "session_id": "sess-all" })]
        );
    });
}

#[tokio::test]
async fn tracking_without_session_sends_nothing() {
    let server = MockServer::start().await;
    let (tracker, _bus) = tracker(&server);

    let err = tracker
        .click(None, "x by y", EntityKind::Song, InteractionKind::Click)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::MissingSession));
    server.with(|s| assert!(s.clicks.is_empty()));
}

#[tokio::test]
async fn play_reports_reach_track_play() {
    let server = MockServer::start().await;
    let (tracker, bus) = tracker(&server);
    let mut signals = bus.subscribe();

    let t0 = Instant::now();
    let mut np = NowPlaying::new();
    let playing = |id: &str, on: bool| tunedeck_proto::protocol::PlaybackState {
        track_id: Some(id.to_string()),
        is_playing: on,
        ..Default::default()
    };

    np.observe(Some(&playing("t1", true)), t0);
    let report = np
        .observe(Some(&playing("t1", false)), t0 + Duration::from_secs(12))
        .unwrap();
    tracker.play(&report).await.unwrap();

    np.observe(Some(&playing("t1", true)), t0 + Duration::from_secs(20));
    let last = np.flush(t0 + Duration::from_secs(23)).unwrap();
    assert!(tracker.flush_on_exit(&last, Duration::from_secs(2)).await);

    assert_eq!(signals.recv().await.unwrap(), MetricsSignal::PlayTracked);
    server.with(|s| {
        assert_eq!(s.plays.len(), 2);
        assert_eq!(s.plays[0].0, "t1");
        assert_eq!(s.plays[0].1, json!({ "duration": 12.0 }));
        assert_eq!(s.plays[1].1, json!({ "duration": 3.0 }));
    });
}

#[tokio::test]
async fn dashboard_falls_back_to_last_good_snapshot() {
    let server = MockServer::start().await;
    let api = ApiClient::with_timeout(&server.base_url, "/login", Duration::from_secs(5)).unwrap();
    let mut store = MetricsStore::new(Duration::from_secs(2));

    let t0 = Instant::now();
    let ticket = store.request(Trigger::Interval, t0).unwrap();
    let outcome = store.complete(ticket, api.latest_metrics().await, t0);
    assert_eq!(outcome, Outcome::Applied);

    server.with(|s| s.metrics_fail = true);
    let t1 = t0 + Duration::from_secs(5);
    let ticket = store.request(Trigger::Interval, t1).unwrap();
    let outcome = store.complete(ticket, api.latest_metrics().await, t1);

    assert_eq!(outcome, Outcome::FellBack);
    assert!(store.is_stale());
    assert_eq!(store.snapshot().unwrap().total_interactions, 7);
}

#[tokio::test]
async fn saved_search_restores_from_disk() {
    let server = MockServer::start().await;
    let api = ApiClient::with_timeout(&server.base_url, "/login", Duration::from_secs(5)).unwrap();
    let resp = api.search("Radiohead", SearchFilter::Artist).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let ttl = Duration::from_secs(600);
    {
        let mut session = SessionStore::open(&path, ttl).unwrap();
        let saved = SavedSearch {
            query: "Radiohead".into(),
            filter: SearchFilter::Artist,
            session_id: resp.session_id.clone(),
            hits: resp.hits.clone(),
        };
        session.set(KEY_LAST_SEARCH, &saved).unwrap();
    }

    let session = SessionStore::open(&path, ttl).unwrap();
    let restored: SavedSearch = session.get(KEY_LAST_SEARCH).unwrap();
    assert_eq!(restored.hits, resp.hits);
    assert_eq!(restored.session_id.as_deref(), Some("sess-artist"));
}

#[tokio::test]
async fn switch_while_paused_is_not_sent() {
    let server = MockServer::start().await;
    let (tracker, _bus) = tracker(&server);

    let t0 = Instant::now();
    let mut np = NowPlaying::new();
    let paused = |id: &str| tunedeck_proto::protocol::PlaybackState {
        track_id: Some(id.to_string()),
        is_playing: false,
        ..Default::default()
    };

    np.observe(Some(&paused("t1")), t0);
    let report = np
        .observe(Some(&paused("t2")), t0 + Duration::from_secs(30))
        .unwrap();
    assert_eq!(report.track_id, "t1");
    assert_eq!(report.duration_secs, 0.0);

    tracker.play(&report).await.unwrap();
    server.with(|s| assert!(s.plays.is_empty()));
}
