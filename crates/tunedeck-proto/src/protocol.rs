use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Credited name used when a hit carries no performer at all.
pub const UNKNOWN_ARTIST: &str = "Unknown artist";

// ── Search ────────────────────────────────────────────────────────────────────

/// Restricts a search to one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchFilter {
    #[default]
    All,
    Song,
    Album,
    Artist,
}

impl SearchFilter {
    pub fn next(self) -> Self {
        match self {
            Self::All => Self::Song,
            Self::Song => Self::Album,
            Self::Album => Self::Artist,
            Self::Artist => Self::All,
        }
    }

    /// Value of the `filter=` query parameter.
    pub fn as_query(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Song => "song",
            Self::Album => "album",
            Self::Artist => "artist",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Song,
    Album,
    Artist,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SongInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, rename = "artistName", skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "albumTitle", skip_serializing_if = "Option::is_none")]
    pub album_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_genre: Option<String>,
    /// Catalog data stores this as either a number or a string.
    #[serde(default, deserialize_with = "loose_text", skip_serializing_if = "Option::is_none")]
    pub bpm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,
    #[serde(default, rename = "urlSpotify", skip_serializing_if = "Option::is_none")]
    pub url_spotify: Option<String>,
}

impl SongInfo {
    /// Spotify track id embedded in `urlSpotify` (`…/track/<id>?…`).
    pub fn spotify_track_id(&self) -> Option<&str> {
        let url = self.url_spotify.as_deref()?;
        let (_, rest) = url.split_once("track/")?;
        let id = rest.split(['?', '/', '#']).next().unwrap_or("");
        (!id.is_empty()).then_some(id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlbumInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, rename = "dateRelease", skip_serializing_if = "Option::is_none")]
    pub date_release: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl AlbumInfo {
    /// Who the album is by, as shown in the detail view.
    pub fn by(&self) -> &str {
        self.artist_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("Unknown Artist")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtistInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "realName", skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    #[serde(default, rename = "urlWikipedia", skip_serializing_if = "Option::is_none")]
    pub url_wikipedia: Option<String>,
    #[serde(default, rename = "urlWikidata", skip_serializing_if = "Option::is_none")]
    pub url_wikidata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruments: Option<Vec<String>>,
    #[serde(default, rename = "birthDate", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dbp_abstract: Option<String>,
    #[serde(default, rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default, rename = "nameVariations", skip_serializing_if = "Option::is_none")]
    pub name_variations: Option<Vec<String>>,
}

impl ArtistInfo {
    /// First reference link: Wikipedia, then Wikidata, then any listed URL.
    pub fn reference_url(&self) -> Option<&str> {
        self.url_wikipedia
            .as_deref()
            .or(self.url_wikidata.as_deref())
            .or_else(|| self.urls.as_ref().and_then(|u| u.first()).map(String::as_str))
    }

    pub fn biography(&self) -> Option<&str> {
        self.dbp_abstract.as_deref().or(self.abstract_text.as_deref())
    }

    /// Instruments with the first letter capitalised, comma separated.
    pub fn instruments_text(&self) -> Option<String> {
        let list = self.instruments.as_ref().filter(|l| !l.is_empty())?;
        let formatted: Vec<String> = list
            .iter()
            .map(|i| {
                let mut chars = i.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect();
        Some(formatted.join(", "))
    }

    /// Real name, only when it differs from the stage name.
    pub fn distinct_real_name(&self) -> Option<&str> {
        let real = self.real_name.as_deref()?;
        (Some(real) != self.name.as_deref()).then_some(real)
    }
}

/// Artist payload plus whether it came from a band `member` record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtistProfile {
    pub info: ArtistInfo,
    pub is_member: bool,
}

/// Entity-specific part of a search hit.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Song(SongInfo),
    Album(AlbumInfo),
    Artist(ArtistProfile),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Song(_) => EntityKind::Song,
            Entity::Album(_) => EntityKind::Album,
            Entity::Artist(_) => EntityKind::Artist,
        }
    }
}

/// One ranked result from `/search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHit", into = "RawHit")]
pub struct SearchHit {
    pub title: String,
    pub image: Option<String>,
    pub preview: Option<String>,
    pub entity: Entity,
}

impl SearchHit {
    pub fn kind(&self) -> EntityKind {
        self.entity.kind()
    }

    /// `source.artist || source.artistName || source.name || "Unknown artist"`.
    pub fn credited_name(&self) -> &str {
        let named = match &self.entity {
            Entity::Song(s) => s
                .artist
                .as_deref()
                .or(s.artist_name.as_deref())
                .or(s.name.as_deref()),
            Entity::Album(a) => a.name.as_deref(),
            Entity::Artist(a) => a.info.name.as_deref(),
        };
        named.unwrap_or(UNKNOWN_ARTIST)
    }

    /// Composite key used for like state: `"<title> by <credited name>"`.
    pub fn like_key(&self) -> String {
        format!("{} by {}", self.title, self.credited_name())
    }
}

/// Wire shape of a hit: `{title, type, source, image?, preview?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawHit {
    title: String,
    #[serde(rename = "type")]
    kind: EntityKind,
    #[serde(default)]
    source: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preview: Option<String>,
}

impl TryFrom<RawHit> for SearchHit {
    type Error = serde_json::Error;

    fn try_from(raw: RawHit) -> Result<Self, Self::Error> {
        let source = if raw.source.is_null() {
            Value::Object(Default::default())
        } else {
            raw.source
        };
        let entity = match raw.kind {
            EntityKind::Song => Entity::Song(serde_json::from_value(source)?),
            EntityKind::Album => Entity::Album(serde_json::from_value(source)?),
            EntityKind::Artist => match source.get("member") {
                Some(member) if !member.is_null() => Entity::Artist(ArtistProfile {
                    info: serde_json::from_value(member.clone())?,
                    is_member: true,
                }),
                _ => Entity::Artist(ArtistProfile {
                    info: serde_json::from_value(source)?,
                    is_member: false,
                }),
            },
        };
        Ok(Self {
            title: raw.title,
            image: raw.image,
            preview: raw.preview,
            entity,
        })
    }
}

impl From<SearchHit> for RawHit {
    fn from(hit: SearchHit) -> Self {
        let kind = hit.kind();
        let source = match hit.entity {
            Entity::Song(s) => serde_json::to_value(s),
            Entity::Album(a) => serde_json::to_value(a),
            Entity::Artist(a) if a.is_member => {
                serde_json::to_value(a.info).map(|m| serde_json::json!({ "member": m }))
            }
            Entity::Artist(a) => serde_json::to_value(a.info),
        }
        .unwrap_or(Value::Null);
        Self {
            title: hit.title,
            kind,
            source,
            image: hit.image,
            preview: hit.preview,
        }
    }
}

/// Accepts a string, a number or null.
fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub session_id: Option<String>,
    pub error: Option<String>,
}

/// `/search` body before per-hit decoding.
#[derive(Debug, Deserialize)]
pub(crate) struct RawSearchResponse {
    #[serde(default)]
    pub hits: Vec<Value>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl From<RawSearchResponse> for SearchResponse {
    fn from(raw: RawSearchResponse) -> Self {
        let hits = raw
            .hits
            .into_iter()
            .enumerate()
            .filter_map(|(idx, v)| match serde_json::from_value::<SearchHit>(v) {
                Ok(hit) => Some(hit),
                Err(e) => {
                    tracing::warn!("skipping undecodable search hit #{}: {}", idx, e);
                    None
                }
            })
            .collect();
        Self {
            hits,
            session_id: raw.session_id.filter(|s| !s.is_empty()),
            error: raw.error,
        }
    }
}

// ── Tracking ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Click,
    Like,
    Unlike,
    Song,
    Album,
    Artist,
}

impl From<EntityKind> for InteractionKind {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Song => Self::Song,
            EntityKind::Album => Self::Album,
            EntityKind::Artist => Self::Artist,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackClick {
    pub item_text: String,
    pub item_type: EntityKind,
    pub interaction_type: InteractionKind,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionUpdate {
    pub precision5: f64,
    pub precision10: f64,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayDuration {
    /// Seconds listened.
    pub duration: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayTrackRequest {
    pub track_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeRequest {
    pub volume: u8,
}

// ── Metrics ───────────────────────────────────────────────────────────────────

/// Per-search series; index `i` of every vector belongs to `search_numbers[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSeries {
    #[serde(default)]
    pub search_numbers: Vec<u64>,
    #[serde(default, rename = "precision@5")]
    pub precision_at_5: Vec<f64>,
    #[serde(default, rename = "precision@10")]
    pub precision_at_10: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub likes: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MostPlayedSong {
    #[serde(default)]
    pub song: String,
    #[serde(default)]
    pub artist: String,
    /// Minutes.
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MostLikedAlbum {
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub likes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MostLikedArtist {
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub likes: u64,
}

/// Aggregate dashboard payload from `/latest-metrics`. Always replaced wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(default)]
    pub metrics_over_time: MetricsSeries,
    #[serde(default)]
    pub total_searches: u64,
    #[serde(default)]
    pub total_interactions: u64,
    #[serde(default)]
    pub most_played_song: Option<MostPlayedSong>,
    #[serde(default)]
    pub most_liked_album: Option<MostLikedAlbum>,
    #[serde(default)]
    pub most_liked_artist: Option<MostLikedArtist>,
}

/// `name → count` breakdown from `/genre-stats` or `/artist-stats`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatCounts {
    pub entries: Vec<(String, u64)>,
}

impl From<BTreeMap<String, u64>> for StatCounts {
    fn from(map: BTreeMap<String, u64>) -> Self {
        let mut entries: Vec<(String, u64)> = map.into_iter().collect();
        // BTreeMap order already gives the name tie-break; stable sort keeps it.
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Self { entries }
    }
}

// ── Playback ──────────────────────────────────────────────────────────────────

/// `/currently-playing` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    #[serde(default)]
    pub track_id: Option<String>,
    #[serde(default)]
    pub track_name: Option<String>,
    #[serde(default)]
    pub artist_name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default, alias = "progress")]
    pub progress_ms: u64,
    #[serde(default, alias = "duration")]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u8>,
}

impl PlaybackState {
    /// Track id if the server reports an active track.
    pub fn active_track(&self) -> Option<&str> {
        self.track_id.as_deref().filter(|id| !id.is_empty())
    }

    /// The transport bar is shown only when both names are known.
    pub fn is_displayable(&self) -> bool {
        self.track_name.as_deref().is_some_and(|s| !s.is_empty())
            && self.artist_name.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Fraction of the track played, 0.0 when the duration is unknown.
    pub fn progress_ratio(&self) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (self.progress_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0)
    }
}

// ── Catalog enrichment ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub external_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotifyAlbum {
    pub name: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub total_tracks: u32,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub external_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotifyTrack {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopTrack {
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopArtist {
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
}

// Response envelopes.

#[derive(Debug, Deserialize)]
pub(crate) struct ArtistEnvelope {
    pub artist: SpotifyArtist,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlbumEnvelope {
    pub album: SpotifyAlbum,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackEnvelope {
    pub track: SpotifyTrack,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TracksEnvelope {
    #[serde(default)]
    pub tracks: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TopTracksEnvelope {
    #[serde(default)]
    pub tracks: Vec<TopTrack>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TopArtistsEnvelope {
    #[serde(default)]
    pub artists: Vec<TopArtist>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_song_hit_decodes_with_numeric_bpm() {
        let hit: SearchHit = serde_json::from_value(json!({
            "title": "Paranoid Android",
            "type": "song",
            "source": {
                "artist": "Radiohead",
                "albumTitle": "OK Computer",
                "bpm": 82,
                "urlSpotify": "https://open.spotify.com/track/6LgJvl0Xdtc73RJ1mmpotq?si=abc"
            }
        }))
        .unwrap();
        assert_eq!(hit.kind(), EntityKind::Song);
        assert_eq!(hit.like_key(), "Paranoid Android by Radiohead");
        match &hit.entity {
            Entity::Song(song) => {
                assert_eq!(song.bpm.as_deref(), Some("82"));
                assert_eq!(song.spotify_track_id(), Some("6LgJvl0Xdtc73RJ1mmpotq"));
            }
            other => panic!("expected song, got {:?}", other),
        }
    }

    #[test]
    fn test_credited_name_fallbacks() {
        let hit: SearchHit = serde_json::from_value(json!({
            "title": "Untitled",
            "type": "song",
            "source": { "artistName": "Someone" }
        }))
        .unwrap();
        assert_eq!(hit.credited_name(), "Someone");

        let bare: SearchHit =
            serde_json::from_value(json!({ "title": "Lost", "type": "song" })).unwrap();
        assert_eq!(bare.like_key(), "Lost by Unknown artist");
    }

    #[test]
    fn test_member_artist_survives_session_roundtrip() {
        let hit: SearchHit = serde_json::from_value(json!({
            "title": "Thom Yorke",
            "type": "artist",
            "source": {
                "member": {
                    "name": "Thom Yorke",
                    "realName": "Thomas Edward Yorke",
                    "instruments": ["vocals", "guitar"]
                }
            }
        }))
        .unwrap();
        let Entity::Artist(profile) = &hit.entity else {
            panic!("expected artist");
        };
        assert!(profile.is_member);
        assert_eq!(profile.info.instruments_text().as_deref(), Some("Vocals, Guitar"));
        assert_eq!(profile.info.distinct_real_name(), Some("Thomas Edward Yorke"));

        let stored = serde_json::to_string(&hit).unwrap();
        let restored: SearchHit = serde_json::from_str(&stored).unwrap();
        assert_eq!(restored, hit);
    }

    #[test]
    fn test_bad_hit_is_skipped_not_fatal() {
        let raw: RawSearchResponse = serde_json::from_value(json!({
            "hits": [
                { "title": "Good", "type": "album", "source": { "name": "Band" } },
                { "title": "Bad", "type": "podcast" }
            ],
            "session_id": "s-1"
        }))
        .unwrap();
        let resp = SearchResponse::from(raw);
        assert_eq!(resp.hits.len(), 1);
        assert_eq!(resp.hits[0].title, "Good");
        assert_eq!(resp.session_id.as_deref(), Some("s-1"));
    }

    #[test]
    fn test_playback_state_accepts_short_field_names() {
        let state: PlaybackState = serde_json::from_value(json!({
            "track_id": "abc",
            "track_name": "Song",
            "artist_name": "Artist",
            "is_playing": true,
            "progress": 30000,
            "duration": 120000
        }))
        .unwrap();
        assert_eq!(state.progress_ms, 30_000);
        assert!((state.progress_ratio() - 0.25).abs() < 1e-9);
        assert!(state.is_displayable());
    }

    #[test]
    fn test_stat_counts_sorted_by_count() {
        let map: BTreeMap<String, u64> = [
            ("jazz".to_string(), 2),
            ("rock".to_string(), 5),
            ("ambient".to_string(), 2),
        ]
        .into_iter()
        .collect();
        let stats = StatCounts::from(map);
        let names: Vec<&str> = stats.entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["rock", "ambient", "jazz"]);
    }

    #[test]
    fn test_metrics_snapshot_field_names() {
        let snap: MetricsSnapshot = serde_json::from_value(json!({
            "metrics_over_time": {
                "search_numbers": [1, 2],
                "precision@5": [0.2, 0.4],
                "precision@10": [0.1, 0.3]
            },
            "total_searches": 2,
            "most_liked_artist": { "artist": "No artists liked yet", "likes": 0 }
        }))
        .unwrap();
        assert_eq!(snap.metrics_over_time.precision_at_5, vec![0.2, 0.4]);
        assert_eq!(snap.total_searches, 2);
        assert!(snap.most_played_song.is_none());
    }
}
