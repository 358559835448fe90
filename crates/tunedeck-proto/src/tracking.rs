//! Interaction and listening reports sent back to the server.

use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::bus::{MetricsBus, MetricsSignal};
use crate::client::{ApiClient, ApiError, ApiResult};
use crate::likes::PrecisionSample;
use crate::playback::PlayReport;
use crate::protocol::{Entity, EntityKind, InteractionKind, SearchHit, TrackClick};

/// Sends tracking calls and announces each success on the metrics bus.
#[derive(Debug, Clone)]
pub struct Tracker {
    client: ApiClient,
    bus: MetricsBus,
}

impl Tracker {
    pub fn new(client: ApiClient, bus: MetricsBus) -> Self {
        Self { client, bus }
    }

    pub fn bus(&self) -> &MetricsBus {
        &self.bus
    }

    pub async fn click(
        &self,
        session_id: Option<&str>,
        item_text: &str,
        item_type: EntityKind,
        kind: InteractionKind,
    ) -> ApiResult<()> {
        let session_id = require_session(session_id, "track-click")?;
        let click = TrackClick {
            item_text: item_text.to_string(),
            item_type,
            interaction_type: kind,
            session_id: session_id.to_string(),
        };
        self.client.track_click(&click).await?;
        debug!("tracked {:?} for \"{}\"", kind, item_text);
        self.bus.publish(MetricsSignal::InteractionTracked);
        Ok(())
    }

    pub async fn precision(
        &self,
        session_id: Option<&str>,
        sample: PrecisionSample,
    ) -> ApiResult<()> {
        let session_id = require_session(session_id, "update-precision")?;
        self.client
            .update_precision(&sample.into_update(session_id))
            .await?;
        debug!("precision@5={:.2} precision@10={:.2}", sample.at_5, sample.at_10);
        self.bus.publish(MetricsSignal::PrecisionUpdated);
        Ok(())
    }

    pub async fn play(&self, report: &PlayReport) -> ApiResult<()> {
        if report.track_id.trim().is_empty() {
            error!("refusing to report play with empty track id");
            return Err(ApiError::InvalidTrackId);
        }
        if report.duration_secs <= 0.0 {
            debug!("skipping empty play report for {} ({:?})", report.track_id, report.reason);
            return Ok(());
        }
        self.client
            .track_play(&report.track_id, report.duration_secs)
            .await?;
        info!(
            "reported {:.1}s of {} ({:?})",
            report.duration_secs, report.track_id, report.reason
        );
        self.bus.publish(MetricsSignal::PlayTracked);
        Ok(())
    }

    /// Last report on quit. Gives up after `timeout` so exit never hangs.
    pub async fn flush_on_exit(&self, report: &PlayReport, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.play(report)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("final play report failed: {}", e);
                false
            }
            Err(_) => {
                warn!("final play report timed out after {:?}", timeout);
                false
            }
        }
    }
}

fn require_session<'a>(session_id: Option<&'a str>, call: &str) -> ApiResult<&'a str> {
    match session_id.filter(|s| !s.is_empty()) {
        Some(id) => Ok(id),
        None => {
            error!("no session id available for {}", call);
            Err(ApiError::MissingSession)
        }
    }
}

/// Summary sent when the detail view for `hit` opens.
pub fn describe(hit: &SearchHit) -> String {
    let mut text = String::new();
    match &hit.entity {
        Entity::Artist(profile) => {
            let info = &profile.info;
            text.push_str(&hit.title);
            if let Some(real) = info.distinct_real_name() {
                text.push_str(&format!(" ({})", real));
            }
            if let Some(instruments) = info.instruments_text() {
                text.push_str(&format!(", {}", instruments));
            }
            if let Some(subject) = &info.subject {
                text.push_str(&format!(", {}", subject.join(", ")));
            }
        }
        Entity::Album(album) => {
            text.push_str(&format!("{} by {}", hit.title, album.by()));
            for part in [&album.genre, &album.date_release, &album.country]
                .into_iter()
                .flatten()
            {
                text.push_str(&format!(", {}", part));
            }
        }
        Entity::Song(song) => {
            let by = song
                .artist
                .as_deref()
                .or(song.name.as_deref())
                .unwrap_or("Unknown Artist");
            text.push_str(&format!("{} by {}", hit.title, by));
            if let Some(album) = &song.album_title {
                text.push_str(&format!(" from {}", album));
            }
            if let Some(genre) = &song.album_genre {
                text.push_str(&format!(" ({})", genre));
            }
            if let Some(lyrics) = &song.lyrics {
                text.push_str(&format!(" {}", lyrics));
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{AlbumInfo, ArtistInfo, ArtistProfile, SongInfo};

    fn hit(title: &str, entity: Entity) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            image: None,
            preview: None,
            entity,
        }
    }

    #[test]
    fn test_describe_song() {
        let h = hit(
            "Airbag",
            Entity::Song(SongInfo {
                artist: Some("Radiohead".into()),
                album_title: Some("OK Computer".into()),
                album_genre: Some("Rock".into()),
                ..SongInfo::default()
            }),
        );
        assert_eq!(describe(&h), "Airbag by Radiohead from OK Computer (Rock)");
    }

    #[test]
    fn test_describe_album_skips_missing_fields() {
        let h = hit(
            "Kid A",
            Entity::Album(AlbumInfo {
                artist_name: Some("Radiohead".into()),
                country: Some("UK".into()),
                ..AlbumInfo::default()
            }),
        );
        assert_eq!(describe(&h), "Kid A by Radiohead, UK");
    }

    #[test]
    fn test_describe_artist() {
        let h = hit(
            "Björk",
            Entity::Artist(ArtistProfile {
                info: ArtistInfo {
                    name: Some("Björk".into()),
                    real_name: Some("Björk Guðmundsdóttir".into()),
                    instruments: Some(vec!["vocals".into()]),
                    subject: Some(vec!["Icelandic singers".into()]),
                    ..ArtistInfo::default()
                },
                is_member: true,
            }),
        );
        assert_eq!(
            describe(&h),
            "Björk (Björk Guðmundsdóttir), Vocals, Icelandic singers"
        );
    }

    #[test]
    fn test_missing_session_is_rejected() {
        assert!(matches!(
            require_session(None, "x"),
            Err(ApiError::MissingSession)
        ));
        assert!(matches!(
            require_session(Some(""), "x"),
            Err(ApiError::MissingSession)
        ));
        assert_eq!(require_session(Some("s"), "x").unwrap(), "s");
    }
}
