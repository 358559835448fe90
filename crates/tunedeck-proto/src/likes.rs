//! Session-local like state and the precision@k metric derived from it.

use std::collections::BTreeSet;

use crate::protocol::{PrecisionUpdate, SearchHit};
use crate::session::{SessionStore, KEY_LIKED_ITEMS};

/// Set of composite like keys (`"<title> by <artist>"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LikeStore {
    keys: BTreeSet<String>,
}

impl LikeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(session: &SessionStore) -> Self {
        let keys: Vec<String> = session.get(KEY_LIKED_ITEMS).unwrap_or_default();
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn save(&self, session: &mut SessionStore) -> anyhow::Result<()> {
        let keys: Vec<&String> = self.keys.iter().collect();
        session.set(KEY_LIKED_ITEMS, &keys)
    }

    /// Returns false if the key was already liked.
    pub fn like(&mut self, key: &str) -> bool {
        self.keys.insert(key.to_string())
    }

    /// Returns false if the key was not liked.
    pub fn unlike(&mut self, key: &str) -> bool {
        self.keys.remove(key)
    }

    /// Flip the like state of `key`, returning the new state.
    pub fn toggle(&mut self, key: &str) -> bool {
        if self.unlike(key) {
            false
        } else {
            self.like(key)
        }
    }

    pub fn is_liked(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Liked hits among the top `k`, divided by `k` itself.
///
/// When fewer than `k` hits exist only the available ones are inspected, but
/// the denominator stays `k`.
pub fn precision_at_k(hits: &[SearchHit], likes: &LikeStore, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let matches = hits
        .iter()
        .take(k)
        .filter(|hit| likes.is_liked(&hit.like_key()))
        .count();
    matches as f64 / k as f64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrecisionSample {
    pub at_5: f64,
    pub at_10: f64,
}

impl PrecisionSample {
    pub fn compute(hits: &[SearchHit], likes: &LikeStore) -> Self {
        Self {
            at_5: precision_at_k(hits, likes, 5),
            at_10: precision_at_k(hits, likes, 10),
        }
    }

    pub fn into_update(self, session_id: &str) -> PrecisionUpdate {
        PrecisionUpdate {
            precision5: self.at_5,
            precision10: self.at_10,
            session_id: session_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Entity, SongInfo};

    fn song(title: &str, artist: &str) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            image: None,
            preview: None,
            entity: Entity::Song(SongInfo {
                artist: Some(artist.to_string()),
                ..SongInfo::default()
            }),
        }
    }

    fn hits(n: usize) -> Vec<SearchHit> {
        (0..n).map(|i| song(&format!("Track {}", i), "Band")).collect()
    }

    #[test]
    fn test_precision_counts_liked_in_top_k() {
        let list = hits(12);
        let mut likes = LikeStore::new();
        likes.like("Track 0 by Band");
        likes.like("Track 3 by Band");
        likes.like("Track 7 by Band");
        likes.like("Track 11 by Band");

        assert!((precision_at_k(&list, &likes, 5) - 0.4).abs() < 1e-9);
        assert!((precision_at_k(&list, &likes, 10) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_precision_divides_by_nominal_k_for_short_lists() {
        let list = hits(3);
        let mut likes = LikeStore::new();
        for hit in &list {
            likes.like(&hit.like_key());
        }
        let sample = PrecisionSample::compute(&list, &likes);
        assert!((sample.at_5 - 0.6).abs() < 1e-9);
        assert!((sample.at_10 - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_precision_bounds() {
        let list = hits(10);
        let mut likes = LikeStore::new();
        assert_eq!(precision_at_k(&list, &likes, 10), 0.0);
        for hit in &list {
            likes.like(&hit.like_key());
        }
        assert_eq!(precision_at_k(&list, &likes, 10), 1.0);
        assert_eq!(precision_at_k(&list, &likes, 0), 0.0);
        assert_eq!(precision_at_k(&[], &likes, 5), 0.0);
    }

    #[test]
    fn test_like_then_unlike_restores_state() {
        let mut likes = LikeStore::new();
        likes.like("Other by Someone");
        let before = likes.clone();

        assert!(likes.toggle("Song by Artist"));
        assert!(likes.is_liked("Song by Artist"));
        assert!(!likes.toggle("Song by Artist"));
        assert_eq!(likes, before);
        assert!(!likes.unlike("Song by Artist"));
    }

    #[test]
    fn test_likes_persist_through_session() {
        let mut session = SessionStore::in_memory();
        let mut likes = LikeStore::new();
        likes.like("A by B");
        likes.save(&mut session).unwrap();

        let restored = LikeStore::load(&session);
        assert!(restored.is_liked("A by B"));
        assert_eq!(restored.len(), 1);
    }

    #[test]
    fn test_update_payload() {
        let update = PrecisionSample { at_5: 0.2, at_10: 0.1 }.into_update("s-9");
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["precision5"], 0.2);
        assert_eq!(json["precision10"], 0.1);
        assert_eq!(json["session_id"], "s-9");
    }
}
