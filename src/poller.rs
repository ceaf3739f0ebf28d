use tracing::warn;

use crate::{
    art::{ArtCache, ArtFetcher, ArtUpdate},
    player::{PlayerSource, PollError},
};

/// Fixed texts shown when no playback metadata can be obtained.
pub const IDLE_SONG_TEXT: &str = "No song playing";
pub const IDLE_TIME_TEXT: &str = "00:00 / 00:00";

/// Display values computed by one poll tick, consumed by the shell.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackUpdate {
    pub song_text: String,
    /// Rounded percentage, or `None` to leave the progress bar untouched.
    pub progress_percent: Option<f64>,
    pub time_text: String,
    pub art: ArtUpdate,
}

/// Runs one refresh tick against the player and the art cache.
///
/// Any player query failure short-circuits as `Unavailable`. Unparsable
/// numeric output is reported as `Malformed` so the caller can keep the
/// previous display instead of dropping to idle. Art fetch or decode
/// failures are logged and leave the art untouched for the tick; the cache
/// slot is never invalidated on failure.
pub fn poll_once(
    player: &impl PlayerSource,
    cache: &mut ArtCache,
    fetcher: &impl ArtFetcher,
) -> Result<TrackUpdate, PollError> {
    let title = player.metadata("title")?;
    let artist = player.metadata("artist")?;
    let song_text = format!("{title} - {artist}");

    let art_uri = player.metadata("mpris:artUrl")?;
    let art = if art_uri.is_empty() {
        ArtUpdate::Unchanged
    } else {
        match cache.refresh(&art_uri, fetcher) {
            Ok(update) => update,
            Err(err) => {
                warn!(uri = %art_uri, error = %err, "album art refresh failed; keeping previous image");
                ArtUpdate::Unchanged
            }
        }
    };

    let length_raw = player.metadata("mpris:length")?;
    let length_us = parse_field::<i64>("mpris:length", &length_raw)?;
    let position_raw = player.position()?;
    let position_secs = parse_field::<f64>("position", &position_raw)?;

    let elapsed_secs = position_secs.max(0.0).floor() as i64;
    let total_secs = length_us.max(0) / 1_000_000;

    Ok(TrackUpdate {
        song_text,
        progress_percent: progress_percent(position_secs, length_us),
        time_text: format!(
            "{} / {}",
            format_track_time(elapsed_secs),
            format_track_time(total_secs)
        ),
        art,
    })
}

fn parse_field<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, PollError> {
    raw.trim().parse().map_err(|_| PollError::Malformed {
        field,
        value: raw.to_string(),
    })
}

/// Progress through the track as a rounded percentage. A non-positive
/// length yields `None`, leaving the progress untouched for the tick.
pub fn progress_percent(position_secs: f64, length_us: i64) -> Option<f64> {
    if length_us <= 0 {
        return None;
    }
    Some((position_secs * 1e6 / length_us as f64 * 100.0).round())
}

/// Zero-padded MM:SS. Minutes grow past two digits for very long tracks.
pub fn format_track_time(total_secs: i64) -> String {
    let secs = total_secs.max(0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::{cell::Cell, collections::HashMap};

    struct FakePlayer {
        metadata: HashMap<&'static str, Result<String, PollError>>,
        position: Result<String, PollError>,
    }

    impl FakePlayer {
        fn playing(position: &str, length: &str, art_uri: &str) -> Self {
            let mut metadata = HashMap::new();
            metadata.insert("title", Ok("Blink".to_string()));
            metadata.insert("artist", Ok("Chameleon Circuit".to_string()));
            metadata.insert("mpris:artUrl", Ok(art_uri.to_string()));
            metadata.insert("mpris:length", Ok(length.to_string()));
            Self {
                metadata,
                position: Ok(position.to_string()),
            }
        }
    }

    impl PlayerSource for FakePlayer {
        fn metadata(&self, field: &str) -> Result<String, PollError> {
            self.metadata
                .get(field)
                .cloned()
                .unwrap_or(Err(PollError::Unavailable))
        }

        fn position(&self) -> Result<String, PollError> {
            self.position.clone()
        }
    }

    struct NoFetcher {
        calls: Cell<usize>,
    }

    impl NoFetcher {
        fn new() -> Self {
            Self { calls: Cell::new(0) }
        }
    }

    impl ArtFetcher for NoFetcher {
        fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            self.calls.set(self.calls.get() + 1);
            Err(anyhow::anyhow!("unreachable host"))
        }
    }

    fn scratch_cache() -> (tempfile::TempDir, ArtCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtCache::new(dir.path().join("album.jpg"));
        (dir, cache)
    }

    #[test]
    fn progress_matches_the_rounded_ratio() {
        let player = FakePlayer::playing("125.0", "200000000", "");
        let (_dir, mut cache) = scratch_cache();

        let update = poll_once(&player, &mut cache, &NoFetcher::new()).unwrap();

        assert_eq!(update.song_text, "Blink - Chameleon Circuit");
        assert_eq!(update.progress_percent, Some(63.0));
        assert_eq!(update.time_text, "02:05 / 03:20");
    }

    #[test]
    fn non_positive_length_leaves_progress_unset() {
        let player = FakePlayer::playing("125.0", "0", "");
        let (_dir, mut cache) = scratch_cache();

        let update = poll_once(&player, &mut cache, &NoFetcher::new()).unwrap();

        assert_eq!(update.progress_percent, None);
        assert_eq!(update.time_text, "02:05 / 00:00");
    }

    #[test]
    fn query_failure_short_circuits_as_unavailable() {
        let mut player = FakePlayer::playing("125.0", "200000000", "");
        player
            .metadata
            .insert("title", Err(PollError::Unavailable));
        let (_dir, mut cache) = scratch_cache();

        let result = poll_once(&player, &mut cache, &NoFetcher::new());

        assert_eq!(result, Err(PollError::Unavailable));
    }

    #[test]
    fn malformed_length_is_distinguished_from_unavailable() {
        let player = FakePlayer::playing("125.0", "three minutes", "");
        let (_dir, mut cache) = scratch_cache();

        let result = poll_once(&player, &mut cache, &NoFetcher::new());

        assert_eq!(
            result,
            Err(PollError::Malformed {
                field: "mpris:length",
                value: "three minutes".to_string(),
            })
        );
    }

    #[test]
    fn malformed_position_is_distinguished_from_unavailable() {
        let mut player = FakePlayer::playing("125.0", "200000000", "");
        player.position = Ok(String::new());
        let (_dir, mut cache) = scratch_cache();

        let result = poll_once(&player, &mut cache, &NoFetcher::new());

        assert!(matches!(
            result,
            Err(PollError::Malformed { field: "position", .. })
        ));
    }

    #[test]
    fn empty_art_uri_leaves_art_untouched() {
        let player = FakePlayer::playing("10.0", "200000000", "");
        let (_dir, mut cache) = scratch_cache();
        let fetcher = NoFetcher::new();

        let update = poll_once(&player, &mut cache, &fetcher).unwrap();

        assert_eq!(update.art, ArtUpdate::Unchanged);
        assert_eq!(fetcher.calls.get(), 0);
    }

    #[test]
    fn art_fetch_failure_does_not_fail_the_tick() {
        let player = FakePlayer::playing("10.0", "200000000", "https://example.com/a.png");
        let (_dir, mut cache) = scratch_cache();
        let fetcher = NoFetcher::new();

        let update = poll_once(&player, &mut cache, &fetcher).unwrap();

        assert_eq!(update.art, ArtUpdate::Unchanged);
        assert_eq!(fetcher.calls.get(), 1);
        assert_eq!(update.progress_percent, Some(5.0));
    }

    #[test]
    fn track_time_is_a_zero_padded_minute_second_pair() {
        assert_eq!(format_track_time(125), "02:05");
        assert_eq!(format_track_time(200), "03:20");
        assert_eq!(format_track_time(0), "00:00");
        assert_eq!(format_track_time(-3), "00:00");
        assert_eq!(format_track_time(6000), "100:00");
    }

    #[test]
    fn progress_is_not_clamped_by_the_poller() {
        // The display widget owns the 0-100 clamp.
        assert_eq!(progress_percent(400.0, 200_000_000), Some(200.0));
        assert_eq!(progress_percent(125.0, -5), None);
    }
}
