use std::time::Duration;

use serde::Serialize;

use crate::models::Song;
use crate::reporter::{is_eligible_play, log_reporter_failure, Reporter};

#[derive(Serialize)]
struct ScrobblePayload<'a> {
    song_id: i64,
    title: &'a str,
    artist: String,
    album: &'a str,
    event: &'a str,
    played_ms: u64,
}

/// POSTs a small JSON payload to a configured scrobble-alike endpoint.
/// Failures are logged and otherwise swallowed — a reporter never blocks or
/// interrupts playback.
pub struct HttpReporter {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpReporter {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(7))
            .timeout_write(Duration::from_secs(7))
            .build();
        Self { endpoint: endpoint.into(), agent }
    }

    fn post(&self, payload: &ScrobblePayload) {
        let result = self.agent.post(&self.endpoint).send_json(payload);
        if let Err(err) = result {
            log_reporter_failure(self.name(), payload.event, err);
        }
    }
}

impl Reporter for HttpReporter {
    fn report_start(&self, song: &Song) {
        self.post(&ScrobblePayload {
            song_id: song.id,
            title: &song.title,
            artist: song.artist_display(),
            album: &song.album.name,
            event: "start",
            played_ms: 0,
        });
    }

    fn report_end(&self, song: &Song, played: Duration) {
        if !is_eligible_play(song, played) {
            return;
        }
        self.post(&ScrobblePayload {
            song_id: song.id,
            title: &song.title,
            artist: song.artist_display(),
            album: &song.album.name,
            event: "end",
            played_ms: played.as_millis() as u64,
        });
    }

    fn name(&self) -> &str {
        "http"
    }
}
