use serde::{Deserialize, Serialize};

/// One line of a line-timed lyric document: a timestamp and its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricLine {
    pub timestamp_ms: u64,
    pub text: String,
}

/// A single word within a word-timed ("YRC") line, with its own start/end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricWord {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

/// A word-timed line: a start/end pair for the whole line plus its ordered
/// words, each independently timed for per-word highlighting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordTimedLine {
    pub start_ms: u64,
    pub end_ms: u64,
    pub words: Vec<LyricWord>,
}

impl WordTimedLine {
    /// The word whose span contains `position_ms`, and how far through that
    /// word's span playback has progressed, from 0.0 to 1.0.
    pub fn word_at(&self, position_ms: u64) -> Option<(usize, f32)> {
        self.words.iter().position(|w| position_ms >= w.start_ms && position_ms < w.end_ms).map(|i| {
            let word = &self.words[i];
            let span = word.end_ms.saturating_sub(word.start_ms).max(1);
            let elapsed = position_ms.saturating_sub(word.start_ms);
            (i, (elapsed as f32 / span as f32).min(1.0))
        })
    }
}

/// Full lyric snapshot for a song: the three content forms the spec allows to
/// coexist, plus the cursor and playback-sync flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LyricState {
    pub lines: Vec<LyricLine>,
    pub translation: Option<Vec<LyricLine>>,
    pub word_lines: Option<Vec<WordTimedLine>>,
    /// Greatest line index whose timestamp <= playhead, or -1 before the
    /// first line (or when there are no lines at all).
    pub current_line: i64,
    pub position_ms: u64,
    pub is_running: bool,
    pub show_translation: bool,
    pub word_mode_enabled: bool,
}

impl LyricState {
    pub fn current_line_text(&self) -> Option<&str> {
        if self.current_line < 0 {
            return None;
        }
        self.lines
            .get(self.current_line as usize)
            .map(|l| l.text.as_str())
    }

    pub fn current_translation_text(&self) -> Option<&str> {
        if !self.show_translation || self.current_line < 0 {
            return None;
        }
        self.translation
            .as_ref()
            .and_then(|lines| lines.get(self.current_line as usize))
            .map(|l| l.text.as_str())
    }
}
