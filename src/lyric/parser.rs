//! Parsing for the two lyric document formats the service accepts: standard
//! timestamped line lyrics (LRC) and word-timed lyrics (YRC), each of which
//! may also carry a parallel translation stream.
//!
//! Parsing is lenient by default: a malformed line is skipped. In strict
//! mode the first malformed line aborts the whole document.

use crate::error::{EngineError, Result};
use crate::models::{LyricLine, LyricWord, WordTimedLine};

/// Parses a standard `[mm:ss.xx]text` LRC document. A line may carry more
/// than one leading timestamp tag (`[00:05.00][00:10.00]text`), in which
/// case it is expanded into one `LyricLine` per tag.
pub fn parse_lrc(text: &str, strict: bool) -> Result<Vec<LyricLine>> {
    let mut lines = Vec::new();
    for raw_line in text.lines() {
        match parse_lrc_line(raw_line) {
            Some(tagged) => lines.extend(tagged),
            None => {
                if raw_line.trim().is_empty() {
                    continue;
                }
                if strict {
                    return Err(EngineError::ParseError(format!("malformed LRC line: {raw_line:?}")));
                }
                log::debug!("lyric parser: skipping malformed LRC line {raw_line:?}");
            }
        }
    }
    lines.sort_by_key(|l| l.timestamp_ms);
    Ok(lines)
}

fn parse_lrc_line(raw_line: &str) -> Option<Vec<LyricLine>> {
    let mut rest = raw_line.trim();
    let mut timestamps = Vec::new();
    while let Some(stripped) = rest.strip_prefix('[') {
        let end = stripped.find(']')?;
        let tag = &stripped[..end];
        // Metadata tags like [ar:Artist] or [00:00.00] both start with '[';
        // only accept tags whose body parses as a timestamp.
        match parse_timestamp(tag) {
            Some(ms) => timestamps.push(ms),
            None => break,
        }
        rest = &stripped[end + 1..];
    }
    if timestamps.is_empty() {
        return None;
    }
    let text = rest.trim().to_string();
    Some(timestamps.into_iter().map(|ts| LyricLine { timestamp_ms: ts, text: text.clone() }).collect())
}

/// Parses a `mm:ss.xx` or `mm:ss.xxx` timestamp into milliseconds.
fn parse_timestamp(tag: &str) -> Option<u64> {
    let (minutes, rest) = tag.split_once(':')?;
    let minutes: u64 = minutes.trim().parse().ok()?;
    let seconds: f64 = rest.trim().parse().ok()?;
    if seconds < 0.0 {
        return None;
    }
    Some(minutes * 60_000 + (seconds * 1000.0).round() as u64)
}

/// Parses a word-timed ("YRC") document: each line is
/// `[line_start,line_duration]` followed by a run of
/// `(word_start,word_duration,confidence)word` segments with no separator.
pub fn parse_yrc(text: &str, strict: bool) -> Result<Vec<WordTimedLine>> {
    let mut lines = Vec::new();
    for raw_line in text.lines() {
        let raw_line = raw_line.trim();
        if raw_line.is_empty() {
            continue;
        }
        match parse_yrc_line(raw_line) {
            Some(line) => lines.push(line),
            None => {
                if strict {
                    return Err(EngineError::ParseError(format!("malformed YRC line: {raw_line:?}")));
                }
                log::debug!("lyric parser: skipping malformed YRC line {raw_line:?}");
            }
        }
    }
    lines.sort_by_key(|l| l.start_ms);
    Ok(lines)
}

fn parse_yrc_line(raw_line: &str) -> Option<WordTimedLine> {
    let rest = raw_line.strip_prefix('[')?;
    let (header, mut rest) = rest.split_once(']')?;
    let (start_str, duration_str) = header.split_once(',')?;
    let start_ms: u64 = start_str.trim().parse().ok()?;
    let duration_ms: u64 = duration_str.trim().parse().ok()?;

    let mut words = Vec::new();
    while let Some(stripped) = rest.strip_prefix('(') {
        let paren_end = stripped.find(')')?;
        let (word_start, word_rest) = stripped[..paren_end].split_once(',')?;
        let (word_duration, _confidence) = word_rest.split_once(',').unwrap_or((word_rest, "0"));
        let word_start_ms: u64 = word_start.trim().parse().ok()?;
        let word_duration_ms: u64 = word_duration.trim().parse().ok()?;

        let after_paren = &stripped[paren_end + 1..];
        let next_word_start = after_paren.find('(').unwrap_or(after_paren.len());
        let word_text = after_paren[..next_word_start].to_string();
        rest = &after_paren[next_word_start..];

        words.push(LyricWord {
            start_ms: word_start_ms,
            end_ms: word_start_ms + word_duration_ms,
            text: word_text,
        });
    }

    if words.is_empty() {
        return None;
    }
    Some(WordTimedLine { start_ms, end_ms: start_ms + duration_ms, words })
}

/// Serializes line-timed lyrics back into standard LRC text for export to
/// external consumers.
pub fn format_as_lrc(lines: &[LyricLine]) -> String {
    let mut out = String::new();
    for line in lines {
        let minutes = line.timestamp_ms / 60_000;
        let seconds = (line.timestamp_ms % 60_000) as f64 / 1000.0;
        out.push_str(&format!("[{minutes:02}:{seconds:05.2}]{}\n", line.text));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_lrc() {
        let lrc = "[00:05.00]hello\n[00:10.50]world\n";
        let lines = parse_lrc(lrc, false).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].timestamp_ms, 5_000);
        assert_eq!(lines[0].text, "hello");
        assert_eq!(lines[1].timestamp_ms, 10_500);
    }

    #[test]
    fn expands_multi_tag_lines() {
        let lrc = "[00:05.00][00:10.00]same\n";
        let lines = parse_lrc(lrc, false).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "same");
        assert_eq!(lines[1].text, "same");
    }

    #[test]
    fn lenient_mode_skips_malformed_lines() {
        let lrc = "[00:05.00]hello\nnot a lyric line\n[00:10.00]world\n";
        let lines = parse_lrc(lrc, false).unwrap();
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn strict_mode_aborts_on_malformed_line() {
        let lrc = "[00:05.00]hello\nnot a lyric line\n";
        let err = parse_lrc(lrc, true).unwrap_err();
        assert!(matches!(err, EngineError::ParseError(_)));
    }

    #[test]
    fn parses_word_timed_line() {
        let yrc = "[5000,1500](5000,500,0)hello(5500,1000,0)world";
        let lines = parse_yrc(yrc, false).unwrap();
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line.start_ms, 5_000);
        assert_eq!(line.end_ms, 6_500);
        assert_eq!(line.words.len(), 2);
        assert_eq!(line.words[0].text, "hello");
        assert_eq!(line.words[0].start_ms, 5_000);
        assert_eq!(line.words[0].end_ms, 5_500);
        assert_eq!(line.words[1].text, "world");
    }

    #[test]
    fn round_trip_format_as_lrc() {
        let lines = vec![
            LyricLine { timestamp_ms: 5_000, text: "hello".into() },
            LyricLine { timestamp_ms: 70_250, text: "world".into() },
        ];
        let text = format_as_lrc(&lines);
        let reparsed = parse_lrc(&text, true).unwrap();
        assert_eq!(reparsed, lines);
    }
}
