//! Best-effort SRT subtitles estimated from the narration text alone.
//! Timing assumes a constant reading pace and is not derived from audio.

use std::{fmt::Write, sync::LazyLock};

use regex::Regex;

static SENTENCE_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[，。！？；,.!?;]+").unwrap());

const MILLIS_PER_CHAR: u64 = 300;

/// Splits on CJK and ASCII sentence punctuation. Text without any break is
/// returned as a single sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let sentences = SENTENCE_BREAK_RE
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    if sentences.is_empty() {
        vec![text]
    } else {
        sentences
    }
}

pub fn estimate_srt(text: &str) -> String {
    let mut srt = String::new();
    let mut start = 0_u64;

    for (idx, sentence) in split_sentences(text).into_iter().enumerate() {
        let end = start + sentence.chars().count() as u64 * MILLIS_PER_CHAR;
        let _ = write!(
            srt,
            "{}\n{} --> {}\n{}\n\n",
            idx + 1,
            format_timestamp(start),
            format_timestamp(end),
            sentence
        );
        start = end;
    }

    srt
}

/// `HH:MM:SS,mmm`
fn format_timestamp(millis: u64) -> String {
    let hours = millis / 3_600_000;
    let minutes = (millis % 3_600_000) / 60_000;
    let seconds = (millis % 60_000) / 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{:03}", millis % 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_mixed_punctuation() {
        assert_eq!(
            split_sentences("大家好，欢迎收听。Today we talk Rust!"),
            vec!["大家好", "欢迎收听", "Today we talk Rust"]
        );
        assert_eq!(split_sentences("。。"), vec!["。。"]);
    }

    #[test]
    fn test_estimate_srt_timings() {
        let srt = estimate_srt("你好世界。再见");

        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:01,200\n你好世界\n\n2\n00:00:01,200 --> 00:00:01,800\n再见\n\n"
        );
    }

    #[test]
    fn test_timestamp_rolls_over_hours() {
        assert_eq!(format_timestamp(3_723_456), "01:02:03,456");
    }
}
