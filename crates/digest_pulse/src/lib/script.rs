//! # Script parser
//!
//! Turns the generated podcast script into speaker-attributed turns. Each
//! non-empty line is one turn. Everything up to the first ASCII `:` or
//! full-width `：` colon is treated as a label and stripped; a recognised
//! label selects the voice, anything else is read by the female host.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

const SEPARATORS: [char; 2] = [':', '：'];

/// The two voices of the show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Male,
    Female,
}

impl Speaker {
    /// Matches a script label such as `男`, `女`, `Male` or `female`
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().trim_matches('*').trim().to_lowercase().as_str() {
            "男" | "male" => Some(Speaker::Male),
            "女" | "female" => Some(Speaker::Female),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::Male => "male",
            Speaker::Female => "female",
        }
    }
}

impl FromStr for Speaker {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Speaker::from_label(s).ok_or_else(|| Error::UnknownSpeaker(s.to_string()))
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTurn {
    pub speaker: Speaker,
    pub text: String,
}

/// Splits a podcast script into turns, preserving line order.
/// Blank lines and lines with nothing after their label are dropped.
pub fn parse_script(script: &str) -> Vec<ScriptTurn> {
    script.lines().filter_map(parse_line).collect()
}

pub fn parse_line(line: &str) -> Option<ScriptTurn> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (speaker, text) = match line.split_once(&SEPARATORS[..]) {
        Some((label, rest)) => (
            Speaker::from_label(label).unwrap_or(Speaker::Female),
            rest.trim(),
        ),
        None => (Speaker::Female, line),
    };
    if text.is_empty() {
        return None;
    }

    Some(ScriptTurn {
        speaker,
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speakers_and_texts(turns: &[ScriptTurn]) -> (Vec<Speaker>, Vec<&str>) {
        (
            turns.iter().map(|t| t.speaker).collect(),
            turns.iter().map(|t| t.text.as_str()).collect(),
        )
    }

    #[test]
    fn test_mixed_colons_and_blank_lines() {
        let turns = parse_script("男: hello\n女：world\n\n");

        let (speakers, texts) = speakers_and_texts(&turns);
        assert_eq!(speakers, vec![Speaker::Male, Speaker::Female]);
        assert_eq!(texts, vec!["hello", "world"]);
    }

    #[test]
    fn test_unknown_labels_are_stripped_and_read_by_female_host() {
        let turns = parse_script("主持人：大家好\nHost: welcome\n男：时间是 10:30");

        let (speakers, texts) = speakers_and_texts(&turns);
        assert_eq!(speakers, vec![Speaker::Female, Speaker::Female, Speaker::Male]);
        assert_eq!(texts, vec!["大家好", "welcome", "时间是 10:30"]);
    }

    #[test]
    fn test_lines_without_separator_are_kept_whole() {
        let turns = parse_script("  just narration here  \n主持人：");

        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].speaker, Speaker::Female);
        assert_eq!(turns[0].text, "just narration here");
    }

    #[test]
    fn test_label_only_lines_are_dropped() {
        let turns = parse_script("男：\n   \r\n女: 再见\r\n");

        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].text, "再见");
    }

    #[test]
    fn test_english_and_markdown_labels() {
        let turns = parse_script("**Male**: welcome back\nFEMALE: thanks");

        let (speakers, texts) = speakers_and_texts(&turns);
        assert_eq!(speakers, vec![Speaker::Male, Speaker::Female]);
        assert_eq!(texts, vec!["welcome back", "thanks"]);
    }

    #[test]
    fn test_speaker_from_str() {
        assert_eq!("男".parse::<Speaker>().unwrap(), Speaker::Male);
        assert_eq!("female".parse::<Speaker>().unwrap(), Speaker::Female);
        assert!("narrator".parse::<Speaker>().is_err());
    }
}
