use serde::Serialize;

use crate::types::CharacterTiming;

/// Fade in and fade out length of every phrase.
pub const FADE_SECONDS: f64 = 0.1;
pub const DEFAULT_MAX_LINE_LENGTH: usize = 80;
pub const FONT_SIZE: f64 = 32.0;
pub const MAX_LINE_WIDTH: f64 = 1200.0;

const TERMINATORS: &[char] = &['.', '!', '?'];
const CLOSERS: &[char] = &['"', '\'', '\u{201D}', '\u{2019}', ')'];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Phrase {
    pub text: String,
    pub start: f64,
    /// End time of the phrase's last narrated character.
    pub end: f64,
}

struct PhraseBuffer {
    text: String,
    chars: usize,
    start: f64,
    end: f64,
}

impl PhraseBuffer {
    fn new() -> Self {
        Self {
            text: String::new(),
            chars: 0,
            start: 0.0,
            end: 0.0,
        }
    }

    fn commit(&mut self, phrases: &mut Vec<Phrase>) {
        let text = self.text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !text.is_empty() {
            phrases.push(Phrase {
                text,
                start: self.start,
                end: self.end,
            });
        }
        self.text.clear();
        self.chars = 0;
    }
}

/// Groups narrated characters into subtitle phrases.
///
/// A phrase closes after sentence-ending punctuation (and any closing quotes
/// that follow it), at the first word boundary once `max_line_length`
/// characters have been collected, or at the end of the input.
pub fn build_phrases(timings: &CharacterTiming, max_line_length: usize) -> Vec<Phrase> {
    let count = timings
        .characters
        .len()
        .min(timings.character_start_times_seconds.len())
        .min(timings.character_end_times_seconds.len());

    let mut phrases = Vec::new();
    let mut buffer = PhraseBuffer::new();
    let mut sentence_closing = false;

    for i in 0..count {
        let ch = timings.characters[i].as_str();
        let is_space = ch.chars().all(char::is_whitespace);

        if buffer.chars == 0 {
            if is_space {
                continue;
            }
            buffer.start = timings.character_start_times_seconds[i];
        }

        buffer.text.push_str(ch);
        buffer.chars += 1;
        buffer.end = timings.character_end_times_seconds[i];

        let last = ch.chars().last().unwrap_or(' ');
        if TERMINATORS.contains(&last) {
            sentence_closing = true;
        } else if !CLOSERS.contains(&last) {
            sentence_closing = false;
        }

        let next = timings
            .characters
            .get(i + 1)
            .and_then(|c| c.chars().next());
        let continues_punctuation =
            next.is_some_and(|n| TERMINATORS.contains(&n) || CLOSERS.contains(&n));

        if (sentence_closing && !continues_punctuation)
            || (buffer.chars >= max_line_length && is_space)
        {
            buffer.commit(&mut phrases);
            sentence_closing = false;
        }
    }
    buffer.commit(&mut phrases);

    phrases
}

/// Opacity of `phrase` at `seconds`: fades in over the first [`FADE_SECONDS`],
/// holds, then fades out over [`FADE_SECONDS`] after its last character.
pub fn phrase_opacity(phrase: &Phrase, seconds: f64) -> f64 {
    if seconds < phrase.start || seconds > phrase.end + FADE_SECONDS {
        return 0.0;
    }
    let opacity = if seconds < phrase.start + FADE_SECONDS {
        (seconds - phrase.start) / FADE_SECONDS
    } else if seconds > phrase.end {
        1.0 - (seconds - phrase.end) / FADE_SECONDS
    } else {
        1.0
    };
    opacity.clamp(0.0, 1.0)
}

/// Pixel width of rendered text.
pub trait TextMeasure {
    fn width(&self, text: &str) -> f64;
}

/// Width estimate for a proportional sans-serif face, per character class.
#[derive(Debug, Clone, Copy)]
pub struct EstimatedFont {
    pub size: f64,
}

impl Default for EstimatedFont {
    fn default() -> Self {
        Self { size: FONT_SIZE }
    }
}

impl TextMeasure for EstimatedFont {
    fn width(&self, text: &str) -> f64 {
        let ems: f64 = text
            .chars()
            .map(|ch| match ch {
                'i' | 'j' | 'l' | '.' | ',' | '\'' | '!' | '|' | ':' | ';' | ' ' => 0.28,
                'm' | 'w' | 'M' | 'W' => 0.85,
                'A'..='Z' => 0.68,
                '0'..='9' => 0.56,
                _ => 0.52,
            })
            .sum();
        ems * self.size
    }
}

/// Greedy word wrap: a word moves to a new line when adding it would exceed
/// `max_width`. A single word wider than `max_width` gets a line of its own.
pub fn wrap_lines(text: &str, measure: &dyn TextMeasure, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if measure.width(&candidate) > max_width && !current.is_empty() {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleFrame {
    pub lines: Vec<String>,
    pub opacity: f64,
}

/// Subtitle phrases for one narration, built once and queried per frame.
pub struct SubtitleTrack {
    phrases: Vec<Phrase>,
    font: EstimatedFont,
    max_width: f64,
}

impl SubtitleTrack {
    pub fn new(timings: &CharacterTiming, max_line_length: usize) -> Self {
        Self {
            phrases: build_phrases(timings, max_line_length),
            font: EstimatedFont::default(),
            max_width: MAX_LINE_WIDTH,
        }
    }

    pub fn phrases(&self) -> &[Phrase] {
        &self.phrases
    }

    /// The phrase on screen at `frame`, if any.
    pub fn at(&self, frame: u32, fps: u32) -> Option<SubtitleFrame> {
        let seconds = frame as f64 / fps.max(1) as f64;
        let phrase = self
            .phrases
            .iter()
            .find(|p| seconds >= p.start && seconds <= p.end + FADE_SECONDS)?;

        Some(SubtitleFrame {
            lines: wrap_lines(&phrase.text, &self.font, self.max_width),
            opacity: phrase_opacity(phrase, seconds),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One tenth of a second per character.
    fn timings(text: &str) -> CharacterTiming {
        let n = text.chars().count();
        CharacterTiming {
            characters: text.chars().map(String::from).collect(),
            character_start_times_seconds: (0..n).map(|i| i as f64 * 0.1).collect(),
            character_end_times_seconds: (0..n).map(|i| (i + 1) as f64 * 0.1).collect(),
        }
    }

    fn texts(phrases: &[Phrase]) -> Vec<&str> {
        phrases.iter().map(|p| p.text.as_str()).collect()
    }

    #[test]
    fn sentence_end_closes_a_phrase() {
        let phrases = build_phrases(&timings("Hello world. This is a test"), 20);
        assert_eq!(texts(&phrases), vec!["Hello world.", "This is a test"]);
        assert!((phrases[0].end - 1.2).abs() < 1e-9);
        assert!((phrases[1].start - 1.3).abs() < 1e-9);
    }

    #[test]
    fn long_phrases_break_at_word_boundaries() {
        let phrases = build_phrases(&timings("one two three four five six"), 8);
        assert_eq!(texts(&phrases), vec!["one two", "three four", "five six"]);
    }

    #[test]
    fn ellipses_and_closing_quotes_stay_together() {
        let phrases = build_phrases(&timings("Wait... \"Stop!\" she said"), 80);
        assert_eq!(texts(&phrases), vec!["Wait...", "\"Stop!\"", "she said"]);
    }

    #[test]
    fn newlines_are_collapsed() {
        let phrases = build_phrases(&timings("First line\n\nsecond line"), 80);
        assert_eq!(texts(&phrases), vec!["First line second line"]);
    }

    #[test]
    fn opacity_fades_in_and_out() {
        let phrase = Phrase {
            text: "x".to_string(),
            start: 1.0,
            end: 2.0,
        };
        assert_eq!(phrase_opacity(&phrase, 0.9), 0.0);
        assert!((phrase_opacity(&phrase, 1.05) - 0.5).abs() < 1e-9);
        assert_eq!(phrase_opacity(&phrase, 1.5), 1.0);
        assert!((phrase_opacity(&phrase, 2.05) - 0.5).abs() < 1e-9);
        assert_eq!(phrase_opacity(&phrase, 2.2), 0.0);
    }

    struct Monospace;

    impl TextMeasure for Monospace {
        fn width(&self, text: &str) -> f64 {
            text.chars().count() as f64 * 10.0
        }
    }

    #[test]
    fn wrap_fits_lines_to_width() {
        let lines = wrap_lines("the quick brown fox jumps", &Monospace, 100.0);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
        let lone = wrap_lines("extraordinarily", &Monospace, 50.0);
        assert_eq!(lone, vec!["extraordinarily"]);
    }

    #[test]
    fn track_shows_the_active_phrase() {
        let track = SubtitleTrack::new(&timings("Hello world. This is a test"), 20);
        assert_eq!(track.phrases().len(), 2);

        let frame = track.at(15, 30).unwrap();
        assert_eq!(frame.lines, vec!["Hello world."]);
        assert_eq!(frame.opacity, 1.0);

        let late = track.at(300, 30);
        assert!(late.is_none());
    }
}
