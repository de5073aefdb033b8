//! Whitespace normalization and the normalized-to-original offset map.
//!
//! Narration timings are indexed by characters of the text that was sent to the
//! speech provider. Segment text coming back from the language model rarely
//! agrees with it on whitespace, so matching happens on the normalized form and
//! offsets are translated back through the position map. All offsets here are
//! `char` indices, never byte indices.

const QUOTES: &[char] = &['"', '\'', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}'];

/// Collapses every whitespace run (newlines included) to one space and trims the ends.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// For each character of `normalize(original)`, the index of the character in
/// `original` it came from. A collapsed whitespace run maps to its first character.
pub fn build_position_map(original: &str) -> Vec<usize> {
    let mut map = Vec::with_capacity(original.len());
    let mut pending_space = None;

    for (i, ch) in original.chars().enumerate() {
        if ch.is_whitespace() {
            // leading whitespace is trimmed away by normalize
            if pending_space.is_none() && !map.is_empty() {
                pending_space = Some(i);
            }
            continue;
        }
        if let Some(space) = pending_space.take() {
            map.push(space);
        }
        map.push(i);
    }

    map
}

/// Half-open `[start, end)` range of character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    /// Matched only after quote characters were removed from both sides.
    Relaxed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Offsets into the normalized text.
    pub span: Span,
    pub kind: MatchKind,
}

/// A source text prepared for repeated fragment lookups.
pub struct AlignedText {
    original_len: usize,
    normalized: Vec<char>,
    position_map: Vec<usize>,
    relaxed: Vec<char>,
    relaxed_map: Vec<usize>,
}

impl AlignedText {
    pub fn new(original: &str) -> Self {
        let normalized: Vec<char> = normalize(original).chars().collect();
        let position_map = build_position_map(original);
        debug_assert_eq!(normalized.len(), position_map.len());

        let (relaxed_map, relaxed): (Vec<usize>, Vec<char>) = normalized
            .iter()
            .enumerate()
            .filter(|(_, ch)| !QUOTES.contains(ch))
            .map(|(i, ch)| (i, *ch))
            .unzip();

        Self {
            original_len: original.chars().count(),
            normalized,
            position_map,
            relaxed,
            relaxed_map,
        }
    }

    pub fn normalized_len(&self) -> usize {
        self.normalized.len()
    }

    pub fn position_map(&self) -> &[usize] {
        &self.position_map
    }

    /// Finds `fragment` in the normalized text at or after normalized offset `from`.
    ///
    /// Tries an exact match first, then a match with quote characters ignored.
    pub fn locate(&self, fragment: &str, from: usize) -> Option<Match> {
        let needle: Vec<char> = normalize(fragment).chars().collect();
        if needle.is_empty() {
            return None;
        }

        if let Some(start) = find_chars(&self.normalized, &needle, from) {
            return Some(Match {
                span: Span {
                    start,
                    end: start + needle.len(),
                },
                kind: MatchKind::Exact,
            });
        }

        let relaxed_needle: Vec<char> = needle
            .iter()
            .copied()
            .filter(|ch| !QUOTES.contains(ch))
            .collect();
        if relaxed_needle.is_empty() {
            return None;
        }

        let relaxed_from = self.relaxed_map.partition_point(|&i| i < from);
        let start = find_chars(&self.relaxed, &relaxed_needle, relaxed_from)?;
        let end = start + relaxed_needle.len();
        Some(Match {
            span: Span {
                start: self.relaxed_map[start],
                end: self.relaxed_map[end - 1] + 1,
            },
            kind: MatchKind::Relaxed,
        })
    }

    /// Translates a normalized span into offsets of the original text.
    pub fn to_original(&self, span: Span) -> Span {
        let mapped = self.position_map.len();
        if span.is_empty() || mapped == 0 {
            let at = self
                .position_map
                .get(span.start)
                .copied()
                .unwrap_or(self.original_len);
            return Span::empty(at);
        }

        let start = self.position_map[span.start.min(mapped - 1)];
        let end = self.position_map[span.end.min(mapped) - 1] + 1;
        Span { start, end }
    }
}

fn find_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() || needle.len() > haystack.len() - from {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_runs_and_trims() {
        assert_eq!(normalize("  Hello \n\n  world\t!  "), "Hello world !");
        assert_eq!(normalize("\n\n"), "");
    }

    #[test]
    fn triple_space_maps_to_first_space() {
        let map = build_position_map("ab   cd");
        assert_eq!(normalize("ab   cd"), "ab cd");
        assert_eq!(map, vec![0, 1, 2, 5, 6]);
        assert_eq!(map[2], 2);
    }

    #[test]
    fn newline_runs_count_as_one_space() {
        let original = "one\n\ntwo";
        let map = build_position_map(original);
        assert_eq!(map.len(), normalize(original).chars().count());
        assert_eq!(map[3], 3);
        assert_eq!(map[4], 5);
    }

    #[test]
    fn leading_and_trailing_whitespace_is_not_mapped() {
        let map = build_position_map("  hi  ");
        assert_eq!(map, vec![2, 3]);
    }

    #[test]
    fn map_uses_char_offsets() {
        let original = "café  au lait";
        let map = build_position_map(original);
        assert_eq!(map[4], 4);
        assert_eq!(map[5], 6);
    }

    #[test]
    fn locate_respects_cursor() {
        let text = AlignedText::new("the cat and the dog");
        let first = text.locate("the", 0).unwrap();
        assert_eq!(first.span, Span { start: 0, end: 3 });
        let second = text.locate("the", 1).unwrap();
        assert_eq!(second.span, Span { start: 12, end: 15 });
        assert!(text.locate("cat", 5).is_none());
    }

    #[test]
    fn locate_normalizes_fragment_whitespace() {
        let text = AlignedText::new("First part.\n\nSecond   part.");
        let found = text.locate("part. Second\npart.", 0).unwrap();
        assert_eq!(found.kind, MatchKind::Exact);
        let original = text.to_original(found.span);
        assert_eq!(original, Span { start: 6, end: 27 });
    }

    #[test]
    fn locate_falls_back_to_quote_stripped_search() {
        let text = AlignedText::new("She said \"hello there\" and left.");
        let found = text.locate("said hello there and", 0).unwrap();
        assert_eq!(found.kind, MatchKind::Relaxed);
        assert_eq!(found.span, Span { start: 4, end: 26 });
    }

    #[test]
    fn relaxed_search_honours_cursor() {
        let text = AlignedText::new("'a' b 'a' c");
        let found = text.locate("a c", 3).unwrap();
        assert_eq!(found.kind, MatchKind::Relaxed);
        assert_eq!(found.span.end, 11);
        assert!(text.locate("a b", 4).is_none());
    }

    #[test]
    fn empty_fragment_is_not_found() {
        let text = AlignedText::new("anything");
        assert!(text.locate("   ", 0).is_none());
    }

    #[test]
    fn to_original_handles_empty_span_at_end() {
        let text = AlignedText::new("abc");
        assert_eq!(text.to_original(Span::empty(3)), Span::empty(3));
    }
}
