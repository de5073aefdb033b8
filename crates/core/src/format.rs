use crate::{timeline::Phrase, types::Script};

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

/// Format seconds as an SRT cue time, HH:MM:SS,mmm
pub fn format_srt_timestamp(seconds: f64) -> String {
    let millis = (seconds.max(0.0) * 1000.0).round() as u64;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        millis / 3_600_000,
        millis / 60_000 % 60,
        millis / 1000 % 60,
        millis % 1000
    )
}

/// Downloadable script: outline, full narration text, then one block per
/// conceptual segment.
pub fn format_script_text(script: &Script) -> String {
    let mut output = String::new();
    output.push_str("# Outline\n\n");
    output.push_str(script.outline.trim());
    output.push_str("\n\n# Script\n\n");
    output.push_str(script.raw_content.trim());
    output.push_str("\n\n# Conceptual segments\n\n");

    for segment in &script.conceptual_segments {
        let range = match segment.timing {
            Some(timing) => format!(
                "{}–{}",
                format_timestamp(timing.start),
                format_timestamp(timing.end)
            ),
            None => "--:--".to_string(),
        };
        output.push_str(&format!("[{}] [{}]\n", range, segment.concept_theme));
        output.push_str(segment.content.trim());
        output.push_str("\n\n");
    }

    output
}

pub fn format_srt(phrases: &[Phrase]) -> String {
    phrases
        .iter()
        .enumerate()
        .map(|(i, phrase)| {
            format!(
                "{}\n{} --> {}\n{}\n",
                i + 1,
                format_srt_timestamp(phrase.start),
                format_srt_timestamp(phrase.end),
                phrase.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConceptualSegment, SegmentIndex, SegmentTiming};

    #[test]
    fn timestamps() {
        assert_eq!(format_timestamp(125.9), "02:05");
        assert_eq!(format_srt_timestamp(3725.0456), "01:02:05,046");
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
    }

    #[test]
    fn script_text_lists_segments_with_times() {
        let script = Script {
            outline: "1. Dawn".to_string(),
            raw_content: "The sun rises.".to_string(),
            conceptual_segments: vec![ConceptualSegment {
                index: SegmentIndex(0),
                concept_theme: "Dawn".to_string(),
                visual_description: None,
                content: "The sun rises.".to_string(),
                timing: Some(SegmentTiming {
                    start: 0.0,
                    end: 65.0,
                    duration: 65.0,
                    content_start: 0,
                    content_end: 14,
                }),
            }],
            style: "calm".to_string(),
            character_timings: None,
        };
        let text = format_script_text(&script);
        assert!(text.starts_with("# Outline\n\n1. Dawn\n\n# Script\n\nThe sun rises."));
        assert!(text.contains("[00:00–01:05] [Dawn]\nThe sun rises.\n"));
    }

    #[test]
    fn srt_cues_are_numbered() {
        let phrases = vec![
            Phrase {
                text: "Hello world.".to_string(),
                start: 0.0,
                end: 1.2,
            },
            Phrase {
                text: "Bye.".to_string(),
                start: 1.3,
                end: 2.0,
            },
        ];
        assert_eq!(
            format_srt(&phrases),
            "1\n00:00:00,000 --> 00:00:01,200\nHello world.\n\n2\n00:00:01,300 --> 00:00:02,000\nBye.\n"
        );
    }
}
