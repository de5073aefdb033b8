//! Frame plan for the rendered video: one clip per illustrated segment with
//! cross-fades between them.

mod subtitles;

use log::{debug, error, warn};
use serde::Serialize;

pub use subtitles::{
    DEFAULT_MAX_LINE_LENGTH, EstimatedFont, FADE_SECONDS, FONT_SIZE, MAX_LINE_WIDTH, Phrase,
    SubtitleFrame, SubtitleTrack, TextMeasure, build_phrases, phrase_opacity, wrap_lines,
};

use crate::{
    images::{IMAGE_HEIGHT, IMAGE_WIDTH},
    types::{ConceptualSegment, GeneratedImage, SegmentIndex, SegmentTiming},
};

pub const DEFAULT_FPS: u32 = 30;
pub const TRANSITION_FRAMES: u32 = 30;

/// `round(seconds * fps)`, clamped to `[0, total_frames]`.
pub fn frame_for_time(seconds: f64, fps: u32, total_frames: u32) -> u32 {
    let frame = (seconds * fps as f64).round();
    if frame.is_nan() || frame <= 0.0 {
        return 0;
    }
    (frame as u64).min(total_frames as u64) as u32
}

/// Frames needed to play `duration_seconds` of audio in full.
pub fn total_frames_for(duration_seconds: f64, fps: u32) -> u32 {
    let frames = (duration_seconds.max(0.0) * fps as f64).ceil();
    (frames as u32).max(1)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clip {
    pub index: SegmentIndex,
    pub image_url: String,
    pub theme: String,
    pub from: u32,
    pub duration: u32,
}

impl Clip {
    pub fn end(&self) -> u32 {
        self.from + self.duration
    }

    fn contains(&self, frame: u32) -> bool {
        (self.from..self.end()).contains(&frame)
    }
}

/// Cross-fade between two neighbouring clips, centred on their boundary.
/// `outgoing` and `incoming` are positions in [`Timeline::clips`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub outgoing: usize,
    pub incoming: usize,
    pub start: u32,
    pub duration: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layer<'a> {
    pub image_url: &'a str,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub fps: u32,
    pub total_frames: u32,
    pub width: u32,
    pub height: u32,
    pub clips: Vec<Clip>,
    pub transitions: Vec<Transition>,
}

/// Each clip starts on the frame its segment's narration starts and holds
/// until the next clip, so a segment without an image extends the clip before
/// it. The first clip starts at frame 0 and the last one runs to
/// `total_frames`.
pub fn build_timeline(
    segments: &[ConceptualSegment],
    images: &[GeneratedImage],
    total_frames: u32,
    fps: u32,
) -> Timeline {
    let renderable: Vec<(&ConceptualSegment, SegmentTiming, &GeneratedImage)> = segments
        .iter()
        .filter_map(|segment| {
            let Some(timing) = segment.timing else {
                warn!("missing timing for segment {}", segment.index);
                return None;
            };
            let Some(image) = images.iter().find(|image| image.index == segment.index) else {
                error!("no matching image for segment {}", segment.index);
                return None;
            };
            Some((segment, timing, image))
        })
        .collect();

    let mut starts: Vec<u32> = Vec::with_capacity(renderable.len());
    for (_, timing, _) in &renderable {
        let from = match starts.last() {
            None => 0,
            Some(&previous) => frame_for_time(timing.start, fps, total_frames)
                .max(previous + 1)
                .min(total_frames),
        };
        starts.push(from);
    }

    let clips: Vec<Clip> = renderable
        .iter()
        .zip(&starts)
        .enumerate()
        .map(|(position, ((segment, _, image), &from))| {
            let until = starts.get(position + 1).copied().unwrap_or(total_frames);
            let duration = until.saturating_sub(from);
            debug!(
                "clip {} from frame {from} for {duration} frames ({})",
                segment.index, segment.concept_theme
            );
            Clip {
                index: segment.index,
                image_url: image.url.clone(),
                theme: segment.concept_theme.clone(),
                from,
                duration,
            }
        })
        .collect();

    let transitions = clips
        .windows(2)
        .enumerate()
        .filter_map(|(outgoing, pair)| {
            let duration = TRANSITION_FRAMES.min(pair[0].duration).min(pair[1].duration);
            if duration == 0 {
                return None;
            }
            let boundary = pair[1].from;
            Some(Transition {
                outgoing,
                incoming: outgoing + 1,
                start: boundary - duration / 2,
                duration,
            })
        })
        .collect();

    Timeline {
        fps,
        total_frames,
        width: IMAGE_WIDTH,
        height: IMAGE_HEIGHT,
        clips,
        transitions,
    }
}

impl Timeline {
    /// Images visible at `frame`, bottom layer first. Two layers during a
    /// cross-fade, none past the end.
    pub fn frame(&self, frame: u32) -> Vec<Layer<'_>> {
        if let Some(transition) = self
            .transitions
            .iter()
            .find(|t| (t.start..t.start + t.duration).contains(&frame))
        {
            let progress = (frame - transition.start) as f64 / transition.duration as f64;
            return vec![
                Layer {
                    image_url: &self.clips[transition.outgoing].image_url,
                    opacity: 1.0 - progress,
                },
                Layer {
                    image_url: &self.clips[transition.incoming].image_url,
                    opacity: progress,
                },
            ];
        }

        self.clips
            .iter()
            .find(|clip| clip.contains(frame))
            .map(|clip| {
                vec![Layer {
                    image_url: &clip.image_url,
                    opacity: 1.0,
                }]
            })
            .unwrap_or_default()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.total_frames as f64 / self.fps.max(1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(i: u32, start: f64, end: f64) -> ConceptualSegment {
        ConceptualSegment {
            index: SegmentIndex(i),
            concept_theme: format!("theme {i}"),
            visual_description: None,
            content: String::new(),
            timing: Some(SegmentTiming {
                start,
                end,
                duration: end - start,
                content_start: 0,
                content_end: 0,
            }),
        }
    }

    fn image(i: u32) -> GeneratedImage {
        GeneratedImage {
            url: format!("https://img.example/{i}.jpg"),
            concept_theme: format!("theme {i}"),
            index: SegmentIndex(i),
        }
    }

    #[test]
    fn frames_round_and_clamp() {
        assert_eq!(frame_for_time(1.51, 30, 1000), 45);
        assert_eq!(frame_for_time(-2.0, 30, 1000), 0);
        assert_eq!(frame_for_time(100.0, 30, 1000), 1000);
        assert_eq!(total_frames_for(10.01, 30), 301);
    }

    #[test]
    fn last_clip_absorbs_rounding() {
        let segments = [
            segment(0, 0.0, 3.33),
            segment(1, 3.34, 6.66),
            segment(2, 6.67, 9.98),
        ];
        let images = [image(2), image(0), image(1)];
        let timeline = build_timeline(&segments, &images, 301, 30);

        let spans: Vec<u32> = timeline.clips.iter().map(|c| c.duration).collect();
        assert_eq!(spans.iter().sum::<u32>(), 301);
        assert_eq!(spans[0], 100);
        assert_eq!(spans[1], 100);
        assert_eq!(spans[2], 101);
        assert_eq!(timeline.clips[1].from, 100);
        assert_eq!(timeline.clips[2].image_url, "https://img.example/2.jpg");
    }

    #[test]
    fn segments_without_images_are_skipped() {
        let segments = [segment(0, 0.0, 2.0), segment(1, 2.0, 4.0), segment(2, 4.0, 6.0)];
        let images = [image(0), image(2)];
        let timeline = build_timeline(&segments, &images, 180, 30);
        let indices: Vec<u32> = timeline.clips.iter().map(|c| c.index.0).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(timeline.clips.iter().map(|c| c.duration).sum::<u32>(), 180);
    }

    #[test]
    fn missing_middle_image_keeps_later_clips_on_their_narration() {
        let segments = [
            segment(0, 0.0, 10.0),
            segment(1, 10.0, 30.0),
            segment(2, 30.0, 40.0),
            segment(3, 40.0, 60.0),
        ];
        let images = [image(0), image(2), image(3)];
        let timeline = build_timeline(&segments, &images, 1800, 30);

        let placed: Vec<(u32, u32, u32)> = timeline
            .clips
            .iter()
            .map(|c| (c.index.0, c.from, c.duration))
            .collect();
        assert_eq!(placed, vec![(0, 0, 900), (2, 900, 300), (3, 1200, 600)]);
        assert_eq!(timeline.frame(600)[0].image_url, "https://img.example/0.jpg");
        assert_eq!(timeline.frame(1000)[0].image_url, "https://img.example/2.jpg");
    }

    #[test]
    fn segments_without_timing_are_skipped() {
        let mut untimed = segment(1, 0.0, 0.0);
        untimed.timing = None;
        let segments = [segment(0, 0.0, 2.0), untimed];
        let timeline = build_timeline(&segments, &[image(0), image(1)], 90, 30);
        assert_eq!(timeline.clips.len(), 1);
        assert_eq!(timeline.clips[0].duration, 90);
    }

    #[test]
    fn cross_fade_is_centred_on_the_boundary() {
        let segments = [segment(0, 0.0, 4.0), segment(1, 4.0, 8.0)];
        let timeline = build_timeline(&segments, &[image(0), image(1)], 240, 30);
        assert_eq!(
            timeline.transitions,
            vec![Transition {
                outgoing: 0,
                incoming: 1,
                start: 105,
                duration: 30,
            }]
        );

        assert_eq!(timeline.frame(50).len(), 1);
        let mid = timeline.frame(120);
        assert_eq!(mid.len(), 2);
        assert!((mid[0].opacity - 0.5).abs() < 1e-9);
        assert_eq!(mid[1].image_url, "https://img.example/1.jpg");
        assert_eq!(timeline.frame(135)[0].image_url, "https://img.example/1.jpg");
        assert!(timeline.frame(240).is_empty());
    }

    #[test]
    fn short_clips_shorten_the_fade() {
        let segments = [segment(0, 0.0, 0.5), segment(1, 0.5, 3.0)];
        let timeline = build_timeline(&segments, &[image(0), image(1)], 90, 30);
        assert_eq!(timeline.transitions[0].duration, 15);
        assert_eq!(timeline.transitions[0].start, 8);
    }
}
