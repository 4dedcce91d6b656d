//! Speaker labeling and turn segmentation. Everything here is pure: same
//! segments in, same turns out, no clocks and no I/O.

use crate::transcription::{RawSegment, Transcript, TranscriptSegment};

/// Label given to leading segments that arrive without a diarization tag.
pub const DEFAULT_SPEAKER: &str = "speaker_0";

/// A maximal run of consecutive segments from one speaker.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub speaker: String,
    pub start: f64,
    pub end: f64,
    pub segment_count: usize,
}

impl Turn {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Resolve provisional diarization tags into final speaker labels.
///
/// Tags pass through trimmed; a segment without a tag inherits the previous
/// segment's label, and leading untagged segments get [`DEFAULT_SPEAKER`].
/// Segments are stable-sorted by start first, so inheritance follows
/// conversation order even if the engine emitted them shuffled.
pub fn label_speakers(mut raw: Vec<RawSegment>) -> Transcript {
    raw.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut segments = Vec::with_capacity(raw.len());
    let mut speakers: Vec<String> = Vec::new();
    let mut current = DEFAULT_SPEAKER.to_string();

    for segment in raw {
        let label = match segment.speaker.as_deref().map(str::trim) {
            Some(tag) if !tag.is_empty() => tag.to_string(),
            _ => current.clone(),
        };
        current.clone_from(&label);

        if !speakers.contains(&label) {
            speakers.push(label.clone());
        }

        segments.push(TranscriptSegment {
            start: segment.start,
            end: segment.end,
            speaker: label,
            text: segment.text,
        });
    }

    Transcript { segments, speakers }
}

/// Group labeled segments into turns.
///
/// A turn extends while the speaker stays the same and the silence gap to
/// the next segment is at most `silence_threshold` seconds. A longer gap
/// starts a new turn even for the same speaker; the gap never changes who
/// the turn belongs to.
pub fn segment_turns(segments: &[TranscriptSegment], silence_threshold: f64) -> Vec<Turn> {
    let mut ordered: Vec<&TranscriptSegment> = segments.iter().collect();
    ordered.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut turns: Vec<Turn> = Vec::new();
    for segment in ordered {
        let effective_end = segment.effective_end();
        match turns.last_mut() {
            Some(turn)
                if turn.speaker == segment.speaker
                    && segment.start - turn.end <= silence_threshold =>
            {
                turn.end = turn.end.max(effective_end);
                turn.segment_count += 1;
            }
            _ => turns.push(Turn {
                speaker: segment.speaker.clone(),
                start: segment.start,
                end: effective_end,
                segment_count: 1,
            }),
        }
    }
    turns
}
