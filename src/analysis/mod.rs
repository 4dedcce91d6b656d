//! Turn-taking analysis: who spoke, how often, and for how long.
//!
//! The whole module is deterministic. Identical segments, tags, and
//! threshold produce byte-identical serialized output, so results can be
//! compared across runs and environments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::transcription::Transcript;

pub mod roles;
pub mod turns;

pub use roles::{FirstSpeakerPolicy, RolePolicy, RoleSplit, RoleStats};
pub use turns::{label_speakers, segment_turns, Turn, DEFAULT_SPEAKER};

/// Per-speaker talk statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeakerStats {
    pub turn_count: usize,
    pub total_duration: f64,
    pub average_turn_duration: f64,
}

/// The full turn-taking picture for one conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnTakingSummary {
    pub total_turns: usize,
    pub per_speaker: BTreeMap<String, SpeakerStats>,
    pub roles: Option<RoleSplit>,
}

/// Aggregate turns into per-speaker stats plus a role split when the
/// policy finds one.
pub fn summarize(turns: &[Turn], policy: &dyn RolePolicy) -> TurnTakingSummary {
    let mut per_speaker: BTreeMap<String, SpeakerStats> = BTreeMap::new();

    for turn in turns {
        let stats = per_speaker.entry(turn.speaker.clone()).or_default();
        stats.turn_count += 1;
        stats.total_duration += turn.duration();
    }

    for stats in per_speaker.values_mut() {
        stats.average_turn_duration = if stats.turn_count == 0 {
            0.0
        } else {
            stats.total_duration / stats.turn_count as f64
        };
    }

    TurnTakingSummary {
        total_turns: turns.len(),
        per_speaker,
        roles: policy.assign(turns),
    }
}

/// Run the full analyzer over a labeled transcript.
pub fn analyze(
    transcript: &Transcript,
    silence_threshold: f64,
    policy: &dyn RolePolicy,
) -> TurnTakingSummary {
    let turns = segment_turns(&transcript.segments, silence_threshold);
    summarize(&turns, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::TranscriptSegment;

    fn segment(start: f64, end: f64, speaker: &str) -> TranscriptSegment {
        TranscriptSegment {
            start,
            end: Some(end),
            speaker: speaker.to_string(),
            text: "...".to_string(),
        }
    }

    fn two_party_transcript() -> Transcript {
        Transcript {
            segments: vec![
                segment(0.0, 2.0, "agent"),
                segment(2.0, 4.0, "agent"),
                segment(4.5, 7.0, "caller"),
                segment(7.5, 9.0, "agent"),
                segment(20.0, 22.0, "caller"),
            ],
            speakers: vec!["agent".to_string(), "caller".to_string()],
        }
    }

    #[test]
    fn test_total_turns_equals_sum_of_speaker_counts() {
        let summary = analyze(&two_party_transcript(), 5.0, &FirstSpeakerPolicy);

        let summed: usize = summary.per_speaker.values().map(|s| s.turn_count).sum();
        assert_eq!(summary.total_turns, summed);
        assert_eq!(summary.total_turns, 4);
    }

    #[test]
    fn test_per_speaker_stats() {
        let summary = analyze(&two_party_transcript(), 5.0, &FirstSpeakerPolicy);

        let agent = &summary.per_speaker["agent"];
        assert_eq!(agent.turn_count, 2);
        assert_eq!(agent.total_duration, 5.5);
        assert_eq!(agent.average_turn_duration, 2.75);

        let caller = &summary.per_speaker["caller"];
        assert_eq!(caller.turn_count, 2);
        assert_eq!(caller.total_duration, 4.5);
        assert_eq!(caller.average_turn_duration, 2.25);
    }

    #[test]
    fn test_roles_follow_first_speaker() {
        let summary = analyze(&two_party_transcript(), 5.0, &FirstSpeakerPolicy);

        let roles = summary.roles.unwrap();
        assert_eq!(roles.salesperson.labels, vec!["agent"]);
        assert_eq!(roles.customer.labels, vec!["caller"]);
        assert_eq!(
            roles.salesperson.turn_count + roles.customer.turn_count,
            summary.total_turns
        );
    }

    #[test]
    fn test_empty_transcript_yields_zeroes() {
        let summary = analyze(&Transcript::default(), 5.0, &FirstSpeakerPolicy);

        assert_eq!(summary.total_turns, 0);
        assert!(summary.per_speaker.is_empty());
        assert!(summary.roles.is_none());
    }

    #[test]
    fn test_zero_count_average_is_zero() {
        let stats = SpeakerStats::default();
        assert_eq!(stats.turn_count, 0);
        assert_eq!(stats.average_turn_duration, 0.0);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let transcript = two_party_transcript();

        let first = analyze(&transcript, 5.0, &FirstSpeakerPolicy);
        let second = analyze(&transcript, 5.0, &FirstSpeakerPolicy);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_speaker_map_serializes_in_stable_order() {
        let summary = analyze(&two_party_transcript(), 5.0, &FirstSpeakerPolicy);
        let json = serde_json::to_string(&summary).unwrap();

        let agent_pos = json.find("\"agent\"").unwrap();
        let caller_pos = json.find("\"caller\"").unwrap();
        assert!(agent_pos < caller_pos);
    }
}
