//! Lexicon-based classifier. No model, no network: phase and sentiment are
//! scored from keyword hits, which keeps the output fully deterministic.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

use super::{
    AnalysisSummary, Classification, ClassifiedSegment, DialogueAnalysis, DialogueClassifier,
};
use crate::transcription::{Transcript, TranscriptSegment};

/// Canonical phase order; also the tie-break order when two phases score
/// the same.
const PHASES: [&str; 5] = [
    "greeting",
    "discovery",
    "presentation",
    "objection_handling",
    "closing",
];

fn phase_keywords(phase: &str) -> &'static [&'static str] {
    match phase {
        "greeting" => &[
            "hello",
            "hi ",
            "good morning",
            "good afternoon",
            "my name is",
            "calling from",
            "thanks for taking",
            "how are you",
        ],
        "discovery" => &[
            "tell me about",
            "what are you",
            "how do you",
            "currently",
            "challenge",
            "looking for",
            "what's your",
            "how many",
            "your team",
            "your process",
        ],
        "presentation" => &[
            "we offer",
            "our product",
            "our platform",
            "feature",
            "solution",
            "helps you",
            "designed to",
            "you get",
            "included",
        ],
        "objection_handling" => &[
            "concern",
            "expensive",
            "too much",
            "worried",
            "i understand",
            "competitor",
            "alternative",
            "not sure",
            "hesitant",
        ],
        "closing" => &[
            "next steps",
            "contract",
            "sign",
            "trial",
            "follow up",
            "schedule",
            "send over",
            "pricing",
            "get started",
            "move forward",
        ],
        _ => &[],
    }
}

const POSITIVE_WORDS: [&str; 10] = [
    "great",
    "perfect",
    "love",
    "excellent",
    "absolutely",
    "interested",
    "sounds good",
    "happy",
    "helpful",
    "definitely",
];

const NEGATIVE_WORDS: [&str; 10] = [
    "problem",
    "issue",
    "concern",
    "unfortunately",
    "expensive",
    "worried",
    "cancel",
    "frustrat",
    "disappoint",
    "not interested",
];

fn count_hits(text: &str, words: &[&str]) -> usize {
    words.iter().filter(|word| text.contains(*word)).count()
}

fn classify_phase(text: &str, previous: &str) -> String {
    let mut best_phase = None;
    let mut best_score = 0usize;
    for phase in PHASES {
        let score = count_hits(text, phase_keywords(phase));
        if score > best_score {
            best_score = score;
            best_phase = Some(phase);
        }
    }
    match best_phase {
        Some(phase) => phase.to_string(),
        // Conversations stay in a phase until something signals otherwise.
        None => previous.to_string(),
    }
}

fn classify_sentiment(text: &str) -> &'static str {
    let positive = count_hits(text, &POSITIVE_WORDS);
    let negative = count_hits(text, &NEGATIVE_WORDS);
    if positive > negative {
        "positive"
    } else if negative > positive {
        "negative"
    } else {
        "neutral"
    }
}

fn segment_duration(segment: &TranscriptSegment) -> f64 {
    segment.effective_end() - segment.start
}

#[derive(Debug)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DialogueClassifier for KeywordClassifier {
    fn name(&self) -> &'static str {
        "Keyword classifier"
    }

    async fn classify(&self, transcript: &Transcript) -> Result<DialogueAnalysis> {
        let mut segments = Vec::with_capacity(transcript.segments.len());
        let mut phase_distribution: BTreeMap<String, f64> = BTreeMap::new();
        let mut sentiment_summary: BTreeMap<String, i64> = BTreeMap::new();
        let mut duration = 0.0f64;
        let mut previous_phase = "greeting".to_string();

        for segment in &transcript.segments {
            let text = segment.text.to_lowercase();
            let phase = classify_phase(&text, &previous_phase);
            let sentiment = classify_sentiment(&text).to_string();
            previous_phase.clone_from(&phase);

            *phase_distribution.entry(phase.clone()).or_insert(0.0) +=
                segment_duration(segment);
            *sentiment_summary.entry(sentiment.clone()).or_insert(0) += 1;
            duration = duration.max(segment.effective_end());

            segments.push(ClassifiedSegment {
                start: segment.start,
                classification: Classification { phase, sentiment },
            });
        }

        Ok(DialogueAnalysis {
            segments,
            summary: AnalysisSummary {
                duration,
                phase_distribution,
                sentiment_summary,
            },
        })
    }
}
