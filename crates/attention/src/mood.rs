//! Mood classification from emotion scores

use landmarks::{Emotion, EmotionScores};
use ring_buffer::RingBuffer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Coarse mood shown on the test-taking overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodCategory {
    Positive,
    Negative,
    Neutral,
}

impl MoodCategory {
    /// Preference order when two categories are equally frequent over a whole session
    pub const TIE_ORDER: [MoodCategory; 3] = [
        MoodCategory::Neutral,
        MoodCategory::Positive,
        MoodCategory::Negative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoodCategory::Positive => "positive",
            MoodCategory::Negative => "negative",
            MoodCategory::Neutral => "neutral",
        }
    }
}

impl fmt::Display for MoodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emotion to mood category lookup. Emotions missing from the table map to neutral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoodTable(BTreeMap<Emotion, MoodCategory>);

impl Default for MoodTable {
    fn default() -> Self {
        Self::from_entries([
            (Emotion::Happy, MoodCategory::Positive),
            (Emotion::Surprise, MoodCategory::Positive),
            (Emotion::Angry, MoodCategory::Negative),
            (Emotion::Disgust, MoodCategory::Negative),
            (Emotion::Fear, MoodCategory::Negative),
            (Emotion::Sad, MoodCategory::Negative),
            (Emotion::Neutral, MoodCategory::Neutral),
        ])
    }
}

impl MoodTable {
    pub fn from_entries(entries: impl IntoIterator<Item = (Emotion, MoodCategory)>) -> Self {
        Self(entries.into_iter().collect())
    }

    pub fn category(&self, emotion: Emotion) -> MoodCategory {
        self.0.get(&emotion).copied().unwrap_or(MoodCategory::Neutral)
    }
}

/// One classified frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoodSample {
    pub category: MoodCategory,
    /// Dominant emotion, `None` when no scores were available ("unknown")
    pub emotion: Option<Emotion>,
    pub confidence: f32,
}

impl MoodSample {
    /// Sample for a frame without emotion scores
    pub fn unknown() -> Self {
        Self {
            category: MoodCategory::Neutral,
            emotion: None,
            confidence: 0.0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.emotion.is_none()
    }
}

/// Classifier output for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodReading {
    /// Instantaneous classification of this frame
    pub sample: MoodSample,
    /// Majority category over the rolling window, for display
    pub smoothed: MoodCategory,
    /// Full emotion vector behind `sample`, absent when the sample is unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<EmotionScores>,
}

/// Maps emotion scores to mood and smooths over recent frames
#[derive(Debug, Clone)]
pub struct MoodClassifier {
    table: MoodTable,
    window: RingBuffer<MoodCategory>,
}

impl MoodClassifier {
    pub fn new(table: MoodTable, window: usize) -> Self {
        Self {
            table,
            window: RingBuffer::new(window),
        }
    }

    /// Classify one frame's scores without touching the window
    pub fn sample(&self, scores: Option<&EmotionScores>) -> MoodSample {
        match scores.and_then(EmotionScores::dominant) {
            Some((emotion, confidence)) => MoodSample {
                category: self.table.category(emotion),
                emotion: Some(emotion),
                confidence,
            },
            None => {
                debug!("No emotion scores for frame, recording unknown mood");
                MoodSample::unknown()
            }
        }
    }

    /// Classify a frame and push it into the smoothing window
    pub fn classify(&mut self, scores: Option<&EmotionScores>) -> MoodReading {
        let sample = self.sample(scores);
        self.window.push(sample.category);
        MoodReading {
            sample,
            smoothed: self.smoothed().unwrap_or(sample.category),
            scores: scores.filter(|_| !sample.is_unknown()).cloned(),
        }
    }

    /// Majority category over the window; ties go to the most recently seen
    pub fn smoothed(&self) -> Option<MoodCategory> {
        let mut counts: BTreeMap<MoodCategory, usize> = BTreeMap::new();
        for category in self.window.iter() {
            *counts.entry(*category).or_default() += 1;
        }
        let best = counts.values().copied().max()?;
        self.window
            .iter()
            .rev()
            .find(|c| counts.get(*c).copied() == Some(best))
            .copied()
    }
}

/// Running totals of instantaneous samples over a whole session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MoodTally {
    pub by_category: BTreeMap<MoodCategory, u64>,
    pub by_emotion: BTreeMap<Emotion, u64>,
    /// Samples recorded without emotion scores
    pub unknown: u64,
    pub total: u64,
}

impl MoodTally {
    pub fn record(&mut self, sample: &MoodSample) {
        *self.by_category.entry(sample.category).or_default() += 1;
        match sample.emotion {
            Some(emotion) => *self.by_emotion.entry(emotion).or_default() += 1,
            None => self.unknown += 1,
        }
        self.total += 1;
    }

    /// Most frequent category, ties broken by `MoodCategory::TIE_ORDER`
    pub fn overall(&self) -> Option<MoodCategory> {
        let mut best: Option<(MoodCategory, u64)> = None;
        for category in MoodCategory::TIE_ORDER {
            let count = self.by_category.get(&category).copied().unwrap_or(0);
            if count > 0 && best.map_or(true, |(_, b)| count > b) {
                best = Some((category, count));
            }
        }
        best.map(|(c, _)| c)
    }

    /// Most frequent known emotion, ties going to the first in `Emotion::ALL`
    pub fn dominant_emotion(&self) -> Option<Emotion> {
        let mut best: Option<(Emotion, u64)> = None;
        for (&emotion, &count) in &self.by_emotion {
            if best.map_or(true, |(_, b)| count > b) {
                best = Some((emotion, count));
            }
        }
        best.map(|(e, _)| e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scores(pairs: &[(Emotion, f32)]) -> EmotionScores {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_default_table() {
        let table = MoodTable::default();
        assert_eq!(table.category(Emotion::Happy), MoodCategory::Positive);
        assert_eq!(table.category(Emotion::Surprise), MoodCategory::Positive);
        assert_eq!(table.category(Emotion::Fear), MoodCategory::Negative);
        assert_eq!(table.category(Emotion::Sad), MoodCategory::Negative);
        assert_eq!(table.category(Emotion::Neutral), MoodCategory::Neutral);
    }

    #[test]
    fn test_custom_table_falls_back_to_neutral() {
        let table = MoodTable::from_entries([(Emotion::Surprise, MoodCategory::Negative)]);
        assert_eq!(table.category(Emotion::Surprise), MoodCategory::Negative);
        assert_eq!(table.category(Emotion::Happy), MoodCategory::Neutral);
    }

    #[test]
    fn test_table_from_json() {
        let table: MoodTable = serde_json::from_str(r#"{"happy": "positive", "sad": "negative"}"#).unwrap();
        assert_eq!(table.category(Emotion::Sad), MoodCategory::Negative);
    }

    #[test]
    fn test_sample_argmax() {
        let classifier = MoodClassifier::new(MoodTable::default(), 5);
        let sample = classifier.sample(Some(&scores(&[(Emotion::Angry, 0.7), (Emotion::Happy, 0.2)])));
        assert_eq!(sample.category, MoodCategory::Negative);
        assert_eq!(sample.emotion, Some(Emotion::Angry));
        assert_eq!(sample.confidence, 0.7);
    }

    #[test]
    fn test_missing_scores_are_unknown() {
        let classifier = MoodClassifier::new(MoodTable::default(), 5);
        assert_eq!(classifier.sample(None), MoodSample::unknown());
        assert!(classifier.sample(Some(&EmotionScores::default())).is_unknown());
    }

    #[test]
    fn test_smoothing_uses_majority() {
        let mut classifier = MoodClassifier::new(MoodTable::default(), 3);
        let happy = scores(&[(Emotion::Happy, 0.9)]);
        let sad = scores(&[(Emotion::Sad, 0.9)]);

        classifier.classify(Some(&happy));
        classifier.classify(Some(&happy));
        let reading = classifier.classify(Some(&sad));
        assert_eq!(reading.sample.category, MoodCategory::Negative);
        assert_eq!(reading.smoothed, MoodCategory::Positive);

        // window is now [happy, sad, sad]
        let reading = classifier.classify(Some(&sad));
        assert_eq!(reading.smoothed, MoodCategory::Negative);
    }

    #[test]
    fn test_reading_carries_scores() {
        let mut classifier = MoodClassifier::new(MoodTable::default(), 3);
        let happy = scores(&[(Emotion::Happy, 0.6), (Emotion::Neutral, 0.3), (Emotion::Sad, 0.1)]);

        let reading = classifier.classify(Some(&happy));
        assert_eq!(reading.scores.as_ref(), Some(&happy));
        let json = serde_json::to_value(&reading).unwrap();
        assert!((json["scores"]["neutral"].as_f64().unwrap() - 0.3).abs() < 1e-6);

        let empty = EmotionScores::default();
        assert_eq!(classifier.classify(Some(&empty)).scores, None);
        let reading = classifier.classify(None);
        assert_eq!(reading.scores, None);
        assert!(serde_json::to_value(&reading).unwrap().get("scores").is_none());
    }

    #[test]
    fn test_smoothing_tie_prefers_recent() {
        let mut classifier = MoodClassifier::new(MoodTable::default(), 4);
        classifier.classify(Some(&scores(&[(Emotion::Happy, 0.9)])));
        let reading = classifier.classify(None);
        assert_eq!(reading.smoothed, MoodCategory::Neutral);
    }

    #[test]
    fn test_tally_overall_and_dominant() {
        let classifier = MoodClassifier::new(MoodTable::default(), 3);
        let mut tally = MoodTally::default();
        tally.record(&classifier.sample(Some(&scores(&[(Emotion::Happy, 0.9)]))));
        tally.record(&classifier.sample(Some(&scores(&[(Emotion::Surprise, 0.9)]))));
        tally.record(&classifier.sample(None));

        assert_eq!(tally.total, 3);
        assert_eq!(tally.unknown, 1);
        assert_eq!(tally.overall(), Some(MoodCategory::Positive));
        assert_eq!(tally.dominant_emotion(), Some(Emotion::Happy));
    }

    #[test]
    fn test_tally_tie_prefers_neutral() {
        let classifier = MoodClassifier::new(MoodTable::default(), 3);
        let mut tally = MoodTally::default();
        tally.record(&classifier.sample(Some(&scores(&[(Emotion::Sad, 0.9)]))));
        tally.record(&classifier.sample(Some(&scores(&[(Emotion::Neutral, 0.9)]))));
        assert_eq!(tally.overall(), Some(MoodCategory::Neutral));
        assert_eq!(MoodTally::default().overall(), None);
    }

    fn emotion_strategy() -> impl Strategy<Value = Option<Emotion>> {
        prop::option::of(prop::sample::select(Emotion::ALL.to_vec()))
    }

    proptest! {
        #[test]
        fn tally_sums_to_samples(frames in prop::collection::vec(emotion_strategy(), 0..200)) {
            let mut classifier = MoodClassifier::new(MoodTable::default(), 10);
            let mut tally = MoodTally::default();
            for emotion in &frames {
                let s = emotion.map(|e| scores(&[(e, 0.8)]));
                let reading = classifier.classify(s.as_ref());
                tally.record(&reading.sample);
            }
            prop_assert_eq!(tally.total, frames.len() as u64);
            prop_assert_eq!(tally.by_category.values().sum::<u64>(), frames.len() as u64);
            prop_assert_eq!(tally.by_emotion.values().sum::<u64>() + tally.unknown, frames.len() as u64);
        }
    }
}
