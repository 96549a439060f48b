//! Insertion-ordered detection marks for one stream

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::model::{DetectionMark, MarkType, StreamKind};

/// Append-only sequence of marks produced by one consumer
///
/// The set is moved into the consumer's task while it runs and handed back by
/// `join`, so nobody can read it before the consumer has stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    kind: StreamKind,
    marks: Vec<DetectionMark>,
}

impl ResultSet {
    pub fn new(kind: StreamKind) -> Self {
        Self {
            kind,
            marks: Vec::new(),
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Append a mark; marks of another stream kind are rejected
    pub fn append(&mut self, mark: DetectionMark) -> bool {
        if mark.kind != self.kind {
            warn!(
                "Dropping {} mark appended to the {} result set",
                mark.kind, self.kind
            );
            return false;
        }
        self.marks.push(mark);
        true
    }

    pub fn extend(&mut self, marks: impl IntoIterator<Item = DetectionMark>) {
        for mark in marks {
            self.append(mark);
        }
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DetectionMark> {
        self.marks.iter()
    }

    pub fn marks(&self) -> &[DetectionMark] {
        &self.marks
    }

    pub fn count_of(&self, mark_type: MarkType) -> usize {
        self.marks
            .iter()
            .filter(|mark| mark.mark_type == mark_type)
            .count()
    }

    /// Marks carrying a real signal
    pub fn signals(&self) -> impl Iterator<Item = &DetectionMark> {
        self.marks.iter().filter(|mark| !mark.is_degraded())
    }

    pub fn into_marks(self) -> Vec<DetectionMark> {
        self.marks
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a DetectionMark;
    type IntoIter = std::slice::Iter<'a, DetectionMark>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::TimeSpec;

    fn mark(kind: StreamKind, seconds: f64, mark_type: MarkType) -> DetectionMark {
        DetectionMark::new(TimeSpec::from_seconds(seconds), kind, mark_type, 0.8)
    }

    #[test]
    fn test_preserves_insertion_order() {
        let mut results = ResultSet::new(StreamKind::Video);
        results.append(mark(StreamKind::Video, 5.0, MarkType::SceneChange));
        results.append(mark(StreamKind::Video, 1.0, MarkType::BlackFrame));
        results.append(DetectionMark::degraded(TimeSpec::from_seconds(2.0), StreamKind::Video));

        let times: Vec<f64> = results.iter().map(|m| m.timestamp.seconds).collect();
        assert_eq!(times, vec![5.0, 1.0, 2.0]);
        assert_eq!(results.count_of(MarkType::Degraded), 1);
        assert_eq!(results.signals().count(), 2);
    }

    #[test]
    fn test_rejects_other_stream_kind() {
        let mut results = ResultSet::new(StreamKind::Audio);
        assert!(!results.append(mark(StreamKind::Video, 1.0, MarkType::SceneChange)));
        assert!(results.is_empty());
    }
}
