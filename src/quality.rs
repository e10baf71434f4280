use std::{collections::VecDeque, fmt};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum DetectionQuality {
    None,
    Partial,
    Good,
}

impl fmt::Display for DetectionQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Partial => "partial",
            Self::Good => "good",
        })
    }
}

/// Smooths per-frame visible keypoint counts over a rolling window so the
/// reported quality does not flicker between states several times a second.
#[derive(Debug, Clone)]
pub(crate) struct QualityClassifier {
    window: VecDeque<usize>,
    capacity: usize,
    partial_min: usize,
    good_min: usize,
}

impl QualityClassifier {
    pub(crate) fn new(capacity: usize, partial_min: usize, good_min: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            partial_min,
            good_min,
        }
    }

    /// Record one frame's visible count and return the smoothed classification.
    pub(crate) fn push(&mut self, visible_count: usize) -> (DetectionQuality, usize) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(visible_count);
        let average = self.average();
        (self.classify(average), average)
    }

    /// Floor of the mean visible count; zero for an empty window.
    pub(crate) fn average(&self) -> usize {
        if self.window.is_empty() {
            0
        } else {
            self.window.iter().sum::<usize>() / self.window.len()
        }
    }

    pub(crate) fn classify(&self, average: usize) -> DetectionQuality {
        if average >= self.good_min {
            DetectionQuality::Good
        } else if average >= self.partial_min {
            DetectionQuality::Partial
        } else {
            DetectionQuality::None
        }
    }

    pub(crate) fn current(&self) -> DetectionQuality {
        self.classify(self.average())
    }

    pub(crate) fn clear(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{DetectionQuality, QualityClassifier};

    fn classifier() -> QualityClassifier {
        QualityClassifier::new(10, 5, 10)
    }

    #[test]
    fn classification_is_order_preserving() {
        let classifier = classifier();
        let mut previous = DetectionQuality::None;
        for average in 0..=17 {
            let quality = classifier.classify(average);
            assert!(quality >= previous);
            previous = quality;
        }
        assert_eq!(classifier.classify(4), DetectionQuality::None);
        assert_eq!(classifier.classify(5), DetectionQuality::Partial);
        assert_eq!(classifier.classify(9), DetectionQuality::Partial);
        assert_eq!(classifier.classify(10), DetectionQuality::Good);
    }

    #[test]
    fn average_is_floored() {
        let mut classifier = classifier();
        classifier.push(10);
        let (quality, average) = classifier.push(9);
        assert_eq!(average, 9);
        assert_eq!(quality, DetectionQuality::Partial);
    }

    #[test]
    fn window_evicts_oldest() {
        let mut classifier = classifier();
        for _ in 0..10 {
            classifier.push(0);
        }
        assert_eq!(classifier.current(), DetectionQuality::None);
        for _ in 0..10 {
            classifier.push(17);
        }
        assert_eq!(classifier.average(), 17);
        assert_eq!(classifier.current(), DetectionQuality::Good);
    }

    #[test]
    fn single_dropout_does_not_flicker() {
        let mut classifier = classifier();
        for _ in 0..9 {
            classifier.push(17);
        }
        let (quality, _) = classifier.push(0);
        assert_eq!(quality, DetectionQuality::Good);
    }

    #[test]
    fn clear_forgets_history() {
        let mut classifier = classifier();
        classifier.push(17);
        classifier.clear();
        assert_eq!(classifier.average(), 0);
        assert_eq!(classifier.current(), DetectionQuality::None);
    }
}
