//! # Policy Module
//!
//! Decides, frame by frame, whether to print, capture or alert.
//!
//! ## Rules
//!
//! - The top class decides. Scenery labels the stock model sees all day
//!   (patio, fence, bannister, sawmill) never count.
//! - Print when printing is on and the top score is above the print
//!   threshold.
//! - A detection is a top score above the capture threshold. Detections
//!   are written to disk at most once per save period and alerted at most
//!   once per alert period. Both periods are armed at start-up.
//! - Training mode also writes frames whose label set changed since the
//!   previous frame, sharing the save period.

use crate::capture::SaveReason;
use crate::classification::Classification;
use crate::cooldown::Cooldown;
use crate::score::Score;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// Default print threshold (0.65).
pub const DEFAULT_PRINT_THRESHOLD: Score = Score::from_bp(6500);

/// Default capture threshold (0.70).
pub const DEFAULT_CAPTURE_THRESHOLD: Score = Score::from_bp(7000);

/// Default spacing between saved frames.
pub const DEFAULT_SAVE_PERIOD: Duration = Duration::from_secs(2);

/// Default spacing between alerts (15 minutes).
pub const DEFAULT_ALERT_PERIOD: Duration = Duration::from_secs(900);

/// Labels from the stock ImageNet model that match the feeder's
/// surroundings rather than a visitor.
pub const DEFAULT_IGNORED_LABELS: [&str; 4] = [
    "patio, terrace",
    "picket fence, paling",
    "bannister, banister, balustrade, balusters, handrail",
    "lumbermill, sawmill",
];

/// Placeholder for the "previous frame" before any frame was seen.
const INITIAL_LABEL: &str = "label";

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Tunables for [`FeederPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub ignored_labels: BTreeSet<String>,
    pub print_threshold: Score,
    pub capture_threshold: Score,
    pub save_period: Duration,
    pub alert_period: Duration,
    pub print: bool,
    pub training: bool,
    pub alerts_enabled: bool,
    pub top_k: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            ignored_labels: Self::default_ignored(),
            print_threshold: DEFAULT_PRINT_THRESHOLD,
            capture_threshold: DEFAULT_CAPTURE_THRESHOLD,
            save_period: DEFAULT_SAVE_PERIOD,
            alert_period: DEFAULT_ALERT_PERIOD,
            print: false,
            training: false,
            alerts_enabled: false,
            top_k: 3,
        }
    }
}

impl PolicyConfig {
    #[must_use]
    pub fn default_ignored() -> BTreeSet<String> {
        DEFAULT_IGNORED_LABELS
            .iter()
            .map(|l| (*l).to_string())
            .collect()
    }

    #[must_use]
    pub fn is_ignored(&self, label: &str) -> bool {
        self.ignored_labels.contains(label)
    }
}

// =============================================================================
// DECISION
// =============================================================================

/// What to do with one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Decision {
    /// Top class passed the capture threshold (before cooldowns).
    pub detection: bool,
    /// Print results to the terminal.
    pub print: bool,
    /// Write the frame to storage, and why.
    pub save: Option<SaveReason>,
    /// Send an alert.
    pub alert: bool,
}

impl Decision {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.print && self.save.is_none() && !self.alert
    }
}

// =============================================================================
// POLICY
// =============================================================================

/// Stateful per-frame decision maker.
#[derive(Debug, Clone)]
pub struct FeederPolicy {
    config: PolicyConfig,
    save_cooldown: Cooldown,
    alert_cooldown: Cooldown,
    previous_labels: Vec<String>,
}

impl FeederPolicy {
    /// Create a policy whose cooldowns are armed at `start`.
    #[must_use]
    pub fn new(config: PolicyConfig, start: Instant) -> Self {
        Self {
            save_cooldown: Cooldown::new(config.save_period, start),
            alert_cooldown: Cooldown::new(config.alert_period, start),
            previous_labels: vec![INITIAL_LABEL.to_string()],
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Decide what to do with the frame classified at `now`.
    pub fn evaluate(&mut self, classification: &Classification, now: Instant) -> Decision {
        let labels: Vec<String> = classification.labels().map(str::to_string).collect();
        let mut decision = Decision::default();

        let counted = classification
            .top()
            .filter(|top| !self.config.is_ignored(&top.label));

        if let Some(top) = counted {
            decision.print = self.config.print && top.score > self.config.print_threshold;
            decision.detection = top.score > self.config.capture_threshold;
        }

        // an empty frame has no label to tag a capture with
        let training_capture = self.config.training
            && !classification.is_empty()
            && label_set_differs(&labels, &self.previous_labels, self.config.top_k);

        if (decision.detection || training_capture) && self.save_cooldown.try_fire(now) {
            decision.save = Some(if decision.detection {
                SaveReason::Detection
            } else {
                SaveReason::TrainingDifference
            });
        }

        if decision.detection && self.config.alerts_enabled {
            decision.alert = self.alert_cooldown.try_fire(now);
        }

        self.previous_labels = labels;
        decision
    }
}

/// Whether `new` and `old` disagree on their top `top_k` labels.
///
/// The comparison is bounded by the larger of the two sets, so two identical
/// sets with fewer than `top_k` members are not a difference.
#[must_use]
pub fn label_set_differs<S: AsRef<str>>(new: &[S], old: &[S], top_k: usize) -> bool {
    let new: BTreeSet<&str> = new.iter().take(top_k).map(|s| s.as_ref()).collect();
    let old: BTreeSet<&str> = old.iter().take(top_k).map(|s| s.as_ref()).collect();
    let shared = new.intersection(&old).count();
    shared < top_k.min(new.len().max(old.len()))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::classification::Class;

    fn frame(classes: &[(&str, u16)]) -> Classification {
        Classification {
            classes: classes
                .iter()
                .map(|(label, bp)| Class::new(*label, Score::from_bp(*bp)))
                .collect(),
        }
    }

    fn secs(start: Instant, s: u64) -> Instant {
        start + Duration::from_secs(s)
    }

    #[test]
    fn detection_waits_for_armed_save_period() {
        let start = Instant::now();
        let mut policy = FeederPolicy::new(PolicyConfig::default(), start);
        let finch = frame(&[("house finch", 9000)]);

        let early = policy.evaluate(&finch, start + Duration::from_secs(1));
        assert!(early.detection);
        assert_eq!(early.save, None);

        let later = policy.evaluate(&finch, secs(start, 3));
        assert_eq!(later.save, Some(SaveReason::Detection));

        let too_soon = policy.evaluate(&finch, secs(start, 4));
        assert_eq!(too_soon.save, None);
        assert!(too_soon.detection);
    }

    #[test]
    fn capture_threshold_is_strict() {
        let start = Instant::now();
        let mut policy = FeederPolicy::new(PolicyConfig::default(), start);

        let at = policy.evaluate(&frame(&[("jay", 7000)]), secs(start, 10));
        assert!(!at.detection);
        assert!(at.is_idle());

        let above = policy.evaluate(&frame(&[("jay", 7001)]), secs(start, 11));
        assert!(above.detection);
    }

    #[test]
    fn scenery_is_never_a_detection() {
        let start = Instant::now();
        let config = PolicyConfig {
            print: true,
            alerts_enabled: true,
            ..PolicyConfig::default()
        };
        let mut policy = FeederPolicy::new(config, start);

        for label in DEFAULT_IGNORED_LABELS {
            let decision = policy.evaluate(&frame(&[(label, 9900)]), secs(start, 5000));
            assert!(decision.is_idle(), "{label} should be ignored");
            assert!(!decision.detection);
        }
    }

    #[test]
    fn print_needs_flag_and_threshold() {
        let start = Instant::now();
        let quiet = PolicyConfig::default();
        let mut policy = FeederPolicy::new(quiet, start);
        assert!(!policy.evaluate(&frame(&[("jay", 9000)]), start).print);

        let loud = PolicyConfig {
            print: true,
            ..PolicyConfig::default()
        };
        let mut policy = FeederPolicy::new(loud, start);
        assert!(policy.evaluate(&frame(&[("jay", 6600)]), start).print);
        assert!(!policy.evaluate(&frame(&[("jay", 6500)]), start).print);
    }

    #[test]
    fn alerts_are_rate_limited_and_need_enabling() {
        let start = Instant::now();
        let finch = frame(&[("house finch", 9000)]);

        let mut disabled = FeederPolicy::new(PolicyConfig::default(), start);
        assert!(!disabled.evaluate(&finch, secs(start, 1000)).alert);

        let config = PolicyConfig {
            alerts_enabled: true,
            ..PolicyConfig::default()
        };
        let mut policy = FeederPolicy::new(config, start);
        assert!(!policy.evaluate(&finch, secs(start, 899)).alert);
        assert!(policy.evaluate(&finch, secs(start, 901)).alert);
        assert!(!policy.evaluate(&finch, secs(start, 1500)).alert);
        assert!(policy.evaluate(&finch, secs(start, 1802)).alert);
    }

    #[test]
    fn alert_fires_even_when_save_is_cooling_down() {
        let start = Instant::now();
        let config = PolicyConfig {
            alerts_enabled: true,
            ..PolicyConfig::default()
        };
        let mut policy = FeederPolicy::new(config, start);
        let finch = frame(&[("house finch", 9000)]);

        let saved = policy.evaluate(&finch, secs(start, 100));
        assert_eq!(saved.save, Some(SaveReason::Detection));
        assert!(!saved.alert);

        let alerted = policy.evaluate(&finch, start + Duration::from_millis(900_500));
        assert!(alerted.alert);
    }

    #[test]
    fn training_saves_on_label_change() {
        let start = Instant::now();
        let config = PolicyConfig {
            training: true,
            ..PolicyConfig::default()
        };
        let mut policy = FeederPolicy::new(config, start);
        let a = frame(&[("house finch", 3000), ("jay", 2000)]);
        let b = frame(&[("sparrow", 3000), ("jay", 2000)]);

        // first frame differs from the placeholder
        let first = policy.evaluate(&a, secs(start, 3));
        assert_eq!(first.save, Some(SaveReason::TrainingDifference));
        assert!(!first.detection);

        // same labels, nothing new
        assert_eq!(policy.evaluate(&a, secs(start, 6)).save, None);

        // changed labels, cooldown passed
        assert_eq!(
            policy.evaluate(&b, secs(start, 9)).save,
            Some(SaveReason::TrainingDifference)
        );
    }

    #[test]
    fn training_respects_save_period() {
        let start = Instant::now();
        let config = PolicyConfig {
            training: true,
            ..PolicyConfig::default()
        };
        let mut policy = FeederPolicy::new(config, start);

        assert!(policy.evaluate(&frame(&[("a", 10)]), secs(start, 3)).save.is_some());
        assert!(policy.evaluate(&frame(&[("b", 10)]), secs(start, 4)).save.is_none());
    }

    #[test]
    fn detection_wins_over_training_reason() {
        let start = Instant::now();
        let config = PolicyConfig {
            training: true,
            ..PolicyConfig::default()
        };
        let mut policy = FeederPolicy::new(config, start);
        let decision = policy.evaluate(&frame(&[("jay", 9500)]), secs(start, 3));
        assert_eq!(decision.save, Some(SaveReason::Detection));
    }

    #[test]
    fn empty_classification_is_idle() {
        let start = Instant::now();
        let mut policy = FeederPolicy::new(PolicyConfig::default(), start);
        let decision = policy.evaluate(&Classification::default(), secs(start, 10));
        assert!(decision.is_idle());
        assert!(!decision.detection);
    }

    #[test]
    fn empty_classification_is_idle_in_training() {
        let start = Instant::now();
        let config = PolicyConfig {
            training: true,
            save_period: Duration::ZERO,
            ..PolicyConfig::default()
        };
        let mut policy = FeederPolicy::new(config, start);

        // placeholder labels still set
        let first = policy.evaluate(&Classification::default(), secs(start, 3));
        assert!(first.is_idle(), "{first:?}");

        let jay = frame(&[("jay", 3000)]);
        assert_eq!(
            policy.evaluate(&jay, secs(start, 6)).save,
            Some(SaveReason::TrainingDifference)
        );

        let empty = policy.evaluate(&Classification::default(), secs(start, 9));
        assert!(empty.is_idle(), "{empty:?}");

        // the empty frame reset the previous labels, so jay is new again
        assert_eq!(
            policy.evaluate(&jay, secs(start, 12)).save,
            Some(SaveReason::TrainingDifference)
        );
    }

    #[test]
    fn repeated_short_label_set_is_not_a_difference() {
        let start = Instant::now();
        let config = PolicyConfig {
            training: true,
            save_period: Duration::ZERO,
            top_k: 3,
            ..PolicyConfig::default()
        };
        let mut policy = FeederPolicy::new(config, start);
        let jay = frame(&[("jay", 3000)]);

        assert!(policy.evaluate(&jay, secs(start, 3)).save.is_some());
        assert!(policy.evaluate(&jay, secs(start, 6)).is_idle());
        assert!(policy.evaluate(&jay, secs(start, 9)).is_idle());
    }

    #[test]
    fn label_difference_rules() {
        assert!(label_set_differs(&["a", "b"], &["a", "c"], 2));
        assert!(!label_set_differs(&["a", "b"], &["b", "a"], 2));
        assert!(!label_set_differs(&["a"], &["a"], 3));
        assert!(label_set_differs(&["a"], &["label"], 3));
        assert!(!label_set_differs::<&str>(&[], &[], 3));
        // only the first top_k labels count
        assert!(!label_set_differs(&["a", "b", "x"], &["a", "b", "y"], 2));
    }
}
