//! Loop Detector: fingerprints recent actions and page states to detect
//! stagnation and repetition, surfacing a free-text nudge for the Message
//! Manager to inject into the next prompt.

mod fingerprint;
mod hash;
mod nudge;

pub use fingerprint::PageFingerprint;
pub use hash::{action_hash, djb2_hex};

use fingerprint::StagnationTracker;
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};

/// Rolling action-hash ring plus page-state stagnation tracking.
pub struct LoopDetector {
    window_size: usize,
    ring: VecDeque<String>,
    max_repetition_count: usize,
    most_repeated_hash: Option<String>,
    stagnation: StagnationTracker,
}

impl LoopDetector {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            ring: VecDeque::with_capacity(window_size),
            max_repetition_count: 0,
            most_repeated_hash: None,
            stagnation: StagnationTracker::new(),
        }
    }

    /// Records one action issued by the LLM (regardless of whether the
    /// executor actually ran it, per the idempotence-of-re-record design
    /// note), recomputing repetition counts over the ring.
    pub fn record_action(&mut self, tool: &str, params: &Map<String, Value>) {
        let hash = action_hash(tool, params);
        self.ring.push_back(hash);
        if self.ring.len() > self.window_size {
            self.ring.pop_front();
        }
        self.recompute_repetition();
    }

    fn recompute_repetition(&mut self) {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for hash in &self.ring {
            *counts.entry(hash.as_str()).or_insert(0) += 1;
        }
        let best = counts.into_iter().max_by_key(|(_, count)| *count);
        match best {
            Some((hash, count)) => {
                self.max_repetition_count = count;
                self.most_repeated_hash = Some(hash.to_string());
            }
            None => {
                self.max_repetition_count = 0;
                self.most_repeated_hash = None;
            }
        }
    }

    /// Records a page state observed this step, computing and retaining its
    /// fingerprint.
    pub fn record_page_state(&mut self, url: &str, dom_text: &str, element_count: usize) {
        self.stagnation
            .record(PageFingerprint::new(url, element_count, dom_text));
    }

    pub fn max_repetition_count(&self) -> usize {
        self.max_repetition_count
    }

    pub fn consecutive_stagnant_pages(&self) -> usize {
        self.stagnation.consecutive_stagnant_pages
    }

    /// Builds the nudge text per the table in 4.2, or `None` if neither
    /// repetition nor stagnation has crossed its threshold.
    pub fn get_nudge_message(&self) -> Option<String> {
        let repetition = nudge::repetition_nudge(self.max_repetition_count, self.window_size);
        let stagnation = nudge::stagnation_nudge(self.stagnation.consecutive_stagnant_pages);
        nudge::combine(repetition, stagnation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn click_params(index: i64) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("index".into(), json!(index));
        params
    }

    #[test]
    fn repeating_one_action_reaches_max_repetition_count_two() {
        let mut detector = LoopDetector::new(20);
        detector.record_action("click-element", &click_params(2));
        detector.record_action("click-element", &click_params(2));
        assert_eq!(detector.max_repetition_count(), 2);
    }

    #[test]
    fn window_truncates_to_configured_size() {
        let mut detector = LoopDetector::new(3);
        for i in 0..5 {
            detector.record_action("click-element", &click_params(i));
        }
        assert_eq!(detector.ring.len(), 3);
    }

    #[test]
    fn six_repeats_produce_the_documented_nudge_text() {
        let mut detector = LoopDetector::new(20);
        for _ in 0..6 {
            detector.record_action("click-element", &click_params(2));
        }
        let nudge = detector.get_nudge_message().unwrap();
        assert!(nudge.contains("repeated a similar action 6 times"));
    }

    #[test]
    fn five_identical_page_states_produce_stagnation_nudge() {
        let mut detector = LoopDetector::new(20);
        for _ in 0..5 {
            detector.record_page_state("https://x.com", "same text", 10);
        }
        let nudge = detector.get_nudge_message().unwrap();
        assert!(nudge.contains("5 consecutive actions"));
    }

    #[test]
    fn no_nudge_below_any_threshold() {
        let mut detector = LoopDetector::new(20);
        detector.record_action("click-element", &click_params(2));
        assert!(detector.get_nudge_message().is_none());
    }
}
