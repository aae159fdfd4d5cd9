//! Nudge text generation from repetition/stagnation counters.

pub fn repetition_nudge(max_repetition_count: usize, window_size: usize) -> Option<String> {
    if max_repetition_count >= 12 {
        Some(format!(
            "You've repeated a similar action {max_repetition_count} times (out of the last {window_size}); if not making progress, a different approach might get you there faster."
        ))
    } else if max_repetition_count >= 8 {
        Some(format!(
            "You've repeated a similar action {max_repetition_count} times (out of the last {window_size}) — are you still making progress? if not, try a different approach."
        ))
    } else if max_repetition_count >= 5 {
        Some(format!(
            "You've repeated a similar action {max_repetition_count} times (out of the last {window_size}) — if intentional and making progress, carry on. Otherwise, reconsider."
        ))
    } else {
        None
    }
}

pub fn stagnation_nudge(consecutive_stagnant_pages: usize) -> Option<String> {
    if consecutive_stagnant_pages >= 5 {
        Some(format!(
            "Page content has not changed across {consecutive_stagnant_pages} consecutive actions."
        ))
    } else {
        None
    }
}

/// Combines both nudges, blank-line separated, or `None` if neither fires.
pub fn combine(repetition: Option<String>, stagnation: Option<String>) -> Option<String> {
    match (repetition, stagnation) {
        (Some(r), Some(s)) => Some(format!("{r}\n\n{s}")),
        (Some(r), None) => Some(r),
        (None, Some(s)) => Some(s),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repetition_nudge_six_times_mentions_count() {
        let nudge = repetition_nudge(6, 20).unwrap();
        assert!(nudge.contains("repeated a similar action 6 times"));
    }

    #[test]
    fn stagnation_nudge_mentions_five_consecutive() {
        let nudge = stagnation_nudge(5).unwrap();
        assert!(nudge.contains("5 consecutive actions"));
    }

    #[test]
    fn below_threshold_produces_no_nudge() {
        assert!(repetition_nudge(4, 20).is_none());
        assert!(stagnation_nudge(4).is_none());
    }

    #[test]
    fn combine_joins_with_blank_line() {
        let combined = combine(Some("a".into()), Some("b".into())).unwrap();
        assert_eq!(combined, "a\n\nb");
    }

    #[test]
    fn combine_returns_none_when_neither_fires() {
        assert!(combine(None, None).is_none());
    }
}
