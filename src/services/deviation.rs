//! Deviation Detector
//!
//! Pure classification of section transitions, evaluated on the raw
//! classifier output before the Script Tracker's confidence gating decides
//! adoption. A low-confidence jump is still reported as a jump even though
//! the tracker refuses to commit it.

use crate::models::{DeviationResult, DeviationType};

/// Classify the transition from the tracker's current section to the newly
/// classified one.
///
/// Priority order:
/// 1. off-script speech
/// 2. no section determinable (cannot judge)
/// 3. out-of-range section (treated as off-script)
/// 4. continuation or normal advance
/// 5. backward movement
/// 6. jump over one or more sections
pub fn detect(
    prev_section: u32,
    new_section: Option<u32>,
    is_off_script: bool,
    total_sections: u32,
) -> DeviationResult {
    if is_off_script {
        return DeviationResult {
            deviation: true,
            kind: Some(DeviationType::OffScript),
            message: Some("Conversation has moved off the interview script".to_string()),
        };
    }

    let Some(new_section) = new_section else {
        return DeviationResult::none();
    };

    if new_section == 0 || new_section > total_sections {
        return DeviationResult {
            deviation: true,
            kind: Some(DeviationType::OffScript),
            message: Some(format!(
                "Classified section {} is outside the script (1-{})",
                new_section, total_sections
            )),
        };
    }

    if new_section == prev_section || new_section == prev_section + 1 {
        return DeviationResult::none();
    }

    if new_section < prev_section {
        return DeviationResult {
            deviation: true,
            kind: Some(DeviationType::GoingBackward),
            message: Some(format!(
                "Returned from section {} to section {} ({} back)",
                prev_section,
                new_section,
                prev_section - new_section
            )),
        };
    }

    // new_section > prev_section + 1: name the skipped sections explicitly
    let skipped: Vec<String> = (prev_section + 1..new_section).map(|s| s.to_string()).collect();
    DeviationResult {
        deviation: true,
        kind: Some(DeviationType::JumpAhead),
        message: Some(format!(
            "Jumped from section {} to section {}, skipping {}",
            prev_section,
            new_section,
            skipped.join(", ")
        )),
    }
}

/// Mixed-topic detection: more than two distinct sections observed across
/// a short recent window suggests the conversation is bouncing between
/// topics. Analytical utility, not part of the per-chunk path.
pub fn mixed_topics(recent_sections: &[u32]) -> bool {
    let mut distinct: Vec<u32> = recent_sections.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    distinct.len() > 2
}

/// Out-of-order detection: two or more direction reversals across a short
/// recent window. Analytical utility, not part of the per-chunk path.
pub fn out_of_order(recent_sections: &[u32]) -> bool {
    let mut reversals = 0u32;
    let mut last_direction = 0i64;

    for pair in recent_sections.windows(2) {
        let delta = pair[1] as i64 - pair[0] as i64;
        if delta == 0 {
            continue;
        }
        let direction = delta.signum();
        if last_direction != 0 && direction != last_direction {
            reversals += 1;
        }
        last_direction = direction;
    }

    reversals >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOTAL: u32 = 5;

    #[test]
    fn test_normal_advance_is_not_a_deviation() {
        let result = detect(2, Some(3), false, TOTAL);
        assert!(!result.deviation);
        assert!(result.kind.is_none());
    }

    #[test]
    fn test_continuation_is_not_a_deviation() {
        assert!(!detect(2, Some(2), false, TOTAL).deviation);
    }

    #[test]
    fn test_jump_ahead_names_skipped_sections() {
        let result = detect(2, Some(5), false, TOTAL);
        assert!(result.deviation);
        assert_eq!(result.kind, Some(DeviationType::JumpAhead));
        let msg = result.message.unwrap();
        assert!(msg.contains("3, 4"), "message was: {}", msg);
    }

    #[test]
    fn test_going_backward_names_both_sections() {
        let result = detect(4, Some(2), false, TOTAL);
        assert!(result.deviation);
        assert_eq!(result.kind, Some(DeviationType::GoingBackward));
        let msg = result.message.unwrap();
        assert!(msg.contains('4') && msg.contains('2'), "message was: {}", msg);
    }

    #[test]
    fn test_off_script_takes_priority() {
        let result = detect(3, None, true, TOTAL);
        assert!(result.deviation);
        assert_eq!(result.kind, Some(DeviationType::OffScript));

        // Even with a section present, off-script wins
        let result = detect(3, Some(5), true, TOTAL);
        assert_eq!(result.kind, Some(DeviationType::OffScript));
    }

    #[test]
    fn test_no_section_cannot_judge() {
        let result = detect(3, None, false, TOTAL);
        assert!(!result.deviation);
    }

    #[test]
    fn test_out_of_range_section_is_off_script() {
        let result = detect(3, Some(9), false, TOTAL);
        assert_eq!(result.kind, Some(DeviationType::OffScript));
        assert_eq!(detect(3, Some(0), false, TOTAL).kind, Some(DeviationType::OffScript));
    }

    #[test]
    fn test_mixed_topics() {
        assert!(!mixed_topics(&[1, 1, 2, 2]));
        assert!(!mixed_topics(&[2, 2, 2]));
        assert!(mixed_topics(&[1, 3, 5, 1]));
    }

    #[test]
    fn test_out_of_order() {
        // Linear progression: no reversal
        assert!(!out_of_order(&[1, 2, 3, 4]));
        // One reversal only
        assert!(!out_of_order(&[1, 2, 3, 2]));
        // Two reversals: forward, back, forward
        assert!(out_of_order(&[1, 3, 2, 4]));
        // Plateaus do not count as direction changes
        assert!(!out_of_order(&[1, 2, 2, 3, 3]));
    }
}
