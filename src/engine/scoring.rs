// Answer scoring: base points plus a stepped speed bonus.
//
// Pure functions only. Recording the outcome in the feed is the battle's job.

use super::config::{SPEED_BONUS_LARGE, SPEED_BONUS_MEDIUM, SPEED_BONUS_SMALL};

/// Bonus for answering with `time_remaining` of `time_limit` seconds left.
///
/// Large when more than two thirds of the window remains, medium when more
/// than one third remains, small otherwise.
pub fn speed_bonus(time_remaining: u32, time_limit: u32) -> u32 {
    let remaining = u64::from(time_remaining.min(time_limit)) * 3;
    let limit = u64::from(time_limit);
    if remaining > limit * 2 {
        SPEED_BONUS_LARGE
    } else if remaining > limit {
        SPEED_BONUS_MEDIUM
    } else {
        SPEED_BONUS_SMALL
    }
}

/// Points awarded for one participant on one question.
///
/// Returns 0 for a missing or wrong answer, otherwise base points plus the
/// speed bonus for the time remaining when the answer was locked in.
pub fn score(
    selected: Option<usize>,
    correct: usize,
    time_remaining: u32,
    time_limit: u32,
    base_points: u32,
) -> u32 {
    match selected {
        Some(answer) if answer == correct => {
            base_points.saturating_add(speed_bonus(time_remaining, time_limit))
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_or_missing_scores_zero() {
        assert_eq!(score(None, 1, 30, 30, 10), 0);
        assert_eq!(score(Some(0), 1, 30, 30, 10), 0);
        assert_eq!(score(Some(3), 1, 0, 30, 10), 0);
    }

    #[test]
    fn test_correct_scores_at_least_base() {
        for t in 0..=30 {
            assert!(score(Some(2), 2, t, 30, 10) >= 10, "t = {t}");
        }
    }

    #[test]
    fn test_bonus_tiers() {
        // 30s window: > 20 large, > 10 medium, else small
        assert_eq!(speed_bonus(30, 30), SPEED_BONUS_LARGE);
        assert_eq!(speed_bonus(21, 30), SPEED_BONUS_LARGE);
        assert_eq!(speed_bonus(20, 30), SPEED_BONUS_MEDIUM);
        assert_eq!(speed_bonus(11, 30), SPEED_BONUS_MEDIUM);
        assert_eq!(speed_bonus(10, 30), SPEED_BONUS_SMALL);
        assert_eq!(speed_bonus(0, 30), SPEED_BONUS_SMALL);
    }

    #[test]
    fn test_bonus_thresholds_use_exact_thirds() {
        // 10s window: 2/3 is 6.67s, so 7 is large and 6 is medium
        assert_eq!(speed_bonus(7, 10), SPEED_BONUS_LARGE);
        assert_eq!(speed_bonus(6, 10), SPEED_BONUS_MEDIUM);
        assert_eq!(speed_bonus(4, 10), SPEED_BONUS_MEDIUM);
        assert_eq!(speed_bonus(3, 10), SPEED_BONUS_SMALL);
    }

    #[test]
    fn test_bonus_never_increases_as_time_runs_out() {
        for limit in 1..=60 {
            let mut prev = speed_bonus(limit, limit);
            for t in (0..limit).rev() {
                let b = speed_bonus(t, limit);
                assert!(b <= prev, "limit {limit}: bonus rose at t = {t}");
                prev = b;
            }
        }
    }

    #[test]
    fn test_huge_base_points_saturate() {
        assert_eq!(score(Some(0), 0, 30, 30, u32::MAX), u32::MAX);
        assert_eq!(score(Some(1), 0, 30, 30, u32::MAX), 0);
    }

    #[test]
    fn test_fast_correct_answer_gets_large_bonus() {
        assert_eq!(score(Some(1), 1, 25, 30, 10), 10 + SPEED_BONUS_LARGE);
    }
}
