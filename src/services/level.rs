//! Level math. Levels follow a square-root curve: reaching level L takes
//! (L-1)^2 * 100 points, so level = floor(1 + sqrt(total / 100)).
//!
//! Totals are clamped at 0 here; the ledger itself may go negative through
//! penalty rules, but a negative total never drops a user below level 1.

pub const POINTS_PER_LEVEL_UNIT: i64 = 100;

pub fn level_for_points(total_points: i64) -> i64 {
    let total = total_points.max(0) as f64;
    (1.0 + (total / POINTS_PER_LEVEL_UNIT as f64).sqrt()).floor() as i64
}

/// Points required to reach level `level`.
pub fn points_for_level(level: i64) -> i64 {
    let base = (level - 1).max(0);
    base * base * POINTS_PER_LEVEL_UNIT
}

/// Points required to reach the level above `level`.
pub fn points_for_next_level(level: i64) -> i64 {
    let base = level.max(1);
    base * base * POINTS_PER_LEVEL_UNIT
}

/// Fraction of the way from the current level floor to the next, in [0, 1].
pub fn progress_within_level(total_points: i64) -> f64 {
    let total = total_points.max(0);
    let level = level_for_points(total);
    let floor = points_for_level(level);
    let ceiling = points_for_next_level(level);

    if ceiling <= floor {
        return 0.0;
    }

    ((total - floor) as f64 / (ceiling - floor) as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_one_at_zero() {
        assert_eq!(level_for_points(0), 1);
        assert_eq!(level_for_points(99), 1);
    }

    #[test]
    fn test_level_boundaries_exact() {
        // level(pointsForLevel(L)) == L and level(pointsForNextLevel(L)) == L+1
        for level in 1..=50 {
            assert_eq!(level_for_points(points_for_level(level)), level);
            assert_eq!(level_for_points(points_for_next_level(level)), level + 1);
        }
    }

    #[test]
    fn test_level_monotonic() {
        let mut previous = level_for_points(0);
        for total in (0..=10_000).step_by(7) {
            let level = level_for_points(total);
            assert!(level >= previous, "level dropped at total={total}");
            previous = level;
        }
    }

    #[test]
    fn test_negative_total_clamped() {
        assert_eq!(level_for_points(-500), 1);
        assert_eq!(progress_within_level(-500), 0.0);
    }

    #[test]
    fn test_progress_bounds() {
        assert_eq!(progress_within_level(0), 0.0);
        // halfway from 100 (level 2) to 400 (level 3)
        let progress = progress_within_level(250);
        assert!((progress - 0.5).abs() < 1e-9);
        // one point shy of level 3
        assert!(progress_within_level(399) < 1.0);
    }

    #[test]
    fn test_example_curve() {
        assert_eq!(level_for_points(50), 1);
        assert_eq!(level_for_points(100), 2);
        assert_eq!(points_for_next_level(1), 100);
        assert_eq!(points_for_next_level(2), 400);
    }
}
