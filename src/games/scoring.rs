//! Pure point formulas for the three game types. No side effects here;
//! the state machines call these and the service applies the results.

/// Points a drawer earns for each participant that guesses their word.
pub const DRAWER_POINTS_PER_GUESS: i64 = 5;

/// Points awarded to a correct guesser in the drawing game.
///
/// Faster guesses earn more, with a floor of 10 so a last-second guess
/// still counts.
pub fn drawing_guesser_points(seconds_remaining: u32) -> i64 {
    let timed = (seconds_remaining as f64 * 1.5).floor() as i64;
    timed.max(10)
}

/// Points awarded for cracking a code.
///
/// Each attempt used costs 100, each second left on the clock is worth
/// 10, and harder difficulties carry a flat bonus. Clamped at zero.
pub fn code_breaker_points(attempts_used: u32, seconds_remaining: u32, difficulty_bonus: i64) -> i64 {
    let raw = 1000 - attempts_used as i64 * 100 + seconds_remaining as i64 * 10 + difficulty_bonus;
    raw.max(0)
}

/// Points awarded for a quiz answer.
///
/// A correct answer is worth a flat 1000 plus a speed component that
/// decays linearly from 500 to 0 over the answer window. Incorrect or
/// missing answers score nothing.
pub fn quiz_points(correct: bool, elapsed_seconds: f64, round_seconds: u32) -> i64 {
    if !correct {
        return 0;
    }
    let fraction = 1.0 - elapsed_seconds / round_seconds as f64;
    let speed = (500.0 * fraction).floor().max(0.0) as i64;
    1000 + speed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drawing_guess_scales_with_time() {
        assert_eq!(drawing_guesser_points(60), 90);
        assert_eq!(drawing_guesser_points(21), 31); // floor(31.5)
    }

    #[test]
    fn test_drawing_guess_floor_is_ten() {
        assert_eq!(drawing_guesser_points(0), 10);
        assert_eq!(drawing_guesser_points(3), 10);
        assert_eq!(drawing_guesser_points(7), 10);
    }

    #[test]
    fn test_code_breaker_first_attempt_easy() {
        // Solved on attempt 1 with 20s remaining, easy difficulty.
        assert_eq!(code_breaker_points(1, 20, 0), 1100);
    }

    #[test]
    fn test_code_breaker_hard_bonus() {
        assert_eq!(code_breaker_points(3, 0, 1000), 1700);
    }

    #[test]
    fn test_code_breaker_never_negative() {
        assert_eq!(code_breaker_points(12, 0, 0), 0);
    }

    #[test]
    fn test_quiz_instant_answer() {
        assert_eq!(quiz_points(true, 0.0, 30), 1500);
    }

    #[test]
    fn test_quiz_last_second_answer() {
        assert_eq!(quiz_points(true, 30.0, 30), 1000);
    }

    #[test]
    fn test_quiz_incorrect_scores_zero() {
        assert_eq!(quiz_points(false, 0.0, 30), 0);
    }

    #[test]
    fn test_quiz_speed_component_floors() {
        // 10s into a 30s round: 500 * (2/3) = 333.33 -> 333
        assert_eq!(quiz_points(true, 10.0, 30), 1333);
    }

    #[test]
    fn test_quiz_overdue_answer_clamps_to_base() {
        // Elapsed past the window (timer raced the submission) still
        // earns the base 1000.
        assert_eq!(quiz_points(true, 31.0, 30), 1000);
    }
}
