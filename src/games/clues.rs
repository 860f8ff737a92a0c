//! Clue computation for the code-breaker game.

use serde::{Deserialize, Serialize};

/// Result of comparing a guess against the secret sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clue {
    /// Values in the right position.
    pub exact: u8,
    /// Values present in the secret but in the wrong position.
    pub misplaced: u8,
    /// Values not present in the secret at all.
    pub wrong: u8,
}

/// Compares a guess to the secret in two passes.
///
/// Pass one counts positional matches and removes those slots from both
/// sequences. Pass two walks the remaining guess values and counts how
/// many still exist anywhere in the remaining secret, consuming one
/// secret slot per match so duplicates are not over-counted. Whatever is
/// left over is wrong.
pub fn compare_codes(secret: &[u8], guess: &[u8]) -> Clue {
    let mut exact = 0u8;
    let mut secret_rest: Vec<u8> = Vec::with_capacity(secret.len());
    let mut guess_rest: Vec<u8> = Vec::with_capacity(guess.len());

    for (s, g) in secret.iter().zip(guess.iter()) {
        if s == g {
            exact += 1;
        } else {
            secret_rest.push(*s);
            guess_rest.push(*g);
        }
    }

    let mut misplaced = 0u8;
    let mut wrong = 0u8;
    for g in guess_rest {
        if let Some(pos) = secret_rest.iter().position(|s| *s == g) {
            secret_rest.remove(pos);
            misplaced += 1;
        } else {
            wrong += 1;
        }
    }

    Clue {
        exact,
        misplaced,
        wrong,
    }
}
