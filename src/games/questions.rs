//! Question source for the quiz game.
//!
//! Decoys are drawn from the same category as the correct answer so an
//! obviously-out-of-place option never gives the round away.

use rand::seq::{IndexedRandom, SliceRandom};
use serde::Serialize;

/// One prepared quiz round: a prompt, the shuffled options, and which
/// option is correct.
#[derive(Debug, Clone, Serialize)]
pub struct QuizRound {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct: String,
}

/// Supplies quiz rounds. Implementations must hand out four options per
/// round with exactly one correct answer among them.
pub trait QuestionSource: Send + Sync {
    fn draw(&self) -> QuizRound;
}

struct Category {
    entries: &'static [(&'static str, &'static str)],
}

const CATEGORIES: &[Category] = &[
    Category {
        entries: &[
            ("What is the capital of France?", "Paris"),
            ("What is the capital of Japan?", "Tokyo"),
            ("What is the capital of Canada?", "Ottawa"),
            ("What is the capital of Australia?", "Canberra"),
            ("What is the capital of Brazil?", "Brasilia"),
            ("What is the capital of Egypt?", "Cairo"),
            ("What is the capital of Norway?", "Oslo"),
            ("What is the capital of Kenya?", "Nairobi"),
        ],
    },
    Category {
        entries: &[
            ("Which planet is closest to the sun?", "Mercury"),
            ("Which planet is known as the red planet?", "Mars"),
            ("Which planet has the most moons?", "Saturn"),
            ("Which planet spins on its side?", "Uranus"),
            ("Which planet is the largest?", "Jupiter"),
            ("Which planet is farthest from the sun?", "Neptune"),
            ("Which planet is hottest on average?", "Venus"),
        ],
    },
    Category {
        entries: &[
            ("What is the chemical symbol Fe?", "Iron"),
            ("What is the chemical symbol Au?", "Gold"),
            ("What is the chemical symbol Na?", "Sodium"),
            ("What is the chemical symbol Ag?", "Silver"),
            ("What is the chemical symbol Pb?", "Lead"),
            ("What is the chemical symbol Sn?", "Tin"),
            ("What is the chemical symbol Cu?", "Copper"),
            ("What is the chemical symbol Hg?", "Mercury"),
        ],
    },
];

/// The built-in question bank.
pub struct BuiltinQuestionBank;

impl QuestionSource for BuiltinQuestionBank {
    fn draw(&self) -> QuizRound {
        let mut rng = rand::rng();
        let category = CATEGORIES.choose(&mut rng).unwrap_or(&CATEGORIES[0]);
        let (prompt, correct) = category
            .entries
            .choose(&mut rng)
            .copied()
            .unwrap_or(category.entries[0]);

        let mut decoys: Vec<&str> = category
            .entries
            .iter()
            .map(|(_, answer)| *answer)
            .filter(|answer| *answer != correct)
            .collect();
        decoys.sort_unstable();
        decoys.dedup();
        decoys.shuffle(&mut rng);

        let mut options: Vec<String> = decoys
            .into_iter()
            .take(3)
            .map(|s| s.to_string())
            .collect();
        options.push(correct.to_string());
        options.shuffle(&mut rng);

        QuizRound {
            prompt: prompt.to_string(),
            options,
            correct: correct.to_string(),
        }
    }
}
