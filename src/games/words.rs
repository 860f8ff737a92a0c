//! Word bank for the drawing game.

use rand::seq::index;

/// Built-in drawable words. Kept simple and concrete so a reveal mask
/// gives guessers a fair chance.
const WORDS: &[&str] = &[
    "airplane",
    "anchor",
    "banana",
    "bicycle",
    "bridge",
    "butterfly",
    "cactus",
    "camera",
    "candle",
    "castle",
    "compass",
    "dolphin",
    "dragon",
    "elephant",
    "firework",
    "flashlight",
    "giraffe",
    "guitar",
    "hammer",
    "helicopter",
    "igloo",
    "island",
    "kangaroo",
    "keyboard",
    "ladder",
    "lighthouse",
    "mermaid",
    "mountain",
    "mushroom",
    "octopus",
    "parachute",
    "penguin",
    "pineapple",
    "pirate",
    "pyramid",
    "rainbow",
    "robot",
    "rocket",
    "sandwich",
    "scissors",
    "snowman",
    "spider",
    "submarine",
    "telescope",
    "tornado",
    "umbrella",
    "volcano",
    "windmill",
];

/// Draws two distinct word options for a drawer to choose between.
pub fn draw_word_pair() -> [String; 2] {
    let picked = index::sample(&mut rand::rng(), WORDS.len(), 2);
    [
        WORDS[picked.index(0)].to_string(),
        WORDS[picked.index(1)].to_string(),
    ]
}
