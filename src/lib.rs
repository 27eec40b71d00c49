pub mod bits; // IEEE-754 binary64 field layout
pub mod cmdline_utils;
pub mod errors;
pub mod granularity; // Power-of-2 snapping steps for noised values
pub mod parameters;
pub mod secure_math; // The exact primitives
pub mod sweep; // Randomized self-check
