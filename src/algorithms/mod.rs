pub mod gutmann;
pub mod random;
pub mod zero;


pub use gutmann::GutmannSequence;
pub use random::{RandomString, SecureRandom, SimpleRandom};
pub use zero::ZeroOneToggle;

use crate::{WipeError, WipeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Selectable overwrite algorithm
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum AlgorithmKind {
    Zero,          // All 0x00
    One,           // All 0xFF
    ZeroOne,       // 0x00 then 0xFF over the same region
    SimpleRandom,  // Clock-seeded pseudo random
    SecureRandom,  // OS cryptographic random, non-zero bytes
    RandomString,  // Random filename-safe ASCII tokens
    Gutmann,       // 35-step Gutmann sequence
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 7] = [
        AlgorithmKind::Zero,
        AlgorithmKind::One,
        AlgorithmKind::ZeroOne,
        AlgorithmKind::SimpleRandom,
        AlgorithmKind::SecureRandom,
        AlgorithmKind::RandomString,
        AlgorithmKind::Gutmann,
    ];

    /// Whether the repeat count is fixed by the algorithm itself
    pub fn pins_repeats(&self) -> bool {
        matches!(self, AlgorithmKind::Gutmann)
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlgorithmKind::Zero => "Zero",
            AlgorithmKind::One => "One",
            AlgorithmKind::ZeroOne => "Zero/One",
            AlgorithmKind::SimpleRandom => "Simple random",
            AlgorithmKind::SecureRandom => "Secure random",
            AlgorithmKind::RandomString => "Random string",
            AlgorithmKind::Gutmann => "Gutmann (35 passes)",
        };
        write!(f, "{}", name)
    }
}

/// An algorithm together with how many times it is applied to each file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmSelection {
    kind: AlgorithmKind,
    repeats: u32,
}

impl Default for AlgorithmSelection {
    fn default() -> Self {
        Self::new(AlgorithmKind::SecureRandom, 1)
    }
}

impl AlgorithmSelection {
    pub fn new(kind: AlgorithmKind, repeats: u32) -> Self {
        let mut selection = Self { kind, repeats: 1 };
        selection.set_repeats(repeats);
        selection
    }

    pub fn kind(&self) -> AlgorithmKind {
        self.kind
    }

    /// Effective repeat count. Gutmann is always 1.
    pub fn repeats(&self) -> u32 {
        if self.kind.pins_repeats() {
            1
        } else {
            self.repeats
        }
    }

    pub fn set_repeats(&mut self, repeats: u32) {
        self.repeats = if self.kind.pins_repeats() {
            1
        } else {
            repeats.max(1)
        };
    }

    /// Fresh, independent generator for one job
    pub fn instantiate(&self) -> OverwritePattern {
        OverwritePattern::new(self.kind)
    }
}

/// Byte-buffer generator for one overwrite pass
#[derive(Debug, Clone)]
pub enum OverwritePattern {
    Zero,
    One,
    ZeroOne(ZeroOneToggle),
    SimpleRandom(SimpleRandom),
    SecureRandom(SecureRandom),
    RandomString(RandomString),
    Gutmann(GutmannSequence),
}

impl OverwritePattern {
    pub fn new(kind: AlgorithmKind) -> Self {
        match kind {
            AlgorithmKind::Zero => OverwritePattern::Zero,
            AlgorithmKind::One => OverwritePattern::One,
            AlgorithmKind::ZeroOne => OverwritePattern::ZeroOne(ZeroOneToggle::new()),
            AlgorithmKind::SimpleRandom => OverwritePattern::SimpleRandom(SimpleRandom::new()),
            AlgorithmKind::SecureRandom => OverwritePattern::SecureRandom(SecureRandom::new()),
            AlgorithmKind::RandomString => OverwritePattern::RandomString(RandomString::new()),
            AlgorithmKind::Gutmann => OverwritePattern::Gutmann(GutmannSequence::new()),
        }
    }

    pub fn kind(&self) -> AlgorithmKind {
        match self {
            OverwritePattern::Zero => AlgorithmKind::Zero,
            OverwritePattern::One => AlgorithmKind::One,
            OverwritePattern::ZeroOne(_) => AlgorithmKind::ZeroOne,
            OverwritePattern::SimpleRandom(_) => AlgorithmKind::SimpleRandom,
            OverwritePattern::SecureRandom(_) => AlgorithmKind::SecureRandom,
            OverwritePattern::RandomString(_) => AlgorithmKind::RandomString,
            OverwritePattern::Gutmann(_) => AlgorithmKind::Gutmann,
        }
    }

    /// Produce the buffer for the next write.
    ///
    /// The returned buffer may be longer than `count` (Gutmann rounds up to a
    /// multiple of 3); callers clamp the write to the bytes remaining.
    pub fn generate(&mut self, count: usize) -> WipeResult<Vec<u8>> {
        if count == 0 {
            return Err(WipeError::InvalidBufferLength(count));
        }

        match self {
            OverwritePattern::Zero => Ok(vec![0x00; count]),
            OverwritePattern::One => Ok(vec![0xFF; count]),
            OverwritePattern::ZeroOne(toggle) => Ok(toggle.next_buffer(count)),
            OverwritePattern::SimpleRandom(rng) => Ok(rng.next_buffer(count)),
            OverwritePattern::SecureRandom(rng) => rng.next_buffer(count),
            OverwritePattern::RandomString(gen) => Ok(gen.next_buffer(count)),
            OverwritePattern::Gutmann(seq) => seq.next_buffer(count),
        }
    }

    /// Whether the next buffer must land on the same offset as the last one
    pub fn rewind_after_write(&self) -> bool {
        match self {
            OverwritePattern::ZeroOne(toggle) => toggle.expects_overlap(),
            OverwritePattern::Gutmann(seq) => seq.mid_sequence(),
            _ => false,
        }
    }

    /// How many times each byte is written per repeat
    pub fn passes_per_round(&self) -> u64 {
        match self {
            OverwritePattern::ZeroOne(_) => 2,
            OverwritePattern::Gutmann(_) => gutmann::GUTMANN_STEPS as u64,
            _ => 1,
        }
    }
}
