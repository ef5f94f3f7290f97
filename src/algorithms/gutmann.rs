use crate::crypto::secure_rng::NonZeroSecureBytes;
use crate::WipeResult;

/// Total number of steps in one Gutmann round
pub const GUTMANN_STEPS: usize = 35;

/// Number of secure-random steps before and after the fixed patterns
pub const GUTMANN_RANDOM_STEPS: usize = 4;

/// The 35 Gutmann steps. `None` is a random pass; fixed passes are
/// 3-byte patterns tiled across the buffer.
pub(crate) const GUTMANN_PATTERNS: [(Option<[u8; 3]>, &str); GUTMANN_STEPS] = [
    // First 4 passes: Cryptographically secure random data
    (None, "Random Pass 1"),
    (None, "Random Pass 2"),
    (None, "Random Pass 3"),
    (None, "Random Pass 4"),
    // Passes 5-31: Specific patterns for different encoding schemes
    (Some([0x55, 0x55, 0x55]), "0x55 - MFM/RLL encoding"),
    (Some([0xAA, 0xAA, 0xAA]), "0xAA - MFM/RLL encoding"),
    (Some([0x92, 0x49, 0x24]), "0x92 0x49 0x24 - MFM specific"),
    (Some([0x49, 0x24, 0x92]), "0x49 0x24 0x92 - MFM specific"),
    (Some([0x24, 0x92, 0x49]), "0x24 0x92 0x49 - MFM specific"),
    (Some([0x00, 0x00, 0x00]), "0x00 - All zeros"),
    (Some([0x11, 0x11, 0x11]), "0x11 - Pattern"),
    (Some([0x22, 0x22, 0x22]), "0x22 - Pattern"),
    (Some([0x33, 0x33, 0x33]), "0x33 - Pattern"),
    (Some([0x44, 0x44, 0x44]), "0x44 - Pattern"),
    (Some([0x55, 0x55, 0x55]), "0x55 - Pattern"),
    (Some([0x66, 0x66, 0x66]), "0x66 - Pattern"),
    (Some([0x77, 0x77, 0x77]), "0x77 - Pattern"),
    (Some([0x88, 0x88, 0x88]), "0x88 - Pattern"),
    (Some([0x99, 0x99, 0x99]), "0x99 - Pattern"),
    (Some([0xAA, 0xAA, 0xAA]), "0xAA - Pattern"),
    (Some([0xBB, 0xBB, 0xBB]), "0xBB - Pattern"),
    (Some([0xCC, 0xCC, 0xCC]), "0xCC - Pattern"),
    (Some([0xDD, 0xDD, 0xDD]), "0xDD - Pattern"),
    (Some([0xEE, 0xEE, 0xEE]), "0xEE - Pattern"),
    (Some([0xFF, 0xFF, 0xFF]), "0xFF - All ones"),
    (Some([0x92, 0x49, 0x24]), "RLL (2,7) pattern 1"),
    (Some([0x49, 0x24, 0x92]), "RLL (2,7) pattern 2"),
    (Some([0x24, 0x92, 0x49]), "RLL (2,7) pattern 3"),
    (Some([0x6D, 0xB6, 0xDB]), "RLL (2,7) pattern 4"),
    (Some([0xB6, 0xDB, 0x6D]), "RLL (2,7) pattern 5"),
    (Some([0xDB, 0x6D, 0xB6]), "RLL (2,7) pattern 6"),
    // Last 4 passes: Cryptographically secure random data
    (None, "Random Pass 32"),
    (None, "Random Pass 33"),
    (None, "Random Pass 34"),
    (None, "Random Pass 35"),
];

/// Stateful Gutmann generator.
///
/// Each buffer request advances `execution_index` by one step. The stream is
/// rewound after every step except the last, so all 35 steps hit the same
/// block before the writer moves on.
#[derive(Debug, Clone, Default)]
pub struct GutmannSequence {
    execution_index: usize,
    rng: NonZeroSecureBytes,
}

impl GutmannSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step that the next buffer request will produce
    pub fn execution_index(&self) -> usize {
        self.execution_index
    }

    /// Description of the step that the next buffer request will produce
    pub fn current_step(&self) -> &'static str {
        GUTMANN_PATTERNS[self.execution_index].1
    }

    /// True while the current block still has steps left
    pub fn mid_sequence(&self) -> bool {
        self.execution_index != 0
    }

    /// Buffer for the current step, length rounded up to a multiple of 3
    pub fn next_buffer(&mut self, count: usize) -> WipeResult<Vec<u8>> {
        let len = count.div_ceil(3) * 3;
        let mut buf = vec![0u8; len];

        match GUTMANN_PATTERNS[self.execution_index].0 {
            Some(pattern) => {
                for chunk in buf.chunks_exact_mut(3) {
                    chunk.copy_from_slice(&pattern);
                }
            }
            None => self.rng.fill(&mut buf)?,
        }

        self.execution_index = (self.execution_index + 1) % GUTMANN_STEPS;
        Ok(buf)
    }
}
