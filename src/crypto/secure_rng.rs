use crate::{WipeError, WipeResult};
use ring::rand::{SecureRandom, SystemRandom};

/// Trait for entropy sources
pub(crate) trait EntropySource: Send + Sync {
    /// Fill buffer with random bytes
    fn fill_bytes(&self, dest: &mut [u8]) -> WipeResult<()>;
    /// Get source name for logging
    fn name(&self) -> &str;
}

/// Ring-based system random (uses OS facilities)
pub(crate) struct RingSystemRNG {
    rng: SystemRandom,
}

impl Default for RingSystemRNG {
    fn default() -> Self {
        Self::new()
    }
}

impl RingSystemRNG {
    pub(crate) fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl Clone for RingSystemRNG {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl EntropySource for RingSystemRNG {
    fn fill_bytes(&self, dest: &mut [u8]) -> WipeResult<()> {
        self.rng
            .fill(dest)
            .map_err(|_| WipeError::Entropy("Ring SystemRandom failed".to_string()))
    }

    fn name(&self) -> &str {
        "RingSystemRNG"
    }
}

/// Cryptographically strong byte source producing only non-zero bytes.
///
/// Zero bytes are rejected and redrawn, so the output is uniform over
/// `1..=255`.
#[derive(Clone, Default)]
pub struct NonZeroSecureBytes {
    source: RingSystemRNG,
}

impl std::fmt::Debug for NonZeroSecureBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonZeroSecureBytes")
            .field("source", &self.source.name())
            .finish()
    }
}

impl NonZeroSecureBytes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill `dest` with random bytes, none of which is zero
    pub fn fill(&self, dest: &mut [u8]) -> WipeResult<()> {
        self.source.fill_bytes(dest)?;

        let mut spare = [0u8; 64];
        let mut spare_pos = spare.len();
        for byte in dest.iter_mut() {
            while *byte == 0 {
                if spare_pos == spare.len() {
                    self.source.fill_bytes(&mut spare)?;
                    spare_pos = 0;
                }
                *byte = spare[spare_pos];
                spare_pos += 1;
            }
        }

        Ok(())
    }
}

/// Fill `dest` from the OS cryptographic generator
#[cfg(test)]
pub(crate) fn secure_random_bytes(dest: &mut [u8]) -> WipeResult<()> {
    RingSystemRNG::new().fill_bytes(dest)
}

/// Calculate Shannon entropy of data in bits per byte
#[cfg(test)]
pub(crate) fn calculate_entropy(data: &[u8]) -> f64 {
    let mut counts = [0u64; 256];
    for &byte in data {
        counts[byte as usize] += 1;
    }

    let length = data.len() as f64;
    let mut entropy = 0.0;

    for &count in &counts {
        if count > 0 {
            let probability = count as f64 / length;
            entropy -= probability * probability.log2();
        }
    }

    entropy
}
