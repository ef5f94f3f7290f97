use crate::crypto::secure_rng::NonZeroSecureBytes;
use crate::WipeResult;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

/// Characters allowed in generated file names and random-string passes
pub const FILENAME_SAFE: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of one random-string token: 8 characters, a dot and a 3 character extension
pub const TOKEN_LEN: usize = 12;

/// Draw `len` filename-safe characters
pub fn random_safe_name<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| FILENAME_SAFE[rng.gen_range(0..FILENAME_SAFE.len())] as char)
        .collect()
}

/// One filename-like token, e.g. `k3v9xq0a.p2m`
pub fn random_token<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut token = random_safe_name(rng, 8);
    token.push('.');
    token.push_str(&random_safe_name(rng, 3));
    token
}

/// Pseudo-random pattern seeded from the low bits of the wall clock
#[derive(Debug, Clone)]
pub struct SimpleRandom {
    rng: StdRng,
}

impl Default for SimpleRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleRandom {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos() as u64 ^ d.as_secs())
            .unwrap_or(0);
        Self::with_seed(seed & 0xFFFF_FFFF)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_buffer(&mut self, count: usize) -> Vec<u8> {
        let mut buf = vec![0u8; count];
        self.rng.fill_bytes(&mut buf);
        buf
    }
}

/// Cryptographically strong pattern, non-zero bytes only
#[derive(Debug, Clone, Default)]
pub struct SecureRandom {
    source: NonZeroSecureBytes,
}

impl SecureRandom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_buffer(&mut self, count: usize) -> WipeResult<Vec<u8>> {
        let mut buf = vec![0u8; count];
        self.source.fill(&mut buf)?;
        Ok(buf)
    }
}

/// Concatenated random filename tokens, ASCII, cut to the exact length
#[derive(Debug, Clone)]
pub struct RandomString {
    rng: StdRng,
}

impl Default for RandomString {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomString {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn next_buffer(&mut self, count: usize) -> Vec<u8> {
        let mut text = String::with_capacity(count + TOKEN_LEN);
        while text.len() < count {
            text.push_str(&random_token(&mut self.rng));
        }
        let mut bytes = text.into_bytes();
        bytes.truncate(count);
        bytes
    }
}
