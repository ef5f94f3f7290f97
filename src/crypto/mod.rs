pub mod secure_rng;


pub use secure_rng::NonZeroSecureBytes;

#[cfg(test)]
pub(crate) use secure_rng::calculate_entropy;
