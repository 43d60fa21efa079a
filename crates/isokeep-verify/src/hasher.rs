use md5::Md5;
use sha1::Sha1;
use sha2::digest::Digest;
use sha2::{Sha256, Sha512};

use crate::ChecksumAlgo;

/// Incremental digest over streamed bytes.
pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self: Box<Self>) -> Vec<u8>;
}

macro_rules! impl_hasher {
    ($name:ident, $inner:ty) => {
        pub struct $name($inner);

        impl $name {
            pub fn new() -> Self {
                Self(<$inner>::new())
            }

            pub fn digest(data: &[u8]) -> Vec<u8> {
                <$inner>::digest(data).to_vec()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Hasher for $name {
            fn update(&mut self, data: &[u8]) {
                self.0.update(data);
            }

            fn finalize(self: Box<Self>) -> Vec<u8> {
                self.0.finalize().to_vec()
            }
        }
    };
}

impl_hasher!(Md5Hasher, Md5);
impl_hasher!(Sha1Hasher, Sha1);
impl_hasher!(Sha256Hasher, Sha256);
impl_hasher!(Sha512Hasher, Sha512);

pub fn make_hasher(algo: ChecksumAlgo) -> Box<dyn Hasher> {
    match algo {
        ChecksumAlgo::Md5 => Box::new(Md5Hasher::new()),
        ChecksumAlgo::Sha1 => Box::new(Sha1Hasher::new()),
        ChecksumAlgo::Sha256 => Box::new(Sha256Hasher::new()),
        ChecksumAlgo::Sha512 => Box::new(Sha512Hasher::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_known_vector() {
        let digest = Sha256Hasher::digest(b"hello world");
        assert_eq!(
            hex::encode(digest),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn incremental_equals_oneshot() {
        let mut h = Box::new(Sha256Hasher::new());
        h.update(b"hello ");
        h.update(b"world");
        assert_eq!(h.finalize(), Sha256Hasher::digest(b"hello world"));
    }

    #[test]
    fn md5_matches_known_vector() {
        assert_eq!(
            hex::encode(Md5Hasher::digest(b"abc")),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }
}
