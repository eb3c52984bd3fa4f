//! Structures shared by the traversal engine and the serializer: the hash
//! selector, the domain-separation labels, the PRF, and the tree node.
use hkdf::Hkdf;
use sha2::{Sha256, Sha384, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Label used to derive the root node from the caller's seed.
pub(crate) const LABEL_SEED: &[u8] = b"seed";
/// Label used to derive the externally visible key of the current position.
pub(crate) const LABEL_KEY: &[u8] = b"key";
/// Label used to derive the left child during subtree expansion.
pub(crate) const LABEL_LEFT: &[u8] = b"left";
/// Label used to derive the right child during subtree expansion.
pub(crate) const LABEL_RIGHT: &[u8] = b"right";

/// Hash primitive behind the HKDF-based PRF.
///
/// Selected at construction time. The serialized state does not record the
/// selection; decoding restores the default, SHA-256.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlg {
    /// HKDF over SHA-256, 32-byte node keys. The default.
    Sha256,
    /// HKDF over SHA-384, 48-byte node keys.
    Sha384,
    /// HKDF over SHA-512, 64-byte node keys.
    Sha512,
}

impl Default for HashAlg {
    fn default() -> Self {
        HashAlg::Sha256
    }
}

impl HashAlg {
    /// Output length of the hash in bytes, which is also the node key size.
    pub fn output_len(self) -> usize {
        match self {
            HashAlg::Sha256 => 32,
            HashAlg::Sha384 => 48,
            HashAlg::Sha512 => 64,
        }
    }
}

/// One-shot PRF evaluation: HKDF with the empty salt, `seed` as the input
/// key material, and `label` as the info string, reading exactly `size`
/// bytes of output.
///
/// # Panics
/// Function panics when `size` exceeds the HKDF-Expand limit of 255 times
/// the hash output length.
pub(crate) fn prf(alg: HashAlg, size: usize, label: &[u8], seed: &[u8]) -> Vec<u8> {
    let mut okm = vec![0u8; size];
    let expanded = match alg {
        HashAlg::Sha256 => Hkdf::<Sha256>::new(None, seed).expand(label, &mut okm),
        HashAlg::Sha384 => Hkdf::<Sha384>::new(None, seed).expand(label, &mut okm),
        HashAlg::Sha512 => Hkdf::<Sha512>::new(None, seed).expand(label, &mut okm),
    };
    expanded.expect("requested size is over the HKDF-Expand limit");
    okm
}

/// Root of an unexplored right-sibling subtree: the node key, and the height
/// of the subtree the node stands for. Height 1 is a leaf; height `h` covers
/// `2^h - 1` positions.
///
/// The key bytes are overwritten with zeroes when the node is dropped.
#[derive(Debug, Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct Node {
    pub(crate) k: Vec<u8>,
    pub(crate) h: u32,
}

impl Node {
    pub(crate) fn new(k: Vec<u8>, h: u32) -> Self {
        Node { k, h }
    }
}
