//! The key sequence and its traversal engine.
//!
//! A sequence walks a complete binary tree in order, representing its
//! position as a stack of right-sibling subtree roots. Advancing consumes
//! the top of the stack; seeking descends straight towards the target leaf,
//! stashing every right sibling passed on the way down so later advances
//! visit them.

use crate::common::{prf, HashAlg, Node, LABEL_KEY, LABEL_LEFT, LABEL_RIGHT, LABEL_SEED};
use crate::errors::Error;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

/// A sequence of forward-secure keys.
///
/// The state held here allows deriving the current key and every later one,
/// but none of the earlier ones. All key material is owned by the sequence
/// and zeroized as positions are consumed.
#[derive(Debug, Clone)]
pub struct Seq {
    nodes: Vec<Node>,
    size: usize,
    alg: HashAlg,
}

impl Seq {
    /// Create a new `Seq` with the given hash algorithm, seed, and maximum
    /// number of keys.
    ///
    /// The keyspace holds exactly `2^h - 1` positions, where
    /// `h = ⌈log₂(max_keys + 1)⌉`.
    ///
    /// # Errors
    /// The function fails with [`Error::KeyspaceExhausted`] when `max_keys`
    /// is zero: such a sequence would be exhausted before its first key.
    pub fn new(alg: HashAlg, seed: &[u8], max_keys: u64) -> Result<Self, Error> {
        if max_keys == 0 {
            return Err(Error::KeyspaceExhausted);
        }
        let size = alg.output_len();
        let h = 64 - max_keys.leading_zeros();
        let root = prf(alg, size, LABEL_SEED, seed);
        Ok(Seq {
            nodes: vec![Node::new(root, h)],
            size,
            alg,
        })
    }

    /// Create a new `Seq` from a seed sampled with the given random number
    /// generator. The local copy of the seed is overwritten with zeroes
    /// before the function returns.
    ///
    /// # Errors
    /// See [`Seq::new`].
    pub fn generate<T: RngCore + CryptoRng>(
        alg: HashAlg,
        mut rng: T,
        max_keys: u64,
    ) -> Result<Self, Error> {
        let mut seed = Zeroizing::new([0u8; 32]);
        rng.fill_bytes(seed.as_mut());
        Self::new(alg, seed.as_ref(), max_keys)
    }

    /// Return the current key of the given size.
    ///
    /// The key is derived from the top of the node stack; the node key
    /// itself is never handed out. `size` may differ from the hash output
    /// length, up to the HKDF-Expand limit of 255 times that length.
    ///
    /// # Panics
    /// Function panics when the sequence is exhausted, or when `size` is
    /// over the HKDF-Expand limit.
    pub fn key(&self, size: usize) -> Vec<u8> {
        let top = self.nodes.last().expect("keyspace exhausted");
        prf(self.alg, size, LABEL_KEY, &top.k)
    }

    /// Advance the current key to the next in the sequence.
    ///
    /// (In the literature, this operation is called Evolve.)
    ///
    /// # Errors
    /// The function fails with [`Error::KeyspaceExhausted`] once the last
    /// position has been consumed.
    pub fn next(&mut self) -> Result<(), Error> {
        let node = self.nodes.pop().ok_or(Error::KeyspaceExhausted)?;
        if node.h > 1 {
            let right = prf(self.alg, self.size, LABEL_RIGHT, &node.k);
            let left = prf(self.alg, self.size, LABEL_LEFT, &node.k);
            self.nodes.push(Node::new(right, node.h - 1));
            self.nodes.push(Node::new(left, node.h - 1));
        }
        Ok(())
    }

    /// Move to the `n`-th key ahead without deriving the intermediate keys.
    /// Equivalent to, but much faster than, `n` invocations of
    /// [`Seq::next`].
    ///
    /// This lands on the expected position only on a freshly created
    /// sequence. On a sequence that has already been advanced, use
    /// [`Seq::superseek`], which handles both cases.
    ///
    /// # Errors
    /// The function fails with [`Error::KeyspaceExhausted`] when `n` points
    /// past the last position. The state must not be used afterwards.
    pub fn seek(&mut self, n: u64) -> Result<(), Error> {
        let node = self.nodes.pop().ok_or(Error::KeyspaceExhausted)?;
        self.descend(node, n)
    }

    /// Move `n` keys ahead from any state, advanced or fresh.
    ///
    /// Repeated calls add up: any partition of `n` into consecutive
    /// `superseek` calls lands on the same key as a single [`Seq::seek`] of
    /// `n` on a fresh sequence.
    ///
    /// # Errors
    /// The function fails with [`Error::KeyspaceExhausted`] when fewer than
    /// `n + 1` positions remain. The state must not be used afterwards.
    pub fn superseek(&mut self, n: u64) -> Result<(), Error> {
        let mut node = self.nodes.pop().ok_or(Error::KeyspaceExhausted)?;

        // Skip whole subtrees while the jump consumes all of their
        // positions. A jump of exactly 2^h - 1 pops as well; when the
        // remainder hits zero right after a pop, the descent below pushes
        // the freshly popped node back untouched.
        let mut delta = u128::from(n);
        while delta >= (1u128 << node.h) - 1 {
            delta -= (1u128 << node.h) - 1;
            node = self.nodes.pop().ok_or(Error::KeyspaceExhausted)?;
        }

        self.descend(node, delta as u64)
    }

    /// Number of keys still reachable, the current one included. Zero once
    /// the sequence is exhausted.
    pub fn remaining(&self) -> u64 {
        self.nodes
            .iter()
            .map(|node| (1u128 << node.h) - 1)
            .sum::<u128>() as u64
    }

    /// Whether every position of the keyspace has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The PRF output length in bytes. Immutable after construction.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The hash primitive this sequence derives keys with.
    pub fn alg(&self) -> HashAlg {
        self.alg
    }

    pub(crate) fn from_parts(nodes: Vec<Node>, size: usize, alg: HashAlg) -> Self {
        Seq { nodes, size, alg }
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    // In-order descent towards the leaf `n` positions ahead of the root of
    // `node`'s subtree. Descending left visits the current root and stashes
    // the right sibling; descending right skips the whole left subtree.
    fn descend(&mut self, mut node: Node, mut n: u64) -> Result<(), Error> {
        while n > 0 {
            if node.h <= 1 {
                return Err(Error::KeyspaceExhausted);
            }
            let h = node.h - 1;
            let pow = 1u128 << h;
            if u128::from(n) < pow {
                let right = prf(self.alg, self.size, LABEL_RIGHT, &node.k);
                self.nodes.push(Node::new(right, h));
                node = Node::new(prf(self.alg, self.size, LABEL_LEFT, &node.k), h);
                n -= 1;
            } else {
                node = Node::new(prf(self.alg, self.size, LABEL_RIGHT, &node.k), h);
                n -= pow as u64;
            }
        }
        self.nodes.push(node);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // Key at position 10000 of the all-zero-seed SHA-256 sequence; shared
    // with tests/interoperability.rs.
    const KEY_AT_10000: [u8; 32] = [
        0x46, 0x36, 0x7f, 0x8f, 0x2b, 0x62, 0xc8, 0x4d, 0x8d, 0x40, 0xb5, 0x36, 0x7b, 0xac, 0x77,
        0xc8, 0xae, 0xb2, 0xde, 0x72, 0x7e, 0x50, 0xb5, 0x1a, 0x9e, 0xae, 0x22, 0xa3, 0xe0, 0x21,
        0xb4, 0x6f,
    ];

    fn zero_seq() -> Seq {
        Seq::new(HashAlg::Sha256, &[0u8; 32], 1 << 32).unwrap()
    }

    #[test]
    fn next_is_deterministic() {
        let mut seq = zero_seq();
        for _ in 0..10000 {
            seq.next().unwrap();
        }
        assert_eq!(seq.key(32)[..], KEY_AT_10000[..]);
    }

    #[test]
    fn seek_is_deterministic() {
        let mut seq = zero_seq();
        seq.seek(10000).unwrap();
        assert_eq!(seq.key(32)[..], KEY_AT_10000[..]);
    }

    #[test]
    fn seek_matches_next_on_small_offsets() {
        for n in 0..64u64 {
            let mut sought = zero_seq();
            sought.seek(n).unwrap();

            let mut stepped = zero_seq();
            for _ in 0..n {
                stepped.next().unwrap();
            }

            assert_eq!(sought.key(32), stepped.key(32), "offset {}", n);
            assert_eq!(sought.key(16), stepped.key(16), "offset {}", n);
        }
    }

    #[test]
    fn seek_too_far() {
        let mut seq = zero_seq();
        assert_eq!(seq.seek(1 << 33), Err(Error::KeyspaceExhausted));
    }

    #[test]
    fn superseek_splits() {
        let mut whole = zero_seq();
        whole.seek(10000).unwrap();

        let mut halves = zero_seq();
        halves.superseek(5000).unwrap();
        halves.superseek(5000).unwrap();

        let mut tenths = zero_seq();
        for _ in 0..10 {
            tenths.superseek(1000).unwrap();
        }

        assert_eq!(whole.key(32), halves.key(32));
        assert_eq!(whole.key(32), tenths.key(32));
    }

    #[quickcheck]
    fn superseek_adds_up(parts: Vec<u16>) -> bool {
        let mut split = zero_seq();
        let mut total = 0u64;
        for &part in &parts {
            total += u64::from(part);
            split.superseek(u64::from(part)).unwrap();
        }

        let mut whole = zero_seq();
        whole.seek(total).unwrap();
        whole.key(32) == split.key(32)
    }

    #[test]
    fn superseek_one_is_next() {
        let mut stepped = zero_seq();
        stepped.next().unwrap();

        let mut sought = zero_seq();
        sought.superseek(1).unwrap();

        assert_eq!(stepped.key(32), sought.key(32));
    }

    #[test]
    fn superseek_zero_is_a_noop() {
        let mut seq = zero_seq();
        seq.superseek(123).unwrap();
        let before = seq.key(32);
        for _ in 0..3 {
            seq.superseek(0).unwrap();
        }
        assert_eq!(before, seq.key(32));
    }

    #[test]
    fn superseek_crossing_a_subtree_boundary_exactly() {
        // After superseek(1) the top of the stack covers exactly 2^32 - 1
        // positions; the second jump consumes all of them and lands on the
        // first leaf of the stashed right sibling.
        let mut split = zero_seq();
        split.superseek(1).unwrap();
        split.superseek((1 << 32) - 1).unwrap();

        let mut whole = zero_seq();
        whole.seek(1 << 32).unwrap();

        assert_eq!(split.key(32), whole.key(32));
    }

    #[test]
    fn seek_to_last_position() {
        // max_keys = 15 gives a height-4 tree holding positions 0..=14.
        let mut seq = Seq::new(HashAlg::Sha256, &[7u8; 32], 15).unwrap();
        seq.seek(14).unwrap();
        assert_eq!(seq.remaining(), 1);
        assert_eq!(seq.key(32).len(), 32);

        assert_eq!(seq.next(), Ok(()));
        assert!(seq.is_exhausted());
        assert_eq!(seq.next(), Err(Error::KeyspaceExhausted));
    }

    #[test]
    fn superseek_to_last_position_and_past_it() {
        let mut direct = Seq::new(HashAlg::Sha256, &[7u8; 32], 15).unwrap();
        direct.superseek(14).unwrap();

        let mut split = Seq::new(HashAlg::Sha256, &[7u8; 32], 15).unwrap();
        split.superseek(7).unwrap();
        split.superseek(7).unwrap();
        assert_eq!(direct.key(32), split.key(32));

        let mut over = Seq::new(HashAlg::Sha256, &[7u8; 32], 15).unwrap();
        assert_eq!(over.superseek(15), Err(Error::KeyspaceExhausted));

        assert_eq!(split.superseek(1), Err(Error::KeyspaceExhausted));
    }

    #[test]
    fn next_walks_the_whole_keyspace() {
        let mut seq = Seq::new(HashAlg::Sha256, b"exhaustion", 7).unwrap();
        let mut keys = Vec::new();
        for _ in 0..7 {
            keys.push(seq.key(32));
            seq.next().unwrap();
        }
        assert!(seq.is_exhausted());
        assert_eq!(seq.remaining(), 0);
        assert_eq!(seq.next(), Err(Error::KeyspaceExhausted));

        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 7);
    }

    #[quickcheck]
    fn remaining_counts_down(n: u32) -> bool {
        let total = (1u64 << 33) - 1;
        let mut seq = zero_seq();
        seq.seek(u64::from(n)).unwrap();
        seq.remaining() == total - u64::from(n)
    }

    #[test]
    fn key_size_is_caller_chosen() {
        let seq = zero_seq();
        assert!(seq.key(0).is_empty());
        assert_eq!(seq.key(16).len(), 16);
        assert_eq!(seq.key(64).len(), 64);

        // HKDF-Expand outputs are prefix-stable for a fixed label.
        assert_eq!(seq.key(16)[..], seq.key(32)[..16]);
    }

    #[test]
    fn key_does_not_mutate() {
        let mut seq = zero_seq();
        seq.seek(42).unwrap();
        let first = seq.key(32);
        let second = seq.key(32);
        assert_eq!(first, second);
        assert_eq!(seq.remaining(), (1 << 33) - 1 - 42);
    }

    #[test]
    fn zero_keys_is_rejected() {
        assert_eq!(
            Seq::new(HashAlg::Sha256, &[0u8; 32], 0).err(),
            Some(Error::KeyspaceExhausted)
        );
    }

    #[test]
    fn generate_uses_fresh_seeds() {
        let a = Seq::generate(HashAlg::Sha256, rand::rngs::OsRng, 1 << 16).unwrap();
        let b = Seq::generate(HashAlg::Sha256, rand::rngs::OsRng, 1 << 16).unwrap();
        assert_ne!(a.key(32), b.key(32));
    }

    #[test]
    fn sha512_sequences_are_consistent() {
        let mut sought = Seq::new(HashAlg::Sha512, b"agility seed", 1 << 20).unwrap();
        assert_eq!(sought.size(), 64);
        assert_eq!(sought.alg(), HashAlg::Sha512);
        sought.seek(777).unwrap();

        let mut stepped = Seq::new(HashAlg::Sha512, b"agility seed", 1 << 20).unwrap();
        for _ in 0..777 {
            stepped.next().unwrap();
        }
        assert_eq!(sought.key(64), stepped.key(64));
    }
}
