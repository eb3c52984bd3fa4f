//! A seekable sequential key generator implementation.
//!
//! "Practical Secure Logging: Seekable Sequential Key Generators"
//! By Giorgia Azzurra Marson and Bertram Poettering
//! <https://eprint.iacr.org/2014/479>
//!
//! A sequence produces a deterministic run of pseudorandom keys from a
//! single seed. Holding the state at one position reveals nothing about the
//! keys before it, advancing by one position costs a constant number of PRF
//! calls, and jumping forward by any distance costs logarithmically many.
//! The typical consumer is a tamper-evident log: an auditor seeks straight
//! to the key of the entry of interest instead of hashing through every key
//! before it.
#![warn(missing_docs, rust_2018_idioms)]

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

mod common;
mod errors;
mod seq;
mod serialize;

pub use crate::common::HashAlg;
pub use crate::errors::Error;
pub use crate::seq::Seq;
