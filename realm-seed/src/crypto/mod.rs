//! Digest computation and the canonical hex form realms store. Digesting and
//! formatting are kept apart so precomputed digests go through the formatter
//! without ever touching the hasher.

pub mod digest;
pub mod hex;
