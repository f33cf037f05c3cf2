//! Symbol interning for the cloak runtime.
//!
//! Binding names and method selectors are both [`Symbol`]s: globally
//! interned strings with a hash computed once at interning time. Two symbols
//! are equal exactly when they point at the same interned entry, so namespace
//! lookups and method-cache probes compare a pointer and hash a single `u64`.
//!
//! # Sharding
//!
//! The registry is split into `NUM_SHARDS` independent shards, each with its
//! own `RwLock` over `BUCKETS_PER_SHARD` chains. The low bits of the `FxHash`
//! pick the shard, the next bits pick the bucket. A hit takes one read lock;
//! a miss takes one write lock and leaks the new entry so it lives for the
//! rest of the program.

// Hash bits are masked before use, truncation is intended.
#![allow(clippy::cast_possible_truncation)]

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{OnceLock, PoisonError, RwLock};

use fxhash::FxHasher;

use crate::error::{Error, Result};

/// Number of shards (power of two).
const NUM_SHARDS: usize = 16;

/// Buckets per shard (power of two).
const BUCKETS_PER_SHARD: usize = 64;

const SHARD_MASK: usize = NUM_SHARDS - 1;
const SHARD_BITS: u32 = NUM_SHARDS.trailing_zeros();
const BUCKET_MASK: usize = BUCKETS_PER_SHARD - 1;

/// An interned name. Never deallocated.
struct InternedSymbol {
    name: &'static str,
    hash: u64,
}

struct SymbolShard {
    buckets: RwLock<Vec<Vec<&'static InternedSymbol>>>,
}

struct SymbolRegistry {
    shards: [SymbolShard; NUM_SHARDS],
}

static REGISTRY: OnceLock<SymbolRegistry> = OnceLock::new();

fn registry() -> &'static SymbolRegistry {
    REGISTRY.get_or_init(|| SymbolRegistry {
        shards: std::array::from_fn(|_| SymbolShard {
            buckets: RwLock::new(vec![Vec::new(); BUCKETS_PER_SHARD]),
        }),
    })
}

fn fx_hash(name: &str) -> u64 {
    let mut hasher = FxHasher::default();
    name.hash(&mut hasher);
    hasher.finish()
}

/// A globally interned name.
///
/// # Example
///
/// ```rust
/// use cloak::runtime::Symbol;
///
/// let a = Symbol::intern("counter");
/// let b = Symbol::intern("counter");
///
/// assert_eq!(a, b);
/// assert_eq!(a.name(), "counter");
/// ```
#[derive(Clone, Copy)]
pub struct Symbol {
    ptr: &'static InternedSymbol,
}

/// Method selectors are plain symbols (`"setCloakedValue:"`).
pub type Selector = Symbol;

impl Symbol {
    /// Interns `name`, returning the unique symbol for it.
    ///
    /// Unlike [`FromStr`], this accepts the empty string; it is meant for
    /// names known at compile time.
    #[must_use]
    pub fn intern(name: &str) -> Self {
        let hash = fx_hash(name);
        let shard_idx = (hash as usize) & SHARD_MASK;
        let bucket_idx = ((hash >> SHARD_BITS) as usize) & BUCKET_MASK;
        let shard = &registry().shards[shard_idx];

        {
            let buckets =
                shard.buckets.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(found) = Self::find(&buckets[bucket_idx], name, hash) {
                return Symbol { ptr: found };
            }
        }

        let mut buckets =
            shard.buckets.write().unwrap_or_else(PoisonError::into_inner);

        // Another thread may have interned it between the two locks.
        if let Some(found) = Self::find(&buckets[bucket_idx], name, hash) {
            return Symbol { ptr: found };
        }

        let interned: &'static InternedSymbol =
            Box::leak(Box::new(InternedSymbol {
                name: Box::leak(name.to_owned().into_boxed_str()),
                hash,
            }));
        buckets[bucket_idx].push(interned);

        Symbol { ptr: interned }
    }

    fn find(
        chain: &[&'static InternedSymbol],
        name: &str,
        hash: u64,
    ) -> Option<&'static InternedSymbol> {
        chain
            .iter()
            .copied()
            .find(|entry| entry.hash == hash && entry.name == name)
    }

    /// The interned string.
    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        self.ptr.name
    }

    /// Precomputed `FxHash` of the name.
    #[inline]
    #[must_use]
    pub fn hash_value(self) -> u64 {
        self.ptr.hash
    }

    /// Number of arguments a selector takes (one per `:`).
    ///
    /// ```rust
    /// use cloak::runtime::Selector;
    ///
    /// assert_eq!(Selector::intern("cloakedValue").arity(), 0);
    /// assert_eq!(Selector::intern("setCloakedValue:").arity(), 1);
    /// ```
    #[must_use]
    pub fn arity(self) -> usize {
        self.ptr.name.matches(':').count()
    }
}

impl FromStr for Symbol {
    type Err = Error;

    /// Interns a user-supplied name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] for the empty string.
    fn from_str(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidName);
        }
        Ok(Symbol::intern(name))
    }
}

impl PartialEq for Symbol {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.ptr, other.ptr)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.ptr.hash);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.ptr.name)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ptr.name)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::intern(name)
    }
}
