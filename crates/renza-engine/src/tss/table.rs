//! Lockless shared transposition table for the threat-space search.
//!
//! Buckets are 4-way associative; each slot is a single `AtomicU64`, so
//! entries can never tear. Replacement prefers empty slots, then stale
//! generations, then shallower entries. All accesses use `Relaxed`
//! ordering: a stale or lost entry only costs re-search, never
//! correctness, because the stored key prefix is checked on probe.
//!
//! ## Bit layout
//!
//! ```text
//! bits 63-32: key        (upper 32 bits of the Zobrist hash)
//! bits 31-16: score      (Score::to_bits)
//! bits 15-8:  depth      (remaining search budget the entry covers)
//! bits  7-3:  generation (5 bits, wraps at 32)
//! bit      0: occupied
//! ```

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use renza_core::Score;

/// Smallest accepted table size; callers clamp and report.
pub const MIN_HASH_MB: usize = 8;

const WAYS: usize = 4;

struct Slot(AtomicU64);

impl Slot {
    const fn empty() -> Slot {
        Slot(AtomicU64::new(0))
    }

    fn pack(key32: u32, score: Score, depth: u8, generation: u8) -> u64 {
        ((key32 as u64) << 32)
            | ((score.to_bits() as u64) << 16)
            | ((depth as u64) << 8)
            | (((generation & 0x1F) as u64) << 3)
            | 1
    }

    fn unpack(word: u64) -> (u32, Score, u8, u8, bool) {
        (
            (word >> 32) as u32,
            Score::from_bits(((word >> 16) & 0xFFFF) as u16),
            ((word >> 8) & 0xFF) as u8,
            ((word >> 3) & 0x1F) as u8,
            word & 1 != 0,
        )
    }
}

/// Shared, lockless, 4-way associative score cache.
///
/// All receivers are `&self`; the table may be shared by several
/// searcher threads.
pub struct SharedHashTable {
    slots: Box<[Slot]>,
    /// Bucket index mask (`bucket_count - 1`, power of two).
    mask: u64,
    generation: AtomicU8,
}

impl SharedHashTable {
    /// Build a table of roughly `mb` megabytes, clamped to the
    /// supported minimum.
    pub fn new(mb: usize) -> SharedHashTable {
        let mb = mb.max(MIN_HASH_MB);
        let bytes = mb * 1024 * 1024;
        let bucket_bytes = WAYS * std::mem::size_of::<Slot>();
        let buckets = (bytes / bucket_bytes).next_power_of_two() >> 1;
        let buckets = buckets.max(1);
        let slots: Box<[Slot]> = (0..buckets * WAYS).map(|_| Slot::empty()).collect();
        SharedHashTable { slots, mask: (buckets - 1) as u64, generation: AtomicU8::new(0) }
    }

    /// Number of slots, for diagnostics.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn clear(&self) {
        for slot in self.slots.iter() {
            slot.0.store(0, Ordering::Relaxed);
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    /// Advance the age counter; call once per root search.
    pub fn new_generation(&self) {
        let current = self.generation.load(Ordering::Relaxed);
        self.generation.store(current.wrapping_add(1) & 0x1F, Ordering::Relaxed);
    }

    #[inline]
    fn bucket(&self, hash: u64) -> usize {
        (hash & self.mask) as usize * WAYS
    }

    /// Look up `hash`. Proven scores are always usable; an unproven
    /// entry is returned only when its stored depth covers
    /// `min_depth`, the budget the caller still has to spend.
    pub fn probe(&self, hash: u64, min_depth: u8) -> Option<Score> {
        let key32 = (hash >> 32) as u32;
        let base = self.bucket(hash);
        for slot in &self.slots[base..base + WAYS] {
            let word = slot.0.load(Ordering::Relaxed);
            let (key, score, depth, _, occupied) = Slot::unpack(word);
            if !occupied || key != key32 {
                continue;
            }
            if score.is_proven() || depth >= min_depth {
                return Some(score);
            }
        }
        None
    }

    /// Store a result for `hash` with the depth budget it covers.
    pub fn store(&self, hash: u64, score: Score, depth: u8) {
        let key32 = (hash >> 32) as u32;
        let generation = self.generation.load(Ordering::Relaxed);
        let base = self.bucket(hash);

        // same key: overwrite in place
        let mut victim = base;
        let mut victim_rank = u32::MAX;
        for (i, slot) in self.slots[base..base + WAYS].iter().enumerate() {
            let word = slot.0.load(Ordering::Relaxed);
            let (key, _, slot_depth, slot_generation, occupied) = Slot::unpack(word);
            if occupied && key == key32 {
                victim = base + i;
                break;
            }
            // rank: empty beats stale generation beats shallow depth
            let rank = if !occupied {
                0
            } else if slot_generation != generation {
                1 + slot_depth as u32
            } else {
                300 + slot_depth as u32
            };
            if rank < victim_rank {
                victim_rank = rank;
                victim = base + i;
            }
        }
        self.slots[victim].0.store(Slot::pack(key32, score, depth, generation), Ordering::Relaxed);
    }
}

impl std::fmt::Debug for SharedHashTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedHashTable")
            .field("slots", &self.slots.len())
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish()
    }
}
