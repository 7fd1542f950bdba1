//! Symbol table: djb2 hash-chained buckets over an arena of entries.
//!
//! Entries never move once inserted — buckets hold `usize` indices into the
//! arena, not owned records or pointers, so a rehash only rebuilds the
//! bucket lists. The arena's insertion order doubles as the "touched order"
//! list the grammar driver replays deferred instructions in, since every
//! symbol is inserted (as `Undefined`) the first time it is referenced or
//! defined.

use crate::error::Span;
use crate::segment::Segment;

const INITIAL_BUCKETS: usize = 32;
const LOAD_FACTOR: f32 = 0.70;

fn djb2(key: &str) -> u64 {
    let mut hash: u64 = 5381;
    for byte in key.bytes() {
        hash = hash.wrapping_shl(5).wrapping_add(hash).wrapping_add(byte as u64);
    }
    hash
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolStatus {
    Undefined,
    Defined,
}

/// A single instruction that referenced a symbol before it was defined.
/// Replayed (and removed from the owning entry's list) once the symbol
/// resolves.
#[derive(Debug, Clone)]
pub struct PendingInstruction {
    pub segment: Segment,
    /// Byte offset within `segment`'s image where the encoded word(s) start.
    pub patch_offset: u32,
    /// Address of the instruction itself, needed for PC-relative branch
    /// offset arithmetic.
    pub instruction_address: u32,
    pub op: crate::opcode::Op,
    /// The operand list as parsed, including the unresolved `Operand::Label`
    /// that caused deferral — replayed through the encoder once that label
    /// resolves.
    pub operands: Vec<crate::operand::Operand>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub name: String,
    pub status: SymbolStatus,
    pub offset: u32,
    pub segment: Segment,
    pub datasize: u32,
    pub definition_span: Option<Span>,
    pub pending: Vec<PendingInstruction>,
}

impl SymbolEntry {
    fn new(name: String) -> Self {
        Self {
            name,
            status: SymbolStatus::Undefined,
            offset: 0,
            segment: Segment::UserText,
            datasize: 0,
            definition_span: None,
            pending: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    arena: Vec<SymbolEntry>,
    buckets: Vec<Vec<usize>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            arena: Vec::new(),
            buckets: vec![Vec::new(); INITIAL_BUCKETS],
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    fn bucket_index(&self, key: &str) -> usize {
        (djb2(key) % self.buckets.len() as u64) as usize
    }

    pub fn get(&self, key: &str) -> Option<&SymbolEntry> {
        self.find_index(key).map(|idx| &self.arena[idx])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut SymbolEntry> {
        self.find_index(key).map(move |idx| &mut self.arena[idx])
    }

    fn find_index(&self, key: &str) -> Option<usize> {
        let bucket = &self.buckets[self.bucket_index(key)];
        bucket.iter().copied().find(|&idx| self.arena[idx].name == key)
    }

    /// Entries in insertion (touched) order, oldest first.
    pub fn entries_in_touched_order(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.arena.iter()
    }

    /// Insert `key` as `Undefined` if absent, then return its index.
    /// Mirrors the reference table's `insert_symbol_table`: a lookup that
    /// also reserves an undefined slot on first touch.
    pub fn touch(&mut self, key: &str) -> usize {
        if let Some(idx) = self.find_index(key) {
            return idx;
        }
        let idx = self.arena.len();
        self.arena.push(SymbolEntry::new(key.to_string()));
        let bucket_idx = self.bucket_index(key);
        self.buckets[bucket_idx].push(idx);
        self.maybe_rehash();
        idx
    }

    fn maybe_rehash(&mut self) {
        if self.arena.len() as f32 / self.buckets.len() as f32 >= LOAD_FACTOR {
            let new_len = self.buckets.len() * 2;
            let mut new_buckets = vec![Vec::new(); new_len];
            for (idx, entry) in self.arena.iter().enumerate() {
                let bucket_idx = (djb2(&entry.name) % new_len as u64) as usize;
                new_buckets[bucket_idx].push(idx);
            }
            self.buckets = new_buckets;
        }
    }

    pub fn entry_at(&self, idx: usize) -> &SymbolEntry {
        &self.arena[idx]
    }

    pub fn entry_at_mut(&mut self, idx: usize) -> &mut SymbolEntry {
        &mut self.arena[idx]
    }
}
