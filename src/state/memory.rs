use super::{BlockId, FreshVariables, ModelOptions, StateError};
use crate::term::{Word, WORD_BYTES};
use indexmap::IndexMap;
use log::{trace, warn};
use primitive_types::U256;
use std::fmt;

/// Big-endian, byte addressed memory. Every cell holds an 8-bit term.
///
/// Memory only grows. Cells written by nobody read as zero when they lie
/// below the current end and as (parts of) fresh `memoryVar` words when a
/// load crosses the end.
///
/// Windows that do not fit below the memory limit live in a sparse map of
/// cells instead. They do not count towards `msize`, but round trip like
/// any other cell.
#[derive(Clone, Debug)]
pub struct Memory {
    data: Vec<Word>,
    sparse: IndexMap<U256, Word>,
    fresh: FreshVariables,
    options: ModelOptions,
}

enum Window {
    Dense(usize),
    Sparse(U256),
}

impl Memory {
    pub fn new(block: BlockId) -> Self {
        Self::with_options(block, ModelOptions::default())
    }

    pub fn with_options(block: BlockId, options: ModelOptions) -> Self {
        Self {
            data: Vec::new(),
            sparse: IndexMap::new(),
            fresh: FreshVariables::new("memoryVar", block),
            options,
        }
    }

    pub fn duplicate(&self, new_block: BlockId) -> Self {
        Self {
            data: self.data.clone(),
            sparse: self.sparse.clone(),
            fresh: self.fresh.rebased(new_block),
            options: self.options,
        }
    }

    pub fn mstore(&mut self, offset: &Word, value: &Word) -> Result<(), StateError> {
        match self.resolve_offset(offset, WORD_BYTES)? {
            Window::Dense(offset) => self.store_word(offset, value),
            Window::Sparse(offset) => {
                for i in 0..WORD_BYTES {
                    let cell = sparse_cell(offset, WORD_BYTES - 1 - i);
                    self.sparse.insert(cell, value.extract_byte(i).simplify());
                }

                trace!("mstore [{:#x}] := {} (beyond the limit)", offset, value);
            }
        }
        Ok(())
    }

    pub fn mstore8(&mut self, offset: &Word, value: &Word) -> Result<(), StateError> {
        let byte = value.extract_byte(0).simplify();

        match self.resolve_offset(offset, 1)? {
            Window::Dense(offset) => {
                self.extend_to(offset + 1);

                trace!("mstore8 [{:#x}] := {}", offset, byte);

                self.data[offset] = byte;
            }
            Window::Sparse(offset) => {
                trace!("mstore8 [{:#x}] := {} (beyond the limit)", offset, byte);

                self.sparse.insert(offset, byte);
            }
        }
        Ok(())
    }

    pub fn mload(&mut self, offset: &Word) -> Result<Word, StateError> {
        let offset = match self.resolve_offset(offset, WORD_BYTES)? {
            Window::Dense(offset) => offset,
            Window::Sparse(offset) => return Ok(self.load_sparse(offset)),
        };
        let end = offset + WORD_BYTES;

        if end > self.data.len() {
            let unknown = self.fresh.next();
            let missing = end - self.data.len();

            trace!(
                "mload [{:#x}] reads {} bytes beyond the end, generated {}",
                offset,
                missing,
                unknown
            );

            if missing >= WORD_BYTES {
                self.store_word(offset, &unknown);

                return Ok(unknown);
            }

            for i in (0..missing).rev() {
                self.data.push(unknown.extract_byte(i).simplify());
            }
        }

        Ok(Word::concat(self.data[offset..end].to_vec()).simplify())
    }

    pub fn msize(&self) -> usize {
        self.data.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Word> {
        self.data.iter()
    }

    /// Cells beyond the memory limit, in order of their first write.
    pub fn sparse_cells(&self) -> impl Iterator<Item = (&U256, &Word)> {
        self.sparse.iter()
    }

    fn store_word(&mut self, offset: usize, value: &Word) {
        debug_assert_eq!(value.width() as usize, WORD_BYTES * 8);

        self.extend_to(offset + WORD_BYTES);

        for i in 0..WORD_BYTES {
            self.data[offset + WORD_BYTES - 1 - i] = value.extract_byte(i).simplify();
        }

        trace!("mstore [{:#x}] := {}", offset, value);
    }

    // Missing cells take the bytes of one fresh word at their window position.
    fn load_sparse(&mut self, offset: U256) -> Word {
        let complete = (0..WORD_BYTES).all(|j| self.sparse.contains_key(&sparse_cell(offset, j)));

        if !complete {
            let unknown = self.fresh.next();

            trace!(
                "mload [{:#x}] reads unwritten cells beyond the limit, generated {}",
                offset,
                unknown
            );

            for j in 0..WORD_BYTES {
                self.sparse
                    .entry(sparse_cell(offset, j))
                    .or_insert_with(|| unknown.extract_byte(WORD_BYTES - 1 - j).simplify());
            }
        }

        let window = (0..WORD_BYTES)
            .filter_map(|j| self.sparse.get(&sparse_cell(offset, j)).cloned())
            .collect();

        Word::concat(window).simplify()
    }

    fn extend_to(&mut self, len: usize) {
        if self.data.len() < len {
            self.data.resize(len, Word::byte(0));
        }
    }

    fn resolve_offset(&self, offset: &Word, width: usize) -> Result<Window, StateError> {
        let value = offset
            .simplify()
            .as_concrete()
            .ok_or_else(|| StateError::UnsupportedSymbolicAddress(offset.clone()))?;

        let limit = self.options.max_memory_size;

        match value.checked_add(U256::from(width)) {
            Some(end) if end <= U256::from(limit.as_u64()) => {
                Ok(Window::Dense(value.low_u64() as usize))
            }
            _ if self.options.is_strict() => Err(StateError::OffsetOutOfRange {
                offset: value,
                limit,
            }),
            _ => {
                warn!(
                    "memory window at {:#x} exceeds the limit of {}, using sparse cells",
                    value, limit
                );
                Ok(Window::Sparse(value))
            }
        }
    }
}

// Addresses past the end of the 256-bit space wrap around.
fn sparse_cell(offset: U256, index: usize) -> U256 {
    offset.overflowing_add(U256::from(index)).0
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        for (i, byte) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", byte)?;
        }
        write!(f, "]")?;
        for (offset, byte) in self.sparse.iter() {
            write!(f, " [{:#x}]={}", offset, byte)?;
        }
        Ok(())
    }
}
