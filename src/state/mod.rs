//! # Per-path symbolic machine state
//!
//! Containers that make up the state of one explored path: the word
//! [`Stack`], the byte addressed [`Memory`], the persistent [`Storage`],
//! and the [`MachineState`] bundling them with a program counter. The
//! [`WorldState`] and [`ExecutionEnvironment`] describe the accounts and
//! call context the path runs in.
//!
//! Unknown prior state (stack underflow, reads beyond the end of memory,
//! unwritten storage slots) is never an error. Each container mints fresh
//! symbolic words for it from its own [`FreshVariables`] counter.

use crate::term::Word;
use bytesize::ByteSize;
use primitive_types::U256;
use strum::{EnumString, EnumVariantNames, IntoStaticStr};
use thiserror::Error;

pub mod environment;
pub mod machine;
pub mod memory;
pub mod stack;
pub mod storage;
pub mod world;

pub use environment::*;
pub use machine::*;
pub use memory::*;
pub use stack::*;
pub use storage::*;
pub use world::*;

pub type BlockId = u64;

pub mod defaults {
    use super::*;

    pub const MAX_MEMORY_SIZE: ByteSize = ByteSize(16 * bytesize::MIB);
    pub const OVERFLOW_POLICY: OverflowPolicy = OverflowPolicy::Lenient;
}

/// What happens when the stack limit is hit or a memory window does not fit
/// below the memory limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, EnumVariantNames, IntoStaticStr)]
#[strum(serialize_all = "kebab_case")]
pub enum OverflowPolicy {
    /// Drop the offending push, keep memory beyond the limit in sparse cells.
    Lenient,
    /// Report the condition as a [`StateError`].
    Strict,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        defaults::OVERFLOW_POLICY
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ModelOptions {
    pub max_memory_size: ByteSize,
    pub overflow_policy: OverflowPolicy,
}

impl ModelOptions {
    pub fn strict() -> Self {
        Self {
            overflow_policy: OverflowPolicy::Strict,
            ..Self::default()
        }
    }

    pub fn is_strict(&self) -> bool {
        self.overflow_policy == OverflowPolicy::Strict
    }
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            max_memory_size: defaults::MAX_MEMORY_SIZE,
            overflow_policy: defaults::OVERFLOW_POLICY,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum StateError {
    #[error("{operation} expects an index in range 1 - 16, got {index}")]
    InvalidArgument {
        operation: &'static str,
        index: usize,
    },

    #[error("memory operations indexed by the symbolic offset {0} are not supported")]
    UnsupportedSymbolicAddress(Word),

    #[error("stack limit of {0} words reached")]
    StackOverflow(usize),

    #[error("memory window at offset {offset:#x} does not fit below the limit of {limit}")]
    OffsetOutOfRange { offset: U256, limit: ByteSize },
}

/// Mints symbolic words named `<prefix><block>-<n>`. Every container owns
/// its own counter; a duplicate continues counting under the new block id,
/// so forked paths never produce the same name.
#[derive(Clone, Debug)]
pub struct FreshVariables {
    prefix: &'static str,
    block: BlockId,
    count: u64,
}

impl FreshVariables {
    pub fn new(prefix: &'static str, block: BlockId) -> Self {
        Self {
            prefix,
            block,
            count: 0,
        }
    }

    pub fn next(&mut self) -> Word {
        self.count += 1;

        Word::fresh(format!("{}{}-{}", self.prefix, self.block, self.count))
    }

    pub fn rebased(&self, block: BlockId) -> Self {
        Self {
            prefix: self.prefix,
            block,
            count: self.count,
        }
    }

    pub fn block(&self) -> BlockId {
        self.block
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}
