//! Symbolic machine state and control flow graph model for exploring EVM
//! bytecode path by path.
//!
//! An exploration driver decodes instructions and feeds them to the active
//! [`BasicBlock`](cfg::BasicBlock), mutating its stack, memory and storage.
//! At a conditional jump it records the branch condition, forks the block
//! into two independent copies with strengthened path conditions and
//! registers both as successors in the [`CfgManager`](cfg::CfgManager).

#[macro_use]
pub mod util;

pub mod cfg;
pub mod solver;
pub mod state;
pub mod term;

pub use primitive_types::U256;
