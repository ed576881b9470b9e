//! # Basic blocks and the control flow graph
//!
//! A [`BasicBlock`] is the unit of forking: it owns everything one path
//! needs, and [`BasicBlock::duplicate`] produces a fully independent copy.
//! The [`CfgManager`] records all blocks of a session and their successor
//! edges. When to fork, when to stop and how to bound loops is left to the
//! exploration driver.

pub mod basic_block;
pub mod manager;

pub use basic_block::*;
pub use manager::*;
