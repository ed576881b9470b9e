use crate::solver::{Solution, Solver};
use crate::state::{BlockId, MachineState, Memory, ModelOptions, Stack, Storage};
use crate::term::{Conjunction, Word};
use log::{debug, trace};
use std::fmt;

pub type AccountIndex = usize;

/// A run of decoded instructions together with the complete symbolic state
/// needed to resume or fork at its end.
///
/// A block is open while the decoder appends instructions to it. Recording
/// a branch condition turns it into a fork point; forking yields two new
/// open blocks whose path conditions are strengthened with the condition
/// and its negation.
#[derive(Clone, Debug)]
pub struct BasicBlock {
    account: AccountIndex,
    id: BlockId,
    machine_state: MachineState,
    storage: Storage,
    instructions: Vec<(u64, String)>,
    path_condition: Conjunction,
    branch_condition: Option<Word>,
    dfs_stack: Vec<BasicBlock>,
    call_stack: Vec<BasicBlock>,
}

/// Mutable view on the state an instruction operates on.
pub struct StateMut<'a> {
    pub memory: &'a mut Memory,
    pub stack: &'a mut Stack,
    pub storage: &'a mut Storage,
    pub pc: u64,
}

impl BasicBlock {
    pub fn new(account: AccountIndex, id: BlockId) -> Self {
        Self::with_options(account, id, ModelOptions::default())
    }

    pub fn with_options(account: AccountIndex, id: BlockId, options: ModelOptions) -> Self {
        Self {
            account,
            id,
            machine_state: MachineState::new(id, options),
            storage: Storage::new(id),
            instructions: Vec::new(),
            path_condition: Conjunction::new(),
            branch_condition: None,
            dfs_stack: Vec::new(),
            call_stack: Vec::new(),
        }
    }

    /// Deep copy of all owned state. Terms are shared, containers are not,
    /// and fresh words minted by the copy are named after `new_block`.
    pub fn duplicate(&self, new_account: AccountIndex, new_block: BlockId) -> Self {
        trace!("duplicating block {} into block {}", self.id, new_block);

        Self {
            account: new_account,
            id: new_block,
            machine_state: self.machine_state.duplicate(new_block),
            storage: self.storage.duplicate(new_block),
            instructions: self.instructions.clone(),
            path_condition: self.path_condition.clone(),
            branch_condition: self.branch_condition.clone(),
            dfs_stack: self.dfs_stack.clone(),
            call_stack: self.call_stack.clone(),
        }
    }

    /// Splits at the pending branch. The first block continues with the
    /// condition assumed, the second with its negation; neither keeps a
    /// pending branch. `None` if no branch condition was recorded.
    pub fn fork_on_branch(
        &self,
        taken: BlockId,
        fallthrough: BlockId,
    ) -> Option<(BasicBlock, BasicBlock)> {
        let condition = self.branch_condition.as_ref()?;

        let mut taken_block = self.duplicate(self.account, taken);
        taken_block.branch_condition = None;
        taken_block.add_path_constraint(condition);

        let mut fallthrough_block = self.duplicate(self.account, fallthrough);
        fallthrough_block.branch_condition = None;
        fallthrough_block.add_path_constraint(&condition.negate());

        debug!(
            "forked block {} on {} into {} and {}",
            self.id, condition, taken, fallthrough
        );

        Some((taken_block, fallthrough_block))
    }

    pub fn add_instruction(&mut self, size: u64, mnemonic: &str) {
        let pc = self.machine_state.pc();

        trace!("block {}: {:#06x} {}", self.id, pc, mnemonic);

        self.instructions.push((pc, mnemonic.to_owned()));
        self.machine_state.set_pc(pc + size);
    }

    pub fn instructions(&self) -> &[(u64, String)] {
        &self.instructions
    }

    pub fn add_path_constraint(&mut self, constraint: &Word) {
        self.path_condition.add(constraint);
    }

    pub fn path_condition(&self) -> &Word {
        self.path_condition.as_word()
    }

    pub fn set_branch_condition(&mut self, condition: Word) {
        self.branch_condition = Some(condition);
    }

    pub fn branch_condition(&self) -> Option<&Word> {
        self.branch_condition.as_ref()
    }

    pub fn take_branch_condition(&mut self) -> Option<Word> {
        self.branch_condition.take()
    }

    /// Path conditions simplified to a constant are decided without asking
    /// the solver.
    pub fn is_feasible<S: Solver>(&self, solver: &mut S) -> Solution {
        let condition = self.path_condition.as_word();

        match condition.as_bool() {
            Some(true) => Solution::Sat,
            Some(false) => Solution::Unsat,
            None => time_debug!(
                format!("checked feasibility of block {} with {}", self.id, S::name()),
                { solver.solve(condition) }
            ),
        }
    }

    pub fn push_dfs_stack(&mut self, block: BasicBlock) {
        self.dfs_stack.push(block);
    }

    pub fn pop_dfs_stack(&mut self) -> Option<BasicBlock> {
        self.dfs_stack.pop()
    }

    pub fn dfs_stack(&self) -> &[BasicBlock] {
        &self.dfs_stack
    }

    pub fn push_call_stack(&mut self, block: BasicBlock) {
        self.call_stack.push(block);
    }

    pub fn pop_call_stack(&mut self) -> Option<BasicBlock> {
        self.call_stack.pop()
    }

    pub fn call_stack(&self) -> &[BasicBlock] {
        &self.call_stack
    }

    pub fn account(&self) -> AccountIndex {
        self.account
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn pc(&self) -> u64 {
        self.machine_state.pc()
    }

    pub fn set_pc(&mut self, pc: u64) {
        self.machine_state.set_pc(pc);
    }

    pub fn machine_state(&self) -> &MachineState {
        &self.machine_state
    }

    pub fn machine_state_mut(&mut self) -> &mut MachineState {
        &mut self.machine_state
    }

    /// Persistent storage snapshot of the account this block runs in.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    /// Memory and stack of the machine state together with the block's
    /// storage snapshot.
    pub fn state_mut(&mut self) -> StateMut<'_> {
        let pc = self.machine_state.pc();
        let storage = &mut self.storage;
        let machine_state = &mut self.machine_state;

        let (memory, stack) = machine_state.split_mut();

        StateMut {
            memory,
            stack,
            storage,
            pc,
        }
    }
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "block {} (account {}, pc {:#x})",
            self.id,
            self.account,
            self.pc()
        )?;
        writeln!(f, "path condition: {}", self.path_condition.as_word())?;
        if let Some(condition) = &self.branch_condition {
            writeln!(f, "branch condition: {}", condition)?;
        }
        writeln!(f, "instructions:")?;
        for (pc, mnemonic) in self.instructions.iter() {
            writeln!(f, "  {:#06x}: {}", pc, mnemonic)?;
        }
        writeln!(f, "stack:")?;
        write!(f, "{}", self.machine_state.stack())?;
        writeln!(f, "memory:")?;
        writeln!(f, "{}", self.machine_state.memory())?;
        writeln!(f, "storage:")?;
        write!(f, "{}", self.storage)
    }
}
