use super::{BlockId, Memory, ModelOptions, Stack, Storage};

/// Mutable state of one path: program counter and the three containers.
#[derive(Clone, Debug)]
pub struct MachineState {
    pc: u64,
    memory: Memory,
    stack: Stack,
    storage: Storage,
}

impl MachineState {
    pub fn new(block: BlockId, options: ModelOptions) -> Self {
        Self {
            pc: 0,
            memory: Memory::with_options(block, options),
            stack: Stack::with_policy(block, options.overflow_policy),
            storage: Storage::new(block),
        }
    }

    pub fn duplicate(&self, new_block: BlockId) -> Self {
        Self {
            pc: self.pc,
            memory: self.memory.duplicate(new_block),
            stack: self.stack.duplicate(new_block),
            storage: self.storage.duplicate(new_block),
        }
    }

    pub fn pc(&self) -> u64 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u64) {
        self.pc = pc;
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    pub fn split_mut(&mut self) -> (&mut Memory, &mut Stack) {
        (&mut self.memory, &mut self.stack)
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }
}
