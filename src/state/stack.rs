use super::{BlockId, FreshVariables, OverflowPolicy, StateError};
use crate::term::Word;
use log::{trace, warn};
use std::collections::VecDeque;
use std::fmt;

pub const STACK_LIMIT: usize = 1024;
pub const MAX_STACK_ACCESS: usize = 16;

/// LIFO of symbolic words, top is the most recent push.
///
/// Reads below the bottom never fail: the missing words are padded in as
/// fresh `stackVar` terms, modelling values a caller left on the stack.
///
/// Fresh names are `stackVar<block>-<n>`. Every block owns exactly one
/// stack, so stacks of different blocks never share a fresh term. Two stacks
/// built for the same block id do, which is how a block re-created from its
/// id keeps referring to the same unknown values.
#[derive(Clone, Debug)]
pub struct Stack {
    data: VecDeque<Word>,
    fresh: FreshVariables,
    policy: OverflowPolicy,
}

impl Stack {
    pub fn new(block: BlockId) -> Self {
        Self::with_policy(block, OverflowPolicy::default())
    }

    pub fn with_policy(block: BlockId, policy: OverflowPolicy) -> Self {
        Self {
            data: VecDeque::new(),
            fresh: FreshVariables::new("stackVar", block),
            policy,
        }
    }

    pub fn duplicate(&self, new_block: BlockId) -> Self {
        Self {
            data: self.data.clone(),
            fresh: self.fresh.rebased(new_block),
            policy: self.policy,
        }
    }

    pub fn push(&mut self, word: Word) -> Result<(), StateError> {
        if self.data.len() >= STACK_LIMIT {
            return match self.policy {
                OverflowPolicy::Strict => Err(StateError::StackOverflow(STACK_LIMIT)),
                OverflowPolicy::Lenient => {
                    warn!("stack limit of {} words reached, dropping {}", STACK_LIMIT, word);
                    Ok(())
                }
            };
        }

        trace!("push {}", word);

        self.data.push_back(word);

        Ok(())
    }

    pub fn pop(&mut self) -> Word {
        match self.data.pop_back() {
            Some(word) => word,
            None => {
                let word = self.fresh.next();

                trace!("pop on empty stack, generated {}", word);

                word
            }
        }
    }

    /// Pushes a copy of the `n`-th word from the top (`n = 1` is the top).
    pub fn dup(&mut self, n: usize) -> Result<(), StateError> {
        check_access("dup", n)?;

        self.pad_to(n);

        let word = self.data[self.data.len() - n].clone();

        self.push(word)
    }

    /// Exchanges the top with the word `n` positions below it.
    pub fn swap(&mut self, n: usize) -> Result<(), StateError> {
        check_access("swap", n)?;

        self.pad_to(n + 1);

        let top = self.data.len() - 1;
        self.data.swap(top, top - n);

        Ok(())
    }

    /// `depth = 0` is the top.
    pub fn peek(&self, depth: usize) -> Option<&Word> {
        self.data.len().checked_sub(depth + 1).map(|i| &self.data[i])
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &Word> {
        self.data.iter()
    }

    fn pad_to(&mut self, depth: usize) {
        while self.data.len() < depth {
            let word = self.fresh.next();

            trace!("stack shorter than {}, padding bottom with {}", depth, word);

            self.data.push_front(word);
        }
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, word) in self.data.iter().enumerate().rev() {
            writeln!(f, "{}:{}", i, word)?;
        }
        Ok(())
    }
}

fn check_access(operation: &'static str, index: usize) -> Result<(), StateError> {
    if (1..=MAX_STACK_ACCESS).contains(&index) {
        Ok(())
    } else {
        Err(StateError::InvalidArgument { operation, index })
    }
}
