use super::ExecutionEnvironment;
use crate::term::Word;
use indexmap::IndexMap;
use log::debug;
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct Account {
    pub bytecode: String,
    pub index: usize,
    pub balance: Word,
}

impl Account {
    pub fn new(bytecode: &str, index: usize) -> Self {
        Self {
            bytecode: bytecode.to_owned(),
            index,
            balance: Word::fresh(format!("account_balance_{}", index)),
        }
    }

    pub fn code_size(&self) -> usize {
        self.bytecode.len()
    }
}

/// Registry of the accounts, call contexts and block hashes of one
/// exploration session. Everything in here is append-only.
#[derive(Clone, Debug, Default)]
pub struct WorldState {
    accounts: IndexMap<Word, Account>,
    execution_environments: Vec<ExecutionEnvironment>,
    block_hashes: HashMap<u64, Word>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploys `bytecode` under a fresh symbolic address and returns it.
    pub fn add_account(&mut self, bytecode: &str) -> Word {
        let index = self.accounts.len();
        let address = Word::fresh(format!("address{}", index));

        debug!("new account {} at {}", index, address);

        self.accounts
            .insert(address.clone(), Account::new(bytecode, index));

        address
    }

    /// `None` for addresses this world state never handed out.
    pub fn account_index(&self, address: &Word) -> Option<usize> {
        self.accounts.get(address).map(|account| account.index)
    }

    pub fn account(&self, address: &Word) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// In creation order.
    pub fn accounts(&self) -> impl Iterator<Item = (&Word, &Account)> {
        self.accounts.iter()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn add_execution_environment(&mut self, environment: ExecutionEnvironment) -> usize {
        self.execution_environments.push(environment);

        self.execution_environments.len() - 1
    }

    pub fn execution_environment(&self, index: usize) -> Option<&ExecutionEnvironment> {
        self.execution_environments.get(index)
    }

    pub fn execution_environments(&self) -> &[ExecutionEnvironment] {
        &self.execution_environments
    }

    /// Hash of block `number`, one fresh term per number for the whole session.
    pub fn block_hash(&mut self, number: u64) -> Word {
        self.block_hashes
            .entry(number)
            .or_insert_with(|| Word::fresh(format!("blockhash_{}", number)))
            .clone()
    }
}
