use crate::term::Word;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub coinbase: Word,
    pub timestamp: Word,
    pub number: Word,
    pub difficulty: Word,
    pub gas_limit: Word,
}

impl BlockHeader {
    pub fn symbolic(index: usize) -> Self {
        Self {
            coinbase: Word::fresh(format!("coinbase_{}", index)),
            timestamp: Word::fresh(format!("timestamp_{}", index)),
            number: Word::fresh(format!("blocknumber_{}", index)),
            difficulty: Word::fresh(format!("difficulty_{}", index)),
            gas_limit: Word::fresh(format!("gaslimit_{}", index)),
        }
    }
}

/// Context of one message call. Once registered with a
/// [`WorldState`](super::WorldState) it is only handed out by reference and
/// never changes.
#[derive(Clone, Debug)]
pub struct ExecutionEnvironment {
    pub index: usize,
    pub this_address: Word,
    pub tx_originator: Word,
    pub gas_price: Word,
    pub call_data: Word,
    pub sender: Word,
    pub value: Word,
    pub code: String,
    pub block_header: BlockHeader,
    pub call_depth: usize,
    pub can_modify_state: bool,
}

impl ExecutionEnvironment {
    /// Everything the caller does not pin down is a fresh term named after
    /// the field and the environment index.
    pub fn symbolic(
        index: usize,
        this_address: Word,
        code: &str,
        call_depth: usize,
        can_modify_state: bool,
    ) -> Self {
        Self {
            index,
            this_address,
            tx_originator: Word::fresh(format!("origin_{}", index)),
            gas_price: Word::fresh(format!("gasprice_{}", index)),
            call_data: Word::fresh(format!("calldata_{}", index)),
            sender: Word::fresh(format!("caller_{}", index)),
            value: Word::fresh(format!("callvalue_{}", index)),
            code: code.to_owned(),
            block_header: BlockHeader::symbolic(index),
            call_depth,
            can_modify_state,
        }
    }
}

impl fmt::Display for ExecutionEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "environment {}", self.index)?;
        writeln!(f, "  address:  {}", self.this_address)?;
        writeln!(f, "  origin:   {}", self.tx_originator)?;
        writeln!(f, "  gasprice: {}", self.gas_price)?;
        writeln!(f, "  calldata: {}", self.call_data)?;
        writeln!(f, "  caller:   {}", self.sender)?;
        writeln!(f, "  value:    {}", self.value)?;
        writeln!(f, "  code:     {} hex digits", self.code.len())?;
        writeln!(
            f,
            "  block:    coinbase={} timestamp={} number={} difficulty={} gaslimit={}",
            self.block_header.coinbase,
            self.block_header.timestamp,
            self.block_header.number,
            self.block_header.difficulty,
            self.block_header.gas_limit
        )?;
        writeln!(
            f,
            "  depth:    {} (state changes {})",
            self.call_depth,
            if self.can_modify_state {
                "allowed"
            } else {
                "forbidden"
            }
        )
    }
}
