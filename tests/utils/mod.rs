#![allow(dead_code)]

use std::sync::Once;
use symstate::cfg::BasicBlock;
use symstate::term::Word;

static INIT_LOGGER: Once = Once::new();

pub fn init() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

pub fn push_all(block: &mut BasicBlock, values: &[u64]) {
    for value in values {
        block
            .state_mut()
            .stack
            .push(Word::numeral(*value))
            .expect("lenient stack never rejects a push");
    }
}

pub fn stack_of(block: &BasicBlock) -> Vec<Word> {
    block.machine_state().stack().iter().cloned().collect()
}
