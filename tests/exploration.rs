mod utils;

use anyhow::Result;
use symstate::cfg::{BasicBlock, CfgManager};
use symstate::solver::{NoneSolver, Solution, Solver};
use symstate::state::{ExecutionEnvironment, WorldState};
use symstate::term::Word;
use utils::{init, push_all, stack_of};

fn numerals(values: &[u64]) -> Vec<Word> {
    values.iter().map(|v| Word::numeral(*v)).collect()
}

#[test]
fn stack_scenario_on_a_basic_block() -> Result<()> {
    init();

    let mut block = BasicBlock::new(0, 0);
    push_all(&mut block, &[0, 1, 2, 3]);
    assert_eq!(stack_of(&block), numerals(&[0, 1, 2, 3]));

    block.state_mut().stack.swap(1)?;
    assert_eq!(stack_of(&block), numerals(&[0, 1, 3, 2]));

    block.state_mut().stack.dup(1)?;
    assert_eq!(stack_of(&block), numerals(&[0, 1, 3, 2, 2]));

    Ok(())
}

#[test]
fn drive_a_payable_check_through_a_fork() -> Result<()> {
    init();

    let mut world = WorldState::new();
    let address = world.add_account("6080604052348015600f57600080fd5b50");
    let account = world
        .account_index(&address)
        .expect("address was just registered");
    let env = ExecutionEnvironment::symbolic(0, address.clone(), "6080604052", 0, true);
    let callvalue = env.value.clone();
    world.add_execution_environment(env);

    let mut cfg = CfgManager::new(0);
    let mut block = BasicBlock::new(account, 0);

    // PUSH1 0x80 PUSH1 0x40 MSTORE
    block.add_instruction(2, "PUSH1 0x80");
    block.state_mut().stack.push(Word::numeral(0x80_u64))?;
    block.add_instruction(2, "PUSH1 0x40");
    block.state_mut().stack.push(Word::numeral(0x40_u64))?;
    block.add_instruction(1, "MSTORE");
    {
        let state = block.state_mut();
        let offset = state.stack.pop();
        let value = state.stack.pop();
        state.memory.mstore(&offset, &value)?;
    }

    // CALLVALUE DUP1 ISZERO PUSH1 0x0f JUMPI
    block.add_instruction(1, "CALLVALUE");
    block.state_mut().stack.push(callvalue.clone())?;
    block.add_instruction(1, "DUP1");
    block.state_mut().stack.dup(1)?;
    block.add_instruction(1, "ISZERO");
    let top = block.state_mut().stack.pop();
    block.add_instruction(2, "PUSH1 0x0f");
    block.add_instruction(1, "JUMPI");
    block.set_branch_condition(top.is_zero());

    assert_eq!(block.pc(), 11);
    assert_eq!(block.machine_state().memory().msize(), 0x60);

    let (taken, fallthrough) = block
        .fork_on_branch(1, 2)
        .expect("branch condition is pending");

    let origin = cfg.add_basic_block(block);
    let taken = cfg.add_basic_block(taken);
    let fallthrough = cfg.add_basic_block(fallthrough);
    cfg.add_edge(origin, taken);
    cfg.add_edge(origin, fallthrough);
    cfg.add_visited_block(origin);

    let successors = cfg.destinations(origin);
    assert_eq!(successors.iter().map(|b| b.id()).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(successors[0].path_condition(), &callvalue.is_zero());
    assert_eq!(successors[1].path_condition(), &callvalue.is_zero().negate());

    for successor in successors {
        assert_eq!(successor.account(), account);
        assert_eq!(successor.pc(), 11);
        assert_eq!(stack_of(successor), vec![callvalue.clone()]);
        assert_eq!(
            successor.machine_state().memory().msize(),
            0x60,
            "memory is carried over into both successors"
        );
    }

    Ok(())
}

#[test]
fn forked_blocks_do_not_share_state() -> Result<()> {
    init();

    let mut block = BasicBlock::new(0, 0);
    push_all(&mut block, &[1, 2]);
    block
        .state_mut()
        .memory
        .mstore(&Word::numeral(0_u64), &Word::fresh("m"))?;
    block.set_branch_condition(Word::fresh("c").is_zero());

    let (mut first, mut second) = block.fork_on_branch(1, 2).expect("pending branch");

    first.state_mut().stack.push(Word::numeral(3_u64))?;
    first
        .state_mut()
        .memory
        .mstore(&Word::numeral(0_u64), &Word::numeral(9_u64))?;
    first
        .state_mut()
        .storage
        .sstore(&Word::numeral(0_u64), Word::numeral(1_u64));

    assert_eq!(stack_of(&second), numerals(&[1, 2]));
    assert_eq!(
        second
            .state_mut()
            .memory
            .mload(&Word::numeral(0_u64))?,
        Word::fresh("m")
    );
    assert!(second.storage().is_empty());
    assert_eq!(stack_of(&block), numerals(&[1, 2]));

    // both children underflow into differently named terms
    first.state_mut().stack.pop();
    let a = {
        let stack = first.state_mut().stack;
        stack.pop();
        stack.pop();
        stack.pop()
    };
    let b = {
        let stack = second.state_mut().stack;
        stack.pop();
        stack.pop();
        stack.pop()
    };

    assert_eq!(a, Word::fresh("stackVar1-1"));
    assert_eq!(b, Word::fresh("stackVar2-1"));
    assert_ne!(a, b);

    Ok(())
}

#[test]
fn empty_stacks_of_different_blocks_mint_distinct_words() {
    init();

    let mut first = BasicBlock::new(0, 1);
    let mut second = BasicBlock::new(0, 2);

    let a = first.state_mut().stack.pop();
    let b = second.state_mut().stack.pop();

    assert_ne!(a, b);
    assert!(!a.ptr_eq(&b));
}

#[test]
fn dfs_stack_serves_as_work_list() {
    init();

    let mut root = BasicBlock::new(0, 0);
    let mut next_id = 1;
    let mut explored = Vec::new();

    root.set_branch_condition(Word::fresh("x").is_zero());
    let (taken, fallthrough) = root.fork_on_branch(1, 2).expect("pending branch");
    next_id += 2;

    root.push_dfs_stack(fallthrough);
    root.push_dfs_stack(taken);

    while let Some(mut block) = root.pop_dfs_stack() {
        explored.push(block.id());

        // fork every block at depth one once more, on a different condition
        if block.id() < 3 {
            block.set_branch_condition(Word::fresh(format!("y{}", block.id())).is_zero());
            let (t, f) = block
                .fork_on_branch(next_id, next_id + 1)
                .expect("pending branch");
            next_id += 2;
            root.push_dfs_stack(f);
            root.push_dfs_stack(t);
        }
    }

    assert_eq!(explored, vec![1, 3, 4, 2, 5, 6]);
}

#[test]
fn contradicting_branches_become_infeasible() {
    init();

    let mut solver = NoneSolver::new();
    let x = Word::fresh("x");

    let mut block = BasicBlock::new(0, 0);
    block.set_branch_condition(x.is_zero());
    let (mut taken, _) = block.fork_on_branch(1, 2).expect("pending branch");

    taken.set_branch_condition(x.is_zero());
    let (again, contradiction) = taken.fork_on_branch(3, 4).expect("pending branch");

    assert_eq!(again.path_condition(), &x.is_zero());
    assert_eq!(contradiction.is_feasible(&mut solver), Solution::Unsat);
}
