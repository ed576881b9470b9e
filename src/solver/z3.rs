use crate::solver::{Solution, Solver};
use crate::term::{Term, Word};
use log::trace;
use primitive_types::U256;
use std::collections::HashMap;
use z3_solver::{
    ast::{Ast, Bool, Dynamic, BV},
    Config, Context, SatResult, Solver as Z3Solver,
};

/// Z3 backend. Translated words are cached by structure, so a path
/// condition that grew by one constraint only costs the new conjunct.
pub struct Z3SolverWrapper<'ctx> {
    context: &'ctx Context,
    solver: Z3Solver<'ctx>,
    translated: HashMap<Word, Dynamic<'ctx>>,
}

impl<'ctx> Solver for Z3SolverWrapper<'ctx> {
    fn name() -> &'static str {
        "Z3"
    }

    fn new() -> Self {
        // One context per solver, alive until the process exits.
        let context: &'ctx Context = Box::leak(Box::new(Context::new(&Config::new())));

        Self {
            context,
            solver: Z3Solver::new(context),
            translated: HashMap::new(),
        }
    }

    fn is_always_true(&mut self, term: &Word) -> bool {
        let negated = self.bool_of(term).not();

        self.check(&[negated]) == Solution::Unsat
    }

    fn is_always_false(&mut self, term: &Word) -> bool {
        self.solve(term) == Solution::Unsat
    }

    fn is_always_equal(&mut self, left: &Word, right: &Word) -> bool {
        if left.simplify() == right.simplify() {
            return true;
        }

        let differ = self.bool_of(&left.equals(right)).not();

        self.check(&[differ]) == Solution::Unsat
    }

    fn solve(&mut self, root: &Word) -> Solution {
        // conjuncts of a path condition are asserted one by one
        let assertions: Vec<Bool<'ctx>> = match root.term() {
            Term::And(parts) => parts.iter().map(|part| self.bool_of(part)).collect(),
            _ => vec![self.bool_of(root)],
        };

        self.check(&assertions)
    }
}

impl<'ctx> Z3SolverWrapper<'ctx> {
    fn check(&mut self, assertions: &[Bool<'ctx>]) -> Solution {
        self.solver.push();

        for assertion in assertions {
            self.solver.assert(assertion);
        }

        let solution = match self.solver.check() {
            SatResult::Sat => Solution::Sat,
            SatResult::Unsat => Solution::Unsat,
            SatResult::Unknown => Solution::Timeout,
        };

        self.solver.pop(1);

        trace!("z3 answered {:?} for {} assertions", solution, assertions.len());

        solution
    }

    fn translate_cached(&mut self, word: &Word) -> &Dynamic<'ctx> {
        if !self.translated.contains_key(word) {
            let ast = self.translate(word);
            self.translated.insert(word.clone(), ast);
        }
        &self.translated[word]
    }

    fn bv_of(&mut self, word: &Word) -> BV<'ctx> {
        self.translate_cached(word)
            .as_bv()
            .unwrap_or_else(|| panic!("{} is not a bit-vector term", word))
    }

    fn bool_of(&mut self, word: &Word) -> Bool<'ctx> {
        self.translate_cached(word)
            .as_bool()
            .unwrap_or_else(|| panic!("{} is not a boolean term", word))
    }

    // built from 64-bit limbs, most significant first
    fn constant(&self, width: u32, value: &U256) -> BV<'ctx> {
        let limbs = ((width + 63) / 64) as usize;

        (0..limbs - 1)
            .rev()
            .fold(BV::from_u64(self.context, value.0[limbs - 1], 64), |bv, i| {
                bv.concat(&BV::from_u64(self.context, value.0[i], 64))
            })
            .extract(width - 1, 0)
    }

    fn translate(&mut self, word: &Word) -> Dynamic<'ctx> {
        match word.term() {
            Term::Const { width, value } => self.constant(*width, value).into(),
            Term::Bool(value) => Bool::from_bool(self.context, *value).into(),
            Term::Var { width, name } => BV::new_const(self.context, name.clone(), *width).into(),
            Term::Extract { high, low, value } => self.bv_of(value).extract(*high, *low).into(),
            Term::Concat(parts) => {
                let (first, rest) = parts
                    .split_first()
                    .expect("concatenation of at least one term");
                let first = self.bv_of(first);

                rest.iter()
                    .fold(first, |acc, part| acc.concat(&self.bv_of(part)))
                    .into()
            }
            Term::Add(left, right) => self.bv_of(left).bvadd(&self.bv_of(right)).into(),
            Term::Sub(left, right) => self.bv_of(left).bvsub(&self.bv_of(right)).into(),
            Term::Mul(left, right) => self.bv_of(left).bvmul(&self.bv_of(right)).into(),
            Term::Eq(left, right) => {
                let left = Dynamic::from_ast(self.translate_cached(left));
                let right = Dynamic::from_ast(self.translate_cached(right));

                left._eq(&right).into()
            }
            Term::Ult(left, right) => self.bv_of(left).bvult(&self.bv_of(right)).into(),
            Term::And(parts) => {
                let parts = parts.iter().map(|part| self.bool_of(part)).collect::<Vec<_>>();

                Bool::and(self.context, &parts.iter().collect::<Vec<_>>()).into()
            }
            Term::Not(value) => self.bool_of(value).not().into(),
        }
    }
}
