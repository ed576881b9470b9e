use crate::term::Word;

#[cfg(feature = "z3")]
pub mod z3;

#[cfg(feature = "z3")]
pub use self::z3::Z3SolverWrapper;

pub use self::none_impl::NoneSolver;

//
// Public Interface
//

#[derive(Debug, Eq, PartialEq)]
pub enum Solution {
    Sat,
    Unsat,
    Timeout,
}

/// Decision procedure for boolean terms, used to check path conditions.
pub trait Solver {
    fn new() -> Self;
    fn name() -> &'static str;
    fn solve(&mut self, root: &Word) -> Solution;
    fn is_always_true(&mut self, term: &Word) -> bool;
    fn is_always_false(&mut self, term: &Word) -> bool;
    fn is_always_equal(&mut self, left: &Word, right: &Word) -> bool;
}

//
// Private Implementation
//

pub mod none_impl {
    use crate::solver::{Solution, Solver};
    use crate::term::Word;

    /// Knows nothing beyond what simplification already decided.
    pub struct NoneSolver {}

    impl Solver for NoneSolver {
        fn name() -> &'static str {
            "None"
        }

        fn new() -> Self {
            Self {}
        }

        fn is_always_true(&mut self, term: &Word) -> bool {
            term.simplify().as_bool() == Some(true)
        }

        fn is_always_false(&mut self, term: &Word) -> bool {
            term.simplify().as_bool() == Some(false)
        }

        fn is_always_equal(&mut self, left: &Word, right: &Word) -> bool {
            left.simplify() == right.simplify()
        }

        fn solve(&mut self, root: &Word) -> Solution {
            match root.simplify().as_bool() {
                Some(true) => Solution::Sat,
                Some(false) => Solution::Unsat,
                None => Solution::Timeout,
            }
        }
    }
}
