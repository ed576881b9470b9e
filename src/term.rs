//! # Symbolic terms
//!
//! Fixed-width bit-vector and boolean terms used for every value the
//! machine state holds. A [`Word`] is a shared handle to an immutable
//! [`Term`]; cloning a word never copies the term itself.
//!
//! Besides what the state containers need (fresh variables, numerals, byte
//! extraction, concatenation, conjunction) the term language only offers
//! the comparisons and arithmetic a driver uses to phrase branch conditions.
//! [`Word::simplify`] is deterministic and canonicalizing, so structurally
//! equal inputs always simplify to structurally equal outputs.
//!
//! Conjunctions are flat. Path conditions grow through [`Conjunction`],
//! which never re-simplifies what it already holds.

use primitive_types::U256;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

//
// Public Interface
//

pub const WORD_BITS: u32 = 256;
pub const WORD_BYTES: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sort {
    Bool,
    BitVec(u32),
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub enum Term {
    Const { width: u32, value: U256 },
    Bool(bool),
    Var { width: u32, name: String },
    Extract { high: u32, low: u32, value: Word },
    // most significant part first
    Concat(Vec<Word>),
    Add(Word, Word),
    Sub(Word, Word),
    Mul(Word, Word),
    Eq(Word, Word),
    Ult(Word, Word),
    // flat, never nested in another conjunction once simplified
    And(Vec<Word>),
    Not(Word),
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Word(Arc<Term>);

impl Word {
    fn new(term: Term) -> Self {
        Self(Arc::new(term))
    }

    /// A 256-bit uninterpreted term. Two fresh terms with the same name are
    /// the same term.
    pub fn fresh<S: Into<String>>(name: S) -> Self {
        Self::fresh_with_width(name, WORD_BITS)
    }

    pub fn fresh_with_width<S: Into<String>>(name: S, width: u32) -> Self {
        Self::new(Term::Var {
            width,
            name: name.into(),
        })
    }

    pub fn numeral<V: Into<U256>>(value: V) -> Self {
        Self::constant(WORD_BITS, value.into())
    }

    pub fn constant(width: u32, value: U256) -> Self {
        debug_assert!(width > 0 && width <= WORD_BITS, "unsupported width {}", width);

        Self::new(Term::Const {
            width,
            value: value & mask(width),
        })
    }

    pub fn byte(value: u8) -> Self {
        Self::constant(8, U256::from(value))
    }

    pub fn from_bool(value: bool) -> Self {
        Self::new(Term::Bool(value))
    }

    pub fn extract(&self, high: u32, low: u32) -> Self {
        debug_assert!(
            low <= high && high < self.width(),
            "invalid extract [{}:{}] of {}-bit term",
            high,
            low,
            self.width()
        );

        Self::new(Term::Extract {
            high,
            low,
            value: self.clone(),
        })
    }

    /// Byte `index` counted from the least significant end.
    pub fn extract_byte(&self, index: usize) -> Self {
        let low = (index * 8) as u32;

        self.extract(low + 7, low)
    }

    pub fn concat(parts: Vec<Word>) -> Self {
        debug_assert!(!parts.is_empty(), "can not concatenate zero terms");

        Self::new(Term::Concat(parts))
    }

    pub fn conjoin(&self, other: &Word) -> Self {
        debug_assert_eq!(self.sort(), Sort::Bool);
        debug_assert_eq!(other.sort(), Sort::Bool);

        let mut parts = Vec::new();
        for word in [self, other].iter() {
            match word.term() {
                Term::And(inner) => parts.extend(inner.iter().cloned()),
                _ => parts.push((*word).clone()),
            }
        }

        Self::new(Term::And(parts))
    }

    pub fn negate(&self) -> Self {
        debug_assert_eq!(self.sort(), Sort::Bool);

        Self::new(Term::Not(self.clone()))
    }

    pub fn equals(&self, other: &Word) -> Self {
        Self::new(Term::Eq(self.clone(), other.clone()))
    }

    pub fn ult(&self, other: &Word) -> Self {
        Self::new(Term::Ult(self.clone(), other.clone()))
    }

    pub fn is_zero(&self) -> Self {
        self.equals(&Self::constant(self.width(), U256::zero()))
    }

    pub fn add(&self, other: &Word) -> Self {
        Self::new(Term::Add(self.clone(), other.clone()))
    }

    pub fn sub(&self, other: &Word) -> Self {
        Self::new(Term::Sub(self.clone(), other.clone()))
    }

    pub fn mul(&self, other: &Word) -> Self {
        Self::new(Term::Mul(self.clone(), other.clone()))
    }

    pub fn term(&self) -> &Term {
        &self.0
    }

    pub fn sort(&self) -> Sort {
        match self.term() {
            Term::Const { width, .. } | Term::Var { width, .. } => Sort::BitVec(*width),
            Term::Extract { high, low, .. } => Sort::BitVec(high - low + 1),
            Term::Concat(parts) => Sort::BitVec(parts.iter().map(Word::width).sum()),
            Term::Add(left, _) | Term::Sub(left, _) | Term::Mul(left, _) => left.sort(),
            Term::Bool(_) | Term::Eq(..) | Term::Ult(..) | Term::And(..) | Term::Not(_) => {
                Sort::Bool
            }
        }
    }

    pub fn width(&self) -> u32 {
        match self.sort() {
            Sort::Bool => 1,
            Sort::BitVec(width) => width,
        }
    }

    pub fn as_concrete(&self) -> Option<U256> {
        match self.term() {
            Term::Const { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.term() {
            Term::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self.term(), Term::Const { .. } | Term::Bool(_))
    }

    /// True if both handles point at the very same term instance.
    pub fn ptr_eq(&self, other: &Word) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn simplify(&self) -> Self {
        match self.term() {
            Term::Const { .. } | Term::Bool(_) | Term::Var { .. } => self.clone(),
            Term::Extract { high, low, value } => simplify_extract(*high, *low, &value.simplify()),
            Term::Concat(parts) => simplify_concat(parts.iter().map(Word::simplify)),
            Term::Add(left, right) => {
                fold_arithmetic(left, right, Term::Add, |a, b| a.overflowing_add(b).0)
            }
            Term::Sub(left, right) => {
                fold_arithmetic(left, right, Term::Sub, |a, b| a.overflowing_sub(b).0)
            }
            Term::Mul(left, right) => {
                fold_arithmetic(left, right, Term::Mul, |a, b| a.overflowing_mul(b).0)
            }
            Term::Eq(left, right) => {
                let (left, right) = (left.simplify(), right.simplify());

                if left == right {
                    return Self::from_bool(true);
                }
                match (left.as_concrete(), right.as_concrete()) {
                    (Some(a), Some(b)) => Self::from_bool(a == b),
                    _ => Self::new(Term::Eq(left, right)),
                }
            }
            Term::Ult(left, right) => {
                let (left, right) = (left.simplify(), right.simplify());

                match (left.as_concrete(), right.as_concrete()) {
                    (Some(a), Some(b)) => Self::from_bool(a < b),
                    _ if left == right => Self::from_bool(false),
                    _ => Self::new(Term::Ult(left, right)),
                }
            }
            Term::And(parts) => simplify_and(parts.iter().map(Word::simplify)),
            Term::Not(value) => {
                let value = value.simplify();

                match value.term() {
                    Term::Bool(b) => Self::from_bool(!b),
                    Term::Not(inner) => inner.clone(),
                    _ => Self::new(Term::Not(value)),
                }
            }
        }
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.term() {
            Term::Const { width, value } if *width == WORD_BITS => write!(f, "{:#x}", value),
            Term::Const { width, value } => write!(f, "{:#x}#{}", value, width),
            Term::Bool(true) => write!(f, "True"),
            Term::Bool(false) => write!(f, "False"),
            Term::Var { name, .. } => write!(f, "{}", name),
            Term::Extract { high, low, value } => {
                write!(f, "Extract({}, {}, {})", high, low, value)
            }
            Term::Concat(parts) => write_list(f, "Concat", parts),
            Term::Add(left, right) => write!(f, "({} + {})", left, right),
            Term::Sub(left, right) => write!(f, "({} - {})", left, right),
            Term::Mul(left, right) => write!(f, "({} * {})", left, right),
            Term::Eq(left, right) => write!(f, "({} == {})", left, right),
            Term::Ult(left, right) => write!(f, "ULT({}, {})", left, right),
            Term::And(parts) => write_list(f, "And", parts),
            Term::Not(value) => write!(f, "Not({})", value),
        }
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<u64> for Word {
    fn from(value: u64) -> Self {
        Self::numeral(value)
    }
}

impl From<U256> for Word {
    fn from(value: U256) -> Self {
        Self::numeral(value)
    }
}

/// A conjunction that is strengthened one constraint at a time.
///
/// Only the incoming constraint is simplified. It is appended to a flat
/// `And` in place whenever the term is not shared, and duplicates or
/// contradictions are found through a hash set of the conjuncts instead of
/// by walking the term.
#[derive(Clone, Debug)]
pub struct Conjunction {
    word: Word,
    conjuncts: HashSet<Word>,
}

impl Conjunction {
    pub fn new() -> Self {
        Self {
            word: Word::from_bool(true),
            conjuncts: HashSet::new(),
        }
    }

    pub fn as_word(&self) -> &Word {
        &self.word
    }

    pub fn len(&self) -> usize {
        self.conjuncts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conjuncts.is_empty()
    }

    pub fn add(&mut self, constraint: &Word) {
        debug_assert_eq!(constraint.sort(), Sort::Bool);

        self.add_simplified(constraint.simplify());
    }

    fn add_simplified(&mut self, constraint: Word) {
        if self.word.as_bool() == Some(false) {
            return;
        }

        if let Term::And(parts) = constraint.term() {
            for part in parts {
                self.add_simplified(part.clone());
            }
            return;
        }

        match constraint.as_bool() {
            Some(true) => {}
            Some(false) => self.contradict(),
            None if self.conjuncts.contains(&constraint) => {}
            None if self.conjuncts.contains(&constraint.negate().simplify()) => self.contradict(),
            None => self.append(constraint),
        }
    }

    fn append(&mut self, constraint: Word) {
        self.conjuncts.insert(constraint.clone());

        if self.conjuncts.len() == 1 {
            self.word = constraint;
            return;
        }

        if let Some(Term::And(parts)) = Arc::get_mut(&mut self.word.0) {
            parts.push(constraint);
            return;
        }

        let mut parts = match self.word.term() {
            Term::And(parts) => parts.clone(),
            _ => vec![self.word.clone()],
        };
        parts.push(constraint);

        self.word = Word::new(Term::And(parts));
    }

    fn contradict(&mut self) {
        self.word = Word::from_bool(false);
        self.conjuncts.clear();
    }
}

impl Default for Conjunction {
    fn default() -> Self {
        Self::new()
    }
}

//
// Private Implementation
//

fn write_list(f: &mut fmt::Formatter, name: &str, parts: &[Word]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", part)?;
    }
    write!(f, ")")
}

// all parts have to be simplified already
fn simplify_and<I>(parts: I) -> Word
where
    I: IntoIterator<Item = Word>,
{
    let mut conjunction = Conjunction::new();

    for part in parts {
        conjunction.add_simplified(part);
    }

    conjunction.word
}

fn mask(width: u32) -> U256 {
    if width >= WORD_BITS {
        U256::MAX
    } else {
        (U256::one() << width) - U256::one()
    }
}

fn fold_arithmetic<F>(left: &Word, right: &Word, rebuild: fn(Word, Word) -> Term, f: F) -> Word
where
    F: FnOnce(U256, U256) -> U256,
{
    let (left, right) = (left.simplify(), right.simplify());

    match (left.as_concrete(), right.as_concrete()) {
        (Some(a), Some(b)) => Word::constant(left.width(), f(a, b)),
        _ => Word::new(rebuild(left, right)),
    }
}

// `value` has to be simplified already
fn simplify_extract(high: u32, low: u32, value: &Word) -> Word {
    if low == 0 && high + 1 == value.width() {
        return value.clone();
    }

    match value.term() {
        Term::Const { value: imm, .. } => Word::constant(high - low + 1, *imm >> low),
        Term::Extract {
            low: inner_low,
            value: inner,
            ..
        } => simplify_extract(high + inner_low, low + inner_low, inner),
        Term::Concat(parts) => {
            let mut covered = Vec::new();
            let mut base = 0;

            for part in parts.iter().rev() {
                let top = base + part.width() - 1;

                if low >= base && high <= top {
                    return simplify_extract(high - base, low - base, part);
                }
                if top >= low && base <= high {
                    covered.push(simplify_extract(
                        high.min(top) - base,
                        low.max(base) - base,
                        part,
                    ));
                }

                base = top + 1;
            }

            covered.reverse();

            simplify_concat(covered)
        }
        _ => Word::new(Term::Extract {
            high,
            low,
            value: value.clone(),
        }),
    }
}

// all parts have to be simplified already
fn simplify_concat<I>(parts: I) -> Word
where
    I: IntoIterator<Item = Word>,
{
    let mut merged: Vec<Word> = Vec::new();

    for part in parts {
        match part.term() {
            Term::Concat(inner) => inner
                .iter()
                .for_each(|p| push_merged(&mut merged, p.clone())),
            _ => push_merged(&mut merged, part),
        }
    }

    if merged.len() == 1 {
        merged.remove(0)
    } else {
        Word::new(Term::Concat(merged))
    }
}

fn push_merged(merged: &mut Vec<Word>, part: Word) {
    let joined = merged.last().and_then(|last| join_adjacent(last, &part));

    match joined {
        Some(word) => {
            merged.pop();
            merged.push(word);
        }
        None => merged.push(part),
    }
}

fn join_adjacent(upper: &Word, lower: &Word) -> Option<Word> {
    match (upper.term(), lower.term()) {
        (
            Term::Const {
                width: upper_width,
                value: upper_value,
            },
            Term::Const {
                width: lower_width,
                value: lower_value,
            },
        ) if upper_width + lower_width <= WORD_BITS => Some(Word::constant(
            upper_width + lower_width,
            (*upper_value << *lower_width) | *lower_value,
        )),
        (
            Term::Extract {
                high,
                low: upper_low,
                value: upper_value,
            },
            Term::Extract {
                high: lower_high,
                low,
                value: lower_value,
            },
        ) if upper_value == lower_value && *upper_low == lower_high + 1 => {
            Some(simplify_extract(*high, *low, upper_value))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes_of(word: &Word) -> Vec<Word> {
        (0..WORD_BYTES)
            .rev()
            .map(|i| word.extract_byte(i).simplify())
            .collect()
    }

    #[test]
    fn concrete_bytes_fold_back_into_the_numeral() {
        let value = Word::numeral(U256::from_dec_str("123456789012345678901234567890").unwrap());

        let bytes = bytes_of(&value);

        assert!(bytes.iter().all(Word::is_concrete));
        assert_eq!(Word::concat(bytes).simplify(), value);
    }

    #[test]
    fn symbolic_bytes_collapse_into_the_original_term() {
        let value = Word::fresh("x");

        assert_eq!(Word::concat(bytes_of(&value)).simplify(), value);
    }

    #[test]
    fn extract_of_concat_selects_the_covered_part() {
        let high = Word::fresh_with_width("h", 8);
        let low = Word::fresh_with_width("l", 8);
        let both = Word::concat(vec![high.clone(), low.clone()]);

        assert_eq!(both.extract(15, 8).simplify(), high);
        assert_eq!(both.extract(7, 0).simplify(), low);
        assert_eq!(both.extract(11, 4).simplify().width(), 8);
    }

    #[test]
    fn extract_of_constant() {
        let value = Word::numeral(0xabcd_u64);

        assert_eq!(value.extract_byte(1).simplify(), Word::byte(0xab));
        assert_eq!(value.extract_byte(0).simplify(), Word::byte(0xcd));
        assert_eq!(value.extract_byte(31).simplify(), Word::byte(0));
    }

    #[test]
    fn conjunction_removes_neutral_elements() {
        let c = Word::fresh("c").is_zero();
        let t = Word::from_bool(true);
        let f = Word::from_bool(false);

        assert_eq!(t.conjoin(&c).simplify(), c);
        assert_eq!(c.conjoin(&t).simplify(), c);
        assert_eq!(c.conjoin(&f).simplify(), f);
        assert_eq!(c.conjoin(&c.negate()).simplify(), f);
        assert_eq!(c.negate().negate().simplify(), c);
    }

    #[test]
    fn nested_conjunctions_flatten() {
        let a = Word::fresh("a").is_zero();
        let b = Word::fresh("b").is_zero();
        let c = Word::fresh("c").is_zero();

        let nested = a.conjoin(&b).conjoin(&b.conjoin(&c));

        assert_eq!(nested.simplify(), a.conjoin(&b).conjoin(&c));
        assert!(nested.simplify().to_string().starts_with("And((a == "));
    }

    #[test]
    fn conjunction_grows_without_nesting() {
        let mut conjunction = Conjunction::new();

        for i in 0..20_000 {
            conjunction.add(&Word::fresh(format!("c{}", i)).is_zero().negate());
        }

        assert_eq!(conjunction.len(), 20_000);
        match conjunction.as_word().term() {
            Term::And(parts) => assert_eq!(parts.len(), 20_000),
            other => panic!("expected a flat conjunction, got {:?}", other),
        }

        let copy = conjunction.clone();
        assert_eq!(copy.as_word(), conjunction.as_word());

        conjunction.add(&Word::fresh("c4242").is_zero());
        assert_eq!(conjunction.as_word().as_bool(), Some(false));
        assert_eq!(copy.len(), 20_000);
    }

    #[test]
    fn shared_conjunctions_are_copied_before_growing() {
        let x = Word::fresh("x").is_zero();
        let y = Word::fresh("y").is_zero();
        let z = Word::fresh("z").is_zero();

        let mut first = Conjunction::new();
        first.add(&x);
        first.add(&y);

        let mut second = first.clone();
        second.add(&z);
        second.add(&x);

        assert_eq!(first.as_word(), &x.conjoin(&y));
        assert_eq!(second.as_word(), &x.conjoin(&y).conjoin(&z));
    }

    #[test]
    fn arithmetic_on_constants_wraps() {
        let max = Word::numeral(U256::MAX);

        assert_eq!(max.add(&Word::numeral(2_u64)).simplify(), Word::numeral(1_u64));
        assert_eq!(
            Word::numeral(0_u64).sub(&Word::numeral(1_u64)).simplify(),
            max
        );
        assert_eq!(
            Word::numeral(6_u64).mul(&Word::numeral(7_u64)).simplify(),
            Word::numeral(42_u64)
        );
    }

    #[test]
    fn comparisons_on_constants_decide() {
        let one = Word::numeral(1_u64);
        let two = Word::numeral(2_u64);

        assert_eq!(one.ult(&two).simplify().as_bool(), Some(true));
        assert_eq!(two.ult(&one).simplify().as_bool(), Some(false));
        assert_eq!(one.equals(&two).simplify().as_bool(), Some(false));
        assert_eq!(Word::fresh("y").is_zero().simplify().as_bool(), None);
    }

    #[test]
    fn sorts_and_widths() {
        let x = Word::fresh("x");

        assert_eq!(x.sort(), Sort::BitVec(256));
        assert_eq!(x.extract_byte(3).width(), 8);
        assert_eq!(x.is_zero().sort(), Sort::Bool);
        assert_eq!(
            Word::concat(vec![Word::byte(1), Word::byte(2)]).width(),
            16
        );
    }

    #[test]
    fn display_distinguishes_widths() {
        assert_eq!(Word::numeral(0xab_u64).to_string(), "0xab");
        assert_eq!(Word::byte(0xab).to_string(), "0xab#8");
        assert_eq!(Word::fresh("x").extract_byte(0).to_string(), "Extract(7, 0, x)");
    }
}
