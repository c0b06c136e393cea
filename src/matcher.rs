use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::token::{
    is_assign_op, is_comparison_op, is_const_op, is_operator_str, is_type_keyword, TokenId,
    TokenKind,
};
use crate::tokenlist::TokenList;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AtomTest {
    Any,
    Name,
    Type,
    Num,
    Char,
    Str,
    Bool,
    Var,
    VarId,
    Op,
    Cop,
    Comp,
    OrOr,
    Or,
    Assign,
    Lit(Box<str>),
    OneOfChars(Box<str>),
}

#[derive(Debug, Clone)]
struct PatternAtom {
    /// `!!x`: the next token must not be the literal `x`; end of list
    /// satisfies the test.
    negated: Option<Box<str>>,
    alts: Vec<AtomTest>,
}

#[derive(Debug)]
struct CompiledPattern {
    atoms: Vec<PatternAtom>,
}

fn parse_meta(word: &str) -> Option<AtomTest> {
    Some(match word {
        "%any%" => AtomTest::Any,
        "%name%" => AtomTest::Name,
        "%type%" => AtomTest::Type,
        "%num%" => AtomTest::Num,
        "%char%" => AtomTest::Char,
        "%str%" => AtomTest::Str,
        "%bool%" => AtomTest::Bool,
        "%var%" => AtomTest::Var,
        "%varid%" => AtomTest::VarId,
        "%op%" => AtomTest::Op,
        "%cop%" => AtomTest::Cop,
        "%comp%" => AtomTest::Comp,
        "%oror%" => AtomTest::OrOr,
        "%or%" => AtomTest::Or,
        "%assign%" => AtomTest::Assign,
        _ => return None,
    })
}

fn compile(pattern: &str) -> CompiledPattern {
    let mut atoms = Vec::new();
    for word in pattern.split_ascii_whitespace() {
        if let Some(lit) = word.strip_prefix("!!") {
            atoms.push(PatternAtom {
                negated: Some(lit.into()),
                alts: Vec::new(),
            });
            continue;
        }
        if word.len() > 2 && word.starts_with('[') && word.ends_with(']') {
            atoms.push(PatternAtom {
                negated: None,
                alts: vec![AtomTest::OneOfChars(word[1..word.len() - 1].into())],
            });
            continue;
        }
        // `|`, `||` and `|=` are literals; everywhere else `|` separates
        // alternatives (`%or%`/`%oror%` exist for the bar operators
        // inside alternations).
        let alts: Vec<AtomTest> = if matches!(word, "|" | "||" | "|=") {
            vec![AtomTest::Lit(word.into())]
        } else {
            word.split('|')
                .filter(|part| !part.is_empty())
                .map(|part| parse_meta(part).unwrap_or_else(|| AtomTest::Lit(part.into())))
                .collect()
        };
        debug_assert!(!alts.is_empty(), "empty pattern atom in {:?}", pattern);
        atoms.push(PatternAtom {
            negated: None,
            alts,
        });
    }
    CompiledPattern { atoms }
}

/// Token-sequence pattern matching. Patterns compile once into a small
/// atom list and stay cached on this value for the driver's lifetime; no
/// global state is involved.
pub struct Matcher {
    cache: RefCell<HashMap<Box<str>, Rc<CompiledPattern>>>,
}

impl Matcher {
    pub fn new() -> Self {
        Matcher {
            cache: RefCell::new(HashMap::new()),
        }
    }

    fn compiled(&self, pattern: &str) -> Rc<CompiledPattern> {
        if let Some(pat) = self.cache.borrow().get(pattern) {
            return pat.clone();
        }
        let pat = Rc::new(compile(pattern));
        self.cache
            .borrow_mut()
            .insert(pattern.into(), pat.clone());
        pat
    }

    /// Full pattern language. Does not mutate the list.
    pub fn matches(&self, list: &TokenList, tok: Option<TokenId>, pattern: &str) -> bool {
        self.matches_varid(list, tok, pattern, 0)
    }

    /// Like [`Matcher::matches`] with a concrete id for `%varid%`.
    pub fn matches_varid(
        &self,
        list: &TokenList,
        tok: Option<TokenId>,
        pattern: &str,
        var_id: u32,
    ) -> bool {
        let pat = self.compiled(pattern);
        debug_assert!(
            var_id != 0 || !pat.atoms.iter().any(|a| a.alts.contains(&AtomTest::VarId)),
            "%varid% pattern without var id"
        );
        let mut cur = tok;
        for atom in &pat.atoms {
            if let Some(neg) = &atom.negated {
                match cur {
                    None => continue,
                    Some(t) => {
                        if list.is(t, neg) {
                            return false;
                        }
                        cur = list.next(t);
                    }
                }
                continue;
            }
            let t = match cur {
                Some(t) => t,
                None => return false,
            };
            if !atom.alts.iter().any(|test| self.test(list, t, test, var_id)) {
                return false;
            }
            cur = list.next(t);
        }
        true
    }

    fn test(&self, list: &TokenList, t: TokenId, test: &AtomTest, var_id: u32) -> bool {
        let data = list.get(t);
        match test {
            AtomTest::Any => true,
            AtomTest::Name => data.is_name(),
            AtomTest::Type => {
                data.is_name()
                    && (data.kind != TokenKind::Keyword || is_type_keyword(list.str(t)))
            }
            AtomTest::Num => data.kind == TokenKind::Number,
            AtomTest::Char => data.kind == TokenKind::Char,
            AtomTest::Str => data.kind == TokenKind::String,
            AtomTest::Bool => data.kind == TokenKind::Boolean,
            AtomTest::Var => data.is_name() && data.var_id != 0,
            AtomTest::VarId => data.var_id == var_id,
            AtomTest::Op => is_operator_str(list.str(t)),
            AtomTest::Cop => is_const_op(list.str(t)),
            AtomTest::Comp => is_comparison_op(list.str(t)),
            AtomTest::OrOr => list.is(t, "||"),
            AtomTest::Or => list.is(t, "|"),
            AtomTest::Assign => is_assign_op(list.str(t)),
            AtomTest::Lit(lit) => list.is(t, lit),
            AtomTest::OneOfChars(set) => {
                let s = list.str(t);
                s.len() == 1 && set.contains(s)
            }
        }
    }

    /// Literal whitespace-separated comparison, no meta-tokens.
    pub fn simple(&self, list: &TokenList, tok: Option<TokenId>, pattern: &str) -> bool {
        let mut cur = tok;
        for word in pattern.split_ascii_whitespace() {
            match cur {
                Some(t) if list.is(t, word) => cur = list.next(t),
                _ => return false,
            }
        }
        true
    }

    /// First position at or after `start` where `pattern` matches.
    pub fn find(
        &self,
        list: &TokenList,
        start: Option<TokenId>,
        pattern: &str,
    ) -> Option<TokenId> {
        let mut cur = start;
        while let Some(t) = cur {
            if self.matches(list, Some(t), pattern) {
                return Some(t);
            }
            cur = list.next(t);
        }
        None
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}
