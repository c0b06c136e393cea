use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::intern::Symbol;
use crate::scope::ScopeId;
use crate::settings::{CStandard, CppStandard, Language, Standards};

/// Handle to a token inside a [`TokenList`](crate::tokenlist::TokenList)
/// arena. Handles stay valid while their token is alive; dereferencing a
/// handle of an erased token is a bug caught by debug assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub(crate) u32);

impl TokenId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Lexical class of a token, derived from the lexeme and cached. It is
/// re-derived every time a rewrite changes the lexeme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Name,
    Number,
    String,
    Char,
    Boolean,
    Op,
    Bracket,
    Keyword,
    Other,
}

/// Compact per-token boolean attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenFlags(u32);

macro_rules! token_flags {
    ($($(#[$doc:meta])* $name:ident, $set:ident = $bit:expr;)*) => {
        impl TokenFlags {
            $(
                $(#[$doc])*
                pub fn $name(self) -> bool {
                    self.0 & (1 << $bit) != 0
                }

                pub fn $set(&mut self, on: bool) {
                    if on {
                        self.0 |= 1 << $bit;
                    } else {
                        self.0 &= !(1 << $bit);
                    }
                }
            )*
        }
    };
}

token_flags! {
    is_unsigned, set_unsigned = 0;
    is_signed, set_signed = 1;
    is_long, set_long = 2;
    is_standard_type, set_standard_type = 3;
    is_cast, set_cast = 4;
    is_attr_packed, set_attr_packed = 5;
    is_attr_noreturn, set_attr_noreturn = 6;
    is_attr_pure, set_attr_pure = 7;
    is_attr_const, set_attr_const = 8;
    is_attr_nodiscard, set_attr_nodiscard = 9;
    is_attr_unused, set_attr_unused = 10;
    is_attr_maybe_unused, set_attr_maybe_unused = 11;
    is_expanded_macro, set_expanded_macro = 12;
    is_extern_c, set_extern_c = 13;
    is_inline, set_inline = 14;
    is_constexpr, set_constexpr = 15;
    /// Token produced by splitting `int a, b;` at a comma.
    is_split_var_decl_comma, set_split_var_decl_comma = 16;
    /// Token produced by splitting `int a = x;` at the initializer.
    is_split_var_decl_eq, set_split_var_decl_eq = 17;
    is_implicit_int, set_implicit_int = 18;
    /// Name whose address is taken somewhere in the unit.
    is_at_address, set_at_address = 19;
    /// Name known to be a template (pass B opener heuristic).
    is_template, set_template = 20;
    /// Alternative operator spelling (`and`, `bitor`, ...) before rewrite.
    is_operator_keyword, set_operator_keyword = 21;
}

/// Known-value record attached by the value-flow collaborator. The
/// tokenizer core never inspects these beyond carrying them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenValue {
    pub int_value: i64,
    pub known: bool,
}

/// One token of the canonical list. Bulk data, kept small; the lexeme is
/// a [`Symbol`] resolved against the list's interner.
#[derive(Debug, Clone)]
pub struct TokenData {
    pub sym: Symbol,
    pub kind: TokenKind,
    pub file: u32,
    pub line: u32,
    pub column: u32,
    /// 0..=100 pacing hint for progress reporting.
    pub progress: u8,
    pub link: Option<TokenId>,
    pub var_id: u32,
    pub scope: Option<ScopeId>,
    pub flags: TokenFlags,
    /// Bitfield width, 0 when not a bitfield member.
    pub bits: u8,
    pub ast_parent: Option<TokenId>,
    pub ast_op1: Option<TokenId>,
    pub ast_op2: Option<TokenId>,
    pub values: Vec<TokenValue>,
    /// Lexeme before canonicalization (`->` before it became `.`).
    pub original_sym: Option<Symbol>,
    pub(crate) prev: Option<TokenId>,
    pub(crate) next: Option<TokenId>,
    pub(crate) dead: bool,
}

impl TokenData {
    pub(crate) fn new(sym: Symbol, kind: TokenKind, file: u32, line: u32, column: u32) -> Self {
        TokenData {
            sym,
            kind,
            file,
            line,
            column,
            progress: 0,
            link: None,
            var_id: 0,
            scope: None,
            flags: TokenFlags::default(),
            bits: 0,
            ast_parent: None,
            ast_op1: None,
            ast_op2: None,
            values: Vec::new(),
            original_sym: None,
            prev: None,
            next: None,
            dead: false,
        }
    }

    pub fn is_name(&self) -> bool {
        matches!(self.kind, TokenKind::Name | TokenKind::Keyword | TokenKind::Boolean)
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Number | TokenKind::String | TokenKind::Char | TokenKind::Boolean
        )
    }

    pub fn is_op(&self) -> bool {
        matches!(self.kind, TokenKind::Op | TokenKind::Bracket)
    }
}

static C_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
        "enum", "extern", "float", "for", "goto", "if", "int", "long", "register", "return",
        "short", "signed", "sizeof", "static", "struct", "switch", "typedef", "union", "unsigned",
        "void", "volatile", "while",
    ]
    .into_iter()
    .collect()
});

static C99_KEYWORDS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["inline", "restrict", "_Bool", "_Complex", "_Imaginary"].into_iter().collect());

static C11_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "_Alignas",
        "_Alignof",
        "_Atomic",
        "_Generic",
        "_Noreturn",
        "_Static_assert",
        "_Thread_local",
    ]
    .into_iter()
    .collect()
});

static CPP03_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "asm", "bool", "catch", "class", "const_cast", "delete", "dynamic_cast", "explicit",
        "export", "false", "friend", "inline", "mutable", "namespace", "new", "operator",
        "private", "protected", "public", "reinterpret_cast", "static_cast", "template", "this",
        "throw", "true", "try", "typeid", "typename", "using", "virtual", "wchar_t",
    ]
    .into_iter()
    .collect()
});

static CPP11_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "alignas",
        "alignof",
        "char16_t",
        "char32_t",
        "constexpr",
        "decltype",
        "noexcept",
        "nullptr",
        "static_assert",
        "thread_local",
    ]
    .into_iter()
    .collect()
});

static CPP20_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "char8_t",
        "concept",
        "consteval",
        "constinit",
        "co_await",
        "co_return",
        "co_yield",
        "requires",
    ]
    .into_iter()
    .collect()
});

/// Alternative operator spellings of C++ (and of C's `iso646.h`, which
/// the preprocessor has already expanded when present).
static OPERATOR_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "and", "and_eq", "bitand", "bitor", "compl", "not", "not_eq", "or", "or_eq", "xor",
        "xor_eq",
    ]
    .into_iter()
    .collect()
});

static STANDARD_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "bool", "_Bool", "char", "char8_t", "char16_t", "char32_t", "double", "float", "int",
        "long", "short", "size_t", "void", "wchar_t",
    ]
    .into_iter()
    .collect()
});

pub fn is_keyword(s: &str, lang: Language, standards: Standards) -> bool {
    match lang {
        Language::C => {
            C_KEYWORDS.contains(s)
                || (standards.c >= CStandard::C99 && C99_KEYWORDS.contains(s))
                || (standards.c >= CStandard::C11 && C11_KEYWORDS.contains(s))
        }
        Language::Cpp => {
            C_KEYWORDS.contains(s)
                || CPP03_KEYWORDS.contains(s)
                || (standards.cpp >= CppStandard::Cpp11 && CPP11_KEYWORDS.contains(s))
                || (standards.cpp >= CppStandard::Cpp20 && CPP20_KEYWORDS.contains(s))
        }
    }
}

pub fn is_operator_keyword(s: &str) -> bool {
    OPERATOR_KEYWORDS.contains(s)
}

pub fn is_standard_type(s: &str) -> bool {
    STANDARD_TYPES.contains(s)
}

/// Keywords that can open a type and therefore satisfy `%type%`.
pub fn is_type_keyword(s: &str) -> bool {
    matches!(
        s,
        "auto"
            | "bool"
            | "_Bool"
            | "char"
            | "char8_t"
            | "char16_t"
            | "char32_t"
            | "double"
            | "float"
            | "int"
            | "long"
            | "short"
            | "signed"
            | "unsigned"
            | "void"
            | "wchar_t"
            | "size_t"
    )
}

/// Statement-level keywords that cannot appear at global scope.
pub fn is_flow_keyword(s: &str) -> bool {
    matches!(
        s,
        "break" | "continue" | "return" | "goto" | "case" | "default" | "else"
    )
}

pub fn is_assign_op(s: &str) -> bool {
    matches!(
        s,
        "=" | "+=" | "-=" | "*=" | "/=" | "%=" | "&=" | "|=" | "^=" | "<<=" | ">>="
    )
}

pub fn is_comparison_op(s: &str) -> bool {
    matches!(s, "==" | "!=" | "<" | ">" | "<=" | ">=")
}

/// Comparison or calculation operator, excluding assignment and
/// increment/decrement.
pub fn is_const_op(s: &str) -> bool {
    is_comparison_op(s)
        || matches!(
            s,
            "+" | "-" | "*" | "/" | "%" | "&" | "|" | "^" | "<<" | ">>" | "&&" | "||" | "!" | "~"
        )
}

pub fn is_operator_str(s: &str) -> bool {
    is_const_op(s)
        || is_assign_op(s)
        || matches!(
            s,
            "++" | "--" | "?" | ":" | "::" | "." | "->" | ".*" | "->*" | "," | ";" | "..."
        )
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$' || !c.is_ascii()
}

fn string_or_char_kind(s: &str) -> Option<TokenKind> {
    // Optional encoding prefix, then a quoted body.
    let rest = s
        .strip_prefix("u8")
        .or_else(|| s.strip_prefix('u'))
        .or_else(|| s.strip_prefix('U'))
        .or_else(|| s.strip_prefix('L'))
        .unwrap_or(s);
    if rest.len() >= 2 && rest.starts_with('"') && rest.ends_with('"') {
        Some(TokenKind::String)
    } else if rest.len() >= 2 && rest.starts_with('\'') && rest.ends_with('\'') {
        Some(TokenKind::Char)
    } else {
        None
    }
}

/// Classify a lexeme. Keywords depend on the language and standard the
/// list was created with.
pub fn classify(s: &str, lang: Language, standards: Standards) -> TokenKind {
    let mut chars = s.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return TokenKind::Other,
    };
    if let Some(kind) = string_or_char_kind(s) {
        return kind;
    }
    if first.is_ascii_digit() || (first == '.' && chars.next().is_some_and(|c| c.is_ascii_digit()))
    {
        return TokenKind::Number;
    }
    if is_name_start(first) {
        if s == "true" || s == "false" {
            return TokenKind::Boolean;
        }
        if is_keyword(s, lang, standards) {
            return TokenKind::Keyword;
        }
        return TokenKind::Name;
    }
    match s {
        "(" | ")" | "{" | "}" | "[" | "]" => TokenKind::Bracket,
        _ if is_operator_str(s) || matches!(s, "#" | "##" | "@" | "\\") => TokenKind::Op,
        _ => TokenKind::Other,
    }
}
