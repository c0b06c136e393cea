use crate::error::{FileLocation, InternalError};
use crate::intern::{Interner, Symbol};
use crate::settings::{Language, Standards};
use crate::token::{classify, TokenData, TokenId, TokenKind};

/// One token of an upstream pre-tokenized stream.
#[derive(Debug, Clone)]
pub struct RawToken<'a> {
    pub lexeme: &'a str,
    pub file_index: u32,
    pub line: u32,
    pub column: u32,
    pub expanded_macro: bool,
}

/// The owning container of every token of one translation unit.
///
/// Tokens live in an index arena; erasure tombstones the slot, so a
/// [`TokenId`] can never be re-used for a different token. All structural
/// references between tokens (`prev`/`next`/`link`/AST operands) are ids
/// into the same arena, which makes cross-list references impossible by
/// construction.
pub struct TokenList {
    arena: Vec<TokenData>,
    head: Option<TokenId>,
    tail: Option<TokenId>,
    interner: Interner,
    files: Vec<String>,
    lang: Language,
    standards: Standards,
    /// Preprocessor configuration identifier, carried for diagnostics.
    config: String,
}

impl TokenList {
    pub fn new(lang: Language) -> Self {
        TokenList {
            arena: Vec::new(),
            head: None,
            tail: None,
            interner: Interner::new(),
            files: Vec::new(),
            lang,
            standards: Standards::default(),
            config: String::new(),
        }
    }

    pub fn with_standards(lang: Language, standards: Standards) -> Self {
        TokenList {
            standards,
            ..TokenList::new(lang)
        }
    }

    pub fn lang(&self) -> Language {
        self.lang
    }

    pub fn is_cpp(&self) -> bool {
        self.lang == Language::Cpp
    }

    pub fn standards(&self) -> Standards {
        self.standards
    }

    pub fn set_config(&mut self, config: &str) {
        self.config = config.to_string();
    }

    pub fn config(&self) -> &str {
        &self.config
    }

    // ------------------------------------------------------------------
    // Arena access
    // ------------------------------------------------------------------

    pub fn head(&self) -> Option<TokenId> {
        self.head
    }

    pub fn tail(&self) -> Option<TokenId> {
        self.tail
    }

    pub fn get(&self, id: TokenId) -> &TokenData {
        let t = &self.arena[id.index()];
        debug_assert!(!t.dead, "access to erased token");
        t
    }

    pub fn get_mut(&mut self, id: TokenId) -> &mut TokenData {
        let t = &mut self.arena[id.index()];
        debug_assert!(!t.dead, "access to erased token");
        t
    }

    pub fn next(&self, id: TokenId) -> Option<TokenId> {
        self.get(id).next
    }

    pub fn prev(&self, id: TokenId) -> Option<TokenId> {
        self.get(id).prev
    }

    /// The token `offset` steps away, negative for backwards.
    pub fn at(&self, id: TokenId, offset: i32) -> Option<TokenId> {
        let mut tok = Some(id);
        if offset >= 0 {
            for _ in 0..offset {
                tok = tok.and_then(|t| self.next(t));
            }
        } else {
            for _ in 0..-offset {
                tok = tok.and_then(|t| self.prev(t));
            }
        }
        tok
    }

    pub fn str(&self, id: TokenId) -> &str {
        self.interner.resolve(self.get(id).sym)
    }

    /// Lexeme `offset` steps away, or `""` past either end.
    pub fn str_at(&self, id: TokenId, offset: i32) -> &str {
        match self.at(id, offset) {
            Some(t) => self.str(t),
            None => "",
        }
    }

    /// Lexeme equality without allocating: misses the interner only when
    /// `s` never occurs in the unit at all.
    pub fn is(&self, id: TokenId, s: &str) -> bool {
        self.interner.lookup(s) == Some(self.get(id).sym)
    }

    pub fn link_of(&self, id: TokenId) -> Option<TokenId> {
        self.get(id).link
    }

    pub fn intern(&mut self, s: &str) -> Symbol {
        self.interner.intern(s)
    }

    pub fn resolve(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    /// Rewrite a lexeme in place, re-deriving the kind.
    pub fn set_str(&mut self, id: TokenId, s: &str) {
        let sym = self.interner.intern(s);
        let kind = classify(s, self.lang, self.standards);
        let t = self.get_mut(id);
        t.sym = sym;
        t.kind = kind;
    }

    /// Remember the current lexeme as the original one, unless an
    /// original is already recorded.
    pub fn remember_original(&mut self, id: TokenId) {
        let sym = self.get(id).sym;
        let t = self.get_mut(id);
        if t.original_sym.is_none() {
            t.original_sym = Some(sym);
        }
    }

    pub fn location(&self, id: TokenId) -> FileLocation {
        let t = self.get(id);
        FileLocation {
            file: self
                .files
                .get(t.file as usize)
                .cloned()
                .unwrap_or_default(),
            line: t.line,
            column: t.column,
        }
    }

    // ------------------------------------------------------------------
    // File table
    // ------------------------------------------------------------------

    pub fn add_file(&mut self, path: &str) -> u32 {
        if let Some(idx) = self.files.iter().position(|f| f == path) {
            return idx as u32;
        }
        self.files.push(path.to_string());
        (self.files.len() - 1) as u32
    }

    pub fn file_path(&self, index: u32) -> &str {
        self.files.get(index as usize).map_or("", |s| s.as_str())
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    // ------------------------------------------------------------------
    // Structural mutation
    // ------------------------------------------------------------------

    fn alloc(&mut self, lexeme: &str, file: u32, line: u32, column: u32) -> TokenId {
        let sym = self.interner.intern(lexeme);
        let kind = classify(lexeme, self.lang, self.standards);
        let id = TokenId(self.arena.len() as u32);
        self.arena.push(TokenData::new(sym, kind, file, line, column));
        id
    }

    pub fn append(&mut self, lexeme: &str, file: u32, line: u32, column: u32) -> TokenId {
        let id = self.alloc(lexeme, file, line, column);
        match self.tail {
            Some(tail) => {
                self.arena[tail.index()].next = Some(id);
                self.arena[id.index()].prev = Some(tail);
                self.tail = Some(id);
            }
            None => {
                self.head = Some(id);
                self.tail = Some(id);
            }
        }
        id
    }

    /// Insert a fresh token after `anchor`, inheriting its position.
    pub fn insert_after(&mut self, anchor: TokenId, lexeme: &str) -> TokenId {
        let (file, line, column) = {
            let a = self.get(anchor);
            (a.file, a.line, a.column)
        };
        let id = self.alloc(lexeme, file, line, column);
        let after = self.arena[anchor.index()].next;
        self.arena[id.index()].prev = Some(anchor);
        self.arena[id.index()].next = after;
        self.arena[anchor.index()].next = Some(id);
        match after {
            Some(n) => self.arena[n.index()].prev = Some(id),
            None => self.tail = Some(id),
        }
        id
    }

    /// Insert a fresh token before `anchor`, inheriting its position.
    pub fn insert_before(&mut self, anchor: TokenId, lexeme: &str) -> TokenId {
        let (file, line, column) = {
            let a = self.get(anchor);
            (a.file, a.line, a.column)
        };
        let id = self.alloc(lexeme, file, line, column);
        let before = self.arena[anchor.index()].prev;
        self.arena[id.index()].next = Some(anchor);
        self.arena[id.index()].prev = before;
        self.arena[anchor.index()].prev = Some(id);
        match before {
            Some(p) => self.arena[p.index()].next = Some(id),
            None => self.head = Some(id),
        }
        id
    }

    /// Erase one token; returns the token after it. The bracket partner,
    /// if any, loses its link so no dangling pair survives.
    pub fn erase(&mut self, id: TokenId) -> Option<TokenId> {
        let (prev, next, link) = {
            let t = self.get(id);
            (t.prev, t.next, t.link)
        };
        if let Some(partner) = link {
            if self.arena[partner.index()].link == Some(id) {
                self.arena[partner.index()].link = None;
            }
        }
        match prev {
            Some(p) => self.arena[p.index()].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.arena[n.index()].prev = prev,
            None => self.tail = prev,
        }
        let t = &mut self.arena[id.index()];
        t.dead = true;
        t.prev = None;
        t.next = None;
        t.link = None;
        next
    }

    /// Erase up to `count` tokens after `anchor`.
    pub fn erase_next(&mut self, anchor: TokenId, count: usize) {
        for _ in 0..count {
            match self.next(anchor) {
                Some(n) => {
                    self.erase(n);
                }
                None => break,
            }
        }
    }

    /// Erase every token strictly between the two anchors.
    pub fn erase_range(&mut self, from_exclusive: TokenId, to_exclusive: TokenId) {
        let mut tok = self.next(from_exclusive);
        while let Some(t) = tok {
            if t == to_exclusive {
                break;
            }
            tok = self.erase(t);
        }
    }

    /// Move the range `first..=last` so it follows `dest`, in O(1).
    /// All three tokens must belong to this list and `dest` must not lie
    /// inside the moved range.
    pub fn splice_after(&mut self, dest: TokenId, first: TokenId, last: TokenId) {
        debug_assert!(dest != first && dest != last);
        let before = self.arena[first.index()].prev;
        let after = self.arena[last.index()].next;
        // Unlink the range.
        match before {
            Some(p) => self.arena[p.index()].next = after,
            None => self.head = after,
        }
        match after {
            Some(n) => self.arena[n.index()].prev = before,
            None => self.tail = before,
        }
        // Relink after dest.
        let dest_next = self.arena[dest.index()].next;
        self.arena[dest.index()].next = Some(first);
        self.arena[first.index()].prev = Some(dest);
        self.arena[last.index()].next = dest_next;
        match dest_next {
            Some(n) => self.arena[n.index()].prev = Some(last),
            None => self.tail = Some(last),
        }
    }

    /// Replace the range strictly between `from` and `to` with the range
    /// `src_first..=src_last` from the same list (cross-list splicing is
    /// impossible: ids are arena-local).
    pub fn replace_range(
        &mut self,
        from_exclusive: TokenId,
        to_exclusive: TokenId,
        src_first: TokenId,
        src_last: TokenId,
    ) {
        self.erase_range(from_exclusive, to_exclusive);
        self.splice_after(from_exclusive, src_first, src_last);
    }

    /// Duplicate `src_begin..=src_end` after `dest_after`. Lexemes, flags
    /// and var ids are preserved; bracket links inside the copied range
    /// are re-paired onto the copies. Returns the last inserted token.
    pub fn copy_range(
        &mut self,
        dest_after: TokenId,
        src_begin: TokenId,
        src_end: TokenId,
    ) -> Option<TokenId> {
        let mut src = Vec::new();
        let mut tok = Some(src_begin);
        while let Some(t) = tok {
            src.push(t);
            if t == src_end {
                break;
            }
            tok = self.next(t);
        }
        let mut map = std::collections::HashMap::new();
        let mut anchor = dest_after;
        for &s in &src {
            let data = self.get(s).clone();
            let copy = self.insert_after(anchor, "");
            let copy_data = self.get_mut(copy);
            copy_data.sym = data.sym;
            copy_data.kind = data.kind;
            copy_data.file = data.file;
            copy_data.line = data.line;
            copy_data.column = data.column;
            copy_data.flags = data.flags;
            copy_data.var_id = data.var_id;
            copy_data.bits = data.bits;
            copy_data.original_sym = data.original_sym;
            map.insert(s, copy);
            anchor = copy;
        }
        // Re-pair links that stay inside the copied range.
        for &s in &src {
            if let Some(partner) = self.get(s).link {
                if let (Some(&c), Some(&cp)) = (map.get(&s), map.get(&partner)) {
                    self.get_mut(c).link = Some(cp);
                }
            }
        }
        map.get(&src_end).copied().or(Some(anchor))
    }

    /// Matching `>` for a `<` at `open`, by link when the template pass
    /// has run and by depth counting before that. Bails out at statement
    /// boundaries, where a template argument list cannot continue.
    pub fn find_closing_angle(&self, open: TokenId) -> Option<TokenId> {
        debug_assert!(self.is(open, "<"));
        if let Some(l) = self.link_of(open) {
            return Some(l);
        }
        let mut depth = 1i32;
        let mut cur = self.next(open);
        while let Some(t) = cur {
            match self.str(t) {
                "<" => depth += 1,
                ">" => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(t);
                    }
                }
                ">>" => {
                    depth -= 2;
                    if depth <= 0 {
                        return Some(t);
                    }
                }
                ";" | "{" | "}" => return None,
                "(" | "[" => {
                    cur = self.link_of(t).and_then(|l| self.next(l));
                    continue;
                }
                _ => {}
            }
            cur = self.next(t);
        }
        None
    }

    /// Drop all AST operand pointers, for passes that rewrite expressions
    /// after an AST has been built.
    pub fn clear_ast(&mut self) {
        let ids: Vec<TokenId> = self.iter().collect();
        for id in ids {
            let t = self.get_mut(id);
            t.ast_parent = None;
            t.ast_op1 = None;
            t.ast_op2 = None;
        }
    }

    /// Verify the doubly-linked invariant on the whole list.
    pub fn check_links(&self) -> Result<(), InternalError> {
        let mut prev: Option<TokenId> = None;
        let mut tok = self.head;
        while let Some(t) = tok {
            let data = &self.arena[t.index()];
            if data.dead {
                return Err(InternalError::internal("token list links to erased token"));
            }
            if data.prev != prev {
                return Err(InternalError::internal("token list is not properly linked")
                    .at(self.location(t)));
            }
            prev = Some(t);
            tok = data.next;
        }
        if prev != self.tail {
            return Err(InternalError::internal("token list tail is stale"));
        }
        Ok(())
    }

    pub fn iter(&self) -> TokenIter<'_> {
        TokenIter {
            list: self,
            cur: self.head,
        }
    }

    /// Iterate the range `from..=to`.
    pub fn iter_range(&self, from: TokenId, to: TokenId) -> impl Iterator<Item = TokenId> + '_ {
        let mut cur = Some(from);
        let mut done = false;
        std::iter::from_fn(move || {
            if done {
                return None;
            }
            let t = cur?;
            if t == to {
                done = true;
            }
            cur = self.next(t);
            Some(t)
        })
    }

    /// Space-joined lexemes of the whole list; the canonical-form shape
    /// tests assert against.
    pub fn stringify(&self) -> String {
        let mut out = String::new();
        for t in self.iter() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(self.str(t));
        }
        out
    }

    // ------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------

    /// Append an upstream pre-tokenized stream. File indices refer to the
    /// caller-maintained file table (see [`TokenList::add_file`]).
    pub fn append_pretokenized<'a>(&mut self, tokens: impl IntoIterator<Item = RawToken<'a>>) {
        for raw in tokens {
            let id = self.append(raw.lexeme, raw.file_index, raw.line, raw.column);
            if raw.expanded_macro {
                self.get_mut(id).flags.set_expanded_macro(true);
            }
        }
    }

    /// Tokenize already-preprocessed source text. Understands `#line`
    /// markers, comments (tolerated even though upstream strips them),
    /// encoding-prefixed string/char literals including raw strings, the
    /// full C number syntax and maximal-munch operators.
    pub fn create_tokens(&mut self, code: &str, file: &str) -> Result<(), InternalError> {
        let file_index = self.add_file(file);
        let mut lexer = RawLexer {
            list: self,
            bytes: code.as_bytes(),
            pos: 0,
            file_index,
            line: 1,
            column: 1,
        };
        lexer.run()?;
        // Progress pacing values from byte positions, for coarse
        // progress callbacks.
        let total = self.arena.len().max(1);
        let mut i = 0usize;
        let ids: Vec<TokenId> = self.iter().collect();
        for id in ids {
            self.get_mut(id).progress = ((i * 100) / total) as u8;
            i += 1;
        }
        Ok(())
    }
}

pub struct TokenIter<'a> {
    list: &'a TokenList,
    cur: Option<TokenId>,
}

impl<'a> Iterator for TokenIter<'a> {
    type Item = TokenId;

    fn next(&mut self) -> Option<TokenId> {
        let t = self.cur?;
        self.cur = self.list.next(t);
        Some(t)
    }
}

// ----------------------------------------------------------------------
// Raw text lexer
// ----------------------------------------------------------------------

struct RawLexer<'a> {
    list: &'a mut TokenList,
    bytes: &'a [u8],
    pos: usize,
    file_index: u32,
    line: u32,
    column: u32,
}

const THREE_CHAR_OPS: [&str; 4] = ["<<=", ">>=", "...", "->*"];
const TWO_CHAR_OPS: [&str; 19] = [
    "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "->",
];

impl<'a> RawLexer<'a> {
    fn peek(&self, off: usize) -> u8 {
        *self.bytes.get(self.pos + off).unwrap_or(&0)
    }

    fn advance(&mut self, n: usize) {
        for _ in 0..n {
            if self.pos >= self.bytes.len() {
                break;
            }
            if self.bytes[self.pos] == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.pos += 1;
        }
    }

    fn location(&self) -> FileLocation {
        FileLocation {
            file: self.list.file_path(self.file_index).to_string(),
            line: self.line,
            column: self.column,
        }
    }

    fn emit(&mut self, start: usize, line: u32, column: u32) {
        let lexeme = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("");
        if !lexeme.is_empty() {
            self.list.append(lexeme, self.file_index, line, column);
        }
    }

    fn run(&mut self) -> Result<(), InternalError> {
        while self.pos < self.bytes.len() {
            let c = self.peek(0);
            match c {
                b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c => {
                    self.advance(1);
                }
                b'/' if self.peek(1) == b'/' => {
                    while self.pos < self.bytes.len() && self.peek(0) != b'\n' {
                        self.advance(1);
                    }
                }
                b'/' if self.peek(1) == b'*' => {
                    self.advance(2);
                    while self.pos < self.bytes.len() && !(self.peek(0) == b'*' && self.peek(1) == b'/') {
                        self.advance(1);
                    }
                    self.advance(2);
                }
                b'#' if self.column == 1 => self.directive()?,
                b'"' => self.string_literal(None)?,
                b'\'' => self.char_literal(None)?,
                _ if c.is_ascii_digit() || (c == b'.' && self.peek(1).is_ascii_digit()) => {
                    self.number();
                }
                _ if c.is_ascii_alphabetic() || c == b'_' || c == b'$' || c >= 0x80 => {
                    self.name_or_prefixed_literal()?;
                }
                _ => self.operator(),
            }
        }
        Ok(())
    }

    /// `#line N "file"` and the GNU `# N "file"` form move the position
    /// bookkeeping; any other directive line is skipped whole.
    fn directive(&mut self) -> Result<(), InternalError> {
        let eol = self.bytes[self.pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|off| self.pos + off)
            .unwrap_or(self.bytes.len());
        let text = std::str::from_utf8(&self.bytes[self.pos..eol]).unwrap_or("");
        let rest = text
            .trim_start_matches('#')
            .trim_start()
            .strip_prefix("line")
            .map(str::trim_start)
            .or_else(|| {
                let r = text.trim_start_matches('#').trim_start();
                r.starts_with(|c: char| c.is_ascii_digit()).then_some(r)
            });
        if let Some(rest) = rest {
            let mut parts = rest.splitn(2, char::is_whitespace);
            if let Some(num) = parts.next().and_then(|n| n.parse::<u32>().ok()) {
                if let Some(name) = parts
                    .next()
                    .map(str::trim)
                    .and_then(|f| f.strip_prefix('"'))
                    .and_then(|f| f.split('"').next())
                {
                    self.file_index = self.list.add_file(name);
                }
                // Position the *next* line at `num`.
                while self.pos < eol {
                    self.advance(1);
                }
                self.advance(1);
                self.line = num;
                self.column = 1;
                return Ok(());
            }
        }
        while self.pos < eol {
            self.advance(1);
        }
        Ok(())
    }

    fn name_or_prefixed_literal(&mut self) -> Result<(), InternalError> {
        let start = self.pos;
        let (line, column) = (self.line, self.column);
        while self.pos < self.bytes.len() {
            let c = self.peek(0);
            if c.is_ascii_alphanumeric() || c == b'_' || c == b'$' || c >= 0x80 {
                self.advance(1);
            } else {
                break;
            }
        }
        let name = &self.bytes[start..self.pos];
        let is_prefix = matches!(name, b"L" | b"u" | b"U" | b"u8" | b"R" | b"LR" | b"uR" | b"UR" | b"u8R");
        if is_prefix && (self.peek(0) == b'"' || self.peek(0) == b'\'') {
            if self.peek(0) == b'"' {
                return self.string_literal(Some(start));
            }
            return self.char_literal(Some(start));
        }
        self.emit(start, line, column);
        Ok(())
    }

    fn string_literal(&mut self, prefix_start: Option<usize>) -> Result<(), InternalError> {
        let start = prefix_start.unwrap_or(self.pos);
        let column = self.column.saturating_sub((self.pos - start) as u32);
        let line = self.line;
        let raw = self.bytes[start..self.pos].ends_with(b"R");
        self.advance(1); // opening quote
        if raw {
            // R"delim( ... )delim"
            let delim_start = self.pos;
            while self.pos < self.bytes.len() && self.peek(0) != b'(' {
                self.advance(1);
            }
            let delim = self.bytes[delim_start..self.pos].to_vec();
            self.advance(1);
            loop {
                if self.pos >= self.bytes.len() {
                    return Err(InternalError::syntax("invalid raw string literal").at(self.location()));
                }
                if self.peek(0) == b')'
                    && self.bytes[self.pos + 1..].starts_with(&delim)
                    && self.bytes.get(self.pos + 1 + delim.len()) == Some(&b'"')
                {
                    self.advance(1 + delim.len() + 1);
                    break;
                }
                self.advance(1);
            }
        } else {
            loop {
                match self.peek(0) {
                    0 | b'\n' => {
                        return Err(
                            InternalError::syntax("unterminated string literal").at(self.location())
                        )
                    }
                    b'\\' => self.advance(2),
                    b'"' => {
                        self.advance(1);
                        break;
                    }
                    _ => self.advance(1),
                }
            }
        }
        self.emit(start, line, column);
        Ok(())
    }

    fn char_literal(&mut self, prefix_start: Option<usize>) -> Result<(), InternalError> {
        let start = prefix_start.unwrap_or(self.pos);
        let column = self.column.saturating_sub((self.pos - start) as u32);
        let line = self.line;
        self.advance(1);
        loop {
            match self.peek(0) {
                0 | b'\n' => {
                    return Err(
                        InternalError::syntax("unterminated character literal").at(self.location())
                    )
                }
                b'\\' => self.advance(2),
                b'\'' => {
                    self.advance(1);
                    break;
                }
                _ => self.advance(1),
            }
        }
        self.emit(start, line, column);
        Ok(())
    }

    /// C numbers: integer/float with radix prefixes, digit separators,
    /// exponents (`e`, `E` and hex `p`, `P`) and literal suffixes.
    fn number(&mut self) {
        let start = self.pos;
        let (line, column) = (self.line, self.column);
        while self.pos < self.bytes.len() {
            let c = self.peek(0);
            if c.is_ascii_alphanumeric() || c == b'.' || c == b'\'' || c == b'_' {
                let exp = matches!(c, b'e' | b'E' | b'p' | b'P');
                self.advance(1);
                if exp && matches!(self.peek(0), b'+' | b'-') {
                    self.advance(1);
                }
            } else {
                break;
            }
        }
        self.emit(start, line, column);
    }

    fn operator(&mut self) {
        let start = self.pos;
        let (line, column) = (self.line, self.column);
        let rest = &self.bytes[self.pos..];
        let len3 = THREE_CHAR_OPS.iter().any(|op| rest.starts_with(op.as_bytes()));
        if len3 {
            self.advance(3);
        } else {
            let two = &rest[..rest.len().min(2)];
            let len2 = TWO_CHAR_OPS.iter().any(|op| op.as_bytes() == two)
                || two == b"::"
                || two == b".*"
                || two == b"##";
            self.advance(if len2 { 2 } else { 1 });
        }
        self.emit(start, line, column);
    }
}
