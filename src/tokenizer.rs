//! The driver: `tokenize` ingests preprocessed input, `simplify_tokens1`
//! produces the canonical list, `simplify_tokens2` applies the
//! aggressive rewrites some analyses opt into.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::astbuild;
use crate::dump;
use crate::error::{ErrorLogger, ErrorMessage, InternalError, Reporter, Severity};
use crate::garbage;
use crate::linker;
use crate::matcher::Matcher;
use crate::scope::ScopeArena;
use crate::settings::Settings;
use crate::simplify;
use crate::token::TokenKind;
use crate::tokenlist::{RawToken, TokenList};
use crate::typedef::{TypedefInfo, TypedefSimplifier};
use crate::using;
use crate::varid;

/// Progress sink, called from the long-running inner loops. Must be
/// reentrancy-safe; serialization across workers is the caller's job.
pub trait ReportProgress {
    fn report_progress(&mut self, file: &str, stage: &str, value: u8);
}

/// Cooperative cancellation: a process-wide flag plus an optional
/// deadline, polled at phase boundaries and inside the expander loops.
#[derive(Clone, Default)]
pub struct Cancel {
    flag: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl Cancel {
    pub fn flag(flag: Arc<AtomicBool>) -> Self {
        Cancel {
            flag: Some(flag),
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn is_set(&self) -> bool {
        if let Some(flag) = &self.flag {
            if flag.load(Ordering::Relaxed) {
                return true;
            }
        }
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }
}

pub struct Tokenizer<'s> {
    pub list: TokenList,
    settings: &'s Settings,
    matcher: Matcher,
    logger: Box<dyn ErrorLogger>,
    progress: Option<Box<dyn ReportProgress>>,
    cancel: Cancel,
    /// Counter behind the `Unnamed%` synthetic aggregate names.
    unnamed_counter: u32,
    typedef_info: Vec<TypedefInfo>,
    scopes: Option<ScopeArena>,
    source_file: String,
}

impl<'s> Tokenizer<'s> {
    pub fn new(settings: &'s Settings, lang: crate::settings::Language, logger: Box<dyn ErrorLogger>) -> Self {
        Tokenizer {
            list: TokenList::with_standards(lang, settings.standards),
            settings,
            matcher: Matcher::new(),
            logger,
            progress: None,
            cancel: Cancel::default(),
            unnamed_counter: 0,
            typedef_info: Vec::new(),
            scopes: None,
            source_file: String::new(),
        }
    }

    pub fn set_cancel(&mut self, cancel: Cancel) {
        self.cancel = cancel;
    }

    pub fn set_progress(&mut self, progress: Box<dyn ReportProgress>) {
        self.progress = Some(progress);
    }

    pub fn typedef_info(&self) -> &[TypedefInfo] {
        &self.typedef_info
    }

    pub fn scopes(&self) -> Option<&ScopeArena> {
        self.scopes.as_ref()
    }

    /// Ingest raw preprocessed text.
    pub fn tokenize(&mut self, code: &str, file: &str, config: &str) -> Result<(), InternalError> {
        self.source_file = file.to_string();
        self.list.set_config(config);
        match self.list.create_tokens(code, file) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Ingest an upstream pre-tokenized stream. Produces the same
    /// canonical list as [`Tokenizer::tokenize`] over equivalent input.
    pub fn tokenize_stream<'a>(
        &mut self,
        tokens: impl IntoIterator<Item = RawToken<'a>>,
        file: &str,
        config: &str,
    ) {
        self.source_file = file.to_string();
        self.list.set_config(config);
        self.list.add_file(file);
        self.list.append_pretokenized(tokens);
    }

    fn report_stage(&mut self, stage: &str, value: u8) {
        if let Some(progress) = &mut self.progress {
            progress.report_progress(&self.source_file, stage, value);
        }
    }

    /// Convert a fatal error into a diagnostic, dumping the partial list
    /// when debug warnings are enabled.
    fn fail(&mut self, err: &InternalError) {
        if self.settings.debug_warnings {
            let mut out = String::new();
            if dump::dump(&self.list, &mut out).is_ok() {
                let msg = ErrorMessage::new(Severity::Debug, "debug", out);
                self.logger.report(&msg);
            }
        }
        self.logger.report(&err.to_message());
    }

    /// The canonicalization phase. Returns `Ok(false)` on cancellation
    /// or empty input; fatal errors are logged and resurfaced.
    pub fn simplify_tokens1(&mut self) -> Result<bool, InternalError> {
        match self.run_simplify_tokens1() {
            Ok(done) => Ok(done),
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn run_simplify_tokens1(&mut self) -> Result<bool, InternalError> {
        if self.list.head().is_none() {
            return Ok(false);
        }
        if self.settings.library.markup_file(&self.source_file) {
            // Markup files are tokenized but never simplified.
            return Ok(true);
        }

        self.report_stage("tokenize", 0);
        linker::split_right_angle_brackets(&mut self.list);
        simplify::simplify_attributes(&mut self.list, &self.matcher);
        simplify::simplify_pragmas(&mut self.list);
        simplify::combine_operators(&mut self.list);
        simplify::concatenate_negative_numbers(&mut self.list);

        linker::create_links(&mut self.list)?;
        garbage::find_garbage_code(&self.list, &self.matcher, self.settings)?;
        if self.cancel.is_set() {
            return Ok(false);
        }

        // Group 1: macro debris.
        simplify::simplify_extern_c(&mut self.list, &self.matcher);
        simplify::simplify_calling_conventions(&mut self.list);
        simplify::simplify_qt_and_borland(&mut self.list, &self.matcher);
        // Group 2: lexical combinations.
        simplify::simplify_alternative_tokens(&mut self.list, &self.matcher);
        // Group 3: structural canonicalization.
        simplify::simplify_statement_expressions(&mut self.list, &self.matcher);
        simplify::simplify_case_ranges(&mut self.list, &self.matcher, self.settings);
        simplify::simplify_commutative_subscript(&mut self.list, &self.matcher);
        simplify::simplify_pointer_sugar(&mut self.list, &self.matcher);
        if self.cancel.is_set() {
            return Ok(false);
        }

        // Group 4: declarations.
        self.report_stage("typedef", 20);
        simplify::simplify_static_const(&mut self.list, &self.matcher);
        simplify::simplify_knr_parameters(&mut self.list, &self.matcher);
        loop {
            let cancel = self.cancel.clone();
            let mut rep = Reporter::new(&mut *self.logger, self.settings.debug_warnings);
            let changed_using =
                using::simplify_using(&mut self.list, &self.matcher, &mut rep, || cancel.is_set())?;
            let mut expander = TypedefSimplifier::new(&self.matcher, &mut self.unnamed_counter);
            expander.simplify(&mut self.list, &mut rep, || cancel.is_set())?;
            self.typedef_info.extend(expander.infos);
            if self.cancel.is_set() {
                return Ok(false);
            }
            if !changed_using {
                break;
            }
        }
        simplify::split_var_declarations(&mut self.list, &self.matcher);
        simplify::split_ctor_initializers(&mut self.list, &self.matcher);

        // Variable identities, then the template angle links that depend
        // on them.
        self.report_stage("varid", 50);
        varid::set_var_ids(&mut self.list, &self.matcher)?;
        linker::create_links2(&mut self.list)?;
        if self.cancel.is_set() {
            return Ok(false);
        }

        // Group 5: expression normalization.
        simplify::simplify_not_bool(&mut self.list, &self.matcher);
        simplify::simplify_const_ternary(&mut self.list, &self.matcher);
        simplify::simplify_calculations(&mut self.list, &self.matcher);
        simplify::expand_compound_assignment(&mut self.list, &self.matcher);
        simplify::mark_casts(&mut self.list, &self.matcher);
        // Group 6: control flow shape.
        simplify::add_braces(&mut self.list)?;
        simplify::simplify_const_conditions(&mut self.list, &self.matcher);
        simplify::extract_condition_init(&mut self.list, &self.matcher);
        simplify::parenthesize_assignment_conditions(&mut self.list, &self.matcher);
        // Group 7: dead statements.
        simplify::eliminate_dead_code(&mut self.list, &self.matcher, self.settings);
        if self.cancel.is_set() {
            return Ok(false);
        }
        // Group 8: known values.
        self.report_stage("simplify", 80);
        simplify::propagate_known_values(&mut self.list, &self.matcher);

        self.scopes = Some(crate::scope::build_scopes(&mut self.list));
        astbuild::build_ast(&mut self.list);

        garbage::find_garbage_code(&self.list, &self.matcher, self.settings)?;
        self.list.check_links()?;

        {
            let mut rep = Reporter::new(&mut *self.logger, self.settings.debug_warnings);
            simplify::check_char_literals(&self.list, &mut rep);
            simplify::check_macro_with_semicolon(&self.list, &self.matcher, &mut rep);
            simplify::check_class_macros(&self.list, &self.matcher, &mut rep);
        }
        if self.settings.check_library {
            self.check_library_noreturn();
        }
        self.report_stage("done", 100);
        Ok(true)
    }

    /// Aggressive second phase, run on demand by analyses that benefit:
    /// cast removal, pointer sugar, literal folding, compound-assignment
    /// expansion, member-access canonicalization, AST rebuild.
    pub fn simplify_tokens2(&mut self) -> Result<bool, InternalError> {
        match self.run_simplify_tokens2() {
            Ok(done) => Ok(done),
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn run_simplify_tokens2(&mut self) -> Result<bool, InternalError> {
        if self.cancel.is_set() {
            return Ok(false);
        }
        self.list.clear_ast();
        simplify::remove_casts(&mut self.list);
        simplify::simplify_pointer_sugar(&mut self.list, &self.matcher);
        simplify::arrow_to_dot(&mut self.list);
        simplify::simplify_calculations(&mut self.list, &self.matcher);
        simplify::expand_compound_assignment(&mut self.list, &self.matcher);
        if self.cancel.is_set() {
            return Ok(false);
        }
        simplify::mark_casts(&mut self.list, &self.matcher);
        astbuild::build_ast(&mut self.list);
        self.list.check_links()?;
        Ok(true)
    }

    /// `f ( ) ;` as the last statement of a block, with `f` unknown to
    /// the library: worth configuring, it may be noreturn.
    fn check_library_noreturn(&mut self) {
        let mut findings = Vec::new();
        for t in self.list.iter() {
            if self.list.get(t).kind != TokenKind::Name {
                continue;
            }
            if !self.matcher.matches(&self.list, self.list.next(t), "( ) ; }") {
                continue;
            }
            let name = self.list.str(t);
            if self.settings.library.is_not_library_function(name) {
                findings.push(
                    ErrorMessage::new(
                        Severity::Information,
                        "checkLibraryNoReturn",
                        format!("--check-library: The configuration for function {} is missing.", name),
                    )
                    .at(self.list.location(t)),
                );
            }
        }
        for msg in findings {
            self.logger.report(&msg);
        }
    }

    /// XML dump of the canonical list, on explicit request only.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = dump::dump(&self.list, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NullLogger;
    use crate::settings::Language;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn canonical(code: &str) -> String {
        let settings = Settings::default();
        let mut tokenizer = Tokenizer::new(&settings, Language::Cpp, Box::new(NullLogger));
        tokenizer.tokenize(code, "test.cpp", "").unwrap();
        assert!(tokenizer.simplify_tokens1().unwrap());
        tokenizer.list.stringify()
    }

    #[test]
    fn pipeline_runs_end_to_end() {
        assert_eq!(
            canonical("int a=3, *b=&a, c[4];"),
            "int a = 3 ; int * b = & a ; int c [ 4 ] ;"
        );
    }

    #[test]
    fn empty_input_returns_false() {
        let settings = Settings::default();
        let mut tokenizer = Tokenizer::new(&settings, Language::Cpp, Box::new(NullLogger));
        tokenizer.tokenize("", "empty.cpp", "").unwrap();
        assert!(!tokenizer.simplify_tokens1().unwrap());
    }

    #[test]
    fn cancellation_returns_false_without_mutation_races() {
        let settings = Settings::default();
        let mut tokenizer = Tokenizer::new(&settings, Language::Cpp, Box::new(NullLogger));
        let flag = Arc::new(AtomicBool::new(true));
        tokenizer.set_cancel(Cancel::flag(flag));
        tokenizer.tokenize("int x ;", "c.cpp", "").unwrap();
        assert!(!tokenizer.simplify_tokens1().unwrap());
        tokenizer.list.check_links().unwrap();
    }

    #[test]
    fn cancellation_after_the_fact_stops_phase_two() {
        let settings = Settings::default();
        let mut tokenizer = Tokenizer::new(&settings, Language::Cpp, Box::new(NullLogger));
        let flag = Arc::new(AtomicBool::new(false));
        tokenizer.set_cancel(Cancel::flag(flag.clone()));
        tokenizer.tokenize("int x ; x = 1 ;", "c.cpp", "").unwrap();
        assert!(tokenizer.simplify_tokens1().unwrap());
        flag.store(true, Ordering::Relaxed);
        assert!(!tokenizer.simplify_tokens2().unwrap());
    }

    #[test]
    fn syntax_errors_are_logged_and_resurfaced() {
        struct Collect(Rc<RefCell<Vec<ErrorMessage>>>);
        impl ErrorLogger for Collect {
            fn report(&mut self, msg: &ErrorMessage) {
                self.0.borrow_mut().push(msg.clone());
            }
        }
        let sink = Rc::new(RefCell::new(Vec::new()));
        let settings = Settings::default();
        let mut tokenizer =
            Tokenizer::new(&settings, Language::Cpp, Box::new(Collect(sink.clone())));
        tokenizer.tokenize("void f ( ) {", "bad.cpp", "").unwrap();
        let err = tokenizer.simplify_tokens1().unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Syntax);
        assert!(sink.borrow().iter().any(|m| m.id == "syntaxError"));
    }

    #[test]
    fn progress_is_reported_in_order() {
        struct Stages(Rc<RefCell<Vec<(String, u8)>>>);
        impl ReportProgress for Stages {
            fn report_progress(&mut self, _file: &str, stage: &str, value: u8) {
                self.0.borrow_mut().push((stage.to_string(), value));
            }
        }
        let stages = Rc::new(RefCell::new(Vec::new()));
        let settings = Settings::default();
        let mut tokenizer = Tokenizer::new(&settings, Language::Cpp, Box::new(NullLogger));
        tokenizer.set_progress(Box::new(Stages(stages.clone())));
        tokenizer.tokenize("int x ;", "p.cpp", "").unwrap();
        tokenizer.simplify_tokens1().unwrap();
        let seen = stages.borrow();
        assert!(seen.len() >= 2);
        assert!(seen.windows(2).all(|w| w[0].1 <= w[1].1));
        assert_eq!(seen.last().map(|s| s.1), Some(100));
    }

    #[test]
    fn simplify_tokens2_removes_casts_and_arrows() {
        let settings = Settings::default();
        let mut tokenizer = Tokenizer::new(&settings, Language::Cpp, Box::new(NullLogger));
        tokenizer
            .tokenize("void f ( ) { x = ( int ) p -> m ; }", "t.cpp", "")
            .unwrap();
        tokenizer.simplify_tokens1().unwrap();
        tokenizer.simplify_tokens2().unwrap();
        assert_eq!(tokenizer.list.stringify(), "void f ( ) { x = p . m ; }");
    }

    #[test]
    fn dump_is_produced_on_request_only() {
        let settings = Settings::default();
        let mut tokenizer = Tokenizer::new(&settings, Language::Cpp, Box::new(NullLogger));
        tokenizer.tokenize("int x ;", "d.cpp", "").unwrap();
        tokenizer.simplify_tokens1().unwrap();
        let xml = tokenizer.dump();
        assert!(xml.contains("<tokenlist>"));
        assert!(xml.contains("str=\"x\""));
    }

    #[test]
    fn check_library_noreturn_information() {
        struct Collect(Rc<RefCell<Vec<ErrorMessage>>>);
        impl ErrorLogger for Collect {
            fn report(&mut self, msg: &ErrorMessage) {
                self.0.borrow_mut().push(msg.clone());
            }
        }
        let sink = Rc::new(RefCell::new(Vec::new()));
        let mut settings = Settings::default();
        settings.check_library = true;
        let mut tokenizer =
            Tokenizer::new(&settings, Language::Cpp, Box::new(Collect(sink.clone())));
        tokenizer
            .tokenize("void f ( ) { mystery ( ) ; }", "lib.cpp", "")
            .unwrap();
        tokenizer.simplify_tokens1().unwrap();
        assert!(sink
            .borrow()
            .iter()
            .any(|m| m.id == "checkLibraryNoReturn" && m.severity == Severity::Information));
    }

    #[test]
    fn pretokenized_and_raw_ingestion_converge() {
        let settings = Settings::default();
        let mut a = Tokenizer::new(&settings, Language::Cpp, Box::new(NullLogger));
        a.tokenize("int x = 1 + 2 ;", "s.cpp", "").unwrap();
        a.simplify_tokens1().unwrap();

        let mut b = Tokenizer::new(&settings, Language::Cpp, Box::new(NullLogger));
        let lexemes = ["int", "x", "=", "1", "+", "2", ";"];
        b.tokenize_stream(
            lexemes.iter().enumerate().map(|(i, &lexeme)| RawToken {
                lexeme,
                file_index: 0,
                line: 1,
                column: 1 + 2 * i as u32,
                expanded_macro: false,
            }),
            "s.cpp",
            "",
        );
        b.simplify_tokens1().unwrap();
        assert_eq!(a.list.stringify(), b.list.stringify());
    }
}
