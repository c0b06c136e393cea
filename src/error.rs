use std::fmt;

/// Severity of a reported diagnostic. Only `Error` carries abort
/// semantics; everything else accumulates through the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Style,
    Performance,
    Portability,
    Information,
    Debug,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Style => "style",
            Severity::Performance => "performance",
            Severity::Portability => "portability",
            Severity::Information => "information",
            Severity::Debug => "debug",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Certainty {
    Normal,
    Inconclusive,
}

/// One entry of a diagnostic call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A non-fatal diagnostic record handed to the [`ErrorLogger`].
#[derive(Debug, Clone)]
pub struct ErrorMessage {
    pub severity: Severity,
    pub id: String,
    pub msg: String,
    pub locations: Vec<FileLocation>,
    pub certainty: Certainty,
}

impl ErrorMessage {
    pub fn new(severity: Severity, id: &str, msg: impl Into<String>) -> Self {
        ErrorMessage {
            severity,
            id: id.to_string(),
            msg: msg.into(),
            locations: Vec::new(),
            certainty: Certainty::Normal,
        }
    }

    pub fn at(mut self, loc: FileLocation) -> Self {
        self.locations.push(loc);
        self
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(loc) = self.locations.first() {
            write!(f, "{}: ", loc)?;
        }
        write!(f, "({}) {} [{}]", self.severity.as_str(), self.msg, self.id)
    }
}

/// Sink for accumulated diagnostics. The tokenizer calls it at most once
/// per distinct diagnostic; implementations must tolerate concurrent
/// calls from different workers.
pub trait ErrorLogger {
    fn report(&mut self, msg: &ErrorMessage);
}

/// Logger that drops everything. Useful for callers that only care about
/// the phase result.
#[derive(Default)]
pub struct NullLogger;

impl ErrorLogger for NullLogger {
    fn report(&mut self, _msg: &ErrorMessage) {}
}

/// What class of failure aborted a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input cannot form a valid token stream under the chosen
    /// language and standard.
    Syntax,
    /// A name that is most likely an unconfigured macro.
    UnknownMacro,
    /// An invariant of the token list failed; indicates a bug.
    Internal,
}

impl ErrorKind {
    pub fn id(self) -> &'static str {
        match self {
            ErrorKind::Syntax => "syntaxError",
            ErrorKind::UnknownMacro => "unknownMacro",
            ErrorKind::Internal => "cppcheckError",
        }
    }
}

/// Fatal phase failure. Carries the location of the offending token when
/// one is known; the driver converts it into an [`ErrorMessage`] at the
/// phase boundary.
#[derive(Debug, Clone)]
pub struct InternalError {
    pub kind: ErrorKind,
    pub msg: String,
    pub location: Option<FileLocation>,
}

impl InternalError {
    pub fn syntax(msg: impl Into<String>) -> Self {
        InternalError {
            kind: ErrorKind::Syntax,
            msg: msg.into(),
            location: None,
        }
    }

    pub fn unknown_macro(msg: impl Into<String>) -> Self {
        InternalError {
            kind: ErrorKind::UnknownMacro,
            msg: msg.into(),
            location: None,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        InternalError {
            kind: ErrorKind::Internal,
            msg: msg.into(),
            location: None,
        }
    }

    pub fn at(mut self, loc: FileLocation) -> Self {
        self.location = Some(loc);
        self
    }

    pub fn to_message(&self) -> ErrorMessage {
        let mut m = ErrorMessage::new(Severity::Error, self.kind.id(), self.msg.clone());
        if let Some(loc) = &self.location {
            m.locations.push(loc.clone());
        }
        m
    }
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}: {} [{}]", loc, self.msg, self.kind.id()),
            None => write!(f, "{} [{}]", self.msg, self.kind.id()),
        }
    }
}

impl std::error::Error for InternalError {}

/// Per-phase diagnostic context: the logger plus the settings flags that
/// gate which records are worth emitting.
pub struct Reporter<'a> {
    pub logger: &'a mut dyn ErrorLogger,
    pub debug_warnings: bool,
}

impl<'a> Reporter<'a> {
    pub fn new(logger: &'a mut dyn ErrorLogger, debug_warnings: bool) -> Self {
        Reporter {
            logger,
            debug_warnings,
        }
    }

    pub fn report(&mut self, msg: ErrorMessage) {
        self.logger.report(&msg);
    }

    /// Debug records are suppressed unless debug warnings are enabled.
    pub fn debug(&mut self, id: &str, msg: impl Into<String>, loc: Option<FileLocation>) {
        if !self.debug_warnings {
            return;
        }
        let mut m = ErrorMessage::new(Severity::Debug, id, msg);
        if let Some(loc) = loc {
            m.locations.push(loc);
        }
        self.logger.report(&m);
    }

    pub fn portability(&mut self, id: &str, msg: impl Into<String>, loc: Option<FileLocation>) {
        let mut m = ErrorMessage::new(Severity::Portability, id, msg);
        if let Some(loc) = loc {
            m.locations.push(loc);
        }
        self.logger.report(&m);
    }

    pub fn information(&mut self, id: &str, msg: impl Into<String>, loc: Option<FileLocation>) {
        let mut m = ErrorMessage::new(Severity::Information, id, msg);
        if let Some(loc) = loc {
            m.locations.push(loc);
        }
        self.logger.report(&m);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CollectingLogger(Vec<ErrorMessage>);

    impl ErrorLogger for CollectingLogger {
        fn report(&mut self, msg: &ErrorMessage) {
            self.0.push(msg.clone());
        }
    }

    #[test]
    fn internal_error_display_includes_location() {
        let err = InternalError::syntax("syntax error").at(FileLocation {
            file: "a.c".to_string(),
            line: 3,
            column: 7,
        });
        assert_eq!(format!("{}", err), "a.c:3:7: syntax error [syntaxError]");
    }

    #[test]
    fn error_kinds_map_to_stable_ids() {
        assert_eq!(ErrorKind::Syntax.id(), "syntaxError");
        assert_eq!(ErrorKind::UnknownMacro.id(), "unknownMacro");
        assert_eq!(ErrorKind::Internal.id(), "cppcheckError");
    }

    #[test]
    fn reporter_suppresses_debug_without_flag() {
        let mut logger = CollectingLogger(Vec::new());
        {
            let mut rep = Reporter::new(&mut logger, false);
            rep.debug("simplifyTypedef", "skipped", None);
        }
        assert!(logger.0.is_empty());
    }

    #[test]
    fn reporter_emits_debug_with_flag() {
        let mut logger = CollectingLogger(Vec::new());
        {
            let mut rep = Reporter::new(&mut logger, true);
            rep.debug("simplifyUsing", "skipped", None);
        }
        assert_eq!(logger.0.len(), 1);
        assert_eq!(logger.0[0].severity, Severity::Debug);
        assert_eq!(logger.0[0].id, "simplifyUsing");
    }

    #[test]
    fn message_display_is_compact() {
        let m = ErrorMessage::new(Severity::Portability, "nonStandardCharLiteral", "multi-character literal").at(
            FileLocation {
                file: "x.cpp".to_string(),
                line: 1,
                column: 5,
            },
        );
        assert_eq!(
            format!("{}", m),
            "x.cpp:1:5: (portability) multi-character literal [nonStandardCharLiteral]"
        );
    }
}
