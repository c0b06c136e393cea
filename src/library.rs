use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::Deserialize;

/// Signedness of a configured POD type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodSign {
    Signed,
    Unsigned,
    Unknown,
}

impl Default for PodSign {
    fn default() -> Self {
        PodSign::Unknown
    }
}

/// A platform-defined scalar type (`uint32_t`, `DWORD`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PodType {
    pub size: u32,
    #[serde(default)]
    pub sign: PodSign,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct FunctionConfig {
    #[serde(default)]
    noreturn: bool,
    #[serde(default)]
    r#const: bool,
    #[serde(default)]
    pure: bool,
}

#[derive(Debug, Deserialize, Default)]
struct LibraryFile {
    #[serde(default)]
    podtypes: HashMap<String, PodType>,
    #[serde(default)]
    functions: HashMap<String, FunctionConfig>,
    #[serde(default)]
    markup_extensions: HashSet<String>,
}

/// External knowledge about functions and types that are not declared in
/// the analyzed code itself. Loaded from JSON configuration files; an
/// empty library answers "unknown" to everything.
#[derive(Debug, Default)]
pub struct Library {
    podtypes: HashMap<String, PodType>,
    functions: HashMap<String, FunctionConfig>,
    markup_extensions: HashSet<String>,
}

#[derive(Debug)]
pub enum LibraryError {
    Io(std::io::Error),
    Format(serde_json::Error),
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::Io(e) => write!(f, "failed to read library file: {}", e),
            LibraryError::Format(e) => write!(f, "malformed library file: {}", e),
        }
    }
}

impl std::error::Error for LibraryError {}

impl Library {
    /// Merge one JSON configuration file into this library. Later files
    /// override earlier entries of the same name.
    pub fn load_file(&mut self, path: &Path) -> Result<(), LibraryError> {
        let text = std::fs::read_to_string(path).map_err(LibraryError::Io)?;
        self.load_str(&text)
    }

    pub fn load_str(&mut self, text: &str) -> Result<(), LibraryError> {
        let file: LibraryFile = serde_json::from_str(text).map_err(LibraryError::Format)?;
        self.podtypes.extend(file.podtypes);
        self.functions.extend(file.functions);
        self.markup_extensions.extend(file.markup_extensions);
        Ok(())
    }

    pub fn podtype(&self, name: &str) -> Option<PodType> {
        self.podtypes.get(name).copied()
    }

    /// Whether calling `name` never returns (`exit`, `abort`, ...).
    pub fn is_noreturn(&self, name: &str) -> bool {
        self.functions.get(name).map_or(false, |f| f.noreturn)
    }

    /// Whether `name` is configured at all. Unconfigured names are
    /// candidates for `checkLibraryNoReturn` information diagnostics.
    pub fn is_not_library_function(&self, name: &str) -> bool {
        !self.functions.contains_key(name)
    }

    pub fn is_function_const(&self, name: &str, pure: bool) -> bool {
        match self.functions.get(name) {
            Some(f) if pure => f.pure,
            Some(f) => f.r#const,
            None => false,
        }
    }

    /// Markup files (e.g. `.qml`) are tokenized but not simplified.
    pub fn markup_file(&self, path: &str) -> bool {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |ext| self.markup_extensions.contains(ext))
    }

    /// Whether the block ending at `end` (a `}`) finishes with a call to
    /// a configured noreturn function, so control never falls out of it.
    pub fn is_scope_noreturn(&self, list: &crate::tokenlist::TokenList, end: crate::token::TokenId) -> bool {
        let name = list
            .prev(end)
            .filter(|&s| list.is(s, ";"))
            .and_then(|s| list.prev(s))
            .filter(|&c| list.is(c, ")"))
            .and_then(|c| list.link_of(c))
            .and_then(|open| list.prev(open));
        match name {
            Some(n) => self.is_noreturn(list.str(n)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "podtypes": {
            "uint32_t": { "size": 4, "sign": "unsigned" },
            "ssize_t": { "size": 8, "sign": "signed" }
        },
        "functions": {
            "exit": { "noreturn": true },
            "strlen": { "pure": true },
            "getenv": { "const": false }
        },
        "markup_extensions": ["qml"]
    }"#;

    #[test]
    fn podtype_lookup() {
        let mut lib = Library::default();
        lib.load_str(CONFIG).unwrap();
        let t = lib.podtype("uint32_t").unwrap();
        assert_eq!(t.size, 4);
        assert_eq!(t.sign, PodSign::Unsigned);
        assert!(lib.podtype("socklen_t").is_none());
    }

    #[test]
    fn noreturn_and_unknown_functions() {
        let mut lib = Library::default();
        lib.load_str(CONFIG).unwrap();
        assert!(lib.is_noreturn("exit"));
        assert!(!lib.is_noreturn("strlen"));
        assert!(lib.is_not_library_function("frobnicate"));
        assert!(!lib.is_not_library_function("getenv"));
    }

    #[test]
    fn const_and_pure_are_separate_questions() {
        let mut lib = Library::default();
        lib.load_str(CONFIG).unwrap();
        assert!(lib.is_function_const("strlen", true));
        assert!(!lib.is_function_const("strlen", false));
        assert!(!lib.is_function_const("unknown", true));
    }

    #[test]
    fn markup_file_matches_extension() {
        let mut lib = Library::default();
        lib.load_str(CONFIG).unwrap();
        assert!(lib.markup_file("ui/main.qml"));
        assert!(!lib.markup_file("src/main.cpp"));
    }

    #[test]
    fn later_files_override_earlier_entries() {
        let mut lib = Library::default();
        lib.load_str(r#"{ "podtypes": { "word": { "size": 2 } } }"#).unwrap();
        lib.load_str(r#"{ "podtypes": { "word": { "size": 4 } } }"#).unwrap();
        assert_eq!(lib.podtype("word").unwrap().size, 4);
    }

    #[test]
    fn load_file_reads_from_disk() {
        use std::io::Write;
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(CONFIG.as_bytes()).unwrap();
        let mut lib = Library::default();
        lib.load_file(tmp.path()).unwrap();
        assert!(lib.is_noreturn("exit"));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let mut lib = Library::default();
        assert!(matches!(
            lib.load_str("{ not json"),
            Err(LibraryError::Format(_))
        ));
    }

    #[test]
    fn scope_ending_in_a_noreturn_call() {
        use crate::settings::Language;
        use crate::tokenlist::TokenList;
        let mut lib = Library::default();
        lib.load_str(CONFIG).unwrap();
        let mut list = TokenList::new(Language::C);
        list.create_tokens("void f ( ) { exit ( 1 ) ; }", "x.c").unwrap();
        crate::linker::create_links(&mut list).unwrap();
        let end = list.tail().unwrap();
        assert!(lib.is_scope_noreturn(&list, end));
        let mut list = TokenList::new(Language::C);
        list.create_tokens("void f ( ) { g ( ) ; }", "x.c").unwrap();
        crate::linker::create_links(&mut list).unwrap();
        let end = list.tail().unwrap();
        assert!(!lib.is_scope_noreturn(&list, end));
    }
}
