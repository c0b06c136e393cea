use crate::library::Library;

/// Source language of the translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    C,
    Cpp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CStandard {
    C89,
    C99,
    C11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CppStandard {
    Cpp03,
    Cpp11,
    Cpp14,
    Cpp17,
    Cpp20,
}

/// Standard levels for both languages. A translation unit is analyzed
/// with the level of its own language; the other one is carried so that
/// headers shared between C and C++ code can be classified consistently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Standards {
    pub c: CStandard,
    pub cpp: CppStandard,
}

impl Default for Standards {
    fn default() -> Self {
        Standards {
            c: CStandard::C11,
            cpp: CppStandard::Cpp20,
        }
    }
}

impl Standards {
    pub fn parse(name: &str) -> Option<Standards> {
        let mut std = Standards::default();
        match name {
            "c89" => std.c = CStandard::C89,
            "c99" => std.c = CStandard::C99,
            "c11" => std.c = CStandard::C11,
            "c++03" => std.cpp = CppStandard::Cpp03,
            "c++11" => std.cpp = CppStandard::Cpp11,
            "c++14" => std.cpp = CppStandard::Cpp14,
            "c++17" => std.cpp = CppStandard::Cpp17,
            "c++20" => std.cpp = CppStandard::Cpp20,
            _ => return None,
        }
        Some(std)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformType {
    Unspecified,
    Native,
    Unix32,
    Unix64,
    Win32A,
    Win32W,
    Win64,
}

/// Type sizes of the target platform, in bytes except `char_bit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub platform_type: PlatformType,
    pub sizeof_bool: u32,
    pub sizeof_short: u32,
    pub sizeof_int: u32,
    pub sizeof_long: u32,
    pub sizeof_long_long: u32,
    pub sizeof_float: u32,
    pub sizeof_double: u32,
    pub sizeof_long_double: u32,
    pub sizeof_wchar_t: u32,
    pub sizeof_size_t: u32,
    pub sizeof_pointer: u32,
    pub char_bit: u32,
}

impl Platform {
    pub fn unix32() -> Self {
        Platform {
            platform_type: PlatformType::Unix32,
            sizeof_bool: 1,
            sizeof_short: 2,
            sizeof_int: 4,
            sizeof_long: 4,
            sizeof_long_long: 8,
            sizeof_float: 4,
            sizeof_double: 8,
            sizeof_long_double: 12,
            sizeof_wchar_t: 4,
            sizeof_size_t: 4,
            sizeof_pointer: 4,
            char_bit: 8,
        }
    }

    pub fn unix64() -> Self {
        Platform {
            platform_type: PlatformType::Unix64,
            sizeof_long: 8,
            sizeof_long_double: 16,
            sizeof_size_t: 8,
            sizeof_pointer: 8,
            ..Platform::unix32()
        }
    }

    pub fn win32a() -> Self {
        Platform {
            platform_type: PlatformType::Win32A,
            sizeof_long_double: 8,
            sizeof_wchar_t: 2,
            ..Platform::unix32()
        }
    }

    pub fn win32w() -> Self {
        Platform {
            platform_type: PlatformType::Win32W,
            ..Platform::win32a()
        }
    }

    pub fn win64() -> Self {
        Platform {
            platform_type: PlatformType::Win64,
            sizeof_long: 4,
            sizeof_long_double: 8,
            sizeof_wchar_t: 2,
            sizeof_size_t: 8,
            sizeof_pointer: 8,
            ..Platform::unix64()
        }
    }

    /// Host platform sizes.
    pub fn native() -> Self {
        Platform {
            platform_type: PlatformType::Native,
            sizeof_bool: std::mem::size_of::<bool>() as u32,
            sizeof_short: std::mem::size_of::<std::os::raw::c_short>() as u32,
            sizeof_int: std::mem::size_of::<std::os::raw::c_int>() as u32,
            sizeof_long: std::mem::size_of::<std::os::raw::c_long>() as u32,
            sizeof_long_long: std::mem::size_of::<std::os::raw::c_longlong>() as u32,
            sizeof_float: 4,
            sizeof_double: 8,
            sizeof_long_double: std::mem::size_of::<std::os::raw::c_double>() as u32,
            sizeof_wchar_t: 4,
            sizeof_size_t: std::mem::size_of::<usize>() as u32,
            sizeof_pointer: std::mem::size_of::<*const u8>() as u32,
            char_bit: 8,
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::native()
    }
}

/// Immutable analysis configuration shared by every phase. One instance
/// may serve many translation units; nothing in here is mutated by the
/// tokenizer.
pub struct Settings {
    pub standards: Standards,
    pub platform: Platform,
    pub library: Library,
    pub debug_warnings: bool,
    pub check_headers: bool,
    pub check_unused_templates: bool,
    /// Report unconfigured library functions (`checkLibraryNoReturn`).
    pub check_library: bool,
    pub verbose: bool,
    pub xml: bool,
    pub daca: bool,
    /// Upper bound on case labels materialized from a `case A ... B:`
    /// range.
    pub max_case_range: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            standards: Standards::default(),
            platform: Platform::default(),
            library: Library::default(),
            debug_warnings: false,
            check_headers: true,
            check_unused_templates: true,
            check_library: false,
            verbose: false,
            xml: false,
            daca: false,
            max_case_range: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standards_parse_accepts_both_families() {
        let std = Standards::parse("c99").unwrap();
        assert_eq!(std.c, CStandard::C99);
        let std = Standards::parse("c++14").unwrap();
        assert_eq!(std.cpp, CppStandard::Cpp14);
        assert!(Standards::parse("c++23x").is_none());
    }

    #[test]
    fn standard_levels_are_ordered() {
        assert!(CppStandard::Cpp11 < CppStandard::Cpp17);
        assert!(CStandard::C89 < CStandard::C11);
    }

    #[test]
    fn win64_is_llp64() {
        let p = Platform::win64();
        assert_eq!(p.sizeof_long, 4);
        assert_eq!(p.sizeof_pointer, 8);
        assert_eq!(p.sizeof_size_t, 8);
    }

    #[test]
    fn unix64_is_lp64() {
        let p = Platform::unix64();
        assert_eq!(p.sizeof_long, 8);
        assert_eq!(p.sizeof_int, 4);
        assert_eq!(p.sizeof_pointer, 8);
    }

    #[test]
    fn default_settings_cap_case_ranges() {
        assert_eq!(Settings::default().max_case_range, 50);
    }
}
