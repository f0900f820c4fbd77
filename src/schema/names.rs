use std::borrow::Cow;

/// Identifiers that cannot be used as names in generated code.
const RESERVED: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl",
    "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub",
    "ref", "return", "self", "static", "struct", "super", "trait", "true", "try", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

const RESERVED_SUFFIX: &str = "_";

pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// Maps a protocol name to a name that can be used as an identifier.
///
/// Only the generated identifier changes; opcodes and layouts never depend on it.
pub fn safe_name(name: &str) -> Cow<'_, str> {
    match is_reserved(name) {
        true => Cow::Owned(format!("{name}{RESERVED_SUFFIX}")),
        false => Cow::Borrowed(name),
    }
}

pub fn to_camel(s: &str) -> String {
    let mut last_was_underscore = true;
    let mut res = String::new();
    for mut b in s.as_bytes().iter().copied() {
        if b == b'_' {
            last_was_underscore = true;
        } else {
            if last_was_underscore {
                b = b.to_ascii_uppercase()
            }
            res.push(b as char);
            last_was_underscore = false;
        }
    }
    res
}

pub fn to_upper(s: &str) -> String {
    s.to_ascii_uppercase()
}
