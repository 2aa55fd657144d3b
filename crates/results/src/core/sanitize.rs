use std::fmt::Write;

/// Turns arbitrary text into a representation that is safe to store and render.
pub trait TextSanitizer: Send + Sync {
    fn safe(&self, text: &str) -> String;
}

/// Default sanitizer: escapes control characters as `\xNN`, keeping tabs and
/// line breaks intact.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafeStr;

impl TextSanitizer for SafeStr {
    fn safe(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '\n' | '\r' | '\t' => out.push(c),
                c if c.is_control() => {
                    let _ = write!(out, "\\x{:02x}", c as u32);
                }
                c => out.push(c),
            }
        }
        out
    }
}
