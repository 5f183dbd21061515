//! Printing traversal results.

use std::ffi::OsStr;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::Path;

/// Render a name for a terminal, one line per name.
///
/// Control characters become `\n`, `\r`, `\t` or `\xNN`, and bytes that are
/// not valid UTF-8 become `\xNN`, so a crafted name can neither inject
/// terminal sequences nor be confused with a different name.
pub fn escape_os_str(name: &OsStr) -> String {
    let mut bytes = name.as_encoded_bytes();
    let mut out = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(text) => {
                push_text(&mut out, text);
                return out;
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                push_text(&mut out, std::str::from_utf8(valid).unwrap_or_default());
                let invalid = e.error_len().unwrap_or(rest.len());
                for byte in &rest[..invalid] {
                    let _ = write!(out, "\\x{byte:02X}");
                }
                bytes = &rest[invalid..];
            }
        }
    }
}

fn push_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // Cc is U+0000..=U+001F and U+007F..=U+009F, so two hex digits suffice.
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
}

/// Text to print for `file`: relative to `root` when asked and possible.
pub fn display_path(file: &Path, root: &Path, relative: bool) -> String {
    let shown = if relative {
        file.strip_prefix(root).unwrap_or(file)
    } else {
        file
    };
    escape_os_str(shown.as_os_str())
}

/// Write one result line.
pub fn print_file<W: Write>(out: &mut W, file: &Path, root: &Path, relative: bool) -> io::Result<()> {
    writeln!(out, "{}", display_path(file, root, relative))
}
