//! Clipboard copy via OSC 52.
//!
//! The terminal decodes the payload and sets the system clipboard, which
//! also works over SSH. Terminals that don't support OSC 52 ignore it.

use std::io::{self, Write, stdout};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use log::debug;

/// `ESC ] 52 ; c ; <base64> ESC \`
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x1b\\", BASE64.encode(text.as_bytes()))
}

pub fn copy_to<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    write!(out, "{}", osc52_sequence(text))?;
    out.flush()?;
    debug!("clipboard: copied {} bytes", text.len());
    Ok(())
}

/// Copy `text` through the terminal on stdout.
pub fn copy(text: &str) -> io::Result<()> {
    copy_to(&mut stdout(), text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_shape() {
        assert_eq!(osc52_sequence("hi"), "\x1b]52;c;aGk=\x1b\\");
    }

    #[test]
    fn empty_text() {
        assert_eq!(osc52_sequence(""), "\x1b]52;c;\x1b\\");
    }

    #[test]
    fn utf8_payload() {
        let seq = osc52_sequence("日本");
        let payload = seq
            .strip_prefix("\x1b]52;c;")
            .and_then(|s| s.strip_suffix("\x1b\\"))
            .unwrap();
        assert_eq!(BASE64.decode(payload).unwrap(), "日本".as_bytes());
    }

    #[test]
    fn copy_to_writer() {
        let mut buf = Vec::new();
        copy_to(&mut buf, "https://a.invalid/").unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), osc52_sequence("https://a.invalid/"));
    }
}
