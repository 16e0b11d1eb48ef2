//! Handling of locally typed lines.
//!
//! Bytes on the wire are never interpreted: there is no framing and no
//! in-band command set. The only control token is `exit`, and it is
//! recognized solely on the operator side. When a session is active the
//! token still goes out to the peer as ordinary payload before the
//! connection closes.

/// Control token that ends a session, or stops an idle server.
pub const EXIT_TOKEN: &str = "exit";

/// What a line of operator input asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalLine {
    /// Only a line terminator; nothing to send.
    Blank,
    /// Starts with the exit token.
    Exit,
    /// Ordinary chat text.
    Message,
}

/// Classify one line of operator input.
pub fn classify(line: &str) -> LocalLine {
    if is_exit_token(line) {
        LocalLine::Exit
    } else if line.trim_end_matches(['\r', '\n']).is_empty() {
        LocalLine::Blank
    } else {
        LocalLine::Message
    }
}

/// True when the first four characters after leading whitespace spell `exit`,
/// ignoring ASCII case. Anything after the token does not matter.
pub fn is_exit_token(line: &str) -> bool {
    line.trim_start()
        .as_bytes()
        .get(..EXIT_TOKEN.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(EXIT_TOKEN.as_bytes()))
}
