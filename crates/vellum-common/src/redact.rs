//! Log redaction for untrusted data.
//!
//! Anything that originated outside the process (clipboard payloads, stored
//! content, DOM text) must pass through [`sanitize_log`] before reaching a
//! log sink, so a crafted payload cannot forge log lines or smuggle control
//! sequences into a terminal.

/// Maximum length of a redacted log value.
const MAX_LOG_LENGTH: usize = 200;

/// Prepare an untrusted string for logging.
///
/// Newlines and carriage returns collapse to a single space, C0/C1 control
/// characters are stripped, and the result is truncated to 200 characters.
pub fn sanitize_log(input: &str) -> String {
    let mut out = String::with_capacity(input.len().min(MAX_LOG_LENGTH));
    let mut written = 0usize;
    let mut last_was_space = false;

    for ch in input.chars() {
        if written >= MAX_LOG_LENGTH {
            break;
        }
        match ch {
            '\n' | '\r' => {
                if !last_was_space {
                    out.push(' ');
                    written += 1;
                    last_was_space = true;
                }
            }
            c if c.is_control() || ('\u{80}'..='\u{9f}').contains(&c) => {}
            c => {
                out.push(c);
                written += 1;
                last_was_space = c == ' ';
            }
        }
    }

    out
}
