//! Secret redaction for documents sent to a model.
//!
//! Every pattern is replaced with `[REDACTED]`. Line structure is
//! preserved: the output always has exactly as many newlines as the input,
//! so line-numbered citations against redacted text still point at the
//! right lines of the original.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

/// Replacement text for any detected secret.
pub const REDACTED: &str = "[REDACTED]";

lazy_static! {
    /// PEM private key blocks, possibly spanning many lines
    static ref PEM_BLOCK_PATTERN: Regex = Regex::new(
        r"(?s)-----BEGIN [A-Z ]+KEY-----.*?-----END [A-Z ]+KEY-----"
    ).unwrap();

    /// AWS access key IDs
    static ref AWS_ACCESS_KEY_PATTERN: Regex = Regex::new(
        r"AKIA[0-9A-Z]{16}"
    ).unwrap();

    /// `sk-` secret keys; the leading delimiter is captured and kept
    static ref SECRET_KEY_PATTERN: Regex = Regex::new(
        r#"(?P<lead>^|[\s"'])sk-[a-zA-Z0-9]{20,}"#
    ).unwrap();

    /// JWTs (three base64url segments)
    static ref JWT_PATTERN: Regex = Regex::new(
        r"eyJ[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]+"
    ).unwrap();

    /// Bearer tokens of at least 20 characters
    static ref BEARER_PATTERN: Regex = Regex::new(
        r"(?i)Bearer[ \t]+[A-Za-z0-9\-._~+/]{20,}=*"
    ).unwrap();

    /// Inline password assignments (`password: hunter2`, `PASSWORD=...`)
    static ref PASSWORD_PATTERN: Regex = Regex::new(
        r"(?i)password[ \t]*[:=][ \t]*\S+"
    ).unwrap();
}

/// Replace known secret patterns in `input` with `[REDACTED]`.
pub fn redact(input: &str) -> String {
    // PEM blocks first, one marker per line so the newline count is kept.
    let text = PEM_BLOCK_PATTERN.replace_all(input, |caps: &Captures<'_>| {
        caps[0]
            .split('\n')
            .map(|_| REDACTED)
            .collect::<Vec<_>>()
            .join("\n")
    });

    let mut text = text.into_owned();
    let single_line: [(&Regex, &str); 5] = [
        (&*AWS_ACCESS_KEY_PATTERN, REDACTED),
        (&*SECRET_KEY_PATTERN, "${lead}[REDACTED]"),
        (&*JWT_PATTERN, REDACTED),
        (&*BEARER_PATTERN, REDACTED),
        (&*PASSWORD_PATTERN, REDACTED),
    ];
    for (pattern, replacement) in single_line {
        text = pattern.replace_all(&text, replacement).into_owned();
    }

    text
}
