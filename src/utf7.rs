//! IMAP's "modified UTF-7" folder name encoding, from [RFC 3501 section
//! 5.1.3](https://tools.ietf.org/html/rfc3501#section-5.1.3).
//!
//! Printable ASCII passes through, `&` becomes `&-`, and everything else is UTF-16BE in a
//! `&...-` run of base64 using `,` in place of `/`.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use std::borrow::Cow;

const MUTF7: GeneralPurpose = GeneralPurpose::new(
    &alphabet::IMAP_MUTF7,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

fn is_direct(c: char) -> bool {
    (' '..='~').contains(&c)
}

/// Encode a folder name for the wire.
pub fn encode(name: &str) -> Cow<'_, str> {
    if name.chars().all(|c| is_direct(c) && c != '&') {
        return Cow::Borrowed(name);
    }

    let mut out = String::with_capacity(name.len() * 2);
    let mut shifted: Vec<u16> = Vec::new();
    for c in name.chars() {
        if is_direct(c) {
            flush_shifted(&mut out, &mut shifted);
            if c == '&' {
                out.push_str("&-");
            } else {
                out.push(c);
            }
        } else {
            let mut buf = [0u16; 2];
            shifted.extend_from_slice(c.encode_utf16(&mut buf));
        }
    }
    flush_shifted(&mut out, &mut shifted);
    Cow::Owned(out)
}

fn flush_shifted(out: &mut String, shifted: &mut Vec<u16>) {
    if shifted.is_empty() {
        return;
    }
    let bytes: Vec<u8> = shifted.iter().flat_map(|u| u.to_be_bytes()).collect();
    out.push('&');
    out.push_str(&MUTF7.encode(bytes));
    out.push('-');
    shifted.clear();
}

/// Decode a folder name from the wire.
///
/// Decoding is permissive: a run that is not valid base64 or not valid UTF-16 is passed through
/// unchanged, and a missing final `-` is tolerated.
pub fn decode(name: &str) -> Cow<'_, str> {
    if !name.contains('&') {
        return Cow::Borrowed(name);
    }

    let mut out = String::with_capacity(name.len());
    let mut rest = name;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let (run, next) = match after.find('-') {
            Some(end) => (&after[..end], &after[end + 1..]),
            None => (after, ""),
        };
        if run.is_empty() {
            out.push('&');
        } else {
            match decode_run(run) {
                Some(text) => out.push_str(&text),
                None => {
                    out.push('&');
                    out.push_str(run);
                    out.push('-');
                }
            }
        }
        rest = next;
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_run(run: &str) -> Option<String> {
    let bytes = MUTF7.decode(run).ok()?;
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}
