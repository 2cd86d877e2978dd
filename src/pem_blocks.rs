//! Splits a PEM bundle into its blocks so each one is decoded, and any
//! failure reported, on its own.

use pem::{EncodeConfig, LineEnding, Pem};

const BEGIN_MARKER: &str = "-----BEGIN ";
const END_MARKER: &str = "-----END ";
const MARKER_TAIL: &str = "-----";

#[derive(Debug, Clone)]
pub struct PemBlock {
    /// Label from the BEGIN line.
    pub label: String,
    /// Decoded body, or the reason it could not be decoded.
    pub contents: Result<Vec<u8>, String>,
}

fn marker_label<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.strip_prefix(marker)?.strip_suffix(MARKER_TAIL)
}

fn decode(label: String, span: &str) -> PemBlock {
    let contents = pem::parse(span)
        .map(Pem::into_contents)
        .map_err(|e| e.to_string());
    PemBlock { label, contents }
}

fn unterminated(label: String) -> PemBlock {
    PemBlock {
        contents: Err(format!("missing END {label} line")),
        label,
    }
}

/// Blocks of `input` in order of appearance. Text between blocks is ignored.
pub fn parse_blocks(input: &[u8]) -> Vec<PemBlock> {
    let text = String::from_utf8_lossy(input);
    let mut blocks = Vec::new();
    // Label and text of the block currently being collected.
    let mut open: Option<(String, String)> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if let Some(label) = marker_label(line, BEGIN_MARKER) {
            if let Some((previous, _)) = open.take() {
                blocks.push(unterminated(previous));
            }
            open = Some((label.to_string(), format!("{line}\n")));
            continue;
        }
        let Some((_, span)) = open.as_mut() else {
            continue;
        };
        span.push_str(line);
        span.push('\n');
        if marker_label(line, END_MARKER).is_some() {
            if let Some((label, span)) = open.take() {
                blocks.push(decode(label, &span));
            }
        }
    }
    if let Some((label, _)) = open {
        blocks.push(unterminated(label));
    }
    blocks
}

/// Encode DER bodies as consecutive `label` blocks with LF line endings.
pub fn encode_all<'a>(label: &str, ders: impl IntoIterator<Item = &'a [u8]>) -> String {
    let pems: Vec<Pem> = ders.into_iter().map(|der| Pem::new(label, der)).collect();
    pem::encode_many_config(&pems, EncodeConfig::new().set_line_ending(LineEnding::LF))
}
