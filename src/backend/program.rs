//! Kernel program source handed to [`ExecutionBackend::compile`](super::ExecutionBackend::compile).

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// OpenCL C rendition of the initialize/relax/commit kernels.
const RELAXATION_PROGRAM: &str = include_str!("relaxation.cl");

/// Source text of a kernel program.
///
/// The engine receives its program through configuration instead of a
/// global constant, so tests and alternative devices can substitute their
/// own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KernelSource {
    text: Cow<'static, str>,
}

impl KernelSource {
    /// Entry point that resets the working state for a new source.
    pub const INITIALIZE: &'static str = "sssp_initialize";
    /// Entry point that proposes candidate costs along outgoing edges.
    pub const RELAX: &'static str = "sssp_relax";
    /// Entry point that commits proposals and recomputes the frontier.
    pub const COMMIT: &'static str = "sssp_commit";

    /// Wraps arbitrary program text.
    pub fn new(text: impl Into<Cow<'static, str>>) -> Self {
        Self { text: text.into() }
    }

    /// The relaxation program bundled with the crate.
    pub const fn relaxation() -> Self {
        Self {
            text: Cow::Borrowed(RELAXATION_PROGRAM),
        }
    }

    /// Program text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Names of every `__kernel void name(` declaration, in source order.
    ///
    /// Line and block comments are skipped.
    pub fn declared_entry_points(&self) -> Vec<&str> {
        const KERNEL: &[u8] = b"__kernel";
        let text: &str = &self.text;
        let code = mask_comments(text);

        let mut names = Vec::new();
        let mut pos = 0;
        while let Some(found) = code[pos..].windows(KERNEL.len()).position(|w| w == KERNEL) {
            pos += found + KERNEL.len();
            let at = skip_whitespace(&code, pos);
            if !code[at..].starts_with(b"void") {
                continue;
            }
            let start = skip_whitespace(&code, at + b"void".len());
            let end = start
                + code[start..]
                    .iter()
                    .take_while(|&&b| b.is_ascii_alphanumeric() || b == b'_')
                    .count();
            if end > start && code.get(skip_whitespace(&code, end)) == Some(&b'(') {
                // ASCII bytes outside comments are copied unchanged.
                names.push(&text[start..end]);
            }
        }
        names
    }
}

impl Default for KernelSource {
    fn default() -> Self {
        Self::relaxation()
    }
}

/// Copy of `text` with every comment byte replaced by a space, so byte
/// offsets line up with the original.
fn mask_comments(text: &str) -> Vec<u8> {
    let mut code = text.as_bytes().to_vec();
    let mut i = 0;
    while i + 1 < code.len() {
        match (code[i], code[i + 1]) {
            (b'/', b'/') => {
                let end = text[i..].find('\n').map_or(code.len(), |p| i + p);
                code[i..end].fill(b' ');
                i = end;
            }
            (b'/', b'*') => {
                let end = text[i + 2..].find("*/").map_or(code.len(), |p| i + 2 + p + 2);
                code[i..end].fill(b' ');
                i = end;
            }
            _ => i += 1,
        }
    }
    code
}

fn skip_whitespace(code: &[u8], from: usize) -> usize {
    from + code[from.min(code.len())..].iter().take_while(|b| b.is_ascii_whitespace()).count()
}
