//! Whole-file analysis entry point: lex, build the block tree, resolve
//! package spans, resolve symbols.

use tracing::debug;

use crate::packages;
use crate::parse;
use crate::symbols::{self, FileSymbols};
use crate::token::{LexError, Lexer};

/// Analyze one Perl source file. The pipeline is pure: same input, same
/// output (up to `VariableId` assignment), no shared state.
pub fn analyze(source: &str) -> Result<FileSymbols, LexError> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let tokens = Lexer::tokenize(source)?;
    debug!(tokens = tokens.len(), "tokenized");

    let tree = parse::build_tree(&tokens);
    let spans = packages::resolve_packages(&tree.root);
    debug!(packages = spans.len(), "resolved package spans");

    Ok(symbols::resolve(&tree.root, spans, tree.partial_parse_line))
}

/// Analyze raw file bytes: strips any byte order mark, then decodes as
/// UTF-8 with invalid sequences replaced.
pub fn analyze_bytes(bytes: &[u8]) -> Result<FileSymbols, LexError> {
    let source = String::from_utf8_lossy(strip_bom(bytes));
    analyze(&source)
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    // UTF-32 marks first: the UTF-16 LE mark is a prefix of the UTF-32 LE one.
    const BOMS: &[&[u8]] = &[
        b"\xEF\xBB\xBF",
        b"\xFF\xFE\x00\x00",
        b"\x00\x00\xFE\xFF",
        b"\xFF\xFE",
        b"\xFE\xFF",
    ];
    for bom in BOMS {
        if let Some(rest) = bytes.strip_prefix(*bom) {
            return rest;
        }
    }
    bytes
}
