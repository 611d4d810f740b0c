//! Brace-nesting parser. Builds the block tree that scope resolution runs
//! over; everything between braces is kept as flat token runs.


use serde::Serialize;

use crate::token::{FilePos, Token, TokenKind};

/// A run of tokens or a nested block. The tree is intentionally shallow:
/// no statement structure, just scopes.
#[derive(Debug, Clone, Serialize)]
pub enum Node {
    Tokens(TokensNode),
    Block(BlockNode),
}

/// An ordered, non-empty run of sibling tokens. The brace tokens that open
/// and close a block stay inside the surrounding runs, so concatenating a
/// tree's token runs in order yields the original token stream.
#[derive(Debug, Clone, Serialize)]
pub struct TokensNode {
    pub tokens: Vec<Token>,
}

/// A brace-delimited scope. `closed` is false when the closing brace was
/// missing and `end` had to be backfilled with the end of input.
#[derive(Debug, Clone, Serialize)]
pub struct BlockNode {
    pub start: FilePos,
    pub end: FilePos,
    pub closed: bool,
    pub children: Vec<Node>,
}

impl BlockNode {
    fn new(start: FilePos) -> Self {
        Self {
            start,
            end: start,
            closed: false,
            children: Vec::new(),
        }
    }
}

/// Result of building the block tree. `partial_parse_line` is the first
/// line where nesting went wrong (an unclosed `{` or a stray `}`); the tree
/// itself is always usable, with unterminated scopes extended to the end of
/// input.
#[derive(Debug)]
pub struct ParseTree {
    pub root: BlockNode,
    pub partial_parse_line: Option<u32>,
}

/// Build the block tree from a lexed token stream. `tokens` always ends
/// with `EndOfInput`, so the stream is never empty.
pub fn build_tree(tokens: &[Token]) -> ParseTree {
    let last_pos = tokens.last().map(|t| t.end).unwrap_or(FilePos::new(1, 1));
    let mut root = BlockNode::new(FilePos::with_offset(1, 1, 0));
    root.end = last_pos;
    root.closed = true;

    let mut partial: Option<u32> = None;
    let mut idx = 0;
    while idx < tokens.len() {
        let closed_early = fill(&mut root, tokens, &mut idx, last_pos, &mut partial);
        if closed_early {
            // A `}` with no matching `{`; note it and keep filling the root.
            let line = tokens[idx - 1].start.line;
            note_partial(&mut partial, line);
        }
    }
    // Stray closers may have clobbered the root's end.
    root.end = last_pos;
    root.closed = true;

    if let Some(line) = partial {
        tracing::debug!(line, "unbalanced braces, recording partial parse");
    }

    ParseTree {
        root,
        partial_parse_line: partial,
    }
}

/// Fill `block` with children until its closing brace or end of tokens.
/// Returns true if a closing brace ended the block.
fn fill(
    block: &mut BlockNode,
    tokens: &[Token],
    idx: &mut usize,
    last_pos: FilePos,
    partial: &mut Option<u32>,
) -> bool {
    let mut acc: Vec<Token> = Vec::new();

    while *idx < tokens.len() {
        let token = &tokens[*idx];
        *idx += 1;
        acc.push(token.clone());

        match token.kind {
            TokenKind::LBrace => {
                let brace_start = token.start;
                flush(block, &mut acc);
                let mut child = BlockNode::new(brace_start);
                let closed = fill(&mut child, tokens, idx, last_pos, partial);
                if !closed {
                    note_partial(partial, brace_start.line);
                    child.end = last_pos;
                }
                block.children.push(Node::Block(child));
            }
            TokenKind::RBrace => {
                block.end = token.end;
                block.closed = true;
                flush(block, &mut acc);
                return true;
            }
            _ => {}
        }
    }

    flush(block, &mut acc);
    false
}

fn flush(block: &mut BlockNode, acc: &mut Vec<Token>) {
    if !acc.is_empty() {
        block.children.push(Node::Tokens(TokensNode {
            tokens: std::mem::take(acc),
        }));
    }
}

fn note_partial(partial: &mut Option<u32>, line: u32) {
    match partial {
        Some(existing) if *existing <= line => {}
        _ => *partial = Some(line),
    }
}
