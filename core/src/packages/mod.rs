//! Package span resolution. Walks the block tree and maps every region of
//! the file to the `package` namespace in effect there.

#[cfg(test)]
mod packages_test;

use serde::Serialize;
use tracing::warn;

use crate::parse::{BlockNode, Node};
use crate::token::{FilePos, Range, TokenKind};

/// A contiguous region of the file governed by one package. Spans cover the
/// whole file and never overlap; adjacent spans always name different
/// packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSpan {
    pub start: FilePos,
    pub end: FilePos,
    pub package_name: String,
}

impl PackageSpan {
    pub fn new(start: FilePos, end: FilePos, package_name: impl Into<String>) -> Self {
        Self {
            start,
            end,
            package_name: package_name.into(),
        }
    }

    pub fn contains(&self, pos: FilePos) -> bool {
        Range::new(self.start, self.end).contains(pos)
    }
}

/// Resolve package spans over a finished block tree. The file starts in
/// `main`. A `package Foo;` statement replaces the package for the rest of
/// the enclosing scope; a `package Foo { ... }` block form covers only its
/// block. Leaving a scope restores the package of the outer scope.
pub fn resolve_packages(root: &BlockNode) -> Vec<PackageSpan> {
    let mut stack: Vec<String> = vec!["main".to_string()];
    let mut current_start = FilePos::with_offset(1, 1, 0);
    let mut spans = resolve_block(root, &mut stack, &mut current_start);

    // The root walk pops `main` at its end; anything left means the tree
    // was inconsistent, so close it out rather than lose coverage.
    if let Some(top) = stack.last() {
        push_span(&mut spans, PackageSpan::new(current_start, root.end, top.clone()));
    }
    spans
}

/// Package in effect at a position; `main` when nothing matches.
pub fn find_package_at_pos(packages: &[PackageSpan], pos: FilePos) -> String {
    packages
        .iter()
        .find(|span| span.contains(pos))
        .map(|span| span.package_name.clone())
        .unwrap_or_else(|| "main".to_string())
}

fn resolve_block(
    block: &BlockNode,
    stack: &mut Vec<String>,
    current_start: &mut FilePos,
) -> Vec<PackageSpan> {
    let mut spans: Vec<PackageSpan> = Vec::new();
    let mut next_block_is_package = false;

    for (child_idx, child) in block.children.iter().enumerate() {
        match child {
            Node::Block(inner) => {
                if !next_block_is_package {
                    // Entering a plain scope keeps the current package; the
                    // duplicate is popped on the way out.
                    let top = match stack.last() {
                        Some(top) => top.clone(),
                        None => {
                            warn!("package stack underflow, aborting package analysis");
                            return spans;
                        }
                    };
                    stack.push(top);
                }
                next_block_is_package = false;
                let inner_spans = resolve_block(inner, stack, current_start);
                for span in inner_spans {
                    push_span(&mut spans, span);
                }
            }
            Node::Tokens(run) => {
                let tokens = &run.tokens;
                let mut i = 0;
                while i < tokens.len() {
                    if tokens[i].kind != TokenKind::Package {
                        i += 1;
                        continue;
                    }
                    // Find the package name.
                    let mut j = i + 1;
                    while j < tokens.len() && tokens[j].kind.is_trivia() {
                        j += 1;
                    }
                    let Some(name_token) = tokens.get(j) else { break };
                    if name_token.kind != TokenKind::Name {
                        i = j + 1;
                        continue;
                    }
                    let declared_at = tokens[i].start;
                    let new_name = name_token.text.clone();

                    // Block form: `package Foo { ... }`. The opening brace
                    // ends this token run and the next sibling is the block.
                    let mut k = j + 1;
                    while k < tokens.len() && tokens[k].kind.is_trivia() {
                        k += 1;
                    }
                    let block_form = tokens.get(k).map(|t| t.kind) == Some(TokenKind::LBrace)
                        && matches!(block.children.get(child_idx + 1), Some(Node::Block(_)));

                    let Some(prev_name) = stack.last().cloned() else {
                        warn!("package stack underflow, aborting package analysis");
                        return spans;
                    };
                    if !block_form {
                        // Statement form replaces the package for the rest
                        // of the enclosing scope.
                        stack.pop();
                    }
                    stack.push(new_name);
                    next_block_is_package = block_form;

                    push_span(
                        &mut spans,
                        PackageSpan::new(*current_start, declared_at, prev_name),
                    );
                    *current_start = declared_at;
                    i = j + 1;
                }
            }
        }
    }

    // Scope end: emit the span that reaches the closing brace and restore
    // the outer package.
    match stack.last() {
        Some(top) => {
            push_span(
                &mut spans,
                PackageSpan::new(*current_start, block.end, top.clone()),
            );
            stack.pop();
            *current_start = block.end;
        }
        None => warn!("package stack underflow at scope end"),
    }

    spans
}

/// Append a span, merging with the previous one when the package repeats.
/// Spans arrive in file order, so a repeated name is always adjacent.
fn push_span(spans: &mut Vec<PackageSpan>, span: PackageSpan) {
    if let Some(last) = spans.last_mut() {
        if last.package_name == span.package_name {
            last.end = span.end;
            return;
        }
    }
    spans.push(span);
}
