//! Usage pass. Re-walks the token runs in lockstep with the symbol tree,
//! tying every variable occurrence to the declaration that governs it, or
//! recording a package global when none does.

use crate::packages::{find_package_at_pos, PackageSpan};
use crate::parse::{BlockNode, Node};
use crate::token::{FilePos, Range, Token, TokenIterator, TokenKind, SKIP_TRIVIA};
use crate::util::FastHashMap;

use super::{FileSymbols, GlobalVariable, SymbolNode, VariableId};

pub(crate) fn usage_pass(root: &BlockNode, symbols: &mut FileSymbols) {
    let mut usages: FastHashMap<VariableId, Vec<FilePos>> = FastHashMap::default();
    let mut globals: FastHashMap<GlobalVariable, Vec<FilePos>> = FastHashMap::default();
    walk(
        root,
        &symbols.symbol_tree,
        &symbols.symbol_tree,
        &symbols.packages,
        &mut usages,
        &mut globals,
    );
    symbols.variable_usages = usages;
    symbols.globals = globals;
}

fn walk(
    block: &BlockNode,
    node: &SymbolNode,
    tree: &SymbolNode,
    packages: &[PackageSpan],
    usages: &mut FastHashMap<VariableId, Vec<FilePos>>,
    globals: &mut FastHashMap<GlobalVariable, Vec<FilePos>>,
) {
    let mut block_child = 0;
    for child in &block.children {
        match child {
            Node::Block(inner) => {
                // The symbol tree is built one child per block, in order.
                if let Some(symbol_child) = node.children.get(block_child) {
                    walk(inner, symbol_child, tree, packages, usages, globals);
                }
                block_child += 1;
            }
            Node::Tokens(run) => {
                scan_run(&run.tokens, tree, packages, usages, globals);
            }
        }
    }
}

fn scan_run(
    tokens: &[Token],
    tree: &SymbolNode,
    packages: &[PackageSpan],
    usages: &mut FastHashMap<VariableId, Vec<FilePos>>,
    globals: &mut FastHashMap<GlobalVariable, Vec<FilePos>>,
) {
    let mut iter = TokenIterator::new(tokens, SKIP_TRIVIA);
    while let Some(token) = iter.next() {
        if !token.kind.is_variable() {
            continue;
        }

        let accessor = iter.peek().map(|t| t.kind);
        let canonical = canonical_for_access(token, accessor);

        match find_declaration(tree, &canonical, token.start) {
            Some(id) => usages.entry(id).or_default().push(token.start),
            None => {
                // No lexical in scope: this is a package variable.
                let package = find_package_at_pos(packages, token.start);
                if let Some(global) = fully_qualified_global(&token.text, &package) {
                    globals.entry(global).or_default().push(token.start);
                }
            }
        }
    }
}

/// Name to look a variable occurrence up under. `$x[0]` is an element of
/// `@x` and `$x{k}` an element of `%x`, so the following accessor token
/// decides which declaration the occurrence belongs to.
fn canonical_for_access(token: &Token, accessor: Option<TokenKind>) -> String {
    if token.kind == TokenKind::ScalarVariable {
        match accessor {
            Some(TokenKind::LSquareBracket) => return format!("@{}", &token.text[1..]),
            Some(TokenKind::HashDerefStart) | Some(TokenKind::HashSubStart) => {
                return format!("%{}", &token.text[1..])
            }
            _ => {}
        }
    }
    token.text.clone()
}

/// Find the declaration governing `name` at `pos`: the last matching
/// declaration at or before `pos`, walking from the file scope down the
/// chain of scopes containing `pos`. Inner scopes win because they are
/// visited last.
fn find_declaration(tree: &SymbolNode, name: &str, pos: FilePos) -> Option<VariableId> {
    let mut found = None;
    search(tree, name, pos, &mut found);
    found
}

fn search(node: &SymbolNode, name: &str, pos: FilePos, found: &mut Option<VariableId>) {
    for variable in &node.variables {
        if variable.name == name && variable.declaration <= pos {
            *found = Some(variable.id);
        }
    }
    for child in &node.children {
        if Range::new(child.start, child.end).contains(pos) {
            search(child, name, pos, found);
        }
    }
}

/// Normalize the spellings Perl treats as the same package variable:
/// `$main::x`, `$main::'x`, `$main::::x` and `${main'x}` all come out as
/// `$main::x`.
pub fn canonical_variable_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= 1 || !matches!(chars[0], '$' | '@' | '%') {
        return name.to_owned();
    }

    // Strip a ${...} wrapper.
    let mut body: String = if chars[1] == '{' && chars[chars.len() - 1] == '}' {
        chars[2..chars.len() - 1].iter().collect()
    } else {
        chars[1..].iter().collect()
    };

    // The legacy separator ' means ::.
    body = body.replace('\'', "::");

    // Collapse runs of colons left behind by mixed spellings.
    let mut collapsed = String::with_capacity(body.len());
    let mut run = 0;
    for c in body.chars() {
        if c == ':' {
            run += 1;
            continue;
        }
        if run > 0 {
            collapsed.push_str(if run == 1 { ":" } else { "::" });
            run = 0;
        }
        collapsed.push(c);
    }
    if run > 0 {
        collapsed.push_str(if run == 1 { ":" } else { "::" });
    }

    let mut canonical = String::with_capacity(collapsed.len() + 1);
    canonical.push(chars[0]);
    canonical.push_str(&collapsed);
    canonical
}

/// Resolve a variable as written in the source to a package global. A name
/// with no package part belongs to the package in effect where it occurs.
pub(crate) fn fully_qualified_global(
    written: &str,
    package_context: &str,
) -> Option<GlobalVariable> {
    let canonical = canonical_variable_name(written);
    let mut chars = canonical.chars();
    let sigil = chars.next()?;
    if !matches!(sigil, '$' | '@' | '%') {
        return None;
    }
    let rest = chars.as_str();
    if rest.is_empty() {
        return None;
    }

    match rest.rfind("::") {
        Some(idx) if idx > 0 => Some(GlobalVariable::new(sigil, &rest[..idx], &rest[idx + 2..])),
        // An empty package part falls back to the surrounding package.
        Some(idx) => Some(GlobalVariable::new(sigil, package_context, &rest[idx + 2..])),
        None => Some(GlobalVariable::new(sigil, package_context, rest)),
    }
}
