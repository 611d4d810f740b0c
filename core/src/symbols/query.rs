//! Read-only queries over a resolved file: completion lists, find-usages
//! and go-to-declaration.

use tracing::debug;

use crate::packages::find_package_at_pos;
use crate::token::{FilePos, Range};
use crate::util::FastHashMap;

use serde::Serialize;

use super::{FileSymbols, SymbolNode, Variable};

/// One completion entry. `detail` carries secondary context (the fully
/// qualified name of a global, a sub's call form) and may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionItem {
    pub name: String,
    pub detail: String,
}

impl CompletionItem {
    pub fn new(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detail: detail.into(),
        }
    }
}

/// Flatten the scope chain at `pos` into one name-to-variable map. Inner
/// scopes are visited last, so shadowing declarations win.
pub fn symbol_map_at_pos<'a>(
    symbols: &'a FileSymbols,
    pos: FilePos,
) -> FastHashMap<&'a str, &'a Variable> {
    let mut map = FastHashMap::default();
    collect_scope(&symbols.symbol_tree, pos, &mut map);
    map
}

fn collect_scope<'a>(
    node: &'a SymbolNode,
    pos: FilePos,
    map: &mut FastHashMap<&'a str, &'a Variable>,
) {
    for variable in &node.variables {
        map.insert(variable.name.as_str(), variable);
    }
    for child in &node.children {
        if Range::new(child.start, child.end).contains(pos) {
            collect_scope(child, pos, map);
        }
    }
}

/// Adjust a variable name for the sigil the user has already typed:
/// completing after `$` offers `$x` for `@x` (element) and `%x` (value),
/// after `@` offers `@x` for `%x` (slice). Returns `None` when the variable
/// cannot be accessed through that sigil.
fn variable_for_completion(variable: &str, sigil_context: char) -> Option<String> {
    let mut chars = variable.chars();
    let sigil = chars.next()?;
    if sigil == sigil_context {
        return Some(variable.to_owned());
    }
    let rest = chars.as_str();
    match (sigil, sigil_context) {
        ('@', '$') | ('%', '$') => Some(format!("${rest}")),
        ('%', '@') => Some(format!("@{rest}")),
        _ => None,
    }
}

/// Variable completion at a position: every lexical in scope plus every
/// known global. Globals from other packages are offered fully qualified;
/// globals from the current package are offered bare unless a lexical of
/// the same name shadows them, in which case the qualified form is offered
/// instead.
pub fn variable_names_at_pos(
    symbols: &FileSymbols,
    pos: FilePos,
    sigil_context: char,
) -> Vec<CompletionItem> {
    let symbol_map = symbol_map_at_pos(symbols, pos);
    let current_package = find_package_at_pos(&symbols.packages, pos);
    let mut items = Vec::new();

    for global in symbols.globals.keys() {
        let bare = format!("{}{}", global.sigil(), global.name());
        if global.package() == current_package && !symbol_map.contains_key(bare.as_str()) {
            if let Some(name) = variable_for_completion(&bare, sigil_context) {
                items.push(CompletionItem::new(name, global.full_name()));
            }
        } else if let Some(name) = variable_for_completion(&global.full_name(), sigil_context) {
            items.push(CompletionItem::new(name, ""));
        }
    }

    for (name, variable) in &symbol_map {
        if let Some(name) = variable_for_completion(name, sigil_context) {
            items.push(CompletionItem::new(name, variable.detail()));
        }
    }

    items
}

/// Subroutine completion at a position. Subs from other packages are
/// offered fully qualified; anonymous subs have nothing to complete.
pub fn subroutine_names_at_pos(symbols: &FileSymbols, pos: FilePos) -> Vec<CompletionItem> {
    let current_package = find_package_at_pos(&symbols.packages, pos);
    symbols
        .subroutines
        .iter()
        .filter(|sub| !sub.name.is_empty())
        .map(|sub| {
            let detail = format!("{}()", sub.name);
            if sub.package == current_package {
                CompletionItem::new(sub.name.clone(), detail)
            } else {
                CompletionItem::new(format!("{}::{}", sub.package, sub.name), detail)
            }
        })
        .collect()
}

/// Find the lexical variable whose declaration or any of whose usages
/// covers `location`.
pub fn find_variable_at_location<'a>(
    symbols: &'a FileSymbols,
    location: FilePos,
) -> Option<(&'a Variable, &'a [FilePos])> {
    let mut stack = vec![&symbols.symbol_tree];
    while let Some(node) = stack.pop() {
        for variable in &node.variables {
            let Some(usages) = symbols.variable_usages.get(&variable.id) else {
                continue;
            };
            if Range::new(variable.declaration, variable.symbol_end).contains(location) {
                return Some((variable, usages));
            }
            for usage in usages {
                let end = FilePos::new(usage.line, usage.column + variable.name.len() as u32);
                if Range::new(*usage, end).contains(location) {
                    return Some((variable, usages));
                }
            }
        }
        stack.extend(&node.children);
    }
    None
}

/// Every position the variable at `location` occurs at, declaration
/// included. Empty when no variable is there.
pub fn find_variable_usages(symbols: &FileSymbols, location: FilePos) -> Vec<FilePos> {
    match find_variable_at_location(symbols, location) {
        Some((_, usages)) => usages.to_vec(),
        None => {
            debug!(%location, "no variable at location");
            Vec::new()
        }
    }
}

/// Declaration position of the variable at `location`.
pub fn find_variable_declaration(symbols: &FileSymbols, location: FilePos) -> Option<FilePos> {
    match find_variable_at_location(symbols, location) {
        Some((variable, _)) => Some(variable.declaration),
        None => {
            debug!(%location, "no variable at location");
            None
        }
    }
}
