//! Declaration pass. One walk over the block tree that builds the scope
//! tree and collects variable declarations, subroutine headers and imports.

use once_cell::sync::Lazy;

use crate::packages::{find_package_at_pos, PackageSpan};
use crate::parse::{BlockNode, Node};
use crate::token::{FilePos, Token, TokenIterator, TokenKind, SKIP_TRIVIA};
use crate::util::FastHashSet;

use super::{
    Import, ImportKind, ImportMechanism, Subroutine, SymbolNode, Variable, VariableId,
    VariableKind,
};

/// Modules with syntactic meaning rather than library code behind them:
/// `use strict` changes how the file parses, it does not load a module, so
/// no import is recorded for these.
static PRAGMATIC_MODULES: Lazy<FastHashSet<&'static str>> = Lazy::new(|| {
    [
        "attributes",
        "autodie",
        "autodie::exception",
        "autodie::exception::system",
        "autodie::hints",
        "autodie::skip",
        "autouse",
        "base",
        "bigint",
        "bignum",
        "bigrat",
        "blib",
        "bytes",
        "charnames",
        "constant",
        "deprecate",
        "diagnostics",
        "encoding",
        "encoding::warnings",
        "experimental",
        "feature",
        "fields",
        "filetest",
        "if",
        "integer",
        "less",
        "lib",
        "locale",
        "mro",
        "ok",
        "open",
        "ops",
        "overload",
        "overloading",
        "parent",
        "re",
        "sigtrapsort",
        "strict",
        "subs",
        "threads",
        "threads::shared",
        "utf8",
        "vars",
        "version",
        "vmsish",
        "warnings",
        "warnings::register",
    ]
    .into_iter()
    .collect()
});

pub(crate) struct Declarations {
    pub symbol_tree: SymbolNode,
    pub subroutines: Vec<Subroutine>,
    pub imports: Vec<Import>,
}

pub(crate) fn declaration_pass(root: &BlockNode, packages: &[PackageSpan]) -> Declarations {
    let mut pass = Pass {
        packages,
        subroutines: Vec::new(),
        imports: Vec::new(),
        next_id: 0,
    };
    let mut tree = SymbolNode::new(root.start, root.end, Vec::new());
    pass.walk(root, &mut tree);
    Declarations {
        symbol_tree: tree,
        subroutines: pass.subroutines,
        imports: pass.imports,
    }
}

struct Pass<'a> {
    packages: &'a [PackageSpan],
    subroutines: Vec<Subroutine>,
    imports: Vec<Import>,
    next_id: u32,
}

impl Pass<'_> {
    fn walk(&mut self, block: &BlockNode, node: &mut SymbolNode) {
        for child in &block.children {
            match child {
                Node::Block(inner) => {
                    // Features are lexically scoped: inner scopes start with
                    // whatever is enabled here so far.
                    let mut symbol_child =
                        SymbolNode::new(inner.start, inner.end, node.features.clone());
                    self.walk(inner, &mut symbol_child);
                    node.children.push(symbol_child);
                }
                Node::Tokens(run) => self.scan(&run.tokens, block.end, node),
            }
        }
    }

    fn scan(&mut self, tokens: &[Token], scope_end: FilePos, node: &mut SymbolNode) {
        let mut iter = TokenIterator::new(tokens, SKIP_TRIVIA);
        while let Some(token) = iter.next() {
            match token.kind {
                TokenKind::My | TokenKind::Our | TokenKind::Local | TokenKind::State => {
                    self.declare_variables(&mut iter, token.kind, scope_end, node);
                }
                TokenKind::Sub => {
                    let sub = self.subroutine_header(&mut iter, token.start);
                    self.subroutines.push(sub);
                }
                TokenKind::Require => {
                    if let Some(import) = require_import(&mut iter, token.start) {
                        self.imports.push(import);
                    }
                }
                TokenKind::Use => match use_directive(&mut iter, token.start) {
                    UseDirective::Import(import) => self.imports.push(import),
                    UseDirective::Features(mut names) => node.features.append(&mut names),
                    UseDirective::Ignored => {}
                },
                _ => {}
            }
        }
    }

    /// Handle the tokens after a `my`/`our`/`local`/`state` keyword: either
    /// a single variable or a `(...)` list of them.
    fn declare_variables(
        &mut self,
        iter: &mut TokenIterator<'_>,
        keyword: TokenKind,
        scope_end: FilePos,
        node: &mut SymbolNode,
    ) {
        let Some(token) = iter.next() else { return };
        if token.kind.is_variable() {
            let variable = self.make_variable(keyword, token, scope_end);
            node.variables.push(variable);
            // `my $x = $y` declares only $x; step over the assignment so
            // the right-hand side is not read as part of the declaration.
            if let Some(next) = iter.peek() {
                if next.kind == TokenKind::Assignment {
                    iter.next();
                }
            }
        } else if token.kind == TokenKind::LParen {
            // `my ($x, @rest)`: every variable inside declares.
            while let Some(token) = iter.next() {
                match token.kind {
                    TokenKind::RParen | TokenKind::EndOfInput => break,
                    kind if kind.is_variable() => {
                        let variable = self.make_variable(keyword, token, scope_end);
                        node.variables.push(variable);
                    }
                    _ => {}
                }
            }
        }
    }

    fn make_variable(&mut self, keyword: TokenKind, token: &Token, scope_end: FilePos) -> Variable {
        let kind = match keyword {
            TokenKind::Our => VariableKind::Our {
                package: find_package_at_pos(self.packages, token.start),
            },
            TokenKind::Local => VariableKind::Local,
            _ => VariableKind::Scoped,
        };
        let id = VariableId(self.next_id);
        self.next_id += 1;
        Variable {
            id,
            name: token.text.clone(),
            declaration: token.start,
            symbol_end: token.end,
            scope_end,
            kind,
        }
    }

    /// Consume a sub header up to its opening brace (which ends the token
    /// run anyway). Absent `SubName` means an anonymous sub.
    fn subroutine_header(&mut self, iter: &mut TokenIterator<'_>, pos: FilePos) -> Subroutine {
        let mut sub = Subroutine {
            pos,
            name: String::new(),
            name_start: pos,
            name_end: pos,
            package: String::new(),
            signature: None,
            prototype: None,
            attributes: Vec::new(),
        };

        let mut token = iter.next();
        if let Some(t) = token {
            if t.kind == TokenKind::SubName {
                sub.name = t.text.clone();
                sub.name_start = t.start;
                sub.name_end = t.end;
                token = iter.next();
            }
        }

        while let Some(t) = token {
            match t.kind {
                TokenKind::LBrace | TokenKind::EndOfInput => break,
                TokenKind::Signature => sub.signature = Some(t.text.clone()),
                TokenKind::Prototype => sub.prototype = Some(t.text.clone()),
                TokenKind::Attribute => sub.attributes.push(t.text.clone()),
                _ => {}
            }
            token = iter.next();
        }

        sub.package = find_package_at_pos(self.packages, sub.pos);
        sub
    }
}

fn require_import(iter: &mut TokenIterator<'_>, location: FilePos) -> Option<Import> {
    if let Some(path) = iter.try_get_string() {
        // require 'Math/Calc.pm'
        return Some(Import {
            location,
            kind: ImportKind::Path,
            mechanism: ImportMechanism::Require,
            module: path,
            exports: Vec::new(),
        });
    }

    let token = iter.next()?;
    if token.kind != TokenKind::Name {
        return None;
    }
    // require Math::Calc;
    Some(Import {
        location,
        kind: ImportKind::Module,
        mechanism: ImportMechanism::Require,
        module: token.text.clone(),
        exports: Vec::new(),
    })
}

enum UseDirective {
    Import(Import),
    /// `use feature ...`: the names go on the current scope, not into the
    /// import list.
    Features(Vec<String>),
    Ignored,
}

fn use_directive(iter: &mut TokenIterator<'_>, location: FilePos) -> UseDirective {
    let module = match iter.next() {
        Some(token) if token.kind == TokenKind::Name => token.text.clone(),
        _ => return UseDirective::Ignored,
    };

    // `use Module Version? LIST?` - skip the optional version.
    let mut next = iter.peek();
    if let Some(t) = next {
        if matches!(
            t.kind,
            TokenKind::NumericLiteral | TokenKind::VersionLiteral
        ) {
            iter.next();
            next = iter.peek();
        }
    }

    // The list is either a plain string or a qw(...) body; both end up as a
    // single String token.
    let mut exports = Vec::new();
    if let Some(t) = next {
        if t.kind == TokenKind::QuoteIdent {
            iter.next();
            next = iter.peek();
        }
    }
    if let Some(t) = next {
        if t.kind == TokenKind::StringStart {
            iter.next();
            if let Some(body) = iter.next() {
                if body.kind == TokenKind::String {
                    exports = body.text.split_whitespace().map(str::to_owned).collect();
                }
            }
        }
    }

    if module == "feature" {
        return UseDirective::Features(exports);
    }
    if PRAGMATIC_MODULES.contains(module.as_str()) {
        return UseDirective::Ignored;
    }

    UseDirective::Import(Import {
        location,
        kind: ImportKind::Module,
        mechanism: ImportMechanism::Use,
        module,
        exports,
    })
}
