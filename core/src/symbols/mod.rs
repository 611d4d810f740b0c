//! Symbol resolution. Two passes over the block tree: the declaration pass
//! builds a scope tree of `my`/`our`/`local`/`state` declarations and
//! collects subroutines and imports; the usage pass ties every variable
//! occurrence back to a declaration, or records it as a package global when
//! none is in scope.

mod declare;
mod query;
mod usages;

#[cfg(test)]
mod query_test;
#[cfg(test)]
mod usages_test;

use serde::{Serialize, Serializer};

use crate::packages::PackageSpan;
use crate::parse::BlockNode;
use crate::token::FilePos;
use crate::util::FastHashMap;

pub use query::{
    find_variable_at_location, find_variable_declaration, find_variable_usages,
    subroutine_names_at_pos, symbol_map_at_pos, variable_names_at_pos, CompletionItem,
};
pub use usages::canonical_variable_name;

/// Identity of a lexical variable within one analysis run. Ids are dense
/// and assigned in declaration order; they are not stable across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VariableId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum VariableKind {
    /// `my` or `state`: a plain lexical.
    Scoped,
    /// `our`: a lexical alias for a variable in the given package.
    Our { package: String },
    /// `local`: dynamically scoped. Where it is read depends on the call
    /// stack, so we resolve it like a lexical but refuse to rename it.
    Local,
}

/// A declared variable. `declaration`..`symbol_end` covers the variable
/// token itself; `scope_end` is the end of the enclosing block.
#[derive(Debug, Clone, Serialize)]
pub struct Variable {
    pub id: VariableId,
    pub name: String,
    pub declaration: FilePos,
    pub symbol_end: FilePos,
    pub scope_end: FilePos,
    pub kind: VariableKind,
}

impl Variable {
    pub fn is_renamable(&self) -> bool {
        !matches!(self.kind, VariableKind::Local)
    }

    /// Extra context shown next to the name in completion lists.
    pub fn detail(&self) -> String {
        match &self.kind {
            VariableKind::Our { package } => package.clone(),
            _ => String::new(),
        }
    }
}

/// A package variable. Globals have no declaration site that analysis can
/// see, so identity is the fully qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlobalVariable {
    sigil: char,
    package: String,
    name: String,
}

impl GlobalVariable {
    pub fn new(sigil: char, package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            sigil,
            package: package.into(),
            name: name.into(),
        }
    }

    pub fn sigil(&self) -> char {
        self.sigil
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Variable name without sigil or package.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> String {
        format!("{}{}::{}", self.sigil, self.package, self.name)
    }
}

impl Serialize for GlobalVariable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.full_name())
    }
}

/// A subroutine header. `name` is empty for anonymous subs.
#[derive(Debug, Clone, Serialize)]
pub struct Subroutine {
    pub pos: FilePos,
    pub name: String,
    pub name_start: FilePos,
    pub name_end: FilePos,
    pub package: String,
    pub signature: Option<String>,
    pub prototype: Option<String>,
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImportKind {
    /// `Math::Calc` style module name.
    Module,
    /// `'Math/Calc.pm'` style file path.
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImportMechanism {
    Use,
    Require,
}

#[derive(Debug, Clone, Serialize)]
pub struct Import {
    pub location: FilePos,
    pub kind: ImportKind,
    pub mechanism: ImportMechanism,
    pub module: String,
    pub exports: Vec<String>,
}

/// One scope in the symbol tree. Mirrors the block tree exactly: the n-th
/// `SymbolNode` child corresponds to the n-th `Block` child, which is what
/// lets the usage pass walk both trees in lockstep.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolNode {
    pub start: FilePos,
    pub end: FilePos,
    /// Variables declared directly in this scope.
    pub variables: Vec<Variable>,
    /// Features enabled by `use feature` here or in an enclosing scope.
    pub features: Vec<String>,
    pub children: Vec<SymbolNode>,
}

impl SymbolNode {
    fn new(start: FilePos, end: FilePos, features: Vec<String>) -> Self {
        Self {
            start,
            end,
            variables: Vec::new(),
            features,
            children: Vec::new(),
        }
    }
}

/// Everything the analysis knows about one file.
#[derive(Debug, Serialize)]
pub struct FileSymbols {
    pub symbol_tree: SymbolNode,
    pub packages: Vec<PackageSpan>,
    pub subroutines: Vec<Subroutine>,
    pub imports: Vec<Import>,
    /// Package variables mapped to every position they occur at. Globals
    /// are declared implicitly by use, so there is no declaration entry.
    pub globals: FastHashMap<GlobalVariable, Vec<FilePos>>,
    /// Every occurrence of each lexical variable, declaration included.
    pub variable_usages: FastHashMap<VariableId, Vec<FilePos>>,
    /// First line where brace nesting went wrong, if it did. Results below
    /// this line are best-effort.
    pub partial_parse_line: Option<u32>,
}

/// Run both symbol passes over a finished block tree.
pub fn resolve(
    root: &BlockNode,
    packages: Vec<PackageSpan>,
    partial_parse_line: Option<u32>,
) -> FileSymbols {
    let declarations = declare::declaration_pass(root, &packages);
    let mut symbols = FileSymbols {
        symbol_tree: declarations.symbol_tree,
        packages,
        subroutines: declarations.subroutines,
        imports: declarations.imports,
        globals: FastHashMap::default(),
        variable_usages: FastHashMap::default(),
        partial_parse_line,
    };
    usages::usage_pass(root, &mut symbols);
    symbols
}
