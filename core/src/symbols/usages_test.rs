#[cfg(test)]
mod tests {
    use crate::analysis::analyze;
    use crate::symbols::usages::fully_qualified_global;
    use crate::symbols::{
        canonical_variable_name, find_variable_declaration, find_variable_usages, FileSymbols,
        GlobalVariable,
    };
    use crate::token::FilePos;

    fn resolve(source: &str) -> FileSymbols {
        analyze(source).expect("analyze")
    }

    #[test]
    fn test_shadowing() {
        let source = "my $count = 5;\n\
                      if ($count) {\n\
                      \x20   my $count = 10;\n\
                      \x20   print $count;\n\
                      }\n\
                      print $count;\n";
        let symbols = resolve(source);

        // The inner declaration governs usages inside the block.
        assert_eq!(
            find_variable_usages(&symbols, FilePos::new(4, 11)),
            [FilePos::new(3, 8), FilePos::new(4, 11)]
        );
        // Outside the block the outer declaration is back in force.
        assert_eq!(
            find_variable_declaration(&symbols, FilePos::new(6, 7)),
            Some(FilePos::new(1, 4))
        );
        assert_eq!(
            find_variable_usages(&symbols, FilePos::new(1, 4)),
            [FilePos::new(1, 4), FilePos::new(2, 5), FilePos::new(6, 7)]
        );
    }

    #[test]
    fn test_our_variable_used_in_sub_body() {
        let source = "package Counter;\nour $total = 0;\nsub bump {\n    $total++;\n}\n";
        let symbols = resolve(source);
        assert_eq!(
            find_variable_usages(&symbols, FilePos::new(2, 5)),
            [FilePos::new(2, 5), FilePos::new(4, 5)]
        );
    }

    #[test]
    fn test_cursor_in_the_middle_of_a_name() {
        let symbols = resolve("my $count = 5;\nprint $count;\n");
        assert_eq!(
            find_variable_declaration(&symbols, FilePos::new(2, 10)),
            Some(FilePos::new(1, 4))
        );
    }

    #[test]
    fn test_undeclared_variables_become_globals() {
        let source = "package Foo;\n$bar = 1;\nprint $Foo::bar;\nprint $main::other;\n";
        let symbols = resolve(source);
        assert_eq!(symbols.globals.len(), 2);

        // The bare and fully qualified spellings land on the same global.
        let bar = GlobalVariable::new('$', "Foo", "bar");
        assert_eq!(
            symbols.globals.get(&bar).map(Vec::as_slice),
            Some(&[FilePos::new(2, 1), FilePos::new(3, 7)][..])
        );
        assert_eq!(bar.full_name(), "$Foo::bar");

        let other = GlobalVariable::new('$', "main", "other");
        assert_eq!(
            symbols.globals.get(&other).map(Vec::as_slice),
            Some(&[FilePos::new(4, 7)][..])
        );
    }

    #[test]
    fn test_element_access_resolves_to_the_container() {
        let source = "my @items = (1, 2);\nmy %config;\nprint $items[0];\nprint $config{path};\n";
        let symbols = resolve(source);
        assert_eq!(
            find_variable_usages(&symbols, FilePos::new(1, 4)),
            [FilePos::new(1, 4), FilePos::new(3, 7)]
        );
        assert_eq!(
            find_variable_usages(&symbols, FilePos::new(2, 4)),
            [FilePos::new(2, 4), FilePos::new(4, 7)]
        );
        assert!(symbols.globals.is_empty());
    }

    #[test]
    fn test_usage_after_scope_exit_is_a_global() {
        // The declaration is out of scope by the time of the second usage,
        // which therefore resolves to the package global.
        let symbols = resolve("{\n    my $y = 5;\n}\nprint $y;\n");
        assert_eq!(
            find_variable_usages(&symbols, FilePos::new(2, 8)),
            [FilePos::new(2, 8)]
        );
        let global = GlobalVariable::new('$', "main", "y");
        assert_eq!(
            symbols.globals.get(&global).map(Vec::as_slice),
            Some(&[FilePos::new(4, 7)][..])
        );
    }

    #[test]
    fn test_partial_parse_still_resolves() {
        let symbols = resolve("sub f {\nmy $x = 1;\nprint $x;\n");
        assert_eq!(symbols.partial_parse_line, Some(1));
        // The unterminated body still yields the sub and its variables.
        assert_eq!(symbols.subroutines.len(), 1);
        assert_eq!(symbols.subroutines[0].name, "f");
        assert_eq!(
            find_variable_usages(&symbols, FilePos::new(2, 4)),
            [FilePos::new(2, 4), FilePos::new(3, 7)]
        );
    }

    #[test]
    fn test_canonical_variable_name() {
        assert_eq!(canonical_variable_name("$main::x"), "$main::x");
        assert_eq!(canonical_variable_name("$main'x"), "$main::x");
        assert_eq!(canonical_variable_name("${main'x}"), "$main::x");
        assert_eq!(canonical_variable_name("$main::::x"), "$main::x");
        assert_eq!(canonical_variable_name("@list"), "@list");
        assert_eq!(canonical_variable_name("plain"), "plain");
    }

    #[test]
    fn test_fully_qualified_global() {
        let g = fully_qualified_global("$Legacy'name", "Foo").expect("global");
        assert_eq!(g, GlobalVariable::new('$', "Legacy", "name"));

        // No package part: the surrounding package owns it.
        let g = fully_qualified_global("@rows", "Report").expect("global");
        assert_eq!(g, GlobalVariable::new('@', "Report", "rows"));

        // An empty package part does too.
        let g = fully_qualified_global("$::x", "Foo").expect("global");
        assert_eq!(g, GlobalVariable::new('$', "Foo", "x"));

        assert!(fully_qualified_global("bare", "main").is_none());
    }
}
