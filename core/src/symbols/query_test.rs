#[cfg(test)]
mod tests {
    use crate::analysis::analyze;
    use crate::symbols::{
        find_variable_at_location, subroutine_names_at_pos, symbol_map_at_pos,
        variable_names_at_pos, CompletionItem, FileSymbols,
    };
    use crate::token::FilePos;

    fn resolve(source: &str) -> FileSymbols {
        analyze(source).expect("analyze")
    }

    fn sorted(mut items: Vec<CompletionItem>) -> Vec<CompletionItem> {
        items.sort_by(|a, b| a.name.cmp(&b.name));
        items
    }

    fn item(name: &str, detail: &str) -> CompletionItem {
        CompletionItem::new(name, detail)
    }

    #[test]
    fn test_symbol_map_prefers_the_innermost_scope() {
        let source = "my $x = 1;\n{\n    my $x = 2;\n    print $x;\n}\nprint $x;\n";
        let symbols = resolve(source);

        let inner = symbol_map_at_pos(&symbols, FilePos::new(4, 11));
        assert_eq!(inner.len(), 1);
        assert_eq!(inner["$x"].declaration, FilePos::new(3, 8));

        let outer = symbol_map_at_pos(&symbols, FilePos::new(6, 7));
        assert_eq!(outer["$x"].declaration, FilePos::new(1, 4));
    }

    #[test]
    fn test_variable_completion_adjusts_sigils() {
        let source = "my @list = (1, 2);\n$seen = 1;\nprint $Other::flag;\n";
        let symbols = resolve(source);
        let pos = FilePos::new(3, 19);

        // A `$` context offers array elements and plain scalars; the global
        // from this package comes bare, the foreign one fully qualified.
        let items = sorted(variable_names_at_pos(&symbols, pos, '$'));
        assert_eq!(
            items,
            [
                item("$Other::flag", ""),
                item("$list", ""),
                item("$seen", "$main::seen"),
            ]
        );

        // An `@` context reaches arrays and hash slices only.
        let items = sorted(variable_names_at_pos(&symbols, pos, '@'));
        assert_eq!(items, [item("@list", "")]);
    }

    #[test]
    fn test_shadowed_global_is_offered_qualified() {
        let source = "my $seen;\n$main::seen = 1;\n";
        let symbols = resolve(source);
        let items = sorted(variable_names_at_pos(&symbols, FilePos::new(2, 16), '$'));
        assert_eq!(items, [item("$main::seen", ""), item("$seen", "")]);
    }

    #[test]
    fn test_our_variable_completion_names_its_package() {
        let source = "package Counter;\nour $total;\n";
        let symbols = resolve(source);
        let items = variable_names_at_pos(&symbols, FilePos::new(2, 12), '$');
        assert_eq!(items, [item("$total", "Counter")]);
    }

    #[test]
    fn test_subroutine_completion_qualifies_foreign_packages() {
        let source = "package Foo;\nsub helper {\n    return 1;\n}\npackage main;\nsub work {\n    return 2;\n}\n";
        let symbols = resolve(source);

        let items = subroutine_names_at_pos(&symbols, FilePos::new(7, 5));
        assert_eq!(
            items,
            [item("Foo::helper", "helper()"), item("work", "work()")]
        );

        let items = subroutine_names_at_pos(&symbols, FilePos::new(3, 5));
        assert_eq!(
            items,
            [item("helper", "helper()"), item("main::work", "work()")]
        );
    }

    #[test]
    fn test_anonymous_subs_are_not_completed() {
        let symbols = resolve("my $cb = sub {\n    return 42;\n};\n");
        assert!(subroutine_names_at_pos(&symbols, FilePos::new(3, 3)).is_empty());
    }

    #[test]
    fn test_variable_at_location() {
        let symbols = resolve("my $count = 5;\nprint $count;\n");

        let (variable, usages) =
            find_variable_at_location(&symbols, FilePos::new(2, 9)).expect("variable");
        assert_eq!(variable.name, "$count");
        assert_eq!(usages, [FilePos::new(1, 4), FilePos::new(2, 7)]);

        assert!(find_variable_at_location(&symbols, FilePos::new(2, 1)).is_none());
    }
}
