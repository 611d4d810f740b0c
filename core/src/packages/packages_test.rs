#[cfg(test)]
mod tests {
    use crate::packages::{find_package_at_pos, resolve_packages, PackageSpan};
    use crate::parse::{build_tree, ParseTree};
    use crate::token::{FilePos, Lexer};

    fn spans_of(source: &str) -> (Vec<PackageSpan>, ParseTree) {
        let tokens = Lexer::tokenize(source).expect("tokenize");
        let tree = build_tree(&tokens);
        let spans = resolve_packages(&tree.root);
        (spans, tree)
    }

    fn names(spans: &[PackageSpan]) -> Vec<&str> {
        spans.iter().map(|s| s.package_name.as_str()).collect()
    }

    #[test]
    fn test_file_without_package_is_main() {
        let (spans, tree) = spans_of("my $x = 1;\nprint $x;\n");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].package_name, "main");
        assert_eq!(spans[0].start, FilePos::new(1, 1));
        assert_eq!(spans[0].end, tree.root.end);
    }

    #[test]
    fn test_package_statement_lasts_until_next() {
        let source = "my $a;\npackage Foo;\nmy $b;\npackage Bar;\nmy $c;\n";
        let (spans, _) = spans_of(source);
        assert_eq!(names(&spans), ["main", "Foo", "Bar"]);
        assert_eq!(find_package_at_pos(&spans, FilePos::new(1, 4)), "main");
        assert_eq!(find_package_at_pos(&spans, FilePos::new(3, 4)), "Foo");
        assert_eq!(find_package_at_pos(&spans, FilePos::new(5, 4)), "Bar");
    }

    #[test]
    fn test_block_form_covers_only_its_block() {
        let source = "package Outer;\npackage Inner {\n    my $x;\n}\nmy $y;\n";
        let (spans, _) = spans_of(source);
        assert_eq!(find_package_at_pos(&spans, FilePos::new(3, 8)), "Inner");
        // After the block the enclosing package is back in effect.
        assert_eq!(find_package_at_pos(&spans, FilePos::new(5, 3)), "Outer");
    }

    #[test]
    fn test_leaving_a_scope_restores_the_package() {
        let source = "{\n    package Tmp;\n    my $x;\n}\nmy $y;\n";
        let (spans, _) = spans_of(source);
        assert_eq!(names(&spans), ["main", "Tmp", "main"]);
        assert_eq!(find_package_at_pos(&spans, FilePos::new(3, 8)), "Tmp");
        assert_eq!(find_package_at_pos(&spans, FilePos::new(5, 3)), "main");
    }

    #[test]
    fn test_plain_block_keeps_the_package() {
        let source = "package A;\nmy $x;\n{\n    my $y;\n}\nmy $z;\n";
        let (spans, _) = spans_of(source);
        // Entering and leaving the block never splits the A region.
        assert_eq!(names(&spans), ["main", "A"]);
        assert_eq!(find_package_at_pos(&spans, FilePos::new(4, 8)), "A");
        assert_eq!(find_package_at_pos(&spans, FilePos::new(6, 3)), "A");
    }

    #[test]
    fn test_spans_cover_the_file_without_gaps() {
        let source = "package Outer;\npackage Inner {\n    my $x;\n}\nmy $y;\npackage Last;\nmy $z;\n";
        let (spans, tree) = spans_of(source);
        assert_eq!(spans[0].start, FilePos::new(1, 1));
        assert_eq!(spans.last().expect("spans").end, tree.root.end);
        for pair in spans.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert_ne!(pair[0].package_name, pair[1].package_name);
        }
    }

    #[test]
    fn test_nested_packages() {
        let source = "package A;\nsub outer {\n    package B;\n    my $x;\n}\nmy $y;\n";
        let (spans, _) = spans_of(source);
        assert_eq!(find_package_at_pos(&spans, FilePos::new(4, 8)), "B");
        assert_eq!(find_package_at_pos(&spans, FilePos::new(6, 3)), "A");
    }

    #[test]
    fn test_find_package_defaults_to_main() {
        assert_eq!(find_package_at_pos(&[], FilePos::new(1, 1)), "main");
    }
}
