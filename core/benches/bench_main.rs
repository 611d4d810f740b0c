use criterion::{Criterion, criterion_group, criterion_main};
use perlscan_core::symbols::{find_variable_usages, variable_names_at_pos};
use perlscan_core::token::{FilePos, Lexer};
use perlscan_core::{analyze, parse};
use std::hint::black_box;

const SAMPLE: &str = r#"#!/usr/bin/perl
use strict;
use warnings;
use feature qw(say state);
use List::Util qw(first max);

package Report::Builder;

our $default_width = 72;
my %config = (indent => 4, wrap => 1);

sub new ($class, %args) {
    my $self = { %args };
    return bless $self, $class;
}

sub render ($self, @rows) {
    my @lines;
    for my $row (@rows) {
        my $width = $row->{width} || $default_width;
        push @lines, format_row($row, $width) if $row =~ m/\S/;
    }
    return join "\n", @lines;
}

sub format_row ($row, $width) {
    state $count = 0;
    $count++;
    my $text = $row->{text};
    $text =~ s/\s+/ /g;
    return sprintf "%s", $text;
}

package main;

my $builder = Report::Builder->new(width => 80);
my @report = $builder->render({ text => 'totals', width => 40 });
say "done" if @report;
"#;

// Benchmark 1: lexing alone
fn bench_lexing(c: &mut Criterion) {
    c.bench_function("tokenize", |b| {
        b.iter(|| {
            let tokens = Lexer::tokenize(SAMPLE).unwrap();
            black_box(&tokens);
        })
    });
}

// Benchmark 2: block tree construction on a pre-lexed stream
fn bench_block_tree(c: &mut Criterion) {
    let tokens = Lexer::tokenize(SAMPLE).unwrap();
    c.bench_function("build_tree", |b| {
        b.iter(|| {
            let tree = parse::build_tree(&tokens);
            black_box(&tree);
        })
    });
}

// Benchmark 3: the full pipeline
fn bench_analyze(c: &mut Criterion) {
    c.bench_function("analyze", |b| {
        b.iter(|| {
            let symbols = analyze(SAMPLE).unwrap();
            black_box(&symbols);
        })
    });
}

// Benchmark 4: queries over a resolved file
fn bench_queries(c: &mut Criterion) {
    let symbols = analyze(SAMPLE).unwrap();
    let pos = FilePos::new(25, 16);

    c.bench_function("variable_names_at_pos", |b| {
        b.iter(|| {
            let items = variable_names_at_pos(&symbols, pos, '$');
            black_box(&items);
        })
    });

    c.bench_function("find_variable_usages", |b| {
        b.iter(|| {
            let usages = find_variable_usages(&symbols, pos);
            black_box(&usages);
        })
    });
}

criterion_group!(
    benches,
    bench_lexing,
    bench_block_tree,
    bench_analyze,
    bench_queries
);
criterion_main!(benches);
