use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};

use super::error::{FilePos, LexError};
use super::{SKIP_INLINE_TRIVIA, Token, TokenIterator, TokenKind};

const EOF_CHAR: char = '\0';

/// Letters accepted after `-` as a unary file-test operator (`-e`, `-x`, ...).
const FILE_TEST_LETTERS: &str = "rwxoRWXOezsfdlpSbctugkTBMAC";

/// Symbolic operators, longest-first within a shared prefix. Order matters:
/// the first entry that matches wins.
const SYMBOLIC_OPERATORS: &[&str] = &[
    "+=", "++", "+", "--", "-=", "**=", "*=", "**", "*", "!=", "!~", "!", "~", "\\", "==", "=~",
    "//=", "=>", "//", "%=", "%", ">>=", ">>", ">", ">=", "<=>", "<<=", "<<", "<", "~~", "&=",
    "&.=", "&&=", "&&", "&", "||=", "|.=", "|=", "||", "^=", "^.=", "^", "...", "..", "?:", ":",
    ".=", "?",
];

/// Alphabetic operators. These must be followed by a non-word character so
/// that e.g. `order` is not read as `or` + `der`.
const WORD_OPERATORS: &[&str] = &[
    "lt", "gt", "le", "ge", "eq", "ne", "cmp", "and", "or", "not", "xor",
];

static KEYWORDS: Lazy<FxHashMap<&'static str, TokenKind>> = Lazy::new(|| {
    FxHashMap::from_iter([
        ("use", TokenKind::Use),
        ("require", TokenKind::Require),
        ("if", TokenKind::If),
        ("else", TokenKind::Else),
        ("elsif", TokenKind::ElsIf),
        ("unless", TokenKind::Unless),
        ("while", TokenKind::While),
        ("until", TokenKind::Until),
        ("for", TokenKind::For),
        ("foreach", TokenKind::Foreach),
        ("when", TokenKind::When),
        ("do", TokenKind::Do),
        ("next", TokenKind::Next),
        ("redo", TokenKind::Redo),
        ("last", TokenKind::Last),
        ("my", TokenKind::My),
        ("state", TokenKind::State),
        ("local", TokenKind::Local),
        ("our", TokenKind::Our),
        ("break", TokenKind::Break),
        ("continue", TokenKind::Continue),
        ("given", TokenKind::Given),
        ("sub", TokenKind::Sub),
        ("package", TokenKind::Package),
    ])
});

/// Perl builtin functions. Identifiers found here are tagged `Builtin`
/// instead of `Name` so later passes can tell user subs from core ones.
static BUILTINS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    FxHashSet::from_iter([
        "abs",
        "accept",
        "alarm",
        "and",
        "atan2",
        "bind",
        "binmode",
        "bless",
        "break",
        "caller",
        "chdir",
        "chmod",
        "chomp",
        "chop",
        "chown",
        "chr",
        "chroot",
        "close",
        "closedir",
        "cmp",
        "connect",
        "continue",
        "cos",
        "crypt",
        "__DATA__",
        "dbmclose",
        "dbmopen",
        "default",
        "defined",
        "delete",
        "die",
        "do",
        "dump",
        "each",
        "else",
        "elseif",
        "elsif",
        "endgrent",
        "endhostent",
        "endnetent",
        "endprotoent",
        "endpwent",
        "endservent",
        "eof",
        "eq",
        "eval",
        "evalbytes",
        "exec",
        "exists",
        "exit",
        "exp",
        "fc",
        "fcntl",
        "fileno",
        "flock",
        "for",
        "foreach",
        "fork",
        "format",
        "formline",
        "ge",
        "getc",
        "getgrent",
        "getgrgid",
        "getgrnam",
        "gethostbyaddr",
        "gethostbyname",
        "gethostent",
        "getlogin",
        "getnetbyaddr",
        "getnetbyname",
        "getnetent",
        "getpeername",
        "getpgrp",
        "getppid",
        "getpriority",
        "getprotobyname",
        "getprotobynumber",
        "getprotoent",
        "getpwent",
        "getpwnam",
        "getpwuid",
        "getservbyname",
        "getservbyport",
        "getservent",
        "getsockname",
        "getsockopt",
        "given",
        "glob",
        "gmtime",
        "goto",
        "grep",
        "gt",
        "hex",
        "INIT",
        "if",
        "import",
        "index",
        "int",
        "ioctl",
        "join",
        "keys",
        "kill",
        "last",
        "lc",
        "lcfirst",
        "le",
        "length",
        "link",
        "listen",
        "local",
        "localtime",
        "lock",
        "log",
        "lstat",
        "lt",
        "m",
        "map",
        "mkdir",
        "msgctl",
        "msgget",
        "msgrcv",
        "msgsnd",
        "my",
        "ne",
        "next",
        "no",
        "not",
        "oct",
        "open",
        "opendir",
        "or",
        "ord",
        "our",
        "pack",
        "package",
        "pipe",
        "pop",
        "pos",
        "print",
        "printf",
        "prototype",
        "push",
        "q",
        "qq",
        "qr",
        "quotemeta",
        "qw",
        "qx",
        "rand",
        "read",
        "readdir",
        "readline",
        "readlink",
        "readpipe",
        "recv",
        "redo",
        "ref",
        "rename",
        "require",
        "reset",
        "return",
        "reverse",
        "rewinddir",
        "rindex",
        "rmdir",
        "s",
        "say",
        "scalar",
        "seek",
        "seekdir",
        "select",
        "semctl",
        "semget",
        "semop",
        "send",
        "setgrent",
        "sethostent",
        "setnetent",
        "setpgrp",
        "setpriority",
        "setprotoent",
        "setpwent",
        "setservent",
        "setsockopt",
        "shift",
        "shmctl",
        "shmget",
        "shmread",
        "shmwrite",
        "shutdown",
        "sin",
        "sleep",
        "socket",
        "socketpair",
        "sort",
        "splice",
        "split",
        "sprintf",
        "sqrt",
        "srand",
        "stat",
        "state",
        "study",
        "sub",
        "substr",
        "symlink",
        "syscall",
        "sysopen",
        "sysread",
        "sysseek",
        "system",
        "syswrite",
        "tell",
        "telldir",
        "tie",
        "tied",
        "time",
        "times",
        "tr",
        "truncate",
        "UNITCHECK",
        "uc",
        "ucfirst",
        "umask",
        "undef",
        "unless",
        "unlink",
        "unpack",
        "unshift",
        "untie",
        "until",
        "use",
        "utime",
        "values",
        "vec",
        "wait",
        "waitpid",
        "wantarray",
        "warn",
        "when",
        "while",
        "write",
        "x",
        "xor",
    ])
});

static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\+|-)?((\d+|_)\.?(\d|_)*(e(\+|-)?(\d|_)+?)?|0x[0-9a-fA-F]+|0b[01]+|)$")
        .unwrap()
});

static VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v?\d([_.]?\d)*$").unwrap());

fn is_whitespace_char(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\x0c' || c == '\u{feff}'
}

fn is_newline_char(c: char) -> bool {
    c == '\n' || c == '\r'
}

fn is_punctuation_char(c: char) -> bool {
    ('!'..='/').contains(&c)
        || (':'..='@').contains(&c)
        || ('['..='`').contains(&c)
        || ('{'..='~').contains(&c)
}

/// Characters that may appear in a bareword body after the first character.
/// Deliberately loose; the grammar around barewords decides what they mean.
fn is_name_body(c: char) -> bool {
    c >= '!'
        && !matches!(
            c,
            ';' | ',' | '>' | '<' | '-' | '.' | '{' | '}' | '(' | ')' | '[' | ']' | ':' | '='
                | '"'
                | '/'
        )
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn bracket_pair(open: char) -> Option<char> {
    match open {
        '(' => Some(')'),
        '[' => Some(']'),
        '{' => Some('}'),
        '<' => Some('>'),
        _ => None,
    }
}

/// Single-file Perl lexer.
///
/// Perl cannot be tokenized without context: `/` is division or a regex
/// delimiter, `{` opens a block or a hash subscript, heredoc bodies are
/// keyed off tokens earlier on the same line. The lexer therefore keeps the
/// token list it has produced so far and consults it while matching, then
/// runs a retagging pass over the finished list.
pub struct Lexer {
    chars: Vec<char>,
    idx: usize,
    len: usize,
    line: u32,
    column: u32,
    tokens: Vec<Token>,
}

impl Lexer {
    /// Tokenize a whole file. The result always ends with `EndOfInput`.
    /// Errors only when no token pattern applies at the cursor; recoverable
    /// damage (unterminated strings, stray braces) still produces tokens.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer::new(source);
        while lexer.tokens.last().map(|t| t.kind) != Some(TokenKind::EndOfInput) {
            lexer.next_tokens()?;
        }
        second_pass(&mut lexer.tokens);
        Ok(lexer.tokens)
    }

    fn new(source: &str) -> Self {
        let chars: Vec<char> = source.chars().collect();
        let len = chars.len();
        Self {
            chars,
            idx: 0,
            len,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    // --- cursor primitives ---

    fn eof(&self) -> bool {
        self.idx >= self.len
    }

    /// Character `k` positions ahead of the cursor; `look(0)` is the next
    /// unconsumed character. Returns NUL past the end of input.
    fn look(&self, k: usize) -> char {
        self.chars.get(self.idx + k).copied().unwrap_or(EOF_CHAR)
    }

    /// 1-based variant for lookahead automatons that count from 1.
    fn look1(&self, k: usize) -> char {
        self.look(k - 1)
    }

    fn last_char(&self) -> char {
        if self.idx == 0 {
            EOF_CHAR
        } else {
            self.chars[self.idx - 1]
        }
    }

    fn advance(&mut self) -> char {
        if self.eof() {
            return EOF_CHAR;
        }
        let c = self.chars[self.idx];
        self.idx += 1;
        if c == '\n' || (c == '\r' && self.look(0) != '\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    /// Skip `n` characters known to sit on the current line.
    fn advance_same_line(&mut self, n: usize) {
        self.idx += n;
        self.column += n as u32;
    }

    fn current_pos(&self) -> FilePos {
        FilePos::with_offset(self.line, self.column, self.idx)
    }

    fn backtrack(&mut self, pos: FilePos) {
        // Positions produced by this lexer always carry an offset.
        self.idx = pos.offset.unwrap_or(self.idx);
        self.line = pos.line;
        self.column = pos.column;
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<String>, start: FilePos) {
        let end = self.current_pos();
        self.tokens.push(Token::new(kind, text, start, end));
    }

    fn push_spanned(&mut self, kind: TokenKind, text: impl Into<String>, start: FilePos, end: FilePos) {
        self.tokens.push(Token::new(kind, text, start, end));
    }

    fn get_while(&mut self, test: impl Fn(char) -> bool) -> String {
        let mut acc = String::new();
        while !self.eof() && test(self.look(0)) {
            acc.push(self.advance());
        }
        acc
    }

    // --- low level matchers ---

    /// Try each option in order against the upcoming characters, consuming
    /// the first that matches fully. With `require_trailing_non_word` the
    /// character after the option must not continue a word, so `length` is
    /// not read as `le` + `ngth`.
    fn match_string_option(
        &mut self,
        options: &[&'static str],
        require_trailing_non_word: bool,
    ) -> Option<&'static str> {
        'options: for option in options {
            let mut i = 0;
            for ch in option.chars() {
                if self.look(i) != ch {
                    continue 'options;
                }
                i += 1;
            }
            if require_trailing_non_word && is_word_char(self.look(i)) {
                continue;
            }
            self.advance_same_line(i);
            return Some(option);
        }
        None
    }

    fn match_whitespace(&mut self) -> String {
        self.get_while(is_whitespace_char)
    }

    fn add_whitespace_token(&mut self) {
        let start = self.current_pos();
        let whitespace = self.match_whitespace();
        if !whitespace.is_empty() {
            self.push(TokenKind::Whitespace, whitespace, start);
        }
    }

    /// Newline matcher handling unix, windows and legacy mac line endings.
    fn match_newline_token(&mut self) -> bool {
        let start = self.current_pos();
        if self.look(0) == '\n' {
            self.advance();
            self.push(TokenKind::Newline, "\n", start);
            true
        } else if self.look(0) == '\r' && self.look(1) == '\n' {
            self.advance();
            self.advance();
            self.push(TokenKind::Newline, "\r\n", start);
            true
        } else if self.look(0) == '\r' {
            self.advance();
            self.push(TokenKind::Newline, "\r", start);
            true
        } else {
            false
        }
    }

    /// Consume runs of newlines, whitespace and (optionally) comments.
    /// Returns true if anything was consumed.
    fn add_trivia_tokens(&mut self, ignore_comments: bool) -> bool {
        let before = self.tokens.len();
        let mut matched = true;
        while matched {
            matched = self.match_newline_token();
            let start = self.current_pos();
            let whitespace = self.match_whitespace();
            if !whitespace.is_empty() {
                self.push(TokenKind::Whitespace, whitespace, start);
                matched = true;
            }
            matched = self.match_newline_token() || matched;
            if !ignore_comments {
                let start = self.current_pos();
                let comment = self.match_comment();
                if !comment.is_empty() {
                    self.push(TokenKind::Comment, comment, start);
                    matched = true;
                }
            }
        }
        before != self.tokens.len()
    }

    fn match_comment(&mut self) -> String {
        let mut comment = String::new();
        if self.look(0) == '#' {
            comment.push(self.advance());
            while !self.eof() && !is_newline_char(self.look(0)) {
                comment.push(self.advance());
            }
        }
        comment
    }

    fn match_name(&mut self) -> String {
        self.get_while(is_name_body)
    }

    fn match_letters_of(&mut self, letters: &str) -> String {
        self.get_while(|c| letters.contains(c))
    }

    // --- strings ---

    /// Match string contents up to an unescaped `delim`, leaving the cursor
    /// on the delimiter. Escaped delimiters and escaped backslashes are kept
    /// verbatim in the returned text.
    fn match_string_literal(&mut self, delim: char) -> String {
        let mut contents = String::new();
        while !self.eof() {
            if self.look(0) == '\\' && (self.look(1) == delim || self.look(1) == '\\') {
                contents.push(self.advance());
                contents.push(self.advance());
                continue;
            }
            if self.look(0) == delim {
                break;
            }
            contents.push(self.advance());
        }
        contents
    }

    /// Match contents of a bracket-delimited string with nesting, e.g.
    /// `qq{a {b} c}`. The cursor starts one past the opening bracket and is
    /// left on the matching closing bracket.
    fn match_bracketed_string_literal(&mut self, bracket: char) -> String {
        let mut contents = String::new();
        let Some(end_bracket) = bracket_pair(bracket) else {
            return contents;
        };

        let mut depth = 1;
        while !self.eof() {
            let c = self.look(0);
            if c == '\\'
                && (self.look(1) == bracket || self.look(1) == end_bracket || self.look(1) == '\\')
            {
                contents.push(self.advance());
                contents.push(self.advance());
                continue;
            }
            if c == end_bracket {
                depth -= 1;
                if depth == 0 {
                    return contents;
                }
            } else if c == bracket {
                depth += 1;
            }
            contents.push(self.advance());
        }
        contents
    }

    /// Match one delimited string part, producing `StringStart`, optional
    /// `String` and `StringEnd` tokens. Works for both bracket and plain
    /// delimiters; the delimiter may be any character.
    fn match_delim_string(&mut self) {
        let quote_char = self.look(0);
        let start = self.current_pos();
        self.advance();
        self.push(TokenKind::StringStart, quote_char.to_string(), start);

        let start = self.current_pos();
        let contents = if bracket_pair(quote_char).is_some() {
            self.match_bracketed_string_literal(quote_char)
        } else {
            self.match_string_literal(quote_char)
        };
        if !contents.is_empty() {
            self.push(TokenKind::String, contents, start);
        }

        let start = self.current_pos();
        if self.eof() {
            // Unterminated string: emit a zero-width end so downstream
            // passes still see a balanced start/end pair.
            self.push(TokenKind::StringEnd, "", start);
        } else {
            let end_char = self.advance();
            self.push(TokenKind::StringEnd, end_char.to_string(), start);
        }
    }

    /// `"..."`, `'...'`, `/.../` and `` `...` ``.
    fn match_simple_string(&mut self) -> bool {
        if matches!(self.look(0), '"' | '\'' | '/' | '`') {
            self.match_delim_string();
            return true;
        }
        false
    }

    /// `/contents/modifiers` with the standard regex modifier set.
    fn match_slash_string(&mut self) -> bool {
        if self.look(0) != '/' {
            return false;
        }
        if self.match_simple_string() {
            let start = self.current_pos();
            let modifiers = self.match_letters_of("msixpodualngc");
            if !modifiers.is_empty() {
                self.push(TokenKind::StringModifiers, modifiers, start);
            }
            return true;
        }
        false
    }

    fn match_quote_operator(&mut self) -> Option<String> {
        let p1 = self.look(0);
        let p2 = self.look(1);
        if p1 == 'q' && matches!(p2, 'q' | 'x' | 'w' | 'r') {
            self.advance();
            self.advance();
            Some(format!("{p1}{p2}"))
        } else if matches!(p1, 'q' | 'm' | 's' | 'y') {
            self.advance();
            Some(p1.to_string())
        } else if p1 == 't' && p2 == 'r' {
            self.advance();
            self.advance();
            Some("tr".to_string())
        } else {
            None
        }
    }

    /// Full quote-like literal: `q qq qw qx qr m s y tr` with arbitrary
    /// delimiters and trailing modifiers. The plain `"` `'` `` ` `` `/`
    /// forms are handled by `match_simple_string` instead.
    ///
    /// An alphanumeric delimiter is only legal after whitespace (`q XhelloX`
    /// is a string, `say` is not), otherwise the whole match is undone.
    fn match_quote_literal(&mut self) -> bool {
        let tokens_mark = self.tokens.len();
        let start_pos = self.current_pos();
        let Some(quote_operator) = self.match_quote_operator() else {
            return false;
        };
        let is_two_part = matches!(quote_operator.as_str(), "s" | "y" | "tr");
        self.push(TokenKind::QuoteIdent, quote_operator.clone(), start_pos);

        let trivia_matched = self.add_trivia_tokens(true);
        let quote_char = self.look(0);
        if quote_char.is_ascii_alphanumeric() && !trivia_matched {
            self.tokens.truncate(tokens_mark);
            self.backtrack(start_pos);
            return false;
        }

        self.add_whitespace_token();
        self.match_delim_string();

        if is_two_part {
            if bracket_pair(quote_char).is_some() {
                // Bracketed forms delimit each part separately and allow
                // trivia in between: s{...} {...}
                self.add_whitespace_token();
                self.add_trivia_tokens(true);
                self.match_delim_string();
            } else {
                // The middle delimiter is shared: s/abc/def/
                let start = self.current_pos();
                let contents = self.match_string_literal(quote_char);
                if !contents.is_empty() {
                    self.push(TokenKind::String, contents, start);
                }
                let start = self.current_pos();
                if self.eof() {
                    self.push(TokenKind::StringEnd, "", start);
                } else {
                    let end_char = self.advance();
                    self.push(TokenKind::StringEnd, end_char.to_string(), start);
                }
            }
        }

        let start = self.current_pos();
        let modifiers = match quote_operator.as_str() {
            "s" => self.match_letters_of("msixpodualngcer"),
            "m" => self.match_letters_of("msixpodualngc"),
            "qr" => self.match_letters_of("msixpodualn"),
            "tr" | "y" => self.match_letters_of("cdsr"),
            _ => String::new(),
        };
        if !modifiers.is_empty() {
            self.push(TokenKind::StringModifiers, modifiers, start);
        }
        true
    }

    // --- heredocs ---

    /// Called after every `Newline` token: walk back over the finished line
    /// looking for a `<<` operator announcing a heredoc, and if one is found
    /// consume its body immediately.
    fn scan_for_heredoc(&mut self) {
        let mut found: Option<(String, bool)> = None;
        let tokens = &self.tokens;
        let n = tokens.len();
        if n < 2 {
            return;
        }
        let mut idx = n - 2;
        loop {
            let token = &tokens[idx];
            if token.kind == TokenKind::Newline {
                break;
            }
            if token.kind == TokenKind::Operator && token.text == "<<" {
                let mut i = idx;
                let has_whitespace = i + 1 < n && tokens[i + 1].kind == TokenKind::Whitespace;
                if has_whitespace {
                    i += 1;
                }
                let has_tilde = i + 1 < n
                    && tokens[i + 1].kind == TokenKind::Operator
                    && tokens[i + 1].text == "~";
                if has_tilde {
                    i += 1;
                }
                i += 1;
                if i < n - 1 {
                    match tokens[i].kind {
                        // Whitespace between << and a bareword delimiter
                        // means shift, not heredoc.
                        TokenKind::Name if !has_whitespace => {
                            found = Some((tokens[i].text.clone(), has_tilde));
                            break;
                        }
                        TokenKind::StringStart if i + 1 < n => {
                            if tokens[i + 1].kind == TokenKind::String {
                                found = Some((tokens[i + 1].text.clone(), has_tilde));
                                break;
                            } else if tokens[i + 1].kind == TokenKind::StringEnd {
                                found = Some((String::new(), has_tilde));
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            }
            if idx == 0 {
                break;
            }
            idx -= 1;
        }

        if let Some((delim, has_tilde)) = found {
            self.match_heredoc_body(&delim, has_tilde);
        }
    }

    /// Consume heredoc body lines until the terminator line. With `<<~` the
    /// terminator may be indented. The terminator line becomes `HereDocEnd`;
    /// the newline after it is left for the main loop.
    fn match_heredoc_body(&mut self, delim: &str, has_tilde: bool) {
        let start = self.current_pos();
        let mut line_start = self.current_pos();
        let mut contents = String::new();
        let mut line = String::new();

        'outer: while !self.eof() {
            let c = self.look(0);
            if is_newline_char(c) {
                if line == delim {
                    break;
                }
                if has_tilde {
                    if let Some(non_ws) = line.find(|ch| !is_whitespace_char(ch)) {
                        if &line[non_ws..] == delim {
                            break 'outer;
                        }
                    }
                }
                if c == '\n' {
                    line.push(self.advance());
                } else if self.look(1) == '\n' {
                    line.push(self.advance());
                    line.push(self.advance());
                } else {
                    line.push(self.advance());
                }
                contents.push_str(&line);
                line.clear();
                line_start = self.current_pos();
            } else {
                line.push(self.advance());
            }
        }

        if !contents.is_empty() {
            self.push_spanned(TokenKind::HereDoc, contents, start, line_start);
        }
        self.push(TokenKind::HereDocEnd, line, line_start);
    }

    // --- variables and identifiers ---

    /// Lookahead over `::` and legacy `'` package separators starting at
    /// 1-based offset `i`. Returns how many characters they occupy.
    fn peek_package_tokens(&self, i: usize) -> usize {
        let start = i;
        let mut i = i;
        loop {
            if self.look1(i) == ':' && self.look1(i + 1) == ':' {
                i += 2;
            } else if self.look1(i) == '\''
                && self.look1(i + 1) != ':'
                && self.look1(i + 2) != ':'
            {
                i += 1;
            } else {
                return i - start;
            }
        }
    }

    /// Match a variable including its sigil: package-qualified names,
    /// `$#array` and `$#$ref` length forms, numbered captures, punctuation
    /// variables, `$^A` carets and `${^NAME}` braced carets.
    ///
    /// Pure lookahead; consumes only on success. Too irregular for a regex.
    fn match_variable(&mut self) -> Option<String> {
        let mut i: usize = 1; // 1-based lookahead offset
        if !matches!(self.look1(i), '$' | '@' | '%') {
            return None;
        }
        if self.look1(i) == '$' && self.look1(i + 1) == '#' {
            // Array-length form. $#array is the common case, but the target
            // may be a reference too: $#$array_ref.
            i += 1;
            if self.look1(i + 1) == '$' {
                i += 1;
            }
        }
        i += 1;

        let package_delta = self.peek_package_tokens(i);
        i += package_delta;
        if self.look1(i).is_ascii_alphabetic() || self.look1(i) == '_' {
            // Ordinary name, possibly package-qualified in the middle too:
            // $Foo::Bar::baz, $Legacy'name.
            i += 1;
            loop {
                let segment_start = i;
                i += self.peek_package_tokens(i);
                while is_word_char(self.look1(i)) {
                    i += 1;
                }
                if i == segment_start {
                    break;
                }
            }
        } else {
            i -= package_delta;
            let mut matched = false;

            if self.look1(i) == '^' {
                let second = self.look1(i + 1);
                if second.is_ascii_uppercase()
                    || matches!(second, '[' | ']' | '^' | '_' | '?' | '\\')
                {
                    i += 2;
                    matched = true;
                }
            }
            if !matched && self.look1(i).is_ascii_digit() {
                i += 1;
                while self.look1(i).is_ascii_digit() {
                    i += 1;
                }
                matched = true;
            }
            if !matched && is_punctuation_char(self.look1(i)) && self.look1(i) != '{' {
                i += 1;
                matched = true;
            }
            if !matched && self.look1(i) == '{' && self.look1(i + 1) == '^' {
                // ${^NAME}; without the closing brace this is not a variable.
                let before_bracket = i;
                i += 2;
                if self.look1(i) == '_' {
                    i += 1;
                }
                while self.look1(i).is_ascii_alphanumeric() {
                    i += 1;
                }
                if self.look1(i) == '}' {
                    i += 1;
                } else {
                    i = before_bracket;
                }
            }
        }

        // Nothing after the sigil matched.
        if i == 2 {
            return None;
        }

        let var: String = self.chars[self.idx..self.idx + i - 1].iter().collect();
        self.advance_same_line(i - 1);
        Some(var)
    }

    /// See https://perldoc.perl.org/perldata#Identifier-parsing
    fn match_basic_identifier(&self, i: &mut usize) -> String {
        if self.look1(*i).is_ascii_digit() {
            return String::new();
        }
        let mut contents = String::new();
        while is_name_body(self.look1(*i)) {
            contents.push(self.look1(*i));
            *i += 1;
        }
        contents
    }

    /// Identifier with optional package separators, no sigil.
    fn do_match_normal_identifier(&self, i: &mut usize) -> String {
        let mut contents = String::new();
        while self.look1(*i) == ':' {
            if self.look1(*i + 1) != ':' {
                return contents;
            }
            contents.push_str("::");
            *i += 2;
        }
        if self.look1(*i) == '\'' {
            contents.push('\'');
            *i += 1;
        }

        let basic = self.match_basic_identifier(i);
        if basic.is_empty() {
            return contents;
        }
        contents.push_str(&basic);

        while self.look1(*i) == ':' {
            if self.look1(*i + 1) != ':' {
                return contents;
            }
            contents.push_str("::");
            *i += 2;
        }
        if self.look1(*i) == '\'' {
            contents.push('\'');
            *i += 1;
        }

        contents.push_str(&self.do_match_normal_identifier(i));
        while self.look1(*i) == ':' {
            if self.look1(*i + 1) != ':' {
                return contents;
            }
            contents.push_str("::");
            *i += 2;
        }
        contents
    }

    fn match_identifier(&mut self) -> String {
        let mut i = 1;
        let ident = self.do_match_normal_identifier(&mut i);
        self.advance_same_line(i - 1);
        ident
    }

    fn try_match_keyword(&mut self) -> Option<TokenKind> {
        let mut word = String::new();
        let mut i = 0;
        while self.look(i).is_ascii_alphabetic() {
            word.push(self.look(i));
            i += 1;
        }
        if word.is_empty() || is_word_char(self.look(i)) {
            return None;
        }
        let kind = *KEYWORDS.get(word.as_str())?;
        self.advance_same_line(word.len());
        Some(kind)
    }

    // --- literals ---

    fn match_numeric(&mut self) -> Option<String> {
        let mut candidate = String::new();
        let mut i = 0;
        while self.look(i).is_ascii_alphanumeric() || matches!(self.look(i), '.' | '+' | '-' | '_')
        {
            candidate.push(self.look(i));
            i += 1;
        }
        if candidate.is_empty() {
            return None;
        }
        let first = candidate.as_bytes()[0];
        if !first.is_ascii_digit() && first != b'+' && first != b'-' {
            return None;
        }
        if NUMERIC_RE.is_match(&candidate) {
            self.advance_same_line(i);
            return Some(candidate);
        }
        None
    }

    /// Version strings: v5.10, 5.8.1. Plain `5.4` parses as a numeric
    /// literal first, which is fine since only `use`/`require` handling
    /// cares about the distinction and checks both.
    fn match_version_string(&mut self) -> Option<String> {
        if self.look(0) != 'v' && !self.look(0).is_ascii_digit() {
            return None;
        }
        let mut version = String::new();
        let mut i = 0;
        if self.look(0) == 'v' {
            version.push('v');
            i = 1;
        }
        while self.look(i).is_ascii_digit() || matches!(self.look(i), '.' | '_') {
            version.push(self.look(i));
            i += 1;
        }
        if VERSION_RE.is_match(&version) {
            self.advance_same_line(i);
            return Some(version);
        }
        None
    }

    fn match_pod(&mut self) -> String {
        let mut pod = String::new();
        let prev = self.last_char();
        if !(prev == EOF_CHAR || is_newline_char(prev)) {
            return pod;
        }
        if self.look(0) != '=' || is_whitespace_char(self.look(1)) {
            return pod;
        }
        // Consume up to a line that begins with =cut.
        while !self.eof() {
            let at_cut = self.look(0) == '\n'
                && self.look(1) == '='
                && self.look(2) == 'c'
                && self.look(3) == 'u'
                && self.look(4) == 't';
            pod.push(self.advance());
            if at_cut {
                for _ in 0..4 {
                    pod.push(self.advance());
                }
                break;
            }
        }
        pod
    }

    // --- hash dereference brackets ---

    /// Match `{...}` after a variable or `->`, where the contents may be an
    /// unquoted bareword that must not be read as a keyword or quote
    /// operator. Falls back to recursive tokenization for anything more
    /// complicated than a single bareword key.
    fn match_dereference_brackets(&mut self) -> Result<(), LexError> {
        if self.look(0) != '{' {
            return Ok(());
        }
        let start = self.current_pos();
        self.advance();
        self.push(TokenKind::HashDerefStart, "{", start);
        self.add_whitespace_token();

        let mut offset = 1;
        while is_name_body(self.look1(offset)) {
            offset += 1;
        }
        while is_whitespace_char(self.look1(offset)) {
            offset += 1;
        }
        if self.look1(offset) == '}' && self.look(0).is_ascii_alphabetic() {
            let start = self.current_pos();
            let name = self.match_name();
            self.push(TokenKind::HashKey, name, start);
            self.add_whitespace_token();
            let start = self.current_pos();
            self.advance();
            self.push(TokenKind::HashDerefEnd, "}", start);
            return Ok(());
        }

        while !matches!(
            self.tokens.last().map(|t| t.kind),
            Some(TokenKind::RBrace) | Some(TokenKind::EndOfInput)
        ) {
            self.next_tokens()?;
        }
        if self.tokens.last().map(|t| t.kind) == Some(TokenKind::RBrace) {
            let last = self.tokens.len() - 1;
            self.tokens[last].kind = TokenKind::HashDerefEnd;
        }
        Ok(())
    }

    // --- subroutine headers ---

    /// After the `sub` keyword: optional name, then prototype or signature
    /// and attributes in either order. Distinguishing prototype from
    /// signature is itself a heuristic, see `looks_like_prototype`.
    fn match_subroutine(&mut self) {
        self.add_whitespace_token();
        self.match_newline_token();

        let start = self.current_pos();
        let name = self.match_identifier();
        if !name.is_empty() {
            self.push(TokenKind::SubName, name, start);
        }
        self.add_whitespace_token();

        if self.look(0) == '{' {
            let start = self.current_pos();
            self.advance();
            self.push(TokenKind::LBrace, "{", start);
            return;
        }
        if !matches!(self.look(0), '(' | ':') {
            return;
        }

        let attributes_matched = self.match_attributes();
        self.add_whitespace_token();

        if attributes_matched {
            self.match_signature_tokens();
        } else {
            if self.looks_like_prototype() {
                let start = self.current_pos();
                let prototype = self.match_prototype();
                if !prototype.is_empty() {
                    self.push(TokenKind::Prototype, prototype, start);
                }
            } else {
                self.match_signature_tokens();
            }
            self.match_attributes();
        }
    }

    fn match_attribute(&mut self) -> bool {
        if self.look(0) == ':' {
            let start = self.current_pos();
            self.advance();
            self.push(TokenKind::AttributeColon, ":", start);
        }
        self.add_whitespace_token();

        let start = self.current_pos();
        let name = self.match_name();
        if name.is_empty() {
            return false;
        }
        self.push(TokenKind::Attribute, name, start);

        if self.look(0) == '(' {
            let start = self.current_pos();
            self.advance();
            let mut args = String::from("(");
            args.push_str(&self.match_bracketed_string_literal('('));
            if !self.eof() {
                args.push(self.advance());
            }
            self.push(TokenKind::AttributeArgs, args, start);
        }
        true
    }

    fn match_attributes(&mut self) -> bool {
        self.add_whitespace_token();
        if self.look(0) != ':' {
            return false;
        }
        let start = self.current_pos();
        self.advance();
        self.push(TokenKind::AttributeColon, ":", start);

        loop {
            if !self.match_attribute() {
                // The colon was matched, so attributes were present.
                return true;
            }
            self.add_whitespace_token();
        }
    }

    fn match_prototype(&mut self) -> String {
        let mut proto = String::new();
        if self.look(0) != '(' {
            return proto;
        }
        proto.push(self.advance());
        while !self.eof() && self.look(0) != ')' && !is_newline_char(self.look(0)) {
            proto.push(self.advance());
        }
        if self.look(0) == ')' {
            proto.push(')');
            self.advance();
        }
        proto
    }

    fn match_signature(&mut self) -> String {
        let mut signature = String::new();
        if self.look(0) != '(' {
            return signature;
        }
        signature.push(self.advance());
        while !self.eof() && self.look(0) != '}' && self.look(0) != ')' {
            signature.push(self.advance());
        }
        if self.look(0) == ')' {
            signature.push(')');
            self.advance();
        }
        signature
    }

    fn match_signature_tokens(&mut self) -> bool {
        let start = self.current_pos();
        let signature = self.match_signature();
        if signature.is_empty() {
            return false;
        }

        // Split trailing whitespace into its own token. The whitespace
        // cannot contain a newline, so column arithmetic is safe.
        let ws_count = signature
            .chars()
            .rev()
            .take_while(|c| is_whitespace_char(*c))
            .count();
        if ws_count > 0 {
            let split = signature.len() - ws_count;
            let boundary = FilePos::with_offset(
                self.line,
                self.column - ws_count as u32,
                self.idx - ws_count,
            );
            let whitespace = signature[split..].to_string();
            let trimmed = signature[..split].to_string();
            self.push_spanned(TokenKind::Signature, trimmed, start, boundary);
            self.push(TokenKind::Whitespace, whitespace, boundary);
        } else {
            self.push(TokenKind::Signature, signature, start);
        }
        true
    }

    /// Prototype vs signature is undecidable at the token level, so guess:
    /// if more than 80% of the characters inside the parens are prototype
    /// characters (`$@%&\;*[]`) treat it as a prototype.
    fn looks_like_prototype(&self) -> bool {
        let mut proto_chars = 0usize;
        let mut total = 0usize;
        let mut i = 0;
        loop {
            let c = self.look(i);
            i += 1;
            if c == ')' || c == '{' || is_newline_char(c) || c == EOF_CHAR {
                break;
            }
            if c == '(' {
                continue;
            }
            if matches!(c, '$' | '@' | '%' | '&' | '\\' | ';' | '*' | '[' | ']') {
                proto_chars += 1;
            }
            total += 1;
        }
        if total == 0 {
            return true;
        }
        proto_chars as f64 / total as f64 > 0.8
    }

    // --- main dispatch ---

    /// Produce as many tokens as needed to make progress at the cursor.
    fn next_tokens(&mut self) -> Result<(), LexError> {
        let start = self.current_pos();

        // End of input, ^D/^Z and data sections all terminate the token
        // stream. Content after __DATA__/__END__ is deliberately untouched.
        if self.eof() || matches!(self.look(0), '\x04' | '\x1a') {
            self.push(TokenKind::EndOfInput, "", start);
            return Ok(());
        }
        if let Some(marker) = self.match_string_option(&["__DATA__", "__END__"], true) {
            self.push(TokenKind::EndOfInput, marker, start);
            return Ok(());
        }

        let whitespace = self.match_whitespace();
        if !whitespace.is_empty() {
            self.push(TokenKind::Whitespace, whitespace, start);
            return Ok(());
        }

        if self.match_newline_token() {
            // A finished line may carry a heredoc marker whose body starts
            // on the next line.
            self.scan_for_heredoc();
            return Ok(());
        }

        // $$ is the pid variable, not a double dereference.
        if self.look(0) == '$' && self.look(1) == '$' && !is_name_body(self.look(2)) {
            self.advance();
            self.advance();
            self.push(TokenKind::ScalarVariable, "$$", start);
            return Ok(());
        }

        // A sigil followed by $ is a dereference of a scalar reference.
        if matches!(self.look(0), '$' | '@' | '%') {
            let mut k = 1;
            while is_whitespace_char(self.look(k)) {
                k += 1;
            }
            if self.look(k) == '$' {
                let sigil = self.advance();
                self.push(TokenKind::Deref, sigil.to_string(), start);
                return Ok(());
            }
        }

        if let Some(var) = self.match_variable() {
            let kind = match var.as_bytes()[0] {
                b'@' => TokenKind::ArrayVariable,
                b'%' => TokenKind::HashVariable,
                _ => TokenKind::ScalarVariable,
            };
            self.push(kind, var, start);
            return Ok(());
        }

        // Unary file test operators such as `-e 'filename'`.
        if self.look(0) == '-' && !self.look(2).is_ascii_alphanumeric() {
            let test_char = self.look(1);
            if FILE_TEST_LETTERS.contains(test_char) {
                self.advance();
                self.advance();
                self.push(TokenKind::FileTest, format!("-{test_char}"), start);
                return Ok(());
            }
        }

        if !self.look(0).is_ascii_alphanumeric() {
            if let Some(op) = self.match_string_option(SYMBOLIC_OPERATORS, false) {
                self.push(TokenKind::Operator, op, start);
                return Ok(());
            }
        }
        if let Some(op) = self.match_string_option(WORD_OPERATORS, true) {
            self.push(TokenKind::Operator, op, start);
            return Ok(());
        }

        match self.look(0) {
            ';' => {
                self.advance();
                self.push(TokenKind::Semicolon, ";", start);
                return Ok(());
            }
            ',' => {
                self.advance();
                self.push(TokenKind::Comma, ",", start);
                return Ok(());
            }
            _ => {}
        }

        // `->` plus a possible method/key name after it.
        if self.look(0) == '-' && self.look(1) == '>' {
            self.advance();
            self.advance();
            self.push(TokenKind::Operator, "->", start);
            self.add_whitespace_token();
            let start = self.current_pos();
            let name = self.match_name();
            if !name.is_empty() {
                self.push(TokenKind::Name, name, start);
            }
            return Ok(());
        }

        if self.look(0) == '{' {
            // After a variable or `->` this brace opens a hash access whose
            // contents may be unquoted barewords, not a block.
            let mut is_deref = false;
            if !self.tokens.is_empty() {
                let mut i = self.tokens.len() - 1;
                while i > 0 && self.tokens[i].kind.is_trivia() {
                    i -= 1;
                }
                let prev = &self.tokens[i];
                is_deref = prev.kind.is_variable()
                    || (prev.kind == TokenKind::Operator && prev.text == "->");
            }
            if is_deref {
                while self.look(0) == '{' {
                    self.match_dereference_brackets()?;
                    self.add_whitespace_token();
                }
                return Ok(());
            }
            self.advance();
            self.push(TokenKind::LBrace, "{", start);
            return Ok(());
        }

        let single = match self.look(0) {
            '}' => Some(TokenKind::RBrace),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '[' => Some(TokenKind::LSquareBracket),
            ']' => Some(TokenKind::RSquareBracket),
            '.' => Some(TokenKind::Dot),
            _ => None,
        };
        if let Some(kind) = single {
            let c = self.advance();
            self.push(kind, c.to_string(), start);
            return Ok(());
        }

        // A bareword directly before => is an implicitly quoted hash key;
        // check now so keywords and quote operators don't swallow it.
        if self.look(0) == '_' || self.look(0).is_ascii_lowercase() {
            let mut k = 1;
            while is_word_char(self.look(k)) {
                k += 1;
            }
            while is_whitespace_char(self.look(k)) {
                k += 1;
            }
            if self.look(k) == '=' && self.look(k + 1) == '>' {
                let name = self.match_name();
                self.push(TokenKind::Name, name, start);
                self.add_whitespace_token();
                let start = self.current_pos();
                self.advance();
                self.advance();
                self.push(TokenKind::Operator, "=>", start);
                return Ok(());
            }
        }

        if let Some(kind) = self.try_match_keyword() {
            let text: String = self.chars[start.offset.unwrap_or(0)..self.idx].iter().collect();
            self.push(kind, text, start);
            if kind == TokenKind::Sub {
                self.match_subroutine();
            }
            return Ok(());
        }

        if let Some(numeric) = self.match_numeric() {
            self.push(TokenKind::NumericLiteral, numeric, start);
            return Ok(());
        }
        if let Some(version) = self.match_version_string() {
            self.push(TokenKind::VersionLiteral, version, start);
            return Ok(());
        }

        if self.look(0) == '-' {
            self.advance();
            self.push(TokenKind::Operator, "-", start);
            return Ok(());
        }

        let pod = self.match_pod();
        if !pod.is_empty() {
            self.push(TokenKind::Pod, pod, start);
            return Ok(());
        }

        if self.look(0) == '=' {
            self.advance();
            self.push(TokenKind::Assignment, "=", start);
            return Ok(());
        }

        if self.look(0) == '/' && self.division_or_regex() {
            return Ok(());
        }

        if self.match_simple_string() {
            return Ok(());
        }
        if self.match_quote_literal() {
            return Ok(());
        }

        if self.look(0) == '/' {
            self.advance();
            self.push(TokenKind::Operator, "/", start);
            return Ok(());
        }

        let comment = self.match_comment();
        if !comment.is_empty() {
            self.push(TokenKind::Comment, comment, start);
            return Ok(());
        }

        let ident = self.match_identifier();
        if !ident.is_empty() {
            let kind = if BUILTINS.contains(ident.as_str()) {
                TokenKind::Builtin
            } else {
                TokenKind::Name
            };
            self.push(kind, ident, start);
            return Ok(());
        }

        let name = self.match_name();
        if !name.is_empty() {
            let kind = if BUILTINS.contains(name.as_str()) {
                TokenKind::Builtin
            } else {
                TokenKind::Name
            };
            self.push(kind, name, start);
            return Ok(());
        }

        Err(LexError::at("no token pattern matched", start))
    }

    /// Disambiguate `/` using the previous significant token. This is a
    /// heuristic by necessity; see "Perl cannot be parsed: a formal proof"
    /// (perlmonks node 663393). A token that yields a value means division;
    /// after a bareword, a second `/` on the same line means regex, since
    /// mispredicting a string costs one line while mispredicting an operator
    /// can unbalance every scope below it.
    ///
    /// Returns true when it consumed input.
    fn division_or_regex(&mut self) -> bool {
        let start = self.current_pos();

        let mut prev_idx = None;
        if !self.tokens.is_empty() {
            let mut i = self.tokens.len() - 1;
            while i > 0 && self.tokens[i].kind.is_trivia() {
                i -= 1;
            }
            if !self.tokens[i].kind.is_trivia() {
                prev_idx = Some(i);
            }
        }

        let Some(prev_idx) = prev_idx else {
            return self.match_slash_string();
        };
        let prev_kind = self.tokens[prev_idx].kind;

        // For a bareword, look before it: `->name /` is a method call
        // result, hence division.
        let mut second_is_arrow = false;
        if prev_kind == TokenKind::Name {
            let mut i = self.tokens.len() - 1;
            while i > 0 {
                match self.tokens[i].kind {
                    TokenKind::Whitespace | TokenKind::Name => i -= 1,
                    TokenKind::Operator => {
                        second_is_arrow = self.tokens[i].text == "->";
                        break;
                    }
                    _ => break,
                }
            }
        }

        let prev_yields_value = prev_kind.is_variable()
            || matches!(
                prev_kind,
                TokenKind::RParen
                    | TokenKind::NumericLiteral
                    | TokenKind::RBrace
                    | TokenKind::RSquareBracket
                    | TokenKind::HashDerefEnd
            );

        if prev_yields_value || second_is_arrow {
            self.advance();
            self.push(TokenKind::Operator, "/", start);
            return true;
        }

        if prev_kind == TokenKind::Name {
            // Scan the rest of the line for a second unescaped slash.
            let mut k = 1;
            loop {
                let c = self.look(k);
                if c == '\\' && !matches!(self.look(k + 1), '\n' | '\r' | EOF_CHAR) {
                    k += 2;
                    continue;
                }
                if matches!(c, '\n' | '\r' | '/' | EOF_CHAR) {
                    break;
                }
                k += 1;
            }
            if self.look(k) == '/' {
                self.match_slash_string();
            } else {
                self.advance();
                self.push(TokenKind::Operator, "/", start);
            }
            return true;
        }

        self.match_slash_string()
    }
}

// --- second pass ---

/// Retagging pass over the finished token list. Fixes categorizations that
/// needed more context than the forward pass had: hash subscripts after a
/// variable, dereference chains through `->`, and barewords quoted by a fat
/// comma. Without it every `$x{...}` would open a scope in the block parser.
fn second_pass(tokens: &mut Vec<Token>) {
    let mut i = 0;
    while i + 1 < tokens.len() {
        if tokens[i].kind.is_variable() {
            second_pass_hash(tokens, i);
            second_pass_hash_deref(tokens, i);
        }

        if tokens[i].kind == TokenKind::Operator && tokens[i].text == "=>" {
            let mut c = i;
            while c > 0 && tokens[c - 1].kind.is_trivia() {
                c -= 1;
            }
            if c > 0 && tokens[c - 1].kind == TokenKind::Name {
                tokens[c - 1].kind = TokenKind::HashKey;
            }
        }
        i += 1;
    }
}

/// `%x{a, $b, "c"}`: retag the surrounding braces to hash-subscript kinds
/// when the contents are a comma-separated list of keys.
fn second_pass_hash(tokens: &mut [Token], i: usize) {
    let (lbrace, rbrace);
    {
        let mut iter = TokenIterator::starting_at(tokens, SKIP_INLINE_TRIVIA, i);
        match iter.next() {
            Some(t) if t.kind.is_variable() => {}
            _ => return,
        }
        match iter.next() {
            Some(t) if t.kind == TokenKind::LBrace => {}
            _ => return,
        }
        lbrace = iter.pos() - 1;

        loop {
            // key: bareword, string or variable
            match iter.next() {
                Some(t)
                    if t.kind == TokenKind::Name
                        || t.kind == TokenKind::String
                        || t.kind.is_variable() => {}
                _ => return,
            }
            // separator or end
            match iter.next() {
                Some(t) if t.kind == TokenKind::Comma => {}
                Some(t) if t.kind == TokenKind::RBrace => {
                    rbrace = iter.pos() - 1;
                    break;
                }
                _ => return,
            }
        }
    }
    tokens[lbrace].kind = TokenKind::HashSubStart;
    tokens[rbrace].kind = TokenKind::HashSubEnd;
}

/// `$x->{...}`: retag the brace pair after an arrow, balancing nested
/// braces, so the block parser does not open a scope for it.
fn second_pass_hash_deref(tokens: &mut [Token], i: usize) {
    let (lbrace, rbrace);
    {
        let mut iter = TokenIterator::starting_at(tokens, SKIP_INLINE_TRIVIA, i);
        match iter.next() {
            Some(t) if t.kind.is_variable() => {}
            _ => return,
        }
        match iter.next() {
            Some(t) if t.kind == TokenKind::Operator && t.text == "->" => {}
            _ => return,
        }
        match iter.next() {
            Some(t) if t.kind == TokenKind::LBrace => {}
            _ => return,
        }
        lbrace = iter.pos() - 1;

        let mut depth = 1;
        let mut last_rbrace = None;
        while depth > 0 {
            match iter.next() {
                Some(t) if t.kind == TokenKind::LBrace => depth += 1,
                Some(t) if t.kind == TokenKind::RBrace => {
                    last_rbrace = Some(iter.pos() - 1);
                    depth -= 1;
                }
                Some(_) => {}
                None => return,
            }
        }
        let Some(found) = last_rbrace else { return };
        rbrace = found;
    }
    tokens[lbrace].kind = TokenKind::HashDerefStart;
    tokens[rbrace].kind = TokenKind::HashDerefEnd;
}
