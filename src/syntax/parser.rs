//! Recursive-descent pattern parser
//!
//! Grammar (ECMAScript subset):
//!
//! ```text
//! disjunction := alternative ('|' alternative)*
//! alternative := term*
//! term        := assertion | atom quantifier?
//! quantifier  := ('*' | '+' | '?' | '{' n (',' m?)? '}') '?'?
//! ```

use super::ast::{Assertion, Node, ParsedPattern};
use super::class::CharClass;
use super::error::{ParseError, ParseResult};
use super::SyntaxFlags;

/// Largest quantifier bound accepted
pub const MAX_REPEAT: u32 = 1000;

/// Largest number of capture groups accepted
pub const MAX_CAPTURES: u32 = 0xFFFF;

/// Largest lowered program size (in instructions) accepted
pub const MAX_PROGRAM_SIZE: usize = 100_000;

/// Deepest group and lookahead nesting accepted. Every tree walk downstream
/// recurses once per level, so this bounds their stack use too.
pub const MAX_NESTING: usize = 128;

/// Parse `pattern` under `flags`.
pub fn parse(pattern: &str, flags: SyntaxFlags) -> ParseResult<ParsedPattern> {
    let mut parser = Parser::new(pattern, flags);
    let root = parser.parse_disjunction()?;
    if let Some(c) = parser.peek() {
        debug_assert_eq!(c, ')');
        return Err(ParseError::UnmatchedParen {
            position: parser.pos,
        });
    }
    if parser.max_backref > parser.capture_count {
        return Err(ParseError::BackrefOutOfRange {
            group: parser.max_backref,
            count: parser.capture_count,
        });
    }
    if root.lowered_size() > MAX_PROGRAM_SIZE {
        return Err(ParseError::PatternTooLarge);
    }
    Ok(ParsedPattern {
        root,
        capture_count: parser.capture_count,
        flags,
    })
}

/// Either a single character or a class, as produced by escapes
enum ClassAtom {
    Char(char),
    Class(CharClass),
}

enum Escape {
    Atom(ClassAtom),
    Backref(u32),
}

struct Parser {
    input: Vec<char>,
    pos: usize,
    flags: SyntaxFlags,
    capture_count: u32,
    max_backref: u32,
    depth: usize,
}

impl Parser {
    fn new(pattern: &str, flags: SyntaxFlags) -> Self {
        Parser {
            input: pattern.chars().collect(),
            pos: 0,
            flags,
            capture_count: 0,
            max_backref: 0,
            depth: 0,
        }
    }

    fn unicode(&self) -> bool {
        self.flags.contains(SyntaxFlags::UNICODE)
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn next_or_end(&mut self, expected: &'static str) -> ParseResult<char> {
        self.advance().ok_or(ParseError::UnexpectedEnd { expected })
    }

    /// Parse the body of a group or lookahead up to and including its `)`
    fn parse_nested(&mut self, position: usize) -> ParseResult<Node> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::NestingTooDeep { position });
        }
        self.depth += 1;
        let node = self.parse_disjunction();
        self.depth -= 1;
        let node = node?;
        if !self.eat(')') {
            return Err(ParseError::UnexpectedEnd { expected: "')'" });
        }
        Ok(node)
    }

    fn parse_disjunction(&mut self) -> ParseResult<Node> {
        let mut alternatives = vec![self.parse_alternative()?];
        while self.eat('|') {
            alternatives.push(self.parse_alternative()?);
        }
        Ok(if alternatives.len() == 1 {
            alternatives.pop().unwrap_or(Node::Empty)
        } else {
            Node::Alternate(alternatives)
        })
    }

    fn parse_alternative(&mut self) -> ParseResult<Node> {
        let mut terms = Vec::new();
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            terms.push(self.parse_term()?);
        }
        Ok(match terms.len() {
            0 => Node::Empty,
            1 => terms.pop().unwrap_or(Node::Empty),
            _ => Node::Concat(terms),
        })
    }

    fn parse_term(&mut self) -> ParseResult<Node> {
        if let Some(assertion) = self.parse_assertion()? {
            if self.at_quantifier() {
                return Err(ParseError::NothingToRepeat { position: self.pos });
            }
            return Ok(assertion);
        }
        let atom = self.parse_atom()?;
        match self.parse_quantifier()? {
            Some((min, max, greedy)) => Ok(Node::Repeat {
                node: Box::new(atom),
                min,
                max,
                greedy,
            }),
            None => Ok(atom),
        }
    }

    /// Anchors, word boundaries and lookaheads
    fn parse_assertion(&mut self) -> ParseResult<Option<Node>> {
        match (self.peek(), self.peek_at(1), self.peek_at(2)) {
            (Some('^'), ..) => {
                self.pos += 1;
                Ok(Some(Node::Assert(Assertion::Start)))
            }
            (Some('$'), ..) => {
                self.pos += 1;
                Ok(Some(Node::Assert(Assertion::End)))
            }
            (Some('\\'), Some('b'), _) => {
                self.pos += 2;
                Ok(Some(Node::Assert(Assertion::WordBoundary)))
            }
            (Some('\\'), Some('B'), _) => {
                self.pos += 2;
                Ok(Some(Node::Assert(Assertion::NotWordBoundary)))
            }
            (Some('('), Some('?'), Some(kind @ ('=' | '!'))) => {
                let position = self.pos;
                self.pos += 3;
                let node = self.parse_nested(position)?;
                Ok(Some(Node::Look {
                    negate: kind == '!',
                    node: Box::new(node),
                }))
            }
            _ => Ok(None),
        }
    }

    fn parse_atom(&mut self) -> ParseResult<Node> {
        let position = self.pos;
        let c = self.next_or_end("atom")?;
        match c {
            '.' => Ok(Node::Any),
            '(' => self.parse_group(position),
            '[' => self.parse_class().map(Node::Class),
            '\\' => match self.parse_escape(false)? {
                Escape::Atom(ClassAtom::Char(c)) => Ok(Node::Literal(c)),
                Escape::Atom(ClassAtom::Class(class)) => Ok(Node::Class(class.normalize())),
                Escape::Backref(group) => Ok(Node::Backref(group)),
            },
            '*' | '+' | '?' => Err(ParseError::NothingToRepeat { position }),
            '{' => {
                self.pos = position;
                if self.try_braced_quantifier()?.is_some() {
                    return Err(ParseError::NothingToRepeat { position });
                }
                self.pos = position + 1;
                Ok(Node::Literal('{'))
            }
            c => Ok(Node::Literal(c)),
        }
    }

    fn parse_group(&mut self, position: usize) -> ParseResult<Node> {
        let capture = if self.eat('?') {
            if !self.eat(':') {
                return Err(ParseError::InvalidGroup { position });
            }
            None
        } else {
            if self.capture_count >= MAX_CAPTURES {
                return Err(ParseError::TooManyCaptures);
            }
            self.capture_count += 1;
            Some(self.capture_count)
        };

        let node = self.parse_nested(position)?;
        Ok(match capture {
            Some(index) => Node::Capture {
                index,
                node: Box::new(node),
            },
            None => node,
        })
    }

    fn at_quantifier(&mut self) -> bool {
        match self.peek() {
            Some('*' | '+' | '?') => true,
            Some('{') => {
                let saved = self.pos;
                let found = matches!(self.try_braced_quantifier(), Ok(Some(_)) | Err(_));
                self.pos = saved;
                found
            }
            _ => false,
        }
    }

    fn parse_quantifier(&mut self) -> ParseResult<Option<(u32, Option<u32>, bool)>> {
        let (min, max) = match self.peek() {
            Some('*') => {
                self.pos += 1;
                (0, None)
            }
            Some('+') => {
                self.pos += 1;
                (1, None)
            }
            Some('?') => {
                self.pos += 1;
                (0, Some(1))
            }
            Some('{') => match self.try_braced_quantifier()? {
                Some(bounds) => bounds,
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        let greedy = !self.eat('?');
        Ok(Some((min, max, greedy)))
    }

    /// Parse `{n}`, `{n,}` or `{n,m}` at the cursor. Leaves the cursor
    /// untouched and returns `None` if the text is not a quantifier.
    fn try_braced_quantifier(&mut self) -> ParseResult<Option<(u32, Option<u32>)>> {
        let start = self.pos;
        if !self.eat('{') {
            return Ok(None);
        }
        let min = match self.parse_decimal() {
            Some(n) => n,
            None => {
                self.pos = start;
                return Ok(None);
            }
        };
        let max = if self.eat(',') {
            if self.peek() == Some('}') {
                None
            } else {
                match self.parse_decimal() {
                    Some(n) => Some(n),
                    None => {
                        self.pos = start;
                        return Ok(None);
                    }
                }
            }
        } else {
            Some(min)
        };
        if !self.eat('}') {
            self.pos = start;
            return Ok(None);
        }
        if let Some(max) = max {
            if max < min {
                return Err(ParseError::InvalidQuantifier { position: start });
            }
        }
        if min > MAX_REPEAT || max.is_some_and(|m| m > MAX_REPEAT) {
            return Err(ParseError::PatternTooLarge);
        }
        Ok(Some((min, max)))
    }

    /// Decimal digits, saturating on overflow
    fn parse_decimal(&mut self) -> Option<u32> {
        let mut value: Option<u32> = None;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
            self.pos += 1;
            value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(d));
        }
        value
    }

    fn parse_class(&mut self) -> ParseResult<CharClass> {
        let negated = self.eat('^');
        let mut class = CharClass::new();
        loop {
            let c = self.peek().ok_or(ParseError::UnexpectedEnd { expected: "']'" })?;
            if c == ']' {
                self.pos += 1;
                break;
            }
            let first = self.parse_class_atom()?;
            if self.peek() == Some('-') && self.peek_at(1).is_some_and(|c| c != ']') {
                self.pos += 1;
                let second = self.parse_class_atom()?;
                match (first, second) {
                    (ClassAtom::Char(start), ClassAtom::Char(end)) => {
                        if start > end {
                            return Err(ParseError::InvalidRange { start, end });
                        }
                        class.push_range(start, end);
                    }
                    (first, second) => {
                        if self.unicode() {
                            return Err(ParseError::InvalidEscape {
                                position: self.pos,
                                escape: '-',
                            });
                        }
                        push_class_atom(&mut class, first);
                        class.push_char('-');
                        push_class_atom(&mut class, second);
                    }
                }
            } else {
                push_class_atom(&mut class, first);
            }
        }
        let class = class.normalize();
        Ok(if negated { class.negate() } else { class })
    }

    fn parse_class_atom(&mut self) -> ParseResult<ClassAtom> {
        let c = self.next_or_end("']'")?;
        if c != '\\' {
            return Ok(ClassAtom::Char(c));
        }
        let position = self.pos;
        match self.parse_escape(true)? {
            Escape::Atom(atom) => Ok(atom),
            Escape::Backref(_) => Err(ParseError::InvalidEscape {
                position,
                escape: self.input[position],
            }),
        }
    }

    /// Parse the escape after a consumed `\`.
    fn parse_escape(&mut self, in_class: bool) -> ParseResult<Escape> {
        let position = self.pos;
        let c = self.next_or_end("escape")?;
        let atom = match c {
            'd' => ClassAtom::Class(CharClass::digit()),
            'D' => ClassAtom::Class(CharClass::digit().negate()),
            'w' => ClassAtom::Class(CharClass::word()),
            'W' => ClassAtom::Class(CharClass::word().negate()),
            's' => ClassAtom::Class(CharClass::space()),
            'S' => ClassAtom::Class(CharClass::space().negate()),
            'n' => ClassAtom::Char('\n'),
            'r' => ClassAtom::Char('\r'),
            't' => ClassAtom::Char('\t'),
            'v' => ClassAtom::Char('\u{000B}'),
            'f' => ClassAtom::Char('\u{000C}'),
            'b' if in_class => ClassAtom::Char('\u{0008}'),
            '-' if in_class => ClassAtom::Char('-'),
            '0' => {
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    return Err(ParseError::InvalidEscape { position, escape: '0' });
                }
                ClassAtom::Char('\0')
            }
            '1'..='9' if !in_class => {
                self.pos = position;
                let mut group = 0u32;
                for _ in 0..2 {
                    match self.peek().and_then(|c| c.to_digit(10)) {
                        Some(d) => {
                            self.pos += 1;
                            group = group * 10 + d;
                        }
                        None => break,
                    }
                }
                self.max_backref = self.max_backref.max(group);
                return Ok(Escape::Backref(group));
            }
            'x' => {
                let value = self
                    .parse_hex_digits(2)
                    .ok_or(ParseError::InvalidEscape { position, escape: 'x' })?;
                ClassAtom::Char(to_char(value, position, 'x')?)
            }
            'u' => {
                let value = if self.unicode() && self.peek() == Some('{') {
                    self.parse_braced_code_point(position)?
                } else {
                    self.parse_hex_digits(4)
                        .ok_or(ParseError::InvalidEscape { position, escape: 'u' })?
                };
                ClassAtom::Char(to_char(value, position, 'u')?)
            }
            'c' => match self.peek() {
                Some(letter) if letter.is_ascii_alphabetic() => {
                    self.pos += 1;
                    ClassAtom::Char(char::from(letter as u8 % 32))
                }
                _ => return Err(ParseError::InvalidEscape { position, escape: 'c' }),
            },
            c if is_identity_escape(c, self.unicode()) => ClassAtom::Char(c),
            c => return Err(ParseError::InvalidEscape { position, escape: c }),
        };
        Ok(Escape::Atom(atom))
    }

    fn parse_hex_digits(&mut self, count: usize) -> Option<u32> {
        let mut value = 0u32;
        for offset in 0..count {
            let digit = self.peek_at(offset)?.to_digit(16)?;
            value = value * 16 + digit;
        }
        self.pos += count;
        Some(value)
    }

    fn parse_braced_code_point(&mut self, position: usize) -> ParseResult<u32> {
        let invalid = ParseError::InvalidEscape { position, escape: 'u' };
        self.pos += 1; // '{'
        let mut value = 0u32;
        let mut digits = 0usize;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(16)) {
            self.pos += 1;
            digits += 1;
            value = value.saturating_mul(16).saturating_add(d);
        }
        if digits == 0 || !self.eat('}') || value > 0x10FFFF {
            return Err(invalid);
        }
        Ok(value)
    }
}

fn push_class_atom(class: &mut CharClass, atom: ClassAtom) {
    match atom {
        ClassAtom::Char(c) => class.push_char(c),
        ClassAtom::Class(other) => class.push_class(&other),
    }
}

fn to_char(value: u32, position: usize, escape: char) -> ParseResult<char> {
    char::from_u32(value).ok_or(ParseError::InvalidEscape { position, escape })
}

/// Characters that escape to themselves
fn is_identity_escape(c: char, unicode: bool) -> bool {
    const SYNTAX: &str = "^$\\.*+?()[]{}|/-";
    if unicode {
        SYNTAX.contains(c)
    } else {
        !c.is_ascii_alphanumeric() && c != '_'
    }
}
