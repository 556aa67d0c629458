use crate::language::{
    errors::{SyntaxError, SyntaxResult},
    span::Span,
    syntax::{BinaryOp, CompareOp, DeferredBlock, NodeKind, SyntaxNode},
};
use nom::{
    bytes::complete::take_while,
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{opt, recognize},
    sequence::{pair, preceded},
    IResult,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Boundary {
    /// `.` or end of input.
    Statement,
    /// `,`
    Clause,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Lexeme {
    Node(SyntaxNode),
    Boundary(Boundary, Span),
}

/// Pulls one syntax node (or boundary) at a time out of a source slice.
///
/// Operators reach into the caller's working stack for their left operand,
/// so every node handed back is complete.
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    base: usize,
}

struct Numeral<'a> {
    whole: &'a str,
    fraction: Option<&'a str>,
    exponent: Option<&'a str>,
}

fn grouped_digits(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        digit1,
        take_while(|c: char| c.is_ascii_digit() || c == '_'),
    ))(input)
}

/// `1_000`, `2.5`, `3e+4`. An `e` that is not followed by digits is left in
/// the input for the next token.
fn numeral(input: &str) -> IResult<&str, Numeral<'_>> {
    let (input, whole) = grouped_digits(input)?;
    let (input, fraction) = opt(preceded(char('.'), grouped_digits))(input)?;
    let (input, exponent) = opt(exponent_part)(input)?;
    Ok((
        input,
        Numeral {
            whole,
            fraction,
            exponent,
        },
    ))
}

fn exponent_part(input: &str) -> IResult<&str, &str> {
    preceded(char('e'), preceded(opt(char('+')), digit1))(input)
}

fn bare_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '-'),
    ))(input)
}

fn safe_quote(input: &str) -> IResult<&str, Option<char>> {
    opt(char('\''))(input)
}

fn identifier(input: &str) -> IResult<&str, (&str, bool)> {
    let (input, name) = bare_identifier(input)?;
    let (input, quote) = safe_quote(input)?;
    Ok((input, (name, quote.is_some())))
}

fn strip_grouping(digits: &str) -> String {
    digits.chars().filter(|c| *c != '_').collect()
}

impl<'a> Lexer<'a> {
    /// `base` is the byte offset of `src` inside the original file, so spans
    /// stay correct when a block body is lexed on its own.
    pub fn new(src: &'a str, base: usize) -> Self {
        Self { src, pos: 0, base }
    }

    pub fn next_item(&mut self, stack: &mut Vec<SyntaxNode>) -> SyntaxResult<Option<Lexeme>> {
        loop {
            self.skip_whitespace();
            let start = self.offset();
            let Some(ch) = self.peek() else {
                return Ok(None);
            };
            let node = match ch {
                '.' => {
                    self.bump();
                    return Ok(Some(Lexeme::Boundary(Boundary::Statement, self.span_from(start))));
                }
                ',' => {
                    self.bump();
                    return Ok(Some(Lexeme::Boundary(Boundary::Clause, self.span_from(start))));
                }
                ch if ch.is_ascii_digit() => self.lex_number()?,
                ch if ch.is_alphabetic() || ch == '_' => self.lex_identifier()?,
                '"' => self.lex_string()?,
                '[' => self.lex_block()?,
                '(' => self.lex_group()?,
                ')' | ']' => {
                    self.bump();
                    return Err(SyntaxError::new(
                        format!("Unexpected `{ch}`"),
                        self.span_from(start),
                    )
                    .with_help("closing bracket without a matching opener"));
                }
                '<' | '>' => {
                    self.bump();
                    let op = match (ch, self.peek()) {
                        ('<', Some('=')) => CompareOp::LtEq,
                        ('>', Some('=')) => CompareOp::GtEq,
                        ('<', _) => CompareOp::Lt,
                        _ => CompareOp::Gt,
                    };
                    if matches!(op, CompareOp::LtEq | CompareOp::GtEq) {
                        self.bump();
                    }
                    self.lex_compare(op, start, stack)?
                }
                '=' => {
                    self.bump();
                    if self.peek() == Some('=') {
                        self.bump();
                        self.lex_compare(CompareOp::EqEq, start, stack)?
                    } else {
                        log::warn!("ignoring lone `=` at byte {start}; equality is written `==`");
                        continue;
                    }
                }
                ch => match BinaryOp::from_char(ch) {
                    Some(op) => {
                        self.bump();
                        self.lex_binary(op, start, stack)?
                    }
                    None => {
                        self.bump();
                        return Err(SyntaxError::new(
                            format!("Unexpected character '{ch}'"),
                            self.span_from(start),
                        ));
                    }
                },
            };
            log::trace!("lexed {} at {:?}", node.describe(), node.span);
            return Ok(Some(Lexeme::Node(node)));
        }
    }

    fn rest(&self) -> &'a str {
        self.src.get(self.pos..).unwrap_or("")
    }

    fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.offset())
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Moves the cursor to wherever a nom parser stopped.
    fn advance_to(&mut self, remaining: &'a str) {
        self.pos = self.src.len() - remaining.len();
    }

    fn skip_whitespace(&mut self) {
        let parsed: IResult<&str, &str> = multispace0(self.rest());
        if let Ok((remaining, _)) = parsed {
            self.advance_to(remaining);
        }
    }

    fn lex_number(&mut self) -> SyntaxResult<SyntaxNode> {
        let start = self.offset();
        let (remaining, numeral) = numeral(self.rest())
            .map_err(|_| SyntaxError::new("Invalid numeric literal", Span::new(start, start + 1)))?;
        self.advance_to(remaining);
        let span = self.span_from(start);
        let whole = strip_grouping(numeral.whole);

        let kind = match numeral.fraction {
            Some(fraction) => {
                let mut text = format!("{whole}.{}", strip_grouping(fraction));
                if let Some(exponent) = numeral.exponent {
                    text.push('e');
                    text.push_str(exponent);
                }
                let value = text
                    .parse::<f64>()
                    .map_err(|_| SyntaxError::new("Invalid float literal", span))?;
                NodeKind::Float(value)
            }
            None => {
                let out_of_range = || {
                    SyntaxError::new("Integer literal out of range", span)
                        .with_help("integers are 64-bit signed")
                };
                let mut value = whole.parse::<i64>().map_err(|_| out_of_range())?;
                if let Some(exponent) = numeral.exponent {
                    let power = exponent
                        .parse::<u32>()
                        .ok()
                        .and_then(|exp| 10i64.checked_pow(exp))
                        .ok_or_else(out_of_range)?;
                    value = value.checked_mul(power).ok_or_else(out_of_range)?;
                }
                NodeKind::Integer(value)
            }
        };
        Ok(SyntaxNode::new(kind, span))
    }

    fn lex_identifier(&mut self) -> SyntaxResult<SyntaxNode> {
        let start = self.offset();
        let (remaining, (name, safe)) = identifier(self.rest())
            .map_err(|_| SyntaxError::new("Invalid identifier", Span::new(start, start + 1)))?;
        self.advance_to(remaining);
        Ok(SyntaxNode::new(
            NodeKind::Identifier {
                name: name.to_string(),
                safe,
            },
            self.span_from(start),
        ))
    }

    fn lex_string(&mut self) -> SyntaxResult<SyntaxNode> {
        let start = self.offset();
        self.bump();
        let mut value = String::new();
        while let Some(ch) = self.bump() {
            match ch {
                '"' => {
                    return Ok(SyntaxNode::new(NodeKind::Str(value), self.span_from(start)));
                }
                '\\' => match self.bump() {
                    Some(escaped) => value.push(match escaped {
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        other => other,
                    }),
                    None => break,
                },
                _ => value.push(ch),
            }
        }
        Err(SyntaxError::new("Unterminated string literal", self.span_from(start)))
    }

    /// Captures the raw text between `[` and its matching `]`.
    fn lex_block(&mut self) -> SyntaxResult<SyntaxNode> {
        let start = self.offset();
        self.bump();
        let body_start = self.pos;
        let mut depth = 1usize;
        while let Some(ch) = self.peek() {
            match ch {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        let text = self.src.get(body_start..self.pos).unwrap_or("");
                        let block = DeferredBlock::new(text, self.base + body_start);
                        self.bump();
                        return Ok(SyntaxNode::new(NodeKind::Block(block), self.span_from(start)));
                    }
                }
                '"' => {
                    // brackets inside string literals do not nest
                    self.lex_string()?;
                    continue;
                }
                _ => {}
            }
            self.bump();
        }
        Err(
            SyntaxError::new("Unterminated block", self.span_from(start))
                .with_help("every `[` needs a matching `]`"),
        )
    }

    fn lex_group(&mut self) -> SyntaxResult<SyntaxNode> {
        let start = self.offset();
        self.bump();
        let mut items = Vec::new();
        let mut element = Vec::new();
        let mut saw_comma = false;
        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.bump();
                break;
            }
            match self.next_item(&mut element)? {
                Some(Lexeme::Node(node)) => element.push(node),
                Some(Lexeme::Boundary(Boundary::Clause, _)) => {
                    saw_comma = true;
                    close_element(&mut element, &mut items)?;
                }
                Some(Lexeme::Boundary(Boundary::Statement, span)) => {
                    return Err(SyntaxError::new("`.` cannot appear inside a group", span)
                        .with_help("close the group with `)` before ending the statement"));
                }
                None => {
                    return Err(
                        SyntaxError::new("Unterminated group", self.span_from(start))
                            .with_help("every `(` needs a matching `)`"),
                    );
                }
            }
        }
        close_element(&mut element, &mut items)?;
        let span = self.span_from(start);

        if !saw_comma && items.len() == 1 {
            if let Some(inner) = items.pop() {
                return Ok(SyntaxNode::new(inner.kind, span));
            }
        }
        Ok(SyntaxNode::new(NodeKind::List(items), span))
    }

    fn lex_binary(
        &mut self,
        op: BinaryOp,
        start: usize,
        stack: &mut Vec<SyntaxNode>,
    ) -> SyntaxResult<SyntaxNode> {
        let lhs = self.left_operand(op.symbol(), start, stack)?;
        let rhs = self.right_operand(op.symbol(), start)?;
        let span = lhs.span.join(rhs.span);
        Ok(SyntaxNode::new(
            NodeKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        ))
    }

    fn lex_compare(
        &mut self,
        op: CompareOp,
        start: usize,
        stack: &mut Vec<SyntaxNode>,
    ) -> SyntaxResult<SyntaxNode> {
        let lhs = self.left_operand(op.symbol(), start, stack)?;
        let rhs = self.right_operand(op.symbol(), start)?;
        let span = lhs.span.join(rhs.span);
        Ok(SyntaxNode::new(
            NodeKind::Compare {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        ))
    }

    fn left_operand(
        &self,
        symbol: &str,
        start: usize,
        stack: &mut Vec<SyntaxNode>,
    ) -> SyntaxResult<SyntaxNode> {
        let span = self.span_from(start);
        match stack.pop() {
            Some(node) if node.is_block() => Err(SyntaxError::new(
                format!("A block cannot be the left operand of `{symbol}`"),
                node.span.join(span),
            )),
            Some(node) => Ok(node),
            None => Err(SyntaxError::new(format!("`{symbol}` has no left operand"), span)
                .with_help("operators are infix: write `a {symbol} b`")),
        }
    }

    /// The right operand is lexed against an empty stack, so operators
    /// associate left to right without precedence.
    fn right_operand(&mut self, symbol: &str, start: usize) -> SyntaxResult<SyntaxNode> {
        let mut scratch = Vec::new();
        match self.next_item(&mut scratch)? {
            Some(Lexeme::Node(node)) if node.is_block() => Err(SyntaxError::new(
                format!("A block cannot be the right operand of `{symbol}`"),
                node.span,
            )),
            Some(Lexeme::Node(node)) => Ok(node),
            Some(Lexeme::Boundary(_, span)) => Err(SyntaxError::new(
                format!("`{symbol}` is missing its right operand"),
                Span::new(start, span.end),
            )),
            None => Err(SyntaxError::new(
                format!("`{symbol}` is missing its right operand"),
                self.span_from(start),
            )),
        }
    }
}

fn close_element(element: &mut Vec<SyntaxNode>, items: &mut Vec<SyntaxNode>) -> SyntaxResult<()> {
    let mut nodes = element.drain(..);
    match (nodes.next(), nodes.next()) {
        (None, _) => Ok(()),
        (Some(node), None) => {
            items.push(node);
            Ok(())
        }
        (Some(first), Some(second)) => {
            let span = nodes.fold(first.span.join(second.span), |span, node| span.join(node.span));
            Err(
                SyntaxError::new("A group element must be a single expression", span)
                    .with_help("separate list items with `,`"),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(src: &str) -> SyntaxResult<Vec<Lexeme>> {
        let mut lexer = Lexer::new(src, 0);
        let mut stack = Vec::new();
        let mut out = Vec::new();
        while let Some(item) = lexer.next_item(&mut stack)? {
            match item {
                Lexeme::Node(node) => stack.push(node),
                boundary => {
                    out.extend(stack.drain(..).map(Lexeme::Node));
                    out.push(boundary);
                }
            }
        }
        out.extend(stack.drain(..).map(Lexeme::Node));
        Ok(out)
    }

    fn render(node: &SyntaxNode) -> String {
        match &node.kind {
            NodeKind::Identifier { name, safe } => {
                if *safe {
                    format!("{name}'")
                } else {
                    name.clone()
                }
            }
            NodeKind::Integer(value) => value.to_string(),
            NodeKind::Float(value) => format!("{value:?}"),
            NodeKind::Str(value) => format!("{value:?}"),
            NodeKind::Block(block) => format!("[{}]", block.text),
            NodeKind::List(items) => {
                let inner: Vec<String> = items.iter().map(render).collect();
                format!("({})", inner.join(" "))
            }
            NodeKind::Binary { op, lhs, rhs } => {
                format!("({op} {} {})", render(lhs), render(rhs))
            }
            NodeKind::Compare { op, lhs, rhs } => {
                format!("({op} {} {})", render(lhs), render(rhs))
            }
        }
    }

    fn rendered(src: &str) -> Vec<String> {
        lex_all(src)
            .expect("lex")
            .iter()
            .map(|item| match item {
                Lexeme::Node(node) => render(node),
                Lexeme::Boundary(Boundary::Statement, _) => ".".to_string(),
                Lexeme::Boundary(Boundary::Clause, _) => ",".to_string(),
            })
            .collect()
    }

    #[test]
    fn underscores_group_digits() {
        assert_eq!(rendered("1_000 12_3_4."), vec!["1000", "1234", "."]);
    }

    #[test]
    fn exponent_suffix_scales_integers() {
        assert_eq!(rendered("3e2 4e+3"), vec!["300", "4000"]);
    }

    #[test]
    fn rejected_exponent_is_left_for_the_next_token() {
        assert_eq!(rendered("1else"), vec!["1", "else"]);
        assert_eq!(rendered("2e+x"), vec!["2", "(+ e x)"]);
    }

    #[test]
    fn float_literals_need_a_digit_after_the_dot() {
        assert_eq!(rendered("2.5 x. 3."), vec!["2.5", "x", ".", "3", "."]);
    }

    #[test]
    fn trailing_quote_marks_identifier_safe() {
        assert_eq!(rendered("add' some-name_2"), vec!["add'", "some-name_2"]);
    }

    #[test]
    fn operators_take_the_stack_top_and_the_next_node() {
        assert_eq!(rendered("1 + 2 * 3."), vec!["(* (+ 1 2) 3)", "."]);
        assert_eq!(rendered("n*(n+1)/2"), vec!["(/ (* n (+ n 1)) 2)"]);
    }

    #[test]
    fn comparisons_cover_all_forms() {
        assert_eq!(
            rendered("a < 1, b >= 2, c <= 3, d > 4, e == 5"),
            vec!["(< a 1)", ",", "(>= b 2)", ",", "(<= c 3)", ",", "(> d 4)", ",", "(== e 5)"]
        );
    }

    #[test]
    fn lone_equals_yields_nothing() {
        assert_eq!(rendered("a = b."), vec!["a", "b", "."]);
    }

    #[test]
    fn groups_become_lists_only_with_commas() {
        assert_eq!(rendered("(a, b) (n,) () (7)"), vec!["(a b)", "(n)", "()", "7"]);
    }

    #[test]
    fn blocks_are_captured_raw_with_nesting() {
        assert_eq!(
            rendered("[ n < 2 [ n ] [ x ] ] fib."),
            vec!["[ n < 2 [ n ] [ x ] ]", "fib", "."]
        );
    }

    #[test]
    fn block_offsets_point_into_the_source() {
        let items = lex_all("  [abc]").expect("lex");
        match &items[0] {
            Lexeme::Node(SyntaxNode {
                kind: NodeKind::Block(block),
                span,
            }) => {
                assert_eq!(block.offset, 3);
                assert_eq!(*span, Span::new(2, 7));
            }
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn strings_support_escapes_and_brackets_inside_blocks() {
        assert_eq!(rendered(r#""a\"b\n" x."#), vec![r#""a\"b\n""#, "x", "."]);
        assert_eq!(rendered(r#"[ "]" print ]"#), vec![r#"[ "]" print ]"#]);
    }

    #[test]
    fn unterminated_brackets_are_errors() {
        let err = lex_all("[ 1 2").unwrap_err();
        assert_eq!(err.message, "Unterminated block");
        assert_eq!(err.span, Span::new(0, 5));

        let err = lex_all("(1, 2").unwrap_err();
        assert_eq!(err.message, "Unterminated group");
    }

    #[test]
    fn operators_need_both_operands() {
        assert!(lex_all("+ 1").unwrap_err().message.contains("no left operand"));
        assert!(lex_all("1 +.").unwrap_err().message.contains("right operand"));
        assert!(lex_all("1 + [x]").unwrap_err().message.contains("block"));
    }

    #[test]
    fn group_elements_must_be_single_nodes() {
        let err = lex_all("(a b, c)").unwrap_err();
        assert!(err.message.contains("single expression"));
    }

    #[test]
    fn stray_closers_and_unknown_characters_are_errors() {
        assert!(lex_all("a ]").is_err());
        assert!(lex_all("a # b").is_err());
    }

    #[test]
    fn oversized_integers_are_rejected() {
        let err = lex_all("99999999999999999999").unwrap_err();
        assert!(err.message.contains("out of range"));
        assert!(lex_all("1e30").is_err());
    }
}
