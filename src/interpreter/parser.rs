use super::{EvalError, Expression, Primitive, Result};

/// Parse script source text into its top-level forms.
pub fn parse_script(source: &str) -> Result<Vec<Expression>> {
    let mut parser = Parser::new(source);
    let mut forms = Vec::new();
    while parser.skip_ws() {
        if parser.eof() {
            break;
        }
        forms.push(parser.parse_expr()?);
    }
    Ok(forms)
}

/// Parse exactly one expression (trailing whitespace and comments allowed).
pub fn parse_expression(source: &str) -> Result<Expression> {
    let mut forms = parse_script(source)?;
    match forms.len() {
        1 => Ok(forms.remove(0)),
        0 => Err(EvalError::Syntax("expected an expression, found none".into())),
        n => Err(EvalError::Syntax(format!(
            "expected a single expression, found {}",
            n
        ))),
    }
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    index: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            index: 0,
        }
    }

    fn eof(&self) -> bool {
        self.index >= self.bytes.len()
    }

    fn current(&self) -> Option<u8> {
        self.bytes.get(self.index).copied()
    }

    fn advance(&mut self) {
        if self.index < self.bytes.len() {
            self.index += 1;
        }
    }

    fn skip_ws(&mut self) -> bool {
        let mut advanced = false;
        loop {
            while let Some(ch) = self.current() {
                if ch.is_ascii_whitespace() {
                    advanced = true;
                    self.advance();
                } else {
                    break;
                }
            }
            if self.current() == Some(b';') {
                advanced = true;
                while let Some(ch) = self.current() {
                    self.advance();
                    if ch == b'\n' {
                        break;
                    }
                }
                continue;
            }
            break;
        }
        advanced || !self.eof()
    }

    fn parse_expr(&mut self) -> Result<Expression> {
        self.skip_ws();
        let Some(ch) = self.current() else {
            return Err(self.error("unexpected end of input"));
        };

        match ch {
            b'(' => self.parse_list(),
            b')' => Err(self.error("unexpected ')'")),
            b'\'' => self.parse_quote(),
            b'"' => self.parse_string(),
            b'-' | b'+' | b'0'..=b'9' => self.parse_number_or_symbol(),
            _ => self.parse_symbol_or_bool(),
        }
    }

    fn parse_list(&mut self) -> Result<Expression> {
        // consume '('
        self.advance();
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.eof() {
                return Err(self.error("unterminated list"));
            }
            if self.current() == Some(b')') {
                self.advance();
                break;
            }
            items.push(self.parse_expr()?);
        }
        Ok(Expression::List(items))
    }

    fn parse_quote(&mut self) -> Result<Expression> {
        // 'x reads as (quote x)
        self.advance();
        let quoted = self.parse_expr()?;
        Ok(Expression::List(vec![Expression::symbol("quote"), quoted]))
    }

    fn parse_string(&mut self) -> Result<Expression> {
        // consume opening quote
        self.advance();
        let start = self.index;
        let mut buf = String::new();
        let mut run_start = start;
        while let Some(ch) = self.current() {
            match ch {
                b'"' => {
                    buf.push_str(&self.src[run_start..self.index]);
                    self.advance();
                    return Ok(Expression::string(buf));
                }
                b'\\' => {
                    buf.push_str(&self.src[run_start..self.index]);
                    self.advance();
                    let escaped = self
                        .current()
                        .ok_or_else(|| self.error("incomplete escape"))?;
                    self.advance();
                    let value = match escaped {
                        b'"' => '"',
                        b'\\' => '\\',
                        b'n' => '\n',
                        b'r' => '\r',
                        b't' => '\t',
                        other => {
                            return Err(self.error(&format!("unknown escape: \\{}", other as char)));
                        }
                    };
                    buf.push(value);
                    run_start = self.index;
                }
                _ => self.advance(),
            }
        }
        Err(self.error("unterminated string literal"))
    }

    fn parse_number_or_symbol(&mut self) -> Result<Expression> {
        let start = self.index;
        if self.current() == Some(b'-') || self.current() == Some(b'+') {
            self.advance();
        }
        let mut has_digit = false;
        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                has_digit = true;
                self.advance();
            } else {
                break;
            }
        }

        if !has_digit {
            self.index = start;
            return self.parse_symbol_or_bool();
        }

        if self.current() == Some(b'.') {
            return Err(self.error("floating-point literals are not supported"));
        }

        let text = &self.src[start..self.index];
        match text.parse::<i64>() {
            Ok(value) => Ok(Expression::Atom(Primitive::Integer(value))),
            Err(_) => Err(self.error("invalid integer literal")),
        }
    }

    fn parse_symbol_or_bool(&mut self) -> Result<Expression> {
        let start = self.index;
        while let Some(ch) = self.current() {
            if is_symbol_char(ch) {
                self.advance();
            } else {
                break;
            }
        }
        if start == self.index {
            return Err(self.error("unexpected character"));
        }
        let text = &self.src[start..self.index];
        match text {
            "true" | "#t" => Ok(Expression::Atom(Primitive::Boolean(true))),
            "false" | "#f" => Ok(Expression::Atom(Primitive::Boolean(false))),
            _ => Ok(Expression::symbol(text)),
        }
    }

    fn error(&self, message: &str) -> EvalError {
        EvalError::Syntax(format!("{} at byte {}", message, self.index))
    }
}

fn is_symbol_char(ch: u8) -> bool {
    match ch {
        b'(' | b')' | b'"' | b';' | b'\'' => false,
        c if c.is_ascii_whitespace() => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_builtin_call() {
        let expr = parse_expression("(dt:identity \"abc123\")").expect("parse");
        assert_eq!(
            expr,
            Expression::List(vec![
                Expression::symbol("dt:identity"),
                Expression::string("abc123"),
            ])
        );
    }

    #[test]
    fn quote_shorthand_expands() {
        let expr = parse_expression("'(a 5)").expect("parse");
        assert_eq!(
            expr,
            Expression::List(vec![
                Expression::symbol("quote"),
                Expression::List(vec![
                    Expression::symbol("a"),
                    Expression::Atom(Primitive::Integer(5)),
                ]),
            ])
        );
    }

    #[test]
    fn parses_multiple_forms_and_comments() {
        let src = "; page script\n(claim this 'pointing 5)\n(cell:id x) ; trailing";
        let forms = parse_script(src).expect("parse");
        assert_eq!(forms.len(), 2);
    }

    #[test]
    fn strings_keep_utf8_and_escapes() {
        let expr = parse_expression("\"cell \\\"ø\\\"\\n\"").expect("parse");
        assert_eq!(expr, Expression::string("cell \"ø\"\n"));
    }

    #[test]
    fn rejects_unbalanced_input() {
        assert!(matches!(parse_script("(a (b)"), Err(EvalError::Syntax(_))));
        assert!(matches!(parse_script(")"), Err(EvalError::Syntax(_))));
        assert!(matches!(parse_expression("1.5"), Err(EvalError::Syntax(_))));
    }
}
