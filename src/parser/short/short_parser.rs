use serde_json::{Number, Value};

use crate::parser::{short::{ShortExpression, ShortValue}, ParserError, Result};

/// Reads `@name(args)` text into a [`ShortExpression`] without checking the
/// form's meaning.
#[derive(Debug, Default)]
pub struct ShortParser {
    pub position: usize,
    pub length: usize,
    pub text_v: Vec<char>,
}

impl ShortParser {
    pub fn new(text: &str) -> Self {
        let text_v: Vec<char> = text.chars().collect();
        Self { position: 0, length: text_v.len(), text_v }
    }

    /// Parses a whole short expression; trailing text is an error.
    pub fn parse(text: &str) -> Result<ShortExpression> {
        let mut parser = ShortParser::new(text);
        parser.next_non_whitespace();
        let expression = parser.parse_expression()?;
        parser.next_non_whitespace();
        if !parser.eof() {
            return parser.error(format!("unexpected '{}' after expression", parser.current()));
        }
        Ok(expression)
    }

    /// Parses one short expression at the start of `text` and returns it with
    /// the number of chars consumed.
    pub fn parse_prefix(text: &str) -> Result<(ShortExpression, usize)> {
        let mut parser = ShortParser::new(text);
        let expression = parser.parse_expression()?;
        Ok((expression, parser.position))
    }

    /// `@name(` ahead, allowing whitespace before the paren.
    pub fn starts_short(text_v: &[char], position: usize) -> bool {
        if text_v.get(position) != Some(&'@') || !text_v.get(position + 1).is_some_and(|c| Self::is_identifier_start(*c)) {
            return false;
        }
        let mut i = position + 1;
        while text_v.get(i).is_some_and(|c| Self::is_identifier_char(*c)) {
            i += 1;
        }
        while text_v.get(i).is_some_and(|c| c.is_whitespace()) {
            i += 1;
        }
        text_v.get(i) == Some(&'(')
    }

    pub fn eof(&self) -> bool {
        self.position >= self.length
    }

    pub fn current(&self) -> char {
        if self.position < self.length {
            return self.text_v[self.position];
        }

        '\0'
    }

    pub fn peek(&self, ahead: usize) -> char {
        self.text_v.get(self.position + ahead).copied().unwrap_or('\0')
    }

    pub fn next(&mut self) {
        self.position += 1;
    }

    pub fn next_non_whitespace(&mut self) {
        while self.current().is_whitespace() {
            self.next();
        }
    }

    pub fn text_from_range(&self, start: usize, end: usize) -> String {
        self.text_v[start..end.min(self.length)].iter().collect()
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T> {
        ParserError::ShortSyntax { message: message.into(), offset: self.position }.err()
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.current() != c {
            return match self.eof() {
                true => self.error(format!("expected '{}', got end of input", c)),
                false => self.error(format!("expected '{}', got '{}'", c, self.current())),
            };
        }
        self.next();
        Ok(())
    }

    fn is_identifier_start(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }

    fn is_identifier_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_'
    }

    fn read_identifier(&mut self) -> Option<String> {
        if !Self::is_identifier_start(self.current()) {
            return None;
        }
        let pivot = self.position;
        while Self::is_identifier_char(self.current()) {
            self.next();
        }
        Some(self.text_from_range(pivot, self.position))
    }

    fn parse_expression(&mut self) -> Result<ShortExpression> {
        self.expect('@')?;
        let Some(name) = self.read_identifier() else {
            return self.error("expected a short expression name after '@'");
        };
        let mut expression = ShortExpression::new(&name);

        self.next_non_whitespace();
        self.expect('(')?;
        self.next_non_whitespace();

        if self.current() == ')' {
            self.next();
            return Ok(expression);
        }

        loop {
            self.next_non_whitespace();
            let arg_start = self.position;

            match self.try_named_key() {
                Some(key) => {
                    if expression.named.contains_key(&key) {
                        self.position = arg_start;
                        return self.error(format!("duplicate named argument '{}'", key));
                    }
                    let value = self.parse_value()?;
                    expression.set_named(&key, value);
                },
                None => {
                    if !expression.named.is_empty() {
                        return self.error("positional arguments must precede named arguments");
                    }
                    let value = self.parse_value()?;
                    expression.positional.push(value);
                },
            }

            self.next_non_whitespace();
            match self.current() {
                ',' => self.next(),
                ')' => {
                    self.next();
                    return Ok(expression);
                },
                _ if self.eof() => return self.error("unterminated argument list"),
                other => return self.error(format!("expected ',' or ')', got '{}'", other)),
            }
        }
    }

    /// Consumes `key =` when present; otherwise leaves the cursor untouched.
    fn try_named_key(&mut self) -> Option<String> {
        let pivot = self.position;
        if let Some(key) = self.read_identifier() {
            self.next_non_whitespace();
            if self.current() == '=' && self.peek(1) != '=' {
                self.next();
                self.next_non_whitespace();
                return Some(key);
            }
        }
        self.position = pivot;
        None
    }

    fn parse_value(&mut self) -> Result<ShortValue> {
        self.next_non_whitespace();
        match self.current() {
            '@' if Self::is_identifier_start(self.peek(1)) => Ok(ShortValue::Short(self.parse_expression()?)),
            '[' => self.parse_array(),
            '{' => self.parse_json(),
            '\'' | '"' => Ok(ShortValue::String(self.parse_quoted()?)),
            _ => self.parse_bare(),
        }
    }

    fn parse_array(&mut self) -> Result<ShortValue> {
        self.expect('[')?;
        let mut values = Vec::new();
        self.next_non_whitespace();
        if self.current() == ']' {
            self.next();
            return Ok(ShortValue::Array(values));
        }

        loop {
            values.push(self.parse_value()?);
            self.next_non_whitespace();
            match self.current() {
                ',' => self.next(),
                ']' => {
                    self.next();
                    return Ok(ShortValue::Array(values));
                },
                _ if self.eof() => return self.error("unterminated array"),
                other => return self.error(format!("expected ',' or ']', got '{}'", other)),
            }
        }
    }

    /// Balanced `{...}`, skipping braces inside JSON strings.
    fn parse_json(&mut self) -> Result<ShortValue> {
        let pivot = self.position;
        let mut depth = 0usize;
        let mut in_string = false;

        while !self.eof() {
            let c = self.current();
            if in_string {
                match c {
                    '\\' => self.next(),
                    '"' => in_string = false,
                    _ => {},
                }
            } else {
                match c {
                    '"' => in_string = true,
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            self.next();
                            let text = self.text_from_range(pivot, self.position);
                            return match serde_json::from_str::<Value>(&text) {
                                Ok(value) => Ok(ShortValue::Json(value)),
                                Err(e) => {
                                    self.position = pivot;
                                    self.error(format!("invalid JSON: {}", e))
                                },
                            };
                        }
                    },
                    _ => {},
                }
            }
            self.next();
        }

        self.position = pivot;
        self.error("unterminated JSON object")
    }

    fn parse_quoted(&mut self) -> Result<String> {
        let quote = self.current();
        let pivot = self.position;
        self.next();

        let mut value = String::new();
        while !self.eof() {
            match self.current() {
                '\\' => {
                    self.next();
                    if self.eof() {
                        break;
                    }
                    value.push(self.current());
                },
                c if c == quote => {
                    self.next();
                    return Ok(value);
                },
                c => value.push(c),
            }
            self.next();
        }

        self.position = pivot;
        self.error("unterminated string")
    }

    /// Unquoted token up to the next `,`, `)` or `]`.
    fn parse_bare(&mut self) -> Result<ShortValue> {
        let pivot = self.position;
        while !self.eof() && !matches!(self.current(), ',' | ')' | ']') {
            if matches!(self.current(), '(' | '[' | '{' | '\'' | '"') {
                return self.error(format!("unexpected '{}' in unquoted value", self.current()));
            }
            self.next();
        }

        let token = self.text_from_range(pivot, self.position);
        let token = token.trim();
        if token.is_empty() {
            self.position = pivot;
            return self.error("expected a value");
        }

        Ok(match token.to_ascii_lowercase().as_str() {
            "null" => ShortValue::Null,
            "true" => ShortValue::Bool(true),
            "false" => ShortValue::Bool(false),
            _ => match serde_json::from_str::<Number>(token) {
                Ok(number) => ShortValue::Number(number),
                Err(_) => ShortValue::String(token.to_string()),
            },
        })
    }
}

/// Re-serializes a short expression into its canonical compact form without
/// checking that the form exists or that its arguments make sense.
pub fn sanitize_short_expression(text: &str) -> Result<String> {
    Ok(ShortParser::parse(text)?.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Number};

    use crate::parser::{short::{sanitize_short_expression, ShortParser, ShortValue}, ParserError};

    #[test]
    pub fn test_parse_arguments() {
        let expression = ShortParser::parse(r#"@Function( sum , [ @column(a, v), 'x, y', 1.5, null ], distinct = true, extra={"a": [1, "}"]} )"#)
            .expect("Failed to parse short");

        assert_eq!(expression.name, "function");
        assert_eq!(expression.positional.len(), 2);
        assert_eq!(expression.positional[0], ShortValue::String("sum".into()));

        let ShortValue::Array(args) = &expression.positional[1] else { panic!() };
        assert!(matches!(&args[0], ShortValue::Short(inner) if inner.name == "column" && inner.positional.len() == 2));
        assert_eq!(args[1], ShortValue::String("x, y".into()));
        assert_eq!(args[2], ShortValue::Number(Number::from_f64(1.5).unwrap()));
        assert_eq!(args[3], ShortValue::Null);

        assert_eq!(expression.named.get("distinct"), Some(&ShortValue::Bool(true)));
        assert_eq!(expression.named.get("extra"), Some(&ShortValue::Json(json!({ "a": [1, "}"] }))));
    }

    #[test]
    pub fn test_operator_tokens_are_bare_values() {
        let expression = ShortParser::parse("@operator(>=, [1, 2])").expect("Failed to parse");
        assert_eq!(expression.positional[0], ShortValue::String(">=".into()));

        let expression = ShortParser::parse("@operator(==, [1, 2])").expect("Failed to parse");
        assert_eq!(expression.positional[0], ShortValue::String("==".into()));

        let expression = ShortParser::parse("@operator(@>, [[1], [2]])").expect("Failed to parse");
        assert_eq!(expression.positional[0], ShortValue::String("@>".into()));
    }

    #[test]
    pub fn test_positional_after_named() {
        match ShortParser::parse("@column(view=v, a)") {
            Err(ParserError::ShortSyntax { .. }) => {},
            _ => panic!(),
        }
    }

    #[test]
    pub fn test_syntax_errors_carry_offsets() {
        let err = ShortParser::parse("@column(a b(").unwrap_err();
        assert_eq!(err.offset(), Some(11));

        assert!(ShortParser::parse("column(a)").is_err());
        assert!(ShortParser::parse("@column(a").is_err());
        assert!(ShortParser::parse("@column(a) x").is_err());
        assert!(ShortParser::parse("@column(,)").is_err());
        assert!(ShortParser::parse("@column('a)").is_err());
        assert!(ShortParser::parse("@column(a, a=1, a=2)").is_err());
    }

    #[test]
    pub fn test_sanitize() {
        assert_eq!(
            sanitize_short_expression("  @COLUMN( a , view = 'v' )").expect("Failed to sanitize"),
            "@column(a,view=v)"
        );
        assert_eq!(
            sanitize_short_expression("@list([ 'a b' , \"it's\" ])").expect("Failed to sanitize"),
            r"@list(['a b','it\'s'])"
        );
        assert_eq!(sanitize_short_expression("@unknown()").expect("Failed to sanitize"), "@unknown()");
    }
}
