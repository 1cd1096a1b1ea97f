//! Parser for check expressions: `typeName(arg, ..., key=value, ...)`.
//!
//! Argument values stay strings (checks interpret them); quoting only
//! matters for telling the bare word `None` apart from the string `'None'`,
//! and `list(...)` literals are accepted as list defaults.

use std::iter::Peekable;
use std::str::Chars;

use indexmap::IndexMap;

use super::SchemaError;
use crate::value::Value;

#[derive(Debug)]
pub(crate) struct ParsedCheck {
    pub type_name: String,
    pub args: Vec<String>,
    pub kwargs: IndexMap<String, String>,
    pub default: Option<Value>,
}

/// One parsed argument value, with enough provenance to interpret defaults.
#[derive(Debug)]
enum ArgValue {
    Scalar { text: String, quoted: bool },
    List(Vec<String>),
}

pub(crate) fn parse_check(src: &str, line: usize) -> Result<ParsedCheck, SchemaError> {
    let mut parser = CheckParser {
        chars: src.chars().peekable(),
        line,
    };
    parser.parse()
}

struct CheckParser<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl CheckParser<'_> {
    fn parse(&mut self) -> Result<ParsedCheck, SchemaError> {
        self.skip_ws();
        let type_name = self.read_ident()?;
        self.skip_ws();

        let mut args = Vec::new();
        let mut kwargs = IndexMap::new();
        let mut default = None;

        if self.chars.peek() == Some(&'(') {
            self.chars.next();
            self.parse_args(&mut args, &mut kwargs, &mut default)?;
        }

        self.skip_ws();
        if let Some(trailing) = self.chars.next() {
            return Err(self.error(format!("unexpected character '{trailing}'")));
        }

        Ok(ParsedCheck {
            type_name,
            args,
            kwargs,
            default,
        })
    }

    fn parse_args(
        &mut self,
        args: &mut Vec<String>,
        kwargs: &mut IndexMap<String, String>,
        default: &mut Option<Value>,
    ) -> Result<(), SchemaError> {
        loop {
            self.skip_ws();
            match self.chars.peek() {
                Some(')') => {
                    self.chars.next();
                    return Ok(());
                }
                None => return Err(self.error("unclosed argument list".to_string())),
                _ => {}
            }

            self.parse_one_arg(args, kwargs, default)?;

            self.skip_ws();
            match self.chars.next() {
                Some(',') => continue,
                Some(')') => return Ok(()),
                Some(other) => {
                    return Err(self.error(format!("expected ',' or ')', found '{other}'")))
                }
                None => return Err(self.error("unclosed argument list".to_string())),
            }
        }
    }

    fn parse_one_arg(
        &mut self,
        args: &mut Vec<String>,
        kwargs: &mut IndexMap<String, String>,
        default: &mut Option<Value>,
    ) -> Result<(), SchemaError> {
        if let Some(&quote) = self.chars.peek().filter(|c| **c == '\'' || **c == '"') {
            self.chars.next();
            let text = self.read_quoted(quote)?;
            args.push(text);
            return Ok(());
        }

        let token = self.read_bare_token()?;
        self.skip_ws();

        match self.chars.peek() {
            Some('=') => {
                self.chars.next();
                self.skip_ws();
                let value = self.parse_arg_value()?;
                self.store_kwarg(token, value, kwargs, default)
            }
            Some('(') => {
                // A nested call as a positional argument has no meaning here;
                // list literals are only valid as defaults.
                Err(self.error(format!(
                    "list literal is only allowed as a default (at '{token}')"
                )))
            }
            _ => {
                args.push(token);
                Ok(())
            }
        }
    }

    fn parse_arg_value(&mut self) -> Result<ArgValue, SchemaError> {
        if let Some(&quote) = self.chars.peek().filter(|c| **c == '\'' || **c == '"') {
            self.chars.next();
            let text = self.read_quoted(quote)?;
            return Ok(ArgValue::Scalar { text, quoted: true });
        }

        let token = self.read_bare_token()?;
        self.skip_ws();
        if self.chars.peek() == Some(&'(') {
            if token != "list" && token != "tuple" {
                return Err(self.error(format!("unexpected call '{token}(...)'")));
            }
            self.chars.next();
            let items = self.parse_list_items()?;
            return Ok(ArgValue::List(items));
        }
        Ok(ArgValue::Scalar {
            text: token,
            quoted: false,
        })
    }

    fn parse_list_items(&mut self) -> Result<Vec<String>, SchemaError> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.chars.peek() {
                Some(')') => {
                    self.chars.next();
                    return Ok(items);
                }
                Some(&quote) if quote == '\'' || quote == '"' => {
                    self.chars.next();
                    items.push(self.read_quoted(quote)?);
                }
                Some(_) => items.push(self.read_bare_token()?),
                None => return Err(self.error("unclosed list literal".to_string())),
            }
            self.skip_ws();
            match self.chars.next() {
                Some(',') => continue,
                Some(')') => return Ok(items),
                Some(other) => {
                    return Err(self.error(format!("expected ',' or ')', found '{other}'")))
                }
                None => return Err(self.error("unclosed list literal".to_string())),
            }
        }
    }

    fn store_kwarg(
        &mut self,
        key: String,
        value: ArgValue,
        kwargs: &mut IndexMap<String, String>,
        default: &mut Option<Value>,
    ) -> Result<(), SchemaError> {
        if key == "default" {
            *default = match value {
                ArgValue::List(items) => Some(Value::List(
                    items.into_iter().map(Value::Str).collect(),
                )),
                // Bare None means "no default"; quoted 'None' is the string.
                ArgValue::Scalar { text, quoted } => {
                    if !quoted && text == "None" {
                        None
                    } else {
                        Some(Value::Str(text))
                    }
                }
            };
            return Ok(());
        }

        match value {
            ArgValue::List(_) => {
                Err(self.error(format!("list literal is only allowed as a default (at '{key}')")))
            }
            ArgValue::Scalar { text, .. } => {
                kwargs.insert(key, text);
                Ok(())
            }
        }
    }

    fn skip_ws(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn read_ident(&mut self) -> Result<String, SchemaError> {
        let mut ident = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                ident.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if ident.is_empty() {
            return Err(self.error("expected a type name".to_string()));
        }
        Ok(ident)
    }

    fn read_bare_token(&mut self) -> Result<String, SchemaError> {
        let mut token = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == ',' || c == ')' || c == '=' || c == '(' {
                break;
            }
            token.push(c);
            self.chars.next();
        }
        let token = token.trim().to_string();
        if token.is_empty() {
            return Err(self.error("expected an argument value".to_string()));
        }
        Ok(token)
    }

    fn read_quoted(&mut self, quote: char) -> Result<String, SchemaError> {
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some('\\') => match self.chars.next() {
                    Some(escaped) => text.push(escaped),
                    None => return Err(self.error("unterminated string".to_string())),
                },
                Some(c) if c == quote => return Ok(text),
                Some(c) => text.push(c),
                None => return Err(self.error("unterminated string".to_string())),
            }
        }
    }

    fn error(&self, message: String) -> SchemaError {
        SchemaError::Parse {
            line: self.line,
            message,
        }
    }
}
