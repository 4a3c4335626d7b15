use super::{content_token, object_token, space, NomError, ParserInput, RawToken};
use crate::error::ParseError;
use crate::{Keyword, Object};
use nom::Parser;

/// Which vocabulary bare words belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenMode {
    /// File structure: bare words are keywords such as `obj` or `xref`.
    Object,
    /// Content streams: bare words are operators.
    Content,
}

/// Cursor over a byte buffer yielding one PDF token at a time.
///
/// `n g R` sequences fold into a single reference; when the third token is not
/// `R` the cursor is left after the first integer.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    input: &'a [u8],
    position: usize,
    mode: TokenMode,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Tokenizer {
            input,
            position: 0,
            mode: TokenMode::Object,
        }
    }

    pub fn for_content(input: &'a [u8]) -> Self {
        Tokenizer {
            input,
            position: 0,
            mode: TokenMode::Content,
        }
    }

    pub fn mode(&self) -> TokenMode {
        self.mode
    }

    pub fn offset(&self) -> usize {
        self.position
    }

    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.input.len());
    }

    /// Bytes after the cursor.
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.position..]
    }

    /// Skip whitespace and comments.
    pub fn skip_space(&mut self) {
        let span = ParserInput::new_extra(self.remaining(), "space");
        if let Ok((rest, ())) = space(span) {
            self.position += rest.location_offset();
        }
    }

    /// Read the next token, or `None` at a clean end of input.
    pub fn next_token(&mut self) -> Result<Option<Object>, ParseError> {
        self.skip_space();
        if self.position >= self.input.len() {
            return Ok(None);
        }

        let span = ParserInput::new_extra(self.remaining(), "token");
        let parsed = match self.mode {
            TokenMode::Object => object_token.parse(span),
            TokenMode::Content => content_token.parse(span),
        };
        match parsed {
            Ok((rest, token)) => {
                let start = self.position;
                let object = self.resolve(token, start)?;
                self.position += rest.location_offset();
                Ok(Some(object))
            }
            Err(nom::Err::Error(err)) | Err(nom::Err::Failure(err)) => Err(self.failure(err)),
            Err(nom::Err::Incomplete(_)) => Err(ParseError::EndOfInput),
        }
    }

    /// Read the next token without moving the cursor.
    pub fn peek_token(&mut self) -> Result<Option<Object>, ParseError> {
        let mark = self.position;
        let token = self.next_token();
        self.position = mark;
        token
    }

    /// Read a token that must be a value rather than a keyword or operator.
    pub fn next_value(&mut self) -> Result<Object, ParseError> {
        let offset = self.position;
        match self.next_token()? {
            Some(Object::Keyword(_)) | Some(Object::Operator(_)) => Err(ParseError::Expected {
                expected: "value",
                offset,
            }),
            Some(value) => Ok(value),
            None => Err(ParseError::EndOfInput),
        }
    }

    fn resolve(&self, token: RawToken, start: usize) -> Result<Object, ParseError> {
        let word = match token {
            RawToken::Value(value) => return Ok(value),
            RawToken::Word(word) => word,
        };
        match word {
            b"true" => Ok(Object::Boolean(true)),
            b"false" => Ok(Object::Boolean(false)),
            b"null" => Ok(Object::Null),
            _ => match self.mode {
                TokenMode::Object => Keyword::from_bytes(word)
                    .map(Object::Keyword)
                    .ok_or_else(|| ParseError::UnknownKeyword(String::from_utf8_lossy(word).into_owned())),
                TokenMode::Content => std::str::from_utf8(word)
                    .map(|operator| Object::Operator(operator.to_string()))
                    .map_err(|_| ParseError::InvalidToken(start)),
            },
        }
    }

    fn failure(&self, err: NomError) -> ParseError {
        if err.input.is_empty() {
            ParseError::EndOfInput
        } else {
            ParseError::InvalidToken(self.position + err.input.location_offset())
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Object, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => None,
            Err(err) => {
                // Stop after the first error.
                self.position = self.input.len();
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StringFormat;

    fn tokens(input: &[u8]) -> Vec<Object> {
        Tokenizer::new(input).collect::<Result<Vec<_>, _>>().unwrap()
    }

    #[test]
    fn folds_references() {
        assert_eq!(
            tokens(b"12 0 R 7"),
            vec![Object::Reference((12, 0)), Object::Integer(7)]
        );
    }

    #[test]
    fn rolls_back_when_third_token_is_not_r() {
        let mut tokenizer = Tokenizer::new(b"5 0 obj\n<< >>");
        assert_eq!(tokenizer.next_token().unwrap(), Some(Object::Integer(5)));
        assert_eq!(tokenizer.offset(), 1);
        assert_eq!(tokenizer.next_token().unwrap(), Some(Object::Integer(0)));
        assert_eq!(tokenizer.next_token().unwrap(), Some(Object::Keyword(Keyword::Obj)));
        assert!(matches!(tokenizer.next_token().unwrap(), Some(Object::Dictionary(_))));
        assert_eq!(tokenizer.next_token().unwrap(), None);
    }

    #[test]
    fn reference_needs_standalone_r() {
        let mut tokenizer = Tokenizer::new(b"1 0 Rx");
        assert_eq!(tokenizer.next_token().unwrap(), Some(Object::Integer(1)));
        assert_eq!(tokenizer.next_token().unwrap(), Some(Object::Integer(0)));
        assert_eq!(
            tokenizer.next_token(),
            Err(ParseError::UnknownKeyword("Rx".to_string()))
        );
    }

    #[test]
    fn scalar_tokens() {
        assert_eq!(
            tokens(b"true false null -3 +4.5 .25 /Name (lit) <41 4> % comment\nendobj"),
            vec![
                Object::Boolean(true),
                Object::Boolean(false),
                Object::Null,
                Object::Integer(-3),
                Object::Real(4.5),
                Object::Real(0.25),
                Object::Name(b"Name".to_vec()),
                Object::String(b"lit".to_vec(), StringFormat::Literal),
                Object::String(b"A@".to_vec(), StringFormat::Hexadecimal),
                Object::Keyword(Keyword::EndObj),
            ]
        );
    }

    #[test]
    fn peek_does_not_consume() {
        let mut tokenizer = Tokenizer::new(b"  xref\n0 1");
        assert_eq!(tokenizer.peek_token().unwrap(), Some(Object::Keyword(Keyword::Xref)));
        assert_eq!(tokenizer.offset(), 0);
        assert_eq!(tokenizer.next_token().unwrap(), Some(Object::Keyword(Keyword::Xref)));
    }

    #[test]
    fn clean_end_and_truncation() {
        let mut tokenizer = Tokenizer::new(b"  % trailing comment");
        assert_eq!(tokenizer.next_token(), Ok(None));

        assert_eq!(Tokenizer::new(b"(unterminated").next_token(), Err(ParseError::EndOfInput));
        assert_eq!(Tokenizer::new(b"[1 2").next_token(), Err(ParseError::EndOfInput));
        assert_eq!(Tokenizer::new(b"<< /A 1").next_token(), Err(ParseError::EndOfInput));
        assert_eq!(Tokenizer::new(b"<4142").next_token(), Err(ParseError::EndOfInput));
    }

    #[test]
    fn invalid_tokens() {
        assert_eq!(Tokenizer::new(b"[1 ) 2]").next_token(), Err(ParseError::InvalidToken(3)));
        assert_eq!(Tokenizer::new(b"<4G>").next_token(), Err(ParseError::InvalidToken(2)));
        assert_eq!(Tokenizer::new(b"  ]").next_token(), Err(ParseError::InvalidToken(2)));
    }

    #[test]
    fn content_mode_operators() {
        let ops = Tokenizer::for_content(b"0 0 1 RG /F1 12 Tf T* (x) '")
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(
            ops,
            vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Operator("RG".to_string()),
                Object::Name(b"F1".to_vec()),
                Object::Integer(12),
                Object::Operator("Tf".to_string()),
                Object::Operator("T*".to_string()),
                Object::string_literal("x"),
                Object::Operator("'".to_string()),
            ]
        );
    }
}
