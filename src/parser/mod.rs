use crate::error::ParseError as PdfParseError;
use crate::xref::{XrefEntry, XrefRecord};
use crate::{Dictionary, Error, Keyword, Object, ObjectId, StringFormat};
use std::str::{self, FromStr};

use nom::branch::alt;
use nom::bytes::complete::{tag, take, take_while, take_while1, take_while_m_n};
use nom::character::complete::{digit0, digit1, one_of};
use nom::combinator::{cut, map, map_opt, map_res, not, opt, verify};
use nom::error::{ErrorKind, ParseError};
use nom::multi::{count, fold_many0, fold_many1, many0};
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated};
use nom::{AsBytes, AsChar, IResult, Parser};
use nom_locate::LocatedSpan;

mod tokenizer;

pub use tokenizer::{TokenMode, Tokenizer};

pub(crate) type ParserInput<'a> = LocatedSpan<&'a [u8], &'a str>;
pub(crate) type NomError<'a> = nom::error::Error<ParserInput<'a>>;

pub(crate) type NomResult<'a, O, E = NomError<'a>> = IResult<ParserInput<'a>, O, E>;

/// Maximum allowed embedding of literal strings.
pub const MAX_BRACKET: usize = 100;

const WHITESPACE: u8 = 0b01;
const DELIMITER: u8 = 0b10;

/// Byte classes: whitespace bytes are delimiters too.
static CHAR_CLASS: [u8; 256] = {
    let mut table = [0u8; 256];
    let whitespace = b" \t\n\r\0\x0C";
    let mut i = 0;
    while i < whitespace.len() {
        table[whitespace[i] as usize] = WHITESPACE | DELIMITER;
        i += 1;
    }
    let delimiters = b"()<>[]{}/%";
    let mut i = 0;
    while i < delimiters.len() {
        table[delimiters[i] as usize] = DELIMITER;
        i += 1;
    }
    table
};

#[inline]
fn strip_nom<O>(r: NomResult<O>) -> Option<O> {
    r.ok().map(|(_, o)| o)
}

#[inline]
pub(crate) fn is_whitespace(c: u8) -> bool {
    CHAR_CLASS[c as usize] & WHITESPACE != 0
}

#[inline]
pub(crate) fn is_delimiter(c: u8) -> bool {
    CHAR_CLASS[c as usize] & DELIMITER != 0
}

#[inline]
fn is_regular(c: u8) -> bool {
    CHAR_CLASS[c as usize] == 0
}

#[inline]
fn is_direct_literal_string(c: u8) -> bool {
    !b"()\\\r\n".contains(&c)
}

pub(crate) fn eol(input: ParserInput) -> NomResult<ParserInput> {
    alt((tag(&b"\r\n"[..]), tag(&b"\n"[..]), tag(&b"\r"[..]))).parse(input)
}

fn comment(input: ParserInput) -> NomResult<()> {
    map((tag(&b"%"[..]), take_while(|c: u8| !b"\r\n".contains(&c))), |_| ()).parse(input)
}

fn white_space(input: ParserInput) -> NomResult<()> {
    map(take_while(is_whitespace), |_| ()).parse(input)
}

pub(crate) fn space(input: ParserInput) -> NomResult<()> {
    fold_many0(
        alt((map(take_while1(is_whitespace), |_| ()), comment)),
        || {},
        |_, _| (),
    )
    .parse(input)
}

fn integer(input: ParserInput) -> NomResult<i64> {
    map_opt(
        (opt(one_of("+-")), digit1),
        |(sign, digits): (Option<char>, ParserInput)| {
            let value = i64::from_str(str::from_utf8(&digits).ok()?).ok()?;
            Some(if sign == Some('-') { -value } else { value })
        },
    )
    .parse(input)
}

fn real(input: ParserInput) -> NomResult<f64> {
    let (i, _) = pair(
        opt(one_of("+-")),
        alt((
            map((digit1, tag(&b"."[..]), digit0), |_| ()),
            map(pair(tag(&b"."[..]), digit1), |_| ()),
        )),
    )
    .parse(input)?;

    let float_input = &input[..input.len() - i.len()];
    match str::from_utf8(float_input).ok().and_then(|s| f64::from_str(s).ok()) {
        Some(value) => Ok((i, value)),
        None => Err(nom::Err::Error(NomError::from_error_kind(input, ErrorKind::Float))),
    }
}

fn number(input: ParserInput) -> NomResult<Object> {
    alt((map(real, Object::Real), map(integer, Object::Integer))).parse(input)
}

fn hex_char(input: ParserInput) -> NomResult<u8> {
    map_res(
        verify(take(2usize), |h: &ParserInput| {
            h.as_bytes().iter().copied().all(AsChar::is_hex_digit)
        }),
        |x: ParserInput| u8::from_str_radix(str::from_utf8(&x).unwrap_or_default(), 16),
    )
    .parse(input)
}

fn oct_char(input: ParserInput) -> NomResult<u8> {
    map_res(
        take_while_m_n(1, 3, AsChar::is_oct_digit),
        // High-order overflow is ignored.
        |x: ParserInput| u16::from_str_radix(str::from_utf8(&x).unwrap_or_default(), 8).map(|o| o as u8),
    )
    .parse(input)
}

pub(crate) fn name(input: ParserInput) -> NomResult<Vec<u8>> {
    preceded(
        tag(&b"/"[..]),
        many0(alt((
            preceded(tag(&b"#"[..]), hex_char),
            map_opt(take(1usize), |c: ParserInput| {
                if c[0] != b'#' && is_regular(c[0]) {
                    Some(c[0])
                } else {
                    None
                }
            }),
        ))),
    )
    .parse(input)
}

fn escape_sequence(input: ParserInput) -> NomResult<Option<u8>> {
    preceded(
        tag(&b"\\"[..]),
        alt((
            map(oct_char, Some),
            map(eol, |_| None),
            map(tag(&b"n"[..]), |_| Some(b'\n')),
            map(tag(&b"r"[..]), |_| Some(b'\r')),
            map(tag(&b"t"[..]), |_| Some(b'\t')),
            map(tag(&b"b"[..]), |_| Some(b'\x08')),
            map(tag(&b"f"[..]), |_| Some(b'\x0C')),
            map(take(1usize), |c: ParserInput| Some(c[0])),
        )),
    )
    .parse(input)
}

enum InnerLiteralString<'a> {
    Direct(ParserInput<'a>),
    Escape(Option<u8>),
    Eol(ParserInput<'a>),
    Nested(Vec<u8>),
}

impl InnerLiteralString<'_> {
    fn push(&self, output: &mut Vec<u8>) {
        match self {
            InnerLiteralString::Direct(s) | InnerLiteralString::Eol(s) => output.extend_from_slice(s),
            InnerLiteralString::Escape(e) => output.extend(e),
            InnerLiteralString::Nested(n) => output.extend_from_slice(n),
        }
    }
}

fn inner_literal_string(depth: usize) -> impl Fn(ParserInput) -> NomResult<Vec<u8>> {
    move |input| {
        fold_many0(
            alt((
                map(take_while1(is_direct_literal_string), InnerLiteralString::Direct),
                map(escape_sequence, InnerLiteralString::Escape),
                map(eol, InnerLiteralString::Eol),
                map(nested_literal_string(depth), InnerLiteralString::Nested),
            )),
            Vec::new,
            |mut out: Vec<u8>, value| {
                value.push(&mut out);
                out
            },
        )
        .parse(input)
    }
}

fn nested_literal_string(depth: usize) -> impl Fn(ParserInput) -> NomResult<Vec<u8>> {
    move |input| {
        if depth == 0 {
            Err(nom::Err::Error(NomError::from_error_kind(input, ErrorKind::TooLarge)))
        } else {
            map(
                delimited(tag(&b"("[..]), inner_literal_string(depth - 1), tag(&b")"[..])),
                |mut content| {
                    content.insert(0, b'(');
                    content.push(b')');
                    content
                },
            )
            .parse(input)
        }
    }
}

fn literal_string(input: ParserInput) -> NomResult<Vec<u8>> {
    preceded(
        tag(&b"("[..]),
        cut(terminated(inner_literal_string(MAX_BRACKET), tag(&b")"[..]))),
    )
    .parse(input)
}

#[inline]
fn hex_digit(input: ParserInput) -> NomResult<u8> {
    map_opt(take(1usize), |c: ParserInput| (c[0] as char).to_digit(16).map(|d| d as u8)).parse(input)
}

fn hexadecimal_string(input: ParserInput) -> NomResult<Object> {
    map(
        preceded(
            tag(&b"<"[..]),
            cut(terminated(
                fold_many0(
                    preceded(white_space, hex_digit),
                    || -> (Vec<u8>, bool) { (Vec::new(), false) },
                    |state, c| match state {
                        (mut out, false) => {
                            // An odd trailing nibble keeps its zero low half.
                            out.push(c << 4);
                            (out, true)
                        }
                        (mut out, true) => {
                            if let Some(last) = out.last_mut() {
                                *last |= c;
                            }
                            (out, false)
                        }
                    },
                ),
                preceded(white_space, tag(&b">"[..])),
            )),
        ),
        |(bytes, _)| Object::String(bytes, StringFormat::Hexadecimal),
    )
    .parse(input)
}

fn boolean(input: ParserInput) -> NomResult<Object> {
    alt((
        map(tag(&b"true"[..]), |_| Object::Boolean(true)),
        map(tag(&b"false"[..]), |_| Object::Boolean(false)),
    ))
    .parse(input)
}

fn null(input: ParserInput) -> NomResult<Object> {
    map(tag(&b"null"[..]), |_| Object::Null).parse(input)
}

fn array(input: ParserInput) -> NomResult<Vec<Object>> {
    preceded(
        pair(tag(&b"["[..]), space),
        cut(terminated(many0(_direct_object), tag(&b"]"[..]))),
    )
    .parse(input)
}

pub(crate) fn dictionary(input: ParserInput) -> NomResult<Dictionary> {
    preceded(
        pair(tag(&b"<<"[..]), space),
        cut(terminated(inner_dictionary, tag(&b">>"[..]))),
    )
    .parse(input)
}

pub(crate) fn inner_dictionary(input: ParserInput) -> NomResult<Dictionary> {
    fold_many0(
        pair(terminated(name, space), _direct_object),
        Dictionary::new,
        |mut dict, (key, value)| {
            dict.set(key, value);
            dict
        },
    )
    .parse(input)
}

fn unsigned_int<I: FromStr>(input: ParserInput) -> NomResult<I> {
    map_opt(digit1, |digits: ParserInput| {
        str::from_utf8(&digits).ok().and_then(|s| I::from_str(s).ok())
    })
    .parse(input)
}

fn object_id(input: ParserInput) -> NomResult<ObjectId> {
    pair(terminated(unsigned_int, space), terminated(unsigned_int, space)).parse(input)
}

/// `R` must stand alone, so `0 0 RG` in a content stream stays an operator.
fn reference(input: ParserInput) -> NomResult<Object> {
    map(
        terminated(
            object_id,
            terminated(tag(&b"R"[..]), not(verify(take(1usize), |c: &ParserInput| is_regular(c[0])))),
        ),
        Object::Reference,
    )
    .parse(input)
}

fn _direct_objects(input: ParserInput) -> NomResult<Object> {
    alt((
        null,
        boolean,
        reference,
        number,
        map(name, Object::Name),
        map(literal_string, Object::string_literal),
        map(dictionary, Object::Dictionary),
        hexadecimal_string,
        map(array, Object::Array),
    ))
    .parse(input)
}

fn _direct_object(input: ParserInput) -> NomResult<Object> {
    terminated(_direct_objects, space).parse(input)
}

pub fn direct_object(input: &[u8]) -> Option<Object> {
    strip_nom(_direct_object.parse(ParserInput::new_extra(input, "direct object")))
}

/// A single top-level token before keyword resolution.
pub(crate) enum RawToken<'a> {
    Value(Object),
    Word(&'a [u8]),
}

fn word(input: ParserInput) -> NomResult<RawToken> {
    map(take_while1(is_regular), |w: ParserInput| RawToken::Word(*w.fragment())).parse(input)
}

fn value_token(input: ParserInput) -> NomResult<RawToken> {
    map(
        alt((
            number,
            map(name, Object::Name),
            map(literal_string, Object::string_literal),
            map(dictionary, Object::Dictionary),
            hexadecimal_string,
            map(array, Object::Array),
        )),
        RawToken::Value,
    )
    .parse(input)
}

pub(crate) fn object_token(input: ParserInput) -> NomResult<RawToken> {
    alt((map(reference, RawToken::Value), value_token, word)).parse(input)
}

pub(crate) fn content_token(input: ParserInput) -> NomResult<RawToken> {
    alt((value_token, word)).parse(input)
}

/// Version number from the `%PDF-1.x` signature, after optional leading whitespace,
/// and the offset of the signature. File offsets are counted from there.
pub fn header(input: &[u8]) -> Option<(String, usize)> {
    strip_nom(
        map_res(
            pair(
                terminated(take_while(is_whitespace), tag(&b"%PDF-"[..])),
                verify(take(3usize), |v: &ParserInput| {
                    v[0] == b'1' && v[1] == b'.' && (b'0'..=b'7').contains(&v[2])
                }),
            ),
            |(leading, v): (ParserInput, ParserInput)| {
                str::from_utf8(v.fragment()).map(|version| (version.to_string(), leading.fragment().len()))
            },
        )
        .parse(ParserInput::new_extra(input, "header")),
    )
}

/// Decode a cross reference table, including its trailer dictionary.
fn xref(input: ParserInput) -> NomResult<Vec<XrefRecord>> {
    let xref_eol = map(
        alt((
            tag(&b" \r\n"[..]),
            tag(&b" \r"[..]),
            tag(&b" \n"[..]),
            tag(&b"\r\n"[..]),
            tag(&b"\n"[..]),
        )),
        |_| (),
    );
    let xref_entry = pair(
        separated_pair(unsigned_int::<u64>, tag(&b" "[..]), unsigned_int::<u32>),
        delimited(tag(&b" "[..]), map(one_of("nf"), |k| k == 'n'), xref_eol),
    );

    let xref_section = pair(
        separated_pair(unsigned_int::<u32>, tag(&b" "[..]), unsigned_int::<usize>),
        preceded(pair(take_while(|c| c == b' '), eol), many0(xref_entry)),
    );

    delimited(
        pair(tag(&b"xref"[..]), space),
        fold_many1(
            xref_section,
            Vec::new,
            |mut records: Vec<XrefRecord>, ((start, count), entries)| {
                for (index, ((offset, generation), in_use)) in entries.into_iter().take(count).enumerate() {
                    let Some(number) = start.checked_add(index as u32) else {
                        break;
                    };
                    let Ok(generation) = u16::try_from(generation) else {
                        continue;
                    };
                    let entry = if in_use {
                        XrefEntry::Normal { offset, generation }
                    } else {
                        XrefEntry::Free { generation }
                    };
                    records.push(XrefRecord { number, entry });
                }
                records
            },
        ),
        space,
    )
    .parse(input)
}

fn trailer(input: ParserInput) -> NomResult<Dictionary> {
    delimited(pair(tag(&b"trailer"[..]), space), dictionary, space).parse(input)
}

/// Parse an `xref` table and the trailer that follows it.
pub fn xref_and_trailer(input: &[u8], offset: usize) -> crate::Result<(Vec<XrefRecord>, Dictionary)> {
    pair(xref, trailer)
        .parse(ParserInput::new_extra(input, "xref"))
        .map(|(_, o)| o)
        .map_err(|_| Error::Parse(PdfParseError::Expected { expected: "xref table", offset }))
}

pub fn xref_start(input: &[u8]) -> Option<i64> {
    strip_nom(
        delimited(
            pair(tag(&b"startxref"[..]), space),
            integer,
            (take_while(|c| c == b' '), eol),
        )
        .parse(ParserInput::new_extra(input, "startxref")),
    )
}

/// Number of bytes between the end of the `stream` keyword and the first data byte.
pub fn stream_data_gap(input: &[u8]) -> usize {
    let span = ParserInput::new_extra(input, "stream");
    match pair(take_while(|c| c == b' '), eol).parse(span) {
        Ok((rest, _)) => rest.location_offset(),
        Err(_) => 0,
    }
}

/// True when `endstream` and then `endobj` follow, separated only by whitespace.
pub fn stream_terminated(input: &[u8]) -> bool {
    (space, tag(&b"endstream"[..]), space, tag(&b"endobj"[..]))
        .parse(ParserInput::new_extra(input, "endstream"))
        .is_ok()
}

/// Header table of an object stream: `count` pairs of object number and relative offset.
pub fn object_stream_header(input: &[u8], entries: usize) -> Option<Vec<(u32, usize)>> {
    strip_nom(
        preceded(
            space,
            count(
                pair(terminated(unsigned_int::<u32>, space), terminated(unsigned_int::<usize>, space)),
                entries,
            ),
        )
        .parse(ParserInput::new_extra(input, "object stream")),
    )
}

/// Result of parsing an indirect object at a file offset.
#[derive(Debug)]
pub struct ParsedObject {
    pub id: ObjectId,
    pub value: Object,
    /// Offset of the first stream data byte when the value is a stream dictionary.
    pub stream_start: Option<usize>,
}

/// Parse `n g obj <value> [stream]` at `offset`, requiring object number `expected`.
pub fn indirect_object(buffer: &[u8], offset: usize, expected: u32) -> crate::Result<ParsedObject> {
    let mut tokenizer = Tokenizer::new(buffer);
    tokenizer.seek(offset);

    let id = match (tokenizer.next_token()?, tokenizer.next_token()?, tokenizer.next_token()?) {
        (Some(Object::Integer(number)), Some(Object::Integer(generation)), Some(Object::Keyword(Keyword::Obj))) => {
            match (u32::try_from(number), u16::try_from(generation)) {
                (Ok(number), Ok(generation)) => (number, generation),
                _ => return Err(PdfParseError::IndirectObject(offset).into()),
            }
        }
        _ => return Err(PdfParseError::IndirectObject(offset).into()),
    };
    if id.0 != expected {
        return Err(Error::ObjectIdMismatch { expected, found: id });
    }

    let value = tokenizer.next_value()?;
    let mut stream_start = None;
    if let Object::Dictionary(_) = value {
        let mark = tokenizer.offset();
        if matches!(tokenizer.next_token(), Ok(Some(Object::Keyword(Keyword::Stream)))) {
            let keyword_end = tokenizer.offset();
            stream_start = Some(keyword_end + stream_data_gap(&buffer[keyword_end..]));
        } else {
            tokenizer.seek(mark);
        }
    }

    Ok(ParsedObject { id, value, stream_start })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_span(s: &'_ [u8]) -> ParserInput<'_> {
        LocatedSpan::new_extra(s, "test")
    }

    fn tstrip<O>(r: NomResult<O>) -> Option<O> {
        r.ok().and_then(|(i, o)| if !i.is_empty() { None } else { Some(o) })
    }

    #[test]
    fn byte_classes() {
        for c in b" \t\n\r\0\x0C" {
            assert!(is_whitespace(*c));
            assert!(is_delimiter(*c));
        }
        for c in b"()<>[]{}/%" {
            assert!(!is_whitespace(*c));
            assert!(is_delimiter(*c));
        }
        assert!(is_regular(b'a'));
        assert!(is_regular(b'#'));
    }

    #[test]
    fn parse_real_number() {
        let real = |i| tstrip(real(i));

        assert_eq!(real(test_span(b"0.12")), Some(0.12));
        assert_eq!(real(test_span(b"-.12")), Some(-0.12));
        assert_eq!(real(test_span(b"10.")), Some(10.0));
        assert_eq!(real(test_span(b"12")), None);
    }

    #[test]
    fn parse_string() {
        let literal_string = |i| tstrip(literal_string(i));

        let data = vec![
            ("()", ""),
            ("(text())", "text()"),
            ("(text\r\n\\\\(nested\\t\\b\\f))", "text\r\n\\(nested\t\x08\x0C)"),
            ("(text\\0\\53\\053\\0053)", "text\0++\x053"),
            ("(text line\\\n())", "text line()"),
            ("(\\(unbalanced)", "(unbalanced"),
        ];

        for (input, expected) in data {
            assert_eq!(
                literal_string(test_span(input.as_bytes())),
                Some(expected.as_bytes().to_vec()),
                "input: {:?} output: {:?}",
                input,
                expected,
            );
        }
    }

    #[test]
    fn parse_name() {
        let (text, expected) = (b"/ABC#5f", b"ABC\x5F");
        let result = tstrip(name(test_span(text)));
        assert_eq!(result, Some(expected.to_vec()));

        let (text, expected) = (b"/#cb#ce#cc#e5", b"\xcb\xce\xcc\xe5");
        let result = tstrip(name(test_span(text)));
        assert_eq!(result, Some(expected.to_vec()));
    }

    #[test]
    fn hex_partial() {
        let out = tstrip(hexadecimal_string(test_span(b"<901FA>")));

        match out {
            Some(Object::String(s, _)) => assert_eq!(s, b"\x90\x1F\xA0".to_vec()),
            _ => panic!("unexpected {:?}", out),
        }
    }

    #[test]
    fn hex_separated() {
        let out = tstrip(hexadecimal_string(test_span(b"<9 01F A>")));

        match out {
            Some(Object::String(s, _)) => assert_eq!(s, b"\x90\x1F\xA0".to_vec()),
            _ => panic!("unexpected {:?}", out),
        }
    }

    #[test]
    fn nested_containers() {
        let object = direct_object(b"<< /Kids [3 0 R 4 0 R] /Count 2 /Box [0 0 612.5 -.5] >>").unwrap();
        let dict = object.as_dict().unwrap();
        assert_eq!(
            dict.get(b"Kids").unwrap(),
            &Object::Array(vec![Object::Reference((3, 0)), Object::Reference((4, 0))])
        );
        assert_eq!(dict.get(b"Count").unwrap(), &Object::Integer(2));
        assert_eq!(
            dict.get(b"Box").unwrap().as_array().unwrap()[3],
            Object::Real(-0.5)
        );
    }

    #[test]
    fn xref_with_free_entries() {
        let input = b"xref
0 1
0000000000 65536 f
0 4
0000000000 65535 f
0000153238 00000 n
0000000019 00001 n
0000000313 65535 f
trailer
<</Size 4/Root 1 0 R>>
";
        let (records, trailer) = xref_and_trailer(input, 0).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[1].number, 1);
        assert_eq!(records[1].entry, XrefEntry::Normal { offset: 153238, generation: 0 });
        assert_eq!(records[2].entry, XrefEntry::Normal { offset: 19, generation: 1 });
        assert_eq!(records[3].entry, XrefEntry::Free { generation: 65535 });
        assert_eq!(trailer.get(b"Size").unwrap(), &Object::Integer(4));
    }

    #[test]
    fn xref_section_count_limits_entries() {
        let input = b"xref
3 1
0000000010 00000 n
0000000020 00000 n
trailer
<<>>
";
        let (records, _) = xref_and_trailer(input, 0).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].entry, XrefEntry::Normal { offset: 10, generation: 0 });

        let input = b"xref\r\n3 2\r\n0000000010 00000 n\r\n0000000020 00000 n\r\ntrailer <</Size 5>>";
        let (records, _) = xref_and_trailer(input, 0).unwrap();
        assert_eq!(records.iter().map(|r| r.number).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn space_in_startxref_number() {
        let input = b"startxref
153804
%%EOF
";
        assert_eq!(xref_start(input), Some(153804));
    }

    #[test]
    fn file_header() {
        assert_eq!(header(b"%PDF-1.7\n%\xE2\xE3"), Some(("1.7".to_string(), 0)));
        assert_eq!(header(b"\r\n  %PDF-1.4\n"), Some(("1.4".to_string(), 4)));
        assert_eq!(header(b"%PDF-1.8\n"), None);
        assert_eq!(header(b"%PDF-2.0\n"), None);
        assert_eq!(header(b"garbage%PDF-1.4\n"), None);
    }

    #[test]
    fn stream_keyword_gap() {
        assert_eq!(stream_data_gap(b"\r\nabc"), 2);
        assert_eq!(stream_data_gap(b"\nabc"), 1);
        assert_eq!(stream_data_gap(b"  \nabc"), 3);
        assert_eq!(stream_data_gap(b"abc"), 0);
    }

    #[test]
    fn stream_end_markers() {
        assert!(stream_terminated(b"\nendstream\nendobj"));
        assert!(stream_terminated(b"endstream endobj"));
        assert!(!stream_terminated(b"tail\nendstream\nendobj"));
        assert!(!stream_terminated(b"\nendstream\n"));
    }

    #[test]
    fn parse_indirect_object() {
        let buffer = b"junk 12 0 obj\n<< /Length 3 >>\nstream\r\nabc\nendstream\nendobj\n";
        let parsed = indirect_object(buffer, 5, 12).unwrap();
        assert_eq!(parsed.id, (12, 0));
        assert_eq!(parsed.stream_start, Some(38));
        assert_eq!(&buffer[38..41], b"abc");

        let parsed = indirect_object(b"4 1 obj 42 endobj", 0, 4).unwrap();
        assert_eq!(parsed.id, (4, 1));
        assert_eq!(parsed.value, Object::Integer(42));
        assert_eq!(parsed.stream_start, None);

        assert!(matches!(
            indirect_object(b"4 1 obj 42 endobj", 0, 5),
            Err(Error::ObjectIdMismatch { expected: 5, found: (4, 1) })
        ));
    }

    #[test]
    fn parse_object_stream_header() {
        assert_eq!(
            object_stream_header(b"11 0 12 27 13 40 <</A 1>>", 3),
            Some(vec![(11, 0), (12, 27), (13, 40)])
        );
        assert_eq!(object_stream_header(b"11 0 12", 2), None);
    }
}
