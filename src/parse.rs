//! Server response grammar.
//!
//! Each call to [`parse_response`] gets one complete response: a line, plus any literals it
//! announced and the lines that follow them. The engine in `client.rs` is responsible for
//! reading that much; this module only turns the bytes into owned [`Response`] values.

use enumset::EnumSet;
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take, take_while, take_while1},
    character::complete::{char, digit1},
    combinator::{map, map_res, opt, peek, recognize, value},
    error::{make_error, ErrorKind as NomErrorKind},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::error::{Error, ParseError, Result};
use crate::types::*;

type PResult<'a, T> = IResult<&'a [u8], T>;

/// COPYUID and APPENDUID sets are expanded into lists; refuse absurd ranges.
const MAX_EXPANDED_UIDS: u64 = 1 << 20;

/// Parse one complete server response.
///
/// Untagged lines that do not fit the grammar are returned as [`Untagged::Other`] so the caller
/// can skip them. Anything else that does not parse is an error.
pub(crate) fn parse_response(input: &[u8]) -> Result<Response> {
    match response(input) {
        Ok((rest, response)) if rest.is_empty() => Ok(response),
        _ if input.starts_with(b"* ") => Ok(Response::Untagged(Untagged::Other(lossy(
            trim_eol(input),
        )))),
        _ => Err(Error::Parse(ParseError::Invalid(input.to_vec()))),
    }
}

fn trim_eol(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\r' | b'\n') {
        end -= 1;
    }
    &line[..end]
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn ascii(bytes: &[u8]) -> &str {
    std::str::from_utf8(bytes).unwrap_or_default()
}

fn is_atom_char(c: u8) -> bool {
    c > 0x20 && c != 0x7f && !matches!(c, b'(' | b')' | b'{' | b'%' | b'*' | b'"' | b'\\' | b']')
}

fn is_astring_char(c: u8) -> bool {
    is_atom_char(c) || c == b']'
}

fn is_tag_char(c: u8) -> bool {
    is_astring_char(c) && c != b'+'
}

fn is_value_char(c: u8) -> bool {
    c > 0x20 && c != 0x7f && !matches!(c, b'(' | b')' | b'"' | b'{')
}

fn sp(i: &[u8]) -> PResult<'_, ()> {
    value((), char(' '))(i)
}

fn eol(i: &[u8]) -> PResult<'_, ()> {
    value(
        (),
        pair(take_while(|c| c == b' '), alt((tag("\r\n"), tag("\n")))),
    )(i)
}

/// A space, or the end of the line without consuming it.
fn gap(i: &[u8]) -> PResult<'_, ()> {
    alt((sp, value((), peek(alt((tag("\r\n"), tag("\n")))))))(i)
}

fn number(i: &[u8]) -> PResult<'_, u32> {
    map_res(digit1, |d: &[u8]| ascii(d).parse::<u32>())(i)
}

fn number64(i: &[u8]) -> PResult<'_, u64> {
    map_res(digit1, |d: &[u8]| ascii(d).parse::<u64>())(i)
}

fn atom(i: &[u8]) -> PResult<'_, String> {
    map(take_while1(is_atom_char), lossy)(i)
}

fn quoted(i: &[u8]) -> PResult<'_, Vec<u8>> {
    let (mut i, _) = char('"')(i)?;
    let mut out = Vec::new();
    loop {
        match i.first() {
            Some(b'"') => return Ok((&i[1..], out)),
            Some(b'\\') if i.len() > 1 => {
                out.push(i[1]);
                i = &i[2..];
            }
            Some(b'\r') | Some(b'\n') | None => {
                return Err(nom::Err::Error(make_error(i, NomErrorKind::Char)))
            }
            Some(&c) => {
                out.push(c);
                i = &i[1..];
            }
        }
    }
}

fn literal(i: &[u8]) -> PResult<'_, Vec<u8>> {
    let (i, _) = opt(char('~'))(i)?;
    let (i, len) = delimited(char('{'), number, char('}'))(i)?;
    let (i, _) = tag("\r\n")(i)?;
    let (i, data) = take(len as usize)(i)?;
    Ok((i, data.to_vec()))
}

fn string(i: &[u8]) -> PResult<'_, Vec<u8>> {
    alt((quoted, literal))(i)
}

fn astring(i: &[u8]) -> PResult<'_, Vec<u8>> {
    alt((
        map(take_while1(is_astring_char), |s: &[u8]| s.to_vec()),
        string,
    ))(i)
}

/// A loosely typed s-expression, for data whose shape depends on its key.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Nil,
    Number(u64),
    Atom(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
}

impl Value {
    fn as_number(&self) -> Option<u64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn as_text(&self) -> Option<String> {
        match self {
            Value::Atom(s) => Some(s.clone()),
            Value::Bytes(b) => Some(lossy(b)),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// The first element of a parenthesized list, as text.
    fn first_text(&self) -> Option<String> {
        self.as_list()
            .and_then(|l| l.first())
            .and_then(Value::as_text)
    }
}

fn classify(atom: &[u8]) -> Value {
    if atom.eq_ignore_ascii_case(b"NIL") {
        return Value::Nil;
    }
    if atom.iter().all(u8::is_ascii_digit) {
        if let Ok(n) = ascii(atom).parse() {
            return Value::Number(n);
        }
    }
    Value::Atom(lossy(atom))
}

fn value_item(i: &[u8]) -> PResult<'_, Value> {
    alt((
        map(
            delimited(char('('), separated_list0(sp, value_item), char(')')),
            Value::List,
        ),
        map(string, Value::Bytes),
        map(take_while1(is_value_char), classify),
    ))(i)
}

fn flag(i: &[u8]) -> PResult<'_, Flag> {
    alt((
        map(tag("\\*"), |_| Flag::MayCreate),
        map(
            recognize(pair(opt(char('\\')), take_while1(is_atom_char))),
            |s: &[u8]| Flag::from(lossy(s)),
        ),
    ))(i)
}

fn flag_list(i: &[u8]) -> PResult<'_, Vec<Flag>> {
    delimited(char('('), separated_list0(sp, flag), char(')'))(i)
}

fn uid_range(i: &[u8]) -> PResult<'_, (u32, u32)> {
    let (i, lo) = number(i)?;
    let (i, hi) = opt(preceded(char(':'), number))(i)?;
    Ok((i, (lo, hi.unwrap_or(lo))))
}

/// A uid-set expanded in the order the server wrote it.
fn uid_list(i: &[u8]) -> PResult<'_, Vec<u32>> {
    let (rest, ranges) = separated_list1(char(','), uid_range)(i)?;
    let total: u64 = ranges
        .iter()
        .map(|&(a, b)| u64::from(a.max(b) - a.min(b)) + 1)
        .sum();
    if total > MAX_EXPANDED_UIDS {
        return Err(nom::Err::Error(make_error(i, NomErrorKind::TooLarge)));
    }
    let mut out = Vec::with_capacity(total as usize);
    for (a, b) in ranges {
        if a <= b {
            out.extend(a..=b);
        } else {
            out.extend(b..=a);
        }
    }
    Ok((rest, out))
}

fn uid_set(i: &[u8]) -> PResult<'_, UidSet> {
    let (i, ranges) = separated_list1(char(','), uid_range)(i)?;
    let mut set = UidSet::new();
    for (a, b) in ranges {
        set.insert_range(a..=b);
    }
    Ok((i, set))
}

fn appenduid(i: &[u8]) -> PResult<'_, ResponseCode> {
    let (i, _) = tag_no_case("APPENDUID ")(i)?;
    let (i, uid_validity) = number(i)?;
    let (i, _) = sp(i)?;
    let (i, uids) = uid_list(i)?;
    Ok((i, ResponseCode::AppendUid { uid_validity, uids }))
}

fn copyuid(i: &[u8]) -> PResult<'_, ResponseCode> {
    let (i, _) = tag_no_case("COPYUID ")(i)?;
    let (i, uid_validity) = number(i)?;
    let (i, _) = sp(i)?;
    let (i, source) = uid_list(i)?;
    let (i, _) = sp(i)?;
    let (i, destination) = uid_list(i)?;
    Ok((
        i,
        ResponseCode::CopyUid {
            uid_validity,
            source,
            destination,
        },
    ))
}

fn code_body(i: &[u8]) -> PResult<'_, ResponseCode> {
    alt((
        alt((
            value(ResponseCode::Alert, tag_no_case("ALERT")),
            value(ResponseCode::Parse, tag_no_case("PARSE")),
            value(ResponseCode::ReadOnly, tag_no_case("READ-ONLY")),
            value(ResponseCode::ReadWrite, tag_no_case("READ-WRITE")),
            value(ResponseCode::TryCreate, tag_no_case("TRYCREATE")),
            value(ResponseCode::UidNotSticky, tag_no_case("UIDNOTSTICKY")),
            value(ResponseCode::NoModSeq, tag_no_case("NOMODSEQ")),
            value(ResponseCode::Closed, tag_no_case("CLOSED")),
            value(ResponseCode::NonExistent, tag_no_case("NONEXISTENT")),
            value(ResponseCode::AlreadyExists, tag_no_case("ALREADYEXISTS")),
            value(ResponseCode::TooBig, tag_no_case("TOOBIG")),
            value(ResponseCode::OverQuota, tag_no_case("OVERQUOTA")),
            value(ResponseCode::Limit, tag_no_case("LIMIT")),
            value(ResponseCode::UseAttr, tag_no_case("USEATTR")),
        )),
        alt((
            map(preceded(tag_no_case("UIDNEXT "), number), ResponseCode::UidNext),
            map(
                preceded(tag_no_case("UIDVALIDITY "), number),
                ResponseCode::UidValidity,
            ),
            map(preceded(tag_no_case("UNSEEN "), number), ResponseCode::Unseen),
            map(
                preceded(tag_no_case("PERMANENTFLAGS "), flag_list),
                ResponseCode::PermanentFlags,
            ),
            map(
                preceded(tag_no_case("CAPABILITY "), separated_list1(sp, atom)),
                ResponseCode::Capabilities,
            ),
            map(
                preceded(tag_no_case("HIGHESTMODSEQ "), number64),
                ResponseCode::HighestModSeq,
            ),
            appenduid,
            copyuid,
            map(
                delimited(tag_no_case("MAILBOXID ("), atom, char(')')),
                ResponseCode::MailboxId,
            ),
            map(preceded(tag_no_case("MODIFIED "), uid_set), ResponseCode::Modified),
        )),
    ))(i)
}

fn code_from(inner: &[u8]) -> ResponseCode {
    match code_body(inner) {
        Ok((rest, code)) if rest.is_empty() => code,
        _ => {
            let raw = lossy(inner);
            let (name, text) = match raw.split_once(' ') {
                Some((name, text)) => (name, Some(text.to_string())),
                None => (raw.as_str(), None),
            };
            ResponseCode::Other {
                name: name.to_ascii_uppercase(),
                text,
            }
        }
    }
}

fn resp_code(i: &[u8]) -> PResult<'_, ResponseCode> {
    map(
        delimited(
            char('['),
            take_while(|c| !matches!(c, b']' | b'\r' | b'\n')),
            char(']'),
        ),
        code_from,
    )(i)
}

fn resp_text(i: &[u8]) -> PResult<'_, (Option<ResponseCode>, String)> {
    let (i, code) = opt(terminated(resp_code, opt(sp)))(i)?;
    let (i, rest) = take_while(|c| c != b'\r' && c != b'\n')(i)?;
    Ok((i, (code, lossy(rest))))
}

fn status(i: &[u8]) -> PResult<'_, Status> {
    alt((
        value(Status::Ok, tag_no_case("OK")),
        value(Status::No, tag_no_case("NO")),
        value(Status::Bad, tag_no_case("BAD")),
        value(Status::PreAuth, tag_no_case("PREAUTH")),
        value(Status::Bye, tag_no_case("BYE")),
    ))(i)
}

fn condition(i: &[u8]) -> PResult<'_, Untagged> {
    let (i, status) = status(i)?;
    let (i, _) = gap(i)?;
    let (i, (code, text)) = resp_text(i)?;
    Ok((
        i,
        Untagged::Condition {
            status,
            code,
            text,
            bare: false,
        },
    ))
}

/// `* [COPYUID ...]` with no status word. Some servers do this; treat it as OK.
fn bare_condition(i: &[u8]) -> PResult<'_, Untagged> {
    let (i, code) = resp_code(i)?;
    let (i, _) = opt(sp)(i)?;
    let (i, rest) = take_while(|c| c != b'\r' && c != b'\n')(i)?;
    Ok((
        i,
        Untagged::Condition {
            status: Status::Ok,
            code: Some(code),
            text: lossy(rest),
            bare: true,
        },
    ))
}

fn capability_data(i: &[u8]) -> PResult<'_, Untagged> {
    map(
        preceded(tag_no_case("CAPABILITY"), many0(preceded(sp, atom))),
        Untagged::Capabilities,
    )(i)
}

fn enabled_data(i: &[u8]) -> PResult<'_, Untagged> {
    map(
        preceded(tag_no_case("ENABLED"), many0(preceded(sp, atom))),
        Untagged::Enabled,
    )(i)
}

fn flags_data(i: &[u8]) -> PResult<'_, Untagged> {
    map(preceded(tag_no_case("FLAGS "), flag_list), Untagged::Flags)(i)
}

fn name_attribute(i: &[u8]) -> PResult<'_, String> {
    map(
        recognize(pair(opt(char('\\')), take_while1(is_atom_char))),
        lossy,
    )(i)
}

/// `OLDNAME` and `CHILDINFO` from LIST-EXTENDED data.
fn list_extended(data: Value) -> (Option<String>, Vec<String>) {
    let mut old_name = None;
    let mut child_info = Vec::new();
    if let Value::List(items) = data {
        for entry in items.chunks(2) {
            if let [key, Value::List(values)] = entry {
                match key.as_text().map(|k| k.to_ascii_uppercase()).as_deref() {
                    Some("OLDNAME") => old_name = values.first().and_then(Value::as_text),
                    Some("CHILDINFO") => {
                        child_info = values.iter().filter_map(Value::as_text).collect()
                    }
                    _ => {}
                }
            }
        }
    }
    (old_name, child_info)
}

fn list_data(i: &[u8]) -> PResult<'_, Untagged> {
    let (i, lsub) = alt((
        value(false, tag_no_case("LIST ")),
        value(true, tag_no_case("LSUB ")),
    ))(i)?;
    let (i, raw_attributes) =
        delimited(char('('), separated_list0(sp, name_attribute), char(')'))(i)?;
    let (i, _) = sp(i)?;
    let (i, delimiter) = alt((
        value(None, tag_no_case("NIL")),
        map(quoted, |q: Vec<u8>| q.first().map(|&c| char::from(c))),
    ))(i)?;
    let (i, _) = sp(i)?;
    let (i, name) = astring(i)?;
    let (i, extended) = opt(preceded(sp, value_item))(i)?;

    let mut attributes = EnumSet::empty();
    let mut other_attributes = Vec::new();
    for raw in raw_attributes {
        match FolderAttribute::from_wire(&raw) {
            Some(attribute) => attributes |= attribute,
            None => other_attributes.push(raw),
        }
    }
    let (old_name, child_info) = extended.map(list_extended).unwrap_or_default();

    Ok((
        i,
        Untagged::List(Name {
            attributes,
            other_attributes,
            delimiter,
            name: lossy(&name),
            old_name,
            child_info,
            lsub,
        }),
    ))
}

fn status_item_from(name: &[u8], data: Value) -> StatusItem {
    let name = ascii(name).to_ascii_uppercase();
    let n = data.as_number();
    let n32 = n.and_then(|n| u32::try_from(n).ok());
    let item = match name.as_str() {
        "MESSAGES" => n32.map(StatusItem::Messages),
        "RECENT" => n32.map(StatusItem::Recent),
        "UIDNEXT" => n32.map(StatusItem::UidNext),
        "UIDVALIDITY" => n32.map(StatusItem::UidValidity),
        "UNSEEN" => n32.map(StatusItem::Unseen),
        "DELETED" => n32.map(StatusItem::Deleted),
        "HIGHESTMODSEQ" => n.map(StatusItem::HighestModSeq),
        "SIZE" => n.map(StatusItem::Size),
        "APPENDLIMIT" => Some(StatusItem::AppendLimit(n)),
        "MAILBOXID" => data.first_text().map(StatusItem::MailboxId),
        _ => None,
    };
    item.unwrap_or_else(|| StatusItem::Other(name))
}

fn status_item(i: &[u8]) -> PResult<'_, StatusItem> {
    let (i, name) = take_while1(is_atom_char)(i)?;
    let (i, _) = sp(i)?;
    let (i, data) = value_item(i)?;
    Ok((i, status_item_from(name, data)))
}

fn status_data(i: &[u8]) -> PResult<'_, Untagged> {
    let (i, _) = tag_no_case("STATUS ")(i)?;
    let (i, mailbox) = astring(i)?;
    let (i, _) = sp(i)?;
    let (i, items) = delimited(
        char('('),
        separated_list0(sp, status_item),
        pair(take_while(|c| c == b' '), char(')')),
    )(i)?;
    Ok((
        i,
        Untagged::Status {
            mailbox: lossy(&mailbox),
            items,
        },
    ))
}

fn search_data(i: &[u8]) -> PResult<'_, Untagged> {
    let (i, _) = tag_no_case("SEARCH")(i)?;
    let (i, ids) = many0(preceded(sp, number))(i)?;
    let (i, mod_seq) = opt(preceded(
        sp,
        delimited(tag_no_case("(MODSEQ "), number64, char(')')),
    ))(i)?;
    Ok((i, Untagged::Search { ids, mod_seq }))
}

fn namespace_list(data: &Value) -> Vec<Namespace> {
    let entries = match data.as_list() {
        Some(entries) => entries,
        None => return Vec::new(),
    };
    entries
        .iter()
        .filter_map(|entry| {
            let parts = entry.as_list()?;
            let prefix = parts.first()?.as_text()?;
            let delimiter = parts
                .get(1)
                .and_then(Value::as_text)
                .and_then(|d| d.chars().next());
            Some(Namespace { prefix, delimiter })
        })
        .collect()
}

fn namespace_data(i: &[u8]) -> PResult<'_, Untagged> {
    let (i, _) = tag_no_case("NAMESPACE ")(i)?;
    let (i, (personal, _, other_users, _, shared)) =
        tuple((value_item, sp, value_item, sp, value_item))(i)?;
    Ok((
        i,
        Untagged::Namespace(Namespaces {
            personal: namespace_list(&personal),
            other_users: namespace_list(&other_users),
            shared: namespace_list(&shared),
        }),
    ))
}

fn vanished_data(i: &[u8]) -> PResult<'_, Untagged> {
    let (i, _) = tag_no_case("VANISHED ")(i)?;
    let (i, earlier) = opt(terminated(tag_no_case("(EARLIER)"), sp))(i)?;
    let (i, uids) = uid_set(i)?;
    Ok((
        i,
        Untagged::Vanished {
            earlier: earlier.is_some(),
            uids,
        },
    ))
}

fn fetch_attribute_from(key: &[u8], data: Value) -> FetchAttribute {
    let key = ascii(key).to_ascii_uppercase();
    let attribute = match key.as_str() {
        "UID" => data
            .as_number()
            .and_then(|n| u32::try_from(n).ok())
            .map(FetchAttribute::Uid),
        "FLAGS" => data.as_list().map(|flags| {
            FetchAttribute::Flags(
                flags
                    .iter()
                    .filter_map(Value::as_text)
                    .map(Flag::from)
                    .collect(),
            )
        }),
        "MODSEQ" => data
            .as_list()
            .and_then(|l| l.first())
            .and_then(Value::as_number)
            .map(FetchAttribute::ModSeq),
        "RFC822.SIZE" => data
            .as_number()
            .and_then(|n| u32::try_from(n).ok())
            .map(FetchAttribute::Size),
        "INTERNALDATE" => data.as_text().map(FetchAttribute::InternalDate),
        "EMAILID" => data.first_text().map(FetchAttribute::EmailId),
        "THREADID" => Some(FetchAttribute::ThreadId(data.first_text())),
        _ => None,
    };
    attribute.unwrap_or(FetchAttribute::Other(key))
}

fn fetch_attribute(i: &[u8]) -> PResult<'_, FetchAttribute> {
    let (i, key) = recognize(tuple((
        take_while1(|c: u8| c.is_ascii_alphanumeric() || c == b'.' || c == b'-'),
        opt(delimited(char('['), take_while(|c| c != b']'), char(']'))),
        opt(delimited(char('<'), digit1, char('>'))),
    )))(i)?;
    let (i, _) = sp(i)?;
    let (i, data) = value_item(i)?;
    Ok((i, fetch_attribute_from(key, data)))
}

fn fetch_attributes(i: &[u8]) -> PResult<'_, Vec<FetchAttribute>> {
    delimited(char('('), separated_list0(sp, fetch_attribute), char(')'))(i)
}

fn numbered_data(i: &[u8]) -> PResult<'_, Untagged> {
    let (i, n) = number(i)?;
    let (i, _) = sp(i)?;
    alt((
        value(Untagged::Exists(n), tag_no_case("EXISTS")),
        value(Untagged::Recent(n), tag_no_case("RECENT")),
        value(Untagged::Expunge(n), tag_no_case("EXPUNGE")),
        map(
            preceded(tag_no_case("FETCH "), fetch_attributes),
            move |attributes| Untagged::Fetch { seq: n, attributes },
        ),
    ))(i)
}

fn untagged(i: &[u8]) -> PResult<'_, Untagged> {
    preceded(
        tag("* "),
        alt((
            condition,
            bare_condition,
            capability_data,
            enabled_data,
            flags_data,
            list_data,
            status_data,
            search_data,
            namespace_data,
            vanished_data,
            numbered_data,
        )),
    )(i)
}

fn continuation(i: &[u8]) -> PResult<'_, Response> {
    let (i, _) = char('+')(i)?;
    let (i, _) = opt(sp)(i)?;
    let (i, (code, text)) = resp_text(i)?;
    let (i, _) = eol(i)?;
    Ok((i, Response::Continue { code, text }))
}

fn tagged(i: &[u8]) -> PResult<'_, Response> {
    let (i, label) = take_while1(is_tag_char)(i)?;
    let (i, _) = sp(i)?;
    let (i, status) = alt((
        value(Status::Ok, tag_no_case("OK")),
        value(Status::No, tag_no_case("NO")),
        value(Status::Bad, tag_no_case("BAD")),
    ))(i)?;
    let (i, _) = gap(i)?;
    let (i, (code, text)) = resp_text(i)?;
    let (i, _) = eol(i)?;
    Ok((
        i,
        Response::Tagged {
            tag: lossy(label),
            status,
            code,
            text,
        },
    ))
}

fn response(i: &[u8]) -> PResult<'_, Response> {
    alt((
        continuation,
        map(terminated(untagged, eol), Response::Untagged),
        tagged,
    ))(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn untagged_of(line: &[u8]) -> Untagged {
        match parse_response(line).unwrap() {
            Response::Untagged(u) => u,
            other => panic!("expected untagged, got {:?}", other),
        }
    }

    #[test]
    fn parse_capability_test() {
        let u = untagged_of(b"* CAPABILITY IMAP4rev1 STARTTLS AUTH=GSSAPI LOGINDISABLED\r\n");
        assert_eq!(
            u,
            Untagged::Capabilities(vec![
                "IMAP4rev1".into(),
                "STARTTLS".into(),
                "AUTH=GSSAPI".into(),
                "LOGINDISABLED".into()
            ])
        );
    }

    #[test]
    fn parse_tagged() {
        let r = parse_response(b"A00000001 OK [READ-WRITE] SELECT completed\r\n").unwrap();
        assert_eq!(
            r,
            Response::Tagged {
                tag: "A00000001".into(),
                status: Status::Ok,
                code: Some(ResponseCode::ReadWrite),
                text: "SELECT completed".into(),
            }
        );
        let r = parse_response(b"A2 NO\r\n").unwrap();
        assert!(matches!(r, Response::Tagged { status: Status::No, .. }));
    }

    #[test]
    fn tagged_with_bogus_status_is_an_error() {
        assert!(matches!(
            parse_response(b"A00000003 MAYBE whatever\r\n"),
            Err(Error::Parse(ParseError::Invalid(_)))
        ));
    }

    #[test]
    fn unknown_untagged_is_kept() {
        assert_eq!(
            untagged_of(b"* XYZZY frob\r\n"),
            Untagged::Other("* XYZZY frob".into())
        );
    }

    #[test]
    fn parse_continuation() {
        assert_eq!(
            parse_response(b"+ Ready for literal data\r\n").unwrap(),
            Response::Continue {
                code: None,
                text: "Ready for literal data".into()
            }
        );
        assert_eq!(
            parse_response(b"+\r\n").unwrap(),
            Response::Continue {
                code: None,
                text: String::new()
            }
        );
    }

    #[test]
    fn parse_names_test() {
        let u = untagged_of(b"* LIST (\\HasNoChildren \\Sent \\XFoo) \".\" \"INBOX.Sent\"\r\n");
        let name = match u {
            Untagged::List(name) => name,
            other => panic!("{:?}", other),
        };
        assert_eq!(
            name.attributes(),
            FolderAttribute::HasNoChildren | FolderAttribute::Sent
        );
        assert_eq!(name.other_attributes(), &["\\XFoo".to_string()]);
        assert_eq!(name.delimiter(), Some('.'));
        assert_eq!(name.name(), "INBOX.Sent");
        assert!(!name.is_lsub());
    }

    #[test]
    fn parse_names_nil_delimiter_and_literal() {
        let u = untagged_of(b"* LSUB () NIL {4}\r\nflat\r\n");
        match u {
            Untagged::List(name) => {
                assert_eq!(name.delimiter(), None);
                assert_eq!(name.name(), "flat");
                assert!(name.is_lsub());
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn parse_names_extended() {
        let u = untagged_of(
            b"* LIST (\\Subscribed) \"/\" \"Foo\" (\"CHILDINFO\" (\"SUBSCRIBED\") \"OLDNAME\" (\"Bar\"))\r\n",
        );
        match u {
            Untagged::List(name) => {
                assert_eq!(name.old_name(), Some("Bar"));
                assert_eq!(name.child_info(), &["SUBSCRIBED".to_string()]);
                assert!(name.attributes().contains(FolderAttribute::Subscribed));
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn parse_status() {
        let u = untagged_of(
            b"* STATUS \"Sent\" (MESSAGES 12 UIDNEXT 44 HIGHESTMODSEQ 7011231777 APPENDLIMIT NIL MAILBOXID (F2212ea87) SIZE 9000 X-THING 1)\r\n",
        );
        assert_eq!(
            u,
            Untagged::Status {
                mailbox: "Sent".into(),
                items: vec![
                    StatusItem::Messages(12),
                    StatusItem::UidNext(44),
                    StatusItem::HighestModSeq(7011231777),
                    StatusItem::AppendLimit(None),
                    StatusItem::MailboxId("F2212ea87".into()),
                    StatusItem::Size(9000),
                    StatusItem::Other("X-THING".into()),
                ]
            }
        );
    }

    #[test]
    fn parse_fetches_test() {
        let u = untagged_of(b"* 24 FETCH (FLAGS (\\Seen $Label) UID 4827943 MODSEQ (65402))\r\n");
        assert_eq!(
            u,
            Untagged::Fetch {
                seq: 24,
                attributes: vec![
                    FetchAttribute::Flags(vec![Flag::Seen, Flag::Keyword("$Label".into())]),
                    FetchAttribute::Uid(4827943),
                    FetchAttribute::ModSeq(65402),
                ]
            }
        );
    }

    #[test]
    fn parse_fetch_with_body_literal() {
        let u = untagged_of(
            b"* 2 FETCH (UID 9 BODY[HEADER.FIELDS (SUBJECT)] {13}\r\nSubject: x\r\n\r\n RFC822.SIZE 120)\r\n",
        );
        match u {
            Untagged::Fetch { seq, attributes } => {
                assert_eq!(seq, 2);
                assert_eq!(attributes[0], FetchAttribute::Uid(9));
                assert_eq!(
                    attributes[1],
                    FetchAttribute::Other("BODY[HEADER.FIELDS (SUBJECT)]".into())
                );
                assert_eq!(attributes[2], FetchAttribute::Size(120));
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn parse_numbered() {
        assert_eq!(untagged_of(b"* 23 EXISTS\r\n"), Untagged::Exists(23));
        assert_eq!(untagged_of(b"* 1 RECENT\r\n"), Untagged::Recent(1));
        assert_eq!(untagged_of(b"* 3 EXPUNGE\r\n"), Untagged::Expunge(3));
    }

    #[test]
    fn parse_vanished() {
        assert_eq!(
            untagged_of(b"* VANISHED (EARLIER) 300:310,405,411\r\n"),
            Untagged::Vanished {
                earlier: true,
                uids: "300:310,405,411".parse().unwrap()
            }
        );
        assert_eq!(
            untagged_of(b"* VANISHED 5\r\n"),
            Untagged::Vanished {
                earlier: false,
                uids: UidSet::from(5)
            }
        );
    }

    #[test]
    fn parse_search() {
        assert_eq!(
            untagged_of(b"* SEARCH 2 84 882\r\n"),
            Untagged::Search {
                ids: vec![2, 84, 882],
                mod_seq: None
            }
        );
        assert_eq!(
            untagged_of(b"* SEARCH\r\n"),
            Untagged::Search {
                ids: vec![],
                mod_seq: None
            }
        );
        assert_eq!(
            untagged_of(b"* SEARCH 2 5 (MODSEQ 917162500)\r\n"),
            Untagged::Search {
                ids: vec![2, 5],
                mod_seq: Some(917162500)
            }
        );
    }

    #[test]
    fn parse_namespace() {
        let u = untagged_of(b"* NAMESPACE ((\"\" \"/\")) ((\"~\" \"/\")) NIL\r\n");
        assert_eq!(
            u,
            Untagged::Namespace(Namespaces {
                personal: vec![Namespace {
                    prefix: "".into(),
                    delimiter: Some('/')
                }],
                other_users: vec![Namespace {
                    prefix: "~".into(),
                    delimiter: Some('/')
                }],
                shared: vec![],
            })
        );
    }

    #[test]
    fn parse_codes() {
        let u = untagged_of(b"* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited\r\n");
        assert_eq!(
            u,
            Untagged::Condition {
                status: Status::Ok,
                code: Some(ResponseCode::PermanentFlags(vec![
                    Flag::Deleted,
                    Flag::Seen,
                    Flag::MayCreate
                ])),
                text: "Limited".into(),
                bare: false,
            }
        );
        let r = parse_response(b"A3 OK [APPENDUID 38505 3955:3957] APPEND completed\r\n").unwrap();
        match r {
            Response::Tagged { code, .. } => assert_eq!(
                code,
                Some(ResponseCode::AppendUid {
                    uid_validity: 38505,
                    uids: vec![3955, 3956, 3957]
                })
            ),
            other => panic!("{:?}", other),
        }
        assert!(matches!(
            untagged_of(b"* NO [BADCHARSET (UTF-8)] nope\r\n"),
            Untagged::Condition {
                status: Status::No,
                code: Some(ResponseCode::Other { .. }),
                ..
            }
        ));
    }

    #[test]
    fn copyuid_keeps_server_order() {
        let r = parse_response(b"A4 OK [COPYUID 38505 304,319:320 3956:3958] Done\r\n").unwrap();
        match r {
            Response::Tagged { code, .. } => assert_eq!(
                code,
                Some(ResponseCode::CopyUid {
                    uid_validity: 38505,
                    source: vec![304, 319, 320],
                    destination: vec![3956, 3957, 3958]
                })
            ),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn bare_code_without_status() {
        assert_eq!(
            untagged_of(b"* [COPYUID 1 4 9]\r\n"),
            Untagged::Condition {
                status: Status::Ok,
                code: Some(ResponseCode::CopyUid {
                    uid_validity: 1,
                    source: vec![4],
                    destination: vec![9]
                }),
                text: String::new(),
                bare: true,
            }
        );
    }

    #[test]
    fn parse_bye_and_enabled() {
        assert!(matches!(
            untagged_of(b"* BYE Autologout; idle for too long\r\n"),
            Untagged::Condition {
                status: Status::Bye,
                ..
            }
        ));
        assert_eq!(
            untagged_of(b"* ENABLED QRESYNC\r\n"),
            Untagged::Enabled(vec!["QRESYNC".into()])
        );
    }
}
