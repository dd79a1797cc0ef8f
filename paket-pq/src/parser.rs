use nom::{
    character::complete::{digit1, none_of},
    Finish,
    IResult,
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    sequence::{delimited, terminated, tuple},
    multi::many0,
    branch::alt,
    bytes::complete::{tag, take_while, escaped_transform},
};
use paket::{Sign, Value};
use anyhow::{anyhow, Result};
use base64::decode;

pub enum Keyword {
    Null,
    True,
    False,
}

const WHITESPACE: &str = " \t\r\n";
const B64_CHARS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn white(i: &str) -> IResult<&str, &str> {
    take_while(move |c| WHITESPACE.contains(c))(i)
}

fn keyword(i: &str) -> IResult<&str, Keyword> {
    alt((
            map(tag("null"), |_| Keyword::Null),
            map(tag("true"), |_| Keyword::True),
            map(tag("false"),|_| Keyword::False)
    ))(i)
}

fn float(i: &str) -> IResult<&str, &str> {
    recognize(tuple((opt(tag("-")), digit1, opt(tuple((tag("."), digit1))))))(i)
}

fn float64(i: &str) -> IResult<&str, f64> {
    map_res(tuple((tag("$$"), float)), |(_,n)| n.parse())(i)
}

fn float32(i: &str) -> IResult<&str, f32> {
    map_res(tuple((tag("$"), float)), |(_,n)| n.parse())(i)
}

fn intn(i: &str) -> IResult<&str, u64> {
    map_res(tuple((tag("-"), digit1)), |(_,n): (&str, &str)| n.parse())(i)
}

fn intp(i: &str) -> IResult<&str, u64> {
    map_res(digit1, |n: &str| n.parse())(i)
}

fn b64(i: &str) -> IResult<&str, &str> {
    recognize(tuple((take_while(move |c| B64_CHARS.contains(c)), opt(tag("=")), opt(tag("=")))))(i)
}

fn bytes(i: &str) -> IResult<&str, Vec<u8>> {
    map_res(delimited(tag("'"), b64, tag("'")), |b| decode(b))(i)
}

fn string(i: &str) -> IResult<&str, String> {
    delimited(
            tag("\""),
            map(opt(escaped_transform(
                none_of("\\\""),
                '\\',
                alt((
                        tag("\\"),
                        tag("\""),
                        value("\n", tag("n")),
                )))), |c| c.unwrap_or_else(|| "".into())),
            tag("\"")
    )(i)
}

fn element(i: &str) -> IResult<&str, Value> {
    terminated(delimited(white, pq_value, white), opt(tag(",")))(i)
}

fn array(i: &str) -> IResult<&str, Vec<Value>> {
    delimited(tag("["), many0(element), tuple((white, tag("]"))))(i)
}

fn pair(i: &str) -> IResult<&str, (Value, Value)> {
    map(
        tuple((delimited(white, pq_value, white), tag(":"), element)),
        |(k, _, v)| (k, v)
    )(i)
}

fn pq_map(i: &str) -> IResult<&str, Vec<(Value, Value)>> {
    delimited(tag("{"), many0(pair), tuple((white, tag("}"))))(i)
}

fn pq_value(i: &str) -> IResult<&str, Value> {
    alt((
        map(string, |s| Value::Raw(s.into_bytes())),
        map(bytes, Value::Raw),
        map(intn, |i| Value::Int(Sign::Neg, i)),
        map(intp, |i| Value::Int(Sign::Pos, i)),
        map(float64, Value::F64),
        map(float32, Value::F32),
        map(array, Value::Array),
        map(pq_map, Value::Map),
        map(keyword, |k| match k {
            Keyword::Null => Value::Nil,
            Keyword::True => Value::Bool(true),
            Keyword::False => Value::Bool(false)
    })))(i)
}

pub fn parse(i: &str) -> Result<Value> {
    Ok(all_consuming(delimited(white, pq_value, white))(i).finish().map_err(|e| anyhow!("{}", e))?.1)
}

#[cfg(test)]
mod tests {
    use super::parse;
    use paket::{Sign, Value};

    #[test]
    fn scalars() {
        assert_eq!(Value::Nil, parse("null").unwrap());
        assert_eq!(Value::Bool(true), parse(" true ").unwrap());
        assert_eq!(Value::Int(Sign::Pos, 42), parse("42").unwrap());
        assert_eq!(Value::Int(Sign::Neg, 42), parse("-42").unwrap());
        assert_eq!(Value::F32(0.5), parse("$0.5").unwrap());
        assert_eq!(Value::F64(0.25), parse("$$0.25").unwrap());
        assert_eq!(Value::from("katze"), parse("\"katze\"").unwrap());
        assert_eq!(Value::from("a \"b\"\n"), parse("\"a \\\"b\\\"\\n\"").unwrap());
        assert_eq!(Value::Raw(vec![0xff]), parse("'/w=='").unwrap());
    }

    #[test]
    fn containers() {
        assert_eq!(Value::Array(Vec::new()), parse("[]").unwrap());
        assert_eq!(
            Value::Array(vec![Value::from(1u8), Value::from(2u8)]),
            parse("[1, 2]").unwrap()
        );
        assert_eq!(
            Value::Map(vec![(Value::from("a"), Value::from(1u8))]),
            parse("{\"a\": 1}").unwrap()
        );
    }

    #[test]
    fn display_output_parses_back() {
        let value = Value::Map(vec![
            (Value::from("jid"), Value::from(20260823u64)),
            (Value::from("args"), Value::Array(vec![Value::from("state.apply"), Value::Nil])),
            (Value::from("sig"), Value::Raw(vec![0x00, 0xff])),
        ]);
        assert_eq!(value, parse(&format!("{}", value)).unwrap());
    }
}
