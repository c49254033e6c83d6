//! `application/link-format` grammar (§4.4): resource descriptions of the
//! shape `<uri-reference>;param=value;flag, <uri-reference>;...`.
//!
//! Parameter values come in four shapes, dispatched by parameter name: a
//! double-quoted string (`d`, `sh`, `n`), a comma-separated integer list
//! (`ct`), a bare integer (`id`), or — for any name the registry doesn't
//! know — a quoted string or bare token, whichever the input looks like.

use crate::error::LinkDecodeError;

/// A link parameter's decoded value. A parameter with no `=value` at all
/// (a bare flag, e.g. `;obs`) stores `None` instead of one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    QuotedString(String),
    Integer(u64),
    IntegerList(Vec<u64>),
    /// An unrecognized parameter's value, as a bare token (unquoted).
    Token(String),
}

fn is_ptoken_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'()*+-./:<=>?@[]^_`{|}~".contains(c)
}

fn is_parmname_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$&+-.^_`|~".contains(c)
}

/// One resource description: a URI reference plus its link parameters, kept
/// in first-seen order with first-occurrence-wins semantics on a repeated
/// parameter name (matching the grammar this was distilled from).
#[derive(Debug, Clone, PartialEq)]
pub struct LinkValue {
    uri: String,
    params: Vec<(String, Option<ParamValue>)>,
}

impl LinkValue {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into(), params: Vec::new() }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Attach a parameter, ignoring the call if `name` is already present.
    pub fn with_param(mut self, name: impl Into<String>, value: Option<ParamValue>) -> Self {
        self.set_param_if_absent(name.into(), value);
        self
    }

    fn set_param_if_absent(&mut self, name: String, value: Option<ParamValue>) {
        if !self.params.iter().any(|(n, _)| *n == name) {
            self.params.push((name, value));
        }
    }

    pub fn param(&self, name: &str) -> Option<&Option<ParamValue>> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// The `d` (description) parameter, if present and quoted-string shaped.
    pub fn d(&self) -> Option<&str> {
        match self.param("d") {
            | Some(Some(ParamValue::QuotedString(s))) => Some(s),
            | _ => None,
        }
    }

    /// The `ct` (content-type set) parameter, if present.
    pub fn ct(&self) -> Option<&[u64]> {
        match self.param("ct") {
            | Some(Some(ParamValue::IntegerList(v))) => Some(v),
            | _ => None,
        }
    }

    /// The `id` parameter, if present.
    pub fn id(&self) -> Option<u64> {
        match self.param("id") {
            | Some(Some(ParamValue::Integer(v))) => Some(*v),
            | _ => None,
        }
    }

    /// Decode one `<uri>;param=value;...` entry from the start of `text`,
    /// returning it along with whatever follows (a `,` separator, more link
    /// values, or the empty string).
    pub fn decode(text: &str) -> Result<(LinkValue, &str), LinkDecodeError> {
        let text = text.trim_start();
        let rest = text.strip_prefix('<').ok_or(LinkDecodeError::ExpectedUri)?;
        let end = rest.find('>').ok_or(LinkDecodeError::ExpectedUri)?;
        let uri = &rest[..end];
        let mut rest = &rest[end + 1..];

        let mut link = LinkValue::new(uri);
        while let Some(after_semi) = rest.strip_prefix(';') {
            let name_len = after_semi.chars().take_while(|c| is_parmname_char(*c)).count();
            if name_len == 0 {
                return Err(LinkDecodeError::ExpectedParamName);
            }
            let name = after_semi[..name_len].to_ascii_lowercase();
            let after_name = &after_semi[name_len..];

            if let Some(after_eq) = after_name.strip_prefix('=') {
                let (value, tail) = decode_param_value(&name, after_eq)?
                    .ok_or_else(|| LinkDecodeError::ExpectedParamValue { param: name.clone() })?;
                link.set_param_if_absent(name, Some(value));
                rest = tail;
            } else {
                link.set_param_if_absent(name, None);
                rest = after_name;
            }
        }

        Ok((link, rest))
    }

    /// Render this link value back to its wire text, parameters sorted by
    /// name for a stable, canonical encoding.
    pub fn encode(&self) -> String {
        let mut out = format!("<{}>", self.uri);
        let mut sorted: Vec<&(String, Option<ParamValue>)> = self.params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, value) in sorted {
            out.push(';');
            out.push_str(name);
            if let Some(v) = value {
                out.push('=');
                out.push_str(&encode_param_value(v));
            }
        }
        out
    }
}

fn decode_param_value<'a>(name: &str, text: &'a str) -> Result<Option<(ParamValue, &'a str)>, LinkDecodeError> {
    Ok(match name {
        | "d" | "sh" | "n" => decode_dquoted(text)?.map(|(s, r)| (ParamValue::QuotedString(s), r)),
        | "ct" => decode_comma_separated_integers(text).map(|(v, r)| (ParamValue::IntegerList(v), r)),
        | "id" => decode_integer(text).map(|(v, r)| (ParamValue::Integer(v), r)),
        | _ => {
            if text.starts_with('"') {
                decode_dquoted(text)?.map(|(s, r)| (ParamValue::QuotedString(s), r))
            } else {
                decode_ptoken(text).map(|(s, r)| (ParamValue::Token(s), r))
            }
        },
    })
}

fn encode_param_value(value: &ParamValue) -> String {
    match value {
        | ParamValue::QuotedString(s) => format!("\"{s}\""),
        | ParamValue::Integer(v) => v.to_string(),
        | ParamValue::IntegerList(vs) => vs.iter().map(u64::to_string).collect::<Vec<_>>().join(","),
        | ParamValue::Token(s) => {
            if s.chars().all(is_ptoken_char) && !s.is_empty() {
                s.clone()
            } else {
                format!("\"{s}\"")
            }
        },
    }
}

/// `Ok(None)` when `text` isn't quoted at all; `Err(UnterminatedValue)` when
/// it opens with `"` but never closes.
fn decode_dquoted(text: &str) -> Result<Option<(String, &str)>, LinkDecodeError> {
    let Some(inner) = text.strip_prefix('"') else { return Ok(None) };
    match inner.find('"') {
        | Some(end) => Ok(Some((inner[..end].to_string(), &inner[end + 1..]))),
        | None => Err(LinkDecodeError::UnterminatedValue),
    }
}

fn decode_ptoken(text: &str) -> Option<(String, &str)> {
    let len = text.chars().take_while(|c| is_ptoken_char(*c)).count();
    if len == 0 {
        return None;
    }
    Some((text[..len].to_string(), &text[len..]))
}

fn decode_integer(text: &str) -> Option<(u64, &str)> {
    let len = text.chars().take_while(|c| c.is_ascii_digit()).count();
    if len == 0 {
        return None;
    }
    text[..len].parse().ok().map(|v| (v, &text[len..]))
}

fn decode_comma_separated_integers(text: &str) -> Option<(Vec<u64>, &str)> {
    let mut values = Vec::new();
    let (first, mut rest) = decode_integer(text)?;
    values.push(first);
    while let Some(tail) = rest.strip_prefix(',') {
        let (next, after) = decode_integer(tail)?;
        values.push(next);
        rest = after;
    }
    Some((values, rest))
}

/// Decode a full `application/link-format` body into its list of resource
/// descriptions, stopping at the first entry that isn't followed by `,`.
pub fn decode_resource_descriptions(text: &str) -> Result<(Vec<LinkValue>, &str), LinkDecodeError> {
    let mut links = Vec::new();
    let mut rest = text;
    loop {
        let (link, tail) = LinkValue::decode(rest)?;
        links.push(link);
        rest = tail.trim_start();
        match rest.strip_prefix(',') {
            | Some(after) => rest = after,
            | None => break,
        }
    }
    Ok((links, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_bare_uri_with_no_params() {
        let (link, rest) = LinkValue::decode("</sensors/temp>").unwrap();
        assert_eq!(link.uri(), "/sensors/temp");
        assert!(rest.is_empty());
    }

    #[test]
    fn decodes_known_parameter_shapes() {
        let (link, rest) = LinkValue::decode(r#"</s>;d="a sensor";ct=0,41;id=7"#).unwrap();
        assert_eq!(link.d(), Some("a sensor"));
        assert_eq!(link.ct(), Some(&[0, 41][..]));
        assert_eq!(link.id(), Some(7));
        assert!(rest.is_empty());
    }

    #[test]
    fn flag_parameter_has_no_value() {
        let (link, _) = LinkValue::decode("</s>;obs").unwrap();
        assert_eq!(link.param("obs"), Some(&None));
    }

    #[test]
    fn first_occurrence_of_duplicate_parameter_wins() {
        let (link, _) = LinkValue::decode(r#"</s>;id=1;id=2"#).unwrap();
        assert_eq!(link.id(), Some(1));
    }

    #[test]
    fn decodes_multiple_resource_descriptions() {
        let (links, rest) = decode_resource_descriptions("</a>;ct=0, </b>;ct=41;id=2").unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].uri(), "/a");
        assert_eq!(links[1].uri(), "/b");
        assert!(rest.is_empty());
    }

    #[test]
    fn encode_sorts_params_and_quotes_strings() {
        let link = LinkValue::new("/s")
            .with_param("n", Some(ParamValue::QuotedString("name".into())))
            .with_param("ct", Some(ParamValue::IntegerList(vec![0, 41])));
        assert_eq!(link.encode(), r#"</s>;ct=0,41;n="name""#);
    }

    #[test]
    fn unknown_parameter_defaults_to_ptoken_or_quoted() {
        let (link, _) = LinkValue::decode("</s>;rt=light-lux").unwrap();
        assert_eq!(link.param("rt"), Some(&Some(ParamValue::Token("light-lux".into()))));

        let (link, _) = LinkValue::decode(r#"</s>;rt="a b""#).unwrap();
        assert_eq!(link.param("rt"), Some(&Some(ParamValue::QuotedString("a b".into()))));
    }

    #[test]
    fn link_format_round_trip_matches_the_wire_fixture() {
        let text = r#"</hello>;n="hello";ct=0,</secret>;n="secret";ct=0,</sources>;n="sources";ct=40"#;
        let (links, rest) = decode_resource_descriptions(text).unwrap();
        assert!(rest.is_empty());
        assert_eq!(links.len(), 3);
        let expected = [("/hello", "hello", 0u64), ("/secret", "secret", 0), ("/sources", "sources", 40)];
        for (link, (uri, name, ct)) in links.iter().zip(expected) {
            assert_eq!(link.uri(), uri);
            let n = match link.param("n") {
                | Some(Some(ParamValue::QuotedString(s))) => s.as_str(),
                | _ => panic!("expected a quoted `n` parameter"),
            };
            assert_eq!(n, name);
            assert_eq!(link.ct(), Some(&[ct][..]));
        }
    }

    #[test]
    fn rejects_missing_uri() {
        assert!(LinkValue::decode("not-a-uri").is_err());
    }

    #[test]
    fn unterminated_quoted_value_is_a_distinct_error() {
        let err = LinkValue::decode(r#"</s>;n="unterminated"#).unwrap_err();
        assert_eq!(err, LinkDecodeError::UnterminatedValue);
    }
}
