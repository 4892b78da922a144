//! XML-RPC document encoding and decoding.
//!
//! Encoding writes compact documents without indentation. Decoding builds a small element
//! tree first and interprets it afterwards, so whitespace between elements is tolerated while
//! whitespace inside string values is preserved.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDateTime;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{CodecError, Fault};
use crate::value::{DATETIME_FORMAT, Value};

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Decoded `methodResponse`.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Success(Value),
    Fault(Fault),
}

impl MethodResponse {
    /// Convert into a `Result`, turning a fault into the error side.
    ///
    /// # Errors
    /// Returns the [`Fault`] when the response carried one.
    pub fn into_result(self) -> Result<Value, Fault> {
        match self {
            MethodResponse::Success(value) => Ok(value),
            MethodResponse::Fault(fault) => Err(fault),
        }
    }
}

/// Encode a `methodCall` document.
///
/// Doubles are written as formatted; run [`check_encodable`] first to reject NaN and infinity.
#[must_use]
pub fn encode_call(method: &str, params: &[Value]) -> String {
    MethodCallXml { method, params }.to_string()
}

/// Verify that every value in `params` has an XML-RPC representation.
///
/// # Errors
/// Returns [`CodecError::NonFiniteDouble`] for a NaN or infinite double at any depth.
pub fn check_encodable(params: &[Value]) -> Result<(), CodecError> {
    params.iter().try_for_each(check_value)
}

fn check_value(value: &Value) -> Result<(), CodecError> {
    match value {
        Value::Double(v) if !v.is_finite() => Err(CodecError::NonFiniteDouble(*v)),
        Value::Array(items) => items.iter().try_for_each(check_value),
        Value::Struct(members) => members.values().try_for_each(check_value),
        _ => Ok(()),
    }
}

/// Encode a successful `methodResponse` carrying `value`.
#[must_use]
pub fn encode_response(value: &Value) -> String {
    format!(
        "{XML_DECL}<methodResponse><params><param>{}</param></params></methodResponse>",
        ValueXml(value)
    )
}

/// Encode a fault `methodResponse`.
#[must_use]
pub fn encode_fault(fault: &Fault) -> String {
    let body = Value::structure([
        ("faultCode", Value::Int(fault.code)),
        ("faultString", Value::String(fault.message.clone())),
    ]);
    format!(
        "{XML_DECL}<methodResponse><fault>{}</fault></methodResponse>",
        ValueXml(&body)
    )
}

/// Decode a `methodResponse` document.
///
/// # Errors
/// Returns [`CodecError`] when the document is not well-formed XML or does not follow the
/// XML-RPC response grammar.
pub fn decode_response(xml: &str) -> Result<MethodResponse, CodecError> {
    let root = parse_document(xml)?;
    if root.name != "methodResponse" {
        return Err(malformed(format!(
            "expected <methodResponse>, found <{}>",
            root.name
        )));
    }

    let body = root
        .single_element()?
        .ok_or_else(|| malformed("empty <methodResponse>"))?;

    match body.name.as_str() {
        "params" => match body.elements().find(|e| e.name == "param") {
            Some(param) => Ok(MethodResponse::Success(parse_value(param.child("value")?)?)),
            None => Ok(MethodResponse::Success(Value::Nil)),
        },
        "fault" => parse_fault(&parse_value(body.child("value")?)?).map(MethodResponse::Fault),
        other => Err(malformed(format!(
            "unexpected <{other}> in <methodResponse>"
        ))),
    }
}

struct MethodCallXml<'a> {
    method: &'a str,
    params: &'a [Value],
}

impl fmt::Display for MethodCallXml<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{XML_DECL}<methodCall><methodName>{}</methodName><params>",
            escape(self.method)
        )?;
        for param in self.params {
            write!(f, "<param>{}</param>", ValueXml(param))?;
        }
        f.write_str("</params></methodCall>")
    }
}

struct ValueXml<'a>(&'a Value);

impl fmt::Display for ValueXml<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<value>")?;
        match self.0 {
            Value::Int(v) if i32::try_from(*v).is_ok() => write!(f, "<int>{v}</int>")?,
            Value::Int(v) => write!(f, "<i8>{v}</i8>")?,
            Value::Bool(v) => write!(f, "<boolean>{}</boolean>", u8::from(*v))?,
            Value::Double(v) => write!(f, "<double>{v}</double>")?,
            Value::String(v) => write!(f, "<string>{}</string>", escape(v.as_str()))?,
            Value::DateTime(v) => write!(
                f,
                "<dateTime.iso8601>{}</dateTime.iso8601>",
                v.format(DATETIME_FORMAT)
            )?,
            Value::Base64(v) => write!(f, "<base64>{}</base64>", STANDARD.encode(v))?,
            Value::Array(items) => {
                f.write_str("<array><data>")?;
                for item in items {
                    write!(f, "{}", ValueXml(item))?;
                }
                f.write_str("</data></array>")?;
            }
            Value::Struct(members) => {
                f.write_str("<struct>")?;
                for (name, value) in members {
                    write!(
                        f,
                        "<member><name>{}</name>{}</member>",
                        escape(name.as_str()),
                        ValueXml(value)
                    )?;
                }
                f.write_str("</struct>")?;
            }
            Value::Nil => f.write_str("<nil/>")?,
        }
        f.write_str("</value>")
    }
}

#[derive(Debug)]
struct Element {
    name: String,
    children: Vec<Node>,
}

#[derive(Debug)]
enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Vec::new(),
        }
    }

    fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    fn child(&self, name: &str) -> Result<&Element, CodecError> {
        self.elements()
            .find(|e| e.name == name)
            .ok_or_else(|| malformed(format!("missing <{name}> in <{}>", self.name)))
    }

    /// The only child element, `None` when there is none.
    fn single_element(&self) -> Result<Option<&Element>, CodecError> {
        let mut elements = self.elements();
        let first = elements.next();
        if elements.next().is_some() {
            return Err(malformed(format!(
                "<{}> must contain a single element",
                self.name
            )));
        }
        Ok(first)
    }
}

fn malformed(reason: impl Into<String>) -> CodecError {
    CodecError::Malformed(reason.into())
}

fn element_name(start: &BytesStart<'_>) -> Result<String, CodecError> {
    std::str::from_utf8(start.local_name().as_ref())
        .map(str::to_owned)
        .map_err(|e| malformed(format!("element name is not UTF-8: {e}")))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), CodecError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(malformed("multiple root elements"));
    }
    *root = Some(element);
    Ok(())
}

fn parse_document(xml: &str) -> Result<Element, CodecError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(Element::new(element_name(&e)?)),
            Event::Empty(e) => attach(&mut stack, &mut root, Element::new(element_name(&e)?))?,
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed("unbalanced end tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(t) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .children
                        .push(Node::Text(t.unescape()?.into_owned()));
                }
            }
            Event::CData(c) => {
                if let Some(current) = stack.last_mut() {
                    let text = String::from_utf8(c.into_inner().into_owned())
                        .map_err(|e| malformed(format!("CDATA is not UTF-8: {e}")))?;
                    current.children.push(Node::Text(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(malformed("unexpected end of document"));
    }
    root.ok_or_else(|| malformed("empty document"))
}

fn parse_value(element: &Element) -> Result<Value, CodecError> {
    match element.single_element()? {
        // Untyped <value> content is a string
        None => Ok(Value::String(element.text())),
        Some(typed) => parse_typed(typed),
    }
}

fn invalid(kind: &'static str, text: &str) -> CodecError {
    CodecError::InvalidScalar {
        kind,
        text: text.to_owned(),
    }
}

fn parse_typed(element: &Element) -> Result<Value, CodecError> {
    let text = element.text();
    let trimmed = text.trim();

    match element.name.as_str() {
        "int" | "i4" | "i8" => trimmed
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| invalid("int", trimmed)),
        "boolean" => match trimmed {
            "1" | "true" => Ok(Value::Bool(true)),
            "0" | "false" => Ok(Value::Bool(false)),
            _ => Err(invalid("boolean", trimmed)),
        },
        "double" => trimmed
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| invalid("double", trimmed)),
        "string" => Ok(Value::String(text)),
        "dateTime.iso8601" => NaiveDateTime::parse_from_str(trimmed, DATETIME_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
            .map(Value::DateTime)
            .map_err(|_| invalid("dateTime.iso8601", trimmed)),
        "base64" => {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD
                .decode(compact.as_bytes())
                .map(Value::Base64)
                .map_err(|_| invalid("base64", trimmed))
        }
        "array" => element
            .child("data")?
            .elements()
            .filter(|e| e.name == "value")
            .map(parse_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        "struct" => element
            .elements()
            .filter(|e| e.name == "member")
            .map(|member| -> Result<(String, Value), CodecError> {
                let name = member.child("name")?.text();
                let value = parse_value(member.child("value")?)?;
                Ok((name, value))
            })
            .collect::<Result<_, _>>()
            .map(Value::Struct),
        "nil" => Ok(Value::Nil),
        other => Err(malformed(format!("unknown value type <{other}>"))),
    }
}

fn parse_fault(value: &Value) -> Result<Fault, CodecError> {
    let members = value
        .as_struct()
        .ok_or_else(|| malformed("fault value must be a struct"))?;

    // Some OpenERP versions send the exception text as a string faultCode
    let code = match members.get("faultCode") {
        Some(Value::Int(code)) => *code,
        Some(Value::String(code)) => code.trim().parse().unwrap_or_default(),
        _ => 0,
    };
    let message = match members.get("faultString") {
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_json().to_string(),
        None => String::new(),
    };

    Ok(Fault { code, message })
}
