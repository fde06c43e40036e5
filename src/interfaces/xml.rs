//! Flat XML wire format used by the gateway.
//!
//! Every message is a single root element whose children are leaf elements
//! holding one value each. Nested elements are not part of the format and are
//! rejected on decode.

use crate::domain::params::{ParamValue, ParameterSet};
use crate::domain::ports::WireCodec;
use crate::error::{PayError, Result};

const ROOT: &str = "xml";
const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

#[derive(Debug, Default, Clone, Copy)]
pub struct XmlCodec;

impl WireCodec for XmlCodec {
    /// Keys are written in ascending order so output is stable. Integers are
    /// written bare, text is wrapped in CDATA.
    fn encode(&self, params: &ParameterSet) -> String {
        let mut out = String::with_capacity(64 + params.len() * 32);
        out.push('<');
        out.push_str(ROOT);
        out.push('>');
        for (key, value) in params.sorted() {
            out.push('<');
            out.push_str(key);
            out.push('>');
            match value {
                ParamValue::Int(number) => out.push_str(&number.to_string()),
                ParamValue::Text(text) => {
                    out.push_str(CDATA_OPEN);
                    // a literal "]]>" has to be split across two sections
                    out.push_str(&text.replace(CDATA_CLOSE, "]]]]><![CDATA[>"));
                    out.push_str(CDATA_CLOSE);
                }
            }
            out.push_str("</");
            out.push_str(key);
            out.push('>');
        }
        out.push_str("</");
        out.push_str(ROOT);
        out.push('>');
        out
    }

    fn decode(&self, text: &str) -> Result<ParameterSet> {
        Parser::new(text).document()
    }
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn error(&self, message: &str) -> PayError {
        PayError::CodecError(format!("{message} at offset {}", self.pos))
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Advances past the next occurrence of `terminator`, returning the text
    /// before it.
    fn take_until(&mut self, terminator: &str) -> Result<&'a str> {
        let rest = self.rest();
        let end = rest
            .find(terminator)
            .ok_or_else(|| self.error(&format!("expected `{terminator}`")))?;
        self.pos += end + terminator.len();
        Ok(&rest[..end])
    }

    /// Skips whitespace, comments and processing instructions.
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("<?") {
                self.take_until("?>")?;
            } else if self.rest().starts_with("<!--") {
                self.take_until("-->")?;
            } else {
                return Ok(());
            }
        }
    }

    /// Reads `<name attrs...>` or `<name/>`. Returns the name and whether the
    /// tag closed itself.
    fn open_tag(&mut self) -> Result<(&'a str, bool)> {
        if !self.rest().starts_with('<') {
            return Err(self.error("expected an element"));
        }
        self.pos += 1;
        let inner = self.take_until(">")?;
        let (inner, self_closing) = match inner.strip_suffix('/') {
            Some(stripped) => (stripped, true),
            None => (inner, false),
        };
        let name = inner.split_whitespace().next().unwrap_or_default();
        if name.is_empty() {
            return Err(self.error("empty element name"));
        }
        Ok((name, self_closing))
    }

    fn close_tag(&mut self, name: &str) -> Result<()> {
        self.pos += 2;
        let closing = self.take_until(">")?.trim_end();
        if closing != name {
            return Err(self.error(&format!("expected `</{name}>`, found `</{closing}>`")));
        }
        Ok(())
    }

    fn document(mut self) -> Result<ParameterSet> {
        self.skip_misc()?;
        let (root, self_closing) = self.open_tag()?;
        let mut params = ParameterSet::new();
        if !self_closing {
            loop {
                self.skip_misc()?;
                if self.rest().starts_with("</") {
                    self.close_tag(root)?;
                    break;
                }
                if self.rest().is_empty() {
                    return Err(self.error(&format!("unterminated `<{root}>`")));
                }
                let (name, self_closing) = self.open_tag()?;
                let value = if self_closing {
                    String::new()
                } else {
                    self.leaf_value(name)?
                };
                if params.insert(name, value).is_some() {
                    return Err(self.error(&format!("duplicate element `<{name}>`")));
                }
            }
        }
        self.skip_misc()?;
        if !self.rest().is_empty() {
            return Err(self.error("trailing content after root element"));
        }
        Ok(params)
    }

    fn leaf_value(&mut self, name: &str) -> Result<String> {
        let mut value = String::new();
        loop {
            let rest = self.rest();
            if rest.starts_with(CDATA_OPEN) {
                self.pos += CDATA_OPEN.len();
                value.push_str(self.take_until(CDATA_CLOSE)?);
            } else if rest.starts_with("</") {
                self.close_tag(name)?;
                return Ok(value);
            } else if rest.starts_with("<!--") {
                self.take_until("-->")?;
            } else if rest.starts_with('<') {
                return Err(self.error(&format!("nested element inside `<{name}>`")));
            } else if rest.is_empty() {
                return Err(self.error(&format!("unterminated `<{name}>`")));
            } else {
                let end = rest.find('<').unwrap_or(rest.len());
                let segment = &rest[..end];
                self.pos += end;
                value.push_str(&self.unescape(segment)?);
            }
        }
    }

    fn unescape(&self, segment: &str) -> Result<String> {
        let mut out = String::with_capacity(segment.len());
        let mut rest = segment;
        while let Some(start) = rest.find('&') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let end = after
                .find(';')
                .ok_or_else(|| self.error("unterminated entity"))?;
            let entity = &after[..end];
            let decoded = match entity {
                "lt" => '<',
                "gt" => '>',
                "amp" => '&',
                "quot" => '"',
                "apos" => '\'',
                _ => numeric_entity(entity)
                    .ok_or_else(|| self.error(&format!("unknown entity `&{entity};`")))?,
            };
            out.push(decoded);
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

fn numeric_entity(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}
