//! Parser for the OpenStep plist dialect used by `project.pbxproj`.
//!
//! Xcode's legacy format: a root dictionary of `key = value;` entries,
//! `( ... )` arrays, quoted or bare strings, and `/* */` / `//` comments
//! (including the `// !$*UTF8*$!` header). Comments are trivia; the writer
//! regenerates the annotations Xcode places after object identifiers.

use crate::error::{Error, Result};
use crate::value::{Dict, Value};

/// Nesting deeper than any real descriptor; guards the recursive descent
/// against stack exhaustion on hostile input.
const MAX_DEPTH: usize = 128;

pub(crate) fn parse_plist(src: &str) -> Result<Dict> {
    let mut cur = Cursor::new(src);
    cur.skip_trivia()?;
    cur.expect('{')?;
    let root = cur.parse_dict_body()?;
    cur.skip_trivia()?;
    match cur.peek() {
        None => Ok(root),
        Some(c) => Err(cur.err(format!("unexpected `{c}` after root dictionary"))),
    }
}

fn is_bare_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | '.' | ':' | '-' | '+' | '@')
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    depth: usize,
}

impl Cursor {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            line: 1,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn err(&self, message: impl Into<String>) -> Error {
        Error::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    fn expect(&mut self, want: char) -> Result<()> {
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(self.err(format!("expected `{want}`, found `{c}`"))),
            None => Err(self.err(format!("expected `{want}`, found end of input"))),
        }
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek2() == Some('/') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if self.peek2() == Some('*') => {
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => return Err(self.err("unterminated comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value> {
        if self.depth >= MAX_DEPTH {
            return Err(self.err("nesting too deep"));
        }
        match self.peek() {
            Some('{') => {
                self.bump();
                self.depth += 1;
                let dict = self.parse_dict_body()?;
                self.depth -= 1;
                Ok(Value::Dict(dict))
            }
            Some('(') => {
                self.bump();
                self.depth += 1;
                let items = self.parse_array_body()?;
                self.depth -= 1;
                Ok(Value::Array(items))
            }
            Some(_) => Ok(Value::Str(self.parse_string()?)),
            None => Err(self.err("expected a value, found end of input")),
        }
    }

    /// Consumes the body of a dictionary; the opening `{` is already gone.
    fn parse_dict_body(&mut self) -> Result<Dict> {
        let mut dict = Dict::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some('}') {
                self.bump();
                return Ok(dict);
            }
            let key = self.parse_string()?;
            self.skip_trivia()?;
            self.expect('=')?;
            self.skip_trivia()?;
            let value = self.parse_value()?;
            self.skip_trivia()?;
            self.expect(';')?;
            dict.insert(key, value);
        }
    }

    /// Consumes the body of an array; the opening `(` is already gone.
    /// Accepts the trailing comma Xcode always writes.
    fn parse_array_body(&mut self) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(')') {
                self.bump();
                return Ok(items);
            }
            items.push(self.parse_value()?);
            self.skip_trivia()?;
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(')') => {
                    self.bump();
                    return Ok(items);
                }
                Some(c) => return Err(self.err(format!("expected `,` or `)`, found `{c}`"))),
                None => return Err(self.err("unterminated array")),
            }
        }
    }

    fn parse_string(&mut self) -> Result<String> {
        match self.peek() {
            Some('"') => self.parse_quoted(),
            Some(c) if is_bare_char(c) => {
                let mut out = String::new();
                while let Some(c) = self.peek() {
                    if !is_bare_char(c) {
                        break;
                    }
                    out.push(c);
                    self.bump();
                }
                Ok(out)
            }
            Some(c) => Err(self.err(format!("expected a string, found `{c}`"))),
            None => Err(self.err("expected a string, found end of input")),
        }
    }

    fn parse_quoted(&mut self) -> Result<String> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(c @ ('"' | '\\')) => out.push(c),
                    // Unknown escapes pass through verbatim, as Xcode's
                    // own reader does.
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    }
                    None => return Err(self.err("unterminated string")),
                },
                Some(c) => out.push(c),
                None => return Err(self.err("unterminated string")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse_plist;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_header_comment_and_nested_values() {
        let src = "// !$*UTF8*$!\n{\n\tarchiveVersion = 1;\n\tobjects = {\n\t\tABC = {isa = PBXBuildFile; fileRef = DEF /* x.framework */; };\n\t};\n\tlist = (\n\t\ta,\n\t\t\"b c\",\n\t);\n}\n";
        let root = parse_plist(src).unwrap();
        assert_eq!(root.get_str("archiveVersion"), Some("1"));

        let objects = root.get_dict("objects").unwrap();
        let abc = objects.get_dict("ABC").unwrap();
        assert_eq!(abc.get_str("fileRef"), Some("DEF"));

        let list = root.get("list").unwrap().as_array().unwrap();
        assert_eq!(list, &[Value::from("a"), Value::from("b c")]);
    }

    #[test]
    fn bare_tokens_cover_paths_and_flags() {
        let src = "{ path = System/Library/Frameworks/AdSupport.framework; flag = -ObjC; }";
        let root = parse_plist(src).unwrap();
        assert_eq!(
            root.get_str("path"),
            Some("System/Library/Frameworks/AdSupport.framework")
        );
        assert_eq!(root.get_str("flag"), Some("-ObjC"));
    }

    #[test]
    fn quoted_escapes_are_decoded() {
        let root = parse_plist(r#"{ a = "x\ny"; b = "q\"uote"; }"#).unwrap();
        assert_eq!(root.get_str("a"), Some("x\ny"));
        assert_eq!(root.get_str("b"), Some("q\"uote"));
    }

    #[test]
    fn array_without_trailing_comma() {
        let root = parse_plist("{ xs = (a, b); }").unwrap();
        assert_eq!(root.get("xs").unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn unterminated_string_is_an_error_with_line() {
        let err = parse_plist("{\n\ta = \"oops;\n}").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("unterminated string"), "{msg}");
    }

    #[test]
    fn missing_semicolon_is_an_error() {
        let err = parse_plist("{ a = 1 }").unwrap_err();
        assert!(err.to_string().contains("expected `;`"));
    }

    #[test]
    fn deep_nesting_is_rejected_not_overflowed() {
        let mut src = String::from("{ a = ");
        for _ in 0..4096 {
            src.push('(');
        }
        let err = parse_plist(&src).unwrap_err();
        assert!(err.to_string().contains("nesting too deep"));
    }
}
