/// GEDCOM lexing: byte decoding, line parsing, and record tree assembly.

use thiserror::Error;

use crate::schema::opaque::OpaqueFact;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("malformed document at line {line}: {reason}")]
    MalformedDocument { line: usize, reason: String },
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),
    #[error("duplicate identifier @{0}@")]
    DuplicateIdentifier(String),
}

impl ExtractError {
    fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            line,
            reason: reason.into(),
        }
    }
}

/// Deepest level a line may declare. GEDCOM allows two digits.
const MAX_LEVEL: usize = 99;

/// One physical line: `level [@xref@] TAG [value]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GedcomLine {
    pub number: usize,
    pub level: usize,
    pub xref: Option<String>,
    pub tag: String,
    pub value: Option<String>,
}

/// A line together with its nested sub-records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub line: usize,
    pub xref: Option<String>,
    pub tag: String,
    pub value: Option<String>,
    pub children: Vec<Node>,
}

impl Node {
    fn from_line(line: GedcomLine) -> Self {
        Self {
            line: line.number,
            xref: line.xref,
            tag: line.tag,
            value: line.value,
            children: Vec::new(),
        }
    }

    pub fn child(&self, tag: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Value of the first child with the given tag.
    pub fn child_value(&self, tag: &str) -> Option<&str> {
        self.child(tag).and_then(|c| c.value.as_deref())
    }

    /// The value read as a pointer (`@X1@` → `X1`).
    pub fn pointer(&self) -> Option<&str> {
        self.value.as_deref().and_then(strip_pointer)
    }

    /// Keep this node verbatim for pass-through.
    pub fn to_opaque(&self) -> OpaqueFact {
        OpaqueFact {
            tag: self.tag.clone(),
            value: self.value.clone(),
            children: self.children.iter().map(Node::to_opaque).collect(),
        }
    }
}

pub fn strip_pointer(value: &str) -> Option<&str> {
    let inner = value.trim().strip_prefix('@')?.strip_suffix('@')?;
    if inner.is_empty() || inner.contains('@') {
        None
    } else {
        Some(inner)
    }
}

/// Decode raw document bytes to text.
///
/// UTF-8 (with or without BOM) is read directly and UTF-16 is accepted when
/// it carries a BOM. Anything else is rejected.
pub fn decode(bytes: &[u8]) -> Result<String, ExtractError> {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return utf8(rest);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return utf16(rest, u16::from_be_bytes);
    }
    utf8(bytes)
}

fn utf8(bytes: &[u8]) -> Result<String, ExtractError> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(e) => Err(ExtractError::UnsupportedEncoding(format!(
            "not valid UTF-8 (first bad byte at offset {})",
            e.valid_up_to()
        ))),
    }
}

fn utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> Result<String, ExtractError> {
    if bytes.len() % 2 != 0 {
        return Err(ExtractError::UnsupportedEncoding(
            "UTF-16 document with odd byte length".to_string(),
        ));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units)
        .map_err(|_| ExtractError::UnsupportedEncoding("invalid UTF-16 sequence".to_string()))
}

/// Reject documents whose declared `CHAR` set we cannot honour. Only
/// UTF-8/UNICODE, or pure ASCII content under any label, is accepted.
pub fn check_declared_charset(charset: Option<&str>, text: &str) -> Result<(), ExtractError> {
    let Some(charset) = charset else {
        return Ok(());
    };
    let label = charset.trim().to_ascii_uppercase();
    let unicode = matches!(label.as_str(), "UTF-8" | "UTF8" | "UNICODE" | "UTF-16");
    if unicode || text.is_ascii() {
        Ok(())
    } else {
        Err(ExtractError::UnsupportedEncoding(format!(
            "declared character set {} with non-ASCII content",
            charset.trim()
        )))
    }
}

/// Parse one non-empty line. `number` is 1-based.
pub fn parse_line(raw: &str, number: usize) -> Result<GedcomLine, ExtractError> {
    let line = raw.trim_start().trim_end_matches(['\r', '\n']);

    let digits_end = line
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(line.len());
    if digits_end == 0 {
        return Err(ExtractError::malformed(number, "line does not start with a level number"));
    }
    let level: usize = line[..digits_end]
        .parse()
        .map_err(|_| ExtractError::malformed(number, "level number out of range"))?;
    if level > MAX_LEVEL {
        return Err(ExtractError::malformed(number, "level number out of range"));
    }

    let rest = line[digits_end..].trim_start_matches(' ');
    if rest.len() == line[digits_end..].len() {
        return Err(ExtractError::malformed(number, "expected space after level number"));
    }

    let (xref, rest) = if rest.starts_with('@') {
        let end = rest[1..]
            .find('@')
            .ok_or_else(|| ExtractError::malformed(number, "unterminated cross-reference"))?;
        let xref = &rest[1..end + 1];
        if xref.is_empty() {
            return Err(ExtractError::malformed(number, "empty cross-reference"));
        }
        (Some(xref.to_string()), rest[end + 2..].trim_start_matches(' '))
    } else {
        (None, rest)
    };

    let tag_end = rest.find(' ').unwrap_or(rest.len());
    let tag = &rest[..tag_end];
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ExtractError::malformed(number, format!("invalid tag '{}'", tag)));
    }

    // Exactly one delimiter separates tag and value; further spaces belong to
    // the value.
    let value = rest
        .get(tag_end + 1..)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    Ok(GedcomLine {
        number,
        level,
        xref,
        tag: tag.to_string(),
        value,
    })
}

/// Split on any GEDCOM line terminator: CR, LF, CR LF or LF CR.
fn physical_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        if byte != b'\r' && byte != b'\n' {
            i += 1;
            continue;
        }
        lines.push(&text[start..i]);
        let partner = if byte == b'\r' { b'\n' } else { b'\r' };
        i += if bytes.get(i + 1) == Some(&partner) { 2 } else { 1 };
        start = i;
    }
    if start < bytes.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// Split decoded text into level-0 record trees.
///
/// `CONC`/`CONT` lines are folded into their parent's value. The document
/// must open with `HEAD` and close with `TRLR`; a missing trailer means the
/// document was truncated.
pub fn parse_records(text: &str) -> Result<Vec<Node>, ExtractError> {
    let mut records: Vec<Node> = Vec::new();
    let mut stack: Vec<Node> = Vec::new();
    let mut last_line = 0;
    let mut saw_trailer = false;

    for (idx, raw) in physical_lines(text).into_iter().enumerate() {
        let number = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }
        if saw_trailer {
            return Err(ExtractError::malformed(number, "content after TRLR record"));
        }
        let line = parse_line(raw, number)?;
        last_line = number;

        if records.is_empty() && stack.is_empty() && (line.level != 0 || line.tag != "HEAD") {
            return Err(ExtractError::malformed(number, "document must begin with 0 HEAD"));
        }
        if line.level > stack.len() {
            return Err(ExtractError::malformed(
                number,
                format!(
                    "level jumps from {} to {}",
                    stack.len().saturating_sub(1),
                    line.level
                ),
            ));
        }

        while stack.len() > line.level {
            close_top(&mut stack, &mut records);
        }

        if line.tag == "CONC" || line.tag == "CONT" {
            let Some(parent) = stack.last_mut() else {
                return Err(ExtractError::malformed(number, "continuation without a parent line"));
            };
            let piece = line.value.unwrap_or_default();
            let value = parent.value.get_or_insert_with(String::new);
            if line.tag == "CONT" {
                value.push('\n');
            }
            value.push_str(&piece);
            continue;
        }

        if line.level == 0 && line.tag == "TRLR" {
            saw_trailer = true;
        }
        stack.push(Node::from_line(line));
    }

    while !stack.is_empty() {
        close_top(&mut stack, &mut records);
    }

    if records.is_empty() {
        return Err(ExtractError::malformed(0, "empty document"));
    }
    if !saw_trailer {
        return Err(ExtractError::malformed(
            last_line,
            "document ends without a TRLR record (truncated?)",
        ));
    }
    Ok(records)
}

fn close_top(stack: &mut Vec<Node>, records: &mut Vec<Node>) {
    if let Some(node) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => records.push(node),
        }
    }
}
