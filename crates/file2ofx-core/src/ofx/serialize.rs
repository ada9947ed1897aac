//! Version-aware rendering of an [`OutputDocument`].
//!
//! OFX 1.x is SGML: a colon-separated header block, leaf tags left open and
//! aggregates closed. OFX 2.x is XML with an `<?OFX ...?>` processing
//! instruction and every element closed. Both render the same
//! [`Element`] tree.

use std::io::{self, Write};

use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event},
};

use super::{element::Element, model::OutputDocument};

/// Indentation step, in spaces.
const INDENT: usize = 2;

/// Syntax family of an OFX revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    /// SGML, OFX 1.x.
    Legacy,
    /// XML, OFX 2.x.
    Modern,
}

impl Syntax {
    /// Writes `doc` in this syntax.
    ///
    /// # Errors
    ///
    /// Any error from `out`.
    pub fn render<W: Write>(self, doc: &OutputDocument, out: &mut W) -> io::Result<()> {
        let root = Element::from(doc);
        match self {
            Self::Legacy => write_legacy(doc, &root, out),
            Self::Modern => write_modern(doc, &root, out),
        }
    }
}

/// Writes `doc` in the syntax of its version.
///
/// # Errors
///
/// Any error from `out`.
pub fn write_document<W: Write>(doc: &OutputDocument, out: &mut W) -> io::Result<()> {
    doc.header.version.syntax().render(doc, out)
}

/// Renders `doc` into a string.
///
/// # Errors
///
/// Only if the XML writer fails, which it does not for in-memory output.
pub fn render_to_string(doc: &OutputDocument) -> io::Result<String> {
    let mut buf = Vec::new();
    write_document(doc, &mut buf)?;
    String::from_utf8(buf).map_err(io::Error::other)
}

// ==================== Legacy (SGML) ====================

fn write_legacy<W: Write>(doc: &OutputDocument, root: &Element, out: &mut W) -> io::Result<()> {
    let header = &doc.header;
    writeln!(out, "OFXHEADER:100")?;
    writeln!(out, "DATA:OFXSGML")?;
    writeln!(out, "VERSION:{}", header.version)?;
    writeln!(out, "SECURITY:{}", header.security)?;
    writeln!(out, "ENCODING:{}", header.encoding)?;
    writeln!(out, "CHARSET:{}", header.charset)?;
    writeln!(out, "COMPRESSION:NONE")?;
    writeln!(out, "OLDFILEUID:NONE")?;
    writeln!(out, "NEWFILEUID:NONE")?;
    writeln!(out)?;
    write_sgml(root, 0, out)
}

fn write_sgml<W: Write>(element: &Element, depth: usize, out: &mut W) -> io::Result<()> {
    let pad = " ".repeat(depth * INDENT);
    match element {
        Element::Leaf { name, value } => writeln!(out, "{pad}<{name}>{}", escape_sgml(value)),
        Element::Aggregate { name, children } => {
            writeln!(out, "{pad}<{name}>")?;
            for child in children {
                write_sgml(child, depth + 1, out)?;
            }
            writeln!(out, "{pad}</{name}>")
        }
    }
}

/// Escapes the characters SGML parsers of OFX 1.x choke on.
fn escape_sgml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\r' | '\n' => escaped.push(' '),
            _ => escaped.push(c),
        }
    }
    escaped
}

// ==================== Modern (XML) ====================

fn write_modern<W: Write>(doc: &OutputDocument, root: &Element, out: &mut W) -> io::Result<()> {
    let mut writer = Writer::new_with_indent(&mut *out, b' ', INDENT);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))
        .map_err(io::Error::other)?;
    let ofx_header = format!(
        r#"OFX OFXHEADER="200" VERSION="{}" SECURITY="{}" OLDFILEUID="NONE" NEWFILEUID="NONE""#,
        doc.header.version, doc.header.security
    );
    writer.write_event(Event::PI(BytesPI::new(ofx_header))).map_err(io::Error::other)?;
    write_xml(&mut writer, root)?;
    writer.into_inner().write_all(b"\n")
}

fn write_xml<W: Write>(writer: &mut Writer<W>, element: &Element) -> io::Result<()> {
    match element {
        Element::Leaf { name, value } => {
            writer.write_event(Event::Start(BytesStart::new(*name))).map_err(io::Error::other)?;
            writer.write_event(Event::Text(BytesText::new(value))).map_err(io::Error::other)?;
            writer.write_event(Event::End(BytesEnd::new(*name))).map_err(io::Error::other)
        }
        Element::Aggregate { name, children } => {
            writer.write_event(Event::Start(BytesStart::new(*name))).map_err(io::Error::other)?;
            for child in children {
                write_xml(writer, child)?;
            }
            writer.write_event(Event::End(BytesEnd::new(*name))).map_err(io::Error::other)
        }
    }
}
