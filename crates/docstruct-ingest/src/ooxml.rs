//! Text extraction from Office Open XML containers (.docx, .xlsx)

use crate::error::ReadError;
use crate::xml;
use quick_xml::events::Event;
use std::io::{Read, Seek};
use tracing::debug;
use zip::ZipArchive;

const DOCX_BODY: &str = "word/document.xml";
const XLSX_WORKBOOK: &str = "xl/workbook.xml";
const XLSX_WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
const XLSX_SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const XLSX_FIRST_SHEET: &str = "xl/worksheets/sheet1.xml";

/// Paragraph texts of a Word document, joined with single spaces
pub(crate) fn docx_text<R: Read + Seek>(reader: R) -> Result<String, ReadError> {
    let mut archive = ZipArchive::new(reader)?;
    let body = read_part(&mut archive, DOCX_BODY)?
        .ok_or_else(|| ReadError::Malformed(format!("missing {}", DOCX_BODY)))?;

    let paragraphs = paragraphs(&body)?;

    debug!("Read {} paragraphs from docx", paragraphs.len());
    Ok(paragraphs.join(" "))
}

/// Non-empty `w:p` texts in document order.
///
/// A paragraph nested in another (text boxes) splits its parent: the parent's
/// text before and after it become separate entries.
fn paragraphs(part: &str) -> Result<Vec<String>, ReadError> {
    let mut reader = xml::reader(part);
    let mut found = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => flush(&mut current, &mut found),
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:p" => flush(&mut current, &mut found),
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Text(t) if in_text => current.push_str(&xml::text(&t)?),
            Event::CData(c) if in_text => current.push_str(&String::from_utf8_lossy(&c)),
            Event::Eof => break,
            _ => {}
        }
    }
    flush(&mut current, &mut found);

    Ok(found)
}

fn flush(current: &mut String, found: &mut Vec<String>) {
    if !current.is_empty() {
        found.push(std::mem::take(current));
    }
}

/// Rows of the first worksheet: cell values joined with spaces, rows with newlines.
///
/// Empty cells and rows without any value are skipped.
pub(crate) fn xlsx_text<R: Read + Seek>(reader: R) -> Result<String, ReadError> {
    let mut archive = ZipArchive::new(reader)?;

    let shared = match read_part(&mut archive, XLSX_SHARED_STRINGS)? {
        Some(sst) => shared_strings(&sst)?,
        None => Vec::new(),
    };

    let sheet_path = first_sheet_path(&mut archive)?;
    let sheet = read_part(&mut archive, &sheet_path)?
        .ok_or_else(|| ReadError::Malformed(format!("missing {}", sheet_path)))?;

    let lines = sheet_rows(&sheet, &shared)?;

    debug!("Read {} rows from {}", lines.len(), sheet_path);
    Ok(lines.join("\n"))
}

/// One `<si>` entry per string, keeping indices stable; phonetic runs are skipped
fn shared_strings(part: &str) -> Result<Vec<String>, ReadError> {
    let mut reader = xml::reader(part);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"t" => in_text = !in_phonetic,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                b"si" => strings.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Empty(e) if e.name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text => current.push_str(&xml::text(&t)?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(strings)
}

/// A cell being read: its `t` attribute and the raw text of `<v>` or inline `<t>`
struct Cell {
    kind: Option<String>,
    raw: String,
}

impl Cell {
    fn value(self, shared: &[String]) -> Option<String> {
        let value = match self.kind.as_deref() {
            Some("s") => {
                let idx: usize = self.raw.trim().parse().ok()?;
                shared.get(idx)?.clone()
            }
            Some("b") => match self.raw.trim() {
                "1" => "True".to_string(),
                _ => "False".to_string(),
            },
            _ => self.raw,
        };
        (!value.is_empty()).then_some(value)
    }
}

fn sheet_rows(part: &str, shared: &[String]) -> Result<Vec<String>, ReadError> {
    let mut reader = xml::reader(part);
    let mut lines = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell: Option<Cell> = None;
    let mut in_value = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"c" => {
                    cell = Some(Cell {
                        kind: xml::attr(&e, "t")?,
                        raw: String::new(),
                    })
                }
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some(value) = cell.take().and_then(|c| c.value(shared)) {
                        row.push(value);
                    }
                }
                b"row" => {
                    if !row.is_empty() {
                        lines.push(row.join(" "));
                        row.clear();
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_value => {
                if let Some(cell) = cell.as_mut() {
                    cell.raw.push_str(&xml::text(&t)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(lines)
}

/// Resolve the first `<sheet>` of the workbook through its relationship id
fn first_sheet_path<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String, ReadError> {
    let Some(workbook) = read_part(archive, XLSX_WORKBOOK)? else {
        return Ok(XLSX_FIRST_SHEET.to_string());
    };
    let sheet = xml::find_element(&workbook, "sheet", |_| Ok(true))?;
    let Some(rel_id) = sheet.as_ref().map(|s| xml::attr(s, "r:id")).transpose()?.flatten() else {
        return Ok(XLSX_FIRST_SHEET.to_string());
    };
    let Some(rels) = read_part(archive, XLSX_WORKBOOK_RELS)? else {
        return Ok(XLSX_FIRST_SHEET.to_string());
    };

    let relationship = xml::find_element(&rels, "Relationship", |r| {
        Ok(xml::attr(r, "Id")?.as_deref() == Some(rel_id.as_str()))
    })?;
    let target = relationship
        .as_ref()
        .map(|r| xml::attr(r, "Target"))
        .transpose()?
        .flatten();

    Ok(match target {
        Some(t) if t.starts_with('/') => t.trim_start_matches('/').to_string(),
        Some(t) => format!("xl/{}", t),
        None => XLSX_FIRST_SHEET.to_string(),
    })
}

/// Read a part as UTF-8; `None` if the container has no such part
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, ReadError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| ReadError::Malformed(format!("failed to read {}: {}", name, e)))?;
    Ok(Some(content))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Build an in-memory ZIP container from (name, content) parts
    pub fn container(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    pub fn docx(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:pPr/><w:r><w:t>{}</w:t></w:r></w:p>", p))
            .collect();
        let xml = format!(
            r#"<?xml version="1.0"?><w:document><w:body>{}</w:body></w:document>"#,
            body
        );
        container(&[("word/document.xml", &xml)])
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{container, docx};
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_docx_paragraphs_joined_with_spaces() {
        let bytes = docx(&["First paragraph.", "Second &amp; last."]);
        let text = docx_text(Cursor::new(bytes)).unwrap();
        assert_eq!(text, "First paragraph. Second & last.");
    }

    #[test]
    fn test_docx_without_body_is_malformed() {
        let bytes = container(&[("other.xml", "<x/>")]);
        let result = docx_text(Cursor::new(bytes));
        assert!(matches!(result, Err(ReadError::Malformed(_))));
    }

    #[test]
    fn test_docx_text_box_paragraph_keeps_surrounding_text() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Before</w:t></w:r><w:r><w:pict><v:textbox><w:txbxContent>
                <w:p><w:r><w:t>Inner</w:t></w:r></w:p>
            </w:txbxContent></v:textbox></w:pict></w:r><w:r><w:t>After</w:t></w:r></w:p>
            <w:p><w:r><w:t>Next</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let bytes = container(&[("word/document.xml", xml)]);

        let text = docx_text(Cursor::new(bytes)).unwrap();
        assert_eq!(text, "Before Inner After Next");
    }

    #[test]
    fn test_docx_preserves_run_spacing_and_skips_empty_paragraphs() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Hello</w:t><w:tab/><w:t xml:space="preserve"> world</w:t></w:r></w:p>
            <w:p/><w:p><w:r><w:t/></w:r></w:p>
            <w:p><w:r><w:t>&#65;&#x42;</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let bytes = container(&[("word/document.xml", xml)]);

        assert_eq!(docx_text(Cursor::new(bytes)).unwrap(), "Hello world AB");
    }

    #[test]
    fn test_docx_with_broken_xml_is_malformed() {
        let bytes = container(&[("word/document.xml", "<w:p><w:t>open</w:p>")]);
        let result = docx_text(Cursor::new(bytes));
        assert!(matches!(result, Err(ReadError::Malformed(_))));
    }

    #[test]
    fn test_not_a_zip_is_malformed() {
        let result = docx_text(Cursor::new(b"plain text".to_vec()));
        assert!(matches!(result, Err(ReadError::Malformed(_))));
    }

    #[test]
    fn test_xlsx_rows_with_shared_and_inline_strings() {
        let sst = r#"<sst><si><t>Name</t></si><si><r><t>Ag</t></r><r><t>e</t></r></si><si><t>Ada</t></si></sst>"#;
        let sheet = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
            <row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2"><v>36</v></c><c r="C2" t="inlineStr"><is><t>note</t></is></c></row>
            <row r="3"><c r="A3"/></row>
            <row r="4"><c r="A4" t="b"><v>1</v></c></row>
        </sheetData></worksheet>"#;
        let bytes = container(&[
            ("xl/sharedStrings.xml", sst),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);

        let text = xlsx_text(Cursor::new(bytes)).unwrap();
        assert_eq!(text, "Name Age\nAda 36 note\nTrue");
    }

    #[test]
    fn test_xlsx_first_sheet_resolved_through_relationships() {
        let workbook = r#"<workbook><sheets><sheet name="Data" sheetId="7" r:id="rId3"/><sheet name="Other" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
        let rels = r#"<Relationships><Relationship Id="rId1" Target="worksheets/sheet1.xml"/><Relationship Id="rId3" Target="worksheets/data.xml"/></Relationships>"#;
        let bytes = container(&[
            ("xl/workbook.xml", workbook),
            ("xl/_rels/workbook.xml.rels", rels),
            ("xl/worksheets/sheet1.xml", "<worksheet><row><c><v>wrong</v></c></row></worksheet>"),
            ("xl/worksheets/data.xml", "<worksheet><row><c><v>right</v></c></row></worksheet>"),
        ]);

        assert_eq!(xlsx_text(Cursor::new(bytes)).unwrap(), "right");
    }
}
