//! DOCX report writer.
//!
//! A `.docx` file is a zip of XML parts. Without a template we write the
//! smallest package Word opens cleanly: content types, package and document
//! relationships, `word/document.xml` and a `word/styles.xml` declaring
//! "Heading 1", the default "Normal Table" and "Light List".
//!
//! With a template every part is copied through unchanged except
//! `word/document.xml`, where the report body is inserted just before the
//! body-level `w:sectPr` (or `</w:body>` when there is none), so existing
//! template content, headers, footers and page setup survive.
//!
//! The package is built in a temp file next to `output` and renamed over it
//! once complete, so the template may be the output path itself.
//!
//! Report body:
//!
//! ```text
//! Medical Summary                                  (Heading 1)
//! Claimant: …  SSN: …  Title: …  DLI: …
//! AOD: …  DOB: …  Age at AOD: …  Current Age: …
//! Education: …  Special Ed: … (detail)  Notes: …
//! ┌──────┬──────────┬────────┬─────┐
//! │ DATE │ PROVIDER │ REASON │ REF │              (one row per event)
//! └──────┴──────────┴────────┴─────┘
//! ```

use crate::error::SummaryError;
use crate::report::format::{format_age, format_date, special_education};
use crate::report::styles::{StyleSheet, TableStyle};
use crate::summary::MedicalSummary;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const BLANK_STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style><w:style w:type="table" w:default="1" w:styleId="TableNormal"><w:name w:val="Normal Table"/><w:uiPriority w:val="99"/><w:semiHidden/><w:tblPr><w:tblInd w:w="0" w:type="dxa"/><w:tblCellMar><w:top w:w="0" w:type="dxa"/><w:left w:w="108" w:type="dxa"/><w:bottom w:w="0" w:type="dxa"/><w:right w:w="108" w:type="dxa"/></w:tblCellMar></w:tblPr></w:style><w:style w:type="table" w:styleId="LightList"><w:name w:val="Light List"/><w:basedOn w:val="TableNormal"/><w:uiPriority w:val="61"/><w:tblPr><w:tblBorders><w:top w:val="single" w:sz="8" w:space="0" w:color="000000"/><w:left w:val="single" w:sz="8" w:space="0" w:color="000000"/><w:bottom w:val="single" w:sz="8" w:space="0" w:color="000000"/><w:right w:val="single" w:sz="8" w:space="0" w:color="000000"/></w:tblBorders></w:tblPr><w:tblStylePr w:type="firstRow"><w:rPr><w:b/><w:color w:val="FFFFFF"/></w:rPr><w:tcPr><w:shd w:val="clear" w:color="auto" w:fill="000000"/></w:tcPr></w:tblStylePr></w:style></w:styles>"#;

const TABLE_HEADER: [&str; 4] = ["DATE", "PROVIDER", "REASON", "REF"];

/// Write the DOCX report to `output`, optionally on top of `template`.
pub fn write_docx(
    summary: &MedicalSummary,
    output: &Path,
    template: Option<&Path>,
    table_style: &str,
) -> Result<(), SummaryError> {
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| SummaryError::render(output, e))?;
    match template {
        Some(template) => {
            write_from_template(summary, tmp.as_file_mut(), output, template, table_style)?
        }
        None => write_blank(summary, tmp.as_file_mut(), output, table_style)?,
    }
    tmp.persist(output)
        .map_err(|e| SummaryError::render(output, e.error))?;
    Ok(())
}

fn write_blank(
    summary: &MedicalSummary,
    out: &mut File,
    output: &Path,
    table_style: &str,
) -> Result<(), SummaryError> {
    let sheet = StyleSheet::parse(BLANK_STYLES);
    let body = render_body(summary, &sheet, table_style);
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{W_NS}"><w:body>{body}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr></w:body></w:document>"#
    );

    let mut zip = ZipWriter::new(out);
    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", PACKAGE_RELS),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS),
        (STYLES_PART, BLANK_STYLES),
        (DOCUMENT_PART, document.as_str()),
    ];
    for (name, content) in parts {
        zip.start_file(name, options())
            .map_err(|e| zip_error(output, e))?;
        zip.write_all(content.as_bytes())
            .map_err(|e| SummaryError::render(output, e))?;
    }
    zip.finish().map_err(|e| zip_error(output, e))?;
    debug!("Wrote blank DOCX package to {}", output.display());
    Ok(())
}

fn write_from_template(
    summary: &MedicalSummary,
    out: &mut File,
    output: &Path,
    template: &Path,
    table_style: &str,
) -> Result<(), SummaryError> {
    let file = File::open(template).map_err(|e| SummaryError::render(template, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| zip_error(template, e))?;

    let sheet = match read_part(&mut archive, STYLES_PART, template)? {
        Some(xml) => StyleSheet::parse(&xml),
        None => StyleSheet::default(),
    };
    let Some(document) = read_part(&mut archive, DOCUMENT_PART, template)? else {
        return Err(invalid_data(template, "template has no word/document.xml"));
    };
    let body = render_body(summary, &sheet, table_style);
    let merged =
        insert_into_body(&document, &body).map_err(|msg| invalid_data(template, &msg))?;

    let mut zip = ZipWriter::new(out);
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| zip_error(template, e))?;
        let name = entry.name().to_string();
        if entry.is_dir() {
            zip.add_directory(name, options())
                .map_err(|e| zip_error(output, e))?;
            continue;
        }
        zip.start_file(name.as_str(), options())
            .map_err(|e| zip_error(output, e))?;
        if name == DOCUMENT_PART {
            zip.write_all(merged.as_bytes())
                .map_err(|e| SummaryError::render(output, e))?;
        } else {
            io::copy(&mut entry, &mut zip).map_err(|e| SummaryError::render(output, e))?;
        }
    }
    zip.finish().map_err(|e| zip_error(output, e))?;
    info!(
        "Wrote DOCX from template {} ({} parts)",
        template.display(),
        archive.len()
    );
    Ok(())
}

fn read_part(
    archive: &mut ZipArchive<File>,
    name: &str,
    path: &Path,
) -> Result<Option<String>, SummaryError> {
    let Ok(mut part) = archive.by_name(name) else {
        return Ok(None);
    };
    let mut content = String::new();
    part.read_to_string(&mut content)
        .map_err(|e| SummaryError::render(path, e))?;
    Ok(Some(content))
}

/// Byte offset where report content goes: the body-level `w:sectPr` when it
/// is the last child of `w:body`, else the `</w:body>` tag.
fn body_insert_offset(xml: &str) -> Result<usize, String> {
    let mut reader = Reader::from_str(xml);
    // Depth below <w:body>; None until the body opens.
    let mut depth: Option<usize> = None;
    let mut sect_pr_at: Option<usize> = None;

    loop {
        let pos = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(e)) => match depth {
                None if e.name().as_ref() == b"w:body" => depth = Some(0),
                Some(0) => {
                    sect_pr_at = (e.name().as_ref() == b"w:sectPr").then_some(pos);
                    depth = Some(1);
                }
                Some(d) => depth = Some(d + 1),
                None => {}
            },
            Ok(Event::Empty(e)) if depth == Some(0) => {
                sect_pr_at = (e.name().as_ref() == b"w:sectPr").then_some(pos);
            }
            Ok(Event::End(_)) => match depth {
                Some(0) => return Ok(sect_pr_at.unwrap_or(pos)),
                Some(d) => depth = Some(d - 1),
                None => {}
            },
            Ok(Event::Eof) => return Err("document.xml has no w:body element".into()),
            Err(e) => return Err(format!("document.xml is not well-formed: {e}")),
            _ => {}
        }
    }
}

fn insert_into_body(document: &str, body: &str) -> Result<String, String> {
    let at = body_insert_offset(document)?;
    let mut merged = String::with_capacity(document.len() + body.len());
    merged.push_str(&document[..at]);
    merged.push_str(body);
    merged.push_str(&document[at..]);
    Ok(merged)
}

/// The report content as a run of body-level WordprocessingML elements.
fn render_body(summary: &MedicalSummary, sheet: &StyleSheet, table_style: &str) -> String {
    let profile = &summary.profile;
    let special = special_education(profile, &summary.custom_tables);
    let text = |v: &Option<String>| v.clone().unwrap_or_default();

    let mut xml = String::new();
    xml.push_str(&heading("Medical Summary", sheet.find("paragraph", "heading 1")));
    xml.push_str(&labeled_paragraph(&[
        ("Claimant", text(&profile.claimant_name)),
        ("SSN", text(&profile.ssn)),
        ("Title", text(&profile.claim_title)),
        ("DLI", format_date(profile.date_last_insured.as_ref())),
    ]));
    xml.push_str(&labeled_paragraph(&[
        ("AOD", format_date(profile.alleged_onset_date.as_ref())),
        ("DOB", format_date(profile.date_of_birth.as_ref())),
        ("Age at AOD", format_age(profile.age_at_aod)),
        ("Current Age", format_age(profile.current_age)),
    ]));
    xml.push_str(&labeled_paragraph(&[
        ("Education", text(&profile.education)),
        ("Special Ed", special.header_text(profile.notes.as_deref())),
        ("Notes", text(&profile.notes)),
    ]));

    let style = sheet.table_style(table_style);
    let mut rows: Vec<[String; 4]> = vec![TABLE_HEADER.map(String::from)];
    for event in &summary.events {
        rows.push([
            format_date(event.date.as_ref()),
            text(&event.provider),
            text(&event.reason),
            text(&event.reference),
        ]);
    }
    xml.push_str(&table(&rows, &style));
    xml
}

fn heading(title: &str, style_id: Option<&str>) -> String {
    match style_id {
        Some(id) => format!(
            r#"<w:p><w:pPr><w:pStyle w:val="{}"/></w:pPr>{}</w:p>"#,
            escape(id),
            run(title, false)
        ),
        None => format!("<w:p>{}</w:p>", run(title, true)),
    }
}

fn labeled_paragraph(pairs: &[(&str, String)]) -> String {
    let mut xml = String::from("<w:p>");
    for (i, (label, value)) in pairs.iter().enumerate() {
        if i > 0 {
            xml.push_str("<w:r><w:tab/></w:r>");
        }
        xml.push_str(&run(&format!("{label}: "), true));
        xml.push_str(&run(value, false));
    }
    xml.push_str("</w:p>");
    xml
}

fn run(text: &str, bold: bool) -> String {
    let props = if bold { "<w:rPr><w:b/></w:rPr>" } else { "" };
    format!(
        r#"<w:r>{props}<w:t xml:space="preserve">{}</w:t></w:r>"#,
        escape(text)
    )
}

fn table(rows: &[[String; 4]], style: &TableStyle) -> String {
    let mut xml = String::from("<w:tbl><w:tblPr>");
    if let Some(id) = style.style_id() {
        xml.push_str(&format!(r#"<w:tblStyle w:val="{}"/>"#, escape(id)));
    }
    xml.push_str(r#"<w:tblW w:w="0" w:type="auto"/><w:tblLook w:val="04A0" w:firstRow="1" w:lastRow="0" w:firstColumn="1" w:lastColumn="0" w:noHBand="0" w:noVBand="1"/></w:tblPr><w:tblGrid>"#);
    for _ in 0..TABLE_HEADER.len() {
        xml.push_str(r#"<w:gridCol w:w="2337"/>"#);
    }
    xml.push_str("</w:tblGrid>");
    for row in rows {
        xml.push_str("<w:tr>");
        for cell in row {
            xml.push_str(r#"<w:tc><w:tcPr><w:tcW w:w="0" w:type="auto"/></w:tcPr>"#);
            if cell.is_empty() {
                xml.push_str("<w:p/>");
            } else {
                xml.push_str(&format!("<w:p>{}</w:p>", run(cell, false)));
            }
            xml.push_str("</w:tc>");
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    xml
}

fn options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn zip_error(path: &Path, e: zip::result::ZipError) -> SummaryError {
    SummaryError::render(path, io::Error::other(e))
}

fn invalid_data(path: &Path, msg: &str) -> SummaryError {
    SummaryError::render(path, io::Error::new(io::ErrorKind::InvalidData, msg.to_string()))
}
