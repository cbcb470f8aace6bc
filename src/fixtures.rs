//! Workbook builders for tests.
//!
//! Writes minimal but well-formed `.xlsx` and `.ods` containers with `zip::ZipWriter`, so tests
//! exercise the real readers end to end.

use crate::spreadsheet::reference::index_to_reference;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

const ODS_MIME_TYPE: &str = "application/vnd.oasis.opendocument.spreadsheet";

/// A cell value to write
#[derive(Clone, Debug)]
pub(crate) enum Value {
    Empty,
    Error,
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDateTime),
}

impl Value {
    pub(crate) fn text(text: &str) -> Value {
        Value::Text(text.to_owned())
    }

    pub(crate) fn number(number: f64) -> Value {
        Value::Number(number)
    }

    pub(crate) fn boolean(flag: bool) -> Value {
        Value::Boolean(flag)
    }

    /// Parses `YYYY-MM-DD hh:mm:ss[.f]`
    pub(crate) fn date(text: &str) -> Value {
        Value::Date(NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f").unwrap())
    }
}

/// In-memory workbook description
#[derive(Clone, Debug)]
pub(crate) struct Workbook {
    sheets: Vec<(String, Vec<Vec<Value>>)>,
    date1904: bool,
    mime_type: String,
}

impl Workbook {
    pub(crate) fn new() -> Workbook {
        Workbook {
            sheets: Vec::new(),
            date1904: false,
            mime_type: ODS_MIME_TYPE.to_owned(),
        }
    }

    pub(crate) fn sheet(mut self, name: &str, rows: Vec<Vec<Value>>) -> Workbook {
        self.sheets.push((name.to_owned(), rows));
        self
    }

    pub(crate) fn date1904(mut self) -> Workbook {
        self.date1904 = true;
        self
    }

    pub(crate) fn mime_type(mut self, mime_type: &str) -> Workbook {
        self.mime_type = mime_type.to_owned();
        self
    }

    /// Writes an Office Open XML workbook; text cells go through the shared string table.
    pub(crate) fn write_xlsx(&self, directory: &Path, name: &str) -> PathBuf {
        let path = directory.join(name);
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        let options = SimpleFileOptions::default();

        let mut shared_strings = Vec::<String>::new();
        let mut shared_indexes = HashMap::<String, usize>::new();
        let mut sheet_parts = Vec::<String>::new();
        for (_, rows) in &self.sheets {
            let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#);
            for (row, values) in rows.iter().enumerate() {
                xml.push_str(&format!(r#"<row r="{}">"#, row + 1));
                for (col, value) in values.iter().enumerate() {
                    let reference = index_to_reference(row, col);
                    match value {
                        Value::Empty => (),
                        Value::Error => xml.push_str(&format!(r#"<c r="{reference}" t="e"><v>#N/A</v></c>"#)),
                        Value::Text(text) => {
                            let next = shared_indexes.len();
                            let index = *shared_indexes.entry(text.to_owned()).or_insert_with(|| {
                                shared_strings.push(text.to_owned());
                                next
                            });
                            xml.push_str(&format!(r#"<c r="{reference}" t="s"><v>{index}</v></c>"#));
                        }
                        Value::Number(number) => xml.push_str(&format!(r#"<c r="{reference}"><v>{number}</v></c>"#)),
                        Value::Boolean(flag) => {
                            xml.push_str(&format!(r#"<c r="{reference}" t="b"><v>{}</v></c>"#, u8::from(*flag)));
                        }
                        Value::Date(datetime) => {
                            let serial = to_serial(datetime, self.date1904);
                            xml.push_str(&format!(r#"<c r="{reference}" s="1"><v>{serial}</v></c>"#));
                        }
                    }
                }
                xml.push_str("</row>");
            }
            xml.push_str("</sheetData></worksheet>");
            sheet_parts.push(xml);
        }

        let mut workbook = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);
        if self.date1904 {
            workbook.push_str(r#"<workbookPr date1904="1"/>"#);
        }
        workbook.push_str("<sheets>");
        let mut relationships = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
        for (index, (sheet_name, _)) in self.sheets.iter().enumerate() {
            let id = index + 1;
            workbook.push_str(&format!(r#"<sheet name="{}" sheetId="{id}" r:id="rId{id}"/>"#, escape(sheet_name)));
            relationships.push_str(&format!(
                r#"<Relationship Id="rId{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{id}.xml"/>"#
            ));
        }
        workbook.push_str("</sheets></workbook>");
        relationships.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#,
            self.sheets.len() + 1
        ));

        let styles = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy\-mm\-dd\ hh:mm:ss"/></numFmts><cellXfs count="2"><xf numFmtId="0" fontId="0"/><xf numFmtId="164" fontId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#;

        let mut strings = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#,
            shared_strings.len()
        );
        for text in &shared_strings {
            strings.push_str(&format!(r#"<si><t xml:space="preserve">{}</t></si>"#, escape(text)));
        }
        strings.push_str("</sst>");

        write_part(&mut zip, options, "[Content_Types].xml", r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#);
        write_part(&mut zip, options, "xl/workbook.xml", &workbook);
        write_part(&mut zip, options, "xl/_rels/workbook.xml.rels", &relationships);
        write_part(&mut zip, options, "xl/styles.xml", styles);
        write_part(&mut zip, options, "xl/sharedStrings.xml", &strings);
        for (index, part) in sheet_parts.iter().enumerate() {
            write_part(&mut zip, options, &format!("xl/worksheets/sheet{}.xml", index + 1), part);
        }
        zip.finish().unwrap();
        path
    }

    /// Writes an OpenDocument spreadsheet, padded with repeated empty rows like office suites do.
    pub(crate) fn write_ods(&self, directory: &Path, name: &str) -> PathBuf {
        let path = directory.join(name);
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let options = SimpleFileOptions::default();

        let mut content = String::from(concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" "#,
            r#"xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" "#,
            r#"xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" "#,
            r#"xmlns:calcext="urn:org:documentfoundation:names:experimental:calc:xmlns:calcext:1.0" "#,
            r#"office:version="1.3"><office:body><office:spreadsheet>"#,
        ));
        for (sheet_name, rows) in &self.sheets {
            content.push_str(&format!(r#"<table:table table:name="{}">"#, escape(sheet_name)));
            for values in rows {
                content.push_str("<table:table-row>");
                for value in values {
                    let cell = match value {
                        Value::Empty => "<table:table-cell/>".to_owned(),
                        Value::Error => concat!(
                            r#"<table:table-cell table:formula="of:=1/0" office:value-type="string" "#,
                            r#"calcext:value-type="error"><text:p>#DIV/0!</text:p></table:table-cell>"#,
                        ).to_owned(),
                        Value::Text(text) => format!(
                            r#"<table:table-cell office:value-type="string"><text:p>{}</text:p></table:table-cell>"#,
                            escape(text)
                        ),
                        Value::Number(number) => format!(
                            r#"<table:table-cell office:value-type="float" office:value="{number}"><text:p>{number}</text:p></table:table-cell>"#
                        ),
                        Value::Boolean(flag) => format!(
                            r#"<table:table-cell office:value-type="boolean" office:boolean-value="{flag}"><text:p>{}</text:p></table:table-cell>"#,
                            if *flag { "TRUE" } else { "FALSE" }
                        ),
                        Value::Date(datetime) => format!(
                            r#"<table:table-cell office:value-type="date" office:date-value="{}"><text:p>{}</text:p></table:table-cell>"#,
                            datetime.format("%Y-%m-%dT%H:%M:%S%.f"),
                            datetime.format("%d.%m.%Y")
                        ),
                    };
                    content.push_str(&cell);
                }
                content.push_str("</table:table-row>");
            }
            content.push_str(concat!(
                r#"<table:table-row table:number-rows-repeated="1048000">"#,
                r#"<table:table-cell table:number-columns-repeated="1024"/></table:table-row>"#,
            ));
            content.push_str("</table:table>");
        }
        content.push_str("</office:spreadsheet></office:body></office:document-content>");

        let manifest = concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" manifest:version="1.3">"#,
            r#"<manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.oasis.opendocument.spreadsheet"/>"#,
            r#"<manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>"#,
            r#"</manifest:manifest>"#,
        );

        write_part(&mut zip, stored, "mimetype", &self.mime_type);
        write_part(&mut zip, options, "META-INF/manifest.xml", manifest);
        write_part(&mut zip, options, "content.xml", &content);
        zip.finish().unwrap();
        path
    }
}

fn write_part(zip: &mut ZipWriter<File>, options: SimpleFileOptions, name: &str, content: &str) {
    zip.start_file(name, options).unwrap();
    zip.write_all(content.as_bytes()).unwrap();
}

/// Excel serial number of a timestamp in the given date system
fn to_serial(datetime: &NaiveDateTime, is_1904: bool) -> f64 {
    let epoch = if is_1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1).unwrap()
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30).unwrap()
    };
    let millis = (*datetime - epoch.and_hms_opt(0, 0, 0).unwrap()).num_milliseconds();
    millis as f64 / 86_400_000f64
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
