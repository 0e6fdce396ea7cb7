//! Turning user uploads into something the model can read.
//!
//! Text-like files are flattened into a string with a short provenance header;
//! images are passed through as base64. Nothing here returns an error: problems
//! are described in the returned text instead.

use base64::Engine;
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::message::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Text,
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestedFile {
    pub kind: FileKind,
    /// Extracted text, or base64 bytes for images
    pub content: String,
    pub mime_type: Option<String>,
}

impl IngestedFile {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: FileKind::Text,
            content: content.into(),
            mime_type: None,
        }
    }

    pub fn image(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            kind: FileKind::Image,
            content: data.into(),
            mime_type: Some(mime_type.into()),
        }
    }
}

pub fn ingest_file(path: &Path) -> IngestedFile {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();

    tracing::info!(file = %path.display(), %extension, "ingesting upload");
    match read_by_extension(path, &file_name, &extension) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "failed to read upload");
            IngestedFile::text(format!("Error reading file {}: {}", file_name, e))
        }
    }
}

fn read_by_extension(path: &Path, file_name: &str, extension: &str) -> anyhow::Result<IngestedFile> {
    let file = match extension {
        ".txt" => IngestedFile::text(std::fs::read_to_string(path)?),
        ".csv" => IngestedFile::text(format!(
            "CSV Content from '{}':\n\n{}",
            file_name,
            std::fs::read_to_string(path)?
        )),
        ".pdf" => {
            let text =
                pdf_extract::extract_text(path).map_err(|e| anyhow::anyhow!("{}", e))?;
            IngestedFile::text(format!("PDF Content from '{}':\n\n{}", file_name, text))
        }
        ".xlsx" => {
            let mut workbook: Xlsx<_> = open_workbook(path)?;
            let range = workbook
                .worksheet_range_at(0)
                .ok_or_else(|| anyhow::anyhow!("workbook has no sheets"))??;
            IngestedFile::text(format!(
                "Excel Content from '{}':\n\n{}",
                file_name,
                render_table(&range)
            ))
        }
        ".png" | ".jpg" | ".jpeg" => {
            let bytes = std::fs::read(path)?;
            let mime_type = if extension == ".png" {
                "image/png"
            } else {
                "image/jpeg"
            };
            IngestedFile::image(base64::prelude::BASE64_STANDARD.encode(bytes), mime_type)
        }
        other => IngestedFile::text(format!("Unsupported file type: '{}'", other)),
    };
    Ok(file)
}

/// Render a sheet as a right-aligned text table. The first row is the header and
/// every data row is prefixed with its zero-based index.
fn render_table(range: &Range<Data>) -> String {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return "Empty sheet".to_string();
    };

    let mut table: Vec<Vec<String>> = Vec::new();
    let mut first = vec![String::new()];
    first.extend(header.iter().map(|c| c.to_string()));
    table.push(first);
    for (index, row) in rows.enumerate() {
        let mut line = vec![index.to_string()];
        line.extend(row.iter().map(|c| c.to_string()));
        table.push(line);
    }

    let columns = table.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|col| {
            table
                .iter()
                .filter_map(|r| r.get(col))
                .map(|c| c.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    table
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(col, cell)| format!("{:>width$}", cell, width = widths[col]))
                .collect::<Vec<_>>()
                .join("  ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the inbound message from the user's words and an optional upload.
///
/// The user's text is always the last text part; extracted file text goes in a
/// part of its own ahead of it.
pub fn compose_user_message(text: &str, file: Option<&IngestedFile>) -> Message {
    match file {
        None => Message::user().with_text(text),
        Some(file) => match file.kind {
            FileKind::Image => Message::user().with_text(text).with_image(
                file.content.clone(),
                file.mime_type.clone().unwrap_or_else(|| "image/jpeg".to_string()),
            ),
            FileKind::Text => Message::user()
                .with_text(format!("{}\n\n---\n\nUser Question:", file.content))
                .with_text(text),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::MessageContent;
    use rust_xlsxwriter::Workbook;
    use std::fs;

    #[test]
    fn test_txt_is_read_verbatim() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("notes.TXT");
        fs::write(&path, "remember the milk").unwrap();

        let file = ingest_file(&path);
        assert_eq!(file, IngestedFile::text("remember the milk"));
    }

    #[test]
    fn test_csv_gets_header() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("sales.csv");
        fs::write(&path, "id,total\n1,10\n").unwrap();

        let file = ingest_file(&path);
        assert_eq!(file.kind, FileKind::Text);
        assert_eq!(file.content, "CSV Content from 'sales.csv':\n\nid,total\n1,10\n");
    }

    #[test]
    fn test_xlsx_rendered_as_table() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("report.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "name").unwrap();
        sheet.write_string(0, 1, "qty").unwrap();
        sheet.write_string(1, 0, "bolt").unwrap();
        sheet.write_number(1, 1, 12).unwrap();
        sheet.write_string(2, 0, "washer").unwrap();
        sheet.write_number(2, 1, 3).unwrap();
        workbook.save(&path).unwrap();

        let file = ingest_file(&path);
        assert_eq!(
            file.content,
            "Excel Content from 'report.xlsx':\n\n     name  qty\n0    bolt   12\n1  washer    3"
        );
    }

    #[test]
    fn test_image_is_base64() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("photo.jpg");
        fs::write(&path, b"hello").unwrap();

        let file = ingest_file(&path);
        assert_eq!(file, IngestedFile::image("aGVsbG8=", "image/jpeg"));

        let png = temp.path().join("shot.PNG");
        fs::write(&png, b"hello").unwrap();
        assert_eq!(ingest_file(&png).mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_unsupported_extension() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("archive.zip");
        fs::write(&path, b"PK").unwrap();

        assert_eq!(
            ingest_file(&path),
            IngestedFile::text("Unsupported file type: '.zip'")
        );
    }

    #[test]
    fn test_read_failures_are_described() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("missing.pdf");
        let file = ingest_file(&missing);
        assert_eq!(file.kind, FileKind::Text);
        assert!(file.content.starts_with("Error reading file missing.pdf: "));

        let binary = temp.path().join("binary.txt");
        fs::write(&binary, [0xff, 0xfe, 0x00]).unwrap();
        assert!(ingest_file(&binary)
            .content
            .starts_with("Error reading file binary.txt: "));
    }

    #[test]
    fn test_compose_with_text_file() {
        let file = IngestedFile::text("CSV Content from 'a.csv':\n\nx\n1");
        let message = compose_user_message("what is x?", Some(&file));
        assert_eq!(
            message.content,
            vec![
                MessageContent::text("CSV Content from 'a.csv':\n\nx\n1\n\n---\n\nUser Question:"),
                MessageContent::text("what is x?"),
            ]
        );
        assert_eq!(message.last_text(), Some("what is x?"));
    }

    #[test]
    fn test_compose_with_image() {
        let file = IngestedFile::image("aGVsbG8=", "image/png");
        let message = compose_user_message("make it pop", Some(&file));
        assert_eq!(message.content.len(), 2);
        assert_eq!(message.content[0], MessageContent::text("make it pop"));
        assert_eq!(message.first_image().unwrap().mime_type, "image/png");
    }

    #[test]
    fn test_compose_without_file() {
        let message = compose_user_message("hello", None);
        assert_eq!(message.text(), "hello");
    }
}
