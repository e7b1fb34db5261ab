//! Word document text extraction via `docx-rs`.
//!
//! The body is flattened into plain text: runs are concatenated, tabs and
//! line breaks kept, and every paragraph (including paragraphs inside table
//! cells and content controls) followed by a blank line so the splitter can
//! cut between them. Runs nested in hyperlinks, tracked insertions and
//! inline content controls count as paragraph text.
//! Legacy binary `.doc` files are not zip archives and fail to parse.

use crate::error::KeywordError;
use docx_rs::{
    DocumentChild, InsertChild, Paragraph, ParagraphChild, Run, RunChild, StructuredDataTag,
    StructuredDataTagChild, Table, TableCellContent, TableChild, TableRowChild,
};
use std::path::Path;
use tracing::debug;

/// Extract the body text of a `.docx` file.
pub async fn extract_text(docx_path: &Path) -> Result<String, KeywordError> {
    let path = docx_path.to_path_buf();

    tokio::task::spawn_blocking(move || extract_text_blocking(&path))
        .await
        .map_err(|e| KeywordError::Internal(format!("Word extraction task panicked: {}", e)))?
}

fn extract_text_blocking(path: &Path) -> Result<String, KeywordError> {
    let bytes = std::fs::read(path).map_err(|source| KeywordError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let text = text_from_bytes(&bytes).map_err(|detail| KeywordError::CorruptDocument {
        path: path.to_path_buf(),
        format: "Word document",
        detail,
    })?;

    debug!("Word document: {} chars of text", text.chars().count());
    Ok(text)
}

/// Parse `.docx` bytes and flatten the body to text.
pub(crate) fn text_from_bytes(bytes: &[u8]) -> Result<String, String> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| format!("{:?}", e))?;

    let mut out = String::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => push_paragraph(&mut out, p),
            DocumentChild::Table(t) => push_table(&mut out, t),
            DocumentChild::StructuredDataTag(tag) => push_block_tag(&mut out, tag),
            _ => {}
        }
    }
    Ok(out)
}

fn push_paragraph(out: &mut String, paragraph: &Paragraph) {
    push_inline(out, &paragraph.children);
    out.push_str("\n\n");
}

fn push_inline(out: &mut String, children: &[ParagraphChild]) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => push_run(out, run),
            ParagraphChild::Hyperlink(link) => push_inline(out, &link.children),
            ParagraphChild::Insert(insert) => {
                for ic in &insert.children {
                    if let InsertChild::Run(run) = ic {
                        push_run(out, run);
                    }
                }
            }
            ParagraphChild::StructuredDataTag(tag) => push_inline_tag(out, tag),
            _ => {}
        }
    }
}

fn push_run(out: &mut String, run: &Run) {
    for rc in &run.children {
        match rc {
            RunChild::Text(t) => out.push_str(&t.text),
            RunChild::Tab(_) => out.push('\t'),
            RunChild::Break(_) => out.push('\n'),
            _ => {}
        }
    }
}

/// Content control inside a paragraph: only its runs matter.
fn push_inline_tag(out: &mut String, tag: &StructuredDataTag) {
    for child in &tag.children {
        match child {
            StructuredDataTagChild::Run(run) => push_run(out, run),
            StructuredDataTagChild::StructuredDataTag(inner) => push_inline_tag(out, inner),
            _ => {}
        }
    }
}

/// Content control at body level: may wrap whole paragraphs and tables.
fn push_block_tag(out: &mut String, tag: &StructuredDataTag) {
    let mut pending_runs = false;
    for child in &tag.children {
        match child {
            StructuredDataTagChild::Run(run) => {
                push_run(out, run);
                pending_runs = true;
            }
            StructuredDataTagChild::Paragraph(p) => push_paragraph(out, p),
            StructuredDataTagChild::Table(t) => push_table(out, t),
            StructuredDataTagChild::StructuredDataTag(inner) => push_block_tag(out, inner),
            _ => {}
        }
    }
    if pending_runs {
        out.push_str("\n\n");
    }
}

fn push_table(out: &mut String, table: &Table) {
    for row in &table.rows {
        #[allow(irrefutable_let_patterns)]
        let TableChild::TableRow(row) = row else {
            continue;
        };
        for cell in &row.cells {
            #[allow(irrefutable_let_patterns)]
            let TableRowChild::TableCell(cell) = cell else {
                continue;
            };
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(p) => push_paragraph(out, p),
                    TableCellContent::Table(t) => push_table(out, t),
                    _ => {}
                }
            }
        }
    }
}
