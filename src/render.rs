//! Form document rendering.
//!
//! The backend stores a rendered copy of the confirmed form alongside the
//! email. [`SummaryPdfRenderer`] writes a PDF using only the
//! standard Type 1 fonts, so no font embedding is needed.

use std::io::Write;

use crate::error::RenderError;
use crate::intake::FieldSet;

/// Renders the confirmed field set into document bytes.
pub trait FormRenderer: Send + Sync {
    fn render(&self, fields: &FieldSet) -> Result<Vec<u8>, RenderError>;
}

const PAGE_WIDTH: u32 = 595;
const PAGE_HEIGHT: u32 = 842;
const WRAP_COLUMNS: usize = 90;
const BOTTOM_MARGIN: i32 = 60;
const TOP_MARGIN: i32 = PAGE_HEIGHT as i32 - 56;

/// "Insurance Policy Information" summary, paginated as needed.
#[derive(Debug, Clone)]
pub struct SummaryPdfRenderer {
    pub title: String,
    pub subtitle: String,
}

impl Default for SummaryPdfRenderer {
    fn default() -> Self {
        Self {
            title: "Insurance Policy Information".to_string(),
            subtitle: "Submitted Form Response".to_string(),
        }
    }
}

impl SummaryPdfRenderer {
    /// One content stream per page; rows flow onto new pages as needed.
    fn page_streams(&self, fields: &FieldSet) -> Vec<String> {
        let mut header = String::new();
        header.push_str(&format!(
            "0.976 0.659 0.145 rg 0 {} {PAGE_WIDTH} 114 re f\n",
            PAGE_HEIGHT - 114
        ));
        header.push_str(&text_op("F2", 22, 56, PAGE_HEIGHT as i32 - 57, "1 1 1", &self.title));
        header.push_str(&text_op("F1", 12, 56, PAGE_HEIGHT as i32 - 85, "1 1 1", &self.subtitle));
        let mut pages = vec![header];

        let rows = [
            ("Policy Number", fields.policy_number.as_str()),
            ("Document Name", fields.document_name.as_str()),
            ("Comments", fields.comment.as_str()),
            ("Timestamp", fields.timestamp.as_str()),
        ];

        let mut y = PAGE_HEIGHT as i32 - 142;
        for (label, value) in rows {
            if value.trim().is_empty() {
                continue;
            }
            // Keep a label together with its first line.
            if y - 17 < BOTTOM_MARGIN {
                pages.push(String::new());
                y = TOP_MARGIN;
            }
            push_op(&mut pages, text_op("F2", 11, 56, y, "0 0 0", &format!("{label}:")));
            y -= 17;
            for line in wrap(value, WRAP_COLUMNS) {
                if y < BOTTOM_MARGIN {
                    pages.push(String::new());
                    y = TOP_MARGIN;
                }
                push_op(&mut pages, text_op("F1", 10, 56, y, "0 0 0", &line));
                y -= 14;
            }
            y -= 9;
        }

        let total = pages.len();
        for (idx, page) in pages.iter_mut().enumerate() {
            page.push_str(&text_op(
                "F1",
                9,
                270,
                28,
                "0.5 0.5 0.5",
                &format!("Page {} of {total}", idx + 1),
            ));
        }
        pages
    }
}

impl FormRenderer for SummaryPdfRenderer {
    fn render(&self, fields: &FieldSet) -> Result<Vec<u8>, RenderError> {
        let pages = self.page_streams(fields);

        // Objects 1-4 are fixed; each page then takes a page object and its
        // content stream.
        let kids = (0..pages.len())
            .map(|idx| format!("{} 0 R", 5 + 2 * idx))
            .collect::<Vec<_>>()
            .join(" ");
        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", pages.len()),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
                .to_string(),
        ];
        for (idx, content) in pages.iter().enumerate() {
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                6 + 2 * idx
            ));
            objects.push(format!(
                "<< /Length {} >>\nstream\n{content}endstream",
                content.len()
            ));
        }

        let mut out: Vec<u8> = Vec::new();
        out.write_all(b"%PDF-1.4\n")?;

        let mut offsets = Vec::with_capacity(objects.len());
        for (idx, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            write!(out, "{} 0 obj\n{body}\nendobj\n", idx + 1)?;
        }

        let xref_at = out.len();
        write!(out, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1)?;
        for offset in offsets {
            write!(out, "{offset:010} 00000 n \n")?;
        }
        write!(
            out,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        )?;

        Ok(out)
    }
}

fn push_op(pages: &mut [String], op: String) {
    if let Some(page) = pages.last_mut() {
        page.push_str(&op);
    }
}

fn text_op(font: &str, size: u32, x: i32, y: i32, rgb: &str, text: &str) -> String {
    format!(
        "{rgb} rg BT /{font} {size} Tf {x} {y} Td ({}) Tj ET\n",
        escape(text)
    )
}

/// Escape a PDF literal string; characters outside Latin-1 become `?`.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' | '\r' | '\t' => out.push(' '),
            c if (c as u32) < 0x20 => {}
            c if c.is_ascii() => out.push(c),
            c if (c as u32) <= 0xFF => out.push_str(&format!("\\{:03o}", c as u32)),
            _ => out.push('?'),
        }
    }
    out
}

/// Greedy word wrap; words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..width).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
