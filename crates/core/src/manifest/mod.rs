//! Manifest parsing and validation.
//!
//! A manifest is a CSV table with the exact header
//! `S. No., Product Name, Input Image Urls`. The third column holds a
//! comma-separated list of image URLs, so it arrives quoted and the reader
//! must honor RFC 4180 quoting. Validation is all-or-nothing: a single bad
//! reference anywhere rejects the whole submission.

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// Required header row, in order.
pub const REQUIRED_HEADER: [&str; 3] = ["S. No.", "Product Name", "Input Image Urls"];

static IMAGE_REF_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(https?://.*\.(png|jpg|jpeg|gif|bmp|webp))$").expect("invalid image ref regex")
});

/// Error type for manifest validation.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The table shape or header is wrong.
    #[error("Invalid manifest: {0}")]
    Schema(String),

    /// One or more image references failed validation.
    /// Carries every offending token found in the manifest.
    #[error("Invalid image URLs found: {0:?}")]
    InvalidRefs(Vec<String>),
}

/// One validated manifest row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    /// Serial number, copied verbatim (trimmed) from the manifest.
    pub serial_number: String,
    /// Product name, copied verbatim (trimmed) from the manifest.
    pub display_name: String,
    /// Validated source image URLs, in manifest order. Never empty.
    pub input_refs: Vec<String>,
}

/// Parse raw CSV text into rows of fields.
///
/// Minimal RFC 4180 reader: quoted fields, doubled quotes inside quoted
/// fields, CRLF or LF line endings. A trailing newline does not produce an
/// empty row.
pub fn parse_csv(content: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = content.chars().peekable();
    let mut saw_any = false;

    while let Some(c) = chars.next() {
        saw_any = true;
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => {
                    row.push(std::mem::take(&mut field));
                }
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                '\n' => {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                _ => field.push(c),
            }
        }
    }

    if saw_any && (!field.is_empty() || !row.is_empty()) {
        row.push(field);
        rows.push(row);
    }

    rows
}

/// Validate parsed rows and produce the ordered list of line items.
///
/// No side effects; callers persist the result only on success.
pub fn validate_manifest(rows: &[Vec<String>]) -> Result<Vec<LineItem>, ManifestError> {
    if rows.len() < 2 {
        return Err(ManifestError::Schema(
            "manifest must contain a header and at least one data row".to_string(),
        ));
    }

    let header: Vec<&str> = rows[0].iter().map(String::as_str).collect();
    if header != REQUIRED_HEADER {
        return Err(ManifestError::Schema(format!(
            "manifest must have headers {:?}, but found {:?}",
            REQUIRED_HEADER, rows[0]
        )));
    }

    let mut items = Vec::new();
    let mut invalid_refs = Vec::new();

    for (row_idx, row) in rows[1..].iter().enumerate() {
        // Short rows are skipped rather than rejected, matching the accepted
        // input format's leniency.
        if row.len() < 3 {
            continue;
        }

        let tokens: Vec<String> = row[2]
            .split(',')
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        if tokens.is_empty() {
            return Err(ManifestError::Schema(format!(
                "data row {} has no image references",
                row_idx + 1
            )));
        }

        for token in &tokens {
            if !IMAGE_REF_REGEX.is_match(token) {
                invalid_refs.push(token.clone());
            }
        }

        items.push(LineItem {
            serial_number: row[0].trim().to_string(),
            display_name: row[1].trim().to_string(),
            input_refs: tokens,
        });
    }

    if !invalid_refs.is_empty() {
        return Err(ManifestError::InvalidRefs(invalid_refs));
    }

    Ok(items)
}

/// Convenience wrapper: parse raw CSV text and validate it in one step.
pub fn parse_manifest(content: &str) -> Result<Vec<LineItem>, ManifestError> {
    let rows = parse_csv(content);
    validate_manifest(&rows)
}
