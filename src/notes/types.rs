//! Apple Notes result types

use serde::Serialize;

/// Folder new notes go to when none is named
pub const DEFAULT_FOLDER: &str = "Notes";

fn field(record: &[String], index: usize) -> String {
    record.get(index).cloned().unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NotesAccount {
    pub id: String,
    pub name: String,
}

impl NotesAccount {
    pub fn from_record(record: &[String]) -> Self {
        Self {
            id: field(record, 0),
            name: field(record, 1),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NotesFolder {
    pub id: String,
    pub name: String,
    pub account: String,
    pub note_count: u64,
}

impl NotesFolder {
    pub fn from_record(record: &[String]) -> Self {
        Self {
            id: field(record, 0),
            name: field(record, 1),
            account: field(record, 2),
            note_count: field(record, 3).trim().parse().unwrap_or(0),
        }
    }
}

/// Note in a listing or search
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NoteSummary {
    pub id: String,
    pub name: String,
    pub modification_date: String,
    pub folder: String,
}

impl NoteSummary {
    pub fn from_record(record: &[String]) -> Self {
        Self {
            id: field(record, 0),
            name: field(record, 1),
            modification_date: field(record, 2),
            folder: field(record, 3),
        }
    }
}

/// Note with plaintext content
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NoteDetail {
    pub id: String,
    pub name: String,
    pub plaintext: String,
    pub creation_date: String,
    pub modification_date: String,
    pub password_protected: bool,
}

impl NoteDetail {
    pub fn from_record(record: &[String]) -> Self {
        Self {
            id: field(record, 0),
            name: field(record, 1),
            plaintext: field(record, 2),
            creation_date: field(record, 3),
            modification_date: field(record, 4),
            password_protected: field(record, 5) == "true",
        }
    }
}

/// Note with its HTML body
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NoteHtml {
    pub id: String,
    pub name: String,
    pub html: String,
}

impl NoteHtml {
    pub fn from_record(record: &[String]) -> Self {
        Self {
            id: field(record, 0),
            name: field(record, 1),
            html: field(record, 2),
        }
    }
}

/// A note to create
#[derive(Debug, Clone)]
pub struct NewNote {
    pub name: String,
    pub body: String,
    pub folder: String,
    pub account: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoteCreated {
    pub id: String,
    pub name: String,
    pub folder: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoteUpdated {
    pub id: String,
    pub updated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoteDeleted {
    pub deleted: bool,
    pub note_id: String,
    pub note_name: String,
    pub recovery: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoteShown {
    pub shown: bool,
    pub note_id: String,
}

/// Escape text for inclusion in note HTML
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// HTML body of a note: the title as a heading, then the text with line breaks
pub fn note_html(name: &str, body: &str) -> String {
    let body = escape_html(body).replace("\r\n", "\n").replace('\n', "<br>");
    format!(
        "<div><h1>{}</h1></div><div>{}</div>",
        escape_html(name),
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_html() {
        assert_eq!(
            note_html("Q&A", "line 1\nline <2>"),
            "<div><h1>Q&amp;A</h1></div><div>line 1<br>line &lt;2&gt;</div>"
        );
    }

    #[test]
    fn test_records_tolerate_missing_fields() {
        let folder = NotesFolder::from_record(&["f1".to_string(), "Work".to_string()]);
        assert_eq!(folder.account, "");
        assert_eq!(folder.note_count, 0);

        let detail = NoteDetail::from_record(&[
            "n1".into(),
            "Title".into(),
            "Body".into(),
            "2024-01-01T09:00:00".into(),
            "2024-01-02T09:00:00".into(),
            "true".into(),
        ]);
        assert!(detail.password_protected);
    }
}
