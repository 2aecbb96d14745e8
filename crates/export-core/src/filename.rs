//! Collision-free attachment filenames
//!
//! With a file id (Cloud) the filename is `file_id + extension`. Without one
//! (Server / Data Center) it is `id_title + extension`, or `id + extension`
//! for an empty title. Attachment ids are unique within a run, so the result
//! is unique without any shared registry.

use crate::models::Attachment;
use crate::sanitize::sanitize_filename;

/// Sanitize a title and drop a trailing copy of `extension`
///
/// Prevents `doc.pdf` from becoming `doc.pdf.pdf`. The comparison ignores
/// ASCII case.
pub fn title_without_extension(title: &str, extension: &str) -> String {
    let sanitized = sanitize_filename(title);
    if extension.is_empty() || sanitized.len() < extension.len() {
        return sanitized;
    }

    let split = sanitized.len() - extension.len();
    if !sanitized.is_char_boundary(split) {
        return sanitized;
    }

    let (head, tail) = sanitized.split_at(split);
    if tail.eq_ignore_ascii_case(extension) {
        sanitize_filename(head)
    } else {
        sanitized
    }
}

/// Filename of an attachment without its extension
pub fn attachment_stem(attachment: &Attachment) -> String {
    let file_id = sanitize_filename(&attachment.file_id);
    if !file_id.is_empty() {
        return file_id;
    }

    let id = sanitize_filename(&attachment.id);
    let title = title_without_extension(&attachment.title, attachment.extension());
    if title.is_empty() {
        id
    } else {
        format!("{}_{}", id, title)
    }
}

/// Full filename of an attachment
pub fn attachment_filename(attachment: &Attachment) -> String {
    format!("{}{}", attachment_stem(attachment), attachment.extension())
}
