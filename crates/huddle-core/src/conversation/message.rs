//! Chat messages, their senders and attachments

use serde::{Deserialize, Serialize};

use crate::types::{AttachmentId, MessageId, Timestamp, UserId};

/// Identity shown next to a message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub avatar: Option<String>,
}

impl User {
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: None,
        }
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Document,
    Other,
}

impl AttachmentKind {
    /// Classify by MIME type; anything that is not an image but names a
    /// type is treated as a document
    pub fn from_mime(mime_type: &str) -> Self {
        let mime_type = mime_type.trim();
        if mime_type.is_empty() {
            AttachmentKind::Other
        } else if mime_type.starts_with("image/") {
            AttachmentKind::Image
        } else {
            AttachmentKind::Document
        }
    }
}

/// A file picked by the local user, before it becomes part of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentUpload {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

impl AttachmentUpload {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub name: String,
    /// Where the content can be fetched; local references for uploads
    pub location: String,
    pub kind: AttachmentKind,
    pub size: Option<u64>,
}

impl Attachment {
    /// Turn an upload into an attachment with an ephemeral local reference
    pub fn from_upload(id: AttachmentId, upload: AttachmentUpload) -> Self {
        let location = format!("local://{}/{}", id, upload.name);
        Self {
            kind: AttachmentKind::from_mime(&upload.mime_type),
            location,
            name: upload.name,
            size: Some(upload.size),
            id,
        }
    }

    /// Size in whole kilobytes, e.g. `(12KB)`
    pub fn size_label(&self) -> Option<String> {
        self.size
            .filter(|size| *size > 0)
            .map(|size| format!("({}KB)", (size as f64 / 1024.0).round() as u64))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub sender: User,
    pub timestamp: Timestamp,
    /// Only ever goes from `false` to `true`
    pub read: bool,
    pub attachments: Vec<Attachment>,
}

impl Message {
    pub fn is_from(&self, user_id: &UserId) -> bool {
        &self.sender.id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_kind_from_mime() {
        assert_eq!(AttachmentKind::from_mime("image/png"), AttachmentKind::Image);
        assert_eq!(AttachmentKind::from_mime("application/pdf"), AttachmentKind::Document);
        assert_eq!(AttachmentKind::from_mime(""), AttachmentKind::Other);
    }

    #[test]
    fn test_upload_becomes_local_attachment() {
        let upload = AttachmentUpload::new("notes.pdf", "application/pdf", 12_500);
        let attachment = Attachment::from_upload(AttachmentId::from("att-1"), upload);

        assert_eq!(attachment.kind, AttachmentKind::Document);
        assert_eq!(attachment.location, "local://att-1/notes.pdf");
        assert_eq!(attachment.size_label().as_deref(), Some("(12KB)"));
    }

    #[test]
    fn test_size_label_absent_without_size() {
        let mut attachment = Attachment::from_upload(
            AttachmentId::from("att-2"),
            AttachmentUpload::new("photo.jpg", "image/jpeg", 0),
        );
        assert!(attachment.size_label().is_none());
        attachment.size = None;
        assert!(attachment.size_label().is_none());
    }
}
