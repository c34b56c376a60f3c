//! Avatar upload field.
//!
//! The field's value is an optional [`AvatarImage`]. An upload goes through
//! [`AvatarField::begin_upload`], which hands out the byte sink, and ends
//! with [`AvatarField::on_upload_succeeded`] or
//! [`AvatarField::on_upload_failed`]. Only a successful upload replaces the
//! committed value.

use signup_shared::AvatarImage;

use super::field::HasValue;

pub const MAX_AVATAR_BYTES: u64 = 1024 * 1024;

pub const TOO_MANY_FILES_MESSAGE: &str = "Too Many Files.";
pub const FILE_TOO_BIG_MESSAGE: &str = "File is Too Big.";
pub const INCORRECT_FILE_TYPE_MESSAGE: &str = "Incorrect File Type.";

/// A file offered for upload, before any byte is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub mime: String,
    pub size: u64,
}

/// Checks applied before an upload is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadConstraints {
    pub max_files: usize,
    pub accepted_mime_prefix: &'static str,
    pub max_file_size: u64,
}

impl Default for UploadConstraints {
    fn default() -> Self {
        Self {
            max_files: 1,
            accepted_mime_prefix: "image/",
            max_file_size: MAX_AVATAR_BYTES,
        }
    }
}

impl UploadConstraints {
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn check(&self, files: &[FileInfo]) -> Result<(), String> {
        if files.len() > self.max_files {
            return Err(TOO_MANY_FILES_MESSAGE.to_string());
        }
        for file in files {
            self.check_file(file)?;
        }
        Ok(())
    }

    pub fn check_file(&self, file: &FileInfo) -> Result<(), String> {
        if !file.mime.starts_with(self.accepted_mime_prefix) {
            return Err(INCORRECT_FILE_TYPE_MESSAGE.to_string());
        }
        if file.size > self.max_file_size {
            return Err(FILE_TOO_BIG_MESSAGE.to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Idle,
    Receiving,
    HasValue,
    Failed,
}

/// Fired once per successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueChangeEvent<V> {
    pub old_value: V,
    pub value: V,
}

#[derive(Debug, Clone)]
pub struct AvatarField {
    pub label: &'static str,
    value: Option<AvatarImage>,
    /// Attachment being received; its `image` is the byte sink.
    receiving: Option<AvatarImage>,
    upload_error: Option<String>,
    validation_error: Option<String>,
}

impl AvatarField {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            value: None,
            receiving: None,
            upload_error: None,
            validation_error: None,
        }
    }

    pub fn status(&self) -> UploadStatus {
        if self.receiving.is_some() {
            UploadStatus::Receiving
        } else if self.upload_error.is_some() {
            UploadStatus::Failed
        } else if self.value.is_some() {
            UploadStatus::HasValue
        } else {
            UploadStatus::Idle
        }
    }

    /// Starts receiving a new file and returns the buffer to write it into.
    pub fn begin_upload(&mut self, file_name: &str, mime_type: &str) -> &mut Vec<u8> {
        self.upload_error = None;
        &mut self
            .receiving
            .insert(AvatarImage::new(file_name, mime_type))
            .image
    }

    /// The open byte sink, while an upload is in progress.
    pub fn sink(&mut self) -> Option<&mut Vec<u8>> {
        self.receiving.as_mut().map(|pending| &mut pending.image)
    }

    pub fn received_bytes(&self) -> Option<usize> {
        self.receiving.as_ref().map(|pending| pending.image.len())
    }

    /// Commits the received attachment. Returns `None` if no upload was in
    /// progress.
    pub fn on_upload_succeeded(&mut self) -> Option<ValueChangeEvent<Option<AvatarImage>>> {
        let pending = self.receiving.take()?;
        self.upload_error = None;
        let old_value = self.value.replace(pending);
        Some(ValueChangeEvent {
            old_value,
            value: self.value.clone(),
        })
    }

    pub fn on_upload_failed(&mut self, reason: impl Into<String>) {
        self.receiving = None;
        self.upload_error = Some(reason.into());
    }

    /// Drops the upload in progress without reporting a failure.
    pub fn cancel_upload(&mut self) {
        self.receiving = None;
        self.upload_error = None;
    }

    /// The file never reached [`begin_upload`](Self::begin_upload).
    pub fn on_file_rejected(&mut self, reason: impl Into<String>) {
        self.upload_error = Some(reason.into());
    }

    pub fn upload_error(&self) -> Option<&str> {
        self.upload_error.as_deref()
    }

    /// Caption shown in place of the image, hidden when there is none.
    pub fn preview(&self) -> Option<String> {
        self.value
            .as_ref()
            .filter(|avatar| avatar.has_image())
            .map(|avatar| {
                format!(
                    "{} ({}, {})",
                    avatar.name,
                    avatar.mime,
                    format_size(avatar.image.len())
                )
            })
    }
}

impl HasValue for AvatarField {
    type Value = Option<AvatarImage>;

    fn value(&self) -> Option<AvatarImage> {
        self.value.clone()
    }

    fn set_value(&mut self, value: Option<AvatarImage>) {
        self.value = value;
    }

    fn set_error(&mut self, error: Option<String>) {
        self.validation_error = error;
    }

    fn error(&self) -> Option<&str> {
        self.validation_error
            .as_deref()
            .or(self.upload_error.as_deref())
    }
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} bytes", bytes)
    } else {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::io::Write;

    #[fixture]
    fn field() -> AvatarField {
        AvatarField::new("Select Avatar image")
    }

    fn existing() -> AvatarImage {
        AvatarImage {
            name: "old.gif".to_string(),
            mime: "image/gif".to_string(),
            image: vec![9, 9],
        }
    }

    fn file(mime: &str, size: u64) -> FileInfo {
        FileInfo {
            name: "x".to_string(),
            mime: mime.to_string(),
            size,
        }
    }

    #[rstest]
    fn test_successful_upload_commits_value(mut field: AvatarField) {
        field.begin_upload("x.png", "image/png").write_all(&[1, 2, 3]).unwrap();
        assert_eq!(field.status(), UploadStatus::Receiving);

        let event = field.on_upload_succeeded();

        let expected = AvatarImage {
            name: "x.png".to_string(),
            mime: "image/png".to_string(),
            image: vec![1, 2, 3],
        };
        assert_eq!(field.value(), Some(expected.clone()));
        assert_eq!(
            event,
            Some(ValueChangeEvent {
                old_value: None,
                value: Some(expected),
            })
        );
        assert_eq!(field.status(), UploadStatus::HasValue);
        assert_eq!(field.preview().as_deref(), Some("x.png (image/png, 3 bytes)"));
    }

    #[rstest]
    fn test_chunks_go_through_sink(mut field: AvatarField) {
        assert!(field.sink().is_none());
        field.begin_upload("x.png", "image/png");

        field.sink().unwrap().extend_from_slice(&[1, 2]);
        field.sink().unwrap().extend_from_slice(&[3]);

        assert_eq!(field.received_bytes(), Some(3));
        field.on_upload_succeeded();
        assert_eq!(field.value().unwrap().image, vec![1, 2, 3]);
    }

    #[rstest]
    fn test_change_event_fires_once_per_upload(mut field: AvatarField) {
        field.begin_upload("x.png", "image/png");

        assert!(field.on_upload_succeeded().is_some());
        assert!(field.on_upload_succeeded().is_none());
    }

    #[rstest]
    fn test_rejection_keeps_value_and_flags_error(mut field: AvatarField) {
        field.set_value(Some(existing()));

        field.on_file_rejected("too large");

        assert_eq!(field.value(), Some(existing()));
        assert_eq!(field.status(), UploadStatus::Failed);
        assert_eq!(field.error(), Some("too large"));
    }

    #[rstest]
    fn test_failed_upload_discards_pending_bytes(mut field: AvatarField) {
        field.set_value(Some(existing()));
        field.begin_upload("x.png", "image/png").push(1);

        field.on_upload_failed("connection lost");

        assert_eq!(field.value(), Some(existing()));
        assert!(field.sink().is_none());
        assert_eq!(field.status(), UploadStatus::Failed);
        assert!(field.on_upload_succeeded().is_none());
    }

    #[rstest]
    fn test_new_upload_clears_previous_error(mut field: AvatarField) {
        field.on_file_rejected(INCORRECT_FILE_TYPE_MESSAGE);

        field.begin_upload("x.png", "image/png");

        assert_eq!(field.upload_error(), None);
        assert_eq!(field.status(), UploadStatus::Receiving);
    }

    #[rstest]
    fn test_rejection_while_receiving_is_cleared_by_success(mut field: AvatarField) {
        field.begin_upload("x.png", "image/png").push(1);
        field.on_file_rejected(TOO_MANY_FILES_MESSAGE);

        field.on_upload_succeeded();

        assert_eq!(field.status(), UploadStatus::HasValue);
        assert_eq!(field.upload_error(), None);
        assert_eq!(field.error(), None);
    }

    #[rstest]
    fn test_cancel_drops_pending_upload(mut field: AvatarField) {
        field.set_value(Some(existing()));
        field.begin_upload("x.png", "image/png").push(1);

        field.cancel_upload();

        assert_eq!(field.status(), UploadStatus::HasValue);
        assert!(field.on_upload_succeeded().is_none());
        assert_eq!(field.value(), Some(existing()));
    }

    #[rstest]
    fn test_preview_hidden_without_image(mut field: AvatarField) {
        assert_eq!(field.preview(), None);

        field.set_value(Some(AvatarImage::new("empty.png", "image/png")));

        assert_eq!(field.preview(), None);
    }

    #[rstest]
    fn test_validation_error_does_not_hide_upload_error(mut field: AvatarField) {
        field.on_file_rejected(FILE_TOO_BIG_MESSAGE);

        field.set_error(None);

        assert_eq!(field.error(), Some(FILE_TOO_BIG_MESSAGE));
    }

    #[rstest]
    #[case(vec![file("image/png", 10)], Ok(()))]
    #[case(vec![file("image/png", MAX_AVATAR_BYTES)], Ok(()))]
    #[case(vec![file("image/png", MAX_AVATAR_BYTES + 1)], Err(FILE_TOO_BIG_MESSAGE))]
    #[case(vec![file("application/pdf", 10)], Err(INCORRECT_FILE_TYPE_MESSAGE))]
    #[case(vec![file("image/png", 1), file("image/png", 1)], Err(TOO_MANY_FILES_MESSAGE))]
    fn test_upload_constraints(#[case] files: Vec<FileInfo>, #[case] expected: Result<(), &str>) {
        let result = UploadConstraints::default().check(&files);

        assert_eq!(result, expected.map_err(str::to_string));
    }
}
