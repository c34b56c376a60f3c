use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use signup_shared::validation::{self, PasswordRule};
use signup_shared::{UserDetails, UserDetailsService};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::config::Config;
use crate::form::{
    AvatarField, Binder, Checkbox, HasValue, TextField, UploadConstraints, ValidationSummary,
    TOO_MANY_FILES_MESSAGE,
};
use crate::upload::{self, UploadEvent, UploadMessage};

struct ActiveUpload {
    id: u64,
    task: Option<AbortHandle>,
}

pub const SAVE_FAILED_MESSAGE: &str = "Saving the data failed, please try again";

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Tick,
    Upload(UploadMessage),
}

impl From<UploadMessage> for AppEvent {
    fn from(message: UploadMessage) -> Self {
        AppEvent::Upload(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Firstname,
    Lastname,
    Handle,
    Avatar,
    Password,
    PasswordConfirm,
    AllowsMarketing,
    Email,
    Submit,
}

impl Focus {
    const ORDER: [Focus; 9] = [
        Focus::Firstname,
        Focus::Lastname,
        Focus::Handle,
        Focus::Avatar,
        Focus::Password,
        Focus::PasswordConfirm,
        Focus::AllowsMarketing,
        Focus::Email,
        Focus::Submit,
    ];

    fn index(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    /// Property this field is bound to, if any.
    pub fn property(self) -> Option<&'static str> {
        match self {
            Focus::Firstname => Some("firstname"),
            Focus::Lastname => Some("lastname"),
            Focus::Handle => Some("handle"),
            Focus::Avatar => Some("avatar"),
            Focus::Password => Some("password"),
            Focus::AllowsMarketing => Some("allowsMarketing"),
            Focus::Email => Some("email"),
            Focus::PasswordConfirm | Focus::Submit => None,
        }
    }
}

/// Every input of the signup form, plus visibility state.
pub struct SignupForm {
    pub firstname: TextField,
    pub lastname: TextField,
    pub handle: TextField,
    pub avatar: AvatarField,
    pub password: TextField,
    pub password_confirm: TextField,
    pub allows_marketing: Checkbox,
    pub email: TextField,
}

impl SignupForm {
    pub fn new() -> Self {
        Self {
            firstname: TextField::new("First name"),
            lastname: TextField::new("Last name"),
            handle: TextField::new("User handle"),
            avatar: AvatarField::new("Select Avatar image"),
            password: TextField::password("Wanted password"),
            password_confirm: TextField::password("Password again"),
            allows_marketing: Checkbox::new("Allow Marketing?"),
            email: TextField::new("Email").hidden(),
        }
    }

    pub fn text_field_mut(&mut self, focus: Focus) -> Option<&mut TextField> {
        match focus {
            Focus::Firstname => Some(&mut self.firstname),
            Focus::Lastname => Some(&mut self.lastname),
            Focus::Handle => Some(&mut self.handle),
            Focus::Password => Some(&mut self.password),
            Focus::PasswordConfirm => Some(&mut self.password_confirm),
            Focus::Email => Some(&mut self.email),
            Focus::Avatar | Focus::AllowsMarketing | Focus::Submit => None,
        }
    }

    fn is_focusable(&self, focus: Focus) -> bool {
        focus != Focus::Email || self.email.is_visible()
    }
}

impl Default for SignupForm {
    fn default() -> Self {
        Self::new()
    }
}

fn build_binder(service: Arc<dyn UserDetailsService>) -> Binder<SignupForm, UserDetails> {
    let mut binder: Binder<SignupForm, UserDetails> = Binder::new();

    binder
        .for_field(|f: &mut SignupForm| &mut f.firstname)
        .as_required("First name is required")
        .with_validator(|v: &String, _: &SignupForm| {
            validation::length(v, validation::FIRSTNAME_LENGTH)
        })
        .bind("firstname", |d| d.firstname.clone(), |d, v| d.firstname = v);

    binder
        .for_field(|f: &mut SignupForm| &mut f.lastname)
        .as_required("Last name is required")
        .with_validator(|v: &String, _: &SignupForm| {
            validation::length(v, validation::LASTNAME_LENGTH)
        })
        .bind("lastname", |d| d.lastname.clone(), |d, v| d.lastname = v);

    binder
        .for_field(|f: &mut SignupForm| &mut f.handle)
        .as_required("User handle is required")
        .with_validator(move |v: &String, _: &SignupForm| match service.validate_handle(v) {
            None => Ok(()),
            Some(message) => Err(message),
        })
        .with_validator(|v: &String, _: &SignupForm| {
            validation::length(v, validation::HANDLE_LENGTH)
        })
        .bind("handle", |d| d.handle.clone(), |d, v| d.handle = v);

    binder
        .for_field(|f: &mut SignupForm| &mut f.avatar)
        .bind("avatar", |d| d.avatar.clone(), |d, v| d.avatar = v);

    binder
        .for_field(|f: &mut SignupForm| &mut f.allows_marketing)
        .bind(
            "allowsMarketing",
            |d| d.allows_marketing,
            |d, v| d.allows_marketing = v,
        );

    binder
        .for_field(|f: &mut SignupForm| &mut f.email)
        .as_required_when(validation::INVALID_EMAIL_MESSAGE, |f| {
            f.allows_marketing.is_checked()
        })
        .with_validator(|v: &String, f: &SignupForm| {
            validation::email_when_marketing(v, f.allows_marketing.is_checked())
        })
        .bind("email", |d| d.email.clone(), |d, v| d.email = v);

    let mut password_rule = PasswordRule::new();
    binder
        .for_field(|f: &mut SignupForm| &mut f.password)
        .as_required(validation::PASSWORD_TOO_SHORT_MESSAGE)
        .with_validator(move |v: &String, f: &SignupForm| {
            if f.password_confirm.is_touched() {
                password_rule.arm();
            }
            password_rule.check(v, f.password_confirm.text())
        })
        .with_validator(|v: &String, _: &SignupForm| {
            validation::length(v, validation::PASSWORD_LENGTH)
        })
        .bind("password", |d| d.password.clone(), |d, v| d.password = v);

    binder.with_record_validator(|d: &UserDetails| match d.violations().into_iter().next() {
        Some(violation) => Err(violation.to_string()),
        None => Ok(()),
    });

    tracing::debug!(
        properties = ?binder.properties().collect::<Vec<_>>(),
        "Signup form bound"
    );
    binder
}

/// Transient message shown after a successful signup.
#[derive(Debug, Clone)]
pub struct Notice {
    pub message: String,
    pub shown_at: DateTime<Utc>,
}

pub struct App {
    pub form: SignupForm,
    binder: Binder<SignupForm, UserDetails>,
    service: Arc<dyn UserDetailsService>,
    config: Config,
    constraints: UploadConstraints,

    pub focus: Focus,
    /// File path being typed for an avatar upload.
    pub upload_prompt: Option<String>,
    pub notice: Option<Notice>,
    /// The upload whose events the avatar field accepts, from the moment its
    /// reader task starts until it succeeds or fails.
    upload: Option<ActiveUpload>,
    next_upload_id: u64,
    pub submitting: bool,
    /// Last successfully stored record.
    pub stored: Option<UserDetails>,
}

impl App {
    pub fn new(service: Arc<dyn UserDetailsService>, config: Config) -> Self {
        let constraints = UploadConstraints::default().with_max_file_size(config.max_upload_bytes);
        Self {
            form: SignupForm::new(),
            binder: build_binder(Arc::clone(&service)),
            service,
            config,
            constraints,
            focus: Focus::Firstname,
            upload_prompt: None,
            notice: None,
            upload: None,
            next_upload_id: 0,
            submitting: false,
            stored: None,
        }
    }

    /// Text of the form's shared status label.
    pub fn status(&self) -> Option<&str> {
        self.binder.status()
    }

    /// Handle key events, returns true if app should quit
    pub fn handle_key(&mut self, key: KeyEvent, tx: mpsc::Sender<AppEvent>) -> Result<bool> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && key.code == KeyCode::Char('c') {
            return Ok(true);
        }

        if self.upload_prompt.is_some() {
            self.handle_prompt_key(key, tx);
            return Ok(false);
        }

        match key.code {
            KeyCode::Char('s') if ctrl => self.submit(),
            KeyCode::Char('r') if ctrl => self.reset(),
            KeyCode::Esc => return Ok(true),
            KeyCode::Tab | KeyCode::Down => self.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.focus_prev(),
            KeyCode::Enter => match self.focus {
                Focus::Avatar => self.upload_prompt = Some(String::new()),
                Focus::AllowsMarketing => self.toggle_marketing(),
                Focus::Submit => self.submit(),
                _ => self.focus_next(),
            },
            KeyCode::Char(' ') if self.focus == Focus::AllowsMarketing => self.toggle_marketing(),
            KeyCode::Char(c) if !ctrl => {
                if let Some(field) = self.form.text_field_mut(self.focus) {
                    field.push(c);
                }
            }
            KeyCode::Backspace => {
                if let Some(field) = self.form.text_field_mut(self.focus) {
                    field.pop();
                }
            }
            _ => {}
        }

        Ok(false)
    }

    fn handle_prompt_key(&mut self, key: KeyEvent, tx: mpsc::Sender<AppEvent>) {
        let Some(prompt) = self.upload_prompt.as_mut() else {
            return;
        };

        match key.code {
            KeyCode::Esc => self.upload_prompt = None,
            KeyCode::Enter => {
                let path = std::mem::take(prompt);
                self.upload_prompt = None;
                if !path.trim().is_empty() {
                    self.start_upload(PathBuf::from(path.trim()), tx);
                }
            }
            KeyCode::Char(c) => prompt.push(c),
            KeyCode::Backspace => {
                prompt.pop();
            }
            _ => {}
        }
    }

    pub fn start_upload(&mut self, path: PathBuf, tx: mpsc::Sender<AppEvent>) {
        if let Some(active) = &self.upload {
            tracing::warn!(upload_id = active.id, "Avatar upload already in progress");
            self.form.avatar.on_file_rejected(TOO_MANY_FILES_MESSAGE);
            return;
        }

        let id = self.next_upload_id;
        match upload::start(id, path, self.constraints, self.config.upload_chunk_bytes, tx) {
            Ok(task) => {
                self.next_upload_id += 1;
                self.upload = Some(ActiveUpload {
                    id,
                    task: Some(task.abort_handle()),
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Avatar file rejected");
                self.form.avatar.on_file_rejected(e.to_string());
            }
        }
    }

    pub fn on_upload_event(&mut self, upload_id: u64, event: UploadEvent) {
        if self.upload.as_ref().map(|active| active.id) != Some(upload_id) {
            tracing::debug!(upload_id, "Ignoring event of a cancelled upload");
            return;
        }
        if matches!(event, UploadEvent::Succeeded | UploadEvent::Failed(_)) {
            self.upload = None;
        }

        match event {
            UploadEvent::Started { name, mime } => {
                self.form.avatar.begin_upload(&name, &mime);
            }
            UploadEvent::Chunk(bytes) => {
                if let Some(sink) = self.form.avatar.sink() {
                    sink.extend_from_slice(&bytes);
                }
            }
            UploadEvent::Succeeded => {
                if let Some(change) = self.form.avatar.on_upload_succeeded() {
                    tracing::info!(
                        replaced = change.old_value.is_some(),
                        bytes = change.value.as_ref().map_or(0, |a| a.image.len()),
                        "Avatar uploaded"
                    );
                    self.binder.validate_field(&mut self.form, "avatar");
                }
            }
            UploadEvent::Failed(reason) => self.form.avatar.on_upload_failed(reason),
        }
    }

    pub fn on_tick(&mut self, now: DateTime<Utc>) {
        let ttl = Duration::seconds(self.config.notice_seconds);
        if self
            .notice
            .as_ref()
            .is_some_and(|notice| now - notice.shown_at >= ttl)
        {
            self.notice = None;
        }
    }

    pub fn focus_next(&mut self) {
        self.move_focus(1);
    }

    pub fn focus_prev(&mut self) {
        self.move_focus(Focus::ORDER.len() - 1);
    }

    fn move_focus(&mut self, step: usize) {
        self.commit_focused();
        let len = Focus::ORDER.len();
        let mut idx = self.focus.index();
        loop {
            idx = (idx + step) % len;
            if self.form.is_focusable(Focus::ORDER[idx]) {
                break;
            }
        }
        self.focus = Focus::ORDER[idx];
    }

    /// Fires the value change of the focused field, if it was edited.
    fn commit_focused(&mut self) {
        let focus = self.focus;
        let changed = self
            .form
            .text_field_mut(focus)
            .is_some_and(|field| field.take_dirty());
        if !changed {
            return;
        }

        match focus.property() {
            Some(property) => {
                self.binder.validate_field(&mut self.form, property);
            }
            None if focus == Focus::PasswordConfirm => self.on_confirmation_changed(),
            None => {}
        }
    }

    /// The confirmation isn't bound, but editing it re-checks the form.
    fn on_confirmation_changed(&mut self) {
        let summary = self.binder.validate(&mut self.form);
        tracing::debug!(errors = summary.error_count(), "Re-validated after confirmation change");
    }

    pub fn toggle_marketing(&mut self) {
        let allowed = self.form.allows_marketing.toggle();
        self.apply_marketing_visibility(allowed);
    }

    fn apply_marketing_visibility(&mut self, allowed: bool) {
        self.form.email.set_visible(allowed);
        if !allowed {
            // hidden input must not end up in the record
            self.form.email.clear();
            if self.focus == Focus::Email {
                self.focus = Focus::AllowsMarketing;
            }
        }
    }

    pub fn submit(&mut self) {
        if self.submitting {
            tracing::debug!("Submit ignored, already submitting");
            return;
        }
        self.commit_focused();
        self.submitting = true;

        let mut details = UserDetails::default();
        if let Err(summary) = self.write(&mut details) {
            // errors are already shown next to the fields
            tracing::info!(%summary, "Signup rejected by validation");
            self.focus_first_error(&summary);
            self.submitting = false;
            return;
        }

        match self.service.store(&details) {
            Ok(()) => {
                tracing::info!(handle = %details.handle, "Signup stored");
                self.show_success(&details);
                self.stored = Some(details);
                self.reset();
            }
            Err(e) => {
                tracing::error!(error = %e, handle = %details.handle, "Storing signup failed");
                self.binder.set_status(Some(SAVE_FAILED_MESSAGE.to_string()));
            }
        }

        self.submitting = false;
    }

    fn focus_first_error(&mut self, summary: &ValidationSummary) {
        if let Some(focus) = Focus::ORDER.into_iter().find(|focus| {
            focus
                .property()
                .is_some_and(|property| summary.field_error(property).is_some())
        }) {
            self.focus = focus;
        }
    }

    fn write(&mut self, details: &mut UserDetails) -> Result<(), ValidationSummary> {
        self.binder.write_bean(&mut self.form, details)
    }

    fn show_success(&mut self, details: &UserDetails) {
        self.notice = Some(Notice {
            message: format!("Data saved, welcome {}", details.handle),
            shown_at: Utc::now(),
        });
    }

    fn cancel_upload(&mut self) {
        if let Some(active) = self.upload.take() {
            tracing::debug!(upload_id = active.id, "Cancelling avatar upload");
            if let Some(task) = active.task {
                task.abort();
            }
        }
        self.form.avatar.cancel_upload();
    }

    /// Clears every field back to an empty record.
    pub fn reset(&mut self) {
        self.binder.read_bean(&mut self.form, &UserDetails::default());
        self.form.password_confirm.reset();
        self.cancel_upload();
        self.apply_marketing_visibility(self.form.allows_marketing.value());
        self.focus = Focus::Firstname;
        self.upload_prompt = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{UploadStatus, FILE_TOO_BIG_MESSAGE};
    use crossterm::event::KeyEventKind;
    use rstest::{fixture, rstest};
    use signup_shared::{AvatarImage, InMemoryUserDetailsService};
    use std::io::Write;

    #[fixture]
    fn app() -> App {
        App::new(Arc::new(InMemoryUserDetailsService::new()), Config::default())
    }

    fn fill(field: &mut TextField, text: &str) {
        field.set_value(text.to_string());
    }

    fn fill_valid(app: &mut App) {
        fill(&mut app.form.firstname, "Ada");
        fill(&mut app.form.lastname, "Lovelace");
        fill(&mut app.form.handle, "ada_l");
        fill(&mut app.form.password, "analytical");
        fill(&mut app.form.password_confirm, "analytical");
    }

    fn track_upload(app: &mut App) -> u64 {
        let id = app.next_upload_id;
        app.next_upload_id += 1;
        app.upload = Some(ActiveUpload { id, task: None });
        id
    }

    fn started(name: &str) -> UploadEvent {
        UploadEvent::Started {
            name: name.to_string(),
            mime: "image/png".to_string(),
        }
    }

    fn png_file(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        let (tx, _rx) = mpsc::channel(1);
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)), tx.clone()).unwrap();
        }
    }

    #[rstest]
    fn test_empty_submit_shows_field_errors(mut app: App) {
        app.submit();

        assert_eq!(app.form.firstname.error(), Some("First name is required"));
        assert_eq!(app.form.handle.error(), Some("User handle is required"));
        assert_eq!(app.form.email.error(), None);
        assert!(app.notice.is_none());
        assert!(!app.submitting);
    }

    #[rstest]
    fn test_failed_submit_focuses_first_invalid_field(mut app: App) {
        fill_valid(&mut app);
        fill(&mut app.form.handle, "void");
        app.focus = Focus::Submit;

        app.submit();

        assert_eq!(app.focus, Focus::Handle);
    }

    #[rstest]
    fn test_first_store_fails_then_retry_succeeds(mut app: App) {
        fill_valid(&mut app);

        app.submit();

        assert_eq!(app.status(), Some(SAVE_FAILED_MESSAGE));
        assert_eq!(app.form.handle.text(), "ada_l");
        assert!(app.notice.is_none());

        app.submit();

        let notice = app.notice.as_ref().unwrap();
        assert_eq!(notice.message, "Data saved, welcome ada_l");
        assert_eq!(app.stored.as_ref().unwrap().handle, "ada_l");
        assert_eq!(app.status(), None);
    }

    #[rstest]
    fn test_success_resets_form(mut app: App) {
        fill_valid(&mut app);
        app.submit();
        app.submit();

        assert_eq!(app.form.firstname.text(), "");
        assert_eq!(app.form.password_confirm.text(), "");
        assert!(!app.form.password_confirm.is_touched());
        assert_eq!(app.focus, Focus::Firstname);
        assert_eq!(app.form.firstname.error(), None);
    }

    #[rstest]
    fn test_reserved_handle_blocks_submit(mut app: App) {
        fill_valid(&mut app);
        fill(&mut app.form.handle, "admin");

        app.submit();

        assert_eq!(
            app.form.handle.error(),
            Some("'admin' is not available as a handle")
        );
        assert_eq!(app.status(), None);
    }

    #[rstest]
    fn test_password_mismatch_reported_after_confirmation_edit(mut app: App) {
        fill_valid(&mut app);
        app.focus = Focus::PasswordConfirm;
        app.form.password_confirm.clear();
        type_text(&mut app, "different1");

        app.focus_next();

        assert_eq!(
            app.form.password.error(),
            Some(validation::PASSWORD_MISMATCH_MESSAGE)
        );
    }

    #[rstest]
    fn test_first_password_check_is_suppressed(mut app: App) {
        app.focus = Focus::Password;
        type_text(&mut app, "analytical");

        app.focus_next();

        assert_eq!(app.form.password.error(), None);

        app.focus = Focus::Password;
        type_text(&mut app, "!");
        app.focus_next();

        assert_eq!(
            app.form.password.error(),
            Some(validation::PASSWORD_MISMATCH_MESSAGE)
        );
    }

    #[rstest]
    fn test_marketing_toggles_email_and_clears_it(mut app: App) {
        assert!(!app.form.email.is_visible());

        app.toggle_marketing();
        fill(&mut app.form.email, "not-an-email");
        assert!(app.form.email.is_visible());

        app.toggle_marketing();

        assert!(!app.form.email.is_visible());
        assert_eq!(app.form.email.text(), "");
    }

    #[rstest]
    #[case(false, "not-an-email", true)]
    #[case(false, "", true)]
    #[case(true, "a@b.com", true)]
    #[case(true, "not-an-email", false)]
    #[case(true, "", false)]
    fn test_email_validation_follows_marketing(
        mut app: App,
        #[case] marketing: bool,
        #[case] email: &str,
        #[case] valid: bool,
    ) {
        fill_valid(&mut app);
        if marketing {
            app.toggle_marketing();
        }
        fill(&mut app.form.email, email);

        let mut details = UserDetails::default();
        let result = app.write(&mut details);

        assert_eq!(result.is_ok(), valid);
        if valid {
            assert_eq!(details.allows_marketing, marketing);
        } else {
            assert_eq!(details.handle, "");
        }
    }

    #[rstest]
    fn test_focus_skips_hidden_email(mut app: App) {
        app.focus = Focus::AllowsMarketing;

        app.focus_next();
        assert_eq!(app.focus, Focus::Submit);

        app.toggle_marketing();
        app.focus = Focus::AllowsMarketing;
        app.focus_next();
        assert_eq!(app.focus, Focus::Email);
    }

    #[rstest]
    fn test_focus_wraps_around(mut app: App) {
        app.focus_prev();

        assert_eq!(app.focus, Focus::Submit);
    }

    #[rstest]
    fn test_uploaded_avatar_is_written(mut app: App) {
        fill_valid(&mut app);
        let id = track_upload(&mut app);
        app.on_upload_event(id, started("x.png"));
        app.on_upload_event(id, UploadEvent::Chunk(vec![1, 2]));
        app.on_upload_event(id, UploadEvent::Chunk(vec![3]));
        app.on_upload_event(id, UploadEvent::Succeeded);

        let mut details = UserDetails::default();
        app.write(&mut details).unwrap();

        assert_eq!(
            details.avatar,
            Some(AvatarImage {
                name: "x.png".to_string(),
                mime: "image/png".to_string(),
                image: vec![1, 2, 3],
            })
        );
    }

    #[rstest]
    fn test_failed_upload_leaves_other_fields_alone(mut app: App) {
        fill_valid(&mut app);
        let id = track_upload(&mut app);
        app.on_upload_event(id, started("x.png"));
        app.on_upload_event(id, UploadEvent::Failed(FILE_TOO_BIG_MESSAGE.to_string()));

        assert_eq!(app.form.avatar.status(), UploadStatus::Failed);
        let mut details = UserDetails::default();
        assert!(app.write(&mut details).is_ok());
        assert_eq!(details.avatar, None);
    }

    #[rstest]
    #[tokio::test]
    async fn test_second_upload_rejected_before_first_starts(mut app: App) {
        let first = png_file(&[1, 2, 3]);
        let second = png_file(&[4, 5]);
        let (tx, mut rx) = mpsc::channel(16);

        app.start_upload(first.path().to_path_buf(), tx.clone());
        app.start_upload(second.path().to_path_buf(), tx);
        while let Some(AppEvent::Upload(message)) = rx.recv().await {
            app.on_upload_event(message.upload_id, message.event);
        }

        assert_eq!(app.form.avatar.status(), UploadStatus::HasValue);
        assert_eq!(app.form.avatar.error(), None);
        let avatar = app.form.avatar.value().unwrap();
        assert_eq!(avatar.image, vec![1, 2, 3]);
        assert_eq!(avatar.name, first.path().file_name().unwrap().to_string_lossy());
    }

    #[rstest]
    fn test_upload_started_while_receiving_does_not_fail_the_first(mut app: App) {
        let other = png_file(&[9]);
        let (tx, mut rx) = mpsc::channel(16);
        let id = track_upload(&mut app);

        app.on_upload_event(id, started("x.png"));
        app.on_upload_event(id, UploadEvent::Chunk(vec![1, 2]));
        app.start_upload(other.path().to_path_buf(), tx);
        app.on_upload_event(id, UploadEvent::Succeeded);

        assert_eq!(app.form.avatar.status(), UploadStatus::HasValue);
        assert_eq!(app.form.avatar.error(), None);
        assert_eq!(app.form.avatar.value().unwrap().image, vec![1, 2]);
        assert!(rx.try_recv().is_err());
    }

    #[rstest]
    fn test_reset_ignores_events_of_cancelled_upload(mut app: App) {
        let id = track_upload(&mut app);
        app.on_upload_event(id, started("x.png"));

        app.reset();
        app.on_upload_event(id, UploadEvent::Chunk(vec![1]));
        app.on_upload_event(id, UploadEvent::Succeeded);

        assert_eq!(app.form.avatar.status(), UploadStatus::Idle);
        assert_eq!(app.form.avatar.value(), None);
    }

    #[rstest]
    fn test_notice_expires(mut app: App) {
        let shown_at = Utc::now();
        app.notice = Some(Notice {
            message: "hi".to_string(),
            shown_at,
        });

        app.on_tick(shown_at + Duration::seconds(1));
        assert!(app.notice.is_some());

        app.on_tick(shown_at + Duration::seconds(4));
        assert!(app.notice.is_none());
    }

    #[rstest]
    fn test_ctrl_c_quits(mut app: App) {
        let (tx, _rx) = mpsc::channel(1);
        let mut event = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        event.kind = KeyEventKind::Press;

        assert!(app.handle_key(event, tx).unwrap());
    }

    #[rstest]
    fn test_typing_goes_to_focused_field(mut app: App) {
        app.focus = Focus::Lastname;

        type_text(&mut app, "Byron");

        assert_eq!(app.form.lastname.text(), "Byron");
        assert_eq!(app.form.firstname.text(), "");
    }
}
