//! Typed form inputs and their validation rules.
//!
//! Each form is deserialized into a plain input struct and validated by an
//! explicit function that collects every problem into [`FieldErrors`], so a
//! re-rendered form can show all messages at once.

use bytes::Bytes;
use serde::Deserialize;

pub const USERNAME_MAX_CHARS: usize = 150;
pub const NAME_MAX_CHARS: usize = 150;
pub const PASSWORD_MIN_CHARS: usize = 8;

const NON_FIELD: &str = "__all__";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Record an error that belongs to the form as a whole.
    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.add(NON_FIELD, message);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn for_field(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|error| error.field == field)
            .map(|error| error.message.as_str())
            .collect()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }

    pub fn non_field(&self) -> Vec<&str> {
        self.for_field(NON_FIELD)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self
            .errors
            .iter()
            .map(|error| format!("{}: {}", error.field, error.message))
            .collect();
        f.write_str(&rendered.join("; "))
    }
}

/// An uploaded file buffered from a multipart body.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub data: Bytes,
}

/// Raw post form as submitted. `group` is the selected group id or empty.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub text: String,
    pub group: String,
    pub image: Option<ImageUpload>,
}

/// Urlencoded subset of [`PostInput`] (no file field).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostFields {
    pub text: String,
    pub group: String,
}

impl From<PostFields> for PostInput {
    fn from(fields: PostFields) -> Self {
        Self {
            text: fields.text,
            group: fields.group,
            image: None,
        }
    }
}

/// Post fields after shape validation; group existence is checked against storage later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPost {
    pub text: String,
    pub group_id: Option<i64>,
}

pub fn validate_post(input: &PostInput) -> Result<ValidPost, FieldErrors> {
    let mut errors = FieldErrors::new();

    let text = input.text.trim();
    if text.is_empty() {
        errors.add("text", "This field is required.");
    }

    let group_id = match parse_group(&input.group) {
        Ok(group_id) => group_id,
        Err(message) => {
            errors.add("group", message);
            None
        }
    };

    if let Some(image) = input.image.as_ref()
        && let Err(message) = validate_image(image)
    {
        errors.add("image", message);
    }

    errors.into_result()?;
    Ok(ValidPost {
        text: text.to_string(),
        group_id,
    })
}

fn parse_group(raw: &str) -> Result<Option<i64>, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .map(Some)
        .ok_or("Select a valid choice. That choice is not one of the available choices.")
}

/// The payload must decode as a known raster image format.
pub fn validate_image(image: &ImageUpload) -> Result<(), &'static str> {
    if image.data.is_empty() {
        return Err("The submitted file is empty.");
    }
    let recognised = imagesize::image_type(&image.data).is_ok()
        && imagesize::blob_size(&image.data).is_ok_and(|size| size.width > 0 && size.height > 0);
    if recognised {
        Ok(())
    } else {
        Err("Upload a valid image. The file you uploaded was either not an image or a corrupted image.")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentInput {
    pub text: String,
}

pub fn validate_comment(input: &CommentInput) -> Result<String, FieldErrors> {
    let text = input.text.trim();
    if text.is_empty() {
        return Err(FieldErrors::single("text", "This field is required."));
    }
    Ok(text.to_string())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignupInput {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

/// Shape checks for signup; username uniqueness is checked by the account service.
pub fn validate_signup(input: &SignupInput) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    let username = input.username.trim();
    if username.is_empty() {
        errors.add("username", "This field is required.");
    } else if username.chars().count() > USERNAME_MAX_CHARS {
        errors.add(
            "username",
            format!("Ensure this value has at most {USERNAME_MAX_CHARS} characters."),
        );
    } else if !username.chars().all(is_username_char) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }

    for (field, value) in [
        ("first_name", &input.first_name),
        ("last_name", &input.last_name),
    ] {
        if value.trim().chars().count() > NAME_MAX_CHARS {
            errors.add(
                field,
                format!("Ensure this value has at most {NAME_MAX_CHARS} characters."),
            );
        }
    }

    let email = input.email.trim();
    if email.is_empty() {
        errors.add("email", "This field is required.");
    } else if !looks_like_email(email) {
        errors.add("email", "Enter a valid email address.");
    }

    if input.password1.is_empty() {
        errors.add("password1", "This field is required.");
    } else if input.password1.chars().count() < PASSWORD_MIN_CHARS {
        errors.add(
            "password1",
            format!(
                "This password is too short. It must contain at least {PASSWORD_MIN_CHARS} characters."
            ),
        );
    }
    if input.password2.is_empty() {
        errors.add("password2", "This field is required.");
    } else if input.password1 != input.password2 {
        errors.add("password2", "The two password fields didn't match.");
    }

    errors.into_result()
}

fn is_username_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '.' | '@' | '+' | '-')
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
    pub next: String,
}

pub fn validate_login(input: &LoginInput) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if input.username.trim().is_empty() {
        errors.add("username", "This field is required.");
    }
    if input.password.is_empty() {
        errors.add("password", "This field is required.");
    }
    errors.into_result()
}

/// Accept a post-login redirect target only when it stays on this site.
pub fn safe_next(next: Option<&str>) -> Option<String> {
    let next = next?.trim();
    let local = next.starts_with('/')
        && !next.starts_with("//")
        && !next.starts_with("/\\")
        && !next.chars().any(|ch| ch.is_control());
    local.then(|| next.to_string())
}
