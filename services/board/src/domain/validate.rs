//! Field validators shared by the account, listing and comment use cases.
//!
//! Each validator appends messages to a [`FormErrors`] under the given field
//! name so a use case can check every field before reporting.

use bboard_domain::form::FormErrors;

pub const REQUIRED: &str = "This field is required.";

pub const USERNAME_MAX: usize = 150;
pub const EMAIL_MAX: usize = 254;
pub const NAME_MAX: usize = 150;
pub const PASSWORD_MIN: usize = 8;
pub const RUBRIC_NAME_MAX: usize = 20;
pub const TITLE_MAX: usize = 40;
pub const COMMENT_AUTHOR_MAX: usize = 30;

/// Frequently used passwords rejected at registration and password change.
const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "12345678", "123456789", "1234567890",
    "qwerty123", "qwertyuiop", "iloveyou", "sunshine", "princess", "football",
    "baseball", "welcome1", "superman", "trustno1", "abc12345", "letmein1",
    "passw0rd", "starwars", "whatever", "michael1", "dragon12", "monkey12",
    "computer", "internet", "shadow12", "master12", "1q2w3e4r", "zaq12wsx",
];

/// Image formats accepted for listing uploads.
const IMAGE_FORMATS: &[(&str, &[u8])] = &[
    ("png", b"\x89PNG\r\n\x1a\n"),
    ("jpg", b"\xff\xd8\xff"),
    ("jpeg", b"\xff\xd8\xff"),
    ("gif", b"GIF8"),
    ("webp", b"RIFF"),
];

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Non-blank and at most `max` characters. Returns the trimmed value.
pub fn required_text<'a>(
    errors: &mut FormErrors,
    field: &str,
    value: &'a str,
    max: Option<usize>,
) -> &'a str {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else if let Some(max) = max {
        max_len(errors, field, value, max);
    }
    value
}

pub fn max_len(errors: &mut FormErrors, field: &str, value: &str, max: usize) {
    let len = char_len(value);
    if len > max {
        errors.add(
            field,
            format!("Ensure this value has at most {max} characters (it has {len})."),
        );
    }
}

pub fn username(errors: &mut FormErrors, field: &str, value: &str) {
    if value.is_empty() {
        errors.add(field, REQUIRED);
        return;
    }
    max_len(errors, field, value, USERNAME_MAX);
    if !value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        errors.add(
            field,
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

pub fn email(errors: &mut FormErrors, field: &str, value: &str) {
    if value.is_empty() {
        errors.add(field, REQUIRED);
        return;
    }
    if char_len(value) > EMAIL_MAX || !is_valid_email(value) {
        errors.add(field, "Enter a valid email address.");
    }
}

fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

/// Password strength rules. `username` feeds the similarity check.
pub fn password(errors: &mut FormErrors, field: &str, value: &str, username: &str) {
    if value.is_empty() {
        errors.add(field, REQUIRED);
        return;
    }
    if char_len(value) < PASSWORD_MIN {
        errors.add(
            field,
            format!(
                "This password is too short. It must contain at least {PASSWORD_MIN} characters."
            ),
        );
    }
    let lowered = value.to_lowercase();
    let username = username.to_lowercase();
    if char_len(&username) >= 3 && (lowered.contains(&username) || username.contains(&lowered)) {
        errors.add(field, "The password is too similar to the username.");
    }
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        errors.add(field, "This password is too common.");
    }
    if value.chars().all(|c| c.is_ascii_digit()) {
        errors.add(field, "This password is entirely numeric.");
    }
}

/// Both password fields present and equal. The mismatch is reported on `field`.
pub fn password_confirmation(errors: &mut FormErrors, field: &str, first: &str, second: &str) {
    if second.is_empty() {
        errors.add(&format!("{field}_confirm"), REQUIRED);
    } else if !first.is_empty() && first != second {
        errors.add(field, "The two password fields didn't match.");
    }
}

/// Parse a price. Empty input is rejected like any other required field.
pub fn price(errors: &mut FormErrors, field: &str, value: &str) -> f64 {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
        return 0.0;
    }
    match value.replace(',', ".").parse::<f64>() {
        Ok(p) if p.is_finite() => p,
        _ => {
            errors.add(field, "Enter a number.");
            0.0
        }
    }
}

/// Upload must carry a supported extension and start with that format's signature.
pub fn image(errors: &mut FormErrors, field: &str, file_name: &str, data: &[u8]) {
    if data.is_empty() {
        errors.add(field, "The submitted file is empty.");
        return;
    }
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let Some((_, magic)) = IMAGE_FORMATS.iter().find(|(e, _)| *e == ext) else {
        errors.add(
            field,
            "Upload a valid image. Allowed formats: png, jpg, jpeg, gif, webp.",
        );
        return;
    };
    let webp_ok = ext != "webp" || data.get(8..12) == Some(b"WEBP".as_slice());
    if !data.starts_with(magic) || !webp_ok {
        errors.add(
            field,
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
        );
    }
}
