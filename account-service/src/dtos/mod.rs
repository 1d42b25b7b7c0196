use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

// Length caps mirror the column widths in `crate::models`.

/// Rejects whitespace-only values and NUL characters, which the store cannot hold.
fn plain_text(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("must not be blank".into());
        return Err(error);
    }
    if value.contains('\0') {
        let mut error = ValidationError::new("nul");
        error.message = Some("must not contain NUL characters".into());
        return Err(error);
    }
    Ok(())
}

/// Registration payload. Not `Debug`: it carries the plaintext password.
#[derive(Deserialize, Validate)]
pub struct RegisterUserRequest {
    #[validate(
        length(min = 1, max = 255, message = "Name must be 1-255 characters"),
        custom(function = "plain_text")
    )]
    pub name: String,

    #[validate(
        email(message = "Invalid email format"),
        length(max = 320, message = "Email must be at most 320 characters")
    )]
    pub email: String,

    #[validate(
        length(min = 1, message = "Password is required"),
        custom(function = "plain_text")
    )]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddBankAccountRequest {
    #[validate(
        length(min = 1, max = 32, message = "Bank code must be 1-32 characters"),
        custom(function = "plain_text")
    )]
    pub bank_code: String,

    #[validate(
        length(min = 1, max = 255, message = "Account name must be 1-255 characters"),
        custom(function = "plain_text")
    )]
    pub account_name: String,

    #[validate(
        length(min = 1, max = 64, message = "Account number must be 1-64 characters"),
        custom(function = "plain_text")
    )]
    pub account_number: String,
}

#[derive(Debug, Serialize)]
pub struct AddBankAccountResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResolveAccountQuery {
    #[validate(
        length(min = 1, max = 32, message = "Bank code must be 1-32 characters"),
        custom(function = "plain_text")
    )]
    pub bank_code: String,

    #[validate(
        length(min = 1, max = 64, message = "Account number must be 1-64 characters"),
        custom(function = "plain_text")
    )]
    pub account_number: String,
}

#[derive(Debug, Serialize)]
pub struct ResolveAccountResponse {
    pub account_name: String,
}
