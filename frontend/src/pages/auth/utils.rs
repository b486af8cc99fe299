use crate::{directory::Role, error::ValidationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInRequest {
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: String,
    pub agreed_to_terms: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub role: Role,
}

fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    if !email.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(email.to_string())
}

pub fn validate_sign_in(email: &str, password: &str) -> Result<SignInRequest, ValidationError> {
    let email = validate_email(email)?;
    if password.is_empty() {
        return Err(ValidationError::MissingPassword);
    }
    Ok(SignInRequest { email })
}

pub fn validate_sign_up(form: &SignUpForm) -> Result<SignUpRequest, ValidationError> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingName);
    }
    let email = validate_email(&form.email)?;
    if form.password.is_empty() {
        return Err(ValidationError::MissingPassword);
    }
    if form.password != form.confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    if !form.agreed_to_terms {
        return Err(ValidationError::TermsNotAccepted);
    }
    let role = form.role.parse::<Role>()?;
    Ok(SignUpRequest {
        name: name.to_string(),
        email,
        role,
    })
}
