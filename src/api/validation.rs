use super::ApiError;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 8;

/// Both fields must be present and non-empty.
pub fn require_credentials(
    username: Option<String>,
    password: Option<String>,
) -> Result<(String, String), ApiError> {
    match (username, password) {
        (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
            Ok((username, password))
        }
        _ => Err(ApiError::validation("Username and password are required")),
    }
}

pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(ApiError::validation(format!(
            "Username must be between {} and {} characters",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        )));
    }
    Ok(username)
}

pub fn validate_password(password: &str) -> Result<&str, ApiError> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters long",
            PASSWORD_MIN_LEN
        )));
    }
    Ok(password)
}

/// GM usernames are restricted to ASCII letters, digits and underscores.
pub fn validate_gm_username(username: &str) -> Result<&str, ApiError> {
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::validation(
            "Username can only contain letters, numbers, and underscores",
        ));
    }
    Ok(username)
}

pub fn validate_route_path(path: &str) -> Result<&str, ApiError> {
    if !path.starts_with('/') {
        return Err(ApiError::validation("Path must start with '/'"));
    }
    Ok(path)
}
