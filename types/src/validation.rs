//! Local input checks, resolved before any network call.

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

pub const MIN_USERNAME_LEN: usize = 2;
pub const MIN_TITLE_LEN: usize = 5;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;

pub fn validate_username(username: &str) -> Result<(), ClientError> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(ClientError::Validation(format!(
            "Username must be at least {MIN_USERNAME_LEN} characters."
        )));
    }
    Ok(())
}

/// A poll about to be created (`POST /polls/new`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollDraft {
    pub title: String,
    pub options: Vec<String>,
}

impl PollDraft {
    pub fn new(title: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            title: title.into(),
            options,
        }
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.title.chars().count() < MIN_TITLE_LEN {
            return Err(ClientError::Validation(format!(
                "Poll question must be at least {MIN_TITLE_LEN} characters."
            )));
        }
        if self.options.iter().any(|o| o.is_empty()) {
            return Err(ClientError::Validation("Option cannot be empty".into()));
        }
        if self.options.len() < MIN_OPTIONS {
            return Err(ClientError::Validation(format!(
                "You must have at least {MIN_OPTIONS} options."
            )));
        }
        if self.options.len() > MAX_OPTIONS {
            return Err(ClientError::Validation(format!(
                "You can have up to {MAX_OPTIONS} options."
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_length() {
        assert!(validate_username("a").is_err());
        assert!(validate_username("ab").is_ok());
        assert!(validate_username("").is_err());
    }

    #[test]
    fn draft_rules() {
        let ok = PollDraft::new("Best lunch?", vec!["Pizza".into(), "Tacos".into()]);
        assert!(ok.validate().is_ok());

        let short_title = PollDraft::new("Hi", vec!["a".into(), "b".into()]);
        assert_eq!(
            short_title.validate(),
            Err(ClientError::Validation(
                "Poll question must be at least 5 characters.".into()
            ))
        );

        let one_option = PollDraft::new("Best lunch?", vec!["Pizza".into()]);
        assert!(one_option.validate().is_err());

        let empty_option = PollDraft::new("Best lunch?", vec!["Pizza".into(), String::new()]);
        assert_eq!(
            empty_option.validate(),
            Err(ClientError::Validation("Option cannot be empty".into()))
        );

        let too_many = PollDraft::new("Best lunch?", (0..11).map(|i| i.to_string()).collect());
        assert!(too_many.validate().is_err());
    }
}
