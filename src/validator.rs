use crate::errors::{Error, Result};

/// Checks action names before a back-end accepts a policy for them.
pub trait ActionValidator {
    fn validate(&self, action: &str) -> Result<()>;
}

/// Accepts any non-empty action name.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultValidator;

impl ActionValidator for DefaultValidator {
    fn validate(&self, action: &str) -> Result<()> {
        if action.is_empty() {
            return Err(Error::MissingAction);
        }
        Ok(())
    }
}
