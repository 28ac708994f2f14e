//! Typed operation identifiers.

use std::{fmt, str::FromStr};

use crate::error::VopError;

/// Catalog operations used by the client facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Add a card to an enrolled user.
    AddCard,
    /// Remove a card from an enrolled user.
    DeleteCard,
    /// Enroll a user.
    EnrollUser,
    /// Fetch a user's enrollment record.
    GetUser,
    /// Unenroll a user.
    UnenrollUser,
}

impl Operation {
    /// Every operation, in declaration order.
    pub const ALL: [Self; 5] =
        [Self::AddCard, Self::DeleteCard, Self::EnrollUser, Self::GetUser, Self::UnenrollUser];

    /// Returns the catalog `operationId`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddCard => "Users_Addcard",
            Self::DeleteCard => "Users_DeleteCard",
            Self::EnrollUser => "Users_Enroll",
            Self::GetUser => "Users_GetUserEnrollmentRecord",
            Self::UnenrollUser => "Users_UnEnroll",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = VopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| VopError::ConfigurationError(format!("Invalid operationId: {s}")))
    }
}
