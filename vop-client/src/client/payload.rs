//! Business payloads.
//!
//! Every payload carries a fresh [`CorrelationId`], the community code and the
//! community terms version.

use std::fmt;

use serde_json::{Value, json};
use uuid::Uuid;

/// Community terms version accepted by every user operation.
pub const COMMUNITY_TERMS_VERSION: &str = "1";

/// Random identifier the remote service uses to correlate one logical call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generates a new identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub(crate) fn user(community_code: &str, user_key: &str) -> Value {
    json!({
        "communityCode": community_code,
        "communityTermsVersion": COMMUNITY_TERMS_VERSION,
        "correlationId": CorrelationId::new().as_str(),
        "userKey": user_key,
    })
}

pub(crate) fn add_card(community_code: &str, user_key: &str, card: Value) -> Value {
    let mut body = user(community_code, user_key);
    body["card"] = card;
    body
}

pub(crate) fn delete_card(community_code: &str, user_key: &str, card_id: &str) -> Value {
    add_card(community_code, user_key, json!({ "cardId": card_id }))
}

pub(crate) fn enroll(community_code: &str, user_key: &str, card: Value) -> Value {
    json!({
        "correlationId": CorrelationId::new().as_str(),
        "communityTermsVersion": COMMUNITY_TERMS_VERSION,
        "userDetails": {
            "cards": [card],
            "communityCode": community_code,
            "externalUserId": user_key,
            "userKey": user_key,
        },
    })
}
