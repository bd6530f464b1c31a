//! ID-Token Claims and Role Checks
//!
//! The alerts feature is gated on a role claim carried in a pasted Google ID
//! token (a JWT). This is demo-grade RBAC: the payload segment is decoded and
//! parsed, but the signature is NOT verified. Do not reuse this as a
//! production authorization layer.
//!
//! Role extraction accepts the common claim spellings: a `roles` array, a
//! single `role` string, or a `groups` array. Service accounts (subjects
//! ending in `gserviceaccount.com`) implicitly receive the required role.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;

/// Role required to query weather alerts, unless overridden via env
pub const DEFAULT_REQUIRED_ROLE: &str = "alerts:read";

/// Environment variable overriding the required role
pub const REQUIRED_ROLE_ENV: &str = "REQUIRED_ROLE";

/// The role a user must hold for the alerts feature
pub fn required_role() -> String {
    std::env::var(REQUIRED_ROLE_ENV).unwrap_or_else(|_| DEFAULT_REQUIRED_ROLE.to_string())
}

/// Decode a base64url segment, tolerating both padded and unpadded input
fn b64url_decode(segment: &str) -> Option<Vec<u8>> {
    URL_SAFE_NO_PAD.decode(segment.trim_end_matches('=')).ok()
}

/// Parse the claims payload of a JWT without verifying its signature
///
/// Returns `None` for anything that is not `<segment>.<segment>[...]` with a
/// base64url-encoded JSON object in the second segment. Never panics.
pub fn parse_claims(token: &str) -> Option<Value> {
    let payload = token.split('.').nth(1)?;
    let bytes = b64url_decode(payload)?;
    serde_json::from_slice(&bytes).ok()
}

/// The authenticated caller, as far as this demo trusts the pasted token
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserContext {
    /// Token subject (`sub` claim), empty string when absent
    pub subject: String,

    /// Roles extracted from the claims
    pub roles: Vec<String>,
}

impl UserContext {
    /// Build a user context from a raw ID token
    ///
    /// `required_role` is granted implicitly to service-account subjects.
    /// Returns `None` when the token cannot be parsed.
    pub fn from_token(token: &str, required_role: &str) -> Option<Self> {
        let claims = parse_claims(token.trim())?;

        let subject = claims
            .get("sub")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        let mut roles = extract_roles(&claims);

        if subject.ends_with("gserviceaccount.com") && !roles.iter().any(|r| r == required_role) {
            roles.push(required_role.to_string());
        }

        Some(Self { subject, roles })
    }

    /// Whether this user holds the given role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Pull a role list out of the claims, trying the common spellings in order
fn extract_roles(claims: &Value) -> Vec<String> {
    if let Some(roles) = claims.get("roles").and_then(Value::as_array) {
        return string_items(roles);
    }
    if let Some(role) = claims.get("role").and_then(Value::as_str) {
        return vec![role.to_string()];
    }
    if let Some(groups) = claims.get("groups").and_then(Value::as_array) {
        return string_items(groups);
    }
    Vec::new()
}

fn string_items(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    /// Assemble an unsigned JWT around the given claims
    fn make_token(claims: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
        format!("{}.{}.sig", header, payload)
    }

    #[test]
    fn test_parse_claims_round_trip() {
        let claims = json!({"sub": "alice@example.com", "roles": ["alerts:read"]});
        let token = make_token(&claims);

        assert_eq!(parse_claims(&token), Some(claims));
    }

    #[test]
    fn test_parse_claims_accepts_padded_segments() {
        use base64::engine::general_purpose::URL_SAFE;

        let claims = json!({"sub": "bob"});
        let header = URL_SAFE.encode(br#"{"alg":"none"}"#);
        let payload = URL_SAFE.encode(serde_json::to_vec(&claims).unwrap());
        let token = format!("{}.{}.sig", header, payload);

        assert_eq!(parse_claims(&token), Some(claims));
    }

    #[test]
    fn test_parse_claims_rejects_garbage() {
        assert!(parse_claims("").is_none());
        assert!(parse_claims("no-dots-here").is_none());
        assert!(parse_claims("a.%%%.c").is_none());
        assert!(parse_claims("a.bm90IGpzb24.c").is_none()); // "not json"
    }

    #[test]
    fn test_roles_array_claim() {
        let token = make_token(&json!({"sub": "alice", "roles": ["alerts:read", "admin"]}));
        let ctx = UserContext::from_token(&token, "alerts:read").unwrap();

        assert_eq!(ctx.subject, "alice");
        assert_eq!(ctx.roles, vec!["alerts:read", "admin"]);
        assert!(ctx.has_role("alerts:read"));
        assert!(!ctx.has_role("superuser"));
    }

    #[test]
    fn test_single_role_claim() {
        let token = make_token(&json!({"sub": "bob", "role": "viewer"}));
        let ctx = UserContext::from_token(&token, "alerts:read").unwrap();

        assert_eq!(ctx.roles, vec!["viewer"]);
        assert!(!ctx.has_role("alerts:read"));
    }

    #[test]
    fn test_groups_claim_used_as_fallback() {
        let token = make_token(&json!({"sub": "carol", "groups": ["alerts:read"]}));
        let ctx = UserContext::from_token(&token, "alerts:read").unwrap();

        assert!(ctx.has_role("alerts:read"));
    }

    #[test]
    fn test_roles_takes_precedence_over_groups() {
        let token = make_token(&json!({
            "sub": "dave",
            "roles": ["viewer"],
            "groups": ["alerts:read"]
        }));
        let ctx = UserContext::from_token(&token, "alerts:read").unwrap();

        assert_eq!(ctx.roles, vec!["viewer"]);
    }

    #[test]
    fn test_service_account_gets_required_role() {
        let token = make_token(&json!({"sub": "bot@project.iam.gserviceaccount.com"}));
        let ctx = UserContext::from_token(&token, "alerts:read").unwrap();

        assert!(ctx.has_role("alerts:read"));
    }

    #[test]
    fn test_service_account_role_not_duplicated() {
        let token = make_token(&json!({
            "sub": "bot@project.iam.gserviceaccount.com",
            "roles": ["alerts:read"]
        }));
        let ctx = UserContext::from_token(&token, "alerts:read").unwrap();

        assert_eq!(ctx.roles, vec!["alerts:read"]);
    }

    #[test]
    fn test_non_string_role_entries_are_skipped() {
        let token = make_token(&json!({"sub": "eve", "roles": ["alerts:read", 42, null]}));
        let ctx = UserContext::from_token(&token, "alerts:read").unwrap();

        assert_eq!(ctx.roles, vec!["alerts:read"]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Token parsing must absorb arbitrary input without panicking
            #[test]
            fn parse_claims_never_panics(token in ".*") {
                let _ = parse_claims(&token);
            }

            #[test]
            fn from_token_never_panics(token in ".*", role in "[a-z:]{1,16}") {
                let _ = UserContext::from_token(&token, &role);
            }
        }
    }
}
