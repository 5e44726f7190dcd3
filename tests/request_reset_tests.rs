mod common;

use chrono::Duration;
use recovery::{ResetError, model::{form::ForgotForm, token::{AUDIT_MAX_LEN, RawToken}}, utils::token_codec::TokenCodec};
use crate::common::{ALICE_EMAIL, ALICE_ID, Harness, RESET_BASE, RESET_PATH, t0};

#[tokio::test]
async fn test_unknown_email_succeeds_without_storing_a_token() {
    let harness = Harness::new();

    let result = harness.service.request_reset("mallory@example.com", None, None, t0()).await;

    assert_eq!(result, Ok(()));
    assert_eq!(harness.tokens.saves(), 0);
    assert!(harness.tokens.inner.is_empty());
    assert!(harness.mail.sent().is_empty());
}

#[tokio::test]
async fn test_known_and_unknown_emails_look_the_same() {
    let harness = Harness::new();

    let known = harness.service.request_reset(ALICE_EMAIL, None, None, t0()).await;
    let unknown = harness.service.request_reset("nobody@example.com", None, None, t0()).await;

    assert_eq!(known, unknown);
}

#[tokio::test]
async fn test_request_mails_a_link_with_the_raw_token() {
    let harness = Harness::new();
    let raw_token = harness.request_alice(t0()).await;

    let mail = harness.mail.last().expect("no mail sent");
    assert_eq!(mail.to, ALICE_EMAIL);
    assert_eq!(mail.subject_key, "mail.passwordreset.subject");
    assert_eq!(mail.template_name, "mail/password-reset");
    assert_eq!(mail.locale, "es");
    assert_eq!(mail.variables["ttlMinutes"], 45);

    let url = mail.reset_url().expect("no reset url");
    assert!(url.starts_with(&format!("{}{}?token=", RESET_BASE, RESET_PATH)));
    assert_eq!(raw_token.len(), 43);

    // Only the digest is stored.
    let tokens = harness.alice_tokens();
    assert_eq!(tokens.len(), 1);
    assert_ne!(tokens[0].token_digest.as_str(), raw_token);
    assert!(!url.contains(tokens[0].token_digest.as_str()));
}

#[tokio::test]
async fn test_token_expires_after_the_ttl() {
    let harness = Harness::new();
    harness.request_alice(t0()).await;

    let token = &harness.alice_tokens()[0];
    assert_eq!(token.user_id, ALICE_ID);
    assert_eq!(token.created_at, t0());
    assert_eq!(token.expires_at, t0() + Duration::minutes(45));
    assert!(token.used_at.is_none());
}

#[tokio::test]
async fn test_email_lookup_is_case_insensitive() {
    let harness = Harness::new();

    harness.service.request_reset("ALICE@Example.com", None, None, t0()).await.expect("request failed");

    assert_eq!(harness.alice_tokens().len(), 1);
}

#[tokio::test]
async fn test_audit_metadata_is_truncated() {
    let harness = Harness::new();
    let agent = "x".repeat(AUDIT_MAX_LEN * 2);

    harness.service.request_reset(ALICE_EMAIL, Some("203.0.113.7"), Some(&agent), t0()).await.expect("request failed");

    let token = &harness.alice_tokens()[0];
    assert_eq!(token.request_ip.as_deref(), Some("203.0.113.7"));
    assert_eq!(token.request_agent.as_ref().map(|a| a.chars().count()), Some(AUDIT_MAX_LEN));
}

#[tokio::test]
async fn test_a_second_request_leaves_one_live_token() {
    let harness = Harness::new();

    harness.request_alice(t0()).await;
    harness.request_alice(t0() + Duration::minutes(1)).await;

    let now = t0() + Duration::minutes(2);
    let live = harness.alice_tokens().iter().filter(|token| token.is_live(now)).count();
    assert_eq!(live, 1);
    assert_eq!(harness.alice_tokens().len(), 2);
}

#[tokio::test]
async fn test_storage_outage_is_reported() {
    let harness = Harness::new();
    harness.tokens.go_down(true);

    let result = harness.service.request_reset(ALICE_EMAIL, None, None, t0()).await;

    assert_eq!(result, Err(ResetError::Unavailable));
    assert!(harness.mail.sent().is_empty());
}

#[tokio::test]
async fn test_mail_failure_is_not_reported() {
    let harness = Harness::new();
    harness.mail.fail(true);

    let result = harness.service.request_reset(ALICE_EMAIL, None, None, t0()).await;

    // The token is stored all the same - the user can simply ask again.
    assert_eq!(result, Ok(()));
    assert_eq!(harness.tokens.saves(), 1);
    assert!(harness.mail.sent().is_empty());
}

#[tokio::test]
async fn test_blank_email_is_a_validation_error() {
    let harness = Harness::new();

    let result = harness.service.request_reset("   ", None, None, t0()).await;

    assert!(matches!(result, Err(ResetError::Validation(_))));
    assert_eq!(harness.tokens.saves(), 0);
}

#[tokio::test]
async fn test_request_form_checks_the_email_shape() {
    let harness = Harness::new();

    let bad = ForgotForm { email: "alice.example.com".to_string() };
    assert!(matches!(harness.service.request_form(&bad, None, None, t0()).await, Err(ResetError::Validation(_))));

    let good = ForgotForm { email: ALICE_EMAIL.to_string() };
    assert_eq!(harness.service.request_form(&good, None, None, t0()).await, Ok(()));
    assert_eq!(harness.tokens.saves(), 1);
}

#[tokio::test]
async fn test_every_request_mints_a_different_token() {
    let harness = Harness::new();

    let first = harness.request_alice(t0()).await;
    let second = harness.request_alice(t0() + Duration::seconds(1)).await;

    assert_ne!(first, second);

    // Each token is stored under its own digest, never the raw value.
    let stored: Vec<_> = harness.alice_tokens().into_iter().map(|token| token.token_digest).collect();
    let first_digest = TokenCodec.digest(&RawToken::from(first.as_str()));
    let second_digest = TokenCodec.digest(&RawToken::from(second.as_str()));

    assert_eq!(stored.len(), 2);
    assert_ne!(first_digest, second_digest);
    assert!(stored.contains(&first_digest));
    assert!(stored.contains(&second_digest));
    assert!(stored.iter().all(|digest| digest.as_str() != first && digest.as_str() != second));
}
