//! One-shot user notifications carried between a redirect and the next page.
//!
//! Pending messages live in a `flash` cookie holding an HS256 token signed with
//! the session secret. Queueing appends to whatever is already pending; taking
//! the messages removes the cookie so each message is shown once.

use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const FLASH_COOKIE: &str = "flash";

/// How long an unread message survives.
const FLASH_TTL_MINUTES: i64 = 10;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
    Info,
}

impl fmt::Display for FlashLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            FlashLevel::Success => "success",
            FlashLevel::Error => "error",
            FlashLevel::Info => "info",
        };
        f.write_str(level)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FlashMessage {
    level: FlashLevel,
    message: String,
}

impl FlashMessage {
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn level(&self) -> FlashLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct FlashClaims {
    exp: usize, // Expiry time of the token
    messages: Vec<FlashMessage>,
}

/// Queues a message for the next rendered page.
pub fn push(jar: CookieJar, secret: &str, level: FlashLevel, message: &str) -> CookieJar {
    let mut messages = pending(&jar, secret);
    messages.push(FlashMessage::new(level, message));

    match encode_flash(messages, secret) {
        Ok(token) => {
            let cookie = Cookie::build((FLASH_COOKIE, token))
                .http_only(true)
                .same_site(SameSite::Lax)
                .max_age(time::Duration::minutes(FLASH_TTL_MINUTES))
                .path("/")
                .build();
            jar.add(cookie)
        }
        Err(err) => {
            tracing::warn!("Dropping flash message, token encoding failed: {}", err);
            jar
        }
    }
}

/// Reads every pending message and clears the cookie.
pub fn take(jar: CookieJar, secret: &str) -> (CookieJar, Vec<FlashMessage>) {
    if jar.get(FLASH_COOKIE).is_none() {
        return (jar, Vec::new());
    }
    let messages = pending(&jar, secret);
    let jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
    (jar, messages)
}

fn pending(jar: &CookieJar, secret: &str) -> Vec<FlashMessage> {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return Vec::new();
    };
    match decode_flash(cookie.value(), secret) {
        Ok(messages) => messages,
        Err(err) => {
            tracing::debug!("Ignoring unreadable flash cookie: {}", err);
            Vec::new()
        }
    }
}

fn encode_flash(
    messages: Vec<FlashMessage>,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = (chrono::Utc::now() + chrono::Duration::minutes(FLASH_TTL_MINUTES)).timestamp();
    let claims = FlashClaims {
        exp: exp as usize,
        messages,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
}

fn decode_flash(
    token: &str,
    secret: &str,
) -> Result<Vec<FlashMessage>, jsonwebtoken::errors::Error> {
    let token_data = jsonwebtoken::decode::<FlashClaims>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
        &jsonwebtoken::Validation::default(),
    )?;
    Ok(token_data.claims.messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret";

    fn jar_with_token(token: &str) -> CookieJar {
        CookieJar::new().add(Cookie::new(FLASH_COOKIE, token.to_string()))
    }

    #[test]
    fn can_show_queued_messages_once() {
        let jar = push(CookieJar::new(), SECRET, FlashLevel::Success, "Task created successfully!");
        let token = jar.get(FLASH_COOKIE).unwrap().value().to_string();

        let (jar, messages) = take(jar_with_token(&token), SECRET);

        assert_eq!(
            messages,
            vec![FlashMessage::new(FlashLevel::Success, "Task created successfully!")]
        );
        assert!(jar.get(FLASH_COOKIE).is_none());
    }

    #[test]
    fn can_accumulate_messages_until_read() {
        let jar = push(CookieJar::new(), SECRET, FlashLevel::Error, "Task not found.");
        let jar = push(jar, SECRET, FlashLevel::Info, "Task deleted.");

        let (_, messages) = take(jar, SECRET);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].level(), FlashLevel::Error);
        assert_eq!(messages[1].message(), "Task deleted.");
    }

    #[test]
    fn ignores_cookie_signed_with_another_secret() {
        let jar = push(CookieJar::new(), "other_secret", FlashLevel::Info, "Task deleted.");
        let token = jar.get(FLASH_COOKIE).unwrap().value().to_string();

        let (jar, messages) = take(jar_with_token(&token), SECRET);

        assert!(messages.is_empty());
        assert!(jar.get(FLASH_COOKIE).is_none());
    }

    #[test]
    fn ignores_garbage_cookie() {
        let (_, messages) = take(jar_with_token("not-a-token"), SECRET);
        assert!(messages.is_empty());
    }

    #[test]
    fn returns_nothing_without_cookie() {
        let (jar, messages) = take(CookieJar::new(), SECRET);
        assert!(messages.is_empty());
        assert!(jar.iter().next().is_none());
    }

    #[test]
    fn renders_levels_as_css_friendly_names() {
        assert_eq!(FlashLevel::Success.to_string(), "success");
        assert_eq!(FlashLevel::Error.to_string(), "error");
        assert_eq!(FlashLevel::Info.to_string(), "info");
    }
}
