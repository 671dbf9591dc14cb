//! One-time passcode generation and validation.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::rngs::OsRng;

/// Number of digits on a code.
pub const CODE_LENGTH: usize = 6;
/// Default code lifetime in minutes.
pub const DEFAULT_TTL_MINUTES: i64 = 10;

/// Errors returned while checking a submitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OtpError {
    #[error("no active verification code")]
    NoActiveChallenge,
    #[error("invalid OTP")]
    InvalidCode,
    #[error("OTP expired")]
    ExpiredCode,
}

/// A freshly drawn code with its expiry. Persisting the pair is up to the
/// caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Challenge {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues 6-digit numeric codes with a configurable lifetime.
#[derive(Debug, Clone, Copy)]
pub struct OtpGenerator {
    ttl: Duration,
}

impl Default for OtpGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_MINUTES)
    }
}

impl OtpGenerator {
    /// Create a new [`OtpGenerator`].
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Draw a code from the full `[0, 1_000_000)` range, zero-padded:
    /// "000000" is as likely as any other code.
    pub fn issue(&self, now: DateTime<Utc>) -> Challenge {
        let code = OsRng.gen_range(0..1_000_000u32);

        Challenge {
            code: format!("{code:06}"),
            expires_at: now + self.ttl,
        }
    }
}

/// Check a submitted code against the stored pair.
///
/// The submitted value is trimmed and compared as a string, never as a
/// number. An equal but expired code reports [`OtpError::ExpiredCode`].
pub fn validate(
    submitted: &str,
    stored: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), OtpError> {
    let (Some(code), Some(expires_at)) = (stored, expires_at) else {
        return Err(OtpError::NoActiveChallenge);
    };

    if code != submitted.trim() {
        return Err(OtpError::InvalidCode);
    }

    if now >= expires_at {
        return Err(OtpError::ExpiredCode);
    }

    Ok(())
}
