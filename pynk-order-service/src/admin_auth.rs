//! One-time login codes for the kitchen admin and the tokens they unlock.

use argon2::password_hash::{rand_core::OsRng, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, PasswordHash};
use chrono::{TimeDelta, Utc};
use diesel::{insert_into, prelude::*, update};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::OrderError;
use crate::models::{AdminLoginCode, NewAdminLoginCode};
use crate::schema::admin_login_codes;

pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const CODE_LENGTH: usize = 6;
pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    exp: usize,
    iat: usize,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: i64,
}

pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Trims and upper-cases user input; `None` if it cannot be a login code.
pub fn normalize_code(input: &str) -> Option<String> {
    let code = input.trim().to_ascii_uppercase();
    if code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.contains(&b)) {
        Some(code)
    } else {
        None
    }
}

pub struct AdminAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    pub code_ttl: TimeDelta,
    pub token_ttl: TimeDelta,
}

impl AdminAuth {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            code_ttl: TimeDelta::minutes(5),
            token_ttl: TimeDelta::hours(8),
        }
    }

    /// Stores a hash of `code`, valid for `code_ttl`.
    pub fn store_code(&self, conn: &mut PgConnection, code: &str) -> Result<(), OrderError> {
        let salt = SaltString::generate(&mut OsRng);
        let code_hash = Argon2::default()
            .hash_password(code.as_bytes(), &salt)
            .map_err(|e| OrderError::Internal(format!("cannot hash login code: {e}")))?
            .to_string();
        insert_into(admin_login_codes::table)
            .values(&NewAdminLoginCode {
                code_hash,
                expires_at: Utc::now() + self.code_ttl,
            })
            .execute(conn)?;
        Ok(())
    }

    /// Marks a pending, unexpired code matching `code` as used. Returns
    /// whether one was found.
    pub fn redeem_code(&self, conn: &mut PgConnection, code: &str) -> Result<bool, OrderError> {
        let argon2 = Argon2::default();
        conn.transaction(|conn| {
            let now = Utc::now();
            let pending = admin_login_codes::table
                .select(AdminLoginCode::as_select())
                .filter(admin_login_codes::used_at.is_null())
                .filter(admin_login_codes::expires_at.gt(now))
                .order(admin_login_codes::id.desc())
                .for_update()
                .load(conn)?;
            let matched = pending.iter().find(|c| {
                PasswordHash::new(&c.code_hash)
                    .map(|hash| argon2.verify_password(code.as_bytes(), &hash).is_ok())
                    .unwrap_or(false)
            });
            let Some(matched) = matched else {
                return Ok(false);
            };
            update(admin_login_codes::table.find(matched.id))
                .set(admin_login_codes::used_at.eq(Some(now)))
                .execute(conn)?;
            Ok(true)
        })
    }

    pub fn issue_token(&self) -> Result<IssuedToken, OrderError> {
        let now = Utc::now();
        let claims = Claims {
            exp: (now + self.token_ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
            role: ADMIN_ROLE.to_string(),
        };
        let access_token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &self.encoding_key,
        )
        .map_err(|e| OrderError::Internal(format!("cannot issue token: {e}")))?;
        Ok(IssuedToken {
            access_token,
            expires_in: self.token_ttl.num_seconds(),
        })
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, OrderError> {
        let data = jsonwebtoken::decode::<Claims>(
            token,
            &self.decoding_key,
            &jsonwebtoken::Validation::default(),
        )
        .map_err(|_| OrderError::Unauthorized("Invalid token".into()))?;
        if data.claims.role != ADMIN_ROLE {
            return Err(OrderError::Unauthorized("Invalid token".into()));
        }
        Ok(data.claims)
    }
}
