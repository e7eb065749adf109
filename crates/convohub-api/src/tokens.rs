use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use convohub_db::Database;
use convohub_types::api::{Claims, TokenPairResponse, TokenType};

/// Signing secret and lifetimes for issued tokens.
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn encode(&self, user_id: i64, username: &str, token_type: TokenType) -> Result<(String, Claims)> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let exp = Utc::now()
            .checked_add_signed(ttl)
            .with_context(|| format!("{:?} token lifetime out of range", token_type))?;
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            token_type,
            jti: Uuid::new_v4(),
            exp: exp.timestamp().max(0) as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok((token, claims))
    }

    /// Verify signature and expiry, and that the token is of the expected kind.
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;

        if data.claims.token_type != expected {
            bail!("expected {:?} token, got {:?}", expected, data.claims.token_type);
        }
        Ok(data.claims)
    }

    /// Issue an access/refresh pair and record the refresh token as outstanding
    /// so logout can revoke it later.
    pub fn issue_pair(&self, db: &Database, user_id: i64, username: &str) -> Result<TokenPairResponse> {
        let (access_token, _) = self.encode(user_id, username, TokenType::Access)?;
        let (refresh_token, claims) = self.encode(user_id, username, TokenType::Refresh)?;

        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp as i64, 0)
            .unwrap_or_default()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        db.record_outstanding_token(&claims.jti.to_string(), user_id, &refresh_token, &expires_at)?;

        Ok(TokenPairResponse {
            access_token,
            refresh_token,
            username: username.to_string(),
        })
    }
}
