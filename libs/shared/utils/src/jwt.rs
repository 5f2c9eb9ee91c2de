use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use shared_models::auth::{AuthUser, JwtClaims, JwtHeader, TokenType, UserRole};

type HmacSha256 = Hmac<Sha256>;

/// Signs an HS256 token for `user_id` that expires `ttl` from now.
pub fn issue_token(
    user_id: i64,
    role: UserRole,
    token_type: TokenType,
    ttl: Duration,
    jwt_secret: &str,
) -> Result<String, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let now = Utc::now();
    let claims = JwtClaims {
        sub: user_id.to_string(),
        role,
        token_type,
        exp: (now + ttl).timestamp().max(0) as u64,
        iat: Some(now.timestamp() as u64),
    };
    let header = JwtHeader {
        alg: "HS256".to_string(),
        typ: "JWT".to_string(),
    };

    let header_json = serde_json::to_string(&header).map_err(|e| e.to_string())?;
    let claims_json = serde_json::to_string(&claims).map_err(|e| e.to_string())?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims_json)
    );
    let signature = sign(&signing_input, jwt_secret)?;

    Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
}

fn sign(signing_input: &str, jwt_secret: &str) -> Result<Vec<u8>, String> {
    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(signing_input.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Checks signature and expiry and returns the raw claims.
pub fn decode_claims(token: &str, jwt_secret: &str) -> Result<JwtClaims, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let header_b64 = parts[0];
    let claims_b64 = parts[1];
    let signature_b64 = parts[2];

    let signature = match URL_SAFE_NO_PAD.decode(signature_b64) {
        Ok(sig) => sig,
        Err(e) => {
            debug!("Failed to decode signature: {}", e);
            return Err("Invalid signature encoding".to_string());
        }
    };

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(format!("{}.{}", header_b64, claims_b64).as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let claims_json = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| "Invalid claims encoding".to_string())?;

    let claims: JwtClaims = serde_json::from_str(&claims_json).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        "Invalid claims format".to_string()
    })?;

    let now = Utc::now().timestamp() as u64;
    if claims.exp < now {
        debug!("Token expired at {} (now: {})", claims.exp, now);
        return Err("Token expired".to_string());
    }

    Ok(claims)
}

/// Validates a token of the expected kind and turns it into a request identity.
pub fn validate_token(token: &str, jwt_secret: &str, expected: TokenType) -> Result<AuthUser, String> {
    let claims = decode_claims(token, jwt_secret)?;

    if claims.token_type != expected {
        return Err("Invalid token type".to_string());
    }

    let id: i64 = claims
        .sub
        .parse()
        .map_err(|_| "Invalid token subject".to_string())?;

    let issued_at = claims
        .iat
        .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    debug!("Token validated successfully for user: {}", id);
    Ok(AuthUser {
        id,
        role: claims.role,
        issued_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn issued_access_token_validates() {
        let token = issue_token(42, UserRole::Secretary, TokenType::Access, Duration::minutes(5), SECRET).unwrap();
        let user = validate_token(&token, SECRET, TokenType::Access).unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.role, UserRole::Secretary);
        assert!(user.issued_at.is_some());
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let token = issue_token(7, UserRole::Patient, TokenType::Refresh, Duration::days(1), SECRET).unwrap();
        assert_matches!(validate_token(&token, SECRET, TokenType::Access), Err(msg) if msg == "Invalid token type");
        assert!(validate_token(&token, SECRET, TokenType::Refresh).is_ok());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token(1, UserRole::Admin, TokenType::Access, Duration::minutes(-5), SECRET).unwrap();
        assert_matches!(decode_claims(&token, SECRET), Err(msg) if msg == "Token expired");
    }

    #[test]
    fn wrong_secret_fails_signature_check() {
        let token = issue_token(1, UserRole::Admin, TokenType::Access, Duration::minutes(5), SECRET).unwrap();
        assert_matches!(decode_claims(&token, "other"), Err(msg) if msg == "Invalid token signature");
    }

    #[test]
    fn malformed_and_unsigned_inputs_fail() {
        assert!(decode_claims("not-a-token", SECRET).is_err());
        assert!(decode_claims("a.b.c", SECRET).is_err());
        assert!(issue_token(1, UserRole::Admin, TokenType::Access, Duration::minutes(5), "").is_err());
    }
}
