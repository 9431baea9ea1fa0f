use std::io::{Read, Write};
use std::net::TcpListener;

use reqwest::Client;
use url::Url;

use scantrack_core::models::Session;

use super::error::SupabaseError;
use super::types::TokenResponse;
use crate::traits::SessionProvider;

const OAUTH_PROVIDER: &str = "google";

/// GoTrue session provider: Google sign-in through the Supabase auth server.
pub struct SupabaseAuth {
    base_url: String,
    anon_key: String,
    redirect_port: u16,
    http: Client,
}

impl SupabaseAuth {
    pub fn new(base_url: &str, anon_key: &str, redirect_port: u16) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            redirect_port,
            http: Client::new(),
        }
    }

    fn redirect_uri(&self) -> String {
        format!("http://localhost:{}", self.redirect_port)
    }

    /// The consent URL the browser is sent to.
    ///
    /// GoTrue accepts the `plain` PKCE method, so the challenge is the
    /// verifier itself.
    pub fn authorize_url(&self, verifier: &str) -> Result<Url, SupabaseError> {
        Url::parse_with_params(
            &format!("{}/auth/v1/authorize", self.base_url),
            &[
                ("provider", OAUTH_PROVIDER),
                ("redirect_to", self.redirect_uri().as_str()),
                ("code_challenge", verifier),
                ("code_challenge_method", "plain"),
            ],
        )
        .map_err(|e| SupabaseError::Auth(format!("invalid Supabase URL: {e}")))
    }

    /// Exchange the redirect's auth code for a session.
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
    ) -> Result<Session, SupabaseError> {
        let resp = self
            .http
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "pkce")])
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({
                "auth_code": code,
                "code_verifier": verifier,
            }))
            .send()
            .await?;

        let token = Self::read_token(resp).await?;
        token.into_session(None)
    }

    async fn read_token(resp: reqwest::Response) -> Result<TokenResponse, SupabaseError> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SupabaseError::Api {
                status,
                message: body,
            });
        }

        resp.json::<TokenResponse>()
            .await
            .map_err(|e| SupabaseError::Parse(e.to_string()))
    }
}

impl SessionProvider for SupabaseAuth {
    type Error = SupabaseError;

    fn name(&self) -> &'static str {
        "supabase"
    }

    /// Run the sign-in flow.
    ///
    /// 1. Bind the loopback listener and generate a PKCE verifier.
    /// 2. Open the browser to the consent page.
    /// 3. Wait for the redirect carrying `?code=...`.
    /// 4. Exchange the code for a session.
    async fn sign_in(&self) -> Result<Session, SupabaseError> {
        let listener = TcpListener::bind(("127.0.0.1", self.redirect_port)).map_err(|e| {
            SupabaseError::Auth(format!(
                "failed to bind localhost:{}: {e}",
                self.redirect_port
            ))
        })?;

        let verifier = generate_verifier();
        let auth_url = self.authorize_url(&verifier)?;

        tracing::info!("Opening Supabase sign-in URL in browser");
        open::that(auth_url.as_str())
            .map_err(|e| SupabaseError::Auth(format!("failed to open browser: {e}")))?;

        tracing::info!(port = self.redirect_port, "Waiting for sign-in redirect");
        let code = tokio::task::spawn_blocking(move || listen_for_redirect(listener))
            .await
            .map_err(|e| SupabaseError::Auth(format!("redirect listener panicked: {e}")))??;

        self.exchange_code(&code, &verifier).await
    }

    async fn refresh(&self, session: &Session) -> Result<Session, SupabaseError> {
        let refresh_token = session
            .refresh_token
            .as_deref()
            .ok_or_else(|| SupabaseError::Auth("session has no refresh token".into()))?;

        let resp = self
            .http
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let token = Self::read_token(resp).await?;
        tracing::debug!(user = %session.user_id, "Refreshed Supabase session");
        token.into_session(Some(session))
    }

    async fn sign_out(&self, session: &Session) -> Result<(), SupabaseError> {
        let resp = self
            .http
            .post(format!("{}/auth/v1/logout", self.base_url))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SupabaseError::Api {
                status,
                message: body,
            });
        }
        Ok(())
    }
}

// ── Internals ───────────────────────────────────────────────────

/// Generate a random 64-character URL-safe PKCE verifier.
fn generate_verifier() -> String {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    const LEN: usize = 64;
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

    let mut out = String::with_capacity(LEN);
    while out.len() < LEN {
        let mut h = RandomState::new().build_hasher();
        h.write_usize(out.len());
        for byte in h.finish().to_le_bytes() {
            if out.len() < LEN {
                out.push(CHARS[(byte as usize) % CHARS.len()] as char);
            }
        }
    }
    out
}

/// Accept one connection, answer it, and return the auth code it carried.
fn listen_for_redirect(listener: TcpListener) -> Result<String, SupabaseError> {
    let (mut stream, _) = listener
        .accept()
        .map_err(|e| SupabaseError::Auth(format!("failed to accept connection: {e}")))?;

    let mut buf = [0u8; 4096];
    let n = stream
        .read(&mut buf)
        .map_err(|e| SupabaseError::Auth(format!("failed to read from stream: {e}")))?;
    let request = String::from_utf8_lossy(&buf[..n]);

    let result = parse_redirect(&request);
    let body = match &result {
        Ok(_) => "<h2>Signed in!</h2><p>You can close this tab and return to scantrack.</p>",
        Err(_) => "<h2>Sign-in failed.</h2><p>Check the terminal for details.</p>",
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n<html><body>{body}</body></html>"
    );
    let _ = stream.write_all(response.as_bytes());

    result
}

/// Pull the `code` out of a raw redirect request such as
/// `GET /?code=... HTTP/1.1`.
pub fn parse_redirect(request: &str) -> Result<String, SupabaseError> {
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .ok_or_else(|| SupabaseError::Auth("malformed HTTP request from redirect".into()))?;

    let parsed = Url::parse(&format!("http://localhost{path}"))
        .map_err(|e| SupabaseError::Auth(format!("failed to parse redirect URL: {e}")))?;

    let mut code = None;
    let mut error = None;
    for (k, v) in parsed.query_pairs() {
        match k.as_ref() {
            "code" => code = Some(v.into_owned()),
            "error_description" => error = Some(v.into_owned()),
            "error" if error.is_none() => error = Some(v.into_owned()),
            _ => {}
        }
    }

    match (code, error) {
        (Some(code), _) if !code.is_empty() => Ok(code),
        (_, Some(error)) => Err(SupabaseError::Auth(format!("sign-in rejected: {error}"))),
        _ => Err(SupabaseError::Auth("no 'code' parameter in redirect".into())),
    }
}
