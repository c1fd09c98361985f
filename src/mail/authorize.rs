//! One-time Gmail consent using the installed-app loopback flow with PKCE.
//!
//! Runs from the `authorize` subcommand, never from request handling. The
//! resulting token is written to the same store the credential manager reads.

use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpListener,
};
use url::Url;

use super::credentials::{request_token, ClientSecrets, CredentialError, OAuthToken, TokenStore};

pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(120);

struct Pkce {
    verifier: String,
    challenge: String,
}

fn random_token(len: usize) -> Result<String, CredentialError> {
    let mut bytes = vec![0u8; len];
    getrandom::fill(&mut bytes)
        .map_err(|err| CredentialError::Flow(format!("random generator unavailable: {err}")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

impl Pkce {
    fn new() -> Result<Self, CredentialError> {
        let verifier = random_token(32)?;
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Ok(Self {
            verifier,
            challenge,
        })
    }
}

fn consent_url(
    secrets: &ClientSecrets,
    redirect_uri: &str,
    challenge: &str,
    state: &str,
) -> Result<Url, CredentialError> {
    Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", GMAIL_READONLY_SCOPE),
            ("code_challenge", challenge),
            ("code_challenge_method", "S256"),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", state),
        ],
    )
    .map_err(|err| CredentialError::Flow(format!("invalid auth_uri: {err}")))
}

/// Pulls the authorization code out of the redirect's request line,
/// rejecting provider errors and state mismatches.
fn parse_callback(request_line: &str, expected_state: &str) -> Result<String, CredentialError> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| CredentialError::Flow("malformed callback request".into()))?;
    let url = Url::parse("http://127.0.0.1")
        .and_then(|base| base.join(target))
        .map_err(|err| CredentialError::Flow(format!("malformed callback target: {err}")))?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(CredentialError::Flow(format!("consent denied: {error}")));
    }
    if state.as_deref() != Some(expected_state) {
        return Err(CredentialError::Flow("state parameter mismatch".into()));
    }
    code.ok_or_else(|| CredentialError::Flow("callback carried no authorization code".into()))
}

/// Accepts connections until one carries a request line. Browsers may open
/// speculative connections that never send anything; those are skipped.
async fn wait_for_code(
    listener: &TcpListener,
    expected_state: &str,
) -> Result<String, CredentialError> {
    loop {
        let (mut stream, _) = listener
            .accept()
            .await
            .map_err(|err| CredentialError::Flow(format!("callback listener failed: {err}")))?;

        let mut request_line = String::new();
        if let Err(err) = BufReader::new(&mut stream).read_line(&mut request_line).await {
            tracing::debug!(target: "gmail", error = %err, "dropped unreadable callback");
            continue;
        }
        if request_line.split_whitespace().nth(1).is_none() {
            tracing::debug!(target: "gmail", "skipped callback connection without a request");
            continue;
        }

        let outcome = parse_callback(&request_line, expected_state);
        let page = match &outcome {
            Ok(_) => "<h1>Authorization complete</h1><p>You can close this window.</p>",
            Err(_) => "<h1>Authorization failed</h1><p>Check the terminal for details.</p>",
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\n\
             Content-Type: text/html\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n\
             {page}",
            page.len()
        );
        if let Err(err) = stream.write_all(response.as_bytes()).await {
            tracing::debug!(target: "gmail", error = %err, "failed to answer consent callback");
        }
        return outcome;
    }
}

/// Runs the consent flow end to end and persists the resulting token.
pub async fn run_consent_flow(
    secrets: &ClientSecrets,
    http: &Client,
    store: &TokenStore,
) -> Result<OAuthToken, CredentialError> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|err| CredentialError::Flow(format!("cannot bind loopback listener: {err}")))?;
    let port = listener
        .local_addr()
        .map_err(|err| CredentialError::Flow(err.to_string()))?
        .port();
    let redirect_uri = format!("http://127.0.0.1:{port}");

    let pkce = Pkce::new()?;
    let state = random_token(16)?;
    let url = consent_url(secrets, &redirect_uri, &pkce.challenge, &state)?;

    println!("Open this URL in a browser to grant read-only Gmail access:\n\n{url}\n");
    tracing::info!(target: "gmail", %redirect_uri, "waiting for consent callback");

    let code = tokio::time::timeout(CALLBACK_TIMEOUT, wait_for_code(&listener, &state))
        .await
        .map_err(|_| CredentialError::Flow("timed out waiting for consent".into()))??;

    let mut params = vec![
        ("client_id", secrets.client_id.as_str()),
        ("code", code.as_str()),
        ("redirect_uri", redirect_uri.as_str()),
        ("grant_type", "authorization_code"),
        ("code_verifier", pkce.verifier.as_str()),
    ];
    if let Some(secret) = secrets.client_secret.as_deref() {
        params.push(("client_secret", secret));
    }

    let token = request_token(http, &secrets.token_uri, &params)
        .await?
        .into_token(None);
    if token.refresh_token.is_none() {
        tracing::warn!(
            target: "gmail",
            "consent returned no refresh token; re-run authorize when the access token expires"
        );
    }
    store.save(&token)?;
    tracing::info!(target: "gmail", path = %store.path().display(), "Gmail credential stored");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use tokio::{io::AsyncReadExt, net::TcpStream};

    use super::*;

    #[test]
    fn extracts_code_when_state_matches() {
        let code = parse_callback("GET /?state=abc&code=4%2F0Ad HTTP/1.1\r\n", "abc").unwrap();
        assert_eq!(code, "4/0Ad");
    }

    #[test]
    fn rejects_state_mismatch() {
        let err = parse_callback("GET /?state=evil&code=x HTTP/1.1", "abc").unwrap_err();
        assert!(err.to_string().contains("state"));
    }

    #[test]
    fn surfaces_provider_error() {
        let err =
            parse_callback("GET /?error=access_denied&state=abc HTTP/1.1", "abc").unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }

    #[tokio::test]
    async fn skips_connections_that_send_nothing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let browser = tokio::spawn(async move {
            drop(TcpStream::connect(addr).await.unwrap());
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET /?state=abc&code=xyz HTTP/1.1\r\n")
                .await
                .unwrap();
            let mut page = String::new();
            stream.read_to_string(&mut page).await.unwrap();
            page
        });

        assert_eq!(wait_for_code(&listener, "abc").await.unwrap(), "xyz");
        let page = browser.await.unwrap();
        assert!(page.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(page.contains("Authorization complete"));
    }

    #[test]
    fn consent_url_requests_offline_readonly_access() {
        let secrets: ClientSecrets = serde_json::from_str(r#"{"client_id": "id-123"}"#).unwrap();
        let url = consent_url(&secrets, "http://127.0.0.1:9999", "chal", "st").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("scope".into(), GMAIL_READONLY_SCOPE.into())));
        assert!(pairs.contains(&("access_type".into(), "offline".into())));
        assert!(pairs.contains(&("client_id".into(), "id-123".into())));
    }

    #[test]
    fn pkce_challenge_is_sha256_of_verifier() {
        let pkce = Pkce::new().unwrap();
        let expected = URL_SAFE_NO_PAD.encode(Sha256::digest(pkce.verifier.as_bytes()));
        assert_eq!(pkce.challenge, expected);
    }
}
