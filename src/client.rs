use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::instrument;

use crate::config::{Config, GatewayConfig};
use crate::crypto::Credentials;
use crate::error::Result;
use crate::operation::{Operation, generate_buy_order};
use crate::response::{FieldMapping, Outcome, RequestContext, translate};
use crate::soap::Element;
use crate::soap::wsse::{sign_envelope, verify_response};
use crate::token::Token;

/// Raw answer of the remote endpoint, whatever its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Error status with a body that is not a SOAP document
    #[error("Remote endpoint returned status {status}")]
    Status { status: u16, body: String },
}

/// Delivers a signed envelope to the remote service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Post `envelope` for the SOAP action `action`.
    ///
    /// Error statuses are returned as responses, not errors, since the
    /// service may put a fault in them.
    async fn post(&self, action: &str, envelope: String) -> TransportResult<TransportResponse>;
}

/// HTTPS transport to the configured service endpoint
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(config: &GatewayConfig) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, action: &str, envelope: String) -> TransportResult<TransportResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{action}\""))
            .body(envelope)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

/// Signs requests, sends them and turns the answers into [`Outcome`]s.
#[derive(Clone)]
pub struct Client {
    credentials: Arc<Credentials>,
    transport: Arc<dyn Transport>,
}

impl Client {
    pub fn new(credentials: Credentials, transport: impl Transport + 'static) -> Self {
        Self {
            credentials: Arc::new(credentials),
            transport: Arc::new(transport),
        }
    }

    /// Build a client talking HTTPS to the configured endpoint.
    ///
    /// Key files are read here but parsed on the first call.
    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials = config.credentials.load()?;
        let transport = HttpTransport::new(&config.gateway)?;
        Ok(Self::new(credentials, transport))
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Run one operation end to end.
    ///
    /// Faults and untrusted responses come back as unsuccessful outcomes;
    /// only local failures and unreadable transport results are errors.
    /// The order id defaults to the operation's order field in `fields`.
    #[instrument(skip_all, fields(operation = %operation))]
    pub async fn call(
        &self,
        operation: Operation,
        fields: &FieldMapping,
        request: &RequestContext,
    ) -> Result<Outcome> {
        let payload = operation.payload(fields)?;
        let key = self.credentials.key_material()?;
        let signed = sign_envelope(payload, key)?;

        let response = self
            .transport
            .post(operation.wire_name(), signed.xml)
            .await?;

        let document = match Element::parse(&response.body) {
            Ok(document) => document,
            Err(err) if !response.is_success() => {
                tracing::warn!(status = response.status, error = %err, "Unparseable error response");
                return Err(TransportError::Status {
                    status: response.status,
                    body: response.body,
                }
                .into());
            }
            Err(err) => return Err(err.into()),
        };
        if !response.is_success() {
            tracing::info!(status = response.status, "Error status, reading body");
        }

        let mut request = request.clone();
        if request.order_id.is_none() {
            request.order_id = operation
                .order_field()
                .and_then(|field| fields.get(field))
                .cloned();
        }

        let verification = verify_response(&document)?;
        if verification.is_trusted() {
            // Reference only; a bad remote certificate never blocks a response
            match self.credentials.remote_certificate() {
                Ok(Some(remote)) => tracing::debug!(issuer = remote.issuer(), "Response accepted"),
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %err, "Remote certificate could not be parsed"),
            }
        }

        translate(&document, verification, &request)
    }

    /// Start a card inscription for `username`
    pub async fn init_inscription(
        &self,
        username: &str,
        email: &str,
        response_url: &str,
    ) -> Result<Outcome> {
        let fields = mapping([
            ("username", username),
            ("email", email),
            ("responseURL", response_url),
        ]);
        let request = RequestContext::new().with_username(username);
        self.call(Operation::InitInscription, &fields, &request).await
    }

    /// Complete an inscription. The returned user id is combined with
    /// `username` into the token later calls take.
    pub async fn finish_inscription(&self, token: &str, username: &str) -> Result<Outcome> {
        let fields = mapping([("token", token)]);
        let request = RequestContext::new().with_username(username);
        self.call(Operation::FinishInscription, &fields, &request)
            .await
    }

    pub async fn remove_user(&self, user_token: &str) -> Result<Outcome> {
        let Token { opaque, username } = Token::decode(user_token)?;
        let fields = mapping([("tbkUser", opaque.as_str()), ("username", username.as_str())]);
        self.call(Operation::RemoveUser, &fields, &RequestContext::new())
            .await
    }

    /// Charge `amount` to the card registered under `user_token`.
    ///
    /// A buy order is generated when none is given and is always present
    /// in the outcome fields.
    pub async fn authorize(
        &self,
        user_token: &str,
        amount: u64,
        buy_order: Option<&str>,
    ) -> Result<Outcome> {
        let Token { opaque, username } = Token::decode(user_token)?;
        let buy_order = buy_order.map_or_else(generate_buy_order, str::to_owned);
        let amount = amount.to_string();
        let fields = mapping([
            ("buyOrder", buy_order.as_str()),
            ("tbkUser", opaque.as_str()),
            ("username", username.as_str()),
            ("amount", amount.as_str()),
        ]);
        let request = RequestContext::new().with_username(username.as_str());
        self.call(Operation::Authorize, &fields, &request).await
    }

    pub async fn reverse(&self, buy_order: &str) -> Result<Outcome> {
        let fields = mapping([("buyorder", buy_order)]);
        self.call(Operation::Reverse, &fields, &RequestContext::new())
            .await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

fn mapping<const N: usize>(pairs: [(&str, &str); N]) -> FieldMapping {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}
