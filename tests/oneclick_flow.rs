mod common;

use std::sync::{Arc, Mutex};

use common::{TestIdentity, boolean_payload, response_payload, signed_response};
use mockall::predicate::*;
use oneclick_wsse::client::TransportResult;
use oneclick_wsse::soap::Element;
use oneclick_wsse::soap::wsse::{Verification, verify_response};
use oneclick_wsse::{Client, OutcomeKind, Token, Transport, TransportResponse};

// Mock implementation of Transport for testing
mockall::mock! {
    pub Transport {}

    #[async_trait::async_trait]
    impl Transport for Transport {
        async fn post(&self, action: &str, envelope: String) -> TransportResult<TransportResponse>;
    }
}

fn ok(body: String) -> TransportResult<TransportResponse> {
    Ok(TransportResponse { status: 200, body })
}

#[tokio::test]
async fn test_inscription_then_authorize() {
    let merchant = TestIdentity::generate("597020000547", 1001);
    let server = TestIdentity::generate("webpay", 2002);

    let inscription = signed_response(
        &server,
        response_payload(
            "initInscriptionResponse",
            &[
                ("token", "e9a1b2c3d4"),
                ("urlWebpay", "https://webpay.example/inscription"),
            ],
        ),
    );
    let finished = signed_response(
        &server,
        response_payload(
            "finishInscriptionResponse",
            &[
                ("authCode", "1234"),
                ("creditCardType", "Visa"),
                ("last4CardDigits", "6623"),
                ("responseCode", "0"),
                ("tbkUser", "b6bd6ba3-e718-4107-9386-d2b099a8dd42"),
            ],
        ),
    );
    let authorized = signed_response(
        &server,
        response_payload(
            "authorizeResponse",
            &[
                ("authorizationCode", "1213"),
                ("responseCode", "0"),
                ("transactionId", "8"),
            ],
        ),
    );

    let mut transport = MockTransport::new();
    transport
        .expect_post()
        .with(eq("initInscription"), always())
        .times(1)
        .returning(move |_, _| ok(inscription.clone()));
    transport
        .expect_post()
        .with(eq("finishInscription"), function(|e: &String| e.contains("<token>e9a1b2c3d4</token>")))
        .times(1)
        .returning(move |_, _| ok(finished.clone()));
    transport
        .expect_post()
        .withf(|action, envelope| {
            action == "authorize"
                && envelope.contains("<tbkUser>b6bd6ba3-e718-4107-9386-d2b099a8dd42</tbkUser>")
                && envelope.contains("<username>Sam Lown</username>")
                && envelope.contains("<amount>15000</amount>")
        })
        .times(1)
        .returning(move |_, _| ok(authorized.clone()));

    let client = Client::new(merchant.credentials(), transport);

    let outcome = client
        .init_inscription("Sam Lown", "sam@example.com", "https://shop.example/return")
        .await
        .unwrap();
    assert!(outcome.success);
    let inscription_token = outcome.field("token").unwrap().to_owned();

    let outcome = client
        .finish_inscription(&inscription_token, "Sam Lown")
        .await
        .unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.message, "Success");
    let user_token = outcome.token().unwrap().to_owned();
    assert_eq!(
        Token::decode(&user_token).unwrap(),
        Token::new("b6bd6ba3-e718-4107-9386-d2b099a8dd42", "Sam Lown")
    );

    let outcome = client
        .authorize(&user_token, 15000, Some("20240101120000123"))
        .await
        .unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.field("authorizationCode"), Some("1213"));
    assert_eq!(outcome.field("buyOrder"), Some("20240101120000123"));
}

#[tokio::test]
async fn test_request_envelope_verifies_on_the_receiving_side() {
    let merchant = TestIdentity::generate("597020000547", 1001);
    let server = TestIdentity::generate("webpay", 2002);
    let seen = Arc::new(Mutex::new(None::<String>));

    let mut transport = MockTransport::new();
    let captured = Arc::clone(&seen);
    let answer = signed_response(&server, boolean_payload("removeUserResponse", true));
    transport
        .expect_post()
        .times(1)
        .returning(move |_, envelope| {
            *captured.lock().unwrap() = Some(envelope);
            ok(answer.clone())
        });

    let client = Client::new(merchant.credentials(), transport);
    let token = Token::new("b6bd6ba3", "Sam Lown").encode().unwrap();
    let outcome = client.remove_user(&token).await.unwrap();
    assert!(outcome.success);
    assert!(outcome.fields.is_empty());

    let sent = seen.lock().unwrap().take().unwrap();
    assert!(sent.contains("<tbkUser>b6bd6ba3</tbkUser>"));
    let document = Element::parse(&sent).unwrap();
    assert_eq!(verify_response(&document).unwrap(), Verification::Trusted);
}

#[tokio::test]
async fn test_tampered_response_is_untrusted() {
    let merchant = TestIdentity::generate("597020000547", 1001);
    let server = TestIdentity::generate("webpay", 2002);

    let answer = signed_response(
        &server,
        response_payload("authorizeResponse", &[("responseCode", "-99")]),
    )
    .replace("<responseCode>-99</responseCode>", "<responseCode>0</responseCode>");

    let mut transport = MockTransport::new();
    transport
        .expect_post()
        .times(1)
        .returning(move |_, _| ok(answer.clone()));

    let client = Client::new(merchant.credentials(), transport);
    let token = Token::new("b6bd6ba3", "Sam Lown").encode().unwrap();
    let outcome = client.authorize(&token, 1000, None).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.kind, OutcomeKind::Untrusted);
    assert!(outcome.fields.is_empty());
}

#[tokio::test]
async fn test_rejected_payment() {
    let merchant = TestIdentity::generate("597020000547", 1001);
    let server = TestIdentity::generate("webpay", 2002);

    let answer = signed_response(
        &server,
        response_payload("authorizeResponse", &[("responseCode", "-99")]),
    );
    let mut transport = MockTransport::new();
    transport
        .expect_post()
        .times(1)
        .returning(move |_, _| ok(answer.clone()));

    let client = Client::new(merchant.credentials(), transport);
    let token = Token::new("b6bd6ba3", "Sam Lown").encode().unwrap();
    let outcome = client.authorize(&token, 1000, None).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.kind, OutcomeKind::Answered);
    assert_eq!(outcome.message, "Maximum daily payment amount exceeded");
    // Generated order id is handed back to the caller
    let order = outcome.field("buyOrder").unwrap();
    assert_eq!(order.len(), 17);
}

#[tokio::test]
async fn test_fault_with_error_status() {
    let merchant = TestIdentity::generate("597020000547", 1001);
    let fault = r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <soap:Fault>
      <faultcode>soap:Server</faultcode>
      <faultstring>The security token could not be authenticated or authorized</faultstring>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#;

    let mut transport = MockTransport::new();
    transport.expect_post().times(1).returning(move |_, _| {
        Ok(TransportResponse {
            status: 500,
            body: fault.to_owned(),
        })
    });

    let client = Client::new(merchant.credentials(), transport);
    let outcome = client.reverse("20240101120000123").await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.kind, OutcomeKind::Fault);
    assert_eq!(
        outcome.message,
        "The security token could not be authenticated or authorized"
    );
    assert_eq!(outcome.field("buyOrder"), Some("20240101120000123"));
}
