use std::time::Duration;

use fleetca_client::{EndpointType, Registry, RegistryClient, RegistryError};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> RegistryClient {
    RegistryClient::builder(server.uri())
        .token("test-token")
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap()
}

#[tokio::test]
async fn fetches_registration_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/registration-code"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "registrationCode": "f00dcafe1234" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let code = client(&server).fetch_registration_code().await.unwrap();
    assert_eq!(code.as_str(), "f00dcafe1234");
}

#[tokio::test]
async fn registers_ca_with_activation_flags() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register-ca"))
        .and(body_json(json!({
            "caCertificate": "CA PEM",
            "verificationCertificate": "VERIFICATION PEM",
            "activate": true,
            "autoRegister": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "certificateId": "abc" })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .register_ca("CA PEM", "VERIFICATION PEM")
        .await
        .unwrap();
}

#[tokio::test]
async fn resolves_data_plane_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/endpoint"))
        .and(query_param("type", "data-plane"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "endpointAddress": "abc123-ats.iot.example.com" })),
        )
        .mount(&server)
        .await;

    let endpoint = client(&server)
        .resolve_endpoint(EndpointType::DataPlane)
        .await
        .unwrap();
    assert_eq!(endpoint.address, "abc123-ats.iot.example.com");
}

#[tokio::test]
async fn base_path_is_preserved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/registration-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "registrationCode": "c0de" })))
        .mount(&server)
        .await;

    let client = RegistryClient::new(format!("{}/api/v1", server.uri())).unwrap();
    assert_eq!(client.fetch_registration_code().await.unwrap().as_str(), "c0de");
}

#[tokio::test]
async fn unauthorized_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/registration-code"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "bad token" })))
        .mount(&server)
        .await;

    let err = client(&server).fetch_registration_code().await.unwrap_err();
    assert!(err.is_auth_error());
    assert_eq!(err.status_code(), Some(401));
}

#[tokio::test]
async fn api_error_carries_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register-ca"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "message": "CA already registered" })),
        )
        .mount(&server)
        .await;

    let err = client(&server).register_ca("a", "b").await.unwrap_err();
    match err {
        RegistryError::Api { code, message } => {
            assert_eq!(code, 409);
            assert_eq!(message, "CA already registered");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/registration-code"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/endpoint"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "endpointAddress": "" })))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(matches!(
        client.fetch_registration_code().await.unwrap_err(),
        RegistryError::MalformedResponse(_)
    ));
    assert!(matches!(
        client.resolve_endpoint(EndpointType::DataPlane).await.unwrap_err(),
        RegistryError::MalformedResponse(_)
    ));
}

#[tokio::test]
async fn slow_registry_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/registration-code"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "registrationCode": "late" }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = RegistryClient::builder(server.uri())
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let err = client.fetch_registration_code().await.unwrap_err();
    assert!(matches!(err, RegistryError::Timeout(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unreachable_registry_is_connection_error() {
    // Nothing listens on the TCP port 1 of the loopback interface.
    let err = RegistryClient::new("http://127.0.0.1:1")
        .unwrap()
        .fetch_registration_code()
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Connection(_)));
}
