use std::collections::HashMap;
use std::time::{Duration, Instant};

use simple_oauthclient::auth::{AuthorizationFlow, FlowError, FlowState, HttpTokenExchange, TokenExchangeError};
use simple_oauthclient::core::models::AuthorizationRequest;
use simple_oauthclient::core::types::{ClientId, ClientSecret, RedirectUri, Scope};
use simple_oauthclient::{FlowSettings, PendingAuthorization};

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(token_endpoint: String) -> AuthorizationRequest {
    AuthorizationRequest {
        client_id: ClientId("id1".to_string()),
        client_secret: ClientSecret("sec1".to_string()),
        authorize_endpoint: "https://auth.example.com/oauth/authorize".to_string(),
        token_endpoint,
        scope: Scope::from_parts(vec!["read".to_string()]),
        redirect_uri: RedirectUri("http://127.0.0.1:0/".to_string()),
    }
}

fn settings() -> FlowSettings {
    FlowSettings {
        timeout: Duration::from_secs(10),
        shutdown_delay: Duration::from_millis(100),
        open_browser: false,
        ..FlowSettings::default()
    }
}

fn prepare(token_endpoint: String, settings: &FlowSettings) -> PendingAuthorization<HttpTokenExchange> {
    let exchange = HttpTokenExchange::new(true).unwrap();
    let flow = AuthorizationFlow::new(request(token_endpoint), exchange);
    PendingAuthorization::prepare(flow, settings).unwrap()
}

fn state_of(pending: &PendingAuthorization<HttpTokenExchange>) -> String {
    let params: HashMap<String, String> = pending.url().query_pairs().into_owned().collect();
    params["state"].clone()
}

#[tokio::test]
async fn callback_exchanges_code_for_token() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("code=XYZ"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok-42",
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&provider)
        .await;

    let pending = prepare(format!("{}/oauth/token", provider.uri()), &settings());
    let state = state_of(&pending);
    let callback = format!("http://{}/?code=XYZ&state={}", pending.local_addr(), state);
    let flow = pending.flow();
    let waiter = tokio::spawn(pending.complete());

    let page = reqwest::get(callback).await.unwrap().text().await.unwrap();
    assert!(page.contains("tok-42"));

    let token = waiter.await.unwrap().unwrap();
    assert_eq!(token.access_token.as_ref(), "tok-42");
    assert_eq!(token.token_type.as_deref(), Some("bearer"));
    assert!(matches!(flow.lock().await.state(), FlowState::Completed(_)));
}

#[tokio::test]
async fn completes_shortly_despite_idle_browser_connection() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "tok-7"})))
        .mount(&provider)
        .await;

    let pending = prepare(format!("{}/oauth/token", provider.uri()), &settings());
    let state = state_of(&pending);
    let addr = pending.local_addr();
    let waiter = tokio::spawn(pending.complete());

    let _preconnect = tokio::net::TcpStream::connect(addr).await.unwrap();
    let started = Instant::now();
    let page = reqwest::get(format!("http://{}/?code=XYZ&state={}", addr, state))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("tok-7"));

    let token = waiter.await.unwrap().unwrap();
    assert_eq!(token.access_token.as_ref(), "tok-7");
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn forged_state_never_reaches_token_endpoint() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "x"})))
        .expect(0)
        .mount(&provider)
        .await;

    let pending = prepare(format!("{}/oauth/token", provider.uri()), &settings());
    let callback = format!("http://{}/?code=XYZ&state=forged", pending.local_addr());
    let waiter = tokio::spawn(pending.complete());

    let page = reqwest::get(callback).await.unwrap().text().await.unwrap();
    assert!(page.contains("CSRF Warning! Mismatching state"));
    assert_eq!(waiter.await.unwrap(), Err(FlowError::StateMismatch));
}

#[tokio::test]
async fn token_response_without_access_token() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"token_type": "bearer"})))
        .mount(&provider)
        .await;

    let pending = prepare(format!("{}/oauth/token", provider.uri()), &settings());
    let callback = format!(
        "http://{}/?code=XYZ&state={}",
        pending.local_addr(),
        state_of(&pending)
    );
    let waiter = tokio::spawn(pending.complete());

    let page = reqwest::get(callback).await.unwrap().text().await.unwrap();
    assert!(page.contains("Missing access token parameter."));
    assert_eq!(
        waiter.await.unwrap(),
        Err(FlowError::TokenExchange(TokenExchangeError::MissingToken))
    );
}

#[tokio::test]
async fn denied_authorization() {
    let pending = prepare("http://127.0.0.1:9/token".to_string(), &settings());
    let callback = format!(
        "http://{}/?error=access_denied&state={}",
        pending.local_addr(),
        state_of(&pending)
    );
    let waiter = tokio::spawn(pending.complete());

    let response = reqwest::get(callback).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert!(response.text().await.unwrap().contains("ERROR: access_denied"));
    assert_eq!(
        waiter.await.unwrap(),
        Err(FlowError::AuthorizationDenied("access_denied".to_string()))
    );
}

#[tokio::test]
async fn abandoned_flow_times_out() {
    let mut settings = settings();
    settings.timeout = Duration::from_secs(1);
    let pending = prepare("http://127.0.0.1:9/token".to_string(), &settings);

    let started = Instant::now();
    let result = pending.complete().await;
    let elapsed = started.elapsed();

    assert_eq!(result, Err(FlowError::Timeout(Duration::from_secs(1))));
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(2));
}

#[tokio::test]
async fn building_the_url_arms_the_flow() {
    let settings = settings();
    let exchange = HttpTokenExchange::new(true).unwrap();
    let mut flow = AuthorizationFlow::new(request("http://127.0.0.1:9/token".to_string()), exchange);
    flow.build_authorization_url().unwrap();
    assert!(matches!(flow.state(), FlowState::UrlBuilt(_)));
    assert!(!flow.state().is_terminal());
    assert!(settings.listener_config(&flow.request().redirect_uri).is_ok());
}
