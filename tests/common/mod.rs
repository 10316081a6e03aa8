//! In-process auth server for integration tests. Speaks the same JSON
//! endpoints as the real one and issues HS256 tokens.

#![allow(dead_code)]

use gatekeeper::client::AuthClient;
use gatekeeper::domain_port::SessionStore;
use gatekeeper::infra::http::build_client;
use gatekeeper::infra::{HttpAuthApi, MemorySessionStore, RecordingNavigator};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

pub const SIGN_IN: &str = "/auth/signin";
pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "correct horse";
const SECRET: &[u8] = b"integration-secret";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    roles: Vec<String>,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody {
    refresh_token: String,
}

pub struct ServerState {
    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub resource_calls: AtomicUsize,
    pub fail_refresh: AtomicBool,
    access_ttl_secs: Mutex<i64>,
    refresh_delay: Mutex<Duration>,
    refresh_tokens: Mutex<HashSet<String>>,
    bearers: Mutex<Vec<String>>,
    accounts: HashMap<String, (String, Vec<String>)>,
}

impl ServerState {
    fn new() -> Self {
        let mut accounts = HashMap::new();
        accounts.insert(
            EMAIL.to_string(),
            (
                PASSWORD.to_string(),
                vec!["admin".to_string(), "editor".to_string()],
            ),
        );
        Self {
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            resource_calls: AtomicUsize::new(0),
            fail_refresh: AtomicBool::new(false),
            access_ttl_secs: Mutex::new(900),
            refresh_delay: Mutex::new(Duration::ZERO),
            refresh_tokens: Mutex::new(HashSet::new()),
            bearers: Mutex::new(Vec::new()),
            accounts,
        }
    }

    pub fn set_access_ttl_secs(&self, secs: i64) {
        *self.access_ttl_secs.lock().unwrap() = secs;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap() = delay;
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn resource_calls(&self) -> usize {
        self.resource_calls.load(Ordering::SeqCst)
    }

    /// Bearer tokens presented to resource endpoints, in arrival order.
    pub fn bearers(&self) -> Vec<String> {
        self.bearers.lock().unwrap().clone()
    }

    fn issue(&self, email: &str) -> String {
        let (_, roles) = &self.accounts[email];
        let iat = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: format!("id-{email}"),
            email: email.to_string(),
            roles: roles.clone(),
            iat,
            exp: iat + *self.access_ttl_secs.lock().unwrap(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    fn verify(&self, authorization: Option<String>) -> Option<Claims> {
        let header = authorization?;
        let token = header.strip_prefix("Bearer ")?;
        self.bearers.lock().unwrap().push(token.to_string());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &DecodingKey::from_secret(SECRET), &validation)
            .ok()
            .map(|data| data.claims)
    }
}

fn reply(status: StatusCode, body: serde_json::Value) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

fn unauthorized(message: &str) -> warp::reply::Response {
    reply(StatusCode::UNAUTHORIZED, json!({ "message": message }))
}

fn routes(
    state: Arc<ServerState>,
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    let with_state = {
        let state = state.clone();
        warp::any().map(move || state.clone())
    };
    let bearer = warp::header::optional::<String>("authorization");

    let login = warp::path!("api" / "auth" / "login")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state.clone())
        .map(|body: LoginBody, state: Arc<ServerState>| {
            state.login_calls.fetch_add(1, Ordering::SeqCst);
            match state.accounts.get(&body.email) {
                Some((password, _)) if *password == body.password => {
                    let access = state.issue(&body.email);
                    let refresh = uuid::Uuid::new_v4().to_string();
                    state.refresh_tokens.lock().unwrap().insert(refresh.clone());
                    reply(
                        StatusCode::OK,
                        json!({ "accessToken": access, "refreshToken": refresh }),
                    )
                }
                _ => unauthorized("Invalid email or password"),
            }
        });

    let refresh = warp::path!("api" / "auth" / "refresh")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state.clone())
        .then(|body: RefreshBody, state: Arc<ServerState>| async move {
            state.refresh_calls.fetch_add(1, Ordering::SeqCst);
            let delay = *state.refresh_delay.lock().unwrap();
            tokio::time::sleep(delay).await;

            let known = state
                .refresh_tokens
                .lock()
                .unwrap()
                .contains(&body.refresh_token);
            if state.fail_refresh.load(Ordering::SeqCst) || !known {
                return unauthorized("Refresh token expired");
            }
            reply(StatusCode::OK, json!({ "accessToken": state.issue(EMAIL) }))
        });

    let logout = warp::path!("api" / "auth" / "logout")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state.clone())
        .map(|body: RefreshBody, state: Arc<ServerState>| {
            state.logout_calls.fetch_add(1, Ordering::SeqCst);
            state
                .refresh_tokens
                .lock()
                .unwrap()
                .remove(&body.refresh_token);
            StatusCode::NO_CONTENT.into_response()
        });

    let me = warp::path!("api" / "me")
        .and(warp::get())
        .and(bearer.clone())
        .and(with_state.clone())
        .map(|authorization: Option<String>, state: Arc<ServerState>| {
            state.resource_calls.fetch_add(1, Ordering::SeqCst);
            match state.verify(authorization) {
                Some(claims) => reply(
                    StatusCode::OK,
                    json!({ "sub": claims.sub, "email": claims.email, "roles": claims.roles }),
                ),
                None => unauthorized("Token expired"),
            }
        });

    let echo = warp::path!("api" / "echo")
        .and(warp::post().or(warp::put()).unify())
        .and(bearer.clone())
        .and(warp::header::optional::<String>("content-type"))
        .and(warp::header::optional::<String>("x-request-id"))
        .and(warp::body::bytes())
        .and(with_state.clone())
        .map(
            |authorization: Option<String>,
             content_type: Option<String>,
             request_id: Option<String>,
             body: warp::hyper::body::Bytes,
             state: Arc<ServerState>| {
                state.resource_calls.fetch_add(1, Ordering::SeqCst);
                if state.verify(authorization).is_none() {
                    return unauthorized("Token expired");
                }
                let body: serde_json::Value =
                    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
                reply(
                    StatusCode::OK,
                    json!({
                        "contentType": content_type,
                        "requestId": request_id,
                        "body": body,
                    }),
                )
            },
        );

    let note = warp::path!("api" / "notes" / u32)
        .and(warp::delete())
        .and(bearer.clone())
        .and(with_state.clone())
        .map(|_id: u32, authorization: Option<String>, state: Arc<ServerState>| {
            state.resource_calls.fetch_add(1, Ordering::SeqCst);
            match state.verify(authorization) {
                Some(_) => StatusCode::NO_CONTENT.into_response(),
                None => unauthorized("Token expired"),
            }
        });

    let revoked = warp::path!("api" / "revoked")
        .and(warp::get())
        .and(with_state.clone())
        .map(|state: Arc<ServerState>| {
            state.resource_calls.fetch_add(1, Ordering::SeqCst);
            unauthorized("Session revoked")
        });

    let forbidden = warp::path!("api" / "forbidden")
        .and(warp::get())
        .and(with_state.clone())
        .map(|state: Arc<ServerState>| {
            state.resource_calls.fetch_add(1, Ordering::SeqCst);
            reply(StatusCode::FORBIDDEN, json!({ "message": "Forbidden" }))
        });

    let slow = warp::path!("api" / "slow")
        .and(warp::get())
        .then(|| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            reply(StatusCode::OK, json!({ "slow": true }))
        });

    login
        .or(refresh)
        .unify()
        .or(logout)
        .unify()
        .or(me)
        .unify()
        .or(echo)
        .unify()
        .or(note)
        .unify()
        .or(revoked)
        .unify()
        .or(forbidden)
        .unify()
        .or(slow)
        .unify()
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: Arc<ServerState>,
}

impl TestServer {
    pub fn start() -> Self {
        let state = Arc::new(ServerState::new());
        let (addr, server) = warp::serve(routes(state.clone())).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

pub struct TestClient {
    pub client: AuthClient,
    pub navigator: Arc<RecordingNavigator>,
}

pub fn client_for(server: &TestServer, store: Arc<dyn SessionStore>) -> TestClient {
    client_with_timeout(server, store, Duration::from_secs(5))
}

pub fn client_with_timeout(
    server: &TestServer,
    store: Arc<dyn SessionStore>,
    timeout: Duration,
) -> TestClient {
    let base = server.base_url();
    let http = build_client(timeout).unwrap();
    let api = Arc::new(HttpAuthApi::new(http.clone(), base.clone()));
    let navigator = Arc::new(RecordingNavigator::new());
    let client = AuthClient::from_parts(http, &base, api, store, navigator.clone(), SIGN_IN);
    TestClient { client, navigator }
}

pub fn memory_client(server: &TestServer) -> TestClient {
    client_for(server, Arc::new(MemorySessionStore::new()))
}
