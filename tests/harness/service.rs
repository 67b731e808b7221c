//! Mock of the session-stateful service, built on axum.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::Router;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use session_harness::config::{DEFAULT_SESSION_COOKIE, HarnessConfig, ScenarioKind};

use super::websocket;

const BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Deliberate misbehaviour, to prove mismatches are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    /// `/get` reports one more body echo than were made.
    CounterOffByOne,
    /// Profile lookups report every user as a superuser.
    SuperuserProfile,
    /// The WebSocket pushes the send count plus one.
    WebSocketCountOffByOne,
    /// Static assets answer 404.
    MissingStatics,
    /// `/echo` truncates large bodies.
    TruncatedEcho,
    /// Updates give the item a fresh id.
    ItemIdChangesOnUpdate,
    /// Updates store the item without its `active` flag.
    ItemFieldDroppedOnUpdate,
    /// Greets count from the start of the session, not from login.
    GreetCountNotReset,
    /// Logout acknowledges but keeps the user logged in.
    LogoutKeepsUser,
}

#[derive(Debug, Default)]
pub(super) struct SessionState {
    user: Option<String>,
    greets: u64,
    echoes: u64,
    pub(super) sends: u64,
}

#[derive(Debug, Default)]
pub(super) struct Store {
    pub(super) sessions: HashMap<String, SessionState>,
    users: HashMap<String, Value>,
    items: HashMap<String, Value>,
    next_item_id: u64,
}

impl Store {
    /// Session named by the request cookie, or a new one plus its cookie.
    fn session(&mut self, headers: &HeaderMap) -> (&mut SessionState, Option<String>) {
        match session_id(headers).filter(|id| self.sessions.contains_key(id)) {
            Some(id) => (self.sessions.entry(id).or_default(), None),
            None => {
                let id = uuid::Uuid::new_v4().simple().to_string();
                let cookie = format!("{}={}; Path=/", DEFAULT_SESSION_COOKIE, id);
                (self.sessions.entry(id).or_default(), Some(cookie))
            }
        }
    }
}

pub(super) fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == DEFAULT_SESSION_COOKIE)
        .map(|(_, id)| id.to_string())
}

#[derive(Clone)]
pub(super) struct AppState {
    pub(super) store: Arc<Mutex<Store>>,
    pub(super) fault: Fault,
}

fn reply(cookie: Option<String>, body: Value) -> Response {
    let mut response = Json(body).into_response();
    if let Some(value) = cookie.and_then(|c| HeaderValue::from_str(&c).ok()) {
        response.headers_mut().insert(SET_COOKIE, value);
    }
    response
}

fn ack(message: &str) -> Value {
    json!({ "success": true, "message": message })
}

async fn greet(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut store = state.store.lock().unwrap();
    let (session, cookie) = store.session(&headers);
    if state.fault == Fault::GreetCountNotReset && session.user.is_none() {
        session.greets += 1;
    }
    let body = match &session.user {
        Some(username) => {
            session.greets += 1;
            json!({ "welcome": username, "count": session.greets })
        }
        None => json!({ "msg": "hello, world!" }),
    };
    reply(cookie, body)
}

async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(user): Json<Value>,
) -> Response {
    let mut store = state.store.lock().unwrap();
    let (_, cookie) = store.session(&headers);
    let Some(username) = user["username"].as_str().map(str::to_string) else {
        return reply(cookie, json!({ "success": false, "message": "missing username" }));
    };
    store.users.insert(username, user);
    reply(cookie, ack("user registered"))
}

async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(credentials): Json<Value>,
) -> Response {
    let mut store = state.store.lock().unwrap();
    let username = credentials["username"].as_str().unwrap_or_default().to_string();
    let valid = store
        .users
        .get(&username)
        .is_some_and(|user| user["password"] == credentials["password"]);

    let (session, cookie) = store.session(&headers);
    if !valid {
        return reply(cookie, json!({ "success": false, "message": "login failed" }));
    }
    session.user = Some(username);
    if state.fault != Fault::GreetCountNotReset {
        session.greets = 0;
    }
    reply(cookie, ack("login successfully"))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut store = state.store.lock().unwrap();
    let (session, cookie) = store.session(&headers);
    if state.fault != Fault::LogoutKeepsUser {
        session.user = None;
        session.greets = 0;
    }
    reply(cookie, ack("logout successfully"))
}

async fn find_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Response {
    let mut store = state.store.lock().unwrap();
    let profile = store.users.get(&username).map(|user| {
        json!({
            "username": user["username"],
            "is_active": true,
            "is_superuser": state.fault == Fault::SuperuserProfile,
            "first_name": user["first_name"],
            "last_name": user["last_name"],
            "email": user["email"],
        })
    });
    let (_, cookie) = store.session(&headers);
    match profile {
        Some(user) => reply(cookie, json!({ "success": true, "user": user })),
        None => reply(cookie, json!({ "success": false })),
    }
}

async fn add_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut item): Json<Value>,
) -> Response {
    let mut store = state.store.lock().unwrap();
    let (_, cookie) = store.session(&headers);
    store.next_item_id += 1;
    item["id"] = json!(store.next_item_id);
    let name = item["name"].as_str().unwrap_or_default().to_string();
    store.items.insert(name, item);
    reply(cookie, json!({ "successfully": "added" }))
}

async fn find_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    let mut store = state.store.lock().unwrap();
    let item = store.items.get(&name).cloned().unwrap_or(Value::Null);
    let (_, cookie) = store.session(&headers);
    reply(cookie, json!({ "item": item }))
}

async fn update_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(old_name): Path<String>,
    Json(mut item): Json<Value>,
) -> Response {
    let mut store = state.store.lock().unwrap();
    let (_, cookie) = store.session(&headers);
    let Some(previous) = store.items.remove(&old_name) else {
        return reply(cookie, json!({ "successfully": "nothing" }));
    };
    item["id"] = match state.fault {
        Fault::ItemIdChangesOnUpdate => {
            store.next_item_id += 1;
            json!(store.next_item_id)
        }
        _ => previous["id"].clone(),
    };
    if state.fault == Fault::ItemFieldDroppedOnUpdate {
        if let Some(fields) = item.as_object_mut() {
            fields.remove("active");
        }
    }
    let name = item["name"].as_str().unwrap_or_default().to_string();
    store.items.insert(name, item);
    reply(cookie, json!({ "successfully": "updated" }))
}

async fn body_echo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    let mut store = state.store.lock().unwrap();
    let (session, cookie) = store.session(&headers);
    session.echoes += 1;
    if state.fault == Fault::TruncatedEcho {
        let truncated = body["id"]
            .as_str()
            .filter(|text| text.len() > 1024)
            .map(|text| text[..1024].to_string());
        if let Some(text) = truncated {
            body["id"] = json!(text);
        }
    }
    reply(cookie, json!({ "id": "echo", "obj": body }))
}

async fn path_echo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut store = state.store.lock().unwrap();
    let (_, cookie) = store.session(&headers);
    reply(cookie, json!({ "id": "echo2", "str": id }))
}

async fn read_counter(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut store = state.store.lock().unwrap();
    let (session, cookie) = store.session(&headers);
    let mut value = session.echoes;
    if state.fault == Fault::CounterOffByOne {
        value += 1;
    }
    reply(cookie, json!({ "id": "get", "val": value }))
}

async fn send(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Response {
    let mut store = state.store.lock().unwrap();
    let (session, cookie) = store.session(&headers);
    session.sends += 1;
    let body = json!({ "cnt": session.sends, "response": { "echo": { "request": request } } });
    reply(cookie, body)
}

async fn statics(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    if state.fault == Fault::MissingStatics {
        return StatusCode::NOT_FOUND.into_response();
    }
    (StatusCode::OK, format!("/* {} */", path)).into_response()
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(greet).post(greet))
        .route("/hello", get(greet).post(greet))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/find/{name}", get(find_item).post(find_user))
        .route("/add", post(add_item))
        .route("/update/{name}", post(update_item))
        .route("/echo", get(websocket::upgrade).post(body_echo))
        .route("/echo/{id}", get(path_echo))
        .route("/get", get(read_counter))
        .route("/send", post(send))
        .route("/statics/{*path}", get(statics))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

/// A running mock service on `127.0.0.1:<random port>`.
pub struct MockService {
    addr: SocketAddr,
    store: Arc<Mutex<Store>>,
    handle: JoinHandle<()>,
}

impl MockService {
    pub async fn spawn() -> Self {
        Self::spawn_with(Fault::None).await
    }

    pub async fn spawn_with(fault: Fault) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(Mutex::new(Store::default()));
        let app = router(AppState {
            store: Arc::clone(&store),
            fault,
        });

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            store,
            handle,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Scenario defaults pointed at this service, scaled down for tests.
    pub fn config(&self, scenario: ScenarioKind) -> HarnessConfig {
        HarnessConfig::for_scenario(scenario)
            .with_target("127.0.0.1", self.addr.port())
            .with_workers(8)
            .with_iterations(scenario.default_iterations().min(5))
            .with_size_probe(false)
            .with_probe_bytes(64 * 1024)
    }

    /// Number of distinct sessions the service has handed out.
    pub fn sessions(&self) -> usize {
        self.store.lock().unwrap().sessions.len()
    }

    pub fn items(&self) -> usize {
        self.store.lock().unwrap().items.len()
    }

    pub fn shutdown(self) {
        self.handle.abort();
    }
}
