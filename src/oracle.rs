//! Expected responses of a correct service.
//!
//! Each function builds the exact JSON value one contract call must return,
//! given what was sent and what the session has done so far. Session state the
//! service keeps (greet, echo and send counters) is predicted with [`Counter`].

use serde_json::{Value, json};

use crate::generator::{SimulatedItem, SimulatedUser};

/// Static greeting returned to a session that is not logged in.
pub const GREETING: &str = "hello, world!";

/// Client-side prediction of a per-session server counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counter {
    value: u64,
}

impl Counter {
    /// Counter at zero, as the service starts a fresh session.
    #[must_use]
    pub const fn new() -> Self {
        Self { value: 0 }
    }

    /// Record one counted request and return the value the service reports for it.
    pub fn next(&mut self) -> u64 {
        self.value += 1;
        self.value
    }

    /// Number of counted requests so far.
    #[must_use]
    pub const fn current(&self) -> u64 {
        self.value
    }
}

#[must_use]
pub fn greeting() -> Value {
    json!({ "msg": GREETING })
}

/// Greet while logged in; `count` is 1 for the first greet after login.
#[must_use]
pub fn welcome(username: &str, count: u64) -> Value {
    json!({ "welcome": username, "count": count })
}

#[must_use]
pub fn registered() -> Value {
    acknowledged("user registered")
}

#[must_use]
pub fn logged_in() -> Value {
    acknowledged("login successfully")
}

#[must_use]
pub fn logged_out() -> Value {
    acknowledged("logout successfully")
}

fn acknowledged(message: &str) -> Value {
    json!({ "success": true, "message": message })
}

/// Profile lookup: the registered fields plus the fixed account flags.
#[must_use]
pub fn user_profile(user: &SimulatedUser) -> Value {
    json!({
        "success": true,
        "user": {
            "username": user.username,
            "is_active": true,
            "is_superuser": false,
            "first_name": user.first_name,
            "last_name": user.last_name,
            "email": user.email,
        }
    })
}

#[must_use]
pub fn item_added() -> Value {
    json!({ "successfully": "added" })
}

#[must_use]
pub fn item_updated() -> Value {
    json!({ "successfully": "updated" })
}

/// Item lookup; `item.id` must already hold the service-assigned id.
#[must_use]
pub fn item_found(item: &SimulatedItem) -> Value {
    json!({ "item": item })
}

/// `POST /echo` with body `{id}`.
#[must_use]
pub fn body_echo(id: &str) -> Value {
    echoed_object(&json!({ "id": id }))
}

/// `POST /echo` with an arbitrary body.
#[must_use]
pub fn echoed_object(body: &Value) -> Value {
    json!({ "id": "echo", "obj": body })
}

/// `GET /echo/<id>`.
#[must_use]
pub fn path_echo(id: &str) -> Value {
    json!({ "id": "echo2", "str": id })
}

/// `GET /get`: number of body echoes this session has made.
#[must_use]
pub fn counter_value(count: u64) -> Value {
    json!({ "id": "get", "val": count })
}

/// `POST /send` with body `{id}`; `count` is 1 for the first send of a session.
#[must_use]
pub fn sent(count: u64, id: &str) -> Value {
    json!({
        "cnt": count,
        "response": { "echo": { "request": { "id": id } } }
    })
}
