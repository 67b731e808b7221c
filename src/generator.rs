//! Randomized domain values for simulated clients.
//!
//! Two random sources are kept apart on purpose: secrets (passwords) come
//! from the operating system's CSPRNG through [`secure_string`], while
//! cosmetic data (names, emails, flags, codes) comes from the non-secret
//! [`DataGenerator`] PRNG.

use rand::distributions::Uniform;
use rand::rngs::{OsRng, SmallRng};
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

/// 52 ASCII letters followed by the 10 digits.
pub const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of generated passwords.
pub const PASSWORD_LEN: usize = 16;

/// Length of each random part of names and emails.
pub const NAME_LEN: usize = 5;

/// Largest value of an item's `code`.
pub const MAX_CODE: u8 = 7;

/// Draw `len` alphanumeric characters from the OS CSPRNG.
#[must_use]
pub fn secure_string(len: usize) -> String {
    let alphabet = Uniform::from(0..ALPHANUMERIC.len());
    OsRng
        .sample_iter(alphabet)
        .take(len)
        .map(|index| ALPHANUMERIC[index] as char)
        .collect()
}

/// Fresh canonical lowercase hyphenated v4 UUID.
#[must_use]
pub fn identifier() -> String {
    Uuid::new_v4().to_string()
}

/// A user registered, logged in and looked up by the auth scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulatedUser {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl SimulatedUser {
    /// Login body: `{username, password}`.
    #[must_use]
    pub fn credentials(&self) -> Value {
        json!({
            "username": self.username,
            "password": self.password,
        })
    }
}

/// An item created and repeatedly mutated by the crud scenario.
///
/// `id` is `None` until the service assigns one on creation; it is never
/// changed by [`DataGenerator::mutate_item`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatedItem {
    pub name: String,
    pub active: bool,
    pub email: Option<String>,
    pub code: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

/// Which fields a mutation regenerated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mutation {
    pub name: bool,
    pub active: bool,
    pub email: bool,
    pub code: bool,
}

impl Mutation {
    /// Number of regenerated fields.
    #[must_use]
    pub fn count(&self) -> usize {
        [self.name, self.active, self.email, self.code]
            .iter()
            .filter(|&&changed| changed)
            .count()
    }
}

/// Non-secret generator for cosmetic test data.
#[derive(Debug, Clone)]
pub struct DataGenerator<R = SmallRng> {
    rng: R,
}

impl DataGenerator<SmallRng> {
    /// Generator seeded from OS entropy; one per worker.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// Deterministic generator, for tests.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }
}

impl Default for DataGenerator<SmallRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> DataGenerator<R> {
    /// Wrap an existing PRNG.
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Uniform integer in `low..=high`.
    pub fn range(&mut self, low: usize, high: usize) -> usize {
        self.rng.gen_range(low..=high)
    }

    /// `len` alphanumeric characters, not suitable for secrets.
    pub fn string(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| ALPHANUMERIC[self.rng.gen_range(0..ALPHANUMERIC.len())] as char)
            .collect()
    }

    /// Fair coin.
    pub fn boolean(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    /// `{5 chars}@{5 chars}.com`.
    pub fn email(&mut self) -> String {
        let local = self.string(NAME_LEN);
        let domain = self.string(NAME_LEN);
        format!("{}@{}.com", local, domain)
    }

    /// `None` half of the time, else an email.
    pub fn nullable_email(&mut self) -> Option<String> {
        if self.boolean() { Some(self.email()) } else { None }
    }

    /// `None` half of the time, else a uniform code in `0..=7`.
    pub fn nullable_code(&mut self) -> Option<u8> {
        if self.boolean() {
            Some(self.rng.gen_range(0..=MAX_CODE))
        } else {
            None
        }
    }

    /// A new user with a CSPRNG password.
    pub fn user(&mut self) -> SimulatedUser {
        SimulatedUser {
            username: identifier(),
            password: secure_string(PASSWORD_LEN),
            first_name: self.string(NAME_LEN),
            last_name: self.string(NAME_LEN),
            email: self.email(),
        }
    }

    /// A new item without a service-assigned id.
    pub fn item(&mut self) -> SimulatedItem {
        SimulatedItem {
            name: identifier(),
            active: self.boolean(),
            email: self.nullable_email(),
            code: self.nullable_code(),
            id: None,
        }
    }

    /// Regenerate each mutable field of `item` with probability 1/2.
    pub fn mutate_item(&mut self, item: &mut SimulatedItem) -> Mutation {
        let mut mutation = Mutation::default();
        if self.boolean() {
            item.name = identifier();
            mutation.name = true;
        }
        if self.boolean() {
            item.active = self.boolean();
            mutation.active = true;
        }
        if self.boolean() {
            item.email = self.nullable_email();
            mutation.email = true;
        }
        if self.boolean() {
            item.code = self.nullable_code();
            mutation.code = true;
        }
        mutation
    }
}
