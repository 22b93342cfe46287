#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use actix_web::test::TestRequest;
use chrono::{DateTime, TimeZone, Utc};

use intern_portal::auth::jwt::generate_access_token;
use intern_portal::config::Config;
use intern_portal::model::role::Role;
use intern_portal::model::task::{NewTask, Task, TaskTemplate};
use intern_portal::model::user::NewUser;
use intern_portal::state::AppState;
use intern_portal::store::{MemoryStore, TaskStore, UserStore};

pub const SECRET: &str = "test-secret";

pub struct TestContext {
    pub config: Config,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl TestContext {
    pub fn new() -> Self {
        let config = Config::from_lookup(|key| match key {
            "SERVER_ADDR" => Some("127.0.0.1:0".into()),
            "JWT_SECRET" => Some(SECRET.into()),
            "STORE_BACKEND" => Some("memory".into()),
            _ => None,
        })
        .unwrap();
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), Duration::from_secs(60));
        Self {
            config,
            store,
            state,
        }
    }

    /// Insert a user directly, bypassing password hashing.
    pub async fn user(&self, username: &str, role: Role, created_at: DateTime<Utc>) -> u64 {
        self.store
            .insert_user(NewUser {
                username: username.into(),
                password_hash: "unused".into(),
                role,
                created_at,
            })
            .await
            .unwrap()
            .id
    }

    pub async fn template(&self, title: &str, created_at: DateTime<Utc>) -> Task {
        self.store
            .insert_tasks(vec![NewTask {
                intern_id: None,
                template: TaskTemplate {
                    title: title.into(),
                    ..Default::default()
                },
                created_at,
            }])
            .await
            .unwrap()
            .remove(0)
    }

    pub fn token(&self, user_id: u64, role: Role) -> String {
        generate_access_token(user_id, format!("user-{user_id}"), role, SECRET, 900).unwrap()
    }
}

/// Build the portal app over a [`TestContext`].
macro_rules! portal_app {
    ($ctx:expr) => {{
        let ctx = &$ctx;
        let config = ctx.config.clone();
        let state = ctx.state.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(actix_web::middleware::NormalizePath::trim())
                .app_data(actix_web::web::Data::new(config.clone()))
                .configure(|cfg| state.register(cfg))
                .configure(|cfg| intern_portal::routes::configure(cfg, config.clone())),
        )
        .await
    }};
}

pub fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

pub fn get(uri: &str, token: &str) -> TestRequest {
    TestRequest::get()
        .uri(uri)
        .peer_addr(peer())
        .insert_header(("Authorization", format!("Bearer {token}")))
}

pub fn post(uri: &str, token: &str) -> TestRequest {
    TestRequest::post()
        .uri(uri)
        .peer_addr(peer())
        .insert_header(("Authorization", format!("Bearer {token}")))
}

pub fn put(uri: &str, token: &str) -> TestRequest {
    TestRequest::put()
        .uri(uri)
        .peer_addr(peer())
        .insert_header(("Authorization", format!("Bearer {token}")))
}

pub fn ms(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}
