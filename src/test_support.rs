//! In-process stand-in for the sheet API, served by warp on an ephemeral port.

use serde_json::{json, Value};
use std::{
    collections::{HashMap, VecDeque},
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;
use warp::{http::StatusCode, Filter, Reply};

pub fn init_logging() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// A scripted HTTP reply.
#[derive(Clone, Debug)]
pub struct Canned {
    status: u16,
    content_type: &'static str,
    body: String,
    delay: Option<Duration>,
}

impl Canned {
    pub fn raw(status: u16, content_type: &'static str, body: &str) -> Self {
        Self {
            status,
            content_type,
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn json(value: Value) -> Self {
        Self::raw(200, "application/json", &value.to_string())
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self::raw(status, "text/plain", body)
    }

    pub fn html(body: &str) -> Self {
        Self::raw(200, "text/html; charset=utf-8", body)
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn into_response(self) -> warp::reply::Response {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        let status = StatusCode::from_u16(self.status).unwrap();
        warp::reply::with_status(
            warp::reply::with_header(self.body, "content-type", self.content_type),
            status,
        )
        .into_response()
    }
}

/// A recorded GET against the sheet route.
#[derive(Clone, Debug)]
pub struct RecordedGet {
    pub query: HashMap<String, String>,
    pub tunnel_bypass: Option<String>,
    pub accept: Option<String>,
}

struct State {
    gets: Mutex<VecDeque<Canned>>,
    get_log: Mutex<Vec<RecordedGet>>,
    posts: Mutex<Vec<Value>>,
    post_reply: Mutex<Canned>,
}

pub struct MockSheet {
    addr: SocketAddr,
    state: Arc<State>,
}

impl MockSheet {
    pub async fn start() -> Self {
        init_logging();
        let state = Arc::new(State {
            gets: Mutex::new(VecDeque::new()),
            get_log: Mutex::new(Vec::new()),
            posts: Mutex::new(Vec::new()),
            post_reply: Mutex::new(Canned::json(json!({
                "message": "Sheet updated successfully",
                "range": "Sheet1!A:Z"
            }))),
        });

        let get_state = state.clone();
        let get_sheet = warp::path("sheet")
            .and(warp::path::end())
            .and(warp::get())
            .and(warp::query::<HashMap<String, String>>())
            .and(warp::header::optional::<String>("ngrok-skip-browser-warning"))
            .and(warp::header::optional::<String>("accept"))
            .and_then(
                move |query: HashMap<String, String>,
                      tunnel_bypass: Option<String>,
                      accept: Option<String>| {
                let state = get_state.clone();
                async move {
                    state.get_log.lock().unwrap().push(RecordedGet {
                        query,
                        tunnel_bypass,
                        accept,
                    });
                    // the last scripted reply repeats forever
                    let canned = {
                        let mut q = state.gets.lock().unwrap();
                        if q.len() > 1 {
                            q.pop_front().unwrap()
                        } else {
                            q.front()
                                .cloned()
                                .unwrap_or_else(|| Canned::text(404, "no scripted reply"))
                        }
                    };
                    Ok::<_, Infallible>(canned.into_response().await)
                }
            });

        let post_state = state.clone();
        let post_sheet = warp::path("sheet")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json::<Value>())
            .and_then(move |body: Value| {
                let state = post_state.clone();
                async move {
                    state.posts.lock().unwrap().push(body);
                    let canned = state.post_reply.lock().unwrap().clone();
                    Ok::<_, Infallible>(canned.into_response().await)
                }
            });

        let health = warp::path("health")
            .and(warp::get())
            .map(|| warp::reply::json(&json!({ "ok": true })));

        let routes = get_sheet.or(post_sheet).or(health);
        let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        Self { addr, state }
    }

    /// Base endpoint, without query.
    pub fn endpoint(&self) -> Url {
        Url::parse(&format!("http://{}/sheet", self.addr)).unwrap()
    }

    pub fn push_get(&self, canned: Canned) {
        self.state.gets.lock().unwrap().push_back(canned);
    }

    pub fn set_post_reply(&self, canned: Canned) {
        *self.state.post_reply.lock().unwrap() = canned;
    }

    pub fn gets(&self) -> Vec<RecordedGet> {
        self.state.get_log.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<Value> {
        self.state.posts.lock().unwrap().clone()
    }
}
