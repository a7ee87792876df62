//! Local HTTP stub for exercising the real reqwest clients in tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Router,
};

/// Answers every request, whatever the path, with the next scripted
/// `(status, body)`. Once the script runs out it answers 500.
#[derive(Clone, Default)]
pub struct StubServer {
    responses: Arc<Mutex<VecDeque<(u16, String)>>>,
    authorizations: Arc<Mutex<Vec<String>>>,
    hits: Arc<Mutex<usize>>,
    delay: Duration,
}

impl StubServer {
    pub fn new(script: &[(u16, &str)]) -> Self {
        Self {
            responses: Arc::new(Mutex::new(
                script
                    .iter()
                    .map(|(status, body)| (*status, body.to_string()))
                    .collect(),
            )),
            ..Self::default()
        }
    }

    /// Sleeps before answering each request.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Binds an ephemeral port and returns the base URL, e.g. `http://127.0.0.1:41234`.
    pub async fn spawn(&self) -> String {
        let app = Router::new().fallback(answer).with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    pub fn hits(&self) -> usize {
        *self.hits.lock().unwrap()
    }

    pub fn authorizations(&self) -> Vec<String> {
        self.authorizations.lock().unwrap().clone()
    }
}

async fn answer(State(stub): State<StubServer>, headers: HeaderMap) -> (StatusCode, String) {
    *stub.hits.lock().unwrap() += 1;
    if let Some(auth) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        stub.authorizations.lock().unwrap().push(auth.to_string());
    }

    if !stub.delay.is_zero() {
        tokio::time::sleep(stub.delay).await;
    }

    let (status, body) = stub
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((500, "script exhausted".to_string()));
    (StatusCode::from_u16(status).unwrap(), body)
}
