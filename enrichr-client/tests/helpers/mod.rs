//! In-process fake enrichment service
//!
//! Serves `POST /upload`, `POST /icp_enrich` and the `/ws` streaming channel
//! on an ephemeral localhost port. The channel follows one of several
//! scripted dialects so tests can exercise each server behaviour.

#![allow(dead_code)]

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// Company name that makes `/icp_enrich` fail with HTTP 500
pub const FAILING_COMPANY: &str = "Explode Inc";

/// Company name that makes `/icp_enrich` answer 200 with an `error` body
pub const NO_INSIGHT_COMPANY: &str = "Quiet Corp";

pub const NO_INSIGHT_MESSAGE: &str = "Workflow completed without generating insights";

/// How the fake `/ws` endpoint answers a start message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelScript {
    /// One progress message per company, then completion
    WithProgress,
    /// Completion only
    Silent,
    /// One progress message, then a server-initiated close
    CloseEarly,
}

#[derive(Debug)]
pub struct FakeState {
    pub script: ChannelScript,
    pub start_messages: Mutex<Vec<Value>>,
    pub column_mappings: Mutex<Vec<Value>>,
    pub profile_requests: Mutex<Vec<Value>>,
}

pub struct FakeService {
    pub base_url: String,
    pub state: Arc<FakeState>,
}

/// Start the fake service on 127.0.0.1 with an OS-assigned port
pub async fn spawn_fake_service(script: ChannelScript) -> FakeService {
    let state = Arc::new(FakeState {
        script,
        start_messages: Mutex::new(Vec::new()),
        column_mappings: Mutex::new(Vec::new()),
        profile_requests: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/upload", post(upload))
        .route("/icp_enrich", post(icp_enrich))
        .route("/ws", get(channel))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeService {
        base_url: format!("http://{}", addr),
        state,
    }
}

/// Base URL of a port nothing listens on
pub async fn unused_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn upload(State(state): State<Arc<FakeState>>, mut multipart: Multipart) -> Response {
    let mut file = Vec::new();
    let mut mapping = Value::Null;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => file = field.bytes().await.unwrap().to_vec(),
            Some("column_mapping") => {
                mapping = serde_json::from_str(&field.text().await.unwrap()).unwrap()
            }
            _ => {}
        }
    }
    state.column_mappings.lock().unwrap().push(mapping.clone());

    let name_column = mapping["companyName"].as_str().unwrap_or_default().to_string();
    let website_column = mapping["website"].as_str().unwrap_or_default().to_string();

    let mut reader = csv::Reader::from_reader(file.as_slice());
    let headers = reader.headers().unwrap().clone();
    let position = |column: &str| headers.iter().position(|h| h == column);
    let (name_at, website_at) = (position(&name_column), position(&website_column));

    let companies: Vec<Value> = reader
        .records()
        .map(|record| {
            let record = record.unwrap();
            let cell = |at: Option<usize>| at.and_then(|i| record.get(i)).unwrap_or_default();
            json!({"name": cell(name_at), "website": cell(website_at)})
        })
        .collect();

    Json(json!({ "companies": companies })).into_response()
}

async fn icp_enrich(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    state.profile_requests.lock().unwrap().push(body.clone());

    let company = body["companyName"].as_str().unwrap_or_default();
    if company == FAILING_COMPANY {
        return (StatusCode::INTERNAL_SERVER_ERROR, "model overloaded").into_response();
    }
    if company == NO_INSIGHT_COMPANY {
        return Json(json!({ "error": NO_INSIGHT_MESSAGE })).into_response();
    }

    Json(json!({
        "enriched_data": {
            "customerSnapshot": format!("{} sells to {}", company, body["territory"].as_str().unwrap_or_default()),
            "keyDemographics": {
                "industry": "Software",
                "companySize": "200-500",
                "annualRevenue": "$50M",
                "location": "Berlin"
            },
            "commonObjections": [
                {"objection": "Too expensive", "response": "Payback in two quarters"}
            ],
            "analystNotes": {"confidence": 0.8}
        }
    }))
    .into_response()
}

async fn channel(State(state): State<Arc<FakeState>>, upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(move |socket| run_channel(socket, state))
}

async fn run_channel(mut socket: WebSocket, state: Arc<FakeState>) {
    let start = loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) => break serde_json::from_str::<Value>(&text).unwrap(),
            Some(Ok(_)) => continue,
            _ => return,
        }
    };
    state.start_messages.lock().unwrap().push(start.clone());

    let companies = start["companies"].as_array().cloned().unwrap_or_default();
    let total = companies.len();

    match state.script {
        ChannelScript::WithProgress => {
            for processed in 1..=total {
                let percent = processed as f64 * 100.0 / total as f64;
                send_json(
                    &mut socket,
                    json!({"progress": percent, "processed": processed, "total": total}),
                )
                .await;
            }
        }
        ChannelScript::Silent => {}
        ChannelScript::CloseEarly => {
            send_json(&mut socket, json!({"progress": 10, "processed": 0, "total": total})).await;
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: 1011,
                    reason: "worker crashed".into(),
                })))
                .await;
            return;
        }
    }

    let data: Vec<Value> = companies
        .into_iter()
        .map(|mut company| {
            let summary = format!("{} enriched", company["name"].as_str().unwrap_or_default());
            company["Enriched_Data"] = json!(summary);
            company
        })
        .collect();
    send_json(&mut socket, json!({"type": "enrichment_complete", "data": data})).await;

    // Drain until the client closes
    while let Some(Ok(message)) = socket.recv().await {
        if matches!(message, Message::Close(_)) {
            break;
        }
    }
}

async fn send_json(socket: &mut WebSocket, value: Value) {
    let _ = socket.send(Message::Text(value.to_string())).await;
}
