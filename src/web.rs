//! Browser UI
//!
//! A thin axum layer over the weather session: one static page and a few
//! JSON endpoints. All failures below this layer arrive as values (failed
//! connection results, failure outcomes, unparseable tokens) and are mapped
//! to user-facing text here; no recovery happens at this level.

use crate::auth::UserContext;
use crate::geocode;
use crate::session::WeatherSession;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state handed to every handler
pub struct AppState {
    /// The single tool-server session
    pub session: WeatherSession,

    /// HTTP client for geocoding lookups
    pub http: reqwest::Client,

    /// Geocoding API key, if configured
    pub geocode_api_key: Option<String>,

    /// Role required for the alerts feature
    pub required_role: String,
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/connect", post(connect))
        .route("/api/disconnect", post(disconnect))
        .route("/api/forecast", post(forecast))
        .route("/api/login", post(login))
        .route("/api/alerts", post(alerts))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until ctrl-c, then tear the session down
pub async fn serve(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    use anyhow::Context;

    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("Serving weather UI on http://{}", addr);

    let app = router(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // Reap the tool-server child before exiting
    state.session.disconnect().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown requested");
}

#[derive(Debug, Serialize)]
struct ToolSummary {
    name: String,
    description: String,
}

#[derive(Debug, Serialize)]
struct ConnectResponse {
    connected: bool,
    message: String,
    tools: Vec<ToolSummary>,
}

#[derive(Debug, Deserialize)]
struct ForecastRequest {
    location: String,
}

#[derive(Debug, Serialize)]
struct TextResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    token: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    ok: bool,
    message: String,
    user: Option<UserContext>,
}

#[derive(Debug, Deserialize)]
struct AlertsRequest {
    state: String,
    #[serde(default)]
    token: Option<String>,
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn connect(State(state): State<Arc<AppState>>) -> Json<ConnectResponse> {
    match state.session.connect().await {
        Ok(tools) => Json(ConnectResponse {
            connected: true,
            message: format!("Connected to tool server ({} tools discovered)", tools.len()),
            tools: tools
                .into_iter()
                .map(|t| ToolSummary {
                    name: t.name,
                    description: t.description,
                })
                .collect(),
        }),
        Err(e) => Json(ConnectResponse {
            connected: false,
            message: format!("Failed to connect: {}", e),
            tools: Vec::new(),
        }),
    }
}

async fn disconnect(State(state): State<Arc<AppState>>) -> Json<TextResponse> {
    state.session.disconnect().await;
    Json(TextResponse {
        text: "Disconnected.".to_string(),
    })
}

async fn forecast(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ForecastRequest>,
) -> Json<TextResponse> {
    let location = request.location.trim();
    if location.is_empty() {
        return Json(TextResponse {
            text: "Please enter a location".to_string(),
        });
    }
    if !state.session.is_connected().await {
        return Json(TextResponse {
            text: "Not connected to tool server. Please connect first.".to_string(),
        });
    }

    let Some(api_key) = state.geocode_api_key.as_deref() else {
        return Json(TextResponse {
            text: "Geocoding API key not configured".to_string(),
        });
    };

    let coordinates = match geocode::lookup(&state.http, location, api_key).await {
        Ok(Some(coordinates)) => coordinates,
        Ok(None) => {
            return Json(TextResponse {
                text: "Failed to geocode location".to_string(),
            })
        }
        Err(e) => {
            tracing::warn!("Geocoding failed: {}", e);
            return Json(TextResponse {
                text: format!("Geocoding error: {}", e),
            });
        }
    };

    let text = state
        .session
        .forecast(location, coordinates.0, coordinates.1)
        .await;
    Json(TextResponse { text })
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Json<LoginResponse> {
    let token = request.token.trim();
    if token.is_empty() {
        return Json(LoginResponse {
            ok: false,
            message: "No token provided".to_string(),
            user: None,
        });
    }

    match UserContext::from_token(token, &state.required_role) {
        Some(user) => Json(LoginResponse {
            ok: true,
            message: format!(
                "Token accepted. Subject: {}. Claims: {}",
                user.subject,
                if user.roles.is_empty() {
                    "(none)".to_string()
                } else {
                    user.roles.join(", ")
                }
            ),
            user: Some(user),
        }),
        None => Json(LoginResponse {
            ok: false,
            message: "Failed to parse token".to_string(),
            user: None,
        }),
    }
}

async fn alerts(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AlertsRequest>,
) -> Json<TextResponse> {
    let user = request
        .token
        .as_deref()
        .and_then(|t| UserContext::from_token(t, &state.required_role));

    let authorized = user
        .map(|u| u.has_role(&state.required_role))
        .unwrap_or(false);
    if !authorized {
        return Json(TextResponse {
            text: "Access denied: you don't have permission to view weather alerts.".to_string(),
        });
    }

    let us_state = request.state.trim();
    if us_state.is_empty() {
        return Json(TextResponse {
            text: "Please enter a US state".to_string(),
        });
    }
    if !state.session.is_connected().await {
        return Json(TextResponse {
            text: "Not connected to tool server. Please connect first.".to_string(),
        });
    }

    let text = state
        .session
        .alerts(us_state, request.token.as_deref())
        .await;
    Json(TextResponse { text })
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>Skycast - Weather via MCP</title>
<style>
  body { font-family: sans-serif; max-width: 46rem; margin: 2rem auto; padding: 0 1rem; }
  section { border: 1px solid #ccc; border-radius: 6px; padding: 1rem; margin-bottom: 1rem; }
  pre { background: #f5f5f5; padding: 0.6rem; white-space: pre-wrap; }
  input, textarea { width: 100%; box-sizing: border-box; margin: 0.3rem 0; }
  button { margin: 0.3rem 0.3rem 0.3rem 0; }
</style>
</head>
<body>
<h1>Skycast</h1>
<p>Weather forecasts and alerts via a locally spawned MCP tool server.</p>

<section>
  <h2>Connection</h2>
  <button onclick="connect()">Connect</button>
  <button onclick="disconnect()">Disconnect</button>
  <pre id="connection">Not connected.</pre>
</section>

<section>
  <h2>Forecast</h2>
  <input id="location" placeholder="City name, e.g. London">
  <button onclick="forecast()">Get Forecast</button>
  <pre id="forecast">-</pre>
</section>

<section>
  <h2>Login</h2>
  <textarea id="token" rows="3" placeholder="Paste your ID token (JWT)"></textarea>
  <button onclick="login()">Accept Token</button>
  <button onclick="logout()">Logout</button>
  <pre id="login">Not signed in.</pre>
</section>

<section>
  <h2>Alerts</h2>
  <input id="state" placeholder="US state, e.g. California">
  <button onclick="alerts()">Get Alerts</button>
  <pre id="alerts">Login first, then query alerts.</pre>
</section>

<script>
async function api(path, body) {
  const res = await fetch(path, {
    method: 'POST',
    headers: {'Content-Type': 'application/json'},
    body: JSON.stringify(body || {})
  });
  return res.json();
}
async function connect() {
  const r = await api('/api/connect');
  let text = r.message;
  for (const t of r.tools) text += '\n  - ' + t.name + ': ' + t.description;
  document.getElementById('connection').textContent = text;
}
async function disconnect() {
  const r = await api('/api/disconnect');
  document.getElementById('connection').textContent = r.text;
}
async function forecast() {
  const r = await api('/api/forecast', {location: document.getElementById('location').value});
  document.getElementById('forecast').textContent = r.text;
}
async function login() {
  const r = await api('/api/login', {token: document.getElementById('token').value});
  document.getElementById('login').textContent = r.message;
}
function logout() {
  document.getElementById('token').value = '';
  document.getElementById('login').textContent = 'Logged out.';
}
async function alerts() {
  const r = await api('/api/alerts', {
    state: document.getElementById('state').value,
    token: document.getElementById('token').value || null
  });
  document.getElementById('alerts').textContent = r.text;
}
</script>
</body>
</html>
"#;
