use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::home::FixtureRecord;
use crate::home::FixtureRegistry;
use crate::home::Home;
use crate::home::HomeError;
use crate::home::HomeSnapshot;
use crate::home::PowerStatus;
use crate::home::ThermostatRecord;
use crate::home::ThermostatUpdate;

/// Raw query string pairs, in the order they were sent.
///
/// Taken as a list rather than a struct so a repeated key is never a
/// deserialization error; the first occurrence wins.
type QueryPairs = Query<Vec<(String, String)>>;

/// Parameters that may arrive in the query string, a JSON body, or both.
///
/// Body values take precedence over query values.
trait Params: Sized {
    fn from_query(pairs: &[(String, String)]) -> Self;

    fn overlay(self, body: Self) -> Self;
}

fn merge<T: Params>(Query(pairs): QueryPairs, body: Option<Json<T>>) -> T {
    let query = T::from_query(&pairs);
    match body {
        Some(Json(body)) => query.overlay(body),
        None => query,
    }
}

/// First value sent for `key`.
fn first<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn first_value(pairs: &[(String, String)], key: &str) -> Option<Value> {
    first(pairs, key).map(|v| Value::String(v.to_string()))
}

/// Parameters for GET /fixtures
#[derive(Debug, Default, Deserialize)]
struct FixtureQuery {
    #[serde(default)]
    name: Option<String>,
}

impl Params for FixtureQuery {
    fn from_query(pairs: &[(String, String)]) -> Self {
        Self {
            name: first(pairs, "name").map(str::to_string),
        }
    }

    fn overlay(self, body: Self) -> Self {
        Self {
            name: body.name.or(self.name),
        }
    }
}

/// Parameters for POST /fixtures/{name}
#[derive(Debug, Default, Deserialize)]
struct CreateFixtureParams {
    #[serde(default)]
    status: Option<Value>,
}

impl Params for CreateFixtureParams {
    fn from_query(pairs: &[(String, String)]) -> Self {
        Self {
            status: first_value(pairs, "status"),
        }
    }

    fn overlay(self, body: Self) -> Self {
        Self {
            status: body.status.or(self.status),
        }
    }
}

/// Parameters for PATCH /thermostat
#[derive(Debug, Default, Deserialize)]
struct ThermostatParams {
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    temp_setting: Option<Value>,
}

impl Params for ThermostatParams {
    fn from_query(pairs: &[(String, String)]) -> Self {
        Self {
            status: first_value(pairs, "status"),
            temp_setting: first_value(pairs, "temp_setting"),
        }
    }

    fn overlay(self, body: Self) -> Self {
        Self {
            status: body.status.or(self.status),
            temp_setting: body.temp_setting.or(self.temp_setting),
        }
    }
}

impl From<ThermostatParams> for ThermostatUpdate {
    fn from(params: ThermostatParams) -> Self {
        let temp_setting = params.temp_setting.as_ref().and_then(|raw| {
            let parsed = parse_integer(raw);
            if parsed.is_none() {
                tracing::debug!("Ignoring non-integer temp_setting {}", raw);
            }
            parsed
        });

        ThermostatUpdate {
            status: params.status.and_then(value_text),
            temp_setting,
        }
    }
}

/// Text form of a parameter, `None` for JSON null.
fn value_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Integer form of a parameter given as a JSON number or a numeric string.
fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Serialize)]
struct FixturesResponse {
    fixtures: FixtureRegistry,
}

#[derive(Serialize)]
struct ThermostatResponse {
    thermostat: ThermostatRecord,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// A single fixture keyed by its name, e.g. `{"kitchen": {...}}`
type NamedFixture = BTreeMap<String, FixtureRecord>;

fn named(name: String, record: FixtureRecord) -> Json<NamedFixture> {
    Json(BTreeMap::from([(name, record)]))
}

impl IntoResponse for HomeError {
    fn into_response(self) -> Response {
        match self {
            HomeError::NotFound(_) => {
                (StatusCode::NOT_FOUND, MessageResponse::new(self.to_string())).into_response()
            }
            HomeError::Conflict(_) => {
                (StatusCode::CONFLICT, MessageResponse::new(self.to_string())).into_response()
            }
            HomeError::Persistence(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                MessageResponse::new("failed to save home state"),
            )
                .into_response(),
        }
    }
}

/// Handler for GET /home
#[tracing::instrument(skip(home))]
async fn home_systems(State(home): State<Arc<Home>>) -> Json<HomeSnapshot> {
    Json(home.snapshot())
}

/// Handler for GET /fixtures
#[tracing::instrument(skip(home))]
async fn list_fixtures(
    State(home): State<Arc<Home>>,
    query: QueryPairs,
    body: Option<Json<FixtureQuery>>,
) -> Result<Response, HomeError> {
    // An empty name means no name, as with no parameter at all
    match merge(query, body).name.filter(|name| !name.is_empty()) {
        Some(name) => {
            let record = home.fixture(&name)?;
            Ok(named(name, record).into_response())
        }
        None => Ok(Json(FixturesResponse {
            fixtures: home.fixtures(),
        })
        .into_response()),
    }
}

/// Handler for POST /fixtures/{name}
#[tracing::instrument(skip(home))]
async fn create_fixture(
    State(home): State<Arc<Home>>,
    Path(name): Path<String>,
    query: QueryPairs,
    body: Option<Json<CreateFixtureParams>>,
) -> Result<Json<NamedFixture>, HomeError> {
    let status = merge(query, body).status.and_then(value_text);
    let status = match status.as_deref() {
        Some("on") => Some(PowerStatus::On),
        Some("off") | None => None,
        Some(other) => {
            tracing::debug!("Unrecognised status '{}' for new fixture, defaulting to off", other);
            None
        }
    };

    let record = home.create_fixture(&name, status)?;
    Ok(named(name, record))
}

/// Handler for PATCH /fixtures/{name}
#[tracing::instrument(skip(home))]
async fn toggle_fixture(
    State(home): State<Arc<Home>>,
    Path(name): Path<String>,
) -> Result<Json<NamedFixture>, HomeError> {
    let record = home.toggle_fixture(&name)?;
    Ok(named(name, record))
}

/// Handler for DELETE /fixtures/{name}
#[tracing::instrument(skip(home))]
async fn delete_fixture(
    State(home): State<Arc<Home>>,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>, HomeError> {
    home.delete_fixture(&name)?;
    Ok(MessageResponse::new(format!(
        "{} fixture deleted successfully",
        name
    )))
}

/// Handler for GET /thermostat
#[tracing::instrument(skip(home))]
async fn thermostat(State(home): State<Arc<Home>>) -> Json<ThermostatResponse> {
    Json(ThermostatResponse {
        thermostat: home.thermostat(),
    })
}

/// Handler for PATCH /thermostat
///
/// Invalid fields are ignored, so this only fails when the state can't be saved.
#[tracing::instrument(skip(home))]
async fn update_thermostat(
    State(home): State<Arc<Home>>,
    query: QueryPairs,
    body: Option<Json<ThermostatParams>>,
) -> Result<Json<ThermostatResponse>, HomeError> {
    let update = ThermostatUpdate::from(merge(query, body));
    let thermostat = home.update_thermostat(&update)?;
    Ok(Json(ThermostatResponse { thermostat }))
}

/// Create the API router with all endpoints
pub fn create_router(home: Arc<Home>) -> Router {
    Router::new()
        .route("/home", get(home_systems))
        .route("/fixtures", get(list_fixtures))
        .route(
            "/fixtures/:name",
            post(create_fixture)
                .patch(toggle_fixture)
                .delete(delete_fixture),
        )
        .route("/thermostat", get(thermostat).patch(update_thermostat))
        .layer(TraceLayer::new_for_http())
        .with_state(home)
}

/// Start the HTTP API server
///
/// Binds to `listen:port` and serves until `shutdown_rx` fires.
pub async fn serve(
    listen: String,
    port: u16,
    home: Arc<Home>,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> std::io::Result<()> {
    let app = create_router(home);

    let listener = TcpListener::bind((listen.as_str(), port)).await?;
    tracing::info!("Starting HTTP API server on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            tracing::info!("HTTP API server shutting down gracefully");
        })
        .await?;

    Ok(())
}
