//! # REST + JSON-RPC + WebSocket API
//!
//! Builds the axum router that exposes the ledger node's HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                          | Description                            |
//! |--------|-------------------------------|----------------------------------------|
//! | GET    | `/health`                     | Liveness check                         |
//! | GET    | `/status`                     | Ledger identity and summary            |
//! | GET    | `/costs`                      | Price and burn ratios                  |
//! | GET    | `/balances/:address`          | F, N and T balances of an address      |
//! | GET    | `/balances/:address/:tier`    | A single balance                       |
//! | GET    | `/approvals/:owner/:operator` | Operator approval flag                 |
//! | GET    | `/events?from=&limit=`        | Persisted event log, by sequence       |
//! | POST   | `/rpc`                        | JSON-RPC 2.0 gateway                   |
//! | GET    | `/ws`                         | WebSocket stream of ledger events      |
//!
//! Native currency amounts are rendered as decimal wei strings; they do not
//! fit in a JSON number.
//!
//! ## JSON-RPC
//!
//! Mutating methods take a single named-parameter object (optionally wrapped
//! in a one-element array). `origin` tells the ledger what kind of caller is
//! behind the request and defaults to `"external"`.
//!
//! | Method                   | Params                              |
//! |--------------------------|-------------------------------------|
//! | `tier_mintTokenF`        | `{from, qty, value, origin?}`       |
//! | `tier_mintTokenN`        | `{from, qty, origin?}`              |
//! | `tier_mintTokenT`        | `{from, qty, origin?}`              |
//! | `tier_setApprovalForAll` | `{from, operator, approved}`        |
//! | `tier_balanceOf`         | `[address, tier]`                   |
//! | `tier_isApprovedForAll`  | `[owner, operator]`                 |
//!
//! plus the parameterless reads `tier_mintTokenFCost`, `tier_mintTokenNCost`,
//! `tier_mintTokenTCost`, `tier_mintTokenTCostInN`, `tier_ledgerAddress`,
//! `tier_stateRoot`, `tier_version` and `tier_networkId`.
//!
//! A contract rejection comes back as error code `3` with the revert reason
//! as `message` and the error kind as `data`.
//!
//! ## Trust Boundary
//!
//! `from` is taken as the caller's identity without any signature check.
//! Any client that can reach `/rpc` can mint or set approvals as any
//! address, including approving an operator on someone else's behalf.
//! The node must sit behind a gateway that authenticates callers and pins
//! `from` to the authenticated account; owner-only approval holds only
//! under that assumption.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tiermint_contracts::{LedgerEvent, MintReceipt};
use tiermint_protocol::types::{format_ether, Address, CallContext, CallerKind, Tier, Wei};

use crate::metrics::SharedMetrics;
use crate::service::{LedgerService, NodeEvent, ServiceError};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone, everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Network name (e.g., "devnet", "testnet", "mainnet").
    pub network: String,
    /// Numeric network identifier.
    pub network_id: u32,
    /// The hosted ledger.
    pub service: Arc<LedgerService>,
    /// Broadcast channel for live ledger events.
    pub event_tx: broadcast::Sender<NodeEvent>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/costs", get(costs_handler))
        .route("/balances/:address", get(balances_handler))
        .route("/balances/:address/:tier", get(balance_handler))
        .route("/approvals/:owner/:operator", get(approval_handler))
        .route("/events", get(events_handler))
        .route("/rpc", post(rpc_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

/// Error code for a call the ledger rejected.
pub const RPC_EXECUTION_REVERTED: i32 = 3;
pub const RPC_INVALID_REQUEST: i32 = -32600;
pub const RPC_METHOD_NOT_FOUND: i32 = -32601;
pub const RPC_INVALID_PARAMS: i32 = -32602;
pub const RPC_INTERNAL_ERROR: i32 = -32603;

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version. Must be "2.0".
    pub jsonrpc: String,
    /// The method to invoke.
    pub method: String,
    /// Method parameters (positional or named).
    pub params: Option<Value>,
    /// Request identifier. Echoed back in the response.
    pub id: Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version. Always "2.0".
    pub jsonrpc: String,
    /// The result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Request identifier, echoed from the request.
    pub id: Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i32,
    /// Short human-readable error description.
    pub message: String,
    /// Optional structured error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(RPC_INVALID_PARAMS, format!("Invalid params: {}", message.into()))
    }

    fn internal(message: impl std::fmt::Display) -> Self {
        Self::new(RPC_INTERNAL_ERROR, format!("Internal error: {}", message))
    }
}

impl From<ServiceError> for JsonRpcError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Rejected(e) => Self {
                code: RPC_EXECUTION_REVERTED,
                message: e.reason(),
                data: Some(Value::String(e.kind().to_string())),
            },
            ServiceError::Storage(e) => Self::internal(e),
        }
    }
}

type RpcResult = Result<Value, JsonRpcError>;

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Network name.
    pub network: String,
    /// Address owners approve to enable burn-funded mints.
    pub ledger_address: Address,
    /// Address that deployed the ledger.
    pub deployer: Address,
    /// Hex-encoded Merkle root over all non-zero balances.
    pub state_root: String,
    /// Retained native currency, in wei.
    pub native_balance: String,
    /// Addresses holding a non-zero balance.
    pub holders: usize,
    /// Length of the ledger's event log.
    pub event_count: u64,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /costs`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CostsResponse {
    /// Wei per tier-F unit.
    pub mint_token_f_cost: String,
    /// Same price in whole currency units, for display.
    pub mint_token_f_cost_ether: String,
    pub mint_token_n_cost: u64,
    pub mint_token_t_cost: u64,
    pub mint_token_t_cost_in_n: u64,
}

/// Response payload for `GET /balances/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalancesResponse {
    pub address: Address,
    pub f: u64,
    pub n: u64,
    pub t: u64,
}

/// Response payload for `GET /balances/:address/:tier`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub address: Address,
    pub tier: Tier,
    pub token_id: u8,
    /// Display name, e.g. `"Token N"`.
    pub token_name: String,
    pub balance: u64,
}

/// Response payload for `GET /approvals/:owner/:operator`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApprovalResponse {
    pub owner: Address,
    pub operator: Address,
    pub approved: bool,
}

/// Query string for `GET /events`.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// First sequence number to return. Defaults to 0.
    pub from: Option<u64>,
    /// Page size, capped at [`MAX_EVENTS_PAGE`].
    pub limit: Option<usize>,
}

/// Largest page `GET /events` returns.
pub const MAX_EVENTS_PAGE: usize = 1000;

/// One entry of the persisted event log.
#[derive(Debug, Serialize, Deserialize)]
pub struct SequencedEvent {
    pub seq: u64,
    pub event: LedgerEvent,
}

/// Response payload for `GET /events`.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<SequencedEvent>,
    /// Total logged events; the next event gets this sequence number.
    pub next_seq: u64,
}

/// JSON rendering of a [`MintReceipt`] with the payment as a wei string.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReceiptResponse {
    pub receipt_id: String,
    pub caller: Address,
    pub tier: Tier,
    pub qty: u64,
    pub paid: String,
    pub events: Vec<LedgerEvent>,
    pub timestamp: String,
}

impl From<MintReceipt> for ReceiptResponse {
    fn from(r: MintReceipt) -> Self {
        Self {
            receipt_id: r.receipt_id.to_string(),
            caller: r.caller,
            tier: r.tier,
            qty: r.qty,
            paid: r.paid.to_string(),
            events: r.events,
            timestamp: r.timestamp.to_rfc3339(),
        }
    }
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response()
}

// ---------------------------------------------------------------------------
// REST Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: ledger identity and summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let resp = state.service.read(|c| StatusResponse {
        version: state.version.clone(),
        network: state.network.clone(),
        ledger_address: c.ledger_address(),
        deployer: c.deployer(),
        state_root: hex::encode(c.state_root()),
        native_balance: c.native_balance().to_string(),
        holders: c.ledger().holders().len(),
        event_count: c.event_count(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    });
    Json(resp)
}

/// `GET /costs`: the four cost constants.
async fn costs_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.read(|c| CostsResponse {
        mint_token_f_cost: c.mint_token_f_cost().to_string(),
        mint_token_f_cost_ether: format_ether(c.mint_token_f_cost()),
        mint_token_n_cost: c.mint_token_n_cost(),
        mint_token_t_cost: c.mint_token_t_cost(),
        mint_token_t_cost_in_n: c.mint_token_t_cost_in_n(),
    }))
}

/// `GET /balances/:address`: all three balances of an address.
async fn balances_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let address = match address.parse::<Address>() {
        Ok(a) => a,
        Err(e) => return bad_request(e.to_string()),
    };
    let [f, n, t] = state.service.read(|c| c.balances_of(&address));
    Json(BalancesResponse { address, f, n, t }).into_response()
}

/// `GET /balances/:address/:tier`: one balance. `tier` accepts `F`/`N`/`T`
/// or the token id.
async fn balance_handler(
    Path((address, tier)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Response {
    let address = match address.parse::<Address>() {
        Ok(a) => a,
        Err(e) => return bad_request(e.to_string()),
    };
    let tier = match tier.parse::<Tier>() {
        Ok(t) => t,
        Err(e) => return bad_request(e.to_string()),
    };
    let balance = state.service.read(|c| c.balance_of(&address, tier));
    Json(BalanceResponse {
        address,
        tier,
        token_id: tier.token_id(),
        token_name: tier.token_name().to_string(),
        balance,
    })
    .into_response()
}

/// `GET /approvals/:owner/:operator`: operator approval flag.
async fn approval_handler(
    Path((owner, operator)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Response {
    let (owner, operator) = match (owner.parse::<Address>(), operator.parse::<Address>()) {
        (Ok(o), Ok(p)) => (o, p),
        (Err(e), _) | (_, Err(e)) => return bad_request(e.to_string()),
    };
    let approved = state
        .service
        .read(|c| c.is_approved_for_all(&owner, &operator));
    Json(ApprovalResponse {
        owner,
        operator,
        approved,
    })
    .into_response()
}

/// `GET /events`: a page of the persisted event log.
async fn events_handler(
    Query(query): Query<EventsQuery>,
    State(state): State<AppState>,
) -> Response {
    let from = query.from.unwrap_or(0);
    let limit = query.limit.unwrap_or(MAX_EVENTS_PAGE).min(MAX_EVENTS_PAGE);
    let events = match state.service.events(from, limit) {
        Ok(events) => events,
        Err(e) => {
            tracing::error!(error = %e, "event log read failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response();
        }
    };
    let next_seq = state.service.read(|c| c.event_count());
    Json(EventsResponse {
        events: events
            .into_iter()
            .map(|(seq, event)| SequencedEvent { seq, event })
            .collect(),
        next_seq,
    })
    .into_response()
}

// ---------------------------------------------------------------------------
// JSON-RPC
// ---------------------------------------------------------------------------

/// `POST /rpc`: JSON-RPC 2.0 gateway.
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError::new(
                RPC_INVALID_REQUEST,
                "Invalid Request: jsonrpc must be \"2.0\"",
            )),
            id: req.id,
        });
    }

    let (result, error) = match dispatch(&state, &req.method, req.params.as_ref()) {
        Ok(v) => (Some(v), None),
        Err(e) => (None, Some(e)),
    };

    Json(JsonRpcResponse {
        jsonrpc: "2.0".into(),
        result,
        error,
        id: req.id,
    })
}

fn dispatch(state: &AppState, method: &str, params: Option<&Value>) -> RpcResult {
    let svc = &state.service;
    match method {
        "tier_mintTokenF" => rpc_mint(svc, Tier::F, params),
        "tier_mintTokenN" => rpc_mint(svc, Tier::N, params),
        "tier_mintTokenT" => rpc_mint(svc, Tier::T, params),
        "tier_setApprovalForAll" => rpc_set_approval(svc, params),
        "tier_balanceOf" => {
            let address = positional_address(params, 0)?;
            let tier = positional(params, 1)
                .and_then(parse_tier)
                .ok_or_else(|| JsonRpcError::invalid_params("expected [address, tier]"))?;
            Ok(Value::from(svc.read(|c| c.balance_of(&address, tier))))
        }
        "tier_isApprovedForAll" => {
            let owner = positional_address(params, 0)?;
            let operator = positional_address(params, 1)?;
            Ok(Value::from(
                svc.read(|c| c.is_approved_for_all(&owner, &operator)),
            ))
        }
        "tier_mintTokenFCost" => Ok(Value::from(
            svc.read(|c| c.mint_token_f_cost()).to_string(),
        )),
        "tier_mintTokenNCost" => Ok(Value::from(svc.read(|c| c.mint_token_n_cost()))),
        "tier_mintTokenTCost" => Ok(Value::from(svc.read(|c| c.mint_token_t_cost()))),
        "tier_mintTokenTCostInN" => Ok(Value::from(svc.read(|c| c.mint_token_t_cost_in_n()))),
        "tier_ledgerAddress" => Ok(Value::from(svc.read(|c| c.ledger_address()).to_hex())),
        "tier_stateRoot" => Ok(Value::from(hex::encode(svc.read(|c| c.state_root())))),
        "tier_version" => Ok(Value::from(state.version.clone())),
        "tier_networkId" => Ok(Value::from(state.network_id)),
        _ => Err(JsonRpcError::new(
            RPC_METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )),
    }
}

/// Named parameters for the three mint methods.
#[derive(Debug, Deserialize)]
struct MintParams {
    from: Address,
    qty: u64,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    origin: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApprovalParams {
    from: Address,
    operator: Address,
    approved: bool,
}

fn rpc_mint(svc: &LedgerService, tier: Tier, params: Option<&Value>) -> RpcResult {
    let p: MintParams = named_params(params)?;
    let value = match &p.value {
        Some(v) => parse_wei(v)
            .ok_or_else(|| JsonRpcError::invalid_params("value must be a wei amount"))?,
        None => 0,
    };
    let kind = match &p.origin {
        Some(o) => o.parse::<CallerKind>().map_err(JsonRpcError::invalid_params)?,
        None => CallerKind::External,
    };
    let ctx = CallContext::external(p.from)
        .with_value(value)
        .with_kind(kind);

    let receipt = svc.mint(tier, &ctx, p.qty)?;
    serde_json::to_value(ReceiptResponse::from(receipt)).map_err(JsonRpcError::internal)
}

fn rpc_set_approval(svc: &LedgerService, params: Option<&Value>) -> RpcResult {
    let p: ApprovalParams = named_params(params)?;
    let event = svc.set_approval_for_all(&CallContext::external(p.from), p.operator, p.approved)?;
    serde_json::to_value(event).map_err(JsonRpcError::internal)
}

/// Accepts either `{...}` or `[{...}]`.
fn named_params<T: serde::de::DeserializeOwned>(params: Option<&Value>) -> Result<T, JsonRpcError> {
    let obj = match params {
        Some(Value::Array(items)) if items.len() == 1 => &items[0],
        Some(v @ Value::Object(_)) => v,
        _ => return Err(JsonRpcError::invalid_params("expected a parameter object")),
    };
    T::deserialize(obj).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

fn positional(params: Option<&Value>, idx: usize) -> Option<&Value> {
    params.and_then(|p| p.as_array()).and_then(|a| a.get(idx))
}

fn positional_address(params: Option<&Value>, idx: usize) -> Result<Address, JsonRpcError> {
    positional(params, idx)
        .and_then(|v| v.as_str())
        .ok_or_else(|| JsonRpcError::invalid_params(format!("missing address at position {}", idx)))?
        .parse::<Address>()
        .map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

/// Tier as `"F"`-style name or numeric token id.
fn parse_tier(v: &Value) -> Option<Tier> {
    match v {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64().and_then(Tier::from_token_id),
        _ => None,
    }
}

/// Wei as a decimal string, a `0x` hex string, or a JSON integer.
fn parse_wei(v: &Value) -> Option<Wei> {
    match v {
        Value::String(s) => match s.strip_prefix("0x") {
            Some(hex) => Wei::from_str_radix(hex, 16).ok(),
            None => s.parse().ok(),
        },
        Value::Number(n) => n.as_u64().map(Wei::from),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// WebSocket
// ---------------------------------------------------------------------------

/// `GET /ws`: WebSocket upgrade for live event streaming.
///
/// Clients receive JSON-encoded [`NodeEvent`] messages. The connection is
/// push-only; client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Drives a single WebSocket connection, forwarding broadcast events
/// until the client disconnects or the channel is closed.
async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tiermint_contracts::MintCosts;
    use tiermint_protocol::storage::LedgerStore;
    use tower::ServiceExt;

    use crate::metrics::NodeMetrics;

    const ALICE: &str = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1";

    /// Creates a test AppState backed by a temporary store.
    fn test_app_state() -> AppState {
        let store = LedgerStore::open_temporary().expect("temp db");
        let (event_tx, _) = broadcast::channel(16);
        let metrics = Arc::new(NodeMetrics::new());
        let service = LedgerService::load_or_deploy(
            store,
            Address::from_bytes([0xd0; 20]),
            0,
            MintCosts::default(),
            Arc::clone(&metrics),
            event_tx.clone(),
        )
        .expect("deploy");

        AppState {
            version: "0.1.0-test".into(),
            network: "devnet".into(),
            network_id: tiermint_protocol::config::NETWORK_ID_DEVNET,
            service: Arc::new(service),
            event_tx,
            metrics,
        }
    }

    /// Sends a GET request and returns the (status, body_bytes).
    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    /// Sends a JSON-RPC call and returns the decoded response.
    async fn rpc(router: &Router, method: &str, params: Value) -> JsonRpcResponse {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });
        let req = Request::builder()
            .method("POST")
            .uri("/rpc")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn price(router_state: &AppState, qty: u64) -> String {
        (router_state.service.read(|c| c.mint_token_f_cost()) * qty as u128).to_string()
    }

    // -- REST -----------------------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn status_reports_ledger_identity() {
        let state = test_app_state();
        let expected = state.service.read(|c| c.ledger_address());
        let router = create_router(state);
        let (status, body) = get(&router, "/status").await;

        assert_eq!(status, StatusCode::OK);
        let resp: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.ledger_address, expected);
        assert_eq!(resp.network, "devnet");
        assert_eq!(resp.state_root, hex::encode([0u8; 32]));
        assert_eq!(resp.native_balance, "0");
    }

    #[tokio::test]
    async fn costs_endpoint_returns_defaults() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/costs").await;

        assert_eq!(status, StatusCode::OK);
        let resp: CostsResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.mint_token_f_cost, "10000000000000000");
        assert_eq!(resp.mint_token_f_cost_ether, "0.01");
        assert_eq!(resp.mint_token_n_cost, 3);
        assert_eq!(resp.mint_token_t_cost, 10);
        assert_eq!(resp.mint_token_t_cost_in_n, 1);
    }

    #[tokio::test]
    async fn balances_default_to_zero() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, &format!("/balances/{}", ALICE)).await;

        assert_eq!(status, StatusCode::OK);
        let resp: BalancesResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!((resp.f, resp.n, resp.t), (0, 0, 0));
    }

    #[tokio::test]
    async fn malformed_address_is_bad_request() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/balances/0xnothex").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(!err.error.is_empty());

        let (status, _) = get(&router, &format!("/balances/{}/X", ALICE)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // -- JSON-RPC -------------------------------------------------------------

    #[tokio::test]
    async fn rpc_canonical_tier_climb() {
        let state = test_app_state();
        let value = price(&state, 100);
        let ledger = state.service.read(|c| c.ledger_address()).to_hex();
        let router = create_router(state);

        let resp = rpc(
            &router,
            "tier_mintTokenF",
            serde_json::json!({ "from": ALICE, "qty": 100, "value": value }),
        )
        .await;
        assert!(resp.error.is_none());
        let receipt: ReceiptResponse = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(receipt.qty, 100);
        assert_eq!(receipt.paid, value);

        let resp = rpc(
            &router,
            "tier_setApprovalForAll",
            serde_json::json!({ "from": ALICE, "operator": ledger, "approved": true }),
        )
        .await;
        assert!(resp.error.is_none());

        let resp = rpc(
            &router,
            "tier_mintTokenN",
            serde_json::json!([{ "from": ALICE, "qty": 3 }]),
        )
        .await;
        assert!(resp.error.is_none());

        let resp = rpc(
            &router,
            "tier_mintTokenT",
            serde_json::json!({ "from": ALICE, "qty": 3 }),
        )
        .await;
        assert!(resp.error.is_none());

        for (tier, expected) in [("F", 61), ("N", 0), ("T", 3)] {
            let resp = rpc(&router, "tier_balanceOf", serde_json::json!([ALICE, tier])).await;
            assert_eq!(resp.result.unwrap(), serde_json::json!(expected));
        }

        let (_, body) = get(&router, &format!("/balances/{}/2", ALICE)).await;
        let resp: BalanceResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.tier, Tier::T);
        assert_eq!(resp.token_name, "Token T");
        assert_eq!(resp.balance, 3);

        // Mint F, approval, then burn+mint for each of N and T.
        let (_, body) = get(&router, "/status").await;
        let status: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(status.event_count, 7);
    }

    #[tokio::test]
    async fn events_endpoint_pages_the_log() {
        let state = test_app_state();
        let value = price(&state, 6);
        let ledger = state.service.read(|c| c.ledger_address()).to_hex();
        let router = create_router(state);

        rpc(
            &router,
            "tier_mintTokenF",
            serde_json::json!({ "from": ALICE, "qty": 6, "value": value }),
        )
        .await;
        rpc(
            &router,
            "tier_setApprovalForAll",
            serde_json::json!({ "from": ALICE, "operator": ledger, "approved": true }),
        )
        .await;
        rpc(
            &router,
            "tier_mintTokenN",
            serde_json::json!({ "from": ALICE, "qty": 2 }),
        )
        .await;
        // Zero-quantity mints are accepted but log nothing.
        let resp = rpc(
            &router,
            "tier_mintTokenF",
            serde_json::json!({ "from": ALICE, "qty": 0 }),
        )
        .await;
        assert!(resp.error.is_none());

        let (status, body) = get(&router, "/events").await;
        assert_eq!(status, StatusCode::OK);
        let page: EventsResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(page.next_seq, 4);
        let seqs: Vec<u64> = page.events.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3]);

        let (_, body) = get(&router, "/events?from=2&limit=1").await;
        let page: EventsResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(page.events.len(), 1);
        assert_eq!(page.events[0].seq, 2);
        assert!(matches!(
            page.events[0].event,
            LedgerEvent::Burned { tier: Tier::F, qty: 6, .. }
        ));
    }

    #[tokio::test]
    async fn rpc_rejection_maps_to_revert_reason() {
        let router = create_router(test_app_state());
        let resp = rpc(
            &router,
            "tier_mintTokenN",
            serde_json::json!({ "from": ALICE, "qty": 1 }),
        )
        .await;

        let err = resp.error.unwrap();
        assert_eq!(err.code, RPC_EXECUTION_REVERTED);
        assert_eq!(err.message, "Not approved for transfer");
        assert_eq!(err.data.unwrap(), "OperatorNotApproved");
    }

    #[tokio::test]
    async fn rpc_contract_origin_is_rejected() {
        let state = test_app_state();
        let value = price(&state, 1);
        let router = create_router(state);
        let resp = rpc(
            &router,
            "tier_mintTokenF",
            serde_json::json!({ "from": ALICE, "qty": 1, "value": value, "origin": "contract" }),
        )
        .await;

        let err = resp.error.unwrap();
        assert_eq!(err.code, RPC_EXECUTION_REVERTED);
        assert_eq!(err.message, "Caller cannot be contract");
    }

    #[tokio::test]
    async fn rpc_underpayment_is_rejected() {
        let router = create_router(test_app_state());
        let resp = rpc(
            &router,
            "tier_mintTokenF",
            serde_json::json!({ "from": ALICE, "qty": 100, "value": "100000000000000000" }),
        )
        .await;

        let err = resp.error.unwrap();
        assert_eq!(err.message, "Not enough ether sent");
        assert_eq!(err.data.unwrap(), "InsufficientPayment");
    }

    #[tokio::test]
    async fn rpc_bad_params() {
        let router = create_router(test_app_state());

        let resp = rpc(&router, "tier_mintTokenF", serde_json::json!({ "qty": 1 })).await;
        assert_eq!(resp.error.unwrap().code, RPC_INVALID_PARAMS);

        let resp = rpc(
            &router,
            "tier_mintTokenF",
            serde_json::json!({ "from": ALICE, "qty": 1, "origin": "robot" }),
        )
        .await;
        assert_eq!(resp.error.unwrap().code, RPC_INVALID_PARAMS);

        let resp = rpc(&router, "tier_balanceOf", serde_json::json!([ALICE])).await;
        assert_eq!(resp.error.unwrap().code, RPC_INVALID_PARAMS);
    }

    #[tokio::test]
    async fn rpc_cost_accessors() {
        let router = create_router(test_app_state());
        let resp = rpc(&router, "tier_mintTokenFCost", Value::Null).await;
        assert_eq!(resp.result.unwrap(), "10000000000000000");
        let resp = rpc(&router, "tier_mintTokenNCost", Value::Null).await;
        assert_eq!(resp.result.unwrap(), 3);
        let resp = rpc(&router, "tier_mintTokenTCost", Value::Null).await;
        assert_eq!(resp.result.unwrap(), 10);
        let resp = rpc(&router, "tier_mintTokenTCostInN", Value::Null).await;
        assert_eq!(resp.result.unwrap(), 1);
    }

    #[tokio::test]
    async fn rpc_version_and_network_id() {
        let router = create_router(test_app_state());
        let resp = rpc(&router, "tier_version", serde_json::json!([])).await;
        assert_eq!(resp.result.unwrap(), "0.1.0-test");
        let resp = rpc(&router, "tier_networkId", serde_json::json!([])).await;
        assert_eq!(
            resp.result.unwrap(),
            serde_json::json!(tiermint_protocol::config::NETWORK_ID_DEVNET)
        );
    }

    #[tokio::test]
    async fn rpc_unknown_method() {
        let router = create_router(test_app_state());
        let resp = rpc(&router, "tier_transfer", serde_json::json!([])).await;
        assert_eq!(resp.error.unwrap().code, RPC_METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn rpc_invalid_version_returns_error() {
        let router = create_router(test_app_state());
        let body = serde_json::json!({
            "jsonrpc": "1.0",
            "method": "tier_version",
            "params": [],
            "id": 20
        });
        let req = Request::builder()
            .method("POST")
            .uri("/rpc")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.oneshot(req).await.unwrap();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let resp: JsonRpcResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(resp.error.unwrap().code, RPC_INVALID_REQUEST);
    }

    #[tokio::test]
    async fn approval_endpoint_reflects_rpc_update() {
        let state = test_app_state();
        let ledger = state.service.read(|c| c.ledger_address()).to_hex();
        let router = create_router(state);

        let resp = rpc(
            &router,
            "tier_setApprovalForAll",
            serde_json::json!({ "from": ALICE, "operator": ledger, "approved": true }),
        )
        .await;
        assert!(resp.error.is_none());

        let (status, body) = get(&router, &format!("/approvals/{}/{}", ALICE, ledger)).await;
        assert_eq!(status, StatusCode::OK);
        let resp: ApprovalResponse = serde_json::from_slice(&body).unwrap();
        assert!(resp.approved);

        let resp = rpc(
            &router,
            "tier_isApprovedForAll",
            serde_json::json!([ledger, ALICE]),
        )
        .await;
        assert_eq!(resp.result.unwrap(), false);
    }

    #[tokio::test]
    async fn approval_is_recorded_for_the_stated_sender() {
        let state = test_app_state();
        let ledger = state.service.read(|c| c.ledger_address());
        let bob = Address::from_bytes([0xb0; 20]);
        let router = create_router(state.clone());

        let resp = rpc(
            &router,
            "tier_setApprovalForAll",
            serde_json::json!({ "from": bob.to_hex(), "operator": ledger.to_hex(), "approved": true }),
        )
        .await;
        assert!(resp.error.is_none());

        assert!(state.service.read(|c| c.is_approved_for_all(&bob, &ledger)));
        let alice: Address = ALICE.parse().unwrap();
        assert!(!state.service.read(|c| c.is_approved_for_all(&alice, &ledger)));
    }
}
