//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: list request → probes → grouped window calls
//! over HTTP → records, against a portal emulated by a wiremock responder.

use crm_batch_sdk::pagination::Strategy;
use crm_batch_sdk::{ClientConfig, CrmClient, Error, Filter, ListRequest, Order, Params, Select};
use futures::TryStreamExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use std::io::Write;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const HOOK: &str = "/rest/1/secret";

// ============================================================================
// Portal emulation
// ============================================================================

/// Answers `crm.deal.list` and `batch` the way a portal does
struct Portal {
    ids: Vec<u64>,
    /// Window lower bound whose command is rejected as rate limited
    rate_limited_window: Option<u64>,
}

impl Portal {
    fn new(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            rate_limited_window: None,
        }
    }

    fn record(id: u64) -> Value {
        json!({
            "ID": id.to_string(),
            "TITLE": format!("Deal {id}"),
            "STAGE_ID": if id % 3 == 0 { "WON" } else { "NEW" }
        })
    }

    /// Answer one list command: `(payload, total)` or an error entry
    fn list(&self, params: &Value) -> Result<(Value, Option<u64>), Value> {
        let filter = params.get("filter").and_then(Value::as_object);
        if let (Some(bound), Some(filter)) = (self.rate_limited_window, filter) {
            if filter.get(">=ID").and_then(number) == Some(bound) {
                return Err(json!({
                    "error": "QUERY_LIMIT_EXCEEDED",
                    "error_description": "Too many requests"
                }));
            }
        }

        let mut ids: Vec<u64> = self
            .ids
            .iter()
            .copied()
            .filter(|id| filter.map_or(true, |f| matches(*id, f)))
            .collect();
        let descending = params
            .pointer("/order/ID")
            .and_then(Value::as_str)
            .is_some_and(|d| d.eq_ignore_ascii_case("desc"));
        if descending {
            ids.reverse();
        }

        let start = params.get("start").and_then(signed).unwrap_or(0);
        let (offset, total) = if start < 0 {
            (0, None)
        } else {
            (start as usize, Some(ids.len() as u64))
        };

        let page: Vec<Value> = ids
            .iter()
            .skip(offset)
            .take(50)
            .map(|id| {
                let record = Self::record(*id);
                match params.get("select").and_then(Value::as_array) {
                    Some(fields) if !fields.is_empty() => {
                        let projected: Map<String, Value> = fields
                            .iter()
                            .filter_map(Value::as_str)
                            .filter_map(|f| record.get(f).map(|v| (f.to_string(), v.clone())))
                            .collect();
                        Value::Object(projected)
                    }
                    _ => record,
                }
            })
            .collect();
        Ok((Value::Array(page), total))
    }
}

fn number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn signed(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn matches(id: u64, filter: &Map<String, Value>) -> bool {
    filter.iter().all(|(key, expected)| match key.as_str() {
        ">=ID" => number(expected).is_some_and(|b| id >= b),
        "<=ID" => number(expected).is_some_and(|b| id <= b),
        ">ID" => number(expected).is_some_and(|b| id > b),
        "<ID" => number(expected).is_some_and(|b| id < b),
        other => {
            let field = other.trim_start_matches('=');
            Portal::record(id).get(field) == Some(expected)
        }
    })
}

/// Rebuild nested parameters from a `method?query` command string
fn decode_command(command: &str) -> (String, Value) {
    let (method, query) = command.split_once('?').unwrap_or((command, ""));
    let mut params = Map::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.split_once('[') {
            Some((name, rest)) => {
                let sub = rest.trim_end_matches(']').to_string();
                let entry = params
                    .entry(name.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(map) = entry {
                    map.insert(sub, Value::String(value.into_owned()));
                }
            }
            None => {
                params.insert(key.into_owned(), Value::String(value.into_owned()));
            }
        }
    }
    // select[0], select[1] ... back into an array
    if let Some(Value::Object(fields)) = params.get("select").cloned() {
        params.insert("select".to_string(), fields.into_values().collect());
    }
    (method.to_string(), Value::Object(params))
}

impl Respond for Portal {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or_default();

        if request.url.path().ends_with("/batch.json") {
            let mut results = Map::new();
            let mut errors = Map::new();
            let mut totals = Map::new();
            let commands = body["cmd"].as_object().cloned().unwrap_or_default();
            for (key, command) in commands {
                let (_, params) = decode_command(command.as_str().unwrap_or_default());
                match self.list(&params) {
                    Ok((payload, total)) => {
                        results.insert(key.clone(), payload);
                        if let Some(total) = total {
                            totals.insert(key, json!(total));
                        }
                    }
                    Err(error) => {
                        errors.insert(key, error);
                    }
                }
            }
            return ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "result": results,
                    "result_error": errors,
                    "result_total": totals,
                    "result_next": [],
                    "result_time": []
                }
            }));
        }

        match self.list(&body) {
            Ok((payload, total)) => {
                let mut response = json!({ "result": payload });
                if let Some(total) = total {
                    response["total"] = json!(total);
                }
                ResponseTemplate::new(200).set_body_json(response)
            }
            Err(error) => ResponseTemplate::new(503).set_body_json(error),
        }
    }
}

async fn portal_server(portal: Portal) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(format!("^{HOOK}/.+\\.json$")))
        .respond_with(portal)
        .mount(&server)
        .await;
    server
}

fn client_for(server: &MockServer) -> CrmClient {
    let config = ClientConfig::builder(format!("{}{HOOK}/", server.uri()))
        .max_retries(0)
        .no_rate_limit()
        .build()
        .unwrap();
    CrmClient::new(&config).unwrap()
}

fn ids(records: &[Value]) -> Vec<u64> {
    records.iter().filter_map(|r| number(&r["ID"])).collect()
}

async fn batch_commands(server: &MockServer) -> Vec<usize> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            body["cmd"].as_object().map_or(0, Map::len)
        })
        .collect()
}

// ============================================================================
// Traversal over HTTP
// ============================================================================

#[tokio::test]
async fn test_windowed_traversal_over_http() {
    let server = portal_server(Portal::new(1..=162)).await;
    let client = client_for(&server);

    let mut traversal = client.list(ListRequest::new("crm.deal.list")).unwrap();
    let mut records = Vec::new();
    while let Some(record) = traversal.next().await {
        records.push(record.unwrap());
    }

    assert_eq!(ids(&records), (1..=162).collect::<Vec<_>>());
    assert_eq!(traversal.stats().strategy, Some(Strategy::Windowed));
    assert_eq!(batch_commands(&server).await, vec![1, 1, 3]);
}

#[tokio::test]
async fn test_descending_traversal_over_http() {
    let server = portal_server(Portal::new(1..=130)).await;
    let client = client_for(&server);

    let records = client
        .list_all(ListRequest::new("crm.deal.list").order(Order::new().desc("ID")))
        .await
        .unwrap();

    assert_eq!(ids(&records), (1..=130).rev().collect::<Vec<_>>());
}

#[tokio::test]
async fn test_filtered_select_over_http() {
    let server = portal_server(Portal::new(1..=300)).await;
    let client = client_for(&server);

    let records: Vec<Value> = client
        .list(
            ListRequest::new("crm.deal.list")
                .filter(Filter::new().equals("STAGE_ID", "WON"))
                .select(Select::fields(["TITLE"])),
        )
        .unwrap()
        .into_stream()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(records.len(), 100);
    assert_eq!(records[0], json!({"TITLE": "Deal 3", "ID": "3"}));
}

#[tokio::test]
async fn test_small_set_single_round_trip() {
    let server = portal_server(Portal::new(1..=20)).await;
    let client = client_for(&server);

    let records = client
        .list_all(ListRequest::new("crm.deal.list").limit(5))
        .await
        .unwrap();

    assert_eq!(ids(&records), vec![1, 2, 3, 4, 5]);
    assert_eq!(batch_commands(&server).await, vec![1]);
}

#[tokio::test]
async fn test_rate_limited_window_over_http() {
    let server = portal_server(Portal {
        rate_limited_window: Some(101),
        ..Portal::new(1..=162)
    })
    .await;
    let client = client_for(&server);

    let mut traversal = client.list(ListRequest::new("crm.deal.list")).unwrap();
    let mut yielded = 0;
    let err = loop {
        match traversal.next().await {
            Some(Ok(_)) => yielded += 1,
            Some(Err(err)) => break err,
            None => panic!("expected a rate-limit error"),
        }
    };

    assert_eq!(yielded, 100);
    assert!(err.is_rate_limit());
    assert!(traversal.next().await.is_none());
}

#[tokio::test]
async fn test_whole_batch_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": "QUERY_LIMIT_EXCEEDED",
            "error_description": "Too many requests"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut traversal = client.list(ListRequest::new("crm.deal.list")).unwrap();

    let err = traversal.next().await.unwrap().unwrap_err();
    assert!(matches!(err, Error::RateLimited { .. }));
    assert!(traversal.next().await.is_none());
}

// ============================================================================
// Single calls and configuration
// ============================================================================

#[tokio::test]
async fn test_single_call_over_http() {
    let server = portal_server(Portal::new(1..=75)).await;
    let client = client_for(&server);

    let mut params = Params::new();
    params.insert("start".to_string(), json!(50));
    let response = client.call("crm.deal.list", &params).await.unwrap();

    assert_eq!(response.pagination.total, Some(75));
    assert_eq!(response.result.as_array().unwrap().len(), 25);
}

#[tokio::test]
async fn test_client_from_config_file() {
    let server = portal_server(Portal::new(1..=60)).await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "webhook_url: \"{}{HOOK}/\"", server.uri()).unwrap();
    writeln!(file, "max_retries: 0").unwrap();
    writeln!(file, "rate_limit:").unwrap();
    writeln!(file, "  requests_per_second: 100").unwrap();
    writeln!(file, "  burst_size: 100").unwrap();

    let config = ClientConfig::from_file(file.path()).unwrap();
    let client = CrmClient::new(&config).unwrap().with_parallel_hint(true);
    let records = client
        .list_all(ListRequest::new("crm.deal.list"))
        .await
        .unwrap();

    assert_eq!(records.len(), 60);
    let requests = server.received_requests().await.unwrap();
    let last: Value = serde_json::from_slice(&requests.last().unwrap().body).unwrap();
    assert_eq!(last["parallel"], json!(1));
}
