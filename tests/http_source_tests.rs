use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chlb_monitor::config::parse_endpoint;
use chlb_monitor::state::CellStatus;
use chlb_monitor::{FetchError, HttpStateSource, StateCell, StatePoller, StateSource};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};

const FULL_STATE: &str = r#"{
    "servers": [
        {"name": "Backend-1", "ip": "10.0.0.11", "port": 8001, "status": "HEALTHY", "load_count": 12, "vnodes": 2, "weight": 2},
        {"name": "Backend-2", "ip": "10.0.0.12", "port": 8002, "status": "DOWN", "load_count": 0, "vnodes": 1, "weight": 1}
    ],
    "vnodes": [
        {"server": "Backend-1", "angle": 10.0},
        {"server": "Backend-2", "angle": 130.5},
        {"server": "Backend-1", "angle": 250.0}
    ],
    "requests_histogram": [
        {"name": "Backend-1", "load_count": 12},
        {"name": "Backend-2", "load_count": 0}
    ],
    "ring_size": 3
}"#;

const SERVER_LIST: &str = r#"[{"id": "A", "load": 10, "status": "active"}, {"id": "B", "load": 30, "status": "down"}]"#;

/// Fake balancer state export. Returns its address and a request counter.
async fn spawn_balancer() -> (SocketAddr, Arc<AtomicU64>) {
    let hits = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&hits);

    let make_svc = make_service_fn(move |_conn| {
        let counter = Arc::clone(&counter);
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let (status, body) = match req.uri().path() {
                        "/_internal/state" => (StatusCode::OK, FULL_STATE.to_string()),
                        "/servers" => (StatusCode::OK, SERVER_LIST.to_string()),
                        "/broken" => (StatusCode::OK, "{\"servers\": [".to_string()),
                        "/slow" => {
                            tokio::time::sleep(Duration::from_millis(500)).await;
                            (StatusCode::OK, SERVER_LIST.to_string())
                        }
                        _ => (StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string()),
                    };
                    Ok::<_, Infallible>(
                        Response::builder()
                            .status(status)
                            .header(hyper::header::CONTENT_TYPE, "application/json")
                            .body(Body::from(body))
                            .unwrap(),
                    )
                }
            }))
        }
    });

    let server = Server::bind(&"127.0.0.1:0".parse().unwrap()).serve(make_svc);
    let addr = server.local_addr();
    tokio::spawn(server);
    (addr, hits)
}

fn source(addr: SocketAddr, path: &str, timeout: Duration) -> HttpStateSource {
    let endpoint = parse_endpoint(&format!("http://{addr}{path}")).unwrap();
    HttpStateSource::new(endpoint, timeout)
}

#[tokio::test]
async fn fetches_and_normalizes_full_state() {
    let (addr, hits) = spawn_balancer().await;
    let source = source(addr, "/_internal/state", Duration::from_secs(2));

    let raw = source.fetch().await.unwrap();
    let state = chlb_monitor::normalize(&raw).unwrap();

    assert_eq!(state.servers().len(), 2);
    assert_eq!(state.servers()[0].port, 8001);
    assert_eq!(state.ring_size(), 3);
    assert_eq!(state.vnodes()[1].angle_degrees, Some(130.5));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(source.requests_issued(), 1);
}

#[tokio::test]
async fn non_success_status_is_a_fetch_error() {
    let (addr, _) = spawn_balancer().await;
    let err = source(addr, "/missing", Duration::from_secs(2)).fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR)));
}

#[tokio::test]
async fn truncated_body_is_malformed_json() {
    let (addr, _) = spawn_balancer().await;
    let err = source(addr, "/broken", Duration::from_secs(2)).fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::MalformedJson(_)));
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let (addr, _) = spawn_balancer().await;
    let err = source(addr, "/slow", Duration::from_millis(50)).fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout(50)));
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = source(addr, "/servers", Duration::from_secs(2)).fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
}

#[tokio::test]
async fn poller_feeds_state_cell_and_survives_errors() {
    let (addr, _) = spawn_balancer().await;

    let good = Arc::new(source(addr, "/servers", Duration::from_secs(2)));
    let mut poller = StatePoller::new(good, Duration::from_millis(20)).start();
    let mut cell = StateCell::new();
    cell.apply(poller.next_event().await.unwrap());
    poller.stop().await;

    assert_eq!(cell.status(), CellStatus::Fresh);
    let snapshot = cell.current().cloned().unwrap();
    assert_eq!(snapshot.servers()[1].name, "B");

    let bad = Arc::new(source(addr, "/broken", Duration::from_secs(2)));
    let mut poller = StatePoller::new(bad, Duration::from_millis(20)).start();
    cell.apply(poller.next_event().await.unwrap());
    cell.apply(poller.next_event().await.unwrap());
    poller.stop().await;

    assert!(matches!(cell.status(), CellStatus::Stale(_)));
    assert_eq!(cell.current(), Some(&snapshot));
    assert_eq!(cell.failures(), 2);
}

#[tokio::test]
async fn slow_endpoint_gets_one_request_at_a_time() {
    let (addr, hits) = spawn_balancer().await;
    let slow = Arc::new(source(addr, "/slow", Duration::from_secs(5)));
    let mut poller = StatePoller::new(slow, Duration::from_millis(100)).start();

    // 500 ms response against a 100 ms tick: one request for the whole span.
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    assert!(poller.next_event().await.unwrap().is_ok());
    poller.stop().await;
    assert!(hits.load(Ordering::SeqCst) <= 2);
}
