use super::*;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct Captured {
    warp: Arc<Mutex<Vec<Value>>>,
}

async fn spawn_server(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}")
}

fn sample_request() -> WarpRequest {
    WarpRequest {
        image: "data:image/png;base64,AAAA".to_string(),
        source_landmarks: vec![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]],
        dest_landmarks: vec![[1.5, 2.5], [3.5, 4.5], [5.5, 6.5]],
        percent: 0.5,
        r_exponent: shared::protocol::DEFAULT_R_EXPONENT,
        k: shared::protocol::DEFAULT_K,
    }
}

#[test]
fn rejects_unparseable_base_url() {
    assert!(HttpWarpClient::new("not a url").is_err());
    let client = HttpWarpClient::new("http://localhost:8000/").expect("client");
    assert_eq!(client.endpoint(), "http://localhost:8000");
}

#[test]
fn detail_extraction_handles_odd_bodies() {
    assert_eq!(extract_detail(r#"{"detail":"bad landmarks"}"#), "bad landmarks");
    assert_eq!(
        extract_detail(r#"{"detail":"bad landmarks","code":7}"#),
        "bad landmarks"
    );
    assert_eq!(extract_detail(r#"{"detail":""}"#), FALLBACK_WARP_DETAIL);
    assert_eq!(extract_detail(r#"{"detail":null}"#), FALLBACK_WARP_DETAIL);
    assert_eq!(extract_detail("<html>"), FALLBACK_WARP_DETAIL);
    assert_eq!(
        extract_detail(r#"{"detail":[{"msg":"field required"}]}"#),
        r#"[{"msg":"field required"}]"#
    );
}

#[tokio::test]
async fn health_distinguishes_unhealthy_from_unreachable() {
    let healthy = spawn_server(Router::new().route(
        "/health",
        get(|| async { Json(json!({"status": "healthy", "warptps_available": true})) }),
    ))
    .await;
    HttpWarpClient::new(&healthy)
        .expect("client")
        .health()
        .await
        .expect("healthy");

    let plain = spawn_server(Router::new().route("/health", get(|| async { "ok" }))).await;
    HttpWarpClient::new(&plain)
        .expect("client")
        .health()
        .await
        .expect("2xx without a health body is still healthy");

    let unhealthy = spawn_server(Router::new().route(
        "/health",
        get(|| async {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"detail": "WarpTPS library not available"})),
            )
        }),
    ))
    .await;
    let err = HttpWarpClient::new(&unhealthy)
        .expect("client")
        .health()
        .await
        .expect_err("unhealthy");
    assert_eq!(
        err,
        WarpServiceError::Rejected {
            status: 503,
            detail: "WarpTPS library not available".to_string(),
        }
    );

    let err = HttpWarpClient::new(&closed_port_url().await)
        .expect("client")
        .health()
        .await
        .expect_err("unreachable");
    assert_eq!(err.kind(), ErrorKind::ServerUnavailable);
}

#[tokio::test]
async fn warp_posts_json_body_and_parses_image() {
    let captured = Captured::default();
    let app = Router::new()
        .route(
            "/warp/base64",
            post(
                |axum::extract::State(state): axum::extract::State<Captured>,
                 Json(body): Json<Value>| async move {
                    state.warp.lock().await.push(body);
                    Json(json!({"success": true, "image": "data:image/png;base64,BBBB"}))
                },
            ),
        )
        .with_state(captured.clone());
    let url = spawn_server(app).await;

    let response = HttpWarpClient::new(&url)
        .expect("client")
        .warp(&sample_request())
        .await
        .expect("warp");
    assert_eq!(response.image, "data:image/png;base64,BBBB");

    let bodies = captured.warp.lock().await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["percent"], json!(0.5));
    assert_eq!(bodies[0]["r_exponent"], json!(2.0));
    assert_eq!(bodies[0]["k"], json!(1.0));
    assert_eq!(bodies[0]["source_landmarks"][2], json!([5.0, 6.0]));
}

#[tokio::test]
async fn warp_surfaces_remote_detail_verbatim() {
    let app = Router::new().route(
        "/warp/base64",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"detail": "Error warping image: singular matrix"})),
            )
        }),
    );
    let url = spawn_server(app).await;

    let err = HttpWarpClient::new(&url)
        .expect("client")
        .warp(&sample_request())
        .await
        .expect_err("rejected");
    assert_eq!(err.to_string(), "Error warping image: singular matrix");
    assert_eq!(err.kind(), ErrorKind::RemoteRejected);
}

#[tokio::test]
async fn server_info_and_point_transform() {
    let app = Router::new()
        .route(
            "/",
            get(|| async {
                Json(json!({"name": "WarpTPS API Server", "version": "1.0.0", "warptps_version": "0.3"}))
            }),
        )
        .route(
            "/transform/points",
            post(|Json(body): Json<TransformPointsRequest>| async move {
                let shifted: Vec<[f64; 2]> = body
                    .points
                    .iter()
                    .map(|[x, y]| [x + body.percent, *y])
                    .collect();
                Json(json!({"success": true, "transformed_points": shifted}))
            }),
        );
    let url = spawn_server(app).await;
    let client = HttpWarpClient::new(&url).expect("client");

    let info = client.server_info().await.expect("info");
    assert_eq!(info.name, "WarpTPS API Server");
    assert_eq!(info.warptps_version.as_deref(), Some("0.3"));

    let points = client
        .transform_points(&TransformPointsRequest {
            points: vec![[10.0, 20.0]],
            source_landmarks: Vec::new(),
            dest_landmarks: Vec::new(),
            percent: 1.0,
        })
        .await
        .expect("points");
    assert_eq!(points, vec![[11.0, 20.0]]);
}
