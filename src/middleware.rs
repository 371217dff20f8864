//! HTTP 中间件
//! 应用状态与请求追踪

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

const TRACE_ID_HEADER: &str = "x-trace-id";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::AppConfig,
    /// 未配置数据库时为 None（使用内存用户存储）
    pub db: Option<sqlx::PgPool>,
    pub auth_service: Arc<crate::services::AuthService>,
}

/// 一次请求的关联标识：trace_id 可由调用方传入，request_id 每次新生成
struct RequestIds {
    trace_id: String,
    request_id: String,
}

impl RequestIds {
    fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            trace_id: extract_or_generate_trace_id(headers),
            request_id: Uuid::new_v4().to_string(),
        }
    }

    /// 回写到响应头；无法作为头部值的 trace_id 直接丢弃
    fn write_to(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.trace_id) {
            headers.insert(TRACE_ID_HEADER, value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.request_id) {
            headers.insert(REQUEST_ID_HEADER, value);
        }
    }
}

/// 请求追踪中间件
/// 每个请求在独立 span 中执行，完成后记录请求计数与耗时
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let ids = RequestIds::from_headers(req.headers());
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %ids.trace_id,
        request_id = %ids.request_id,
        method = %method,
        path = %path,
    );

    async move {
        let started = Instant::now();
        let mut response = next.run(req).await;
        let elapsed = started.elapsed();
        let status = response.status();

        metrics::counter!(
            "http_requests_total",
            "method" => method_label(&method),
            "status" => status_label(status)
        )
        .increment(1);
        metrics::histogram!("http_request_duration_seconds", "method" => method_label(&method))
            .record(elapsed.as_secs_f64());

        tracing::info!(
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        ids.write_to(response.headers_mut());
        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// 指标标签必须是有限集合
fn method_label(method: &Method) -> &'static str {
    match method.as_str() {
        "GET" => "GET",
        "POST" => "POST",
        "HEAD" => "HEAD",
        "OPTIONS" => "OPTIONS",
        _ => "OTHER",
    }
}

/// 认证相关状态码单独计数，其余按类别聚合
fn status_label(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "400",
        401 => "401",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}
