//! Security headers for pages rendered inside the Shopify admin.
//!
//! The app is framed by `admin.shopify.com`, so `X-Frame-Options` is not set
//! and framing is controlled by CSP `frame-ancestors` instead.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS},
    },
    middleware::Next,
    response::Response,
};

/// CSP for embedded pages.
///
/// ```text
/// default-src 'self';
/// script-src 'self' https://cdn.shopify.com;
/// style-src 'self' 'unsafe-inline' https://cdn.shopify.com;
/// img-src 'self' data: https://cdn.shopify.com;
/// connect-src 'self' https://*.shopify.com;
/// object-src 'none';
/// base-uri 'self';
/// frame-ancestors https://admin.shopify.com https://*.myshopify.com
/// ```
pub const EMBEDDED_CSP: &str = "default-src 'self'; \
     script-src 'self' https://cdn.shopify.com; \
     style-src 'self' 'unsafe-inline' https://cdn.shopify.com; \
     img-src 'self' data: https://cdn.shopify.com; \
     connect-src 'self' https://*.shopify.com; \
     object-src 'none'; \
     base-uri 'self'; \
     frame-ancestors https://admin.shopify.com https://*.myshopify.com";

/// Add security headers to all responses.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(CONTENT_SECURITY_POLICY, HeaderValue::from_static(EMBEDDED_CSP));

    // Pages show per-shop data
    headers.insert(
        HeaderName::from_static("cache-control"),
        HeaderValue::from_static("no-store, max-age=0"),
    );

    headers.insert(
        HeaderName::from_static("x-dns-prefetch-control"),
        HeaderValue::from_static("off"),
    );

    response
}

#[cfg(test)]
mod tests {
    use axum::{Router, body::Body, http::Request as HttpRequest, routing::get};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_headers_applied() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(security_headers_middleware));

        let response = app
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        let headers = response.headers();
        assert_eq!(headers.get(X_CONTENT_TYPE_OPTIONS).expect("nosniff"), "nosniff");
        assert!(headers.get("x-frame-options").is_none());
        let csp = headers
            .get(CONTENT_SECURITY_POLICY)
            .and_then(|v| v.to_str().ok())
            .expect("csp");
        assert!(csp.contains("frame-ancestors https://admin.shopify.com"));
    }
}
