// web-server/src/middleware/cors.rs
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, HeaderName, HeaderValue},
    Error,
};
use futures_util::future::{ready, LocalBoxFuture, Ready};

const ALLOW_ORIGIN: &str = "*";
const ALLOW_HEADERS: &str = "Content-Type";
const ALLOW_METHODS: &str = "POST, OPTIONS";

/// Adds permissive CORS headers to every response of the wrapped service.
/// Headers a handler already set are left alone.
#[derive(Debug, Clone)]
pub struct Cors {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl Default for Cors {
    fn default() -> Self {
        Self {
            headers: vec![
                (
                    header::ACCESS_CONTROL_ALLOW_ORIGIN,
                    HeaderValue::from_static(ALLOW_ORIGIN),
                ),
                (
                    header::ACCESS_CONTROL_ALLOW_HEADERS,
                    HeaderValue::from_static(ALLOW_HEADERS),
                ),
                (
                    header::ACCESS_CONTROL_ALLOW_METHODS,
                    HeaderValue::from_static(ALLOW_METHODS),
                ),
            ],
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Cors
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = CorsMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CorsMiddleware {
            service,
            cors: self.clone(),
        }))
    }
}

pub struct CorsMiddleware<S> {
    service: S,
    cors: Cors,
}

impl<S, B> Service<ServiceRequest> for CorsMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let headers = self.cors.headers.clone();
        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;
            let res_headers = res.headers_mut();
            for (name, value) in headers {
                if !res_headers.contains_key(&name) {
                    res_headers.insert(name, value);
                }
            }
            Ok(res)
        })
    }
}
