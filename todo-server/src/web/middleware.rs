use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::header::InvalidHeaderValue;
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};
use tower::{Layer, Service};

use crate::config::Config;

/// Cross-origin headers written onto every response.
#[derive(Clone, Debug)]
pub struct CorsHeaders {
    allow_origin: HeaderValue,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    allow_credentials: HeaderValue,
}

impl CorsHeaders {
    /// Builds the header set from configuration, rejecting values that are not valid headers.
    pub fn from_config(config: &Config) -> Result<Self, InvalidHeaderValue> {
        Ok(Self {
            allow_origin: HeaderValue::from_str(&config.cors_allowed_origins)?,
            allow_methods: HeaderValue::from_str(&config.cors_allowed_methods)?,
            allow_headers: HeaderValue::from_str(&config.cors_allowed_headers)?,
            allow_credentials: HeaderValue::from_static(if config.cors_allow_credentials {
                "true"
            } else {
                "false"
            }),
        })
    }

    fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            self.allow_credentials.clone(),
        );
    }
}

/// Layer that adds CORS headers to every response and answers preflight requests
#[derive(Clone)]
pub struct CorsLayer {
    headers: Arc<CorsHeaders>,
}

impl CorsLayer {
    /// Creates a new CorsLayer
    pub fn new(headers: CorsHeaders) -> Self {
        Self {
            headers: Arc::new(headers),
        }
    }
}

impl<S> Layer<S> for CorsLayer {
    type Service = CorsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorsService {
            inner,
            headers: self.headers.clone(),
        }
    }
}

/// Service that short-circuits `OPTIONS` with 204 and decorates all other responses
#[derive(Clone)]
pub struct CorsService<S> {
    inner: S,
    headers: Arc<CorsHeaders>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CorsService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: Default,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = CorsFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let headers = self.headers.clone();
        if request.method() == Method::OPTIONS {
            return CorsFuture::Preflight { headers };
        }
        CorsFuture::Inner {
            future: self.inner.call(request),
            headers,
        }
    }
}

pin_project! {
    /// Future that resolves to a response with CORS headers added
    #[project = CorsFutureProj]
    pub enum CorsFuture<F> {
        Inner {
            #[pin]
            future: F,
            headers: Arc<CorsHeaders>,
        },
        Preflight {
            headers: Arc<CorsHeaders>,
        },
    }
}

impl<F, ResBody, E> Future for CorsFuture<F>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
    ResBody: Default,
{
    type Output = Result<Response<ResBody>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            CorsFutureProj::Inner { future, headers } => {
                let mut response = ready!(future.poll(cx))?;
                headers.apply(response.headers_mut());
                Poll::Ready(Ok(response))
            }
            CorsFutureProj::Preflight { headers } => {
                let mut response = Response::new(ResBody::default());
                *response.status_mut() = StatusCode::NO_CONTENT;
                headers.apply(response.headers_mut());
                Poll::Ready(Ok(response))
            }
        }
    }
}
