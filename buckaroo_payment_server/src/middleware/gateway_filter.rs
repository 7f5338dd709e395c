//! Host-allowlist middleware for the push endpoint.
//!
//! Buckaroo pushes status updates from a known set of domains. This middleware rejects requests whose Host
//! header does not contain one of the configured substrings. It is a coarse junk-traffic filter, not
//! authentication: the push path is protected by the payment-key lookup and the state machine's transition
//! guards, which make replayed or fabricated pushes harmless.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorForbidden,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};

pub struct GatewayHostFilterFactory {
    allowed_hosts: Vec<String>,
}

impl GatewayHostFilterFactory {
    pub fn new(allowed_hosts: &[String]) -> Self {
        Self { allowed_hosts: allowed_hosts.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for GatewayHostFilterFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = GatewayHostFilterService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(GatewayHostFilterService {
            allowed_hosts: self.allowed_hosts.clone(),
            service: Rc::new(service),
        }))
    }
}

pub struct GatewayHostFilterService<S> {
    allowed_hosts: Vec<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for GatewayHostFilterService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let host = req.connection_info().host().to_string();
        let allowed = self.allowed_hosts.iter().any(|h| host.contains(h.as_str()));
        Box::pin(async move {
            if allowed {
                trace!("🚧️ Request from host '{host}' passed the gateway filter");
                service.call(req).await
            } else {
                warn!("🚧️ Denying push request from unexpected host '{host}'");
                Err(ErrorForbidden("Host not allowed."))
            }
        })
    }
}
