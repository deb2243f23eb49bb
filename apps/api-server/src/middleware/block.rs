//! Request blocking middleware - turns away listed user agents and IPs.

use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;

use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
};
use yatube_shared::ErrorResponse;

use crate::config::BlockConfig;

/// Blocking middleware factory.
pub struct BlockMiddleware {
    config: Rc<BlockConfig>,
}

impl BlockMiddleware {
    pub fn new(config: BlockConfig) -> Self {
        Self {
            config: Rc::new(config),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BlockMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = BlockMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BlockMiddlewareService {
            service,
            config: self.config.clone(),
        }))
    }
}

pub struct BlockMiddlewareService<S> {
    service: S,
    config: Rc<BlockConfig>,
}

impl<S> BlockMiddlewareService<S> {
    /// The reason a request is refused, if it is.
    fn blocked_reason(&self, req: &ServiceRequest) -> Option<&'static str> {
        if let Some(peer) = req.peer_addr() {
            if self.config.ips.contains(&peer.ip()) {
                return Some("ip");
            }
        }

        let agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())?
            .to_lowercase();
        self.config
            .user_agents
            .iter()
            .any(|blocked| agent.contains(blocked.as_str()))
            .then_some("user-agent")
    }
}

impl<S, B> Service<ServiceRequest> for BlockMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(reason) = self.blocked_reason(&req) {
            tracing::warn!(
                reason,
                peer = ?req.peer_addr(),
                path = %req.path(),
                "Blocked request"
            );

            let response = HttpResponse::Forbidden().json(ErrorResponse::forbidden());
            let (http_req, _payload) = req.into_parts();
            let srv_response = ServiceResponse::new(http_req, response);

            return Box::pin(async move { Ok(srv_response.map_into_right_body()) });
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test, web};

    use super::*;

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    fn config() -> BlockConfig {
        BlockConfig::parse("python-requests", "10.1.1.1")
    }

    #[actix_web::test]
    async fn test_blocked_user_agent_gets_403() {
        let app = test::init_service(
            App::new()
                .wrap(BlockMiddleware::new(config()))
                .route("/", web::get().to(ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((header::USER_AGENT, "Python-Requests/2.31"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((header::USER_AGENT, "Mozilla/5.0"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_blocked_ip_gets_403() {
        let app = test::init_service(
            App::new()
                .wrap(BlockMiddleware::new(config()))
                .route("/", web::get().to(ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .peer_addr("10.1.1.1:4000".parse().unwrap())
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );

        let req = test::TestRequest::get()
            .uri("/")
            .peer_addr("10.1.1.2:4000".parse().unwrap())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }
}
