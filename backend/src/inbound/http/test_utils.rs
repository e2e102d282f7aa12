//! Test helpers for inbound HTTP components.

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::{HttpResponse, test, web};
use uuid::Uuid;

use crate::domain::{Error, UserId};
use crate::inbound::http::session::SessionContext;

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Route that persists the path id into the session, standing in for the
/// external login flow during handler tests.
pub fn test_login_route() -> actix_web::Resource {
    web::resource("/test-login/{id}").route(web::get().to(
        |session: SessionContext, path: web::Path<Uuid>| async move {
            session.persist_user(UserId::from_uuid(path.into_inner()))?;
            Ok::<_, Error>(HttpResponse::Ok())
        },
    ))
}

/// Log in as `user` against an app wired with [`test_login_route`] and return
/// the session cookie.
pub async fn login_as(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    >,
    user: UserId,
) -> Cookie<'static> {
    let request = test::TestRequest::get()
        .uri(&format!("/test-login/{user}"))
        .to_request();
    let response = test::call_service(app, request).await;
    assert!(response.status().is_success());
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie")
        .into_owned()
}
