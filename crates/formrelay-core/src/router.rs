//! Request router
//!
//! Three fixed routes and a static file fallback:
//! - `GET /` → index page
//! - `GET /message` → message page
//! - `GET /<path>` → file under the static root, or the error page with 404
//! - `POST /<any>` → forward body, redirect to `/message`
//!
//! `HEAD` follows `GET`; hyper leaves the body off the wire. Any other
//! method gets 501.

use crate::handlers::{Page, Pages, StaticFiles, Submit};
use crate::{Method, Request, Response, StatusCode};

/// What a request resolves to, before any I/O
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<'a> {
    Page(Page),
    /// Candidate static file; falls back to the error page
    File(&'a str),
    Submit,
    Unsupported,
}

/// Resolve a method and path (query string already stripped)
pub fn route(method: Method, path: &str) -> Route<'_> {
    match method {
        Method::Get | Method::Head => match path {
            "/" => Route::Page(Page::Index),
            "/message" => Route::Page(Page::Message),
            _ => Route::File(path),
        },
        Method::Post => Route::Submit,
        _ => Route::Unsupported,
    }
}

/// Stateless request router
#[derive(Debug, Clone)]
pub struct Router {
    pages: Pages,
    files: StaticFiles,
    submit: Submit,
}

impl Router {
    pub fn new(pages: Pages, files: StaticFiles, submit: Submit) -> Self {
        Self { pages, files, submit }
    }

    /// Handle one request.
    ///
    /// I/O failures after a route has been chosen are logged and answered
    /// with 500.
    pub async fn handle(&self, req: &Request) -> Response {
        match route(req.method, &req.path) {
            Route::Page(page) => self.page(page, StatusCode::OK).await,
            Route::File(path) => match self.files.resolve(path).await {
                Some(file) => match self.files.serve(&file).await {
                    Ok(res) => res,
                    Err(e) => {
                        tracing::error!(file = %file.display(), error = %e, "static file read failed");
                        Response::internal_error()
                    }
                },
                None => self.page(Page::Error, StatusCode::NOT_FOUND).await,
            },
            Route::Submit => self.submit.handle(&req.body).await,
            Route::Unsupported => Response::not_implemented(),
        }
    }

    async fn page(&self, page: Page, status: StatusCode) -> Response {
        match self.pages.render(page, status).await {
            Ok(res) => res,
            Err(e) => {
                tracing::error!(
                    page = ?page,
                    file = %self.pages.path(page).display(),
                    error = %e,
                    "page read failed"
                );
                Response::internal_error()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::{Datagram, RelayReceiver, RelaySender};
    use crate::RequestBuilder;

    #[test]
    fn test_route_table() {
        assert_eq!(route(Method::Get, "/"), Route::Page(Page::Index));
        assert_eq!(route(Method::Get, "/message"), Route::Page(Page::Message));
        assert_eq!(route(Method::Head, "/message"), Route::Page(Page::Message));
        assert_eq!(route(Method::Get, "/style.css"), Route::File("/style.css"));
        assert_eq!(route(Method::Get, "/message/"), Route::File("/message/"));
        assert_eq!(route(Method::Post, "/message"), Route::Submit);
        assert_eq!(route(Method::Post, "/anything/else"), Route::Submit);
        assert_eq!(route(Method::Delete, "/"), Route::Unsupported);
    }

    async fn fixture(dir: &std::path::Path) -> (Router, RelayReceiver) {
        std::fs::write(dir.join("index.html"), "<h1>index</h1>").unwrap();
        std::fs::write(dir.join("message.html"), "<h1>message</h1>").unwrap();
        std::fs::write(dir.join("error.html"), "<h1>error</h1>").unwrap();
        std::fs::write(dir.join("logo.png"), [0x89, b'P', b'N', b'G']).unwrap();

        let receiver = RelayReceiver::bind("127.0.0.1:0".parse().unwrap(), 1024)
            .await
            .unwrap();
        let relay = RelaySender::bind(receiver.local_addr().unwrap()).await.unwrap();
        let router = Router::new(
            Pages::new(dir.join("index.html"), dir.join("message.html"), dir.join("error.html")),
            StaticFiles::new(dir),
            Submit::new(relay),
        );
        (router, receiver)
    }

    #[tokio::test]
    async fn test_pages_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let (router, _receiver) = fixture(dir.path()).await;

        let res = router.handle(&Request::new(Method::Get, "/")).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body_string().as_deref(), Some("<h1>index</h1>"));

        let res = router.handle(&Request::new(Method::Get, "/message")).await;
        assert_eq!(res.body_string().as_deref(), Some("<h1>message</h1>"));

        let res = router.handle(&Request::new(Method::Get, "/logo.png")).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.content_type(), Some("image/png"));

        let res = router.handle(&Request::new(Method::Get, "/does-not-exist")).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.body_string().as_deref(), Some("<h1>error</h1>"));

        let res = router.handle(&Request::new(Method::Put, "/")).await;
        assert_eq!(res.status, StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_missing_page_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let (router, _receiver) = fixture(dir.path()).await;
        std::fs::remove_file(dir.path().join("index.html")).unwrap();

        let res = router.handle(&Request::new(Method::Get, "/")).await;
        assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_submit() {
        let dir = tempfile::tempdir().unwrap();
        let (router, mut receiver) = fixture(dir.path()).await;

        let req = RequestBuilder::new(Method::Post, "/message")
            .body("name=Ann&age=30")
            .build();
        let res = router.handle(&req).await;
        assert_eq!(res.status, StatusCode::FOUND);
        assert_eq!(res.header("location"), Some("/message"));

        match receiver.recv().await.unwrap() {
            Datagram::Complete { payload, .. } => assert_eq!(&payload[..], b"name=Ann&age=30"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
