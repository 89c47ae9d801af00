use std::sync::{Arc, Mutex};

use rttp_dispatch::config::RouterConfig;
use rttp_dispatch::context::{Body, Context};
use rttp_dispatch::router::Resolution;
use rttp_dispatch::router::route::NOT_FOUND_PAGE;
use rttp_dispatch::{HandlerError, Method, Request, Router, StatusCode};

fn quiet_router() -> Router {
    Router::with_config(RouterConfig {
        log_requests: false,
        ..RouterConfig::default()
    })
    .unwrap()
}

fn text(ctx: &Context) -> &str {
    ctx.body().and_then(Body::as_text).unwrap_or_default()
}

#[test]
fn hello_name_scenario() {
    let mut router = Router::new();
    router
        .get("/hello/:name", |ctx: &mut Context| {
            format!("Hello, {}", ctx.param("name").unwrap_or_default())
        })
        .unwrap();

    let out = router.dispatch(Request::get("/hello/Ada"));
    assert_eq!(text(&out.context), "Hello, Ada");
    assert_eq!(out.context.params().get("name"), Some("Ada"));
    assert_eq!(out.context.status(), StatusCode::OK);
}

#[test]
fn missing_route_scenario() {
    let router = quiet_router();
    let out = router.dispatch(Request::get("/missing"));
    assert_eq!(out.context.status(), StatusCode::NOT_FOUND);
    assert_eq!(text(&out.context), NOT_FOUND_PAGE);
    assert!(out.failure.is_none());
}

#[test]
fn failing_handler_scenario() {
    let mut router = quiet_router();
    router
        .post("/orders", |_ctx: &mut Context| -> Result<String, HandlerError> {
            Err(HandlerError::msg("payment gateway timeout"))
        })
        .unwrap();

    let out = router.dispatch(Request::new(Method::Post, "/orders"));
    let error = out.context.error().expect("error captured");
    assert_eq!(error.to_string(), "payment gateway timeout");
    assert_eq!(out.context.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!text(&out.context).contains("payment"));
    assert!(out.failure.is_some());
}

#[test]
fn static_file_scenario() {
    let public = tempfile::tempdir().unwrap();
    let logo: Vec<u8> = (0..20_000u32).map(|i| (i * 7 % 251) as u8).collect();
    std::fs::write(public.path().join("logo.png"), &logo).unwrap();

    let mut router = quiet_router();
    router.static_files("/static", public.path());

    let out = router.dispatch(Request::get("/static/logo.png"));
    let ctx = &out.context;
    assert_eq!(ctx.status(), StatusCode::OK);
    assert_eq!(ctx.headers().get("Content-Type"), Some("image/png"));
    assert_eq!(ctx.headers().get("Content-Length"), Some("20000"));

    let file = ctx.body().and_then(Body::as_file).expect("file body");
    let mut streamed = Vec::new();
    for chunk in file.chunks().unwrap() {
        streamed.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(streamed, logo);
}

#[test]
fn static_file_unknown_extension_is_octet_stream() {
    let public = tempfile::tempdir().unwrap();
    std::fs::write(public.path().join("data.weird"), "x").unwrap();

    let mut router = quiet_router();
    router.static_files("/static", public.path());

    let out = router.dispatch(Request::get("/static/data.weird"));
    assert_eq!(
        out.context.headers().get("content-type"),
        Some("application/octet-stream")
    );
}

#[test]
fn static_route_falls_through_when_file_missing() {
    let public = tempfile::tempdir().unwrap();
    let mut router = quiet_router();
    router.static_files("/static", public.path());
    router
        .get("/static/*", |_ctx: &mut Context| "generated")
        .unwrap();

    let out = router.dispatch(Request::get("/static/app.js"));
    assert_eq!(text(&out.context), "generated");
}

#[test]
fn custom_not_found_applies_to_every_unmatched_get() {
    let mut router = quiet_router();
    router
        .get("404", |_ctx: &mut Context| "custom not found")
        .unwrap();

    for path in ["/", "/a", "/a/b/c"] {
        let out = router.dispatch(Request::get(path));
        assert_eq!(text(&out.context), "custom not found");
        assert_eq!(out.context.status(), StatusCode::NOT_FOUND);
    }
}

#[test]
fn reset_then_lookup_returns_fallback() {
    let mut router = quiet_router();
    router.get("/a", |_ctx: &mut Context| "a").unwrap();
    router.post("/b", |_ctx: &mut Context| "b").unwrap();

    router.reset();

    assert!(matches!(
        router.lookup(&Method::Get, "/a"),
        Resolution::NotFound(_)
    ));
    assert!(matches!(
        router.lookup(&Method::Post, "/b"),
        Resolution::NotFound(_)
    ));
}

#[test]
fn session_and_query_params_reach_handler() {
    #[derive(Debug)]
    struct Session {
        user: String,
    }

    let mut router = quiet_router();
    router
        .get("/inbox/:folder", |ctx: &mut Context| {
            let user = ctx
                .session::<Session>()
                .map(|s| s.user.clone())
                .unwrap_or_default();
            format!(
                "{user}:{}:{}",
                ctx.param("folder").unwrap_or_default(),
                ctx.param("page").unwrap_or("1")
            )
        })
        .unwrap();

    let request = Request::from_target(Method::Get, "/inbox/archive?page=3").extension(Session {
        user: "ada".to_owned(),
    });
    let out = router.dispatch(request);
    assert_eq!(text(&out.context), "ada:archive:3");
}

#[test]
fn after_filters_observe_every_outcome_once() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut router = quiet_router();
    for tag in ["log", "metrics"] {
        let seen = Arc::clone(&seen);
        router.after(move |ctx: &Context| {
            seen.lock()
                .unwrap()
                .push(format!("{tag} {} {}", ctx.request().path(), ctx.status().as_u16()));
        });
    }
    router.get("/ok", |_ctx: &mut Context| "ok").unwrap();
    router
        .get("/boom", |_ctx: &mut Context| -> Result<(), HandlerError> {
            Err("boom".into())
        })
        .unwrap();

    router.dispatch(Request::get("/ok"));
    router.dispatch(Request::get("/boom"));
    router.dispatch(Request::get("/nope"));

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            "log /ok 200",
            "metrics /ok 200",
            "log /boom 500",
            "metrics /boom 500",
            "log /nope 404",
            "metrics /nope 404",
        ]
    );
}

#[test]
#[should_panic(expected = "audit sink unavailable")]
fn panicking_after_filter_escapes_dispatch() {
    let mut router = quiet_router();
    router.after(|_ctx: &Context| panic!("audit sink unavailable"));
    router.get("/ok", |_ctx: &mut Context| "ok").unwrap();

    router.dispatch(Request::get("/ok"));
}

#[test]
fn handler_recorded_error_reaches_caller() {
    let mut router = quiet_router();
    router
        .get("/report", |ctx: &mut Context| {
            ctx.set_error(HandlerError::msg("stale cache"));
            "served anyway"
        })
        .unwrap();

    let out = router.dispatch(Request::get("/report"));
    assert!(out.is_failure());
    assert_eq!(out.context.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(text(&out.context), "served anyway");
}

#[test]
fn rate_limited_status_reaches_response_parts() {
    let mut router = quiet_router();
    router
        .get("/api", |ctx: &mut Context| {
            ctx.set_status(StatusCode::TOO_MANY_REQUESTS);
            ctx.set_header("Retry-After", "30");
        })
        .unwrap();

    let (status, headers, _) = router.dispatch(Request::get("/api")).into_context().into_parts();
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(status.to_string(), "429 Too Many Requests");
    assert_eq!(headers.get("retry-after"), Some("30"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_dispatch_on_shared_router() {
    let mut router = quiet_router();
    router
        .get("/echo/:n", |ctx: &mut Context| {
            ctx.param("n").unwrap_or_default().to_owned()
        })
        .unwrap();
    let router = Arc::new(router);

    let mut tasks = Vec::new();
    for n in 0..64 {
        let router = Arc::clone(&router);
        tasks.push(tokio::task::spawn_blocking(move || {
            let out = router.dispatch(Request::get(format!("/echo/{n}")));
            (n, text(&out.context).to_owned())
        }));
    }

    for task in tasks {
        let (n, body) = task.await.unwrap();
        assert_eq!(body, n.to_string());
    }
}
