//! End-to-end console flows over the seeded in-memory library.
//!
//! Requests run through the real handlers, services and row-store mirror; only
//! the clock is pinned so fines and overdue counts are deterministic.

use std::sync::Arc;
use std::time::Duration;

use actix_http::Request;
use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::body::BoxBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use library_backend::Trace;
use library_backend::domain::ports::{RowFilter, RowStore};
use library_backend::domain::{CirculationRules, EntityKind, FlatDailyFine, Money};
use library_backend::inbound::http::configure_api;
use library_backend::inbound::http::validation::{json_config, query_config};
use library_backend::server::{LibraryRuntime, start_library};
use library_backend::test_support::MutableClock;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

fn day0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
        .single()
        .expect("valid instant")
}

#[fixture]
fn clock() -> Arc<MutableClock> {
    Arc::new(MutableClock::new(day0()))
}

async fn console(
    clock: Arc<MutableClock>,
) -> (
    impl Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>,
    LibraryRuntime,
) {
    let rules = CirculationRules {
        loan_period: TimeDelta::days(14),
        fine_policy: Arc::new(FlatDailyFine::new(Money::from_cents(100), None)),
    };
    let runtime = start_library(clock, rules, true)
        .await
        .expect("library starts");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(runtime.http_state()))
            .app_data(json_config())
            .app_data(query_config())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                    .cookie_name("session".to_owned())
                    .cookie_secure(false)
                    .build(),
            )
            .wrap(Trace)
            .service(web::scope("/api/v1").configure(configure_api)),
    )
    .await;
    (app, runtime)
}

async fn sign_in<S>(app: &S, email: &str, password: &str) -> Cookie<'static>
where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>,
{
    let res = test::call_service(
        app,
        test::TestRequest::post()
            .uri("/api/v1/login")
            .set_json(json!({ "email": email, "password": password }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK, "sign-in as {email}");
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie")
        .into_owned()
}

async fn call<S>(
    app: &S,
    request: test::TestRequest,
    cookie: &Cookie<'static>,
) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>,
{
    let res = test::call_service(app, request.cookie(cookie.clone()).to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("json body")
    };
    (status, value)
}

fn book_id(books: &Value, title: &str) -> String {
    books
        .as_array()
        .and_then(|books| books.iter().find(|book| book["title"] == title))
        .and_then(|book| book["id"].as_str())
        .map(str::to_owned)
        .unwrap_or_else(|| panic!("{title} in catalogue"))
}

#[rstest]
#[actix_web::test]
async fn borrow_overdue_and_return_with_fine(clock: Arc<MutableClock>) {
    let (app, runtime) = console(clock.clone()).await;
    let cookie = sign_in(&app, "librarian@library.com", "librarian123").await;

    let (_, dashboard) = call(&app, test::TestRequest::get().uri("/api/v1/dashboard"), &cookie).await;
    assert_eq!(dashboard["stats"]["totalBooks"], 42);
    assert_eq!(dashboard["stats"]["booksAvailable"], 20);

    let (_, books) = call(&app, test::TestRequest::get().uri("/api/v1/books?q=calc"), &cookie).await;
    let calculus = book_id(&books, "Advanced Calculus");
    let (_, me) = call(&app, test::TestRequest::get().uri("/api/v1/users/me"), &cookie).await;

    let (status, loan) = call(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/transactions")
            .set_json(json!({ "userId": me["id"], "bookId": calculus })),
        &cookie,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(loan["status"], "borrowed");
    assert_eq!(loan["bookTitle"], "Advanced Calculus");

    clock.advance(TimeDelta::days(20));
    let (_, dashboard) = call(&app, test::TestRequest::get().uri("/api/v1/dashboard"), &cookie).await;
    assert_eq!(dashboard["stats"]["booksAvailable"], 19);
    assert_eq!(dashboard["stats"]["booksOverdue"], 1);
    assert_eq!(dashboard["overdue"][0]["id"], loan["id"]);

    let loan_id = loan["id"].as_str().expect("loan id");
    let (status, closed) = call(
        &app,
        test::TestRequest::post().uri(&format!("/api/v1/transactions/{loan_id}/return")),
        &cookie,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["status"], "returned");
    assert_eq!(closed["fine"], "6.00");

    let (status, again) = call(
        &app,
        test::TestRequest::post().uri(&format!("/api/v1/transactions/{loan_id}/return")),
        &cookie,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["code"], "invalid_state");

    let (_, reports) = call(&app, test::TestRequest::get().uri("/api/v1/reports"), &cookie).await;
    assert_eq!(reports["mostBorrowed"][0]["title"], "Advanced Calculus");

    let mut mirrored = 0;
    for _ in 0..50 {
        mirrored = runtime
            .store
            .select(EntityKind::Transaction, &RowFilter::all())
            .await
            .expect("select transactions")
            .len();
        if mirrored == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(mirrored, 1, "loan mirrored into the row store");
}

#[rstest]
#[actix_web::test]
async fn exhausted_titles_cannot_be_borrowed(clock: Arc<MutableClock>) {
    let (app, _runtime) = console(clock).await;
    let cookie = sign_in(&app, "sarah.johnson@library.com", "librarian123").await;

    let (_, books) = call(&app, test::TestRequest::get().uri("/api/v1/books?q=organic"), &cookie).await;
    let chemistry = book_id(&books, "Organic Chemistry Fundamentals");
    let (_, me) = call(&app, test::TestRequest::get().uri("/api/v1/users/me"), &cookie).await;

    let (status, body) = call(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/transactions")
            .set_json(json!({ "userId": me["id"], "bookId": chemistry })),
        &cookie,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "copies_unavailable");
}

#[rstest]
#[actix_web::test]
async fn only_admins_manage_accounts(clock: Arc<MutableClock>) {
    let (app, _runtime) = console(clock).await;
    let new_account = json!({
        "email": "new.librarian@library.com",
        "name": "New Librarian",
        "role": "librarian",
        "password": "secret1"
    });

    let librarian = sign_in(&app, "librarian@library.com", "librarian123").await;
    let (status, _) = call(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/users")
            .set_json(&new_account),
        &librarian,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = sign_in(&app, "admin@library.com", "admin123").await;
    let (status, created) = call(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/users")
            .set_json(&new_account),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["role"], "librarian");

    sign_in(&app, "new.librarian@library.com", "secret1").await;

    let (_, me) = call(&app, test::TestRequest::get().uri("/api/v1/users/me"), &admin).await;
    let admin_id = me["id"].as_str().expect("admin id");
    assert_eq!(me["sections"].as_array().map(Vec::len), Some(6));
    let (status, body) = call(
        &app,
        test::TestRequest::delete().uri(&format!("/api/v1/users/{admin_id}")),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}

#[rstest]
#[actix_web::test]
async fn sign_in_rejects_wrong_passwords(clock: Arc<MutableClock>) {
    let (app, _runtime) = console(clock).await;
    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/login")
            .set_json(json!({ "email": "admin@library.com", "password": "nope-nope" }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().contains_key("trace-id"));
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["code"], "unauthorized");
    assert!(body["traceId"].is_string());
}
