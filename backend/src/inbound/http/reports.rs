//! Dashboard and report handlers.
//!
//! Both endpoints are read-only aggregates recomputed on every call.

use actix_web::{get, web};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::query::{
    CategoryCount, Dashboard, DashboardStats, MonthlyActivity, Reports, TitleCount,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{TransactionDto, views};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Headline counters, in copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatsDto {
    pub total_books: u64,
    pub books_borrowed: u64,
    pub books_overdue: u64,
    pub books_available: u64,
}

impl From<DashboardStats> for DashboardStatsDto {
    fn from(stats: DashboardStats) -> Self {
        Self {
            total_books: stats.total_books,
            books_borrowed: stats.books_borrowed,
            books_overdue: stats.books_overdue,
            books_available: stats.books_available,
        }
    }
}

/// Body of `GET /api/v1/dashboard`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDto {
    pub stats: DashboardStatsDto,
    /// Open loans past due, most overdue first.
    pub overdue: Vec<TransactionDto>,
}

impl From<&Dashboard> for DashboardDto {
    fn from(summary: &Dashboard) -> Self {
        Self {
            stats: summary.stats.into(),
            overdue: views(&summary.overdue),
        }
    }
}

/// Loans opened and closed in one calendar month.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyActivityDto {
    #[schema(example = "2024-03")]
    pub month: String,
    pub borrowed: u64,
    pub returned: u64,
}

impl From<&MonthlyActivity> for MonthlyActivityDto {
    fn from(activity: &MonthlyActivity) -> Self {
        Self {
            month: activity.month.clone(),
            borrowed: activity.borrowed,
            returned: activity.returned,
        }
    }
}

/// Count per shelving category.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCountDto {
    #[schema(example = "Novels")]
    pub category: String,
    pub count: u64,
}

impl From<&CategoryCount> for CategoryCountDto {
    fn from(entry: &CategoryCount) -> Self {
        Self {
            category: entry.category.label().to_owned(),
            count: entry.count,
        }
    }
}

/// Loan count of one title.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TitleCountDto {
    pub book_id: Uuid,
    pub title: String,
    pub count: u64,
}

impl From<&TitleCount> for TitleCountDto {
    fn from(entry: &TitleCount) -> Self {
        Self {
            book_id: *entry.book_id.as_uuid(),
            title: entry.title.clone(),
            count: entry.count,
        }
    }
}

/// Body of `GET /api/v1/reports`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportsDto {
    pub monthly_activity: Vec<MonthlyActivityDto>,
    pub category_distribution: Vec<CategoryCountDto>,
    pub overdue_by_category: Vec<CategoryCountDto>,
    pub most_borrowed: Vec<TitleCountDto>,
}

impl From<&Reports> for ReportsDto {
    fn from(series: &Reports) -> Self {
        Self {
            monthly_activity: views(&series.monthly_activity),
            category_distribution: views(&series.category_distribution),
            overdue_by_category: views(&series.overdue_by_category),
            most_borrowed: views(&series.most_borrowed),
        }
    }
}

/// Counters and the overdue list as of now.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    responses(
        (status = 200, description = "Dashboard", body = DashboardDto),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["reports"],
    operation_id = "dashboard",
    security(("SessionCookie" = []))
)]
#[get("/dashboard")]
pub async fn dashboard(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<DashboardDto>> {
    let actor = session.require_actor(state.login.as_ref()).await?;
    let summary = state.reports.dashboard(&actor).await?;
    Ok(web::Json(DashboardDto::from(&summary)))
}

/// Report series over the whole ledger.
#[utoipa::path(
    get,
    path = "/api/v1/reports",
    responses(
        (status = 200, description = "Reports", body = ReportsDto),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["reports"],
    operation_id = "reports",
    security(("SessionCookie" = []))
)]
#[get("/reports")]
pub async fn reports(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<ReportsDto>> {
    let actor = session.require_actor(state.login.as_ref()).await?;
    let series = state.reports.reports(&actor).await?;
    Ok(web::Json(ReportsDto::from(&series)))
}

/// Mount the aggregate routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(dashboard).service(reports);
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::{BookCategory, BookId, Role};
    use crate::inbound::http::test_utils::{MockPorts, actor, signed_in_cookie, test_app};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::Value;

    #[rstest]
    #[actix_web::test]
    async fn dashboard_reports_counters() {
        let mut ports = MockPorts::signed_in_as(actor(Role::Librarian));
        ports.reports.expect_dashboard().times(1).returning(|_| {
            Ok(Dashboard {
                stats: DashboardStats {
                    total_books: 42,
                    books_borrowed: 17,
                    books_overdue: 2,
                    books_available: 25,
                },
                overdue: Vec::new(),
            })
        });
        let app = actix_test::init_service(test_app(ports.into_state(), configure)).await;
        let cookie = signed_in_cookie(&app).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/dashboard")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["stats"]["totalBooks"], 42);
        assert_eq!(body["stats"]["booksAvailable"], 25);
        assert_eq!(body["overdue"], Value::Array(Vec::new()));
    }

    #[rstest]
    #[actix_web::test]
    async fn reports_use_category_labels() {
        let book_id = BookId::random();
        let mut ports = MockPorts::signed_in_as(actor(Role::Librarian));
        ports.reports.expect_reports().times(1).returning(move |_| {
            Ok(Reports {
                monthly_activity: vec![MonthlyActivity {
                    month: "2024-03".into(),
                    borrowed: 3,
                    returned: 1,
                }],
                category_distribution: vec![CategoryCount {
                    category: BookCategory::HumanScience,
                    count: 3,
                }],
                overdue_by_category: Vec::new(),
                most_borrowed: vec![TitleCount {
                    book_id,
                    title: "Introduction to Human Biology".into(),
                    count: 3,
                }],
            })
        });
        let app = actix_test::init_service(test_app(ports.into_state(), configure)).await;
        let cookie = signed_in_cookie(&app).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/reports")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["monthlyActivity"][0]["month"], "2024-03");
        assert_eq!(body["categoryDistribution"][0]["category"], "Human Science");
        assert_eq!(body["mostBorrowed"][0]["bookId"], book_id.to_string());
    }

    #[rstest]
    #[actix_web::test]
    async fn aggregates_require_a_session() {
        let mut ports = MockPorts::default();
        ports.reports.expect_reports().never();
        let app = actix_test::init_service(test_app(ports.into_state(), configure)).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/api/v1/reports").to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
