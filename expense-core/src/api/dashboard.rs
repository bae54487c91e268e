//! Dashboard analytics and the all-or-nothing snapshot load.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use strum::{AsRefStr, Display, EnumIter};

use super::models::{
    CategoryTotal, MonthlyTotal, Recommendations, Summary, TopCategories, WeekdayTotal,
};
use crate::error::ExplorerError;
use crate::http::{PendingRequest, RequestPipeline};

/// The six analytics queries behind the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum DashboardSection {
    /// Totals and counts.
    Summary,
    /// Totals per category.
    CategoryBreakdown,
    /// Highest and lowest categories.
    TopCategories,
    /// Totals per month.
    SpendingTrend,
    /// Totals per weekday.
    SpendingByWeekday,
    /// Budget hints.
    Recommendations,
}

impl DashboardSection {
    /// Endpoint path, e.g. `/dashboard/spending-trend/`.
    #[must_use]
    pub fn path(self) -> String {
        format!("/dashboard/{self}/")
    }
}

/// What the dashboard is computed over. An empty scope covers every
/// transaction of the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardScope {
    /// Only this statement.
    pub statement_id: Option<i64>,
    /// Earliest booking date (`YYYY-MM-DD`).
    pub start_date: Option<String>,
    /// Latest booking date (`YYYY-MM-DD`).
    pub end_date: Option<String>,
}

impl DashboardScope {
    /// Scope covering a single statement.
    #[must_use]
    pub const fn statement(statement_id: i64) -> Self {
        Self {
            statement_id: Some(statement_id),
            start_date: None,
            end_date: None,
        }
    }

    fn request(&self, section: DashboardSection) -> PendingRequest {
        PendingRequest::get(section.path())
            .query_opt("statement_id", self.statement_id)
            .query_opt("start_date", self.start_date.as_deref())
            .query_opt("end_date", self.end_date.as_deref())
    }
}

/// Results of all six sections, taken together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    /// [`DashboardSection::Summary`]
    pub summary: Summary,
    /// [`DashboardSection::CategoryBreakdown`]
    pub category_breakdown: Vec<CategoryTotal>,
    /// [`DashboardSection::TopCategories`]
    pub top_categories: TopCategories,
    /// [`DashboardSection::SpendingTrend`]
    pub spending_trend: Vec<MonthlyTotal>,
    /// [`DashboardSection::SpendingByWeekday`]
    pub spending_by_weekday: Vec<WeekdayTotal>,
    /// [`DashboardSection::Recommendations`]
    pub recommendations: Recommendations,
}

/// Dashboard endpoints.
#[derive(Debug, Clone)]
pub struct DashboardApi {
    pipeline: Arc<RequestPipeline>,
}

impl DashboardApi {
    pub(crate) const fn new(pipeline: Arc<RequestPipeline>) -> Self {
        Self { pipeline }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        section: DashboardSection,
        scope: &DashboardScope,
    ) -> Result<T, ExplorerError> {
        self.pipeline
            .execute_checked(scope.request(section))
            .await?
            .json()
    }

    /// # Errors
    ///
    /// Returns a network or session error.
    pub async fn summary(&self, scope: &DashboardScope) -> Result<Summary, ExplorerError> {
        self.fetch(DashboardSection::Summary, scope).await
    }

    /// # Errors
    ///
    /// Returns a network or session error.
    pub async fn category_breakdown(
        &self,
        scope: &DashboardScope,
    ) -> Result<Vec<CategoryTotal>, ExplorerError> {
        self.fetch(DashboardSection::CategoryBreakdown, scope).await
    }

    /// # Errors
    ///
    /// Returns a network or session error.
    pub async fn top_categories(
        &self,
        scope: &DashboardScope,
    ) -> Result<TopCategories, ExplorerError> {
        self.fetch(DashboardSection::TopCategories, scope).await
    }

    /// # Errors
    ///
    /// Returns a network or session error.
    pub async fn spending_trend(
        &self,
        scope: &DashboardScope,
    ) -> Result<Vec<MonthlyTotal>, ExplorerError> {
        self.fetch(DashboardSection::SpendingTrend, scope).await
    }

    /// # Errors
    ///
    /// Returns a network or session error.
    pub async fn spending_by_weekday(
        &self,
        scope: &DashboardScope,
    ) -> Result<Vec<WeekdayTotal>, ExplorerError> {
        self.fetch(DashboardSection::SpendingByWeekday, scope).await
    }

    /// # Errors
    ///
    /// Returns a network or session error.
    pub async fn recommendations(
        &self,
        scope: &DashboardScope,
    ) -> Result<Recommendations, ExplorerError> {
        self.fetch(DashboardSection::Recommendations, scope).await
    }

    /// Issues all six section queries concurrently and returns only when every
    /// one succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`ExplorerError::Aggregation`] naming the first section that
    /// failed. Nothing of the other sections is returned.
    pub async fn load(&self, scope: &DashboardScope) -> Result<DashboardSnapshot, ExplorerError> {
        let (
            summary,
            category_breakdown,
            top_categories,
            spending_trend,
            spending_by_weekday,
            recommendations,
        ) = tokio::try_join!(
            section(DashboardSection::Summary, self.summary(scope)),
            section(
                DashboardSection::CategoryBreakdown,
                self.category_breakdown(scope)
            ),
            section(DashboardSection::TopCategories, self.top_categories(scope)),
            section(DashboardSection::SpendingTrend, self.spending_trend(scope)),
            section(
                DashboardSection::SpendingByWeekday,
                self.spending_by_weekday(scope)
            ),
            section(DashboardSection::Recommendations, self.recommendations(scope)),
        )?;

        Ok(DashboardSnapshot {
            summary,
            category_breakdown,
            top_categories,
            spending_trend,
            spending_by_weekday,
            recommendations,
        })
    }
}

async fn section<T>(
    section: DashboardSection,
    query: impl Future<Output = Result<T, ExplorerError>>,
) -> Result<T, ExplorerError> {
    query.await.map_err(|source| {
        log::debug!("dashboard section {section} failed: {source}");
        ExplorerError::Aggregation {
            section,
            source: Box::new(source),
        }
    })
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_section_paths() {
        let paths: Vec<String> = DashboardSection::iter().map(DashboardSection::path).collect();
        assert_eq!(
            paths,
            [
                "/dashboard/summary/",
                "/dashboard/category-breakdown/",
                "/dashboard/top-categories/",
                "/dashboard/spending-trend/",
                "/dashboard/spending-by-weekday/",
                "/dashboard/recommendations/",
            ]
        );
    }

    #[test]
    fn test_scope_query() {
        let request = DashboardScope::statement(12).request(DashboardSection::Recommendations);
        assert_eq!(request.path(), "/dashboard/recommendations/");
        assert_eq!(
            request.query_pairs(),
            [("statement_id".to_string(), "12".to_string())]
        );

        let unscoped = DashboardScope::default().request(DashboardSection::Summary);
        assert!(unscoped.query_pairs().is_empty());
    }
}
