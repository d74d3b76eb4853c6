use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::model::{
    parse_list, parse_matches_json, Category, GroupRef, GroupStandings, GroupWithTeams, Match,
    NewsItem, Season, StandingsRow, Team,
};
use crate::transport::{HttpRequest, Transport};

/// Filter for `GET /matches/`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MatchQuery {
    #[default]
    All,
    Season(u64),
    SeasonName(String),
}

/// Read-only league endpoints. Every call is a single unauthenticated
/// attempt; non-2xx responses become `ApiError` with the body text.
#[derive(Clone)]
pub struct LeagueApi {
    base: String,
    transport: Arc<dyn Transport>,
}

impl LeagueApi {
    pub fn new(base: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            transport,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        build_url(&self.base, path)
    }

    pub fn fetch_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, ApiError> {
        let url = with_query(build_url(&self.base, path), query)?;
        let resp = self.transport.send(&HttpRequest::get(url))?;
        Ok(resp.error_for_status()?.body)
    }

    pub fn fetch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let body = self.fetch_text(path, query)?;
        serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))
    }

    fn fetch_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ApiError> {
        let body = self.fetch_text(path, query)?;
        parse_list(&body)
    }

    pub fn get_teams(&self) -> Result<Vec<Team>, ApiError> {
        self.fetch_list("/teams/", &[])
    }

    pub fn get_matches(&self, query: &MatchQuery) -> Result<Vec<Match>, ApiError> {
        let params = match query {
            MatchQuery::All => Vec::new(),
            MatchQuery::Season(id) => vec![("season", id.to_string())],
            MatchQuery::SeasonName(name) => vec![("season_name", name.clone())],
        };
        let body = self.fetch_text("/matches/", &params)?;
        parse_matches_json(&body)
    }

    pub fn get_seasons(&self, category: Option<Category>) -> Result<Vec<Season>, ApiError> {
        let params = category
            .map(|c| vec![("category", c.as_str().to_string())])
            .unwrap_or_default();
        self.fetch_list("/seasons/", &params)
    }

    pub fn get_news(&self) -> Result<Vec<NewsItem>, ApiError> {
        self.fetch_list("/news/", &[])
    }

    pub fn get_news_item(&self, id: u64) -> Result<NewsItem, ApiError> {
        self.fetch_json(&format!("/news/{id}/"), &[])
    }

    pub fn get_standings(&self, season_id: u64) -> Result<Vec<StandingsRow>, ApiError> {
        self.fetch_list(&format!("/standings/{season_id}/"), &[])
    }

    pub fn get_groups_with_teams(&self, season_id: u64) -> Result<Vec<GroupWithTeams>, ApiError> {
        self.fetch_list("/groups-with-teams/", &[("season", season_id.to_string())])
    }

    pub fn get_grouped_standings(
        &self,
        season_id: u64,
        category: Option<Category>,
    ) -> Result<Vec<GroupStandings>, ApiError> {
        let mut params = vec![("season", season_id.to_string())];
        if let Some(category) = category {
            params.push(("category", category.as_str().to_string()));
        }
        self.fetch_list("/grouped-standings/", &params)
    }

    pub fn get_groups(&self, season_id: u64) -> Result<Vec<GroupRef>, ApiError> {
        self.fetch_list("/groups/", &[("season", season_id.to_string())])
    }
}

/// Joins `path` onto `base` with exactly one slash between them.
pub fn build_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

/// Appends form-encoded query pairs to `url`.
pub fn with_query(url: String, query: &[(&str, String)]) -> Result<String, ApiError> {
    if query.is_empty() {
        return Ok(url);
    }
    reqwest::Url::parse_with_params(&url, query)
        .map(String::from)
        .map_err(|err| ApiError::Local(format!("invalid url {url}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_slashes_once() {
        assert_eq!(
            build_url("https://x.test/api/", "teams/"),
            "https://x.test/api/teams/"
        );
        assert_eq!(
            build_url("https://x.test/api", "/teams/"),
            "https://x.test/api/teams/"
        );
    }

    #[test]
    fn query_values_are_form_encoded() {
        let url = with_query(
            build_url("https://x.test/api", "/matches/"),
            &[("season_name", "2025 JUNIOR BOYS CUP".to_string())],
        )
        .expect("valid url");
        assert_eq!(
            url,
            "https://x.test/api/matches/?season_name=2025+JUNIOR+BOYS+CUP"
        );

        let url = with_query(
            "https://x.test/api/matches/".to_string(),
            &[("season_name", "Ü 2025&x".to_string())],
        )
        .expect("valid url");
        assert_eq!(url, "https://x.test/api/matches/?season_name=%C3%9C+2025%26x");
    }

    #[test]
    fn empty_query_leaves_url_alone() {
        let url = with_query("https://x.test/api/news/".to_string(), &[]).expect("valid url");
        assert_eq!(url, "https://x.test/api/news/");
    }

    #[test]
    fn unparsable_base_is_a_local_error() {
        let err = with_query("not a url".to_string(), &[("season", "5".to_string())])
            .expect_err("relative url");
        assert!(matches!(err, ApiError::Local(_)));
    }
}
