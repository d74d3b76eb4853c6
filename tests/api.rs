mod common;

use std::sync::Arc;

use common::{BASE, ScriptedTransport, read_fixture};
use unity_cup_terminal::api::{LeagueApi, MatchQuery};
use unity_cup_terminal::error::ApiError;
use unity_cup_terminal::events::MatchEvent;
use unity_cup_terminal::feed::{match_event_deltas, results_delta, standings_deltas};
use unity_cup_terminal::model::{Category, parse_match_json};
use unity_cup_terminal::state::Delta;
use unity_cup_terminal::transport::Method;

fn api(transport: &Arc<ScriptedTransport>) -> LeagueApi {
    LeagueApi::new(&format!("{BASE}/"), transport.clone())
}

#[test]
fn builds_endpoint_urls_with_query_filters() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(Method::Get, "/matches/", 200, "[]")
            .on(Method::Get, "/seasons/", 200, "[]")
            .on(Method::Get, "/grouped-standings/", 200, "[]")
            .on(Method::Get, "/standings/", 200, "[]")
            .on(Method::Get, "/groups/", 200, "[]"),
    );
    let api = api(&transport);

    api.get_matches(&MatchQuery::All).expect("matches");
    api.get_matches(&MatchQuery::Season(5)).expect("matches");
    api.get_matches(&MatchQuery::SeasonName("2025 GIRLS CUP".to_string()))
        .expect("matches");
    api.get_seasons(Some(Category::JuniorBoys)).expect("seasons");
    api.get_grouped_standings(5, Some(Category::Girls)).expect("standings");
    api.get_standings(5).expect("flat standings");
    api.get_groups(5).expect("groups");

    let urls = transport
        .requests()
        .into_iter()
        .map(|r| r.url)
        .collect::<Vec<_>>();
    assert_eq!(
        urls,
        vec![
            format!("{BASE}/matches/"),
            format!("{BASE}/matches/?season=5"),
            format!("{BASE}/matches/?season_name=2025+GIRLS+CUP"),
            format!("{BASE}/seasons/?category=junior_boys"),
            format!("{BASE}/grouped-standings/?season=5&category=girls"),
            format!("{BASE}/standings/5/"),
            format!("{BASE}/groups/?season=5"),
        ]
    );
    assert!(transport.requests().iter().all(|r| r.header("Authorization").is_none()));
}

#[test]
fn news_detail_uses_trailing_slash() {
    let transport = Arc::new(ScriptedTransport::new().on(
        Method::Get,
        "/news/7/",
        200,
        r#"{"id":7,"title":"Quarterfinal line-up confirmed","content":"<p>x</p>"}"#,
    ));

    let item = api(&transport).get_news_item(7).expect("news item");

    assert_eq!(item.title, "Quarterfinal line-up confirmed");
    assert_eq!(transport.requests()[0].url, format!("{BASE}/news/7/"));
}

#[test]
fn non_success_carries_body_text() {
    let transport = Arc::new(ScriptedTransport::new().on(
        Method::Get,
        "/grouped-standings/",
        400,
        "season parameter required",
    ));

    let err = api(&transport)
        .get_grouped_standings(0, None)
        .expect_err("400 should fail");

    assert_eq!(err.status(), Some(400));
    assert_eq!(err.user_message("view standings"), "season parameter required");
}

#[test]
fn empty_error_body_falls_back_to_generic_text() {
    let transport = Arc::new(ScriptedTransport::new().on(Method::Get, "/teams/", 502, ""));
    let err = api(&transport).get_teams().expect_err("502 should fail");
    assert_eq!(err.user_message("view teams"), "API error");
}

#[test]
fn network_failure_is_reported_as_such() {
    let transport = Arc::new(ScriptedTransport::new().down(Method::Get, "/news/"));
    let err = api(&transport).get_news().expect_err("network down");
    assert!(matches!(err, ApiError::Network(_)));
}

#[test]
fn results_delta_carries_selected_season() {
    let transport = Arc::new(ScriptedTransport::new().on(
        Method::Get,
        "/matches/?season=5",
        200,
        &read_fixture("matches.json"),
    ));

    match results_delta(&api(&transport), 5).expect("results") {
        Delta::SetResults { season_id, matches } => {
            assert_eq!(season_id, 5);
            assert_eq!(matches.len(), 10);
        }
        other => panic!("unexpected delta {other:?}"),
    }
}

#[test]
fn standings_deltas_pair_server_table_with_local_check() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(
                Method::Get,
                "/grouped-standings/",
                200,
                &read_fixture("grouped_standings.json"),
            )
            .on(
                Method::Get,
                "/groups-with-teams/",
                200,
                &read_fixture("groups_with_teams.json"),
            )
            .on(Method::Get, "/matches/", 200, &read_fixture("matches.json")),
    );

    let deltas = standings_deltas(&api(&transport), 5, Some(Category::SeniorBoys)).expect("deltas");

    assert_eq!(deltas.len(), 2);
    match &deltas[0] {
        Delta::SetGroupedStandings { season_id, groups } => {
            assert_eq!(*season_id, 5);
            // Server order is what gets displayed.
            assert_eq!(groups[0].standings[2].team_name, "LAGURU");
            assert_eq!(groups[0].standings[2].goals_for, 3);
        }
        other => panic!("unexpected delta {other:?}"),
    }
    match &deltas[1] {
        Delta::SetDiscrepancies { discrepancies, .. } => {
            assert_eq!(discrepancies.len(), 1);
            assert_eq!(discrepancies[0].team_name, "LAGURU");
        }
        other => panic!("unexpected delta {other:?}"),
    }
}

#[test]
fn failed_check_still_delivers_server_standings() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(
                Method::Get,
                "/grouped-standings/",
                200,
                &read_fixture("grouped_standings.json"),
            )
            .down(Method::Get, "/groups-with-teams/"),
    );

    let deltas = standings_deltas(&api(&transport), 5, None).expect("deltas");

    assert_eq!(deltas.len(), 1);
    assert!(matches!(deltas[0], Delta::SetGroupedStandings { season_id: 5, .. }));
}

fn standings_routes() -> Arc<ScriptedTransport> {
    Arc::new(
        ScriptedTransport::new()
            .on(
                Method::Get,
                "/grouped-standings/",
                200,
                &read_fixture("grouped_standings.json"),
            )
            .on(
                Method::Get,
                "/groups-with-teams/",
                200,
                &read_fixture("groups_with_teams.json"),
            )
            .on(Method::Get, "/matches/", 200, &read_fixture("matches.json")),
    )
}

#[test]
fn group_match_update_reloads_shown_standings() {
    let transport = standings_routes();
    let saved = parse_match_json(
        r#"{"id":106,"season":5,"home_team":{"id":1,"name":"ABAM FC"},"away_team":{"id":3,"name":"UMUOSU"},"home_score":2,"away_score":0,"matchday":6,"is_played":true}"#,
    )
    .expect("match");

    let deltas = match_event_deltas(
        &api(&transport),
        MatchEvent::Updated(saved),
        Some((5, Category::SeniorBoys)),
    );

    assert_eq!(deltas.len(), 3);
    assert!(matches!(deltas[0], Delta::MatchEvent(MatchEvent::Updated(_))));
    assert!(matches!(deltas[1], Delta::SetGroupedStandings { season_id: 5, .. }));
    assert!(matches!(deltas[2], Delta::SetDiscrepancies { season_id: 5, .. }));
    assert_eq!(
        transport.last(Method::Get, "/grouped-standings/").map(|r| r.url),
        Some(format!("{BASE}/grouped-standings/?season=5&category=senior_boys"))
    );
}

#[test]
fn knockout_or_other_season_updates_skip_standings() {
    let transport = standings_routes();
    let knockout = parse_match_json(
        r#"{"id":122,"season":5,"home_team":"ABAM FC","away_team":"AMAPU","home_score":3,"away_score":1,"matchday":22,"is_played":true}"#,
    )
    .expect("match");
    let elsewhere = parse_match_json(
        r#"{"id":301,"season":4,"home_team":"ABAM FC","away_team":"AMAPU","home_score":1,"away_score":0,"matchday":2,"is_played":true}"#,
    )
    .expect("match");

    let shown = Some((5, Category::SeniorBoys));
    assert_eq!(
        match_event_deltas(&api(&transport), MatchEvent::ScoresSaved(knockout), shown).len(),
        1
    );
    assert_eq!(
        match_event_deltas(&api(&transport), MatchEvent::ScoresSaved(elsewhere.clone()), shown).len(),
        1
    );
    assert_eq!(
        match_event_deltas(&api(&transport), MatchEvent::ScoresSaved(elsewhere), None).len(),
        1
    );
    assert!(transport.requests().is_empty());
}
