use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Map, Value};

use unity_cup_terminal::admin::{ManualTeam, ResultInput, accepts_penalties, find_group, plan_move};
use unity_cup_terminal::config::ClientConfig;
use unity_cup_terminal::error::ApiError;
use unity_cup_terminal::feed::Provider;
use unity_cup_terminal::logging;
use unity_cup_terminal::model::{Category, NewsDraft};

const USAGE: &str = "usage: league_admin <command> [args]

  login <username> [--password=PW]      (or LEAGUE_ADMIN_PASSWORD, or prompt)
  logout
  whoami
  set-result <match_id> <home> <away> [--pens=H-A]
  mark-finished <match_id> [--extra-time=MIN]
  news-post --title=T --content=C [--subtitle=S] [--image-url=URL]
  news-edit <news_id> [--title=T] [--subtitle=S] [--content=C] [--image-url=URL]
  news-delete <news_id>
  move-team <team_id> <to_group_id> <season_id>
  add-team --team=NAME --category=senior_boys|girls|junior_boys --season=ID --group=NAME
  import-excel <path.xlsx>
  standings <season_id>";

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init_stderr("warn");

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let Some(command) = args.first() else {
        println!("{USAGE}");
        return Ok(());
    };
    let rest = &args[1..];

    let config = ClientConfig::from_env();
    let provider = Provider::from_config(&config);
    let session = &provider.session;
    let admin = &provider.admin;

    match command.as_str() {
        "login" => {
            let username = positional(rest, 0).context("missing <username>")?;
            let password = match flag(rest, "--password") {
                Some(pw) => pw,
                None => match std::env::var("LEAGUE_ADMIN_PASSWORD") {
                    Ok(pw) if !pw.is_empty() => pw,
                    _ => prompt("Password: ")?,
                },
            };
            session
                .login(&username, &password)
                .map_err(|err| cli_error(err, "log in"))?;
            println!("Logged in as {username}");
            let groups = session.groups();
            if !groups.is_empty() {
                println!("Groups: {}", groups.join(", "));
            }
        }
        "logout" => {
            session.logout();
            println!("Logged out");
        }
        "whoami" => {
            if !session.is_logged_in() {
                println!("Not logged in");
                return Ok(());
            }
            let user = session
                .current_user()
                .map_err(|err| cli_error(err, "view your profile"))?;
            println!("User: {}", user.username);
            if let Some(email) = &user.email {
                println!("Email: {email}");
            }
            println!("Role: {}", user.role());
            let perms = user.permission_names();
            if !perms.is_empty() {
                println!("Permissions: {}", perms.join(", "));
            }
            if let Some(secs) = session.access_expires_in() {
                println!("Access token expires in {secs}s");
            }
        }
        "set-result" => {
            let match_id = parse_num(rest, 0, "<match_id>")?;
            let home = parse_num(rest, 1, "<home>")?;
            let away = parse_num(rest, 2, "<away>")?;
            let mut input = ResultInput::new(home, away);
            if let Some(raw) = flag(rest, "--pens") {
                let (ph, pa) = parse_pair(&raw).context("--pens expects H-A, e.g. 4-3")?;
                input = input.with_penalties(ph, pa);
            }
            if input.home_score == input.away_score && input.penalties.is_none() {
                let target = admin
                    .find_match(match_id)
                    .map_err(|err| cli_error(err, "update results"))?;
                let knockout = target.as_ref().is_some_and(accepts_penalties);
                input.validate(knockout).map_err(|msg| anyhow!(msg))?;
            }
            let updated = admin
                .set_result(match_id, input)
                .map_err(|err| cli_error(err, "update results"))?;
            println!(
                "Result updated: {} {} {}",
                updated.home.display_name(),
                updated.score_label(),
                updated.away.display_name()
            );
        }
        "mark-finished" => {
            let match_id = parse_num(rest, 0, "<match_id>")?;
            let extra = match flag(rest, "--extra-time") {
                Some(raw) => Some(raw.parse::<u32>().context("--extra-time expects minutes")?),
                None => None,
            };
            let updated = admin
                .mark_finished(match_id, extra)
                .map_err(|err| cli_error(err, "update results"))?;
            println!("Match {} marked finished", updated.id);
        }
        "news-post" => {
            let draft = NewsDraft {
                title: flag(rest, "--title").context("missing --title")?,
                subtitle: flag(rest, "--subtitle"),
                content: flag(rest, "--content").context("missing --content")?,
                image_url: flag(rest, "--image-url"),
            };
            let item = admin
                .create_news(&draft)
                .map_err(|err| cli_error(err, "post news"))?;
            println!("News {} posted: {}", item.id, item.title);
        }
        "news-edit" => {
            let id = parse_num(rest, 0, "<news_id>")?;
            let mut fields = Map::new();
            for (flag_name, key) in [
                ("--title", "title"),
                ("--subtitle", "subtitle"),
                ("--content", "content"),
                ("--image-url", "image_url"),
            ] {
                if let Some(value) = flag(rest, flag_name) {
                    fields.insert(key.to_string(), Value::String(value));
                }
            }
            if fields.is_empty() {
                bail!("nothing to change; pass at least one of --title/--subtitle/--content/--image-url");
            }
            let item = admin
                .update_news(id, Value::Object(fields))
                .map_err(|err| cli_error(err, "edit news"))?;
            println!("News {} updated: {}", item.id, item.title);
        }
        "news-delete" => {
            let id = parse_num(rest, 0, "<news_id>")?;
            admin
                .delete_news(id)
                .map_err(|err| cli_error(err, "delete news"))?;
            println!("News {id} deleted");
        }
        "move-team" => {
            let team_id = parse_num(rest, 0, "<team_id>")?;
            let to_group = parse_num(rest, 1, "<to_group_id>")?;
            let season_id = parse_num(rest, 2, "<season_id>")?;
            let mut groups = provider
                .api
                .get_groups_with_teams(season_id)
                .map_err(|err| cli_error(err, "view groups"))?;
            let from = plan_move(&mut groups, team_id, to_group).map_err(|msg| anyhow!(msg))?;
            admin
                .move_team(team_id, to_group, season_id)
                .map_err(|err| cli_error(err, "manage groups"))?;
            println!("Team {team_id} moved from group {from} to group {to_group}");
            for group in groups.iter().filter(|g| g.id == from || g.id == to_group) {
                let names = group.teams.iter().map(|t| t.name.as_str()).collect::<Vec<_>>();
                println!("  {}: {}", group.name, names.join(", "));
            }
        }
        "add-team" => {
            let raw_category = flag(rest, "--category").context("missing --category")?;
            let category = Category::parse(&raw_category)
                .with_context(|| format!("unknown category {raw_category}"))?;
            let team = ManualTeam {
                team_name: flag(rest, "--team").context("missing --team")?,
                category,
                season_id: flag(rest, "--season")
                    .context("missing --season")?
                    .parse()
                    .context("--season expects a season id")?,
                group_name: flag(rest, "--group").context("missing --group")?,
            };
            let season_groups = provider
                .api
                .get_groups(team.season_id)
                .map_err(|err| cli_error(err, "view groups"))?;
            let team = ManualTeam {
                group_name: find_group(&season_groups, &team.group_name)
                    .map_err(|msg| anyhow!(msg))?
                    .name
                    .clone(),
                ..team
            };
            let reply = admin
                .add_team_to_group(&team)
                .map_err(|err| cli_error(err, "manage groups"))?;
            println!("Added {} to {}", team.team_name, team.group_name);
            if !reply.is_null() {
                println!("{reply}");
            }
        }
        "import-excel" => {
            let path = positional(rest, 0)
                .map(PathBuf::from)
                .context("missing <path.xlsx>")?;
            let rows = admin
                .import_excel(&path)
                .map_err(|err| cli_error(err, "import teams"))?;
            println!("Imported {} row(s) from {}", rows.len(), path.display());
            for row in rows {
                let team = row.team.as_deref().unwrap_or("?");
                match &row.reason {
                    Some(reason) => println!("  {team}: {} ({reason})", row.status),
                    None => println!("  {team}: {}", row.status),
                }
                if !row.suggestions.is_empty() {
                    println!("    did you mean: {}", row.suggestions.join(", "));
                }
            }
        }
        "standings" => {
            let season_id = parse_num(rest, 0, "<season_id>")?;
            let rows = provider
                .api
                .get_standings(season_id)
                .map_err(|err| cli_error(err, "view standings"))?;
            println!("{:<4}{:<24}{:>4}{:>4}{:>4}{:>4}{:>5}{:>5}", "#", "Team", "P", "W", "D", "L", "GD", "Pts");
            for (pos, row) in rows.iter().enumerate() {
                println!(
                    "{:<4}{:<24}{:>4}{:>4}{:>4}{:>4}{:>5}{:>5}",
                    pos + 1,
                    row.team_name,
                    row.played,
                    row.wins,
                    row.draws,
                    row.losses,
                    row.goal_diff,
                    row.points
                );
            }
        }
        "help" | "--help" | "-h" => println!("{USAGE}"),
        other => return Err(anyhow!("unknown command {other}\n\n{USAGE}")),
    }

    Ok(())
}

fn cli_error(err: ApiError, action: &str) -> anyhow::Error {
    log::debug!("{action} failed: {err}");
    anyhow!(err.user_message(action))
}

fn positional(args: &[String], idx: usize) -> Option<String> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            if !arg.contains('=') {
                iter.next();
            }
            continue;
        }
        out.push(arg);
    }
    out.get(idx).map(|arg| arg.to_string())
}

fn parse_num<T: FromStr>(args: &[String], idx: usize, name: &str) -> Result<T> {
    let raw = positional(args, idx).with_context(|| format!("missing {name}"))?;
    raw.trim()
        .parse()
        .map_err(|_| anyhow!("{name} must be a number, got {raw}"))
}

fn flag(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_pair(raw: &str) -> Option<(u32, u32)> {
    let (home, away) = raw.split_once('-')?;
    Some((home.trim().parse().ok()?, away.trim().parse().ok()?))
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim_end_matches(['\r', '\n']).to_string();
    if value.is_empty() {
        bail!("no password given");
    }
    Ok(value)
}
