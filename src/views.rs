use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, Local, NaiveDate, TimeZone};

use crate::model::{Match, Stage};

/// Home page shows at most this many of today's matches.
pub const HOME_MATCH_LIMIT: usize = 3;

/// Results page stage order, most decisive round first.
pub const STAGE_ORDER: [Stage; 6] = [
    Stage::Final,
    Stage::ThirdPlace,
    Stage::Semifinal,
    Stage::Quarterfinal,
    Stage::Group,
    Stage::Knockout,
];

/// Matches kicking off within `[day 00:00, next day 00:00)` in the local
/// zone, first `limit` in input order.
pub fn todays_matches(matches: &[Match], day: NaiveDate, limit: usize) -> Vec<Match> {
    let Some((start, end)) = local_day_bounds(day) else {
        return Vec::new();
    };
    matches
        .iter()
        .filter(|m| {
            m.match_date
                .is_some_and(|dt| dt >= start && dt < end)
        })
        .take(limit)
        .cloned()
        .collect()
}

fn local_day_bounds(day: NaiveDate) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let start_naive = day.and_hms_opt(0, 0, 0)?;
    let end_naive = start_naive + ChronoDuration::days(1);
    let start = Local.from_local_datetime(&start_naive).earliest()?;
    let end = Local.from_local_datetime(&end_naive).earliest()?;
    Some((start.fixed_offset(), end.fixed_offset()))
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSection {
    pub stage: Stage,
    pub matches: Vec<Match>,
}

/// Newest first, then bucketed by stage in `STAGE_ORDER`; inside a stage
/// matches run by matchday.
pub fn results_by_stage(matches: &[Match]) -> Vec<StageSection> {
    let mut sorted: Vec<Match> = matches.to_vec();
    sorted.sort_by(|a, b| b.match_date.cmp(&a.match_date));
    let mut buckets: HashMap<Stage, Vec<Match>> = HashMap::new();
    for m in sorted {
        buckets.entry(m.stage()).or_default().push(m);
    }
    STAGE_ORDER
        .iter()
        .filter_map(|stage| {
            let mut matches = buckets.remove(stage)?;
            matches.sort_by_key(|m| m.matchday.unwrap_or(0));
            Some(StageSection {
                stage: *stage,
                matches,
            })
        })
        .collect()
}

/// Ids whose participants went from a placeholder to real teams between
/// two polls.
pub fn newly_resolved(previous: &[Match], current: &[Match]) -> Vec<u64> {
    let before: HashMap<u64, &Match> = previous.iter().map(|m| (m.id, m)).collect();
    current
        .iter()
        .filter(|m| {
            before
                .get(&m.id)
                .is_some_and(|prev| prev.has_placeholder() && !m.has_placeholder())
        })
        .map(|m| m.id)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Pending,
    Played,
    Voided,
    Awarded,
}

impl Badge {
    pub fn label(self) -> &'static str {
        match self {
            Badge::Pending => "PENDING",
            Badge::Played => "PLAYED",
            Badge::Voided => "VOIDED",
            Badge::Awarded => "AWARDED",
        }
    }
}

pub fn badges(m: &Match) -> Vec<Badge> {
    let mut out = Vec::new();
    if m.has_placeholder() {
        out.push(Badge::Pending);
    }
    if m.void {
        out.push(Badge::Voided);
    } else if m.is_played {
        out.push(Badge::Played);
    }
    if m.award.is_some() {
        out.push(Badge::Awarded);
    }
    out
}

/// Renders news HTML as plain text: tags dropped, block ends become line
/// breaks, common entities decoded.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut chars = html.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '<' {
            out.push(c);
            continue;
        }
        let mut tag = String::new();
        for t in chars.by_ref() {
            if t == '>' {
                break;
            }
            tag.push(t);
        }
        let name = tag
            .trim_start_matches('/')
            .split(|ch: char| ch.is_whitespace() || ch == '/')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        let closing = tag.starts_with('/');
        match name.as_str() {
            "br" => out.push('\n'),
            "p" | "div" | "h1" | "h2" | "h3" | "h4" | "li" if closing => out.push('\n'),
            "li" => out.push_str("- "),
            _ => {}
        }
    }
    let decoded = out
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    let mut lines: Vec<&str> = decoded.lines().map(str::trim_end).collect();
    lines.dedup_by(|a, b| a.is_empty() && b.is_empty());
    lines.join("\n").trim().to_string()
}

pub fn kickoff_label(m: &Match) -> String {
    match m.match_date {
        Some(dt) => dt
            .with_timezone(&Local)
            .format("%a %d %b %H:%M")
            .to_string(),
        None if !m.match_date_raw.is_empty() => m.match_date_raw.clone(),
        None => "TBD".to_string(),
    }
}
