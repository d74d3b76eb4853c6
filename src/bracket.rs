use crate::model::{Match, Participant, Placeholder, PlaceholderKind, Stage};

const QF_MATCHDAYS: [u32; 4] = [22, 23, 24, 25];
const SF_MATCHDAYS: [u32; 2] = [26, 27];
const THIRD_PLACE_MATCHDAY: u32 = 28;
const FINAL_MATCHDAY: u32 = 29;

/// Stage and slot letter a knockout matchday feeds, e.g. 23 -> ("Quarterfinal", Some('B')).
pub fn slot_for_matchday(matchday: u32) -> Option<(&'static str, Option<char>)> {
    match matchday {
        22..=25 => Some(("Quarterfinal", char::from_u32('A' as u32 + matchday - 22))),
        26..=27 => Some(("Semifinal", char::from_u32('A' as u32 + matchday - 26))),
        THIRD_PLACE_MATCHDAY => Some(("Third Place", None)),
        FINAL_MATCHDAY => Some(("Final", None)),
        _ => None,
    }
}

/// Friendly text for an unresolved participant, e.g. `Winner - Quarterfinal A`.
/// Falls back to the stage of the match it appears in.
pub fn placeholder_label(placeholder: &Placeholder, match_matchday: Option<u32>) -> String {
    let descriptor = match placeholder.kind {
        PlaceholderKind::Winner => "Winner",
        PlaceholderKind::Loser => "Loser",
    };
    let target = match placeholder.matchday.and_then(slot_for_matchday) {
        Some((stage, Some(slot))) => format!("{stage} {slot}"),
        Some((stage, None)) => stage.to_string(),
        None => match match_matchday {
            Some(_) => Stage::from_matchday(match_matchday).label().to_string(),
            None => "Knockout".to_string(),
        },
    };
    format!("{descriptor} - {target}")
}

pub fn participant_label(participant: &Participant, match_matchday: Option<u32>) -> String {
    match participant {
        Participant::Placeholder(p) => placeholder_label(p, match_matchday),
        other => other.display_name(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connector {
    pub from: u64,
    pub to: u64,
    /// Source match has both scores and a winner.
    pub revealed: bool,
}

/// Knockout matches of one season, bucketed by matchday slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bracket {
    pub quarterfinals: Vec<Match>,
    pub semifinals: Vec<Match>,
    pub third_place: Vec<Match>,
    pub final_round: Vec<Match>,
}

fn on_matchdays(matches: &[Match], days: &[u32]) -> Vec<Match> {
    days.iter()
        .flat_map(move |day| matches.iter().filter(move |m| m.matchday == Some(*day)))
        .cloned()
        .collect()
}

impl Bracket {
    pub fn from_matches(matches: &[Match]) -> Self {
        Self {
            quarterfinals: on_matchdays(matches, &QF_MATCHDAYS),
            semifinals: on_matchdays(matches, &SF_MATCHDAYS),
            third_place: on_matchdays(matches, &[THIRD_PLACE_MATCHDAY]),
            final_round: on_matchdays(matches, &[FINAL_MATCHDAY]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.quarterfinals.is_empty()
            && self.semifinals.is_empty()
            && self.third_place.is_empty()
            && self.final_round.is_empty()
    }

    pub fn find(&self, id: u64) -> Option<&Match> {
        self.quarterfinals
            .iter()
            .chain(&self.semifinals)
            .chain(&self.third_place)
            .chain(&self.final_round)
            .find(|m| m.id == id)
    }

    /// QF pairs feed the semifinals, both semifinals feed the final and the
    /// third-place match. Incomplete rounds are wired in order.
    pub fn connectors(&self) -> Vec<Connector> {
        let mut links: Vec<(u64, u64)> = Vec::new();
        let qf = &self.quarterfinals;
        let sf = &self.semifinals;

        for (i, semi) in sf.iter().enumerate() {
            for source in qf.iter().skip(i * 2).take(2) {
                links.push((source.id, semi.id));
            }
        }
        if let Some(fin) = self.final_round.first() {
            for semi in sf.iter().take(2) {
                links.push((semi.id, fin.id));
            }
        }
        if let Some(third) = self.third_place.first() {
            if sf.len() >= 2 {
                for semi in sf.iter().take(2) {
                    links.push((semi.id, third.id));
                }
            }
        }

        links
            .into_iter()
            .map(|(from, to)| Connector {
                from,
                to,
                revealed: self.find(from).is_some_and(Match::is_decisive),
            })
            .collect()
    }
}
