#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonStatus {
    Ongoing,
    Completed,
}

impl SeasonStatus {
    pub fn label(self) -> &'static str {
        match self {
            SeasonStatus::Ongoing => "ongoing",
            SeasonStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    pub year: u16,
    pub title: &'static str,
    pub description: &'static str,
    pub status: SeasonStatus,
}

pub const MILESTONES: &str = "From 2023 to present, Ubakala Football League has grown to become a \
premier community sports competition with 12 participating teams and hundreds of spectators.";

/// Newest season first.
pub fn timeline() -> &'static [HistoryEntry] {
    const ENTRIES: [HistoryEntry; 3] = [
        HistoryEntry {
            year: 2025,
            title: "Current Season",
            description: "Ubakala Football League Season 2025 - 3 categories (Senior Boys, Junior Boys, Girls) with group stage and knockout rounds.",
            status: SeasonStatus::Ongoing,
        },
        HistoryEntry {
            year: 2024,
            title: "Season 2024",
            description: "Successfully concluded the 2024 season with exciting finals across all three categories.",
            status: SeasonStatus::Completed,
        },
        HistoryEntry {
            year: 2023,
            title: "Season 2023",
            description: "Successfully concluded the 2023 season with exciting finals across all three categories.",
            status: SeasonStatus::Completed,
        },
    ];
    &ENTRIES
}
