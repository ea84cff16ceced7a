//! Per-agent aggregation of LLM prompt and response traces.
//!
//! Prompts and responses are independent append-only sequences. Nothing links
//! a response to the prompt that produced it; `thoughts()` pairs them by
//! position only, which is a display heuristic and can be wrong when the
//! server skips a fragment.

use std::collections::BTreeMap;

use clocktower_protocol::{DebugEntry, Player, STORYTELLER_AGENT};

/// Accumulated traces for one agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugLogBucket {
    prompts: Vec<DebugEntry>,
    responses: Vec<DebugEntry>,
}

/// Which half of the trace a timeline entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThoughtKind {
    Prompt,
    Response,
}

impl ThoughtKind {
    pub fn label(&self) -> &'static str {
        match self {
            ThoughtKind::Prompt => "prompt",
            ThoughtKind::Response => "response",
        }
    }
}

/// One entry of an agent's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thought<'a> {
    pub kind: ThoughtKind,
    /// Position within its own sequence
    pub index: usize,
    pub entry: &'a DebugEntry,
}

impl DebugLogBucket {
    pub fn prompts(&self) -> &[DebugEntry] {
        &self.prompts
    }

    pub fn responses(&self) -> &[DebugEntry] {
        &self.responses
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty() && self.responses.is_empty()
    }

    fn push(&mut self, prompt: Option<DebugEntry>, response: Option<DebugEntry>) {
        self.prompts.extend(prompt);
        self.responses.extend(response);
    }

    /// Prompts and responses interleaved by position.
    pub fn thoughts(&self) -> Vec<Thought<'_>> {
        let len = self.prompts.len().max(self.responses.len());
        let mut timeline = Vec::with_capacity(self.prompts.len() + self.responses.len());
        for index in 0..len {
            if let Some(entry) = self.prompts.get(index) {
                timeline.push(Thought {
                    kind: ThoughtKind::Prompt,
                    index,
                    entry,
                });
            }
            if let Some(entry) = self.responses.get(index) {
                timeline.push(Thought {
                    kind: ThoughtKind::Response,
                    index,
                    entry,
                });
            }
        }
        timeline
    }

    /// Timeline entries whose content contains `filter`, ignoring case.
    /// An empty filter matches everything.
    pub fn search(&self, filter: &str) -> Vec<Thought<'_>> {
        let needle = filter.trim().to_lowercase();
        if needle.is_empty() {
            return self.thoughts();
        }
        self.thoughts()
            .into_iter()
            .filter(|thought| thought.entry.content.to_lowercase().contains(&needle))
            .collect()
    }
}

/// Debug traces for the storyteller and every agent seen so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugLog {
    storyteller: DebugLogBucket,
    agents: BTreeMap<String, DebugLogBucket>,
}

impl DebugLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append whichever fragments are present to `agent`'s bucket.
    ///
    /// Returns `false` when neither fragment is present; nothing is created
    /// in that case.
    pub fn record(
        &mut self,
        agent: &str,
        prompt: Option<DebugEntry>,
        response: Option<DebugEntry>,
    ) -> bool {
        if prompt.is_none() && response.is_none() {
            return false;
        }

        let bucket = if agent == STORYTELLER_AGENT {
            &mut self.storyteller
        } else {
            self.agents.entry(agent.to_string()).or_default()
        };
        bucket.push(prompt, response);
        true
    }

    pub fn storyteller(&self) -> &DebugLogBucket {
        &self.storyteller
    }

    pub fn bucket(&self, agent: &str) -> Option<&DebugLogBucket> {
        if agent == STORYTELLER_AGENT {
            Some(&self.storyteller)
        } else {
            self.agents.get(agent)
        }
    }

    /// Agent ids to list: storyteller, then seated players in seat order,
    /// then any agent that only ever appeared in debug traces.
    pub fn agents(&self, players: &[Player]) -> Vec<String> {
        let mut agents = Vec::with_capacity(1 + players.len() + self.agents.len());
        agents.push(STORYTELLER_AGENT.to_string());
        agents.extend(players.iter().map(|p| p.id.clone()));
        agents.extend(
            self.agents
                .keys()
                .filter(|id| !players.iter().any(|p| &p.id == *id))
                .cloned(),
        );
        agents
    }

    pub fn display_name(agent: &str, players: &[Player]) -> String {
        if agent == STORYTELLER_AGENT {
            return "Storyteller".to_string();
        }
        match players.iter().find(|p| p.id == agent) {
            Some(player) => format!(
                "{} ({})",
                player.display_name(),
                player.role.as_deref().unwrap_or("Unknown")
            ),
            None => agent.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.storyteller.is_empty() && self.agents.values().all(DebugLogBucket::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(content: &str) -> Option<DebugEntry> {
        Some(DebugEntry::new(content))
    }

    fn contents(entries: &[DebugEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.content.as_str()).collect()
    }

    #[test]
    fn storyteller_prompt_then_response() {
        let mut log = DebugLog::new();
        assert!(log.record(STORYTELLER_AGENT, entry("X"), None));
        assert!(log.record(STORYTELLER_AGENT, None, entry("Y")));

        assert_eq!(contents(log.storyteller().prompts()), vec!["X"]);
        assert_eq!(contents(log.storyteller().responses()), vec!["Y"]);
        assert!(log.bucket("p1").is_none());
    }

    #[test]
    fn sequence_lengths_match_present_fragments() {
        let calls = [
            (Some("p0"), None),
            (None, Some("r0")),
            (Some("p1"), Some("r1")),
            (None, None),
            (Some("p2"), None),
            (None, None),
            (None, Some("r2")),
        ];

        let mut log = DebugLog::new();
        for (prompt, response) in calls {
            log.record("AIPlayer1", prompt.map(DebugEntry::new), response.map(DebugEntry::new));
        }

        let bucket = log.bucket("AIPlayer1").expect("bucket created");
        let expected_prompts: Vec<_> = calls.iter().filter_map(|(p, _)| *p).collect();
        let expected_responses: Vec<_> = calls.iter().filter_map(|(_, r)| *r).collect();
        assert_eq!(contents(bucket.prompts()), expected_prompts);
        assert_eq!(contents(bucket.responses()), expected_responses);
    }

    #[test]
    fn empty_record_is_a_noop() {
        let mut log = DebugLog::new();
        assert!(!log.record("AIPlayer9", None, None));
        assert!(log.bucket("AIPlayer9").is_none());
        assert!(log.is_empty());
    }

    #[test]
    fn buckets_are_isolated_per_agent() {
        let mut log = DebugLog::new();
        log.record("p1", entry("for p1"), None);
        log.record("p2", None, entry("from p2"));

        assert_eq!(contents(log.bucket("p1").expect("p1").prompts()), vec!["for p1"]);
        assert!(log.bucket("p1").expect("p1").responses().is_empty());
        assert!(log.bucket("p2").expect("p2").prompts().is_empty());
        assert!(log.storyteller().is_empty());
    }

    #[test]
    fn agents_list_storyteller_then_seats_then_debug_only() {
        let mut log = DebugLog::new();
        log.record("ghost", entry("?"), None);
        log.record("p2", entry("hi"), None);

        let players = vec![Player::new("p1", "Alice"), Player::new("p2", "Bob")];
        assert_eq!(
            log.agents(&players),
            vec!["storyteller", "p1", "p2", "ghost"]
        );
    }

    #[test]
    fn display_names() {
        let mut imp = Player::new("p1", "Alice");
        imp.role = Some("Imp".to_string());
        let players = vec![imp, Player::new("p2", "Bob")];

        assert_eq!(DebugLog::display_name(STORYTELLER_AGENT, &players), "Storyteller");
        assert_eq!(DebugLog::display_name("p1", &players), "Alice (Imp)");
        assert_eq!(DebugLog::display_name("p2", &players), "Bob (Unknown)");
        assert_eq!(DebugLog::display_name("p7", &players), "p7");
    }

    #[test]
    fn thoughts_interleave_by_position_and_search_ignores_case() {
        let mut log = DebugLog::new();
        log.record("p1", entry("Who is the Demon?"), None);
        log.record("p1", entry("Vote now?"), entry("I suspect Bob"));
        log.record("p1", None, entry("Yes"));

        let bucket = log.bucket("p1").expect("bucket");
        let timeline: Vec<_> = bucket
            .thoughts()
            .iter()
            .map(|t| (t.kind, t.entry.content.as_str()))
            .collect();
        assert_eq!(
            timeline,
            vec![
                (ThoughtKind::Prompt, "Who is the Demon?"),
                (ThoughtKind::Response, "I suspect Bob"),
                (ThoughtKind::Prompt, "Vote now?"),
                (ThoughtKind::Response, "Yes"),
            ]
        );

        let hits = bucket.search("demon");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, ThoughtKind::Prompt);
        assert_eq!(bucket.search("  ").len(), 4);
    }
}
