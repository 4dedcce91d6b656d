//! Role inference over segmented turns. The heuristic is a pluggable
//! policy so deployments with known channel mappings can swap it out.

use serde::{Deserialize, Serialize};

use super::turns::Turn;

/// Aggregate for one conversational role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleStats {
    /// Speaker labels folded into this role.
    pub labels: Vec<String>,
    pub turn_count: usize,
    pub total_duration: f64,
}

/// Salesperson/customer split of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSplit {
    pub salesperson: RoleStats,
    pub customer: RoleStats,
}

/// Maps speaker labels to conversational roles. Returning `None` means no
/// confident mapping exists and speakers are reported individually.
pub trait RolePolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn assign(&self, turns: &[Turn]) -> Option<RoleSplit>;
}

/// Default heuristic for outbound sales calls: whoever opens the call is
/// the salesperson. Only meaningful for two-party conversations.
pub struct FirstSpeakerPolicy;

impl RolePolicy for FirstSpeakerPolicy {
    fn name(&self) -> &'static str {
        "first-speaker"
    }

    fn assign(&self, turns: &[Turn]) -> Option<RoleSplit> {
        let mut labels: Vec<&str> = Vec::new();
        for turn in turns {
            if !labels.contains(&turn.speaker.as_str()) {
                labels.push(&turn.speaker);
            }
        }
        if labels.len() != 2 {
            return None;
        }

        let salesperson_label = labels[0];
        let customer_label = labels[1];

        let mut salesperson = RoleStats {
            labels: vec![salesperson_label.to_string()],
            ..RoleStats::default()
        };
        let mut customer = RoleStats {
            labels: vec![customer_label.to_string()],
            ..RoleStats::default()
        };

        for turn in turns {
            let stats = if turn.speaker == salesperson_label {
                &mut salesperson
            } else {
                &mut customer
            };
            stats.turn_count += 1;
            stats.total_duration += turn.duration();
        }

        Some(RoleSplit {
            salesperson,
            customer,
        })
    }
}
