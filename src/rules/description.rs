// src/rules/description.rs
use indexmap::IndexMap;

use super::DESCRIPTION_GROUP;

/// How a matched line is rendered into its description column, and whether
/// matches of the owning access type belong on the merged timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionHandler {
    /// The captured description as logged
    Verbatim { timeline: bool },
    /// `<actor>: <description>`, e.g. `sshd[1234]: Accepted keyboard-interactive/pam for root`
    Attributed { actor: &'static str, timeline: bool },
    /// `<tag> <description>`, e.g. `[esx.audit.ssh.enabled] SSH access has been enabled.`
    Tagged { tag: &'static str, timeline: bool },
}

impl DescriptionHandler {
    pub fn include_in_timeline(&self) -> bool {
        match *self {
            DescriptionHandler::Verbatim { timeline }
            | DescriptionHandler::Attributed { timeline, .. }
            | DescriptionHandler::Tagged { timeline, .. } => timeline,
        }
    }

    /// Capture group this handler reads besides the description
    pub fn extra_group(&self) -> Option<&'static str> {
        match *self {
            DescriptionHandler::Verbatim { .. } => None,
            DescriptionHandler::Attributed { actor, .. } => Some(actor),
            DescriptionHandler::Tagged { tag, .. } => Some(tag),
        }
    }

    pub fn format(&self, fields: &IndexMap<String, String>) -> String {
        let description = field(fields, DESCRIPTION_GROUP);

        let prefix = match self.extra_group() {
            Some(group) => field(fields, group),
            None => "",
        };
        if prefix.is_empty() {
            return description.to_string();
        }

        match self {
            DescriptionHandler::Attributed { .. } => format!("{}: {}", prefix, description),
            _ => format!("{} {}", prefix, description),
        }
    }
}

fn field<'a>(fields: &'a IndexMap<String, String>, name: &str) -> &'a str {
    fields.get(name).map(|s| s.trim()).unwrap_or("")
}
