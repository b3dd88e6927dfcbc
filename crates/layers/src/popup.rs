use crate::event::Event;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupLine {
    pub label: &'static str,
    pub value: String,
}

/// Text content of a marker popup.
///
/// The popup's "view details" action is not part of the content: backends
/// route it to the marker's bound selection callback, the same one a marker
/// click invokes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupContent {
    pub title: String,
    pub lines: Vec<PopupLine>,
}

impl PopupContent {
    pub fn for_event(event: &Event) -> Self {
        let count = |v: Option<u32>| v.map_or_else(|| "Unknown".to_string(), |n| n.to_string());
        Self {
            title: format!("Event #{}", event.id),
            lines: vec![
                PopupLine {
                    label: "Time",
                    value: event.occurred_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                },
                PopupLine {
                    label: "Police Count",
                    value: count(event.police_count),
                },
                PopupLine {
                    label: "Arrested",
                    value: count(event.arrested_count),
                },
                PopupLine {
                    label: "Notes",
                    value: event
                        .notes
                        .as_deref()
                        .filter(|n| !n.trim().is_empty())
                        .unwrap_or("No notes")
                        .to_string(),
                },
            ],
        }
    }

    /// Adds (or replaces) the address line, placed right under the title.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        let line = PopupLine {
            label: "Address",
            value: address.into(),
        };
        match self.lines.iter_mut().find(|l| l.label == "Address") {
            Some(existing) => *existing = line,
            None => self.lines.insert(0, line),
        }
        self
    }

    pub fn line(&self, label: &str) -> Option<&str> {
        self.lines
            .iter()
            .find(|l| l.label == label)
            .map(|l| l.value.as_str())
    }

    /// Plain-text rendering for backends without rich popups.
    pub fn to_plain_text(&self) -> String {
        let mut out = self.title.clone();
        for l in &self.lines {
            out.push('\n');
            out.push_str(l.label);
            out.push_str(": ");
            out.push_str(&l.value);
        }
        out
    }
}
