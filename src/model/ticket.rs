use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ticket row returned by the legacy listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub status: String,
    #[serde(default)]
    pub priority: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Validates one backend row; the error names the row index.
    pub fn from_row(index: usize, row: Value) -> Result<Self, String> {
        serde_json::from_value(row).map_err(|err| format!("Invalid ticket at index {}: {}", index, err))
    }

    pub fn from_rows(rows: Vec<Value>) -> Result<Vec<Self>, String> {
        rows.into_iter()
            .enumerate()
            .map(|(index, row)| Self::from_row(index, row))
            .collect()
    }
}

fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

/// Fixed listing served when mock data is enabled.
pub fn sample_tickets() -> Vec<Ticket> {
    vec![
        Ticket {
            id: "1".to_string(),
            title: "Printer not working".to_string(),
            status: "Open".to_string(),
            priority: Some("High".to_string()),
            created_at: at(2024, 1, 15, 10, 0),
            updated_at: at(2024, 1, 15, 14, 30),
        },
        Ticket {
            id: "2".to_string(),
            title: "Email issues".to_string(),
            status: "In Progress".to_string(),
            priority: Some("Medium".to_string()),
            created_at: at(2024, 1, 14, 9, 0),
            updated_at: at(2024, 1, 15, 11, 0),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_row_without_priority() {
        let ticket = Ticket::from_row(
            0,
            json!({
                "id": "7",
                "title": "VPN down",
                "status": "Open",
                "created_at": "2024-02-01T08:00:00Z",
                "updated_at": "2024-02-01T09:00:00+00:00"
            }),
        )
        .unwrap();
        assert!(ticket.priority.is_none());
        assert_eq!(ticket.created_at.to_rfc3339(), "2024-02-01T08:00:00+00:00");
    }

    #[test]
    fn rejects_row_missing_timestamps() {
        let err = Ticket::from_rows(vec![
            json!({"id": "1", "title": "a", "status": "Open", "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z"}),
            json!({"id": "2", "title": "b", "status": "Open"}),
        ])
        .unwrap_err();
        assert!(err.starts_with("Invalid ticket at index 1"));
    }

    #[test]
    fn sample_tickets_are_stable() {
        let tickets = sample_tickets();
        assert_eq!(tickets.len(), 2);
        assert_eq!(tickets[0].updated_at.to_rfc3339(), "2024-01-15T14:30:00+00:00");
        assert_eq!(tickets[1].status, "In Progress");
    }
}
