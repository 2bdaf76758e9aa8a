//! Trac's ticket, search and system methods.
//!
//! Each wrapper only checks its required arguments and shapes the parameter
//! list; sending, batching and result lookup all go through
//! [`Client::call`]. Outside batch mode they return [`Reply::Done`], inside
//! it [`Reply::Queued`] with the id to read the result back by.

use bytes::Bytes;
use chrono::Utc;
use indexmap::IndexMap;
use std::path::Path;
use tracrpc_core::{CoreError, Value};
use tracrpc_transport::Transport;

use crate::client::{Client, ClientError, Reply};

/// Ticket fields for `ticket.create`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTicket {
    pub summary: String,
    pub description: String,
    pub attributes: IndexMap<String, Value>,
    pub notify: bool,
}

/// Changes for `ticket.update`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketUpdate {
    pub comment: String,
    pub attributes: IndexMap<String, Value>,
    pub notify: bool,
}

/// The ticket enumerations Trac manages under `ticket.<kind>.*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumKind {
    Component,
    Milestone,
    Priority,
    Resolution,
    Severity,
    Type,
    Version,
}

impl EnumKind {
    pub fn namespace(&self) -> &'static str {
        match self {
            EnumKind::Component => "ticket.component",
            EnumKind::Milestone => "ticket.milestone",
            EnumKind::Priority => "ticket.priority",
            EnumKind::Resolution => "ticket.resolution",
            EnumKind::Severity => "ticket.severity",
            EnumKind::Type => "ticket.type",
            EnumKind::Version => "ticket.version",
        }
    }
}

/// What to do with an enumeration. `attributes` is a struct for
/// components, milestones and versions and a plain string for the rest.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumAction {
    GetAll,
    Get(String),
    Delete(String),
    Create { name: String, attributes: Value },
    Update { name: String, attributes: Value },
}

fn require(value: &str, what: &str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        return Err(CoreError::invalid_call(format!("{} is empty", what)).into());
    }
    Ok(())
}

fn require_ticket(id: u64) -> Result<(), ClientError> {
    if id == 0 {
        return Err(CoreError::invalid_call("ticket id is 0").into());
    }
    Ok(())
}

/// Midnight UTC of the current day, in epoch seconds.
fn start_of_today() -> i64 {
    let now = Utc::now().timestamp();
    now - now.rem_euclid(86_400)
}

impl<T: Transport> Client<T> {
    /// `ticket.getRecentChanges`: tickets changed since `since` (epoch
    /// seconds), or since midnight UTC today.
    pub async fn recent_changes(&mut self, since: Option<i64>) -> Result<Reply, ClientError> {
        let since = since.unwrap_or_else(start_of_today);
        self.call("ticket.getRecentChanges", vec![Value::DateTime(since)])
            .await
    }

    pub async fn ticket(&mut self, id: u64) -> Result<Reply, ClientError> {
        require_ticket(id)?;
        self.call("ticket.get", vec![Value::from(id)]).await
    }

    /// `ticket.changeLog`; `when` of 0 means every change.
    pub async fn ticket_changelog(&mut self, id: u64, when: i64) -> Result<Reply, ClientError> {
        require_ticket(id)?;
        self.call("ticket.changeLog", vec![Value::from(id), Value::from(when)])
            .await
    }

    pub async fn ticket_actions(&mut self, id: u64) -> Result<Reply, ClientError> {
        require_ticket(id)?;
        self.call("ticket.getActions", vec![Value::from(id)]).await
    }

    pub async fn attachments(&mut self, id: u64) -> Result<Reply, ClientError> {
        require_ticket(id)?;
        self.call("ticket.listAttachments", vec![Value::from(id)])
            .await
    }

    pub async fn attachment(&mut self, id: u64, filename: &str) -> Result<Reply, ClientError> {
        require_ticket(id)?;
        require(filename, "attachment name")?;
        self.call(
            "ticket.getAttachment",
            vec![Value::from(id), Value::from(filename)],
        )
        .await
    }

    pub async fn delete_attachment(
        &mut self,
        id: u64,
        filename: &str,
    ) -> Result<Reply, ClientError> {
        require_ticket(id)?;
        require(filename, "attachment name")?;
        self.call(
            "ticket.deleteAttachment",
            vec![Value::from(id), Value::from(filename)],
        )
        .await
    }

    /// `ticket.putAttachment` with the content sent as a binary tagged value.
    pub async fn put_attachment(
        &mut self,
        id: u64,
        filename: &str,
        description: &str,
        data: Bytes,
        replace: bool,
    ) -> Result<Reply, ClientError> {
        require_ticket(id)?;
        require(filename, "attachment name")?;
        self.call(
            "ticket.putAttachment",
            vec![
                Value::from(id),
                Value::from(filename),
                Value::from(description),
                Value::Binary(data),
                Value::from(replace),
            ],
        )
        .await
    }

    /// Reads `path` and attaches it under its file name.
    pub async fn put_attachment_file(
        &mut self,
        id: u64,
        path: &Path,
        description: &str,
        replace: bool,
    ) -> Result<Reply, ClientError> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| CoreError::invalid_call(format!("{} has no file name", path.display())))?
            .to_string();
        let data = tokio::fs::read(path).await.map_err(|e| {
            CoreError::invalid_call(format!("cannot read {}: {}", path.display(), e))
        })?;

        self.put_attachment(id, &filename, description, Bytes::from(data), replace)
            .await
    }

    pub async fn create_ticket(&mut self, ticket: NewTicket) -> Result<Reply, ClientError> {
        self.call(
            "ticket.create",
            vec![
                Value::from(ticket.summary),
                Value::from(ticket.description),
                Value::Object(ticket.attributes),
                Value::from(ticket.notify),
            ],
        )
        .await
    }

    pub async fn update_ticket(
        &mut self,
        id: u64,
        update: TicketUpdate,
    ) -> Result<Reply, ClientError> {
        require_ticket(id)?;
        self.call(
            "ticket.update",
            vec![
                Value::from(id),
                Value::from(update.comment),
                Value::Object(update.attributes),
                Value::from(update.notify),
            ],
        )
        .await
    }

    pub async fn delete_ticket(&mut self, id: u64) -> Result<Reply, ClientError> {
        require_ticket(id)?;
        self.call("ticket.delete", vec![Value::from(id)]).await
    }

    /// `ticket.query` with a Trac query string such as `status!=closed`.
    pub async fn query_tickets(&mut self, query: &str) -> Result<Reply, ClientError> {
        require(query, "query")?;
        self.call("ticket.query", vec![Value::from(query)]).await
    }

    pub async fn ticket_enum(
        &mut self,
        kind: EnumKind,
        action: EnumAction,
    ) -> Result<Reply, ClientError> {
        let ns = kind.namespace();
        let (method, params) = match action {
            EnumAction::GetAll => (format!("{}.getAll", ns), vec![]),
            EnumAction::Get(name) => {
                require(&name, "name")?;
                (format!("{}.get", ns), vec![Value::from(name)])
            }
            EnumAction::Delete(name) => {
                require(&name, "name")?;
                (format!("{}.delete", ns), vec![Value::from(name)])
            }
            EnumAction::Create { name, attributes } => {
                require(&name, "name")?;
                (format!("{}.create", ns), vec![Value::from(name), attributes])
            }
            EnumAction::Update { name, attributes } => {
                require(&name, "name")?;
                (format!("{}.update", ns), vec![Value::from(name), attributes])
            }
        };
        self.call(&method, params).await
    }

    pub async fn ticket_statuses(&mut self) -> Result<Reply, ClientError> {
        self.call("ticket.status.getAll", vec![]).await
    }

    /// `search.performSearch`; an empty filter list searches everything.
    pub async fn search(&mut self, query: &str, filters: &[&str]) -> Result<Reply, ClientError> {
        require(query, "query")?;
        let mut params = vec![Value::from(query)];
        if !filters.is_empty() {
            params.push(Value::Array(filters.iter().map(|f| Value::from(*f)).collect()));
        }
        self.call("search.performSearch", params).await
    }

    pub async fn search_filters(&mut self) -> Result<Reply, ClientError> {
        self.call("search.getSearchFilters", vec![]).await
    }

    pub async fn api_version(&mut self) -> Result<Reply, ClientError> {
        self.call("system.getAPIVersion", vec![]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_namespaces() {
        assert_eq!(EnumKind::Component.namespace(), "ticket.component");
        assert_eq!(EnumKind::Type.namespace(), "ticket.type");
        assert_eq!(EnumKind::Version.namespace(), "ticket.version");
    }

    #[test]
    fn test_start_of_today_is_midnight() {
        let midnight = start_of_today();
        assert_eq!(midnight % 86_400, 0);
        assert!(Utc::now().timestamp() - midnight < 86_400);
    }

    #[test]
    fn test_require() {
        assert!(require("x", "name").is_ok());
        assert!(matches!(
            require("  ", "name"),
            Err(ClientError::Core(CoreError::InvalidCall(_)))
        ));
        assert!(require_ticket(0).is_err());
        assert!(require_ticket(1).is_ok());
    }
}
