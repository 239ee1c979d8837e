// Outbound webhook delivery. Fire-and-forget from the importer's point of
// view: failures are logged and never affect tagging.

use crate::config::NotifierConfig;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscordWebhookMessage {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscordEmbed {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Color code of the embed
    #[serde(skip_serializing_if = "is_zero")]
    pub color: u32,
    /// Max of 25 fields
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<DiscordEmbedField>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscordEmbedField {
    pub name: String,
    pub value: String,
    /// Whether the field should be displayed inline
    pub inline: bool,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// Registry of configured notifier sinks, addressed by name
pub struct Notifications {
    notifiers: Vec<NotifierConfig>,
    client: Client,
}

impl Notifications {
    pub fn new(notifiers: Vec<NotifierConfig>) -> Self {
        Notifications {
            notifiers,
            client: Client::new(),
        }
    }

    fn find_notifier(&self, name: &str) -> Option<&NotifierConfig> {
        self.notifiers.iter().find(|notifier| notifier.name == name)
    }

    /// Deliver a message to a named notifier. Best-effort: unknown names,
    /// unknown sink types, and delivery failures are logged and swallowed.
    pub async fn send(&self, name: &str, message: &DiscordWebhookMessage) {
        if name.is_empty() {
            return;
        }

        let Some(notifier) = self.find_notifier(name) else {
            error!(name = %name, "Notifier not found");
            return;
        };

        match notifier.kind.as_str() {
            "discord" => self.send_discord(notifier, message).await,
            other => {
                error!(name = %name, kind = %other, "Unknown notifier type");
            }
        }
    }

    async fn send_discord(&self, notifier: &NotifierConfig, message: &DiscordWebhookMessage) {
        let result = self.client.post(&notifier.url).json(message).send().await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!(name = %notifier.name, "Sent Discord notification");
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                error!(
                    name = %notifier.name,
                    status = %status,
                    body = %body,
                    "Discord webhook rejected notification"
                );
            }
            Err(err) => {
                error!(name = %notifier.name, error = %err, "Failed to send Discord notification");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serializes_without_empty_fields() {
        let message = DiscordWebhookMessage {
            username: "shelfwright".to_string(),
            embeds: vec![DiscordEmbed {
                title: "New Audiobook Imported".to_string(),
                color: 0x00FF00,
                fields: vec![DiscordEmbedField {
                    name: "Author(s)".to_string(),
                    value: "Alice".to_string(),
                    inline: false,
                }],
                ..Default::default()
            }],
            ..Default::default()
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["username"], "shelfwright");
        assert!(json.get("content").is_none());
        assert_eq!(json["embeds"][0]["title"], "New Audiobook Imported");
        assert!(json["embeds"][0].get("description").is_none());
        assert_eq!(json["embeds"][0]["fields"][0]["inline"], false);
    }

    #[tokio::test]
    async fn unknown_notifier_is_ignored() {
        let notifications = Notifications::new(vec![]);
        // Must not panic or error; delivery is best-effort
        notifications
            .send("missing", &DiscordWebhookMessage::default())
            .await;
    }
}
