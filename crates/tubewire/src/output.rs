use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::{json, Value};
use tubewire_channel::{Channel, Message};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    event: &'static str,
    url: &'a str,
    tube: &'a str,
    message: Value,
    timestamp: String,
}

#[derive(Serialize)]
struct StatusOutput<'a> {
    event: &'static str,
    url: &'a str,
    tube: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    waiting: Option<bool>,
    timestamp: String,
}

pub fn print_message(url: &str, tube: &str, message: &Message, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                event: "message",
                url,
                tube,
                message: message_json(message),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["URL", "TUBE", "TYPE", "MESSAGE"])
                .add_row(vec![
                    url.to_string(),
                    tube.to_string(),
                    message_type(message).to_string(),
                    message_preview(message),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "url={url} tube={tube} type={} message={}",
                message_type(message),
                message_preview(message)
            );
        }
        OutputFormat::Raw => match message {
            Message::Str(text) => print_raw(text.as_bytes()),
            Message::Bytes(data) => print_raw(data),
            other => println!("{}", message_json(other)),
        },
    }
}

pub fn print_put(url: &str, tube: &str, format: OutputFormat) {
    print_status("put", url, tube, None, format);
}

pub fn print_waiting(url: &str, tube: &str, waiting: bool, format: OutputFormat) {
    print_status("waiting", url, tube, Some(waiting), format);
}

fn print_status(
    event: &'static str,
    url: &str,
    tube: &str,
    waiting: Option<bool>,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = StatusOutput {
                event,
                url,
                tube,
                waiting,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut header = vec!["EVENT", "URL", "TUBE"];
            let mut row = vec![event.to_string(), url.to_string(), tube.to_string()];
            if let Some(waiting) = waiting {
                header.push("WAITING");
                row.push(waiting.to_string());
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(header)
                .add_row(row);
            println!("{table}");
        }
        OutputFormat::Pretty => match waiting {
            Some(waiting) => println!("{event} url={url} tube={tube} waiting={waiting}"),
            None => println!("{event} url={url} tube={tube}"),
        },
        OutputFormat::Raw => {
            if let Some(waiting) = waiting {
                println!("{waiting}");
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// JSON view of a message for display. Channels show as their identifier.
pub fn message_json(message: &Message) -> Value {
    match message {
        Message::List(items) => Value::Array(items.iter().map(message_json).collect()),
        Message::Map(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), message_json(v)))
                .collect(),
        ),
        Message::Channel(channel) => match channel.identifier() {
            Ok(id) => json!({ "channel": id }),
            Err(_) => json!({ "channel": channel.kind() }),
        },
        other => other.to_json().unwrap_or(Value::Null),
    }
}

fn message_type(message: &Message) -> &'static str {
    match message {
        Message::Null => "null",
        Message::Bool(_) => "bool",
        Message::Int(_) => "int",
        Message::Float(_) => "float",
        Message::Str(_) => "str",
        Message::Bytes(_) => "bytes",
        Message::List(_) => "list",
        Message::Map(_) => "map",
        Message::Channel(_) => "channel",
    }
}

fn message_preview(message: &Message) -> String {
    match message {
        Message::Str(text) => text.clone(),
        Message::Bytes(data) => match std::str::from_utf8(data) {
            Ok(text) => text.to_string(),
            Err(_) => format!("<binary {} bytes>", data.len()),
        },
        other => message_json(other).to_string(),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use tubewire_channel::Identifier;

    use super::*;

    #[test]
    fn channels_render_as_identifiers() {
        let url = "memory://output-test";
        let channel = tubewire_channel::beanstalk(url, Some("replies")).unwrap();
        let message = Message::map([("reply_to", Message::from(channel))]);
        let expected = serde_json::to_value(Identifier::beanstalk(url, "replies")).unwrap();
        assert_eq!(message_json(&message)["reply_to"]["channel"], expected);
    }

    #[test]
    fn previews() {
        assert_eq!(message_preview(&Message::from("hi")), "hi");
        assert_eq!(message_preview(&Message::bytes(vec![0xff])), "<binary 1 bytes>");
        assert_eq!(message_preview(&Message::Int(3)), "3");
        assert_eq!(message_type(&Message::Null), "null");
    }
}
