use std::fs;

use tubewire_channel::{Channel, Message};

use crate::cmd::PutArgs;
use crate::exit::{channel_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_put, OutputFormat};

pub fn run(args: PutArgs, format: OutputFormat) -> CliResult<i32> {
    let message = resolve_message(&args)?;
    let mut channel = args.target.open()?;
    channel
        .put(&message)
        .map_err(|err| channel_error("put failed", err))?;
    print_put(channel.url(), channel.tube(), format);
    Ok(SUCCESS)
}

fn resolve_message(args: &PutArgs) -> CliResult<Message> {
    if let Some(json) = &args.json {
        let value = serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(Message::from(value));
    }
    if let Some(data) = &args.data {
        return Ok(Message::from(data.as_str()));
    }
    if let Some(path) = &args.file {
        let data = fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        return Ok(Message::bytes(data));
    }
    Err(CliError::new(USAGE, "one of --json, --data or --file is required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::TubeArgs;

    fn args(json: Option<&str>, data: Option<&str>) -> PutArgs {
        PutArgs {
            target: TubeArgs {
                url: "memory://put-test".into(),
                tube: "q".into(),
            },
            json: json.map(str::to_string),
            data: data.map(str::to_string),
            file: None,
        }
    }

    #[test]
    fn json_payload_becomes_structured_message() {
        let message = resolve_message(&args(Some(r#"{"n":1}"#), None)).unwrap();
        assert_eq!(message.get("n"), Some(&Message::Int(1)));
    }

    #[test]
    fn invalid_json_is_a_usage_error() {
        let err = resolve_message(&args(Some("{"), None)).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn missing_payload_is_a_usage_error() {
        assert_eq!(resolve_message(&args(None, None)).unwrap_err().code, USAGE);
    }

    #[test]
    fn put_lands_on_the_tube() {
        let mut reader = args(None, None).target.open().unwrap();
        run(args(None, Some("hello")), OutputFormat::Raw).unwrap();
        assert_eq!(
            reader
                .get(tubewire_channel::GetOptions::timeout(std::time::Duration::ZERO))
                .unwrap(),
            Message::from("hello")
        );
    }
}
