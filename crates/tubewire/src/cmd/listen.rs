use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use tubewire_channel::{Channel, ChannelError, GetOptions};

use crate::cmd::ListenArgs;
use crate::exit::{channel_error, CliError, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

/// How often the loop wakes up to notice Ctrl-C. Whole seconds, so a TCP
/// daemon waits server-side instead of being polled.
const POLL: Duration = Duration::from_secs(1);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let mut channel = args.target.open()?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let message = match channel.get(GetOptions::timeout(POLL)) {
            Ok(message) => message,
            Err(ChannelError::Timeout { .. }) => continue,
            Err(err) => return Err(channel_error("receive failed", err)),
        };

        print_message(channel.url(), channel.tube(), &message, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    debug!(printed, "listen finished");
    let _ = channel.close();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
