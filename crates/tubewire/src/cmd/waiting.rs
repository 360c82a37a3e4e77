use tubewire_channel::Channel;

use crate::cmd::WaitingArgs;
use crate::exit::{channel_error, CliResult, SUCCESS};
use crate::output::{print_waiting, OutputFormat};

pub fn run(args: WaitingArgs, format: OutputFormat) -> CliResult<i32> {
    let mut channel = args.target.open()?;
    let waiting = channel
        .is_waiting()
        .map_err(|err| channel_error("waiting check failed", err))?;
    print_waiting(channel.url(), channel.tube(), waiting, format);
    Ok(SUCCESS)
}
