use tubewire_channel::{Channel, GetOptions};

use crate::cmd::{parse_duration, GetArgs};
use crate::exit::{channel_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: GetArgs, format: OutputFormat) -> CliResult<i32> {
    let options = if args.block {
        GetOptions::blocking()
    } else {
        GetOptions::timeout(parse_duration(&args.timeout)?)
    };
    let mut channel = args.target.open()?;
    let message = channel
        .get(options)
        .map_err(|err| channel_error("get failed", err))?;
    print_message(channel.url(), channel.tube(), &message, format);
    Ok(SUCCESS)
}
