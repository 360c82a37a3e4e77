//! Request/reply over tubes, with the reply channel sent inside the request.
//!
//! Runs against the in-process broker by default; pass a daemon address
//! (e.g. `localhost:11300`) to use a real beanstalkd.

use std::thread;
use std::time::Duration;

use tubewire::{beanstalk, Channel, ChannelError, GetOptions, Message};

fn main() -> Result<(), ChannelError> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "memory://reply-to-example".to_string());

    let mut requests = beanstalk(&url, Some("requests"))?;
    let worker_url = url.clone();
    let worker = thread::spawn(move || -> Result<(), ChannelError> {
        let mut inbox = beanstalk(&worker_url, Some("requests"))?;
        let mut request = inbox.get(GetOptions::timeout(Duration::from_secs(5)))?;
        let question = request
            .get("question")
            .and_then(Message::as_str)
            .unwrap_or_default()
            .to_uppercase();
        if let Some(mut reply_to) = request.take("reply_to").and_then(Message::into_channel) {
            reply_to.put(&Message::from(question))?;
        }
        Ok(())
    });

    // An anonymous tube nobody else writes to.
    let replies = beanstalk(&url, None)?;
    let mut my_replies = replies.clone();
    requests.put(&Message::map([
        ("question", Message::from("hello there")),
        ("reply_to", Message::from(replies)),
    ]))?;

    let answer = my_replies.get(GetOptions::timeout(Duration::from_secs(5)))?;
    println!("reply on {}: {:?}", my_replies.tube(), answer);

    worker.join().expect("worker panicked")?;
    Ok(())
}
