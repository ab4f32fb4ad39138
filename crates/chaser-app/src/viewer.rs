//! Text viewer peer: prints what the engine publishes.

use chaser_engine::{RenderFrame, Status, TerminationSignal};
use crossbeam_channel::{select, Receiver};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One line per published frame.
pub fn format_render(frame: &RenderFrame) -> String {
    let last = frame.frame_count.saturating_sub(1);
    format!(
        "[{}/{}] {}",
        frame.record.frame_index,
        last,
        frame.record.summary()
    )
}

/// One line per status message.
pub fn format_status(status: &Status) -> String {
    match status {
        Status::FramePosition(s) => format!("frame  {s}"),
        Status::Progress(s) => format!("       {s}"),
        Status::Marked(s) => format!("       {s}"),
        Status::Notice(s) => format!("notice {s}"),
    }
}

/// Print render frames and status messages until the engine shuts down and
/// both queues are drained.
pub fn run(
    render: Receiver<RenderFrame>,
    status: Receiver<Status>,
    termination: TerminationSignal,
) {
    loop {
        select! {
            recv(render) -> msg => match msg {
                Ok(frame) => println!("{}", format_render(&frame)),
                Err(_) => break,
            },
            recv(status) -> msg => match msg {
                Ok(status) => println!("{}", format_status(&status)),
                Err(_) => break,
            },
            default(POLL_INTERVAL) => {
                if termination.is_triggered() && render.is_empty() && status.is_empty() {
                    break;
                }
            }
        }
    }
    debug!("Viewer stopped");
}

/// Run the viewer on a thread named `viewer`.
pub fn spawn(
    render: Receiver<RenderFrame>,
    status: Receiver<Status>,
    termination: TerminationSignal,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("viewer".into())
        .spawn(move || run(render, status, termination))
}
