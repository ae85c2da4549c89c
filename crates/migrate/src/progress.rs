use std::{
    future::Future,
    io::{self, Write},
    sync::Mutex,
    time::Duration,
};

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::fmt::MakeWriter;

/// Spinner currently drawn on stderr, if any
static ACTIVE: Mutex<Option<ProgressBar>> = Mutex::new(None);

fn active_spinner() -> Option<ProgressBar> {
    ACTIVE.lock().ok().and_then(|active| active.clone())
}

fn set_active(spinner: Option<ProgressBar>) {
    if let Ok(mut active) = ACTIVE.lock() {
        *active = spinner;
    }
}

/// Show a spinner on stderr while `work` runs
pub async fn with_spinner<T>(message: &str, work: impl Future<Output = T>) -> T {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    set_active(Some(spinner.clone()));

    let result = work.await;

    set_active(None);
    spinner.finish_and_clear();
    result
}

/// Log destination that hides the active spinner while a line is written,
/// so log lines and the spinner never share a terminal row
#[derive(Debug, Clone, Copy, Default)]
pub struct LogWriter;

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = Suspended<io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        Suspended(io::stderr())
    }
}

pub struct Suspended<W>(W);

impl<W: Write> Write for Suspended<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match active_spinner() {
            Some(spinner) => spinner.suspend(|| self.0.write(buf)),
            None => self.0.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_lines_pass_through_while_spinner_runs() {
        let (registered, written) = with_spinner("Copying", async {
            let mut writer = Suspended(Vec::new());
            writer.write_all(b"INFO copied users\n").unwrap();
            (active_spinner().is_some(), writer.0)
        })
        .await;

        assert!(registered);
        assert_eq!(written, b"INFO copied users\n");
        assert!(active_spinner().is_none());
    }
}
