use std::process::{Command as StdCommand, Stdio};
use std::thread;

/// Boundary to the haptic collaborator. Invoked with a single success
/// signal on each acquired lock; nothing else.
pub trait HapticNotifier: Send + Sync {
    fn notify_lock(&self);
}

/// Default notifier for headless deployments: the lock only shows up in
/// the journal.
pub struct LogNotifier;

impl HapticNotifier for LogNotifier {
    fn notify_lock(&self) {
        log::info!("lock feedback: success");
    }
}

/// Runs a configured shell hook once per acquired lock, e.g. driving a
/// buzzer or piezo from a helper script. Fire and forget: the session
/// never waits on the hook.
pub struct CommandNotifier {
    command: String,
}

impl CommandNotifier {
    pub fn new(command: String) -> Self {
        Self { command }
    }
}

impl HapticNotifier for CommandNotifier {
    fn notify_lock(&self) {
        log::info!("executing lock feedback hook: {}", self.command);

        match StdCommand::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(mut child) => {
                // Reap the child off the session thread.
                thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(e) => log::error!("failed to spawn lock feedback hook: {}", e),
        }
    }
}
