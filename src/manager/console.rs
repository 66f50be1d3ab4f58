//! Interactive session loop.
//!
//! ## Phases
//!
//! ```text
//! Starting ──start ok──▶ Running ◀──────────────┐
//!    │                     │  remove <name>      │ answer
//!    │ start failed        ▼                     │
//!    │              AwaitingConfirmation ────────┘
//!    │                     │ quit / end of input
//!    ▼                     ▼
//! Terminated ◀──────── Stopping
//! ```
//!
//! Only a failed start, or an output sink that stops accepting writes, ends
//! the session with an error. Everything else that goes wrong while running
//! is printed as one line and the prompt returns.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::command::{Command, usage};
use super::confirm::{Answer, PendingRemoval};
use super::error::{ManagerError, Result};
use super::transport::Transport;
use super::validate::KeyName;

pub const PROMPT: &str = "ssh-key-manager> ";

const BANNER: &str = "SSH Key Manager";

const HELP: &[&str] = &[
    "Available commands:",
    "  help, h           - Show this help message",
    "  list, ls          - List all SSH keys",
    "  add <name>        - Generate a new SSH key pair",
    "  remove <name>     - Remove an SSH key pair",
    "  show <name>       - Show details of a specific key",
    "  test              - Test SSH connection",
    "  quit, exit, q     - Exit the program",
];

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Running,
    /// A removal was requested; the next line is its answer.
    AwaitingConfirmation(PendingRemoval),
    Stopping,
    Terminated,
}

/// Line-oriented console that owns one transport for its whole run.
pub struct Console<T, R, W> {
    transport: T,
    input: Lines<R>,
    output: W,
    phase: Phase,
    shutdown: CancellationToken,
}

impl<T, R, W> Console<T, R, W>
where
    T: Transport,
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(transport: T, input: R, output: W) -> Self {
        Self {
            transport,
            input: input.lines(),
            output,
            phase: Phase::Starting,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Give back the transport and the output sink.
    pub fn into_parts(self) -> (T, W) {
        (self.transport, self.output)
    }

    /// Run the session until quit or end of input.
    ///
    /// Returns [`ManagerError::Startup`] if the transport could not be
    /// started; in that case no prompt is ever written. Once started, the
    /// transport is stopped on every exit path, including output failures.
    pub async fn run(&mut self) -> Result<()> {
        self.start().await?;

        let served = self.serve().await;
        if let Err(e) = &served {
            error!("Console session aborted: {}", e);
        }
        let stopped = self.stop().await;
        served.and(stopped)
    }

    async fn serve(&mut self) -> Result<()> {
        self.say(BANNER).await?;
        self.say("=".repeat(BANNER.len())).await?;
        self.say("Type 'help' for available commands.").await?;

        while !matches!(self.phase, Phase::Stopping | Phase::Terminated) {
            if self.phase == Phase::Running {
                self.write(PROMPT).await?;
            }

            let Some(line) = self.read_line().await else {
                return self.end_of_input().await;
            };

            match std::mem::replace(&mut self.phase, Phase::Running) {
                Phase::AwaitingConfirmation(pending) => {
                    self.confirm(pending, Answer::parse(&line)).await?
                }
                _ => self.dispatch(Command::parse(&line)).await?,
            }
        }
        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        debug!("Starting {} transport", self.transport.name());

        if let Err(e) = self.transport.start(self.shutdown.child_token()).await {
            let err = if e.is_fatal() {
                e
            } else {
                ManagerError::Startup(e.to_string())
            };
            error!("Transport start failed: {}", err);

            // Release whatever a partial start acquired.
            if let Err(stop_err) = self.transport.stop().await {
                warn!("Transport stop after failed start: {}", stop_err);
            }
            self.shutdown.cancel();
            self.phase = Phase::Terminated;
            return Err(err);
        }

        self.phase = Phase::Running;
        info!("{} transport started", self.transport.name());
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if self.phase == Phase::Terminated {
            return Ok(());
        }
        self.phase = Phase::Stopping;
        self.shutdown.cancel();

        if let Err(e) = self.transport.stop().await {
            warn!("Error stopping {} transport: {}", self.transport.name(), e);
        }

        self.phase = Phase::Terminated;
        self.say("Goodbye!").await
    }

    async fn read_line(&mut self) -> Option<String> {
        match self.input.next_line().await {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read input, ending session: {}", e);
                None
            }
        }
    }

    async fn end_of_input(&mut self) -> Result<()> {
        debug!("End of input");
        // Finish the prompt line before the closing messages.
        self.say("").await?;
        if matches!(self.phase, Phase::AwaitingConfirmation(_)) {
            self.say("Operation cancelled.").await?;
        }
        self.phase = Phase::Stopping;
        Ok(())
    }

    async fn dispatch(&mut self, command: Command) -> Result<()> {
        debug!("Dispatching {:?}", command);
        let verb = command.verb();

        match command {
            Command::Empty => Ok(()),
            Command::Help => {
                for line in HELP {
                    self.say(line).await?;
                }
                Ok(())
            }
            Command::List => self.list().await,
            Command::Add(arg) => match self.key_argument(verb, arg).await? {
                Some(name) => self.add(name).await,
                None => Ok(()),
            },
            Command::Remove(arg) => {
                if let Some(name) = self.key_argument(verb, arg).await? {
                    let pending = PendingRemoval::new(name);
                    self.write(&pending.prompt()).await?;
                    self.phase = Phase::AwaitingConfirmation(pending);
                }
                Ok(())
            }
            Command::Show(arg) => match self.key_argument(verb, arg).await? {
                Some(name) => self.show(name).await,
                None => Ok(()),
            },
            Command::Test => self.test().await,
            Command::Quit => {
                self.phase = Phase::Stopping;
                Ok(())
            }
            Command::Unknown(text) => {
                self.say(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    text
                ))
                .await
            }
        }
    }

    /// Usage line for a missing name, error line for an invalid one.
    async fn key_argument(&mut self, verb: &str, arg: Option<String>) -> Result<Option<KeyName>> {
        let Some(raw) = arg else {
            self.say(usage(verb)).await?;
            return Ok(None);
        };
        match KeyName::parse(&raw) {
            Ok(name) => Ok(Some(name)),
            Err(e) => {
                self.report(&e).await?;
                Ok(None)
            }
        }
    }

    async fn list(&mut self) -> Result<()> {
        self.warn_if_unhealthy().await?;

        match self.transport.list_keys().await {
            Ok(mut names) => {
                if names.is_empty() {
                    return self.say("No SSH keys found.").await;
                }
                names.sort();
                self.say(format!("SSH keys ({}):", names.len())).await?;
                for name in names {
                    self.say(format!("  - {}", name)).await?;
                }
                Ok(())
            }
            Err(e) => self.report(&e).await,
        }
    }

    async fn add(&mut self, name: KeyName) -> Result<()> {
        self.warn_if_unhealthy().await?;
        self.say(format!("Generating SSH key pair: {}", name)).await?;

        match self.transport.generate_key_pair(&name).await {
            Ok(()) => {
                info!("Generated key pair {}", name);
                self.say(format!("✓ Key pair '{}' generated", name)).await
            }
            Err(e) => self.report(&e).await,
        }
    }

    async fn confirm(&mut self, pending: PendingRemoval, answer: Answer) -> Result<()> {
        let Some(name) = pending.resolve(answer) else {
            return self.say("Operation cancelled.").await;
        };

        self.warn_if_unhealthy().await?;
        self.say(format!("Removing SSH key: {}", name)).await?;

        match self.transport.remove_key(&name).await {
            Ok(()) => {
                info!("Removed key pair {}", name);
                self.say(format!("✓ Key '{}' removed", name)).await
            }
            Err(e) => self.report(&e).await,
        }
    }

    async fn show(&mut self, name: KeyName) -> Result<()> {
        self.say(format!("Showing details for key: {}", name)).await?;

        match self.transport.describe_key(&name).await {
            Ok(details) => {
                for line in details.render() {
                    self.say(line).await?;
                }
                Ok(())
            }
            Err(e) => self.report(&e).await,
        }
    }

    async fn test(&mut self) -> Result<()> {
        self.say("Testing SSH connection...").await?;

        match self.transport.test_connection().await {
            Ok(()) => self.say("✓ Connection test succeeded").await?,
            Err(e) => self.report(&e).await?,
        }

        let label = self.transport.name().to_uppercase();
        if self.transport.is_healthy() {
            self.say(format!("✓ {} transport is healthy", label)).await
        } else {
            self.say(format!("✗ {} transport is not healthy", label)).await
        }
    }

    async fn warn_if_unhealthy(&mut self) -> Result<()> {
        if self.transport.is_healthy() {
            return Ok(());
        }
        warn!("{} transport reports unhealthy", self.transport.name());
        self.say(format!(
            "Warning: {} transport is not healthy, continuing anyway.",
            self.transport.name().to_uppercase()
        ))
        .await
    }

    /// Recoverable errors become a single line; the session continues.
    async fn report(&mut self, err: &ManagerError) -> Result<()> {
        debug!("Operation failed: {:?}", err);
        self.say(format!("Error: {}", err)).await
    }

    async fn say(&mut self, line: impl AsRef<str>) -> Result<()> {
        self.write(line.as_ref()).await?;
        self.write("\n").await
    }

    async fn write(&mut self, text: &str) -> Result<()> {
        self.output
            .write_all(text.as_bytes())
            .await
            .map_err(output_error)?;
        self.output.flush().await.map_err(output_error)
    }
}

fn output_error(e: std::io::Error) -> ManagerError {
    ManagerError::Transport(format!("failed to write console output: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::transport::{FailurePlan, MemoryTransport};

    async fn run_console(
        transport: MemoryTransport,
        input: &str,
    ) -> (Result<()>, MemoryTransport, String) {
        let mut console = Console::new(transport, input.as_bytes(), Vec::new());
        let result = console.run().await;
        assert_eq!(console.phase(), &Phase::Terminated);
        let (transport, output) = console.into_parts();
        (result, transport, String::from_utf8(output).unwrap())
    }

    mod lifecycle {
        use super::*;

        #[tokio::test]
        async fn test_quit_stops_transport_and_says_goodbye() {
            let (result, transport, output) = run_console(MemoryTransport::new(), "quit\n").await;
            assert!(result.is_ok());
            assert!(output.starts_with("SSH Key Manager\n"));
            assert!(output.contains(PROMPT));
            assert!(output.ends_with("Goodbye!\n"));
            let calls = transport.calls();
            assert_eq!(calls.started, 1);
            assert_eq!(calls.stopped, 1);
        }

        #[tokio::test]
        async fn test_quit_aliases() {
            for input in ["q\n", "exit\n"] {
                let (result, transport, output) = run_console(MemoryTransport::new(), input).await;
                assert!(result.is_ok());
                assert!(output.contains("Goodbye!"));
                assert_eq!(transport.calls().stopped, 1);
            }
        }

        #[tokio::test]
        async fn test_end_of_input_acts_as_quit() {
            let (result, transport, output) = run_console(MemoryTransport::new(), "help\n").await;
            assert!(result.is_ok());
            assert!(output.ends_with("Goodbye!\n"));
            assert_eq!(transport.calls().stopped, 1);
        }

        #[tokio::test]
        async fn test_commands_after_quit_are_not_read() {
            let transport = MemoryTransport::new().with_keys(["k"]);
            let (_, transport, output) = run_console(transport, "quit\nlist\n").await;
            assert_eq!(transport.calls().listed, 0);
            assert!(!output.contains("  - k"));
        }

        #[tokio::test]
        async fn test_start_failure_is_fatal_without_prompt() {
            let transport = MemoryTransport::new().with_failures(FailurePlan {
                start: Some(ManagerError::Startup("key storage unavailable".into())),
                ..Default::default()
            });
            let (result, transport, output) = run_console(transport, "help\nquit\n").await;

            let err = result.unwrap_err();
            assert!(err.is_fatal());
            assert!(!output.contains(PROMPT));
            assert!(!output.contains("Available commands"));
            // Partial start resources are still released.
            assert_eq!(transport.calls().stopped, 1);
        }

        #[tokio::test]
        async fn test_non_startup_start_error_becomes_fatal() {
            let transport = MemoryTransport::new().with_failures(FailurePlan {
                start: Some(ManagerError::Transport("disk full".into())),
                ..Default::default()
            });
            let (result, _, _) = run_console(transport, "quit\n").await;
            let err = result.unwrap_err();
            assert!(matches!(err, ManagerError::Startup(_)));
            assert!(err.to_string().contains("disk full"));
        }

        #[tokio::test]
        async fn test_stop_failure_is_not_fatal() {
            let transport = MemoryTransport::new().with_failures(FailurePlan {
                stop: Some(ManagerError::Transport("close failed".into())),
                ..Default::default()
            });
            let (result, _, output) = run_console(transport, "quit\n").await;
            assert!(result.is_ok());
            assert!(output.contains("Goodbye!"));
        }
    }

    struct ClosedOutput;

    impl AsyncWrite for ClosedOutput {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    mod output_failure {
        use super::*;

        #[tokio::test]
        async fn test_closed_output_still_stops_transport() {
            let mut console = Console::new(MemoryTransport::new(), &b"help
quit
"[..], ClosedOutput);
            let result = console.run().await;

            assert!(matches!(result, Err(ManagerError::Transport(_))));
            assert!(!result.unwrap_err().is_fatal());
            assert_eq!(console.phase(), &Phase::Terminated);
            let calls = console.transport().calls();
            assert_eq!(calls.started, 1);
            assert_eq!(calls.stopped, 1);
        }
    }

    mod parsing {
        use super::*;

        #[tokio::test]
        async fn test_unknown_command_then_quit() {
            let (result, _, output) =
                run_console(MemoryTransport::new(), "frobnicate\nquit\n").await;
            assert!(result.is_ok());
            assert!(output.contains(
                "Unknown command: frobnicate. Type 'help' for available commands."
            ));
            assert!(output.contains("Goodbye!"));
        }

        #[tokio::test]
        async fn test_blank_lines_are_ignored() {
            let (_, _, output) = run_console(MemoryTransport::new(), "\n   \n\t\nquit\n").await;
            assert!(!output.contains("Unknown command"));
            assert_eq!(output.matches(PROMPT).count(), 4);
        }

        #[tokio::test]
        async fn test_help_lists_every_command() {
            let (_, _, output) = run_console(MemoryTransport::new(), "h\n").await;
            for entry in ["help, h", "list, ls", "add <name>", "remove <name>", "show <name>", "test", "quit, exit, q"] {
                assert!(output.contains(entry), "missing {}", entry);
            }
        }

        #[tokio::test]
        async fn test_verbs_are_case_sensitive() {
            let (_, transport, output) = run_console(MemoryTransport::new(), "ADD k\n").await;
            assert!(output.contains("Unknown command: ADD k."));
            assert!(transport.calls().generated.is_empty());
        }

        #[tokio::test]
        async fn test_surrounding_whitespace_is_ignored() {
            let (_, transport, _) = run_console(MemoryTransport::new(), "  add foo  \n").await;
            assert_eq!(transport.calls().generated, vec!["foo".to_string()]);
            assert!(transport.contains("foo"));
        }
    }

    mod add {
        use super::*;

        #[tokio::test]
        async fn test_missing_argument_prints_usage() {
            let (result, transport, output) = run_console(MemoryTransport::new(), "add\n").await;
            assert!(result.is_ok());
            assert!(output.contains("Usage: add <key-name>"));
            assert!(transport.calls().generated.is_empty());
        }

        #[tokio::test]
        async fn test_invalid_name_never_reaches_transport() {
            let long = "a".repeat(51);
            let input = format!("add bad/name\nadd {}\nadd ../etc\n", long);
            let (_, transport, output) = run_console(MemoryTransport::new(), &input).await;
            assert_eq!(output.matches("Invalid key name").count(), 3);
            assert!(transport.calls().generated.is_empty());
        }

        #[tokio::test]
        async fn test_generates_key() {
            let (_, transport, output) = run_console(MemoryTransport::new(), "add my-key_123\n").await;
            assert!(output.contains("Generating SSH key pair: my-key_123"));
            assert!(output.contains("✓ Key pair 'my-key_123' generated"));
            assert!(transport.contains("my-key_123"));
        }

        #[tokio::test]
        async fn test_only_first_argument_is_used() {
            let (_, transport, _) = run_console(MemoryTransport::new(), "add first second\n").await;
            assert_eq!(transport.calls().generated, vec!["first".to_string()]);
        }

        #[tokio::test]
        async fn test_duplicate_is_reported_and_not_overwritten() {
            let transport = MemoryTransport::new().with_keys(["k"]);
            let original = transport.key("k").cloned().unwrap();

            let (result, transport, output) = run_console(transport, "add k\nquit\n").await;
            assert!(result.is_ok());
            assert!(output.contains("Error: key 'k' already exists"));
            assert_eq!(transport.key("k"), Some(&original));
            assert_eq!(transport.key_count(), 1);
        }

        #[tokio::test]
        async fn test_transport_error_is_local() {
            let transport = MemoryTransport::new().with_failures(FailurePlan {
                generate: Some(ManagerError::Transport("entropy exhausted".into())),
                ..Default::default()
            });
            let (result, transport, output) = run_console(transport, "add k\nhelp\nquit\n").await;
            assert!(result.is_ok());
            assert!(output.contains("Error: transport error: entropy exhausted"));
            assert!(output.contains("Available commands:"));
            assert!(!transport.contains("k"));
        }

        #[tokio::test]
        async fn test_unhealthy_transport_warns_but_proceeds() {
            let transport = MemoryTransport::new().unhealthy();
            let (_, transport, output) = run_console(transport, "add k\n").await;
            assert!(output.contains("Warning: MEMORY transport is not healthy"));
            assert!(transport.contains("k"));
        }
    }

    mod remove {
        use super::*;

        #[tokio::test]
        async fn test_missing_argument_prints_usage() {
            let (_, transport, output) = run_console(MemoryTransport::new(), "remove\n").await;
            assert!(output.contains("Usage: remove <key-name>"));
            assert!(!output.contains("Are you sure"));
            assert!(transport.calls().removed.is_empty());
        }

        #[tokio::test]
        async fn test_invalid_name_is_rejected_before_prompt() {
            let transport = MemoryTransport::new().with_keys(["k"]);
            let (_, transport, output) = run_console(transport, "remove k!\ny\n").await;
            assert!(output.contains("Invalid key name"));
            assert!(!output.contains("Are you sure"));
            // "y" is read as a command, not an answer.
            assert!(output.contains("Unknown command: y."));
            assert!(transport.contains("k"));
        }

        #[tokio::test]
        async fn test_negative_answer_keeps_key() {
            for answer in ["n", "no", "", "maybe", "yess"] {
                let transport = MemoryTransport::new().with_keys(["k"]);
                let input = format!("remove k\n{}\nquit\n", answer);
                let (result, transport, output) = run_console(transport, &input).await;
                assert!(result.is_ok());
                assert!(output.contains("Are you sure you want to delete key 'k'? (y/N): "));
                assert!(output.contains("Operation cancelled."), "answer {:?}", answer);
                assert!(transport.contains("k"));
                assert!(transport.calls().removed.is_empty());
            }
        }

        #[tokio::test]
        async fn test_affirmative_answer_removes_exactly_that_key() {
            for answer in ["y", "YES", " Yes "] {
                let transport = MemoryTransport::new().with_keys(["a", "k", "z"]);
                let input = format!("remove k\n{}\nquit\n", answer);
                let (_, transport, output) = run_console(transport, &input).await;
                assert!(output.contains("Removing SSH key: k"));
                assert!(output.contains("✓ Key 'k' removed"));
                assert!(!transport.contains("k"));
                assert!(transport.contains("a"));
                assert!(transport.contains("z"));
                assert_eq!(transport.calls().removed, vec!["k".to_string()]);
            }
        }

        #[tokio::test]
        async fn test_answer_line_is_never_a_command() {
            let transport = MemoryTransport::new().with_keys(["k"]);
            let (result, transport, output) =
                run_console(transport, "remove k\nquit\nlist\nquit\n").await;
            assert!(result.is_ok());
            assert!(output.contains("Operation cancelled."));
            assert_eq!(transport.calls().listed, 1);
            assert!(transport.contains("k"));
            assert_eq!(transport.calls().stopped, 1);
        }

        #[tokio::test]
        async fn test_no_prompt_while_awaiting_answer() {
            let transport = MemoryTransport::new().with_keys(["k"]);
            let (_, _, output) = run_console(transport, "remove k\nn\nquit\n").await;
            // One prompt before `remove`, one before `quit`.
            assert_eq!(output.matches(PROMPT).count(), 2);
        }

        #[tokio::test]
        async fn test_end_of_input_while_awaiting_cancels() {
            let transport = MemoryTransport::new().with_keys(["k"]);
            let (result, transport, output) = run_console(transport, "remove k\n").await;
            assert!(result.is_ok());
            assert!(output.contains("Operation cancelled."));
            assert!(output.ends_with("Goodbye!\n"));
            assert!(transport.contains("k"));
            assert!(transport.calls().removed.is_empty());
        }

        #[tokio::test]
        async fn test_missing_key_is_reported() {
            let (result, _, output) = run_console(MemoryTransport::new(), "remove ghost\ny\nquit\n").await;
            assert!(result.is_ok());
            assert!(output.contains("Error: key 'ghost' not found"));
        }

        #[tokio::test]
        async fn test_failed_removal_keeps_key() {
            let transport = MemoryTransport::new()
                .with_keys(["k"])
                .with_failures(FailurePlan {
                    remove: Some(ManagerError::Transport("permission denied".into())),
                    ..Default::default()
                });
            let (_, transport, output) = run_console(transport, "remove k\ny\n").await;
            assert!(output.contains("Error: transport error: permission denied"));
            assert!(transport.contains("k"));
        }
    }

    mod list {
        use super::*;

        #[tokio::test]
        async fn test_empty_key_set() {
            let (_, _, output) = run_console(MemoryTransport::new(), "list\n").await;
            assert!(output.contains("No SSH keys found."));
        }

        #[tokio::test]
        async fn test_names_are_sorted() {
            let transport = MemoryTransport::new().with_keys(["zeta", "alpha", "mid"]);
            let (_, _, output) = run_console(transport, "ls\n").await;
            assert!(output.contains("SSH keys (3):"));
            let alpha = output.find("  - alpha").unwrap();
            let mid = output.find("  - mid").unwrap();
            let zeta = output.find("  - zeta").unwrap();
            assert!(alpha < mid && mid < zeta);
        }

        #[tokio::test]
        async fn test_unsupported_listing_is_reported_and_session_continues() {
            let transport = MemoryTransport::new().without_listing();
            let (result, _, output) = run_console(transport, "list\nadd k\nquit\n").await;
            assert!(result.is_ok());
            assert!(output.contains("Error: key listing is not implemented by this transport"));
            assert!(output.contains("✓ Key pair 'k' generated"));
        }

        #[tokio::test]
        async fn test_list_reflects_additions_and_removals() {
            let transport = MemoryTransport::new().with_keys(["old"]);
            let (_, _, output) =
                run_console(transport, "add new\nremove old\ny\nlist\n").await;
            let listing = &output[output.find("SSH keys (1):").unwrap()..];
            assert!(listing.contains("  - new"));
            assert!(!listing.contains("  - old"));
        }
    }

    mod show {
        use super::*;

        #[tokio::test]
        async fn test_missing_argument_prints_usage() {
            let (_, transport, output) = run_console(MemoryTransport::new(), "show\n").await;
            assert!(output.contains("Usage: show <key-name>"));
            assert!(transport.calls().described.is_empty());
        }

        #[tokio::test]
        async fn test_renders_details() {
            let transport = MemoryTransport::new().with_keys(["k"]);
            let (_, _, output) = run_console(transport, "show k\n").await;
            assert!(output.contains("Showing details for key: k"));
            assert!(output.contains("  Name:        k"));
            assert!(output.contains("  Fingerprint: MEM:"));
        }

        #[tokio::test]
        async fn test_unknown_key_is_reported() {
            let (result, _, output) = run_console(MemoryTransport::new(), "show ghost\nquit\n").await;
            assert!(result.is_ok());
            assert!(output.contains("Error: key 'ghost' not found"));
        }

        #[tokio::test]
        async fn test_invalid_name_never_reaches_transport() {
            let (_, transport, output) = run_console(MemoryTransport::new(), "show a.b\n").await;
            assert!(output.contains("Invalid key name 'a.b'"));
            assert!(transport.calls().described.is_empty());
        }
    }

    mod connectivity {
        use super::*;

        #[tokio::test]
        async fn test_successful_probe_reports_health() {
            let (_, transport, output) = run_console(MemoryTransport::new(), "test\n").await;
            assert!(output.contains("Testing SSH connection..."));
            assert!(output.contains("✓ Connection test succeeded"));
            assert!(output.contains("✓ MEMORY transport is healthy"));
            assert_eq!(transport.calls().tested, 1);
        }

        #[tokio::test]
        async fn test_failed_probe_is_local() {
            let transport = MemoryTransport::new().unhealthy().with_failures(FailurePlan {
                test: Some(ManagerError::Connection("timed out after 5s".into())),
                ..Default::default()
            });
            let (result, _, output) = run_console(transport, "test\nquit\n").await;
            assert!(result.is_ok());
            assert!(output.contains("Error: connection failed: timed out after 5s"));
            assert!(output.contains("✗ MEMORY transport is not healthy"));
            assert!(output.contains("Goodbye!"));
        }
    }
}
