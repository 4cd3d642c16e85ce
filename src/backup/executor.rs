//! The command-execution collaborator contract.

use crate::error::TransportFault;

/// Result of running one command line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// The command ran. Says nothing about whether it did what was intended.
    pub success: bool,
    /// Combined output text.
    pub output: String,
}

impl CommandOutput {
    /// A command that ran and printed `output`.
    pub fn ran(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    /// A command the channel could not run.
    pub fn channel_failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// Runs shell-style command lines on the remote host.
///
/// The transport (telnet, ssh) owns timeouts and reports them
/// as [`TransportFault::TimedOut`].
pub trait CommandExecutor {
    /// Run `command_line` and return its output.
    fn exec(&self, command_line: &str) -> Result<CommandOutput, TransportFault>;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    fn exec(&self, command_line: &str) -> Result<CommandOutput, TransportFault> {
        (**self).exec(command_line)
    }
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for Box<T> {
    fn exec(&self, command_line: &str) -> Result<CommandOutput, TransportFault> {
        (**self).exec(command_line)
    }
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for std::sync::Arc<T> {
    fn exec(&self, command_line: &str) -> Result<CommandOutput, TransportFault> {
        (**self).exec(command_line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl CommandExecutor for Echo {
        fn exec(&self, command_line: &str) -> Result<CommandOutput, TransportFault> {
            Ok(CommandOutput::ran(command_line))
        }
    }

    #[test]
    fn wrappers_delegate() {
        let boxed: Box<dyn CommandExecutor> = Box::new(Echo);
        assert_eq!(boxed.exec("ls").unwrap().output, "ls");
        let shared = std::sync::Arc::new(Echo);
        assert!(shared.exec("x").unwrap().success);
        assert!(!CommandOutput::channel_failed("").success);
    }
}
