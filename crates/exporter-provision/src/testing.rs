//! Recording `CommandRunner` double for tests

use std::cell::RefCell;
use std::path::PathBuf;

use crate::error::ExecError;
use crate::runner::{CommandResult, CommandRunner, RunOptions};

type Hook = Box<dyn Fn(&[&str])>;

/// One recorded invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub argv: Vec<String>,
    pub stdin: Option<String>,
}

/// Fake host: canned results keyed by argv prefix, missing and installed tools
#[derive(Default)]
pub struct FakeRunner {
    responses: Vec<(Vec<String>, CommandResult)>,
    interrupts: Vec<Vec<String>>,
    missing: Vec<String>,
    installed: Vec<String>,
    hook: Option<Hook>,
    trace: RefCell<Vec<Invocation>>,
    probes: RefCell<Vec<String>>,
}

fn owned(argv: &[&str]) -> Vec<String> {
    argv.iter().map(ToString::to_string).collect()
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host where the user exists and the exporter answers after start
    pub fn healthy_host() -> Self {
        Self::new()
            .respond(&["ss"], CommandResult::new(0, "LISTEN 0 4096 *:9100 *:*\n", ""))
            .respond(&["curl", "-fsS"], CommandResult::new(0, "200", ""))
    }

    /// Return `result` for commands starting with `prefix` (last match wins)
    pub fn respond(mut self, prefix: &[&str], result: CommandResult) -> Self {
        self.responses.push((owned(prefix), result));
        self
    }

    /// Commands starting with `prefix` die from SIGINT
    pub fn interrupt(mut self, prefix: &[&str]) -> Self {
        self.interrupts.push(owned(prefix));
        self
    }

    /// `program` is not installed at all
    pub fn missing(mut self, program: &str) -> Self {
        self.missing.push(program.into());
        self
    }

    /// `program` resolves on the search path
    pub fn installed(mut self, program: &str) -> Self {
        self.installed.push(program.into());
        self
    }

    /// Run `hook` for every invocation, e.g. to create extracted files
    pub fn on_run(mut self, hook: impl Fn(&[&str]) + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.trace.borrow().clone()
    }

    /// Every executed argv, space-joined
    pub fn commands(&self) -> Vec<String> {
        self.trace
            .borrow()
            .iter()
            .map(|inv| inv.argv.join(" "))
            .collect()
    }

    /// Whether any executed command started with `prefix`
    pub fn ran(&self, prefix: &str) -> bool {
        self.commands().iter().any(|c| c.starts_with(prefix))
    }

    /// Programs looked up on the search path
    pub fn probes(&self) -> Vec<String> {
        self.probes.borrow().clone()
    }

    fn matches(prefix: &[String], argv: &[&str]) -> bool {
        prefix.len() <= argv.len() && prefix.iter().zip(argv).all(|(p, a)| p == a)
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, argv: &[&str], options: &RunOptions) -> Result<CommandResult, ExecError> {
        self.trace.borrow_mut().push(Invocation {
            argv: owned(argv),
            stdin: options.stdin.clone(),
        });
        let program = argv[0].to_string();

        if self.missing.contains(&program) {
            return Err(ExecError::ExecutorNotFound { program });
        }
        if self.interrupts.iter().any(|p| Self::matches(p, argv)) {
            return Err(ExecError::Interrupted { program, signal: 2 });
        }
        if let Some(hook) = &self.hook {
            hook(argv);
        }

        let result = self
            .responses
            .iter()
            .rev()
            .find(|(prefix, _)| Self::matches(prefix, argv))
            .map_or_else(CommandResult::ok, |(_, result)| result.clone());

        if result.success() || options.allow_failure {
            Ok(result)
        } else {
            Err(ExecError::CommandFailed {
                program,
                exit_code: result.exit_code,
                stdout: result.stdout,
                stderr: result.stderr,
            })
        }
    }

    fn resolve(&self, program: &str) -> Option<PathBuf> {
        self.probes.borrow_mut().push(program.to_string());
        self.installed
            .iter()
            .any(|p| p == program)
            .then(|| PathBuf::from("/usr/sbin").join(program))
    }
}
