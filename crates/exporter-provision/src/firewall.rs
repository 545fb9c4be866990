//! Firewall back-end detection

use crate::runner::CommandRunner;

/// Firewall control system present on the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirewallBackend {
    Ufw,
    Firewalld,
    None,
}

impl FirewallBackend {
    /// Control executable probed for this back end, in detection order
    const PROBES: [(FirewallBackend, &'static str); 2] = [
        (FirewallBackend::Ufw, "ufw"),
        (FirewallBackend::Firewalld, "firewall-cmd"),
    ];
}

/// Detection state for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirewallState {
    #[default]
    Undetected,
    Ufw,
    Firewalld,
    Unsupported,
}

/// Detects the firewall back end once and remembers it
#[derive(Debug, Clone, Default)]
pub struct FirewallSelector {
    state: FirewallState,
}

impl FirewallSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FirewallState {
        self.state
    }

    /// Resolve the back end, probing the host only on first use.
    ///
    /// ufw is checked before firewalld so the result is stable if both exist.
    pub fn detect(&mut self, runner: &dyn CommandRunner) -> FirewallBackend {
        if self.state == FirewallState::Undetected {
            let found = FirewallBackend::PROBES
                .iter()
                .find(|(_, program)| runner.resolve(program).is_some())
                .map_or(FirewallBackend::None, |(backend, _)| *backend);

            self.state = match found {
                FirewallBackend::Ufw => FirewallState::Ufw,
                FirewallBackend::Firewalld => FirewallState::Firewalld,
                FirewallBackend::None => FirewallState::Unsupported,
            };
            tracing::debug!(state = ?self.state, "firewall backend detected");
        }

        match self.state {
            FirewallState::Ufw => FirewallBackend::Ufw,
            FirewallState::Firewalld => FirewallBackend::Firewalld,
            FirewallState::Undetected | FirewallState::Unsupported => FirewallBackend::None,
        }
    }
}
