//! Build and run commands for the captured-sites test suites.
//!
//! Both commands go through the captured-sites control script in the
//! checkout, in its release (`-r`) configuration. Composing a command never
//! executes anything; `git bisect run` does that.

use crate::models::Bot;
use crate::traits::{BuildRunner, TestRunner};

pub struct CapturedSitesRunner {
    control_script: String,
}

impl CapturedSitesRunner {
    pub fn new(control_script: impl Into<String>) -> Self {
        Self {
            control_script: control_script.into(),
        }
    }
}

impl BuildRunner for CapturedSitesRunner {
    fn build_command(&self, bot: Bot) -> String {
        format!(
            "{} build -r {}",
            shell_quote(&self.control_script),
            bot.alias()
        )
    }
}

impl TestRunner for CapturedSitesRunner {
    fn run_command(&self, bot: Bot, site_args: &[String]) -> String {
        let mut command = format!(
            "{} run -r -b -t {}",
            shell_quote(&self.control_script),
            bot.alias()
        );
        for arg in site_args {
            command.push(' ');
            command.push_str(&shell_quote(arg));
        }
        command
    }
}

/// Quote `s` for `sh` unless it only holds characters that need none.
pub fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=+@%".contains(c));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}
