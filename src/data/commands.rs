//! Command registry and namespace command discovery.

use crate::domain::{CommandKey, CommandSpec, CommandTable};
use tracing::debug;

/// Placeholder replaced by the namespace name in command templates
pub const NETNS_PLACEHOLDER: &str = "{ns}";

/// Default command run inside each discovered namespace
pub const DEFAULT_NETNS_COMMAND: &str = "ip netns exec {ns} ip addr show";

/// Registers `spec` under `key` unless `key` is already present.
/// Returns true if the command was added.
pub fn add_new_command(commands: &mut CommandTable, key: impl Into<String>, spec: CommandSpec) -> bool {
    let key = CommandKey::new(key);
    let added = commands.insert_if_absent(key.clone(), spec);
    if !added {
        debug!(key = %key, "Command already registered, keeping original");
    }
    added
}

/// Registers one command per namespace listed in `ip netns list` output.
/// Lines look like `qrouter-<id> (id: 3)` or just `qdhcp-<id>`.
/// Returns the number of new registrations.
pub fn register_netns_commands<'a, I>(commands: &mut CommandTable, lines: I, template: &str) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    let mut added = 0;

    for line in lines {
        let Some(namespace) = line.split_whitespace().next() else {
            continue; // Blank line
        };

        let spec = CommandSpec::new(template.replace(NETNS_PLACEHOLDER, namespace))
            .with_help(format!("Addresses in namespace {}", namespace));

        if add_new_command(commands, format!("netns_{}", namespace), spec) {
            added += 1;
        }
    }

    added
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_new_command() {
        let mut commands = CommandTable::new();
        let cmd_key = "netns_test";
        let cmd = CommandSpec::new("echo netns test");

        assert!(add_new_command(&mut commands, cmd_key, cmd.clone()));
        assert_eq!(commands.len(), 1);
        assert_eq!(commands.get(&CommandKey::new(cmd_key)), Some(&cmd));

        // Try to add the same command again
        assert!(!add_new_command(&mut commands, cmd_key, cmd.clone()));
        assert_eq!(commands.len(), 1);
        assert_eq!(commands.get(&CommandKey::new(cmd_key)), Some(&cmd));
    }

    #[test]
    fn test_add_new_command_never_overwrites() {
        let mut commands = CommandTable::new();
        add_new_command(&mut commands, "k", CommandSpec::new("echo original"));
        add_new_command(&mut commands, "k", CommandSpec::new("echo replacement"));

        assert_eq!(commands.get(&CommandKey::new("k")).unwrap().cmd, "echo original");
    }

    #[test]
    fn test_register_netns_commands() {
        let mut commands = CommandTable::new();
        let output = "qrouter-1b2c (id: 3)\nqdhcp-9f8e (id: 1)\n\n";

        let added = register_netns_commands(&mut commands, output.lines(), DEFAULT_NETNS_COMMAND);

        assert_eq!(added, 2);
        let spec = commands.get(&CommandKey::new("netns_qrouter-1b2c")).unwrap();
        assert_eq!(spec.cmd, "ip netns exec qrouter-1b2c ip addr show");
        assert!(commands.contains_key(&CommandKey::new("netns_qdhcp-9f8e")));
    }

    #[test]
    fn test_register_netns_commands_repeated_pass() {
        let mut commands = CommandTable::new();
        let first = "qrouter-1b2c\n";
        let second = "qrouter-1b2c\nqdhcp-9f8e\n";

        assert_eq!(register_netns_commands(&mut commands, first.lines(), "echo {ns}"), 1);
        assert_eq!(register_netns_commands(&mut commands, second.lines(), "other {ns}"), 1);

        assert_eq!(commands.len(), 2);
        // First pass wins for the namespace seen twice
        assert_eq!(commands.get(&CommandKey::new("netns_qrouter-1b2c")).unwrap().cmd, "echo qrouter-1b2c");
        assert_eq!(commands.get(&CommandKey::new("netns_qdhcp-9f8e")).unwrap().cmd, "other qdhcp-9f8e");
    }
}
