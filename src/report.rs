use std::io::{self, Write};

use crate::registry::{CommandRegistry, CommandStatus};

const RULE_WIDTH: usize = 80;

/// Print the end-of-run summary to stdout, after the dashboard has released
/// the terminal.
pub fn print_report(registry: &CommandRegistry) -> io::Result<()> {
    let stdout = io::stdout();
    write_report(&mut stdout.lock(), registry)
}

/// Every command's final status, exit code (for failures) and full captured
/// output, so a failure's cause stays inspectable after the run ends, even
/// for commands cancelled before finishing their own work.
pub fn write_report(out: &mut impl Write, registry: &CommandRegistry) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out, "FINAL RESULTS")?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;

    for index in 0..registry.len() {
        let spec = registry.spec(index);
        let state = registry.snapshot(index);

        writeln!(out)?;
        match state.status {
            CommandStatus::Success => {
                writeln!(out, "✓ {} [{}]", spec.full_command, state.status)?;
            }
            CommandStatus::Failed => {
                writeln!(
                    out,
                    "✗ {} [{}] (exit code: {})",
                    spec.full_command, state.status, state.exit_code
                )?;
            }
            CommandStatus::Pending | CommandStatus::Running => {
                writeln!(out, "○ {} [{}]", spec.full_command, state.status)?;
            }
        }
        writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;

        if state.output.is_empty() {
            writeln!(out, "(no output)")?;
        } else {
            for line in &state.output {
                writeln!(out, "{line}")?;
            }
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    Ok(())
}

/// Aggregate process exit code: 0 only when every command ended Success.
/// Failures, spawn failures and commands cut short by an early exit all
/// count against the run.
pub fn exit_code(registry: &CommandRegistry) -> i32 {
    let all_success = (0..registry.len()).all(|i| registry.status(i) == CommandStatus::Success);
    if all_success {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CommandSpec;

    fn registry(raws: &[&str]) -> CommandRegistry {
        let specs = raws
            .iter()
            .enumerate()
            .map(|(i, raw)| CommandSpec::shell(i, raw))
            .collect();
        CommandRegistry::new(specs)
    }

    fn rendered(reg: &CommandRegistry) -> String {
        let mut buf = Vec::new();
        write_report(&mut buf, reg).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn report_shows_success_and_failure_lines() {
        let reg = registry(&["echo ok", "false"]);
        reg.set_running(0);
        reg.append_line(0, "ok".into());
        reg.complete(0, CommandStatus::Success, 0);
        reg.set_running(1);
        reg.complete(1, CommandStatus::Failed, 3);

        let text = rendered(&reg);
        assert!(text.contains("FINAL RESULTS"));
        assert!(text.contains("✓ echo ok [success]"));
        assert!(text.contains("✗ false [failed] (exit code: 3)"));
        assert!(text.contains("\nok\n"));
    }

    #[test]
    fn report_marks_empty_output() {
        let reg = registry(&["true"]);
        reg.set_running(0);
        reg.complete(0, CommandStatus::Success, 0);
        assert!(rendered(&reg).contains("(no output)"));
    }

    #[test]
    fn report_lists_non_terminal_commands_with_hollow_glyph() {
        let reg = registry(&["sleep 100"]);
        assert!(rendered(&reg).contains("○ sleep 100 [pending]"));
    }

    #[test]
    fn exit_code_zero_only_when_all_succeed() {
        let reg = registry(&["a", "b"]);
        reg.set_running(0);
        reg.complete(0, CommandStatus::Success, 0);
        reg.set_running(1);
        reg.complete(1, CommandStatus::Success, 0);
        assert_eq!(exit_code(&reg), 0);
    }

    #[test]
    fn exit_code_one_when_any_failed() {
        let reg = registry(&["a", "b"]);
        reg.set_running(0);
        reg.complete(0, CommandStatus::Success, 0);
        reg.set_running(1);
        reg.complete(1, CommandStatus::Failed, 7);
        assert_eq!(exit_code(&reg), 1);
    }

    #[test]
    fn exit_code_one_when_run_was_cut_short() {
        let reg = registry(&["a"]);
        assert_eq!(exit_code(&reg), 1);
    }
}
