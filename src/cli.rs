use std::{env, path::PathBuf};

use hellscore_attendance::attendance::{EventOption, SubmissionError, SubmissionService};

const USAGE: &str = "Usage: hellscore-attendance [--config PATH] [--test-events] [--events EMAIL]";

#[derive(Debug, Clone, PartialEq)]
pub enum CliMode {
    Serve,
    Events(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub mode: CliMode,
    pub config_path: Option<PathBuf>,
    pub test_events: bool,
}

pub fn parse_cli_args<I>(args: I) -> Result<CliArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = CliArgs {
        mode: CliMode::Serve,
        config_path: None,
        test_events: false,
    };
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("--config needs a path")?;
                parsed.config_path = Some(PathBuf::from(path));
            }
            "--test-events" => {
                parsed.test_events = true;
            }
            "--events" => {
                let email = args.next().ok_or("--events needs an email")?;
                parsed.mode = CliMode::Events(email);
            }
            "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            _ => return Err(format!("Unknown argument: {}", arg)),
        }
    }

    Ok(parsed)
}

pub fn usage() -> &'static str {
    USAGE
}

/// `TEST_EVENTS=true` or `TEST_EVENTS=1` turns on test mode.
pub fn test_events_from_env() -> bool {
    env::var("TEST_EVENTS").is_ok_and(|value| is_truthy(&value))
}

fn is_truthy(value: &str) -> bool {
    matches!(value, "true" | "1")
}

pub async fn run_events_mode(service: &SubmissionService, email: &str) -> Result<(), SubmissionError> {
    let options = service.upcoming_events(Some(email)).await?;
    println!("{}", format_event_options(email, &options));
    Ok(())
}

fn format_event_options(email: &str, options: &[EventOption]) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Upcoming events for {}", email));
    lines.push(String::new());

    if options.is_empty() {
        lines.push("No events to respond to.".to_string());
    } else {
        for option in options {
            let marker = if option.is_test { " [test]" } else { "" };
            lines.push(format!("- {:<17} {}{}", option.date, option.title, marker));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_arguments_serves() {
        let parsed = parse_cli_args(args(&[])).unwrap();

        assert_eq!(parsed.mode, CliMode::Serve);
        assert_eq!(parsed.config_path, None);
        assert!(!parsed.test_events);
    }

    #[test]
    fn parses_config_and_test_mode() {
        let parsed = parse_cli_args(args(&["--config", "/etc/att.toml", "--test-events"])).unwrap();

        assert_eq!(parsed.config_path, Some(PathBuf::from("/etc/att.toml")));
        assert!(parsed.test_events);
    }

    #[test]
    fn events_mode_takes_an_email() {
        let parsed = parse_cli_args(args(&["--events", "a@x.com"])).unwrap();

        assert_eq!(parsed.mode, CliMode::Events("a@x.com".to_string()));
        assert!(parse_cli_args(args(&["--events"])).is_err());
    }

    #[test]
    fn unknown_argument_is_rejected() {
        assert!(parse_cli_args(args(&["--agenda"])).is_err());
    }

    #[test]
    fn only_true_and_one_are_truthy() {
        assert!(is_truthy("true"));
        assert!(is_truthy("1"));
        assert!(!is_truthy("TRUE"));
        assert!(!is_truthy("yes"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn formats_event_options() {
        let options = vec![
            EventOption {
                title: "Rehearsal".to_string(),
                date: "07/03/2025 19:30".to_string(),
                is_test: false,
            },
            EventOption {
                title: "Test Event".to_string(),
                date: "08/03/2025 10:00".to_string(),
                is_test: true,
            },
        ];

        let text = format_event_options("a@x.com", &options);

        assert!(text.starts_with("Upcoming events for a@x.com"));
        assert!(text.contains("- 07/03/2025 19:30  Rehearsal"));
        assert!(text.contains("Test Event [test]"));
    }

    #[test]
    fn formats_empty_list() {
        let text = format_event_options("a@x.com", &[]);

        assert!(text.contains("No events to respond to."));
    }
}
