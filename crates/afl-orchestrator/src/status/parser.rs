//! Parser for `screen -ls` output

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Lists the screen sessions of the connecting user
pub const SESSION_LIST_COMMAND: &str = "screen -ls";

/// `<pid>.<name>` at the start of a line, e.g. `\t1234.worker_a\t(Detached)`
fn session_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*\d+\.(\S+)").expect("valid session pattern"))
}

/// Extract session names from a session listing.
///
/// Header and footer lines ("There are screens on:", "2 Sockets in ...")
/// do not match and are skipped.
pub fn parse_session_list(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .filter_map(|line| session_line().captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|name| name.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_detached_session() {
        let sessions = parse_session_list("1234.worker_a\t(Detached)");
        assert_eq!(sessions.into_iter().collect::<Vec<_>>(), vec!["worker_a"]);
    }

    #[test]
    fn test_ignores_header_and_footer() {
        let output = "There are screens on:\n\
                      \t4021.worker_a\t(03/07/24 09:05:02)\t(Detached)\n\
                      \t3980.worker_b\t(Attached)\n\
                      2 Sockets in /run/screen/S-afl.\n";

        let sessions = parse_session_list(output);
        assert_eq!(sessions.len(), 2);
        assert!(sessions.contains("worker_a"));
        assert!(sessions.contains("worker_b"));
        assert!(!sessions.contains("There"));
    }

    #[test]
    fn test_no_sockets_message_is_empty() {
        let output = "No Sockets found in /run/screen/S-afl.\n";
        assert!(parse_session_list(output).is_empty());
    }

    #[test]
    fn test_names_with_dots_are_kept_whole() {
        let sessions = parse_session_list("\t77.api.v2\t(Detached)\n");
        assert!(sessions.contains("api.v2"));
    }
}
