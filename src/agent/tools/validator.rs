//! `CommandValidator`: classifies shell commands as safe / dangerous, and in
//! whitelist mode, admitted / refused / unknown. Pure and side-effect free —
//! the executor decides what to do with a `Classification`.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

/// Curated dangerous-command patterns (blacklist mode default). Grounded on
/// the same shape of deny-pattern set the shell tool historically carried,
/// generalized into a standalone, execution-independent classifier.
static DANGEROUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"rm\s+(-\w*[rf]\w*\s+)*-\w*[rf]\w*[rf]\w*\s",
        r"rm\s+-\w*r\w*\s+-\w*f\w*\s",
        r"rm\s+-\w*f\w*\s+-\w*r\w*\s",
        r"rm\s+-rf\s*/",
        r"dd\s+if=",
        r"mkfs(\.\w+)?\s",
        r":\(\)\s*\{\s*:\s*\|\s*:.*\}\s*;",
        r"chmod\s+-R\s+777\s+/",
        r">\s*/dev/sd[a-z]",
        r"curl[^|]*\|\s*(sudo\s+)?sh",
        r"wget[^|]*\|\s*(sudo\s+)?sh",
        r"sudo\s+rm\s+-rf",
        r":>\s*/dev/",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_dangerous: bool,
    pub reason: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhitelistEntry {
    pub pattern: String,
    #[serde(default)]
    pub exclude: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Blacklist,
    Whitelist,
}

/// Outcome of running a command through the whitelist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhitelistVerdict {
    Admitted { description: String },
    Unknown,
}

pub struct CommandValidator {
    mode: ValidationMode,
    whitelist: Vec<(Regex, Option<Regex>, String)>,
}

impl CommandValidator {
    pub fn blacklist() -> Self {
        Self {
            mode: ValidationMode::Blacklist,
            whitelist: Vec::new(),
        }
    }

    pub fn whitelist(entries: Vec<WhitelistEntry>) -> Self {
        let compiled = entries
            .into_iter()
            .filter_map(|e| {
                let pattern = Regex::new(&e.pattern).ok()?;
                let exclude = e.exclude.and_then(|x| Regex::new(&x).ok());
                Some((pattern, exclude, e.description))
            })
            .collect();
        Self {
            mode: ValidationMode::Whitelist,
            whitelist: compiled,
        }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Blacklist-mode classification: is this command dangerous?
    pub fn classify(&self, command: &str) -> Classification {
        for pattern in DANGEROUS_PATTERNS.iter() {
            if pattern.is_match(command) {
                return Classification {
                    is_dangerous: true,
                    reason: Some(format!(
                        "command matches a dangerous pattern: {}",
                        pattern.as_str()
                    )),
                    description: command.to_string(),
                };
            }
        }
        Classification {
            is_dangerous: false,
            reason: None,
            description: command.to_string(),
        }
    }

    /// Whitelist-mode admission check: admits exactly the commands matching
    /// some `(pattern, ¬exclude)` entry.
    pub fn check_whitelist(&self, command: &str) -> WhitelistVerdict {
        for (pattern, exclude, description) in &self.whitelist {
            if pattern.is_match(command) {
                if let Some(exclude) = exclude
                    && exclude.is_match(command)
                {
                    continue;
                }
                return WhitelistVerdict::Admitted {
                    description: description.clone(),
                };
            }
        }
        WhitelistVerdict::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rm_rf_root_is_dangerous() {
        let v = CommandValidator::blacklist();
        let c = v.classify("rm -rf /");
        assert!(c.is_dangerous);
        assert!(c.reason.unwrap().contains("dangerous"));
    }

    #[test]
    fn ls_is_safe() {
        let v = CommandValidator::blacklist();
        assert!(!v.classify("ls -la").is_dangerous);
    }

    #[test]
    fn fork_bomb_is_dangerous() {
        let v = CommandValidator::blacklist();
        assert!(v.classify(":(){ :|:& };:").is_dangerous);
    }

    #[test]
    fn whitelist_admits_matching_pattern() {
        let v = CommandValidator::whitelist(vec![WhitelistEntry {
            pattern: r"^git status".to_string(),
            exclude: None,
            description: "git status".to_string(),
        }]);
        assert!(matches!(
            v.check_whitelist("git status"),
            WhitelistVerdict::Admitted { .. }
        ));
    }

    #[test]
    fn whitelist_respects_exclude() {
        let v = CommandValidator::whitelist(vec![WhitelistEntry {
            pattern: r"^git ".to_string(),
            exclude: Some(r"^git push".to_string()),
            description: "git command".to_string(),
        }]);
        assert!(matches!(
            v.check_whitelist("git push"),
            WhitelistVerdict::Unknown
        ));
        assert!(matches!(
            v.check_whitelist("git status"),
            WhitelistVerdict::Admitted { .. }
        ));
    }

    #[test]
    fn whitelist_unknown_for_unmatched_command() {
        let v = CommandValidator::whitelist(vec![]);
        assert_eq!(v.check_whitelist("ls"), WhitelistVerdict::Unknown);
    }
}
