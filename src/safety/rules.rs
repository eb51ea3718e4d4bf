//! The fixed, ordered table of destructive-command signatures.

use once_cell::sync::Lazy;
use regex::Regex;

/// A labelled destructive-command signature.
///
/// A rule matches a step when any of its patterns does. Patterns are compiled
/// case-insensitive and anchored on word boundaries.
pub struct SafetyRule {
    pub label: &'static str,
    patterns: Vec<Regex>,
}

impl SafetyRule {
    fn new(label: &'static str, patterns: &[&str]) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(&format!("(?i){p}")).expect("Valid safety pattern"))
            .collect();
        Self { label, patterns }
    }

    pub fn matches(&self, command: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(command))
    }
}

/// Rules in evaluation order. Findings are reported in this order per step.
pub static RULES: Lazy<Vec<SafetyRule>> = Lazy::new(|| {
    vec![
        SafetyRule::new(
            "recursive delete",
            &[
                // Any short-flag cluster carrying r/R, forced or not.
                r"\brm\s+(?:\S+\s+)*-[a-z]*r[a-z]*(?:\s|$)",
                r"\brm\s+(?:\S+\s+)*--recursive\b",
                r"\bdel\s+(?:\S+\s+)*/[fsq]\b",
                r"\b(?:rd|rmdir)\s+(?:\S+\s+)*/s\b",
                r"\bremove-item\b.*-recurse\b",
            ],
        ),
        SafetyRule::new(
            "privilege escalation",
            &[r"\bsudo\b", r"\bdoas\b", r"\bsu\s+(?:-|root\b)", r"\brunas\b"],
        ),
        SafetyRule::new(
            "forced process termination",
            &[
                r"\bkill\s+(?:\S+\s+)*-(?:9|kill|sigkill)\b",
                r"\bkill\s+-s\s+(?:9|kill|sigkill)\b",
                r"\bpkill\s+(?:\S+\s+)*-(?:9|kill|sigkill)\b",
                r"\bkillall\b",
                r"\btaskkill\b.*\s/f\b",
            ],
        ),
        SafetyRule::new(
            "system power control",
            &[
                r"\bshutdown\b",
                r"\breboot\b",
                r"\bpoweroff\b",
                r"\bhalt\b",
                r"\binit\s+[06]\b",
                r"\bsystemctl\s+(?:poweroff|reboot|halt|kexec)\b",
            ],
        ),
        SafetyRule::new(
            "filesystem format",
            &[
                r"\bmkfs(?:\.[a-z0-9]+)?\b",
                r"\bmke2fs\b",
                r"\bwipefs\b",
                r"\bformat\s+(?:[a-z]:|/)",
            ],
        ),
        SafetyRule::new(
            "raw device overwrite",
            &[
                r"\bdd\b.*\b(?:if|of)=",
                r">\s*/dev/(?:sd|hd|vd|xvd|nvme|mmcblk|disk)",
                r"\bshred\b",
            ],
        ),
        SafetyRule::new("world-writable permissions", &[r"\bchmod\s+(?:-\S+\s+)*0?777\b"]),
        SafetyRule::new("ownership change to root", &[r"\bchown\s+.*\broot\b"]),
        SafetyRule::new("discard via /dev/null", &[r"\bmv\s+.*\s/dev/null\b"]),
        SafetyRule::new("fork bomb", &[r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:"]),
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(command: &str) -> Vec<&'static str> {
        RULES
            .iter()
            .filter(|r| r.matches(command))
            .map(|r| r.label)
            .collect()
    }

    #[test]
    fn test_recursive_delete_forms() {
        for command in [
            "rm -rf /tmp/x",
            "rm -fr build",
            "rm -r -f build",
            "rm -f -r build",
            "rm -v -rf build",
            "rm --recursive --force build",
            "rm --recursive build",
            "rm -rvf /",
            "rm -r /home/me",
            "rm -R build",
            "rm -i -R build",
            "rm -vr build",
            "RM -RF /tmp/x",
            "del /s /q C:\\temp",
            "rd /s C:\\temp",
        ] {
            assert_eq!(labels(command), vec!["recursive delete"], "{command}");
        }
    }

    #[test]
    fn test_plain_delete_is_not_flagged() {
        assert!(labels("rm notes.txt").is_empty());
        assert!(labels("rm -f notes.txt").is_empty());
        assert!(labels("rm -fv report.txt").is_empty());
        assert!(labels("rm -f -- -r.txt").is_empty());
        assert!(labels("rm --preserve-root file").is_empty());
        assert!(labels("git rm --cached file").is_empty());
    }

    #[test]
    fn test_kill_variants() {
        assert_eq!(labels("kill -9 1234"), vec!["forced process termination"]);
        assert_eq!(labels("kill -KILL 1234"), vec!["forced process termination"]);
        assert_eq!(labels("killall node"), vec!["forced process termination"]);
        assert!(labels("kill 1234").is_empty());
    }

    #[test]
    fn test_dev_null_redirect_is_safe() {
        assert!(labels("make > /dev/null 2>&1").is_empty());
        assert_eq!(labels("cat image.iso > /dev/sdb"), vec!["raw device overwrite"]);
        assert_eq!(
            labels("dd if=image.iso of=/dev/sdb bs=4M"),
            vec!["raw device overwrite"]
        );
    }

    #[test]
    fn test_power_and_format() {
        assert_eq!(labels("sudo reboot"), vec!["privilege escalation", "system power control"]);
        assert_eq!(labels("mkfs.ext4 /dev/sdb1"), vec!["filesystem format"]);
        assert!(labels("cargo fmt && git format-patch HEAD~1").is_empty());
    }

    #[test]
    fn test_permissions_and_ownership() {
        assert_eq!(labels("chmod -R 777 /srv"), vec!["world-writable permissions"]);
        assert_eq!(labels("chown root:root app"), vec!["ownership change to root"]);
        assert!(labels("chmod 755 script.sh").is_empty());
    }

    #[test]
    fn test_fork_bomb() {
        assert_eq!(labels(":(){ :|:& };:"), vec!["fork bomb"]);
    }
}
