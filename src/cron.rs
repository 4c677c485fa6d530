//! Crontab parsing, whole-system collection, and replacement.
//!
//! Two dialects are handled:
//!
//! - **Per-user** crontabs (`crontab -l -u <user>`): five schedule fields
//!   followed by the command, user implied by context. Commented-out lines
//!   that still parse as a schedule are reported as disabled jobs.
//! - **System-wide** crontabs (`/etc/crontab`, `/etc/cron.d/*`): six fields
//!   before the command, the sixth being the user. Comments are skipped
//!   outright; disabled system jobs are not tracked.
//!
//! Line classification is deterministic and total: a line that matches
//! neither the `@token` shorthand nor the five-field grammar yields no job
//! and no error.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{CollectError, MutationError};

/// Timeout for reading a user's crontab
const CRONTAB_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for installing a replacement crontab
const CRONTAB_INSTALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Login shells that mark an account as interactive. Accounts with any
/// other shell (nologin, false, daemons) are not queried.
const INTERACTIVE_SHELLS: [&str; 5] = [
    "/bin/bash",
    "/bin/zsh",
    "/bin/sh",
    "/usr/bin/bash",
    "/usr/bin/zsh",
];

lazy_static! {
    /// Five whitespace-separated schedule fields (digits, `*`, `,`, `/`,
    /// `-`), then whitespace, then the command verbatim.
    static ref SCHEDULE_RE: Regex = Regex::new(
        r"^([\d*,/\-]+)\s+([\d*,/\-]+)\s+([\d*,/\-]+)\s+([\d*,/\-]+)\s+([\d*,/\-]+)\s+(.+)$"
    )
    .unwrap();

    /// `@token` shorthand with a fixed vocabulary.
    static ref SPECIAL_RE: Regex =
        Regex::new(r"^@(reboot|hourly|daily|weekly|monthly|yearly|annually)\s+(.+)$").unwrap();
}

/// One parsed scheduled-task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronJob {
    /// Either an `@token` or five fields rejoined by single spaces
    pub schedule: String,
    /// The command text, verbatim including internal whitespace
    pub command: String,
    /// False when the job was recovered from a commented-out line
    pub enabled: bool,
    /// Owning user; present only for system-wide entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// A user's crontab: the raw text plus the jobs parsed out of it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserCrontab {
    pub raw: String,
    pub jobs: Vec<CronJob>,
}

impl UserCrontab {
    fn is_empty(&self) -> bool {
        self.raw.is_empty() && self.jobs.is_empty()
    }
}

/// Jobs from `/etc/crontab` and the cron drop-in directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemCrontab {
    pub jobs: Vec<CronJob>,
}

/// Every crontab on the host: per-user plus system-wide.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrontabSnapshot {
    /// Users appear only if their crontab is non-empty
    pub users: BTreeMap<String, UserCrontab>,
    pub system: SystemCrontab,
}

/// Classify one crontab line.
///
/// Blank lines and comments whose body is not a schedule yield `None`.
/// A comment whose body parses as a schedule yields a disabled job.
pub fn parse_line(line: &str) -> Option<CronJob> {
    let stripped = line.trim();
    if stripped.is_empty() {
        return None;
    }

    if stripped.starts_with('#') {
        let inner = stripped.trim_start_matches('#').trim();
        if inner.is_empty() {
            return None;
        }
        return try_parse_schedule(inner, false);
    }

    try_parse_schedule(stripped, true)
}

/// Match text against the `@token` shorthand, then the five-field grammar.
fn try_parse_schedule(text: &str, enabled: bool) -> Option<CronJob> {
    if let Some(caps) = SPECIAL_RE.captures(text) {
        return Some(CronJob {
            schedule: format!("@{}", &caps[1]),
            command: caps[2].to_string(),
            enabled,
            user: None,
        });
    }

    let caps = SCHEDULE_RE.captures(text)?;
    let schedule = [&caps[1], &caps[2], &caps[3], &caps[4], &caps[5]].join(" ");
    Some(CronJob {
        schedule,
        command: caps[6].to_string(),
        enabled,
        user: None,
    })
}

/// Split a system-crontab line into (schedule, user, command).
///
/// The line must carry at least seven whitespace-separated tokens: five
/// schedule fields, the user, and the command (taken undivided from the
/// seventh token onward).
fn split_system_line(line: &str) -> Option<(String, String, String)> {
    let mut rest = line.trim();
    let mut fields: Vec<&str> = Vec::with_capacity(6);
    for _ in 0..6 {
        let (token, tail) = rest.split_once(char::is_whitespace)?;
        fields.push(token);
        rest = tail.trim_start();
    }
    if rest.is_empty() {
        return None;
    }
    Some((fields[..5].join(" "), fields[5].to_string(), rest.to_string()))
}

/// Parse the body of one system-wide crontab file.
fn parse_system_file(contents: &str) -> Vec<CronJob> {
    contents
        .lines()
        .filter_map(|line| {
            let stripped = line.trim();
            if stripped.is_empty() || stripped.starts_with('#') {
                return None;
            }
            let (schedule, user, command) = split_system_line(stripped)?;
            Some(CronJob {
                schedule,
                command,
                enabled: true,
                user: Some(user),
            })
        })
        .collect()
}

/// Read one user's installed crontab.
///
/// Any failure (no crontab installed, tool missing, timeout) yields an
/// empty result, not an error.
async fn user_crontab(user: &str) -> UserCrontab {
    let output = Command::new("crontab")
        .args(["-l", "-u", user])
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(CRONTAB_READ_TIMEOUT, output).await {
        Ok(Ok(output)) if output.status.success() => output,
        _ => return UserCrontab::default(),
    };

    let raw = String::from_utf8_lossy(&output.stdout).to_string();
    let jobs = raw.lines().filter_map(parse_line).collect();
    UserCrontab { raw, jobs }
}

/// Usernames whose login shell is interactive, from the system account
/// database. Falls back to a minimal hard-coded list if it cannot be read.
async fn users_with_shells() -> Vec<String> {
    let passwd = match tokio::fs::read_to_string("/etc/passwd").await {
        Ok(contents) => contents,
        Err(_) => return vec!["root".to_string(), "pi".to_string()],
    };
    parse_passwd(&passwd)
}

fn parse_passwd(passwd: &str) -> Vec<String> {
    passwd
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let fields: Vec<&str> = line.split(':').collect();
            if fields.len() < 7 {
                return None;
            }
            if INTERACTIVE_SHELLS.contains(&fields[6]) {
                Some(fields[0].to_string())
            } else {
                None
            }
        })
        .collect()
}

/// Parse `/etc/crontab` plus every regular, non-hidden file directly inside
/// `/etc/cron.d`. Missing files and permission errors are skipped silently.
async fn system_crontabs() -> Vec<CronJob> {
    let mut files = vec![std::path::PathBuf::from("/etc/crontab")];

    let cron_d = Path::new("/etc/cron.d");
    if let Ok(mut entries) = tokio::fs::read_dir(cron_d).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with('.') {
                continue;
            }
            if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                files.push(entry.path());
            }
        }
    }

    let mut jobs = Vec::new();
    for file in files {
        if let Ok(contents) = tokio::fs::read_to_string(&file).await {
            jobs.extend(parse_system_file(&contents));
        }
    }
    jobs
}

/// Collect every crontab on the host.
///
/// Users with no crontab are silently absent. Individual file failures are
/// skipped; the snapshot itself always materializes.
pub async fn collect() -> Result<CrontabSnapshot, CollectError> {
    let mut users = BTreeMap::new();
    for user in users_with_shells().await {
        let crontab = user_crontab(&user).await;
        if !crontab.is_empty() {
            users.insert(user, crontab);
        }
    }

    Ok(CrontabSnapshot {
        users,
        system: SystemCrontab {
            jobs: system_crontabs().await,
        },
    })
}

/// Replace a user's entire crontab with `content`.
///
/// No merge semantics: the content is piped to the crontab install tool and
/// becomes the whole crontab.
pub async fn update_crontab(user: &str, content: &str) -> Result<(), MutationError> {
    let mut child = Command::new("crontab")
        .args(["-u", user, "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                MutationError::MissingTool("crontab".to_string())
            } else {
                MutationError::Failed(err.to_string())
            }
        })?;

    let content = content.to_string();
    let install = async move {
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(content.as_bytes())
                .await
                .map_err(|err| MutationError::Failed(err.to_string()))?;
            drop(stdin);
        }
        child
            .wait_with_output()
            .await
            .map_err(|err| MutationError::Failed(err.to_string()))
    };

    let output = tokio::time::timeout(CRONTAB_INSTALL_TIMEOUT, install)
        .await
        .map_err(|_| MutationError::Timeout("crontab".to_string()))??;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    Err(MutationError::Failed(if stderr.is_empty() {
        format!(
            "crontab exited with code {}",
            output.status.code().unwrap_or(-1)
        )
    } else {
        stderr
    }))
}

/// The crontab-install primitive, as a seam so the router can be tested
/// without touching the host.
#[async_trait]
pub trait CrontabInstaller: Send + Sync {
    async fn install(&self, user: &str, content: &str) -> Result<(), MutationError>;
}

/// Production installer: shells out to the real crontab tool.
pub struct SystemCrontabInstaller;

#[async_trait]
impl CrontabInstaller for SystemCrontabInstaller {
    async fn install(&self, user: &str, content: &str) -> Result<(), MutationError> {
        update_crontab(user, content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_yield_no_job() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("\t"), None);
    }

    #[test]
    fn standard_schedule_joins_fields_with_single_spaces() {
        let job = parse_line("0  3   * * *    /usr/bin/backup.sh").unwrap();
        assert_eq!(job.schedule, "0 3 * * *");
        assert_eq!(job.command, "/usr/bin/backup.sh");
        assert!(job.enabled);
        assert!(job.user.is_none());
    }

    #[test]
    fn command_is_kept_verbatim_including_whitespace() {
        let job = parse_line("*/5 * * * * echo 'hello   world' >> /tmp/log").unwrap();
        assert_eq!(job.schedule, "*/5 * * * *");
        assert_eq!(job.command, "echo 'hello   world' >> /tmp/log");
    }

    #[test]
    fn ranges_steps_and_lists_are_accepted() {
        let job = parse_line("0-30/5 1,2,3 * * 1-5 run-parts /etc/cron.daily").unwrap();
        assert_eq!(job.schedule, "0-30/5 1,2,3 * * 1-5");
    }

    #[test]
    fn special_tokens_parse_to_at_schedules() {
        for token in [
            "reboot", "hourly", "daily", "weekly", "monthly", "yearly", "annually",
        ] {
            let line = format!("@{} /usr/local/bin/task", token);
            let job = parse_line(&line).unwrap();
            assert_eq!(job.schedule, format!("@{}", token));
            assert_eq!(job.command, "/usr/local/bin/task");
            assert!(job.enabled);
        }
    }

    #[test]
    fn unrecognized_special_token_yields_no_job() {
        assert_eq!(parse_line("@fortnightly /usr/bin/task"), None);
        assert_eq!(parse_line("@reboot"), None);
    }

    #[test]
    fn commented_schedule_becomes_disabled_job() {
        let job = parse_line("# 0 3 * * * /usr/bin/backup.sh").unwrap();
        assert!(!job.enabled);
        assert_eq!(job.schedule, "0 3 * * *");
        assert_eq!(job.command, "/usr/bin/backup.sh");
    }

    #[test]
    fn stacked_comment_markers_are_stripped() {
        let job = parse_line("## @daily /usr/bin/cleanup").unwrap();
        assert!(!job.enabled);
        assert_eq!(job.schedule, "@daily");
    }

    #[test]
    fn prose_comments_yield_no_job() {
        assert_eq!(parse_line("# backup the database nightly"), None);
        assert_eq!(parse_line("#"), None);
        assert_eq!(parse_line("###   "), None);
    }

    #[test]
    fn too_few_schedule_fields_yield_no_job() {
        assert_eq!(parse_line("0 3 * * /usr/bin/backup.sh"), None);
        assert_eq!(parse_line("* * *"), None);
    }

    #[test]
    fn bad_field_characters_yield_no_job() {
        assert_eq!(parse_line("a b c d e /usr/bin/task"), None);
        // A schedule field may only contain digits, *, comma, slash, dash.
        assert_eq!(parse_line("0 3 * * mon /usr/bin/task"), None);
    }

    #[test]
    fn system_line_needs_seven_tokens() {
        assert_eq!(split_system_line("0 3 * * * root"), None);
        assert_eq!(split_system_line("0 3 * * *"), None);
    }

    #[test]
    fn system_line_splits_user_and_undivided_command() {
        let (schedule, user, command) =
            split_system_line("17 *\t* * *  root  cd / && run-parts --report /etc/cron.hourly")
                .unwrap();
        assert_eq!(schedule, "17 * * * *");
        assert_eq!(user, "root");
        assert_eq!(command, "cd / && run-parts --report /etc/cron.hourly");
    }

    #[test]
    fn system_file_skips_comments_and_variables_lines_without_enough_tokens() {
        let contents = "\
# /etc/crontab: system-wide crontab\n\
SHELL=/bin/sh\n\
PATH=/usr/local/sbin:/usr/local/bin:/sbin:/bin\n\
\n\
17 * * * * root cd / && run-parts --report /etc/cron.hourly\n\
25 6 * * * root test -x /usr/sbin/anacron || run-parts /etc/cron.daily\n";
        let jobs = parse_system_file(contents);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].user.as_deref(), Some("root"));
        assert_eq!(jobs[0].schedule, "17 * * * *");
        assert!(jobs.iter().all(|job| job.enabled));
    }

    #[test]
    fn passwd_filter_keeps_interactive_shells_only() {
        let passwd = "\
root:x:0:0:root:/root:/bin/bash\n\
daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin\n\
pi:x:1000:1000:,,,:/home/pi:/bin/bash\n\
svc:x:999:999::/nonexistent:/bin/false\n\
dev:x:1001:1001::/home/dev:/usr/bin/zsh\n";
        assert_eq!(parse_passwd(passwd), vec!["root", "pi", "dev"]);
    }

    #[test]
    fn malformed_passwd_lines_are_skipped() {
        assert!(parse_passwd("not a passwd line\n# comment\n").is_empty());
    }

    #[test]
    fn user_field_is_omitted_from_json_when_absent() {
        let job = parse_line("@daily /usr/bin/task").unwrap();
        let value = serde_json::to_value(&job).unwrap();
        assert!(value.get("user").is_none());

        let system_job = CronJob {
            user: Some("root".to_string()),
            ..job
        };
        let value = serde_json::to_value(&system_job).unwrap();
        assert_eq!(value["user"], "root");
    }

    #[test]
    fn snapshot_default_is_empty_shaped() {
        let snapshot = CrontabSnapshot::default();
        let value = serde_json::to_value(&snapshot).unwrap();
        assert!(value["users"].as_object().unwrap().is_empty());
        assert!(value["system"]["jobs"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn collect_runs_on_any_host() {
        // End to end against whatever this host has; must never error.
        let snapshot = collect().await.unwrap();
        for crontab in snapshot.users.values() {
            assert!(!crontab.is_empty());
        }
    }
}
