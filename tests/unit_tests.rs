use piwatch::collectors::docker::{DockerContainer, DockerMetrics};
use piwatch::collectors::wifi::WifiStatus;
use piwatch::cron::{CronJob, CrontabSnapshot, UserCrontab};
use piwatch::{AgentConfig, MetricsSnapshot};

/// The /metrics wire shape: every domain key present, absent domains null.
#[test]
fn metrics_snapshot_wire_shape() {
    let snapshot = MetricsSnapshot {
        timestamp: "2024-06-01T12:00:00Z".to_string(),
        cpu: None,
        memory: None,
        disk: None,
        temperature: None,
        network: None,
        processes: None,
        docker: Some(DockerMetrics {
            available: true,
            containers: vec![DockerContainer {
                id: "abc123".to_string(),
                name: "web".to_string(),
                image: "nginx:latest".to_string(),
                status: "Up 2 hours".to_string(),
                ports: "80/tcp".to_string(),
                state: "running".to_string(),
            }],
            container_count: 1,
        }),
    };

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["timestamp"], "2024-06-01T12:00:00Z");
    assert!(json["cpu"].is_null());
    assert!(json["temperature"].is_null());
    assert_eq!(json["docker"]["container_count"], 1);
    assert_eq!(json["docker"]["containers"][0]["name"], "web");

    // And back again.
    let parsed: MetricsSnapshot = serde_json::from_value(json).unwrap();
    assert!(parsed.cpu.is_none());
    assert_eq!(parsed.docker.unwrap().containers.len(), 1);
}

/// Per-user jobs omit the user field; system jobs carry it.
#[test]
fn cron_snapshot_serialization() {
    let mut snapshot = CrontabSnapshot::default();
    snapshot.users.insert(
        "pi".to_string(),
        UserCrontab {
            raw: "0 3 * * * /usr/bin/backup.sh\n".to_string(),
            jobs: vec![CronJob {
                schedule: "0 3 * * *".to_string(),
                command: "/usr/bin/backup.sh".to_string(),
                enabled: true,
                user: None,
            }],
        },
    );
    snapshot.system.jobs.push(CronJob {
        schedule: "17 * * * *".to_string(),
        command: "cd / && run-parts --report /etc/cron.hourly".to_string(),
        enabled: true,
        user: Some("root".to_string()),
    });

    let json = serde_json::to_value(&snapshot).unwrap();
    let user_job = &json["users"]["pi"]["jobs"][0];
    assert_eq!(user_job["schedule"], "0 3 * * *");
    assert!(user_job.get("user").is_none());

    let system_job = &json["system"]["jobs"][0];
    assert_eq!(system_job["user"], "root");
    assert_eq!(system_job["enabled"], true);
}

#[test]
fn wifi_status_defaults_to_all_null() {
    let json = serde_json::to_value(WifiStatus::default()).unwrap();
    assert!(json["ssid"].is_null());
    assert!(json["signal_dbm"].is_null());
    assert!(json["frequency"].is_null());
}

#[test]
fn config_builder_and_bind_address() {
    let config = AgentConfig::default()
        .with_host("192.168.1.10")
        .with_port(9101)
        .with_token("abc");
    assert_eq!(config.bind_address(), "192.168.1.10:9101");
    assert!(config.auth_enabled());

    let open = AgentConfig::default();
    assert!(!open.auth_enabled());
    assert_eq!(open.bind_address(), format!("0.0.0.0:{}", piwatch::DEFAULT_PORT));
}
