//! Tests for the provisioning workflow against a simulated host.
//!
//! Each test drives `Provisioner::run` through [`FakeHost`], then checks the
//! run report, the commands the host saw, and the state left behind.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;

use n8n_provision::application::services::provision::Provisioner;
use n8n_provision::domain::{
    ExitIndication, ProvisionError, ProvisionSettings, ProvisioningConfig, RunReport, Secret,
    StepId, StepStatus,
};

use crate::mocks::{Event, FakeHost, NODESOURCE_SCRIPT, RecordingReporter, Ufw};

fn config(domain: &str, settings: &ProvisionSettings, password: &str) -> ProvisioningConfig {
    ProvisioningConfig::new(settings, domain, Secret::new(password)).expect("valid config")
}

fn demo() -> ProvisioningConfig {
    config("demo.example.com", &ProvisionSettings::default(), "hunter2")
}

async fn run(host: &FakeHost, cfg: &ProvisioningConfig) -> (RunReport, RecordingReporter) {
    let reporter = RecordingReporter::default();
    let report = Provisioner::new(host, host, &reporter).run(cfg).await;
    (report, reporter)
}

fn assert_skipped(report: &RunReport, step: StepId) {
    assert!(
        matches!(report.status_of(step), Some(StepStatus::Skipped(_))),
        "{step} should be skipped, got {:?}",
        report.status_of(step)
    );
}

// ── Full run ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fresh_host_reaches_final_state() {
    let host = FakeHost::with_ufw(Ufw::Active);
    let (report, reporter) = run(&host, &demo()).await;

    assert!(report.is_complete(), "{report:?}");
    assert!(reporter.messages(Event::Failed).is_empty());
    for step in StepId::ALL {
        if step != StepId::Firewall {
            assert_eq!(report.status_of(step), Some(&StepStatus::Success), "{step}");
        }
    }

    let st = host.state.lock().unwrap();
    assert!(st.users.contains("n8n"));
    assert!(!st.sudoers.contains("n8n"), "temporary sudo must be revoked");
    assert!(st.node);
    assert!(st.npm_globals.contains("n8n"));
    assert!(st.databases.contains("n8n"));
    assert!(st.roles.contains("n8n"));
    assert_eq!(st.grants, [("n8n".to_string(), "n8n".to_string())]);
    assert!(st.enabled_services.contains("postgresql"));
    assert!(st.enabled_services.contains("n8n.service"));
    assert_eq!(st.restarted, ["nginx"]);
    assert_eq!(st.ufw_rules, ["Nginx Full"]);
    assert_eq!(st.dirs.get(&PathBuf::from("/home/n8n/.n8n")), Some(&0o700));
    assert_eq!(
        st.links.get(&PathBuf::from("/etc/nginx/sites-enabled/demo.example.com")),
        Some(&PathBuf::from("/etc/nginx/sites-available/demo.example.com"))
    );
    assert!(
        st.files
            .contains_key(&PathBuf::from("/etc/letsencrypt/live/demo.example.com/fullchain.pem"))
    );
    drop(st);

    let env = host.file("/home/n8n/.n8n/.env").expect("env file written");
    assert_eq!(env.mode, 0o600);
    assert!(env.content.contains("N8N_HOST=\"demo.example.com\"\n"));
    assert!(env.content.contains("WEBHOOK_URL=\"https://demo.example.com/\"\n"));
    assert!(env.content.contains("DB_POSTGRESDB_PASSWORD=\"hunter2\"\n"));

    let unit = host
        .file("/etc/systemd/system/n8n.service")
        .expect("unit written");
    assert!(unit.content.contains("ExecStart=/usr/bin/n8n start\n"));
    assert!(unit.content.contains("EnvironmentFile=/home/n8n/.n8n/.env\n"));

    // The NodeSource script goes from curl's stdout straight into bash.
    let calls = host.calls();
    let curl = calls.iter().find(|c| c.program == "curl").unwrap();
    assert_eq!(curl.line(), "curl -fsSL https://deb.nodesource.com/setup_20.x");
    let bash = calls.iter().find(|c| c.program == "bash").unwrap();
    assert_eq!(bash.line(), "bash -s");
    assert_eq!(bash.stdin.as_deref(), Some(NODESOURCE_SCRIPT));
    assert!(
        !calls.iter().any(|c| c.args.iter().any(|a| a.starts_with("/tmp"))),
        "nothing may be staged in /tmp"
    );
    assert!(host.file("/var/lib/n8n-provision/sudo-grants/n8n").is_none());
}

#[tokio::test]
async fn steps_are_reported_in_order() {
    let host = FakeHost::with_ufw(Ufw::Active);
    let (_, reporter) = run(&host, &demo()).await;

    let steps = reporter.messages(Event::Step);
    assert_eq!(steps.len(), 12);
    assert_eq!(steps[0], "[1/12] syncing OS packages");
    assert_eq!(steps[5], "[6/12] bootstrapping database");
    assert_eq!(steps[11], "[12/12] removing temporary privileges");
}

#[tokio::test]
async fn env_file_is_written_before_service_starts() {
    let host = FakeHost::with_ufw(Ufw::Active);
    run(&host, &demo()).await;

    let lines = host.lines();
    let chown = lines.iter().position(|l| l.starts_with("chown -R n8n:n8n /home/n8n/.n8n"));
    let start = lines
        .iter()
        .position(|l| l == "systemctl enable --now n8n.service");
    assert!(chown.unwrap() < start.unwrap());
}

// ── Idempotency ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn second_run_skips_existing_account_and_runtime() {
    let host = FakeHost::with_ufw(Ufw::Active);
    let cfg = demo();
    run(&host, &cfg).await;
    host.clear_calls();

    let (report, _) = run(&host, &cfg).await;

    assert_skipped(&report, StepId::ServiceAccount);
    assert_skipped(&report, StepId::Runtime);
    let lines = host.lines();
    assert!(!lines.iter().any(|l| l.starts_with("useradd")), "{lines:?}");
    assert!(!lines.iter().any(|l| l.starts_with("curl")), "{lines:?}");
}

#[tokio::test]
async fn second_run_stops_at_database_bootstrap() {
    let host = FakeHost::with_ufw(Ufw::Active);
    let cfg = demo();
    run(&host, &cfg).await;
    host.clear_calls();

    let (report, reporter) = run(&host, &cfg).await;

    let (step, err) = report.failure().expect("second run fails");
    assert_eq!(step, StepId::DatabaseBootstrap);
    assert_eq!(report.results.len(), 6);
    let ProvisionError::DatabaseBootstrap(failure) = err else {
        panic!("expected DatabaseBootstrap, got {err:?}");
    };
    assert_eq!(failure.exit, ExitIndication::Code(1));
    assert_eq!(
        failure.stderr_tail(5),
        ["ERROR:  database \"n8n\" already exists"]
    );
    assert!(failure.command.ends_with("< CREATE DATABASE"), "{}", failure.command);

    // Nothing after the failing statement ran.
    let last = host.calls().pop().unwrap();
    assert_eq!(last.program, "sudo");
    assert!(last.stdin.unwrap().starts_with("CREATE DATABASE"));
    assert_eq!(reporter.messages(Event::Failed).len(), 1);
}

#[tokio::test]
async fn existing_certificate_is_not_requested_again() {
    let host = FakeHost::with_ufw(Ufw::Active);
    host.state.lock().unwrap().files.insert(
        PathBuf::from("/etc/letsencrypt/live/demo.example.com/fullchain.pem"),
        crate::mocks::FileEntry {
            content: String::new(),
            mode: 0o644,
        },
    );

    let (report, _) = run(&host, &demo()).await;

    assert!(report.is_complete());
    assert_skipped(&report, StepId::Certificate);
    assert!(!host.lines().iter().any(|l| l.starts_with("certbot")));
}

// ── Reverse proxy ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn vhost_routes_root_to_configured_port_with_upgrade_headers() {
    let settings = ProvisionSettings {
        service_port: 6789,
        ..ProvisionSettings::default()
    };
    let cfg = config("n8n.example.com", &settings, "pw");
    let host = FakeHost::with_ufw(Ufw::Active);
    run(&host, &cfg).await;

    let site = host
        .file("/etc/nginx/sites-available/n8n.example.com")
        .expect("site written")
        .content;
    assert!(site.contains("server_name n8n.example.com;"), "{site}");
    assert!(site.contains("location / {"), "{site}");
    assert!(site.contains("proxy_pass http://localhost:6789;"), "{site}");
    assert!(site.contains("proxy_set_header Upgrade $http_upgrade;"), "{site}");
    assert!(site.contains("proxy_set_header Connection \"upgrade\";"), "{site}");

    let env = host.file("/home/n8n/.n8n/.env").unwrap().content;
    assert!(env.contains("N8N_PORT=\"6789\"\n"));
}

#[tokio::test]
async fn nginx_is_validated_before_restart() {
    let host = FakeHost::with_ufw(Ufw::Active);
    run(&host, &demo()).await;

    let lines = host.lines();
    let test = lines.iter().position(|l| l == "nginx -t").unwrap();
    let restart = lines
        .iter()
        .position(|l| l == "systemctl restart nginx")
        .unwrap();
    assert!(test < restart);
}

// ── Firewall ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn inactive_firewall_is_left_untouched_with_advisory() {
    let host = FakeHost::with_ufw(Ufw::Inactive);
    let (report, reporter) = run(&host, &demo()).await;

    assert!(report.is_complete());
    assert_skipped(&report, StepId::Firewall);
    assert!(!host.lines().iter().any(|l| l.starts_with("ufw allow")));
    assert!(host.state.lock().unwrap().ufw_rules.is_empty());
    let warnings = reporter.messages(Event::Warn);
    assert!(
        warnings.iter().any(|w| w.contains("ufw is inactive")),
        "{warnings:?}"
    );
}

#[tokio::test]
async fn unavailable_firewall_is_a_warning_not_a_failure() {
    let host = FakeHost::with_ufw(Ufw::Missing);
    let (report, reporter) = run(&host, &demo()).await;

    assert!(report.is_complete());
    assert_eq!(
        report.status_of(StepId::Firewall),
        Some(&StepStatus::Skipped("firewall state unknown".to_string()))
    );
    let warnings = reporter.messages(Event::Warn);
    assert!(
        warnings.iter().any(|w| w.contains("could not check firewall status")),
        "{warnings:?}"
    );
}

// ── Failure semantics ─────────────────────────────────────────────────────────

#[tokio::test]
async fn failure_stops_every_later_step() {
    // (failing command, step it belongs to, number of results)
    let cases: &[(&str, &[&str], StepId)] = &[
        ("apt-get", &["update"], StepId::SyncPackages),
        ("useradd", &[], StepId::ServiceAccount),
        ("curl", &[], StepId::Runtime),
        ("npm", &["install"], StepId::Application),
        ("systemctl", &["enable", "--now", "postgresql"], StepId::DatabaseEngine),
        ("sudo", &["-u", "postgres"], StepId::DatabaseBootstrap),
        ("chown", &[], StepId::EnvironmentFile),
        ("systemctl", &["daemon-reload"], StepId::ServiceUnit),
        ("nginx", &["-t"], StepId::ReverseProxy),
        ("certbot", &[], StepId::Certificate),
        ("ufw", &["allow"], StepId::Firewall),
        ("gpasswd", &[], StepId::Hardening),
    ];

    for (program, args, step) in cases {
        let host = FakeHost::with_ufw(Ufw::Active);
        host.fail_on(program, args);
        let (report, reporter) = run(&host, &demo()).await;

        let (failed, _) = report.failure().expect("run fails");
        assert_eq!(failed, *step);
        assert_eq!(report.results.len(), step.number(), "{step}");
        assert_eq!(reporter.messages(Event::Failed).len(), 1);
        assert_eq!(
            reporter.messages(Event::Step).len(),
            step.number(),
            "no step after {step} may start"
        );

        // The failing command is the last thing the host saw.
        let last = host.calls().pop().unwrap();
        assert_eq!(last.program, *program, "{step}");
    }
}

#[tokio::test]
async fn command_failure_carries_command_exit_and_stderr() {
    let host = FakeHost::with_ufw(Ufw::Active);
    host.fail_on("apt-get", &["update"]);
    let (report, _) = run(&host, &demo()).await;

    let (_, err) = report.failure().unwrap();
    assert!(matches!(err, ProvisionError::PackageManager(_)));
    let failure = err.command_failure().unwrap();
    assert_eq!(failure.command, "apt-get update -q");
    assert_eq!(failure.exit, ExitIndication::Code(1));
    assert_eq!(failure.stderr_tail(10), ["simulated failure"]);
    assert_eq!(host.calls().len(), 1);
}

#[tokio::test]
async fn failed_run_leaves_earlier_effects_in_place() {
    let host = FakeHost::with_ufw(Ufw::Active);
    host.fail_on("nginx", &["-t"]);
    let (report, _) = run(&host, &demo()).await;

    assert_eq!(report.failure().unwrap().0, StepId::ReverseProxy);
    let st = host.state.lock().unwrap();
    assert!(st.databases.contains("n8n"));
    assert!(st.enabled_services.contains("n8n.service"));
    assert!(st.sudoers.contains("n8n"), "hardening never ran");
}

// ── Account and privileges ───────────────────────────────────────────────────

#[tokio::test]
async fn hardening_leaves_preexisting_accounts_alone() {
    let host = FakeHost::with_ufw(Ufw::Active);
    {
        let mut st = host.state.lock().unwrap();
        st.users.insert("n8n".to_string());
        st.sudoers.insert("n8n".to_string());
    }

    let (report, _) = run(&host, &demo()).await;

    assert!(report.is_complete());
    assert_skipped(&report, StepId::ServiceAccount);
    assert_skipped(&report, StepId::Hardening);
    assert!(!host.lines().iter().any(|l| l.starts_with("gpasswd")));
    assert!(host.state.lock().unwrap().sudoers.contains("n8n"));
}

#[tokio::test]
async fn grant_is_recorded_before_the_account_is_created() {
    let host = FakeHost::with_ufw(Ufw::Active);
    host.fail_on("npm", &["install"]);
    let (report, _) = run(&host, &demo()).await;

    assert_eq!(report.failure().unwrap().0, StepId::Application);
    let marker = host
        .file("/var/lib/n8n-provision/sudo-grants/n8n")
        .expect("grant recorded");
    assert_eq!(marker.mode, 0o600);
    assert_eq!(marker.content, "n8n sudo\n");
}

#[tokio::test]
async fn rerun_after_failure_revokes_the_earlier_grant() {
    let host = FakeHost::with_ufw(Ufw::Active);
    let cfg = demo();
    host.fail_on("npm", &["install"]);
    let (report, _) = run(&host, &cfg).await;
    assert_eq!(report.failure().unwrap().0, StepId::Application);
    assert!(host.state.lock().unwrap().sudoers.contains("n8n"));

    host.clear_failures();
    host.clear_calls();
    let (report, _) = run(&host, &cfg).await;

    assert!(report.is_complete(), "{report:?}");
    assert_skipped(&report, StepId::ServiceAccount);
    assert_eq!(report.status_of(StepId::Hardening), Some(&StepStatus::Success));
    assert!(host.lines().contains(&"gpasswd -d n8n sudo".to_string()));
    assert!(!host.state.lock().unwrap().sudoers.contains("n8n"));
    assert!(host.file("/var/lib/n8n-provision/sudo-grants/n8n").is_none());
}

#[tokio::test]
async fn recorded_grant_already_revoked_only_clears_the_record() {
    let host = FakeHost::with_ufw(Ufw::Active);
    let cfg = demo();
    host.fail_on("npm", &["install"]);
    run(&host, &cfg).await;
    // An administrator removed the membership by hand in between.
    host.state.lock().unwrap().sudoers.clear();

    host.clear_failures();
    host.clear_calls();
    let (report, _) = run(&host, &cfg).await;

    assert_eq!(report.status_of(StepId::Hardening), Some(&StepStatus::Success));
    assert!(!host.lines().iter().any(|l| l.starts_with("gpasswd")));
    assert!(host.file("/var/lib/n8n-provision/sudo-grants/n8n").is_none());
}

#[tokio::test]
async fn without_temporary_sudo_the_account_never_joins_sudo() {
    let settings = ProvisionSettings {
        temporary_sudo: false,
        ..ProvisionSettings::default()
    };
    let cfg = config("demo.example.com", &settings, "pw");
    let host = FakeHost::with_ufw(Ufw::Active);
    let (report, _) = run(&host, &cfg).await;

    assert!(report.is_complete());
    assert_skipped(&report, StepId::Hardening);
    assert!(host.file("/var/lib/n8n-provision/sudo-grants/n8n").is_none());
    let useradd = host
        .lines()
        .into_iter()
        .find(|l| l.starts_with("useradd"))
        .unwrap();
    assert_eq!(useradd, "useradd --create-home --shell /bin/bash n8n");
}

// ── Secrets ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn password_only_travels_on_stdin() {
    let password = "s3cr'et pass";
    let cfg = config("demo.example.com", &ProvisionSettings::default(), password);
    let host = FakeHost::with_ufw(Ufw::Active);
    let (report, reporter) = run(&host, &cfg).await;
    assert!(report.is_complete());

    for call in host.calls() {
        assert!(
            !call.args.iter().any(|a| a.contains(password)),
            "password leaked into argv: {}",
            call.line()
        );
    }
    let role = host
        .calls()
        .into_iter()
        .filter_map(|c| c.stdin)
        .find(|sql| sql.starts_with("CREATE ROLE"))
        .unwrap();
    assert_eq!(
        role,
        "CREATE ROLE \"n8n\" WITH LOGIN PASSWORD 's3cr''et pass';\n"
    );
    assert!(
        reporter
            .events()
            .iter()
            .all(|(_, m)| !m.contains(password))
    );
}

// ── Certificate ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn certbot_registers_admin_email_when_configured() {
    let settings = ProvisionSettings {
        admin_email: Some("ops@example.com".to_string()),
        ..ProvisionSettings::default()
    };
    let cfg = config("demo.example.com", &settings, "pw");
    let host = FakeHost::with_ufw(Ufw::Active);
    run(&host, &cfg).await;

    let certbot = host
        .lines()
        .into_iter()
        .find(|l| l.starts_with("certbot"))
        .unwrap();
    assert_eq!(
        certbot,
        "certbot --nginx -d demo.example.com --non-interactive --agree-tos --redirect --email ops@example.com"
    );
}

#[tokio::test]
async fn certbot_without_email_registers_unsafely() {
    let host = FakeHost::with_ufw(Ufw::Active);
    run(&host, &demo()).await;

    assert!(
        host.lines()
            .iter()
            .any(|l| l.starts_with("certbot") && l.ends_with("--register-unsafely-without-email"))
    );
}
