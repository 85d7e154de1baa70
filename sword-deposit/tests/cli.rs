use assert_cmd::Command;
use predicates::prelude::*;
use std::collections::BTreeSet;
use std::fs::write;
use std::path::PathBuf;
use sword_deposit::cli::{execute, run, Cli};
use sword_deposit_core::config::ServerConfig;
use sword_deposit_core::contract::{
    Collection, DepositReceipt, MockPrompter, MockSwordTransport, ServiceDocument, Workspace,
};
use sword_deposit_core::deposit::{DepositTarget, RunReport, PACKAGE_DSPACE_SAF};
use sword_deposit_core::report::format_report;
use sword_deposit_core::SwordError;
use tempfile::{tempdir, NamedTempFile};

fn cli_for(target: DepositTarget) -> Cli {
    let (file, directory) = match target {
        DepositTarget::File(path) => (Some(path), None),
        DepositTarget::Directory(path) => (None, Some(path)),
    };
    Cli {
        file,
        directory,
        server_properties: PathBuf::from("swordv2-server.properties"),
        mimetype: "application/zip".to_string(),
        slug: None,
        in_progress: false,
        no_openam: true,
        md5: false,
    }
}

fn test_config() -> ServerConfig {
    ServerConfig::new("http://example/sd", "u", "p")
}

fn service_document() -> ServiceDocument {
    ServiceDocument {
        workspaces: vec![Workspace {
            title: "Repository".to_string(),
            collections: vec![Collection {
                href: "http://example/col/1".to_string(),
                title: "Theses".to_string(),
                description: Some("Doctoral theses".to_string()),
                accept: vec!["application/zip".to_string()],
                accepted_packaging: BTreeSet::from([PACKAGE_DSPACE_SAF.to_string()]),
            }],
        }],
    }
}

fn receipt(status_code: u16) -> DepositReceipt {
    DepositReceipt {
        status_code,
        location: Some("http://example/edit/42".to_string()),
        links: Vec::new(),
        content_link: None,
        packaging: vec![PACKAGE_DSPACE_SAF.to_string()],
        treatment: Some("Stored in the workflow".to_string()),
    }
}

fn prompter_choosing(index: usize) -> MockPrompter {
    let mut prompter = MockPrompter::new();
    prompter.expect_sso_token().never();
    prompter
        .expect_collection_index()
        .times(1)
        .returning(move |listing| {
            assert!(listing.contains("0: Theses - Doctoral theses"), "listing was: {listing}");
            Ok(index)
        });
    prompter
}

#[test]
fn cli_without_file_or_directory_exits_with_failure() {
    let mut cmd = Command::cargo_bin("sword-deposit").expect("Binary exists");
    cmd.args(["-p", "swordv2-server.properties", "-m", "application/zip"]);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "You have to specify at least a file (-f) or a directory (-d)",
        ));
}

#[test]
fn cli_rejects_file_and_directory_together() {
    let mut cmd = Command::cargo_bin("sword-deposit").expect("Binary exists");
    cmd.args([
        "-p",
        "swordv2-server.properties",
        "-m",
        "application/zip",
        "-f",
        "a.zip",
        "-d",
        "packages",
    ]);

    cmd.assert().failure().code(2);
}

#[test]
fn cli_without_mimetype_is_a_usage_error() {
    let mut cmd = Command::cargo_bin("sword-deposit").expect("Binary exists");
    cmd.args(["-p", "swordv2-server.properties", "-f", "a.zip"]);

    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--mimetype"));
}

#[test]
fn cli_with_missing_config_file_fails_before_any_prompt() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("swordv2-server.properties");

    let mut cmd = Command::cargo_bin("sword-deposit").expect("Binary exists");
    cmd.arg("-p")
        .arg(&missing)
        .args(["-m", "application/zip", "-f", "package.zip", "-o"]);

    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("configuration error"));
}

#[test]
fn cli_help_lists_deposit_flags() {
    let mut cmd = Command::cargo_bin("sword-deposit").expect("Binary exists");
    cmd.arg("--help");

    cmd.assert().success().stdout(
        predicate::str::contains("--server-properties")
            .and(predicate::str::contains("--no-openam"))
            .and(predicate::str::contains("--in-progress")),
    );
}

#[test]
fn plan_prefers_directory_and_maps_options() {
    let mut cli = cli_for(DepositTarget::Directory(PathBuf::from("packages")));
    cli.slug = Some("thesis-42".to_string());
    cli.in_progress = true;
    cli.md5 = true;
    cli.no_openam = false;

    let plan = cli.plan().expect("plan");
    assert_eq!(plan.target, DepositTarget::Directory(PathBuf::from("packages")));
    assert_eq!(plan.options.mime_type, "application/zip");
    assert_eq!(plan.options.slug.as_deref(), Some("thesis-42"));
    assert!(plan.options.in_progress);
    assert!(plan.options.compute_md5);
    assert!(plan.ask_sso_token);
}

#[tokio::test]
async fn execute_deposits_single_file_and_reports_receipt() {
    let file = NamedTempFile::new().unwrap();
    write(file.path(), b"PK\x03\x04 package").unwrap();
    let plan = cli_for(DepositTarget::File(file.path().to_path_buf()))
        .plan()
        .unwrap();

    let mut transport = MockSwordTransport::new();
    transport
        .expect_get_service_document()
        .times(1)
        .returning(|sd_iri, credentials| {
            assert_eq!(sd_iri, "http://example/sd");
            assert_eq!(credentials.user, "u");
            assert_eq!(credentials.sso_token, None);
            Ok(service_document())
        });
    transport
        .expect_deposit()
        .times(1)
        .returning(|collection, deposit, _| {
            assert_eq!(collection.href, "http://example/col/1");
            assert_eq!(deposit.packaging, PACKAGE_DSPACE_SAF);
            assert_eq!(deposit.mime_type, "application/zip");
            assert_eq!(deposit.content, b"PK\x03\x04 package".to_vec());
            Ok(receipt(201))
        });
    let prompter = prompter_choosing(0);

    let report = execute(&plan, &test_config(), &transport, &prompter)
        .await
        .expect("single deposit succeeds");

    match report {
        RunReport::Single(receipt) => {
            assert_eq!(receipt.status_code, 201);
            let text = format_report(&receipt);
            assert!(text.contains("Status code: 201"), "report was: {text}");
            assert!(text.contains("Location: http://example/edit/42"), "report was: {text}");
        }
        other => panic!("expected a single receipt, got {other:?}"),
    }
}

#[tokio::test]
async fn execute_batch_succeeds_despite_failed_files() {
    let dir = tempdir().unwrap();
    write(dir.path().join("a.zip"), b"first").unwrap();
    write(dir.path().join("b.zip"), b"second").unwrap();
    write(dir.path().join("readme.txt"), b"not a package").unwrap();
    let plan = cli_for(DepositTarget::Directory(dir.path().to_path_buf()))
        .plan()
        .unwrap();

    let mut transport = MockSwordTransport::new();
    transport
        .expect_get_service_document()
        .times(1)
        .returning(|_, _| Ok(service_document()));
    transport
        .expect_deposit()
        .times(2)
        .returning(|_, deposit, _| {
            if deposit.filename == "a.zip" {
                Ok(receipt(201))
            } else {
                Err(SwordError::Deposit {
                    status: 415,
                    summary: "Unsupported Media Type".to_string(),
                })
            }
        });
    let prompter = prompter_choosing(0);

    let report = execute(&plan, &test_config(), &transport, &prompter)
        .await
        .expect("batch run succeeds even when files fail");

    match report {
        RunReport::Batch(batch) => {
            assert_eq!(batch.imported(), 1);
            assert_eq!(batch.failed_count(), 1);
            assert!(batch.failed[0].path.ends_with("b.zip"));
            assert_eq!(batch.failed[0].error.status(), Some(415));
        }
        other => panic!("expected a batch report, got {other:?}"),
    }
}

#[tokio::test]
async fn execute_fails_when_server_rejects_single_deposit() {
    let file = NamedTempFile::new().unwrap();
    write(file.path(), b"content").unwrap();
    let plan = cli_for(DepositTarget::File(file.path().to_path_buf()))
        .plan()
        .unwrap();

    let mut transport = MockSwordTransport::new();
    transport
        .expect_get_service_document()
        .returning(|_, _| Ok(service_document()));
    transport.expect_deposit().times(1).returning(|_, _, _| {
        Err(SwordError::Deposit {
            status: 403,
            summary: "Forbidden".to_string(),
        })
    });
    let prompter = prompter_choosing(0);

    let err = execute(&plan, &test_config(), &transport, &prompter)
        .await
        .unwrap_err();

    let sword_error = err.downcast_ref::<SwordError>().expect("SwordError");
    assert_eq!(sword_error.status(), Some(403));
    assert!(err.to_string().contains("403"), "got: {err}");
}

#[tokio::test]
async fn execute_fails_on_out_of_range_collection() {
    let file = NamedTempFile::new().unwrap();
    let plan = cli_for(DepositTarget::File(file.path().to_path_buf()))
        .plan()
        .unwrap();

    let mut transport = MockSwordTransport::new();
    transport
        .expect_get_service_document()
        .returning(|_, _| Ok(service_document()));
    transport.expect_deposit().never();
    let prompter = prompter_choosing(3);

    let err = execute(&plan, &test_config(), &transport, &prompter)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<SwordError>(),
        Some(SwordError::Selection { index: 3, count: 1 })
    ));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Collects the debug rendering of every event it sees.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    // Neither -f nor -d: the run stops at argument validation, before any I/O.
    let cli = Cli {
        file: None,
        directory: None,
        ..cli_for(DepositTarget::File(PathBuf::from("unused.zip")))
    };

    let result = run(cli).await;
    assert!(result.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
