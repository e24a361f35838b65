use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test(flavor = "multi_thread")]
async fn test_call_prints_success_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("authorization", "Bearer T"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Hello PRIVATE"))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    cargo_bin_cmd!("kcview")
        .env("KCVIEW_HOME", home.path())
        .env("KCVIEW_API_BASE_URL", server.uri())
        .env_remove("KCVIEW_TOKEN")
        .args(["call", "/private", "--token", "T"])
        .assert()
        .success()
        .stdout("Success: Hello PRIVATE\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_call_reads_token_from_env() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin"))
        .and(header("authorization", "Bearer from-env"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Hello ADMIN"))
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    cargo_bin_cmd!("kcview")
        .env("KCVIEW_HOME", home.path())
        .env("KCVIEW_API_BASE_URL", server.uri())
        .env("KCVIEW_TOKEN", "from-env")
        .args(["call", "/admin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Success: Hello ADMIN"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_call_unauthorized_reports_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    cargo_bin_cmd!("kcview")
        .env("KCVIEW_HOME", home.path())
        .env("KCVIEW_API_BASE_URL", server.uri())
        .args(["call", "/admin", "--token", "stale"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Access Denied. Redirecting to login..."))
        .stderr(predicate::str::contains("requires login"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_call_server_error_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    cargo_bin_cmd!("kcview")
        .env("KCVIEW_HOME", home.path())
        .env("KCVIEW_API_BASE_URL", server.uri())
        .args(["call", "/public", "--token", "T"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "Error: Request failed with status code 500",
        ));
}
